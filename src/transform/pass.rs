//! Driver that applies the rewrite to every method of a module.

use std::{
    fmt,
    sync::atomic::{AtomicBool, Ordering},
};

use rayon::prelude::*;

use crate::{
    assembly::simplify_macros,
    metadata::{field::FieldRc, globaltype::GlobalType, method::Method, token::Token},
    transform::{
        config::LocalsToFieldsConfig,
        events::{EventKind, EventLog},
        names::NameGenerator,
        rewriter::{LocalsToFieldsRewriter, RewriteOutcome},
    },
    Error, Result,
};

/// Totals of one [`LocalsToFieldsPass::run`].
#[derive(Debug, Clone, Default)]
pub struct PassReport {
    /// Methods whose body was rewritten
    pub methods_rewritten: usize,
    /// Methods without a body
    pub methods_skipped: usize,
    /// Methods left untouched because their rewrite failed
    pub methods_failed: usize,
    /// Tokens of the failed methods, in input order
    pub failed_methods: Vec<Token>,
    /// Slots declared on the global type
    pub slots_created: usize,
    /// Instructions now accessing a slot
    pub instructions_rewritten: usize,
    /// Locals dropped from local tables
    pub locals_removed: usize,
}

impl PassReport {
    fn add(&mut self, outcome: &RewriteOutcome) {
        self.methods_rewritten += 1;
        self.slots_created += outcome.slots_created.len();
        self.instructions_rewritten += outcome.instructions_rewritten;
        self.locals_removed += outcome.locals_removed;
    }
}

impl fmt::Display for PassReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} methods rewritten, {} skipped, {} failed; {} slots, {} instructions, {} locals removed",
            self.methods_rewritten,
            self.methods_skipped,
            self.methods_failed,
            self.slots_created,
            self.instructions_rewritten,
            self.locals_removed
        )
    }
}

/// Result of processing one method.
enum MethodResult {
    Rewritten(RewriteOutcome),
    Skipped,
    Failed(Error),
    /// Not attempted because an earlier failure aborted the run.
    Cancelled,
}

/// Replaces the locals of every method body with static fields on the global type.
///
/// Methods without a body are skipped. Each method gets its own allocation map; the global
/// type and the name generator are shared, also across worker threads.
///
/// See [`crate::transform::rewriter`] for the re-entrancy limitation of rewritten methods.
pub struct LocalsToFieldsPass {
    config: LocalsToFieldsConfig,
    events: EventLog,
}

impl Default for LocalsToFieldsPass {
    fn default() -> Self {
        Self::new(LocalsToFieldsConfig::default())
    }
}

impl LocalsToFieldsPass {
    /// Creates a pass with the given settings.
    #[must_use]
    pub fn new(config: LocalsToFieldsConfig) -> Self {
        LocalsToFieldsPass {
            config,
            events: EventLog::new(),
        }
    }

    /// Unique name of the pass.
    #[must_use]
    pub fn name(&self) -> &'static str {
        "locals-to-fields"
    }

    /// One-line description of the pass.
    #[must_use]
    pub fn description(&self) -> &'static str {
        "Replaces local variables with static fields on the module type"
    }

    /// The settings of this pass.
    #[must_use]
    pub fn config(&self) -> &LocalsToFieldsConfig {
        &self.config
    }

    /// Events recorded by every run of this pass so far.
    #[must_use]
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Rewrites `methods`, declaring slots on `global`.
    ///
    /// The name generator is built from [`LocalsToFieldsConfig::naming`] and reserves every
    /// name already declared on `global`.
    ///
    /// # Errors
    ///
    /// With [`LocalsToFieldsConfig::fail_fast`] set, returns [`Error::MethodFailed`] for the
    /// first failing method in input order. Methods processed before the failure stay
    /// rewritten; in a parallel run, methods processed concurrently with it may be rewritten
    /// as well.
    pub fn run(&self, global: &GlobalType, methods: &mut [Method]) -> Result<PassReport> {
        let names = self.config.naming.build(global);
        self.run_with_names(global, names.as_ref(), methods)
    }

    /// Like [`LocalsToFieldsPass::run`], with a caller-supplied name generator.
    ///
    /// # Errors
    ///
    /// See [`LocalsToFieldsPass::run`].
    pub fn run_with_names(
        &self,
        global: &GlobalType,
        names: &dyn NameGenerator,
        methods: &mut [Method],
    ) -> Result<PassReport> {
        let rewriter = LocalsToFieldsRewriter::new(global, names).with_events(&self.events);
        let abort = AtomicBool::new(false);

        let process = |method: &mut Method| -> MethodResult {
            if self.config.fail_fast && abort.load(Ordering::Acquire) {
                return MethodResult::Cancelled;
            }
            let result = self.process_method(&rewriter, method);
            if matches!(result, MethodResult::Failed(_)) {
                abort.store(true, Ordering::Release);
            }
            result
        };

        let results: Vec<(Token, MethodResult)> = if self.config.parallel {
            methods
                .par_iter_mut()
                .map(|method| (method.token, process(method)))
                .collect()
        } else {
            methods
                .iter_mut()
                .map(|method| (method.token, process(method)))
                .collect()
        };

        let mut report = PassReport::default();
        for (token, result) in results {
            match result {
                MethodResult::Rewritten(outcome) => report.add(&outcome),
                MethodResult::Skipped => report.methods_skipped += 1,
                MethodResult::Cancelled => {}
                MethodResult::Failed(error) => {
                    if self.config.fail_fast {
                        return Err(Error::MethodFailed {
                            method: token,
                            source: Box::new(error),
                        });
                    }
                    report.methods_failed += 1;
                    report.failed_methods.push(token);
                }
            }
        }

        log::info!("{}: {}", self.name(), report);
        self.events
            .info(format!("{}: {}", self.name(), self.events.summary()));
        Ok(report)
    }

    /// Normalizes and rewrites a copy of the body, committing it only on success.
    fn process_method(
        &self,
        rewriter: &LocalsToFieldsRewriter<'_>,
        method: &mut Method,
    ) -> MethodResult {
        let Some(body) = method.body.as_mut() else {
            log::debug!("{} ({}): no body, skipped", method.name, method.token);
            self.events
                .record(EventKind::MethodSkipped)
                .method(method.token)
                .message(format!("{} has no body", method.name));
            return MethodResult::Skipped;
        };

        let mut work = body.clone();
        let result = if self.config.normalize {
            simplify_macros(&mut work, method.parameter_count)
                .and_then(|_| rewriter.rewrite(method.token, &mut work))
        } else {
            rewriter.rewrite(method.token, &mut work)
        };

        match result {
            Ok(outcome) => {
                *body = work;
                self.events
                    .record(EventKind::MethodRewritten)
                    .method(method.token)
                    .message(describe(&method.name, &outcome.slots_created));
                MethodResult::Rewritten(outcome)
            }
            Err(error) => {
                log::warn!("{} ({}): {}", method.name, method.token, error);
                self.events
                    .record(EventKind::MethodFailed)
                    .method(method.token)
                    .message(error.to_string());
                MethodResult::Failed(error)
            }
        }
    }
}

fn describe(name: &str, slots: &[FieldRc]) -> String {
    let names: Vec<&str> = slots.iter().map(|slot| slot.name.as_str()).collect();
    format!("{} -> [{}]", name, names.join(", "))
}
