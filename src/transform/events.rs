//! Event log of a locals-to-fields run.
//!
//! The rewriter records every slot it declares and every instruction it redirects; the pass
//! adds one entry per method it rewrites, skips or gives up on, and a closing summary. Workers
//! append through a shared reference, so one log serves a whole parallel run.
//!
//! ```rust
//! use cilslot::{metadata::token::Token, transform::{EventKind, EventLog}};
//!
//! let log = EventLog::new();
//! log.record(EventKind::SlotAllocated)
//!     .method(Token::new(0x0600_0001))
//!     .message("L#0 -> f_a");
//! assert_eq!(log.count_kind(EventKind::SlotAllocated), 1);
//! ```

use std::{collections::HashSet, fmt};

use strum::{Display, IntoStaticStr};

use crate::metadata::token::Token;

/// What an [`Event`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum EventKind {
    /// A static field was declared for a local.
    #[strum(serialize = "slot allocated")]
    SlotAllocated,
    /// A local access now targets a static field.
    #[strum(serialize = "instruction rewritten")]
    InstructionRewritten,
    /// Accessed locals were dropped from a local table.
    #[strum(serialize = "locals removed")]
    LocalsRemoved,
    /// A method body was rewritten and committed.
    #[strum(serialize = "method rewritten")]
    MethodRewritten,
    /// A method without a body was left alone.
    #[strum(serialize = "method skipped")]
    MethodSkipped,
    /// A method kept its original body because the rewrite failed.
    #[strum(serialize = "method failed")]
    MethodFailed,
    /// Free-form note, such as the run summary.
    #[strum(serialize = "info")]
    Info,
}

impl EventKind {
    /// Returns `true` for events that describe a change to a body or to the global type.
    #[must_use]
    pub fn changes_module(self) -> bool {
        matches!(
            self,
            Self::SlotAllocated | Self::InstructionRewritten | Self::LocalsRemoved
        )
    }
}

/// A single logged event.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// The method concerned, if any.
    pub method: Option<Token>,
    /// IL offset of the instruction concerned, if any.
    pub offset: Option<u32>,
    /// Human-readable detail.
    pub message: String,
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.kind)?;
        if let Some(method) = self.method {
            write!(f, " {method}")?;
        }
        if let Some(offset) = self.offset {
            write!(f, " IL_{offset:04x}")?;
        }
        write!(f, ": {}", self.message)
    }
}

/// Fluent builder returned by [`EventLog::record`].
///
/// The event is appended when the builder goes out of scope.
pub struct EventBuilder<'a> {
    log: &'a EventLog,
    event: Event,
}

impl EventBuilder<'_> {
    /// Ties the event to `method`.
    pub fn method(mut self, method: Token) -> Self {
        self.event.method = Some(method);
        self
    }

    /// Ties the event to the instruction at `offset` in `method`.
    pub fn instruction(mut self, method: Token, offset: u32) -> Self {
        self.event.method = Some(method);
        self.event.offset = Some(offset);
        self
    }

    /// Replaces the default message (the kind's name).
    pub fn message(mut self, msg: impl Into<String>) -> Self {
        self.event.message = msg.into();
        self
    }
}

impl Drop for EventBuilder<'_> {
    fn drop(&mut self) {
        let event = Event {
            kind: self.event.kind,
            method: self.event.method.take(),
            offset: self.event.offset.take(),
            message: std::mem::take(&mut self.event.message),
        };
        self.log.events.push(event);
    }
}

/// Append-only event collection, shareable between worker threads.
#[derive(Debug)]
pub struct EventLog {
    events: boxcar::Vec<Event>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Creates an empty event log.
    #[must_use]
    pub fn new() -> Self {
        Self {
            events: boxcar::Vec::new(),
        }
    }

    /// Total number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.count()
    }

    /// Returns `true` if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Starts an event of `kind`; it is stored once the returned builder is dropped.
    pub fn record(&self, kind: EventKind) -> EventBuilder<'_> {
        let message: &'static str = kind.into();
        EventBuilder {
            log: self,
            event: Event {
                kind,
                method: None,
                offset: None,
                message: message.to_string(),
            },
        }
    }

    /// Records an [`EventKind::Info`] note.
    pub fn info(&self, message: impl Into<String>) {
        self.record(EventKind::Info).message(message);
    }

    /// All events in recording order.
    pub fn iter(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().map(|(_, event)| event)
    }

    /// Events of one kind.
    pub fn of_kind(&self, kind: EventKind) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |event| event.kind == kind)
    }

    /// Events tied to one method.
    pub fn for_method(&self, method: Token) -> impl Iterator<Item = &Event> + '_ {
        self.iter().filter(move |event| event.method == Some(method))
    }

    /// Returns `true` if at least one event of `kind` was recorded.
    #[must_use]
    pub fn has(&self, kind: EventKind) -> bool {
        self.of_kind(kind).next().is_some()
    }

    /// Number of events of `kind`.
    #[must_use]
    pub fn count_kind(&self, kind: EventKind) -> usize {
        self.of_kind(kind).count()
    }

    /// Number of distinct methods with at least one module-changing event.
    #[must_use]
    pub fn methods_changed(&self) -> usize {
        let methods: HashSet<Token> = self
            .iter()
            .filter(|event| event.kind.changes_module())
            .filter_map(|event| event.method)
            .collect();
        methods.len()
    }

    /// One-line tally of the run, e.g. `2 methods, 3 slots, 5 instructions`.
    ///
    /// Skipped and failed methods are appended only when there are any.
    #[must_use]
    pub fn summary(&self) -> String {
        let mut line = format!(
            "{} methods, {} slots, {} instructions",
            self.count_kind(EventKind::MethodRewritten),
            self.count_kind(EventKind::SlotAllocated),
            self.count_kind(EventKind::InstructionRewritten)
        );
        for (kind, label) in [
            (EventKind::MethodSkipped, "skipped"),
            (EventKind::MethodFailed, "failed"),
        ] {
            let count = self.count_kind(kind);
            if count > 0 {
                line.push_str(&format!(", {count} {label}"));
            }
        }
        line
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_builder_records_on_drop() {
        let log = EventLog::new();
        let method = Token::new(0x0600_0002);
        log.record(EventKind::InstructionRewritten)
            .instruction(method, 4)
            .message("ldloc L#0 -> ldsfld f_a");
        log.record(EventKind::MethodSkipped)
            .method(Token::new(0x0600_0003));

        assert_eq!(log.len(), 2);
        let event = log.for_method(method).next().unwrap();
        assert_eq!(event.offset, Some(4));
        assert_eq!(event.message, "ldloc L#0 -> ldsfld f_a");
        assert_eq!(
            event.to_string(),
            "[instruction rewritten] 0x06000002 IL_0004: ldloc L#0 -> ldsfld f_a"
        );

        let skipped = log.of_kind(EventKind::MethodSkipped).next().unwrap();
        assert_eq!(skipped.message, "method skipped");
        assert!(!log.has(EventKind::MethodFailed));
    }

    #[test]
    fn test_summary() {
        let log = EventLog::new();
        assert_eq!(log.summary(), "0 methods, 0 slots, 0 instructions");

        let method = Token::new(0x0600_0001);
        log.record(EventKind::SlotAllocated).method(method);
        log.record(EventKind::SlotAllocated).method(method);
        log.record(EventKind::InstructionRewritten).instruction(method, 0);
        log.record(EventKind::MethodRewritten).method(method);
        log.record(EventKind::MethodFailed)
            .method(Token::new(0x0600_0002));
        log.info("done");

        assert_eq!(
            log.summary(),
            "1 methods, 2 slots, 1 instructions, 1 failed"
        );
        assert_eq!(log.methods_changed(), 1);
    }

    #[test]
    fn test_concurrent_recording() {
        let log = Arc::new(EventLog::new());
        let handles: Vec<_> = (0..4u32)
            .map(|i| {
                let log = Arc::clone(&log);
                thread::spawn(move || {
                    for _ in 0..50 {
                        log.record(EventKind::SlotAllocated)
                            .method(Token::from_parts(Token::METHODDEF_TABLE, i + 1));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(log.count_kind(EventKind::SlotAllocated), 200);
        assert_eq!(log.methods_changed(), 4);
    }
}
