//! The operand rewriter.
//!
//! [`LocalsToFieldsRewriter::rewrite`] turns every `ldloc`, `ldloca` and `stloc` of a
//! normalized body into `ldsfld`, `ldsflda` and `stsfld` of a static field on the global type,
//! then drops the accessed locals from the local table.
//!
//! # Known limitation
//!
//! A rewritten method keeps its "locals" in static fields shared by every call. Recursive or
//! concurrent calls of the same method overwrite each other's values. The transform makes no
//! attempt to preserve re-entrancy or thread-safety of the method it rewrites.

use std::{collections::HashSet, fmt};

use crate::{
    assembly::Operand,
    metadata::{
        field::FieldRc,
        globaltype::GlobalType,
        method::{LocalId, MethodBody},
        token::Token,
    },
    transform::{
        access::{classify, LocalAccess},
        allocator::SlotAllocator,
        events::{EventKind, EventLog},
        names::NameGenerator,
    },
    Result,
};

/// Progress of the rewrite of a single method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum RewritePhase {
    /// No method in progress.
    Idle,
    /// Scanning instructions and allocating slots.
    Resolving,
    /// Pruning the local table.
    Cleanup,
}

impl fmt::Display for RewritePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RewritePhase::Idle => "idle",
            RewritePhase::Resolving => "resolving",
            RewritePhase::Cleanup => "cleanup",
        })
    }
}

/// What the rewrite of one method did.
#[derive(Debug, Clone, Default)]
pub struct RewriteOutcome {
    /// Slots declared for this method, in allocation order
    pub slots_created: Vec<FieldRc>,
    /// Number of instructions now accessing a slot
    pub instructions_rewritten: usize,
    /// Number of locals dropped from the local table
    pub locals_removed: usize,
}

/// One pending substitution: instruction index, access kind, target slot.
struct Edit {
    index: usize,
    access: LocalAccess,
    slot: FieldRc,
}

/// Per-method state. Dropped when the method is done, which discards the allocation map.
struct RewriteSession<'a> {
    method: Token,
    phase: RewritePhase,
    slots: SlotAllocator<'a>,
}

impl<'a> RewriteSession<'a> {
    fn new(method: Token, global: &'a GlobalType, names: &'a dyn NameGenerator) -> Self {
        RewriteSession {
            method,
            phase: RewritePhase::Idle,
            slots: SlotAllocator::new(global, names),
        }
    }

    fn advance(&mut self, to: RewritePhase) -> Result<()> {
        let allowed = matches!(
            (self.phase, to),
            (RewritePhase::Idle, RewritePhase::Resolving)
                | (RewritePhase::Resolving, RewritePhase::Cleanup)
                | (RewritePhase::Cleanup, RewritePhase::Idle)
        );
        if !allowed {
            return Err(contract_violation!(
                "{} - invalid phase transition {} -> {}",
                self.method,
                self.phase,
                to
            ));
        }

        log::trace!("{}: {} -> {}", self.method, self.phase, to);
        self.phase = to;
        Ok(())
    }
}

/// Replaces local-variable storage with static fields on the global type.
///
/// The rewriter itself holds no per-method state, so one instance can serve many methods,
/// including from several threads at once. Each call to [`LocalsToFieldsRewriter::rewrite`]
/// starts with an empty allocation map.
pub struct LocalsToFieldsRewriter<'a> {
    global: &'a GlobalType,
    names: &'a dyn NameGenerator,
    events: Option<&'a EventLog>,
}

impl<'a> LocalsToFieldsRewriter<'a> {
    /// Creates a rewriter that declares slots on `global` named by `names`.
    #[must_use]
    pub fn new(global: &'a GlobalType, names: &'a dyn NameGenerator) -> Self {
        LocalsToFieldsRewriter {
            global,
            names,
            events: None,
        }
    }

    /// Records slot allocations and rewritten instructions into `events`.
    #[must_use]
    pub fn with_events(mut self, events: &'a EventLog) -> Self {
        self.events = Some(events);
        self
    }

    /// Rewrites one normalized method body in place.
    ///
    /// `method` only labels logs and events. Instructions that do not access a local keep their
    /// opcode, operand and position. Locals that are declared but never accessed stay in the
    /// local table.
    ///
    /// The body is either fully rewritten or left unchanged: every instruction is classified
    /// and every slot resolved before the first instruction is modified.
    ///
    /// # Errors
    ///
    /// - [`crate::Error::ContractViolation`] if the body is not in normalized form or accesses
    ///   a local it does not declare. No slot is declared in that case.
    /// - A naming error from the generator, or [`crate::Error::DuplicateName`] or
    ///   [`crate::Error::RowsExhausted`] from the global type. Slots declared before the
    ///   failure stay on the global type.
    pub fn rewrite(&self, method: Token, body: &mut MethodBody) -> Result<RewriteOutcome> {
        let mut session = RewriteSession::new(method, self.global, self.names);
        session.advance(RewritePhase::Resolving)?;

        let mut accesses = Vec::new();
        for (index, instr) in body.instructions.iter().enumerate() {
            if let Some((access, id)) = classify(instr)? {
                if !body.declares(id) {
                    return Err(contract_violation!(
                        "{} - local {} is not declared by {}",
                        instr,
                        id,
                        method
                    ));
                }
                accesses.push((index, access, id));
            }
        }

        let mut edits = Vec::with_capacity(accesses.len());
        for (index, access, id) in accesses {
            let Some(local) = body.local(id) else {
                return Err(contract_violation!("{} - local {} vanished", method, id));
            };
            let slot = session.slots.resolve(local)?;
            edits.push(Edit {
                index,
                access,
                slot,
            });
        }

        for &id in session.slots.allocated() {
            if let (Some(events), Some(slot)) = (self.events, session.slots.slot(id)) {
                events
                    .record(EventKind::SlotAllocated)
                    .method(method)
                    .message(format!("{} -> {}", id, slot));
            }
        }

        let instructions_rewritten = edits.len();
        for edit in edits {
            let instr = &mut body.instructions[edit.index];
            let before = instr.code;
            instr.code = edit.access.to_static().code();
            instr.operand = Operand::Field(edit.slot);

            log::trace!("{}: {} (was {})", method, instr, before);
            if let Some(events) = self.events {
                events
                    .record(EventKind::InstructionRewritten)
                    .instruction(method, instr.offset)
                    .message(format!("{} -> {}", before, instr));
            }
        }

        session.advance(RewritePhase::Cleanup)?;
        let accessed: HashSet<LocalId> = session.slots.allocated().iter().copied().collect();
        let locals_removed = body.remove_locals(&accessed);
        if locals_removed > 0 {
            if let Some(events) = self.events {
                events
                    .record(EventKind::LocalsRemoved)
                    .method(method)
                    .message(format!(
                        "{} removed, {} kept",
                        locals_removed,
                        body.locals.len()
                    ));
            }
        }

        session.advance(RewritePhase::Idle)?;
        let slots_created = session
            .slots
            .allocated()
            .iter()
            .filter_map(|id| session.slots.slot(*id).cloned())
            .collect::<Vec<_>>();

        log::debug!(
            "{}: {} slots, {} instructions rewritten, {} locals removed",
            method,
            slots_created.len(),
            instructions_rewritten,
            locals_removed
        );

        Ok(RewriteOutcome {
            slots_created,
            instructions_rewritten,
            locals_removed,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        assembly::{Code, Instruction},
        metadata::signatures::{SignatureLocalVariable, TypeSignature},
        transform::names::SequentialNames,
        Error,
    };

    const METHOD: Token = Token(0x0600_0001);

    fn accesses_slot(instr: &Instruction, slot: &FieldRc) -> bool {
        matches!(&instr.operand, Operand::Field(field) if Arc::ptr_eq(field, slot))
    }

    #[test]
    fn test_phase_transitions() {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let mut session = RewriteSession::new(METHOD, &global, &names);

        assert!(session.advance(RewritePhase::Cleanup).is_err());
        session.advance(RewritePhase::Resolving).unwrap();
        assert!(session.advance(RewritePhase::Idle).is_err());
        session.advance(RewritePhase::Cleanup).unwrap();
        session.advance(RewritePhase::Idle).unwrap();
        assert_eq!(session.phase, RewritePhase::Idle);
    }

    #[test]
    fn test_rewrite_maps_each_access_kind() -> Result<()> {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let mut body = MethodBody::new();
        let a = body.add_typed_local(TypeSignature::I4);
        body.push(Instruction::stloc(a))
            .push(Instruction::ldloc(a))
            .push(Instruction::ldloca(a));

        let outcome = LocalsToFieldsRewriter::new(&global, &names).rewrite(METHOD, &mut body)?;

        let codes: Vec<Code> = body.instructions.iter().map(|i| i.code).collect();
        assert_eq!(codes, vec![Code::Stsfld, Code::Ldsfld, Code::Ldsflda]);
        assert_eq!(outcome.slots_created.len(), 1);
        assert_eq!(outcome.instructions_rewritten, 3);
        assert_eq!(outcome.locals_removed, 1);
        let slot = &outcome.slots_created[0];
        assert!(body.instructions.iter().all(|i| accesses_slot(i, slot)));
        Ok(())
    }

    #[test]
    fn test_contract_violation_leaves_everything_untouched() {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let mut body = MethodBody::new();
        let a = body.add_typed_local(TypeSignature::I4);
        body.push(Instruction::stloc(a))
            .push(Instruction::simple(Code::Ldloc0));
        let before = body.clone();

        let result = LocalsToFieldsRewriter::new(&global, &names).rewrite(METHOD, &mut body);
        assert!(matches!(result, Err(Error::ContractViolation { .. })));
        assert_eq!(body.instructions, before.instructions);
        assert_eq!(body.locals, before.locals);
        assert_eq!(global.field_count(), 0);
    }

    #[test]
    fn test_undeclared_local_is_a_contract_violation() {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let mut body = MethodBody::new();
        body.add_typed_local(TypeSignature::I4);
        body.push(Instruction::ldloc(LocalId::new(42)));

        let result = LocalsToFieldsRewriter::new(&global, &names).rewrite(METHOD, &mut body);
        assert!(matches!(result, Err(Error::ContractViolation { .. })));
    }

    #[test]
    fn test_events_are_recorded() -> Result<()> {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let events = EventLog::new();
        let mut body = MethodBody::new();
        let a = body.add_local(SignatureLocalVariable::new(TypeSignature::String));
        let b = body.add_typed_local(TypeSignature::R8);
        body.push(Instruction::ldloc(a))
            .push(Instruction::stloc(b))
            .push(Instruction::ldloc(b));

        LocalsToFieldsRewriter::new(&global, &names)
            .with_events(&events)
            .rewrite(METHOD, &mut body)?;

        assert_eq!(events.count_kind(EventKind::SlotAllocated), 2);
        assert_eq!(events.count_kind(EventKind::InstructionRewritten), 3);
        assert_eq!(events.count_kind(EventKind::LocalsRemoved), 1);
        let rewritten: Vec<_> = events
            .of_kind(EventKind::InstructionRewritten)
            .map(|e| e.offset)
            .collect();
        assert_eq!(rewritten, vec![Some(0), Some(1), Some(2)]);
        Ok(())
    }

    #[test]
    fn test_body_without_locals() -> Result<()> {
        let global = GlobalType::default();
        let names = SequentialNames::default();
        let mut body = MethodBody::new();
        body.push(Instruction::ldc_i4(3))
            .push(Instruction::simple(Code::Ret));
        let before = body.instructions.clone();

        let outcome = LocalsToFieldsRewriter::new(&global, &names).rewrite(METHOD, &mut body)?;
        assert_eq!(body.instructions, before);
        assert_eq!(outcome.instructions_rewritten, 0);
        assert!(outcome.slots_created.is_empty());
        Ok(())
    }
}
