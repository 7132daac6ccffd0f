//! Macro expansion of compact CIL instruction forms.
//!
//! The IL stream encodes the most common operations in compact forms: `ldloc.0` implies its
//! local, `stloc.s 7` indexes it with a byte, `ldc.i4.5` carries its constant in the opcode and
//! `br.s` holds a one-byte displacement. [`simplify_macros`] rewrites every such form into the
//! single canonical opcode of its family with an explicit operand, and replaces local indices
//! with the [`LocalId`] handle of the local they designate.
//!
//! After expansion the only local accesses left are `ldloc`, `ldloca` and `stloc` with an
//! [`Operand::Local`] operand, which is the input shape
//! [`crate::transform::LocalsToFieldsRewriter`] requires.
//!
//! The expansion is idempotent and does not move instructions or change their offsets.

use crate::{
    assembly::{Code, Immediate, Instruction, Operand},
    metadata::method::{LocalId, MethodBody},
    Result,
};

/// Expands every compact instruction form in `body` into its canonical form.
///
/// `parameter_count` is the number of arguments of the method including `this`, and bounds
/// the implied argument indices of `ldarg.N`.
///
/// The body is only modified when the whole stream expands successfully.
///
/// # Errors
///
/// Returns [`crate::Error::Malformed`] if an instruction references a local or argument that
/// does not exist, or carries an operand its opcode cannot have.
pub fn simplify_macros(body: &mut MethodBody, parameter_count: u16) -> Result<usize> {
    let locals: Vec<LocalId> = body.locals.iter().map(|local| local.id).collect();

    let mut expansions = Vec::new();
    for (index, instr) in body.instructions.iter().enumerate() {
        if let Some(expanded) = expand(instr, &locals, parameter_count)? {
            expansions.push((index, expanded));
        }
    }

    let count = expansions.len();
    for (index, (code, operand)) in expansions {
        let instr = &mut body.instructions[index];
        instr.code = code;
        instr.operand = operand;
    }

    Ok(count)
}

/// Canonical `(code, operand)` for one instruction, `None` if it already is canonical.
fn expand(
    instr: &Instruction,
    locals: &[LocalId],
    parameter_count: u16,
) -> Result<Option<(Code, Operand)>> {
    let expanded = match instr.code {
        Code::Ldloc0 => (Code::Ldloc, local_operand(instr, locals, 0)?),
        Code::Ldloc1 => (Code::Ldloc, local_operand(instr, locals, 1)?),
        Code::Ldloc2 => (Code::Ldloc, local_operand(instr, locals, 2)?),
        Code::Ldloc3 => (Code::Ldloc, local_operand(instr, locals, 3)?),
        Code::Stloc0 => (Code::Stloc, local_operand(instr, locals, 0)?),
        Code::Stloc1 => (Code::Stloc, local_operand(instr, locals, 1)?),
        Code::Stloc2 => (Code::Stloc, local_operand(instr, locals, 2)?),
        Code::Stloc3 => (Code::Stloc, local_operand(instr, locals, 3)?),

        Code::LdlocS | Code::Ldloc => (Code::Ldloc, indexed_local(instr, locals)?),
        Code::LdlocaS | Code::Ldloca => (Code::Ldloca, indexed_local(instr, locals)?),
        Code::StlocS | Code::Stloc => (Code::Stloc, indexed_local(instr, locals)?),

        Code::Ldarg0 => (Code::Ldarg, argument_operand(instr, parameter_count, 0)?),
        Code::Ldarg1 => (Code::Ldarg, argument_operand(instr, parameter_count, 1)?),
        Code::Ldarg2 => (Code::Ldarg, argument_operand(instr, parameter_count, 2)?),
        Code::Ldarg3 => (Code::Ldarg, argument_operand(instr, parameter_count, 3)?),
        Code::LdargS => (Code::Ldarg, indexed_argument(instr, parameter_count)?),
        Code::LdargaS => (Code::Ldarga, indexed_argument(instr, parameter_count)?),
        Code::StargS => (Code::Starg, indexed_argument(instr, parameter_count)?),

        Code::LdcI4M1 => (Code::LdcI4, int32(-1)),
        Code::LdcI40 => (Code::LdcI4, int32(0)),
        Code::LdcI41 => (Code::LdcI4, int32(1)),
        Code::LdcI42 => (Code::LdcI4, int32(2)),
        Code::LdcI43 => (Code::LdcI4, int32(3)),
        Code::LdcI44 => (Code::LdcI4, int32(4)),
        Code::LdcI45 => (Code::LdcI4, int32(5)),
        Code::LdcI46 => (Code::LdcI4, int32(6)),
        Code::LdcI47 => (Code::LdcI4, int32(7)),
        Code::LdcI48 => (Code::LdcI4, int32(8)),
        Code::LdcI4S => match instr.operand {
            Operand::Immediate(Immediate::Int8(value)) => (Code::LdcI4, int32(i32::from(value))),
            _ => {
                return Err(malformed_error!(
                    "{} - ldc.i4.s expects an 8-bit immediate",
                    instr
                ))
            }
        },

        Code::BrS => (Code::Br, instr.operand.clone()),
        Code::BrfalseS => (Code::Brfalse, instr.operand.clone()),
        Code::BrtrueS => (Code::Brtrue, instr.operand.clone()),
        Code::BeqS => (Code::Beq, instr.operand.clone()),
        Code::BgeS => (Code::Bge, instr.operand.clone()),
        Code::BgtS => (Code::Bgt, instr.operand.clone()),
        Code::BleS => (Code::Ble, instr.operand.clone()),
        Code::BltS => (Code::Blt, instr.operand.clone()),
        Code::BneUnS => (Code::BneUn, instr.operand.clone()),
        Code::LeaveS => (Code::Leave, instr.operand.clone()),

        _ => return Ok(None),
    };

    if expanded.0 == instr.code && expanded.1 == instr.operand {
        return Ok(None);
    }
    Ok(Some(expanded))
}

fn int32(value: i32) -> Operand {
    Operand::Immediate(Immediate::Int32(value))
}

/// Handle of the local at `index`, for forms that imply the index.
fn local_operand(instr: &Instruction, locals: &[LocalId], index: usize) -> Result<Operand> {
    match locals.get(index) {
        Some(id) => Ok(Operand::Local(*id)),
        None => Err(malformed_error!(
            "{} - local {} is not declared ({} locals)",
            instr,
            index,
            locals.len()
        )),
    }
}

/// Handle of the local an indexed form designates. Already resolved handles pass through.
fn indexed_local(instr: &Instruction, locals: &[LocalId]) -> Result<Operand> {
    match instr.operand {
        Operand::LocalIndex(index) => local_operand(instr, locals, usize::from(index)),
        Operand::Local(id) => Ok(Operand::Local(id)),
        _ => Err(malformed_error!("{} - expected a local operand", instr)),
    }
}

fn argument_operand(instr: &Instruction, parameter_count: u16, index: u16) -> Result<Operand> {
    if index < parameter_count {
        Ok(Operand::Argument(index))
    } else {
        Err(malformed_error!(
            "{} - argument {} is out of range ({} parameters)",
            instr,
            index,
            parameter_count
        ))
    }
}

fn indexed_argument(instr: &Instruction, parameter_count: u16) -> Result<Operand> {
    match instr.operand {
        Operand::Argument(index) => argument_operand(instr, parameter_count, index),
        _ => Err(malformed_error!("{} - expected an argument operand", instr)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{metadata::signatures::TypeSignature, Error};

    fn body_with_locals(count: usize) -> (MethodBody, Vec<LocalId>) {
        let mut body = MethodBody::new();
        let ids = (0..count)
            .map(|_| body.add_typed_local(TypeSignature::I4))
            .collect();
        (body, ids)
    }

    #[test]
    fn test_expands_implied_locals() -> Result<()> {
        let (mut body, ids) = body_with_locals(4);
        body.push(Instruction::simple(Code::Ldloc0))
            .push(Instruction::simple(Code::Stloc3))
            .push(Instruction::new(Code::LdlocaS, Operand::LocalIndex(2)))
            .push(Instruction::new(Code::StlocS, Operand::LocalIndex(1)))
            .push(Instruction::simple(Code::Ret));

        assert_eq!(simplify_macros(&mut body, 0)?, 4);
        assert_eq!(body.instructions[0], Instruction::ldloc(ids[0]).at(0));
        assert_eq!(body.instructions[1], Instruction::stloc(ids[3]).at(1));
        assert_eq!(body.instructions[2], Instruction::ldloca(ids[2]).at(2));
        assert_eq!(body.instructions[3], Instruction::stloc(ids[1]).at(3));
        assert_eq!(body.instructions[4].code, Code::Ret);
        Ok(())
    }

    #[test]
    fn test_index_follows_table_position() -> Result<()> {
        let (mut body, ids) = body_with_locals(3);
        body.remove_locals(&[ids[0]].into_iter().collect());
        body.push(Instruction::simple(Code::Ldloc0));

        simplify_macros(&mut body, 0)?;
        assert_eq!(body.instructions[0].operand, Operand::Local(ids[1]));
        Ok(())
    }

    #[test]
    fn test_expands_constants_arguments_and_branches() -> Result<()> {
        let (mut body, _) = body_with_locals(0);
        body.push(Instruction::simple(Code::Ldarg1))
            .push(Instruction::new(Code::LdargaS, Operand::Argument(0)))
            .push(Instruction::simple(Code::LdcI4M1))
            .push(Instruction::new(
                Code::LdcI4S,
                Operand::Immediate(Immediate::Int8(-100)),
            ))
            .push(Instruction::new(Code::BrtrueS, Operand::Target(0)))
            .push(Instruction::new(Code::LeaveS, Operand::Target(5)));

        simplify_macros(&mut body, 2)?;
        let codes: Vec<Code> = body.instructions.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![
                Code::Ldarg,
                Code::Ldarga,
                Code::LdcI4,
                Code::LdcI4,
                Code::Brtrue,
                Code::Leave
            ]
        );
        assert_eq!(body.instructions[0].operand, Operand::Argument(1));
        assert_eq!(body.instructions[2].operand, int32(-1));
        assert_eq!(body.instructions[3].operand, int32(-100));
        assert_eq!(body.instructions[4].operand, Operand::Target(0));
        Ok(())
    }

    #[test]
    fn test_idempotent() -> Result<()> {
        let (mut body, _) = body_with_locals(2);
        body.push(Instruction::simple(Code::Ldloc1))
            .push(Instruction::simple(Code::LdcI42))
            .push(Instruction::simple(Code::Stloc0));

        assert_eq!(simplify_macros(&mut body, 0)?, 3);
        let once = body.instructions.clone();
        assert_eq!(simplify_macros(&mut body, 0)?, 0);
        assert_eq!(body.instructions, once);
        Ok(())
    }

    #[test]
    fn test_out_of_range_local_leaves_body_untouched() {
        let (mut body, _) = body_with_locals(1);
        body.push(Instruction::simple(Code::Ldloc0))
            .push(Instruction::simple(Code::Stloc2));
        let before = body.instructions.clone();

        let result = simplify_macros(&mut body, 0);
        assert!(matches!(result, Err(Error::Malformed { .. })));
        assert_eq!(body.instructions, before);
    }

    #[test]
    fn test_out_of_range_argument() {
        let (mut body, _) = body_with_locals(0);
        body.push(Instruction::simple(Code::Ldarg3));
        assert!(matches!(
            simplify_macros(&mut body, 3),
            Err(Error::Malformed { .. })
        ));
    }
}
