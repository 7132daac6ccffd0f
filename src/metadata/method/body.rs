use std::{collections::HashSet, fmt};

use crate::{
    assembly::Instruction,
    metadata::{
        method::ExceptionHandler,
        signatures::{SignatureLocalVariable, TypeSignature},
        token::Token,
    },
};

/// Identity of a local variable within one method body.
///
/// Handed out by [`MethodBody::add_local`] and never reused by the same body, so it stays
/// valid when other locals are removed from the table. Two locals are the same entity iff
/// their ids are equal; names play no part, and most locals have none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalId(u32);

impl LocalId {
    /// Wraps a raw id.
    #[must_use]
    pub fn new(id: u32) -> Self {
        LocalId(id)
    }

    /// The raw id.
    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for LocalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "L#{}", self.0)
    }
}

/// A declared local variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local {
    /// Identity of this local
    pub id: LocalId,
    /// Debug name, if the PDB provided one
    pub name: Option<String>,
    /// Declared type
    pub signature: SignatureLocalVariable,
}

/// A method body in the shape the transform works on.
///
/// Holds the instructions, the declared local table and the exception handling clauses. The
/// position of a local in [`MethodBody::locals`] is its encoded index; use
/// [`MethodBody::local_index`] to recover it after the table has been pruned.
#[derive(Debug, Clone, Default)]
pub struct MethodBody {
    /// Maximum number of items on the operand stack
    pub max_stack: u16,
    /// Flag, indicating to call default constructor on all local variables
    pub init_locals: bool,
    /// Declared locals, in index order
    pub locals: Vec<Local>,
    /// The instruction stream
    pub instructions: Vec<Instruction>,
    /// A list of exception handlers this method has
    pub exception_handlers: Vec<ExceptionHandler>,
    next_local: u32,
}

impl MethodBody {
    /// Creates an empty body with `init_locals` set.
    #[must_use]
    pub fn new() -> Self {
        MethodBody {
            max_stack: 8,
            init_locals: true,
            ..Default::default()
        }
    }

    /// Declares an unnamed local of the given signature at the end of the table.
    pub fn add_local(&mut self, signature: SignatureLocalVariable) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        self.locals.push(Local {
            id,
            name: None,
            signature,
        });
        id
    }

    /// Declares an unnamed local of a plain type.
    pub fn add_typed_local(&mut self, ty: TypeSignature) -> LocalId {
        self.add_local(SignatureLocalVariable::new(ty))
    }

    /// Declares a named local.
    pub fn add_named_local(
        &mut self,
        name: impl Into<String>,
        signature: SignatureLocalVariable,
    ) -> LocalId {
        let id = self.add_local(signature);
        if let Some(local) = self.locals.last_mut() {
            local.name = Some(name.into());
        }
        id
    }

    /// Appends an instruction, assigning it the next sequential offset.
    pub fn push(&mut self, instruction: Instruction) -> &mut Self {
        let offset = u32::try_from(self.instructions.len()).unwrap_or(u32::MAX);
        self.instructions.push(instruction.at(offset));
        self
    }

    /// Looks up a declared local by id.
    #[must_use]
    pub fn local(&self, id: LocalId) -> Option<&Local> {
        self.locals.iter().find(|local| local.id == id)
    }

    /// Current table index of a declared local.
    #[must_use]
    pub fn local_index(&self, id: LocalId) -> Option<usize> {
        self.locals.iter().position(|local| local.id == id)
    }

    /// Returns `true` if `id` is in the declared-local table.
    #[must_use]
    pub fn declares(&self, id: LocalId) -> bool {
        self.local(id).is_some()
    }

    /// Returns `true` if any instruction still carries a local handle.
    #[must_use]
    pub fn references_locals(&self) -> bool {
        self.instructions.iter().any(Instruction::references_local)
    }

    /// Removes the given locals from the table, keeping the order of the rest.
    ///
    /// Returns how many were removed.
    pub fn remove_locals(&mut self, ids: &HashSet<LocalId>) -> usize {
        let before = self.locals.len();
        self.locals.retain(|local| !ids.contains(&local.id));
        before - self.locals.len()
    }
}

/// A method definition as seen by the pass driver.
#[derive(Debug, Clone)]
pub struct Method {
    /// `MethodDef` token
    pub token: Token,
    /// Method name
    pub name: String,
    /// Number of arguments, including `this` for instance methods
    pub parameter_count: u16,
    /// The body; `None` for abstract, extern and runtime-implemented methods
    pub body: Option<MethodBody>,
}

impl Method {
    /// Returns `true` if the method has IL to rewrite.
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }
}
