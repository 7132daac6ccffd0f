use std::collections::HashMap;

use crate::{
    metadata::{
        field::{FieldAttributes, FieldRc},
        globaltype::GlobalType,
        method::{Local, LocalId},
        signatures::SignatureField,
    },
    transform::names::NameGenerator,
    Result,
};

/// Maps the locals of one method to static fields on the global type.
///
/// The first [`SlotAllocator::resolve`] for a local declares a new `public static` field with
/// a fresh name and the local's declared type; every later call for the same local returns
/// that same field. The cache lives as long as the allocator, which covers exactly one method,
/// so two methods never share a slot even if their locals look alike.
pub struct SlotAllocator<'a> {
    global: &'a GlobalType,
    names: &'a dyn NameGenerator,
    slots: HashMap<LocalId, FieldRc>,
    order: Vec<LocalId>,
}

impl<'a> SlotAllocator<'a> {
    /// Creates an allocator with an empty cache.
    #[must_use]
    pub fn new(global: &'a GlobalType, names: &'a dyn NameGenerator) -> Self {
        SlotAllocator {
            global,
            names,
            slots: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Returns the slot of `local`, declaring it on first use.
    ///
    /// # Errors
    ///
    /// Propagates naming failures from the generator, and [`crate::Error::DuplicateName`] or
    /// [`crate::Error::RowsExhausted`] from the global type. Nothing is cached when an error is
    /// returned.
    pub fn resolve(&mut self, local: &Local) -> Result<FieldRc> {
        if let Some(field) = self.slots.get(&local.id) {
            return Ok(field.clone());
        }

        let name = self.names.fresh_name()?;
        let field = self.global.declare(
            name,
            FieldAttributes::PUBLIC | FieldAttributes::STATIC,
            SignatureField::from_local(&local.signature),
        )?;

        log::trace!("{} -> {} ({})", local.id, field.name, field.token);
        self.slots.insert(local.id, field.clone());
        self.order.push(local.id);
        Ok(field)
    }

    /// Locals that have a slot, in allocation order.
    #[must_use]
    pub fn allocated(&self) -> &[LocalId] {
        &self.order
    }

    /// The slot of `id`, if one was allocated.
    #[must_use]
    pub fn slot(&self, id: LocalId) -> Option<&FieldRc> {
        self.slots.get(&id)
    }

    /// Number of slots allocated so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns `true` if no slot was allocated.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
