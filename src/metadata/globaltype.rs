//! The module's global type (`<Module>`), destination of every storage slot.
//!
//! Every method rewritten in a run declares its slots here, possibly from several threads at
//! once. Fields are kept in a lock-free [`SkipMap`] ordered by token, next to a [`DashMap`]
//! name index whose entry API makes "insert unless the name is taken" a single atomic step.
//! Tokens come from an atomic row counter that refuses to go past the 24-bit row space, and a
//! token already present in the map is rejected rather than replaced, so two concurrent
//! registrations can neither lose an update nor end up with the same name or token.

use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

use crossbeam_skiplist::SkipMap;
use dashmap::{mapref::entry::Entry, DashMap};

use crate::{
    metadata::{
        field::{Field, FieldAttributes, FieldRc},
        signatures::SignatureField,
        token::Token,
    },
    Error, Result,
};

/// A map that holds the mapping of Token to declared `Field`
pub type FieldMap = SkipMap<Token, FieldRc>;

/// The `<Module>` type of an assembly.
pub struct GlobalType {
    /// The TypeDef token of `<Module>`
    pub token: Token,
    fields: FieldMap,
    names: DashMap<String, Token>,
    next_row: AtomicU32,
}

impl Default for GlobalType {
    fn default() -> Self {
        Self::new(1)
    }
}

impl GlobalType {
    /// Name of the global type.
    pub const NAME: &'static str = "<Module>";

    /// Creates an empty global type whose first new field gets row `first_field_row`.
    ///
    /// Pass the row after the last field already present in the module so new tokens never
    /// overlap existing ones.
    #[must_use]
    pub fn new(first_field_row: u32) -> Self {
        GlobalType {
            token: Token::new(0x0200_0001),
            fields: SkipMap::new(),
            names: DashMap::new(),
            next_row: AtomicU32::new(first_field_row.max(1)),
        }
    }

    /// Creates a global type that already declares `fields`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] or [`Error::DuplicateToken`] if two of the fields share
    /// a name or a token, and [`Error::Malformed`] for a field on the null row.
    pub fn with_fields(fields: impl IntoIterator<Item = Field>) -> Result<Self> {
        let global = Self::new(1);
        let mut last_row = 0;
        for field in fields {
            last_row = last_row.max(field.token.row());
            global.add_field(Arc::new(field))?;
        }
        global
            .next_row
            .fetch_max(last_row.saturating_add(1), Ordering::AcqRel);
        Ok(global)
    }

    /// Reserves the next unused `Field` row.
    ///
    /// The counter stops one past [`Token::MAX_ROW`] so rows never wrap around to the null row.
    fn next_token(&self) -> Result<Token> {
        let row = self
            .next_row
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |row| {
                (row <= Token::MAX_ROW).then_some(row + 1)
            })
            .map_err(|_| Error::RowsExhausted)?;
        Ok(Token::from_parts(Token::FIELD_TABLE, row))
    }

    /// Declares a new field named `name` and assigns it the next free token.
    ///
    /// The row is only reserved once the name is known to be free, so a rejected name leaves
    /// no gap in the `Field` table. Safe to call concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if the name is taken, [`Error::RowsExhausted`] if no
    /// row is left, and [`Error::DuplicateToken`] if the reserved row is already occupied by a
    /// field added through [`GlobalType::add_field`].
    pub fn declare(
        &self,
        name: String,
        flags: FieldAttributes,
        signature: SignatureField,
    ) -> Result<FieldRc> {
        match self.names.entry(name) {
            Entry::Occupied(entry) => Err(Error::DuplicateName(entry.key().clone())),
            Entry::Vacant(slot) => {
                let field = Arc::new(Field {
                    token: self.next_token()?,
                    flags,
                    name: slot.key().clone(),
                    signature,
                });
                self.claim_token(&field)?;
                slot.insert(field.token);
                Ok(field)
            }
        }
    }

    /// Declares an already built `field` on the global type.
    ///
    /// Safe to call concurrently; the name check and the insertion happen atomically.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DuplicateName`] if a field with the same name is already declared,
    /// [`Error::DuplicateToken`] if its token is taken, and [`Error::Malformed`] for the null
    /// row.
    pub fn add_field(&self, field: FieldRc) -> Result<()> {
        if field.token.row() == 0 {
            return Err(malformed_error!("Field '{}' has a null row", field.name));
        }

        match self.names.entry(field.name.clone()) {
            Entry::Occupied(_) => Err(Error::DuplicateName(field.name.clone())),
            Entry::Vacant(slot) => {
                self.claim_token(&field)?;
                slot.insert(field.token);
                Ok(())
            }
        }
    }

    /// Inserts `field` under its token unless another field already holds it.
    ///
    /// Callers hold the name entry, so a rejected field never becomes visible by name.
    fn claim_token(&self, field: &FieldRc) -> Result<()> {
        let entry = self.fields.get_or_insert(field.token, field.clone());
        if Arc::ptr_eq(entry.value(), field) {
            Ok(())
        } else {
            Err(Error::DuplicateToken(field.token))
        }
    }

    /// Number of declared fields.
    #[must_use]
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` if a field with `name` is declared.
    #[must_use]
    pub fn contains_name(&self, name: &str) -> bool {
        self.names.contains_key(name)
    }

    /// Looks up a field by token.
    #[must_use]
    pub fn field(&self, token: Token) -> Option<FieldRc> {
        self.fields.get(&token).map(|entry| entry.value().clone())
    }

    /// Looks up a field by name.
    #[must_use]
    pub fn field_by_name(&self, name: &str) -> Option<FieldRc> {
        let token = *self.names.get(name)?;
        self.field(token)
    }

    /// All declared fields, ordered by token.
    #[must_use]
    pub fn fields(&self) -> Vec<FieldRc> {
        self.fields
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// Names of all declared fields, in no particular order.
    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.names.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::metadata::signatures::TypeSignature;

    fn declare(global: &GlobalType, name: &str) -> Result<FieldRc> {
        global.declare(
            name.to_string(),
            FieldAttributes::PUBLIC | FieldAttributes::STATIC,
            SignatureField {
                modifiers: Vec::new(),
                base: TypeSignature::I4,
            },
        )
    }

    fn existing(row: u32, name: &str) -> Field {
        Field {
            token: Token::from_parts(Token::FIELD_TABLE, row),
            flags: FieldAttributes::PRIVATE | FieldAttributes::STATIC,
            name: name.to_string(),
            signature: SignatureField::default(),
        }
    }

    #[test]
    fn test_add_and_lookup() -> Result<()> {
        let global = GlobalType::default();
        let a = declare(&global, "a")?;

        assert_eq!(global.field_count(), 1);
        assert!(global.contains_name("a"));
        assert!(Arc::ptr_eq(&global.field(a.token).unwrap(), &a));
        assert!(Arc::ptr_eq(&global.field_by_name("a").unwrap(), &a));
        assert!(global.field_by_name("b").is_none());
        Ok(())
    }

    #[test]
    fn test_duplicate_name_rejected() -> Result<()> {
        let global = GlobalType::default();
        declare(&global, "dup")?;
        let result = declare(&global, "dup");
        assert!(matches!(result, Err(Error::DuplicateName(name)) if name == "dup"));
        assert_eq!(global.field_count(), 1);

        // The rejected name did not consume a row.
        assert_eq!(declare(&global, "next")?.token.row(), 2);
        Ok(())
    }

    #[test]
    fn test_with_fields_continues_rows() -> Result<()> {
        let global = GlobalType::with_fields([existing(5, "existing")])?;
        assert_eq!(global.next_token()?.row(), 6);
        assert_eq!(global.field_names(), vec!["existing".to_string()]);
        Ok(())
    }

    #[test]
    fn test_row_space_is_never_wrapped() -> Result<()> {
        let global =
            GlobalType::with_fields([existing(1, "keep"), existing(Token::MAX_ROW - 1, "last")])?;

        let top = declare(&global, "top")?;
        assert_eq!(top.token.row(), Token::MAX_ROW);

        assert!(matches!(declare(&global, "over"), Err(Error::RowsExhausted)));
        assert!(matches!(declare(&global, "again"), Err(Error::RowsExhausted)));
        assert!(!global.contains_name("over"));

        assert_eq!(global.field_count(), 3);
        let keep = global.field_by_name("keep").unwrap();
        assert_eq!(keep.name, "keep");
        assert_eq!(keep.token.row(), 1);
        Ok(())
    }

    #[test]
    fn test_taken_token_is_not_replaced() -> Result<()> {
        let global = GlobalType::with_fields([existing(3, "first")])?;

        let result = global.add_field(Arc::new(existing(3, "second")));
        assert!(matches!(result, Err(Error::DuplicateToken(token)) if token.row() == 3));
        assert!(!global.contains_name("second"));
        assert_eq!(global.field(Token::from_parts(Token::FIELD_TABLE, 3)).unwrap().name, "first");

        let null = global.add_field(Arc::new(existing(0, "null")));
        assert!(matches!(null, Err(Error::Malformed { .. })));
        assert_eq!(global.field_count(), 1);
        Ok(())
    }

    #[test]
    fn test_concurrent_registration() {
        let global = Arc::new(GlobalType::default());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let global = Arc::clone(&global);
                thread::spawn(move || {
                    for i in 0..50 {
                        declare(&global, &format!("t{t}_{i}")).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let fields = global.fields();
        assert_eq!(fields.len(), 400);
        let mut rows: Vec<u32> = fields.iter().map(|f| f.token.row()).collect();
        rows.dedup();
        assert_eq!(rows.len(), 400);
        assert_eq!(rows.first(), Some(&1));
        assert_eq!(rows.last(), Some(&400));
    }
}
