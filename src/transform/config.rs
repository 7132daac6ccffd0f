//! Configuration of the locals-to-fields pass.

use crate::{
    metadata::globaltype::GlobalType,
    transform::names::{NameGenerator, RandomNames, SequentialNames},
};

/// How storage slots are named.
///
/// The default is [`NamingStrategy::Sequential`] with the `f_` prefix: the same input always
/// yields the same names, which keeps output reproducible and diffable. Choose
/// [`NamingStrategy::Random`] for names that carry no ordering information; a `None` seed makes
/// every run produce different names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingStrategy {
    /// `prefix` followed by `a`, `b`, …, `z`, `aa`, …
    Sequential {
        /// Prefix of every generated name
        prefix: String,
    },
    /// Random letters of a fixed length.
    Random {
        /// RNG seed; `None` seeds from the thread-local generator
        seed: Option<u64>,
        /// Number of characters per name
        length: usize,
    },
}

impl Default for NamingStrategy {
    fn default() -> Self {
        NamingStrategy::Sequential {
            prefix: "f_".to_string(),
        }
    }
}

impl NamingStrategy {
    /// Builds a generator that never returns a name already declared on `global`.
    #[must_use]
    pub fn build(&self, global: &GlobalType) -> Box<dyn NameGenerator> {
        let reserved = global.field_names();
        match self {
            NamingStrategy::Sequential { prefix } => {
                Box::new(SequentialNames::new(prefix.clone()).with_reserved(reserved))
            }
            NamingStrategy::Random { seed, length } => {
                Box::new(RandomNames::new(*seed, *length).with_reserved(reserved))
            }
        }
    }
}

/// Settings for [`crate::transform::LocalsToFieldsPass`].
#[derive(Debug, Clone)]
pub struct LocalsToFieldsConfig {
    /// How slots are named (default: sequential, `f_` prefix; see [`NamingStrategy`]).
    pub naming: NamingStrategy,

    /// Expand compact instruction forms before rewriting (default: true).
    ///
    /// Disable only when every body is already normalized; a compact local form reaching the
    /// rewriter is a contract violation.
    pub normalize: bool,

    /// Rewrite methods in parallel (default: true).
    pub parallel: bool,

    /// Abort the run on the first failing method (default: true).
    ///
    /// When false, a failing method is left as it was, reported, and the run continues.
    pub fail_fast: bool,
}

impl Default for LocalsToFieldsConfig {
    fn default() -> Self {
        Self {
            naming: NamingStrategy::default(),
            normalize: true,
            parallel: true,
            fail_fast: true,
        }
    }
}

impl LocalsToFieldsConfig {
    /// Sets the naming strategy.
    #[must_use]
    pub fn with_naming(mut self, naming: NamingStrategy) -> Self {
        self.naming = naming;
        self
    }

    /// Enables or disables macro expansion before the rewrite.
    #[must_use]
    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Enables or disables parallel processing.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Enables or disables aborting on the first failure.
    #[must_use]
    pub fn with_fail_fast(mut self, fail_fast: bool) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        metadata::{
            field::{Field, FieldAttributes},
            signatures::{SignatureField, TypeSignature},
            token::Token,
        },
        Result,
    };

    #[test]
    fn test_defaults() {
        let config = LocalsToFieldsConfig::default();
        assert!(config.normalize);
        assert!(config.parallel);
        assert!(config.fail_fast);
        assert_eq!(
            config.naming,
            NamingStrategy::Sequential {
                prefix: "f_".to_string()
            }
        );

        let config = config.with_parallel(false).with_fail_fast(false);
        assert!(!config.parallel);
        assert!(!config.fail_fast);
    }

    #[test]
    fn test_build_reserves_existing_names() -> Result<()> {
        let global = GlobalType::with_fields([Field {
            token: Token::from_parts(Token::FIELD_TABLE, 1),
            flags: FieldAttributes::PUBLIC | FieldAttributes::STATIC,
            name: "f_a".to_string(),
            signature: SignatureField {
                modifiers: Vec::new(),
                base: TypeSignature::I4,
            },
        }])?;

        let names = NamingStrategy::default().build(&global);
        assert_eq!(names.fresh_name()?, "f_b");
        Ok(())
    }
}
