//! Collision-free names for storage slots.
//!
//! The rewriter asks a [`NameGenerator`] for one name per slot. Generators are shared by every
//! method processed in a run, possibly from several threads, and must never hand out the same
//! name twice or a name that is already declared on the global type.

use std::{
    collections::HashSet,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Mutex,
    },
};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{Error, Result};

/// Source of fresh field names.
pub trait NameGenerator: Send + Sync {
    /// Returns a name that was never returned before and is not reserved.
    ///
    /// # Errors
    ///
    /// Returns an error if no fresh name can be produced. The caller treats this as fatal
    /// for the method it is rewriting.
    fn fresh_name(&self) -> Result<String>;
}

/// Sequential names: `f_a`, `f_b`, …, `f_z`, `f_aa`, `f_ab`, …
///
/// Backed by an atomic counter, so concurrent callers never observe the same index.
#[derive(Debug)]
pub struct SequentialNames {
    prefix: String,
    counter: AtomicUsize,
    reserved: HashSet<String>,
}

impl Default for SequentialNames {
    fn default() -> Self {
        Self::new("f_")
    }
}

impl SequentialNames {
    /// Creates a generator producing `prefix` followed by a lowercase sequence.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        SequentialNames {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
            reserved: HashSet::new(),
        }
    }

    /// Skips every name in `names` when generating.
    #[must_use]
    pub fn with_reserved(mut self, names: impl IntoIterator<Item = String>) -> Self {
        self.reserved.extend(names);
        self
    }

    /// Maps 0 → `a`, 25 → `z`, 26 → `aa`, 27 → `ab`, …
    #[must_use]
    pub fn index_to_name(mut index: usize) -> String {
        let mut result = String::new();
        loop {
            let remainder = index % 26;
            result.insert(0, (b'a' + remainder as u8) as char);
            if index < 26 {
                break;
            }
            index = index / 26 - 1;
        }
        result
    }
}

impl NameGenerator for SequentialNames {
    fn fresh_name(&self) -> Result<String> {
        loop {
            let index = self.counter.fetch_add(1, Ordering::Relaxed);
            if index == usize::MAX {
                return Err(Error::NameExhausted(index));
            }
            let name = format!("{}{}", self.prefix, Self::index_to_name(index));
            if !self.reserved.contains(&name) {
                return Ok(name);
            }
        }
    }
}

/// Default alphabet of [`RandomNames`].
pub const DEFAULT_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

struct RandomState {
    rng: StdRng,
    issued: HashSet<String>,
}

/// Random names of a fixed length drawn from an alphabet.
///
/// The RNG and the set of issued names sit behind one mutex. A seeded generator produces the
/// same sequence for the same call order, which makes single-threaded runs reproducible.
pub struct RandomNames {
    state: Mutex<RandomState>,
    alphabet: Vec<char>,
    length: usize,
    max_attempts: usize,
}

impl RandomNames {
    /// Creates a generator of `length`-character names over [`DEFAULT_ALPHABET`].
    ///
    /// With `seed == None` the RNG is seeded from the thread-local generator.
    #[must_use]
    pub fn new(seed: Option<u64>, length: usize) -> Self {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        RandomNames {
            state: Mutex::new(RandomState {
                rng: StdRng::seed_from_u64(seed),
                issued: HashSet::new(),
            }),
            alphabet: DEFAULT_ALPHABET.chars().collect(),
            length: length.max(1),
            max_attempts: 64,
        }
    }

    /// Replaces the alphabet. An empty alphabet falls back to [`DEFAULT_ALPHABET`].
    #[must_use]
    pub fn with_alphabet(mut self, alphabet: &str) -> Self {
        let chars: Vec<char> = alphabet.chars().collect();
        if !chars.is_empty() {
            self.alphabet = chars;
        }
        self
    }

    /// Number of draws before giving up with [`Error::NameExhausted`].
    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: usize) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Never produces any name in `names`.
    #[must_use]
    pub fn with_reserved(self, names: impl IntoIterator<Item = String>) -> Self {
        if let Ok(mut state) = self.state.lock() {
            state.issued.extend(names);
        }
        self
    }
}

impl NameGenerator for RandomNames {
    fn fresh_name(&self) -> Result<String> {
        let mut state = lock!(self.state)?;
        for _ in 0..self.max_attempts {
            let name: String = (0..self.length)
                .map(|_| self.alphabet[state.rng.random_range(0..self.alphabet.len())])
                .collect();
            if state.issued.insert(name.clone()) {
                return Ok(name);
            }
        }
        Err(Error::NameExhausted(self.max_attempts))
    }
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, thread};

    use super::*;

    #[test]
    fn test_index_to_name() {
        assert_eq!(SequentialNames::index_to_name(0), "a");
        assert_eq!(SequentialNames::index_to_name(25), "z");
        assert_eq!(SequentialNames::index_to_name(26), "aa");
        assert_eq!(SequentialNames::index_to_name(27), "ab");
        assert_eq!(SequentialNames::index_to_name(701), "zz");
        assert_eq!(SequentialNames::index_to_name(702), "aaa");
    }

    #[test]
    fn test_sequential_skips_reserved() -> Result<()> {
        let names = SequentialNames::default().with_reserved(["f_b".to_string()]);
        assert_eq!(names.fresh_name()?, "f_a");
        assert_eq!(names.fresh_name()?, "f_c");
        Ok(())
    }

    #[test]
    fn test_sequential_unique_across_threads() {
        let names = Arc::new(SequentialNames::new("s"));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let names = Arc::clone(&names);
                thread::spawn(move || {
                    (0..100)
                        .map(|_| names.fresh_name().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            for name in handle.join().unwrap() {
                assert!(all.insert(name));
            }
        }
        assert_eq!(all.len(), 400);
    }

    #[test]
    fn test_random_seeded_is_reproducible() -> Result<()> {
        let a = RandomNames::new(Some(7), 12);
        let b = RandomNames::new(Some(7), 12);
        for _ in 0..10 {
            let name = a.fresh_name()?;
            assert_eq!(name.chars().count(), 12);
            assert_eq!(name, b.fresh_name()?);
        }
        Ok(())
    }

    #[test]
    fn test_random_exhaustion() {
        let names = RandomNames::new(Some(1), 1)
            .with_alphabet("xy")
            .with_max_attempts(32);
        let first = names.fresh_name().unwrap();
        let second = names.fresh_name().unwrap();
        assert_ne!(first, second);
        assert!(matches!(names.fresh_name(), Err(Error::NameExhausted(32))));
    }

    #[test]
    fn test_random_respects_reserved() {
        let names = RandomNames::new(Some(3), 1)
            .with_alphabet("q")
            .with_reserved(["q".to_string()]);
        assert!(matches!(names.fresh_name(), Err(Error::NameExhausted(_))));
    }
}
