//! Named auto-incrementing sequences for unique attribute values
//!
//! An explicit, injectable counter store. Parallel test workers each own their
//! own `Sequences` instance; sharing one across workers would collide on
//! uniqueness, so partitioning is the caller's responsibility.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use serde_json::Value as JsonValue;

use crate::{TestError, TestResult};

type Template = Box<dyn Fn(u64) -> JsonValue + Send + Sync>;

struct SequenceState {
    counter: u64,
    template: Template,
}

/// Store of named sequences, each mapping a counter to a value
#[derive(Default)]
pub struct Sequences {
    entries: Mutex<HashMap<String, SequenceState>>,
}

impl Sequences {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the store.
    ///
    /// # Panics
    /// Panics if the lock is poisoned.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, SequenceState>> {
        self.entries.lock().unwrap()
    }

    /// Bind a named sequence to a template function
    ///
    /// Re-registering a name replaces its template and resets its counter.
    pub fn register<F>(&self, name: &str, template: F)
    where
        F: Fn(u64) -> JsonValue + Send + Sync + 'static,
    {
        self.entries().insert(
            name.to_string(),
            SequenceState {
                counter: 0,
                template: Box::new(template),
            },
        );
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.entries().contains_key(name)
    }

    /// Increment the named counter (first call observes 1) and apply the
    /// template to the new value
    pub fn next(&self, name: &str) -> TestResult<JsonValue> {
        let mut entries = self.entries();
        let state = entries
            .get_mut(name)
            .ok_or_else(|| TestError::UnknownSequence(name.to_string()))?;
        state.counter += 1;
        Ok((state.template)(state.counter))
    }

    /// `next` for string templates; non-string values render via to_string
    pub fn next_string(&self, name: &str) -> TestResult<String> {
        let value = self.next(name)?;
        Ok(match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        })
    }

    /// Set a named counter back to its initial state
    pub fn reset(&self, name: &str) -> TestResult<()> {
        let mut entries = self.entries();
        let state = entries
            .get_mut(name)
            .ok_or_else(|| TestError::UnknownSequence(name.to_string()))?;
        state.counter = 0;
        Ok(())
    }

    /// Set every counter back to its initial state
    pub fn reset_all(&self) {
        for state in self.entries().values_mut() {
            state.counter = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sequence_counts_from_one() {
        let sequences = Sequences::new();
        sequences.register("email", |n| json!(format!("my-{}@email.com", n)));

        let values: Vec<String> = (0..4)
            .map(|_| sequences.next_string("email").unwrap())
            .collect();
        assert_eq!(
            values,
            vec![
                "my-1@email.com",
                "my-2@email.com",
                "my-3@email.com",
                "my-4@email.com"
            ]
        );
    }

    #[test]
    fn test_counters_are_independent_per_name() {
        let sequences = Sequences::new();
        sequences.register("email", |n| json!(format!("my-{}@email.com", n)));
        sequences.register("username", |n| json!(format!("user{}", n)));

        sequences.next("email").unwrap();
        sequences.next("email").unwrap();
        assert_eq!(sequences.next_string("username").unwrap(), "user1");
        assert_eq!(sequences.next_string("email").unwrap(), "my-3@email.com");
    }

    #[test]
    fn test_reset_returns_to_initial_state() {
        let sequences = Sequences::new();
        sequences.register("email", |n| json!(format!("my-{}@email.com", n)));

        sequences.next("email").unwrap();
        sequences.next("email").unwrap();
        sequences.reset("email").unwrap();
        assert_eq!(sequences.next_string("email").unwrap(), "my-1@email.com");
    }

    #[test]
    fn test_unknown_sequence_fails_fast() {
        let sequences = Sequences::new();
        let err = sequences.next("missing").unwrap_err();
        assert!(matches!(err, TestError::UnknownSequence(name) if name == "missing"));

        let err = sequences.reset("missing").unwrap_err();
        assert!(matches!(err, TestError::UnknownSequence(_)));
    }

    #[test]
    fn test_numeric_sequence_renders_via_next_string() {
        let sequences = Sequences::new();
        sequences.register("login_attempts", |n| json!(n * 10));
        assert_eq!(sequences.next_string("login_attempts").unwrap(), "10");
    }
}
