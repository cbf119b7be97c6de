//! # stratum-testing - Test-data factories
//!
//! Declares named factories with default attributes, including sequenced
//! attributes backed by auto-incrementing counters, and builds attribute maps
//! by merging defaults with caller overrides. Persisting the built record is
//! the caller's collaborator and out of scope here.
//!
//! ```rust
//! use serde_json::json;
//! use stratum_testing::Factories;
//!
//! let factories = Factories::new();
//! factories.define("dummy", |f| {
//!     f.set("name", json!("MyString"));
//!     f.set("age", json!(1));
//!     f.sequence("email", |n| json!(format!("my-{}@email.com", n)));
//! });
//!
//! let dummy = factories.builder("dummy").build().unwrap();
//! assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
//! ```

pub mod factories;
pub mod sequences;

pub use factories::{Attributes, Factories, FactoryBuilder};
pub use sequences::Sequences;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::{
        factories::{Attributes, Factories, FactoryBuilder},
        sequences::Sequences,
    };

    pub use serde_json::{json, Value as JsonValue};
}

// Error handling
#[derive(thiserror::Error, Debug)]
pub enum TestError {
    #[error("Unknown sequence: {0}")]
    UnknownSequence(String),

    #[error("Unknown factory: {0}")]
    UnknownFactory(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for test operations
pub type TestResult<T> = Result<T, TestError>;
