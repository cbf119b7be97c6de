//! Integration tests mirroring a model test suite built on factories

use std::sync::Arc;

use serde_json::json;
use stratum_testing::prelude::*;

/// The dummy factory: fixed name/age/dob plus a sequenced email
fn define_dummy(factories: &Factories) {
    factories.define("dummy", |f| {
        f.set("name", json!("MyString"));
        f.set("age", json!(1));
        f.set("dob", json!("2023-05-16 15:51:47"));
        f.sequence("email", |n| json!(format!("my-{}@email.com", n)));
    });
}

#[test]
fn dummy_age_is_less_than_21_by_default() {
    let factories = Factories::new();
    define_dummy(&factories);

    let dummy = factories.builder("dummy").build().unwrap();
    assert!(dummy.get_i64("age").unwrap() < 21);
}

#[test]
fn dummy_age_can_be_overridden_above_21() {
    let factories = Factories::new();
    define_dummy(&factories);

    let dummy = factories.builder("dummy").with("age", 22).build().unwrap();
    assert!(dummy.get_i64("age").unwrap() > 21);
}

#[test]
fn dummy_email_matches_the_sequence_template() {
    let factories = Factories::new();
    define_dummy(&factories);

    let dummy = factories.builder("dummy").build().unwrap();
    assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
}

#[test]
fn consecutive_builds_yield_consecutive_emails() {
    let factories = Factories::new();
    define_dummy(&factories);

    let dummies = factories.builder("dummy").build_many(4).unwrap();
    let emails: Vec<&str> = dummies.iter().filter_map(|d| d.get_str("email")).collect();
    assert_eq!(
        emails,
        vec![
            "my-1@email.com",
            "my-2@email.com",
            "my-3@email.com",
            "my-4@email.com"
        ]
    );
}

#[test]
fn factories_on_a_shared_store_keep_sequences_apart() {
    let sequences = Arc::new(Sequences::new());
    let factories = Factories::with_sequences(Arc::clone(&sequences));
    define_dummy(&factories);
    factories.define("user", |f| {
        f.set("name", json!("Test User"));
        f.sequence("email", |n| json!(format!("user-{}@example.com", n)));
    });

    let dummy = factories.builder("dummy").build().unwrap();
    let user = factories.builder("user").build().unwrap();

    // Same attribute name, independent counters
    assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
    assert_eq!(user.get_str("email"), Some("user-1@example.com"));
}

#[test]
fn suite_reset_restarts_every_sequence() {
    let factories = Factories::new();
    define_dummy(&factories);

    factories.builder("dummy").build().unwrap();
    factories.builder("dummy").build().unwrap();

    factories.sequences().reset_all();
    let dummy = factories.builder("dummy").build().unwrap();
    assert_eq!(dummy.get_str("email"), Some("my-1@email.com"));
}
