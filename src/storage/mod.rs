mod repository;

pub use repository::*;

/// SQL migration for initial schema
pub const MIGRATION_001_INITIAL: &str = include_str!("migrations/001_initial.sql");

/// True when the error chain bottoms out in a UNIQUE constraint failure.
pub fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| db.is_unique_violation())
}

/// True when the error chain bottoms out in a FOREIGN KEY constraint failure.
///
/// `ON DELETE RESTRICT` reports the failure through SQLite's trigger
/// constraint code, which sqlx does not classify, so the message is matched too.
pub fn is_foreign_key_violation(err: &anyhow::Error) -> bool {
    err.downcast_ref::<sqlx::Error>()
        .and_then(|e| e.as_database_error())
        .is_some_and(|db| {
            db.is_foreign_key_violation() || db.message().contains("FOREIGN KEY constraint failed")
        })
}
