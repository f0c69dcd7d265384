//! Identity of the party making an attendance attempt.
//!
//! Authentication itself happens outside the engine; callers resolve an
//! opaque user identifier to a [`User`] through
//! [`crate::db::UserRepository`].

pub mod models;

pub use models::{Role, User, UserId};
