//! Identifier types shared across the workflow crates.

pub mod ids;

pub use ids::{ChatId, ConsultantId, SessionId, UserId};
