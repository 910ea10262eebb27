//! Player profile: one per user, created after registration.

pub mod handlers;
pub mod queries;
pub mod requests;
