//! Challenges owned by a profile.

pub mod handlers;
pub mod queries;
pub mod requests;

pub use handlers::caller_profile;
