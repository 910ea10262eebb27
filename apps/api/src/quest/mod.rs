//! Quests scheduled under a challenge.

pub mod handlers;
pub mod queries;
pub mod requests;
