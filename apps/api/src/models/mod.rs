pub mod challenge;
pub mod character;
pub mod profile;
pub mod quest;
pub mod user;
