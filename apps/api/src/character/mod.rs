//! Character catalog with uploaded artwork.

pub mod form;
pub mod handlers;
pub mod queries;
