//! Auth surface: the request gate plus the `/auth` handlers.

pub mod handlers;
pub mod middleware;
pub mod requests;

pub use middleware::{require_auth, AuthContext, CurrentUser};
