//! Local user records and the policy that links them to provider identities.

pub mod reconcile;
pub mod store;

pub use store::{PgUserStore, StoreError, UniqueKey, UserStore};
