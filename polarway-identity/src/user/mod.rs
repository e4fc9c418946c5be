//! User entity actor and its record types

mod actor;
mod types;

pub(crate) use actor::UserActor;
pub use actor::UserHandle;
pub use types::{normalize_key, ClaimEntry, LoginEntry, TokenEntry, UserRecord, UserState};

pub(crate) use types::present;
