//! Role entity actor and its record types

mod actor;
mod types;

pub(crate) use actor::RoleActor;
pub use actor::RoleHandle;
pub use types::{RoleRecord, RoleState};
