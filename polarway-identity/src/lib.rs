//! # Polarway Identity
//!
//! Actor-based identity record store for Polarway: users, roles, claims,
//! external logins and tokens, with secondary indices kept in step by the
//! owning entity actors. State is persisted on Delta Lake through
//! [delta-rs](https://github.com/delta-io/delta-rs), or in memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────┐
//! │   ActorUserStore / ActorRoleStore (lookup façade)  │
//! ├─────────────────────────┬──────────────────────────┤
//! │  UserActor / RoleActor  │  KeyValue / KeyHash      │
//! │  (one per id, owns the  │  index actors (email,    │
//! │   record + claims ...)  ├─►name, login, claim ...) │
//! ├─────────────────────────┴──────────────────────────┤
//! │        ActorRuntime (tokio tasks + DashMap)        │
//! ├────────────────────────────────────────────────────┤
//! │  StateStore: InMemoryStateStore | DeltaStateStore  │
//! └────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use polarway_identity::{
//!     ActorRuntime, ActorUserStore, IdentityStoreConfig, UserRecord, UserStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let runtime = ActorRuntime::with_delta(IdentityStoreConfig::new("/data/identity")).await?;
//!     let users = ActorUserStore::new(runtime);
//!
//!     users.create_user(UserRecord::new("u1", "alice", "alice@example.com")).await?;
//!     let alice = users.find_by_email("ALICE@EXAMPLE.COM").await?;
//!     assert_eq!(alice.map(|u| u.id).as_deref(), Some("u1"));
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Consistency
//!
//! - **Single writer**: each user, role and index key is owned by one actor
//!   that handles one call at a time
//! - **No cross-actor transactions**: an entity saves its own state, then
//!   updates its indices in a fixed order; a failure part way leaves the
//!   record correct and an index stale
//! - **Railway Programming**: all operations return `Result<T, IdentityError>`

pub mod adapter;
pub mod config;
pub mod error;
pub mod index;
pub mod role;
pub mod runtime;
pub mod state;
pub mod user;

#[cfg(feature = "delta")]
pub mod maintenance;
#[cfg(feature = "delta")]
pub mod schema;
#[cfg(feature = "delta")]
pub mod store;

// Re-exports for convenience
pub use adapter::{
    ActorRoleStore, ActorUserStore, RoleClaimStore, RoleStore, UserClaimStore, UserLoginStore,
    UserPartitionService, UserStore, UserTokenStore,
};
pub use config::IdentityStoreConfig;
pub use error::{IdentityError, Result};
pub use index::{IndexServices, KeyHashHandle, KeyValueHandle};
pub use role::{RoleHandle, RoleRecord};
pub use runtime::ids::{ActorAddress, ActorType};
pub use runtime::ActorRuntime;
pub use state::{InMemoryStateStore, StateKey, StateStore};
pub use user::{normalize_key, ClaimEntry, LoginEntry, TokenEntry, UserHandle, UserRecord};

#[cfg(feature = "delta")]
pub use maintenance::MaintenanceScheduler;
#[cfg(feature = "delta")]
pub use state::DeltaStateStore;
#[cfg(feature = "delta")]
pub use store::DeltaStore;
