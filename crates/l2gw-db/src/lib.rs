//! Persistence layer for L2 gateway orchestration.
//!
//! This crate provides the storage side of the gateway service:
//!
//! - [`L2gwStore`]: transactional CRUD and lookup interface with nested
//!   ("subtransaction") scopes
//! - Entity models: [`Gateway`], [`GatewayConnection`], [`RemoteGateway`],
//!   [`RemoteGatewayConnection`], [`RemoteMac`]
//! - OVSDB mirror records ([`LogicalSwitch`], [`PhysicalLocator`], ...) that
//!   the southbound side owns and the orchestration core only reads
//! - [`MemoryStore`]: in-memory implementation persisted as a JSON snapshot
//!
//! # Example
//!
//! ```ignore
//! use l2gw_db::{L2gwStore, MemoryStore};
//!
//! let store = MemoryStore::load("/var/lib/l2gateway/state.json")?;
//! store.begin()?;
//! let gw = store.create_gateway("tenant", &spec)?;
//! store.commit()?;
//! store.save("/var/lib/l2gateway/state.json")?;
//! ```

mod error;
mod memory;
mod models;
mod store;

pub use error::{DbError, DbResult};
pub use memory::{MemoryStore, StoreSnapshot};
pub use models::*;
pub use store::L2gwStore;
