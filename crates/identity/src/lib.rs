//! `lidsweep-identity`: contact identity resolution and duplicate reconciliation.
//!
//! Pure engine crate: receives a storage handle and a mapping lookup through
//! traits, returns a structured sweep report. No CLI or file-format code.

pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod group;
pub mod jid;
pub mod mapping;
pub mod model;
pub mod resolver;
pub mod sink;
pub mod store;
pub mod summary;

pub use config::{SweepConfig, SweepPass};
pub use engine::{sweep, SweepOptions};
pub use error::{ConfigError, LookupError, StoreError, SweepError};
pub use mapping::{MappingLookup, MemoryMapping};
pub use model::{ContactRecord, SweepReport, SweepSummary};
pub use resolver::{IdentityResolver, Resolution, ResolutionSource};
pub use store::{ContactStore, MemoryStore};
