//! Prefab data types
//!
//! Serialized records, live scene snapshots, engine value types, the
//! companion meta file and bridge configuration.

mod config;
mod meta;
mod record;
mod snapshot;
mod values;

pub use config::*;
pub use meta::*;
pub use record::*;
pub use snapshot::*;
pub use values::*;
