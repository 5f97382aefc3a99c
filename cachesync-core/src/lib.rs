//! cachesync core library: domain types, lookup catalog, configuration.
//!
//! - [`types`]: newtypes and the records handed over by the search service
//! - [`catalog`]: immutable code → name tables ([`Catalog`])
//! - [`config`]: YAML configuration load / save / init
//! - [`error`]: [`ConfigError`]

pub mod catalog;
pub mod config;
pub mod error;
pub mod types;

pub use catalog::Catalog;
pub use config::{Config, RetrySettings};
pub use error::ConfigError;
pub use types::{Coordinates, RawRecord, RecordCode, RegionId, SearchCriteria, SortOrder};
