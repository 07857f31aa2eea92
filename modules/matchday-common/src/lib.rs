pub mod config;
pub mod error;
pub mod fixture;
pub mod types;

pub use config::{Config, PageBackendConfig, ProviderConfig, ProviderKind, Timeouts};
pub use error::{PipelineError, Result};
pub use fixture::FixtureKey;
pub use types::*;
