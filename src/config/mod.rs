//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → loader.rs (environment overrides)
//!     → validation.rs (semantic checks)
//!     → BfaConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//! ```
//!
//! # Design Decisions
//! - Config is loaded once at startup; there is no reload path
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, load_config, ConfigError, IgnoredOverride, LoadedConfig};
pub use schema::{
    BfaConfig, CacheConfig, DataBackendConfig, ObservabilityConfig, ResilienceConfig,
    ServerConfig, UpstreamsConfig,
};
pub use validation::{validate_config, ValidationError};
