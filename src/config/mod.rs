//! Run configuration and where it comes from.
//!
//! - [`RunConfig`] immutable parameters of one run
//! - [`ConfigSource`] point-in-time provider, read once per start
//! - [`JsonSource`] JSON document (inline or file)
//! - [`ConfigError`] load/validation failures

mod error;
mod run;
mod source;

pub use error::ConfigError;
pub use run::RunConfig;
pub use source::{ConfigSource, JsonSource};
