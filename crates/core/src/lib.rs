pub mod config;
pub mod error;
pub mod types;

pub use config::{ProviderConfig, save_config};
pub use error::{Error, Result};
pub use types::*;
