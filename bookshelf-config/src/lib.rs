//! Configuration loading and shared configuration types for the bookshelf services.
//!
//! Every service reads its settings through [`load_config`], which layers a base file,
//! an environment file and `APP_` environment variables on top of each other.

mod environment;
mod load;
mod secret;
pub mod shared;

pub use environment::Environment;
pub use load::{Config, LoadConfigError, load_config, load_config_from};
pub use secret::SerializableSecretString;
