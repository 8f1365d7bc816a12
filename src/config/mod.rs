pub mod defaults;
pub mod file;
pub mod keys;
pub mod resolver;
pub mod settings;

pub use file::{save, ConfigFile};
pub use keys::{ConfigKey, ConfigValue};
pub use resolver::{CliOverrides, ConfigResolver, Defaults, Environment};
pub use settings::{normalize_base_url, EffectiveConfig, Provider, Secret};
