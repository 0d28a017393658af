//! Configuration system for ss3link.
//!
//! Provides TOML-based configuration with:
//! - Per-concern sections (`[oauth]`, `[api]`, `[stream]`, `[tls]`, `[auth]`,
//!   `[storage]`, `[http]`), each optional so partial files can be layered
//! - Config file layering (user config dir + project-local overrides)
//! - `SS3LINK_CONFIG_DIR` to relocate the user config directory
//!
//! Sections only carry overrides. Vendor endpoints and client identifiers
//! have their defaults next to the code that uses them.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    load_config, load_config_file, load_config_with_options, save_config, xdg_config_dir,
    xdg_config_path, ConfigSource, LoadedConfig, USER_CONFIG_FILE,
};
pub use error::{ConfigError, Result};
pub use types::*;
