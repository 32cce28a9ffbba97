//! Pass configuration.
//!
//! Every field has a default matching the runtime profiling library, so an
//! empty file (or no file at all) yields a working configuration:
//!
//! ```toml
//! [checkpoint]
//! entry_function = "main"
//! enter_tag = "Entering "
//! exit_tag = "Exiting "
//! checkpoint_hook = "checkpoint"
//! initialize_hook = "initialize"
//! finalize_hook = "finalize"
//! entry_wrapping = "inline"
//!
//! [makecalls]
//! sample_count = 30
//! driver_name = "main"
//! ```
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    magic::{
        CHECKPOINT_HOOK_NAME, DEFAULT_SAMPLE_COUNT, ENTER_TAG, ENTRY_FUNCTION_NAME,
        ENV_PASS_CONFIG_PATH, EXIT_TAG, FINALIZE_HOOK_NAME, INITIALIZE_HOOK_NAME,
    },
    utils::error::{CkError, CkResult},
};

/// Where the init/deinit calls of the program entry are inserted.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryWrapping {
    /// While transforming the entry function, next to its checkpoints.
    #[default]
    Inline,
    /// During the finalize phase, after every function was instrumented.
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckpointConfig {
    /// Name of the designated program entry.
    pub entry_function: String,
    pub enter_tag: String,
    pub exit_tag: String,
    pub checkpoint_hook: String,
    pub initialize_hook: String,
    pub finalize_hook: String,
    pub entry_wrapping: EntryWrapping,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            entry_function: ENTRY_FUNCTION_NAME.to_string(),
            enter_tag: ENTER_TAG.to_string(),
            exit_tag: EXIT_TAG.to_string(),
            checkpoint_hook: CHECKPOINT_HOOK_NAME.to_string(),
            initialize_hook: INITIALIZE_HOOK_NAME.to_string(),
            finalize_hook: FINALIZE_HOOK_NAME.to_string(),
            entry_wrapping: EntryWrapping::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MakecallsConfig {
    /// Number of call sites in the synthesized driver.
    pub sample_count: u32,
    /// Name of the synthesized driver function.
    pub driver_name: String,
}

impl Default for MakecallsConfig {
    fn default() -> Self {
        Self {
            sample_count: DEFAULT_SAMPLE_COUNT,
            driver_name: ENTRY_FUNCTION_NAME.to_string(),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    pub checkpoint: CheckpointConfig,
    pub makecalls: MakecallsConfig,
}

impl PassConfig {
    /// Get the default path to the pass configuration file.
    pub fn default_path() -> PathBuf {
        if let Ok(config_path) = std::env::var(ENV_PASS_CONFIG_PATH) {
            return config_path.into();
        }

        let mut path = PathBuf::new();

        #[cfg(target_os = "windows")]
        {
            if let Ok(appdata) = std::env::var("APPDATA") {
                path.push(appdata);
            }
        }
        #[cfg(not(target_os = "windows"))]
        {
            if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
                path.push(xdg_config_home);
            } else if let Ok(home) = std::env::var("HOME") {
                path.push(home);
                path.push(".config");
            }
        }

        path.push("ckprof");
        path.push("passes.toml");
        path
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml_str(text: &str, origin: &Path) -> CkResult<Self> {
        let config: Self = toml::from_str(text).map_err(|source| CkError::ConfigParse {
            source,
            file: origin.to_path_buf(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a TOML file.
    pub fn load_from_toml(path: &Path) -> CkResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text, path)
    }

    /// Load from [`Self::default_path`], falling back to the defaults when
    /// the file does not exist.
    pub fn load_or_default() -> CkResult<Self> {
        let path = Self::default_path();
        if path.is_file() {
            Self::load_from_toml(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the configuration to a TOML file.
    pub fn save_to_toml(&self, path: &Path) -> CkResult<()> {
        let text = toml::to_string(self).map_err(|source| CkError::ConfigSerialize {
            source,
            file: path.to_path_buf(),
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn validate(&self) -> CkResult<()> {
        if self.makecalls.sample_count == 0 {
            return Err(CkError::InvalidConfig {
                key: "makecalls.sample_count",
                reason: "at least one call site must be generated".to_string(),
            });
        }

        let names = [
            ("makecalls.driver_name", &self.makecalls.driver_name),
            ("checkpoint.entry_function", &self.checkpoint.entry_function),
            ("checkpoint.checkpoint_hook", &self.checkpoint.checkpoint_hook),
            ("checkpoint.initialize_hook", &self.checkpoint.initialize_hook),
            ("checkpoint.finalize_hook", &self.checkpoint.finalize_hook),
        ];
        for (key, name) in names {
            if name.is_empty() {
                return Err(CkError::InvalidConfig {
                    key,
                    reason: "symbol names cannot be empty".to_string(),
                });
            }
        }

        let hooks = [
            &self.checkpoint.checkpoint_hook,
            &self.checkpoint.initialize_hook,
            &self.checkpoint.finalize_hook,
        ];
        if hooks[0] == hooks[1] || hooks[0] == hooks[2] || hooks[1] == hooks[2] {
            return Err(CkError::InvalidConfig {
                key: "checkpoint",
                reason: "the three runtime hooks must have distinct names".to_string(),
            });
        }

        Ok(())
    }
}
