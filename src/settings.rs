//! Layered configuration loading.
//!
//! Precedence, lowest first:
//!
//! 1. [`PresenceConfig::default`]
//! 2. An optional TOML file
//! 3. Environment variables prefixed `VIBE_` (e.g. `VIBE_DISPLAY_NAME`,
//!    `VIBE_UPDATE_INTERVAL_MS`)
//!
//! ```toml
//! display_name = "Ann"
//! space_id = "cafe"
//!
//! [[zones]]
//! id = "counter"
//! name = "Counter"
//! x = 0
//! y = 0
//! width = 400
//! height = 300
//! color = 0x4ecdc4
//! ```

use std::path::Path;

use config::{Config, Environment, File, FileFormat};

use crate::error::SettingsError;
use crate::types::PresenceConfig;

pub const ENV_PREFIX: &str = "VIBE";

/// Load configuration from defaults, `path` (if given) and the process
/// environment.
pub fn load(path: Option<&Path>) -> Result<PresenceConfig, SettingsError> {
    load_with_env(path, None)
}

/// Like [`load`], but reads variables from `env` instead of the process
/// environment when it is `Some`.
pub fn load_with_env(
    path: Option<&Path>,
    env: Option<config::Map<String, String>>,
) -> Result<PresenceConfig, SettingsError> {
    let mut builder = Config::builder().add_source(Config::try_from(&PresenceConfig::default())?);

    if let Some(path) = path {
        log::debug!("[settings] reading {}", path.display());
        builder = builder.add_source(File::from(path).format(FileFormat::Toml).required(false));
    }

    let config: PresenceConfig = builder
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .try_parsing(true)
                .source(env),
        )
        .build()?
        .try_deserialize()?;

    validate(&config)?;
    Ok(config)
}

/// Reject values the session cannot run with.
pub fn validate(config: &PresenceConfig) -> Result<(), SettingsError> {
    if config.update_interval_ms == 0 {
        return Err(SettingsError::Invalid {
            key: "update_interval_ms",
            reason: "must be greater than zero".into(),
        });
    }
    if !(config.scene_width > 0.0 && config.scene_height > 0.0) {
        return Err(SettingsError::Invalid {
            key: "scene_width/scene_height",
            reason: format!("{}x{} is not a usable scene", config.scene_width, config.scene_height),
        });
    }
    if let Some(z) = config.zones.iter().find(|z| z.width < 0.0 || z.height < 0.0) {
        return Err(SettingsError::Invalid {
            key: "zones",
            reason: format!("zone `{}` has a negative size", z.id),
        });
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn no_env() -> Option<config::Map<String, String>> {
        Some(config::Map::new())
    }

    #[test]
    fn defaults_without_file() {
        let cfg = load_with_env(None, no_env()).unwrap();
        assert_eq!(cfg, PresenceConfig::default());
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let cfg = load_with_env(Some(Path::new("/nonexistent/vibe.toml")), no_env()).unwrap();
        assert_eq!(cfg.update_interval_ms, 100);
    }

    #[test]
    fn file_overrides_defaults() {
        let mut f = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            f,
            r#"
display_name = "Ann"
update_interval_ms = 50

[[zones]]
id = "counter"
name = "Counter"
x = 0.0
y = 0.0
width = 400.0
height = 300.0
"#
        )
        .unwrap();

        let cfg = load_with_env(Some(f.path()), no_env()).unwrap();
        assert_eq!(cfg.display_name, "Ann");
        assert_eq!(cfg.update_interval_ms, 50);
        assert_eq!(cfg.lerp_duration_ms, 120);
        assert_eq!(cfg.zones.len(), 1);
        assert_eq!(cfg.zones[0].id, "counter");
    }

    #[test]
    fn env_overrides_file() {
        let mut env = config::Map::new();
        env.insert("VIBE_SPACE_ID".to_string(), "library".to_string());
        env.insert("VIBE_LERP_DURATION_MS".to_string(), "200".to_string());

        let cfg = load_with_env(None, Some(env)).unwrap();
        assert_eq!(cfg.space_id, "library");
        assert_eq!(cfg.lerp_duration_ms, 200);
    }

    #[test]
    fn zero_interval_is_rejected() {
        let cfg = PresenceConfig {
            update_interval_ms: 0,
            ..PresenceConfig::default()
        };
        assert!(matches!(
            validate(&cfg),
            Err(SettingsError::Invalid { key: "update_interval_ms", .. })
        ));
    }
}
