//! Configuration structs with sensible defaults and RON persistence.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Offscreen render target settings.
    pub render: RenderConfig,
    /// Light and camera placement.
    pub scene: SceneConfig,
    /// Sphere tessellation shared by every body.
    pub planet: PlanetConfig,
    /// Bodies to build, in draw order.
    pub bodies: Vec<BodyConfig>,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Offscreen rendering configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    /// Target width in pixels.
    pub width: u32,
    /// Target height in pixels.
    pub height: u32,
    /// Clear color (RGBA, linear).
    pub clear_color: [f64; 4],
    /// Number of frames to render before exiting.
    pub frames: u32,
}

/// Scene configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneConfig {
    /// Light source position in eye space.
    pub sun_position: [f32; 3],
    /// Distance pushed onto every body along -Z so the scene sits in front of the camera.
    pub camera_distance: f32,
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
}

/// Sphere tessellation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlanetConfig {
    /// Latitude bands.
    pub bands: u32,
    /// Longitude segments.
    pub segments: u32,
}

/// One body of the scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BodyConfig {
    pub name: String,
    pub radius: f32,
    /// RGBA, each component in [0, 1].
    pub color: [f32; 4],
    /// Name of the body this one orbits.
    pub central_body: Option<String>,
    /// Position relative to the scene origin.
    pub position: [f32; 3],
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            clear_color: [0.0, 0.0, 0.02, 1.0],
            frames: 1,
        }
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            sun_position: [0.0, 0.0, 100.0],
            camera_distance: 30.0,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Default for PlanetConfig {
    fn default() -> Self {
        Self {
            bands: 32,
            segments: 64,
        }
    }
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            name: "Planet".to_string(),
            radius: 1.0,
            color: [1.0, 1.0, 1.0, 1.0],
            central_body: None,
            position: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Earth and Moon, used when the config file lists no bodies.
pub fn default_bodies() -> Vec<BodyConfig> {
    vec![
        BodyConfig {
            name: "Earth".to_string(),
            radius: 6.371,
            color: [0.2, 0.4, 0.9, 1.0],
            central_body: Some("Sun".to_string()),
            position: [-4.0, 0.0, 0.0],
        },
        BodyConfig {
            name: "Moon".to_string(),
            radius: 1.737,
            color: [0.75, 0.75, 0.72, 1.0],
            central_body: Some("Earth".to_string()),
            position: [8.0, 2.0, 0.0],
        },
    ]
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join("config.ron");

        if config_path.exists() {
            let config = read_config(&config_path)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config {
                bodies: default_bodies(),
                ..Config::default()
            };
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::WriteError {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join("config.ron");
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::WriteError {
            path: config_path.clone(),
            source,
        })?;
        Ok(())
    }

    /// Re-read the file: returns `Some(new_config)` if it changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join("config.ron");
        let new_config = read_config(&config_path)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }
}

fn read_config(path: &Path) -> Result<Config, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadError {
        path: path.to_path_buf(),
        source,
    })?;
    ron::from_str(&contents).map_err(|source| ConfigError::ParseError {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(!ron_str.is_empty());
        assert!(ron_str.contains("width: 1280"));
        assert!(ron_str.contains("bands: 32"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config {
            bodies: default_bodies(),
            ..Config::default()
        };
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_field_uses_default() {
        // Config missing the `scene` section entirely
        let ron_str = "(render: (), planet: (), debug: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.scene, SceneConfig::default());
        assert!(config.bodies.is_empty());
    }

    #[test]
    fn test_body_fields_default() {
        let ron_str = r#"(bodies: [(name: "Io", radius: 0.18)])"#;
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.bodies.len(), 1);
        assert_eq!(config.bodies[0].name, "Io");
        assert_eq!(config.bodies[0].color, [1.0, 1.0, 1.0, 1.0]);
        assert_eq!(config.bodies[0].central_body, None);
    }

    #[test]
    fn test_extra_field_ignored() {
        let ron_str = "(future_setting: true)";
        // RON with #[serde(default)] and deny_unknown_fields not set should accept this
        let result: Result<Config, _> = ron::from_str(ron_str);
        assert!(result.is_ok());
    }

    #[test]
    fn test_first_load_writes_default_bodies() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert!(dir.path().join("config.ron").exists());
        assert_eq!(config.bodies, default_bodies());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.render.width = 1920;
        config.render.height = 1080;
        config.scene.sun_position = [10.0, 20.0, 30.0];

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.planet.segments = 48;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_some());
        assert_eq!(result.unwrap().planet.segments, 48);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_error_names_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.ron"), "(render: (width: \"wide\"))").unwrap();

        let err = Config::load_or_create(dir.path()).unwrap_err();

        assert!(matches!(err, ConfigError::ParseError { .. }));
        assert!(err.to_string().contains("config.ron"));
    }

    #[test]
    fn test_ron_comments_preserved() {
        let ron_str = "// This is a comment\n(\n  // Another comment\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
