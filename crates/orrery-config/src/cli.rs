//! Command-line argument parsing for the orrery demo.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orrery command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "orrery", about = "Renders lit celestial bodies offscreen")]
pub struct CliArgs {
    /// Render target width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Render target height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Number of frames to render.
    #[arg(long)]
    pub frames: Option<u32>,

    /// Latitude bands per sphere.
    #[arg(long)]
    pub bands: Option<u32>,

    /// Longitude segments per sphere.
    #[arg(long)]
    pub segments: Option<u32>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Record draws on the CPU instead of using a GPU adapter.
    #[arg(long)]
    pub headless: bool,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.render.width = w;
        }
        if let Some(h) = args.height {
            self.render.height = h;
        }
        if let Some(frames) = args.frames {
            self.render.frames = frames;
        }
        if let Some(bands) = args.bands {
            self.planet.bands = bands;
        }
        if let Some(segments) = args.segments {
            self.planet.segments = segments;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_args() -> CliArgs {
        CliArgs {
            width: None,
            height: None,
            frames: None,
            bands: None,
            segments: None,
            log_level: None,
            headless: false,
            config: None,
        }
    }

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            segments: Some(96),
            ..no_args()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.render.width, 1920);
        assert_eq!(config.planet.segments, 96);
        // Non-overridden fields retain defaults
        assert_eq!(config.render.height, 720);
        assert_eq!(config.planet.bands, 32);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&no_args());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["orrery", "--frames", "3", "--headless"]);
        assert_eq!(args.frames, Some(3));
        assert!(args.headless);
        assert!(args.width.is_none());
    }
}
