// src/config.rs
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

// Gameplay-facing tunables.
pub const DEFAULT_SHOOT_THRESHOLD_PX: f32 = 30.0;
pub const DEFAULT_MAX_HANDS: usize = 2;
pub const DEFAULT_CANVAS_WIDTH: u32 = 1280;
pub const DEFAULT_CANVAS_HEIGHT: u32 = 720;
pub const DEFAULT_MATCH_RADIUS_PX: f32 = 160.0;
pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:5001/ws";

// Cosmetic shot effects.
pub const BULLET_HOLE_SIZE_PX: f32 = 10.0;
pub const BULLET_HOLE_LIFETIME: Duration = Duration::from_millis(2000);
pub const EXPLOSION_SIZE_PX: f32 = 50.0;
pub const EXPLOSION_LIFETIME: Duration = Duration::from_millis(500);

// Aim cursor radii.
pub const AIM_CURSOR_RADIUS_PX: f32 = 10.0;
pub const SHOOT_CURSOR_RADIUS_PX: f32 = 15.0;

const APP_QUALIFIER: &str = "org";
const APP_ORGANIZATION: &str = "pinchhunt";
const APP_NAME: &str = "pinch_hunt";
const CONFIG_FILE: &str = "config.json";
const PREFERENCES_FILE: &str = "preferences.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid value {value:?} for {var}")]
    InvalidEnv { var: &'static str, value: String },
    #[error("max hands must be 1 or 2, got {0}")]
    MaxHands(usize),
    #[error("{name} must be a finite positive number, got {value}")]
    NotPositive { name: &'static str, value: f32 },
    #[error("canvas size must be non-zero, got {width}x{height}")]
    CanvasSize { width: u32, height: u32 },
}

/// How observed hands are given slot identities from frame to frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotAssignment {
    /// Slot is the hand's index in the detector output.
    Positional,
    /// Slots follow the nearest fingertip from the previous frame.
    Nearest,
}

impl std::str::FromStr for SlotAssignment {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "positional" => Ok(Self::Positional),
            "nearest" => Ok(Self::Nearest),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub server_url: String,
    pub shoot_threshold_px: f32,
    pub max_hands: usize,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slot_assignment: SlotAssignment,
    pub match_radius_px: f32,
    pub duck_sprite: Option<PathBuf>,
    /// Command line of the landmark detector process; stdin is read when unset.
    pub detector_command: Option<String>,
    pub headless: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            shoot_threshold_px: DEFAULT_SHOOT_THRESHOLD_PX,
            max_hands: DEFAULT_MAX_HANDS,
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            slot_assignment: SlotAssignment::Nearest,
            match_radius_px: DEFAULT_MATCH_RADIUS_PX,
            duck_sprite: Some(PathBuf::from("assets/duck.png")),
            detector_command: None,
            headless: false,
        }
    }
}

impl ClientConfig {
    /// Config file (if any), then environment overrides, then validation.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match config_dir().map(|dir| dir.join(CONFIG_FILE)) {
            Some(path) if path.exists() => Self::from_file(path)?,
            _ => Self::default(),
        };
        config.apply_env(|var| env::var(var).ok())?;
        config.validate()?;
        info!(
            server_url = %config.server_url,
            threshold = config.shoot_threshold_px,
            max_hands = config.max_hands,
            canvas = %format!("{}x{}", config.canvas_width, config.canvas_height),
            slots = ?config.slot_assignment,
            "client configuration loaded"
        );
        Ok(config)
    }

    pub fn from_file(path: PathBuf) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "reading config file");
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Applies `PINCH_HUNT_*` overrides using `lookup` to read variables.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        if let Some(url) = lookup("PINCH_HUNT_SERVER_URL") {
            self.server_url = url;
        }
        if let Some(value) = lookup("PINCH_HUNT_SHOOT_THRESHOLD") {
            self.shoot_threshold_px = parse_env("PINCH_HUNT_SHOOT_THRESHOLD", value)?;
        }
        if let Some(value) = lookup("PINCH_HUNT_MAX_HANDS") {
            self.max_hands = parse_env("PINCH_HUNT_MAX_HANDS", value)?;
        }
        if let Some(value) = lookup("PINCH_HUNT_CANVAS") {
            let (w, h) = value
                .split_once(['x', 'X'])
                .and_then(|(w, h)| Some((w.trim().parse::<u32>().ok()?, h.trim().parse::<u32>().ok()?)))
                .ok_or(ConfigError::InvalidEnv {
                    var: "PINCH_HUNT_CANVAS",
                    value: value.clone(),
                })?;
            self.canvas_width = w;
            self.canvas_height = h;
        }
        if let Some(value) = lookup("PINCH_HUNT_SLOTS") {
            self.slot_assignment = parse_env("PINCH_HUNT_SLOTS", value)?;
        }
        if let Some(value) = lookup("PINCH_HUNT_MATCH_RADIUS") {
            self.match_radius_px = parse_env("PINCH_HUNT_MATCH_RADIUS", value)?;
        }
        if let Some(path) = lookup("PINCH_HUNT_SPRITE") {
            self.duck_sprite = (!path.is_empty()).then(|| PathBuf::from(path));
        }
        if let Some(cmd) = lookup("PINCH_HUNT_DETECTOR") {
            self.detector_command = (!cmd.trim().is_empty()).then_some(cmd);
        }
        if let Some(value) = lookup("PINCH_HUNT_HEADLESS") {
            self.headless = matches!(value.trim(), "1" | "true" | "yes");
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=2).contains(&self.max_hands) {
            return Err(ConfigError::MaxHands(self.max_hands));
        }
        for (name, value) in [
            ("shoot threshold", self.shoot_threshold_px),
            ("match radius", self.match_radius_px),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { name, value });
            }
        }
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return Err(ConfigError::CanvasSize {
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidEnv { var, value })
}

fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME)
        .map(|dirs| dirs.config_dir().to_path_buf())
}

/// User preferences that survive restarts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub sound_enabled: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            sound_enabled: true,
        }
    }
}

impl Preferences {
    fn path() -> Option<PathBuf> {
        config_dir().map(|dir| dir.join(PREFERENCES_FILE))
    }

    pub fn load() -> Self {
        Self::path()
            .and_then(|path| std::fs::read_to_string(path).ok())
            .and_then(|contents| serde_json::from_str(&contents).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        let Some(path) = Self::path() else {
            warn!("no config directory available; preferences not saved");
            return;
        };
        if let Some(parent) = path.parent() {
            if let Err(e) = std::fs::create_dir_all(parent) {
                warn!(error = %e, path = %parent.display(), "failed to create config directory");
                return;
            }
        }
        match serde_json::to_string_pretty(self) {
            Ok(contents) => {
                if let Err(e) = std::fs::write(&path, contents) {
                    warn!(error = %e, path = %path.display(), "failed to save preferences");
                }
            }
            Err(e) => warn!(error = %e, "failed to serialize preferences"),
        }
    }
}
