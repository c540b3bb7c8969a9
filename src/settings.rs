// src/settings.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use crate::classifier::ModelKind;
use crate::drivers::pipeline::DEFAULT_WINDOW_WIDTH;
use crate::gamemod::GameModParams;
use crate::types::ConnectionMode;
pub const SETTINGS_FILE: &str = "concentra.json";
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoardSettings {
    pub mode: ConnectionMode,
    /// BrainFlow board id; 0 is the OpenBCI Cyton.
    pub board_id: i32,
    pub serial_port: String,
    pub warmup_secs: f64,
}
impl Default for BoardSettings {
    fn default() -> Self {
        Self {
            mode: ConnectionMode::Simulation,
            board_id: 0,
            serial_port: "COM3".to_string(),
            warmup_secs: 3.0,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingSettings {
    pub window_width: usize,
    pub rolling_window: usize,
    pub wavelet: String,
    pub wavelet_level: usize,
}
impl Default for ProcessingSettings {
    fn default() -> Self {
        Self {
            window_width: DEFAULT_WINDOW_WIDTH,
            rolling_window: 3,
            wavelet: "db4".to_string(),
            wavelet_level: 3,
        }
    }
}
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationSettings {
    pub interval_secs: f64,
    pub model: ModelKind,
}
impl Default for ClassificationSettings {
    fn default() -> Self {
        Self {
            interval_secs: 1.0,
            model: ModelKind::default(),
        }
    }
}
impl ClassificationSettings {
    pub fn interval_ms(&self) -> u64 {
        (self.interval_secs.max(0.0) * 1000.0).round() as u64
    }
}
/// Everything the user can enter, persisted between runs.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub board: BoardSettings,
    pub processing: ProcessingSettings,
    pub classification: ClassificationSettings,
    pub game: GameModParams,
}
impl AppSettings {
    pub fn load_from(path: &Path) -> Result<Self> {
        let text =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
    }
    /// Falls back to defaults when the file is missing or unreadable.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match Self::load_from(path) {
            Ok(settings) => settings,
            Err(err) => {
                log::warn!("using default settings: {err:#}");
                Self::default()
            }
        }
    }
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        fs::write(path, text).with_context(|| format!("writing {}", path.display()))
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("concentra-{}-{name}.json", std::process::id()))
    }
    #[test]
    fn partial_json_keeps_defaults() {
        let settings: AppSettings =
            serde_json::from_str(r#"{"game":{"threshold":0.7},"board":{"serial_port":"COM9"}}"#)
                .unwrap();
        assert_eq!(settings.game.threshold, 0.7);
        assert_eq!(settings.game.process_name, "DevilMayCry5.exe");
        assert_eq!(settings.game.offsets, vec![0x78, 0x1B50]);
        assert_eq!(settings.board.serial_port, "COM9");
        assert_eq!(settings.board.warmup_secs, 3.0);
        assert_eq!(settings.processing.window_width, 1500);
    }
    #[test]
    fn interval_is_entered_in_seconds() {
        let settings = ClassificationSettings {
            interval_secs: 1.5,
            ..Default::default()
        };
        assert_eq!(settings.interval_ms(), 1500);
    }
    #[test]
    fn save_then_load() {
        let path = temp_path("roundtrip");
        let mut settings = AppSettings::default();
        settings.board.mode = ConnectionMode::Hardware;
        settings.classification.model = ModelKind::brainflow_default();
        settings.save_to(&path).unwrap();
        let loaded = AppSettings::load_from(&path).unwrap();
        fs::remove_file(&path).ok();
        assert_eq!(loaded, settings);
    }
    #[test]
    fn broken_file_falls_back_to_defaults() {
        let path = temp_path("broken");
        fs::write(&path, "{ not json").unwrap();
        let loaded = AppSettings::load_or_default(&path);
        fs::remove_file(&path).ok();
        assert_eq!(loaded, AppSettings::default());
        assert_eq!(
            AppSettings::load_or_default(&temp_path("missing")),
            AppSettings::default()
        );
    }
}
