// src/types.rs
use serde::{Deserialize, Serialize};
use crate::classifier::ModelKind;
use crate::drivers::{BandSummary, RefreshFrame};
use crate::gamemod::{GameModParams, GameModStatus};
use crate::settings::{BoardSettings, ProcessingSettings};
#[derive(PartialEq, Eq, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum ConnectionMode {
    Simulation,
    Hardware,
}
// GUI -> engine
#[derive(Clone, Debug)]
pub enum GuiCommand {
    StartSession {
        board: BoardSettings,
        processing: ProcessingSettings,
    },
    StopSession,
    ConfigureDenoise {
        wavelet: String,
        level: usize,
    },
    ResetDenoise,
    StartClassification {
        interval_ms: u64,
        model: ModelKind,
    },
    StopClassification,
    SetGameParams(GameModParams),
    ToggleGameConnection,
    SetGameValue(f64),
    ToggleInjection,
    StartRecording(String),
    StopRecording,
    ExportSnapshot(String),
    Shutdown,
}
// engine -> GUI
#[derive(Clone, Debug)]
pub enum BciMessage {
    Log(String),
    SessionStatus(bool),
    Frame(Box<RefreshFrame>),
    Concentration { score: f64, bands: BandSummary },
    ClassificationStatus(bool),
    GameMod(GameModStatus),
    RecordingStatus(bool),
}
