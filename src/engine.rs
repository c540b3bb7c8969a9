// src/engine.rs
use std::fs;
use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, TryRecvError};
use std::thread;
use std::time::{Duration, Instant};
use crate::brainflow::BoardSession;
use crate::classifier::{score_once, ModelKind};
use crate::drivers::{
    render_spectrum_png, render_waveform_png, DenoiseMethod, PlotStyle, RefreshFrame,
    SampleSource, SignalPipeline, SyntheticSource,
};
use crate::gamemod::{platform_connector, GameMod, GameModParams, ProcessConnector};
use crate::recorder::DataRecorder;
use crate::settings::{BoardSettings, ProcessingSettings};
use crate::timer::IntervalTimer;
use crate::types::*;
pub const REFRESH_PERIOD: Duration = Duration::from_millis(40);
const IDLE_SLEEP: Duration = Duration::from_millis(5);
type Session = SignalPipeline<Box<dyn SampleSource>>;
/// Session context owned by the engine thread: acquisition pipeline, the
/// classification loop and the game mod, all driven by polled timers.
pub struct Engine {
    tx: Sender<BciMessage>,
    session: Option<Session>,
    denoise: Option<DenoiseMethod>,
    refresh_timer: IntervalTimer,
    classify_timer: IntervalTimer,
    model: ModelKind,
    game: GameMod,
    recorder: DataRecorder,
    output_dir: PathBuf,
    last_frame: Option<RefreshFrame>,
}
impl Engine {
    pub fn new(
        tx: Sender<BciMessage>,
        connector: Box<dyn ProcessConnector>,
        game_params: GameModParams,
    ) -> Self {
        Self {
            tx,
            session: None,
            denoise: None,
            refresh_timer: IntervalTimer::new(),
            classify_timer: IntervalTimer::new(),
            model: ModelKind::default(),
            game: GameMod::new(connector, game_params),
            recorder: DataRecorder::new(),
            output_dir: PathBuf::from("."),
            last_frame: None,
        }
    }
    #[cfg(test)]
    pub fn with_output_dir(mut self, dir: PathBuf) -> Self {
        self.output_dir = dir;
        self
    }
    fn info(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::info!("{msg}");
        self.tx.send(BciMessage::Log(msg)).ok();
    }
    fn warn(&self, msg: impl Into<String>) {
        let msg = msg.into();
        log::warn!("{msg}");
        self.tx.send(BciMessage::Log(format!("⚠ {msg}"))).ok();
    }
    fn send_game_status(&self) {
        self.tx.send(BciMessage::GameMod(self.game.status())).ok();
    }
    /// Applies one GUI command; `false` means the engine should shut down.
    pub fn handle(&mut self, cmd: GuiCommand, now: Instant) -> bool {
        match cmd {
            GuiCommand::StartSession { board, processing } => {
                self.start_session(&board, &processing, now)
            }
            GuiCommand::StopSession => self.stop_session(),
            GuiCommand::ConfigureDenoise { wavelet, level } => {
                match DenoiseMethod::wavelet(&wavelet, level) {
                    Ok(method) => {
                        self.denoise = Some(method);
                        if let Some(session) = self.session.as_mut() {
                            session.set_denoise(Some(method));
                        }
                        self.info(format!("Denoising: {method}"));
                    }
                    Err(err) => self.warn(format!("Denoise config rejected: {err}")),
                }
            }
            GuiCommand::ResetDenoise => {
                self.denoise = None;
                if let Some(session) = self.session.as_mut() {
                    session.set_denoise(None);
                }
                self.info("Denoising: rolling mean");
            }
            GuiCommand::StartClassification { interval_ms, model } => {
                self.model = model;
                self.classify_timer
                    .start(Duration::from_millis(interval_ms), now);
                self.info(format!(
                    "Classification every {interval_ms} ms ({})",
                    model.label()
                ));
                self.tx.send(BciMessage::ClassificationStatus(true)).ok();
            }
            GuiCommand::StopClassification => self.stop_classification(),
            GuiCommand::SetGameParams(params) => self.game.set_params(params),
            GuiCommand::ToggleGameConnection => {
                match self.game.toggle_connection() {
                    Ok(true) => self.info(format!("Connected to {}", self.game.params().process_name)),
                    Ok(false) => self.info("Disconnected from game"),
                    Err(err) => self.warn(format!("Game connection failed: {err}")),
                }
                self.send_game_status();
            }
            GuiCommand::SetGameValue(value) => {
                if let Err(err) = self.game.set_value(value) {
                    self.warn(format!("Writing game value failed: {err}"));
                }
                self.send_game_status();
            }
            GuiCommand::ToggleInjection => {
                match self.game.toggle_injection(now) {
                    Ok(true) => self.info("Injection started"),
                    Ok(false) => self.info("Injection stopped"),
                    Err(err) => self.warn(format!("Cannot start injection: {err}")),
                }
                self.send_game_status();
            }
            GuiCommand::StartRecording(label) => self.start_recording(&label),
            GuiCommand::StopRecording => self.stop_recording(),
            GuiCommand::ExportSnapshot(prefix) => self.export_snapshot(&prefix),
            GuiCommand::Shutdown => return false,
        }
        true
    }
    fn open_source(board: &BoardSettings) -> Result<Box<dyn SampleSource>, String> {
        match board.mode {
            ConnectionMode::Simulation => Ok(Box::new(SyntheticSource::new())),
            ConnectionMode::Hardware => BoardSession::connect(board.board_id, &board.serial_port)
                .map(|s| Box::new(s) as Box<dyn SampleSource>)
                .map_err(|e| e.to_string()),
        }
    }
    fn start_session(&mut self, board: &BoardSettings, processing: &ProcessingSettings, now: Instant) {
        if self.session.is_some() {
            self.warn("Session already running");
            return;
        }
        let mut source = match Self::open_source(board) {
            Ok(source) => source,
            Err(err) => {
                self.warn(format!("Connect failed: {err}"));
                return;
            }
        };
        if let Err(err) = source.start_stream() {
            self.warn(format!("Start stream failed: {err}"));
            source.release().ok();
            return;
        }
        if board.warmup_secs > 0.0 {
            self.info(format!("Warming up for {:.1} s", board.warmup_secs));
            thread::sleep(Duration::from_secs_f64(board.warmup_secs));
        }
        let mut session = SignalPipeline::new(source, processing.window_width.max(1))
            .with_rolling_window(processing.rolling_window);
        session.set_denoise(self.denoise);
        self.session = Some(session);
        self.last_frame = None;
        self.refresh_timer.start(REFRESH_PERIOD, now);
        self.info(match board.mode {
            ConnectionMode::Simulation => "✅ Simulation session started".to_string(),
            ConnectionMode::Hardware => {
                format!("✅ Board {} streaming on {}", board.board_id, board.serial_port)
            }
        });
        self.tx.send(BciMessage::SessionStatus(true)).ok();
    }
    fn stop_session(&mut self) {
        self.refresh_timer.stop();
        self.stop_classification();
        if self.recorder.is_recording() {
            self.stop_recording();
        }
        if let Some(mut session) = self.session.take() {
            if let Err(err) = session.shutdown() {
                self.warn(format!("Session teardown: {err}"));
            }
            self.info("🛑 Session stopped");
        }
        self.tx.send(BciMessage::SessionStatus(false)).ok();
    }
    fn stop_classification(&mut self) {
        if self.classify_timer.is_running() {
            self.classify_timer.stop();
            self.info("Classification stopped");
        }
        self.tx.send(BciMessage::ClassificationStatus(false)).ok();
    }
    fn start_recording(&mut self, label: &str) {
        let Some(session) = self.session.as_ref() else {
            self.warn("Start a session before recording");
            return;
        };
        let rows = session.num_rows();
        match self.recorder.start(&self.output_dir, label, rows) {
            Ok(path) => {
                self.info(format!("💾 Recording to {}", path.display()));
                self.tx.send(BciMessage::RecordingStatus(true)).ok();
            }
            Err(err) => self.warn(format!("Recording failed: {err:#}")),
        }
    }
    fn stop_recording(&mut self) {
        if let Err(err) = self.recorder.stop() {
            self.warn(format!("Closing recording failed: {err:#}"));
        }
        self.tx.send(BciMessage::RecordingStatus(false)).ok();
    }
    fn export_snapshot(&mut self, prefix: &str) {
        let Some(frame) = self.last_frame.as_ref() else {
            self.warn("Nothing to export yet");
            return;
        };
        let result = render_waveform_png(frame, PlotStyle::default()).and_then(|wave| {
            render_spectrum_png(&frame.raw_spectrum, PlotStyle::default()).map(|psd| (wave, psd))
        });
        let (wave, psd) = match result {
            Ok(images) => images,
            Err(err) => {
                self.warn(format!("Snapshot failed: {err}"));
                return;
            }
        };
        let wave_path = self.output_dir.join(format!("{prefix}_waveform.png"));
        let psd_path = self.output_dir.join(format!("{prefix}_psd.png"));
        match fs::write(&wave_path, wave).and_then(|_| fs::write(&psd_path, psd)) {
            Ok(()) => self.info(format!(
                "Snapshot saved: {} / {}",
                wave_path.display(),
                psd_path.display()
            )),
            Err(err) => self.warn(format!("Snapshot write failed: {err}")),
        }
    }
    /// Runs every due timer once, in a fixed order.
    pub fn tick(&mut self, now: Instant) {
        if self.refresh_timer.poll(now) {
            self.refresh_tick();
        }
        if self.classify_timer.poll(now) {
            self.classify_tick();
        }
        let game = self.game.poll(now);
        for err in &game.errors {
            self.warn(format!("Game mod: {err}"));
        }
        if game.updated {
            self.send_game_status();
        }
    }
    fn refresh_tick(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let batch = match session.source_mut().pull_all() {
            Ok(batch) => batch,
            Err(err) => {
                self.warn(format!("Pull failed: {err}"));
                return;
            }
        };
        if let Err(err) = self.recorder.write_batch(&batch) {
            log::warn!("recording write failed: {err:#}");
        }
        match session.refresh_with(&batch) {
            Ok(frame) => {
                self.tx.send(BciMessage::Frame(Box::new(frame.clone()))).ok();
                self.last_frame = Some(frame);
            }
            Err(err) => self.warn(format!("Refresh failed: {err}")),
        }
    }
    fn classify_tick(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let features = match session.concentration_features() {
            Ok(Some(features)) => features,
            Ok(None) => return,
            Err(err) => {
                self.warn(format!("Band powers failed: {err}"));
                return;
            }
        };
        match score_once(self.model, &features.feature_vector) {
            Ok(score) => {
                log::debug!("concentration {score:.3} ({:?})", features.bands);
                self.game.set_concentration(score);
                self.tx
                    .send(BciMessage::Concentration {
                        score,
                        bands: features.bands,
                    })
                    .ok();
            }
            Err(err) => self.warn(format!("Classifier failed: {err:#}")),
        }
    }
    /// Ends the session and releases the game process.
    pub fn teardown(&mut self) {
        if self.session.is_some() {
            self.stop_session();
        }
        self.game.disconnect();
        self.recorder.stop().ok();
    }
}
pub fn spawn_thread(tx: Sender<BciMessage>, rx_cmd: Receiver<GuiCommand>, game_params: GameModParams) {
    thread::spawn(move || {
        let mut engine = Engine::new(tx, platform_connector(), game_params);
        engine.info("⚙️ Engine ready.");
        'run: loop {
            loop {
                match rx_cmd.try_recv() {
                    Ok(cmd) => {
                        if !engine.handle(cmd, Instant::now()) {
                            break 'run;
                        }
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => break 'run,
                }
            }
            engine.tick(Instant::now());
            thread::sleep(IDLE_SLEEP);
        }
        engine.teardown();
        log::info!("engine stopped");
    });
}
#[cfg(test)]
mod tests {
    use super::*;
    use crate::gamemod::memory::UnsupportedConnector;
    use std::sync::mpsc::channel;
    fn engine() -> (Engine, Receiver<BciMessage>) {
        let (tx, rx) = channel();
        let engine = Engine::new(tx, Box::new(UnsupportedConnector), GameModParams::default())
            .with_output_dir(std::env::temp_dir());
        (engine, rx)
    }
    fn simulation() -> GuiCommand {
        GuiCommand::StartSession {
            board: BoardSettings {
                mode: ConnectionMode::Simulation,
                warmup_secs: 0.0,
                ..BoardSettings::default()
            },
            processing: ProcessingSettings::default(),
        }
    }
    #[test]
    fn simulation_session_produces_frames_and_scores() {
        let (mut engine, rx) = engine();
        let t0 = Instant::now();
        assert!(engine.handle(simulation(), t0));
        assert!(engine.handle(
            GuiCommand::StartClassification {
                interval_ms: 40,
                model: ModelKind::BandRatio,
            },
            t0,
        ));
        thread::sleep(Duration::from_millis(60));
        engine.tick(t0 + Duration::from_millis(60));
        let messages: Vec<BciMessage> = rx.try_iter().collect();
        assert!(messages
            .iter()
            .any(|m| matches!(m, BciMessage::SessionStatus(true))));
        let frame = messages
            .iter()
            .find_map(|m| match m {
                BciMessage::Frame(frame) => Some(frame),
                _ => None,
            })
            .expect("a refresh frame");
        assert_eq!(frame.raw.len(), 8);
        assert!(frame.raw.iter().all(|c| c.len() == 1500));
        let score = messages
            .iter()
            .find_map(|m| match m {
                BciMessage::Concentration { score, .. } => Some(*score),
                _ => None,
            })
            .expect("a concentration score");
        assert!((0.0..1.0).contains(&score));
        assert!(!engine.handle(GuiCommand::Shutdown, Instant::now()));
        engine.teardown();
    }
    #[test]
    fn classification_without_session_is_skipped() {
        let (mut engine, rx) = engine();
        let t0 = Instant::now();
        engine.handle(
            GuiCommand::StartClassification {
                interval_ms: 10,
                model: ModelKind::BandRatio,
            },
            t0,
        );
        engine.tick(t0 + Duration::from_millis(20));
        assert!(!rx
            .try_iter()
            .any(|m| matches!(m, BciMessage::Concentration { .. })));
    }
    #[test]
    fn stop_classification_twice_equals_once() {
        let (mut engine, _rx) = engine();
        let t0 = Instant::now();
        engine.handle(
            GuiCommand::StartClassification {
                interval_ms: 10,
                model: ModelKind::BandRatio,
            },
            t0,
        );
        engine.handle(GuiCommand::StopClassification, t0);
        engine.handle(GuiCommand::StopClassification, t0);
        assert!(!engine.classify_timer.is_running());
    }
    #[test]
    fn bad_wavelet_keeps_previous_method() {
        let (mut engine, rx) = engine();
        let t0 = Instant::now();
        engine.handle(
            GuiCommand::ConfigureDenoise {
                wavelet: "db2".into(),
                level: 2,
            },
            t0,
        );
        engine.handle(
            GuiCommand::ConfigureDenoise {
                wavelet: "sym9".into(),
                level: 2,
            },
            t0,
        );
        assert_eq!(engine.denoise, Some(DenoiseMethod::wavelet("db2", 2).unwrap()));
        assert!(rx
            .try_iter()
            .any(|m| matches!(m, BciMessage::Log(ref s) if s.contains("rejected"))));
    }
    #[test]
    fn injection_without_game_is_refused() {
        let (mut engine, rx) = engine();
        engine.handle(GuiCommand::ToggleInjection, Instant::now());
        let status = rx
            .try_iter()
            .find_map(|m| match m {
                BciMessage::GameMod(status) => Some(status),
                _ => None,
            })
            .unwrap();
        assert!(!status.injecting);
        assert!(!status.connected);
    }
}
