// src/gui.rs
use eframe::egui;
use egui::{Color32, RichText};
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use crate::classifier::ModelKind;
use crate::drivers::{BandSummary, RefreshFrame};
use crate::engine::{self, REFRESH_PERIOD};
use crate::gamemod::GameModStatus;
use crate::monitor::{self, ConcentrationHistory, LogPanel};
use crate::settings::{AppSettings, SETTINGS_FILE};
use crate::types::*;
#[derive(Clone, Copy, PartialEq, Eq)]
enum MonitorTab {
    Raw,
    Processed,
}
pub struct ConcentraApp {
    settings: AppSettings,
    ports: Vec<String>,
    session_active: bool,
    classification_running: bool,
    classification_started: bool,
    recording: bool,
    record_label: String,
    game_status: GameModStatus,
    game_value: f64,
    tab: MonitorTab,
    frame: Option<Box<RefreshFrame>>,
    history: ConcentrationHistory,
    bands: BandSummary,
    log: LogPanel,
    show_connection: bool,
    show_denoise: bool,
    show_concentration: bool,
    show_game: bool,
    rx: Receiver<BciMessage>,
    tx_cmd: Sender<GuiCommand>,
}
impl Default for ConcentraApp {
    fn default() -> Self {
        let settings = AppSettings::load_or_default(Path::new(SETTINGS_FILE));
        let (tx, rx) = channel();
        let (tx_cmd, rx_cmd) = channel();
        engine::spawn_thread(tx, rx_cmd, settings.game.clone());
        let mut log = LogPanel::default();
        log.push("Concentra ready.");
        Self {
            settings,
            ports: list_ports(),
            session_active: false,
            classification_running: false,
            classification_started: false,
            recording: false,
            record_label: "focus".to_owned(),
            game_status: GameModStatus::default(),
            game_value: 100.0,
            tab: MonitorTab::Raw,
            frame: None,
            history: ConcentrationHistory::default(),
            bands: BandSummary::default(),
            log,
            show_connection: true,
            show_denoise: false,
            show_concentration: false,
            show_game: false,
            rx,
            tx_cmd,
        }
    }
}
fn list_ports() -> Vec<String> {
    match serialport::available_ports() {
        Ok(ports) => ports.into_iter().map(|p| p.port_name).collect(),
        Err(err) => {
            log::warn!("listing serial ports failed: {err}");
            Vec::new()
        }
    }
}
impl ConcentraApp {
    fn send(&mut self, cmd: GuiCommand) {
        if self.tx_cmd.send(cmd).is_err() {
            self.log.push("Engine is not running");
        }
    }
    fn save_settings(&mut self) {
        match self.settings.save_to(Path::new(SETTINGS_FILE)) {
            Ok(()) => self.log.push(format!("Settings saved to {SETTINGS_FILE}")),
            Err(err) => self.log.push(format!("Saving settings failed: {err:#}")),
        }
    }
    fn drain_messages(&mut self) {
        while let Ok(msg) = self.rx.try_recv() {
            match msg {
                BciMessage::Log(line) => self.log.push(line),
                BciMessage::SessionStatus(active) => self.session_active = active,
                BciMessage::Frame(frame) => self.frame = Some(frame),
                BciMessage::Concentration { score, bands } => {
                    self.history.push(score);
                    self.bands = bands;
                }
                BciMessage::ClassificationStatus(running) => {
                    self.classification_running = running;
                }
                BciMessage::GameMod(status) => self.game_status = status,
                BciMessage::RecordingStatus(recording) => self.recording = recording,
            }
        }
    }
    fn menu_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Save settings").clicked() {
                        self.save_settings();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(self.frame.is_some(), egui::Button::new("Export snapshot"))
                        .clicked()
                    {
                        let stamp = SystemTime::now()
                            .duration_since(UNIX_EPOCH)
                            .map(|d| d.as_secs())
                            .unwrap_or_default();
                        self.send(GuiCommand::ExportSnapshot(format!("snapshot_{stamp}")));
                        ui.close_menu();
                    }
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });
                ui.menu_button("Windows", |ui| {
                    ui.checkbox(&mut self.show_connection, "Board connection");
                    ui.checkbox(&mut self.show_denoise, "Denoising");
                    ui.checkbox(&mut self.show_concentration, "Concentration");
                    ui.checkbox(&mut self.show_game, "Game mod");
                });
                ui.separator();
                let (text, color) = if self.session_active {
                    ("● streaming", Color32::GREEN)
                } else {
                    ("○ idle", Color32::GRAY)
                };
                ui.label(RichText::new(text).color(color));
            });
        });
    }
    fn connection_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_connection;
        egui::Window::new("Board connection")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let board = &mut self.settings.board;
                ui.add_enabled_ui(!self.session_active, |ui| {
                    ui.horizontal(|ui| {
                        ui.selectable_value(&mut board.mode, ConnectionMode::Simulation, "Simulation");
                        ui.selectable_value(&mut board.mode, ConnectionMode::Hardware, "Hardware");
                    });
                    if board.mode == ConnectionMode::Hardware {
                        egui::Grid::new("board_grid").num_columns(2).show(ui, |ui| {
                            ui.label("Board id");
                            ui.add(egui::DragValue::new(&mut board.board_id).clamp_range(-1..=60));
                            ui.end_row();
                            ui.label("Serial port");
                            ui.horizontal(|ui| {
                                ui.text_edit_singleline(&mut board.serial_port);
                                egui::ComboBox::from_id_source("ports")
                                    .selected_text("▼")
                                    .show_ui(ui, |ui| {
                                        for port in &self.ports {
                                            ui.selectable_value(
                                                &mut board.serial_port,
                                                port.clone(),
                                                port,
                                            );
                                        }
                                    });
                                if ui.small_button("⟳").clicked() {
                                    self.ports = list_ports();
                                }
                            });
                            ui.end_row();
                        });
                    }
                    egui::Grid::new("processing_grid").num_columns(2).show(ui, |ui| {
                        ui.label("Warm-up (s)");
                        ui.add(
                            egui::DragValue::new(&mut board.warmup_secs)
                                .clamp_range(0.0..=10.0)
                                .speed(0.1),
                        );
                        ui.end_row();
                        ui.label("Window (samples)");
                        ui.add(
                            egui::DragValue::new(&mut self.settings.processing.window_width)
                                .clamp_range(64..=10_000),
                        );
                        ui.end_row();
                    });
                });
                ui.separator();
                ui.horizontal(|ui| {
                    if !self.session_active {
                        if ui.button("▶ Start").clicked() {
                            self.save_settings();
                            self.send(GuiCommand::StartSession {
                                board: self.settings.board.clone(),
                                processing: self.settings.processing.clone(),
                            });
                        }
                    } else if ui.button("⏹ Stop").clicked() {
                        self.send(GuiCommand::StopSession);
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    ui.label("Record label");
                    ui.text_edit_singleline(&mut self.record_label);
                });
                let (text, fill) = if self.recording {
                    ("⏹ Stop recording", Color32::RED)
                } else {
                    ("🔴 Record", Color32::DARK_GRAY)
                };
                let button = egui::Button::new(RichText::new(text).color(Color32::WHITE)).fill(fill);
                if ui.add_enabled(self.session_active, button).clicked() {
                    if self.recording {
                        self.send(GuiCommand::StopRecording);
                    } else {
                        let label = self.record_label.clone();
                        self.send(GuiCommand::StartRecording(label));
                    }
                }
            });
        self.show_connection = open;
    }
    fn denoise_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_denoise;
        egui::Window::new("Denoising")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let processing = &mut self.settings.processing;
                egui::Grid::new("denoise_grid").num_columns(2).show(ui, |ui| {
                    ui.label("Wavelet");
                    ui.text_edit_singleline(&mut processing.wavelet);
                    ui.end_row();
                    ui.label("Level");
                    ui.add(egui::DragValue::new(&mut processing.wavelet_level).clamp_range(1..=10));
                    ui.end_row();
                });
                ui.small("haar, db1 to db4");
                ui.horizontal(|ui| {
                    if ui.button("Apply").clicked() {
                        let cmd = GuiCommand::ConfigureDenoise {
                            wavelet: self.settings.processing.wavelet.clone(),
                            level: self.settings.processing.wavelet_level,
                        };
                        self.send(cmd);
                    }
                    if ui.button("Use rolling mean").clicked() {
                        self.send(GuiCommand::ResetDenoise);
                    }
                });
            });
        self.show_denoise = open;
    }
    fn concentration_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_concentration;
        egui::Window::new("Concentration")
            .open(&mut open)
            .default_width(720.0)
            .show(ctx, |ui| {
                let classification = &mut self.settings.classification;
                ui.horizontal(|ui| {
                    ui.label("Interval (s)");
                    ui.add_enabled(
                        !self.classification_running,
                        egui::DragValue::new(&mut classification.interval_secs)
                            .clamp_range(0.1..=60.0)
                            .speed(0.1),
                    );
                    ui.separator();
                    let mut brainflow = matches!(classification.model, ModelKind::BrainFlow { .. });
                    ui.add_enabled_ui(!self.classification_running, |ui| {
                        if ui.radio_value(&mut brainflow, false, "Band ratio").clicked() {
                            classification.model = ModelKind::BandRatio;
                        }
                        if ui.radio_value(&mut brainflow, true, "BrainFlow").clicked()
                            && !matches!(classification.model, ModelKind::BrainFlow { .. })
                        {
                            classification.model = ModelKind::brainflow_default();
                        }
                        if let ModelKind::BrainFlow { metric, classifier } =
                            &mut classification.model
                        {
                            ui.label("metric");
                            ui.add(egui::DragValue::new(metric).clamp_range(0..=10));
                            ui.label("classifier");
                            ui.add(egui::DragValue::new(classifier).clamp_range(0..=10));
                        }
                    });
                });
                let label = monitor::toggle_label(
                    self.classification_running,
                    self.classification_started,
                );
                if ui.button(label).clicked() {
                    if self.classification_running {
                        self.send(GuiCommand::StopClassification);
                    } else {
                        self.classification_started = true;
                        let cmd = GuiCommand::StartClassification {
                            interval_ms: self.settings.classification.interval_ms(),
                            model: self.settings.classification.model,
                        };
                        self.send(cmd);
                    }
                }
                if let Some(score) = self.history.latest() {
                    ui.label(format!("Latest score: {score:.3}"));
                }
                ui.columns(2, |cols| {
                    cols[0].label("Concentration Value");
                    self.history.show(&mut cols[0]);
                    cols[1].label("Average Frequencies Band Power");
                    monitor::band_chart(&mut cols[1], &self.bands);
                });
            });
        self.show_concentration = open;
    }
    fn game_window(&mut self, ctx: &egui::Context) {
        let mut open = self.show_game;
        egui::Window::new("Game concentration mod")
            .open(&mut open)
            .resizable(false)
            .show(ctx, |ui| {
                let connected = self.game_status.connected;
                let injecting = self.game_status.injecting;
                let game = &mut self.settings.game;
                ui.add_enabled_ui(!connected, |ui| {
                    egui::Grid::new("game_target").num_columns(2).show(ui, |ui| {
                        ui.label("Process");
                        ui.text_edit_singleline(&mut game.process_name);
                        ui.end_row();
                        ui.label("Base offset");
                        ui.add(egui::DragValue::new(&mut game.base_offset).hexadecimal(8, false, true));
                        ui.end_row();
                        ui.label("Offsets");
                        ui.horizontal(|ui| {
                            for offset in game.offsets.iter_mut() {
                                ui.add(egui::DragValue::new(offset).hexadecimal(4, false, true));
                            }
                        });
                        ui.end_row();
                    });
                });
                ui.separator();
                ui.add_enabled_ui(!injecting, |ui| {
                    egui::Grid::new("game_gains").num_columns(2).show(ui, |ui| {
                        ui.label("Threshold");
                        ui.add(egui::DragValue::new(&mut game.threshold).clamp_range(0.0..=1.0).speed(0.01));
                        ui.end_row();
                        ui.label("Add gain");
                        ui.add(egui::DragValue::new(&mut game.add_gain).clamp_range(0.0..=100.0).speed(0.1));
                        ui.end_row();
                        ui.label("Subtract gain");
                        ui.add(egui::DragValue::new(&mut game.sub_gain).clamp_range(0.0..=100.0).speed(0.1));
                        ui.end_row();
                        ui.label("Update interval (ms)");
                        ui.add(egui::DragValue::new(&mut game.update_interval_ms).clamp_range(10..=60_000));
                        ui.end_row();
                        ui.label("Inject interval (ms)");
                        ui.add(egui::DragValue::new(&mut game.inject_interval_ms).clamp_range(10..=60_000));
                        ui.end_row();
                    });
                });
                ui.horizontal(|ui| {
                    ui.add(egui::DragValue::new(&mut self.game_value).clamp_range(0.0..=300.0));
                    if ui.button("Set value").clicked() {
                        self.send(GuiCommand::SetGameValue(self.game_value));
                    }
                });
                ui.separator();
                ui.horizontal(|ui| {
                    let connect_text = if connected { "Disconnect" } else { "Connect" };
                    if ui.add_enabled(!injecting, egui::Button::new(connect_text)).clicked() {
                        self.send(GuiCommand::SetGameParams(self.settings.game.clone()));
                        self.send(GuiCommand::ToggleGameConnection);
                    }
                    let inject_text = if injecting { "Stop Injection" } else { "Start Injection" };
                    if ui.button(inject_text).clicked() {
                        self.send(GuiCommand::SetGameParams(self.settings.game.clone()));
                        self.send(GuiCommand::ToggleInjection);
                    }
                });
                let status = self.game_status;
                egui::Grid::new("game_status").num_columns(2).show(ui, |ui| {
                    ui.label("Concentration");
                    ui.monospace(format!("{:.3}", status.concentration));
                    ui.end_row();
                    ui.label("Update");
                    ui.monospace(format!("{:+.3}", status.delta));
                    ui.end_row();
                    ui.label("Game value");
                    ui.monospace(format!("{:.2}", status.game_value));
                    ui.end_row();
                    ui.label("Next value");
                    ui.monospace(format!("{:.2}", status.next_value));
                    ui.end_row();
                });
            });
        self.show_game = open;
    }
    fn monitor_panel(&mut self, ui: &mut egui::Ui) {
        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, MonitorTab::Raw, "Raw");
            ui.selectable_value(&mut self.tab, MonitorTab::Processed, "Processed");
            if let Some(frame) = &self.frame {
                ui.separator();
                ui.label(format!(
                    "{:.0} Hz, +{} samples",
                    frame.sample_rate_hz, frame.batch_len
                ));
            }
        });
        let Some(frame) = self.frame.as_ref() else {
            ui.centered_and_justified(|ui| ui.label("Start a session to see data."));
            return;
        };
        let (id, channels, spectrum) = match self.tab {
            MonitorTab::Raw => ("raw", &frame.raw, &frame.raw_spectrum),
            MonitorTab::Processed => ("processed", &frame.processed, &frame.processed_spectrum),
        };
        monitor::waveform_plots(ui, id, channels, frame.first_sample);
        ui.label("PSD");
        monitor::spectrum_plot(ui, id, spectrum);
    }
}
impl eframe::App for ConcentraApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_messages();
        let mut visuals = egui::Visuals::dark();
        visuals.widgets.noninteractive.bg_fill = Color32::from_rgb(10, 10, 15);
        ctx.set_visuals(visuals);
        self.menu_bar(ctx);
        egui::TopBottomPanel::bottom("log")
            .resizable(true)
            .default_height(120.0)
            .show(ctx, |ui| self.log.show(ui));
        egui::CentralPanel::default().show(ctx, |ui| self.monitor_panel(ui));
        self.connection_window(ctx);
        self.denoise_window(ctx);
        self.concentration_window(ctx);
        self.game_window(ctx);
        let idle = Duration::from_millis(250);
        ctx.request_repaint_after(if self.session_active { REFRESH_PERIOD } else { idle });
    }
}
impl Drop for ConcentraApp {
    fn drop(&mut self) {
        self.tx_cmd.send(GuiCommand::Shutdown).ok();
    }
}
