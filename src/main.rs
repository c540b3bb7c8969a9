// src/main.rs
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
mod brainflow;
mod classifier;
mod drivers;
mod engine;
mod gamemod;
mod gui;
mod monitor;
mod recorder;
mod settings;
mod timer;
mod types;
use eframe::egui;
fn main() -> eframe::Result<()> {
    env_logger::init();
    let viewport = egui::ViewportBuilder::default()
        .with_inner_size([1463.0, 915.0])
        .with_min_inner_size([1000.0, 700.0])
        .with_title("Concentra");
    let options = eframe::NativeOptions {
        viewport,
        ..Default::default()
    };
    eframe::run_native(
        "Concentra",
        options,
        Box::new(|_cc| Box::new(gui::ConcentraApp::default())),
    )
}
