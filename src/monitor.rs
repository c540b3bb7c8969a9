// src/monitor.rs
use eframe::egui;
use egui::Color32;
use egui_plot::{Bar, BarChart, Legend, Line, Plot, PlotPoints};
use std::collections::VecDeque;
use crate::drivers::{BandSummary, FrequencySpectrum};
/// Trace colour per displayed channel, by index.
pub const CHANNEL_TRACES: [Color32; 8] = [
    Color32::from_rgb(0, 255, 255),
    Color32::from_rgb(255, 0, 255),
    Color32::from_rgb(0, 255, 0),
    Color32::from_rgb(255, 0, 0),
    Color32::from_rgb(0, 0, 255),
    Color32::from_rgb(255, 255, 255),
    Color32::from_rgb(255, 255, 0),
    Color32::from_rgb(135, 100, 35),
];
pub fn channel_color(index: usize) -> Color32 {
    CHANNEL_TRACES[index % CHANNEL_TRACES.len()]
}
pub const LOG_CAPACITY: usize = 200;
#[derive(Default)]
pub struct LogPanel {
    lines: VecDeque<String>,
}
impl LogPanel {
    pub fn push(&mut self, line: impl Into<String>) {
        self.lines.push_back(format!("> {}", line.into()));
        while self.lines.len() > LOG_CAPACITY {
            self.lines.pop_front();
        }
    }
    pub fn show(&self, ui: &mut egui::Ui) {
        egui::ScrollArea::vertical()
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for line in &self.lines {
                    ui.monospace(line);
                }
            });
    }
}
pub const HISTORY_POINTS: usize = 25;
pub const HISTORY_HEADROOM: usize = 2;
/// Scrolling concentration series: x counts scores, the view shows the last
/// `HISTORY_POINTS` plus a little head room.
#[derive(Default)]
pub struct ConcentrationHistory {
    points: VecDeque<[f64; 2]>,
    last_x: u64,
}
impl ConcentrationHistory {
    pub fn push(&mut self, score: f64) {
        self.last_x += 1;
        self.points.push_back([self.last_x as f64, score]);
        // one extra point so the line enters from the left edge
        while self.points.len() > HISTORY_POINTS + 1 {
            self.points.pop_front();
        }
    }
    pub fn latest(&self) -> Option<f64> {
        self.points.back().map(|p| p[1])
    }
    pub fn x_range(&self) -> (f64, f64) {
        let last = self.last_x as usize;
        if last > HISTORY_POINTS {
            ((last - HISTORY_POINTS) as f64, (last + HISTORY_HEADROOM) as f64)
        } else {
            (0.0, (HISTORY_POINTS + HISTORY_HEADROOM) as f64)
        }
    }
    pub fn show(&self, ui: &mut egui::Ui) {
        let (x_min, x_max) = self.x_range();
        let points: Vec<[f64; 2]> = self.points.iter().copied().collect();
        Plot::new("concentration_value")
            .height(220.0)
            .include_x(x_min)
            .include_x(x_max)
            .include_y(0.0)
            .include_y(1.0)
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .auto_bounds_x()
            .legend(Legend::default())
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::new(points))
                        .color(CHANNEL_TRACES[0])
                        .name("Percentage"),
                );
            });
    }
}
/// Label of the classification toggle.
pub fn toggle_label(running: bool, started_once: bool) -> &'static str {
    match (running, started_once) {
        (true, _) => "Stop",
        (false, true) => "Continue",
        (false, false) => "Start",
    }
}
pub fn band_chart(ui: &mut egui::Ui, bands: &BandSummary) {
    let bars = [("Theta", bands.theta), ("Alpha", bands.alpha), ("Beta", bands.beta)]
        .into_iter()
        .enumerate()
        .map(|(i, (name, value))| Bar::new(i as f64, value).name(name).fill(channel_color(i)))
        .collect();
    Plot::new("band_power")
        .height(220.0)
        .include_y(0.0)
        .include_y(120.0)
        .allow_drag(false)
        .allow_zoom(false)
        .allow_scroll(false)
        .x_axis_formatter(|x, _, _| match x.round() as i64 {
            0 => "Theta".to_string(),
            1 => "Alpha".to_string(),
            2 => "Beta".to_string(),
            _ => String::new(),
        })
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).width(0.6).name("Average Band Power"));
        });
}
/// One small plot per channel, stacked.
pub fn waveform_plots(ui: &mut egui::Ui, id: &str, channels: &[Vec<f64>], first_sample: u64) {
    let height = ((ui.available_height() - 260.0) / channels.len().max(1) as f32).max(40.0);
    for (idx, series) in channels.iter().enumerate() {
        let points: PlotPoints = series
            .iter()
            .enumerate()
            .map(|(i, v)| [(first_sample + i as u64) as f64, *v])
            .collect();
        Plot::new(format!("{id}_{idx}"))
            .height(height)
            .show_axes([false, true])
            .allow_drag(false)
            .allow_zoom(false)
            .allow_scroll(false)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(points)
                        .color(channel_color(idx))
                        .name(format!("Channel{}", idx + 1)),
                );
            });
    }
}
pub fn spectrum_plot(ui: &mut egui::Ui, id: &str, spectrum: &FrequencySpectrum) {
    Plot::new(format!("{id}_psd"))
        .height(220.0)
        .include_x(0.0)
        .include_y(0.0)
        .legend(Legend::default())
        .show(ui, |plot_ui| {
            for (idx, mags) in spectrum.magnitudes.iter().enumerate() {
                let points: PlotPoints = spectrum
                    .frequencies_hz
                    .iter()
                    .zip(mags)
                    .map(|(f, m)| [*f, *m])
                    .collect();
                let name = spectrum
                    .channel_labels
                    .get(idx)
                    .cloned()
                    .unwrap_or_else(|| format!("Channel{}", idx + 1));
                plot_ui.line(Line::new(points).color(channel_color(idx)).name(name));
            }
        });
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn history_scrolls_after_window_fills() {
        let mut history = ConcentrationHistory::default();
        assert_eq!(history.x_range(), (0.0, 27.0));
        for i in 0..25 {
            history.push(i as f64 / 100.0);
        }
        assert_eq!(history.x_range(), (0.0, 27.0));
        for _ in 0..5 {
            history.push(0.5);
        }
        assert_eq!(history.x_range(), (5.0, 32.0));
        assert_eq!(history.points.len(), 26);
        assert_eq!(history.latest(), Some(0.5));
    }
    #[test]
    fn toggle_label_cycles() {
        assert_eq!(toggle_label(false, false), "Start");
        assert_eq!(toggle_label(true, true), "Stop");
        assert_eq!(toggle_label(false, true), "Continue");
    }
    #[test]
    fn log_panel_keeps_last_lines() {
        let mut log = LogPanel::default();
        for i in 0..250 {
            log.push(format!("line {i}"));
        }
        assert_eq!(log.lines.len(), LOG_CAPACITY);
        assert_eq!(log.lines.front().map(String::as_str), Some("> line 50"));
    }
    #[test]
    fn channel_colors_wrap() {
        assert_eq!(channel_color(8), channel_color(0));
        assert_eq!(channel_color(7), Color32::from_rgb(135, 100, 35));
    }
}
