// src/gamemod/controller.rs
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use crate::timer::IntervalTimer;
use super::memory::{resolve_pointer_chain, MemoryError, ProcessConnector, ProcessMemory};
pub const GAME_VALUE_MIN: f64 = 0.0;
pub const GAME_VALUE_MAX: f64 = 300.0;
/// Concentration assumed before the first classification arrives.
pub const INITIAL_CONCENTRATION: f64 = 0.6;
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameModParams {
    pub process_name: String,
    pub base_offset: u64,
    pub offsets: Vec<u64>,
    pub threshold: f64,
    pub add_gain: f64,
    pub sub_gain: f64,
    pub update_interval_ms: u64,
    pub inject_interval_ms: u64,
}
impl Default for GameModParams {
    fn default() -> Self {
        Self {
            process_name: "DevilMayCry5.exe".to_string(),
            base_offset: 0x7E6_1B90,
            offsets: vec![0x78, 0x1B50],
            threshold: 0.5,
            add_gain: 2.0,
            sub_gain: 2.0,
            update_interval_ms: 1000,
            inject_interval_ms: 100,
        }
    }
}
/// Values behind the game mod window's status labels.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GameModStatus {
    pub connected: bool,
    pub injecting: bool,
    pub concentration: f64,
    pub delta: f64,
    pub game_value: f64,
    pub next_value: f64,
}
/// What one `poll` did.
#[derive(Debug, Default)]
pub struct GameTick {
    pub updated: bool,
    pub wrote: bool,
    pub errors: Vec<MemoryError>,
}
/// `(delta, next)` for one value-update tick. Positive deltas use `add_gain`,
/// everything else `sub_gain`; `next` is clamped to the game's range.
pub fn next_value(
    game_value: f64,
    concentration: f64,
    threshold: f64,
    add_gain: f64,
    sub_gain: f64,
) -> (f64, f64) {
    let raw = concentration - threshold;
    let delta = if raw > 0.0 { raw * add_gain } else { raw * sub_gain };
    let next = (game_value + delta).clamp(GAME_VALUE_MIN, GAME_VALUE_MAX);
    (delta, next)
}
struct Connection {
    process: Box<dyn ProcessMemory>,
    pointer: u64,
}
/// Connects to the game, nudges its concentration field toward the EEG score and
/// keeps re-writing it on the injection timer.
pub struct GameMod {
    connector: Box<dyn ProcessConnector>,
    params: GameModParams,
    connection: Option<Connection>,
    concentration: f64,
    pending: f64,
    update_timer: IntervalTimer,
    inject_timer: IntervalTimer,
    status: GameModStatus,
}
impl GameMod {
    pub fn new(connector: Box<dyn ProcessConnector>, params: GameModParams) -> Self {
        Self {
            connector,
            params,
            connection: None,
            concentration: INITIAL_CONCENTRATION,
            pending: 0.0,
            update_timer: IntervalTimer::new(),
            inject_timer: IntervalTimer::new(),
            status: GameModStatus {
                concentration: INITIAL_CONCENTRATION,
                ..GameModStatus::default()
            },
        }
    }
    pub fn params(&self) -> &GameModParams {
        &self.params
    }
    /// New intervals apply the next time injection starts.
    pub fn set_params(&mut self, params: GameModParams) {
        self.params = params;
    }
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }
    pub fn is_injecting(&self) -> bool {
        self.update_timer.is_running() || self.inject_timer.is_running()
    }
    pub fn status(&self) -> GameModStatus {
        GameModStatus {
            connected: self.is_connected(),
            injecting: self.is_injecting(),
            ..self.status
        }
    }
    /// Connects when disconnected and vice versa; returns the new state.
    pub fn toggle_connection(&mut self) -> Result<bool, MemoryError> {
        if self.connection.is_some() {
            self.disconnect();
            return Ok(false);
        }
        let process = self.connector.open(&self.params.process_name)?;
        let base = process.base_address().wrapping_add(self.params.base_offset);
        let pointer = resolve_pointer_chain(process.as_ref(), base, &self.params.offsets)?;
        log::info!(
            "connected to {}, concentration field at {pointer:#x}",
            self.params.process_name
        );
        self.connection = Some(Connection { process, pointer });
        Ok(true)
    }
    pub fn disconnect(&mut self) {
        self.stop_injection();
        if self.connection.take().is_some() {
            log::info!("disconnected from {}", self.params.process_name);
        }
    }
    /// Stores `value` as the value to inject and writes it right away when connected.
    pub fn set_value(&mut self, value: f64) -> Result<(), MemoryError> {
        self.pending = value;
        let Some(connection) = self.connection.as_mut() else {
            return Ok(());
        };
        connection.process.write_f32(connection.pointer, value as f32)?;
        self.status.concentration = self.concentration;
        self.status.delta = 0.0;
        self.status.game_value = value;
        self.status.next_value = value;
        Ok(())
    }
    pub fn set_concentration(&mut self, score: f64) {
        self.concentration = score;
    }
    pub fn start_injection(&mut self, now: Instant) -> Result<(), MemoryError> {
        if self.connection.is_none() {
            return Err(MemoryError::NotConnected);
        }
        if !self.is_injecting() {
            self.update_timer
                .start(Duration::from_millis(self.params.update_interval_ms), now);
            self.inject_timer
                .start(Duration::from_millis(self.params.inject_interval_ms), now);
        }
        Ok(())
    }
    pub fn stop_injection(&mut self) {
        self.update_timer.stop();
        self.inject_timer.stop();
    }
    /// Returns whether injection is running afterwards.
    pub fn toggle_injection(&mut self, now: Instant) -> Result<bool, MemoryError> {
        if self.is_injecting() {
            self.stop_injection();
            Ok(false)
        } else {
            self.start_injection(now)?;
            Ok(true)
        }
    }
    /// Runs whichever of the value-update and injection timers are due.
    pub fn poll(&mut self, now: Instant) -> GameTick {
        let mut tick = GameTick::default();
        if self.update_timer.poll(now) {
            match self.update_value() {
                Ok(()) => tick.updated = true,
                Err(err) => tick.errors.push(err),
            }
        }
        if self.inject_timer.poll(now) {
            match self.inject_value() {
                Ok(()) => tick.wrote = true,
                Err(err) => tick.errors.push(err),
            }
        }
        tick
    }
    fn update_value(&mut self) -> Result<(), MemoryError> {
        let connection = self.connection.as_ref().ok_or(MemoryError::NotConnected)?;
        let game_value = connection.process.read_f32(connection.pointer)? as f64;
        let (delta, next) = next_value(
            game_value,
            self.concentration,
            self.params.threshold,
            self.params.add_gain,
            self.params.sub_gain,
        );
        self.status.concentration = self.concentration;
        self.status.delta = delta;
        self.status.game_value = game_value;
        self.status.next_value = next;
        self.pending = next;
        Ok(())
    }
    // Re-writes the last computed value even when nothing changed since the previous tick.
    fn inject_value(&mut self) -> Result<(), MemoryError> {
        let connection = self.connection.as_mut().ok_or(MemoryError::NotConnected)?;
        connection.process.write_f32(connection.pointer, self.pending as f32)
    }
}
