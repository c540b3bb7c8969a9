use anyhow::{anyhow, Context, Result};
use libloading::Library;
use ndarray::Array2;
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::ffi::CString;
use std::os::raw::{c_char, c_double, c_int};
use crate::drivers::{SampleSource, SourceError};
const PRESET_DEFAULT: c_int = 0;
const STREAM_RINGBUF_PACKETS: c_int = 450_000;
#[derive(Serialize)]
struct BrainFlowInputParams {
    serial_port: String,
    mac_address: String,
    ip_address: String,
    ip_address_aux: String,
    ip_address_anc: String,
    ip_port: i32,
    ip_port_aux: i32,
    ip_port_anc: i32,
    ip_protocol: i32,
    other_info: String,
    timeout: i32,
    serial_number: String,
    file: String,
    file_aux: String,
    file_anc: String,
    master_board: i32,
}
impl BrainFlowInputParams {
    fn for_serial(port: &str) -> Self {
        Self {
            serial_port: port.to_string(),
            mac_address: String::new(),
            ip_address: String::new(),
            ip_address_aux: String::new(),
            ip_address_anc: String::new(),
            ip_port: 0,
            ip_port_aux: 0,
            ip_port_anc: 0,
            ip_protocol: 0,
            other_info: String::new(),
            timeout: 0,
            serial_number: String::new(),
            file: String::new(),
            file_aux: String::new(),
            file_anc: String::new(),
            master_board: -100, // NO_BOARD
        }
    }
}
/// Platform file name of a BrainFlow library, e.g. `BoardController.dll`.
pub(crate) fn library_path(stem: &str) -> std::ffi::OsString {
    libloading::library_filename(stem)
}
struct BoardApi {
    #[allow(dead_code)]
    lib: Library,
    prepare_session: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    start_stream: unsafe extern "C" fn(c_int, *const c_char, c_int, *const c_char) -> c_int,
    stop_stream: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    release_session: unsafe extern "C" fn(c_int, *const c_char) -> c_int,
    get_sampling_rate: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int,
    get_num_rows: unsafe extern "C" fn(c_int, c_int, *mut c_int) -> c_int,
    get_eeg_channels: unsafe extern "C" fn(c_int, c_int, *mut c_int, *mut c_int) -> c_int,
    get_board_data_count: unsafe extern "C" fn(c_int, *mut c_int, c_int, *const c_char) -> c_int,
    get_board_data:
        unsafe extern "C" fn(c_int, c_int, *mut c_double, c_int, *const c_char) -> c_int,
}
impl BoardApi {
    fn load() -> Result<Self> {
        let path = library_path("BoardController");
        let lib = unsafe { Library::new(&path) }
            .with_context(|| format!("{} not found in working directory", path.to_string_lossy()))?;
        // Safety: signatures follow the BrainFlow 5.x board controller C API.
        unsafe {
            Ok(Self {
                prepare_session: *lib.get(b"prepare_session\0")?,
                start_stream: *lib.get(b"start_stream\0")?,
                stop_stream: *lib.get(b"stop_stream\0")?,
                release_session: *lib.get(b"release_session\0")?,
                get_sampling_rate: *lib.get(b"get_sampling_rate\0")?,
                get_num_rows: *lib.get(b"get_num_rows\0")?,
                get_eeg_channels: *lib.get(b"get_eeg_channels\0")?,
                get_board_data_count: *lib.get(b"get_board_data_count\0")?,
                get_board_data: *lib.get(b"get_board_data\0")?,
                lib,
            })
        }
    }
    fn instance() -> Result<&'static BoardApi> {
        static API: OnceCell<BoardApi> = OnceCell::new();
        API.get_or_try_init(Self::load)
    }
    fn check(code: c_int, ctx: &str) -> Result<()> {
        if code == 0 {
            Ok(())
        } else {
            Err(anyhow!("{ctx} failed (BrainFlow code {code})"))
        }
    }
    fn prepare(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.prepare_session)(board_id, input.as_ptr()) },
            "prepare_session",
        )
    }
    fn start_stream(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe {
                (self.start_stream)(
                    STREAM_RINGBUF_PACKETS,
                    std::ptr::null(),
                    board_id,
                    input.as_ptr(),
                )
            },
            "start_stream",
        )
    }
    fn stop_stream(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.stop_stream)(board_id, input.as_ptr()) },
            "stop_stream",
        )
    }
    fn release(&self, board_id: c_int, input: &CString) -> Result<()> {
        Self::check(
            unsafe { (self.release_session)(board_id, input.as_ptr()) },
            "release_session",
        )
    }
    fn sampling_rate(&self, board_id: c_int) -> Result<c_int> {
        let mut rate: c_int = 0;
        Self::check(
            unsafe { (self.get_sampling_rate)(board_id, PRESET_DEFAULT, &mut rate as *mut c_int) },
            "get_sampling_rate",
        )?;
        Ok(rate)
    }
    fn num_rows(&self, board_id: c_int) -> Result<c_int> {
        let mut rows: c_int = 0;
        Self::check(
            unsafe { (self.get_num_rows)(board_id, PRESET_DEFAULT, &mut rows as *mut c_int) },
            "get_num_rows",
        )?;
        Ok(rows)
    }
    fn eeg_channels(&self, board_id: c_int, max_channels: usize) -> Result<Vec<c_int>> {
        let mut out_len: c_int = 0;
        let mut buf = vec![0 as c_int; max_channels.max(32)];
        Self::check(
            unsafe {
                (self.get_eeg_channels)(
                    board_id,
                    PRESET_DEFAULT,
                    buf.as_mut_ptr(),
                    &mut out_len as *mut c_int,
                )
            },
            "get_eeg_channels",
        )?;
        buf.truncate(out_len.max(0) as usize);
        Ok(buf)
    }
    fn data_count(&self, board_id: c_int, input: &CString) -> Result<usize> {
        let mut count: c_int = 0;
        Self::check(
            unsafe {
                (self.get_board_data_count)(
                    PRESET_DEFAULT,
                    &mut count as *mut c_int,
                    board_id,
                    input.as_ptr(),
                )
            },
            "get_board_data_count",
        )?;
        Ok(count.max(0) as usize)
    }
    /// Drains `count` samples from the ring buffer into a row-major `rows x count` array.
    fn board_data(
        &self,
        board_id: c_int,
        num_rows: usize,
        count: usize,
        input: &CString,
    ) -> Result<Array2<f64>> {
        let mut buf = vec![0.0f64; num_rows * count];
        Self::check(
            unsafe {
                (self.get_board_data)(
                    count as c_int,
                    PRESET_DEFAULT,
                    buf.as_mut_ptr(),
                    board_id,
                    input.as_ptr(),
                )
            },
            "get_board_data",
        )?;
        Ok(Array2::from_shape_vec((num_rows, count), buf)?)
    }
}
/// BrainFlow-backed acquisition session for any board id BrainFlow supports
/// (Cyton is 0, Cyton+Daisy 2, the synthetic board -1).
pub struct BoardSession {
    board_id: c_int,
    api: &'static BoardApi,
    input_json: CString,
    eeg_channels: Vec<usize>,
    num_rows: usize,
    sample_rate_hz: f64,
    is_streaming: bool,
    released: bool,
}
impl BoardSession {
    /// Loads the board controller and prepares a session on `port_name`.
    pub fn connect(board_id: i32, port_name: &str) -> Result<Self, SourceError> {
        Self::try_connect(board_id, port_name)
            .map_err(|e| SourceError::DeviceUnavailable(format!("{e:#}")))
    }
    fn try_connect(board_id: i32, port_name: &str) -> Result<Self> {
        let api = BoardApi::instance()?;
        let params = BrainFlowInputParams::for_serial(port_name);
        let json = serde_json::to_string(&params)?;
        let input_json =
            CString::new(json).context("failed to encode BrainFlow input params to C string")?;
        api.prepare(board_id, &input_json)?;
        let sample_rate_hz = api.sampling_rate(board_id)? as f64;
        let num_rows = api.num_rows(board_id)? as usize;
        let eeg_channels = api
            .eeg_channels(board_id, num_rows)?
            .into_iter()
            .filter_map(|ch| usize::try_from(ch).ok())
            .filter(|ch| *ch < num_rows)
            .collect();
        log::info!("BrainFlow board {board_id} prepared on '{port_name}' ({sample_rate_hz} Hz, {num_rows} rows)");
        Ok(Self {
            board_id,
            api,
            input_json,
            eeg_channels,
            num_rows,
            sample_rate_hz,
            is_streaming: false,
            released: false,
        })
    }
    fn io(err: anyhow::Error) -> SourceError {
        SourceError::Io(format!("{err:#}"))
    }
}
impl SampleSource for BoardSession {
    fn sample_rate_hz(&self) -> f64 {
        self.sample_rate_hz
    }
    fn eeg_channels(&self) -> &[usize] {
        &self.eeg_channels
    }
    fn num_rows(&self) -> usize {
        self.num_rows
    }
    fn start_stream(&mut self) -> Result<(), SourceError> {
        if self.released {
            return Err(SourceError::Closed);
        }
        if !self.is_streaming {
            self.api
                .start_stream(self.board_id, &self.input_json)
                .map_err(Self::io)?;
            self.is_streaming = true;
        }
        Ok(())
    }
    fn stop_stream(&mut self) -> Result<(), SourceError> {
        if self.is_streaming && !self.released {
            self.api
                .stop_stream(self.board_id, &self.input_json)
                .map_err(Self::io)?;
            self.is_streaming = false;
        }
        Ok(())
    }
    fn pull_all(&mut self) -> Result<Array2<f64>, SourceError> {
        if self.released {
            return Err(SourceError::Closed);
        }
        let count = self
            .api
            .data_count(self.board_id, &self.input_json)
            .map_err(Self::io)?;
        if count == 0 {
            return Ok(Array2::zeros((self.num_rows, 0)));
        }
        self.api
            .board_data(self.board_id, self.num_rows, count, &self.input_json)
            .map_err(Self::io)
    }
    fn release(&mut self) -> Result<(), SourceError> {
        if !self.released {
            self.stop_stream()?;
            self.api
                .release(self.board_id, &self.input_json)
                .map_err(Self::io)?;
            self.released = true;
        }
        Ok(())
    }
}
impl Drop for BoardSession {
    fn drop(&mut self) {
        let _ = self.release();
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn input_params_serialize_with_brainflow_keys() {
        let json = serde_json::to_value(BrainFlowInputParams::for_serial("COM4")).unwrap();
        assert_eq!(json["serial_port"], "COM4");
        assert_eq!(json["master_board"], -100);
        assert_eq!(json["ip_port"], 0);
    }
    #[test]
    fn library_names_follow_platform_convention() {
        let name = library_path("BoardController").to_string_lossy().into_owned();
        assert!(name.contains("BoardController"));
    }
}
