// src/gamemod/windows.rs
use std::mem;
use winapi::shared::minwindef::{DWORD, FALSE, LPCVOID, LPVOID};
use winapi::um::handleapi::{CloseHandle, INVALID_HANDLE_VALUE};
use winapi::um::memoryapi::{ReadProcessMemory, WriteProcessMemory};
use winapi::um::processthreadsapi::OpenProcess;
use winapi::um::tlhelp32::{
    CreateToolhelp32Snapshot, Module32FirstW, Process32FirstW, Process32NextW, MODULEENTRY32W,
    PROCESSENTRY32W, TH32CS_SNAPMODULE, TH32CS_SNAPMODULE32, TH32CS_SNAPPROCESS,
};
use winapi::um::winnt::{
    HANDLE, PROCESS_QUERY_INFORMATION, PROCESS_VM_OPERATION, PROCESS_VM_READ, PROCESS_VM_WRITE,
};
use super::memory::{MemoryError, ProcessConnector, ProcessMemory};
/// Closes the wrapped handle on drop.
struct OwnedHandle(HANDLE);
impl OwnedHandle {
    fn new(handle: HANDLE) -> Option<Self> {
        if handle.is_null() || handle == INVALID_HANDLE_VALUE {
            None
        } else {
            Some(Self(handle))
        }
    }
}
impl Drop for OwnedHandle {
    fn drop(&mut self) {
        unsafe {
            CloseHandle(self.0);
        }
    }
}
fn wide_to_string(wide: &[u16]) -> String {
    let len = wide.iter().position(|c| *c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..len])
}
fn find_process_id(name: &str) -> Option<DWORD> {
    let snapshot = OwnedHandle::new(unsafe { CreateToolhelp32Snapshot(TH32CS_SNAPPROCESS, 0) })?;
    let mut entry: PROCESSENTRY32W = unsafe { mem::zeroed() };
    entry.dwSize = mem::size_of::<PROCESSENTRY32W>() as DWORD;
    let mut more = unsafe { Process32FirstW(snapshot.0, &mut entry) } != FALSE;
    while more {
        if wide_to_string(&entry.szExeFile).eq_ignore_ascii_case(name) {
            return Some(entry.th32ProcessID);
        }
        more = unsafe { Process32NextW(snapshot.0, &mut entry) } != FALSE;
    }
    None
}
fn main_module_base(pid: DWORD) -> Option<u64> {
    let snapshot = OwnedHandle::new(unsafe {
        CreateToolhelp32Snapshot(TH32CS_SNAPMODULE | TH32CS_SNAPMODULE32, pid)
    })?;
    let mut entry: MODULEENTRY32W = unsafe { mem::zeroed() };
    entry.dwSize = mem::size_of::<MODULEENTRY32W>() as DWORD;
    if unsafe { Module32FirstW(snapshot.0, &mut entry) } == FALSE {
        return None;
    }
    Some(entry.modBaseAddr as u64)
}
pub struct WindowsProcess {
    handle: OwnedHandle,
    base: u64,
}
// The handle is only used from the engine thread that owns the process.
unsafe impl Send for WindowsProcess {}
impl ProcessMemory for WindowsProcess {
    fn base_address(&self) -> u64 {
        self.base
    }
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
        let mut read: usize = 0;
        let ok = unsafe {
            ReadProcessMemory(
                self.handle.0,
                address as LPCVOID,
                buf.as_mut_ptr() as LPVOID,
                buf.len(),
                &mut read,
            )
        };
        if ok == FALSE || read != buf.len() {
            return Err(MemoryError::Io {
                address,
                reason: format!("ReadProcessMemory read {read} of {} bytes", buf.len()),
            });
        }
        Ok(())
    }
    fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<(), MemoryError> {
        let mut written: usize = 0;
        let ok = unsafe {
            WriteProcessMemory(
                self.handle.0,
                address as LPVOID,
                data.as_ptr() as LPCVOID,
                data.len(),
                &mut written,
            )
        };
        if ok == FALSE || written != data.len() {
            return Err(MemoryError::Io {
                address,
                reason: format!("WriteProcessMemory wrote {written} of {} bytes", data.len()),
            });
        }
        Ok(())
    }
}
pub struct WindowsConnector;
impl ProcessConnector for WindowsConnector {
    fn open(&self, process_name: &str) -> Result<Box<dyn ProcessMemory>, MemoryError> {
        let not_found = || MemoryError::ProcessNotFound(process_name.to_string());
        let pid = find_process_id(process_name).ok_or_else(not_found)?;
        let access =
            PROCESS_VM_READ | PROCESS_VM_WRITE | PROCESS_VM_OPERATION | PROCESS_QUERY_INFORMATION;
        let handle = OwnedHandle::new(unsafe { OpenProcess(access, FALSE, pid) })
            .ok_or_else(not_found)?;
        let base = main_module_base(pid).ok_or_else(not_found)?;
        log::info!("opened {process_name} (pid {pid}, base {base:#x})");
        Ok(Box::new(WindowsProcess { handle, base }))
    }
}
