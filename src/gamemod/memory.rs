// src/gamemod/memory.rs
use thiserror::Error;
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("process '{0}' not found")]
    ProcessNotFound(String),
    #[error("null pointer while resolving offset {offset:#x} at {address:#x}")]
    PointerUnresolved { address: u64, offset: u64 },
    #[error("memory access at {address:#x} failed: {reason}")]
    Io { address: u64, reason: String },
    #[error("not connected to the game process")]
    NotConnected,
    #[error("process memory access is not supported on this platform")]
    Unsupported,
}
/// An opened foreign process.
pub trait ProcessMemory: Send {
    /// Load address of the main module.
    fn base_address(&self) -> u64;
    fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryError>;
    fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<(), MemoryError>;
    fn read_f32(&self, address: u64) -> Result<f32, MemoryError> {
        let mut buf = [0u8; 4];
        self.read_bytes(address, &mut buf)?;
        Ok(f32::from_le_bytes(buf))
    }
    fn write_f32(&mut self, address: u64, value: f32) -> Result<(), MemoryError> {
        self.write_bytes(address, &value.to_le_bytes())
    }
    /// Reads a 64-bit pointer.
    fn read_pointer(&self, address: u64) -> Result<u64, MemoryError> {
        let mut buf = [0u8; 8];
        self.read_bytes(address, &mut buf)?;
        Ok(u64::from_le_bytes(buf))
    }
}
pub trait ProcessConnector: Send {
    fn open(&self, process_name: &str) -> Result<Box<dyn ProcessMemory>, MemoryError>;
}
/// Follows a pointer chain starting at `base`.
///
/// The pointer stored at `base` is dereferenced, then every offset is added in
/// turn; all but the last sum are dereferenced again. Returns the final sum, or
/// `base` itself when there are no offsets.
pub fn resolve_pointer_chain(
    process: &dyn ProcessMemory,
    base: u64,
    offsets: &[u64],
) -> Result<u64, MemoryError> {
    let Some((last, inner)) = offsets.split_last() else {
        return Ok(base);
    };
    let mut at = base;
    let mut address = process.read_pointer(at)?;
    for &offset in inner {
        if address == 0 {
            return Err(MemoryError::PointerUnresolved { address: at, offset });
        }
        at = address.wrapping_add(offset);
        address = process.read_pointer(at)?;
    }
    if address == 0 {
        return Err(MemoryError::PointerUnresolved {
            address: at,
            offset: *last,
        });
    }
    Ok(address.wrapping_add(*last))
}
/// Connector for platforms without process memory access.
pub struct UnsupportedConnector;
impl ProcessConnector for UnsupportedConnector {
    fn open(&self, _process_name: &str) -> Result<Box<dyn ProcessMemory>, MemoryError> {
        Err(MemoryError::Unsupported)
    }
}
#[cfg(test)]
pub(crate) mod fake {
    use super::*;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    /// Sparse byte map standing in for a game process.
    #[derive(Clone, Default)]
    pub struct FakeProcess {
        pub base: u64,
        pub bytes: Arc<Mutex<HashMap<u64, u8>>>,
        pub fail_writes: Arc<Mutex<bool>>,
    }
    impl FakeProcess {
        pub fn new(base: u64) -> Self {
            Self {
                base,
                ..Self::default()
            }
        }
        pub fn poke(&self, address: u64, data: &[u8]) {
            let mut bytes = self.bytes.lock().unwrap();
            for (i, b) in data.iter().enumerate() {
                bytes.insert(address + i as u64, *b);
            }
        }
        pub fn poke_pointer(&self, address: u64, value: u64) {
            self.poke(address, &value.to_le_bytes());
        }
        pub fn poke_f32(&self, address: u64, value: f32) {
            self.poke(address, &value.to_le_bytes());
        }
        pub fn peek_f32(&self, address: u64) -> f32 {
            let mut buf = [0u8; 4];
            self.read_bytes(address, &mut buf).unwrap();
            f32::from_le_bytes(buf)
        }
    }
    impl ProcessMemory for FakeProcess {
        fn base_address(&self) -> u64 {
            self.base
        }
        fn read_bytes(&self, address: u64, buf: &mut [u8]) -> Result<(), MemoryError> {
            let bytes = self.bytes.lock().unwrap();
            for (i, slot) in buf.iter_mut().enumerate() {
                *slot = *bytes.get(&(address + i as u64)).ok_or(MemoryError::Io {
                    address,
                    reason: "unmapped".into(),
                })?;
            }
            Ok(())
        }
        fn write_bytes(&mut self, address: u64, data: &[u8]) -> Result<(), MemoryError> {
            if *self.fail_writes.lock().unwrap() {
                return Err(MemoryError::Io {
                    address,
                    reason: "write rejected".into(),
                });
            }
            self.poke(address, data);
            Ok(())
        }
    }
    /// Hands out clones of one fake process under a fixed name.
    pub struct FakeConnector {
        pub name: String,
        pub process: FakeProcess,
    }
    impl ProcessConnector for FakeConnector {
        fn open(&self, process_name: &str) -> Result<Box<dyn ProcessMemory>, MemoryError> {
            if process_name.eq_ignore_ascii_case(&self.name) {
                Ok(Box::new(self.process.clone()))
            } else {
                Err(MemoryError::ProcessNotFound(process_name.to_string()))
            }
        }
    }
}
#[cfg(test)]
mod tests {
    use super::fake::FakeProcess;
    use super::*;
    #[test]
    fn resolves_two_level_chain() {
        let process = FakeProcess::new(0x1400_0000);
        let base = 0x1400_0000 + 0x7E6_1B90;
        process.poke_pointer(base, 0x2000);
        process.poke_pointer(0x2000 + 0x78, 0x9000);
        let address = resolve_pointer_chain(&process, base, &[0x78, 0x1B50]).unwrap();
        assert_eq!(address, 0x9000 + 0x1B50);
    }
    #[test]
    fn null_link_is_reported() {
        let process = FakeProcess::new(0);
        process.poke_pointer(0x100, 0x2000);
        process.poke_pointer(0x2078, 0);
        let err = resolve_pointer_chain(&process, 0x100, &[0x78, 0x1B50]).unwrap_err();
        assert!(matches!(
            err,
            MemoryError::PointerUnresolved {
                address: 0x2078,
                offset: 0x1B50
            }
        ));
    }
    #[test]
    fn empty_chain_returns_base() {
        let process = FakeProcess::new(0);
        assert_eq!(resolve_pointer_chain(&process, 0x42, &[]).unwrap(), 0x42);
    }
    #[test]
    fn unmapped_read_is_io_error() {
        let process = FakeProcess::new(0);
        assert!(matches!(
            process.read_f32(0x10),
            Err(MemoryError::Io { address: 0x10, .. })
        ));
    }
    #[test]
    fn f32_round_trips_little_endian() {
        let mut process = FakeProcess::new(0);
        process.write_f32(0x40, 100.25).unwrap();
        assert_eq!(process.read_f32(0x40).unwrap(), 100.25);
        assert_eq!(process.peek_f32(0x40), 100.25);
    }
    #[test]
    fn unsupported_connector_refuses() {
        assert!(matches!(
            UnsupportedConnector.open("game.exe"),
            Err(MemoryError::Unsupported)
        ));
    }
}
