//! Trace and memory files
//!
//! Both files are flat sequences of fixed-size little-endian records written
//! with `bincode`'s fixed-int encoding:
//! - trace: `(pc, ap, fp)` as three `u64`, 24 bytes per step
//! - memory: `(address, value)` as a `u64` and a 32-byte felt, 40 bytes per cell

use crate::error::{Result, RuntimeError};
use crate::state::RelocatedTraceEntry;
use bincode::Options;
use casm_spec::Felt;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::Path;

pub const TRACE_RECORD_SIZE: usize = 24;
pub const MEMORY_RECORD_SIZE: usize = 40;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_little_endian()
}

pub fn write_trace<W: Write>(writer: &mut W, trace: &[RelocatedTraceEntry]) -> Result<()> {
    for entry in trace {
        codec().serialize_into(&mut *writer, entry)?;
    }
    Ok(())
}

pub fn write_memory<W: Write>(writer: &mut W, memory: &[(u64, Felt)]) -> Result<()> {
    for (address, value) in memory {
        codec().serialize_into(&mut *writer, &(*address, value.to_bytes_le()))?;
    }
    Ok(())
}

fn read_records<R: Read>(
    reader: &mut R,
    kind: &'static str,
    record_size: usize,
) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    if bytes.len() % record_size != 0 {
        return Err(RuntimeError::MalformedFile {
            kind,
            reason: format!(
                "{} bytes is not a multiple of the {record_size}-byte record size",
                bytes.len()
            ),
        });
    }
    Ok(bytes)
}

pub fn read_trace<R: Read>(reader: &mut R) -> Result<Vec<RelocatedTraceEntry>> {
    let bytes = read_records(reader, "trace", TRACE_RECORD_SIZE)?;
    bytes
        .chunks_exact(TRACE_RECORD_SIZE)
        .map(|chunk| -> Result<RelocatedTraceEntry> { Ok(codec().deserialize(chunk)?) })
        .collect()
}

pub fn read_memory<R: Read>(reader: &mut R) -> Result<Vec<(u64, Felt)>> {
    let bytes = read_records(reader, "memory", MEMORY_RECORD_SIZE)?;
    bytes
        .chunks_exact(MEMORY_RECORD_SIZE)
        .map(|chunk| -> Result<(u64, Felt)> {
            let (address, value): (u64, [u8; 32]) = codec().deserialize(chunk)?;
            let value = Felt::from_bytes_le(&value).map_err(|err| RuntimeError::MalformedFile {
                kind: "memory",
                reason: format!("cell {address}: {err}"),
            })?;
            Ok((address, value))
        })
        .collect()
}

// ============================================================================
// Files
// ============================================================================

pub fn write_trace_file(path: impl AsRef<Path>, trace: &[RelocatedTraceEntry]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_trace(&mut writer, trace)?;
    writer.flush()?;
    Ok(())
}

pub fn write_memory_file(path: impl AsRef<Path>, memory: &[(u64, Felt)]) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_memory(&mut writer, memory)?;
    writer.flush()?;
    Ok(())
}

pub fn read_trace_file(path: impl AsRef<Path>) -> Result<Vec<RelocatedTraceEntry>> {
    read_trace(&mut File::open(path)?)
}

pub fn read_memory_file(path: impl AsRef<Path>) -> Result<Vec<(u64, Felt)>> {
    read_memory(&mut File::open(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_layout() {
        let trace = vec![
            RelocatedTraceEntry::new(1, 3, 3),
            RelocatedTraceEntry::new(2, 4, 3),
        ];
        let mut bytes = Vec::new();
        write_trace(&mut bytes, &trace).unwrap();
        assert_eq!(bytes.len(), 2 * TRACE_RECORD_SIZE);
        assert_eq!(&bytes[..8], &1u64.to_le_bytes());
        assert_eq!(&bytes[8..16], &3u64.to_le_bytes());
        assert_eq!(read_trace(&mut bytes.as_slice()).unwrap(), trace);
    }

    #[test]
    fn test_memory_layout() {
        let memory = vec![(1, Felt::from(0x0102u64)), (5, Felt::from(-1i64))];
        let mut bytes = Vec::new();
        write_memory(&mut bytes, &memory).unwrap();
        assert_eq!(bytes.len(), 2 * MEMORY_RECORD_SIZE);
        assert_eq!(&bytes[..8], &1u64.to_le_bytes());
        assert_eq!(bytes[8], 0x02);
        assert_eq!(bytes[9], 0x01);
        assert_eq!(read_memory(&mut bytes.as_slice()).unwrap(), memory);
    }

    #[test]
    fn test_truncated_files() {
        let bytes = vec![0u8; TRACE_RECORD_SIZE + 1];
        assert!(matches!(
            read_trace(&mut bytes.as_slice()),
            Err(RuntimeError::MalformedFile { kind: "trace", .. })
        ));
        let bytes = vec![0u8; MEMORY_RECORD_SIZE - 1];
        assert!(matches!(
            read_memory(&mut bytes.as_slice()),
            Err(RuntimeError::MalformedFile { kind: "memory", .. })
        ));
    }

    #[test]
    fn test_memory_value_out_of_field() {
        let mut bytes = vec![0u8; MEMORY_RECORD_SIZE];
        bytes[8..].fill(0xff);
        assert!(matches!(
            read_memory(&mut bytes.as_slice()),
            Err(RuntimeError::MalformedFile { .. })
        ));
    }
}
