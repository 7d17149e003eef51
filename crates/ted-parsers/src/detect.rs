//! Picks the dialect parser for a file without fully parsing it.
//!
//! Reads a small prefix of the file and probes for dialect-identifying
//! markers. Files that match neither known dialect are not an error: the
//! orchestrator logs and skips them, the way the archive import loop treats
//! any other non-notice XML mixed into a TED bulk archive.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use ted_core::error::Result;

const PREFIX_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Legacy,
    Ubl,
}

pub fn detect_file(path: &Path) -> Result<Option<Dialect>> {
    let mut file = File::open(path)?;
    let mut buf = vec![0u8; PREFIX_BYTES];
    let read = file.read(&mut buf)?;
    buf.truncate(read);
    let prefix = String::from_utf8_lossy(&buf);
    Ok(detect_str(&prefix))
}

pub fn detect_str(prefix: &str) -> Option<Dialect> {
    if prefix.contains("<ContractAwardNotice") || prefix.contains("<can:ContractAwardNotice") {
        return Some(Dialect::Ubl);
    }
    if prefix.contains("<TED_EXPORT") {
        return Some(Dialect::Legacy);
    }
    None
}
