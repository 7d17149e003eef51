//! Archive orchestrator: fans parsing out across a rayon worker pool, then
//! hands every parsed notice to a single writer transaction.
//!
//! The split mirrors the two-tier concurrency shape used elsewhere in this
//! codebase for CPU-bound fan-out followed by a single serialized write:
//! `par_iter` does the parsing (detect dialect, parse, normalize in
//! memory — no shared mutable state), then one thread owns the SQLite
//! transaction so write ordering and the per-archive duplicate check stay
//! deterministic.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use roxmltree::Document as XmlDocument;

use ted_core::db::DbPool;
use ted_core::error::Result;
use ted_core::loader::{ArchiveReport, Loader};
use ted_core::record::Notice;

use crate::detect::{detect_file, Dialect};
use crate::{legacy, ubl};

#[derive(Debug, Default, Clone, Copy)]
pub struct ArchiveOutcome {
    pub saved: usize,
    pub skipped_duplicate: usize,
    pub skipped_unparseable: usize,
    pub cancelled: bool,
}

/// Walks `dir` for `.xml` files, parses them in parallel, then persists
/// every successfully parsed notice in one transaction via `Loader`.
///
/// `cancel` is polled between the parse and write phases so a long-running
/// archive import can be stopped between archives without corrupting the
/// in-flight transaction.
pub fn run_archive(dir: &Path, pool: DbPool, cancel: Arc<AtomicBool>) -> Result<ArchiveOutcome> {
    let files = list_xml_files(dir)?;
    tracing::info!(dir = %dir.display(), count = files.len(), "scanning archive");

    if cancel.load(Ordering::Relaxed) {
        return Ok(ArchiveOutcome {
            cancelled: true,
            ..Default::default()
        });
    }

    let parsed: Vec<Option<Notice>> = files
        .par_iter()
        .map(|path| parse_one(path).unwrap_or_else(|err| {
            tracing::warn!(file = %path.display(), error = %err, "failed to parse notice");
            None
        }))
        .collect();

    let skipped_unparseable = parsed.iter().filter(|n| n.is_none()).count();
    let notices: Vec<Notice> = parsed.into_iter().flatten().collect();

    if cancel.load(Ordering::Relaxed) {
        return Ok(ArchiveOutcome {
            skipped_unparseable,
            cancelled: true,
            ..Default::default()
        });
    }

    let loader = Loader::new(pool);
    let ArchiveReport { saved, skipped } = loader.save_archive(&notices)?;

    Ok(ArchiveOutcome {
        saved,
        skipped_duplicate: skipped,
        skipped_unparseable,
        cancelled: false,
    })
}

fn list_xml_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) == Some("xml") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn parse_one(path: &Path) -> Result<Option<Notice>> {
    let Some(dialect) = detect_file(path)? else {
        tracing::debug!(file = %path.display(), "unrecognized dialect, skipping");
        return Ok(None);
    };

    let text = fs::read_to_string(path)?;
    let xml = XmlDocument::parse(&text)
        .map_err(|e| ted_core::error::TedError::Malformed(format!("{}: {e}", path.display())))?;

    let fallback_doc_id = path.file_stem().and_then(|s| s.to_str()).unwrap_or("unknown");

    match dialect {
        Dialect::Legacy => legacy::parse(xml.root_element(), fallback_doc_id),
        Dialect::Ubl => ubl::parse(xml.root_element(), fallback_doc_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ted_core::db::create_memory_pool;

    #[test]
    fn empty_directory_yields_empty_outcome() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_memory_pool().unwrap();
        let outcome = run_archive(dir.path(), pool, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(outcome.saved, 0);
        assert_eq!(outcome.skipped_unparseable, 0);
    }

    #[test]
    fn pre_cancelled_run_touches_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let pool = create_memory_pool().unwrap();
        let outcome = run_archive(dir.path(), pool, Arc::new(AtomicBool::new(true))).unwrap();
        assert!(outcome.cancelled);
    }

    #[test]
    fn non_notice_xml_is_skipped_not_errored() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("junk.xml"), "<SomethingElse/>").unwrap();
        let pool = create_memory_pool().unwrap();
        let outcome = run_archive(dir.path(), pool, Arc::new(AtomicBool::new(false))).unwrap();
        assert_eq!(outcome.saved, 0);
        assert_eq!(outcome.skipped_unparseable, 1);
    }
}
