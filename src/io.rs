// io.rs
// Reading log files (plain or gzip) into numbered lines
use crate::profile_scope;
use flate2::read::GzDecoder;
use std::io::{Cursor, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{AnalysisError, Result};
use crate::groups::OrderedGroups;

/// One non-blank input line with its origin, for error reporting.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub file: Arc<Path>,
    pub number: usize,
    pub text: String,
}

impl Line {
    pub fn new(file: Arc<Path>, number: usize, text: impl Into<String>) -> Self {
        Self {
            file,
            number,
            text: text.into(),
        }
    }

    /// A parse error pointing at this line.
    pub fn error(&self, message: impl Into<String>) -> AnalysisError {
        AnalysisError::Parse {
            file: self.file.to_path_buf(),
            line: self.number,
            message: message.into(),
        }
    }
}

/// Every input must exist before any of them is read.
pub fn check_inputs(paths: &[PathBuf]) -> Result<()> {
    match paths.iter().find(|path| !path.is_file()) {
        Some(path) => Err(AnalysisError::MissingFile(path.clone())),
        None => Ok(()),
    }
}

fn maybe_decompress_gzip(data: &[u8]) -> std::io::Result<Option<Vec<u8>>> {
    if data.len() < 2 || data[0] != 0x1f || data[1] != 0x8b {
        return Ok(None);
    }

    let mut decoder = GzDecoder::new(Cursor::new(data));
    let mut decoded = Vec::new();
    decoder.read_to_end(&mut decoded)?;
    Ok(Some(decoded))
}

fn read_text(path: &Path) -> Result<String> {
    let io_error = |source| AnalysisError::Io {
        path: path.to_path_buf(),
        source,
    };
    let data = std::fs::read(path).map_err(io_error)?;
    let data = maybe_decompress_gzip(&data).map_err(io_error)?.unwrap_or(data);
    String::from_utf8(data)
        .map_err(|e| io_error(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// All non-blank lines of one file, numbered from 1. Gzip input is detected
/// by its magic bytes.
pub fn read_lines(path: &Path) -> Result<Vec<Line>> {
    profile_scope!(FileLines);
    let text = read_text(path)?;
    let file: Arc<Path> = Arc::from(path);
    let mut lines = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        if raw.trim().is_empty() {
            log::debug!("{}:{}: skipping blank line", path.display(), index + 1);
            continue;
        }
        lines.push(Line::new(Arc::clone(&file), index + 1, raw));
    }
    log::info!("read {} lines from {}", lines.len(), path.display());
    Ok(lines)
}

/// Lines of every file, concatenated in argument order.
pub fn read_all(paths: &[PathBuf]) -> Result<Vec<Line>> {
    let mut lines = Vec::new();
    for path in paths {
        lines.extend(read_lines(path)?);
    }
    Ok(lines)
}

/// Files whose first line is a group label (a mode or a DPE). Files sharing
/// a label are merged in argument order; groups appear in first-seen order.
pub fn read_headed(paths: &[PathBuf]) -> Result<OrderedGroups<String, Vec<Line>>> {
    let mut groups: OrderedGroups<String, Vec<Line>> = OrderedGroups::new();
    for path in paths {
        let mut lines = read_lines(path)?.into_iter();
        let header = lines
            .next()
            .ok_or_else(|| AnalysisError::MissingHeader(path.clone()))?;
        let label = header.text.trim().to_string();
        log::debug!("{}: group '{}'", path.display(), label);
        groups.entry(label).extend(lines);
    }
    Ok(groups)
}
