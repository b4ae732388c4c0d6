//! Writing carved containers out as standalone `.mld` files.
//!
//! Output files are named `"{NN} {title}.mld"`. A registry of content hashes,
//! shared by every host file of one run, keeps byte-identical containers from
//! being written twice.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use log::{debug, info};

use crate::mld::carve::{self, CarvedMld, ScanOptions};
use crate::mld::types::error::{MldError, Result};
use crate::mld::utils;

const EXTENSION: &str = "mld";

/// Characters that are not allowed in file names on common filesystems.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', ':', '*', '?', '"', '<', '>', '|'];

/// Where and how carved containers are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOptions {
    pub output_dir: PathBuf,
    /// Remove the host file after at least one container was extracted from it.
    pub delete_source: bool,
}

/// Result of exporting one carved container.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Written(PathBuf),
    /// Same bytes were already written earlier in this run.
    Duplicate { skipped: PathBuf, existing: PathBuf },
}

/// Result of processing one host file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractSummary {
    /// Number of accepted candidates.
    pub found: usize,
    pub outcomes: Vec<ExportOutcome>,
    pub source_deleted: bool,
}

/// Exports carved containers, remembering what has been written.
#[derive(Debug, Default)]
pub struct Exporter {
    written: Mutex<HashMap<u64, PathBuf>>,
}

impl Exporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Carves `path` and exports every accepted container.
    pub fn extract_file(
        &self,
        path: impl AsRef<Path>,
        scan: &ScanOptions,
        export: &ExportOptions,
    ) -> Result<ExtractSummary> {
        let path = path.as_ref();
        info!("Scanning {}", path.display());
        let host = fs::read(path)?;
        let carved = carve::carve(&host, scan);
        if carved.is_empty() {
            return Ok(ExtractSummary {
                found: 0,
                outcomes: Vec::new(),
                source_deleted: false,
            });
        }

        let outcomes = self.export(&carved, &export.output_dir)?;
        if export.delete_source {
            fs::remove_file(path)?;
            info!("Deleted source file {}", path.display());
        }
        Ok(ExtractSummary {
            found: carved.len(),
            outcomes,
            source_deleted: export.delete_source,
        })
    }

    /// Writes each container to `output_dir`, skipping content already written.
    pub fn export(&self, carved: &[CarvedMld], output_dir: &Path) -> Result<Vec<ExportOutcome>> {
        fs::create_dir_all(output_dir)?;
        let mut outcomes = Vec::with_capacity(carved.len());

        for (index, item) in carved.iter().enumerate() {
            let name = numbered_file_name(index, carved.len(), &item.title);
            let target = output_dir.join(format!("{}.{}", name, EXTENSION));

            let hash = utils::content_hash(&item.bytes);
            let mut written = self.written.lock().map_err(|_| MldError::LockPoisoned)?;
            if let Some(existing) = written.get(&hash) {
                debug!("{} duplicates {}", target.display(), existing.display());
                outcomes.push(ExportOutcome::Duplicate {
                    skipped: target,
                    existing: existing.clone(),
                });
                continue;
            }

            let target = write_new(output_dir, &name, &item.bytes)?;
            info!("Wrote {} ({} bytes)", target.display(), item.bytes.len());
            written.insert(hash, target.clone());
            outcomes.push(ExportOutcome::Written(target));
        }
        Ok(outcomes)
    }
}

/// Writes `bytes` to the first free name among `"{name}.mld"`,
/// `"{name}_.mld"`, `"{name}_2.mld"`, `"{name}_3.mld"`, ...
fn write_new(output_dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
    for attempt in 0u32.. {
        let file_name = match attempt {
            0 => format!("{}.{}", name, EXTENSION),
            1 => format!("{}_.{}", name, EXTENSION),
            n => format!("{}_{}.{}", name, n, EXTENSION),
        };
        let target = output_dir.join(file_name);
        match OpenOptions::new().write(true).create_new(true).open(&target) {
            Ok(mut file) => {
                file.write_all(bytes)?;
                return Ok(target);
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("{} exists, trying the next name", target.display());
            }
            Err(e) => return Err(e.into()),
        }
    }
    Err(io::Error::new(io::ErrorKind::AlreadyExists, format!("no free file name for '{}'", name)).into())
}

/// Removes characters that cannot appear in file names.
pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c)).collect()
}

/// `"{NN} {title}"` for the zero-based `index` out of `total` files.
///
/// The number is 1-based and padded to at least two digits, more when
/// `total` needs them.
pub fn numbered_file_name(index: usize, total: usize, title: &str) -> String {
    let width = total.to_string().len().max(2);
    format!("{:0width$} {}", index + 1, sanitize_title(title), width = width)
}
