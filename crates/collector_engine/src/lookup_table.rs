use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use collector_core::{rows_for_job, Group, InputError, Job, LookupRow};
use thiserror::Error;

use crate::filename::group_file_stem;

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid job input: {0}")]
    Input(#[from] InputError),
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupUpdate {
    pub path: PathBuf,
    pub rows_written: usize,
}

/// Where lookup files live: `<install_root>/<lookup_dir>/<group>_iplist.csv`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupLayout {
    pub install_root: PathBuf,
    pub lookup_dir: PathBuf,
}

impl LookupLayout {
    pub const DEFAULT_LOOKUP_DIR: &'static str = "etc/apps/TA-cyber_recon/lookups";

    pub fn new(install_root: impl Into<PathBuf>, lookup_dir: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            lookup_dir: lookup_dir.into(),
        }
    }

    pub fn path_for(&self, group_name: &str) -> PathBuf {
        self.install_root
            .join(&self.lookup_dir)
            .join(format!("{}_iplist.csv", group_file_stem(group_name)))
    }
}

/// Append-only writer for lookup CSV files.
///
/// Appends to the same path are serialized through a per-path lock, and each
/// job's rows go out in a single write, so concurrent groups never interleave
/// partial lines. Cloning shares the locks.
#[derive(Debug, Clone, Default)]
pub struct LookupTable {
    locks: Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>,
}

impl LookupTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one row per accepted address of `job`'s input.
    pub fn append_rows(
        &self,
        path: &Path,
        group: &Group,
        job: &Job,
    ) -> Result<LookupUpdate, LookupError> {
        let input = job.parse_input()?;
        let rows = rows_for_job(group.name(), &job.name, &input);
        let rows_written = self.append(path, &rows)?;
        Ok(LookupUpdate {
            path: path.to_path_buf(),
            rows_written,
        })
    }

    /// Appends `rows` in one write. An empty slice leaves the file untouched.
    pub fn append(&self, path: &Path, rows: &[LookupRow]) -> Result<usize, LookupError> {
        if rows.is_empty() {
            return Ok(0);
        }
        let io_err = |source: io::Error| LookupError::Io {
            path: path.to_path_buf(),
            source,
        };

        let lock = self.lock_for(path);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(io_err)?;

        let mut batch = String::new();
        if !ends_with_newline(&mut file).map_err(io_err)? {
            batch.push('\n');
        }
        for row in rows {
            batch.push_str(&row.to_csv_line());
            batch.push('\n');
        }
        file.write_all(batch.as_bytes()).map_err(io_err)?;
        file.flush().map_err(io_err)?;
        Ok(rows.len())
    }

    fn lock_for(&self, path: &Path) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        locks.entry(path.to_path_buf()).or_default().clone()
    }
}

/// Empty files count as terminated so a fresh file does not start with a blank line.
fn ends_with_newline(file: &mut fs::File) -> io::Result<bool> {
    let len = file.metadata()?.len();
    if len == 0 {
        return Ok(true);
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    Ok(last[0] == b'\n')
}
