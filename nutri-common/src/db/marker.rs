//! "Not yet initialized" marker
//!
//! A plain file next to the database. Present while an ingestion has been
//! requested but has not yet reached full readiness, so a restart in the
//! middle of a load re-runs it.

use crate::Result;
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct InitMarker {
    path: PathBuf,
}

impl InitMarker {
    /// Marker belonging to the database at `db_path` (`<db>.uninitialized`)
    pub fn for_database(db_path: &Path) -> Self {
        let mut name = db_path.as_os_str().to_os_string();
        name.push(".uninitialized");
        Self {
            path: PathBuf::from(name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_set(&self) -> bool {
        self.path.exists()
    }

    pub fn set(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, b"")?;
        debug!("Set init marker: {}", self.path.display());
        Ok(())
    }

    /// Remove the marker; absent already is fine
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                debug!("Cleared init marker: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
