use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::error::{CnAlignError, Result};

/// Solver license scope for one run
///
/// Acquired once before any model is built and released on drop, so every
/// exit path (including solver errors) ends the session.
#[derive(Debug)]
pub struct SolverSession {
    license: PathBuf,
    started: Instant,
}

impl SolverSession {
    /// The credential must be an existing, non-empty regular file
    pub fn acquire<P: AsRef<Path>>(license: P) -> Result<Self> {
        let license = license.as_ref().to_path_buf();
        let fail = |reason: String| CnAlignError::License {
            path: license.clone(),
            reason,
        };

        let metadata = std::fs::metadata(&license).map_err(|e| fail(e.to_string()))?;
        if !metadata.is_file() {
            return Err(fail("not a regular file".to_string()));
        }
        if metadata.len() == 0 {
            return Err(fail("license file is empty".to_string()));
        }

        log::info!("solver session acquired ({})", license.display());
        Ok(Self {
            license,
            started: Instant::now(),
        })
    }

    pub fn license(&self) -> &Path {
        &self.license
    }
}

impl Drop for SolverSession {
    fn drop(&mut self) {
        log::info!(
            "solver session released after {:.1}s",
            self.started.elapsed().as_secs_f64()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    #[test]
    fn test_acquire_valid_license() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "LICENSEID=0000").unwrap();

        let session = SolverSession::acquire(file.path()).unwrap();
        assert_eq!(session.license(), file.path());
    }

    #[test]
    fn test_acquire_missing_license() {
        let result = SolverSession::acquire("nonexistent/solver.lic");
        assert!(matches!(result, Err(CnAlignError::License { .. })));
    }

    #[test]
    fn test_acquire_empty_license() {
        let file = NamedTempFile::new().unwrap();
        let result = SolverSession::acquire(file.path());
        match result {
            Err(CnAlignError::License { reason, .. }) => assert!(reason.contains("empty")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_acquire_directory() {
        let dir = TempDir::new().unwrap();
        let result = SolverSession::acquire(dir.path());
        assert!(matches!(result, Err(CnAlignError::License { .. })));
    }
}
