use std::path::{Path, PathBuf};
use std::{env, fs};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::model::{Result, yymmdd};

/// Working area for one pipeline run. The directory name carries the
/// session date and a fresh run identifier, so concurrent runs for the same
/// date never share files. The directory is removed when the run ends,
/// whatever the outcome; removal failures are logged and never escalate.
#[derive(Debug)]
pub struct RunContext {
    pub run_id: Uuid,
    pub session_date: NaiveDate,
    dir: PathBuf,
    cleaned: bool,
}

impl RunContext {
    pub fn new(session_date: NaiveDate) -> Result<RunContext> {
        let run_id = Uuid::new_v4();
        let dir = env::temp_dir().join(format!("pregao_{}_{}", yymmdd(session_date), run_id));
        fs::create_dir_all(&dir)?;
        log::debug!("run {} working in {}", run_id, dir.display());
        Ok(RunContext {
            run_id,
            session_date,
            dir,
            cleaned: false,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Removes the working directory. Safe to call more than once.
    pub fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;
        match fs::remove_dir_all(&self.dir) {
            Ok(()) => log::info!("removed working directory {}", self.dir.display()),
            Err(err) => log::warn!(
                "could not remove working directory {}: {}",
                self.dir.display(),
                err
            ),
        }
    }
}

impl Drop for RunContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    #[test]
    fn creates_and_removes_working_directory() {
        let mut ctx = RunContext::new(session_date()).unwrap();
        let dir = ctx.dir().to_path_buf();
        assert!(dir.is_dir());
        ctx.cleanup();
        assert!(!dir.exists());
    }

    #[test]
    fn drop_removes_working_directory() {
        let dir = {
            let ctx = RunContext::new(session_date()).unwrap();
            ctx.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn concurrent_runs_get_distinct_directories() {
        let a = RunContext::new(session_date()).unwrap();
        let b = RunContext::new(session_date()).unwrap();
        assert_ne!(a.dir(), b.dir());
    }
}
