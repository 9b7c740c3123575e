use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// A task's private scratch directory, removed on drop unless kept.
///
/// Names are `faultsim-<pid>-r<run>-t<task>` so concurrent tasks and
/// concurrent runs in one process never collide.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
    keep: bool,
}

impl WorkDir {
    pub fn name(run: u64, task: u64) -> String {
        format!("faultsim-{}-r{run}-t{task}", std::process::id())
    }

    pub fn create(root: &Path, run: u64, task: u64) -> io::Result<Self> {
        let path = root.join(Self::name(run, task));
        fs::create_dir_all(&path)?;
        tracing::debug!(dir = %path.display(), "Created work dir");
        Ok(Self { path, keep: false })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn testbench(&self) -> PathBuf {
        self.path.join("tb.sv")
    }

    pub fn image(&self) -> PathBuf {
        self.path.join("a.out")
    }

    /// Redirected simulator output.
    pub fn capture(&self) -> PathBuf {
        self.path.join("intermediate")
    }

    /// Leave the directory on disk when dropped.
    pub fn keep(&mut self) {
        self.keep = true;
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        if self.keep {
            tracing::info!(dir = %self.path.display(), "Keeping work dir");
            return;
        }
        if let Err(e) = fs::remove_dir_all(&self.path) {
            tracing::debug!(dir = %self.path.display(), error = %e, "Failed to remove work dir");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_is_deterministic() {
        let pid = std::process::id();
        assert_eq!(WorkDir::name(3, 17), format!("faultsim-{pid}-r3-t17"));
        assert_ne!(WorkDir::name(3, 17), WorkDir::name(4, 17));
    }

    #[test]
    fn test_removed_on_drop() {
        let root = tempfile::tempdir().unwrap();
        let dir = WorkDir::create(root.path(), 1, 1).unwrap();
        let path = dir.path().to_path_buf();
        fs::write(dir.testbench(), "module m; endmodule").unwrap();
        assert!(path.exists());
        drop(dir);
        assert!(!path.exists());
    }

    #[test]
    fn test_kept_dir_survives() {
        let root = tempfile::tempdir().unwrap();
        let mut dir = WorkDir::create(root.path(), 1, 2).unwrap();
        dir.keep();
        let path = dir.path().to_path_buf();
        drop(dir);
        assert!(path.exists());
    }
}
