//! File operations used while staging runtime directories

use rtpanel_foundation::{Error, Result};
use std::fs;
use std::path::Path;
use tracing::debug;

/// Filesystem collaborator
pub trait FileOp: Send + Sync {
    /// Copy `src` into `dst`, producing `dst/<basename(src)>`
    fn copy_dir(&self, src: &Path, dst: &Path) -> Result<()>;

    fn rename(&self, src: &Path, dst: &Path) -> Result<()>;

    /// Remove a directory tree; a missing path is not an error
    fn delete_dir(&self, path: &Path) -> Result<()>;

    fn stat(&self, path: &Path) -> bool;

    fn get_content(&self, path: &Path) -> Result<Vec<u8>>;
}

/// `std::fs` backed file operations
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileOp;

impl LocalFileOp {
    pub fn new() -> Self {
        Self
    }

    fn copy_tree(src: &Path, dst: &Path) -> Result<()> {
        fs::create_dir_all(dst).map_err(|e| Error::staging(dst, e))?;
        for entry in fs::read_dir(src).map_err(|e| Error::staging(src, e))? {
            let entry = entry.map_err(|e| Error::staging(src, e))?;
            let target = dst.join(entry.file_name());
            let file_type = entry.file_type().map_err(|e| Error::staging(entry.path(), e))?;
            if file_type.is_dir() {
                Self::copy_tree(&entry.path(), &target)?;
            } else {
                fs::copy(entry.path(), &target).map_err(|e| Error::staging(&target, e))?;
            }
        }
        Ok(())
    }
}

impl FileOp for LocalFileOp {
    fn copy_dir(&self, src: &Path, dst: &Path) -> Result<()> {
        let name = src
            .file_name()
            .ok_or_else(|| Error::staging(src, "source has no directory name"))?;
        debug!("Copying {} into {}", src.display(), dst.display());
        Self::copy_tree(src, &dst.join(name))
    }

    fn rename(&self, src: &Path, dst: &Path) -> Result<()> {
        debug!("Renaming {} to {}", src.display(), dst.display());
        fs::rename(src, dst).map_err(|e| Error::staging(dst, e))
    }

    fn delete_dir(&self, path: &Path) -> Result<()> {
        match fs::remove_dir_all(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::staging(path, e)),
        }
    }

    fn stat(&self, path: &Path) -> bool {
        path.exists()
    }

    fn get_content(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).map_err(|e| Error::staging(path, e))
    }
}
