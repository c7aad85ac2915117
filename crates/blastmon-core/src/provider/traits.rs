//! Filesystem access used by the file-backed counter provider.
//!
//! `FsCounterProvider` reads counter trees through this trait, so the same
//! provider runs against a real directory in production and against `MockFs`
//! in tests.

use std::io;
use std::path::{Path, PathBuf};

/// Abstraction for the filesystem operations the provider needs.
pub trait FileSystem: Send + Sync {
    /// Reads the entire contents of a file as a string.
    fn read_to_string(&self, path: &Path) -> io::Result<String>;

    /// Checks if a path exists.
    fn exists(&self, path: &Path) -> bool;

    /// Checks if a path is a regular file.
    fn is_file(&self, path: &Path) -> bool;

    /// Lists entries in a directory.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>>;
}

/// Real filesystem implementation that delegates to `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

impl FileSystem for RealFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        let entries = std::fs::read_dir(path)?;
        let mut paths = Vec::new();
        for entry in entries {
            paths.push(entry?.path());
        }
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_fs_roundtrip_on_counter_tree() {
        let dir = tempfile::tempdir().unwrap();
        let object = dir.path().join("VMware Blast USB Counters");
        std::fs::create_dir(&object).unwrap();
        std::fs::write(object.join(".counters"), "Received Bytes\n").unwrap();
        std::fs::write(object.join("usb-1"), "Received Bytes: 42\n").unwrap();

        let fs = RealFs::new();
        assert!(fs.exists(&object));
        assert!(!fs.exists(&dir.path().join("VMware Blast CDR Counters")));
        assert!(fs.is_file(&object.join("usb-1")));
        assert!(!fs.is_file(&object));

        let mut entries = fs.read_dir(&object).unwrap();
        entries.sort();
        assert_eq!(entries, vec![object.join(".counters"), object.join("usb-1")]);

        let content = fs.read_to_string(&object.join("usb-1")).unwrap();
        assert_eq!(content, "Received Bytes: 42\n");
    }

    #[test]
    fn test_real_fs_missing_dir() {
        let fs = RealFs::new();
        let err = fs.read_dir(Path::new("/nonexistent/blast/12345")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }
}
