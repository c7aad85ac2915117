//! In-memory filesystem for testing the file-backed provider.
//!
//! `MockFs` simulates a counter tree in memory so `FsCounterProvider` can be
//! exercised without touching disk.

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use crate::provider::fs::MANIFEST_FILE;
use crate::provider::traits::FileSystem;

/// In-memory filesystem.
#[derive(Debug, Clone, Default)]
pub struct MockFs {
    /// Map from path to file contents.
    files: HashMap<PathBuf, String>,
    /// Set of directories (for read_dir support).
    directories: HashSet<PathBuf>,
}

impl MockFs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file with the given content. Parent directories are created.
    pub fn add_file(&mut self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.files.insert(path, content.into());
    }

    /// Adds an empty directory.
    pub fn add_dir(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref().to_path_buf();
        self.add_parents(&path);
        self.directories.insert(path);
    }

    /// Removes a file, e.g. to simulate an instance ending.
    pub fn remove_file(&mut self, path: impl AsRef<Path>) {
        self.files.remove(path.as_ref());
    }

    fn add_parents(&mut self, path: &Path) {
        let mut parent = path.parent();
        while let Some(p) = parent {
            if !p.as_os_str().is_empty() {
                self.directories.insert(p.to_path_buf());
            }
            parent = p.parent();
        }
    }

    /// Adds a counter object directory with its `.counters` manifest.
    pub fn add_counter_object(&mut self, root: impl AsRef<Path>, object: &str, labels: &[&str]) {
        let dir = root.as_ref().join(object);
        self.add_dir(&dir);
        let mut manifest = labels.join("\n");
        manifest.push('\n');
        self.add_file(dir.join(MANIFEST_FILE), manifest);
    }

    /// Adds one instance file under a counter object.
    pub fn add_instance(
        &mut self,
        root: impl AsRef<Path>,
        object: &str,
        instance: &str,
        values: &[(&str, f64)],
    ) {
        let content: String = values
            .iter()
            .map(|(label, value)| format!("{}: {}\n", label, value))
            .collect();
        self.add_file(root.as_ref().join(object).join(instance), content);
    }
}

impl FileSystem for MockFs {
    fn read_to_string(&self, path: &Path) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("file not found: {:?}", path),
            )
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains_key(path) || self.directories.contains(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.contains_key(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<PathBuf>> {
        if !self.directories.contains(path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("directory not found: {:?}", path),
            ));
        }

        let mut entries = HashSet::new();

        for file_path in self.files.keys() {
            if file_path.parent().is_some_and(|parent| parent == path) {
                entries.insert(file_path.clone());
            }
        }

        for dir_path in &self.directories {
            if dir_path.parent().is_some_and(|parent| parent == path) && dir_path != path {
                entries.insert(dir_path.clone());
            }
        }

        Ok(entries.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_fs_add_counter_object() {
        let mut fs = MockFs::new();
        fs.add_counter_object("/counters", "VMware Blast USB Counters", &["Received Bytes", "RTT"]);

        let dir = Path::new("/counters/VMware Blast USB Counters");
        assert!(fs.exists(dir));
        assert!(fs.exists(Path::new("/counters")));
        assert!(fs.is_file(&dir.join(".counters")));
        assert!(!fs.is_file(dir));
        assert_eq!(
            fs.read_to_string(&dir.join(".counters")).unwrap(),
            "Received Bytes\nRTT\n"
        );
    }

    #[test]
    fn test_mock_fs_add_instance() {
        let mut fs = MockFs::new();
        fs.add_instance(
            "/counters",
            "VMware Blast USB Counters",
            "usb-1",
            &[("Received Bytes", 1024.0), ("RTT", 12.5)],
        );

        let content = fs
            .read_to_string(Path::new("/counters/VMware Blast USB Counters/usb-1"))
            .unwrap();
        assert_eq!(content, "Received Bytes: 1024\nRTT: 12.5\n");
    }

    #[test]
    fn test_mock_fs_read_dir() {
        let mut fs = MockFs::new();
        fs.add_file("/counters/a/one", "x: 1");
        fs.add_file("/counters/a/two", "x: 2");
        fs.add_dir("/counters/b");

        assert_eq!(fs.read_dir(Path::new("/counters")).unwrap().len(), 2);
        assert_eq!(fs.read_dir(Path::new("/counters/a")).unwrap().len(), 2);
        assert!(fs.read_dir(Path::new("/counters/b")).unwrap().is_empty());
    }

    #[test]
    fn test_mock_fs_remove_file() {
        let mut fs = MockFs::new();
        fs.add_file("/counters/a/one", "x: 1");
        fs.remove_file("/counters/a/one");

        let err = fs.read_to_string(Path::new("/counters/a/one")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert!(fs.read_dir(Path::new("/counters/a")).unwrap().is_empty());
    }
}
