//! File-backed counter provider.
//!
//! Reads counter objects from a directory tree:
//!
//! ```text
//! <root>/
//!   VMware Blast Session Counters/
//!     .counters        raw counter labels, one per line
//!     session-1        "Received Bytes: 1024" lines, one file per instance
//!     session-2
//! ```
//!
//! Dot-files and subdirectories are never treated as instances. An instance
//! file that vanishes between listing and reading is skipped: the session
//! simply ended.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, trace};

use super::parser::{parse_instance, parse_manifest};
use super::traits::FileSystem;
use super::{CounterProvider, ProviderError, ProviderHandle, RawInstance};

/// Name of the per-object manifest file.
pub const MANIFEST_FILE: &str = ".counters";

/// Counter provider reading a counter tree through a `FileSystem`.
pub struct FsCounterProvider<F: FileSystem> {
    fs: F,
    root: PathBuf,
    next_id: AtomicU64,
}

impl<F: FileSystem> FsCounterProvider<F> {
    /// Creates a provider rooted at `root`.
    pub fn new(fs: F, root: impl Into<PathBuf>) -> Self {
        Self {
            fs,
            root: root.into(),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_dir(&self, object: &str) -> PathBuf {
        self.root.join(object)
    }

    fn read_instance(
        &self,
        path: &Path,
        labels: &[&str],
    ) -> Result<Option<RawInstance>, ProviderError> {
        let content = match self.fs.read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let mut values = parse_instance(&content)
            .map_err(|e| ProviderError::Parse(format!("{}: {}", name, e.message)))?;
        values.retain(|label, _| labels.contains(&label.as_str()));

        Ok(Some(RawInstance { name, values }))
    }
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy().starts_with('.'))
        .unwrap_or(true)
}

impl<F: FileSystem> CounterProvider for FsCounterProvider<F> {
    fn open_counter_object(&self, name: &str) -> Result<ProviderHandle, ProviderError> {
        if !self.fs.exists(&self.object_dir(name)) {
            return Err(ProviderError::NotFound(name.to_string()));
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(object = name, id, root = %self.root.display(), "counter object opened");
        Ok(ProviderHandle::new(id, name))
    }

    fn counter_labels(&self, handle: &ProviderHandle) -> Result<Vec<String>, ProviderError> {
        let manifest = self.object_dir(handle.object()).join(MANIFEST_FILE);
        let content = self.fs.read_to_string(&manifest)?;
        Ok(parse_manifest(&content))
    }

    fn read_instances(
        &self,
        handle: &ProviderHandle,
        labels: &[&str],
    ) -> Result<Vec<RawInstance>, ProviderError> {
        let dir = self.object_dir(handle.object());
        let entries = self.fs.read_dir(&dir).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                ProviderError::NotFound(handle.object().to_string())
            } else {
                e.into()
            }
        })?;

        let mut instances = Vec::new();
        for path in entries
            .iter()
            .filter(|p| !is_hidden(p) && self.fs.is_file(p))
        {
            if let Some(instance) = self.read_instance(path, labels)? {
                instances.push(instance);
            }
        }

        trace!(object = handle.object(), count = instances.len(), "instances read");
        Ok(instances)
    }

    fn close_counter_object(&self, handle: ProviderHandle) {
        debug!(object = handle.object(), id = handle.id(), "counter object closed");
    }
}
