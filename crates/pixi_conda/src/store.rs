//! Persistence of the set of known prefixes.

use std::{
    borrow::Cow,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use fd_lock::RwLock;
use indexmap::IndexSet;
use miette::Diagnostic;
use parking_lot::Mutex;
use thiserror::Error;

/// An insertion ordered set of prefixes.
pub type PrefixSet = IndexSet<PathBuf>;

#[derive(Debug, Error, Diagnostic)]
pub enum StoreError {
    #[error("failed to read the list of known environments from '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write the list of known environments to '{}'", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to lock '{}'", .path.display())]
    #[diagnostic(help("another process may be modifying the list of known environments"))]
    Lock {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Storage backend of the registry.
///
/// A store holds a deduplicated, insertion ordered set of prefixes. A store
/// that has never been written to is empty.
pub trait PrefixStore {
    /// Reads the current set of prefixes.
    fn load(&self) -> Result<PrefixSet, StoreError>;

    /// Replaces the stored set of prefixes.
    fn save(&self, prefixes: &PrefixSet) -> Result<(), StoreError>;

    /// Loads the prefixes, lets `f` modify them and persists the result if
    /// anything changed.
    ///
    /// `f` may be invoked more than once and must produce the same
    /// modification every time it is given the same set.
    fn update<T>(&self, mut f: impl FnMut(&mut PrefixSet) -> T) -> Result<T, StoreError> {
        let mut prefixes = self.load()?;
        let before = prefixes.clone();
        let result = f(&mut prefixes);
        if !same_order(&before, &prefixes) {
            self.save(&prefixes)?;
        }
        Ok(result)
    }
}

fn same_order(a: &PrefixSet, b: &PrefixSet) -> bool {
    a.len() == b.len() && a.iter().eq(b.iter())
}

/// A plain text file with one prefix per line, compatible with the
/// `environments.txt` file maintained by conda and mamba.
///
/// Modifications hold an exclusive advisory lock on a sibling `.lock` file
/// and replace the file atomically, so concurrent processes never observe a
/// partially written file or lose each other's updates.
#[derive(Debug, Clone)]
pub struct EnvironmentsFile {
    path: PathBuf,
}

impl EnvironmentsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the location of the file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock_path(&self) -> PathBuf {
        let mut file_name = self
            .path
            .file_name()
            .map(ToOwned::to_owned)
            .unwrap_or_default();
        file_name.push(".lock");
        self.path.with_file_name(file_name)
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                fs_err::create_dir_all(parent).map_err(|source| StoreError::Write {
                    path: self.path.clone(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }

    /// Reads the file and reports whether its contents were already in
    /// canonical form.
    fn read(&self) -> Result<(PrefixSet, bool), StoreError> {
        match fs_err::read(&self.path) {
            Ok(contents) => Ok(parse(&contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok((PrefixSet::new(), true)),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

impl PrefixStore for EnvironmentsFile {
    fn load(&self) -> Result<PrefixSet, StoreError> {
        self.read().map(|(prefixes, _)| prefixes)
    }

    fn save(&self, prefixes: &PrefixSet) -> Result<(), StoreError> {
        self.ensure_parent()?;
        let write_err = |source: std::io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut temp = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
        temp.write_all(&render(prefixes)).map_err(write_err)?;
        temp.as_file().sync_all().map_err(write_err)?;
        temp.persist(&self.path)
            .map_err(|e| write_err(e.error))?;
        Ok(())
    }

    fn update<T>(&self, mut f: impl FnMut(&mut PrefixSet) -> T) -> Result<T, StoreError> {
        // Reading a registry that was never written must not leave a
        // directory or a lock file behind.
        if !self.path.exists() {
            let mut prefixes = PrefixSet::new();
            let result = f(&mut prefixes);
            if prefixes.is_empty() {
                return Ok(result);
            }
        }

        self.ensure_parent()?;
        let lock_path = self.lock_path();
        let lock_file = fs_err::OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|source| StoreError::Lock {
                path: lock_path.clone(),
                source,
            })?;
        let mut lock = RwLock::new(lock_file.into_parts().0);
        let _guard = lock.write().map_err(|source| StoreError::Lock {
            path: lock_path.clone(),
            source,
        })?;

        let (mut prefixes, canonical) = self.read()?;
        let before = prefixes.clone();
        let result = f(&mut prefixes);
        if !canonical || !same_order(&before, &prefixes) {
            self.save(&prefixes)?;
        }
        Ok(result)
    }
}

/// Parses the contents of an environments file. The returned flag is false
/// when writing the parsed set back would change the file.
///
/// Lines are handled as raw bytes so prefixes that are not valid UTF-8
/// survive a round trip on Unix.
fn parse(contents: &[u8]) -> (PrefixSet, bool) {
    let mut prefixes = PrefixSet::new();
    if contents.is_empty() {
        return (prefixes, true);
    }

    let mut canonical = contents.ends_with(b"\n");
    let body = contents.strip_suffix(b"\n").unwrap_or(contents);
    for line in body.split(|&b| b == b'\n') {
        let trimmed = line.trim_ascii();
        if trimmed.is_empty() {
            canonical = false;
            continue;
        }
        let Some(path) = path_from_bytes(trimmed) else {
            tracing::warn!(
                "ignoring unreadable entry '{}' in the list of known environments",
                String::from_utf8_lossy(trimmed)
            );
            canonical = false;
            continue;
        };
        let prefix: PathBuf = path.components().collect();
        if path_to_bytes(&prefix).as_ref() != line {
            canonical = false;
        }
        if !prefixes.insert(prefix) {
            canonical = false;
        }
    }
    (prefixes, canonical)
}

fn render(prefixes: &PrefixSet) -> Vec<u8> {
    let mut contents = Vec::new();
    for prefix in prefixes {
        contents.extend_from_slice(&path_to_bytes(prefix));
        contents.push(b'\n');
    }
    contents
}

#[cfg(unix)]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    use std::{ffi::OsStr, os::unix::ffi::OsStrExt};
    Some(PathBuf::from(OsStr::from_bytes(bytes)))
}

#[cfg(not(unix))]
fn path_from_bytes(bytes: &[u8]) -> Option<PathBuf> {
    std::str::from_utf8(bytes).ok().map(PathBuf::from)
}

#[cfg(unix)]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    use std::os::unix::ffi::OsStrExt;
    Cow::Borrowed(path.as_os_str().as_bytes())
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Cow<'_, [u8]> {
    match path.to_string_lossy() {
        Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
        Cow::Owned(s) => Cow::Owned(s.into_bytes()),
    }
}

/// A store that only lives in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    prefixes: Mutex<PrefixSet>,
}

impl InMemoryStore {
    pub fn new(prefixes: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            prefixes: Mutex::new(prefixes.into_iter().collect()),
        }
    }
}

impl PrefixStore for InMemoryStore {
    fn load(&self) -> Result<PrefixSet, StoreError> {
        Ok(self.prefixes.lock().clone())
    }

    fn save(&self, prefixes: &PrefixSet) -> Result<(), StoreError> {
        *self.prefixes.lock() = prefixes.clone();
        Ok(())
    }

    fn update<T>(&self, mut f: impl FnMut(&mut PrefixSet) -> T) -> Result<T, StoreError> {
        Ok(f(&mut self.prefixes.lock()))
    }
}
