use std::{
    ffi::OsString,
    os::unix::ffi::OsStrExt,
    path::{Path, PathBuf},
};

/// Looks up bare command names in an ordered list of search directories.
#[derive(Debug, Clone, Default)]
pub struct PathResolver {
    dirs: Vec<PathBuf>,
}

impl PathResolver {
    pub fn new(dirs: Vec<PathBuf>) -> Self {
        Self { dirs }
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// Returns the first `dir/name` that exists as a file. Earlier
    /// directories shadow later ones.
    pub fn resolve(&self, name: &str) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }

        let found = self
            .dirs
            .iter()
            .map(|dir| candidate(dir, name))
            .find(|path| path.is_file());

        trace!(name, ?found, "resolved command");

        found
    }
}

// plain concatenation, so a name containing '/' stays under `dir`
fn candidate(dir: &Path, name: &str) -> PathBuf {
    let mut path = OsString::from(dir.as_os_str());
    if !dir.as_os_str().as_bytes().ends_with(b"/") {
        path.push("/");
    }
    path.push(name);
    PathBuf::from(path)
}
