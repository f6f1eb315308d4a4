use std::path::{Component, Path, PathBuf};

use thiserror::Error;

pub const REMOTE_ROOT: &str = "/";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("remote path is empty")]
    Empty,
    #[error("remote path contains unsupported component")]
    UnsupportedComponent,
    #[error("invalid entry name: {0:?}")]
    InvalidName(String),
}

pub fn local_path_for(target_root: &Path, remote_path: &str) -> Result<PathBuf, PathError> {
    if remote_path.is_empty() {
        return Err(PathError::Empty);
    }

    // Remote paths are POSIX-like ("/Docs/A.txt"); map them under target_root.
    let mut out = target_root.to_path_buf();
    for component in Path::new(remote_path).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::RootDir | Component::CurDir => continue,
            Component::ParentDir | Component::Prefix(_) => {
                return Err(PathError::UnsupportedComponent);
            }
        }
    }
    Ok(out)
}

/// Builds the remote path of `name` inside the directory `parent`.
pub fn join_remote(parent: &str, name: &str) -> Result<String, PathError> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\', '\0']) {
        return Err(PathError::InvalidName(name.to_string()));
    }
    let parent = parent.trim_end_matches('/');
    Ok(format!("{parent}/{name}"))
}
