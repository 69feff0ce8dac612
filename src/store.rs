//! On-disk configuration store
//!
//! Loads and saves the root tree of a binary property-list file. Every save
//! first copies the current file to `<path>.backup`; that copy is best effort
//! and its failure never blocks the write. There is no locking: the OS agent
//! may rewrite the file between our read and our write, so callers that care
//! compare [`ConfigStore::checksum`] values.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::constants::paths::BACKUP_SUFFIX;
use crate::error::{Error, Result};
use crate::tree::{Mapping, Node};

#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// `<path>.backup`
    pub fn backup_path(&self) -> PathBuf {
        backup_path_for(&self.path)
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and parse the tree. The root must be a mapping.
    pub fn load(&self) -> Result<Mapping> {
        let bytes = fs::read(&self.path).map_err(|e| Error::from_read(&self.path, e))?;
        let root = Node::from_bytes(&bytes).map_err(|e| match e {
            Error::ParseError { path, reason } => Error::parse(
                format!("{}: {path}", self.path.display()),
                reason,
            ),
            other => other,
        })?;
        debug!(path = %self.path.display(), bytes = bytes.len(), "Loaded store");
        match root {
            Node::Mapping(tree) => Ok(tree),
            other => Err(Error::parse(
                self.path.display().to_string(),
                format!("root is a {}, expected mapping", other.kind()),
            )),
        }
    }

    /// Like [`ConfigStore::load`] but a missing file yields an empty tree
    pub fn load_or_empty(&self) -> Result<Mapping> {
        match self.load() {
            Err(Error::NotFound(_)) => {
                info!(
                    path = %self.path.display(),
                    "Store does not exist yet, starting from an empty tree"
                );
                Ok(Mapping::new())
            }
            other => other,
        }
    }

    /// Back up the current file (best effort), then serialize and overwrite
    pub fn save(&self, tree: &Mapping) -> Result<()> {
        if self.path.exists() {
            let backup = self.backup_path();
            if let Err(e) = fs::copy(&self.path, &backup) {
                warn!(
                    path = %backup.display(),
                    error = %e,
                    "Failed to write backup, continuing with save"
                );
            }
        }

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::from_write(parent, e))?;
        }

        let bytes = Node::Mapping(tree.clone())
            .to_binary()
            .map_err(|e| Error::WriteError {
                path: self.path.clone(),
                reason: e.to_string(),
            })?;
        fs::write(&self.path, &bytes).map_err(|e| Error::from_write(&self.path, e))?;
        info!(path = %self.path.display(), bytes = bytes.len(), "Saved store");
        Ok(())
    }

    /// One read-modify-write cycle. The tree is only saved when `edit` succeeds.
    pub fn update<T>(&self, edit: impl FnOnce(&mut Mapping) -> Result<T>) -> Result<T> {
        let mut tree = self.load_or_empty()?;
        let out = edit(&mut tree)?;
        self.save(&tree)?;
        Ok(out)
    }

    /// Copy the store to `<path>.backup` and return the backup path
    pub fn backup(&self) -> Result<PathBuf> {
        let backup = self.backup_path();
        copy_file(&self.path, &backup)?;
        info!(from = %self.path.display(), to = %backup.display(), "Backed up store");
        Ok(backup)
    }

    /// Replace `original` with a copy of `backup`
    pub fn restore(backup: &Path, original: &Path) -> Result<()> {
        if !backup.exists() {
            return Err(Error::NotFound(backup.to_path_buf()));
        }
        if original.exists() {
            fs::remove_file(original).map_err(|e| Error::from_write(original, e))?;
        }
        copy_file(backup, original)?;
        info!(from = %backup.display(), to = %original.display(), "Restored store");
        Ok(())
    }

    /// Lowercase hex SHA-256 of the raw file bytes
    pub fn checksum(path: &Path) -> Result<String> {
        let bytes = fs::read(path).map_err(|e| Error::from_read(path, e))?;
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        Ok(hex::encode(hasher.finalize()))
    }
}

pub(crate) fn backup_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(BACKUP_SUFFIX);
    PathBuf::from(name)
}

fn copy_file(from: &Path, to: &Path) -> Result<()> {
    if !from.exists() {
        return Err(Error::NotFound(from.to_path_buf()));
    }
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::from_write(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| Error::from_write(to, e))?;
    Ok(())
}
