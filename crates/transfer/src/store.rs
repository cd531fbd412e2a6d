//! Local file store rooted at a single directory.
//!
//! Every operation takes a bare file name and sanitizes it to its final
//! component before joining it onto the root, so nothing outside the root is
//! ever touched.
//!
//! Uploads are staged under a hidden `.<name>.part` file and hard-linked into
//! place only once verified. Readers never see a half-written upload, and a
//! staging file is never served.

use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::{File, OpenOptions};

use crate::TransferError;
use crate::validation::sanitize_file_name;

const STAGING_SUFFIX: &str = ".part";

/// Directory-backed file store shared by all sessions of a server, or used
/// as the working directory of a client.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a requested name onto a path inside the root.
    pub fn resolve(&self, file_name: &str) -> Result<PathBuf, TransferError> {
        Ok(self.root.join(sanitize_file_name(file_name)?))
    }

    /// Size of an existing regular file.
    ///
    /// Staging files of uploads in progress are reported as missing.
    pub async fn stat(&self, file_name: &str) -> Result<u64, TransferError> {
        let path = self.resolve(file_name)?;
        if is_staging_name(&path) {
            return Err(TransferError::LocalIo(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", path.display()),
            )));
        }
        let metadata = tokio::fs::metadata(&path)
            .await
            .map_err(TransferError::LocalIo)?;
        if !metadata.is_file() {
            return Err(not_a_file(&path));
        }
        Ok(metadata.len())
    }

    /// Stats a file and opens it for reading.
    pub async fn open_read(&self, file_name: &str) -> Result<(File, u64), TransferError> {
        let size = self.stat(file_name).await?;
        let file = File::open(self.resolve(file_name)?)
            .await
            .map_err(TransferError::LocalIo)?;
        Ok((file, size))
    }

    /// Creates a new file, failing if anything already exists under the name.
    pub async fn create_exclusive(&self, file_name: &str) -> Result<File, TransferError> {
        let path = self.resolve(file_name)?;
        OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(TransferError::LocalIo)
    }

    /// Reserves `file_name` for an upload and opens its staging file.
    ///
    /// Fails with `AlreadyExists` if the name is taken or another upload of it
    /// is in progress. The staging file's exclusive create is what decides
    /// between racing uploads; [`PendingUpload::commit`] links it into place.
    pub async fn begin_upload(&self, file_name: &str) -> Result<PendingUpload, TransferError> {
        let dest = self.resolve(file_name)?;
        if is_staging_name(&dest) {
            return Err(TransferError::InvalidFileName(file_name.to_string()));
        }
        if tokio::fs::symlink_metadata(&dest).await.is_ok() {
            return Err(TransferError::LocalIo(io::Error::new(
                io::ErrorKind::AlreadyExists,
                format!("{} already exists", dest.display()),
            )));
        }

        let part = staging_path(&dest);
        let file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part)
            .await
            .map_err(TransferError::LocalIo)?;
        Ok(PendingUpload { file, part, dest })
    }

    pub async fn remove(&self, file_name: &str) -> Result<(), TransferError> {
        let path = self.resolve(file_name)?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(TransferError::LocalIo)
    }
}

/// An upload being written to its staging file.
#[derive(Debug)]
pub struct PendingUpload {
    file: File,
    part: PathBuf,
    dest: PathBuf,
}

impl PendingUpload {
    pub fn file(&mut self) -> &mut File {
        &mut self.file
    }

    /// Syncs the staged body and links it under its final name.
    ///
    /// The link fails rather than replace a file that appeared meanwhile. The
    /// staging file is removed either way.
    pub async fn commit(self) -> Result<(), TransferError> {
        let PendingUpload { file, part, dest } = self;
        let linked = match file.sync_all().await {
            Ok(()) => tokio::fs::hard_link(&part, &dest).await,
            Err(e) => Err(e),
        };
        drop(file);
        let removed = tokio::fs::remove_file(&part).await;

        linked.map_err(TransferError::LocalIo)?;
        removed.map_err(TransferError::LocalIo)
    }

    /// Drops the staged body without publishing it.
    pub async fn discard(self) -> Result<(), TransferError> {
        let PendingUpload { file, part, .. } = self;
        drop(file);
        tokio::fs::remove_file(&part)
            .await
            .map_err(TransferError::LocalIo)
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }
}

fn staging_path(dest: &Path) -> PathBuf {
    let name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    dest.with_file_name(format!(".{name}{STAGING_SUFFIX}"))
}

fn is_staging_name(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .is_some_and(|n| n.starts_with('.') && n.ends_with(STAGING_SUFFIX))
}

fn not_a_file(path: &Path) -> TransferError {
    TransferError::LocalIo(io::Error::new(
        io::ErrorKind::InvalidInput,
        format!("{} is not a regular file", path.display()),
    ))
}
