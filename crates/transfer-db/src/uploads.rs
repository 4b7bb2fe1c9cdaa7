//! Pending-upload store on the local filesystem.
//!
//! Files arrive under `<root>/pending/<token>/<filename>` before the
//! submission that references them is committed. After commit the whole
//! token directory is promoted to `<root>/transferred/<YYYY>/<MM>/<token>`.
//! Request bodies are streamed to `<root>/incoming/` first, because the form
//! fields naming their destination may follow the file part.
//!
//! ```rust,ignore
//! use transfer_db::uploads::{ChunkInfo, UploadStore};
//!
//! let store = UploadStore::new("/srv/transfer/uploads");
//! let mut staged = store.stage().await?;
//! staged.write(&bytes).await?;
//! store.commit_staged(staged, &token, "scan.tif", Some(ChunkInfo::index(0))).await?;
//! let dest = store.promote(&token, Utc::now()).await?;
//! ```

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use transfer_core::{
    new_submission_token, sanitize_filename, validate_upload_token, Error, Result,
};

const PENDING_DIR: &str = "pending";
const TRANSFERRED_DIR: &str = "transferred";
const INCOMING_DIR: &str = "incoming";

/// Chunk metadata sent by the upload widget alongside each piece.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChunkInfo {
    /// Zero-based chunk index.
    pub index: u32,
    /// Declared chunk size in bytes.
    pub chunk_size: Option<u64>,
    /// Declared size of the assembled file.
    pub total_size: Option<u64>,
    /// Declared number of chunks.
    pub total_chunks: Option<u32>,
}

impl ChunkInfo {
    pub fn index(index: u32) -> Self {
        Self {
            index,
            ..Default::default()
        }
    }

    fn is_last(&self) -> bool {
        matches!(self.total_chunks, Some(total) if self.index.saturating_add(1) >= total)
    }
}

/// An upload body being written to `<root>/incoming` before its form fields
/// are known. Hand it to [`UploadStore::commit_staged`] or
/// [`UploadStore::discard`].
#[derive(Debug)]
pub struct StagedUpload {
    path: PathBuf,
    file: fs::File,
    size: u64,
}

impl StagedUpload {
    /// Append a piece of the body.
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.file.write_all(bytes).await?;
        self.size += bytes.len() as u64;
        Ok(())
    }

    /// Bytes written so far.
    pub fn len(&self) -> u64 {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }
}

/// A file waiting under a pending token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub name: String,
    pub size: u64,
}

/// Filesystem store for pending and transferred uploads.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    /// Create a store rooted at the given directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the files of a pending token.
    pub fn pending_dir(&self, token: &str) -> Result<PathBuf> {
        let token = validate_upload_token(token)?;
        Ok(self.root.join(PENDING_DIR).join(token))
    }

    /// Destination of a promoted token for the given submission time.
    pub fn transferred_dir(&self, token: &str, at: DateTime<Utc>) -> Result<PathBuf> {
        let token = validate_upload_token(token)?;
        Ok(self
            .root
            .join(TRANSFERRED_DIR)
            .join(format!("{:04}", at.year()))
            .join(format!("{:02}", at.month()))
            .join(token))
    }

    /// Check that the upload root is writable, readable and deletable.
    pub async fn validate(&self) -> std::result::Result<(), String> {
        let test_dir = self.root.join(PENDING_DIR).join(".health-check");
        let test_file = test_dir.join(".write-check");

        fs::create_dir_all(&test_dir)
            .await
            .map_err(|e| format!("create_dir_all({:?}): {}", test_dir, e))?;

        let data = b"upload-store-health-check";
        fs::write(&test_file, data)
            .await
            .map_err(|e| format!("write({:?}): {}", test_file, e))?;

        let read_data = fs::read(&test_file)
            .await
            .map_err(|e| format!("read({:?}): {}", test_file, e))?;
        if read_data != data {
            return Err("read-back mismatch".to_string());
        }

        fs::remove_file(&test_file)
            .await
            .map_err(|e| format!("remove_file({:?}): {}", test_file, e))?;
        let _ = fs::remove_dir(&test_dir).await;

        Ok(())
    }

    /// Create the pending directory for a token. Idempotent.
    pub async fn begin_upload(&self, token: &str) -> Result<PathBuf> {
        let dir = self.pending_dir(token)?;
        fs::create_dir_all(&dir).await.map_err(|e| {
            warn!(subsystem = "uploads", op = "begin_upload", upload_token = %token, error = %e, "Unable to create pending directory");
            e
        })?;
        Ok(dir)
    }

    /// Append one chunk to a pending file and return the assembled size.
    ///
    /// Chunk 0 truncates any earlier content, so a restarted upload begins
    /// again from scratch. When the last chunk arrives and the client declared
    /// a total size, a mismatch is logged but the upload is kept.
    pub async fn receive_chunk(
        &self,
        token: &str,
        filename: &str,
        chunk: ChunkInfo,
        bytes: &[u8],
    ) -> Result<u64> {
        let dir = self.begin_upload(token).await?;
        let name = sanitize_filename(filename);
        let path = dir.join(&name);

        let mut options = fs::OpenOptions::new();
        options.create(true);
        if chunk.index == 0 {
            options.write(true).truncate(true);
        } else {
            options.append(true);
        }
        let mut file = options.open(&path).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        let assembled = fs::metadata(&path).await?.len();
        debug!(
            subsystem = "uploads",
            op = "receive_chunk",
            upload_token = %token,
            filename = %name,
            chunk_index = chunk.index,
            size_bytes = bytes.len(),
            assembled_bytes = assembled,
            "Chunk received"
        );

        log_last_chunk(token, &name, &chunk, assembled);
        set_file_mode(&path).await?;
        Ok(assembled)
    }

    /// Write a complete file, replacing any earlier content.
    pub async fn receive_whole(&self, token: &str, filename: &str, bytes: &[u8]) -> Result<u64> {
        let dir = self.begin_upload(token).await?;
        let name = sanitize_filename(filename);
        let path = dir.join(&name);

        fs::write(&path, bytes).await?;
        set_file_mode(&path).await?;

        info!(
            subsystem = "uploads",
            op = "receive_whole",
            upload_token = %token,
            filename = %name,
            size_bytes = bytes.len(),
            "Upload received"
        );
        Ok(bytes.len() as u64)
    }

    /// Open a staging file for a body whose token and chunk fields may
    /// arrive after it.
    pub async fn stage(&self) -> Result<StagedUpload> {
        let dir = self.root.join(INCOMING_DIR);
        fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{}.part", new_submission_token()));
        let file = fs::File::create(&path).await?;
        Ok(StagedUpload {
            path,
            file,
            size: 0,
        })
    }

    /// Move a staged body into `pending/<token>/<filename>`.
    ///
    /// Without chunk metadata, or for chunk 0, the staged file replaces the
    /// target. Later chunks are appended to it. The staging file is removed
    /// in every case.
    pub async fn commit_staged(
        &self,
        staged: StagedUpload,
        token: &str,
        filename: &str,
        chunk: Option<ChunkInfo>,
    ) -> Result<u64> {
        let StagedUpload {
            path: staged_path,
            mut file,
            size,
        } = staged;
        let result: Result<u64> = async {
            file.flush().await?;
            drop(file);

            let dir = self.begin_upload(token).await?;
            let name = sanitize_filename(filename);
            let path = dir.join(&name);

            let assembled = match chunk {
                Some(c) if c.index > 0 => {
                    let mut target = fs::OpenOptions::new()
                        .create(true)
                        .append(true)
                        .open(&path)
                        .await?;
                    let mut source = fs::File::open(&staged_path).await?;
                    tokio::io::copy(&mut source, &mut target).await?;
                    target.flush().await?;
                    drop(target);
                    fs::metadata(&path).await?.len()
                }
                _ => {
                    fs::rename(&staged_path, &path).await?;
                    size
                }
            };
            set_file_mode(&path).await?;

            match chunk {
                Some(c) => {
                    debug!(
                        subsystem = "uploads",
                        op = "receive_chunk",
                        upload_token = %token,
                        filename = %name,
                        chunk_index = c.index,
                        size_bytes = size,
                        assembled_bytes = assembled,
                        "Chunk received"
                    );
                    log_last_chunk(token, &name, &c, assembled);
                }
                None => {
                    info!(subsystem = "uploads", op = "receive_whole", upload_token = %token, filename = %name, size_bytes = size, "Upload received");
                }
            }
            Ok(assembled)
        }
        .await;

        remove_staging_file(&staged_path).await;
        result
    }

    /// Drop a staged body that will not be committed.
    pub async fn discard(&self, staged: StagedUpload) {
        let StagedUpload { path, file, .. } = staged;
        drop(file);
        remove_staging_file(&path).await;
    }

    /// Remove one pending file. Other files under the token are untouched.
    pub async fn delete_file(&self, token: &str, filename: &str) -> Result<()> {
        let name = sanitize_filename(filename);
        let path = self.pending_dir(token)?.join(&name);

        match fs::remove_file(&path).await {
            Ok(()) => {
                info!(subsystem = "uploads", op = "delete_file", upload_token = %token, filename = %name, "Pending file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::NotFound(format!("{} not found", name)))
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    /// Files currently pending under a token, sorted by name.
    pub async fn list_pending(&self, token: &str) -> Result<Vec<PendingFile>> {
        let dir = self.pending_dir(token)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::Io(e)),
        };

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let metadata = entry.metadata().await?;
            if metadata.is_file() {
                files.push(PendingFile {
                    name: entry.file_name().to_string_lossy().into_owned(),
                    size: metadata.len(),
                });
            }
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Move a pending token directory into the transferred tree.
    ///
    /// `NotFound` when nothing is pending under the token, `Conflict` when the
    /// destination already exists.
    pub async fn promote(&self, token: &str, at: DateTime<Utc>) -> Result<PathBuf> {
        let src = self.pending_dir(token)?;
        let dest = self.transferred_dir(token, at)?;

        if !fs::try_exists(&src).await? {
            return Err(Error::NotFound(format!("no pending upload for {}", token)));
        }
        if fs::try_exists(&dest).await? {
            return Err(Error::Conflict(format!(
                "{} has already been transferred",
                token
            )));
        }
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::rename(&src, &dest).await?;

        info!(
            subsystem = "uploads",
            op = "promote",
            upload_token = %token,
            destination = %dest.display(),
            "Pending upload promoted"
        );
        Ok(dest)
    }
}

/// Compare the assembled size with the declared total once the last chunk is in.
fn log_last_chunk(token: &str, name: &str, chunk: &ChunkInfo, assembled: u64) {
    if !chunk.is_last() {
        return;
    }
    match chunk.total_size {
        Some(expected) if expected != assembled => {
            warn!(
                subsystem = "uploads",
                op = "receive_chunk",
                upload_token = %token,
                filename = %name,
                expected_bytes = expected,
                assembled_bytes = assembled,
                "Assembled upload size differs from declared total"
            );
        }
        _ => {
            info!(subsystem = "uploads", op = "receive_chunk", upload_token = %token, filename = %name, size_bytes = assembled, "Chunked upload complete");
        }
    }
}

/// Already renamed away on the whole-file path.
async fn remove_staging_file(path: &Path) {
    match fs::remove_file(path).await {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => {
            warn!(subsystem = "uploads", op = "discard", path = %path.display(), error = %e, "Unable to remove staging file");
        }
    }
}

/// Uploaded files are stored rw-r--r-- with no execute bit.
async fn set_file_mode(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, std::fs::Permissions::from_mode(0o644)).await?;
    }
    #[cfg(not(unix))]
    let _ = path;
    Ok(())
}
