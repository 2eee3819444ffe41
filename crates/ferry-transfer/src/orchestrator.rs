//! Whole-file transfers between the local file system and the object store.
//!
//! Both directions stream in chunks of [`TransferConfig::chunk_size`]
//! bytes, so memory use does not grow with object size. Both are atomic
//! from the caller's point of view:
//!
//! - a download is staged in a temporary file next to the destination and
//!   renamed over it only once every byte has arrived;
//! - an upload is committed only after the whole source file was copied,
//!   and is aborted on every other exit path.
//!
//! [`TransferConfig::chunk_size`]: crate::TransferConfig::chunk_size

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use ferry_types::Handle;
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{TransferError, TransferResult};
use crate::request::{DownloadRequest, UploadRequest};
use crate::transfers::{Entry, Transfers};

/// Permission bits of a downloaded file.
#[cfg(unix)]
const DOWNLOAD_FILE_MODE: u32 = 0o644;

impl Transfers {
    /// Download an object into `dest`, replacing any existing file.
    ///
    /// On success the drained download session is registered and its handle
    /// returned. On failure no handle is created and `dest` is left as it
    /// was.
    pub fn download_object_to_file(
        &self,
        request: &DownloadRequest<'_>,
        dest: &Path,
    ) -> TransferResult<Handle> {
        let mut session = self.open_download(request)?;
        let mut staged = stage_next_to(dest)?;

        let mut buf = vec![0u8; self.config().effective_chunk_size()];
        loop {
            let n = session.read(&mut buf)?;
            if n == 0 {
                break;
            }
            staged
                .write_all(&buf[..n])
                .map_err(|e| TransferError::write(dest, e))?;
        }

        persist(staged, dest)?;
        let bytes = session.bytes_read();
        let location = session.location().clone();
        let handle = self.register(Entry::download(session));
        info!(%handle, %location, bytes, dest = %dest.display(), "download complete");
        Ok(handle)
    }

    /// Upload the contents of `source` as a new object.
    ///
    /// On success the committed upload session is registered and its handle
    /// returned. On failure no handle is created and no object is committed.
    pub fn upload_object_from_file(
        &self,
        request: &UploadRequest<'_>,
        source: &Path,
    ) -> TransferResult<Handle> {
        // Dropping the session on any early return aborts the upload.
        let mut session = self.open_upload(request)?;
        let mut file = File::open(source).map_err(|e| TransferError::read(source, e))?;

        let mut buf = vec![0u8; self.config().effective_chunk_size()];
        loop {
            let n = match file.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransferError::read(source, e)),
            };
            session.write_all(&buf[..n])?;
        }

        session.commit()?;
        let bytes = session.bytes_written();
        let location = session.location().clone();
        let handle = self.register(Entry::upload(session));
        info!(%handle, %location, bytes, source = %source.display(), "upload complete");
        Ok(handle)
    }
}

fn stage_next_to(dest: &Path) -> TransferResult<NamedTempFile> {
    let dir = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    NamedTempFile::new_in(dir).map_err(|e| TransferError::write(dest, e))
}

fn persist(mut staged: NamedTempFile, dest: &Path) -> TransferResult<()> {
    staged.flush().map_err(|e| TransferError::write(dest, e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(
            staged.path(),
            std::fs::Permissions::from_mode(DOWNLOAD_FILE_MODE),
        )
        .map_err(|e| TransferError::write(dest, e))?;
    }
    staged
        .persist(dest)
        .map_err(|e| TransferError::write(dest, e.error))?;
    Ok(())
}
