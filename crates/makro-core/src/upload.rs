//! Upload acceptance and staging.
//!
//! Uploads are checked against an [`UploadPolicy`] before the pipeline ever
//! sees them, then copied to a uniquely named temp file. The staged copy is
//! removed when the [`StagedUpload`] guard drops, whatever the pipeline did.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use tempfile::NamedTempFile;
use tracing::debug;

use crate::config::UploadPolicy;
use crate::error::ValidationError;

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ValidationError + '_ {
    move |source| ValidationError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Lowercased extension of `path`, empty when there is none.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default()
}

/// Check extension and size of an upload without reading its content.
pub fn validate(path: &Path, policy: &UploadPolicy) -> Result<(), ValidationError> {
    let extension = extension_of(path);
    if !policy.allows_extension(&extension) {
        return Err(ValidationError::ExtensionNotAllowed {
            extension,
            allowed: policy.allowed_extensions.join(", "),
        });
    }

    let size = std::fs::metadata(path).map_err(io_error(path))?.len();
    if size > policy.max_upload_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: policy.max_upload_bytes,
        });
    }
    Ok(())
}

/// A validated upload copied into the staging directory.
#[derive(Debug)]
pub struct StagedUpload {
    file: NamedTempFile,
    size: u64,
}

impl StagedUpload {
    /// Path of the staged copy. Keeps the original extension.
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// Bytes copied.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Copies at most `limit + 1` bytes, enough to tell whether `source` exceeds
/// `limit` without reading the rest of it.
fn copy_bounded(source: impl Read, dest: &mut impl Write, limit: u64) -> io::Result<u64> {
    io::copy(&mut source.take(limit.saturating_add(1)), dest)
}

/// Validate `path` and copy it into the policy's staging directory.
pub fn stage(path: &Path, policy: &UploadPolicy) -> Result<StagedUpload, ValidationError> {
    validate(path, policy)?;

    let suffix = format!(".{}", extension_of(path));
    let mut file = tempfile::Builder::new()
        .prefix("makro-upload-")
        .suffix(&suffix)
        .tempfile_in(policy.staging_dir())
        .map_err(io_error(path))?;

    let source = File::open(path).map_err(io_error(path))?;
    let size = copy_bounded(source, file.as_file_mut(), policy.max_upload_bytes)
        .map_err(io_error(path))?;

    // The file may have grown between validation and copy. `size` is then
    // one byte over the limit.
    if size > policy.max_upload_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: policy.max_upload_bytes,
        });
    }

    debug!(source = %path.display(), staged = %file.path().display(), size, "upload staged");
    Ok(StagedUpload { file, size })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn policy_in(dir: &Path) -> UploadPolicy {
        UploadPolicy {
            temp_dir: Some(dir.to_path_buf()),
            ..Default::default()
        }
    }

    #[test]
    fn test_copy_bounded_stops_after_limit() {
        let mut sink = Vec::new();
        let copied = copy_bounded(io::repeat(7), &mut sink, 1024).unwrap();
        assert_eq!(copied, 1025);
        assert_eq!(sink.len(), 1025);
    }

    #[test]
    fn test_copy_bounded_copies_small_source_whole() {
        let mut sink = Vec::new();
        let copied = copy_bounded(&b"RIFF"[..], &mut sink, 1024).unwrap();
        assert_eq!(copied, 4);
        assert_eq!(sink, b"RIFF");
    }

    #[test]
    fn test_validate_accepts_uppercase_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("TRACK.MP3");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(validate(&path, &UploadPolicy::default()).is_ok());
    }

    #[test]
    fn test_validate_rejects_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("payload.exe");
        std::fs::write(&path, [0u8; 16]).unwrap();
        match validate(&path, &UploadPolicy::default()) {
            Err(ValidationError::ExtensionNotAllowed { extension, allowed }) => {
                assert_eq!(extension, "exe");
                assert_eq!(allowed, "mp3, wav, flac, ogg, m4a");
            }
            other => panic!("expected extension rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_rejects_missing_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("noext");
        std::fs::write(&path, [0u8; 16]).unwrap();
        assert!(matches!(
            validate(&path, &UploadPolicy::default()),
            Err(ValidationError::ExtensionNotAllowed { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.wav");
        std::fs::write(&path, vec![0u8; 2048]).unwrap();
        let policy = UploadPolicy {
            max_upload_bytes: 1024,
            ..Default::default()
        };
        match validate(&path, &policy) {
            Err(ValidationError::TooLarge { size, limit }) => {
                assert_eq!(size, 2048);
                assert_eq!(limit, 1024);
            }
            other => panic!("expected size rejection, got {other:?}"),
        }
    }

    #[test]
    fn test_validate_missing_file_is_io_error() {
        assert!(matches!(
            validate(Path::new("/nonexistent/track.wav"), &UploadPolicy::default()),
            Err(ValidationError::Io { .. })
        ));
    }

    #[test]
    fn test_staged_copy_is_removed_on_drop() {
        let source_dir = tempfile::tempdir().unwrap();
        let staging_dir = tempfile::tempdir().unwrap();
        let path = source_dir.path().join("track.wav");
        std::fs::write(&path, b"RIFF....WAVE").unwrap();

        let staged = stage(&path, &policy_in(staging_dir.path())).unwrap();
        let staged_path = staged.path().to_path_buf();
        assert!(staged_path.starts_with(staging_dir.path()));
        assert_eq!(staged_path.extension().unwrap(), "wav");
        assert_eq!(staged.size(), 12);
        assert_eq!(std::fs::read(&staged_path).unwrap(), b"RIFF....WAVE");

        drop(staged);
        assert!(!staged_path.exists());
    }

    #[test]
    fn test_stage_rejects_before_copying() {
        let source_dir = tempfile::tempdir().unwrap();
        let staging_dir = tempfile::tempdir().unwrap();
        let path = source_dir.path().join("track.txt");
        std::fs::write(&path, b"hello").unwrap();

        assert!(stage(&path, &policy_in(staging_dir.path())).is_err());
        assert_eq!(std::fs::read_dir(staging_dir.path()).unwrap().count(), 0);
    }
}
