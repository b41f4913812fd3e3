//! Container and tag facts (lofty).
//!
//! Tag problems never abort an analysis. The reader reports what it managed to
//! read as a [`MetadataOutcome`] and leaves the decision to the caller.

use std::borrow::Cow;
use std::path::Path;

use lofty::config::ParseOptions;
use lofty::error::LoftyError;
use lofty::file::{AudioFile, TaggedFile, TaggedFileExt};
use lofty::probe::Probe;
use lofty::tag::Accessor;
use thiserror::Error;
use tracing::{debug, warn};

use crate::analysis::types::{Metadata, MetadataRecord, UNKNOWN};

/// Reads file-level metadata.
pub trait MetadataReader: Send + Sync {
    fn read(&self, path: &Path) -> MetadataOutcome;
}

/// Result of a metadata read.
#[derive(Debug, Clone, PartialEq)]
pub enum MetadataOutcome {
    /// Container properties and tags were read.
    Complete(MetadataRecord),
    /// Container properties were read but the tags were absent or corrupt;
    /// title, artist and genre are `"Unknown"`.
    Degraded {
        record: MetadataRecord,
        reason: String,
    },
    /// The container itself could not be read.
    Unreadable { error: String },
}

impl MetadataOutcome {
    /// The record, unless the container was unreadable.
    pub fn record(&self) -> Option<&MetadataRecord> {
        match self {
            MetadataOutcome::Complete(record) | MetadataOutcome::Degraded { record, .. } => {
                Some(record)
            }
            MetadataOutcome::Unreadable { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !matches!(self, MetadataOutcome::Complete(_))
    }

    /// The descriptor-set slot for this outcome.
    pub fn into_metadata(self) -> Metadata {
        match self {
            MetadataOutcome::Complete(record) | MetadataOutcome::Degraded { record, .. } => {
                Metadata::Record(record)
            }
            MetadataOutcome::Unreadable { error } => Metadata::Error { error },
        }
    }
}

#[derive(Debug, Error)]
enum MetadataError {
    #[error("failed to open file: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Lofty(#[from] LoftyError),

    #[error("no tag found")]
    NoTag,
}

/// Reader backed by lofty's format probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyReader;

impl LoftyReader {
    pub fn new() -> Self {
        Self
    }

    fn open(path: &Path, read_tags: bool) -> Result<TaggedFile, MetadataError> {
        let tagged = Probe::open(path)?
            .options(ParseOptions::new().read_tags(read_tags))
            .guess_file_type()?
            .read()?;
        Ok(tagged)
    }

    fn properties(tagged: &TaggedFile) -> MetadataRecord {
        let props = tagged.properties();
        let duration = (props.duration().as_secs_f64() * 100.0).round() / 100.0;
        let bitrate = props.audio_bitrate().map_or(0, |kbps| u64::from(kbps) * 1000);
        let sample_rate = props.sample_rate().unwrap_or(0);
        MetadataRecord::untagged(duration, bitrate, sample_rate)
    }

    fn text(value: Option<Cow<'_, str>>) -> String {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| UNKNOWN.to_string())
    }

    fn read_tagged(path: &Path) -> Result<MetadataRecord, MetadataError> {
        let tagged = Self::open(path, true)?;
        let mut record = Self::properties(&tagged);
        let tag = tagged
            .primary_tag()
            .or_else(|| tagged.first_tag())
            .ok_or(MetadataError::NoTag)?;
        record.title = Self::text(tag.title());
        record.artist = Self::text(tag.artist());
        record.genre = Self::text(tag.genre());
        Ok(record)
    }
}

impl MetadataReader for LoftyReader {
    fn read(&self, path: &Path) -> MetadataOutcome {
        let tag_error = match Self::read_tagged(path) {
            Ok(record) => return MetadataOutcome::Complete(record),
            Err(e) => e,
        };

        match Self::open(path, false) {
            Ok(tagged) => {
                debug!(path = %path.display(), reason = %tag_error, "tags unavailable");
                MetadataOutcome::Degraded {
                    record: Self::properties(&tagged),
                    reason: tag_error.to_string(),
                }
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "metadata unreadable");
                MetadataOutcome::Unreadable {
                    error: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::config::WriteOptions;
    use lofty::tag::{Tag, TagExt, TagType};
    use pretty_assertions::assert_eq;

    fn write_wav(path: &Path, seconds: u32, sample_rate: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for i in 0..seconds * sample_rate {
            writer.write_sample(((i % 100) as i16 - 50) * 100).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_untagged_file_is_degraded_with_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plain.wav");
        write_wav(&path, 2, 8000);

        let outcome = LoftyReader::new().read(&path);
        assert!(outcome.is_degraded());
        let record = outcome.record().unwrap();
        assert_eq!(record.duration, 2.0);
        assert_eq!(record.sample_rate, 8000);
        assert_eq!(record.bitrate, 128_000);
        assert_eq!(record.title, "Unknown");
        assert_eq!(record.artist, "Unknown");
        assert_eq!(record.genre, "Unknown");
    }

    #[test]
    fn test_tagged_file_is_complete() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tagged.wav");
        write_wav(&path, 1, 8000);

        let mut tag = Tag::new(TagType::RiffInfo);
        tag.set_title("Baile".to_string());
        tag.set_artist("MC Teste".to_string());
        tag.set_genre("Trap".to_string());
        tag.save_to_path(&path, WriteOptions::default()).unwrap();

        match LoftyReader::new().read(&path) {
            MetadataOutcome::Complete(record) => {
                assert_eq!(record.title, "Baile");
                assert_eq!(record.artist, "MC Teste");
                assert_eq!(record.genre, "Trap");
            }
            other => panic!("expected complete metadata, got {other:?}"),
        }
    }

    /// Appends a `LIST/INFO` chunk whose `INAM` entry claims more bytes than
    /// the chunk holds, and fixes up the RIFF size.
    fn append_corrupt_info(path: &Path) {
        let mut bytes = std::fs::read(path).unwrap();
        let mut info = b"INFO".to_vec();
        info.extend_from_slice(b"INAM");
        info.extend_from_slice(&4096u32.to_le_bytes());
        info.extend_from_slice(b"Baile\0");
        bytes.extend_from_slice(b"LIST");
        bytes.extend_from_slice(&(info.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&info);
        let riff_size = (bytes.len() - 8) as u32;
        bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());
        std::fs::write(path, bytes).unwrap();
    }

    #[test]
    fn test_corrupt_tag_chunk_keeps_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.wav");
        write_wav(&path, 2, 8000);
        append_corrupt_info(&path);

        let outcome = LoftyReader::new().read(&path);
        assert!(!matches!(outcome, MetadataOutcome::Unreadable { .. }));
        let record = outcome.record().unwrap();
        assert_eq!(record.duration, 2.0);
        assert_eq!(record.sample_rate, 8000);
        assert_eq!(record.title, "Unknown");
        assert_eq!(record.artist, "Unknown");
        assert_eq!(record.genre, "Unknown");
    }

    #[test]
    fn test_missing_file_is_unreadable() {
        let outcome = LoftyReader::new().read(Path::new("/nonexistent/track.mp3"));
        assert!(matches!(outcome, MetadataOutcome::Unreadable { .. }));
        assert!(matches!(outcome.into_metadata(), Metadata::Error { .. }));
    }

    #[test]
    fn test_garbage_file_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.mp3");
        std::fs::write(&path, [0u8; 64]).unwrap();
        let outcome = LoftyReader::new().read(&path);
        assert!(outcome.record().is_none());
    }

    #[test]
    fn test_degraded_outcome_keeps_record() {
        let record = MetadataRecord::untagged(1.5, 0, 44100);
        let outcome = MetadataOutcome::Degraded {
            record: record.clone(),
            reason: "no tag found".to_string(),
        };
        assert_eq!(outcome.into_metadata(), Metadata::Record(record));
    }
}
