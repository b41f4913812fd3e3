//! Compressed audio to mono PCM (symphonia).

use std::fs::File;
use std::path::Path;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::waveform::Waveform;

/// Turns an audio file into a mono waveform.
///
/// Implementations must keep the file's native sample rate.
pub trait AudioDecoder: Send + Sync {
    fn decode(&self, path: &Path) -> DecodeResult<Waveform>;
}

/// Decoder backed by symphonia's default format and codec registries.
#[derive(Debug, Clone, Copy, Default)]
pub struct SymphoniaDecoder;

impl SymphoniaDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl AudioDecoder for SymphoniaDecoder {
    fn decode(&self, path: &Path) -> DecodeResult<Waveform> {
        let file = File::open(path).map_err(|source| DecodeError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(extension) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(extension);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| DecodeError::Unsupported {
                message: e.to_string(),
            })?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or(DecodeError::NoAudioTrack)?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or(DecodeError::MissingSampleRate)?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| DecodeError::Unsupported {
                message: e.to_string(),
            })?;

        let mut samples: Vec<f32> = Vec::new();
        let mut skipped = 0usize;
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => {
                    return Err(DecodeError::Codec {
                        message: e.to_string(),
                    })
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(message)) => {
                    debug!(reason = message, "skipping undecodable packet");
                    skipped += 1;
                    continue;
                }
                Err(SymphoniaError::IoError(e)) => {
                    debug!(error = %e, "skipping packet after I/O error");
                    skipped += 1;
                    continue;
                }
                Err(e) => {
                    return Err(DecodeError::Codec {
                        message: e.to_string(),
                    })
                }
            };

            let spec = *decoded.spec();
            let channels = spec.channels.count();
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);
            samples.extend(Waveform::from_interleaved(buffer.samples(), channels, sample_rate).samples());
        }

        if skipped > 0 {
            warn!(path = %path.display(), skipped, "some packets could not be decoded");
        }
        if samples.is_empty() {
            return Err(DecodeError::EmptyStream);
        }

        debug!(
            path = %path.display(),
            sample_rate,
            samples = samples.len(),
            "decoded audio"
        );
        Ok(Waveform::new(samples, sample_rate))
    }
}
