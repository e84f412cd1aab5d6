//! Source audio in, 16-bit WAV out

use anyhow::{bail, Context, Result};
use libtvq::core::{codec_to_i16, to_codec_range};
use std::io::{Cursor, Write};
use std::path::Path;
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::conv::IntoSample;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::{Limit, MetadataOptions, MetadataRevision, StandardTagKey, Value};
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

/// Tags carried over from the source file
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AudioMetadata {
    pub title: Option<String>,
    pub artist: Option<String>,
    pub copyright: Option<String>,
    pub comment: Option<String>,
}

/// A fully decoded source file
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// interleaved, -1.0..1.0
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: usize,
    pub metadata: AudioMetadata,
}

impl DecodedAudio {
    pub fn duration_secs(&self) -> f64 {
        if self.channels == 0 || self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.channels as f64 / self.sample_rate as f64
    }
}

/// Decode an audio file from disk
pub fn read_audio_file(path: &Path) -> Result<DecodedAudio> {
    let file = std::fs::File::open(path).context("Failed to open audio file")?;
    let mss = MediaSourceStream::new(Box::new(file), Default::default());
    decode_source(mss, path.extension().and_then(|e| e.to_str()))
}

/// Decode an in-memory audio file
pub fn read_audio_from_bytes(bytes: &[u8]) -> Result<DecodedAudio> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());
    decode_source(mss, None)
}

fn decode_source(mss: MediaSourceStream, extension: Option<&str>) -> Result<DecodedAudio> {
    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    // text tags only, cover art has nowhere to go in VQF
    let meta_opts = MetadataOptions {
        limit_metadata_bytes: Limit::Maximum(1024 * 1024),
        limit_visual_bytes: Limit::Maximum(0),
    };

    let mut probed = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &meta_opts)
        .context("Unsupported audio format")?;

    let mut metadata = AudioMetadata::default();
    if let Some(rev) = probed.metadata.get().as_ref().and_then(|m| m.current()) {
        collect_tags(rev, &mut metadata);
    }
    let mut format = probed.format;
    if let Some(rev) = format.metadata().current() {
        collect_tags(rev, &mut metadata);
    }

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .context("No audio track found")?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .context("Unknown sample rate")?;
    let channels = track
        .codec_params
        .channels
        .context("Unknown channel count")?
        .count();
    if channels == 0 {
        bail!("Audio track has no channels");
    }

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .context("Failed to create decoder")?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break
            }
            Err(e) => return Err(e).context("Error reading packet"),
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => interleave(&decoded, &mut samples),
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("skipping corrupt packet: {}", msg);
            }
            Err(e) => return Err(e).context("Error decoding packet"),
        }
    }

    log::debug!(
        "decoded {} samples, {} Hz, {} ch",
        samples.len(),
        sample_rate,
        channels
    );

    Ok(DecodedAudio {
        samples,
        sample_rate,
        channels,
        metadata,
    })
}

fn collect_tags(rev: &MetadataRevision, metadata: &mut AudioMetadata) {
    for tag in rev.tags() {
        let (Some(key), Value::String(text)) = (tag.std_key, &tag.value) else {
            continue;
        };
        let slot = match key {
            StandardTagKey::TrackTitle => &mut metadata.title,
            StandardTagKey::Artist => &mut metadata.artist,
            StandardTagKey::Copyright => &mut metadata.copyright,
            StandardTagKey::Comment => &mut metadata.comment,
            _ => continue,
        };
        *slot = Some(text.clone());
    }
}

fn interleave(decoded: &AudioBufferRef, out: &mut Vec<f32>) {
    match decoded {
        AudioBufferRef::U8(buf) => push_frames(&**buf, out),
        AudioBufferRef::U16(buf) => push_frames(&**buf, out),
        AudioBufferRef::U24(buf) => push_frames(&**buf, out),
        AudioBufferRef::U32(buf) => push_frames(&**buf, out),
        AudioBufferRef::S8(buf) => push_frames(&**buf, out),
        AudioBufferRef::S16(buf) => push_frames(&**buf, out),
        AudioBufferRef::S24(buf) => push_frames(&**buf, out),
        AudioBufferRef::S32(buf) => push_frames(&**buf, out),
        AudioBufferRef::F32(buf) => push_frames(&**buf, out),
        AudioBufferRef::F64(buf) => push_frames(&**buf, out),
    }
}

fn push_frames<S>(buf: &AudioBuffer<S>, out: &mut Vec<f32>)
where
    S: Sample + IntoSample<f32>,
{
    let channels = buf.spec().channels.count();
    out.reserve(buf.frames() * channels);
    for frame in 0..buf.frames() {
        for ch in 0..channels {
            out.push(buf.chan(ch)[frame].into_sample());
        }
    }
}

/// Write samples to a 16-bit PCM WAV file
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: usize) -> Result<()> {
    let bytes = write_wav_to_bytes(samples, sample_rate, channels)?;
    std::fs::write(path, bytes).context("Failed to write WAV file")
}

/// Normalized samples as a 16-bit PCM WAV image
pub fn write_wav_to_bytes(samples: &[f32], sample_rate: u32, channels: usize) -> Result<Vec<u8>> {
    const HEADER_BYTES: usize = 44;
    let block_align = channels * 2;
    let data_size = samples.len() * 2;

    let mut wav = Vec::with_capacity(HEADER_BYTES + data_size);
    wav.write_all(b"RIFF")?;
    wav.write_all(&((HEADER_BYTES - 8 + data_size) as u32).to_le_bytes())?;
    wav.write_all(b"WAVE")?;

    wav.write_all(b"fmt ")?;
    wav.write_all(&16u32.to_le_bytes())?;
    wav.write_all(&1u16.to_le_bytes())?; // PCM
    wav.write_all(&(channels as u16).to_le_bytes())?;
    wav.write_all(&sample_rate.to_le_bytes())?;
    wav.write_all(&(sample_rate * block_align as u32).to_le_bytes())?;
    wav.write_all(&(block_align as u16).to_le_bytes())?;
    wav.write_all(&16u16.to_le_bytes())?;

    wav.write_all(b"data")?;
    wav.write_all(&(data_size as u32).to_le_bytes())?;
    for &s in samples {
        wav.write_all(&codec_to_i16(to_codec_range(s)).to_le_bytes())?;
    }

    Ok(wav)
}
