//! Streaming tests for VQF
//!
//! Tests for:
//! - StreamingDecoder with incremental data
//! - StreamingEncoder for live encoding
//! - Network simulation (chunked data arrival)
//! - Streaming output against the whole-file decode

use libtvq::{decode, DecoderState, StreamingDecoder, StreamingEncoder, VqfMetadata};

fn tone(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.02).sin() * 0.25).collect()
}

#[test]
fn test_streaming_decoder_matches_whole_file() {
    let samples = tone(22050);
    let vqf = libtvq::encode(&samples, 22050, 1, 20, None).unwrap();
    let whole = decode(&vqf).unwrap();

    let mut decoder = StreamingDecoder::new();
    let mut streamed = Vec::new();
    for chunk in vqf.chunks(512) {
        decoder.feed(chunk).unwrap();
        while let Some(frame) = decoder.next_frame().unwrap() {
            streamed.extend(frame.iter().map(|&s| libtvq::core::from_codec_range(s)));
        }
    }

    assert_eq!(decoder.state(), DecoderState::Finished);
    assert_eq!(streamed, whole);
}

#[test]
fn test_streaming_decoder_info_and_metadata() {
    let meta = VqfMetadata::with_basic(Some("Live".into()), None, Some("take 2".into()));
    let vqf = libtvq::encode(&tone(4096), 22050, 1, 20, Some(&meta)).unwrap();

    let mut decoder = StreamingDecoder::new();
    assert!(decoder.info().is_none());
    // keyword and version only
    assert!(!decoder.feed(&vqf[..12]).unwrap());
    assert_eq!(decoder.state(), DecoderState::WaitingForHeader);

    decoder.feed(&vqf[12..]).unwrap();
    let info = decoder.info().unwrap();
    assert_eq!(info.sample_rate, 22050);
    assert_eq!(info.channels, 1);
    assert_eq!(info.frame_size, 1024);
    assert_eq!(info.total_frames, Some(5));
    assert_eq!(decoder.metadata().title(), Some("Live"));
    assert_eq!(decoder.metadata().comment(), Some("take 2"));
}

#[test]
fn test_streaming_encoder_timestamps() {
    let mut encoder = StreamingEncoder::new(22050, 1, 20).unwrap();
    encoder.push_samples(&vec![0.0; 1024 * 3]).unwrap();

    let stamps: Vec<u32> = std::iter::from_fn(|| encoder.next_frame())
        .map(|f| f.timestamp_ms)
        .collect();
    assert_eq!(stamps, vec![0, 46, 92]);
}

#[test]
fn test_streaming_encoder_frames_are_fixed_size() {
    let mut encoder = StreamingEncoder::new(44100, 2, 96).unwrap();
    encoder.push_samples(&tone(2048 * 2 * 2)).unwrap();
    while let Some(frame) = encoder.next_frame() {
        assert_eq!(frame.bits, 4458);
        assert_eq!(frame.data.len(), 4458usize.div_ceil(8));
        assert_eq!(frame.samples, 2048);
    }
}

#[test]
fn test_decoder_reset() {
    let vqf = libtvq::encode(&tone(2048), 22050, 1, 20, None).unwrap();
    let mut decoder = StreamingDecoder::new();
    decoder.feed(&vqf).unwrap();
    decoder.decode_available().unwrap();
    assert_eq!(decoder.state(), DecoderState::Finished);

    decoder.reset();
    assert_eq!(decoder.state(), DecoderState::WaitingForHeader);
    assert_eq!(decoder.buffered_bytes(), 0);
    decoder.feed(&vqf).unwrap();
    assert_eq!(decoder.state(), DecoderState::Ready);
}
