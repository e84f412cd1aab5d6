//! Internal streaming tests

use super::*;
use crate::container::VqfMetadata;

fn tone(len: usize) -> Vec<f32> {
    (0..len).map(|i| (i as f32 * 0.05).sin() * 3000.0).collect()
}

#[test]
fn test_streaming_encoder_frame_output() {
    let mut encoder = StreamingEncoder::new(22050, 1, 20).unwrap();
    let n = encoder.frame_size();

    encoder.push_samples(&tone(n * 5 / 2)).unwrap();
    assert_eq!(encoder.pending_frames(), 2);
    assert_eq!(encoder.pending_samples(), n / 2);

    let first = encoder.next_frame().unwrap();
    let second = encoder.next_frame().unwrap();
    assert!(encoder.next_frame().is_none());
    assert_eq!(first.index, 0);
    assert_eq!(second.index, 1);
    assert_eq!(first.bits, second.bits);

    // half frame padded out, plus the drain frame
    assert_eq!(encoder.flush().unwrap(), 2);
    assert_eq!(encoder.flush().unwrap(), 0);
}

#[test]
fn test_streaming_encode_decode_roundtrip() {
    let mut encoder = StreamingEncoder::new(22050, 1, 20).unwrap();
    let n = encoder.frame_size();
    let input = tone(n * 3);
    encoder.push_samples(&input).unwrap();
    let file = encoder.finalize(&VqfMetadata::new()).unwrap();

    let mut decoder = StreamingDecoder::new();
    decoder.feed(&file).unwrap();
    assert_eq!(decoder.state(), DecoderState::Ready);

    // three frames plus the drain frame, minus the transform delay
    let decoded = decoder.decode_available().unwrap();
    assert!(decoded.len() > input.len());
    assert!(decoded.len() < input.len() + n);
    assert_eq!(decoder.state(), DecoderState::Finished);
}

#[test]
fn test_streaming_incremental_feed() {
    let mut encoder = StreamingEncoder::new(22050, 1, 20).unwrap();
    let n = encoder.frame_size();
    encoder.push_samples(&tone(n * 2)).unwrap();
    let file = encoder.finalize(&VqfMetadata::new()).unwrap();

    let mut decoder = StreamingDecoder::new();
    let mut decoded = Vec::new();
    for chunk in file.chunks(37) {
        decoder.feed(chunk).unwrap();
        decoded.extend(decoder.decode_available().unwrap());
    }

    assert!(decoded.len() > n * 2 && decoded.len() < n * 3);
    assert_eq!(decoder.current_frame_index(), 3);
}

#[test]
fn test_bad_keyword_is_error_state() {
    let mut decoder = StreamingDecoder::new();
    assert!(decoder.feed(b"RIFF0000000000000000").is_err());
    assert_eq!(decoder.state(), DecoderState::Error);
    assert!(!decoder.feed(b"more").unwrap());
}

#[test]
fn test_decoder_drops_consumed_data() {
    let mut encoder = StreamingEncoder::new(22050, 1, 20).unwrap();
    let n = encoder.frame_size();
    encoder.push_samples(&tone(n * 16)).unwrap();
    let file = encoder.finalize(&VqfMetadata::new()).unwrap();

    let mut decoder = StreamingDecoder::new();
    let mut decoded = 0;
    let mut max_buffered = 0;
    for chunk in file.chunks(37) {
        decoder.feed(chunk).unwrap();
        decoded += decoder.decode_available().unwrap().len();
        if decoder.state() != DecoderState::WaitingForHeader {
            max_buffered = max_buffered.max(decoder.buffered_bytes());
        }
    }
    decoder.finish();

    // never more than one unread frame held
    assert_eq!(decoder.current_frame_index(), 17);
    assert!(max_buffered < file.len() / 4, "{max_buffered} of {}", file.len());
    assert!(decoded > n * 16 && decoded < n * 17);
}
