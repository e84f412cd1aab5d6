//! Tests for the encode/decode/info convenience functions

use libtvq::{decode, encode, info, module_version, TvqError, VqfMetadata};

fn tone(sample_rate: u32, channels: usize, seconds: f32) -> Vec<f32> {
    let frames = (sample_rate as f32 * seconds) as usize;
    (0..frames * channels)
        .map(|i| ((i / channels) as f32 * 440.0 * 2.0 * std::f32::consts::PI / sample_rate as f32).sin() * 0.3)
        .collect()
}

#[test]
fn test_encode_decode_mono() {
    let samples = tone(22050, 1, 0.5);
    let vqf = encode(&samples, 22050, 1, 20, None).unwrap();
    assert_eq!(&vqf[..4], b"TWIN");

    let decoded = decode(&vqf).unwrap();
    assert!(decoded.len() >= samples.len());
    assert!(decoded.len() < samples.len() + 2 * 1024);
    assert!(decoded.iter().all(|s| (-1.0..=1.0).contains(s)));
}

#[test]
fn test_encode_decode_stereo() {
    let samples = tone(44100, 2, 0.25);
    let vqf = encode(&samples, 44100, 2, 96, None).unwrap();
    let decoded = decode(&vqf).unwrap();
    assert_eq!(decoded.len() % 2, 0);
    assert!(decoded.len() >= samples.len());
}

#[test]
fn test_info() {
    let samples = tone(22050, 1, 1.0);
    let meta = VqfMetadata::with_basic(Some("Title".into()), Some("Artist".into()), None);
    let vqf = encode(&samples, 22050, 1, 20, Some(&meta)).unwrap();

    let info = info(&vqf).unwrap();
    assert_eq!(info.version, "TWIN00052200");
    assert_eq!(info.sample_rate, 22050);
    assert_eq!(info.channels, 1);
    assert_eq!(info.bit_rate, 20);
    assert_eq!(info.mode, "22/20");
    assert_eq!(info.frame_size, 1024);
    // 22 frames of input plus the drain frame
    assert_eq!(info.total_frames, 23);
    assert_eq!(info.file_size, vqf.len());
    assert_eq!(info.metadata.title(), Some("Title"));
    assert_eq!(info.metadata.author(), Some("Artist"));

    let json = serde_json::to_string(&info).unwrap();
    assert!(json.contains("\"mode\":\"22/20\""));
}

#[test]
fn test_unsupported_configuration() {
    let samples = vec![0.0f32; 1000];
    assert!(matches!(
        encode(&samples, 48000, 1, 48, None),
        Err(TvqError::InvalidConfiguration(_))
    ));
    assert!(encode(&samples, 22050, 3, 60, None).is_err());
}

#[test]
fn test_decode_garbage() {
    assert!(decode(b"not a vqf file at all").is_err());
    assert!(info(&[]).is_err());
}

#[test]
fn test_empty_input() {
    let vqf = encode(&[], 22050, 1, 20, None).unwrap();
    assert!(decode(&vqf).unwrap().is_empty());
    assert_eq!(info(&vqf).unwrap().total_frames, 0);
}

#[test]
fn test_module_version() {
    assert_eq!(module_version(), env!("CARGO_PKG_VERSION"));
}
