#[cfg(test)]
mod session_tests {
    use libtvq::config::{EncSpecificInfo, HeaderInfo};
    use libtvq::core::{BlockType, InterleaveType, TvqError};
    use libtvq::lossy::{FrameTransformDecoder, FrameTransformEncoder};
    use libtvq::session::CodecSession;
    use libtvq::version::TvqVersion;

    /// 22 kHz, 20 kbps mono: N = 1024, 928 bits per frame
    fn header() -> HeaderInfo {
        HeaderInfo::for_version(TvqVersion::V2, 1)
    }

    fn encoder() -> FrameTransformEncoder {
        FrameTransformEncoder::initialize(&header(), &EncSpecificInfo::default()).unwrap()
    }

    fn tone(frame: usize, n: usize) -> Vec<f32> {
        (frame * n..(frame + 1) * n)
            .map(|i| (i as f32 * 0.07).sin() * 4000.0)
            .collect()
    }

    #[test]
    fn test_setup_for_default_header() {
        let enc = encoder();
        let setup = enc.setup_info().unwrap();
        assert_eq!(setup.version, TvqVersion::V2);
        assert_eq!(setup.mode, "22/20");
        assert_eq!(enc.frame_size().unwrap(), 1024);
        assert_eq!(enc.num_channels().unwrap(), 1);
        assert_eq!(enc.bit_rate().unwrap(), 20);
        assert_eq!(enc.sampling_rate().unwrap(), 22050);
        assert_eq!(enc.num_fixed_bits_per_frame().unwrap(), 928);
    }

    #[test]
    fn test_initialize_rejects_bad_headers() {
        let mut h = header();
        h.id = "TWIN12345678".to_string();
        assert!(matches!(
            FrameTransformDecoder::initialize(&h),
            Err(TvqError::UnknownVersion { .. })
        ));

        let mut h = header();
        h.channels = 3;
        assert!(matches!(
            FrameTransformDecoder::initialize(&h),
            Err(TvqError::InvalidConfiguration(_))
        ));

        // 22/32 only exists from V2pp on
        let h = HeaderInfo::new(TvqVersion::V2, 1, 32, 22050.0);
        assert!(matches!(
            FrameTransformDecoder::initialize(&h),
            Err(TvqError::InvalidConfiguration(_))
        ));
        let h = HeaderInfo::new(TvqVersion::V2pp, 1, 32, 22050.0);
        assert!(FrameTransformDecoder::initialize(&h).is_ok());

        let mut h = header();
        h.frame_size = 512;
        assert!(FrameTransformDecoder::initialize(&h).is_err());

        let bad = EncSpecificInfo {
            n_can_global: 0,
            ..EncSpecificInfo::default()
        };
        assert!(FrameTransformEncoder::initialize(&header(), &bad).is_err());
    }

    #[test]
    fn test_frame_counter() {
        let mut enc = encoder();
        for f in 0..4 {
            enc.encode_frame(&tone(f, 1024)).unwrap();
        }
        assert_eq!(enc.num_frames().unwrap(), 4);

        enc.set_frame_counter(10).unwrap();
        enc.encode_frame(&tone(4, 1024)).unwrap();
        assert_eq!(enc.num_frames().unwrap(), 11);

        enc.reset_frame_counter().unwrap();
        assert_eq!(enc.num_frames().unwrap(), 0);
    }

    #[test]
    fn test_bit_accounting() {
        let mut enc = encoder();
        for f in 0..10 {
            enc.encode_frame(&tone(f, 1024)).unwrap();
        }
        assert_eq!(enc.fb_total_bits().unwrap(), 10 * 928);

        let expected = 928.0 * 22050.0 / 1024.0;
        assert!((enc.fb_current_bitrate().unwrap() - expected).abs() < 1e-6);

        enc.count_used_bits(72).unwrap();
        assert_eq!(enc.fb_total_bits().unwrap(), 10 * 928 + 72);
        assert_eq!(enc.num_frames().unwrap(), 10);

        enc.reset_bit_accounting().unwrap();
        assert_eq!(enc.fb_total_bits().unwrap(), 0);
        assert_eq!(enc.fb_current_bitrate().unwrap(), 0.0);
    }

    #[test]
    fn test_calls_after_terminate() {
        let mut enc = encoder();
        assert_eq!(enc.module_version().unwrap(), libtvq::module_version());
        enc.terminate().unwrap();
        assert_eq!(enc.encode_frame(&tone(0, 1024)), Err(TvqError::SessionClosed));
        assert_eq!(enc.num_frames(), Err(TvqError::SessionClosed));
        assert_eq!(enc.frame_size(), Err(TvqError::SessionClosed));
        assert_eq!(enc.vector_info(), Err(TvqError::SessionClosed));
        assert_eq!(enc.module_version(), Err(TvqError::SessionClosed));
        assert_eq!(enc.terminate(), Err(TvqError::SessionClosed));
        assert!(enc.enc_specific_info().is_err());

        let mut dec = FrameTransformDecoder::initialize(&header()).unwrap();
        dec.terminate().unwrap();
        assert_eq!(dec.fb_total_bits(), Err(TvqError::SessionClosed));
        assert_eq!(dec.update_vector_info(600), Err(TvqError::SessionClosed));
    }

    #[test]
    fn test_failed_encode_leaves_state() {
        let mut enc = encoder();
        enc.encode_frame(&tone(0, 1024)).unwrap();

        let err = enc.encode_frame(&[0.0; 100]).unwrap_err();
        assert!(matches!(err, TvqError::LayoutMismatch(_)));
        assert_eq!(enc.num_frames().unwrap(), 1);
        assert_eq!(enc.fb_total_bits().unwrap(), 928);
    }

    #[test]
    fn test_failed_decode_leaves_state() {
        let mut enc = encoder();
        let mut dec = FrameTransformDecoder::initialize(&header()).unwrap();
        let index = enc.encode_frame(&tone(0, 1024)).unwrap();
        dec.decode_frame(&index).unwrap();

        let mut broken = enc.encode_frame(&tone(1, 1024)).unwrap();
        broken.channels.clear();
        let err = dec.decode_frame(&broken).unwrap_err();
        assert!(matches!(err, TvqError::LayoutMismatch(_)));
        assert_eq!(dec.num_frames().unwrap(), 1);
        assert_eq!(dec.fb_total_bits().unwrap(), 928);
    }

    #[test]
    fn test_update_vector_info() {
        let mut enc = encoder();
        enc.update_vector_info(600).unwrap();
        for block_type in BlockType::ALL {
            assert_eq!(enc.frame_layout(block_type).unwrap().total_bits(), 600);
        }

        enc.encode_frame(&tone(0, 1024)).unwrap();
        assert_eq!(enc.fb_total_bits().unwrap(), 600);
    }

    #[test]
    fn test_update_vector_info_overflow() {
        let mut enc =
            FrameTransformEncoder::initialize(&HeaderInfo::default(), &EncSpecificInfo::default())
                .unwrap();
        let before = enc.vector_info().unwrap();

        let err = enc.update_vector_info(20_000).unwrap_err();
        assert!(matches!(err, TvqError::BufferOverflow { .. }));
        assert!(err.is_retryable());
        assert_eq!(enc.vector_info().unwrap(), before);
    }

    #[test]
    fn test_update_vector_layout_weights() {
        let mut enc = encoder();
        let mut dec = FrameTransformDecoder::initialize(&header()).unwrap();
        let bits = enc.vector_info().unwrap().layout(InterleaveType::Long).total_bits;
        let weights: Vec<u32> = (1..=60).rev().collect();

        enc.update_vector_layout(InterleaveType::Long, bits, &weights).unwrap();
        dec.update_vector_layout(InterleaveType::Long, bits, &weights).unwrap();
        assert_eq!(enc.vector_info().unwrap().ndiv(InterleaveType::Long), 60);

        let enc_info = enc.vector_info().unwrap();
        assert_eq!(enc_info, dec.vector_info().unwrap());

        let bits0 = enc_info.bits0(InterleaveType::Long);
        assert!(bits0.first() >= bits0.last());

        let err = enc
            .update_vector_layout(InterleaveType::Long, 10, &weights)
            .unwrap_err();
        assert!(matches!(err, TvqError::InsufficientBits { .. }));
        assert_eq!(enc.vector_info().unwrap(), enc_info);
    }

    #[test]
    fn test_conf_info() {
        let conf = encoder().conf_info().unwrap();
        assert_eq!(conf.channels, 1);
        assert_eq!(conf.blocks.len(), 3);
        assert_eq!(conf.window_type_bits, 4);
        assert!(conf.blocks.iter().any(|b| b.ppc_enabled));
    }

    #[test]
    fn test_sessions_are_independent() {
        let mut enc = encoder();
        let mut a = FrameTransformDecoder::initialize(&header()).unwrap();
        let mut b = FrameTransformDecoder::initialize(&header()).unwrap();

        for f in 0..3 {
            let index = enc.encode_frame(&tone(f, 1024)).unwrap();
            assert_eq!(a.decode_frame(&index).unwrap(), b.decode_frame(&index).unwrap());
        }
        a.terminate().unwrap();
        let index = enc.encode_frame(&tone(3, 1024)).unwrap();
        assert!(b.decode_frame(&index).is_ok());
    }
}
