#[cfg(test)]
mod mdct_tests {
    use libtvq::core::BlockType;
    use libtvq::lossy::mdct::*;
    use libtvq::mode::ModeTable;

    fn noise(len: usize, seed: u64) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                ((state >> 33) as f32 / (1u64 << 31) as f32 - 0.5) * 2000.0
            })
            .collect()
    }

    #[test]
    fn test_window_shape() {
        let w = MdctTransform::low_overlap_window(512, 32);
        assert_eq!(w.len(), 512);
        assert_eq!(w[0], 0.0);
        assert_eq!(w[511], 0.0);
        assert_eq!(w[256], 1.0);
        // power complementary slopes
        let a = (256 - 32) / 2;
        for i in 0..32 {
            let rise = w[a + i];
            let mirror = w[a + 31 - i];
            assert!((rise * rise + mirror * mirror - 1.0).abs() < 1e-5);
            assert!((rise - w[511 - a - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn test_sine_window_at_full_overlap() {
        let w = MdctTransform::low_overlap_window(64, 32);
        for (i, &v) in w.iter().enumerate() {
            let expected = (std::f32::consts::PI * (i as f32 + 0.5) / 64.0).sin();
            assert!((v - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_block_sizes() {
        let mdct = Mdct::new(1, 256, [8, 2, 1]);
        assert_eq!(mdct.overlap(), 32);
        assert_eq!(mdct.forward(&vec![0.0; 512], BlockType::Long).len(), 256);
        assert_eq!(mdct.forward(&vec![0.0; 256], BlockType::Medium).len(), 128);
        assert_eq!(mdct.inverse(&vec![0.0; 32], BlockType::Short).len(), 64);
    }

    #[test]
    fn test_perfect_reconstruction_with_block_switching() {
        let n = 256;
        let mut analysis = Mdct::new(1, n, [8, 2, 1]);
        let mut synthesis = analysis.clone();
        let delay = analysis.overlap();

        let sequence = [
            BlockType::Long,
            BlockType::Short,
            BlockType::Medium,
            BlockType::Long,
            BlockType::Short,
            BlockType::Short,
            BlockType::Long,
        ];
        let input = noise(n * sequence.len(), 7);

        let mut output = Vec::new();
        for (frame, &bt) in input.chunks_exact(n).zip(sequence.iter()) {
            let coeffs = analysis.analyze(frame, bt);
            assert_eq!(coeffs[0].len(), n);
            output.extend(synthesis.synthesize(&coeffs, bt));
        }

        assert!(output[..delay].iter().all(|s| s.abs() < 0.5));
        for i in 0..input.len() - delay {
            assert!(
                (output[i + delay] - input[i]).abs() < 0.5,
                "sample {i}: {} vs {}",
                output[i + delay],
                input[i]
            );
        }
    }

    #[test]
    fn test_stereo_channels_are_separate() {
        let mode = ModeTable::lookup(8, 8).unwrap();
        let n = mode.frame_size;
        let mut analysis = Mdct::for_mode(mode, 2);
        let mut synthesis = Mdct::for_mode(mode, 2);
        let delay = analysis.overlap();

        let left = noise(n * 3, 3);
        let mut output = Vec::new();
        for f in 0..3 {
            let frame: Vec<f32> = (0..n).flat_map(|i| [left[f * n + i], 0.0]).collect();
            let coeffs = analysis.analyze(&frame, BlockType::Long);
            assert!(coeffs[1].iter().all(|&c| c == 0.0));
            output.extend(synthesis.synthesize(&coeffs, BlockType::Long));
        }

        for i in 0..2 * n {
            assert!((output[2 * (i + delay)] - left[i]).abs() < 0.5);
            assert_eq!(output[2 * (i + delay) + 1], 0.0);
        }
    }

    #[test]
    fn test_reset_clears_history() {
        let mut mdct = Mdct::new(1, 256, [8, 2, 1]);
        mdct.analyze(&noise(256, 1), BlockType::Long);
        mdct.reset();
        let coeffs = mdct.analyze(&vec![0.0; 256], BlockType::Long);
        assert!(coeffs[0].iter().all(|&c| c == 0.0));
    }
}
