#[cfg(test)]
mod allocator_tests {
    use libtvq::core::{BlockType, InterleaveType, TvqError};
    use libtvq::mode::ModeTable;
    use libtvq::vq::VectorBitAllocator;
    use proptest::prelude::*;

    fn allocator() -> VectorBitAllocator {
        VectorBitAllocator::new(ModeTable::lookup(22, 20).unwrap())
    }

    #[test]
    fn test_weighted_split_remainder_goes_lowest() {
        let layout = allocator()
            .compute_layout(1, BlockType::Long, InterleaveType::Long, 4, &[3, 2, 1])
            .unwrap();
        assert_eq!(layout.channels[0].bits, vec![2, 1, 1]);
        assert_eq!(layout.ndiv(), 3);
    }

    #[test]
    fn test_stage_widths() {
        let layout = allocator()
            .compute_layout(1, BlockType::Long, InterleaveType::Long, 27, &[1, 1])
            .unwrap();
        // 14 and 13 bits
        assert_eq!(layout.channels[0].bits, vec![14, 13]);
        assert_eq!(layout.bits0(), vec![7, 7]);
        assert_eq!(layout.bits1(), vec![7, 6]);
        assert_eq!(layout.code_widths().collect::<Vec<_>>(), vec![7, 7, 7, 6]);
    }

    #[test]
    fn test_channels_split_remainder_to_first() {
        let layout = allocator()
            .compute_layout(2, BlockType::Short, InterleaveType::Short, 61, &[])
            .unwrap();
        assert_eq!(layout.channels[0].total_bits, 31);
        assert_eq!(layout.channels[1].total_bits, 30);
        // ceil(31 / 14) and ceil(30 / 14)
        assert_eq!(layout.channels[0].ndiv(), 3);
        assert_eq!(layout.channels[1].ndiv(), 3);
    }

    #[test]
    fn test_insufficient_bits() {
        let err = allocator()
            .compute_layout(1, BlockType::Long, InterleaveType::Long, 2, &[1, 1, 1])
            .unwrap_err();
        assert_eq!(
            err,
            TvqError::InsufficientBits {
                required: 3,
                available: 2
            }
        );
        assert!(err.is_retryable());
    }

    #[test]
    fn test_too_many_bits_for_the_divisions() {
        let err = allocator()
            .compute_layout(1, BlockType::Long, InterleaveType::Long, 43, &[1, 1, 1])
            .unwrap_err();
        assert!(matches!(err, TvqError::BufferOverflow { .. }));
    }

    #[test]
    fn test_interleave_must_match_block() {
        let err = allocator()
            .compute_layout(1, BlockType::Short, InterleaveType::Long, 100, &[])
            .unwrap_err();
        assert!(matches!(err, TvqError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_lengths_cover_the_vector() {
        let alloc = allocator();
        let layout = alloc
            .compute_layout(1, BlockType::Long, InterleaveType::Long, 700, &[])
            .unwrap();
        let ch = &layout.channels[0];
        assert_eq!(ch.vector_len(), alloc.vector_len(InterleaveType::Long));
        let min = ch.lengths.iter().min().unwrap();
        let max = ch.lengths.iter().max().unwrap();
        assert!(max - min <= 1);
    }

    proptest! {
        #[test]
        fn prop_layout_is_deterministic(
            bits in 1usize..400,
            weights in prop::collection::vec(1u32..20, 1..12),
        ) {
            let alloc = allocator();
            let a = alloc.compute_layout(1, BlockType::Long, InterleaveType::Long, bits, &weights);
            let b = alloc.compute_layout(1, BlockType::Long, InterleaveType::Long, bits, &weights);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_bits_are_conserved(
            extra in 0usize..200,
            weights in prop::collection::vec(1u32..20, 1..12),
        ) {
            let bits = (weights.len() + extra).min(weights.len() * 14);
            let layout = allocator()
                .compute_layout(1, BlockType::Long, InterleaveType::Long, bits, &weights)
                .unwrap();
            let ch = &layout.channels[0];
            let total: usize = ch.bits.iter().map(|&b| b as usize).sum();
            prop_assert_eq!(total, bits);
            prop_assert!(ch.bits.iter().all(|&b| (1..=14).contains(&b)));
            let stages: usize = layout.code_widths().map(|w| w as usize).sum();
            prop_assert_eq!(stages, bits);
        }
    }
}
