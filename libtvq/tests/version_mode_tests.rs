#[cfg(test)]
mod version_tests {
    use libtvq::core::{wtype_to_btype, BlockType, TvqError, WindowType};
    use libtvq::mode::{ModeTable, MODES};
    use libtvq::version::{check_version, resolve, resolve_id, resolve_record, TvqVersion};

    #[test]
    fn test_resolve_known_versions() {
        assert_eq!(resolve(b"TWIN", b"97012000"), TvqVersion::V2);
        assert_eq!(resolve(b"TWIN", b"00052200"), TvqVersion::V2pp);
        assert_eq!(TvqVersion::V2.id(), 0);
        assert_eq!(TvqVersion::V2pp.id(), 1);
    }

    #[test]
    fn test_resolve_unknown() {
        assert_eq!(resolve(b"TWIN", b"99999999"), TvqVersion::Unknown);
        assert_eq!(resolve(b"NIWT", b"97012000"), TvqVersion::Unknown);
        assert_eq!(TvqVersion::Unknown.id(), -1);
        assert_eq!(resolve_id(b"TWIN9701"), TvqVersion::Unknown);

        let err = resolve_record(b"TWIN", b"12345678").unwrap_err();
        assert!(matches!(err, TvqError::UnknownVersion { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_check_version() {
        assert!(check_version(b"97012000"));
        assert!(check_version(b"00052200"));
        assert!(!check_version(b"00000000"));
    }

    #[test]
    fn test_version_id_round_trip() {
        for version in [TvqVersion::V2, TvqVersion::V2pp] {
            let id = version.version_id().unwrap();
            assert_eq!(id.len(), 12);
            assert_eq!(resolve_id(id.as_bytes()), version);
        }
        assert!(TvqVersion::Unknown.version_id().is_none());
    }

    #[test]
    fn test_mode_sets() {
        let v2 = TvqVersion::V2.record().unwrap();
        let v2pp = TvqVersion::V2pp.record().unwrap();
        let m22_32 = ModeTable::lookup(22, 32).unwrap();
        assert!(!v2.supports_mode(m22_32));
        assert!(v2pp.supports_mode(m22_32));
        for mode in MODES.iter() {
            assert!(v2pp.supports_mode(mode), "{}", mode.name());
        }
        assert!(v2.supports_channels(2));
        assert!(!v2.supports_channels(3));
    }

    #[test]
    fn test_window_type_table() {
        let expected = [
            BlockType::Long,
            BlockType::Long,
            BlockType::Short,
            BlockType::Long,
            BlockType::Medium,
            BlockType::Long,
            BlockType::Long,
            BlockType::Medium,
            BlockType::Medium,
        ];
        for (wtype, &btype) in expected.iter().enumerate() {
            assert_eq!(wtype_to_btype(wtype as u8).unwrap(), btype);
        }
        assert_eq!(wtype_to_btype(9), Err(TvqError::InvalidWindowType(9)));
        assert!(WindowType::try_from(15u8).is_err());
    }

    #[test]
    fn test_window_selection_follows_blocks() {
        for previous in BlockType::ALL {
            for current in BlockType::ALL {
                assert_eq!(WindowType::select(previous, current).block_type(), current);
            }
        }
        assert_eq!(
            WindowType::select(BlockType::Short, BlockType::Long),
            WindowType::ShortLong
        );
    }

    #[test]
    fn test_mode_lookup() {
        let mode = ModeTable::lookup(44, 48).unwrap();
        assert_eq!(mode.name(), "44/48");
        assert_eq!(mode.sample_rate(), 44100);
        assert_eq!(mode.frame_size, 2048);
        assert!(ModeTable::lookup(44, 32).is_none());
    }
}
