#[cfg(test)]
mod container_tests {
    use libtvq::container::{VqfHeader, VqfMetadata, VqfReader, VqfWriter};
    use libtvq::core::TvqError;
    use libtvq::version::TvqVersion;

    fn header() -> VqfHeader {
        VqfHeader {
            version: TvqVersion::V2pp,
            channels: 2,
            bit_rate: 96,
            rate_class: 44,
            security_level: 0,
            data_size: None,
        }
    }

    fn chunk(tag: &[u8; 4], body: &[u8]) -> Vec<u8> {
        let mut out = tag.to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn comm(channel_mode: u32, kbps: u32, rate_class: u32) -> Vec<u8> {
        let body: Vec<u8> = [channel_mode, kbps, rate_class, 0]
            .iter()
            .flat_map(|v| v.to_be_bytes())
            .collect();
        chunk(b"COMM", &body)
    }

    fn file(chunks: &[Vec<u8>], data: &[u8]) -> Vec<u8> {
        let body: Vec<u8> = chunks.concat();
        let mut out = b"TWIN97012000".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(&body);
        out.extend_from_slice(b"DATA");
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn test_write_read_round_trip() {
        let mut meta = VqfMetadata::new();
        meta.set("NAME", "Song");
        meta.set("AUTH", "Someone");
        meta.set("(c) ", "1999");
        let data = vec![0xA5u8; 300];

        let bytes = VqfWriter::new().write(&header(), &meta, &data).unwrap();
        let parsed = VqfReader::new().read(&bytes).unwrap();

        assert_eq!(parsed.header.version, TvqVersion::V2pp);
        assert_eq!(parsed.header.channels, 2);
        assert_eq!(parsed.header.bit_rate, 96);
        assert_eq!(parsed.header.rate_class, 44);
        assert_eq!(parsed.header.data_size, Some(300));
        assert_eq!(parsed.metadata, meta);
        assert_eq!(parsed.metadata.title(), Some("Song"));
        assert_eq!(parsed.metadata.copyright(), Some("1999"));
        assert_eq!(parsed.data, data);
    }

    #[test]
    fn test_skips_known_and_unknown_chunks() {
        let bytes = file(
            &[
                comm(0, 20, 22),
                chunk(b"YEAR", b"1998"),
                chunk(b"ZZZZ", b"whatever"),
                chunk(b"COMT", b"hello\0"),
            ],
            &[1, 2, 3],
        );
        let parsed = VqfReader::new().read(&bytes).unwrap();
        assert_eq!(parsed.header.version, TvqVersion::V2);
        assert_eq!(parsed.metadata.chunks.len(), 1);
        assert_eq!(parsed.metadata.comment(), Some("hello"));
        assert_eq!(parsed.header.data_size, None);
        assert_eq!(parsed.data, vec![1, 2, 3]);
    }

    #[test]
    fn test_missing_comm() {
        let bytes = file(&[chunk(b"NAME", b"x")], &[]);
        assert!(matches!(
            VqfReader::new().read(&bytes),
            Err(TvqError::Container(_))
        ));
    }

    #[test]
    fn test_rejects_bad_rates() {
        // rate class 7 doesn't exist
        let bytes = file(&[comm(0, 20, 7)], &[]);
        assert!(VqfReader::new().read(&bytes).is_err());

        // 64 kbps per channel is out of range
        let bytes = file(&[comm(0, 64, 44)], &[]);
        assert!(VqfReader::new().read(&bytes).is_err());

        // no 44 kHz / 32 kbps mode
        let bytes = file(&[comm(0, 32, 44)], &[]);
        assert!(VqfReader::new().read(&bytes).is_err());
    }

    #[test]
    fn test_bad_keyword_and_version() {
        let mut bytes = file(&[comm(0, 20, 22)], &[]);
        bytes[4..12].copy_from_slice(b"12345678");
        assert!(matches!(
            VqfReader::new().read(&bytes),
            Err(TvqError::UnknownVersion { .. })
        ));

        bytes[..4].copy_from_slice(b"RIFF");
        assert!(matches!(
            VqfReader::new().read(&bytes),
            Err(TvqError::Container(_))
        ));
    }

    #[test]
    fn test_header_info_for_decoder() {
        let info = header().header_info().unwrap();
        assert_eq!(info.id, "TWIN00052200");
        assert_eq!(info.channels, 2);
        assert_eq!(info.bit_rate, 96);
        assert_eq!(info.sampling_rate, 44100.0);

        let back = VqfHeader::from_header_info(&info).unwrap();
        assert_eq!(back, header());
    }

    #[test]
    fn test_frame_count() {
        let bytes = VqfWriter::new()
            .write(&header(), &VqfMetadata::new(), &vec![0u8; 1200])
            .unwrap();
        let parsed = VqfReader::new().read(&bytes).unwrap();
        // 96 kbps at 44.1 kHz, N = 2048: 4458 bits per frame
        assert_eq!(parsed.frame_bits().unwrap(), 4458);
        assert_eq!(parsed.frame_count().unwrap(), 2);
    }

    #[test]
    fn test_metadata_json() {
        let mut meta = VqfMetadata::with_basic(Some("Song".into()), Some("Band".into()), None);
        meta.set("(c) ", "2000");
        let json = meta.to_json();
        assert_eq!(json["NAME"], "Song");
        assert_eq!(json["AUTH"], "Band");
        assert_eq!(json["(c) "], "2000");
        assert!(json.get("COMT").is_none());
    }

    #[test]
    fn test_header_json_round_trip() {
        let mut header = header();
        header.data_size = Some(1200);
        let json = serde_json::to_string(&header).unwrap();
        let back: VqfHeader = serde_json::from_str(&json).unwrap();
        assert_eq!(back, header);
        assert_eq!(back.version, TvqVersion::V2pp);
    }
}
