//! format revisions and the keyword/version lookup

use serde::{Deserialize, Serialize};

use crate::core::{TvqError, TvqResult, KEYWORD, KEYWORD_BYTES, N_CH_MAX, VERSION_BYTES};
use crate::mode::ModeTable;

/// A bitstream format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TvqVersion {
    /// "97012000"
    V2,
    /// "00052200", adds the 22 kHz / 32 kbps mode
    V2pp,
    Unknown,
}

impl TvqVersion {
    /// numeric id, -1 for Unknown
    pub fn id(self) -> i32 {
        match self {
            TvqVersion::V2 => 0,
            TvqVersion::V2pp => 1,
            TvqVersion::Unknown => -1,
        }
    }

    pub fn record(self) -> Option<&'static VersionRecord> {
        VERSION_TABLE.iter().find(|r| r.version == self)
    }

    /// "TWIN97012000" style identifier
    pub fn version_id(self) -> Option<String> {
        self.record().map(VersionRecord::version_id)
    }
}

/// fixed parameters of one revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionRecord {
    pub version: TvqVersion,
    pub keyword: [u8; KEYWORD_BYTES],
    pub version_string: [u8; VERSION_BYTES],
    pub max_channels: usize,
    /// (rate class, kbps per channel) pairs this revision can carry
    pub modes: &'static [(u32, u32)],
    pub default_mode: (u32, u32),
}

const V2_MODES: [(u32, u32); 8] = [
    (8, 8),
    (11, 8),
    (11, 10),
    (16, 16),
    (22, 20),
    (22, 24),
    (44, 40),
    (44, 48),
];

const V2PP_MODES: [(u32, u32); 9] = [
    (8, 8),
    (11, 8),
    (11, 10),
    (16, 16),
    (22, 20),
    (22, 24),
    (22, 32),
    (44, 40),
    (44, 48),
];

static VERSION_TABLE: [VersionRecord; 2] = [
    VersionRecord {
        version: TvqVersion::V2,
        keyword: KEYWORD,
        version_string: *b"97012000",
        max_channels: N_CH_MAX,
        modes: &V2_MODES,
        default_mode: (22, 20),
    },
    VersionRecord {
        version: TvqVersion::V2pp,
        keyword: KEYWORD,
        version_string: *b"00052200",
        max_channels: N_CH_MAX,
        modes: &V2PP_MODES,
        default_mode: (44, 48),
    },
];

impl VersionRecord {
    pub fn supports_mode(&self, mode: &ModeTable) -> bool {
        self.modes.contains(&(mode.rate_class, mode.kbps))
    }

    pub fn supports_channels(&self, channels: usize) -> bool {
        (1..=self.max_channels).contains(&channels)
    }

    pub fn version_id(&self) -> String {
        let mut id = String::with_capacity(KEYWORD_BYTES + VERSION_BYTES);
        id.push_str(&String::from_utf8_lossy(&self.keyword));
        id.push_str(&String::from_utf8_lossy(&self.version_string));
        id
    }
}

/// exact-match lookup of a keyword and version string
pub fn resolve(keyword: &[u8], version: &[u8]) -> TvqVersion {
    VERSION_TABLE
        .iter()
        .find(|r| r.keyword.as_slice() == keyword && r.version_string.as_slice() == version)
        .map_or(TvqVersion::Unknown, |r| r.version)
}

/// like `resolve`, but Unknown is an error
pub fn resolve_record(keyword: &[u8], version: &[u8]) -> TvqResult<&'static VersionRecord> {
    resolve(keyword, version)
        .record()
        .ok_or_else(|| TvqError::UnknownVersion {
            keyword: String::from_utf8_lossy(keyword).into_owned(),
            version: String::from_utf8_lossy(version).into_owned(),
        })
}

/// is this one of the supported version strings?
pub fn check_version(version: &[u8]) -> bool {
    VERSION_TABLE
        .iter()
        .any(|r| r.version_string.as_slice() == version)
}

/// split a 12-byte "TWIN97012000" id and resolve it
pub fn resolve_id(id: &[u8]) -> TvqVersion {
    if id.len() != KEYWORD_BYTES + VERSION_BYTES {
        return TvqVersion::Unknown;
    }
    let (keyword, version) = id.split_at(KEYWORD_BYTES);
    resolve(keyword, version)
}
