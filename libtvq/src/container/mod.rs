//! VQF file container
//!
//! `"TWIN"` + 8-byte version, a big-endian header size, tagged chunks up to
//! the `DATA` tag, then frame data packed bit-continuously to the end of
//! the file.

pub mod reader;
pub mod writer;

use serde::{Deserialize, Serialize};

use crate::config::HeaderInfo;
use crate::core::{TvqError, TvqResult};
use crate::mode::{rate_class_to_hz, ModeTable};
use crate::version::TvqVersion;

pub use reader::VqfReader;
pub use writer::VqfWriter;

pub const COMM_TAG: &[u8; 4] = b"COMM";
pub const DSIZ_TAG: &[u8; 4] = b"DSIZ";
pub const DATA_TAG: &[u8; 4] = b"DATA";

/// chunks kept as text metadata
pub const TEXT_TAGS: [&[u8; 4]; 18] = [
    b"NAME", b"AUTH", b"(c) ", b"FILE", b"COMT", b"ARNG", b"BAND", b"CDCT", b"GENR", b"LABL",
    b"MUSC", b"NOTE", b"PROD", b"PRSN", b"REMX", b"SING", b"TRCK", b"WORD",
];

/// chunks read past without keeping
pub const SKIPPED_TAGS: [&[u8; 4]; 6] = [b"YEAR", b"ENCD", b"EXTR", b"_YMH", b"_NTT", b"_ID3"];

/// Stream parameters carried in the COMM chunk
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VqfHeader {
    pub version: TvqVersion,
    pub channels: usize,
    /// kbps over all channels
    pub bit_rate: u32,
    pub rate_class: u32,
    pub security_level: u32,
    /// DSIZ value if the file had one
    pub data_size: Option<u32>,
}

impl VqfHeader {
    /// header for a stream coded with `info`
    pub fn from_header_info(info: &HeaderInfo) -> TvqResult<Self> {
        let version = crate::version::resolve_id(info.id.as_bytes());
        if version == TvqVersion::Unknown {
            return Err(TvqError::Container(format!("no VQF version for {:?}", info.id)));
        }
        let rate_class = crate::mode::hz_to_rate_class(info.sampling_rate.round() as u32)
            .ok_or_else(|| {
                TvqError::Container(format!("unsupported sample rate {}", info.sampling_rate))
            })?;
        Ok(VqfHeader {
            version,
            channels: info.channels,
            bit_rate: info.bit_rate,
            rate_class,
            security_level: info.security_level,
            data_size: None,
        })
    }

    /// configuration a decoder session needs for this stream
    pub fn header_info(&self) -> TvqResult<HeaderInfo> {
        let hz = rate_class_to_hz(self.rate_class)
            .ok_or_else(|| TvqError::Container(format!("bad rate class {}", self.rate_class)))?;
        let mut info = HeaderInfo::new(self.version, self.channels, self.bit_rate, hz as f32);
        info.security_level = self.security_level;
        Ok(info)
    }

    /// check the rate and mode against the tables
    pub fn validate(&self) -> TvqResult<&'static ModeTable> {
        if rate_class_to_hz(self.rate_class).is_none() {
            return Err(TvqError::Container(format!("bad rate class {}", self.rate_class)));
        }
        if self.channels == 0 || self.channels > crate::core::N_CH_MAX {
            return Err(TvqError::Container(format!("bad channel count {}", self.channels)));
        }
        let per_channel = self.bit_rate / self.channels as u32;
        if !(8..=48).contains(&per_channel) {
            return Err(TvqError::Container(format!(
                "{per_channel} kbps per channel out of range"
            )));
        }
        ModeTable::lookup(self.rate_class, per_channel).ok_or_else(|| {
            TvqError::Container(format!(
                "no mode for {} kHz at {per_channel} kbps",
                self.rate_class
            ))
        })
    }
}

/// One text chunk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextChunk {
    pub tag: String,
    pub value: String,
}

/// Text chunks in file order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VqfMetadata {
    pub chunks: Vec<TextChunk>,
}

impl VqfMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// title, author and comment in one go
    pub fn with_basic(title: Option<String>, author: Option<String>, comment: Option<String>) -> Self {
        let mut meta = Self::new();
        if let Some(t) = title {
            meta.set("NAME", &t);
        }
        if let Some(a) = author {
            meta.set("AUTH", &a);
        }
        if let Some(c) = comment {
            meta.set("COMT", &c);
        }
        meta
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn get(&self, tag: &str) -> Option<&str> {
        self.chunks
            .iter()
            .find(|c| c.tag == tag)
            .map(|c| c.value.as_str())
    }

    /// replace or append a chunk
    pub fn set(&mut self, tag: &str, value: &str) {
        match self.chunks.iter_mut().find(|c| c.tag == tag) {
            Some(chunk) => chunk.value = value.to_string(),
            None => self.chunks.push(TextChunk {
                tag: tag.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn title(&self) -> Option<&str> {
        self.get("NAME")
    }

    pub fn author(&self) -> Option<&str> {
        self.get("AUTH")
    }

    pub fn copyright(&self) -> Option<&str> {
        self.get("(c) ")
    }

    pub fn comment(&self) -> Option<&str> {
        self.get("COMT")
    }

    /// tag -> value object, later chunks win on repeated tags
    pub fn to_json(&self) -> serde_json::Value {
        let map = self
            .chunks
            .iter()
            .map(|c| (c.tag.clone(), serde_json::Value::String(c.value.clone())))
            .collect::<serde_json::Map<_, _>>();
        serde_json::Value::Object(map)
    }
}

/// A parsed VQF file
#[derive(Debug, Clone)]
pub struct VqfFile {
    pub header: VqfHeader,
    pub metadata: VqfMetadata,
    /// packed frames, trailing padding included
    pub data: Vec<u8>,
}

impl VqfFile {
    pub fn mode(&self) -> TvqResult<&'static ModeTable> {
        self.header.validate()
    }

    /// complete frames in the data
    pub fn frame_count(&self) -> TvqResult<usize> {
        let mode = self.mode()?;
        Ok(self.data.len() * 8 / self.frame_bits_for(mode))
    }

    /// bits in one frame of this stream
    pub fn frame_bits(&self) -> TvqResult<usize> {
        Ok(self.frame_bits_for(self.mode()?))
    }

    fn frame_bits_for(&self, mode: &ModeTable) -> usize {
        mode.frame_bits(self.header.bit_rate * 1000).max(1)
    }
}

pub(crate) fn is_text_tag(tag: &[u8]) -> bool {
    TEXT_TAGS.iter().any(|t| t.as_slice() == tag)
}

pub(crate) fn is_skipped_tag(tag: &[u8]) -> bool {
    SKIPPED_TAGS.iter().any(|t| t.as_slice() == tag)
}
