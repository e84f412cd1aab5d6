use log::{debug, warn};

use super::{
    is_skipped_tag, is_text_tag, TextChunk, VqfFile, VqfHeader, VqfMetadata, COMM_TAG, DATA_TAG,
    DSIZ_TAG,
};
use crate::core::{TvqError, TvqResult, KEYWORD, KEYWORD_BYTES, VERSION_BYTES};
use crate::version::{resolve, TvqVersion};

/// Parser for VQF files
pub struct VqfReader;

impl VqfReader {
    pub fn new() -> Self {
        VqfReader
    }

    /// parse a complete file
    pub fn read(&self, data: &[u8]) -> TvqResult<VqfFile> {
        let mut cursor = Cursor::new(data);
        let (header, metadata) = self.read_header(&mut cursor)?;
        let data = cursor.rest().to_vec();

        if let Some(size) = header.data_size {
            if size as usize != data.len() {
                warn!("DSIZ says {size} bytes, file has {}", data.len());
            }
        }

        Ok(VqfFile {
            header,
            metadata,
            data,
        })
    }

    /// parse everything up to and including the DATA tag
    ///
    /// Returns the header, metadata and the offset where frame data starts.
    pub fn read_prefix(&self, data: &[u8]) -> TvqResult<(VqfHeader, VqfMetadata, usize)> {
        let mut cursor = Cursor::new(data);
        let (header, metadata) = self.read_header(&mut cursor)?;
        Ok((header, metadata, cursor.pos))
    }

    fn read_header(&self, cursor: &mut Cursor) -> TvqResult<(VqfHeader, VqfMetadata)> {
        let keyword = cursor.read_bytes(KEYWORD_BYTES)?;
        if keyword != KEYWORD {
            return Err(TvqError::Container("not a VQF file: bad keyword".to_string()));
        }
        let version_bytes = cursor.read_bytes(VERSION_BYTES)?;
        let version = resolve(keyword, version_bytes);
        if version == TvqVersion::Unknown {
            return Err(TvqError::UnknownVersion {
                keyword: String::from_utf8_lossy(keyword).into_owned(),
                version: String::from_utf8_lossy(version_bytes).into_owned(),
            });
        }

        let header_size = cursor.read_u32_be()? as usize;
        let chunks_end = cursor.pos + header_size;

        let mut comm = None;
        let mut data_size = None;
        let mut metadata = VqfMetadata::new();

        loop {
            let tag = cursor.read_bytes(4)?;
            if tag == DATA_TAG {
                break;
            }
            if cursor.pos > chunks_end {
                return Err(TvqError::Container("no DATA chunk inside the header".to_string()));
            }

            let len = cursor.read_u32_be()? as usize;
            let body = cursor.read_bytes(len)?;

            if tag == COMM_TAG {
                comm = Some(read_comm(body)?);
            } else if tag == DSIZ_TAG {
                data_size = Some(Cursor::new(body).read_u32_be()?);
            } else if is_text_tag(tag) {
                metadata.chunks.push(TextChunk {
                    tag: String::from_utf8_lossy(tag).into_owned(),
                    value: String::from_utf8_lossy(body)
                        .trim_end_matches('\0')
                        .to_string(),
                });
            } else if is_skipped_tag(tag) {
                debug!("skipping {} chunk", String::from_utf8_lossy(tag));
            } else {
                warn!("unknown chunk {:?}, skipped", String::from_utf8_lossy(tag));
            }
        }

        let (channel_mode, bit_rate, rate_class, security_level) =
            comm.ok_or_else(|| TvqError::Container("missing COMM chunk".to_string()))?;

        let header = VqfHeader {
            version,
            channels: channel_mode as usize + 1,
            bit_rate,
            rate_class,
            security_level,
            data_size,
        };
        header.validate()?;
        Ok((header, metadata))
    }
}

impl Default for VqfReader {
    fn default() -> Self {
        Self::new()
    }
}

/// channel mode, kbps, rate class and security level
fn read_comm(body: &[u8]) -> TvqResult<(u32, u32, u32, u32)> {
    let mut c = Cursor::new(body);
    let channel_mode = c.read_u32_be()?;
    let bit_rate = c.read_u32_be()?;
    let rate_class = c.read_u32_be()?;
    // older writers stop after the rate class
    let security_level = if c.remaining() >= 4 {
        c.read_u32_be()?
    } else {
        0
    };
    Ok((channel_mode, bit_rate, rate_class, security_level))
}

// cursor helper

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Cursor { data, pos: 0 }
    }

    fn read_bytes(&mut self, count: usize) -> TvqResult<&'a [u8]> {
        let end = self.pos.checked_add(count).filter(|&e| e <= self.data.len());
        let Some(end) = end else {
            return Err(TvqError::UnexpectedEof {
                needed: count,
                offset: self.pos,
            });
        };
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_u32_be(&mut self) -> TvqResult<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn rest(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_comm_has_no_security_level() {
        let mut body = Vec::new();
        for v in [0u32, 20, 22] {
            body.extend_from_slice(&v.to_be_bytes());
        }
        assert_eq!(read_comm(&body).unwrap(), (0, 20, 22, 0));
    }

    #[test]
    fn truncated_file_is_eof() {
        let err = VqfReader::new().read(b"TWIN9701").unwrap_err();
        assert!(matches!(err, TvqError::UnexpectedEof { .. }));
    }
}
