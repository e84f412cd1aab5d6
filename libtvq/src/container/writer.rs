use super::{VqfHeader, VqfMetadata, COMM_TAG, DATA_TAG, DSIZ_TAG};
use crate::core::{TvqError, TvqResult, KEYWORD};

/// Builds VQF files
pub struct VqfWriter {
    buffer: Vec<u8>,
}

impl VqfWriter {
    pub fn new() -> Self {
        VqfWriter { buffer: Vec::new() }
    }

    /// write a complete file around already packed frame data
    pub fn write(mut self, header: &VqfHeader, metadata: &VqfMetadata, data: &[u8]) -> TvqResult<Vec<u8>> {
        header.validate()?;
        let version = header
            .version
            .record()
            .ok_or_else(|| TvqError::Container("can't write an unknown version".to_string()))?;

        let chunks = build_chunks(header, metadata, data.len())?;

        self.buffer.extend_from_slice(&KEYWORD);
        self.buffer.extend_from_slice(&version.version_string);
        self.buffer
            .extend_from_slice(&(chunks.len() as u32).to_be_bytes());
        self.buffer.extend_from_slice(&chunks);
        self.buffer.extend_from_slice(DATA_TAG);
        self.buffer.extend_from_slice(data);
        Ok(self.buffer)
    }
}

impl Default for VqfWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn build_chunks(header: &VqfHeader, metadata: &VqfMetadata, data_len: usize) -> TvqResult<Vec<u8>> {
    let mut out = Vec::new();

    let mut comm = Vec::with_capacity(16);
    for v in [
        header.channels as u32 - 1,
        header.bit_rate,
        header.rate_class,
        header.security_level,
    ] {
        comm.extend_from_slice(&v.to_be_bytes());
    }
    push_chunk(&mut out, COMM_TAG, &comm);

    for chunk in &metadata.chunks {
        let tag = chunk.tag.as_bytes();
        if tag.len() != 4 || !super::is_text_tag(tag) {
            return Err(TvqError::Container(format!("not a text chunk tag: {:?}", chunk.tag)));
        }
        push_chunk(&mut out, tag, chunk.value.as_bytes());
    }

    let size = u32::try_from(data_len)
        .map_err(|_| TvqError::Container(format!("{data_len} bytes of data is too large")))?;
    push_chunk(&mut out, DSIZ_TAG, &size.to_be_bytes());
    Ok(out)
}

fn push_chunk(out: &mut Vec<u8>, tag: &[u8], body: &[u8]) {
    out.extend_from_slice(tag);
    out.extend_from_slice(&(body.len() as u32).to_be_bytes());
    out.extend_from_slice(body);
}
