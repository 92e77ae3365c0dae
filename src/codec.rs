//! On-disk envelope shared by the dictionary and segment formats:
//! a CRC32 of the LZ4-compressed payload, then the payload itself.

/// Wrap a raw payload: `[crc32 (4 bytes LE)][lz4 with prepended size]`.
pub fn seal(payload: &[u8]) -> Vec<u8> {
    let compressed = lz4_flex::compress_prepend_size(payload);
    let crc = crc32fast::hash(&compressed);
    let mut out = Vec::with_capacity(4 + compressed.len());
    out.extend_from_slice(&crc.to_le_bytes());
    out.extend_from_slice(&compressed);
    out
}

/// Verify the checksum and decompress. Returns `None` on truncation,
/// checksum mismatch, or a bad LZ4 frame.
pub fn unseal(data: &[u8]) -> Option<Vec<u8>> {
    if data.len() < 4 {
        return None;
    }
    let stored = u32::from_le_bytes(data[0..4].try_into().ok()?);
    let compressed = &data[4..];
    if crc32fast::hash(compressed) != stored {
        return None;
    }
    lz4_flex::decompress_size_prepended(compressed).ok()
}
