//! Minimal PNG chunk reader for inspecting encoder output.

use std::io::Read;

use flate2::read::ZlibDecoder;

/// PNG file signature.
pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// One chunk as found in the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub tag: [u8; 4],
    pub payload: Vec<u8>,
    pub crc: u32,
}

impl Chunk {
    /// Tag as a string, for readable assertions.
    pub fn name(&self) -> &str {
        std::str::from_utf8(&self.tag).unwrap()
    }

    /// CRC32 of tag and payload, computed afresh.
    pub fn expected_crc(&self) -> u32 {
        let mut h = crc32fast::Hasher::new();
        h.update(&self.tag);
        h.update(&self.payload);
        h.finalize()
    }
}

/// Split `png` into chunks, checking the signature. A trailing partial
/// chunk is ignored.
pub fn parse(png: &[u8]) -> Vec<Chunk> {
    assert_eq!(&png[..8], &SIGNATURE, "missing PNG signature");
    parse_after_signature(&png[8..])
}

/// Split a chunk stream that has no signature.
pub fn parse_after_signature(mut bytes: &[u8]) -> Vec<Chunk> {
    let mut out = Vec::new();
    while bytes.len() >= 12 {
        let len = u32::from_be_bytes(bytes[..4].try_into().unwrap()) as usize;
        if bytes.len() < 12 + len {
            break;
        }
        let tag: [u8; 4] = bytes[4..8].try_into().unwrap();
        let payload = bytes[8..8 + len].to_vec();
        let crc = u32::from_be_bytes(bytes[8 + len..12 + len].try_into().unwrap());
        out.push(Chunk { tag, payload, crc });
        bytes = &bytes[12 + len..];
    }
    out
}

/// Chunk tags in stream order.
pub fn names(png: &[u8]) -> Vec<String> {
    parse(png).iter().map(|c| c.name().to_owned()).collect()
}

/// The first chunk tagged `tag`.
pub fn find<'a>(chunks: &'a [Chunk], tag: &[u8; 4]) -> Option<&'a Chunk> {
    chunks.iter().find(|c| &c.tag == tag)
}

/// Inflate a zlib stream.
pub fn inflate(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
    out
}

/// Inflated concatenation of every IDAT payload: the filtered scanlines.
pub fn scanlines(png: &[u8]) -> Vec<u8> {
    let joined: Vec<u8> = parse(png)
        .into_iter()
        .filter(|c| &c.tag == b"IDAT")
        .flat_map(|c| c.payload)
        .collect();
    inflate(&joined)
}
