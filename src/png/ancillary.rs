//! Serialization of ancillary chunks from a [`Metadata`] bundle.
//!
//! Chunks are written in the order PNG decoders expect them before the
//! palette: gAMA, cHRM, sRGB, tIME, iCCP, pHYs, the XMP packet and then the
//! text entries. hIST follows the palette and is written separately.

use std::io::Write;

use crate::compress::{zlib_compress, CompressionLevel};
use crate::error::{Error, Result};

use super::chunk::ChunkWriter;
use super::metadata::{latin1_bytes, Metadata, TextEntry, TextKind, XMP_KEY};
use super::options::{EncodeContext, WriteOption};

/// Everything an ancillary chunk may need besides the metadata itself.
pub(crate) struct AncillaryContext<'a> {
    pub level: CompressionLevel,
    pub ctx: &'a EncodeContext,
    pub options: &'a [&'a dyn WriteOption],
}

/// Write the chunks that precede PLTE.
pub(crate) fn write_leading<W: Write>(
    chunks: &mut ChunkWriter<W>,
    meta: &Metadata,
    cx: &AncillaryContext<'_>,
) -> Result<()> {
    if let Some(gamma) = meta.gamma {
        chunks.write_chunk(b"gAMA", &gamma.to_be_bytes())?;
    }
    if let Some(chroma) = meta.chroma {
        chunks.write_chunk(b"cHRM", &chroma.to_be_bytes())?;
    }
    if let Some(intent) = meta.srgb_intent {
        chunks.write_chunk(b"sRGB", &[intent as u8])?;
    }
    if let Some(ts) = meta.last_modified {
        chunks.write_chunk(b"tIME", &ts.to_be_bytes())?;
    }
    write_iccp(chunks, meta, cx)?;
    if let Some(dim) = meta.dimension {
        chunks.write_chunk(b"pHYs", &dim.to_be_bytes())?;
    }
    if meta.has_xmp() {
        write_xmp(chunks, meta, cx)?;
    }
    for entry in &meta.text {
        write_text(chunks, entry, cx.level)?;
    }
    Ok(())
}

/// Write hIST if the bundle has a histogram.
pub(crate) fn write_hist<W: Write>(chunks: &mut ChunkWriter<W>, meta: &Metadata) -> Result<()> {
    let Some(hist) = &meta.histogram else {
        return Ok(());
    };
    let payload: Vec<u8> = hist.iter().flat_map(|h| h.to_be_bytes()).collect();
    chunks.write_chunk(b"hIST", &payload)
}

fn write_iccp<W: Write>(
    chunks: &mut ChunkWriter<W>,
    meta: &Metadata,
    cx: &AncillaryContext<'_>,
) -> Result<()> {
    if let Some(raw) = meta.raw_icc() {
        return chunks.write_chunk(b"iCCP", raw);
    }
    let Some(profile) = meta.icc() else {
        return Ok(());
    };
    let bytes = match profile.encode(cx.ctx, cx.options) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("ICC profile hook failed: {e}");
            return Err(chunks.fail(Error::Hook(e.into())));
        }
    };
    let payload = recorded(chunks, iccp_payload(meta.icc_name(), &bytes, cx.level))?;
    chunks.write_chunk(b"iCCP", &payload)
}

fn write_xmp<W: Write>(
    chunks: &mut ChunkWriter<W>,
    meta: &Metadata,
    cx: &AncillaryContext<'_>,
) -> Result<()> {
    let packet = match (meta.xmp(), meta.raw_xmp()) {
        (Some(xmp), _) => match xmp.encode(cx.ctx, cx.options) {
            Ok(text) => text,
            Err(e) => {
                log::warn!("XMP hook failed: {e}");
                return Err(chunks.fail(Error::Hook(e.into())));
            }
        },
        (None, Some(raw)) => raw.to_owned(),
        (None, None) => return Ok(()),
    };
    let entry = TextEntry::international(XMP_KEY, packet);
    write_text(chunks, &entry, cx.level)
}

fn write_text<W: Write>(
    chunks: &mut ChunkWriter<W>,
    entry: &TextEntry,
    level: CompressionLevel,
) -> Result<()> {
    match entry.kind {
        TextKind::Text => chunks.write_chunk(b"tEXt", &text_payload(entry)),
        TextKind::Compressed => {
            let payload = recorded(chunks, ztxt_payload(entry, level))?;
            chunks.write_chunk(b"zTXt", &payload)
        }
        TextKind::International => {
            let payload = recorded(chunks, itxt_payload(entry, level))?;
            chunks.write_chunk(b"iTXt", &payload)
        }
    }
}

/// Make a compression failure the session's sticky error.
fn recorded<W: Write, T>(chunks: &mut ChunkWriter<W>, r: Result<T>) -> Result<T> {
    r.map_err(|e| chunks.fail(e))
}

/// `keyword NUL value`, both Latin-1.
pub(crate) fn text_payload(entry: &TextEntry) -> Vec<u8> {
    let mut out = latin1_bytes(&entry.key);
    out.push(0);
    out.extend(latin1_bytes(&entry.value));
    out
}

/// `keyword NUL method compressed-value`.
pub(crate) fn ztxt_payload(entry: &TextEntry, level: CompressionLevel) -> Result<Vec<u8>> {
    let (packed, method) = zlib_compress(&latin1_bytes(&entry.value), level)?;
    let mut out = latin1_bytes(&entry.key);
    out.push(0);
    out.push(method);
    out.extend_from_slice(&packed);
    Ok(out)
}

/// `keyword NUL flag method language NUL translated-key NUL value`, with
/// the value always compressed.
pub(crate) fn itxt_payload(entry: &TextEntry, level: CompressionLevel) -> Result<Vec<u8>> {
    let (packed, method) = zlib_compress(entry.value.as_bytes(), level)?;
    let mut out = latin1_bytes(&entry.key);
    out.reserve(5 + entry.language_tag.len() + entry.translated_key.len() + packed.len());
    out.push(0);
    out.push(1);
    out.push(method);
    out.extend_from_slice(entry.language_tag.as_bytes());
    out.push(0);
    out.extend_from_slice(entry.translated_key.as_bytes());
    out.push(0);
    out.extend_from_slice(&packed);
    Ok(out)
}

/// `name NUL method compressed-profile`.
pub(crate) fn iccp_payload(name: &str, profile: &[u8], level: CompressionLevel) -> Result<Vec<u8>> {
    let (packed, method) = zlib_compress(profile, level)?;
    let mut out = latin1_bytes(name);
    out.push(0);
    out.push(method);
    out.extend_from_slice(&packed);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::png::metadata::{HookError, IccProfile, PhysicalDimensions, SrgbIntent, XmpPacket};
    use flate2::read::ZlibDecoder;
    use std::io::Read;

    fn inflate(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    /// `(tag, payload)` for each chunk in a stream without signature.
    fn chunks_of(bytes: &[u8]) -> Vec<([u8; 4], Vec<u8>)> {
        let mut out = Vec::new();
        let mut pos = 0;
        while pos < bytes.len() {
            let len = u32::from_be_bytes(bytes[pos..pos + 4].try_into().unwrap()) as usize;
            let tag: [u8; 4] = bytes[pos + 4..pos + 8].try_into().unwrap();
            out.push((tag, bytes[pos + 8..pos + 8 + len].to_vec()));
            pos += 12 + len;
        }
        out
    }

    fn write_all(meta: &Metadata) -> (Vec<u8>, Result<()>) {
        let mut sink = Vec::new();
        let ctx = EncodeContext::new();
        let cx = AncillaryContext {
            level: CompressionLevel::Default,
            ctx: &ctx,
            options: &[],
        };
        let result = {
            let mut chunks = ChunkWriter::new(&mut sink);
            let r = write_leading(&mut chunks, meta, &cx);
            r.and_then(|_| write_hist(&mut chunks, meta))
        };
        (sink, result)
    }

    #[derive(Debug)]
    struct Profile(Vec<u8>);

    impl IccProfile for Profile {
        fn encode(
            &self,
            _ctx: &EncodeContext,
            _options: &[&dyn WriteOption],
        ) -> std::result::Result<Vec<u8>, HookError> {
            Ok(self.0.clone())
        }
    }

    #[derive(Debug)]
    struct BrokenXmp;

    impl XmpPacket for BrokenXmp {
        fn encode(
            &self,
            _ctx: &EncodeContext,
            _options: &[&dyn WriteOption],
        ) -> std::result::Result<String, HookError> {
            Err("no packet".into())
        }
    }

    #[derive(Debug)]
    struct Packet(&'static str);

    impl XmpPacket for Packet {
        fn encode(
            &self,
            _ctx: &EncodeContext,
            _options: &[&dyn WriteOption],
        ) -> std::result::Result<String, HookError> {
            Ok(self.0.to_owned())
        }
    }

    #[test]
    fn test_text_payload_layout() {
        let entry = TextEntry::text("Title", "Caf\u{e9}");
        assert_eq!(text_payload(&entry), b"Title\0Caf\xe9".to_vec());
    }

    #[test]
    fn test_ztxt_payload_layout() {
        let entry = TextEntry::compressed("Comment", "hello hello hello");
        let payload = ztxt_payload(&entry, CompressionLevel::BestCompression).unwrap();
        assert_eq!(&payload[..9], b"Comment\0\0");
        assert_eq!(inflate(&payload[9..]), b"hello hello hello");
    }

    #[test]
    fn test_itxt_payload_layout() {
        let entry = TextEntry::international("Title", "\u{65e5}\u{672c}")
            .with_language_tag("ja")
            .with_translated_key("\u{984c}");
        let payload = itxt_payload(&entry, CompressionLevel::Default).unwrap();
        let mut expected = b"Title\0\x01\x00ja\0".to_vec();
        expected.extend_from_slice("\u{984c}".as_bytes());
        expected.push(0);
        assert_eq!(&payload[..expected.len()], &expected[..]);
        assert_eq!(inflate(&payload[expected.len()..]), "\u{65e5}\u{672c}".as_bytes());
    }

    #[test]
    fn test_itxt_empty_language_and_translation() {
        let entry = TextEntry::international("k", "v");
        let payload = itxt_payload(&entry, CompressionLevel::None).unwrap();
        assert_eq!(&payload[..6], b"k\0\x01\x00\0\0");
    }

    #[test]
    fn test_leading_chunk_order() {
        let mut meta = Metadata::new();
        meta.push_text(TextEntry::text("A", "1"));
        meta.dimension = Some(PhysicalDimensions::from_dpi(300));
        meta.srgb_intent = Some(SrgbIntent::Perceptual);
        meta.gamma = Some(45455);
        meta.set_raw_xmp("<x:xmpmeta/>");
        meta.histogram = Some(vec![1, 2]);

        let (sink, result) = write_all(&meta);
        result.unwrap();
        let tags: Vec<[u8; 4]> = chunks_of(&sink).into_iter().map(|(t, _)| t).collect();
        assert_eq!(
            tags,
            vec![*b"gAMA", *b"sRGB", *b"pHYs", *b"iTXt", *b"tEXt", *b"hIST"]
        );
        let chunks = chunks_of(&sink);
        assert_eq!(chunks[0].1, 45455u32.to_be_bytes());
        assert_eq!(chunks[5].1, vec![0, 1, 0, 2]);
        assert!(chunks[3].1.starts_with(b"XML:com.adobe.xmp\0\x01\x00"));
    }

    #[test]
    fn test_raw_icc_is_written_verbatim_over_profile() {
        let mut meta = Metadata::new();
        meta.set_icc("fresh", Box::new(Profile(vec![9; 64])));
        meta.set_raw_icc(b"captured\0\0zzzz".to_vec());
        let (sink, result) = write_all(&meta);
        result.unwrap();
        let chunks = chunks_of(&sink);
        assert_eq!(chunks.len(), 1);
        assert_eq!(&chunks[0].0, b"iCCP");
        assert_eq!(chunks[0].1, b"captured\0\0zzzz".to_vec());
    }

    #[test]
    fn test_icc_profile_is_compressed() {
        let mut meta = Metadata::new();
        meta.set_icc("Display P3", Box::new(Profile(vec![7; 300])));
        let (sink, result) = write_all(&meta);
        result.unwrap();
        let (tag, payload) = &chunks_of(&sink)[0];
        assert_eq!(tag, b"iCCP");
        assert_eq!(&payload[..12], b"Display P3\0\0");
        assert_eq!(inflate(&payload[12..]), vec![7; 300]);
    }

    #[test]
    fn test_xmp_object_beats_raw_packet() {
        let mut meta = Metadata::new();
        meta.set_raw_xmp("raw");
        meta.set_xmp(Box::new(Packet("fresh")));
        let (sink, result) = write_all(&meta);
        result.unwrap();
        let (_, payload) = &chunks_of(&sink)[0];
        let header = b"XML:com.adobe.xmp\0\x01\x00\0\0";
        assert_eq!(inflate(&payload[header.len()..]), b"fresh");
    }

    #[test]
    fn test_hook_failure_is_sticky() {
        let mut meta = Metadata::new();
        meta.set_xmp(Box::new(BrokenXmp));
        meta.push_text(TextEntry::text("After", "never"));

        let mut sink = Vec::new();
        let ctx = EncodeContext::new();
        let cx = AncillaryContext {
            level: CompressionLevel::Default,
            ctx: &ctx,
            options: &[],
        };
        let mut chunks = ChunkWriter::new(&mut sink);
        let err = write_leading(&mut chunks, &meta, &cx).unwrap_err();
        assert_eq!(err, Error::Hook("no packet".into()));
        assert_eq!(chunks.error(), Some(&err));
        assert_eq!(chunks.write_chunk(b"IEND", &[]), Err(err));
        assert_eq!(chunks.chunks_written(), 0);
    }
}
