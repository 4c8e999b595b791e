//! Re-emitting captured chunks with new metadata.

mod support;

use pngscribe::image::{GrayImage, Rect};
use pngscribe::png::{Deferred, EncodeContext, Encoder, Metadata, Source, TextEntry};
use pngscribe::{Error, ErrorKind, Image};

use support::{chunks, synthetic};

/// Payload followed by its CRC, as a capture would hand it over.
fn blob(c: &chunks::Chunk) -> Vec<u8> {
    let mut b = c.payload.clone();
    b.extend_from_slice(&c.crc.to_be_bytes());
    b
}

/// Encode `img` and capture its critical chunks, concatenating IDATs.
fn capture(img: &dyn Image) -> (Vec<u8>, Deferred) {
    let mut png = Vec::new();
    Encoder::uncompressed().encode(&mut png, img).unwrap();
    let parsed = chunks::parse(&png);

    let mut d = Deferred::new(blob(chunks::find(&parsed, b"IHDR").unwrap()));
    if let Some(c) = chunks::find(&parsed, b"PLTE") {
        d = d.with_plte(blob(c));
    }
    if let Some(c) = chunks::find(&parsed, b"tRNS") {
        d = d.with_trns(blob(c));
    }
    let mut idat: Vec<u8> = parsed
        .iter()
        .filter(|c| &c.tag == b"IDAT")
        .flat_map(|c| c.payload.iter().copied())
        .collect();
    // Any trailer works; it is replaced.
    idat.extend_from_slice(&[0xDE, 0xAD, 0xBE, 0xEF]);
    (png, d.with_idat(idat))
}

fn reencode(d: &Deferred, options: &[&dyn pngscribe::png::WriteOption]) -> pngscribe::Result<Vec<u8>> {
    let mut out = Vec::new();
    Encoder::new().encode_with_options(&EncodeContext::new(), &mut out, Source::Deferred(d), options)?;
    Ok(out)
}

#[test]
fn test_deferred_adds_metadata_around_captured_chunks() {
    let img = synthetic::paletted_stripes(300, 200, 5);
    let (original, deferred) = capture(&img);

    let mut meta = Metadata::new();
    meta.gamma = Some(45455);
    meta.push_text(TextEntry::text("Software", "pngscribe"));
    meta.histogram = Some(vec![1, 2, 3, 4, 5]);
    let png = reencode(&deferred, &[&meta]).unwrap();

    assert_eq!(
        chunks::names(&png),
        vec!["IHDR", "gAMA", "tEXt", "PLTE", "hIST", "IDAT", "IEND"]
    );
    let parsed = chunks::parse(&png);
    for c in &parsed {
        assert_eq!(c.crc, c.expected_crc(), "bad CRC on {}", c.name());
    }

    let before = chunks::parse(&original);
    assert_eq!(parsed[0].payload, before[0].payload);
    assert_eq!(
        chunks::find(&parsed, b"PLTE").unwrap().payload,
        chunks::find(&before, b"PLTE").unwrap().payload
    );

    let a = image::load_from_memory(&original).unwrap().to_rgba8();
    let b = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(a, b);
}

#[test]
fn test_deferred_without_metadata_matches_single_idat_stream() {
    let img = synthetic::gradient_gray(40, 40);
    let (original, deferred) = capture(&img);
    let png = reencode(&deferred, &[]).unwrap();
    assert_eq!(chunks::names(&png), vec!["IHDR", "IDAT", "IEND"]);

    let parsed = chunks::parse(&png);
    let idat = &chunks::find(&parsed, b"IDAT").unwrap().payload;
    let concatenated: Vec<u8> = chunks::parse(&original)
        .iter()
        .filter(|c| &c.tag == b"IDAT")
        .flat_map(|c| c.payload.clone())
        .collect();
    assert_eq!(idat, &concatenated);
}

#[test]
fn test_deferred_recomputes_stale_crc() {
    let img = GrayImage::new(Rect::from_size(2, 2));
    let (_, deferred) = capture(&img);
    let png = reencode(&deferred, &[]).unwrap();
    let idat = chunks::find(&chunks::parse(&png), b"IDAT").unwrap().clone();
    assert_ne!(idat.crc, 0xDEADBEEF);
    assert_eq!(idat.crc, idat.expected_crc());
}

#[test]
fn test_deferred_short_blob_is_rejected_before_writing() {
    let d = Deferred::new(vec![0; 17]).with_plte(vec![1, 2, 3]);
    let mut out = Vec::new();
    let err = Encoder::new()
        .encode_with_options(&EncodeContext::new(), &mut out, Source::from(&d), &[])
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
    assert_eq!(
        err,
        Error::MalformedDeferredChunk {
            tag: *b"PLTE",
            len: 3
        }
    );
    assert!(out.is_empty());
}

#[test]
fn test_deferred_still_validates_metadata() {
    let (_, deferred) = capture(&GrayImage::new(Rect::from_size(1, 1)));
    let mut meta = Metadata::new();
    meta.push_text(TextEntry::text("bad  key", "v"));
    let err = reencode(&deferred, &[&meta]).unwrap_err();
    assert!(matches!(err, Error::InvalidMetadata(_)));
}
