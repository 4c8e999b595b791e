//! Ancillary metadata carried alongside an image.
//!
//! A [`Metadata`] bundle is passed to the encoder as a write option. Every
//! field is independent and an absent field emits no chunk.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Error, Result};

use super::options::{EncodeContext, WriteOption};

/// Error type returned by ICC and XMP hooks.
pub type HookError = Box<dyn StdError + Send + Sync>;

/// iTXt keyword under which XMP packets are stored.
pub const XMP_KEY: &str = "XML:com.adobe.xmp";

/// Longest keyword PNG allows, in Latin-1 bytes.
pub const MAX_KEYWORD_LEN: usize = 79;

/// Produces ICC profile bytes when the image is written.
pub trait IccProfile: fmt::Debug + Send + Sync {
    /// Serialize the profile. The encoder compresses the result.
    fn encode(
        &self,
        ctx: &EncodeContext,
        options: &[&dyn WriteOption],
    ) -> std::result::Result<Vec<u8>, HookError>;
}

/// Produces an XMP packet when the image is written.
pub trait XmpPacket: fmt::Debug + Send + Sync {
    /// Serialize the packet as XML text.
    fn encode(
        &self,
        ctx: &EncodeContext,
        options: &[&dyn WriteOption],
    ) -> std::result::Result<String, HookError>;
}

/// Chromaticities of the primaries and white point, each scaled by 100000.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Chroma {
    /// White point x.
    pub white_x: u32,
    /// White point y.
    pub white_y: u32,
    /// Red x.
    pub red_x: u32,
    /// Red y.
    pub red_y: u32,
    /// Green x.
    pub green_x: u32,
    /// Green y.
    pub green_y: u32,
    /// Blue x.
    pub blue_x: u32,
    /// Blue y.
    pub blue_y: u32,
}

impl Chroma {
    /// The sRGB / BT.709 primaries with a D65 white point.
    pub const SRGB: Chroma = Chroma {
        white_x: 31270,
        white_y: 32900,
        red_x: 64000,
        red_y: 33000,
        green_x: 30000,
        green_y: 60000,
        blue_x: 15000,
        blue_y: 6000,
    };

    pub(crate) fn to_be_bytes(self) -> [u8; 32] {
        let mut out = [0u8; 32];
        let values = [
            self.white_x,
            self.white_y,
            self.red_x,
            self.red_y,
            self.green_x,
            self.green_y,
            self.blue_x,
            self.blue_y,
        ];
        for (dst, v) in out.chunks_exact_mut(4).zip(values) {
            dst.copy_from_slice(&v.to_be_bytes());
        }
        out
    }
}

/// sRGB rendering intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SrgbIntent {
    /// Photographic images.
    Perceptual = 0,
    /// Logos and other colors that must match exactly.
    RelativeColorimetric = 1,
    /// Charts and graphs.
    Saturation = 2,
    /// Proofs that simulate another medium.
    AbsoluteColorimetric = 3,
}

/// A UTC civil time as stored in tIME.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp {
    /// Full year, e.g. `2024`.
    pub year: u16,
    /// `1..=12`.
    pub month: u8,
    /// `1..=31`.
    pub day: u8,
    /// `0..=23`.
    pub hour: u8,
    /// `0..=59`.
    pub minute: u8,
    /// `60` is allowed for leap seconds.
    pub second: u8,
}

impl Timestamp {
    /// Build from explicit fields. Ranges are checked by [`Metadata::validate`].
    pub const fn new(year: u16, month: u8, day: u8, hour: u8, minute: u8, second: u8) -> Self {
        Self {
            year,
            month,
            day,
            hour,
            minute,
            second,
        }
    }

    /// Convert seconds since the Unix epoch. `None` if the year does not
    /// fit in 16 bits.
    pub fn from_unix_seconds(secs: i64) -> Option<Self> {
        let days = secs.div_euclid(86_400);
        let rem = secs.rem_euclid(86_400);
        let (year, month, day) = civil_from_days(days);
        Some(Self {
            year: u16::try_from(year).ok()?,
            month,
            day,
            hour: (rem / 3600) as u8,
            minute: (rem % 3600 / 60) as u8,
            second: (rem % 60) as u8,
        })
    }

    /// Convert a system time, truncating to whole seconds.
    pub fn from_system_time(time: SystemTime) -> Option<Self> {
        let secs = match time.duration_since(UNIX_EPOCH) {
            Ok(d) => i64::try_from(d.as_secs()).ok()?,
            Err(e) => {
                let d = e.duration();
                let whole = i64::try_from(d.as_secs()).ok()?;
                // Round toward negative infinity for times before the epoch.
                if d.subsec_nanos() > 0 {
                    -whole - 1
                } else {
                    -whole
                }
            }
        };
        Self::from_unix_seconds(secs)
    }

    /// The current time.
    pub fn now() -> Option<Self> {
        Self::from_system_time(SystemTime::now())
    }

    pub(crate) fn to_be_bytes(self) -> [u8; 7] {
        let [y0, y1] = self.year.to_be_bytes();
        [y0, y1, self.month, self.day, self.hour, self.minute, self.second]
    }

    fn check(&self) -> Result<()> {
        let ok = (1..=12).contains(&self.month)
            && (1..=31).contains(&self.day)
            && self.hour <= 23
            && self.minute <= 59
            && self.second <= 60;
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidMetadata(format!(
                "timestamp out of range: {:04}-{:02}-{:02} {:02}:{:02}:{:02}",
                self.year, self.month, self.day, self.hour, self.minute, self.second
            )))
        }
    }
}

/// Days since 1970-01-01 to a proleptic Gregorian (year, month, day).
fn civil_from_days(days: i64) -> (i64, u8, u8) {
    let z = days + 719_468;
    let era = z.div_euclid(146_097);
    let doe = z.rem_euclid(146_097);
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = (doy - (153 * mp + 2) / 5 + 1) as u8;
    let month = (if mp < 10 { mp + 3 } else { mp - 9 }) as u8;
    let year = yoe + era * 400 + i64::from(month <= 2);
    (year, month, day)
}

/// Unit of [`PhysicalDimensions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Unit {
    /// Only the aspect ratio is meaningful.
    #[default]
    Unknown = 0,
    /// Pixels per metre.
    Meter = 1,
}

/// Pixels per unit along each axis (pHYs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PhysicalDimensions {
    /// Pixels per unit, horizontally.
    pub x: u32,
    /// Pixels per unit, vertically.
    pub y: u32,
    /// Unit of `x` and `y`.
    pub unit: Unit,
}

impl PhysicalDimensions {
    /// Square pixels at `dpi` dots per inch.
    pub fn from_dpi(dpi: u32) -> Self {
        let ppm = (f64::from(dpi) / 0.0254).round() as u32;
        Self {
            x: ppm,
            y: ppm,
            unit: Unit::Meter,
        }
    }

    pub(crate) fn to_be_bytes(self) -> [u8; 9] {
        let mut out = [0u8; 9];
        out[..4].copy_from_slice(&self.x.to_be_bytes());
        out[4..8].copy_from_slice(&self.y.to_be_bytes());
        out[8] = self.unit as u8;
        out
    }
}

/// Which text chunk a [`TextEntry`] is written as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextKind {
    /// tEXt: uncompressed Latin-1.
    Text,
    /// zTXt: compressed Latin-1.
    Compressed,
    /// iTXt: compressed UTF-8 with optional language tag and translated key.
    International,
}

/// One textual key/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextEntry {
    /// Keyword, e.g. `"Title"` or `"Author"`.
    pub key: String,
    /// Text. Latin-1 only unless `kind` is [`TextKind::International`].
    pub value: String,
    /// Chunk type to write.
    pub kind: TextKind,
    /// iTXt only.
    pub language_tag: String,
    /// iTXt only.
    pub translated_key: String,
}

impl TextEntry {
    fn with_kind(key: impl Into<String>, value: impl Into<String>, kind: TextKind) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind,
            language_tag: String::new(),
            translated_key: String::new(),
        }
    }

    /// A tEXt entry.
    pub fn text(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_kind(key, value, TextKind::Text)
    }

    /// A zTXt entry.
    pub fn compressed(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_kind(key, value, TextKind::Compressed)
    }

    /// An iTXt entry.
    pub fn international(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self::with_kind(key, value, TextKind::International)
    }

    /// Set the iTXt language tag, e.g. `"en-GB"`.
    pub fn with_language_tag(mut self, tag: impl Into<String>) -> Self {
        self.language_tag = tag.into();
        self
    }

    /// Set the iTXt translated keyword.
    pub fn with_translated_key(mut self, key: impl Into<String>) -> Self {
        self.translated_key = key.into();
        self
    }

    fn check(&self) -> Result<()> {
        check_keyword(&self.key)?;
        match self.kind {
            TextKind::Text | TextKind::Compressed => {
                if !is_latin1(&self.value) {
                    return Err(Error::InvalidMetadata(format!(
                        "value of text entry {:?} is not Latin-1",
                        self.key
                    )));
                }
            }
            TextKind::International => {
                if !self.language_tag.is_ascii() || self.language_tag.contains('\0') {
                    return Err(Error::InvalidMetadata(format!(
                        "language tag {:?} is not a plain ASCII tag",
                        self.language_tag
                    )));
                }
                if self.translated_key.contains('\0') {
                    return Err(Error::InvalidMetadata(format!(
                        "translated keyword of {:?} contains NUL",
                        self.key
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Optional ancillary chunks for one image.
#[derive(Debug, Default)]
pub struct Metadata {
    /// Image gamma times 100000 (gAMA).
    pub gamma: Option<u32>,
    /// cHRM.
    pub chroma: Option<Chroma>,
    /// sRGB.
    pub srgb_intent: Option<SrgbIntent>,
    /// tIME.
    pub last_modified: Option<Timestamp>,
    /// pHYs.
    pub dimension: Option<PhysicalDimensions>,
    /// hIST, one count per palette entry.
    pub histogram: Option<Vec<u16>>,
    /// Written in order after XMP.
    pub text: Vec<TextEntry>,
    icc_name: String,
    icc: Option<Box<dyn IccProfile>>,
    raw_icc: Option<Vec<u8>>,
    xmp: Option<Box<dyn XmpPacket>>,
    raw_xmp: Option<String>,
}

impl Metadata {
    /// Empty bundle.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an ICC profile encoded at write time under `name`.
    pub fn set_icc(&mut self, name: impl Into<String>, profile: Box<dyn IccProfile>) {
        self.icc_name = name.into();
        self.icc = Some(profile);
    }

    /// Attach a complete iCCP payload (name, NUL, method, compressed
    /// profile) as read from another file. Written verbatim, and preferred
    /// over a profile set with [`set_icc`](Self::set_icc).
    pub fn set_raw_icc(&mut self, payload: Vec<u8>) {
        self.raw_icc = Some(payload);
    }

    /// Attach an XMP packet encoded at write time. Preferred over a raw
    /// packet.
    pub fn set_xmp(&mut self, packet: Box<dyn XmpPacket>) {
        self.xmp = Some(packet);
    }

    /// Attach an already serialized XMP packet.
    pub fn set_raw_xmp(&mut self, packet: impl Into<String>) {
        self.raw_xmp = Some(packet.into());
    }

    /// Append a text entry.
    pub fn push_text(&mut self, entry: TextEntry) {
        self.text.push(entry);
    }

    /// Profile name given to [`set_icc`](Self::set_icc).
    pub fn icc_name(&self) -> &str {
        &self.icc_name
    }

    pub(crate) fn icc(&self) -> Option<&dyn IccProfile> {
        self.icc.as_deref()
    }

    pub(crate) fn raw_icc(&self) -> Option<&[u8]> {
        self.raw_icc.as_deref()
    }

    pub(crate) fn xmp(&self) -> Option<&dyn XmpPacket> {
        self.xmp.as_deref()
    }

    pub(crate) fn raw_xmp(&self) -> Option<&str> {
        self.raw_xmp.as_deref()
    }

    /// Whether an XMP packet of either form is attached.
    pub fn has_xmp(&self) -> bool {
        self.xmp.is_some() || self.raw_xmp.is_some()
    }

    /// Check every field against what PNG can carry.
    pub fn validate(&self) -> Result<()> {
        if let Some(ts) = &self.last_modified {
            ts.check()?;
        }
        if let Some(hist) = &self.histogram {
            if hist.is_empty() || hist.len() > 256 {
                return Err(Error::InvalidMetadata(format!(
                    "histogram has {} entries, expected 1 to 256",
                    hist.len()
                )));
            }
        }
        if self.icc.is_some() && self.raw_icc.is_none() {
            check_keyword(&self.icc_name)?;
        }
        for entry in &self.text {
            entry.check()?;
        }
        Ok(())
    }
}

impl WriteOption for Metadata {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn is_latin1(s: &str) -> bool {
    s.chars().all(|c| u32::from(c) <= 0xFF)
}

/// Encode `s` as Latin-1. Characters above U+00FF must have been rejected
/// by validation.
pub(crate) fn latin1_bytes(s: &str) -> Vec<u8> {
    s.chars().map(|c| c as u8).collect()
}

/// 1 to 79 printable Latin-1 characters, no leading, trailing or
/// consecutive spaces.
fn check_keyword(key: &str) -> Result<()> {
    let invalid = |why: &str| Err(Error::InvalidMetadata(format!("keyword {key:?} {why}")));

    let len = key.chars().count();
    if len == 0 || len > MAX_KEYWORD_LEN {
        return invalid("must be 1 to 79 characters");
    }
    let printable = |c: char| matches!(u32::from(c), 0x20..=0x7E | 0xA1..=0xFF);
    if !key.chars().all(printable) {
        return invalid("contains a non-printable or non-Latin-1 character");
    }
    if key.starts_with(' ') || key.ends_with(' ') || key.contains("  ") {
        return invalid("has leading, trailing or repeated spaces");
    }
    Ok(())
}
