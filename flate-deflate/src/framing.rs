//! Container framing: Raw DEFLATE, ZLIB (RFC 1950), and GZIP (RFC 1952).
//!
//! Headers and trailers are small and never split across many `process()`
//! calls in practice, so unlike the block engine this module does not need
//! a bit-level resumable state machine: [`stream::InflateStream`] just
//! accumulates raw bytes into a small `Vec` until a complete header parses,
//! which is simpler and still fully correct under arbitrarily small input
//! slices.

use flate_core::checksum::{Adler32, Crc32};

/// Which container wraps the raw DEFLATE stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FrameKind {
    /// No container: raw RFC 1951 DEFLATE data only.
    Raw,
    /// RFC 1950 ZLIB: 2-byte header, Adler-32 trailer.
    #[default]
    Zlib,
    /// RFC 1952 GZIP: 10-byte-plus header, CRC-32 + ISIZE trailer.
    Gzip,
}

/// Optional GZIP metadata, settable before the first compressed byte and
/// readable (on the decode side) after the first decompressed byte.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipMetadata {
    /// Original file name, ISO-8859-1, NUL- and path-separator-normalized.
    pub file_name: Option<Vec<u8>>,
    /// Free-form comment, ISO-8859-1.
    pub comment: Option<Vec<u8>>,
    /// Modification time as a Unix timestamp (0 = unknown, per RFC 1952).
    pub mtime: u32,
}

/// Normalize a GZIP `file_name`/`comment` value: reject embedded NULs (the
/// field is NUL-terminated on the wire), normalize forward slashes to
/// backslashes, and strip any leading path components, mirroring the
/// path-traversal-conscious handling of archive entry names.
pub fn sanitize_gzip_text(raw: &[u8]) -> Result<Vec<u8>, String> {
    if raw.contains(&0) {
        return Err("GZIP file_name/comment must not contain a NUL byte".to_string());
    }
    let normalized: Vec<u8> = raw.iter().map(|&b| if b == b'/' { b'\\' } else { b }).collect();
    let stripped = normalized
        .rsplit(|&b| b == b'\\')
        .next()
        .unwrap_or(&normalized)
        .to_vec();
    Ok(stripped)
}

/// Build a ZLIB header (CMF + FLG) for the given window size and level.
///
/// `window_bits` must be in `9..=15`; `fdict` requests the FDICT bit (a
/// preset-dictionary Adler-32 must follow, written separately by the caller).
pub fn zlib_header(window_bits: u8, level: u8, fdict: bool) -> [u8; 2] {
    debug_assert!((9..=15).contains(&window_bits));
    let cinfo = window_bits - 8;
    let cmf = (cinfo << 4) | 0x08;
    let flevel: u8 = match level {
        0 => 0,
        1..=5 => 1,
        6 => 2,
        _ => 3,
    };
    let fdict_bit = fdict as u8;
    let base = (cmf as u16) << 8 | ((flevel << 6) | (fdict_bit << 5)) as u16;
    let remainder = base % 31;
    let fcheck = if remainder == 0 { 0 } else { 31 - remainder as u8 };
    let flg = (flevel << 6) | (fdict_bit << 5) | fcheck;
    [cmf, flg]
}

/// Outcome of parsing a ZLIB header.
#[derive(Debug, Clone, Copy)]
pub struct ZlibHeaderInfo {
    /// `1 << window_bits` is the dictionary window size the stream declares.
    pub window_bits: u8,
    /// Whether the FDICT bit requests a preset-dictionary Adler-32 next.
    pub fdict: bool,
}

/// Parse a 2-byte ZLIB header, validating CM/CINFO/FCHECK.
pub fn parse_zlib_header(bytes: [u8; 2]) -> Result<ZlibHeaderInfo, String> {
    let cmf = bytes[0];
    let flg = bytes[1];
    let cm = cmf & 0x0F;
    if cm != 8 {
        return Err(format!("unsupported ZLIB compression method {cm}"));
    }
    let cinfo = cmf >> 4;
    if cinfo > 7 {
        return Err(format!("ZLIB window size too large: CINFO={cinfo}"));
    }
    let check = (cmf as u16) << 8 | flg as u16;
    if check % 31 != 0 {
        return Err("ZLIB header check bits (FCHECK) failed".to_string());
    }
    let fdict = (flg >> 5) & 1 != 0;
    Ok(ZlibHeaderInfo { window_bits: cinfo + 8, fdict })
}

/// Build a 4-byte big-endian ZLIB trailer (Adler-32 of the uncompressed data).
pub fn zlib_trailer(adler: u32) -> [u8; 4] {
    adler.to_be_bytes()
}

const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];
const GZIP_CM_DEFLATE: u8 = 0x08;

const FLG_FTEXT: u8 = 0x01;
const FLG_FHCRC: u8 = 0x02;
const FLG_FEXTRA: u8 = 0x04;
const FLG_FNAME: u8 = 0x08;
const FLG_FCOMMENT: u8 = 0x10;

/// Build a complete GZIP header (fixed 10 bytes plus any optional fields).
pub fn gzip_header(metadata: &GzipMetadata, level: u8) -> Vec<u8> {
    let mut flg = 0u8;
    if metadata.file_name.is_some() {
        flg |= FLG_FNAME;
    }
    if metadata.comment.is_some() {
        flg |= FLG_FCOMMENT;
    }

    let xfl: u8 = match level {
        0..=1 => 4,
        9 => 2,
        _ => 0,
    };

    let mut out = Vec::with_capacity(10);
    out.extend_from_slice(&GZIP_MAGIC);
    out.push(GZIP_CM_DEFLATE);
    out.push(flg);
    out.extend_from_slice(&metadata.mtime.to_le_bytes());
    out.push(xfl);
    out.push(0xFF); // OS: unknown, matching zlib's default when not told otherwise.

    if let Some(name) = &metadata.file_name {
        out.extend_from_slice(name);
        out.push(0);
    }
    if let Some(comment) = &metadata.comment {
        out.extend_from_slice(comment);
        out.push(0);
    }
    out
}

/// Build the 8-byte GZIP trailer: CRC-32 then ISIZE, both little-endian.
pub fn gzip_trailer(crc: u32, uncompressed_len: u64) -> [u8; 8] {
    let mut out = [0u8; 8];
    out[..4].copy_from_slice(&crc.to_le_bytes());
    out[4..].copy_from_slice(&((uncompressed_len as u32).to_le_bytes()));
    out
}

/// Result of successfully parsing a complete GZIP header out of a byte buffer.
#[derive(Debug, Clone)]
pub struct GzipHeaderParse {
    /// Bytes consumed from the start of the buffer to parse the header.
    pub consumed: usize,
    /// Metadata recovered from the header (file name/comment/mtime).
    pub metadata: GzipMetadata,
}

/// Attempt to parse a complete GZIP header from the start of `buf`.
///
/// Returns `Ok(None)` if `buf` does not yet contain a complete header (the
/// caller should accumulate more bytes and retry), `Ok(Some(..))` once a
/// full header has been parsed, or `Err` on a malformed header.
pub fn parse_gzip_header(buf: &[u8]) -> Result<Option<GzipHeaderParse>, String> {
    if buf.len() < 10 {
        return Ok(None);
    }
    if buf[0] != GZIP_MAGIC[0] || buf[1] != GZIP_MAGIC[1] {
        return Err("not a GZIP stream (bad magic bytes)".to_string());
    }
    if buf[2] != GZIP_CM_DEFLATE {
        return Err(format!("unsupported GZIP compression method {}", buf[2]));
    }
    let flg = buf[3];
    let mtime = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
    let mut pos = 10usize;

    if flg & FLG_FEXTRA != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        let xlen = u16::from_le_bytes([buf[pos], buf[pos + 1]]) as usize;
        pos += 2;
        if buf.len() < pos + xlen {
            return Ok(None);
        }
        pos += xlen;
    }

    let mut file_name = None;
    if flg & FLG_FNAME != 0 {
        let Some(rel_end) = buf[pos..].iter().position(|&b| b == 0) else {
            return Ok(None);
        };
        file_name = Some(buf[pos..pos + rel_end].to_vec());
        pos += rel_end + 1;
    }

    let mut comment = None;
    if flg & FLG_FCOMMENT != 0 {
        let Some(rel_end) = buf[pos..].iter().position(|&b| b == 0) else {
            return Ok(None);
        };
        comment = Some(buf[pos..pos + rel_end].to_vec());
        pos += rel_end + 1;
    }

    if flg & FLG_FHCRC != 0 {
        if buf.len() < pos + 2 {
            return Ok(None);
        }
        pos += 2;
    }

    Ok(Some(GzipHeaderParse {
        consumed: pos,
        metadata: GzipMetadata { file_name, comment, mtime },
    }))
}

/// Parse an 8-byte GZIP trailer (CRC-32 then ISIZE, little-endian).
pub fn parse_gzip_trailer(bytes: [u8; 8]) -> (u32, u32) {
    let crc = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let isize = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
    (crc, isize)
}

/// Running checksum for whichever framing is in use (no-op for `Raw`).
#[derive(Debug, Clone)]
pub enum FrameChecksum {
    /// Raw framing carries no checksum.
    None,
    /// ZLIB's Adler-32.
    Adler(Adler32),
    /// GZIP's CRC-32.
    Crc(Crc32),
}

impl FrameChecksum {
    /// A fresh checksum accumulator appropriate for `kind`.
    pub fn for_kind(kind: FrameKind) -> Self {
        match kind {
            FrameKind::Raw => FrameChecksum::None,
            FrameKind::Zlib => FrameChecksum::Adler(Adler32::new()),
            FrameKind::Gzip => FrameChecksum::Crc(Crc32::new()),
        }
    }

    /// Fold more (un)compressed bytes into the running checksum.
    pub fn update(&mut self, data: &[u8]) {
        match self {
            FrameChecksum::None => {}
            FrameChecksum::Adler(a) => a.update(data),
            FrameChecksum::Crc(c) => c.update(data),
        }
    }

    /// Current checksum value (0 for `Raw`, which has none).
    pub fn value(&self) -> u32 {
        match self {
            FrameChecksum::None => 0,
            FrameChecksum::Adler(a) => a.value(),
            FrameChecksum::Crc(c) => c.value(),
        }
    }
}
