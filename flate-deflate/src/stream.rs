//! The single byte-level `process()` surface (spec §4.9, §6): compressor and
//! decompressor facades that sit on top of [`crate::deflate::Deflater`] /
//! [`crate::inflate::Inflater`], adding whichever container framing
//! ([`FrameKind`]) and checksum the caller asked for.
//!
//! Headers and trailers are small and (per [`crate::framing`]'s own doc
//! comment) accumulated a byte at a time into a small buffer rather than
//! parsed with a resumable bit-level state machine — simpler than the block
//! engine's FSM and still fully correct under arbitrarily small input/output
//! slices, since the caller-visible contract only promises forward progress,
//! not any particular chunking of it.

use flate_core::checksum::Adler32;
use flate_core::error::{FlateError, Result as CoreResult, Status};
use flate_core::traits::{Compressor, Decompressor, FlushMode};

use crate::deflate::Deflater;
use crate::framing::{
    FrameChecksum, FrameKind, GzipMetadata, gzip_header, gzip_trailer, parse_gzip_header,
    parse_gzip_trailer, parse_zlib_header, zlib_header, zlib_trailer,
};
use crate::inflate::Inflater;
use crate::lz77::{DEFAULT_MEMORY_LEVEL, DEFAULT_WINDOW_BITS, Strategy};

/// Construction parameters shared by [`DeflateStream`] and [`InflateStream`]
/// (spec §6's `new(mode, level, framing, window_bits, memory_level,
/// strategy)`). `level` and `strategy` are ignored by the decompressor,
/// which adapts to whatever the stream's own header or block contents
/// declare.
#[derive(Debug, Clone, Copy)]
pub struct StreamConfig {
    /// Which container wraps the DEFLATE data.
    pub framing: FrameKind,
    /// Compression effort, 0 (store) to 9 (best). Compressor only.
    pub level: u8,
    /// `log2` of the back-reference window, 9..=15.
    pub window_bits: u8,
    /// Hash-table width knob, 1..=9 (`hash_bits = memory_level + 7`).
    pub memory_level: u8,
    /// Match-finding bias. Compressor only.
    pub strategy: Strategy,
}

impl StreamConfig {
    fn validate(&self) -> CoreResult<()> {
        if !(9..=15).contains(&self.window_bits) {
            return Err(FlateError::InvalidWindowBits { bits: self.window_bits });
        }
        if !(1..=9).contains(&self.memory_level) {
            return Err(FlateError::InvalidMemoryLevel { level: self.memory_level });
        }
        if self.level > 9 {
            return Err(FlateError::InvalidLevel { level: self.level });
        }
        Ok(())
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            framing: FrameKind::Zlib,
            level: 6,
            window_bits: DEFAULT_WINDOW_BITS,
            memory_level: DEFAULT_MEMORY_LEVEL,
            strategy: Strategy::Default,
        }
    }
}

fn drain_buf(buf: &[u8], pos: &mut usize, output: &mut [u8]) -> usize {
    let available = &buf[*pos..];
    let n = available.len().min(output.len());
    output[..n].copy_from_slice(&available[..n]);
    *pos += n;
    n
}

/// A resumable compressor producing a fully-framed stream (raw DEFLATE,
/// ZLIB, or GZIP) from caller-supplied input.
#[derive(Debug)]
pub struct DeflateStream {
    config: StreamConfig,
    deflater: Deflater,
    checksum: FrameChecksum,
    metadata: GzipMetadata,
    dict_adler: Option<u32>,
    header_built: bool,
    header_bytes: Vec<u8>,
    header_pos: usize,
    trailer_bytes: Vec<u8>,
    trailer_pos: usize,
    wrote_trailer: bool,
    total_in: u64,
    finished: bool,
}

impl DeflateStream {
    /// Create a compressor from validated construction parameters.
    pub fn new(config: StreamConfig) -> CoreResult<Self> {
        config.validate()?;
        let deflater = Deflater::with_config(
            config.level,
            config.strategy,
            config.window_bits,
            config.memory_level,
        );
        Ok(Self {
            config,
            deflater,
            checksum: FrameChecksum::for_kind(config.framing),
            metadata: GzipMetadata::default(),
            dict_adler: None,
            header_built: false,
            header_bytes: Vec::new(),
            header_pos: 0,
            trailer_bytes: Vec::new(),
            trailer_pos: 0,
            wrote_trailer: false,
            total_in: 0,
            finished: false,
        })
    }

    /// Set the GZIP file name, normalizing and validating it per spec §6.
    /// Must be called before the first byte of output has been produced.
    pub fn set_gzip_file_name(&mut self, name: &[u8]) -> CoreResult<()> {
        self.reject_if_started()?;
        let sanitized = crate::framing::sanitize_gzip_text(name)
            .map_err(|message| FlateError::DictionaryTooLate { message })?;
        self.metadata.file_name = Some(sanitized);
        Ok(())
    }

    /// Set the GZIP comment, normalizing and validating it per spec §6.
    /// Must be called before the first byte of output has been produced.
    pub fn set_gzip_comment(&mut self, comment: &[u8]) -> CoreResult<()> {
        self.reject_if_started()?;
        let sanitized = crate::framing::sanitize_gzip_text(comment)
            .map_err(|message| FlateError::DictionaryTooLate { message })?;
        self.metadata.comment = Some(sanitized);
        Ok(())
    }

    /// Set the GZIP modification time (Unix timestamp; 0 = unknown).
    /// Must be called before the first byte of output has been produced.
    pub fn set_gzip_mtime(&mut self, mtime: u32) -> CoreResult<()> {
        self.reject_if_started()?;
        self.metadata.mtime = mtime;
        Ok(())
    }

    /// Preload a preset dictionary (RFC 1950 FDICT mechanism for ZLIB
    /// framing; seeds match-finder history for any framing). Must be called
    /// before the first byte of input has been processed.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> CoreResult<()> {
        self.reject_if_started()?;
        self.deflater.set_dictionary(dictionary);
        self.dict_adler = Some(Adler32::checksum(dictionary));
        Ok(())
    }

    fn reject_if_started(&self) -> CoreResult<()> {
        if self.header_built {
            return Err(FlateError::DictionaryTooLate {
                message: "stream has already produced output".to_string(),
            });
        }
        Ok(())
    }

    fn ensure_header(&mut self) {
        if self.header_built {
            return;
        }
        self.header_built = true;
        self.header_bytes = match self.config.framing {
            FrameKind::Raw => Vec::new(),
            FrameKind::Zlib => {
                let fdict = self.dict_adler.is_some();
                let mut bytes = zlib_header(self.config.window_bits, self.config.level, fdict).to_vec();
                if let Some(adler) = self.dict_adler {
                    bytes.extend_from_slice(&adler.to_be_bytes());
                }
                bytes
            }
            FrameKind::Gzip => gzip_header(&self.metadata, self.config.level),
        };
    }

    fn build_trailer(&self) -> Vec<u8> {
        match self.config.framing {
            FrameKind::Raw => Vec::new(),
            FrameKind::Zlib => zlib_trailer(self.checksum.value()).to_vec(),
            FrameKind::Gzip => gzip_trailer(self.checksum.value(), self.total_in).to_vec(),
        }
    }

    /// Compress from `input` into `output` under the given flush mode.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`. Re-entrant: the
    /// caller may supply arbitrarily small input or output slices and
    /// resume with the same instance.
    pub fn process(&mut self, input: &[u8], output: &mut [u8], flush: FlushMode) -> (usize, usize, Status) {
        if self.finished {
            return (0, 0, Status::StreamEnd);
        }

        self.ensure_header();
        let mut out_pos = 0usize;

        if self.header_pos < self.header_bytes.len() {
            out_pos += drain_buf(&self.header_bytes, &mut self.header_pos, output);
            if self.header_pos < self.header_bytes.len() {
                return (0, out_pos, Status::Ok);
            }
        }

        let (consumed, produced, status) =
            self.deflater.process(input, &mut output[out_pos..], flush);
        self.checksum.update(&input[..consumed]);
        self.total_in += consumed as u64;
        out_pos += produced;

        match status {
            Status::StreamEnd => {
                if !self.wrote_trailer {
                    self.trailer_bytes = self.build_trailer();
                    self.trailer_pos = 0;
                    self.wrote_trailer = true;
                }
                out_pos += drain_buf(&self.trailer_bytes, &mut self.trailer_pos, &mut output[out_pos..]);
                if self.trailer_pos >= self.trailer_bytes.len() {
                    self.finished = true;
                    (consumed, out_pos, Status::StreamEnd)
                } else {
                    (consumed, out_pos, Status::Ok)
                }
            }
            other => (consumed, out_pos, other),
        }
    }

    /// Convenience wrapper: `process` with `FlushMode::Finish` and no
    /// further input, draining until `Status::StreamEnd`.
    pub fn finish(&mut self, output: &mut [u8]) -> (usize, Status) {
        let (_, produced, status) = self.process(&[], output, FlushMode::Finish);
        (produced, status)
    }

    /// True once `process` has returned `Status::StreamEnd`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reset to the initial state, discarding buffered input, output, and
    /// framing progress (but not the configured parameters).
    pub fn reset(&mut self) {
        self.deflater.reset();
        self.checksum = FrameChecksum::for_kind(self.config.framing);
        self.dict_adler = None;
        self.header_built = false;
        self.header_bytes.clear();
        self.header_pos = 0;
        self.trailer_bytes.clear();
        self.trailer_pos = 0;
        self.wrote_trailer = false;
        self.total_in = 0;
        self.finished = false;
    }
}

#[derive(Debug, Clone)]
enum Mode {
    Header,
    NeedDict(u32),
    Body,
    Trailer,
    Done,
    Bad(String),
}

/// A resumable decompressor accepting a fully-framed stream (raw DEFLATE,
/// ZLIB, or GZIP).
#[derive(Debug)]
pub struct InflateStream {
    framing: FrameKind,
    inflater: Inflater,
    checksum: FrameChecksum,
    metadata: GzipMetadata,
    mode: Mode,
    header_buf: Vec<u8>,
    zlib_window_bits: Option<u8>,
    trailer_buf: Vec<u8>,
    total_out: u64,
    finished: bool,
}

impl InflateStream {
    /// Create a decompressor for the given framing. `window_bits` bounds the
    /// window when framing is `Raw` (which has no header to declare it);
    /// ZLIB overrides it from its own header, GZIP always uses the maximum.
    pub fn new(framing: FrameKind, window_bits: u8) -> CoreResult<Self> {
        if !(9..=15).contains(&window_bits) {
            return Err(FlateError::InvalidWindowBits { bits: window_bits });
        }
        let inflater = match framing {
            FrameKind::Raw => Inflater::with_window_bits(window_bits),
            FrameKind::Gzip => Inflater::with_window_bits(15),
            FrameKind::Zlib => Inflater::with_window_bits(15), // replaced once the header is parsed
        };
        Ok(Self {
            framing,
            inflater,
            checksum: FrameChecksum::for_kind(framing),
            metadata: GzipMetadata::default(),
            mode: Mode::Header,
            header_buf: Vec::new(),
            zlib_window_bits: None,
            trailer_buf: Vec::new(),
            total_out: 0,
            finished: false,
        })
    }

    /// GZIP metadata recovered from the header, readable once parsing has
    /// advanced past it (empty/default before then, and always for other
    /// framings).
    pub fn gzip_metadata(&self) -> &GzipMetadata {
        &self.metadata
    }

    /// Supply the preset dictionary requested by a `Status::NeedDict`
    /// result, verifying it against the stream's recorded Adler-32.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) -> CoreResult<()> {
        match self.mode {
            Mode::NeedDict(expected) => {
                let actual = Adler32::checksum(dictionary);
                if actual != expected {
                    return Err(FlateError::DictionaryTooLate {
                        message: format!(
                            "preset dictionary Adler-32 {actual:#010x} does not match stream's {expected:#010x}"
                        ),
                    });
                }
                self.inflater.set_dictionary(dictionary);
                self.mode = Mode::Body;
                Ok(())
            }
            _ => Err(FlateError::DictionaryTooLate {
                message: "set_dictionary called outside a NeedDict pause".to_string(),
            }),
        }
    }

    /// Like [`Self::set_dictionary`], but skips the Adler-32 match check —
    /// the "unconditional" override spec §4.9 allows for callers that
    /// already know the dictionary is right (or don't care).
    pub fn set_dictionary_unconditional(&mut self, dictionary: &[u8]) -> CoreResult<()> {
        match self.mode {
            Mode::NeedDict(_) => {
                self.inflater.set_dictionary(dictionary);
                self.mode = Mode::Body;
                Ok(())
            }
            _ => Err(FlateError::DictionaryTooLate {
                message: "set_dictionary called outside a NeedDict pause".to_string(),
            }),
        }
    }

    fn step_header(&mut self, cursor: &mut &[u8]) -> Option<Status> {
        match self.framing {
            FrameKind::Raw => {
                self.mode = Mode::Body;
                None
            }
            FrameKind::Zlib => {
                while self.header_buf.len() < 2 {
                    match cursor.split_first() {
                        Some((&b, rest)) => {
                            self.header_buf.push(b);
                            *cursor = rest;
                        }
                        None => return Some(Status::Ok),
                    }
                }
                let info = match parse_zlib_header([self.header_buf[0], self.header_buf[1]]) {
                    Ok(info) => info,
                    Err(message) => {
                        self.mode = Mode::Bad(message.clone());
                        return Some(Status::DataError(message));
                    }
                };
                if self.zlib_window_bits.is_none() {
                    self.zlib_window_bits = Some(info.window_bits);
                    self.inflater = Inflater::with_window_bits(info.window_bits);
                }
                if info.fdict {
                    while self.header_buf.len() < 6 {
                        match cursor.split_first() {
                            Some((&b, rest)) => {
                                self.header_buf.push(b);
                                *cursor = rest;
                            }
                            None => return Some(Status::Ok),
                        }
                    }
                    let adler = u32::from_be_bytes([
                        self.header_buf[2],
                        self.header_buf[3],
                        self.header_buf[4],
                        self.header_buf[5],
                    ]);
                    self.mode = Mode::NeedDict(adler);
                } else {
                    self.mode = Mode::Body;
                }
                None
            }
            FrameKind::Gzip => loop {
                match parse_gzip_header(&self.header_buf) {
                    Ok(Some(parsed)) => {
                        self.metadata = parsed.metadata;
                        self.mode = Mode::Body;
                        return None;
                    }
                    Ok(None) => match cursor.split_first() {
                        Some((&b, rest)) => {
                            self.header_buf.push(b);
                            *cursor = rest;
                        }
                        None => return Some(Status::Ok),
                    },
                    Err(message) => {
                        self.mode = Mode::Bad(message.clone());
                        return Some(Status::DataError(message));
                    }
                }
            },
        }
    }

    fn step_trailer(&mut self, cursor: &mut &[u8]) -> Option<Status> {
        let want = match self.framing {
            FrameKind::Raw => 0,
            FrameKind::Zlib => 4,
            FrameKind::Gzip => 8,
        };
        while self.trailer_buf.len() < want {
            match cursor.split_first() {
                Some((&b, rest)) => {
                    self.trailer_buf.push(b);
                    *cursor = rest;
                }
                None => return Some(Status::Ok),
            }
        }
        match self.framing {
            FrameKind::Raw => {}
            FrameKind::Zlib => {
                let expected =
                    u32::from_be_bytes(self.trailer_buf[..4].try_into().expect("exactly 4 bytes"));
                let actual = self.checksum.value();
                if expected != actual {
                    let message = format!(
                        "ZLIB trailer Adler-32 mismatch: stream says {expected:#010x}, computed {actual:#010x}"
                    );
                    self.mode = Mode::Bad(message.clone());
                    return Some(Status::DataError(message));
                }
            }
            FrameKind::Gzip => {
                let bytes: [u8; 8] = self.trailer_buf[..8].try_into().expect("exactly 8 bytes");
                let (expected_crc, expected_isize) = parse_gzip_trailer(bytes);
                let actual_crc = self.checksum.value();
                if expected_crc != actual_crc {
                    let message = format!(
                        "GZIP trailer CRC-32 mismatch: stream says {expected_crc:#010x}, computed {actual_crc:#010x}"
                    );
                    self.mode = Mode::Bad(message.clone());
                    return Some(Status::DataError(message));
                }
                let actual_isize = (self.total_out & 0xFFFF_FFFF) as u32;
                if expected_isize != actual_isize {
                    let message = format!(
                        "GZIP ISIZE mismatch: stream says {expected_isize}, produced {actual_isize}"
                    );
                    self.mode = Mode::Bad(message.clone());
                    return Some(Status::DataError(message));
                }
            }
        }
        self.mode = Mode::Done;
        None
    }

    /// Decompress from `input` into `output`, validating whatever container
    /// framing was configured at construction.
    ///
    /// Returns `(bytes_consumed, bytes_produced, status)`. Re-entrant: the
    /// caller may supply arbitrarily small input or output slices and
    /// resume with the same instance.
    pub fn process(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize, Status) {
        if self.finished {
            return (0, 0, Status::StreamEnd);
        }
        if let Mode::Bad(message) = &self.mode {
            return (0, 0, Status::DataError(message.clone()));
        }

        let mut cursor: &[u8] = input;
        let mut out_pos = 0usize;

        loop {
            match self.mode.clone() {
                Mode::Header => {
                    if let Some(status) = self.step_header(&mut cursor) {
                        if status.is_error() {
                            let consumed = input.len() - cursor.len();
                            return (consumed, out_pos, status);
                        }
                        break;
                    }
                }
                Mode::NeedDict(_) => {
                    let consumed = input.len() - cursor.len();
                    return (consumed, out_pos, Status::NeedDict);
                }
                Mode::Body => {
                    if out_pos >= output.len() {
                        break;
                    }
                    let (consumed, produced, status) =
                        self.inflater.process(cursor, &mut output[out_pos..]);
                    self.checksum.update(&output[out_pos..out_pos + produced]);
                    self.total_out += produced as u64;
                    cursor = &cursor[consumed..];
                    out_pos += produced;

                    match status {
                        Status::StreamEnd => self.mode = Mode::Trailer,
                        Status::Ok if consumed == 0 && produced == 0 => break,
                        Status::Ok => {}
                        Status::DataError(message) => {
                            self.mode = Mode::Bad(message.clone());
                            let consumed_total = input.len() - cursor.len();
                            return (consumed_total, out_pos, Status::DataError(message));
                        }
                        Status::BufError => break,
                        other => {
                            let consumed_total = input.len() - cursor.len();
                            return (consumed_total, out_pos, other);
                        }
                    }
                }
                Mode::Trailer => {
                    if let Some(status) = self.step_trailer(&mut cursor) {
                        if status.is_error() {
                            let consumed = input.len() - cursor.len();
                            return (consumed, out_pos, status);
                        }
                        break;
                    }
                }
                Mode::Done => {
                    self.finished = true;
                    break;
                }
                Mode::Bad(message) => {
                    let consumed = input.len() - cursor.len();
                    return (consumed, out_pos, Status::DataError(message));
                }
            }
        }

        let consumed = input.len() - cursor.len();
        if self.finished {
            return (consumed, out_pos, Status::StreamEnd);
        }
        if consumed == 0 && out_pos == 0 {
            return (consumed, out_pos, Status::BufError);
        }
        (consumed, out_pos, Status::Ok)
    }

    /// True once `process` has returned `Status::StreamEnd`.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Reset to the initial state, discarding buffered history and framing
    /// progress (but not the configured framing/window parameters).
    pub fn reset(&mut self) {
        let window_bits = self.zlib_window_bits.unwrap_or(15);
        self.inflater = match self.framing {
            FrameKind::Zlib => Inflater::with_window_bits(window_bits),
            _ => Inflater::with_window_bits(15),
        };
        self.checksum = FrameChecksum::for_kind(self.framing);
        self.metadata = GzipMetadata::default();
        self.mode = Mode::Header;
        self.header_buf.clear();
        self.zlib_window_bits = None;
        self.trailer_buf.clear();
        self.total_out = 0;
        self.finished = false;
    }
}
