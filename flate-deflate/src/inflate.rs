//! DEFLATE decompression (RFC 1951), as a resumable `process()` facade.
//!
//! `Inflater` is a coroutine-shaped state machine rather than a recursive
//! descent over a whole buffer: each `process()` call advances through a
//! sequence of small, independently resumable steps (block header, stored
//! block, dynamic-header tables, literal/length/distance decode, match
//! copy), stopping cleanly whenever the caller's input or output runs out
//! and picking back up from the same point on the next call. Bit-level
//! position is carried for free by [`flate_core::bitstream::BitReader`]; the
//! one place decoding needs explicit rewind is a multi-field symbol (a
//! length code plus its extra bits plus a distance code plus its extra
//! bits) that must be read as a unit — [`Inflater::try_decode_token`]
//! snapshots the reader and input cursor before the first field and
//! restores them if a later field runs out of bits, so a partial group
//! never leaks into the next `process()` call.
//!
//! Preset-dictionary handling (`NeedDict`, Adler-32 verification against an
//! expected value) belongs to the ZLIB container, not raw DEFLATE — this
//! module only exposes [`Inflater::set_dictionary`] to preload window
//! history, and the framing layer decides when that is required.

use std::rc::Rc;

use flate_core::bitstream::BitReader;
use flate_core::error::Status;
use flate_core::traits::Decompressor;
use flate_core::window::Window;

use crate::huffman::{Alphabet, HuffmanTable};
use crate::lz77::{DEFAULT_WINDOW_BITS, window_size_for_bits};
use crate::tables::{
    CODE_LENGTH_ORDER, DISTANCE_BASE, DISTANCE_EXTRA_BITS, LENGTH_EXTRA_BITS, decode_distance,
    decode_length, fixed_distance_table, fixed_litlen_table,
};

#[derive(Debug, Clone)]
enum State {
    BlockHeader,
    StoredAlign,
    StoredLen,
    StoredCopy { remaining: u16 },
    DynCounts,
    DynCodeLenLengths,
    DynLengths,
    Decode { litlen: Rc<HuffmanTable>, dist: Rc<HuffmanTable> },
    Copying { litlen: Rc<HuffmanTable>, dist: Rc<HuffmanTable>, remaining: u16, distance: u16 },
    Done,
}

enum StepResult {
    Continue,
    NeedInput,
    NeedOutput,
    Finished,
    Error(String),
}

enum SymbolPeek {
    Ready(u16, u8),
    NeedMore,
    Invalid,
}

enum TokenResult {
    NeedMore,
    Invalid,
    EndOfBlock,
    Literal(u8),
    Match { length: u16, distance: u16 },
}

/// A resumable DEFLATE decompressor.
#[derive(Debug, Clone)]
pub struct Inflater {
    reader: BitReader,
    window: Window,
    state: State,
    final_block: bool,
    finished: bool,
    hlit: usize,
    hdist: usize,
    hclen: usize,
    codelen_raw: [u8; 19],
    codelen_idx: usize,
    codelen_table: Option<Rc<HuffmanTable>>,
    lens: Vec<u8>,
}

impl Inflater {
    /// Create a decompressor with no preset dictionary and the default
    /// 32 KiB window (`window_bits = 15`).
    pub fn new() -> Self {
        Self::with_window_bits(DEFAULT_WINDOW_BITS)
    }

    /// Create a decompressor whose window matches a non-default
    /// `window_bits` (9..=15) advertised by the container header.
    pub fn with_window_bits(window_bits: u8) -> Self {
        Self {
            reader: BitReader::new(),
            window: Window::new(window_size_for_bits(window_bits)),
            state: State::BlockHeader,
            final_block: false,
            finished: false,
            hlit: 0,
            hdist: 0,
            hclen: 0,
            codelen_raw: [0u8; 19],
            codelen_idx: 0,
            codelen_table: None,
            lens: Vec::new(),
        }
    }

    /// Create a decompressor with window history preloaded from `dictionary`.
    pub fn with_dictionary(dictionary: &[u8]) -> Self {
        let mut inflater = Self::new();
        inflater.set_dictionary(dictionary);
        inflater
    }

    /// Preload window history so early back-references can resolve against it.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.window.preload_dictionary(dictionary);
    }

    /// Reset to the initial state, discarding buffered history.
    pub fn reset(&mut self) {
        self.reader = BitReader::new();
        self.window.clear();
        self.state = State::BlockHeader;
        self.final_block = false;
        self.finished = false;
        self.hlit = 0;
        self.hdist = 0;
        self.hclen = 0;
        self.codelen_raw = [0u8; 19];
        self.codelen_idx = 0;
        self.codelen_table = None;
        self.lens = Vec::new();
    }

    fn take_bits(&mut self, cursor: &mut &[u8], n: u32) -> Option<u32> {
        if n == 0 {
            return Some(0);
        }
        self.reader.refill(cursor, n);
        if self.reader.bits_available() < n {
            None
        } else {
            Some(self.reader.take(n))
        }
    }

    /// Peek the next Huffman symbol from `table` without consuming it,
    /// distinguishing "not enough bits buffered yet" from "no code in this
    /// (valid) table matches" — the latter only occurs with corrupt input.
    fn peek_symbol(&mut self, cursor: &mut &[u8], table: &HuffmanTable) -> SymbolPeek {
        self.reader.refill(cursor, 15);
        let peeked = self.reader.peek(15);
        match table.decode(peeked) {
            Some((sym, len)) => {
                if self.reader.bits_available() >= len as u32 {
                    SymbolPeek::Ready(sym, len)
                } else {
                    SymbolPeek::NeedMore
                }
            }
            None => {
                if self.reader.bits_available() >= table.max_code_len() as u32 {
                    SymbolPeek::Invalid
                } else {
                    SymbolPeek::NeedMore
                }
            }
        }
    }

    /// Decode one literal/length/distance token as an atomic unit: if any
    /// field beyond the first needs more bits than are currently available,
    /// the reader and input cursor are rewound to their state before this
    /// call so nothing is lost.
    fn try_decode_token(
        &mut self,
        cursor: &mut &[u8],
        litlen: &HuffmanTable,
        dist: &HuffmanTable,
    ) -> TokenResult {
        let snap_reader = self.reader.clone();
        let snap_cursor = *cursor;

        let (sym, len) = match self.peek_symbol(cursor, litlen) {
            SymbolPeek::NeedMore => return TokenResult::NeedMore,
            SymbolPeek::Invalid => return TokenResult::Invalid,
            SymbolPeek::Ready(sym, len) => (sym, len),
        };
        self.reader.drop_bits(len as u32);

        if sym < 256 {
            return TokenResult::Literal(sym as u8);
        }
        if sym == 256 {
            return TokenResult::EndOfBlock;
        }
        let code = sym;
        if !(257..=285).contains(&code) {
            return TokenResult::Invalid;
        }
        let extra_bits = LENGTH_EXTRA_BITS[(code - 257) as usize] as u32;
        let extra = match self.take_bits(cursor, extra_bits) {
            Some(v) => v as u16,
            None => {
                self.reader = snap_reader;
                *cursor = snap_cursor;
                return TokenResult::NeedMore;
            }
        };
        let length = decode_length(code, extra);

        let (dcode, dlen) = match self.peek_symbol(cursor, dist) {
            SymbolPeek::NeedMore => {
                self.reader = snap_reader;
                *cursor = snap_cursor;
                return TokenResult::NeedMore;
            }
            SymbolPeek::Invalid => return TokenResult::Invalid,
            SymbolPeek::Ready(sym, len) => (sym, len),
        };
        self.reader.drop_bits(dlen as u32);
        if dcode as usize >= DISTANCE_BASE.len() {
            return TokenResult::Invalid;
        }
        let dextra_bits = DISTANCE_EXTRA_BITS[dcode as usize] as u32;
        let dextra = match self.take_bits(cursor, dextra_bits) {
            Some(v) => v as u16,
            None => {
                self.reader = snap_reader;
                *cursor = snap_cursor;
                return TokenResult::NeedMore;
            }
        };
        let distance = decode_distance(dcode, dextra);
        TokenResult::Match { length, distance }
    }

    fn step(&mut self, cursor: &mut &[u8], output: &mut [u8], out_pos: &mut usize) -> StepResult {
        match self.state {
            State::BlockHeader => match self.take_bits(cursor, 3) {
                None => StepResult::NeedInput,
                Some(bits) => {
                    self.final_block = bits & 1 != 0;
                    let btype = (bits >> 1) & 0b11;
                    match btype {
                        0 => {
                            self.state = State::StoredAlign;
                            StepResult::Continue
                        }
                        1 => {
                            self.state = State::Decode {
                                litlen: Rc::new(fixed_litlen_table().clone()),
                                dist: Rc::new(fixed_distance_table().clone()),
                            };
                            StepResult::Continue
                        }
                        2 => {
                            self.state = State::DynCounts;
                            StepResult::Continue
                        }
                        _ => StepResult::Error("reserved block type 3".to_string()),
                    }
                }
            },

            State::StoredAlign => {
                self.reader.align_to_byte();
                self.state = State::StoredLen;
                StepResult::Continue
            }

            State::StoredLen => {
                let snap_reader = self.reader.clone();
                let snap_cursor = *cursor;
                let len = match self.take_bits(cursor, 16) {
                    Some(v) => v as u16,
                    None => return StepResult::NeedInput,
                };
                let nlen = match self.take_bits(cursor, 16) {
                    Some(v) => v as u16,
                    None => {
                        self.reader = snap_reader;
                        *cursor = snap_cursor;
                        return StepResult::NeedInput;
                    }
                };
                if nlen != !len {
                    return StepResult::Error(format!(
                        "stored block NLEN {nlen:#06x} is not the one's complement of LEN {len:#06x}"
                    ));
                }
                self.state = State::StoredCopy { remaining: len };
                StepResult::Continue
            }

            State::StoredCopy { remaining } => {
                if remaining == 0 {
                    self.state = if self.final_block { State::Done } else { State::BlockHeader };
                    return StepResult::Continue;
                }
                if *out_pos >= output.len() {
                    return StepResult::NeedOutput;
                }
                let mut byte_buf = [0u8; 1];
                let byte = if self.reader.drain_bytes(&mut byte_buf) == 1 {
                    byte_buf[0]
                } else if let Some((&b, rest)) = cursor.split_first() {
                    *cursor = rest;
                    b
                } else {
                    return StepResult::NeedInput;
                };
                output[*out_pos] = byte;
                *out_pos += 1;
                self.window.push_byte(byte);
                if let State::StoredCopy { remaining } = &mut self.state {
                    *remaining -= 1;
                }
                StepResult::Continue
            }

            State::DynCounts => match self.take_bits(cursor, 14) {
                None => StepResult::NeedInput,
                Some(bits) => {
                    let hlit = (bits & 0x1f) as usize + 257;
                    let hdist = ((bits >> 5) & 0x1f) as usize + 1;
                    if hdist > 30 {
                        return StepResult::Error(format!(
                            "too many distance symbols: HDIST+1 = {hdist}"
                        ));
                    }
                    self.hlit = hlit;
                    self.hdist = hdist;
                    self.hclen = ((bits >> 10) & 0xf) as usize + 4;
                    self.codelen_idx = 0;
                    self.codelen_raw = [0u8; 19];
                    self.state = State::DynCodeLenLengths;
                    StepResult::Continue
                }
            },

            State::DynCodeLenLengths => {
                if self.codelen_idx >= self.hclen {
                    let table = match HuffmanTable::from_code_lengths_checked(
                        &self.codelen_raw,
                        Alphabet::CodeLength,
                    ) {
                        Ok(t) => t,
                        Err(e) => return StepResult::Error(e),
                    };
                    self.codelen_table = Some(Rc::new(table));
                    self.lens = Vec::with_capacity(self.hlit + self.hdist);
                    self.state = State::DynLengths;
                    return StepResult::Continue;
                }
                match self.take_bits(cursor, 3) {
                    None => StepResult::NeedInput,
                    Some(bits) => {
                        let order_idx = CODE_LENGTH_ORDER[self.codelen_idx];
                        self.codelen_raw[order_idx] = bits as u8;
                        self.codelen_idx += 1;
                        StepResult::Continue
                    }
                }
            }

            State::DynLengths => {
                let total = self.hlit + self.hdist;
                if self.lens.len() >= total {
                    let mut full_litlen = vec![0u8; 288];
                    full_litlen[..self.hlit].copy_from_slice(&self.lens[..self.hlit]);
                    let mut full_dist = vec![0u8; 30];
                    full_dist[..self.hdist].copy_from_slice(&self.lens[self.hlit..total]);

                    let litlen_table =
                        match HuffmanTable::from_code_lengths_checked(&full_litlen, Alphabet::LitLen)
                        {
                            Ok(t) => t,
                            Err(e) => return StepResult::Error(e),
                        };
                    let dist_table =
                        match HuffmanTable::from_code_lengths_checked(&full_dist, Alphabet::Distance)
                        {
                            Ok(t) => t,
                            Err(e) => return StepResult::Error(e),
                        };
                    self.state = State::Decode {
                        litlen: Rc::new(litlen_table),
                        dist: Rc::new(dist_table),
                    };
                    return StepResult::Continue;
                }

                let codelen_table = self
                    .codelen_table
                    .clone()
                    .expect("codelen_table is built before entering DynLengths");
                let snap_reader = self.reader.clone();
                let snap_cursor = *cursor;
                match self.peek_symbol(cursor, &codelen_table) {
                    SymbolPeek::NeedMore => {
                        self.reader = snap_reader;
                        *cursor = snap_cursor;
                        StepResult::NeedInput
                    }
                    SymbolPeek::Invalid => StepResult::Error("invalid code-length symbol".to_string()),
                    SymbolPeek::Ready(sym, len) => {
                        self.reader.drop_bits(len as u32);
                        match sym {
                            0..=15 => {
                                self.lens.push(sym as u8);
                                StepResult::Continue
                            }
                            16 => match self.take_bits(cursor, 2) {
                                None => {
                                    self.reader = snap_reader;
                                    *cursor = snap_cursor;
                                    StepResult::NeedInput
                                }
                                Some(extra) => {
                                    let Some(&prev) = self.lens.last() else {
                                        return StepResult::Error(
                                            "code-length repeat 16 with no previous length".to_string(),
                                        );
                                    };
                                    let count = 3 + extra as usize;
                                    if self.lens.len() + count > total {
                                        return StepResult::Error(
                                            "code-length repeat overruns table".to_string(),
                                        );
                                    }
                                    self.lens.extend(std::iter::repeat_n(prev, count));
                                    StepResult::Continue
                                }
                            },
                            17 => match self.take_bits(cursor, 3) {
                                None => {
                                    self.reader = snap_reader;
                                    *cursor = snap_cursor;
                                    StepResult::NeedInput
                                }
                                Some(extra) => {
                                    let count = 3 + extra as usize;
                                    if self.lens.len() + count > total {
                                        return StepResult::Error(
                                            "code-length repeat overruns table".to_string(),
                                        );
                                    }
                                    self.lens.extend(std::iter::repeat_n(0u8, count));
                                    StepResult::Continue
                                }
                            },
                            18 => match self.take_bits(cursor, 7) {
                                None => {
                                    self.reader = snap_reader;
                                    *cursor = snap_cursor;
                                    StepResult::NeedInput
                                }
                                Some(extra) => {
                                    let count = 11 + extra as usize;
                                    if self.lens.len() + count > total {
                                        return StepResult::Error(
                                            "code-length repeat overruns table".to_string(),
                                        );
                                    }
                                    self.lens.extend(std::iter::repeat_n(0u8, count));
                                    StepResult::Continue
                                }
                            },
                            _ => StepResult::Error("invalid code-length symbol".to_string()),
                        }
                    }
                }
            }

            State::Decode { .. } => {
                if *out_pos >= output.len() {
                    return StepResult::NeedOutput;
                }
                let (litlen, dist) = match &self.state {
                    State::Decode { litlen, dist } => (litlen.clone(), dist.clone()),
                    _ => unreachable!(),
                };
                match self.try_decode_token(cursor, &litlen, &dist) {
                    TokenResult::NeedMore => StepResult::NeedInput,
                    TokenResult::Invalid => {
                        StepResult::Error("invalid literal/length code".to_string())
                    }
                    TokenResult::EndOfBlock => {
                        self.state = if self.final_block { State::Done } else { State::BlockHeader };
                        StepResult::Continue
                    }
                    TokenResult::Literal(byte) => {
                        output[*out_pos] = byte;
                        *out_pos += 1;
                        self.window.push_byte(byte);
                        StepResult::Continue
                    }
                    TokenResult::Match { length, distance } => {
                        if !self.window.distance_valid(distance as usize) {
                            return StepResult::Error(format!(
                                "invalid back-reference distance {distance}"
                            ));
                        }
                        self.state = State::Copying { litlen, dist, remaining: length, distance };
                        StepResult::Continue
                    }
                }
            }

            State::Copying { remaining, distance, .. } => {
                if remaining == 0 {
                    let (litlen, dist) = match &self.state {
                        State::Copying { litlen, dist, .. } => (litlen.clone(), dist.clone()),
                        _ => unreachable!(),
                    };
                    self.state = State::Decode { litlen, dist };
                    return StepResult::Continue;
                }
                if *out_pos >= output.len() {
                    return StepResult::NeedOutput;
                }
                let byte = self
                    .window
                    .copy_one_from_distance(distance as usize)
                    .expect("distance was validated before entering Copying");
                output[*out_pos] = byte;
                *out_pos += 1;
                if let State::Copying { remaining, .. } = &mut self.state {
                    *remaining -= 1;
                }
                StepResult::Continue
            }

            State::Done => StepResult::Finished,
        }
    }
}

impl Default for Inflater {
    fn default() -> Self {
        Self::new()
    }
}

impl Decompressor for Inflater {
    fn process(&mut self, input: &[u8], output: &mut [u8]) -> (usize, usize, Status) {
        if self.finished {
            return (0, 0, Status::StreamEnd);
        }

        let mut cursor: &[u8] = input;
        let mut out_pos = 0usize;

        loop {
            match self.step(&mut cursor, output, &mut out_pos) {
                StepResult::Continue => continue,
                StepResult::NeedInput | StepResult::NeedOutput => break,
                StepResult::Finished => {
                    self.finished = true;
                    break;
                }
                StepResult::Error(msg) => {
                    let consumed = input.len() - cursor.len();
                    return (consumed, out_pos, Status::DataError(msg));
                }
            }
        }

        if self.finished {
            // Huffman symbol lookahead (`peek_symbol` wants 15 bits buffered)
            // routinely pulls a whole byte or two past the bits the final
            // block actually needed. Those bytes belong to whatever follows
            // the raw DEFLATE stream (a container trailer, most commonly) —
            // hand them back instead of reporting them as consumed.
            let refund = ((self.reader.bits_available() / 8) as usize)
                .min(input.len() - cursor.len());
            if refund > 0 {
                let consumed_so_far = input.len() - cursor.len();
                cursor = &input[consumed_so_far - refund..];
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

    fn reset(&mut self) {
        Inflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Decompress one complete DEFLATE stream to a `Vec<u8>` in one call.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, String> {
    let mut inflater = Inflater::new();
    let mut out = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut offset = 0;
    loop {
        let (consumed, produced, status) = inflater.process(&data[offset..], &mut scratch);
        offset += consumed;
        out.extend_from_slice(&scratch[..produced]);
        match status {
            Status::StreamEnd => break,
            Status::Ok => {}
            Status::BufError => {
                if consumed == 0 && produced == 0 {
                    return Err("truncated deflate stream".to_string());
                }
            }
            Status::DataError(msg) => return Err(msg),
            other => return Err(format!("unexpected inflate status: {other:?}")),
        }
    }
    Ok(out)
}
