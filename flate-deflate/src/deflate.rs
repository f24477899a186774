//! DEFLATE compression (RFC 1951), as a resumable `process()` facade.
//!
//! `Deflater` is a true streaming encoder, not a whole-buffer-at-once
//! `deflate()` call: input handed to [`Deflater::process`] across any number
//! of calls is appended to an internal staging buffer and compressed into
//! complete blocks once enough has accumulated or a flush is requested,
//! mirroring how zlib's own `deflate()` buffers into `s->pending` and drains
//! only as much as the caller's `avail_out` allows. Block writing (fixed vs.
//! dynamic selection, code-length RLE, header layout) builds its codes via
//! [`crate::huffman::HuffmanTable`].

use crate::huffman::{self, HuffmanTable};
use crate::lz77::{DEFAULT_MEMORY_LEVEL, DEFAULT_WINDOW_BITS, Lz77Encoder, Lz77Token, Strategy};
use crate::tables::{
    CODE_LENGTH_ORDER, distance_to_code, fixed_distance_lengths, fixed_litlen_lengths,
    length_to_code,
};
use flate_core::bitstream::BitWriter;
use flate_core::error::Status;
use flate_core::traits::{CompressionLevel, Compressor, FlushMode};

/// Input accumulates up to this many bytes before a block is emitted even
/// without an explicit flush request, bounding memory use on long
/// `FlushMode::None` runs.
const COMPRESS_CHUNK: usize = 128 * 1024;

/// Maximum length of a single STORED block's LEN field.
const MAX_STORED_BLOCK: usize = 65535;

/// A resumable DEFLATE compressor.
#[derive(Debug)]
pub struct Deflater {
    lz77: Lz77Encoder,
    level: u8,
    strategy: Strategy,
    input_buf: Vec<u8>,
    pending: Vec<u8>,
    pending_pos: usize,
    writer: BitWriter,
    wrote_final: bool,
    finished: bool,
}

impl Deflater {
    /// Create a compressor at the given level (0-9).
    pub fn new(level: impl Into<CompressionLevel>) -> Self {
        Self::with_strategy(level, Strategy::Default)
    }

    /// Create a compressor at the given level and match-finding strategy,
    /// with the default 32 KiB window and `memory_level` of 8.
    pub fn with_strategy(level: impl Into<CompressionLevel>, strategy: Strategy) -> Self {
        Self::with_config(level, strategy, DEFAULT_WINDOW_BITS, DEFAULT_MEMORY_LEVEL)
    }

    /// Create a compressor at the given level, strategy, `window_bits`
    /// (9..=15), and `memory_level` (1..=9).
    pub fn with_config(
        level: impl Into<CompressionLevel>,
        strategy: Strategy,
        window_bits: u8,
        memory_level: u8,
    ) -> Self {
        let level = level.into().level();
        Self {
            lz77: Lz77Encoder::with_config(level, strategy, window_bits, memory_level),
            level,
            strategy,
            input_buf: Vec::new(),
            pending: Vec::new(),
            pending_pos: 0,
            writer: BitWriter::new(),
            wrote_final: false,
            finished: false,
        }
    }

    /// Preload a dictionary so early matches can reference it.
    pub fn set_dictionary(&mut self, dictionary: &[u8]) {
        self.lz77.preload_dictionary(dictionary);
    }

    /// Reset to the initial state, discarding buffered input and output.
    pub fn reset(&mut self) {
        self.lz77.reset();
        self.input_buf.clear();
        self.pending.clear();
        self.pending_pos = 0;
        self.writer = BitWriter::new();
        self.wrote_final = false;
        self.finished = false;
    }

    fn flush_writer_to_pending(&mut self) {
        let mut scratch = [0u8; 512];
        loop {
            let mut cursor: &mut [u8] = &mut scratch;
            let n = self.writer.drain(&mut cursor);
            if n == 0 {
                break;
            }
            self.pending.extend_from_slice(&scratch[..n]);
        }
    }

    fn drain_to_output(&mut self, output: &mut [u8]) -> usize {
        let available = &self.pending[self.pending_pos..];
        let n = available.len().min(output.len());
        output[..n].copy_from_slice(&available[..n]);
        self.pending_pos += n;
        if self.pending_pos == self.pending.len() {
            self.pending.clear();
            self.pending_pos = 0;
        }
        n
    }

    fn compress_staged_input(&mut self, flush: FlushMode) {
        let data = std::mem::take(&mut self.input_buf);
        let is_final = matches!(flush, FlushMode::Finish);

        if self.level == 0 {
            self.write_stored(&data, is_final);
        } else {
            let tokens = self.lz77.compress(&data);
            self.write_token_block(&tokens, &data, is_final);
        }

        match flush {
            FlushMode::None => {}
            FlushMode::Partial => self.write_empty_fixed_block(),
            FlushMode::Sync => {
                self.write_empty_stored_block();
                self.writer.align_to_byte();
            }
            FlushMode::Full => {
                self.write_empty_stored_block();
                self.writer.align_to_byte();
                self.lz77.reset();
            }
            FlushMode::Finish => {
                self.writer.align_to_byte();
                self.wrote_final = true;
            }
        }
        self.flush_writer_to_pending();
    }

    fn write_block_header(&mut self, btype: u32, is_final: bool) {
        self.writer.push_bit(is_final);
        self.writer.push_bits(btype, 2);
    }

    fn write_empty_stored_block(&mut self) {
        self.write_block_header(0, false);
        self.writer.align_to_byte();
        self.writer.push_bits(0, 16);
        self.writer.push_bits(0xFFFF, 16);
    }

    /// Write a non-final fixed-Huffman block containing only the
    /// end-of-block symbol. Used by `FlushMode::Partial` (spec §4.6): unlike
    /// `Sync`, this does not byte-align the stream afterward, so it costs a
    /// handful of bits rather than up to a full byte plus an empty stored
    /// block, while still giving a decoder a point at which everything seen
    /// so far is guaranteed decodable.
    fn write_empty_fixed_block(&mut self) {
        self.write_block_header(0b01, false);
        let litlen = HuffmanTable::from_code_lengths(&fixed_litlen_lengths())
            .expect("fixed litlen lengths always form a valid code");
        self.write_huffman_symbol(&litlen, 256);
    }

    fn write_stored(&mut self, data: &[u8], is_final: bool) {
        if data.is_empty() {
            self.write_block_header(0, is_final);
            self.writer.align_to_byte();
            self.writer.push_bits(0, 16);
            self.writer.push_bits(0xFFFF, 16);
            return;
        }

        let mut offset = 0;
        while offset < data.len() {
            let remaining = data.len() - offset;
            let block_len = remaining.min(MAX_STORED_BLOCK);
            let final_block = is_final && offset + block_len == data.len();

            self.write_block_header(0, final_block);
            self.writer.align_to_byte();
            self.writer.push_bits(block_len as u32, 16);
            self.writer.push_bits(!(block_len as u16) as u32, 16);

            for &byte in &data[offset..offset + block_len] {
                self.writer.push_bits(byte as u32, 8);
            }
            offset += block_len;

            // Keep the internal byte buffer from growing unbounded mid-block.
            self.flush_writer_to_pending();
        }
    }

    fn write_huffman_symbol(&mut self, table: &HuffmanTable, symbol: usize) {
        let len = table.length_of(symbol);
        let code = table.code_of(symbol) as u32;
        self.writer.push_bits(huffman::reverse_bits(code, len), len as u32);
    }

    fn write_token_block(&mut self, tokens: &[Lz77Token], raw: &[u8], is_final: bool) {
        let (litlen_freq, dist_freq) = count_frequencies(tokens);

        let mut litlen_lengths = huffman::package_merge_lengths(&litlen_freq, huffman::MAX_BITS);
        if litlen_lengths[256] == 0 {
            litlen_lengths[256] = 1; // EOB must always be representable.
        }
        let mut dist_freq_for_lengths = dist_freq;
        if dist_freq_for_lengths.iter().all(|&f| f == 0) {
            dist_freq_for_lengths[0] = 1; // Avoid a degenerate empty distance alphabet.
        }
        let dist_lengths = huffman::package_merge_lengths(&dist_freq_for_lengths, huffman::MAX_BITS);

        let dynamic_size = estimate_bits(tokens, &litlen_lengths, &dist_lengths)
            + dynamic_header_bits(&litlen_lengths, &dist_lengths);
        let fixed_size =
            estimate_bits(tokens, &fixed_litlen_lengths(), &fixed_distance_lengths());
        let stored_size = stored_block_bits(raw.len());

        // Per spec, a stored block wins whenever it is no larger than the
        // better of the two Huffman-coded options, at any compression level.
        if stored_size <= dynamic_size.min(fixed_size) {
            self.write_stored(raw, is_final);
        } else if dynamic_size < fixed_size {
            self.write_dynamic_block(tokens, &litlen_lengths, &dist_lengths, is_final);
        } else {
            self.write_fixed_block(tokens, is_final);
        }
    }

    fn write_fixed_block(&mut self, tokens: &[Lz77Token], is_final: bool) {
        self.write_block_header(0b01, is_final);
        let litlen = HuffmanTable::from_code_lengths(&fixed_litlen_lengths())
            .expect("fixed litlen lengths always form a valid code");
        let dist = HuffmanTable::from_code_lengths(&fixed_distance_lengths())
            .expect("fixed distance lengths always form a valid code");
        self.write_tokens(tokens, &litlen, &dist);
        self.write_huffman_symbol(&litlen, 256);
    }

    fn write_dynamic_block(
        &mut self,
        tokens: &[Lz77Token],
        litlen_lengths: &[u8],
        dist_lengths: &[u8],
        is_final: bool,
    ) {
        self.write_block_header(0b10, is_final);

        let hlit = last_nonzero(litlen_lengths, 257).saturating_sub(257);
        let hdist = last_nonzero(dist_lengths, 1).saturating_sub(1);

        let mut combined = Vec::with_capacity(hlit + 257 + hdist + 1);
        combined.extend_from_slice(&litlen_lengths[..hlit + 257]);
        combined.extend_from_slice(&dist_lengths[..hdist + 1]);
        let (codelen_symbols, codelen_freqs) = rle_encode_lengths(&combined);

        let codelen_lengths = huffman::package_merge_lengths(&codelen_freqs, 7);
        let hclen = find_hclen(&codelen_lengths);

        self.writer.push_bits(hlit as u32, 5);
        self.writer.push_bits(hdist as u32, 5);
        self.writer.push_bits(hclen as u32, 4);

        for i in 0..hclen + 4 {
            self.writer
                .push_bits(codelen_lengths[CODE_LENGTH_ORDER[i]] as u32, 3);
        }

        let codelen_table = HuffmanTable::from_code_lengths(&codelen_lengths)
            .expect("package-merge lengths always form a valid code");
        for &(sym, extra, extra_bits) in &codelen_symbols {
            self.write_huffman_symbol(&codelen_table, sym as usize);
            if extra_bits > 0 {
                self.writer.push_bits(extra as u32, extra_bits as u32);
            }
        }

        let litlen_table = HuffmanTable::from_code_lengths(litlen_lengths)
            .expect("package-merge lengths always form a valid code");
        let dist_table = HuffmanTable::from_code_lengths(dist_lengths)
            .expect("package-merge lengths always form a valid code");
        self.write_tokens(tokens, &litlen_table, &dist_table);
        self.write_huffman_symbol(&litlen_table, 256);
    }

    fn write_tokens(&mut self, tokens: &[Lz77Token], litlen: &HuffmanTable, dist: &HuffmanTable) {
        for token in tokens {
            match *token {
                Lz77Token::Literal(byte) => self.write_huffman_symbol(litlen, byte as usize),
                Lz77Token::Match { length, distance } => {
                    let (len_code, len_extra_bits, len_extra) = length_to_code(length);
                    self.write_huffman_symbol(litlen, len_code as usize);
                    if len_extra_bits > 0 {
                        self.writer.push_bits(len_extra as u32, len_extra_bits as u32);
                    }

                    let (dist_code, dist_extra_bits, dist_extra) = distance_to_code(distance);
                    self.write_huffman_symbol(dist, dist_code as usize);
                    if dist_extra_bits > 0 {
                        self.writer.push_bits(dist_extra as u32, dist_extra_bits as u32);
                    }
                }
            }
        }
    }
}

fn count_frequencies(tokens: &[Lz77Token]) -> ([u32; 286], [u32; 30]) {
    let mut litlen_freq = [0u32; 286];
    let mut dist_freq = [0u32; 30];
    for token in tokens {
        match *token {
            Lz77Token::Literal(byte) => litlen_freq[byte as usize] += 1,
            Lz77Token::Match { length, distance } => {
                let (len_code, _, _) = length_to_code(length);
                litlen_freq[len_code as usize] += 1;
                let (dist_code, _, _) = distance_to_code(distance);
                dist_freq[dist_code as usize] += 1;
            }
        }
    }
    litlen_freq[256] += 1;
    (litlen_freq, dist_freq)
}

fn estimate_bits(tokens: &[Lz77Token], litlen_lengths: &[u8], dist_lengths: &[u8]) -> usize {
    let mut bits = 3usize;
    for token in tokens {
        match *token {
            Lz77Token::Literal(byte) => bits += litlen_lengths[byte as usize] as usize,
            Lz77Token::Match { length, distance } => {
                let (len_code, len_extra_bits, _) = length_to_code(length);
                bits += litlen_lengths[len_code as usize] as usize + len_extra_bits as usize;
                let (dist_code, dist_extra_bits, _) = distance_to_code(distance);
                bits += dist_lengths[dist_code as usize] as usize + dist_extra_bits as usize;
            }
        }
    }
    bits += litlen_lengths[256] as usize;
    bits
}

fn dynamic_header_bits(litlen_lengths: &[u8], dist_lengths: &[u8]) -> usize {
    5 + 5 + 4 + 19 * 3 + litlen_lengths.len() * 4 + dist_lengths.len() * 4
}

/// Bit cost of emitting `len` raw bytes as one or more stored blocks (spec
/// §4.6 step 1): each block adds a 5-byte (3-bit header + align + LEN/NLEN)
/// header on top of its literal payload, and a block can hold at most
/// `MAX_STORED_BLOCK` bytes.
fn stored_block_bits(len: usize) -> usize {
    let blocks = len.div_ceil(MAX_STORED_BLOCK).max(1);
    blocks * 5 * 8 + len * 8
}

fn last_nonzero(lengths: &[u8], min: usize) -> usize {
    let mut last = min;
    for (i, &len) in lengths.iter().enumerate() {
        if len > 0 && i >= min {
            last = i + 1;
        }
    }
    last.max(min)
}

/// RLE-encode a run of code lengths per RFC 1951 §3.2.7, returning
/// `(symbol, extra_value, extra_bits)` triples and per-symbol frequencies
/// over the code-length alphabet (0-18).
fn rle_encode_lengths(lengths: &[u8]) -> (Vec<(u8, u8, u8)>, [u32; 19]) {
    let mut symbols = Vec::new();
    let mut freqs = [0u32; 19];
    let mut i = 0;

    while i < lengths.len() {
        let len = lengths[i];
        let mut count = 1;
        while i + count < lengths.len() && lengths[i + count] == len && count < 138 {
            count += 1;
        }
        let consumed = count;

        if len == 0 {
            while count > 0 {
                if count >= 11 {
                    let run = count.min(138);
                    symbols.push((18, (run - 11) as u8, 7));
                    freqs[18] += 1;
                    count -= run;
                } else if count >= 3 {
                    let run = count.min(10);
                    symbols.push((17, (run - 3) as u8, 3));
                    freqs[17] += 1;
                    count -= run;
                } else {
                    symbols.push((0, 0, 0));
                    freqs[0] += 1;
                    count -= 1;
                }
            }
        } else {
            symbols.push((len, 0, 0));
            freqs[len as usize] += 1;
            count -= 1;
            while count > 0 {
                if count >= 3 {
                    let run = count.min(6);
                    symbols.push((16, (run - 3) as u8, 2));
                    freqs[16] += 1;
                    count -= run;
                } else {
                    symbols.push((len, 0, 0));
                    freqs[len as usize] += 1;
                    count -= 1;
                }
            }
        }

        i += consumed;
    }

    (symbols, freqs)
}

fn find_hclen(codelen_lengths: &[u8]) -> usize {
    let mut hclen = 15;
    for i in (0..=15).rev() {
        if codelen_lengths[CODE_LENGTH_ORDER[i + 4 - 1]] != 0 {
            hclen = i;
            break;
        }
    }
    hclen
}

impl Default for Deflater {
    fn default() -> Self {
        Self::new(CompressionLevel::DEFAULT)
    }
}

impl Compressor for Deflater {
    fn process(
        &mut self,
        input: &[u8],
        output: &mut [u8],
        flush: FlushMode,
    ) -> (usize, usize, Status) {
        if self.finished {
            return (0, 0, Status::StreamEnd);
        }

        self.input_buf.extend_from_slice(input);
        let consumed = input.len();

        let should_compress =
            flush != FlushMode::None || self.input_buf.len() >= COMPRESS_CHUNK;
        if !self.wrote_final
            && should_compress
            && (!self.input_buf.is_empty() || flush != FlushMode::None)
        {
            self.compress_staged_input(flush);
        }

        let produced = self.drain_to_output(output);

        let status = if self.wrote_final && self.pending.is_empty() {
            self.finished = true;
            Status::StreamEnd
        } else if consumed == 0 && produced == 0 {
            Status::BufError
        } else {
            Status::Ok
        };

        (consumed, produced, status)
    }

    fn reset(&mut self) {
        Deflater::reset(self);
    }

    fn is_finished(&self) -> bool {
        self.finished
    }
}

/// Compress `data` to a `Vec<u8>` in one call, at the given level.
pub fn deflate(data: &[u8], level: u8) -> Vec<u8> {
    let mut deflater = Deflater::new(CompressionLevel::new(level));
    let mut out = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut status = Status::Ok;
    let mut offset = 0;
    while !status.is_done() {
        let (consumed, produced, s) =
            deflater.process(&data[offset..], &mut scratch, FlushMode::Finish);
        offset += consumed;
        out.extend_from_slice(&scratch[..produced]);
        status = s;
        if consumed == 0 && produced == 0 && !status.is_done() {
            break;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inflate::inflate;

    #[test]
    fn test_deflate_stored() {
        let input = b"Hello, World!";
        let compressed = deflate(input, 0);
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_deflate_compressed_smaller() {
        let input = b"AAAAAAAAAABBBBBBBBBBCCCCCCCCCC";
        let compressed = deflate(input, 6);
        assert!(compressed.len() < input.len());
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_deflate_empty() {
        let compressed = deflate(b"", 0);
        let decompressed = inflate(&compressed).unwrap();
        assert!(decompressed.is_empty());
    }

    #[test]
    fn test_deflate_roundtrip_all_levels() {
        let inputs: [&[u8]; 3] = [
            b"Hello",
            b"The quick brown fox jumps over the lazy dog",
            b"AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA",
        ];
        for input in inputs {
            for level in [0, 1, 6, 9] {
                let compressed = deflate(input, level);
                let decompressed = inflate(&compressed).unwrap();
                assert_eq!(decompressed, input, "level {level}");
            }
        }
    }

    #[test]
    fn test_streaming_process_across_small_output_buffers() {
        let mut deflater = Deflater::new(CompressionLevel::new(6));
        let input = vec![b'x'; 5000];
        let mut compressed = Vec::new();
        let mut offset = 0;
        loop {
            let mut scratch = [0u8; 7];
            let (consumed, produced, status) =
                deflater.process(&input[offset..], &mut scratch, FlushMode::Finish);
            offset += consumed;
            compressed.extend_from_slice(&scratch[..produced]);
            if status.is_done() {
                break;
            }
        }
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input);
    }

    #[test]
    fn test_sync_flush_produces_decodable_prefix() {
        let mut deflater = Deflater::new(CompressionLevel::new(6));
        let mut scratch = [0u8; 4096];
        let (_, produced1, _) = deflater.process(b"hello ", &mut scratch, FlushMode::Sync);
        let part1 = scratch[..produced1].to_vec();

        let decompressed = inflate(&part1).unwrap();
        assert_eq!(decompressed, b"hello ");
    }

    #[test]
    fn test_partial_flush_produces_decodable_prefix_without_byte_padding() {
        let mut deflater = Deflater::new(CompressionLevel::new(6));
        let mut scratch = [0u8; 4096];
        let (_, produced, _) = deflater.process(b"partial flush data", &mut scratch, FlushMode::Partial);
        let prefix = scratch[..produced].to_vec();

        let decompressed = inflate(&prefix).unwrap();
        assert_eq!(decompressed, b"partial flush data");
    }
}
