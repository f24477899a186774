//! LZ77 match finding for DEFLATE compression.
//!
//! A hash-chain `Lz77Encoder` driven by the level 0-9 configuration table
//! real zlib ships in `deflate.c`'s `configuration_table`: each level
//! selects a `good_length`/`max_lazy`/`nice_length`/`max_chain` quadruple
//! that trades search depth for speed, and a [`Flavor`] (`Store`/`Fast`/
//! `Slow`) that picks the match-loop shape itself, plus a [`Strategy`]
//! independent of level (`Filtered` biases toward literals for small,
//! noisy matches; `HuffmanOnly` skips LZ77 entirely).

/// Maximum back-reference window for DEFLATE (32 KiB, `window_bits = 15`).
pub const WINDOW_SIZE: usize = 32768;
/// Shortest back-reference DEFLATE can encode.
pub const MIN_MATCH: usize = 3;
/// Longest back-reference DEFLATE can encode.
pub const MAX_MATCH: usize = 258;

/// Default `window_bits` (32 KiB window), matching zlib's own default.
pub const DEFAULT_WINDOW_BITS: u8 = 15;
/// Default `memory_level`, matching zlib's own default.
pub const DEFAULT_MEMORY_LEVEL: u8 = 8;

/// `1 << window_bits` is the back-reference window size; valid range 9..=15.
pub fn window_size_for_bits(window_bits: u8) -> usize {
    debug_assert!((9..=15).contains(&window_bits));
    1usize << window_bits
}

/// `hash_bits = memory_level + 7`, per spec §3; valid `memory_level` range 1..=9.
fn hash_bits_for_memory_level(memory_level: u8) -> usize {
    debug_assert!((1..=9).contains(&memory_level));
    memory_level as usize + 7
}

/// A token produced by LZ77 match finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lz77Token {
    /// A literal byte.
    Literal(u8),
    /// A back-reference to previously seen data.
    Match {
        /// Number of bytes to copy (3-258).
        length: u16,
        /// Distance back into the window (1-32768).
        distance: u16,
    },
}

/// Match-finding strategy, independent of the level's search-depth knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Strategy {
    /// Ordinary lazy/greedy matching (the default).
    #[default]
    Default,
    /// Bias against matches that don't shorten the data much, for data with
    /// small-scale, noisy repetition (e.g. filtered image rows).
    Filtered,
    /// Skip match finding entirely and Huffman-code literals only.
    HuffmanOnly,
}

/// Which match-loop shape a level uses, per spec §4.5. `Store` skips
/// matching entirely (level 0); `Fast` (levels 1-3) accepts the first
/// match at a position with no one-step lookahead; `Slow` (levels 4-9)
/// evaluates a lazy one-position lookahead before committing to a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// No match finding; every byte is a literal.
    Store,
    /// Greedy matching: accept the first sufficient match, no lookahead.
    Fast,
    /// Lazy matching: defer one position if it yields a strictly longer match.
    Slow,
}

/// Per-level search parameters, equivalent to zlib's `configuration_table`.
#[derive(Debug, Clone, Copy)]
pub struct DeflaterConfig {
    /// Match length above which lazy matching stops looking for better.
    pub good_length: u16,
    /// Max length to still try lazy (one-position-ahead) matching below.
    pub max_lazy: u16,
    /// Match length considered "nice enough" to stop searching early.
    pub nice_length: u16,
    /// Hash chain positions to examine per search.
    pub max_chain: u16,
    /// Which match-loop shape this level uses.
    pub flavor: Flavor,
}

/// The zlib level 0-9 configuration table.
pub const LEVEL_CONFIG: [DeflaterConfig; 10] = [
    DeflaterConfig { good_length: 0, max_lazy: 0, nice_length: 0, max_chain: 0, flavor: Flavor::Store },
    DeflaterConfig { good_length: 4, max_lazy: 4, nice_length: 8, max_chain: 4, flavor: Flavor::Fast },
    DeflaterConfig { good_length: 4, max_lazy: 5, nice_length: 16, max_chain: 8, flavor: Flavor::Fast },
    DeflaterConfig { good_length: 4, max_lazy: 6, nice_length: 32, max_chain: 32, flavor: Flavor::Fast },
    DeflaterConfig { good_length: 4, max_lazy: 4, nice_length: 16, max_chain: 16, flavor: Flavor::Slow },
    DeflaterConfig { good_length: 8, max_lazy: 16, nice_length: 32, max_chain: 32, flavor: Flavor::Slow },
    DeflaterConfig { good_length: 8, max_lazy: 16, nice_length: 128, max_chain: 128, flavor: Flavor::Slow },
    DeflaterConfig { good_length: 8, max_lazy: 32, nice_length: 128, max_chain: 256, flavor: Flavor::Slow },
    DeflaterConfig { good_length: 32, max_lazy: 128, nice_length: 258, max_chain: 1024, flavor: Flavor::Slow },
    DeflaterConfig { good_length: 32, max_lazy: 258, nice_length: 258, max_chain: 4096, flavor: Flavor::Slow },
];

/// Greedy/lazy LZ77 match finder over an append-only, periodically-slid
/// buffer of input plus trailing history.
#[derive(Debug)]
pub struct Lz77Encoder {
    buffer: Vec<u8>,
    pos: usize,
    hash_head: Vec<i32>,
    hash_prev: Vec<i32>,
    hash_mask: usize,
    hash_shift: u32,
    window_size: usize,
    config: DeflaterConfig,
    strategy: Strategy,
    min_match: usize,
}

impl Lz77Encoder {
    /// Create an encoder for the given compression level (0-9), with the
    /// default 32 KiB window and `memory_level` of 8.
    pub fn with_level(level: u8) -> Self {
        Self::with_level_and_strategy(level, Strategy::Default)
    }

    /// Create an encoder for a level and strategy, with the default window
    /// size and `memory_level`.
    pub fn with_level_and_strategy(level: u8, strategy: Strategy) -> Self {
        Self::with_config(level, strategy, DEFAULT_WINDOW_BITS, DEFAULT_MEMORY_LEVEL)
    }

    /// Create an encoder for a level, strategy, `window_bits` (9..=15), and
    /// `memory_level` (1..=9, widening the rolling hash per spec §3).
    pub fn with_config(level: u8, strategy: Strategy, window_bits: u8, memory_level: u8) -> Self {
        let level = level.min(9);
        let config = LEVEL_CONFIG[level as usize];
        let min_match = if strategy == Strategy::Filtered { 5 } else { MIN_MATCH };
        let window_size = window_size_for_bits(window_bits);
        let hash_bits = hash_bits_for_memory_level(memory_level);
        let hash_size = 1usize << hash_bits;
        let hash_shift = (hash_bits as u32 + MIN_MATCH as u32 - 1) / MIN_MATCH as u32;
        Self {
            buffer: Vec::with_capacity(window_size * 2),
            pos: 0,
            hash_head: vec![-1; hash_size],
            hash_prev: vec![-1; window_size],
            hash_mask: hash_size - 1,
            hash_shift,
            window_size,
            config,
            strategy,
            min_match,
        }
    }

    /// Reset to the initial, history-free state.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.pos = 0;
        self.hash_head.fill(-1);
        self.hash_prev.fill(-1);
    }

    /// Preload a dictionary into the match-finder's history, as if it had
    /// just been compressed (but without emitting any tokens for it).
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        self.reset();
        let dict = if dictionary.len() > self.window_size {
            &dictionary[dictionary.len() - self.window_size..]
        } else {
            dictionary
        };
        self.buffer.extend_from_slice(dict);
        self.pos = self.buffer.len();
        self.index_range(0, self.pos);
    }

    fn index_range(&mut self, from: usize, to: usize) {
        for i in from..to.saturating_sub(2) {
            self.insert_hash(i);
        }
    }

    // The classic zlib rolling hash: each byte is folded in with a
    // left-shift-and-XOR, so a hash can be updated incrementally as the
    // window advances one byte at a time rather than recomputed from
    // scratch. Computed fresh here over exactly 3 bytes (equivalent to
    // rolling the update in from `h = 0`), since this encoder reindexes
    // positions individually rather than carrying a running `ins_h`.
    #[inline(always)]
    fn hash3(&self, b0: u8, b1: u8, b2: u8) -> usize {
        let mut h = 0usize;
        h = ((h << self.hash_shift) ^ b0 as usize) & self.hash_mask;
        h = ((h << self.hash_shift) ^ b1 as usize) & self.hash_mask;
        h = ((h << self.hash_shift) ^ b2 as usize) & self.hash_mask;
        h
    }

    #[inline]
    fn insert_hash(&mut self, pos: usize) {
        if pos + 2 >= self.buffer.len() {
            return;
        }
        let h = self.hash3(self.buffer[pos], self.buffer[pos + 1], self.buffer[pos + 2]);
        let prev = self.hash_head[h];
        self.hash_prev[pos & (self.window_size - 1)] = prev;
        self.hash_head[h] = pos as i32;
    }

    fn find_match(&self, pos: usize, max_len: usize, prev_match_len: usize) -> Option<(usize, usize)> {
        if self.config.max_chain == 0 || pos + 2 >= self.buffer.len() {
            return None;
        }
        let h = self.hash3(self.buffer[pos], self.buffer[pos + 1], self.buffer[pos + 2]);
        let mut cand = self.hash_head[h];
        let limit = pos.saturating_sub(self.window_size) as i32;
        let mut best_len = prev_match_len.max(self.min_match - 1);
        let mut best_dist = 0usize;
        let max_check = max_len.min(MAX_MATCH);
        // Halve the search depth once a "good enough" match is already in
        // hand, per spec §4.5's early-exit ordering.
        let max_chain = if best_len >= self.config.good_length as usize {
            (self.config.max_chain / 2).max(1)
        } else {
            self.config.max_chain
        };
        let mut chain = 0u16;

        while cand > limit && (cand as usize) < pos && chain < max_chain {
            let cpos = cand as usize;
            if best_len < max_check && self.buffer[cpos + best_len] == self.buffer[pos + best_len] {
                let mut len = 0;
                while len < max_check && self.buffer[cpos + len] == self.buffer[pos + len] {
                    len += 1;
                }
                if len > best_len {
                    best_len = len;
                    best_dist = pos - cpos;
                    if len >= self.config.nice_length as usize || len >= MAX_MATCH {
                        break;
                    }
                }
            }
            cand = self.hash_prev[cpos & (self.window_size - 1)];
            chain += 1;
        }

        // `Filtered` suppresses short matches at long distances, encouraging
        // the encoder toward smaller, more locally-coherent back-references.
        if self.strategy == Strategy::Filtered && best_len == 3 && best_dist > 4096 {
            return None;
        }

        if best_len >= self.min_match && best_dist > 0 {
            Some((best_len, best_dist))
        } else {
            None
        }
    }

    /// Append `input` to the match finder's buffer and emit LZ77 tokens for
    /// all of it. Slides the internal buffer afterward if it has grown past
    /// two window lengths, so this may be called repeatedly across a
    /// streaming session.
    pub fn compress(&mut self, input: &[u8]) -> Vec<Lz77Token> {
        if self.strategy == Strategy::HuffmanOnly || self.config.max_chain == 0 {
            self.buffer.extend_from_slice(input);
            let tokens = input.iter().map(|&b| Lz77Token::Literal(b)).collect();
            self.pos = self.buffer.len();
            self.maybe_slide();
            return tokens;
        }

        let start = self.buffer.len();
        self.buffer.extend_from_slice(input);
        let end = self.buffer.len();
        let tokens = match self.config.flavor {
            Flavor::Store => input.iter().map(|&b| Lz77Token::Literal(b)).collect(),
            Flavor::Fast => self.compress_fast(start, end),
            Flavor::Slow => self.compress_slow(start, end),
        };

        self.pos = end;
        self.maybe_slide();
        tokens
    }

    /// Greedy matching for levels 1-3: accept the first match found with no
    /// one-position lookahead, then insert hashes for at most `max_lazy` of
    /// the positions the match covers (real zlib's `deflate_fast` trades
    /// chain-insertion completeness for speed the same way).
    fn compress_fast(&mut self, start: usize, end: usize) -> Vec<Lz77Token> {
        let mut tokens = Vec::with_capacity(end - start);
        let mut pos = start;

        while pos < end {
            let remaining = end - pos;
            match self.find_match(pos, remaining, 0) {
                Some((length, distance)) => {
                    tokens.push(Lz77Token::Match { length: length as u16, distance: distance as u16 });
                    let inserted = length.min(self.config.max_lazy.max(1) as usize);
                    for i in 0..inserted {
                        self.insert_hash(pos + i);
                    }
                    pos += length;
                }
                None => {
                    tokens.push(Lz77Token::Literal(self.buffer[pos]));
                    self.insert_hash(pos);
                    pos += 1;
                }
            }
        }
        tokens
    }

    /// Lazy matching for levels 4-9: before committing to a match, peek one
    /// position ahead and defer to it if it yields a strictly longer match.
    fn compress_slow(&mut self, start: usize, end: usize) -> Vec<Lz77Token> {
        let mut tokens = Vec::with_capacity(end - start);
        let mut pos = start;

        while pos < end {
            let remaining = end - pos;
            let found = self.find_match(pos, remaining, 0);

            match found {
                Some((length, distance)) if length < self.config.max_lazy as usize && pos + 1 < end => {
                    self.insert_hash(pos);
                    let next_remaining = end - (pos + 1);
                    if let Some((next_len, _)) = self.find_match(pos + 1, next_remaining, length) {
                        if next_len > length {
                            // Defer: emit this byte as a literal and retry at pos+1.
                            tokens.push(Lz77Token::Literal(self.buffer[pos]));
                            pos += 1;
                            continue;
                        }
                    }
                    tokens.push(Lz77Token::Match {
                        length: length as u16,
                        distance: distance as u16,
                    });
                    for i in 1..length {
                        self.insert_hash(pos + i);
                    }
                    pos += length;
                }
                Some((length, distance)) => {
                    tokens.push(Lz77Token::Match {
                        length: length as u16,
                        distance: distance as u16,
                    });
                    self.insert_hash(pos);
                    for i in 1..length {
                        self.insert_hash(pos + i);
                    }
                    pos += length;
                }
                None => {
                    tokens.push(Lz77Token::Literal(self.buffer[pos]));
                    self.insert_hash(pos);
                    pos += 1;
                }
            }
        }
        tokens
    }

    fn maybe_slide(&mut self) {
        if self.buffer.len() <= self.window_size * 2 {
            return;
        }
        let slide = self.buffer.len() - self.window_size;
        self.buffer.drain(..slide);
        self.pos -= slide;
        for head in &mut self.hash_head {
            *head = if *head >= slide as i32 { *head - slide as i32 } else { -1 };
        }
        for prev in &mut self.hash_prev {
            *prev = if *prev >= slide as i32 { *prev - slide as i32 } else { -1 };
        }
    }

    /// One-shot helper: compress all of `input` at the given level.
    pub fn compress_all(input: &[u8], level: u8) -> Vec<Lz77Token> {
        let mut encoder = Self::with_level(level);
        encoder.compress(input)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reconstruct(tokens: &[Lz77Token]) -> Vec<u8> {
        let mut output = Vec::new();
        for token in tokens {
            match token {
                Lz77Token::Literal(b) => output.push(*b),
                Lz77Token::Match { length, distance } => {
                    for _ in 0..*length {
                        let pos = output.len() - *distance as usize;
                        output.push(output[pos]);
                    }
                }
            }
        }
        output
    }

    #[test]
    fn test_literals_only() {
        let input = b"abcdefgh";
        let tokens = Lz77Encoder::compress_all(input, 6);
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
        assert_eq!(tokens.len(), 8);
    }

    #[test]
    fn test_simple_match() {
        let input = b"abcabcabcabc";
        let tokens = Lz77Encoder::compress_all(input, 6);
        assert!(tokens.iter().any(|t| matches!(t, Lz77Token::Match { .. })));
        assert_eq!(reconstruct(&tokens), input);
    }

    #[test]
    fn test_repeated_char_compresses() {
        let input = vec![b'a'; 500];
        let tokens = Lz77Encoder::compress_all(&input, 9);
        assert!(tokens.len() < 500);
        assert_eq!(reconstruct(&tokens), input);
    }

    #[test]
    fn test_roundtrip_mixed_content() {
        let input = b"Hello, Hello, Hello! The quick brown fox. Hello again, Hello!";
        for level in [0u8, 1, 5, 9] {
            let tokens = Lz77Encoder::compress_all(input, level);
            assert_eq!(&reconstruct(&tokens), input);
        }
    }

    #[test]
    fn test_huffman_only_strategy_emits_no_matches() {
        let mut encoder = Lz77Encoder::with_level_and_strategy(6, Strategy::HuffmanOnly);
        let tokens = encoder.compress(b"aaaaaaaaaaaaaaaa");
        assert!(tokens.iter().all(|t| matches!(t, Lz77Token::Literal(_))));
    }

    #[test]
    fn test_streaming_across_multiple_compress_calls() {
        let mut encoder = Lz77Encoder::with_level(6);
        let mut tokens = Vec::new();
        tokens.extend(encoder.compress(b"abcabc"));
        tokens.extend(encoder.compress(b"abcabc"));
        assert_eq!(reconstruct(&tokens), b"abcabcabcabc");
    }

    #[test]
    fn test_dictionary_enables_immediate_matches() {
        let mut encoder = Lz77Encoder::with_level(6);
        encoder.preload_dictionary(b"the quick brown fox");
        let tokens = encoder.compress(b"the quick brown fox jumps");
        assert!(tokens.iter().any(|t| matches!(t, Lz77Token::Match { .. })));
    }

    #[test]
    fn test_level_flavor_assignment() {
        assert_eq!(LEVEL_CONFIG[0].flavor, Flavor::Store);
        for level in 1..=3 {
            assert_eq!(LEVEL_CONFIG[level].flavor, Flavor::Fast);
        }
        for level in 4..=9 {
            assert_eq!(LEVEL_CONFIG[level].flavor, Flavor::Slow);
        }
    }

    #[test]
    fn test_fast_and_slow_flavors_both_roundtrip_lazy_deferral_case() {
        // "ab" then "abX" then "ab" again: a greedy matcher at the second
        // "ab" takes the 2-byte match immediately, while a lazy matcher
        // defers one byte to catch the longer match starting one position
        // later. Both must still reconstruct correctly either way.
        let input = b"ababXababab";
        for level in [1u8, 6] {
            let tokens = Lz77Encoder::compress_all(input, level);
            assert_eq!(&reconstruct(&tokens), input);
        }
    }

    #[test]
    fn test_fast_flavor_does_not_defer() {
        // Fast (level 1) should never emit a literal immediately followed
        // by a match that covers the literal's own position with a longer
        // length than what was available when the literal was chosen — that
        // pattern is the signature of lazy deferral, which Fast must skip.
        let mut encoder = Lz77Encoder::with_level(1);
        assert_eq!(encoder.config.flavor, Flavor::Fast);
        let tokens = encoder.compress(b"aaaaaaaaaaaa");
        assert_eq!(reconstruct(&tokens), b"aaaaaaaaaaaa".to_vec());
    }
}
