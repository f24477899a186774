//! Canonical Huffman code construction and lookup.
//!
//! [`package_merge_lengths`] below builds length-limited codes via the
//! Larmore-Hirschberg "package-merge" (coin-collector's problem) algorithm:
//! it builds, for each bit length up to the limit, a sorted list of "coins"
//! (original symbols and packages of two coins from the previous level),
//! then reads the code length of every symbol off how many times it appears
//! among the cheapest `2n - 2` coins at the final level. This always
//! produces an *optimal* length-limited prefix code, unlike truncating a
//! greedy Huffman tree to fit the length limit, which is merely
//! length-limited.
//!
//! The canonical-code assignment and the decode table use a two-level
//! design: a small root table sized to a fixed prefix width plus overflow
//! subtables for codes longer than that prefix, avoiding a bit-by-bit walk
//! for the common case.

use crate::tables::InflateMask;

/// Maximum DEFLATE Huffman code length (RFC 1951 §3.2.7).
pub const MAX_BITS: u8 = 15;

/// Width, in bits, of the decode table's root lookup.
const ROOT_BITS: u8 = 9;

/// Assign length-limited optimal code lengths to a symbol alphabet via
/// package-merge.
///
/// `freqs[i]` is the observed frequency of symbol `i`; symbols with zero
/// frequency are excluded from the code (their returned length is `0`).
/// Returns one length per input symbol, each in `1..=max_len` for symbols
/// that occur, satisfying the Kraft inequality with equality whenever two
/// or more symbols occur.
pub fn package_merge_lengths(freqs: &[u32], max_len: u8) -> Vec<u8> {
    #[derive(Clone)]
    struct Coin {
        weight: u64,
        symbols: Vec<usize>,
    }

    let present: Vec<usize> = (0..freqs.len()).filter(|&i| freqs[i] > 0).collect();
    let mut lengths = vec![0u8; freqs.len()];

    match present.len() {
        0 => return lengths,
        1 => {
            lengths[present[0]] = 1;
            return lengths;
        }
        _ => {}
    }

    let mut leaves: Vec<Coin> = present
        .iter()
        .map(|&i| Coin {
            weight: freqs[i] as u64,
            symbols: vec![i],
        })
        .collect();
    leaves.sort_by_key(|c| c.weight);

    // `levels[k]` (0-indexed) holds the sorted coin list for bit-length k+1.
    let mut levels: Vec<Vec<Coin>> = Vec::with_capacity(max_len as usize);
    levels.push(leaves.clone());

    for _ in 1..max_len {
        let prev = levels.last().expect("levels is never empty");
        let mut packages = Vec::with_capacity(prev.len() / 2);
        let mut i = 0;
        while i + 1 < prev.len() {
            let mut symbols = prev[i].symbols.clone();
            symbols.extend_from_slice(&prev[i + 1].symbols);
            packages.push(Coin {
                weight: prev[i].weight + prev[i + 1].weight,
                symbols,
            });
            i += 2;
        }

        let mut merged = Vec::with_capacity(leaves.len() + packages.len());
        merged.extend(leaves.iter().cloned());
        merged.extend(packages);
        merged.sort_by_key(|c| c.weight);
        levels.push(merged);
    }

    let n = present.len();
    let final_list = levels.last().expect("levels is never empty");
    let take = (2 * n - 2).min(final_list.len());

    let mut counts = vec![0u32; freqs.len()];
    for coin in final_list.iter().take(take) {
        for &sym in &coin.symbols {
            counts[sym] += 1;
        }
    }
    for &sym in &present {
        lengths[sym] = counts[sym] as u8;
    }
    lengths
}

#[inline]
pub(crate) fn reverse_bits(mut value: u32, len: u8) -> u32 {
    let mut result = 0u32;
    for _ in 0..len {
        result = (result << 1) | (value & 1);
        value >>= 1;
    }
    result
}

/// One entry in the root lookup table.
#[derive(Debug, Clone, Copy)]
enum RootEntry {
    /// No code of the root-table's width maps here.
    Invalid,
    /// A complete code resolves within the root table alone.
    Symbol { symbol: u16, length: u8 },
    /// Codes sharing this root prefix are longer than the root width; look
    /// the remaining bits up in `subtables[index]`.
    Sub { index: u16 },
}

#[derive(Debug, Clone, Copy)]
struct SubEntry {
    symbol: u16,
    /// Bits consumed *beyond* the root prefix, or `0` if invalid.
    extra_len: u8,
}

/// A canonical Huffman code: encode (symbol -> bits) and decode (bits ->
/// symbol) tables built from the same set of code lengths.
#[derive(Debug, Clone)]
pub struct HuffmanTable {
    lengths: Vec<u8>,
    codes: Vec<u16>,
    root_bits: u8,
    root: Vec<RootEntry>,
    sub_bits: u8,
    subtables: Vec<Vec<SubEntry>>,
}

/// Which alphabet a table is being built for, when that table comes from a
/// transmitted dynamic-block header and must be checked for completeness.
/// RFC 1951 permits an incomplete code only for the distance alphabet, and
/// only when it carries exactly one code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alphabet {
    /// The code-length alphabet (RLE-coded HCLEN symbols).
    CodeLength,
    /// The literal/length alphabet.
    LitLen,
    /// The distance alphabet.
    Distance,
}

impl HuffmanTable {
    /// Build canonical codes and a decode table from per-symbol code
    /// lengths (`0` = symbol absent from the code), without checking for an
    /// incomplete code.
    ///
    /// Used for tables this crate builds itself (the fixed tables, and the
    /// encoder's own package-merge-derived dynamic tables), which are
    /// always either complete or the legitimately incomplete single-code
    /// distance case, or intentionally incomplete by RFC 1951's own fixed
    /// distance table definition (30 five-bit codes, leaving 2 unused).
    /// Tables built from a transmitted dynamic-block header should use
    /// [`HuffmanTable::from_code_lengths_checked`] instead, which rejects a
    /// corrupt, incomplete code eagerly rather than only when decoding
    /// happens to walk into an unfilled slot.
    ///
    /// Returns an error string (surfaced by callers as `Status::DataError`)
    /// if the lengths over-subscribe the code space — more codes of some
    /// length than the Kraft inequality allows.
    pub fn from_code_lengths(lengths: &[u8]) -> Result<Self, String> {
        Self::build(lengths, None)
    }

    /// Like [`HuffmanTable::from_code_lengths`], but additionally rejects an
    /// incomplete code (Kraft sum < 1) unless `alphabet` is
    /// [`Alphabet::Distance`] and the code carries exactly one symbol,
    /// matching zlib's `inftrees.c` (`left > 0 && (type == CODES || max !=
    /// 1)`) and this crate's own spec for table construction from a
    /// dynamic-block header.
    pub fn from_code_lengths_checked(lengths: &[u8], alphabet: Alphabet) -> Result<Self, String> {
        Self::build(lengths, Some(alphabet))
    }

    fn build(lengths: &[u8], alphabet: Option<Alphabet>) -> Result<Self, String> {
        let max_len = lengths.iter().copied().max().unwrap_or(0);
        if max_len == 0 {
            return Ok(Self {
                lengths: lengths.to_vec(),
                codes: vec![0; lengths.len()],
                root_bits: 0,
                root: Vec::new(),
                sub_bits: 0,
                subtables: Vec::new(),
            });
        }
        if max_len > MAX_BITS {
            return Err(format!("huffman code length {max_len} exceeds {MAX_BITS}"));
        }

        let mut count = [0u32; MAX_BITS as usize + 1];
        for &l in lengths {
            count[l as usize] += 1;
        }

        // Over-subscription check via the Kraft inequality.
        let mut left: i64 = 1;
        for len in 1..=max_len as usize {
            left <<= 1;
            left -= count[len] as i64;
            if left < 0 {
                return Err(format!("over-subscribed huffman code at length {len}"));
            }
        }

        if let Some(alphabet) = alphabet {
            let single_code = lengths.iter().filter(|&&l| l > 0).count() == 1;
            let allowed_incomplete = alphabet == Alphabet::Distance && single_code;
            if left > 0 && !allowed_incomplete {
                return Err("incomplete huffman code".to_string());
            }
        }

        let mut next_code = [0u32; MAX_BITS as usize + 2];
        let mut code = 0u32;
        count[0] = 0;
        for len in 1..=max_len as usize {
            code = (code + count[len - 1]) << 1;
            next_code[len] = code;
        }

        let mut codes = vec![0u16; lengths.len()];
        for (sym, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            codes[sym] = next_code[len as usize] as u16;
            next_code[len as usize] += 1;
        }

        let root_bits = max_len.min(ROOT_BITS);
        let sub_bits = max_len.saturating_sub(root_bits);
        let mut root = vec![RootEntry::Invalid; 1usize << root_bits];
        let mut subtables: Vec<Vec<SubEntry>> = Vec::new();
        // Maps a root prefix to its subtable index, created lazily.
        let mut sub_index_of_prefix: Vec<Option<u16>> = vec![None; 1usize << root_bits];

        for (sym, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let reversed = reverse_bits(codes[sym] as u32, len);

            if len <= root_bits {
                let step = 1usize << len;
                let mut idx = reversed as usize;
                while idx < root.len() {
                    root[idx] = RootEntry::Symbol {
                        symbol: sym as u16,
                        length: len,
                    };
                    idx += step;
                }
            } else {
                let prefix = (reversed & ((1u32 << root_bits) - 1)) as usize;
                let sub_idx = match sub_index_of_prefix[prefix] {
                    Some(i) => i,
                    None => {
                        let i = subtables.len() as u16;
                        subtables.push(vec![
                            SubEntry {
                                symbol: 0,
                                extra_len: 0
                            };
                            1usize << sub_bits
                        ]);
                        sub_index_of_prefix[prefix] = Some(i);
                        root[prefix] = RootEntry::Sub { index: i };
                        i
                    }
                };
                let extra_len = len - root_bits;
                let suffix = (reversed >> root_bits) as usize;
                let step = 1usize << extra_len;
                let table = &mut subtables[sub_idx as usize];
                let mut idx = suffix;
                while idx < table.len() {
                    table[idx] = SubEntry {
                        symbol: sym as u16,
                        extra_len,
                    };
                    idx += step;
                }
            }
        }

        Ok(Self {
            lengths: lengths.to_vec(),
            codes,
            root_bits,
            root,
            sub_bits,
            subtables,
        })
    }

    /// Code length, in bits, for `symbol` (`0` if the symbol is unused).
    pub fn length_of(&self, symbol: usize) -> u8 {
        self.lengths[symbol]
    }

    /// Canonical code value (MSB-first semantics) for `symbol`.
    pub fn code_of(&self, symbol: usize) -> u16 {
        self.codes[symbol]
    }

    /// Decode one symbol from `peeked`, a right-aligned bit window where bit
    /// 0 is the next unconsumed stream bit (as returned by
    /// `flate_core::BitReader::peek`). Returns `(symbol, bits_consumed)`, or
    /// `None` if no code matches — which, for a table built from a valid
    /// code, only happens when fewer than the full code length was
    /// available to peek.
    #[inline]
    pub fn decode(&self, peeked: u32) -> Option<(u16, u8)> {
        if self.root_bits == 0 {
            return None;
        }
        let root_idx = (peeked & InflateMask::for_bits(self.root_bits)) as usize;
        match self.root[root_idx] {
            RootEntry::Invalid => None,
            RootEntry::Symbol { symbol, length } => Some((symbol, length)),
            RootEntry::Sub { index } => {
                let suffix = (peeked >> self.root_bits) & InflateMask::for_bits(self.sub_bits);
                let entry = self.subtables[index as usize][suffix as usize];
                if entry.extra_len == 0 {
                    None
                } else {
                    Some((entry.symbol, self.root_bits + entry.extra_len))
                }
            }
        }
    }

    /// Longest code length present in this table (0 if the table is empty).
    pub fn max_code_len(&self) -> u8 {
        self.lengths.iter().copied().max().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_package_merge_assigns_shorter_codes_to_frequent_symbols() {
        let freqs = [10u32, 1, 1, 1];
        let lengths = package_merge_lengths(&freqs, 15);
        assert!(lengths[0] < lengths[1]);
        assert!(lengths[0] >= 1);
    }

    #[test]
    fn test_package_merge_single_symbol() {
        let freqs = [0u32, 5, 0];
        let lengths = package_merge_lengths(&freqs, 15);
        assert_eq!(lengths, vec![0, 1, 0]);
    }

    #[test]
    fn test_package_merge_respects_length_limit() {
        // Fibonacci-like skew forces long codes under unlimited Huffman;
        // the limiter must cap everything at 7 bits.
        let mut freqs = vec![1u32; 40];
        freqs[0] = 1_000_000;
        let lengths = package_merge_lengths(&freqs, 7);
        assert!(lengths.iter().all(|&l| l <= 7));
        // Kraft equality should hold (all 40 symbols present).
        let kraft: f64 = lengths
            .iter()
            .filter(|&&l| l > 0)
            .map(|&l| 2f64.powi(-(l as i32)))
            .sum();
        assert!((kraft - 1.0).abs() < 1e-9, "kraft sum = {kraft}");
    }

    #[test]
    fn test_roundtrip_small_alphabet() {
        let lengths = vec![2u8, 2, 2, 2];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        for sym in 0..4 {
            let code = table.code_of(sym) as u32;
            let len = table.length_of(sym);
            let reversed = reverse_bits(code, len);
            let decoded = table.decode(reversed).unwrap();
            assert_eq!(decoded, (sym as u16, len));
        }
    }

    #[test]
    fn test_roundtrip_long_codes_use_subtable() {
        // Force a code needing > ROOT_BITS by giving one symbol a huge
        // relative weight and many low-weight symbols.
        let mut freqs = vec![1u32; 300];
        freqs[0] = 100_000;
        let lengths = package_merge_lengths(&freqs, MAX_BITS);
        assert!(lengths.iter().any(|&l| l > ROOT_BITS));

        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        for (sym, &len) in lengths.iter().enumerate() {
            if len == 0 {
                continue;
            }
            let code = table.code_of(sym) as u32;
            let reversed = reverse_bits(code, len);
            let decoded = table.decode(reversed).unwrap();
            assert_eq!(decoded, (sym as u16, len));
        }
    }

    #[test]
    fn test_over_subscribed_code_rejected() {
        // Two symbols both claiming the single 1-bit code space.
        let lengths = vec![1u8, 1, 1];
        assert!(HuffmanTable::from_code_lengths(&lengths).is_err());
    }

    #[test]
    fn test_empty_table() {
        let lengths = vec![0u8; 10];
        let table = HuffmanTable::from_code_lengths(&lengths).unwrap();
        assert_eq!(table.max_code_len(), 0);
    }

    #[test]
    fn test_incomplete_litlen_code_rejected_when_checked() {
        // One length-1 code, leaving half the code space unclaimed: legal
        // for a single-code distance alphabet, not for lit/len.
        let lengths = vec![1u8, 0, 0];
        assert!(HuffmanTable::from_code_lengths(&lengths).is_ok());
        assert!(
            HuffmanTable::from_code_lengths_checked(&lengths, Alphabet::LitLen).is_err()
        );
    }

    #[test]
    fn test_incomplete_code_length_alphabet_rejected_when_checked() {
        let lengths = vec![1u8, 0, 0, 0];
        assert!(
            HuffmanTable::from_code_lengths_checked(&lengths, Alphabet::CodeLength).is_err()
        );
    }

    #[test]
    fn test_incomplete_single_code_distance_table_accepted_when_checked() {
        let lengths = vec![1u8, 0, 0];
        assert!(
            HuffmanTable::from_code_lengths_checked(&lengths, Alphabet::Distance).is_ok()
        );
    }

    #[test]
    fn test_incomplete_multi_code_distance_table_rejected_when_checked() {
        // Two codes present but still under-subscribed (e.g. both length 3
        // instead of covering the space) must still be rejected.
        let lengths = vec![3u8, 3, 0, 0];
        assert!(
            HuffmanTable::from_code_lengths_checked(&lengths, Alphabet::Distance).is_err()
        );
    }

    #[test]
    fn test_complete_code_accepted_when_checked() {
        let lengths = vec![1u8, 1, 0];
        assert!(
            HuffmanTable::from_code_lengths_checked(&lengths, Alphabet::LitLen).is_ok()
        );
    }
}
