//! Circular history buffer shared by the DEFLATE decoder (and by the LZ77
//! encoder's match finder) for resolving back-references.
//!
//! A capacity-must-be-a-power-of-two circular layout with a
//! `preload_dictionary` entry point for RFC 1950 preset dictionaries;
//! distance validity is reported as a `bool`/`Option` rather than an `Err`,
//! since an out-of-range back-reference during decoding is stream
//! corruption to be surfaced as `Status::DataError` by the caller, not a
//! Rust API misuse. This buffer holds only the sliding-window history: the
//! full decompressed output is never accumulated here. Callers write decoded
//! bytes straight into their own caller-supplied output slice (see
//! `flate_deflate::inflate`), and only the history itself needs to persist
//! across `process()` calls.

/// A power-of-two-sized circular buffer of the most recently produced bytes.
#[derive(Debug, Clone)]
pub struct Window {
    buffer: Vec<u8>,
    position: usize,
    size: usize,
    mask: usize,
}

impl Window {
    /// Create a window with the given capacity, which must be a power of two
    /// (DEFLATE's `window_bits` parameter determines this: `1 << window_bits`).
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0 && capacity.is_power_of_two());
        Self {
            buffer: vec![0; capacity],
            position: 0,
            size: 0,
            mask: capacity - 1,
        }
    }

    /// Capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Number of valid history bytes currently held (saturates at capacity).
    pub fn len(&self) -> usize {
        self.size
    }

    /// True if no bytes have been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Append one byte of freshly produced output to the history.
    #[inline]
    pub fn push_byte(&mut self, byte: u8) {
        self.buffer[self.position] = byte;
        self.position = (self.position + 1) & self.mask;
        if self.size < self.buffer.len() {
            self.size += 1;
        }
    }

    /// Append a run of freshly produced output to the history.
    pub fn push_slice(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.push_byte(b);
        }
    }

    /// Whether `distance` (1-based, 1 = most recent byte) names a byte
    /// actually present in the history so far.
    pub fn distance_valid(&self, distance: usize) -> bool {
        distance >= 1 && distance <= self.size
    }

    /// Read the byte `distance` positions back from the write cursor
    /// (distance 1 = the byte most recently pushed). Returns `None` if
    /// `distance` is zero or exceeds the amount of history recorded so far.
    #[inline]
    pub fn byte_at_distance(&self, distance: usize) -> Option<u8> {
        if !self.distance_valid(distance) {
            return None;
        }
        let index = self.position.wrapping_sub(distance) & self.mask;
        Some(self.buffer[index])
    }

    /// Copy one byte from `distance` back into the write cursor and advance
    /// it, returning the byte written. Used to implement self-overlapping
    /// matches (`distance < length`) one byte at a time, since the source
    /// byte for position `k` of the match may be a byte written during the
    /// very same match (position `k - distance`).
    #[inline]
    pub fn copy_one_from_distance(&mut self, distance: usize) -> Option<u8> {
        let byte = self.byte_at_distance(distance)?;
        self.push_byte(byte);
        Some(byte)
    }

    /// Seed the history with preset-dictionary bytes (RFC 1950 FDICT).
    /// If `dictionary` is longer than the window capacity, only the final
    /// `capacity` bytes are retained, matching zlib's own behavior.
    pub fn preload_dictionary(&mut self, dictionary: &[u8]) {
        let cap = self.buffer.len();
        let tail = if dictionary.len() > cap {
            &dictionary[dictionary.len() - cap..]
        } else {
            dictionary
        };
        self.push_slice(tail);
    }

    /// Reset to the empty state, as if newly constructed.
    pub fn clear(&mut self) {
        self.position = 0;
        self.size = 0;
    }

    /// The most recent `count` bytes of history, oldest first (for tests and
    /// for seeding the encoder's match finder with dictionary content).
    pub fn last_bytes(&self, count: usize) -> Vec<u8> {
        let count = count.min(self.size);
        (0..count)
            .map(|i| self.buffer[self.position.wrapping_sub(count - i) & self.mask])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_basic() {
        let mut w = Window::new(8);
        for &b in b"Hello" {
            w.push_byte(b);
        }
        assert_eq!(w.len(), 5);
        assert_eq!(w.byte_at_distance(1), Some(b'o'));
        assert_eq!(w.byte_at_distance(5), Some(b'H'));
        assert_eq!(w.byte_at_distance(6), None);
    }

    #[test]
    fn test_window_wraps() {
        let mut w = Window::new(4);
        w.push_slice(b"ABCDEF");
        assert_eq!(w.len(), 4);
        assert_eq!(w.byte_at_distance(1), Some(b'F'));
        assert_eq!(w.byte_at_distance(4), Some(b'C'));
    }

    #[test]
    fn test_self_overlapping_copy() {
        let mut w = Window::new(32);
        w.push_slice(b"AB");
        let mut out = Vec::new();
        for _ in 0..6 {
            out.push(w.copy_one_from_distance(2).unwrap());
        }
        assert_eq!(out, b"ABABAB");
    }

    #[test]
    fn test_preload_dictionary_truncates_to_capacity() {
        let mut w = Window::new(4);
        w.preload_dictionary(b"ABCDEF");
        assert_eq!(w.len(), 4);
        assert_eq!(w.last_bytes(4), b"CDEF");
    }

    #[test]
    fn test_invalid_distance() {
        let w = Window::new(32);
        assert!(!w.distance_valid(0));
        assert!(!w.distance_valid(1));
    }
}
