//! Edge case tests for DEFLATE compression.

use flate_deflate::{deflate, inflate};

#[test]
fn test_empty_input() {
    let input = b"";
    let compressed = deflate(input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_single_byte() {
    let input = b"A";
    let compressed = deflate(input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_all_zeros() {
    let input = vec![0u8; 1000];
    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert!(compressed.len() < input.len() / 10);
}

#[test]
fn test_all_same_byte() {
    let input = vec![255u8; 5000];
    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert!(compressed.len() < input.len() / 20);
}

#[test]
fn test_max_match_length() {
    let pattern = vec![42u8; 258];
    let mut input = Vec::new();
    for _ in 0..10 {
        input.extend_from_slice(&pattern);
    }

    let compressed = deflate(&input, 9);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_all_literals() {
    // Pseudo-random, non-repeating bytes: no LZ77 matches should be found,
    // so every token is a literal.
    let mut state: u32 = 0x2545F491;
    let input: Vec<u8> = (0..4000)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state & 0xFF) as u8
        })
        .collect();

    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_alternating_pattern() {
    let mut input = Vec::with_capacity(2000);
    for i in 0..1000 {
        input.push(if i % 2 == 0 { b'A' } else { b'B' });
    }

    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_large_input() {
    let mut input = Vec::with_capacity(1024 * 1024);
    let pattern = b"The quick brown fox jumps over the lazy dog. ";
    while input.len() < 1024 * 1024 {
        input.extend_from_slice(pattern);
    }
    input.truncate(1024 * 1024);

    let compressed = deflate(&input, 5);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
    assert_eq!(decompressed.len(), 1024 * 1024);
}

#[test]
fn test_incremental_pattern() {
    let mut input = Vec::new();
    for i in 0..256 {
        for _ in 0..10 {
            input.push(i as u8);
        }
    }

    let compressed = deflate(&input, 1);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_compression_levels() {
    let input = b"Hello, world! This is a test of DEFLATE compression with various levels.";

    for level in 0..=9 {
        let compressed = deflate(input, level);
        let decompressed = inflate(&compressed).unwrap();
        assert_eq!(decompressed, input, "level {level} failed");

        if level == 0 {
            // Stored blocks always carry a 5-byte header per block.
            assert!(compressed.len() > input.len());
        }
    }
}

#[test]
fn test_binary_data() {
    let input: Vec<u8> = (0..=255).cycle().take(5000).collect();

    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_utf8_text() {
    let input = "日本語のテキストと English mixed together, naïve café résumé"
        .repeat(20)
        .into_bytes();

    let compressed = deflate(&input, 6);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_long_distance_match() {
    let mut input = vec![0u8; 32768];
    let pattern = b"PATTERN_TO_MATCH";
    input[0..pattern.len()].copy_from_slice(pattern);
    input[32768 - pattern.len()..32768].copy_from_slice(pattern);

    let compressed = deflate(&input, 1);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn test_inflate_rejects_truncated_stream() {
    let input = b"some data that will be truncated after compression";
    let compressed = deflate(input, 6);
    let truncated = &compressed[..compressed.len() / 2];
    assert!(inflate(truncated).is_err());
}

#[test]
fn test_inflate_rejects_corrupted_header() {
    let mut compressed = deflate(b"some data", 6);
    compressed[0] ^= 0xFF;
    assert!(inflate(&compressed).is_err());
}
