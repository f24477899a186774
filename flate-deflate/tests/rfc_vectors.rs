//! Concrete literal-value scenarios from the project's testable-properties
//! section: known checksums, known boundary-stream sizes, and the handful
//! of behaviors that are easy to get subtly wrong (Store-level framing,
//! preset dictionaries, interleaved Sync flush).

use flate_core::checksum::{Adler32, Crc32};
use flate_core::error::Status;
use flate_core::traits::FlushMode;
use flate_deflate::stream::{DeflateStream, InflateStream, StreamConfig};
use flate_deflate::{FrameKind, deflate, inflate};

fn compress_framed(config: StreamConfig, input: &[u8]) -> Vec<u8> {
    let mut stream = DeflateStream::new(config).unwrap();
    let mut out = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut pending_input = input;
    loop {
        let (consumed, produced, status) =
            stream.process(pending_input, &mut scratch, FlushMode::Finish);
        pending_input = &pending_input[consumed..];
        out.extend_from_slice(&scratch[..produced]);
        if status == Status::StreamEnd {
            break;
        }
    }
    out
}

fn decompress_framed(framing: FrameKind, data: &[u8]) -> (Vec<u8>, InflateStream) {
    let mut stream = InflateStream::new(framing, 15).unwrap();
    let mut out = Vec::new();
    let mut offset = 0;
    let mut scratch = [0u8; 8192];
    loop {
        let (consumed, produced, status) = stream.process(&data[offset..], &mut scratch);
        offset += consumed;
        out.extend_from_slice(&scratch[..produced]);
        if status == Status::StreamEnd || status.is_error() {
            break;
        }
    }
    (out, stream)
}

#[test]
fn scenario_1_hello_world_checksums_and_zlib_roundtrip() {
    let input = b"Hello, World!\n";
    assert_eq!(Adler32::checksum(input), 0x205E_048A);
    assert_eq!(Crc32::compute(input), 0x9B8A_6530);

    let config = StreamConfig { framing: FrameKind::Zlib, level: 6, ..Default::default() };
    let compressed = compress_framed(config, input);
    let (decompressed, _) = decompress_framed(FrameKind::Zlib, &compressed);
    assert_eq!(decompressed, input);
}

#[test]
fn scenario_2_thousand_zero_bytes_checksums_and_single_block() {
    let input = vec![0u8; 1024];
    assert_eq!(Adler32::checksum(&input), 0x0040_0001);
    assert_eq!(Crc32::compute(&input), 0xEFB5_AF2E);

    let compressed = deflate(&input, 1);
    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);

    // A single block: final bit set on the very first block header byte.
    assert_eq!(compressed[0] & 0x01, 1);
}

#[test]
fn scenario_3_random_data_store_level_is_one_stored_block() {
    let mut state: u64 = 0x9E3779B97F4A7C15;
    let input: Vec<u8> = (0..65535)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state & 0xFF) as u8
        })
        .collect();

    let compressed = deflate(&input, 0);
    // Raw framing at level 0: one 5-byte stored-block header (1 byte
    // BFINAL/BTYPE + 2 bytes LEN + 2 bytes NLEN) plus the literal payload.
    assert_eq!(compressed.len(), 5 + input.len());

    let decompressed = inflate(&compressed).unwrap();
    assert_eq!(decompressed, input);
}

#[test]
fn scenario_4_minimal_gzip_stream() {
    let data: [u8; 20] = [
        0x1F, 0x8B, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xFF, 0x03, 0x00, 0x00, 0x00, 0x00,
        0x00, 0x00, 0x00, 0x00, 0x00,
    ];
    let (decompressed, stream) = decompress_framed(FrameKind::Gzip, &data);
    assert!(decompressed.is_empty());
    assert!(stream.is_finished());
}

#[test]
fn scenario_5_preset_dictionary_shrinks_output_and_roundtrips() {
    let dictionary = b"the quick brown fox ";
    let input = b"the quick brown fox jumps";

    let config = StreamConfig { framing: FrameKind::Zlib, level: 6, ..Default::default() };
    let plain = compress_framed(config, input);

    let mut with_dict = DeflateStream::new(config).unwrap();
    with_dict.set_dictionary(dictionary).unwrap();
    let mut compressed = Vec::new();
    let mut scratch = [0u8; 8192];
    let mut pending_input: &[u8] = input;
    loop {
        let (consumed, produced, status) =
            with_dict.process(pending_input, &mut scratch, FlushMode::Finish);
        pending_input = &pending_input[consumed..];
        compressed.extend_from_slice(&scratch[..produced]);
        if status == Status::StreamEnd {
            break;
        }
    }
    assert!(compressed.len() < plain.len());

    let mut decoder = InflateStream::new(FrameKind::Zlib, 15).unwrap();
    let mut decompressed = Vec::new();
    let mut offset = 0;
    loop {
        let (consumed, produced, status) = decoder.process(&compressed[offset..], &mut scratch);
        offset += consumed;
        decompressed.extend_from_slice(&scratch[..produced]);
        match status {
            Status::NeedDict => decoder.set_dictionary(dictionary).unwrap(),
            Status::StreamEnd => break,
            Status::DataError(msg) => panic!("{msg}"),
            _ => {}
        }
    }
    assert_eq!(decompressed, input);
}

#[test]
fn scenario_6_interleaved_sync_flush() {
    let config = StreamConfig { framing: FrameKind::Raw, level: 6, ..Default::default() };
    let mut stream = DeflateStream::new(config).unwrap();
    let input = vec![b'q'; 1000];

    let mut scratch = [0u8; 8192];
    let (_, produced, status) = stream.process(&input, &mut scratch, FlushMode::Sync);
    assert_eq!(status, Status::Ok);
    assert_eq!(&scratch[produced - 4..produced], &[0x00, 0x00, 0xFF, 0xFF]);

    // A decoder fed only the bytes up to and including the sync marker
    // reproduces exactly the input seen so far, then stalls for more.
    let mut decoder = InflateStream::new(FrameKind::Raw, 15).unwrap();
    let mut decoded = Vec::new();
    let mut decode_scratch = [0u8; 8192];
    let (consumed, decoded_len, status) = decoder.process(&scratch[..produced], &mut decode_scratch);
    decoded.extend_from_slice(&decode_scratch[..decoded_len]);
    assert_eq!(decoded, input);
    assert_eq!(consumed, produced);
    assert_eq!(status, Status::Ok);
    assert!(!decoder.is_finished());
}

#[test]
fn boundary_empty_zlib_stream_is_eight_bytes_with_adler_one() {
    let config = StreamConfig { framing: FrameKind::Zlib, ..Default::default() };
    let compressed = compress_framed(config, b"");
    assert_eq!(compressed.len(), 8);
    assert_eq!(&compressed[4..8], &1u32.to_be_bytes());
    let (decompressed, stream) = decompress_framed(FrameKind::Zlib, &compressed);
    assert!(decompressed.is_empty());
    assert!(stream.is_finished());
}

#[test]
fn boundary_empty_gzip_stream_is_twenty_bytes() {
    let config = StreamConfig { framing: FrameKind::Gzip, ..Default::default() };
    let compressed = compress_framed(config, b"");
    assert_eq!(compressed.len(), 20);
}

#[test]
fn boundary_corrupted_gzip_crc_is_rejected_after_all_bytes_produced() {
    let config = StreamConfig { framing: FrameKind::Gzip, level: 6, ..Default::default() };
    let input = b"data to corrupt downstream";
    let mut compressed = compress_framed(config, input);
    let len = compressed.len();
    compressed[len - 8] ^= 0xFF;

    let mut stream = InflateStream::new(FrameKind::Gzip, 15).unwrap();
    let mut decoded = Vec::new();
    let mut offset = 0;
    let mut scratch = [0u8; 8192];
    let final_status = loop {
        let (consumed, produced, status) = stream.process(&compressed[offset..], &mut scratch);
        offset += consumed;
        decoded.extend_from_slice(&scratch[..produced]);
        if status == Status::StreamEnd || status.is_error() {
            break status;
        }
    };
    assert_eq!(decoded, input);
    assert!(matches!(final_status, Status::DataError(_)));
}

#[test]
fn boundary_stored_block_nlen_mismatch_is_data_error() {
    // BFINAL=1, BTYPE=00 (stored), LEN=5, NLEN left as 0 instead of !LEN.
    let data = [0x01u8, 0x05, 0x00, 0x00, 0x00, b'h', b'e', b'l', b'l', b'o'];
    let mut stream = InflateStream::new(FrameKind::Raw, 15).unwrap();
    let mut scratch = [0u8; 64];
    let (_, _, status) = stream.process(&data, &mut scratch);
    assert!(matches!(status, Status::DataError(_)));
}

#[test]
fn checksum_law_crc32_combine_matches_concatenated_computation() {
    let a = b"first chunk of data";
    let b = b"second chunk appended after it";
    let combined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();

    let crc_a = Crc32::compute(a);
    let crc_b = Crc32::compute(b);
    let combined_crc = Crc32::new().combine(crc_a, crc_b, b.len() as u64);

    assert_eq!(combined_crc, Crc32::compute(&combined));
}

#[test]
fn checksum_law_adler32_combine_matches_concatenated_computation() {
    let a = b"the quick brown fox";
    let b = b" jumps over the lazy dog";
    let combined: Vec<u8> = a.iter().chain(b.iter()).copied().collect();

    let adler_a = Adler32::checksum(a);
    let adler_b = Adler32::checksum(b);
    let combined_adler = Adler32::combine(adler_a, adler_b, b.len() as u64);

    assert_eq!(combined_adler, Adler32::checksum(&combined));
}
