//! # flate-deflate
//!
//! A DEFLATE (RFC 1951) implementation with ZLIB (RFC 1950) and GZIP
//! (RFC 1952) container framing, built on the bit I/O, checksum, and window
//! primitives in `flate-core`.
//!
//! - [`lz77`]: hash-chain match finder, level/strategy configuration
//! - [`huffman`]: length-limited canonical Huffman code construction and
//!   two-level decode tables
//! - [`tables`]: static RFC 1951 fixed codes and length/distance code tables
//! - [`deflate`]: resumable compressor (stored/fixed/dynamic block driver)
//! - [`inflate`]: resumable decompressor (block-header/body FSM)
//! - [`framing`]: ZLIB/GZIP header and trailer construction and parsing
//! - [`stream`]: the single byte-level `process()` facade tying the above
//!   together into a full compressor/decompressor pair
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ stream (DeflateStream / InflateStream)                   │
//! ├───────────────────────────────┬───────────────────────────┤
//! │ deflate / inflate (block FSM) │ framing (ZLIB/GZIP)         │
//! ├───────────────────────────────┴───────────────────────────┤
//! │ lz77, huffman, tables                                      │
//! ├─────────────────────────────────────────────────────────┤
//! │ flate-core: BitReader/BitWriter, Window, checksums         │
//! └─────────────────────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod deflate;
pub mod framing;
pub mod huffman;
pub mod inflate;
pub mod lz77;
pub mod stream;
pub mod tables;

pub use deflate::{Deflater, deflate};
pub use framing::{FrameChecksum, FrameKind, GzipMetadata};
pub use inflate::{Inflater, inflate};
pub use lz77::{Flavor, Lz77Encoder, Lz77Token, Strategy};
pub use stream::{DeflateStream, InflateStream, StreamConfig};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::deflate::{Deflater, deflate};
    pub use crate::framing::{FrameChecksum, FrameKind, GzipMetadata};
    pub use crate::inflate::{Inflater, inflate};
    pub use crate::lz77::{Flavor, Lz77Encoder, Lz77Token, Strategy};
    pub use crate::stream::{DeflateStream, InflateStream, StreamConfig};
    pub use flate_core::prelude::*;
}
