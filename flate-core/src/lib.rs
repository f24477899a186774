//! # flate-core
//!
//! Core primitives shared by the DEFLATE/ZLIB/GZIP implementation in
//! `flate-deflate`:
//!
//! - [`bitstream`]: resumable, slice-based bit-level I/O for Huffman codes
//! - [`checksum`]: Adler-32 and parameterizable CRC-32
//! - [`window`]: circular history buffer for LZ77 back-references
//! - [`traits`]: shared `Compressor`/`Decompressor`/`FlushMode` vocabulary
//! - [`error`]: construction-time errors and the per-call `Status` enum
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │ flate-deflate                                            │
//! │     LZ77, Huffman, block driver/engine, framing, stream  │
//! ├─────────────────────────────────────────────────────────┤
//! │ flate-core (this crate)                                  │
//! │     BitReader/BitWriter, Window, checksums, Status        │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! This crate covers the bottom two layers of a typical layered archive
//! stack (bitstream/checksum/window primitives, then algorithm-specific
//! codecs in `flate-deflate`); the container and unified-multi-format-API
//! layers such a stack would add on top do not apply to a single-codec
//! crate and are not carried over.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod bitstream;
pub mod checksum;
pub mod error;
pub mod traits;
pub mod window;

pub use bitstream::{BitReader, BitWriter};
pub use checksum::{Adler32, Crc32, Crc32Params};
pub use error::{FlateError, Result, Status};
pub use traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
pub use window::Window;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::bitstream::{BitReader, BitWriter};
    pub use crate::checksum::{Adler32, Crc32};
    pub use crate::error::{FlateError, Result, Status};
    pub use crate::traits::{CompressionLevel, Compressor, Decompressor, FlushMode};
    pub use crate::window::Window;
}
