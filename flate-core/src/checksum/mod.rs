//! Checksum primitives used by the ZLIB and GZIP container trailers.

pub mod adler32;
pub mod crc32;

pub use adler32::Adler32;
pub use crc32::{Crc32, Crc32Params};
