//! Parameterizable CRC-32, with the zlib/gzip LSB-first variant as the
//! default construction.
//!
//! A `Crc32Params` lets a caller-supplied reflected polynomial (or, via
//! [`Crc32Params::BZIP2`], an unreflected one) select variants outside the
//! zlib/gzip family, while keeping the slicing-by-8 technique for
//! throughput on large buffers. `combine` composes two independently
//! computed CRCs via GF(2) matrix squaring so that shard checksums can be
//! merged without re-reading data.

/// Parameters for a CRC-32 variant.
#[derive(Debug, Clone, Copy)]
pub struct Crc32Params {
    /// Reflected polynomial (LSB-first table construction) when `reflected`
    /// is true; normal-order polynomial otherwise.
    pub poly: u32,
    /// Initial register value.
    pub init: u32,
    /// Value XORed into the register before returning it to the caller.
    pub xor_out: u32,
    /// Whether input bits are processed LSB-first (the zlib/gzip/PNG convention).
    pub reflected: bool,
}

impl Crc32Params {
    /// The polynomial used by ZIP, GZIP, PNG and this crate's own framing.
    pub const ZLIB_GZIP: Self = Self {
        poly: 0xEDB8_8320,
        init: 0xFFFF_FFFF,
        xor_out: 0xFFFF_FFFF,
        reflected: true,
    };

    /// The MSB-first (unreflected) counterpart, provided so the table
    /// builder below is exercised for both bit orders even though this
    /// crate's own framing only ever uses [`Self::ZLIB_GZIP`].
    pub const BZIP2: Self = Self {
        poly: 0x04C1_1DB7,
        init: 0xFFFF_FFFF,
        xor_out: 0xFFFF_FFFF,
        reflected: false,
    };
}

fn build_table(params: Crc32Params) -> [u32; 256] {
    let mut table = [0u32; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut crc = if params.reflected {
            i as u32
        } else {
            (i as u32) << 24
        };
        for _ in 0..8 {
            if params.reflected {
                crc = if crc & 1 != 0 {
                    (crc >> 1) ^ params.poly
                } else {
                    crc >> 1
                };
            } else {
                crc = if crc & 0x8000_0000 != 0 {
                    (crc << 1) ^ params.poly
                } else {
                    crc << 1
                };
            }
        }
        *slot = crc;
    }
    table
}

fn build_slice8_tables(table0: [u32; 256], reflected: bool) -> [[u32; 256]; 8] {
    let mut tables = [[0u32; 256]; 8];
    tables[0] = table0;
    if !reflected {
        // Slicing-by-8 as implemented here assumes a reflected (LSB-first)
        // table; the MSB-first variant falls back to the byte-at-a-time path.
        return tables;
    }
    for t in 1..8 {
        for i in 0..256 {
            let prev = tables[t - 1][i];
            tables[t][i] = tables[0][(prev & 0xFF) as usize] ^ (prev >> 8);
        }
    }
    tables
}

/// Running CRC-32 calculator for a given [`Crc32Params`] variant.
#[derive(Clone)]
pub struct Crc32 {
    crc: u32,
    params: Crc32Params,
    table: [u32; 256],
    slice8: [[u32; 256]; 8],
}

impl Crc32 {
    /// Construct a calculator for an arbitrary variant.
    pub fn with_params(params: Crc32Params) -> Self {
        let table = build_table(params);
        let slice8 = build_slice8_tables(table, params.reflected);
        Self {
            crc: params.init,
            params,
            table,
            slice8,
        }
    }

    /// Construct a calculator for the zlib/gzip variant (the only one this
    /// crate's own framing needs).
    pub fn new() -> Self {
        Self::with_params(Crc32Params::ZLIB_GZIP)
    }

    /// Reset to the initial state for this variant.
    pub fn reset(&mut self) {
        self.crc = self.params.init;
    }

    /// Fold more data into the running CRC.
    pub fn update(&mut self, data: &[u8]) {
        if self.params.reflected {
            if data.len() >= 16 {
                self.update_slice8(data);
            } else {
                self.update_bytewise_reflected(data);
            }
        } else {
            self.update_bytewise_normal(data);
        }
    }

    /// Fold a single byte into the running CRC.
    #[inline]
    pub fn update_byte(&mut self, byte: u8) {
        if self.params.reflected {
            let idx = ((self.crc ^ byte as u32) & 0xFF) as usize;
            self.crc = self.table[idx] ^ (self.crc >> 8);
        } else {
            let idx = (((self.crc >> 24) ^ byte as u32) & 0xFF) as usize;
            self.crc = self.table[idx] ^ (self.crc << 8);
        }
    }

    /// Fold a run of `n` repetitions of `byte` into the running CRC.
    ///
    /// Equivalent to `n` calls to [`Self::update_byte`], but without
    /// allocating an `n`-byte buffer: a small fixed-size chunk of repeated
    /// `byte` is filled once and fed through [`Self::update`] (so runs still
    /// benefit from the slicing-by-8 path) as many times as needed to cover
    /// `n`.
    pub fn update_run(&mut self, byte: u8, n: u64) {
        const CHUNK: usize = 4096;
        if n == 0 {
            return;
        }
        let chunk_len = (n as u128).min(CHUNK as u128) as usize;
        let chunk = vec![byte; chunk_len];
        let mut remaining = n;
        while remaining > 0 {
            let take = remaining.min(chunk_len as u64) as usize;
            self.update(&chunk[..take]);
            remaining -= take as u64;
        }
    }

    #[inline]
    fn update_bytewise_reflected(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            let idx = ((crc ^ byte as u32) & 0xFF) as usize;
            crc = self.table[idx] ^ (crc >> 8);
        }
        self.crc = crc;
    }

    #[inline]
    fn update_bytewise_normal(&mut self, data: &[u8]) {
        let mut crc = self.crc;
        for &byte in data {
            let idx = (((crc >> 24) ^ byte as u32) & 0xFF) as usize;
            crc = self.table[idx] ^ (crc << 8);
        }
        self.crc = crc;
    }

    #[inline]
    fn update_slice8(&mut self, data: &[u8]) {
        let mut c = self.crc;
        let mut chunks = data.chunks_exact(8);
        for chunk in &mut chunks {
            let bytes: [u8; 8] = chunk.try_into().expect("chunks_exact(8)");
            let crc_xor = c ^ u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            let b0 = (crc_xor & 0xFF) as usize;
            let b1 = ((crc_xor >> 8) & 0xFF) as usize;
            let b2 = ((crc_xor >> 16) & 0xFF) as usize;
            let b3 = ((crc_xor >> 24) & 0xFF) as usize;
            c = self.slice8[7][b0]
                ^ self.slice8[6][b1]
                ^ self.slice8[5][b2]
                ^ self.slice8[4][b3]
                ^ self.slice8[3][bytes[4] as usize]
                ^ self.slice8[2][bytes[5] as usize]
                ^ self.slice8[1][bytes[6] as usize]
                ^ self.slice8[0][bytes[7] as usize];
        }
        self.crc = c;
        self.update_bytewise_reflected(chunks.remainder());
    }

    /// Current CRC value with the configured final XOR applied.
    pub fn value(&self) -> u32 {
        self.crc ^ self.params.xor_out
    }

    /// Compute the CRC-32 (zlib/gzip variant) of a slice in one call.
    pub fn compute(data: &[u8]) -> u32 {
        let mut crc = Self::new();
        crc.update(data);
        crc.value()
    }

    /// Combine two CRC-32 values computed over adjacent shards, given the
    /// byte length of the second shard, without re-reading either shard.
    ///
    /// Implemented via GF(2) matrix squaring over the "multiply by x, then
    /// reduce mod the generator polynomial" linear operator: applying that
    /// operator `len * 8` times to `crc1` and XORing in the data-independent
    /// contribution of `len` zero bytes reproduces the effect of having fed
    /// `crc1`'s input stream straight into `crc2`'s calculator.
    pub fn combine(&self, crc1: u32, crc2: u32, len2: u64) -> u32 {
        if len2 == 0 {
            return crc1;
        }
        // Undo crc1's init/xor_out so we operate on its raw register value.
        let mut crc1_reg = crc1 ^ self.params.xor_out ^ self.params.init;
        let op = self.shift_matrix();
        let mut n = len2 * 8;
        let mut power = op;
        while n != 0 {
            if n & 1 != 0 {
                crc1_reg = Self::gf2_matrix_times(&power, crc1_reg);
            }
            power = Self::gf2_matrix_square(&power);
            n >>= 1;
        }
        crc1_reg ^ crc2
    }

    /// The 32x32 GF(2) matrix representing "shift one zero bit through the
    /// CRC register", expressed as 32 column vectors (one `u32` per input bit).
    fn shift_matrix(&self) -> [u32; 32] {
        let mut matrix = [0u32; 32];
        // Column 0: effect of shifting in a single zero bit when bit 0 of the
        // register is set (i.e. the generator polynomial itself).
        matrix[0] = self.params.poly;
        let mut row = 1u32;
        for slot in matrix.iter_mut().skip(1) {
            *slot = row;
            row <<= 1;
        }
        matrix
    }

    fn gf2_matrix_times(matrix: &[u32; 32], vector: u32) -> u32 {
        let mut sum = 0u32;
        let mut v = vector;
        let mut i = 0;
        while v != 0 {
            if v & 1 != 0 {
                sum ^= matrix[i];
            }
            v >>= 1;
            i += 1;
        }
        sum
    }

    fn gf2_matrix_square(matrix: &[u32; 32]) -> [u32; 32] {
        let mut result = [0u32; 32];
        for (i, slot) in result.iter_mut().enumerate() {
            *slot = Self::gf2_matrix_times(matrix, matrix[i]);
        }
        result
    }
}

impl Default for Crc32 {
    fn default() -> Self {
        Self::new()
    }
}
