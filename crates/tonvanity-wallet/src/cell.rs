//! TON cells: bit-string builder and representation hashing
//!
//! Only ordinary (non-exotic, level 0) cells are produced. The representation
//! hash is `sha256(d1 ‖ d2 ‖ padded data ‖ child depths ‖ child hashes)`.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;
use tonvanity_crypto::hash::sha256_parts;
use tonvanity_crypto::hex;

/// Maximum data bits in one cell
pub const MAX_BITS: usize = 1023;
/// Maximum references in one cell
pub const MAX_REFS: usize = 4;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CellError {
    #[error("Cell data overflow: {0} bits exceeds {MAX}", MAX = MAX_BITS)]
    BitOverflow(usize),
    #[error("Cell reference overflow (max {MAX})", MAX = MAX_REFS)]
    RefOverflow,
    #[error("Value {value} does not fit in {bits} bits")]
    ValueTooWide { value: u64, bits: usize },
}

/// An immutable cell with its hash and depth computed at build time
#[derive(Clone, PartialEq, Eq)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    /// A childless cell holding `bytes` as its data
    pub fn leaf(bytes: &[u8]) -> Result<Self, CellError> {
        let mut builder = CellBuilder::new();
        builder.store_bytes(bytes)?;
        Ok(builder.build())
    }

    /// Representation hash
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Longest path to a leaf (0 for a leaf)
    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn refs(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    /// Refs descriptor and bits descriptor
    pub fn descriptors(&self) -> [u8; 2] {
        let d1 = self.refs.len() as u8;
        let d2 = (self.bit_len / 8 + self.bit_len.div_ceil(8)) as u8;
        [d1, d2]
    }

    /// Data completed with a `1` marker bit when not byte aligned
    pub fn padded_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        let rem = self.bit_len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 1 << (7 - rem);
            }
        }
        data
    }

    fn finish(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        let mut cell = Cell {
            data,
            bit_len,
            refs,
            hash: [0u8; 32],
            depth: 0,
        };

        cell.depth = cell
            .refs
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or(0);

        let descriptors = cell.descriptors();
        let padded = cell.padded_data();
        let depths: Vec<[u8; 2]> = cell.refs.iter().map(|r| r.depth.to_be_bytes()).collect();

        let mut parts: Vec<&[u8]> = Vec::with_capacity(2 + 2 * cell.refs.len());
        parts.push(&descriptors);
        parts.push(&padded);
        parts.extend(depths.iter().map(|d| d.as_slice()));
        parts.extend(cell.refs.iter().map(|r| r.hash.as_slice()));
        cell.hash = sha256_parts(&parts);

        cell
    }
}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("refs", &self.refs.len())
            .field("hash", &hex::encode(self.hash))
            .finish()
    }
}

/// Append-only builder for a single cell
#[derive(Debug, Default, Clone)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bits stored so far
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    fn reserve_bits(&self, bits: usize) -> Result<(), CellError> {
        let total = self.bit_len + bits;
        if total > MAX_BITS {
            return Err(CellError::BitOverflow(total));
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        let offset = self.bit_len % 8;
        if offset == 0 {
            self.data.push(0);
        }
        if bit {
            if let Some(last) = self.data.last_mut() {
                *last |= 1 << (7 - offset);
            }
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.reserve_bits(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store the low `bits` bits of `value`, most significant first
    pub fn store_uint(&mut self, value: u64, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 64 || (bits < 64 && value >> bits != 0) {
            return Err(CellError::ValueTooWide { value, bits });
        }
        self.reserve_bits(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.reserve_bits(bytes.len() * 8)?;
        if self.bit_len % 8 == 0 {
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            for byte in bytes {
                for i in (0..8).rev() {
                    self.push_bit((byte >> i) & 1 == 1);
                }
            }
        }
        Ok(self)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// `Maybe ^Cell`: a presence bit, then the reference if present
    pub fn store_maybe_ref(&mut self, cell: Option<Arc<Cell>>) -> Result<&mut Self, CellError> {
        match cell {
            Some(cell) => {
                if self.refs.len() >= MAX_REFS {
                    return Err(CellError::RefOverflow);
                }
                self.store_bit(true)?;
                self.store_ref(cell)
            }
            None => self.store_bit(false),
        }
    }

    pub fn build(self) -> Cell {
        Cell::finish(self.data, self.bit_len, self.refs)
    }
}
