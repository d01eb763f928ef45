//! Bag-of-cells serialization
//!
//! Single root, no index, no CRC32C. Identical subtrees are stored once and
//! every cell precedes the cells it references.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tonvanity_crypto::encoding::base64_encode;

use crate::cell::Cell;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// Serialize a cell tree to BOC bytes
pub fn to_boc(root: &Arc<Cell>) -> Vec<u8> {
    let order = topological_order(root);
    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, cell)| (*cell.hash(), i))
        .collect();

    let ref_size = byte_width(order.len() as u64);

    let mut cells_blob = Vec::new();
    for cell in &order {
        cells_blob.extend_from_slice(&cell.descriptors());
        cells_blob.extend_from_slice(&cell.padded_data());
        for child in cell.refs() {
            let child_index = index.get(child.hash()).copied().unwrap_or_default();
            push_be(&mut cells_blob, child_index as u64, ref_size);
        }
    }

    let offset_size = byte_width(cells_blob.len() as u64);

    let mut out = Vec::with_capacity(16 + cells_blob.len());
    out.extend_from_slice(&BOC_MAGIC);
    // has_idx = 0, has_crc32c = 0, has_cache_bits = 0, flags = 0, size
    out.push(ref_size as u8);
    out.push(offset_size as u8);
    push_be(&mut out, order.len() as u64, ref_size); // cells
    push_be(&mut out, 1, ref_size); // roots
    push_be(&mut out, 0, ref_size); // absent
    push_be(&mut out, cells_blob.len() as u64, offset_size);
    push_be(&mut out, 0, ref_size); // root index
    out.extend_from_slice(&cells_blob);
    out
}

/// Serialize a cell tree to base64 BOC
pub fn to_boc_base64(root: &Arc<Cell>) -> String {
    base64_encode(&to_boc(root))
}

/// Reverse post-order over the DAG: parents before children, root first
fn topological_order(root: &Arc<Cell>) -> Vec<Arc<Cell>> {
    fn visit(cell: &Arc<Cell>, seen: &mut HashSet<[u8; 32]>, post: &mut Vec<Arc<Cell>>) {
        if !seen.insert(*cell.hash()) {
            return;
        }
        for child in cell.refs() {
            visit(child, seen, post);
        }
        post.push(cell.clone());
    }

    let mut seen = HashSet::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

fn byte_width(value: u64) -> usize {
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(8).max(1)
}

fn push_be(out: &mut Vec<u8>, value: u64, width: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - width..]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::CellBuilder;

    #[test]
    fn test_empty_cell_boc() {
        let cell = Arc::new(CellBuilder::new().build());
        assert_eq!(to_boc_base64(&cell), "te6ccgEBAQEAAgAAAA==");
    }

    #[test]
    fn test_shared_child_stored_once() {
        let leaf = Arc::new(Cell::leaf(&[0xAB]).unwrap());
        let mut root = CellBuilder::new();
        root.store_ref(leaf.clone()).unwrap().store_ref(leaf).unwrap();
        let boc = to_boc(&Arc::new(root.build()));

        // header(4+2+1+1+1+1+1) + root(2 + 2 refs) + leaf(2 + 1)
        assert_eq!(&boc[..4], &BOC_MAGIC);
        assert_eq!(boc[6], 2, "two distinct cells");
        assert_eq!(&boc[11..], &[0x02, 0x00, 0x01, 0x01, 0x00, 0x02, 0xAB]);
    }

    #[test]
    fn test_byte_width() {
        assert_eq!(byte_width(0), 1);
        assert_eq!(byte_width(255), 1);
        assert_eq!(byte_width(256), 2);
    }
}
