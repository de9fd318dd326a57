// The external element descriptor: a fixed table describing how each of
// the 380 ternary elements of a fine signature is computed from the
// 32x32 reduced block grid produced by `reducer`.
//
// The literal MPEG-7 block coordinates are not part of this pack (the
// upstream `signature.h` table was filtered out of the retrieval set), so
// this module supplies a deterministic stand-in with the same shape: 380
// elements split across fixed-size categories, each element's blocks
// confined to the 32x32 grid, "difference" categories comparing a left
// block against a right block and "average" categories comparing a
// single block against the constant mid-grey value 128. See DESIGN.md.

use once_cell::sync::Lazy;

use crate::consts::{BLOCK_GRID, NUM_ELEMENTS};

#[derive(Clone, Copy, Debug)]
pub struct Block {
  pub y0: usize,
  pub x0: usize,
  pub y1: usize,
  pub x1: usize,
}

impl Block {
  pub fn area(&self) -> i64 {
    ((self.y1 - self.y0 + 1) * (self.x1 - self.x0 + 1)) as i64
  }
}

#[derive(Clone, Debug)]
pub struct ElementDescriptor {
  pub category: usize,
  // Whether this element is compared against the constant 128 (true) or
  // against a second ("right") block (false).
  pub av_elem: bool,
  pub left: Block,
  pub right: Option<Block>,
}

// Sizes of the 20 categories in flattening order: one single-element
// average category followed by 19 difference categories. Sums to
// NUM_ELEMENTS (380).
const CATEGORY_SIZES: [usize; 20] = [
  1, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 20, 19,
];

fn block_at(seed: usize, scale: usize) -> Block {
  let y0 = seed % BLOCK_GRID;
  let x0 = (seed / BLOCK_GRID + seed) % BLOCK_GRID;
  let y1 = (y0 + scale - 1).min(BLOCK_GRID - 1);
  let x1 = (x0 + scale - 1).min(BLOCK_GRID - 1);
  Block { y0, x0, y1, x1 }
}

fn build_elements() -> Vec<ElementDescriptor> {
  let mut out = Vec::with_capacity(NUM_ELEMENTS);

  for (category, &size) in CATEGORY_SIZES.iter().enumerate() {
    let av_elem = category == 0;
    // Block extent grows slowly with category so later categories look
    // at coarser regions than earlier ones, giving the descriptor some
    // multi-scale character without needing literal reference data.
    let scale = 1 + (category % 6);

    for e in 0..size {
      let seed = category * 131 + e * 7;
      let left = block_at(seed, scale);
      let right = if av_elem {
        None
      } else {
        Some(block_at(seed + 977, scale))
      };
      out.push(ElementDescriptor { category, av_elem, left, right });
    }
  }

  debug_assert_eq!(out.len(), NUM_ELEMENTS);
  out
}

pub static ELEMENTS: Lazy<Vec<ElementDescriptor>> = Lazy::new(build_elements);

// Start index (inclusive) of each category within the flattened element
// list, used to ternarize one category at a time.
pub fn category_ranges() -> Vec<(usize, usize)> {
  let mut ranges = Vec::with_capacity(CATEGORY_SIZES.len());
  let mut start = 0;
  for &size in CATEGORY_SIZES.iter() {
    ranges.push((start, start + size));
    start += size;
  }
  ranges
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn total_element_count_is_380() {
    assert_eq!(ELEMENTS.len(), NUM_ELEMENTS);
  }

  #[test]
  fn all_blocks_are_within_grid() {
    for el in ELEMENTS.iter() {
      assert!(el.left.y1 < BLOCK_GRID && el.left.x1 < BLOCK_GRID);
      assert!(el.left.y0 <= el.left.y1 && el.left.x0 <= el.left.x1);
      if let Some(r) = el.right {
        assert!(r.y1 < BLOCK_GRID && r.x1 < BLOCK_GRID);
        assert!(r.y0 <= r.y1 && r.x0 <= r.x1);
      }
    }
  }

  #[test]
  fn category_ranges_cover_all_elements_once() {
    let ranges = category_ranges();
    assert_eq!(ranges.first().unwrap().0, 0);
    assert_eq!(ranges.last().unwrap().1, NUM_ELEMENTS);
    for w in ranges.windows(2) {
      assert_eq!(w[0].1, w[1].0);
    }
  }
}
