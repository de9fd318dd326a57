// C2: reduce an arbitrary-size luma frame down to a 32x32 grid of block
// means, then to that grid's summed-area table, so C3 can answer any
// rectangle-sum query over the grid in O(1).

use crate::array2d::Array2D;
use crate::consts::{BLOCK_GRID, BLOCK_LCM, DIVIDE_PRECISION};
use crate::frame::Plane;

pub struct ReducedFrame {
  // Summed-area table over the 32x32 block grid: sat[y][x] is the sum of
  // all grid cells in rows 0..=y and columns 0..=x.
  pub sat: Array2D<i64>,
  // Scale applied to every grid cell so per-block sums stay exact in i64
  // arithmetic.
  pub precfactor: i64,
  // Pixel area each grid cell still needs to be divided by to become a
  // true per-pixel mean, deferred here rather than applied per cell (Step
  // B). 1 when `divide` is true, since that path already divides exactly
  // per block at build time.
  pub denom: i64,
  pub divide: bool,
}

impl ReducedFrame {
  // Sum of grid cells in the rectangle [y0, y1] x [x0, x1], inclusive on
  // both ends, using the summed-area table.
  pub fn rect_sum(&self, y0: usize, x0: usize, y1: usize, x1: usize) -> i64 {
    let a = self.sat[y1][x1];
    let b = if y0 > 0 { self.sat[y0 - 1][x1] } else { 0 };
    let c = if x0 > 0 { self.sat[y1][x0 - 1] } else { 0 };
    let d = if y0 > 0 && x0 > 0 { self.sat[y0 - 1][x0 - 1] } else { 0 };
    a - b - c + d
  }
}

// Mirrors the overflow guard from the reference algorithm: once the
// product of possible block-area factors would overflow a 64-bit
// accumulator scaled by BLOCK_LCM and the maximum pixel value, fall back
// to fixed-point division instead of deferring it via precfactor.
pub fn needs_divide(width: usize, height: usize) -> bool {
  let w = (width / BLOCK_GRID) as i64;
  let h = (height / BLOCK_GRID) as i64;
  let lhs = w.saturating_mul(w + 1).saturating_mul(h.saturating_mul(h) + 1);
  let rhs = i64::MAX / (BLOCK_LCM * 255);
  lhs > rhs
}

fn build_integral_image(plane: &Plane) -> Array2D<i64> {
  let (w, h) = (plane.width, plane.height);
  let mut ii = Array2D::<i64>::zeroed(h + 1, w + 1);
  for y in 0..h {
    let row = &plane.data[y * plane.stride..y * plane.stride + w];
    for x in 0..w {
      ii[y + 1][x + 1] = row[x] as i64 + ii[y][x + 1] + ii[y + 1][x] - ii[y][x];
    }
  }
  ii
}

fn block_bounds(grid_index: usize, extent: usize) -> (usize, usize) {
  let start = grid_index * extent / BLOCK_GRID;
  let mut end = (grid_index + 1) * extent / BLOCK_GRID;
  if end <= start {
    end = (start + 1).min(extent);
  }
  (start, end)
}

// A uniform nominal block size is only exact when the plane is at least
// as large as the grid in both dimensions; smaller planes fall back to
// the immediate-division path regardless of `needs_divide`.
fn uniform_block_size(width: usize, height: usize) -> Option<(usize, usize)> {
  let bw = width / BLOCK_GRID;
  let bh = height / BLOCK_GRID;
  if bw >= 1 && bh >= 1 {
    Some((bw, bh))
  } else {
    None
  }
}

pub fn reduce(plane: &Plane) -> ReducedFrame {
  let uniform = uniform_block_size(plane.width, plane.height);
  let divide = needs_divide(plane.width, plane.height) || uniform.is_none();
  let precfactor = if divide { DIVIDE_PRECISION } else { BLOCK_LCM };

  let ii = build_integral_image(plane);
  let mut grid = Array2D::<i64>::zeroed(BLOCK_GRID, BLOCK_GRID);
  let mut denom = 1i64;

  if divide {
    for i in 0..BLOCK_GRID {
      let (y0, y1) = block_bounds(i, plane.height);
      for j in 0..BLOCK_GRID {
        let (x0, x1) = block_bounds(j, plane.width);
        let area = ((y1 - y0) * (x1 - x0)).max(1) as i64;
        // Block sum via the full-resolution integral image, divided
        // immediately per block since `divide` forces exact per-block
        // division to avoid overflow.
        let s = ii[y1][x1] - ii[y0][x1] - ii[y1][x0] + ii[y0][x0];
        grid[i][j] = (s * precfactor) / area;
      }
    }
  } else {
    let (bw, bh) = uniform.unwrap();
    denom = (bw * bh) as i64;
    for i in 0..BLOCK_GRID {
      let y0 = i * bh;
      let y1 = y0 + bh;
      for j in 0..BLOCK_GRID {
        let x0 = j * bw;
        let x1 = x0 + bw;
        // Raw block sum, scaled by precfactor but not yet divided by the
        // nominal block area: division is deferred to the consumer (C3),
        // which divides once by `precfactor * denom` instead of dividing
        // every grid cell here.
        let s = ii[y1][x1] - ii[y0][x1] - ii[y1][x0] + ii[y0][x0];
        grid[i][j] = s * precfactor;
      }
    }
  }

  let mut sat = Array2D::<i64>::zeroed(BLOCK_GRID, BLOCK_GRID);
  for i in 0..BLOCK_GRID {
    for j in 0..BLOCK_GRID {
      let up = if i > 0 { sat[i - 1][j] } else { 0 };
      let left = if j > 0 { sat[i][j - 1] } else { 0 };
      let diag = if i > 0 && j > 0 { sat[i - 1][j - 1] } else { 0 };
      sat[i][j] = grid[i][j] + up + left - diag;
    }
  }

  ReducedFrame { sat, precfactor, denom, divide }
}
