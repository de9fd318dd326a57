// C8: fine L1-distance pair generation and Hough voting in
// (framerate-ratio, offset) space.

use crate::consts::{COARSE_WINDOW, HOUGH_CANDIDATE_RATIO, HOUGH_FRAMERATE_BINS, HOUGH_MAX_OFFSET, HOUGH_OFFSET_BINS};
use crate::distance::frame_signature_distance;
use crate::matching::MatchingThresholds;
use crate::types::StreamContext;

#[derive(Clone, Copy, Debug)]
pub struct HoughSeed {
  pub framerate_ratio: f64,
  pub offset: i32,
  pub seed_a: u32,
  pub seed_b: u32,
}

#[derive(Clone, Copy, Debug, Default)]
struct HoughCell {
  count: u32,
  best_dist: u32,
  seed_a: u32,
  seed_b: u32,
}

// Every fine signature in A's window, paired with the locally-indexed
// positions in B's window that minimize its L1 distance (subject to the
// per-frame threshold).
fn nearest_pairs(a: &[crate::types::FineSignature], b: &[crate::types::FineSignature], th_xh: u32) -> Vec<Vec<(usize, u32)>> {
  a.iter()
    .map(|fa| {
      let mut best_dist = u32::MAX;
      let mut ties = Vec::new();
      for (j, fb) in b.iter().enumerate() {
        let d = frame_signature_distance(&fa.framesig, &fb.framesig);
        if d >= th_xh {
          continue;
        }
        if d < best_dist {
          best_dist = d;
          ties.clear();
          ties.push((j, d));
        } else if d == best_dist {
          ties.push((j, d));
        }
      }
      ties
    })
    .collect()
}

pub fn candidates(
  a: &StreamContext,
  b: &StreamContext,
  ca_idx: usize,
  cb_idx: usize,
  thresholds: &MatchingThresholds,
) -> Vec<HoughSeed> {
  let window = COARSE_WINDOW;
  let anchor_a = a.coarse[ca_idx].first as usize;
  let anchor_b = b.coarse[cb_idx].first as usize;

  let a_end = (anchor_a + window).min(a.fine.len());
  let b_end = (anchor_b + window).min(b.fine.len());
  if anchor_a >= a_end || anchor_b >= b_end {
    return Vec::new();
  }
  let a_slice = &a.fine[anchor_a..a_end];
  let b_slice = &b.fine[anchor_b..b_end];

  let pairs = nearest_pairs(a_slice, b_slice, thresholds.th_xh);

  let mut table = vec![vec![HoughCell::default(); HOUGH_OFFSET_BINS]; HOUGH_FRAMERATE_BINS];
  let mut max_count = 0u32;

  for i in 0..a_slice.len() {
    for &(j, dist_ij) in &pairs[i] {
      for k in (i + 1)..a_slice.len() {
        for &(l, dist_kl) in &pairs[k] {
          if l == j {
            continue;
          }
          let slope = (l as f64 - j as f64) / (k as f64 - i as f64);
          let framerate = (slope * 30.0 + 0.5).floor() as i32;
          if framerate < 1 || framerate > HOUGH_FRAMERATE_BINS as i32 {
            continue;
          }
          let offset = j as i32 - (slope * i as f64 + 0.5).floor() as i32;
          if offset < -HOUGH_MAX_OFFSET || offset > HOUGH_MAX_OFFSET {
            continue;
          }

          let bin_fr = (framerate - 1) as usize;
          let bin_off = (offset + HOUGH_MAX_OFFSET) as usize;
          let cell = &mut table[bin_fr][bin_off];
          cell.count += 1;
          max_count = max_count.max(cell.count);
          let better = dist_ij.min(dist_kl);
          if cell.count == 1 || better < cell.best_dist {
            cell.best_dist = better;
            cell.seed_a = (anchor_a + i) as u32;
            cell.seed_b = (anchor_b + j) as u32;
          }
        }
      }
    }
  }

  if max_count == 0 {
    return Vec::new();
  }

  let limit = HOUGH_CANDIDATE_RATIO * max_count as f64;
  let mut out = Vec::new();
  for (bin_fr, row) in table.iter().enumerate() {
    for (bin_off, cell) in row.iter().enumerate() {
      if cell.count as f64 > limit {
        out.push(HoughSeed {
          framerate_ratio: (bin_fr + 1) as f64 / 30.0,
          offset: bin_off as i32 - HOUGH_MAX_OFFSET,
          seed_a: cell.seed_a,
          seed_b: cell.seed_b,
        });
      }
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::extractor::Extractor;
  use crate::frame::Frame;

  fn sample_stream(frames: usize) -> StreamContext {
    let mut extractor = Extractor::new(320, 180, (1, 30));
    for i in 0..frames {
      let frame = Frame::new(320, 180);
      extractor.push_frame(&frame, i as i64);
    }
    extractor.finish()
  }

  #[test]
  fn identical_streams_vote_for_unity_framerate() {
    let stream = sample_stream(120);
    let thresholds = MatchingThresholds::default();
    let seeds = candidates(&stream, &stream, 0, 0, &thresholds);
    assert!(!seeds.is_empty());
    assert!(seeds.iter().any(|s| (s.framerate_ratio - 1.0).abs() < 1e-6));
  }
}
