// C9: bidirectional sequence evaluator. Walks outward from a Hough seed
// in both directions, tolerating brief runs of high-distance frames,
// and scores the resulting match.

use crate::consts::SEQUENCE_TOLERANCE;
use crate::distance::frame_signature_distance;
use crate::matching::hough::HoughSeed;
use crate::matching::{MatchingInfo, MatchingThresholds};
use crate::types::{FineSignature, StreamContext};

struct WalkResult {
  good: u32,
  attempts: u32,
  distsum: u64,
  low_conf_a: u32,
  low_conf_b: u32,
  hit_boundary: bool,
}

fn step_sizes(fcount: i64, ratio: f64) -> (i64, i64) {
  let delta = (((fcount as f64) * ratio + 0.5).floor() - (((fcount - 1) as f64) * ratio + 0.5).floor()) as i64;
  let delta = delta.max(1);
  if ratio >= 1.0 {
    (1, delta)
  } else {
    (delta, 1)
  }
}

fn walk(a: &[FineSignature], b: &[FineSignature], start_a: i64, start_b: i64, ratio: f64, forward: bool, th_xh: u32) -> WalkResult {
  let mut idx_a = start_a;
  let mut idx_b = start_b;
  let mut tol = 0u32;
  let mut res = WalkResult { good: 0, attempts: 0, distsum: 0, low_conf_a: 0, low_conf_b: 0, hit_boundary: false };
  let mut fcount = 1i64;

  loop {
    let (step_a, step_b) = step_sizes(fcount, ratio);
    let (na, nb) = if forward { (idx_a + step_a, idx_b + step_b) } else { (idx_a - step_a, idx_b - step_b) };

    if na < 0 || nb < 0 || na as usize >= a.len() || nb as usize >= b.len() {
      res.hit_boundary = true;
      return res;
    }
    idx_a = na;
    idx_b = nb;
    res.attempts += 1;

    let fa = &a[idx_a as usize];
    let fb = &b[idx_b as usize];
    let dist = frame_signature_distance(&fa.framesig, &fb.framesig);
    let reliable_disagreement = dist > th_xh && (fa.confidence >= 1 || fb.confidence >= 1);

    if !reliable_disagreement {
      res.good += 1;
      res.distsum += dist as u64;
      if fa.confidence < 1 {
        res.low_conf_a += 1;
      }
      if fb.confidence < 1 {
        res.low_conf_b += 1;
      }
      tol = 0;
    } else {
      tol += 1;
      if tol > SEQUENCE_TOLERANCE {
        res.hit_boundary = false;
        return res;
      }
    }

    fcount += 1;
  }
}

pub fn evaluate(a: &StreamContext, b: &StreamContext, seed: &HoughSeed, thresholds: &MatchingThresholds) -> MatchingInfo {
  let ratio = seed.framerate_ratio;
  let fwd = walk(&a.fine, &b.fine, seed.seed_a as i64, seed.seed_b as i64, ratio, true, thresholds.th_xh);
  let bwd = walk(&a.fine, &b.fine, seed.seed_a as i64, seed.seed_b as i64, ratio, false, thresholds.th_xh);

  let good = fwd.good + bwd.good;
  let attempts = fwd.attempts + bwd.attempts;
  let distsum = fwd.distsum + bwd.distsum;
  let low_conf_a = fwd.low_conf_a + bwd.low_conf_a;
  let low_conf_b = fwd.low_conf_b + bwd.low_conf_b;

  let empty = MatchingInfo {
    framerate_ratio: ratio,
    offset: seed.offset,
    matched_frames: 0,
    mean_distance: 0.0,
    seed_a: seed.seed_a,
    seed_b: seed.seed_b,
    whole_video: false,
  };

  if attempts == 0 {
    return empty;
  }

  let good_ratio = good as f64 / attempts as f64;
  let half_good = 0.5 * good as f64;
  let accepted = good >= thresholds.th_di
    && good_ratio >= thresholds.th_it
    && (low_conf_a as f64) <= half_good
    && (low_conf_b as f64) <= half_good;

  if !accepted {
    return empty;
  }

  // Preserves the reference algorithm's inverted mean-distance formula
  // (good-frame count over cumulative distance, not the other way
  // round) since downstream ranking depends on reproducing it exactly.
  let mean_distance = if distsum == 0 { 0.0 } else { good as f64 / distsum as f64 };

  MatchingInfo {
    framerate_ratio: ratio,
    offset: seed.offset,
    matched_frames: good,
    mean_distance,
    seed_a: seed.seed_a,
    seed_b: seed.seed_b,
    whole_video: fwd.hit_boundary && bwd.hit_boundary,
  }
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
  fn self_seed_walks_to_both_boundaries() {
    let stream = sample_stream(90);
    let thresholds = MatchingThresholds::default();
    let seed = HoughSeed { framerate_ratio: 1.0, offset: 0, seed_a: 45, seed_b: 45 };
    let result = evaluate(&stream, &stream, &seed, &thresholds);
    assert!(result.matched_frames > 0);
    assert!(result.whole_video);
  }

  #[test]
  fn zero_attempts_is_reported_as_no_match() {
    let stream = sample_stream(1);
    let thresholds = MatchingThresholds::default();
    let seed = HoughSeed { framerate_ratio: 1.0, offset: 0, seed_a: 0, seed_b: 0 };
    let result = evaluate(&stream, &stream, &seed, &thresholds);
    assert_eq!(result.matched_frames, 0);
  }
}
