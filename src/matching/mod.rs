pub mod coarse;
pub mod hough;
pub mod sequence;

use crate::config::DetectMode;
use crate::consts::{DEFAULT_TH_D, DEFAULT_TH_DC, DEFAULT_TH_DI, DEFAULT_TH_IT, DEFAULT_TH_XH};
use crate::types::StreamContext;

#[derive(Clone, Copy, Debug)]
pub struct MatchingThresholds {
  pub th_d: u32,
  pub th_dc: u32,
  pub th_xh: u32,
  pub th_di: u32,
  pub th_it: f64,
}

impl Default for MatchingThresholds {
  fn default() -> Self {
    Self {
      th_d: DEFAULT_TH_D,
      th_dc: DEFAULT_TH_DC,
      th_xh: DEFAULT_TH_XH,
      th_di: DEFAULT_TH_DI,
      th_it: DEFAULT_TH_IT,
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MatchVerdict {
  None,
  Partial,
  Whole,
}

#[derive(Clone, Debug)]
pub struct MatchingInfo {
  pub framerate_ratio: f64,
  pub offset: i32,
  pub matched_frames: u32,
  pub mean_distance: f64,
  pub seed_a: u32,
  pub seed_b: u32,
  pub whole_video: bool,
}

impl MatchingInfo {
  pub fn verdict(&self, thresholds: &MatchingThresholds) -> MatchVerdict {
    if self.matched_frames == 0 {
      MatchVerdict::None
    } else if self.whole_video {
      MatchVerdict::Whole
    } else if self.matched_frames >= thresholds.th_di.max(1) {
      MatchVerdict::Partial
    } else {
      MatchVerdict::None
    }
  }
}

fn zero_match() -> MatchingInfo {
  MatchingInfo {
    framerate_ratio: 1.0,
    offset: 0,
    matched_frames: 0,
    mean_distance: 0.0,
    seed_a: 0,
    seed_b: 0,
    whole_video: false,
  }
}

// Top-level three-stage lookup (§4.C7, C8, C9): coarse Jaccard filter,
// Hough-voted fine-signature pairing, bidirectional sequence evaluation.
// Never fails; an unmatched pair yields a zero-score sentinel. `Off`
// short-circuits to the sentinel without running any stage; `Fast` makes
// every viable candidate replace the running best outright instead of
// holding out for the smaller mean distance (§4.C9's early-replace rule).
// A whole-sequence match always terminates the search, in every mode.
pub fn lookup(a: &StreamContext, b: &StreamContext, thresholds: &MatchingThresholds, mode: DetectMode) -> MatchingInfo {
  if mode == DetectMode::Off {
    return zero_match();
  }

  let mut best = zero_match();

  for (ca, cb) in coarse::good_pairs(&a.coarse, &b.coarse, thresholds) {
    log::debug!("coarse candidate pair accepted: a={} b={}", ca, cb);
    for candidate in hough::candidates(a, b, ca, cb, thresholds) {
      let evaluated = sequence::evaluate(a, b, &candidate, thresholds);
      if evaluated.matched_frames == 0 {
        continue;
      }
      log::debug!(
        "candidate evaluated: frames={} mean_dist={:.3} whole={}",
        evaluated.matched_frames,
        evaluated.mean_distance,
        evaluated.whole_video
      );

      let replaces_best = evaluated.whole_video
        || best.matched_frames == 0
        || evaluated.mean_distance < best.mean_distance
        || mode == DetectMode::Fast;

      if replaces_best {
        let whole = evaluated.whole_video;
        best = evaluated;
        if whole {
          log::info!("whole-video match found, stopping search");
          return best;
        }
      }
    }
  }

  best
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
  fn self_match_reports_whole_video() {
    let stream = sample_stream(120);
    let thresholds = MatchingThresholds::default();
    let result = lookup(&stream, &stream, &thresholds, DetectMode::Full);
    assert_eq!(result.verdict(&thresholds), MatchVerdict::Whole);
  }

  #[test]
  fn off_mode_never_searches_and_reports_no_match() {
    let stream = sample_stream(120);
    let thresholds = MatchingThresholds::default();
    let result = lookup(&stream, &stream, &thresholds, DetectMode::Off);
    assert_eq!(result.verdict(&thresholds), MatchVerdict::None);
  }

  #[test]
  fn fast_mode_also_finds_the_whole_video_match() {
    let stream = sample_stream(120);
    let thresholds = MatchingThresholds::default();
    let result = lookup(&stream, &stream, &thresholds, DetectMode::Fast);
    assert_eq!(result.verdict(&thresholds), MatchVerdict::Whole);
  }
}
