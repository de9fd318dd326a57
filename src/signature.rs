// C3: turn one reduced frame into a FineSignature, and roll it into the
// currently open CoarseSignature.

use crate::consts::{COARSE_SIZE, COARSE_WINDOW, FRAME_SIG_BYTES, TERNARY_PLACE, WORD_POSITIONS, WORD_SLOT_PERMUTATION};
use crate::elements::{category_ranges, Block, ELEMENTS};
use crate::reducer::ReducedFrame;
use crate::types::{CoarseSignature, FineSignature, StreamContext};

// Averages the (still precfactor/denom-scaled) grid cells covered by
// `block`. This only divides by the number of grid cells in the block;
// the per-cell pixel-area division (`denom`) stays deferred.
fn block_mean(reduced: &ReducedFrame, block: &Block) -> i64 {
  reduced.rect_sum(block.y0, block.x0, block.y1, block.x1) / block.area()
}

// Difference elements compare two block means directly: both sides carry
// the same deferred `denom` factor, so it cancels without needing to
// divide. Average elements compare against a fixed pixel value (128), so
// that constant is scaled up by `precfactor * denom` instead of dividing
// the block mean down, keeping Step B's division deferred until C3's
// confidence computation is the only place left that needs it.
fn element_value(reduced: &ReducedFrame, idx: usize) -> i64 {
  let el = &ELEMENTS[idx];
  let left = block_mean(reduced, &el.left);
  match el.right {
    Some(right) => left - block_mean(reduced, &right),
    None => left - 128 * reduced.precfactor * reduced.denom,
  }
}

fn ternarize(value: i64, threshold: i64) -> u8 {
  if value < -threshold {
    0
  } else if value > threshold {
    2
  } else {
    1
  }
}

// Runs the per-category percentile threshold, ternarizes every element,
// and derives the frame signature bytes, word values and confidence
// score in one pass over the 380 raw element values.
fn build_fine_fields(reduced: &ReducedFrame) -> ([u8; FRAME_SIG_BYTES], [u16; 5], u8) {
  let raw: Vec<i64> = (0..ELEMENTS.len()).map(|i| element_value(reduced, i)).collect();

  let mut digits = vec![0u8; raw.len()];
  let mut confidence_samples: Vec<i64> = Vec::new();

  for (start, end) in category_ranges() {
    let mut abs_sorted: Vec<i64> = raw[start..end].iter().map(|v| v.abs()).collect();
    abs_sorted.sort_unstable();
    let threshold = abs_sorted[abs_sorted.len() / 3];

    for idx in start..end {
      digits[idx] = ternarize(raw[idx], threshold);
      if !ELEMENTS[idx].av_elem {
        let divisor = (reduced.precfactor * reduced.denom).max(1);
        let scaled = (raw[idx].abs() * 8) / divisor;
        confidence_samples.push(scaled);
      }
    }
  }

  let mut framesig = [0u8; FRAME_SIG_BYTES];
  for (idx, &digit) in digits.iter().enumerate() {
    let byte_idx = idx / 5;
    let place = TERNARY_PLACE[idx % 5];
    framesig[byte_idx] += digit * place as u8;
  }

  let mut words = [0u16; 5];
  for (i, &pos) in WORD_POSITIONS.iter().enumerate() {
    let slot = WORD_SLOT_PERMUTATION[i];
    let word_idx = slot / 5;
    let place = TERNARY_PLACE[slot % 5];
    words[word_idx] += digits[pos] as u16 * place;
  }

  confidence_samples.sort_unstable();
  let confidence = if confidence_samples.is_empty() {
    0
  } else {
    confidence_samples[confidence_samples.len() / 2].min(255) as u8
  };

  (framesig, words, confidence)
}

// Opens a new COARSE_WINDOW-wide coarse signature every COARSE_SIZE fine
// signatures, staggered so that two are open at once in steady state:
// curcoarsesig1 covers [0, 89], curcoarsesig2 covers [45, 134], the next
// covers [90, 179], and so on. Whichever of the two open slots most
// recently closed takes the new signature; the other keeps accumulating.
fn roll_coarse(stream: &mut StreamContext, fine_index: u32) {
  if stream.coarsecount == 0 {
    stream.coarse.push(CoarseSignature::new(fine_index));
    let slot = stream.coarse.len() - 1;
    if stream.open_first.is_none() {
      stream.open_first = Some(slot);
    } else {
      stream.open_second = Some(slot);
    }
  }

  let fine = &stream.fine[fine_index as usize];
  let words = fine.words;
  for slot in [stream.open_first, stream.open_second].into_iter().flatten() {
    let coarse = &mut stream.coarse[slot];
    for (word, &bit) in words.iter().enumerate() {
      coarse.set_word_bit(word, bit);
    }
    coarse.last = fine_index;
  }

  if let Some(slot) = stream.open_first {
    if (fine_index - stream.coarse[slot].first + 1) as usize == COARSE_WINDOW {
      stream.open_first = None;
    }
  }
  if let Some(slot) = stream.open_second {
    if (fine_index - stream.coarse[slot].first + 1) as usize == COARSE_WINDOW {
      stream.open_second = None;
    }
  }

  stream.coarsecount += 1;
  if stream.coarsecount == COARSE_SIZE as u32 {
    stream.coarsecount = 0;
  }
}

// Computes a fine signature from a reduced frame and appends it (plus
// its contribution to the open coarse signature) to the stream.
pub fn extract_fine_signature(stream: &mut StreamContext, reduced: &ReducedFrame, pts: i64) -> u32 {
  let (framesig, words, confidence) = build_fine_fields(reduced);
  let index = stream.fine.len() as u32;

  stream.fine.push(FineSignature { index, pts, confidence, words, framesig });
  roll_coarse(stream, index);

  index
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::Plane;
  use crate::reducer::reduce;

  #[test]
  fn constant_frame_yields_neutral_digits() {
    let plane = Plane::new(320, 180);
    let reduced = reduce(&plane);
    let (framesig, words, _confidence) = build_fine_fields(&reduced);
    // A perfectly flat frame has every difference element at 0, so every
    // ternary digit is the neutral value 1: byte = 1*81+1*27+1*9+1*3+1 = 121.
    for b in framesig.iter() {
      assert_eq!(*b, 121);
    }
    for w in words.iter() {
      assert!(*w <= 242);
    }
  }

  #[test]
  fn forty_five_frames_leave_the_first_coarse_segment_still_open() {
    let mut stream = StreamContext::new(320, 180, (1, 30));
    let plane = Plane::new(320, 180);
    let reduced = reduce(&plane);
    for i in 0..45 {
      extract_fine_signature(&mut stream, &reduced, i as i64);
    }
    assert_eq!(stream.coarse.len(), 1);
    assert_eq!(stream.coarse[0].first, 0);
    assert_eq!(stream.coarse[0].last, 44);
    assert_eq!(stream.coarsecount, 0);
    assert!(stream.open_first.is_some());
  }

  #[test]
  fn forty_six_frames_opens_a_second_staggered_segment() {
    let mut stream = StreamContext::new(320, 180, (1, 30));
    let plane = Plane::new(320, 180);
    let reduced = reduce(&plane);
    for i in 0..46 {
      extract_fine_signature(&mut stream, &reduced, i as i64);
    }
    assert_eq!(stream.coarse.len(), 2);
    assert_eq!(stream.coarse[1].first, 45);
    assert_eq!(stream.coarse[1].last, 45);
    assert!(stream.open_first.is_some());
    assert!(stream.open_second.is_some());
  }

  #[test]
  fn the_first_coarse_segment_closes_after_ninety_frames_and_a_third_opens() {
    let mut stream = StreamContext::new(320, 180, (1, 30));
    let plane = Plane::new(320, 180);
    let reduced = reduce(&plane);
    for i in 0..90 {
      extract_fine_signature(&mut stream, &reduced, i as i64);
    }
    assert_eq!(stream.coarse.len(), 2);
    assert_eq!(stream.coarse[0].first, 0);
    assert_eq!(stream.coarse[0].last, 89);

    extract_fine_signature(&mut stream, &reduced, 90);
    assert_eq!(stream.coarse.len(), 3);
    assert_eq!(stream.coarse[2].first, 90);
  }

  #[test]
  fn a_frame_in_steady_state_is_covered_by_exactly_two_open_segments() {
    let mut stream = StreamContext::new(320, 180, (1, 30));
    let plane = Plane::new(320, 180);
    let reduced = reduce(&plane);
    for i in 0..200 {
      extract_fine_signature(&mut stream, &reduced, i as i64);
    }
    let covering = stream.coarse.iter().filter(|c| c.first <= 100 && 100 <= c.last).count();
    assert_eq!(covering, 2);
  }
}
