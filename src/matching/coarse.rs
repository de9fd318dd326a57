// C7: coarse Jaccard-distance candidate pair iterator.

use crate::distance::jaccard_word_value;
use crate::matching::MatchingThresholds;
use crate::types::CoarseSignature;

// Every word's Jaccard value is 0 or 1 (see `jaccard_word_value`), so with
// the reference thresholds (th_d=9000, th_dc=60000) neither condition can
// ever trip -- the coarse filter degenerates to "always accept". That is
// inherited from the reference algorithm rather than fixed here: §4.C7
// defines the formula this way and callers are expected to size th_d/th_dc
// to the 0..5 range if they actually want the filter to reject pairs.
fn is_good_pair(a: &CoarseSignature, b: &CoarseSignature, thresholds: &MatchingThresholds) -> bool {
  let mut violations = 0u32;
  let mut sum = 0u64;

  for w in 0..5 {
    let j = jaccard_word_value(&a.bags[w], &b.bags[w]);
    if j >= thresholds.th_d {
      violations += 1;
    }
    sum += j as u64;
  }

  violations <= 2 && sum <= thresholds.th_dc as u64
}

// Cross-product iterator over (index into `a`, index into `b`) pairs
// whose coarse bit-vectors pass the Jaccard-distance acceptance test.
pub fn good_pairs<'a>(
  a: &'a [CoarseSignature],
  b: &'a [CoarseSignature],
  thresholds: &'a MatchingThresholds,
) -> impl Iterator<Item = (usize, usize)> + 'a {
  a.iter().enumerate().flat_map(move |(ia, ca)| {
    b.iter().enumerate().filter_map(move |(ib, cb)| is_good_pair(ca, cb, thresholds).then_some((ia, ib)))
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::consts::NUM_WORDS;

  fn coarse_with_bit(bit: usize) -> CoarseSignature {
    let mut c = CoarseSignature::new(0);
    for w in 0..NUM_WORDS {
      c.set_word_bit(w, bit as u16);
    }
    c
  }

  #[test]
  fn default_thresholds_accept_every_pair_identical_or_disjoint() {
    // th_d=9000, th_dc=60000 against a quantity that only ever takes the
    // value 0 or 1: neither condition can trip, so every pair passes.
    let a = coarse_with_bit(10);
    let b = coarse_with_bit(200);
    let thresholds = MatchingThresholds::default();
    assert!(is_good_pair(&a, &a, &thresholds));
    assert!(is_good_pair(&a, &b, &thresholds));
  }

  #[test]
  fn tightened_thresholds_reject_bags_identical_in_every_word() {
    let a = coarse_with_bit(10);
    let thresholds = MatchingThresholds { th_d: 1, th_dc: 4, ..MatchingThresholds::default() };
    assert!(!is_good_pair(&a, &a, &thresholds));
  }

  #[test]
  fn tightened_thresholds_accept_bags_disjoint_in_every_word() {
    let a = coarse_with_bit(10);
    let b = coarse_with_bit(200);
    let thresholds = MatchingThresholds { th_d: 1, th_dc: 4, ..MatchingThresholds::default() };
    assert!(is_good_pair(&a, &b, &thresholds));
  }

  #[test]
  fn good_pairs_enumerates_the_full_cross_product_when_all_match() {
    let a = vec![coarse_with_bit(1), coarse_with_bit(1)];
    let b = vec![coarse_with_bit(1), coarse_with_bit(1), coarse_with_bit(1)];
    let thresholds = MatchingThresholds::default();
    let pairs: Vec<_> = good_pairs(&a, &b, &thresholds).collect();
    assert_eq!(pairs.len(), 6);
  }
}
