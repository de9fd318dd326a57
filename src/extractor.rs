// Top-level per-frame orchestration: feed a video frame into the
// reducer (C2) and signature computer (C3), advancing a stream.

use crate::frame::Frame;
use crate::reducer::reduce;
use crate::signature::extract_fine_signature;
use crate::types::StreamContext;

pub struct Extractor {
  pub stream: StreamContext,
}

impl Extractor {
  pub fn new(width: usize, height: usize, time_base: (u32, u32)) -> Self {
    Self { stream: StreamContext::new(width, height, time_base) }
  }

  // Only the luma plane crosses into the signature core; chroma is
  // ignored, matching the single-channel basis of the element table.
  pub fn push_frame(&mut self, frame: &Frame, pts: i64) -> u32 {
    let reduced = reduce(frame.y());
    let index = extract_fine_signature(&mut self.stream, &reduced, pts);
    log::trace!(
      "extracted fine signature {} (pts={}, confidence={})",
      index,
      pts,
      self.stream.fine[index as usize].confidence
    );
    index
  }

  pub fn finish(self) -> StreamContext {
    self.stream
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::frame::Frame;

  #[test]
  fn pushing_frames_grows_the_stream_in_order() {
    let mut extractor = Extractor::new(320, 180, (1, 30));
    for i in 0..10 {
      let frame = Frame::new(320, 180);
      let idx = extractor.push_frame(&frame, i as i64);
      assert_eq!(idx, i as u32);
    }
    let stream = extractor.finish();
    assert_eq!(stream.fine.len(), 10);
  }
}
