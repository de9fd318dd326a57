// C5: bit-exact binary encode/decode of a StreamContext, following the
// MPEG-7-compatible single-spatial-region layout.

use crate::codec::bitio::{BitReader, BitWriter};
use crate::consts::{COARSE_SIZE, FRAME_SIG_BYTES, NUM_WORDS, WORD_BYTES};
use crate::error::{Error, Result};
use crate::types::{CoarseSignature, FineSignature, StreamContext};

pub fn encode(stream: &StreamContext) -> Vec<u8> {
  let mut w = BitWriter::new();

  w.write_bits(1, 32); // NumOfSpatialRegions
  w.write_bits(1, 1); // SpatialLocationFlag
  w.write_bits(0, 16); // PixelX1
  w.write_bits(0, 16); // PixelY1
  w.write_bits((stream.width as u64).saturating_sub(1) & 0xFFFF, 16); // PixelX2
  w.write_bits((stream.height as u64).saturating_sub(1) & 0xFFFF, 16); // PixelY2
  w.write_bits(0, 32); // StartFrameOfSpatialRegion

  let num_frames = stream.fine.len() as u64;
  w.write_bits(num_frames, 32); // NumOfFrames

  let (num, den) = stream.time_base;
  let media_time_unit = if num > 0 { (den as u64 / num as u64) & 0xFFFF } else { 0 };
  w.write_bits(media_time_unit, 16);

  w.write_bits(1, 1); // MediaTimeFlagOfSpatialRegion
  w.write_bits(0, 32); // StartMediaTimeOfSpatialRegion
  let end_media_time = stream.fine.last().map(|f| f.pts as u64).unwrap_or(0) & 0xFFFF_FFFF;
  w.write_bits(end_media_time, 32);

  w.write_bits(stream.coarse.len() as u64, 32); // NumOfSegments
  for c in &stream.coarse {
    w.write_bits(c.first as u64, 32);
    w.write_bits(c.last as u64, 32);
    w.write_bits(1, 1); // MediaTimeFlagOfSegment
    w.write_bits(stream.fine[c.first as usize].pts as u64 & 0xFFFF_FFFF, 32);
    w.write_bits(stream.fine[c.last as usize].pts as u64 & 0xFFFF_FFFF, 32);
    for word in 0..NUM_WORDS {
      w.write_bytes(&c.bags[word]);
    }
  }

  w.write_bits(0, 1); // CompressionFlag

  for f in &stream.fine {
    w.write_bits(1, 1); // MediaTimeFlagOfFrame
    w.write_bits(f.pts as u64 & 0xFFFF_FFFF, 32);
    w.write_bits(f.confidence as u64, 8);
    for &word in f.words.iter() {
      w.write_bits(word as u64, 8);
    }
    w.write_bytes(&f.framesig);
  }

  w.into_bytes()
}

pub fn decode(data: &[u8]) -> Result<StreamContext> {
  let mut r = BitReader::new(data);

  let num_regions = r.read_bits(32)?;
  if num_regions != 1 {
    return Err(Error::InvalidBinary(format!("unsupported spatial region count {}", num_regions)));
  }
  let _spatial_location_flag = r.read_bits(1)?;
  let _x1 = r.read_bits(16)?;
  let _y1 = r.read_bits(16)?;
  let x2 = r.read_bits(16)?;
  let y2 = r.read_bits(16)?;
  let _start_frame = r.read_bits(32)?;
  let num_frames = r.read_bits(32)? as usize;
  let media_time_unit = r.read_bits(16)?;
  let _media_time_flag = r.read_bits(1)?;
  let _start_media_time = r.read_bits(32)?;
  let _end_media_time = r.read_bits(32)?;

  let num_segments = r.read_bits(32)? as usize;
  if num_segments == 0 && num_frames > 0 {
    return Err(Error::InvalidBinary("no coarse segments in a non-empty stream".into()));
  }

  struct PendingSegment {
    first: u32,
    last: u32,
    bags: [[u8; WORD_BYTES]; NUM_WORDS],
  }

  let mut pending = Vec::with_capacity(num_segments);
  for _ in 0..num_segments {
    let first = r.read_bits(32)? as u32;
    let last = r.read_bits(32)? as u32;
    let _flag = r.read_bits(1)?;
    let _start_pts = r.read_bits(32)?;
    let _end_pts = r.read_bits(32)?;

    let mut bags = [[0u8; WORD_BYTES]; NUM_WORDS];
    for word in bags.iter_mut() {
      let bytes = r.read_bytes(WORD_BYTES)?;
      word.copy_from_slice(&bytes);
    }
    pending.push(PendingSegment { first, last, bags });
  }

  let _compression_flag = r.read_bits(1)?;
  if _compression_flag != 0 {
    return Err(Error::InvalidBinary("compressed signature payloads are not supported".into()));
  }

  let mut fine = Vec::with_capacity(num_frames);
  for index in 0..num_frames {
    let _flag = r.read_bits(1)?;
    let pts = r.read_bits(32)? as i64;
    let confidence = r.read_bits(8)? as u8;
    let mut words = [0u16; 5];
    for w in words.iter_mut() {
      *w = r.read_bits(8)? as u16;
    }
    let bytes = r.read_bytes(FRAME_SIG_BYTES)?;
    let mut framesig = [0u8; FRAME_SIG_BYTES];
    framesig.copy_from_slice(&bytes);
    fine.push(FineSignature { index: index as u32, pts, confidence, words, framesig });
  }
  if num_frames == 0 {
    return Err(Error::InvalidBinary("signature payload contains no frames".into()));
  }

  // Stored first/last indices are authoritative; no secondary pass over
  // timestamps is needed once every fine signature is already in hand.
  let mut coarse = Vec::with_capacity(pending.len());
  for seg in pending {
    if seg.first as usize >= fine.len() || seg.last as usize >= fine.len() {
      return Err(Error::InvalidBinary("coarse segment references an out-of-range frame".into()));
    }
    coarse.push(CoarseSignature { first: seg.first, last: seg.last, bags: seg.bags });
  }

  let time_base = if media_time_unit > 0 { (1, media_time_unit as u32) } else { (1, 1) };
  let coarsecount = (num_frames % COARSE_SIZE) as u32;

  Ok(StreamContext {
    fine,
    coarse,
    width: x2 as usize + 1,
    height: y2 as usize + 1,
    time_base,
    coarsecount,
    open_first: None,
    open_second: None,
  })
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
  fn round_trips_a_single_segment_stream() {
    let stream = sample_stream(45);
    let bytes = encode(&stream);
    let decoded = decode(&bytes).unwrap();

    assert_eq!(decoded.fine.len(), stream.fine.len());
    assert_eq!(decoded.coarse.len(), stream.coarse.len());
    for (a, b) in stream.fine.iter().zip(decoded.fine.iter()) {
      assert_eq!(a.pts, b.pts);
      assert_eq!(a.confidence, b.confidence);
      assert_eq!(a.words, b.words);
      assert_eq!(a.framesig, b.framesig);
    }
    for (a, b) in stream.coarse.iter().zip(decoded.coarse.iter()) {
      assert_eq!(a.first, b.first);
      assert_eq!(a.last, b.last);
      assert_eq!(a.bags, b.bags);
    }
  }

  #[test]
  fn forty_six_frames_encode_two_segments() {
    let stream = sample_stream(46);
    assert_eq!(stream.coarse.len(), 2);
    let bytes = encode(&stream);
    let decoded = decode(&bytes).unwrap();
    assert_eq!(decoded.coarse.len(), 2);
  }

  #[test]
  fn bit_length_matches_the_documented_formula() {
    let stream = sample_stream(45);
    let bytes = encode(&stream);
    let header_bits = 6 * 32 + 5 * 16 + 2;
    let segment_bits = 4 * 32 + 1 + 5 * 243;
    let frame_bits = 1 + 32 + 8 + 5 * 8 + FRAME_SIG_BYTES * 8;
    let total_bits = header_bits + stream.coarse.len() * segment_bits + 1 + stream.fine.len() * frame_bits;
    let expected_bytes = (total_bits + 7) / 8;
    assert_eq!(bytes.len(), expected_bytes);
  }

  #[test]
  fn decoding_garbage_fails_cleanly() {
    let bytes = vec![0u8; 4];
    assert!(decode(&bytes).is_err());
  }

  #[test]
  fn idempotent_import_is_byte_identical_on_a_second_round_trip() {
    let stream = sample_stream(90);
    let once = encode(&stream);
    let decoded = decode(&once).unwrap();
    let twice = encode(&decoded);
    assert_eq!(once, twice);
  }
}
