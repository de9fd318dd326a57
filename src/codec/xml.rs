// C6: textual MPEG-7 serialization of a StreamContext.

use std::io::Cursor;

use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use crate::consts::NUM_ELEMENTS;
use crate::error::{Error, Result};
use crate::types::{CoarseSignature, FineSignature, StreamContext};

fn write_text_elem<W: std::io::Write>(w: &mut Writer<W>, name: &str, text: &str) -> Result<()> {
  w.write_event(Event::Start(BytesStart::new(name))).map_err(xml_err)?;
  w.write_event(Event::Text(BytesText::new(text))).map_err(xml_err)?;
  w.write_event(Event::End(BytesEnd::new(name))).map_err(xml_err)?;
  Ok(())
}

fn xml_err(e: impl std::fmt::Display) -> Error {
  Error::InvalidXml(e.to_string())
}

fn bag_of_words_text(bag: &[u8]) -> String {
  let mut bits = Vec::with_capacity(243);
  for byte_idx in 0..31 {
    let limit = if byte_idx == 30 { 3 } else { 8 };
    for b in 0..limit {
      let bit = (bag[byte_idx] >> (7 - b)) & 1;
      bits.push(bit.to_string());
    }
  }
  bits.join("  ")
}

fn frame_signature_text(framesig: &[u8]) -> String {
  let mut digits = Vec::with_capacity(NUM_ELEMENTS);
  for &byte in framesig {
    let mut v = byte;
    for place in [81u8, 27, 9, 3, 1] {
      digits.push((v / place).to_string());
      v %= place;
    }
  }
  digits.join(" ")
}

pub fn encode(stream: &StreamContext) -> Result<String> {
  let mut w = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

  w.write_event(Event::Start(BytesStart::new("DescriptorCollectionType"))).map_err(xml_err)?;
  w.write_event(Event::Start(BytesStart::new("VideoSignatureType"))).map_err(xml_err)?;

  let mut region = BytesStart::new("VideoSignatureRegion");
  region.push_attribute(("width", stream.width.to_string().as_str()));
  region.push_attribute(("height", stream.height.to_string().as_str()));
  w.write_event(Event::Start(region)).map_err(xml_err)?;

  for c in &stream.coarse {
    write_coarse_segment(&mut w, stream, c)?;
  }
  for f in &stream.fine {
    write_fine_frame(&mut w, f)?;
  }

  w.write_event(Event::End(BytesEnd::new("VideoSignatureRegion"))).map_err(xml_err)?;
  w.write_event(Event::End(BytesEnd::new("VideoSignatureType"))).map_err(xml_err)?;
  w.write_event(Event::End(BytesEnd::new("DescriptorCollectionType"))).map_err(xml_err)?;

  let bytes = w.into_inner().into_inner();
  String::from_utf8(bytes).map_err(|e| Error::InvalidXml(e.to_string()))
}

fn write_coarse_segment<W: std::io::Write>(w: &mut Writer<W>, stream: &StreamContext, c: &CoarseSignature) -> Result<()> {
  w.write_event(Event::Start(BytesStart::new("VSVideoSegment"))).map_err(xml_err)?;
  write_text_elem(w, "StartFrameOfSegment", &c.first.to_string())?;
  write_text_elem(w, "EndFrameOfSegment", &c.last.to_string())?;
  write_text_elem(w, "StartMediaTimeOfSegment", &stream.fine[c.first as usize].pts.to_string())?;
  write_text_elem(w, "EndMediaTimeOfSegment", &stream.fine[c.last as usize].pts.to_string())?;
  for bag in c.bags.iter() {
    write_text_elem(w, "BagOfWords", &bag_of_words_text(bag))?;
  }
  w.write_event(Event::End(BytesEnd::new("VSVideoSegment"))).map_err(xml_err)?;
  Ok(())
}

fn write_fine_frame<W: std::io::Write>(w: &mut Writer<W>, f: &FineSignature) -> Result<()> {
  w.write_event(Event::Start(BytesStart::new("VideoFrame"))).map_err(xml_err)?;
  write_text_elem(w, "MediaTimeOfFrame", &f.pts.to_string())?;
  write_text_elem(w, "FrameConfidence", &f.confidence.to_string())?;
  let words: Vec<String> = f.words.iter().map(|w| w.to_string()).collect();
  write_text_elem(w, "Word", &words.join(" "))?;
  write_text_elem(w, "FrameSignature", &frame_signature_text(&f.framesig))?;
  w.write_event(Event::End(BytesEnd::new("VideoFrame"))).map_err(xml_err)?;
  Ok(())
}

// Parses the subset of the MPEG-7 XML schema this crate writes. Unknown
// elements are skipped rather than rejected, to tolerate documents with
// extra attributes or spacing produced by other writers.
pub fn decode(xml: &str) -> Result<StreamContext> {
  let mut reader = Reader::from_str(xml);
  reader.config_mut().trim_text(true);

  let mut width = 0usize;
  let mut height = 0usize;
  let mut fine: Vec<FineSignature> = Vec::new();
  let mut coarse: Vec<CoarseSignature> = Vec::new();

  let mut cur_tag = String::new();
  let mut in_segment = false;
  let mut in_frame = false;
  let mut seg_first = 0u32;
  let mut seg_last = 0u32;
  let mut seg_words: Vec<[u8; crate::consts::WORD_BYTES]> = Vec::new();
  let mut frame_pts = 0i64;
  let mut frame_confidence = 0u8;
  let mut frame_words = [0u16; 5];
  let mut frame_sig = [0u8; crate::consts::FRAME_SIG_BYTES];

  let mut buf = Vec::new();
  loop {
    match reader.read_event_into(&mut buf).map_err(xml_err)? {
      Event::Eof => break,
      Event::Start(e) => {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        if name == "VideoSignatureRegion" {
          for attr in e.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
            let value = attr.unescape_value().map_err(xml_err)?.to_string();
            match key.as_str() {
              "width" => width = value.parse().map_err(|_| Error::InvalidXml("bad width".into()))?,
              "height" => height = value.parse().map_err(|_| Error::InvalidXml("bad height".into()))?,
              _ => {}
            }
          }
        } else if name == "VSVideoSegment" {
          in_segment = true;
          seg_words.clear();
        } else if name == "VideoFrame" {
          in_frame = true;
        }
        cur_tag = name;
      }
      Event::Text(t) => {
        let text = t.unescape().map_err(xml_err)?.to_string();
        match cur_tag.as_str() {
          "StartFrameOfSegment" if in_segment => {
            seg_first = text.trim().parse().map_err(|_| Error::InvalidXml("bad segment start".into()))?
          }
          "EndFrameOfSegment" if in_segment => {
            seg_last = text.trim().parse().map_err(|_| Error::InvalidXml("bad segment end".into()))?
          }
          "BagOfWords" if in_segment => {
            seg_words.push(parse_bag(&text)?);
          }
          "MediaTimeOfFrame" if in_frame => {
            frame_pts = text.trim().parse().map_err(|_| Error::InvalidXml("bad frame pts".into()))?
          }
          "FrameConfidence" if in_frame => {
            frame_confidence = text.trim().parse().map_err(|_| Error::InvalidXml("bad confidence".into()))?
          }
          "Word" if in_frame => {
            let parsed: Vec<u16> = text
              .split_whitespace()
              .map(|v| v.parse().map_err(|_| Error::InvalidXml("bad word value".into())))
              .collect::<Result<_>>()?;
            if parsed.len() != 5 {
              return Err(Error::InvalidXml("expected 5 word values".into()));
            }
            frame_words.copy_from_slice(&parsed);
          }
          "FrameSignature" if in_frame => {
            frame_sig = parse_framesig(&text)?;
          }
          _ => {}
        }
      }
      Event::End(e) => {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        if name == "VSVideoSegment" {
          if seg_words.len() != 5 {
            return Err(Error::InvalidXml("expected 5 bags of words per segment".into()));
          }
          let mut bags = [[0u8; crate::consts::WORD_BYTES]; crate::consts::NUM_WORDS];
          bags.copy_from_slice(&seg_words);
          coarse.push(CoarseSignature { first: seg_first, last: seg_last, bags });
          in_segment = false;
        } else if name == "VideoFrame" {
          let index = fine.len() as u32;
          fine.push(FineSignature {
            index,
            pts: frame_pts,
            confidence: frame_confidence,
            words: frame_words,
            framesig: frame_sig,
          });
          in_frame = false;
        }
      }
      _ => {}
    }
    buf.clear();
  }

  if fine.is_empty() {
    return Err(Error::InvalidXml("document contains no video frames".into()));
  }

  Ok(StreamContext {
    fine,
    coarse,
    width,
    height,
    time_base: (1, 1),
    coarsecount: 0,
    open_first: None,
    open_second: None,
  })
}

fn parse_bag(text: &str) -> Result<[u8; crate::consts::WORD_BYTES]> {
  let mut bag = [0u8; crate::consts::WORD_BYTES];
  let mut bit = 0usize;
  for tok in text.split_whitespace() {
    let v: u8 = tok.parse().map_err(|_| Error::InvalidXml("bad bag-of-words bit".into()))?;
    if v != 0 {
      bag[bit / 8] |= 1 << (7 - (bit % 8));
    }
    bit += 1;
  }
  if bit != 243 {
    return Err(Error::InvalidXml(format!("expected 243 bag-of-words bits, found {}", bit)));
  }
  Ok(bag)
}

fn parse_framesig(text: &str) -> Result<[u8; crate::consts::FRAME_SIG_BYTES]> {
  let digits: Vec<u8> = text
    .split_whitespace()
    .map(|v| v.parse().map_err(|_| Error::InvalidXml("bad frame signature digit".into())))
    .collect::<Result<_>>()?;
  if digits.len() != NUM_ELEMENTS {
    return Err(Error::InvalidXml(format!("expected {} frame signature digits, found {}", NUM_ELEMENTS, digits.len())));
  }
  let mut out = [0u8; crate::consts::FRAME_SIG_BYTES];
  for (i, chunk) in digits.chunks(5).enumerate() {
    out[i] = chunk[0] * 81 + chunk[1] * 27 + chunk[2] * 9 + chunk[3] * 3 + chunk[4];
  }
  Ok(out)
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
  fn round_trips_through_xml() {
    let stream = sample_stream(46);
    let xml = encode(&stream).unwrap();
    let decoded = decode(&xml).unwrap();

    assert_eq!(decoded.width, stream.width);
    assert_eq!(decoded.height, stream.height);
    assert_eq!(decoded.fine.len(), stream.fine.len());
    assert_eq!(decoded.coarse.len(), stream.coarse.len());
    for (a, b) in stream.fine.iter().zip(decoded.fine.iter()) {
      assert_eq!(a.pts, b.pts);
      assert_eq!(a.confidence, b.confidence);
      assert_eq!(a.words, b.words);
      assert_eq!(a.framesig, b.framesig);
    }
    for (a, b) in stream.coarse.iter().zip(decoded.coarse.iter()) {
      assert_eq!(a.bags, b.bags);
    }
  }

  #[test]
  fn rejects_a_document_with_no_frames() {
    let xml = "<DescriptorCollectionType><VideoSignatureType>\
      <VideoSignatureRegion width=\"1\" height=\"1\"></VideoSignatureRegion>\
      </VideoSignatureType></DescriptorCollectionType>";
    assert!(decode(xml).is_err());
  }
}
