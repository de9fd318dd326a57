// Y4M container reader/writer. Only the luma plane crosses into the
// signature core (§1); chroma is carried solely so a Y4M file can be
// read and written back out unchanged by CLI tooling.

use std::io::prelude::*;

use byteorder::{ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};
use crate::frame::Frame;

const Y4M_FILE_MAGIC: &str = "YUV4MPEG2 ";
const Y4M_FRAME_MAGIC: &str = "FRAME";

pub struct Y4MReader<R> {
  inner: R,
  width: usize,
  height: usize,
}

pub struct Y4MWriter<W> {
  inner: W,
  width: usize,
  height: usize,
}

fn read_decimal<R: Read>(r: &mut R) -> Result<(usize, u8)> {
  let mut v = 0;
  loop {
    let byte = r.read_u8()?;
    match byte {
      b'0'..=b'9' => {
        v = 10 * v + (byte - b'0') as usize;
      }
      other => return Ok((v, other)),
    }
  }
}

fn skip_to_whitespace<R: Read>(r: &mut R) -> Result<u8> {
  loop {
    let byte = r.read_u8()?;
    if matches!(byte, b' ' | b'\t' | b'\n') {
      return Ok(byte);
    }
  }
}

impl<R: Read> Y4MReader<R> {
  pub fn new(mut inner: R) -> Result<Self> {
    let mut file_magic = [0u8; 10];
    inner.read_exact(&mut file_magic)?;
    if file_magic != Y4M_FILE_MAGIC.as_bytes() {
      return Err(Error::Y4M("missing YUV4MPEG2 file header".into()));
    }

    let mut width = 0;
    let mut height = 0;

    loop {
      match inner.read_u8()? {
        b'\n' => break,
        b' ' | b'\t' => continue,
        b'W' => {
          let (value, sep) = read_decimal(&mut inner)?;
          width = value;
          if sep == b'\n' {
            break;
          }
        }
        b'H' => {
          let (value, sep) = read_decimal(&mut inner)?;
          height = value;
          if sep == b'\n' {
            break;
          }
        }
        _ => {
          if skip_to_whitespace(&mut inner)? == b'\n' {
            break;
          }
        }
      }
    }

    if width == 0 || height == 0 {
      return Err(Error::Y4M(format!("invalid Y4M size {}x{}", width, height)));
    }

    Ok(Y4MReader { inner, width, height })
  }

  pub fn width(&self) -> usize {
    self.width
  }

  pub fn height(&self) -> usize {
    self.height
  }

  pub fn read_frame(&mut self) -> Result<Option<Box<Frame>>> {
    let mut frame_magic = [0u8; 5];
    match self.inner.read_exact(&mut frame_magic) {
      Ok(()) => {}
      Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
      Err(e) => return Err(e.into()),
    }
    if frame_magic != Y4M_FRAME_MAGIC.as_bytes() {
      return Err(Error::Y4M("missing FRAME header".into()));
    }

    while self.inner.read_u8()? != b'\n' {}

    let mut frame = Frame::new(self.width, self.height);
    self.inner.read_exact(&mut frame.y_mut().data)?;
    self.inner.read_exact(&mut frame.u_mut().data)?;
    self.inner.read_exact(&mut frame.v_mut().data)?;

    Ok(Some(Box::new(frame)))
  }
}

impl<W: Write> Y4MWriter<W> {
  pub fn new(mut inner: W, width: usize, height: usize) -> Result<Self> {
    inner.write_all(Y4M_FILE_MAGIC.as_bytes())?;
    write!(inner, "W{} H{}\n", width, height)?;
    Ok(Y4MWriter { inner, width, height })
  }

  pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
    if frame.y().width != self.width || frame.y().height != self.height {
      return Err(Error::Y4M("frame size does not match stream header".into()));
    }

    self.inner.write_all(Y4M_FRAME_MAGIC.as_bytes())?;
    self.inner.write_u8(b'\n')?;

    self.inner.write_all(&frame.y().data)?;
    self.inner.write_all(&frame.u().data)?;
    self.inner.write_all(&frame.v().data)?;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Cursor;

  #[test]
  fn round_trips_a_small_sequence() {
    let mut buf = Vec::new();
    {
      let mut w = Y4MWriter::new(&mut buf, 4, 2).unwrap();
      let frame = Frame::new(4, 2);
      w.write_frame(&frame).unwrap();
      w.write_frame(&frame).unwrap();
    }

    let mut r = Y4MReader::new(Cursor::new(buf)).unwrap();
    assert_eq!(r.width(), 4);
    assert_eq!(r.height(), 2);
    assert!(r.read_frame().unwrap().is_some());
    assert!(r.read_frame().unwrap().is_some());
    assert!(r.read_frame().unwrap().is_none());
  }

  #[test]
  fn rejects_a_bad_file_header() {
    let data = b"not a y4m file".to_vec();
    assert!(Y4MReader::new(Cursor::new(data)).is_err());
  }
}
