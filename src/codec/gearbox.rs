// Stream gearbox: bus-width adapter between two fixed word widths.
//
// Hardware view: a 96-bit input row is fed through a 64-bit AXI stream as
// {word1[31:0], word0[63:0]}, i.e. the low bytes of the stream go first.
// Flattening every word into bytes (lane 0 first) and regrouping reproduces
// exactly that ordering in both directions.

use super::lane::{pack_lanes, unpack};
use crate::error::{GoldenError, Result};

// Words are handled as byte lanes, so any multiple of 8 works here; the
// 128-bit limit of the word codec does not apply.
fn check_bus_width(width: u32) -> Result<()> {
  if width == 0 || width % 8 != 0 {
    return Err(GoldenError::InvalidWidth { width });
  }
  Ok(())
}

/// Flatten words of `word_bits` into their bytes, lane 0 of the first word first.
pub fn words_to_bytes<S: AsRef<str>>(words: &[S], word_bits: u32) -> Result<Vec<i8>> {
  check_bus_width(word_bits)?;
  let lanes = (word_bits / 8) as usize;
  let mut bytes = Vec::with_capacity(words.len() * lanes);
  for word in words {
    for lane in unpack(word.as_ref(), 8, lanes)? {
      // decode of an 8-bit lane always lands in i8 range
      bytes.push(lane as i8);
    }
  }
  Ok(bytes)
}

/// Regroup a byte stream into words of `word_bits`.
pub fn bytes_to_words(bytes: &[i8], word_bits: u32) -> Result<Vec<String>> {
  check_bus_width(word_bits)?;
  let lanes = (word_bits / 8) as usize;
  if bytes.len() % lanes != 0 {
    return Err(GoldenError::Alignment {
      bytes: bytes.len(),
      source_bytes: 1,
      target_bytes: lanes,
    });
  }
  bytes.chunks(lanes).map(|chunk| pack_lanes(chunk, 8)).collect()
}

/// Width converter between `source_bits` and `target_bits` words.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gearbox {
  source_bits: u32,
  target_bits: u32,
}

impl Gearbox {
  pub fn new(source_bits: u32, target_bits: u32) -> Result<Self> {
    check_bus_width(source_bits)?;
    check_bus_width(target_bits)?;
    Ok(Self {
      source_bits,
      target_bits,
    })
  }

  pub fn source_bits(&self) -> u32 {
    self.source_bits
  }

  pub fn target_bits(&self) -> u32 {
    self.target_bits
  }

  /// Repack source words into target words.
  pub fn encode<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<String>> {
    let bytes = words_to_bytes(words, self.source_bits)?;
    self.check_alignment(bytes.len())?;
    bytes_to_words(&bytes, self.target_bits)
  }

  /// Inverse of [`Gearbox::encode`].
  pub fn decode<S: AsRef<str>>(&self, words: &[S]) -> Result<Vec<String>> {
    let bytes = words_to_bytes(words, self.target_bits)?;
    self.check_alignment(bytes.len())?;
    bytes_to_words(&bytes, self.source_bits)
  }

  fn check_alignment(&self, bytes: usize) -> Result<()> {
    let source_bytes = (self.source_bits / 8) as usize;
    let target_bytes = (self.target_bits / 8) as usize;
    if bytes % source_bytes != 0 || bytes % target_bytes != 0 {
      return Err(GoldenError::Alignment {
        bytes,
        source_bytes,
        target_bytes,
      });
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_three_to_two_byte_order() {
    // Two 96-bit rows, bytes 0..24 in stream order
    let bytes: Vec<i8> = (0..24).map(|b| b as i8).collect();
    let rows = bytes_to_words(&bytes, 96).unwrap();
    assert_eq!(rows[0], "0b0a09080706050403020100");

    let gearbox = Gearbox::new(96, 64).unwrap();
    let stream = gearbox.encode(&rows).unwrap();
    assert_eq!(
      stream,
      vec!["0706050403020100", "0f0e0d0c0b0a0908", "1716151413121110"]
    );
    assert_eq!(gearbox.decode(&stream).unwrap(), rows);
  }

  #[test]
  fn test_low_half_first() {
    // 128-bit word splits into low 64 then high 64
    let word = "ff0102030405060708090a0b0c0d0e0f";
    let gearbox = Gearbox::new(128, 64).unwrap();
    let stream = gearbox.encode(&[word]).unwrap();
    assert_eq!(stream, vec!["08090a0b0c0d0e0f", "ff01020304050607"]);
  }

  #[test]
  fn test_misaligned_stream() {
    // One 96-bit word = 12 bytes, not a multiple of 8
    let gearbox = Gearbox::new(96, 64).unwrap();
    let row = "000000000000000000000000";
    assert!(matches!(
      gearbox.encode(&[row]),
      Err(GoldenError::Alignment {
        bytes: 12,
        source_bytes: 12,
        target_bytes: 8
      })
    ));
  }

  #[test]
  fn test_rejects_non_byte_width() {
    assert!(matches!(Gearbox::new(60, 64), Err(GoldenError::InvalidWidth { width: 60 })));
  }
}
