use super::word::{decode, encode};
use crate::error::{GoldenError, Result};

/// Pack equal-width lanes into one word, highest lane first.
///
/// Lane 0 ends up in the least-significant (rightmost) digits, the
/// convention every artifact file follows.
pub fn pack(lanes: &[i128], lane_width: u32) -> Result<String> {
  let mut word = String::with_capacity(lanes.len() * (lane_width / 4) as usize);
  for &lane in lanes.iter().rev() {
    word.push_str(&encode(lane, lane_width)?);
  }
  Ok(word)
}

/// Same as [`pack`] for narrower integer lanes.
pub fn pack_lanes<T: Copy + Into<i128>>(lanes: &[T], lane_width: u32) -> Result<String> {
  let wide: Vec<i128> = lanes.iter().map(|&v| v.into()).collect();
  pack(&wide, lane_width)
}

/// Split a word into `lane_count` lanes, lane 0 taken from the last chunk.
pub fn unpack(word: &str, lane_width: u32, lane_count: usize) -> Result<Vec<i128>> {
  if lane_width == 0 || lane_width % 4 != 0 {
    return Err(GoldenError::InvalidWidth { width: lane_width });
  }
  let digits = (lane_width / 4) as usize;
  if word.len() != digits * lane_count {
    return Err(GoldenError::malformed(
      word,
      format!(
        "expected {} lanes of {} bits ({} digits), found {} digits",
        lane_count,
        lane_width,
        digits * lane_count,
        word.len()
      ),
    ));
  }
  if !word.is_ascii() {
    return Err(GoldenError::malformed(word, "non-ascii characters"));
  }

  let mut lanes = Vec::with_capacity(lane_count);
  for chunk in (0..lane_count).rev() {
    let start = chunk * digits;
    lanes.push(decode(&word[start..start + digits], lane_width)?);
  }
  Ok(lanes)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_pack_high_lane_first() {
    // lane 0 = 1, lane 1 = -1, lane 2 = 2
    assert_eq!(pack(&[1, -1, 2], 8).unwrap(), "02ff01");
    assert_eq!(pack_lanes(&[-2i32, 3], 32).unwrap(), "00000003fffffffe");
  }

  #[test]
  fn test_unpack_restores_order() {
    assert_eq!(unpack("02ff01", 8, 3).unwrap(), vec![1, -1, 2]);
  }

  #[test]
  fn test_pack_propagates_range_error() {
    assert!(matches!(pack(&[0, 200], 8), Err(GoldenError::Range { value: 200, .. })));
  }

  #[test]
  fn test_unpack_length_mismatch() {
    assert!(matches!(unpack("02ff01", 8, 4), Err(GoldenError::MalformedWord { .. })));
  }

  #[test]
  fn test_empty_word() {
    assert_eq!(pack(&[], 8).unwrap(), "");
    assert!(unpack("", 8, 0).unwrap().is_empty());
  }
}
