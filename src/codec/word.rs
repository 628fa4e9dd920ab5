use crate::error::{GoldenError, Result};

/// Widest word the codec handles. Lanes and words are carried as `i128`.
pub const MAX_WORD_BITS: u32 = 128;

fn check_width(width: u32) -> Result<()> {
  if width == 0 || width > MAX_WORD_BITS || width % 4 != 0 {
    return Err(GoldenError::InvalidWidth { width });
  }
  Ok(())
}

fn mask(width: u32) -> u128 {
  if width == MAX_WORD_BITS {
    u128::MAX
  } else {
    (1u128 << width) - 1
  }
}

/// Smallest and largest value representable in `width` bits.
pub fn signed_range(width: u32) -> (i128, i128) {
  if width == MAX_WORD_BITS {
    (i128::MIN, i128::MAX)
  } else {
    (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
  }
}

/// Check that `value` fits a `width`-bit two's-complement field.
pub fn fits(value: i128, width: u32) -> bool {
  let (lo, hi) = signed_range(width);
  value >= lo && value <= hi
}

/// Encode `value` as a `width`-bit two's-complement word in lowercase hex,
/// zero padded to `width / 4` digits.
pub fn encode(value: i128, width: u32) -> Result<String> {
  check_width(width)?;
  if !fits(value, width) {
    return Err(GoldenError::Range { value, width });
  }
  let raw = (value as u128) & mask(width);
  Ok(format!("{:0digits$x}", raw, digits = (width / 4) as usize))
}

/// Decode a `width`-bit hex word, treating the top bit as the sign.
pub fn decode(word: &str, width: u32) -> Result<i128> {
  check_width(width)?;
  let digits = (width / 4) as usize;
  if word.len() != digits {
    return Err(GoldenError::malformed(
      word,
      format!("expected {} hex digits, found {}", digits, word.len()),
    ));
  }
  // `from_str_radix` alone would accept a leading '+'
  if !word.bytes().all(|b| b.is_ascii_hexdigit()) {
    return Err(GoldenError::malformed(word, "non-hex digit"));
  }
  let raw = u128::from_str_radix(word, 16).map_err(|e| GoldenError::malformed(word, e.to_string()))?;
  let shift = MAX_WORD_BITS - width;
  Ok(((raw << shift) as i128) >> shift)
}
