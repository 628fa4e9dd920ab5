use golden_gemm::arch::tile::tiles;
use golden_gemm::codec::{decode, encode, pack, unpack, Gearbox};
use proptest::prelude::*;

fn value_in(width: u32) -> impl Strategy<Value = i128> {
  let (lo, hi) = if width == 128 {
    (i128::MIN, i128::MAX)
  } else {
    (-(1i128 << (width - 1)), (1i128 << (width - 1)) - 1)
  };
  lo..=hi
}

fn width_and_value() -> impl Strategy<Value = (u32, i128)> {
  prop_oneof![Just(8u32), Just(32u32), Just(64u32), Just(96u32), Just(128u32)]
    .prop_flat_map(|w| (Just(w), value_in(w)))
}

proptest! {
  #[test]
  fn word_round_trip((width, value) in width_and_value()) {
    let word = encode(value, width).unwrap();
    prop_assert_eq!(word.len(), (width / 4) as usize);
    prop_assert_eq!(decode(&word, width).unwrap(), value);
  }

  #[test]
  fn lane_unpack_inverts_pack(lanes in prop::collection::vec(-128i128..=127, 1..32)) {
    let word = pack(&lanes, 8).unwrap();
    prop_assert_eq!(unpack(&word, 8, lanes.len()).unwrap(), lanes);
  }

  #[test]
  fn gearbox_decode_inverts_encode(
    src_bytes in prop_oneof![Just(4usize), Just(8), Just(12), Just(16)],
    dst_bytes in prop_oneof![Just(4usize), Just(8), Just(16)],
    groups in 1usize..4,
    seed in any::<u64>(),
  ) {
    // byte count that both widths divide
    let lcm = (1..=src_bytes * dst_bytes).find(|n| n % src_bytes == 0 && n % dst_bytes == 0).unwrap();
    let total = lcm * groups;
    let bytes: Vec<i128> = (0..total).map(|i| ((seed >> (i % 64)) as u8 as i8) as i128 ^ (i as i128 & 0x3f)).collect();
    let words: Vec<String> = bytes.chunks(src_bytes).map(|c| pack(c, 8).unwrap()).collect();
    let gearbox = Gearbox::new(src_bytes as u32 * 8, dst_bytes as u32 * 8).unwrap();
    let stream = gearbox.encode(&words).unwrap();
    prop_assert_eq!(stream.len(), total / dst_bytes);
    prop_assert_eq!(gearbox.decode(&stream).unwrap(), words);
  }

  #[test]
  fn tiles_partition_the_product(kt in 1usize..5, nt in 1usize..5, r in 1usize..6, c in 1usize..6, m in 1usize..8) {
    let (k, n) = (kt * r, nt * c);
    let tiles = tiles(m, k, n, r, c).unwrap();
    prop_assert_eq!(tiles.len(), kt * nt);
    let mut covered = vec![0u32; k * n];
    for t in &tiles {
      prop_assert_eq!(t.rows.clone(), 0..m);
      prop_assert_eq!(t.a_cols.clone(), t.b_rows.clone());
      for row in t.b_rows.clone() {
        for col in t.b_cols.clone() {
          covered[row * n + col] += 1;
        }
      }
    }
    prop_assert!(covered.iter().all(|&hits| hits == 1));
  }

  #[test]
  fn misaligned_dimensions_rejected(k in 1usize..40, r in 2usize..8) {
    prop_assume!(k % r != 0);
    prop_assert!(tiles(4, k, 4, r, 2).is_err());
  }
}
