use crate::tests::test_utils::*;
use crate::{unit_symbol, Balance};

#[test]
fn test_from_tao_round_trips_raw() {
  let balance = Balance::from_tao(37.5);
  assert_eq!(balance.raw(), 37_500_000_000, "37.5 tao is 37.5e9 rao");
  assert_eq!(balance.tao(), 37.5);

  let zero = Balance::from_tao(-1.0);
  assert_eq!(zero.raw(), 0, "negative display amounts clamp to zero");
}

#[test]
fn test_arithmetic_on_raw() {
  let a = tao(10);
  let b = tao(4);

  assert_eq!((a + b).raw(), 14 * TAO);
  assert_eq!((a - b).raw(), 6 * TAO);
  assert_eq!((a * 3).raw(), 30 * TAO);
  assert_eq!((a / 4).raw(), 2_500_000_000);
  assert!(a > b);
  assert_eq!(a.checked_sub(b), Some(tao(6)));
  assert_eq!(b.checked_sub(a), None, "underflow is never silent");
}

#[test]
fn test_unit_tag_survives_arithmetic() {
  let tagged = tao(5).with_unit(3);
  let untagged = tao(1);

  let sum = tagged + untagged;
  assert_eq!(sum.unit(), Some(3), "untagged operand adopts the tagged unit");

  let mut balance = tao(2);
  balance.set_unit(7);
  assert_eq!(balance.unit(), Some(7));
  assert_eq!(balance.raw(), 2 * TAO, "set_unit does not alter raw");
}

#[test]
#[should_panic(expected = "balance unit mismatch")]
fn test_mixing_subnet_assets_panics() {
  let alpha_three = tao(1).with_unit(3);
  let alpha_four = tao(1).with_unit(4);
  let _ = alpha_three + alpha_four;
}

#[test]
fn test_comparison_ignores_unit() {
  // Comparison is defined on raw; equality of amounts across views of the
  // same position must hold regardless of tagging.
  assert_eq!(tao(5).with_unit(1), tao(5));
  assert!(tao(5).with_unit(1) > tao(4).with_unit(1));
}

#[test]
fn test_display_units() {
  assert_eq!(unit_symbol(0), "τ");
  assert_eq!(unit_symbol(1), "α");
  assert_eq!(format!("{}", tao(1)), "τ1.0000");
  assert_eq!(format!("{}", tao(1).with_unit(1)), "1.0000α");

  // Netuids beyond the alphabet compose digits.
  assert!(unit_symbol(100).chars().count() > 1);
}
