//! Physical quantities used by the retro tools, as `uom` `f32` quantities in
//! SI base units.
//!
//! Job timeouts are given with explicit units, such as `"90 s"` or
//! `"5 min"`, and turned into `std::time::Duration`s.

pub use uom::si::f32::Time;

mod unit {
  pub use uom::si::time::{nanosecond, millisecond, second, minute};
}

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<unit::$unit>(x) }
  };
}

wrap!(ns    Time   nanosecond);
wrap!(ms    Time  millisecond);
wrap!(s     Time       second);
wrap!(min   Time       minute);

// Reverse direction of the above
pub fn ns_   (x: Time  ) -> f32 { x.get::<unit::nanosecond>() }
pub fn s_    (x: Time  ) -> f32 { x.get::<unit::second>() }

/// Convert a (non-negative) `Time` into a `std::time::Duration`. Negative or
/// non-finite times yield `None`.
pub fn duration(t: Time) -> Option<std::time::Duration> {
  std::time::Duration::try_from_secs_f32(s_(t)).ok()
}

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}
