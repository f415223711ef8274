// Copyright 2026 The affinum developers

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Range and bound specific operations.

use rug::float::Round;
use rug::Float;

/// Containment of a value or a whole range.
///
/// For range operands this is a subset test, not an overlap test.
pub trait Contains<RHS = Self> {
  fn contains(&self, rhs: &RHS) -> bool;
}

/// Smallest range enclosing both operands.
pub trait Hull<RHS = Self> {
  type Output;
  fn hull(&self, rhs: &RHS) -> Self::Output;
}

/// Common part of both operands, if any.
pub trait Intersection<RHS = Self> {
  type Output;
  fn intersection(&self, rhs: &RHS) -> Self::Output;
}

/// Lifting of scalars into the rounded float domain.
///
/// The target precision and rounding direction are explicit so that bound
/// conversions can round outward.
pub trait IntoFloat {
  fn into_float(self, prec: u32, round: Round) -> Float;
}

impl IntoFloat for Float {
  fn into_float(self, prec: u32, round: Round) -> Float {
    Float::with_val_round(prec, &self, round).0
  }
}

impl IntoFloat for &Float {
  fn into_float(self, prec: u32, round: Round) -> Float {
    Float::with_val_round(prec, self, round).0
  }
}

macro_rules! into_float_impl
{
  ( $( $t:ty ),* ) =>
  {$(
    impl IntoFloat for $t {
      fn into_float(self, prec: u32, round: Round) -> Float {
        Float::with_val_round(prec, self, round).0
      }
    }
  )*}
}

into_float_impl!(f32, f64, i8, i16, i32, i64, u8, u16, u32, u64);
