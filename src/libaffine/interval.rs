// Copyright 2026 The affinum developers

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Closed intervals with outward-rounded arithmetic.
//!
//! An [`Interval`] is a pair of bounds `[inf, sup]` with `inf <= sup`,
//! guaranteed to contain the true value of the computation it stands for.
//! Every operation rounds the lower bound toward `-∞` and the upper bound
//! toward `+∞`, so the guarantee survives finite precision: the result may
//! widen, it never loses the true value.
//!
//! Comparisons use *interval order*: `a.lt(&b)` holds only when every
//! element of `a` precedes every element of `b`. This is not a total order;
//! `a.lt(&b)` and `b.lt(&a)` can both be false for overlapping operands,
//! which is why the methods are named rather than spelled `<`.
//!
//! # Examples
//!
//! ```
//! use affine::Interval;
//!
//! let x = Interval::new(1, 2);
//! let y = Interval::new(3, 4);
//! assert_eq!(&x + &y, Interval::new(4, 6));
//! assert_eq!(&x * &y, Interval::new(3, 8));
//! ```

use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

use num_integer::Integer;
use num_traits::{One, Zero};
use rug::float::{Constant, Round};
use rug::Float;
use serde::{Deserialize, Serialize};

use crate::affine::Affine;
use crate::error::{Error, Result};
use crate::ops::{Contains, Hull, Intersection, IntoFloat};
use crate::precision;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interval {
  inf: Float,
  sup: Float,
}

impl Interval {
  /// Builds `[inf, sup]` from two scalars, reordering them if given
  /// reversed. Both endpoints are converted outward, so the result encloses
  /// both scalars whatever the argument order.
  pub fn new<A, B>(inf: A, sup: B) -> Interval
  where
    A: IntoFloat + Clone,
    B: IntoFloat + Clone,
  {
    let prec = precision::current();
    let a_lo = inf.clone().into_float(prec, Round::Down);
    let a_hi = inf.into_float(prec, Round::Up);
    let b_lo = sup.clone().into_float(prec, Round::Down);
    let b_hi = sup.into_float(prec, Round::Up);
    Interval {
      inf: a_lo.min(&b_lo),
      sup: a_hi.max(&b_hi),
    }
  }

  /// The degenerate interval `[x, x]`, outward-rounded.
  pub fn singleton<T: IntoFloat + Clone>(x: T) -> Interval {
    Interval::new(x.clone(), x)
  }

  /// Wraps two already-rounded bounds, reordering if needed.
  pub(crate) fn make(inf: Float, sup: Float) -> Interval {
    if inf <= sup {
      Interval { inf, sup }
    } else {
      Interval { inf: sup, sup: inf }
    }
  }

  pub fn inf(&self) -> &Float {
    &self.inf
  }

  pub fn sup(&self) -> &Float {
    &self.sup
  }

  /// Replaces the lower bound, rounding downward; bounds are reordered if
  /// the new value exceeds `sup`.
  pub fn set_inf<T: IntoFloat>(&mut self, v: T) {
    let prec = precision::current();
    self.inf = v.into_float(prec, Round::Down);
    if self.inf > self.sup {
      std::mem::swap(&mut self.inf, &mut self.sup);
    }
  }

  /// Replaces the upper bound, rounding upward; bounds are reordered if the
  /// new value undercuts `inf`.
  pub fn set_sup<T: IntoFloat>(&mut self, v: T) {
    let prec = precision::current();
    self.sup = v.into_float(prec, Round::Up);
    if self.inf > self.sup {
      std::mem::swap(&mut self.inf, &mut self.sup);
    }
  }

  /// `sup - inf`, rounded upward.
  pub fn width(&self) -> Float {
    let prec = precision::current();
    Float::with_val_round(prec, &self.sup - &self.inf, Round::Up).0
  }

  /// `(inf + sup) / 2`.
  pub fn mid(&self) -> Float {
    let prec = precision::current();
    Float::with_val(prec, &self.inf + &self.sup) / 2u32
  }

  /// Half the width, rounded upward.
  pub fn radius(&self) -> Float {
    self.width() / 2u32
  }

  pub fn straddles_zero(&self) -> bool {
    self.inf <= 0i32 && self.sup >= 0i32
  }

  /// Interval order: every element of `self` is below every element of
  /// `other`.
  pub fn lt(&self, other: &Interval) -> bool {
    self.sup < other.inf
  }

  pub fn le(&self, other: &Interval) -> bool {
    self.sup <= other.inf
  }

  pub fn gt(&self, other: &Interval) -> bool {
    self.inf > other.sup
  }

  pub fn ge(&self, other: &Interval) -> bool {
    self.inf >= other.sup
  }

  /// Point membership of a scalar.
  pub fn contains_value<T: IntoFloat>(&self, v: T) -> bool {
    let prec = precision::current();
    let v = v.into_float(prec, Round::Nearest);
    self.inf <= v && self.sup >= v
  }

  /// `[1/sup, 1/inf]` with flipped rounding; undefined across zero.
  pub fn recip(&self) -> Result<Interval> {
    if self.straddles_zero() {
      return Err(Error::DivisionByZero);
    }
    let prec = precision::current();
    let one = Float::with_val(prec, 1u32);
    let inf = Float::with_val_round(prec, &one / &self.sup, Round::Down).0;
    let sup = Float::with_val_round(prec, &one / &self.inf, Round::Up).0;
    Ok(Interval { inf, sup })
  }

  /// `self * other.recip()`. Fails when `other` straddles zero.
  pub fn div(&self, other: &Interval) -> Result<Interval> {
    Ok(self * &other.recip()?)
  }

  /// Division by a scalar; fails when the scalar is zero.
  pub fn div_scalar<T: IntoFloat + Clone>(&self, k: T) -> Result<Interval> {
    self.div(&Interval::singleton(k))
  }

  /// Absolute value: negation below zero, copy above, `[0, max(|inf|,
  /// |sup|)]` across.
  pub fn abs(&self) -> Interval {
    if self.sup < 0i32 {
      -self
    } else if self.straddles_zero() {
      let prec = precision::current();
      let m = self.inf.clone().abs().max(&self.sup.clone().abs());
      Interval {
        inf: Float::new(prec),
        sup: m,
      }
    } else {
      self.clone()
    }
  }

  /// Sign-aware square: the lower bound of a zero-straddling operand clamps
  /// to zero instead of going negative.
  pub fn sqr(&self) -> Interval {
    let prec = precision::current();
    let sq = |x: &Float, round| Float::with_val_round(prec, x * x, round).0;
    if self.inf >= 0i32 {
      Interval {
        inf: sq(&self.inf, Round::Down),
        sup: sq(&self.sup, Round::Up),
      }
    } else if self.sup <= 0i32 {
      Interval {
        inf: sq(&self.sup, Round::Down),
        sup: sq(&self.inf, Round::Up),
      }
    } else {
      let m = sq(&self.inf, Round::Up).max(&sq(&self.sup, Round::Up));
      Interval {
        inf: Float::new(prec),
        sup: m,
      }
    }
  }

  /// Integer power by binary exponentiation; the squaring steps go through
  /// [`Interval::sqr`] so even powers of zero-straddling operands stay
  /// non-negative. Negative exponents reciprocate first and inherit the
  /// zero-straddling failure.
  pub fn pow(&self, n: i32) -> Result<Interval> {
    if n == 0 {
      return Ok(Interval::one());
    }
    let (mut x, mut n) = if n < 0 {
      (self.recip()?, -i64::from(n))
    } else {
      (self.clone(), i64::from(n))
    };
    let mut y = Interval::one();
    while n > 1 {
      if n.is_even() {
        x = x.sqr();
        n /= 2;
      } else {
        y = &x * &y;
        x = x.sqr();
        n = (n - 1) / 2;
      }
    }
    Ok(&x * &y)
  }

  /// Interval exponent, through `exp(other * log(self))`; needs a strictly
  /// positive base.
  pub fn pow_interval(&self, other: &Interval) -> Result<Interval> {
    Ok((other * &self.log()?).exp())
  }

  fn monotone(&self, f: fn(&mut Float, Round) -> std::cmp::Ordering) -> Interval {
    let mut inf = self.inf.clone();
    let mut sup = self.sup.clone();
    f(&mut inf, Round::Down);
    f(&mut sup, Round::Up);
    Interval { inf, sup }
  }

  /// Bound-wise square root; fails below zero.
  pub fn sqrt(&self) -> Result<Interval> {
    if self.inf < 0i32 {
      return Err(Error::DomainViolation("sqrt needs a lower bound >= 0"));
    }
    Ok(self.monotone(Float::sqrt_round))
  }

  /// Bound-wise exponential.
  pub fn exp(&self) -> Interval {
    self.monotone(Float::exp_round)
  }

  /// Bound-wise natural logarithm; fails at or below zero.
  pub fn log(&self) -> Result<Interval> {
    if self.inf <= 0i32 {
      return Err(Error::DomainViolation("log needs a lower bound > 0"));
    }
    Ok(self.monotone(Float::ln_round))
  }

  pub fn floor(&self) -> Interval {
    Interval {
      inf: self.inf.clone().floor(),
      sup: self.sup.clone().floor(),
    }
  }

  pub fn ceil(&self) -> Interval {
    Interval {
      inf: self.inf.clone().ceil(),
      sup: self.sup.clone().ceil(),
    }
  }

  /// Minimal 2π-periodic representative: the lower bound is reduced modulo
  /// 2π (negated for negative inputs, which is harmless under the even
  /// cosine) and the upper bound re-derived from the original width.
  pub fn min_trigo(&self) -> Interval {
    let prec = precision::current();
    let two_pi = Float::with_val(prec, Constant::Pi) * 2u32;
    let mut a = fmod(&self.inf, &two_pi, prec);
    if self.inf < 0i32 {
      a = -a;
    }
    let b = if self.width() >= two_pi {
      Float::with_val_round(prec, &a + &two_pi, Round::Up).0
    } else {
      let mut b = fmod(&self.sup, &two_pi, prec);
      if b <= a {
        b = Float::with_val_round(prec, &b + &two_pi, Round::Up).0;
      }
      b
    };
    Interval::make(a, b)
  }

  /// Cosine over the reduced representative `[a, b]`, by cases on the
  /// π-bands the bounds fall in:
  ///
  /// * `a, b ∈ [0, π]` — decreasing, `[cos b, cos a]`;
  /// * `a ∈ [0, π]`, `b ∈ (π, 2π]` — minimum crossed, `[-1, max(cos a, cos b)]`;
  /// * `a, b ∈ (π, 2π]` — increasing, `[cos a, cos b]`;
  /// * `a ∈ (π, 2π]`, `b ∈ (2π, 3π]` — maximum crossed, `[min(cos a, cos b), 1]`;
  /// * anything wider — `[-1, 1]`.
  pub fn cos(&self) -> Interval {
    let prec = precision::current();
    let pi = Float::with_val(prec, Constant::Pi);
    let two_pi = Float::with_val(prec, &pi * 2u32);
    let three_pi = Float::with_val(prec, &pi * 3u32);
    let r = self.min_trigo();
    let cos_at = |x: &Float, round| {
      let mut c = x.clone();
      c.cos_round(round);
      c
    };
    if r.inf <= pi {
      if r.sup <= pi {
        Interval::make(cos_at(&r.sup, Round::Down), cos_at(&r.inf, Round::Up))
      } else if r.sup <= two_pi {
        let hi = cos_at(&r.inf, Round::Up).max(&cos_at(&r.sup, Round::Up));
        Interval::make(Float::with_val(prec, -1i32), hi)
      } else {
        Interval::new(-1i32, 1i32)
      }
    } else if r.inf <= two_pi {
      if r.sup <= two_pi {
        Interval::make(cos_at(&r.inf, Round::Down), cos_at(&r.sup, Round::Up))
      } else if r.sup <= three_pi {
        let lo = cos_at(&r.inf, Round::Down).min(&cos_at(&r.sup, Round::Down));
        Interval::make(lo, Float::with_val(prec, 1i32))
      } else {
        Interval::new(-1i32, 1i32)
      }
    } else {
      Interval::new(-1i32, 1i32)
    }
  }

  /// `sin(x) = cos(π/2 - x)`.
  pub fn sin(&self) -> Interval {
    let prec = precision::current();
    let half_pi = Float::with_val(prec, Constant::Pi) / 2u32;
    (&Interval::singleton(half_pi) - self).cos()
  }

  /// `sin / cos`; fails when the cosine range straddles zero.
  pub fn tan(&self) -> Result<Interval> {
    self.sin().div(&self.cos())
  }

  /// `cos / sin`; fails when the sine range straddles zero.
  pub fn cotan(&self) -> Result<Interval> {
    self.cos().div(&self.sin())
  }

  /// `(exp(x) + exp(-x)) / 2`.
  pub fn cosh(&self) -> Interval {
    let e = self.exp();
    let en = (-self).exp();
    (&e + &en) * 0.5
  }

  /// `(exp(x) - exp(-x)) / 2`.
  pub fn sinh(&self) -> Interval {
    let e = self.exp();
    let en = (-self).exp();
    (&e - &en) * 0.5
  }

  /// `sinh / cosh`.
  pub fn tanh(&self) -> Result<Interval> {
    self.sinh().div(&self.cosh())
  }

  /// Affine form covering the same range, spending one fresh noise symbol.
  pub fn to_affine(&self) -> Affine {
    Affine::from_interval(self)
  }
}

fn fmod(x: &Float, m: &Float, prec: u32) -> Float {
  let q = Float::with_val(prec, x / m).trunc();
  let qm = Float::with_val(prec, &q * m);
  Float::with_val(prec, x - &qm)
}

impl<'a, 'b> Add<&'b Interval> for &'a Interval {
  type Output = Interval;

  fn add(self, other: &'b Interval) -> Interval {
    let prec = precision::current();
    Interval {
      inf: Float::with_val_round(prec, &self.inf + &other.inf, Round::Down).0,
      sup: Float::with_val_round(prec, &self.sup + &other.sup, Round::Up).0,
    }
  }
}

impl<'a, 'b> Sub<&'b Interval> for &'a Interval {
  type Output = Interval;

  fn sub(self, other: &'b Interval) -> Interval {
    let prec = precision::current();
    Interval {
      inf: Float::with_val_round(prec, &self.inf - &other.sup, Round::Down).0,
      sup: Float::with_val_round(prec, &self.sup - &other.inf, Round::Up).0,
    }
  }
}

impl<'a, 'b> Mul<&'b Interval> for &'a Interval {
  type Output = Interval;

  fn mul(self, other: &'b Interval) -> Interval {
    let prec = precision::current();
    let corner = |x: &Float, y: &Float, round| Float::with_val_round(prec, x * y, round).0;
    let inf = corner(&self.inf, &other.inf, Round::Down)
      .min(&corner(&self.inf, &other.sup, Round::Down))
      .min(&corner(&self.sup, &other.inf, Round::Down))
      .min(&corner(&self.sup, &other.sup, Round::Down));
    let sup = corner(&self.inf, &other.inf, Round::Up)
      .max(&corner(&self.inf, &other.sup, Round::Up))
      .max(&corner(&self.sup, &other.inf, Round::Up))
      .max(&corner(&self.sup, &other.sup, Round::Up));
    Interval { inf, sup }
  }
}

impl<'a> Neg for &'a Interval {
  type Output = Interval;

  fn neg(self) -> Interval {
    let prec = precision::current();
    Interval {
      inf: Float::with_val_round(prec, -&self.sup, Round::Down).0,
      sup: Float::with_val_round(prec, -&self.inf, Round::Up).0,
    }
  }
}

impl Neg for Interval {
  type Output = Interval;

  fn neg(self) -> Interval {
    -&self
  }
}

macro_rules! interval_binop_impl
{
  ( $( $op:ident, $m:ident );* ) =>
  {$(
    impl $op<Interval> for Interval {
      type Output = Interval;
      fn $m(self, other: Interval) -> Interval { (&self).$m(&other) }
    }
    impl<'a> $op<&'a Interval> for Interval {
      type Output = Interval;
      fn $m(self, other: &'a Interval) -> Interval { (&self).$m(other) }
    }
    impl<'a> $op<Interval> for &'a Interval {
      type Output = Interval;
      fn $m(self, other: Interval) -> Interval { self.$m(&other) }
    }
  )*}
}

interval_binop_impl! {
  Add, add;
  Sub, sub;
  Mul, mul
}

macro_rules! interval_scalar_ops_impl
{
  ( $( $t:ty ),* ) =>
  {$(
    impl Add<$t> for Interval {
      type Output = Interval;
      fn add(self, k: $t) -> Interval { &self + &Interval::singleton(k) }
    }
    impl<'a> Add<$t> for &'a Interval {
      type Output = Interval;
      fn add(self, k: $t) -> Interval { self + &Interval::singleton(k) }
    }
    impl Add<Interval> for $t {
      type Output = Interval;
      fn add(self, other: Interval) -> Interval { &Interval::singleton(self) + &other }
    }
    impl<'a> Add<&'a Interval> for $t {
      type Output = Interval;
      fn add(self, other: &'a Interval) -> Interval { &Interval::singleton(self) + other }
    }
    impl Sub<$t> for Interval {
      type Output = Interval;
      fn sub(self, k: $t) -> Interval { &self - &Interval::singleton(k) }
    }
    impl<'a> Sub<$t> for &'a Interval {
      type Output = Interval;
      fn sub(self, k: $t) -> Interval { self - &Interval::singleton(k) }
    }
    impl Sub<Interval> for $t {
      type Output = Interval;
      fn sub(self, other: Interval) -> Interval { &Interval::singleton(self) - &other }
    }
    impl<'a> Sub<&'a Interval> for $t {
      type Output = Interval;
      fn sub(self, other: &'a Interval) -> Interval { &Interval::singleton(self) - other }
    }
    impl Mul<$t> for Interval {
      type Output = Interval;
      fn mul(self, k: $t) -> Interval { &self * &Interval::singleton(k) }
    }
    impl<'a> Mul<$t> for &'a Interval {
      type Output = Interval;
      fn mul(self, k: $t) -> Interval { self * &Interval::singleton(k) }
    }
    impl Mul<Interval> for $t {
      type Output = Interval;
      fn mul(self, other: Interval) -> Interval { &Interval::singleton(self) * &other }
    }
    impl<'a> Mul<&'a Interval> for $t {
      type Output = Interval;
      fn mul(self, other: &'a Interval) -> Interval { &Interval::singleton(self) * other }
    }
  )*}
}

interval_scalar_ops_impl!(f64, i32, Float);

impl Contains<Interval> for Interval {
  fn contains(&self, other: &Interval) -> bool {
    self.inf <= other.inf && self.sup >= other.sup
  }
}

impl Contains<Float> for Interval {
  fn contains(&self, v: &Float) -> bool {
    self.inf <= *v && self.sup >= *v
  }
}

impl Contains<Affine> for Interval {
  fn contains(&self, other: &Affine) -> bool {
    self.contains(&other.to_interval())
  }
}

impl Hull for Interval {
  type Output = Interval;

  fn hull(&self, other: &Interval) -> Interval {
    Interval {
      inf: self.inf.clone().min(&other.inf),
      sup: self.sup.clone().max(&other.sup),
    }
  }
}

impl Intersection for Interval {
  type Output = Option<Interval>;

  fn intersection(&self, other: &Interval) -> Option<Interval> {
    let inf = self.inf.clone().max(&other.inf);
    let sup = self.sup.clone().min(&other.sup);
    if inf <= sup {
      Some(Interval { inf, sup })
    } else {
      None
    }
  }
}

impl Zero for Interval {
  fn zero() -> Interval {
    Interval::singleton(0i32)
  }

  fn is_zero(&self) -> bool {
    self.inf.is_zero() && self.sup.is_zero()
  }
}

impl One for Interval {
  fn one() -> Interval {
    Interval::singleton(1i32)
  }
}

impl fmt::Display for Interval {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "[{}, {}]", self.inf, self.sup)
  }
}

/// Conversion of scalars and pairs into intervals.
pub trait ToInterval {
  fn to_interval(self) -> Interval;
}

impl ToInterval for Interval {
  fn to_interval(self) -> Interval {
    self
  }
}

impl ToInterval for (f64, f64) {
  fn to_interval(self) -> Interval {
    let (inf, sup) = self;
    Interval::new(inf, sup)
  }
}

impl ToInterval for f64 {
  fn to_interval(self) -> Interval {
    Interval::singleton(self)
  }
}

impl ToInterval for i32 {
  fn to_interval(self) -> Interval {
    Interval::singleton(self)
  }
}
