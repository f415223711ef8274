// Copyright 2026 The affinum developers

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Contract violations surfaced by interval and affine operations.
//!
//! Every failure is local and immediate. The library never substitutes NaN
//! or a sentinel range for an undefined result; callers either guard the
//! domain beforehand or handle the error.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
  /// A mathematical precondition of the operation does not hold on the
  /// operand's range.
  #[error("domain violation: {0}")]
  DomainViolation(&'static str),
  /// The divisor's range contains zero.
  #[error("division by zero")]
  DivisionByZero,
}

pub type Result<T> = std::result::Result<T, Error>;
