// Copyright 2026 The affinum developers

// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Allocation of noise-symbol identifiers.
//!
//! A noise symbol `εi` is an unknown value in `[-1, 1]` shared by every
//! affine form that carries its identifier; two forms referencing the same
//! identifier refer to the same uncertainty source, which is what makes
//! correlation cancellation possible. Identifiers are allocated from a
//! process-wide monotonically increasing counter, so an identifier is never
//! reused for a distinct source.

use std::sync::atomic::{AtomicU64, Ordering};

/// Identifier of a noise symbol `εi ∈ [-1, 1]`.
pub type Symbol = u64;

static NEXT: AtomicU64 = AtomicU64::new(1);

/// Allocates a fresh, process-unique noise symbol identifier.
///
/// Safe to call from any thread; uniqueness and monotonicity hold under
/// concurrent allocation.
pub fn fresh() -> Symbol {
  NEXT.fetch_add(1, Ordering::Relaxed)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn fresh_is_strictly_increasing() {
    let a = fresh();
    let b = fresh();
    let c = fresh();
    assert!(a < b);
    assert!(b < c);
  }
}
