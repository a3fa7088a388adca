// Copyright (C) Hypertensor.
// SPDX-License-Identifier: Apache-2.0

// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
// 	http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::RAO_PER_TAO;

/// Greek unit symbols, indexed by netuid. Index 0 is the base asset.
const UNITS: &[&str] = &[
  "τ", "α", "β", "γ", "δ", "ε", "ζ", "η", "θ", "ι", "κ", "λ", "μ", "ν", "ξ",
  "ο", "π", "ρ", "σ", "t", "υ", "φ", "χ", "ψ", "ω",
];

/// Unit symbol for a subnet. Netuids beyond the alphabet compose digits in
/// base `UNITS.len()`.
pub fn unit_symbol(netuid: u16) -> String {
  let base = UNITS.len() as u16;
  if netuid < base {
    return UNITS[netuid as usize].to_string();
  }
  let mut result = String::new();
  let mut n = netuid;
  while n > 0 {
    result.insert_str(0, UNITS[(n % base) as usize]);
    n /= base;
  }
  result
}

/// A monetary amount held as an integer count of base units (rao), tagged
/// with the subnet whose asset it denominates.
///
/// `unit` is `None` for amounts that have not been attached to a subnet yet;
/// untagged amounts combine freely with tagged ones. Combining two amounts
/// tagged with *different* subnets is a programming error and panics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Balance {
  raw: u128,
  unit: Option<u16>,
}

impl Balance {
  pub const fn zero() -> Self {
    Balance { raw: 0, unit: None }
  }

  pub const fn from_rao(raw: u128) -> Self {
    Balance { raw, unit: None }
  }

  /// Builds a balance from a display-unit (tao) value, rounding to the
  /// nearest rao.
  pub fn from_tao(tao: f64) -> Self {
    let raw = if tao <= 0.0 {
      0
    } else {
      (tao * RAO_PER_TAO as f64).round() as u128
    };
    Balance { raw, unit: None }
  }

  pub const fn raw(&self) -> u128 {
    self.raw
  }

  pub const fn unit(&self) -> Option<u16> {
    self.unit
  }

  pub fn tao(&self) -> f64 {
    self.raw as f64 / RAO_PER_TAO as f64
  }

  pub const fn is_zero(&self) -> bool {
    self.raw == 0
  }

  /// Attaches a subnet tag without altering the raw amount.
  pub fn set_unit(&mut self, netuid: u16) -> &mut Self {
    self.unit = Some(netuid);
    self
  }

  pub fn with_unit(mut self, netuid: u16) -> Self {
    self.unit = Some(netuid);
    self
  }

  pub fn checked_sub(&self, rhs: Balance) -> Option<Balance> {
    let unit = combine_units(self.unit, rhs.unit);
    self.raw.checked_sub(rhs.raw).map(|raw| Balance { raw, unit })
  }

  pub fn saturating_sub(&self, rhs: Balance) -> Balance {
    let unit = combine_units(self.unit, rhs.unit);
    Balance {
      raw: self.raw.saturating_sub(rhs.raw),
      unit,
    }
  }

  pub fn saturating_add(&self, rhs: Balance) -> Balance {
    let unit = combine_units(self.unit, rhs.unit);
    Balance {
      raw: self.raw.saturating_add(rhs.raw),
      unit,
    }
  }

  /// Absolute difference, used for observed-delta reporting.
  pub fn abs_diff(&self, rhs: Balance) -> Balance {
    let unit = combine_units(self.unit, rhs.unit);
    Balance {
      raw: self.raw.abs_diff(rhs.raw),
      unit,
    }
  }
}

/// Resolves the unit tag of a binary operation. Mixing two distinct subnet
/// assets is disallowed.
fn combine_units(a: Option<u16>, b: Option<u16>) -> Option<u16> {
  match (a, b) {
    (Some(x), Some(y)) => {
      assert!(x == y, "balance unit mismatch: {:?} vs {:?}", a, b);
      Some(x)
    }
    (Some(x), None) | (None, Some(x)) => Some(x),
    (None, None) => None,
  }
}

impl PartialEq for Balance {
  fn eq(&self, other: &Self) -> bool {
    self.raw == other.raw
  }
}

impl Eq for Balance {}

impl PartialOrd for Balance {
  fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
    Some(self.cmp(other))
  }
}

impl Ord for Balance {
  fn cmp(&self, other: &Self) -> Ordering {
    self.raw.cmp(&other.raw)
  }
}

impl Add for Balance {
  type Output = Balance;

  fn add(self, rhs: Balance) -> Balance {
    let unit = combine_units(self.unit, rhs.unit);
    let raw = self
      .raw
      .checked_add(rhs.raw)
      .expect("balance arithmetic overflow");
    Balance { raw, unit }
  }
}

impl Sub for Balance {
  type Output = Balance;

  fn sub(self, rhs: Balance) -> Balance {
    let unit = combine_units(self.unit, rhs.unit);
    let raw = self
      .raw
      .checked_sub(rhs.raw)
      .expect("balance arithmetic underflow");
    Balance { raw, unit }
  }
}

impl Mul<u128> for Balance {
  type Output = Balance;

  fn mul(self, rhs: u128) -> Balance {
    Balance {
      raw: self.raw.checked_mul(rhs).expect("balance arithmetic overflow"),
      unit: self.unit,
    }
  }
}

impl Div<u128> for Balance {
  type Output = Balance;

  fn div(self, rhs: u128) -> Balance {
    Balance {
      raw: self.raw / rhs,
      unit: self.unit,
    }
  }
}

impl fmt::Display for Balance {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self.unit {
      None | Some(crate::ROOT_NETUID) => write!(f, "{}{:.4}", unit_symbol(0), self.tao()),
      Some(netuid) => write!(f, "{:.4}{}", self.tao(), unit_symbol(netuid)),
    }
  }
}
