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

use serde::{Deserialize, Serialize};

use crate::error::{FatalInputError, ValidationError};
use crate::{Balance, RAO_PER_TAO, ROOT_NETUID};

/// Which side of the pool an operation trades toward. Staking buys the
/// subnet asset, unstaking sells it back for the base asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeDirection {
  Staking,
  Unstaking,
}

/// Result of a slippage-aware conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapOutcome {
  /// Amount actually received after slippage (and fee, where applicable).
  pub received: Balance,
  /// Shortfall versus the ideal, slippage-free output.
  pub slippage: Balance,
  /// Shortfall as a percentage of the ideal output.
  pub slippage_pct: f64,
}

/// Read-only snapshot of one subnet's AMM state at a single block height.
///
/// All conversions are pure functions over the snapshot; nothing here is
/// refreshed between the sequential submissions of a batch. A long batch
/// therefore executes against progressively staler price expectations,
/// mitigated only by the per-operation price limit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubnetPool {
  pub netuid: u16,
  pub tao_in: Balance,
  pub alpha_in: Balance,
  pub alpha_out: Balance,
  pub price: Balance,
  pub is_dynamic: bool,
}

impl SubnetPool {
  /// Builds a snapshot from raw reserves. The root subnet is pinned to a
  /// static 1:1 pool; every other subnet prices at `tao_in / alpha_in`.
  pub fn new(netuid: u16, tao_in: u128, alpha_in: u128, alpha_out: u128) -> Self {
    let is_dynamic = netuid != ROOT_NETUID;
    let price = if !is_dynamic {
      Balance::from_rao(RAO_PER_TAO)
    } else if alpha_in > 0 {
      Balance::from_rao(tao_in.saturating_mul(RAO_PER_TAO) / alpha_in)
    } else {
      Balance::zero()
    };
    SubnetPool {
      netuid,
      tao_in: Balance::from_rao(tao_in).with_unit(ROOT_NETUID),
      alpha_in: Balance::from_rao(alpha_in).with_unit(netuid),
      alpha_out: Balance::from_rao(alpha_out).with_unit(netuid),
      price,
      is_dynamic,
    }
  }

  /// Constant-product invariant of the pool.
  fn k(&self) -> u128 {
    self.tao_in.raw().saturating_mul(self.alpha_in.raw())
  }

  /// Ideal conversion of a base-asset amount into the subnet asset.
  ///
  /// The reserve ratio is used directly rather than the rounded `price`
  /// so the round-trip through `to_tao` stays within integer rounding.
  pub fn to_alpha(&self, tao: Balance) -> Balance {
    if !self.is_dynamic {
      return Balance::from_rao(tao.raw()).with_unit(self.netuid);
    }
    if self.tao_in.is_zero() {
      return Balance::zero().with_unit(self.netuid);
    }
    Balance::from_rao(tao.raw().saturating_mul(self.alpha_in.raw()) / self.tao_in.raw())
      .with_unit(self.netuid)
  }

  /// Ideal conversion of a subnet-asset amount into the base asset.
  pub fn to_tao(&self, alpha: Balance) -> Balance {
    if !self.is_dynamic {
      return Balance::from_rao(alpha.raw()).with_unit(ROOT_NETUID);
    }
    if self.alpha_in.is_zero() {
      return Balance::zero().with_unit(ROOT_NETUID);
    }
    Balance::from_rao(alpha.raw().saturating_mul(self.tao_in.raw()) / self.alpha_in.raw())
      .with_unit(ROOT_NETUID)
  }

  /// Estimates the subnet asset received for staking `tao`, and the
  /// shortfall versus the ideal conversion.
  pub fn tao_to_alpha_with_slippage(&self, tao: Balance) -> SwapOutcome {
    if !self.is_dynamic {
      return SwapOutcome {
        received: Balance::from_rao(tao.raw()).with_unit(self.netuid),
        slippage: Balance::zero().with_unit(self.netuid),
        slippage_pct: 0.0,
      };
    }

    let new_tao_in = self.tao_in.raw().saturating_add(tao.raw());
    let received = if new_tao_in == 0 {
      Balance::from_rao(tao.raw()).with_unit(self.netuid)
    } else {
      let new_alpha_in = self.k() / new_tao_in;
      Balance::from_rao(self.alpha_in.raw().saturating_sub(new_alpha_in)).with_unit(self.netuid)
    };

    let ideal = self.to_alpha(tao);
    let slippage = ideal.saturating_sub(received);
    SwapOutcome {
      received,
      slippage,
      slippage_pct: slippage_pct(slippage, ideal),
    }
  }

  /// Estimates the base asset received for unstaking `alpha`, deducting the
  /// fee from the input before the constant-product step.
  ///
  /// An amount that does not cover the fee is a fatal input error: the pair
  /// must be dropped before any chain interaction is attempted.
  pub fn alpha_to_tao_with_slippage(
    &self,
    alpha: Balance,
    fee: Balance,
  ) -> Result<SwapOutcome, FatalInputError> {
    let amount_in = alpha
      .checked_sub(fee)
      .ok_or(FatalInputError { amount: alpha, fee })?;

    if !self.is_dynamic {
      return Ok(SwapOutcome {
        received: Balance::from_rao(amount_in.raw()).with_unit(ROOT_NETUID),
        slippage: Balance::zero().with_unit(ROOT_NETUID),
        slippage_pct: 0.0,
      });
    }

    let new_alpha_in = self.alpha_in.raw().saturating_add(amount_in.raw());
    let received = if new_alpha_in == 0 {
      Balance::from_rao(amount_in.raw()).with_unit(ROOT_NETUID)
    } else {
      let new_tao_in = self.k() / new_alpha_in;
      Balance::from_rao(self.tao_in.raw().saturating_sub(new_tao_in)).with_unit(ROOT_NETUID)
    };

    // Shortfall measured against the ideal output of the full input.
    let ideal = self.to_tao(alpha);
    let slippage = ideal.saturating_sub(received);
    Ok(SwapOutcome {
      received,
      slippage,
      slippage_pct: slippage_pct(slippage, ideal),
    })
  }

  /// Derives the worst-acceptable price for a safe operation.
  ///
  /// Staking tolerates a price up to `price * (1 + tolerance)`, unstaking
  /// down to `price * (1 - tolerance)`. The root pool has no slippage to
  /// protect against, so its limit is pinned to the smallest non-zero
  /// price. Tolerances outside `[0, 1)` are rejected, never clamped.
  pub fn price_with_tolerance(
    &self,
    tolerance: f64,
    direction: TradeDirection,
  ) -> Result<Balance, ValidationError> {
    if !(0.0..1.0).contains(&tolerance) {
      return Err(ValidationError::ToleranceOutOfRange(tolerance));
    }
    if !self.is_dynamic {
      return Ok(Balance::from_rao(1));
    }
    let factor = match direction {
      TradeDirection::Staking => 1.0 + tolerance,
      TradeDirection::Unstaking => 1.0 - tolerance,
    };
    Ok(Balance::from_rao((self.price.raw() as f64 * factor).round() as u128))
  }
}

fn slippage_pct(slippage: Balance, ideal: Balance) -> f64 {
  if ideal.is_zero() {
    0.0
  } else {
    100.0 * slippage.raw() as f64 / ideal.raw() as f64
  }
}
