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

use sp_core::crypto::{AccountId32, Ss58Codec};
use strum_macros::Display;

use crate::chain::client::StakeCall;
use crate::error::{PlanRejection, ValidationError};
use crate::pool::SwapOutcome;
use crate::{Balance, ROOT_NETUID};

/// Parses an ss58 account address. Malformed addresses are rejected here,
/// before any chain interaction.
pub fn parse_address(address: &str) -> Result<AccountId32, ValidationError> {
  AccountId32::from_ss58check(address)
    .map_err(|_| ValidationError::InvalidAddress(address.to_string()))
}

/// The kind of stake movement being planned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StakeOperationKind {
  /// Base asset in, subnet asset out.
  Stake,
  /// Subnet asset in, base asset out.
  Unstake,
  /// Same coldkey, different hotkey and/or subnet.
  Move,
  /// Same hotkey, different subnet.
  Swap,
  /// Same hotkey and subnet, different coldkey.
  Transfer,
}

/// How much to move per (hotkey, subnet) pair.
///
/// An explicit amount is applied to every pair as-is, not divided across
/// them; callers intending an aggregate cap must pre-divide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AmountSpec {
  Exact(Balance),
  All,
  Prompt,
}

/// Answer from the interactive amount prompt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PromptResponse {
  Amount(Balance),
  All,
  /// Stop going over remaining pairs and keep what was already collected.
  Quit,
}

/// Input collaborator for interactive planning. This is not the renderer:
/// it supplies amounts, it is never consulted for engine decisions.
pub trait AmountPrompter: Send + Sync {
  fn prompt_amount(&self, netuid: u16, max: Balance) -> PromptResponse;
}

/// Safe-staking parameters carried through to the `_limit` call variants.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafeStakingParams {
  /// Price tolerance fraction in `[0, 1)`.
  pub rate_tolerance: f64,
  /// Whether a partially filled trade is acceptable.
  pub allow_partial: bool,
}

/// High-level user intent, before validation and amount resolution.
#[derive(Debug, Clone)]
pub struct StakeIntent {
  pub kind: StakeOperationKind,
  pub hotkeys: Vec<AccountId32>,
  /// Target subnets. `None` means every subnet known to the chain.
  pub netuids: Option<Vec<u16>>,
  pub amount: AmountSpec,
  pub safe: Option<SafeStakingParams>,
  pub destination_hotkey: Option<AccountId32>,
  pub destination_netuid: Option<u16>,
  pub destination_coldkey: Option<AccountId32>,
}

impl StakeIntent {
  pub fn stake(hotkeys: Vec<AccountId32>, netuids: Option<Vec<u16>>, amount: AmountSpec) -> Self {
    StakeIntent {
      kind: StakeOperationKind::Stake,
      hotkeys,
      netuids,
      amount,
      safe: None,
      destination_hotkey: None,
      destination_netuid: None,
      destination_coldkey: None,
    }
  }

  pub fn unstake(hotkeys: Vec<AccountId32>, netuids: Option<Vec<u16>>, amount: AmountSpec) -> Self {
    StakeIntent {
      kind: StakeOperationKind::Unstake,
      ..StakeIntent::stake(hotkeys, netuids, amount)
    }
  }

  pub fn move_stake(
    hotkey: AccountId32,
    origin_netuid: u16,
    destination_hotkey: AccountId32,
    destination_netuid: u16,
    amount: AmountSpec,
  ) -> Self {
    StakeIntent {
      kind: StakeOperationKind::Move,
      destination_hotkey: Some(destination_hotkey),
      destination_netuid: Some(destination_netuid),
      ..StakeIntent::stake(vec![hotkey], Some(vec![origin_netuid]), amount)
    }
  }

  pub fn swap_stake(
    hotkey: AccountId32,
    origin_netuid: u16,
    destination_netuid: u16,
    amount: AmountSpec,
  ) -> Self {
    StakeIntent {
      kind: StakeOperationKind::Swap,
      destination_netuid: Some(destination_netuid),
      ..StakeIntent::stake(vec![hotkey], Some(vec![origin_netuid]), amount)
    }
  }

  pub fn transfer_stake(
    hotkey: AccountId32,
    origin_netuid: u16,
    destination_netuid: u16,
    destination_coldkey: AccountId32,
    amount: AmountSpec,
  ) -> Self {
    StakeIntent {
      kind: StakeOperationKind::Transfer,
      destination_netuid: Some(destination_netuid),
      destination_coldkey: Some(destination_coldkey),
      ..StakeIntent::stake(vec![hotkey], Some(vec![origin_netuid]), amount)
    }
  }

  pub fn with_safe(mut self, params: SafeStakingParams) -> Self {
    self.safe = Some(params);
    self
  }
}

/// One concrete, individually-sufficient operation ready for submission.
/// Built once per (hotkey, subnet) pair, immutable, consumed exactly once.
#[derive(Debug, Clone, PartialEq)]
pub struct StakeOperation {
  pub kind: StakeOperationKind,
  pub origin_netuid: u16,
  pub destination_netuid: Option<u16>,
  pub origin_hotkey: AccountId32,
  pub destination_hotkey: Option<AccountId32>,
  pub destination_coldkey: Option<AccountId32>,
  pub amount: Balance,
  pub current_stake_balance: Balance,
  pub price_limit: Option<Balance>,
  pub allow_partial: bool,
  /// Marginal extrinsic fee, attached for display and accounting. Not a
  /// blocking check for staking: the chain re-verifies at execution.
  pub fee: Balance,
  /// Slippage-adjusted estimate of what this operation returns.
  pub expected: Option<SwapOutcome>,
}

impl StakeOperation {
  /// Builds the wire call. Limit variants exist only for staking and
  /// unstaking, and the root subnet never uses them: its pool has no
  /// slippage to protect against.
  pub fn to_call(&self) -> StakeCall {
    let use_limit = self.price_limit.is_some() && self.origin_netuid != ROOT_NETUID;
    match self.kind {
      StakeOperationKind::Stake => {
        if use_limit {
          StakeCall::AddStakeLimit {
            hotkey: self.origin_hotkey.clone(),
            netuid: self.origin_netuid,
            amount_staked: self.amount.raw(),
            limit_price: self.price_limit.unwrap().raw(),
            allow_partial: self.allow_partial,
          }
        } else {
          StakeCall::AddStake {
            hotkey: self.origin_hotkey.clone(),
            netuid: self.origin_netuid,
            amount_staked: self.amount.raw(),
          }
        }
      }
      StakeOperationKind::Unstake => {
        if use_limit {
          StakeCall::RemoveStakeLimit {
            hotkey: self.origin_hotkey.clone(),
            netuid: self.origin_netuid,
            amount_unstaked: self.amount.raw(),
            limit_price: self.price_limit.unwrap().raw(),
            allow_partial: self.allow_partial,
          }
        } else {
          StakeCall::RemoveStake {
            hotkey: self.origin_hotkey.clone(),
            netuid: self.origin_netuid,
            amount_unstaked: self.amount.raw(),
          }
        }
      }
      StakeOperationKind::Move => StakeCall::MoveStake {
        origin_hotkey: self.origin_hotkey.clone(),
        origin_netuid: self.origin_netuid,
        destination_hotkey: self.destination_hotkey.clone().unwrap(),
        destination_netuid: self.destination_netuid.unwrap(),
        alpha_amount: self.amount.raw(),
      },
      StakeOperationKind::Swap => StakeCall::SwapStake {
        hotkey: self.origin_hotkey.clone(),
        origin_netuid: self.origin_netuid,
        destination_netuid: self.destination_netuid.unwrap(),
        alpha_amount: self.amount.raw(),
      },
      StakeOperationKind::Transfer => StakeCall::TransferStake {
        destination_coldkey: self.destination_coldkey.clone().unwrap(),
        hotkey: self.origin_hotkey.clone(),
        origin_netuid: self.origin_netuid,
        destination_netuid: self.destination_netuid.unwrap(),
        alpha_amount: self.amount.raw(),
      },
    }
  }
}

/// A pair dropped from the plan, with the reason recorded for the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedPair {
  pub hotkey: AccountId32,
  pub netuid: u16,
  pub reason: PlanRejection,
}

/// Planner output: operations in insertion order plus the pairs that were
/// rejected before submission. No reordering or prioritization happens
/// downstream.
#[derive(Debug, Clone, Default)]
pub struct StakePlan {
  pub operations: Vec<StakeOperation>,
  pub skipped: Vec<SkippedPair>,
  /// Worst per-pair slippage estimate, for the caller's warning banner.
  pub max_slippage_pct: f64,
  /// Total base asset expected back, for unstake plans.
  pub total_received: Option<Balance>,
}

impl StakePlan {
  pub fn is_empty(&self) -> bool {
    self.operations.is_empty()
  }
}
