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

use async_trait::async_trait;
use serde::Deserialize;
use sp_core::crypto::AccountId32;
use sp_core::H256;

use super::types::StakeInfo;
use crate::error::ChainError;
use crate::{Balance, SubnetPool};

/// Pallet that owns every stake-moving call.
pub const STAKING_MODULE: &str = "SubtensorModule";
/// Pallet that owns the base-asset ledger.
pub const BALANCES_MODULE: &str = "Balances";
/// Minimum blocks the chain enforces between transactions of one account.
pub const TX_RATE_LIMIT: &str = "TxRateLimit";
/// Minimum balance an account must retain to stay alive.
pub const EXISTENTIAL_DEPOSIT: &str = "ExistentialDeposit";

/// How long a submission waits before reporting an outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtrinsicWait {
  /// Fire and forget: report success on broadcast, verify nothing.
  None,
  /// Wait for block inclusion (the default).
  Inclusion,
  /// Wait for finalization.
  Finalization,
}

/// A stake-moving call, in the exact wire shape the chain expects.
/// Parameter names and units must be reproduced bit-for-bit.
#[derive(Debug, Clone, PartialEq)]
pub enum StakeCall {
  AddStake {
    hotkey: AccountId32,
    netuid: u16,
    amount_staked: u128,
  },
  AddStakeLimit {
    hotkey: AccountId32,
    netuid: u16,
    amount_staked: u128,
    limit_price: u128,
    allow_partial: bool,
  },
  RemoveStake {
    hotkey: AccountId32,
    netuid: u16,
    amount_unstaked: u128,
  },
  RemoveStakeLimit {
    hotkey: AccountId32,
    netuid: u16,
    amount_unstaked: u128,
    limit_price: u128,
    allow_partial: bool,
  },
  MoveStake {
    origin_hotkey: AccountId32,
    origin_netuid: u16,
    destination_hotkey: AccountId32,
    destination_netuid: u16,
    alpha_amount: u128,
  },
  SwapStake {
    hotkey: AccountId32,
    origin_netuid: u16,
    destination_netuid: u16,
    alpha_amount: u128,
  },
  TransferStake {
    destination_coldkey: AccountId32,
    hotkey: AccountId32,
    origin_netuid: u16,
    destination_netuid: u16,
    alpha_amount: u128,
  },
}

impl StakeCall {
  /// On-chain call function name.
  pub fn function(&self) -> &'static str {
    match self {
      StakeCall::AddStake { .. } => "add_stake",
      StakeCall::AddStakeLimit { .. } => "add_stake_limit",
      StakeCall::RemoveStake { .. } => "remove_stake",
      StakeCall::RemoveStakeLimit { .. } => "remove_stake_limit",
      StakeCall::MoveStake { .. } => "move_stake",
      StakeCall::SwapStake { .. } => "swap_stake",
      StakeCall::TransferStake { .. } => "transfer_stake",
    }
  }

  /// True for the price-limited call variants.
  pub fn is_limit(&self) -> bool {
    matches!(
      self,
      StakeCall::AddStakeLimit { .. } | StakeCall::RemoveStakeLimit { .. }
    )
  }
}

/// Inputs to the marginal-fee query for a prospective stake movement.
#[derive(Debug, Clone)]
pub struct StakeFeeRequest {
  pub origin_hotkey: Option<AccountId32>,
  pub origin_netuid: Option<u16>,
  pub origin_coldkey: AccountId32,
  pub destination_hotkey: Option<AccountId32>,
  pub destination_netuid: Option<u16>,
  pub destination_coldkey: AccountId32,
  pub amount: u128,
}

/// Outcome of a submission, as far as the requested wait level can know it.
#[derive(Debug, Clone)]
pub struct InclusionReceipt {
  /// Whether the extrinsic was observed in a block. False for
  /// fire-and-forget broadcasts.
  pub included: bool,
  pub success: bool,
  /// Chain-supplied error text, verbatim, when `success` is false.
  pub error: Option<String>,
  pub block_hash: Option<H256>,
}

impl InclusionReceipt {
  pub fn broadcast() -> Self {
    InclusionReceipt {
      included: false,
      success: true,
      error: None,
      block_hash: None,
    }
  }
}

/// The engine's seam to the chain RPC collaborator.
///
/// Reads may be fanned out concurrently; submissions must be serialized per
/// account by the caller, since each consumes the account's next nonce.
#[async_trait]
pub trait ChainInterface: Send + Sync {
  async fn get_chain_head(&self) -> Result<H256, ChainError>;

  /// Free balance of a coldkey.
  async fn get_balance(
    &self,
    coldkey: &AccountId32,
    at: Option<H256>,
  ) -> Result<Balance, ChainError>;

  /// Stake of one (hotkey, coldkey, netuid) position.
  async fn get_stake(
    &self,
    hotkey: &AccountId32,
    coldkey: &AccountId32,
    netuid: u16,
    at: Option<H256>,
  ) -> Result<Balance, ChainError>;

  /// Every stake position of a coldkey, in one batched query.
  async fn get_stake_for_coldkey(
    &self,
    coldkey: &AccountId32,
    at: Option<H256>,
  ) -> Result<Vec<StakeInfo>, ChainError>;

  /// AMM snapshots of every subnet.
  async fn all_subnets(&self, at: Option<H256>) -> Result<Vec<SubnetPool>, ChainError>;

  /// Marginal fee of a prospective stake movement.
  async fn get_stake_fee(&self, request: &StakeFeeRequest) -> Result<Balance, ChainError>;

  /// Network parameter lookup (TxRateLimit, ExistentialDeposit).
  async fn get_constant_u128(&self, pallet: &str, name: &str) -> Result<u128, ChainError>;

  /// Signs and submits a stake call, waiting as requested.
  async fn submit(
    &self,
    call: StakeCall,
    wait: ExtrinsicWait,
  ) -> Result<InclusionReceipt, ChainError>;
}
