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

use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use sp_core::crypto::AccountId32;
use sp_core::H256;

use crate::chain::client::{
  ChainInterface, ExtrinsicWait, InclusionReceipt, StakeCall, StakeFeeRequest,
  EXISTENTIAL_DEPOSIT, TX_RATE_LIMIT,
};
use crate::chain::types::StakeInfo;
use crate::error::ChainError;
use crate::{Balance, SubnetPool, TOLERANCE_CUSTOM_ERROR};

/// What the next submission should do. Behaviors are consumed in order;
/// once the script runs out every further submission succeeds.
pub enum SubmitBehavior {
  Succeed,
  /// Land, but only fill `numerator / denominator` of the request.
  PartialFill(u128, u128),
  /// Included, then failed on-chain with this error text.
  FailExecution(String),
  /// Rejected at submission with the tolerance-exceeded custom error.
  RejectTolerance,
  /// Transport broke before an outcome was known.
  Transport(String),
}

struct MockState {
  balances: BTreeMap<AccountId32, u128>,
  stakes: BTreeMap<(AccountId32, u16), u128>,
}

/// Programmable chain double. Successful submissions mutate the tracked
/// balances and stakes so post-inclusion delta queries observe them.
pub struct MockChain {
  pub coldkey: AccountId32,
  pub pools: Vec<SubnetPool>,
  pub tx_rate_limit: u128,
  pub existential_deposit: u128,
  pub stake_fee: u128,
  state: Mutex<MockState>,
  behaviors: Mutex<VecDeque<SubmitBehavior>>,
  pub submitted: Mutex<Vec<StakeCall>>,
}

impl MockChain {
  pub fn new(coldkey: AccountId32, pools: Vec<SubnetPool>) -> Self {
    MockChain {
      coldkey,
      pools,
      tx_rate_limit: 0,
      existential_deposit: 0,
      stake_fee: 0,
      state: Mutex::new(MockState {
        balances: BTreeMap::new(),
        stakes: BTreeMap::new(),
      }),
      behaviors: Mutex::new(VecDeque::new()),
      submitted: Mutex::new(Vec::new()),
    }
  }

  pub fn set_balance(&self, account: &AccountId32, rao: u128) {
    self
      .state
      .lock()
      .unwrap()
      .balances
      .insert(account.clone(), rao);
  }

  pub fn set_stake(&self, hotkey: &AccountId32, netuid: u16, rao: u128) {
    self
      .state
      .lock()
      .unwrap()
      .stakes
      .insert((hotkey.clone(), netuid), rao);
  }

  pub fn push_behavior(&self, behavior: SubmitBehavior) {
    self.behaviors.lock().unwrap().push_back(behavior);
  }

  pub fn submitted_calls(&self) -> Vec<StakeCall> {
    self.submitted.lock().unwrap().clone()
  }

  fn apply(&self, call: &StakeCall, numerator: u128, denominator: u128) {
    let mut state = self.state.lock().unwrap();
    let fill = |amount: &u128| amount * numerator / denominator;
    match call {
      StakeCall::AddStake {
        hotkey,
        netuid,
        amount_staked,
      }
      | StakeCall::AddStakeLimit {
        hotkey,
        netuid,
        amount_staked,
        ..
      } => {
        let filled = fill(amount_staked);
        let balance = state.balances.entry(self.coldkey.clone()).or_insert(0);
        *balance = balance.saturating_sub(filled);
        *state.stakes.entry((hotkey.clone(), *netuid)).or_insert(0) += filled;
      }
      StakeCall::RemoveStake {
        hotkey,
        netuid,
        amount_unstaked,
      }
      | StakeCall::RemoveStakeLimit {
        hotkey,
        netuid,
        amount_unstaked,
        ..
      } => {
        let filled = fill(amount_unstaked);
        let stake = state.stakes.entry((hotkey.clone(), *netuid)).or_insert(0);
        *stake = stake.saturating_sub(filled);
        *state.balances.entry(self.coldkey.clone()).or_insert(0) += filled;
      }
      StakeCall::MoveStake {
        origin_hotkey,
        origin_netuid,
        destination_hotkey,
        destination_netuid,
        alpha_amount,
      } => {
        let filled = fill(alpha_amount);
        let stake = state
          .stakes
          .entry((origin_hotkey.clone(), *origin_netuid))
          .or_insert(0);
        *stake = stake.saturating_sub(filled);
        *state
          .stakes
          .entry((destination_hotkey.clone(), *destination_netuid))
          .or_insert(0) += filled;
      }
      StakeCall::SwapStake {
        hotkey,
        origin_netuid,
        destination_netuid,
        alpha_amount,
      } => {
        let filled = fill(alpha_amount);
        let stake = state
          .stakes
          .entry((hotkey.clone(), *origin_netuid))
          .or_insert(0);
        *stake = stake.saturating_sub(filled);
        *state
          .stakes
          .entry((hotkey.clone(), *destination_netuid))
          .or_insert(0) += filled;
      }
      StakeCall::TransferStake {
        hotkey,
        origin_netuid,
        alpha_amount,
        ..
      } => {
        let filled = fill(alpha_amount);
        let stake = state
          .stakes
          .entry((hotkey.clone(), *origin_netuid))
          .or_insert(0);
        *stake = stake.saturating_sub(filled);
      }
    }
  }
}

#[async_trait]
impl ChainInterface for MockChain {
  async fn get_chain_head(&self) -> Result<H256, ChainError> {
    Ok(H256::zero())
  }

  async fn get_balance(
    &self,
    coldkey: &AccountId32,
    _at: Option<H256>,
  ) -> Result<Balance, ChainError> {
    let state = self.state.lock().unwrap();
    Ok(Balance::from_rao(
      state.balances.get(coldkey).copied().unwrap_or(0),
    ))
  }

  async fn get_stake(
    &self,
    hotkey: &AccountId32,
    _coldkey: &AccountId32,
    netuid: u16,
    _at: Option<H256>,
  ) -> Result<Balance, ChainError> {
    let state = self.state.lock().unwrap();
    Ok(
      Balance::from_rao(
        state
          .stakes
          .get(&(hotkey.clone(), netuid))
          .copied()
          .unwrap_or(0),
      )
      .with_unit(netuid),
    )
  }

  async fn get_stake_for_coldkey(
    &self,
    coldkey: &AccountId32,
    _at: Option<H256>,
  ) -> Result<Vec<StakeInfo>, ChainError> {
    let state = self.state.lock().unwrap();
    Ok(
      state
        .stakes
        .iter()
        .map(|((hotkey, netuid), stake)| StakeInfo {
          hotkey: hotkey.clone(),
          coldkey: coldkey.clone(),
          netuid: *netuid,
          stake: Balance::from_rao(*stake).with_unit(*netuid),
          is_registered: true,
        })
        .collect(),
    )
  }

  async fn all_subnets(&self, _at: Option<H256>) -> Result<Vec<SubnetPool>, ChainError> {
    Ok(self.pools.clone())
  }

  async fn get_stake_fee(&self, _request: &StakeFeeRequest) -> Result<Balance, ChainError> {
    Ok(Balance::from_rao(self.stake_fee))
  }

  async fn get_constant_u128(&self, _pallet: &str, name: &str) -> Result<u128, ChainError> {
    match name {
      TX_RATE_LIMIT => Ok(self.tx_rate_limit),
      EXISTENTIAL_DEPOSIT => Ok(self.existential_deposit),
      _ => Ok(0),
    }
  }

  async fn submit(
    &self,
    call: StakeCall,
    wait: ExtrinsicWait,
  ) -> Result<InclusionReceipt, ChainError> {
    self.submitted.lock().unwrap().push(call.clone());

    let behavior = self
      .behaviors
      .lock()
      .unwrap()
      .pop_front()
      .unwrap_or(SubmitBehavior::Succeed);

    match behavior {
      SubmitBehavior::Succeed => {
        self.apply(&call, 1, 1);
        if wait == ExtrinsicWait::None {
          Ok(InclusionReceipt::broadcast())
        } else {
          Ok(InclusionReceipt {
            included: true,
            success: true,
            error: None,
            block_hash: Some(H256::zero()),
          })
        }
      }
      SubmitBehavior::PartialFill(numerator, denominator) => {
        self.apply(&call, numerator, denominator);
        Ok(InclusionReceipt {
          included: true,
          success: true,
          error: None,
          block_hash: Some(H256::zero()),
        })
      }
      SubmitBehavior::FailExecution(message) => Ok(InclusionReceipt {
        included: true,
        success: false,
        error: Some(message),
        block_hash: Some(H256::zero()),
      }),
      SubmitBehavior::RejectTolerance => Err(ChainError::Request(format!(
        "Invalid Transaction: {}",
        TOLERANCE_CUSTOM_ERROR
      ))),
      SubmitBehavior::Transport(message) => Err(ChainError::Transport(message)),
    }
  }
}
