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

use codec::{Compact, Decode};
use sp_core::crypto::AccountId32;

use crate::{Balance, SubnetPool};

/// An existing stake position, decoded once at the chain boundary.
#[derive(Debug, Clone, PartialEq)]
pub struct StakeInfo {
  pub hotkey: AccountId32,
  pub coldkey: AccountId32,
  pub netuid: u16,
  pub stake: Balance,
  pub is_registered: bool,
}

// SCALE shapes as the chain returns them. Decoded here and nowhere else;
// planning and execution only ever see the typed records above.

#[derive(Decode)]
pub(crate) struct RawAccountData {
  pub free: u64,
  pub _reserved: u64,
  pub _frozen: u64,
  pub _flags: u128,
}

#[derive(Decode)]
pub(crate) struct RawAccountInfo {
  pub _nonce: u32,
  pub _consumers: u32,
  pub _providers: u32,
  pub _sufficients: u32,
  pub data: RawAccountData,
}

#[derive(Decode)]
pub(crate) struct RawStakeInfo {
  pub hotkey: AccountId32,
  pub coldkey: AccountId32,
  pub netuid: Compact<u16>,
  pub stake: Compact<u64>,
  pub _locked: Compact<u64>,
  pub _emission: Compact<u64>,
  pub _drain: Compact<u16>,
  pub is_registered: bool,
}

impl From<RawStakeInfo> for StakeInfo {
  fn from(raw: RawStakeInfo) -> Self {
    let netuid = raw.netuid.0;
    StakeInfo {
      hotkey: raw.hotkey,
      coldkey: raw.coldkey,
      netuid,
      stake: Balance::from_rao(raw.stake.0 as u128).with_unit(netuid),
      is_registered: raw.is_registered,
    }
  }
}

#[derive(Decode)]
pub(crate) struct RawSubnetIdentity {
  pub _subnet_name: Vec<u8>,
  pub _github_repo: Vec<u8>,
  pub _subnet_contact: Vec<u8>,
  pub _subnet_url: Vec<u8>,
  pub _discord: Vec<u8>,
  pub _description: Vec<u8>,
  pub _additional: Vec<u8>,
}

#[derive(Decode)]
pub(crate) struct RawDynamicInfo {
  pub netuid: Compact<u16>,
  pub _owner_hotkey: AccountId32,
  pub _owner_coldkey: AccountId32,
  pub _subnet_name: Vec<Compact<u8>>,
  pub _token_symbol: Vec<Compact<u8>>,
  pub _tempo: Compact<u16>,
  pub _last_step: Compact<u64>,
  pub _blocks_since_last_step: Compact<u64>,
  pub _emission: Compact<u64>,
  pub alpha_in: Compact<u64>,
  pub alpha_out: Compact<u64>,
  pub tao_in: Compact<u64>,
  pub _alpha_out_emission: Compact<u64>,
  pub _alpha_in_emission: Compact<u64>,
  pub _tao_in_emission: Compact<u64>,
  pub _pending_alpha_emission: Compact<u64>,
  pub _pending_root_emission: Compact<u64>,
  pub _subnet_volume: Compact<u128>,
  pub _network_registered_at: Compact<u64>,
  pub _subnet_identity: Option<RawSubnetIdentity>,
}

impl From<RawDynamicInfo> for SubnetPool {
  fn from(raw: RawDynamicInfo) -> Self {
    SubnetPool::new(
      raw.netuid.0,
      raw.tao_in.0 as u128,
      raw.alpha_in.0 as u128,
      raw.alpha_out.0 as u128,
    )
  }
}
