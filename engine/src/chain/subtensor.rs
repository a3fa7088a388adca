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
use codec::{Decode, Encode};
use sp_core::crypto::AccountId32;
use sp_core::H256;
use subxt::config::DefaultExtrinsicParamsBuilder;
use subxt::dynamic::{self, Value};
use subxt::ext::scale_value::{Composite, Primitive, ValueDef};
use subxt::tx::{TxInBlock, TxStatus};
use subxt::{OnlineClient, PolkadotConfig};
use subxt_signer::sr25519::Keypair;

use super::client::{
  ChainInterface, ExtrinsicWait, InclusionReceipt, StakeCall, StakeFeeRequest, STAKING_MODULE,
};
use super::types::{RawAccountInfo, RawDynamicInfo, RawStakeInfo, StakeInfo};
use crate::error::ChainError;
use crate::{Balance, EngineConfig, SubnetPool};

const STAKE_INFO_RUNTIME_API: &str = "StakeInfoRuntimeApi";
const SUBNET_INFO_RUNTIME_API: &str = "SubnetInfoRuntimeApi";

/// Subxt-backed chain client. The signing keypair is handed in by the
/// wallet subsystem; nothing here reads key material from disk.
pub struct SubtensorClient {
  client: OnlineClient<PolkadotConfig>,
  signer: Keypair,
  era_period: u64,
}

impl SubtensorClient {
  pub async fn connect(config: &EngineConfig, signer: Keypair) -> Result<Self, ChainError> {
    let client = OnlineClient::<PolkadotConfig>::from_url(&config.endpoint)
      .await
      .map_err(classify)?;
    log::info!("connected to chain endpoint {}", config.endpoint);
    Ok(SubtensorClient {
      client,
      signer,
      era_period: config.era_period,
    })
  }

  async fn storage_at(
    &self,
    at: Option<H256>,
  ) -> Result<subxt::storage::Storage<PolkadotConfig, OnlineClient<PolkadotConfig>>, ChainError>
  {
    match at {
      Some(hash) => Ok(self.client.storage().at(to_subxt_hash(hash))),
      None => self.client.storage().at_latest().await.map_err(classify),
    }
  }

  async fn runtime_api_at(
    &self,
    at: Option<H256>,
  ) -> Result<
    subxt::runtime_api::RuntimeApi<PolkadotConfig, OnlineClient<PolkadotConfig>>,
    ChainError,
  > {
    match at {
      Some(hash) => Ok(self.client.runtime_api().at(to_subxt_hash(hash))),
      None => self.client.runtime_api().at_latest().await.map_err(classify),
    }
  }

  async fn receipt_from(
    in_block: TxInBlock<PolkadotConfig, OnlineClient<PolkadotConfig>>,
  ) -> Result<InclusionReceipt, ChainError> {
    let block_hash = from_subxt_hash(in_block.block_hash());
    match in_block.wait_for_success().await {
      Ok(_) => Ok(InclusionReceipt {
        included: true,
        success: true,
        error: None,
        block_hash: Some(block_hash),
      }),
      Err(subxt::Error::Runtime(dispatch_error)) => Ok(InclusionReceipt {
        included: true,
        success: false,
        error: Some(dispatch_error.to_string()),
        block_hash: Some(block_hash),
      }),
      Err(other) => Err(classify(other)),
    }
  }
}

#[async_trait]
impl ChainInterface for SubtensorClient {
  async fn get_chain_head(&self) -> Result<H256, ChainError> {
    let block = self.client.blocks().at_latest().await.map_err(classify)?;
    Ok(from_subxt_hash(block.hash()))
  }

  async fn get_balance(
    &self,
    coldkey: &AccountId32,
    at: Option<H256>,
  ) -> Result<Balance, ChainError> {
    let addr = dynamic::storage(
      "System",
      "Account",
      vec![Value::from_bytes(coldkey.encode())],
    );
    let storage = self.storage_at(at).await?;
    match storage.fetch(&addr).await.map_err(classify)? {
      Some(thunk) => {
        let bytes = thunk.into_encoded();
        let info = RawAccountInfo::decode(&mut &bytes[..])
          .map_err(|e| ChainError::Decode(e.to_string()))?;
        Ok(Balance::from_rao(info.data.free as u128))
      }
      None => Ok(Balance::zero()),
    }
  }

  async fn get_stake(
    &self,
    hotkey: &AccountId32,
    coldkey: &AccountId32,
    netuid: u16,
    at: Option<H256>,
  ) -> Result<Balance, ChainError> {
    let api = self.runtime_api_at(at).await?;
    let payload = dynamic::runtime_api_call(
      STAKE_INFO_RUNTIME_API,
      "get_stake_info_for_hotkey_coldkey_netuid",
      vec![
        Value::from_bytes(hotkey.encode()),
        Value::from_bytes(coldkey.encode()),
        Value::u128(netuid as u128),
      ],
    );
    let thunk = api.call(payload).await.map_err(classify)?;
    let bytes = thunk.into_encoded();
    let info = Option::<RawStakeInfo>::decode(&mut &bytes[..])
      .map_err(|e| ChainError::Decode(e.to_string()))?;
    Ok(
      info
        .map(|raw| StakeInfo::from(raw).stake)
        .unwrap_or_else(|| Balance::zero().with_unit(netuid)),
    )
  }

  async fn get_stake_for_coldkey(
    &self,
    coldkey: &AccountId32,
    at: Option<H256>,
  ) -> Result<Vec<StakeInfo>, ChainError> {
    let api = self.runtime_api_at(at).await?;
    let payload = dynamic::runtime_api_call(
      STAKE_INFO_RUNTIME_API,
      "get_stake_info_for_coldkey",
      vec![Value::from_bytes(coldkey.encode())],
    );
    let thunk = api.call(payload).await.map_err(classify)?;
    let bytes = thunk.into_encoded();
    let raw = Vec::<RawStakeInfo>::decode(&mut &bytes[..])
      .map_err(|e| ChainError::Decode(e.to_string()))?;
    Ok(raw.into_iter().map(StakeInfo::from).collect())
  }

  async fn all_subnets(&self, at: Option<H256>) -> Result<Vec<SubnetPool>, ChainError> {
    let api = self.runtime_api_at(at).await?;
    let payload = dynamic::runtime_api_call(
      SUBNET_INFO_RUNTIME_API,
      "get_all_dynamic_info",
      Vec::<Value>::new(),
    );
    let thunk = api.call(payload).await.map_err(classify)?;
    let bytes = thunk.into_encoded();
    let raw = Vec::<Option<RawDynamicInfo>>::decode(&mut &bytes[..])
      .map_err(|e| ChainError::Decode(e.to_string()))?;
    Ok(raw.into_iter().flatten().map(SubnetPool::from).collect())
  }

  async fn get_stake_fee(&self, request: &StakeFeeRequest) -> Result<Balance, ChainError> {
    let api = self.runtime_api_at(None).await?;
    let payload = dynamic::runtime_api_call(
      STAKE_INFO_RUNTIME_API,
      "get_stake_fee",
      vec![
        hotkey_netuid_pair(&request.origin_hotkey, request.origin_netuid),
        Value::from_bytes(request.origin_coldkey.encode()),
        hotkey_netuid_pair(&request.destination_hotkey, request.destination_netuid),
        Value::from_bytes(request.destination_coldkey.encode()),
        Value::u128(request.amount),
      ],
    );
    let thunk = api.call(payload).await.map_err(classify)?;
    let bytes = thunk.into_encoded();
    let fee =
      u64::decode(&mut &bytes[..]).map_err(|e| ChainError::Decode(e.to_string()))?;
    Ok(Balance::from_rao(fee as u128))
  }

  async fn get_constant_u128(&self, pallet: &str, name: &str) -> Result<u128, ChainError> {
    let addr = dynamic::constant(pallet, name);
    if let Ok(thunk) = self.client.constants().at(&addr) {
      let value = thunk
        .to_value()
        .map_err(|e| ChainError::Decode(e.to_string()))?;
      return value_as_u128(value);
    }
    // Parameters that live in storage rather than the metadata constants
    // (TxRateLimit on current runtimes).
    let storage_addr = dynamic::storage(pallet, name, Vec::<Value>::new());
    let storage = self.storage_at(None).await?;
    match storage.fetch(&storage_addr).await.map_err(classify)? {
      Some(thunk) => value_as_u128(
        thunk
          .to_value()
          .map_err(|e| ChainError::Decode(e.to_string()))?,
      ),
      None => Ok(0),
    }
  }

  async fn submit(
    &self,
    call: StakeCall,
    wait: ExtrinsicWait,
  ) -> Result<InclusionReceipt, ChainError> {
    let tx = dynamic::tx(STAKING_MODULE, call.function(), call_fields(&call));

    let latest = self.client.blocks().at_latest().await.map_err(classify)?;
    let params = DefaultExtrinsicParamsBuilder::<PolkadotConfig>::new()
      .mortal(latest.header(), self.era_period)
      .build();

    let mut progress = self
      .client
      .tx()
      .sign_and_submit_then_watch(&tx, &self.signer, params)
      .await
      .map_err(classify)?;

    log::info!("submitted {} extrinsic", call.function());

    if wait == ExtrinsicWait::None {
      return Ok(InclusionReceipt::broadcast());
    }

    while let Some(status) = progress.next().await {
      match status.map_err(classify)? {
        TxStatus::InBestBlock(in_block) if wait == ExtrinsicWait::Inclusion => {
          return Self::receipt_from(in_block).await;
        }
        TxStatus::InFinalizedBlock(in_block) => {
          return Self::receipt_from(in_block).await;
        }
        TxStatus::Error { message } | TxStatus::Invalid { message } => {
          return Err(ChainError::Request(message));
        }
        TxStatus::Dropped { message } => {
          return Err(ChainError::Transport(message));
        }
        _ => continue,
      }
    }

    Err(ChainError::Transport(
      "transaction status stream ended before an outcome was known".to_string(),
    ))
  }
}

/// Maps a subxt error onto the engine taxonomy. Transport-level failures
/// must stay distinguishable from chain rejections: after a transport
/// failure the on-chain state is genuinely unknown.
fn classify(err: subxt::Error) -> ChainError {
  match err {
    subxt::Error::Io(e) => ChainError::Transport(e.to_string()),
    subxt::Error::Rpc(e) => {
      let message = e.to_string();
      if message.contains("Custom error") || message.contains("Invalid Transaction") {
        ChainError::Request(message)
      } else {
        ChainError::Transport(message)
      }
    }
    subxt::Error::Transaction(e) => ChainError::Request(e.to_string()),
    subxt::Error::Runtime(e) => ChainError::Request(e.to_string()),
    subxt::Error::Decode(e) => ChainError::Decode(e.to_string()),
    other => ChainError::Request(other.to_string()),
  }
}

fn to_subxt_hash(hash: H256) -> subxt::utils::H256 {
  subxt::utils::H256(hash.0)
}

fn from_subxt_hash(hash: subxt::utils::H256) -> H256 {
  H256(hash.0)
}

fn account_value(account: &AccountId32) -> Value {
  Value::from_bytes(account.encode())
}

/// `Option<(hotkey, netuid)>` runtime-API argument.
fn hotkey_netuid_pair(hotkey: &Option<AccountId32>, netuid: Option<u16>) -> Value {
  match (hotkey, netuid) {
    (Some(hk), Some(n)) => Value::variant(
      "Some",
      Composite::Unnamed(vec![Value::unnamed_composite(vec![
        account_value(hk),
        Value::u128(n as u128),
      ])]),
    ),
    _ => Value::variant("None", Composite::Unnamed(vec![])),
  }
}

/// Call parameters in wire order with wire names.
fn call_fields(call: &StakeCall) -> Composite<()> {
  let fields: Vec<(String, Value)> = match call {
    StakeCall::AddStake {
      hotkey,
      netuid,
      amount_staked,
    } => vec![
      ("hotkey".to_string(), account_value(hotkey)),
      ("netuid".to_string(), Value::u128(*netuid as u128)),
      ("amount_staked".to_string(), Value::u128(*amount_staked)),
    ],
    StakeCall::AddStakeLimit {
      hotkey,
      netuid,
      amount_staked,
      limit_price,
      allow_partial,
    } => vec![
      ("hotkey".to_string(), account_value(hotkey)),
      ("netuid".to_string(), Value::u128(*netuid as u128)),
      ("amount_staked".to_string(), Value::u128(*amount_staked)),
      ("limit_price".to_string(), Value::u128(*limit_price)),
      ("allow_partial".to_string(), Value::bool(*allow_partial)),
    ],
    StakeCall::RemoveStake {
      hotkey,
      netuid,
      amount_unstaked,
    } => vec![
      ("hotkey".to_string(), account_value(hotkey)),
      ("netuid".to_string(), Value::u128(*netuid as u128)),
      ("amount_unstaked".to_string(), Value::u128(*amount_unstaked)),
    ],
    StakeCall::RemoveStakeLimit {
      hotkey,
      netuid,
      amount_unstaked,
      limit_price,
      allow_partial,
    } => vec![
      ("hotkey".to_string(), account_value(hotkey)),
      ("netuid".to_string(), Value::u128(*netuid as u128)),
      ("amount_unstaked".to_string(), Value::u128(*amount_unstaked)),
      ("limit_price".to_string(), Value::u128(*limit_price)),
      ("allow_partial".to_string(), Value::bool(*allow_partial)),
    ],
    StakeCall::MoveStake {
      origin_hotkey,
      origin_netuid,
      destination_hotkey,
      destination_netuid,
      alpha_amount,
    } => vec![
      ("origin_hotkey".to_string(), account_value(origin_hotkey)),
      ("origin_netuid".to_string(), Value::u128(*origin_netuid as u128)),
      (
        "destination_hotkey".to_string(),
        account_value(destination_hotkey),
      ),
      (
        "destination_netuid".to_string(),
        Value::u128(*destination_netuid as u128),
      ),
      ("alpha_amount".to_string(), Value::u128(*alpha_amount)),
    ],
    StakeCall::SwapStake {
      hotkey,
      origin_netuid,
      destination_netuid,
      alpha_amount,
    } => vec![
      ("hotkey".to_string(), account_value(hotkey)),
      ("origin_netuid".to_string(), Value::u128(*origin_netuid as u128)),
      (
        "destination_netuid".to_string(),
        Value::u128(*destination_netuid as u128),
      ),
      ("alpha_amount".to_string(), Value::u128(*alpha_amount)),
    ],
    StakeCall::TransferStake {
      destination_coldkey,
      hotkey,
      origin_netuid,
      destination_netuid,
      alpha_amount,
    } => vec![
      (
        "destination_coldkey".to_string(),
        account_value(destination_coldkey),
      ),
      ("hotkey".to_string(), account_value(hotkey)),
      ("origin_netuid".to_string(), Value::u128(*origin_netuid as u128)),
      (
        "destination_netuid".to_string(),
        Value::u128(*destination_netuid as u128),
      ),
      ("alpha_amount".to_string(), Value::u128(*alpha_amount)),
    ],
  };
  Composite::Named(fields)
}

/// Unwraps an integer from a decoded dynamic value, looking through
/// single-field newtype wrappers.
fn value_as_u128(value: subxt::ext::scale_value::Value<u32>) -> Result<u128, ChainError> {
  match value.value {
    ValueDef::Primitive(Primitive::U128(n)) => Ok(n),
    ValueDef::Composite(composite) => composite
      .into_values()
      .next()
      .map(value_as_u128)
      .unwrap_or_else(|| {
        Err(ChainError::Decode("empty composite where integer expected".to_string()))
      }),
    other => Err(ChainError::Decode(format!(
      "expected integer value, got {:?}",
      other
    ))),
  }
}
