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

use serde::Deserialize;

use crate::chain::client::ExtrinsicWait;
use crate::BLOCK_TIME_SECS;

/// Engine settings. All fields have defaults so a config file only needs to
/// override what differs from mainnet behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
  /// Websocket endpoint of the target chain.
  pub endpoint: String,
  /// Seconds per block, used for rate-limit waits.
  pub block_time_secs: u64,
  /// Mortality period (blocks) for signed extrinsics.
  pub era_period: u64,
  /// Default price tolerance for safe staking.
  pub rate_tolerance: f64,
  /// Default partial-fill policy for safe staking.
  pub allow_partial_stake: bool,
  /// How long submissions wait before reporting an outcome.
  pub wait_for: ExtrinsicWait,
}

impl EngineConfig {
  pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
    serde_json::from_str(raw)
  }
}

impl Default for EngineConfig {
  fn default() -> Self {
    EngineConfig {
      endpoint: "ws://127.0.0.1:9944".to_string(),
      block_time_secs: BLOCK_TIME_SECS,
      era_period: 3,
      rate_tolerance: 0.005,
      allow_partial_stake: false,
      wait_for: ExtrinsicWait::Inclusion,
    }
  }
}
