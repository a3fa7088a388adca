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

use std::collections::BTreeMap;
use std::time::Duration;

use sp_core::crypto::AccountId32;

use crate::chain::client::{ChainInterface, STAKING_MODULE, TX_RATE_LIMIT};
use crate::error::EngineError;
use crate::stake::executor::{ExecutionResult, ExecutionStatus, SafeStakeExecutor};
use crate::stake::intent::StakePlan;
use crate::EngineConfig;

/// Aggregated outcome of a batch. The whole command is a hard failure only
/// when nothing was planned or every operation failed.
#[derive(Debug)]
pub struct BatchOutcome {
  pub results: BTreeMap<(AccountId32, u16), ExecutionResult>,
  pub successes: usize,
  pub failures: usize,
}

impl BatchOutcome {
  pub fn is_failure(&self) -> bool {
    self.results.is_empty() || self.successes == 0
  }
}

/// Drives a plan to completion, one operation at a time.
///
/// Operations execute strictly sequentially: each submission consumes the
/// account's next nonce, so concurrent submissions from the same account
/// would collide. The only added delay is the chain's transaction rate
/// limit, waited out between consecutive operations of the batch.
pub struct BatchOrchestrator<'a> {
  chain: &'a dyn ChainInterface,
  config: &'a EngineConfig,
}

impl<'a> BatchOrchestrator<'a> {
  pub fn new(chain: &'a dyn ChainInterface, config: &'a EngineConfig) -> Self {
    BatchOrchestrator { chain, config }
  }

  pub async fn run(
    &self,
    executor: &SafeStakeExecutor<'_>,
    plan: StakePlan,
  ) -> Result<BatchOutcome, EngineError> {
    if plan.is_empty() {
      return Err(EngineError::EmptyPlan);
    }

    let rate_limit_blocks = match self
      .chain
      .get_constant_u128(STAKING_MODULE, TX_RATE_LIMIT)
      .await
    {
      Ok(blocks) => blocks,
      Err(e) => {
        log::warn!("tx rate limit lookup failed ({}), assuming none", e);
        0
      }
    };

    let total = plan.operations.len();
    let mut results = BTreeMap::new();
    let mut successes = 0usize;
    let mut failures = 0usize;

    for (index, operation) in plan.operations.into_iter().enumerate() {
      let key = (operation.origin_hotkey.clone(), operation.origin_netuid);
      let result = executor.execute(&operation).await;

      let landed = result.status == ExecutionStatus::IncludedSuccess;
      if landed {
        successes += 1;
      } else {
        failures += 1;
        // A failed operation is reported and the batch moves on to the
        // next planned operation; nothing is retried.
        log::error!(
          "operation on netuid {} failed: {}",
          operation.origin_netuid,
          result.error.as_deref().unwrap_or("unknown")
        );
      }
      results.insert(key, result);

      // Every operation in the batch spends from the same account, so a
      // landed transaction arms the chain's per-account rate limit for
      // the next one.
      let has_next = index + 1 < total;
      if landed && has_next && rate_limit_blocks > 0 {
        let wait = Duration::from_secs(
          rate_limit_blocks.min(u64::MAX as u128) as u64 * self.config.block_time_secs,
        );
        log::info!(
          "waiting out tx rate limit: {} blocks (~{}s)",
          rate_limit_blocks,
          wait.as_secs()
        );
        tokio::time::sleep(wait).await;
      }
    }

    log::info!(
      "batch complete: {} succeeded, {} failed",
      successes,
      failures
    );

    Ok(BatchOutcome {
      results,
      successes,
      failures,
    })
  }
}
