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

use sp_core::crypto::AccountId32;

use crate::chain::client::{ChainInterface, ExtrinsicWait};
use crate::error::ChainError;
use crate::stake::intent::{StakeOperation, StakeOperationKind};
use crate::{Balance, TOLERANCE_CUSTOM_ERROR};

/// Terminal state of one submitted operation.
///
/// `RejectedTolerance` and `TransportError` are deliberately separate from
/// `IncludedFailure`: the first is recoverable by the caller (raise the
/// tolerance or allow partial fills), the second leaves on-chain state
/// genuinely unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionStatus {
  IncludedSuccess,
  IncludedFailure,
  RejectedTolerance,
  TransportError,
}

/// Outcome record for one operation. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
  pub operation: StakeOperation,
  pub status: ExecutionStatus,
  pub error: Option<String>,
  /// Observed post-inclusion delta; `None` when nothing was verified
  /// (failures and fire-and-forget submissions).
  pub amount_moved: Option<Balance>,
  /// The observed delta differed from the requested amount under an
  /// `allow_partial` operation. Expected, and distinct from a full fill.
  pub partial_fill: bool,
}

impl ExecutionResult {
  pub fn success(&self) -> bool {
    self.status == ExecutionStatus::IncludedSuccess
  }

  fn failed(operation: &StakeOperation, status: ExecutionStatus, error: String) -> Self {
    ExecutionResult {
      operation: operation.clone(),
      status,
      error: Some(error),
      amount_moved: None,
      partial_fill: false,
    }
  }
}

/// Submits exactly one planned operation and classifies the outcome.
///
/// Per-operation state machine:
/// planned -> submitted -> { included success, included failure,
/// rejected tolerance, transport error }.
pub struct SafeStakeExecutor<'a> {
  chain: &'a dyn ChainInterface,
  coldkey: AccountId32,
  wait: ExtrinsicWait,
}

impl<'a> SafeStakeExecutor<'a> {
  pub fn new(chain: &'a dyn ChainInterface, coldkey: AccountId32, wait: ExtrinsicWait) -> Self {
    SafeStakeExecutor {
      chain,
      coldkey,
      wait,
    }
  }

  pub async fn execute(&self, operation: &StakeOperation) -> ExecutionResult {
    let call = operation.to_call();
    log::info!(
      "submitting {} of {} on netuid {} ({})",
      operation.kind,
      operation.amount,
      operation.origin_netuid,
      call.function()
    );

    // Pre-state for delta verification. A read failure here aborts before
    // anything is signed, leaving chain state untouched.
    let pre_state = if self.wait == ExtrinsicWait::None {
      None
    } else {
      match self.fetch_pair_state(operation).await {
        Ok(state) => Some(state),
        Err(e) => {
          return ExecutionResult::failed(
            operation,
            ExecutionStatus::TransportError,
            e.to_string(),
          );
        }
      }
    };

    let receipt = match self.chain.submit(call, self.wait).await {
      Ok(receipt) => receipt,
      Err(ChainError::Request(message)) => {
        if message.contains(TOLERANCE_CUSTOM_ERROR)
          && operation.price_limit.is_some()
          && !operation.allow_partial
        {
          return ExecutionResult::failed(
            operation,
            ExecutionStatus::RejectedTolerance,
            format!(
              "price exceeded the tolerance limit and partial fills are \
               disabled; raise the tolerance or enable partial fills \
               ({message})"
            ),
          );
        }
        return ExecutionResult::failed(operation, ExecutionStatus::IncludedFailure, message);
      }
      Err(e @ (ChainError::Transport(_) | ChainError::Decode(_))) => {
        // The extrinsic may or may not have landed.
        return ExecutionResult::failed(
          operation,
          ExecutionStatus::TransportError,
          e.to_string(),
        );
      }
    };

    if !receipt.success {
      return ExecutionResult::failed(
        operation,
        ExecutionStatus::IncludedFailure,
        receipt.error.unwrap_or_else(|| "unknown chain error".to_string()),
      );
    }

    if !receipt.included {
      // Fire and forget: success on broadcast, downstream deltas
      // intentionally unverified.
      return ExecutionResult {
        operation: operation.clone(),
        status: ExecutionStatus::IncludedSuccess,
        error: None,
        amount_moved: None,
        partial_fill: false,
      };
    }

    let (amount_moved, partial_fill) = match self.observe_delta(operation, pre_state).await {
      Some(outcome) => outcome,
      None => (None, false),
    };

    ExecutionResult {
      operation: operation.clone(),
      status: ExecutionStatus::IncludedSuccess,
      error: None,
      amount_moved,
      partial_fill,
    }
  }

  async fn fetch_pair_state(
    &self,
    operation: &StakeOperation,
  ) -> Result<(Balance, Balance), ChainError> {
    let head = self.chain.get_chain_head().await?;
    let (balance, stake) = tokio::try_join!(
      self.chain.get_balance(&self.coldkey, Some(head)),
      self.chain.get_stake(
        &operation.origin_hotkey,
        &self.coldkey,
        operation.origin_netuid,
        Some(head),
      ),
    )?;
    Ok((balance, stake))
  }

  /// Re-queries the pair after inclusion and reports the observed delta.
  /// The operation already landed, so a failed re-read only downgrades the
  /// report, never the outcome.
  async fn observe_delta(
    &self,
    operation: &StakeOperation,
    pre_state: Option<(Balance, Balance)>,
  ) -> Option<(Option<Balance>, bool)> {
    let (pre_balance, pre_stake) = pre_state?;
    let (post_balance, post_stake) = match self.fetch_pair_state(operation).await {
      Ok(state) => state,
      Err(e) => {
        log::warn!("post-inclusion re-query failed: {}", e);
        return None;
      }
    };

    let amount_moved = match operation.kind {
      // Staking spends the base asset; the balance delta is what moved.
      StakeOperationKind::Stake => pre_balance.abs_diff(post_balance),
      // Everything else drains the origin pair's stake.
      _ => pre_stake
        .abs_diff(post_stake)
        .with_unit(operation.origin_netuid),
    };

    let partial_fill = operation.allow_partial && amount_moved != operation.amount;
    if partial_fill {
      log::info!(
        "partial fill: moved {} of requested {}",
        amount_moved,
        operation.amount
      );
    }

    Some((Some(amount_moved), partial_fill))
  }
}
