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

use thiserror::Error;

use crate::Balance;

/// An input whose post-fee output would be negative. Raised at plan time,
/// always before any chain interaction.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("amount {amount} does not cover the fee {fee}")]
pub struct FatalInputError {
  pub amount: Balance,
  pub fee: Balance,
}

/// Failures at the chain boundary.
///
/// `Transport` is kept apart from `Request` because a transport failure
/// leaves the on-chain outcome unknown (the extrinsic may or may not have
/// landed), while a request rejection is a definite refusal carrying the
/// chain's own error text.
#[derive(Debug, Clone, Error)]
pub enum ChainError {
  #[error("transport failure: {0}")]
  Transport(String),
  #[error("chain rejected request: {0}")]
  Request(String),
  #[error("failed to decode chain response: {0}")]
  Decode(String),
}

/// Local, pre-submission validation failures.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
  #[error("invalid ss58 address: {0}")]
  InvalidAddress(String),
  #[error("rate tolerance {0} outside [0, 1)")]
  ToleranceOutOfRange(f64),
  #[error("operation kind {0} requires a destination")]
  MissingDestination(String),
}

/// Reason a (hotkey, netuid) pair was dropped from a plan. Recorded, never
/// raised: a skipped pair does not abort the rest of the batch.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanRejection {
  SubnetNotFound,
  NoStake,
  InsufficientBalance,
  InsufficientStake,
  FeeExceedsAmount,
  PromptDeclined,
}

impl std::fmt::Display for PlanRejection {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    let reason = match self {
      PlanRejection::SubnetNotFound => "subnet does not exist",
      PlanRejection::NoStake => "no stake on this pair",
      PlanRejection::InsufficientBalance => "not enough balance to stake",
      PlanRejection::InsufficientStake => "not enough stake to remove",
      PlanRejection::FeeExceedsAmount => "amount does not cover the fee",
      PlanRejection::PromptDeclined => "declined at prompt",
    };
    f.write_str(reason)
  }
}

/// Top-level engine failures. Per-pair and per-operation conditions are
/// recorded in plans and results instead; only conditions that make the
/// whole command unusable surface here.
#[derive(Debug, Error)]
pub enum EngineError {
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error(transparent)]
  Chain(#[from] ChainError),
  #[error("no operations to perform")]
  EmptyPlan,
}
