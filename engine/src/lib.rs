//! # Stake Engine
//!
//! Client-side engine that moves stake between accounts and subnets on a
//! dynamic-pool staking network. The engine models each subnet's AMM price,
//! computes slippage-adjusted conversion amounts and fees, builds "safe"
//! stake operations carrying a caller-supplied price tolerance and partial
//! fill policy, and drives batches of operations across many
//! (hotkey, subnet) pairs while honoring existential-balance and
//! transaction-rate-limit constraints.
//!
//! The wallet/keystore, the RPC transport, and rendering are collaborators
//! behind explicit seams: signing material enters only through the chain
//! client constructor, all chain access goes through [`ChainInterface`],
//! and rendering consumes finished [`StakeOperation`] / [`ExecutionResult`]
//! data.

pub use balance::{unit_symbol, Balance};
pub use config::EngineConfig;
pub use error::{ChainError, EngineError, FatalInputError, PlanRejection, ValidationError};
pub use fees::FeeEstimator;
pub use pool::{SubnetPool, SwapOutcome, TradeDirection};

pub use chain::client::{
  ChainInterface, ExtrinsicWait, InclusionReceipt, StakeCall, StakeFeeRequest,
};
pub use chain::subtensor::SubtensorClient;
pub use chain::types::StakeInfo;

pub use stake::batch::{BatchOrchestrator, BatchOutcome};
pub use stake::executor::{ExecutionResult, ExecutionStatus, SafeStakeExecutor};
pub use stake::intent::{
  parse_address, AmountPrompter, AmountSpec, PromptResponse, SafeStakingParams, SkippedPair,
  StakeIntent, StakeOperation, StakeOperationKind, StakePlan,
};
pub use stake::planner::StakeOperationPlanner;

mod balance;
pub mod chain;
mod config;
mod error;
mod fees;
mod pool;
pub mod stake;

#[cfg(test)]
mod tests;

/// Base units per display unit (rao per tao).
pub const RAO_PER_TAO: u128 = 1_000_000_000;

/// The distinguished root subnet: a static 1:1 pool with no slippage.
pub const ROOT_NETUID: u16 = 0;

/// Seconds per block. Configured, not discovered.
pub const BLOCK_TIME_SECS: u64 = 12;

/// Marker the chain embeds in the rejection raised when a price-limited
/// operation would exceed its tolerance while partial fills are disabled.
pub const TOLERANCE_CUSTOM_ERROR: &str = "Custom error: 8";
