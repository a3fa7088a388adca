use crate::tests::mock::{MockChain, SubmitBehavior};
use crate::tests::test_utils::*;
use crate::{
  Balance, ExecutionStatus, ExtrinsicWait, SafeStakeExecutor, StakeCall, StakeOperation,
  StakeOperationKind,
};

fn stake_operation(netuid: u16, amount: Balance) -> StakeOperation {
  StakeOperation {
    kind: StakeOperationKind::Stake,
    origin_netuid: netuid,
    destination_netuid: None,
    origin_hotkey: account(2),
    destination_hotkey: None,
    destination_coldkey: None,
    amount,
    current_stake_balance: Balance::zero().with_unit(netuid),
    price_limit: None,
    allow_partial: false,
    fee: Balance::zero(),
    expected: None,
  }
}

fn safe_stake_operation(netuid: u16, amount: Balance, allow_partial: bool) -> StakeOperation {
  StakeOperation {
    price_limit: Some(Balance::from_rao(2_020_000_000)),
    allow_partial,
    ..stake_operation(netuid, amount)
  }
}

#[tokio::test]
async fn test_included_success_reports_observed_delta() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor.execute(&stake_operation(1, tao(10))).await;

  assert_eq!(result.status, ExecutionStatus::IncludedSuccess);
  assert!(result.success());
  assert_eq!(result.amount_moved, Some(tao(10)), "full fill moves the full amount");
  assert!(!result.partial_fill);
  assert_eq!(result.error, None);
}

#[tokio::test]
async fn test_partial_fill_is_reported_distinctly() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);
  chain.push_behavior(SubmitBehavior::PartialFill(1, 2));

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor
    .execute(&safe_stake_operation(1, tao(10), true))
    .await;

  assert_eq!(
    result.status,
    ExecutionStatus::IncludedSuccess,
    "a partial fill under allow_partial is expected, not an error"
  );
  assert_eq!(result.amount_moved, Some(tao(5)));
  assert!(result.partial_fill);
}

#[tokio::test]
async fn test_tolerance_rejection_is_classified() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);
  chain.push_behavior(SubmitBehavior::RejectTolerance);

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor
    .execute(&safe_stake_operation(1, tao(10), false))
    .await;

  assert_eq!(
    result.status,
    ExecutionStatus::RejectedTolerance,
    "the tolerance code must never be conflated with a generic failure"
  );
  let message = result.error.unwrap();
  assert!(
    message.contains("raise the tolerance or enable partial fills"),
    "the message must be caller-actionable: {}",
    message
  );
}

#[tokio::test]
async fn test_chain_failure_surfaces_error_verbatim() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);
  chain.push_behavior(SubmitBehavior::FailExecution(
    "HotkeyAccountNotExists".to_string(),
  ));

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor.execute(&stake_operation(1, tao(10))).await;

  assert_eq!(result.status, ExecutionStatus::IncludedFailure);
  assert_eq!(result.error.as_deref(), Some("HotkeyAccountNotExists"));
  assert_eq!(result.amount_moved, None);
}

#[tokio::test]
async fn test_transport_failure_is_not_a_chain_failure() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);
  chain.push_behavior(SubmitBehavior::Transport("connection reset".to_string()));

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor.execute(&stake_operation(1, tao(10))).await;

  assert_eq!(
    result.status,
    ExecutionStatus::TransportError,
    "on-chain state is unknown after a transport failure"
  );
}

#[tokio::test]
async fn test_fire_and_forget_skips_verification() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::None);
  let result = executor.execute(&stake_operation(1, tao(10))).await;

  assert_eq!(result.status, ExecutionStatus::IncludedSuccess);
  assert_eq!(
    result.amount_moved, None,
    "broadcast-only submissions do not verify balance deltas"
  );
}

#[tokio::test]
async fn test_limit_variant_only_for_priced_operations() {
  let coldkey = account(1);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(1, 1000, 1000)]);
  chain.set_balance(&coldkey, 100 * TAO);

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  executor.execute(&stake_operation(1, tao(1))).await;
  executor
    .execute(&safe_stake_operation(1, tao(1), false))
    .await;

  let calls = chain.submitted_calls();
  assert!(matches!(calls[0], StakeCall::AddStake { .. }));
  assert!(matches!(calls[1], StakeCall::AddStakeLimit { .. }));
}

#[tokio::test]
async fn test_unstake_delta_comes_from_stake_not_balance() {
  let coldkey = account(1);
  let hotkey = account(2);
  let chain = MockChain::new(coldkey.clone(), vec![dynamic_pool(3, 1000, 1000)]);
  chain.set_stake(&hotkey, 3, 20 * TAO);

  let operation = StakeOperation {
    kind: StakeOperationKind::Unstake,
    origin_hotkey: hotkey,
    current_stake_balance: tao(20).with_unit(3),
    ..stake_operation(3, tao(7).with_unit(3))
  };

  let executor = SafeStakeExecutor::new(&chain, coldkey, ExtrinsicWait::Inclusion);
  let result = executor.execute(&operation).await;

  assert_eq!(result.status, ExecutionStatus::IncludedSuccess);
  assert_eq!(result.amount_moved, Some(tao(7)));
  assert_eq!(result.amount_moved.unwrap().unit(), Some(3));
}
