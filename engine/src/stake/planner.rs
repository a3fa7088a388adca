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

use sp_core::crypto::AccountId32;

use crate::chain::client::{
  ChainInterface, StakeFeeRequest, BALANCES_MODULE, EXISTENTIAL_DEPOSIT,
};
use crate::error::{EngineError, PlanRejection, ValidationError};
use crate::fees::FeeEstimator;
use crate::pool::{SubnetPool, TradeDirection};
use crate::stake::intent::{
  AmountPrompter, AmountSpec, PromptResponse, SkippedPair, StakeIntent, StakeOperation,
  StakeOperationKind, StakePlan,
};
use crate::{Balance, ROOT_NETUID};

/// A consistent read snapshot taken once near the start of planning. All
/// display and slippage math in the batch runs against it; it is not
/// refreshed between submissions.
struct PlanSnapshot {
  pools: BTreeMap<u16, SubnetPool>,
  stakes: BTreeMap<(AccountId32, u16), Balance>,
  free_balance: Balance,
  existential_deposit: Balance,
}

/// Turns a [`StakeIntent`] into a list of concrete operations,
/// front-loading every validation that can be done without submitting a
/// transaction. Skipped pairs are recorded with reasons and never abort
/// the rest of the plan.
pub struct StakeOperationPlanner<'a> {
  chain: &'a dyn ChainInterface,
}

impl<'a> StakeOperationPlanner<'a> {
  pub fn new(chain: &'a dyn ChainInterface) -> Self {
    StakeOperationPlanner { chain }
  }

  pub async fn plan(
    &self,
    coldkey: &AccountId32,
    intent: &StakeIntent,
    prompter: Option<&dyn AmountPrompter>,
  ) -> Result<StakePlan, EngineError> {
    validate_intent(intent)?;

    let snapshot = self.fetch_snapshot(coldkey).await?;
    let netuids = resolve_netuids(intent, &snapshot);

    let plan = match intent.kind {
      StakeOperationKind::Stake => {
        self
          .plan_stake(coldkey, intent, &snapshot, &netuids, prompter)
          .await
      }
      StakeOperationKind::Unstake => {
        self
          .plan_unstake(coldkey, intent, &snapshot, &netuids, prompter)
          .await
      }
      StakeOperationKind::Move | StakeOperationKind::Swap | StakeOperationKind::Transfer => {
        self
          .plan_movement(coldkey, intent, &snapshot, &netuids, prompter)
          .await
      }
    };

    log::info!(
      "planned {} operation(s), skipped {} pair(s)",
      plan.operations.len(),
      plan.skipped.len()
    );
    Ok(plan)
  }

  /// Read fan-out: every query the plan needs, fetched concurrently at one
  /// block height and reconciled into plain data before any write begins.
  async fn fetch_snapshot(&self, coldkey: &AccountId32) -> Result<PlanSnapshot, EngineError> {
    let head = self.chain.get_chain_head().await?;
    let (pools, stake_infos, free_balance, existential_deposit) = tokio::try_join!(
      self.chain.all_subnets(Some(head)),
      self.chain.get_stake_for_coldkey(coldkey, Some(head)),
      self.chain.get_balance(coldkey, Some(head)),
      self
        .chain
        .get_constant_u128(BALANCES_MODULE, EXISTENTIAL_DEPOSIT),
    )?;

    let pools = pools.into_iter().map(|p| (p.netuid, p)).collect();
    let mut stakes = BTreeMap::new();
    for info in stake_infos {
      stakes.insert((info.hotkey, info.netuid), info.stake);
    }

    Ok(PlanSnapshot {
      pools,
      stakes,
      free_balance,
      existential_deposit: Balance::from_rao(existential_deposit),
    })
  }

  async fn plan_stake(
    &self,
    coldkey: &AccountId32,
    intent: &StakeIntent,
    snapshot: &PlanSnapshot,
    netuids: &[u16],
    prompter: Option<&dyn AmountPrompter>,
  ) -> StakePlan {
    let fees = FeeEstimator::new(self.chain);
    let mut plan = StakePlan::default();

    // Leave the existential deposit behind so the coldkey stays alive.
    let budget = snapshot
      .free_balance
      .saturating_sub(snapshot.existential_deposit);
    let mut remaining = budget;

    // "Stake all" splits the budget exactly: every pair gets an even
    // share and the remainder rides on the final pair, so the planned
    // amounts always sum to the full budget.
    let pair_count = (intent.hotkeys.len() * netuids.len()).max(1) as u128;
    let share = budget / pair_count;
    let remainder = Balance::from_rao(budget.raw() % pair_count);

    let mut pair_index = 0usize;
    'hotkeys: for hotkey in &intent.hotkeys {
      for netuid in netuids {
        let index = pair_index;
        pair_index += 1;

        let pool = match snapshot.pools.get(netuid) {
          Some(pool) => pool,
          None => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::SubnetNotFound));
            continue;
          }
        };

        let current_stake = snapshot
          .stakes
          .get(&(hotkey.clone(), *netuid))
          .copied()
          .unwrap_or_else(|| Balance::zero().with_unit(*netuid));

        let amount = match intent.amount {
          AmountSpec::Exact(amount) => amount,
          AmountSpec::All => {
            if index as u128 + 1 == pair_count {
              share + remainder
            } else {
              share
            }
          }
          AmountSpec::Prompt => match prompt(prompter, *netuid, remaining) {
            Some(PromptResponse::Amount(amount)) => amount,
            Some(PromptResponse::All) => remaining,
            Some(PromptResponse::Quit) => break 'hotkeys,
            None => {
              plan.skipped.push(skip(hotkey, *netuid, PlanRejection::PromptDeclined));
              continue;
            }
          },
        };

        // Successive pairs share one running balance; a pair that would
        // push it negative is dropped, not clamped.
        if amount > remaining {
          log::warn!(
            "not enough balance to stake {} on netuid {} (remaining {})",
            amount,
            netuid,
            remaining
          );
          plan.skipped.push(skip(hotkey, *netuid, PlanRejection::InsufficientBalance));
          continue;
        }
        remaining = remaining - amount;

        let fee = fees
          .estimate(&StakeFeeRequest {
            origin_hotkey: None,
            origin_netuid: None,
            origin_coldkey: coldkey.clone(),
            destination_hotkey: Some(hotkey.clone()),
            destination_netuid: Some(*netuid),
            destination_coldkey: coldkey.clone(),
            amount: amount.raw(),
          })
          .await;

        let expected = pool.tao_to_alpha_with_slippage(amount);
        plan.max_slippage_pct = plan.max_slippage_pct.max(expected.slippage_pct);

        let price_limit = safe_price_limit(intent, pool, TradeDirection::Staking);

        plan.operations.push(StakeOperation {
          kind: StakeOperationKind::Stake,
          origin_netuid: *netuid,
          destination_netuid: None,
          origin_hotkey: hotkey.clone(),
          destination_hotkey: None,
          destination_coldkey: None,
          amount,
          current_stake_balance: current_stake,
          price_limit,
          allow_partial: allow_partial(intent),
          fee,
          expected: Some(expected),
        });
      }
    }

    plan
  }

  async fn plan_unstake(
    &self,
    coldkey: &AccountId32,
    intent: &StakeIntent,
    snapshot: &PlanSnapshot,
    netuids: &[u16],
    prompter: Option<&dyn AmountPrompter>,
  ) -> StakePlan {
    let fees = FeeEstimator::new(self.chain);
    let mut plan = StakePlan::default();
    let mut total_received = Balance::zero().with_unit(ROOT_NETUID);

    'hotkeys: for hotkey in &intent.hotkeys {
      for netuid in netuids {
        let pool = match snapshot.pools.get(netuid) {
          Some(pool) => pool,
          None => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::SubnetNotFound));
            continue;
          }
        };

        let current_stake = match snapshot.stakes.get(&(hotkey.clone(), *netuid)) {
          Some(stake) if !stake.is_zero() => *stake,
          _ => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::NoStake));
            continue;
          }
        };

        let amount = match intent.amount {
          AmountSpec::Exact(amount) => amount.with_unit(*netuid),
          AmountSpec::All => current_stake,
          AmountSpec::Prompt => match prompt(prompter, *netuid, current_stake) {
            Some(PromptResponse::Amount(amount)) => amount.with_unit(*netuid),
            Some(PromptResponse::All) => current_stake,
            Some(PromptResponse::Quit) => break 'hotkeys,
            None => {
              plan.skipped.push(skip(hotkey, *netuid, PlanRejection::PromptDeclined));
              continue;
            }
          },
        };

        // An amount beyond the pair's stake excludes the pair; it is
        // never submitted with a clamped amount.
        if amount > current_stake {
          log::warn!(
            "not enough stake to remove {} from netuid {} (stake {})",
            amount,
            netuid,
            current_stake
          );
          plan.skipped.push(skip(hotkey, *netuid, PlanRejection::InsufficientStake));
          continue;
        }

        let fee = fees
          .estimate(&StakeFeeRequest {
            origin_hotkey: Some(hotkey.clone()),
            origin_netuid: Some(*netuid),
            origin_coldkey: coldkey.clone(),
            destination_hotkey: None,
            destination_netuid: None,
            destination_coldkey: coldkey.clone(),
            amount: amount.raw(),
          })
          .await;

        let expected = match pool.alpha_to_tao_with_slippage(amount, fee) {
          Ok(outcome) => outcome,
          Err(e) => {
            // Fatal input: the amount cannot cover the fee. Dropped here,
            // before any chain interaction.
            log::warn!("netuid {}: {}", netuid, e);
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::FeeExceedsAmount));
            continue;
          }
        };

        plan.max_slippage_pct = plan.max_slippage_pct.max(expected.slippage_pct);
        total_received = total_received + expected.received;

        let price_limit = safe_price_limit(intent, pool, TradeDirection::Unstaking);

        plan.operations.push(StakeOperation {
          kind: StakeOperationKind::Unstake,
          origin_netuid: *netuid,
          destination_netuid: None,
          origin_hotkey: hotkey.clone(),
          destination_hotkey: None,
          destination_coldkey: None,
          amount,
          current_stake_balance: current_stake,
          price_limit,
          allow_partial: allow_partial(intent),
          fee,
          expected: Some(expected),
        });
      }
    }

    plan.total_received = Some(total_received);
    plan
  }

  /// Move, swap, and transfer share one shape: the amount comes out of the
  /// origin pair's stake and lands on a destination (hotkey, subnet,
  /// coldkey) that differs per kind.
  async fn plan_movement(
    &self,
    coldkey: &AccountId32,
    intent: &StakeIntent,
    snapshot: &PlanSnapshot,
    netuids: &[u16],
    prompter: Option<&dyn AmountPrompter>,
  ) -> StakePlan {
    let fees = FeeEstimator::new(self.chain);
    let mut plan = StakePlan::default();

    let destination_netuid = intent.destination_netuid.unwrap();
    let destination_pool = snapshot.pools.get(&destination_netuid);

    'hotkeys: for hotkey in &intent.hotkeys {
      for netuid in netuids {
        let pool = match snapshot.pools.get(netuid) {
          Some(pool) => pool,
          None => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::SubnetNotFound));
            continue;
          }
        };
        let destination_pool = match destination_pool {
          Some(pool) => pool,
          None => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::SubnetNotFound));
            continue;
          }
        };

        let current_stake = match snapshot.stakes.get(&(hotkey.clone(), *netuid)) {
          Some(stake) if !stake.is_zero() => *stake,
          _ => {
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::NoStake));
            continue;
          }
        };

        let amount = match intent.amount {
          AmountSpec::Exact(amount) => amount.with_unit(*netuid),
          AmountSpec::All => current_stake,
          AmountSpec::Prompt => match prompt(prompter, *netuid, current_stake) {
            Some(PromptResponse::Amount(amount)) => amount.with_unit(*netuid),
            Some(PromptResponse::All) => current_stake,
            Some(PromptResponse::Quit) => break 'hotkeys,
            None => {
              plan.skipped.push(skip(hotkey, *netuid, PlanRejection::PromptDeclined));
              continue;
            }
          },
        };

        if amount > current_stake {
          plan.skipped.push(skip(hotkey, *netuid, PlanRejection::InsufficientStake));
          continue;
        }

        let destination_hotkey = match intent.kind {
          StakeOperationKind::Move => intent.destination_hotkey.clone(),
          // Swap and transfer keep the origin hotkey.
          _ => Some(hotkey.clone()),
        };
        let destination_coldkey = match intent.kind {
          StakeOperationKind::Transfer => intent.destination_coldkey.clone(),
          _ => None,
        };

        let fee = fees
          .estimate(&StakeFeeRequest {
            origin_hotkey: Some(hotkey.clone()),
            origin_netuid: Some(*netuid),
            origin_coldkey: coldkey.clone(),
            destination_hotkey: destination_hotkey.clone(),
            destination_netuid: Some(destination_netuid),
            destination_coldkey: destination_coldkey
              .clone()
              .unwrap_or_else(|| coldkey.clone()),
            amount: amount.raw(),
          })
          .await;

        // Cross-subnet estimate: sell into the origin pool, buy into the
        // destination pool, both against the same snapshot.
        let expected = match pool.alpha_to_tao_with_slippage(amount, fee) {
          Ok(sold) => {
            let bought = destination_pool.tao_to_alpha_with_slippage(sold.received);
            plan.max_slippage_pct = plan
              .max_slippage_pct
              .max(sold.slippage_pct)
              .max(bought.slippage_pct);
            Some(bought)
          }
          Err(e) => {
            log::warn!("netuid {}: {}", netuid, e);
            plan.skipped.push(skip(hotkey, *netuid, PlanRejection::FeeExceedsAmount));
            continue;
          }
        };

        plan.operations.push(StakeOperation {
          kind: intent.kind,
          origin_netuid: *netuid,
          destination_netuid: Some(destination_netuid),
          origin_hotkey: hotkey.clone(),
          destination_hotkey,
          destination_coldkey,
          amount,
          current_stake_balance: current_stake,
          price_limit: None,
          allow_partial: false,
          fee,
          expected,
        });
      }
    }

    plan
  }
}

fn validate_intent(intent: &StakeIntent) -> Result<(), ValidationError> {
  if let Some(safe) = &intent.safe {
    if !(0.0..1.0).contains(&safe.rate_tolerance) {
      return Err(ValidationError::ToleranceOutOfRange(safe.rate_tolerance));
    }
  }
  let missing = match intent.kind {
    StakeOperationKind::Move => {
      intent.destination_hotkey.is_none() || intent.destination_netuid.is_none()
    }
    StakeOperationKind::Swap => intent.destination_netuid.is_none(),
    StakeOperationKind::Transfer => {
      intent.destination_coldkey.is_none() || intent.destination_netuid.is_none()
    }
    _ => false,
  };
  if missing {
    return Err(ValidationError::MissingDestination(intent.kind.to_string()));
  }
  Ok(())
}

fn resolve_netuids(intent: &StakeIntent, snapshot: &PlanSnapshot) -> Vec<u16> {
  match &intent.netuids {
    Some(netuids) => netuids.clone(),
    None => snapshot.pools.keys().copied().collect(),
  }
}

fn safe_price_limit(
  intent: &StakeIntent,
  pool: &SubnetPool,
  direction: TradeDirection,
) -> Option<Balance> {
  let safe = intent.safe.as_ref()?;
  if !pool.is_dynamic {
    // The root pool has no slippage; it never takes the limit variant.
    return None;
  }
  // Tolerance range was validated before planning started.
  pool
    .price_with_tolerance(safe.rate_tolerance, direction)
    .ok()
}

fn allow_partial(intent: &StakeIntent) -> bool {
  intent.safe.map(|s| s.allow_partial).unwrap_or(false)
}

fn prompt(
  prompter: Option<&dyn AmountPrompter>,
  netuid: u16,
  max: Balance,
) -> Option<PromptResponse> {
  prompter.map(|p| p.prompt_amount(netuid, max))
}

fn skip(hotkey: &AccountId32, netuid: u16, reason: PlanRejection) -> SkippedPair {
  SkippedPair {
    hotkey: hotkey.clone(),
    netuid,
    reason,
  }
}
