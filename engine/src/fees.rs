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

use crate::chain::client::{ChainInterface, StakeFeeRequest};
use crate::Balance;

/// Queries the chain for the marginal fee of a prospective stake movement.
///
/// The fee is display/accounting data at plan time; the chain re-checks it
/// at execution, so a failed lookup degrades to zero instead of dropping
/// the pair. The returned balance is left untagged so callers can apply it
/// in whichever asset domain the operation deducts it from.
pub struct FeeEstimator<'a> {
  chain: &'a dyn ChainInterface,
}

impl<'a> FeeEstimator<'a> {
  pub fn new(chain: &'a dyn ChainInterface) -> Self {
    FeeEstimator { chain }
  }

  pub async fn estimate(&self, request: &StakeFeeRequest) -> Balance {
    match self.chain.get_stake_fee(request).await {
      Ok(fee) => fee,
      Err(e) => {
        log::warn!(
          "stake fee lookup failed ({}), proceeding with zero fee",
          e
        );
        Balance::zero()
      }
    }
  }
}
