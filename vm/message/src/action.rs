// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Error, UnitTarget};
use freezone_types::{AccountName, Asset, AssetSymbol, TimePointSec};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// One leg of a contributor or founder payout: liquid or vesting tokens to a
/// named account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayoutEntry {
    pub to: AccountName,
    pub amount: Asset,
    pub vesting: bool,
}

/// Automated actions a block *must* carry once due. Processing matches each
/// included action against the earliest due pending action by equality.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredAction {
    SstIcoLaunch { control_account: AccountName, symbol: AssetSymbol },
    SstIcoEvaluation { control_account: AccountName, symbol: AssetSymbol },
    SstTokenLaunch { control_account: AccountName, symbol: AssetSymbol },
    SstRefund {
        symbol: AssetSymbol,
        contributor: AccountName,
        contribution_id: u32,
        refund: Asset,
    },
    SstContributorPayout {
        symbol: AssetSymbol,
        contributor: AccountName,
        contribution_id: u32,
        contribution: Asset,
        payouts: Vec<PayoutEntry>,
    },
    SstFounderPayout {
        symbol: AssetSymbol,
        account_payouts: Vec<(AccountName, Vec<PayoutEntry>)>,
        market_maker_freezone: i64,
        market_maker_tokens: i64,
        reward_balance: i64,
    },
}

impl RequiredAction {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            RequiredAction::SstIcoLaunch { symbol, .. }
            | RequiredAction::SstIcoEvaluation { symbol, .. }
            | RequiredAction::SstTokenLaunch { symbol, .. } => {
                if !symbol.is_sst() {
                    return Err(Error::validation("action symbol must be a user token"));
                }
            }
            RequiredAction::SstRefund { symbol, refund, .. } => {
                if !symbol.is_sst() || refund.amount <= 0 {
                    return Err(Error::validation("invalid refund action"));
                }
            }
            RequiredAction::SstContributorPayout { symbol, contribution, .. } => {
                if !symbol.is_sst() || contribution.amount <= 0 {
                    return Err(Error::validation("invalid contributor payout action"));
                }
            }
            RequiredAction::SstFounderPayout {
                symbol,
                market_maker_freezone,
                market_maker_tokens,
                reward_balance,
                ..
            } => {
                if !symbol.is_sst()
                    || *market_maker_freezone < 0
                    || *market_maker_tokens < 0
                    || *reward_balance < 0
                {
                    return Err(Error::validation("invalid founder payout action"));
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &'static str {
        match self {
            RequiredAction::SstIcoLaunch { .. } => "SstIcoLaunch",
            RequiredAction::SstIcoEvaluation { .. } => "SstIcoEvaluation",
            RequiredAction::SstTokenLaunch { .. } => "SstTokenLaunch",
            RequiredAction::SstRefund { .. } => "SstRefund",
            RequiredAction::SstContributorPayout { .. } => "SstContributorPayout",
            RequiredAction::SstFounderPayout { .. } => "SstFounderPayout",
        }
    }
}

/// Automated actions whose inclusion is at the producing witness's option.
/// Pending records are matched by content hash, and garbage-collected once
/// their execution time falls behind the irreversible block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionalAction {
    SstTokenEmission {
        symbol: AssetSymbol,
        emission_time: TimePointSec,
        emissions: Vec<(UnitTarget, i64)>,
    },
}

impl OptionalAction {
    pub fn validate(&self) -> Result<(), Error> {
        match self {
            OptionalAction::SstTokenEmission { symbol, emissions, .. } => {
                if !symbol.is_sst() {
                    return Err(Error::validation("emission symbol must be a user token"));
                }
                if emissions.iter().any(|(_, amount)| *amount < 0) {
                    return Err(Error::validation("negative emission amount"));
                }
                Ok(())
            }
        }
    }

    /// Content hash identifying the pending record this action settles.
    pub fn hash(&self) -> [u8; 32] {
        let bytes = serde_cbor::to_vec(self).expect("action serialization cannot fail");
        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        hasher.finalize().into()
    }

    pub fn name(&self) -> &'static str {
        match self {
            OptionalAction::SstTokenEmission { .. } => "SstTokenEmission",
        }
    }
}
