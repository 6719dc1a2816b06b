// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::config::{MIN_BLOCK_SIZE_LIMIT, PERCENT_100};
use freezone_types::{AccountName, Asset, Authority, PublicKey, FREEZONE_SYMBOL};
use serde::{Deserialize, Serialize};

/// Witness-proposed chain parameters; the elected round's medians take
/// effect.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChainProperties {
    pub account_creation_fee: Asset,
    pub maximum_block_size: u32,
    pub fzd_interest_rate: u16,
    pub account_subsidy_budget: i64,
    pub account_subsidy_decay: u64,
}

impl Default for ChainProperties {
    fn default() -> Self {
        ChainProperties {
            account_creation_fee: freezone_types::config::min_account_creation_fee(),
            maximum_block_size: freezone_types::config::MAX_BLOCK_SIZE_DEFAULT,
            fzd_interest_rate: 0,
            account_subsidy_budget: freezone_types::config::ACCOUNT_SUBSIDY_BUDGET_PER_BLOCK,
            account_subsidy_decay: freezone_types::config::ACCOUNT_SUBSIDY_DECAY,
        }
    }
}

impl ChainProperties {
    pub fn validate(&self) -> Result<(), Error> {
        if self.account_creation_fee.symbol != FREEZONE_SYMBOL
            || self.account_creation_fee.amount < 0
        {
            return Err(Error::validation("creation fee must be a non-negative native amount"));
        }
        if self.maximum_block_size < MIN_BLOCK_SIZE_LIMIT {
            return Err(Error::validation("maximum block size below the protocol floor"));
        }
        if self.fzd_interest_rate > PERCENT_100 {
            return Err(Error::validation("interest rate exceeds 100%"));
        }
        Ok(())
    }
}

/// Declares or updates a witness candidacy. A nil signing key withdraws the
/// witness from scheduling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: AccountName,
    pub url: String,
    pub block_signing_key: PublicKey,
    pub props: ChainProperties,
}

impl OperationBehavior for WitnessUpdateOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.owner)?;
        if self.url.len() > 2048 {
            return Err(Error::validation("url is too long"));
        }
        self.props.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.owner.clone());
    }
}

/// Updates witness parameters signed with the witness signing key rather
/// than the account's active key, so a block producer can retune without
/// exposing account keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WitnessSetPropertiesOperation {
    pub owner: AccountName,
    /// Must match the witness's current signing key; the signature is
    /// checked against it.
    pub current_signing_key: PublicKey,
    pub props: ChainProperties,
    pub new_signing_key: Option<PublicKey>,
    pub new_url: Option<String>,
}

impl OperationBehavior for WitnessSetPropertiesOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.owner)?;
        if self.current_signing_key.is_nil() {
            return Err(Error::validation("current signing key must be set"));
        }
        if let Some(url) = &self.new_url {
            if url.is_empty() || url.len() > 2048 {
                return Err(Error::validation("invalid url"));
            }
        }
        self.props.validate()
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.other.push(Authority::single_key(self.current_signing_key));
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: AccountName,
    pub witness: AccountName,
    pub approve: bool,
}

impl OperationBehavior for AccountWitnessVoteOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)?;
        check_account(&self.witness)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.account.clone());
    }
}

/// Delegates all witness voting to a proxy; an empty proxy clears it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessProxyOperation {
    pub account: AccountName,
    pub proxy: AccountName,
}

impl OperationBehavior for AccountWitnessProxyOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.account)?;
        if !self.proxy.is_empty() {
            check_account(&self.proxy)?;
        }
        if self.account == self.proxy {
            return Err(Error::validation("cannot proxy to self"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.account.clone());
    }
}
