// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};

/// Funds held by an agent pending release or dissolution.
#[derive(Debug, Clone, PartialEq)]
pub struct EscrowObject {
    pub escrow_id: u32,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub ratification_deadline: TimePointSec,
    pub escrow_expiration: TimePointSec,
    pub fzd_balance: Asset,
    pub freezone_balance: Asset,
    pub pending_fee: Asset,
    pub to_approved: bool,
    pub agent_approved: bool,
    pub disputed: bool,
}

impl Default for EscrowObject {
    fn default() -> Self {
        EscrowObject {
            escrow_id: 0,
            from: AccountName::default(),
            to: AccountName::default(),
            agent: AccountName::default(),
            ratification_deadline: TimePointSec::MAX,
            escrow_expiration: TimePointSec::MAX,
            fzd_balance: Asset::new(0, FZD_SYMBOL),
            freezone_balance: Asset::new(0, FREEZONE_SYMBOL),
            pending_fee: Asset::new(0, FREEZONE_SYMBOL),
            to_approved: false,
            agent_approved: false,
            disputed: false,
        }
    }
}

impl EscrowObject {
    pub fn is_approved(&self) -> bool {
        self.to_approved && self.agent_approved
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum EscrowKey {
    ByFromId(AccountName, u32),
    ByRatification(TimePointSec, Id),
}

impl StateObject for EscrowObject {
    type Key = EscrowKey;
    const NAME: &'static str = "escrow";

    fn keys(&self, id: Id) -> Vec<EscrowKey> {
        vec![
            EscrowKey::ByFromId(self.from.clone(), self.escrow_id),
            EscrowKey::ByRatification(self.ratification_deadline, id),
        ]
    }
}

/// An in-flight withdrawal from savings, completing after the fixed delay.
#[derive(Debug, Clone, PartialEq)]
pub struct SavingsWithdrawObject {
    pub from: AccountName,
    pub to: AccountName,
    pub memo: String,
    pub request_id: u32,
    pub amount: Asset,
    pub complete: TimePointSec,
}

impl Default for SavingsWithdrawObject {
    fn default() -> Self {
        SavingsWithdrawObject {
            from: AccountName::default(),
            to: AccountName::default(),
            memo: String::new(),
            request_id: 0,
            amount: Asset::new(0, FREEZONE_SYMBOL),
            complete: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SavingsWithdrawKey {
    ByFromRid(AccountName, u32),
    ByComplete(TimePointSec, Id),
}

impl StateObject for SavingsWithdrawObject {
    type Key = SavingsWithdrawKey;
    const NAME: &'static str = "savings_withdraw";

    fn keys(&self, id: Id) -> Vec<SavingsWithdrawKey> {
        vec![
            SavingsWithdrawKey::ByFromRid(self.from.clone(), self.request_id),
            SavingsWithdrawKey::ByComplete(self.complete, id),
        ]
    }
}
