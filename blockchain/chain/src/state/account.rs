// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::config::MAX_PROXY_RECURSION_DEPTH;
use freezone_types::{
    AccountName, Asset, Authority, PublicKey, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL,
    VESTS_SYMBOL,
};

/// Saturating accumulator of voting capacity; regenerates linearly from its
/// last update up to the account's effective vesting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Manabar {
    pub current_mana: i64,
    pub last_update_time: TimePointSec,
}

impl Manabar {
    /// Regenerates mana up to `max_mana` for the time elapsed since the last
    /// update.
    pub fn regenerate(&mut self, max_mana: i64, now: TimePointSec, regeneration_secs: u32) {
        if now <= self.last_update_time {
            return;
        }
        let elapsed = now.saturating_elapsed(self.last_update_time) as i128;
        let regenerated = max_mana as i128 * elapsed / regeneration_secs.max(1) as i128;
        self.current_mana =
            ((self.current_mana as i128 + regenerated).min(max_mana as i128)).max(0) as i64;
        self.last_update_time = now;
    }

    pub fn use_mana(&mut self, amount: i64) {
        self.current_mana = self.current_mana.saturating_sub(amount).max(0);
    }
}

/// One account. Balance fields cover the native and dollar tokens plus the
/// global vesting position; user-token balances live in their own rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountObject {
    pub name: AccountName,
    pub memo_key: PublicKey,
    /// Account this one proxies its governance weight to; empty when voting
    /// for itself.
    pub proxy: AccountName,
    pub created: TimePointSec,
    pub recovery_account: AccountName,
    pub last_account_recovery: TimePointSec,

    pub balance: Asset,
    pub savings_balance: Asset,
    pub fzd_balance: Asset,
    pub fzd_seconds: u128,
    pub fzd_seconds_last_update: TimePointSec,
    pub fzd_last_interest_payment: TimePointSec,
    pub savings_fzd_balance: Asset,
    pub savings_fzd_seconds: u128,
    pub savings_fzd_seconds_last_update: TimePointSec,
    pub savings_fzd_last_interest_payment: TimePointSec,
    pub savings_withdraw_requests: u32,

    pub reward_freezone_balance: Asset,
    pub reward_fzd_balance: Asset,
    pub reward_vesting_balance: Asset,
    /// Native value backing `reward_vesting_balance` at grant time.
    pub reward_vesting_freezone: Asset,

    pub vesting_shares: Asset,
    pub delegated_vesting_shares: Asset,
    pub received_vesting_shares: Asset,
    pub vesting_withdraw_rate: Asset,
    pub next_vesting_withdrawal: TimePointSec,
    pub withdrawn: i64,
    pub to_withdraw: i64,
    pub withdraw_routes: u16,

    /// Vote weight proxied to this account, bucketed by proxy-chain depth.
    pub proxied_vsf_votes: [i64; MAX_PROXY_RECURSION_DEPTH],
    pub witnesses_voted_for: u16,
    pub can_vote: bool,
    pub voting_manabar: Manabar,
    pub downvote_manabar: Manabar,

    pub pending_claimed_accounts: i64,

    pub posting_rewards: i64,
    pub curation_rewards: i64,
    pub last_root_post: TimePointSec,
    pub last_post: TimePointSec,
    pub last_vote_time: TimePointSec,
    pub post_count: u32,
}

impl Default for AccountObject {
    fn default() -> Self {
        AccountObject {
            name: AccountName::default(),
            memo_key: PublicKey::nil(),
            proxy: AccountName::default(),
            created: TimePointSec::MIN,
            recovery_account: AccountName::default(),
            last_account_recovery: TimePointSec::MIN,
            balance: Asset::new(0, FREEZONE_SYMBOL),
            savings_balance: Asset::new(0, FREEZONE_SYMBOL),
            fzd_balance: Asset::new(0, FZD_SYMBOL),
            fzd_seconds: 0,
            fzd_seconds_last_update: TimePointSec::MIN,
            fzd_last_interest_payment: TimePointSec::MIN,
            savings_fzd_balance: Asset::new(0, FZD_SYMBOL),
            savings_fzd_seconds: 0,
            savings_fzd_seconds_last_update: TimePointSec::MIN,
            savings_fzd_last_interest_payment: TimePointSec::MIN,
            savings_withdraw_requests: 0,
            reward_freezone_balance: Asset::new(0, FREEZONE_SYMBOL),
            reward_fzd_balance: Asset::new(0, FZD_SYMBOL),
            reward_vesting_balance: Asset::new(0, VESTS_SYMBOL),
            reward_vesting_freezone: Asset::new(0, FREEZONE_SYMBOL),
            vesting_shares: Asset::new(0, VESTS_SYMBOL),
            delegated_vesting_shares: Asset::new(0, VESTS_SYMBOL),
            received_vesting_shares: Asset::new(0, VESTS_SYMBOL),
            vesting_withdraw_rate: Asset::new(0, VESTS_SYMBOL),
            next_vesting_withdrawal: TimePointSec::MAX,
            withdrawn: 0,
            to_withdraw: 0,
            withdraw_routes: 0,
            proxied_vsf_votes: [0; MAX_PROXY_RECURSION_DEPTH],
            witnesses_voted_for: 0,
            can_vote: true,
            voting_manabar: Manabar::default(),
            downvote_manabar: Manabar::default(),
            pending_claimed_accounts: 0,
            posting_rewards: 0,
            curation_rewards: 0,
            last_root_post: TimePointSec::MIN,
            last_post: TimePointSec::MIN,
            last_vote_time: TimePointSec::MIN,
            post_count: 0,
        }
    }
}

impl AccountObject {
    pub fn has_proxy(&self) -> bool {
        !self.proxy.is_empty()
    }

    /// Net governance weight: own plus received minus delegated-away shares.
    pub fn effective_vesting_shares(&self) -> i64 {
        self.vesting_shares.amount + self.received_vesting_shares.amount
            - self.delegated_vesting_shares.amount
    }

    /// Own stake plus everything proxied here, for witness voting.
    pub fn witness_vote_weight(&self) -> i64 {
        self.vesting_shares.amount + self.proxied_vsf_votes.iter().sum::<i64>()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountKey {
    ByName(AccountName),
    ByNextVestingWithdrawal(TimePointSec, Id),
}

impl StateObject for AccountObject {
    type Key = AccountKey;
    const NAME: &'static str = "account";

    fn keys(&self, id: Id) -> Vec<AccountKey> {
        vec![
            AccountKey::ByName(self.name.clone()),
            AccountKey::ByNextVestingWithdrawal(self.next_vesting_withdrawal, id),
        ]
    }
}

/// The three authorities of an account, separate from the hot account row
/// so authority reads do not contend with balance writes.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AccountAuthorityObject {
    pub account: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub last_owner_update: TimePointSec,
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccountAuthorityKey {
    ByAccount(AccountName),
}

impl StateObject for AccountAuthorityObject {
    type Key = AccountAuthorityKey;
    const NAME: &'static str = "account_authority";

    fn keys(&self, _id: Id) -> Vec<AccountAuthorityKey> {
        vec![AccountAuthorityKey::ByAccount(self.account.clone())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manabar_regenerates_linearly() {
        let mut bar = Manabar { current_mana: 0, last_update_time: TimePointSec(0) };
        bar.regenerate(1_000, TimePointSec(50), 100);
        assert_eq!(bar.current_mana, 500);
        bar.regenerate(1_000, TimePointSec(100), 100);
        assert_eq!(bar.current_mana, 1_000);
        // Saturates at max.
        bar.regenerate(1_000, TimePointSec(500), 100);
        assert_eq!(bar.current_mana, 1_000);
    }

    #[test]
    fn manabar_use_saturates_at_zero() {
        let mut bar = Manabar { current_mana: 100, last_update_time: TimePointSec(0) };
        bar.use_mana(250);
        assert_eq!(bar.current_mana, 0);
    }

    #[test]
    fn effective_vesting_nets_delegations() {
        let mut account = AccountObject::default();
        account.vesting_shares = Asset::new(1_000, VESTS_SYMBOL);
        account.received_vesting_shares = Asset::new(200, VESTS_SYMBOL);
        account.delegated_vesting_shares = Asset::new(300, VESTS_SYMBOL);
        assert_eq!(account.effective_vesting_shares(), 900);
    }
}
