// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use crate::state::{
    AccountRecoveryRequestKey, AccountRegularBalanceKey, ChangeRecoveryAccountRequestKey,
    DeclineVotingRightsRequestKey, EscrowKey, SstTokenKey, TransactionKey,
    VestingDelegationExpirationKey, WitnessSchedulePlacement,
};
use freezone_db::Id;
use freezone_message::VirtualOperation;
use freezone_types::config::{NULL_ACCOUNT, RD_DECAY_DENOM_SHIFT};
use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};

impl Database {
    /// Drops expired entries from the transaction dedup index.
    pub(crate) fn clear_expired_transactions(&mut self) -> Result<()> {
        let now = self.head_block_time();
        loop {
            let expired = self
                .state
                .transactions
                .first_in_range(
                    TransactionKey::ByExpiration(TimePointSec::MIN, 0)
                        ..TransactionKey::ByExpiration(now, 0),
                )
                .map(|(id, _)| id);
            match expired {
                Some(id) => self.state.transactions.remove(id)?,
                None => return Ok(()),
            }
        }
    }

    /// Returns matured revoked delegations to their delegators, catching the
    /// mana bar up as if the shares had been present all along.
    pub(crate) fn clear_expired_delegations(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let regen_secs = self.config.voting_mana_regeneration_secs;
        let due: Vec<Id> = self.state.vesting_delegation_expirations.ids_in_range(
            VestingDelegationExpirationKey::ByExpiration(TimePointSec::MIN, 0)
                ..VestingDelegationExpirationKey::ByExpiration(now, 0),
        );
        for id in due {
            let expiration = self.state.vesting_delegation_expirations.get(id)?.clone();
            self.push_virtual_operation(VirtualOperation::ReturnVestingDelegation {
                account: expiration.delegator.clone(),
                vesting_shares: expiration.vesting_shares,
            })?;

            if expiration.vesting_shares.symbol == VESTS_SYMBOL {
                let account_id = self.state.account_id(&expiration.delegator)?;
                self.state.accounts.modify(account_id, |a| {
                    let max_mana = a.effective_vesting_shares();
                    a.voting_manabar.regenerate(max_mana, now, regen_secs);
                    a.voting_manabar.current_mana = a
                        .voting_manabar
                        .current_mana
                        .saturating_add(expiration.vesting_shares.amount);
                    a.delegated_vesting_shares -= expiration.vesting_shares;
                })?;
            } else {
                let liquid = expiration.vesting_shares.symbol.liquid_symbol();
                let token_regen = self
                    .state
                    .get_sst_token(liquid)?
                    .vote_regeneration_period_seconds;
                let key = AccountRegularBalanceKey::ByNameLiquidSymbol(
                    expiration.delegator.clone(),
                    liquid,
                );
                if let Some(row_id) = self.state.account_regular_balances.id_by_key(&key) {
                    self.state.account_regular_balances.modify(row_id, |row| {
                        let max_mana = row.vesting_shares.amount
                            + row.received_vesting_shares.amount
                            - row.delegated_vesting_shares.amount;
                        row.voting_manabar.regenerate(max_mana, now, token_regen);
                        row.voting_manabar.current_mana = row
                            .voting_manabar
                            .current_mana
                            .saturating_add(expiration.vesting_shares.amount);
                        row.delegated_vesting_shares -= expiration.vesting_shares;
                    })?;
                }
            }
            self.state.vesting_delegation_expirations.remove(id)?;
        }
        Ok(())
    }

    /// Destroys everything the burn account holds and reduces supply to
    /// match.
    pub(crate) fn clear_null_account_balance(&mut self) -> Result<()> {
        let null_name = AccountName::unchecked(NULL_ACCOUNT);
        let null = self.state.get_account(&null_name)?.clone();

        let mut total_freezone = Asset::new(0, FREEZONE_SYMBOL);
        let mut total_fzd = Asset::new(0, FZD_SYMBOL);
        let mut total_vests = Asset::new(0, VESTS_SYMBOL);
        let mut vesting_value = Asset::new(0, FREEZONE_SYMBOL);

        total_freezone += null.balance + null.savings_balance + null.reward_freezone_balance;
        total_fzd += null.fzd_balance + null.savings_fzd_balance + null.reward_fzd_balance;
        if null.vesting_shares.amount > 0 {
            vesting_value = null.vesting_shares * self.state.gpo().vesting_share_price();
            total_freezone += vesting_value;
            total_vests += null.vesting_shares;
        }
        if null.reward_vesting_balance.amount > 0 {
            total_freezone += null.reward_vesting_freezone;
            total_vests += null.reward_vesting_balance;
        }

        // Burned user-token balances reduce their token's supply directly.
        let sst_rows: Vec<(Id, Asset, Asset)> = self
            .state
            .account_regular_balances
            .iter()
            .filter(|(_, row)| row.name == null_name)
            .map(|(id, row)| (id, row.liquid, row.vesting_shares))
            .collect();
        for (row_id, liquid, vesting) in &sst_rows {
            if liquid.amount > 0 {
                self.adjust_supply(-*liquid, false)?;
            }
            if vesting.amount > 0 {
                let token_id = self
                    .state
                    .sst_tokens
                    .id_by_key(&SstTokenKey::BySymbol(liquid.symbol))
                    .expect("token exists for balance row");
                let vesting = *vesting;
                self.state.sst_tokens.modify(token_id, |token| {
                    let value = vesting * token.vesting_share_price();
                    token.total_vesting_shares -= vesting.amount;
                    token.total_vesting_fund_sst -= value.amount;
                    token.current_supply -= value.amount;
                })?;
            }
            self.state.account_regular_balances.remove(*row_id)?;
        }

        if total_freezone.amount == 0
            && total_fzd.amount == 0
            && total_vests.amount == 0
            && sst_rows.is_empty()
        {
            return Ok(());
        }

        let mut cleared = Vec::new();
        if total_freezone.amount > 0 {
            cleared.push(total_freezone);
        }
        if total_vests.amount > 0 {
            cleared.push(total_vests);
        }
        if total_fzd.amount > 0 {
            cleared.push(total_fzd);
        }

        if null.vesting_shares.amount > 0 {
            self.state.modify_gpo(|gpo| {
                gpo.total_vesting_shares -= null.vesting_shares;
                gpo.total_vesting_fund_freezone -= vesting_value;
            });
        }
        if null.reward_vesting_balance.amount > 0 {
            self.state.modify_gpo(|gpo| {
                gpo.pending_rewarded_vesting_shares -= null.reward_vesting_balance;
                gpo.pending_rewarded_vesting_freezone -= null.reward_vesting_freezone;
            });
        }
        let null_id = self.state.account_id(&null_name)?;
        self.state.accounts.modify(null_id, |a| {
            a.balance.amount = 0;
            a.savings_balance.amount = 0;
            a.fzd_balance.amount = 0;
            a.savings_fzd_balance.amount = 0;
            a.vesting_shares.amount = 0;
            a.reward_freezone_balance.amount = 0;
            a.reward_fzd_balance.amount = 0;
            a.reward_vesting_balance.amount = 0;
            a.reward_vesting_freezone.amount = 0;
        })?;

        if total_freezone.amount > 0 {
            self.adjust_supply(-total_freezone, false)?;
        }
        if total_fzd.amount > 0 {
            self.adjust_supply(-total_fzd, false)?;
        }
        if !cleared.is_empty() {
            self.push_virtual_operation(VirtualOperation::ClearNullAccountBalance {
                total_cleared: cleared,
            })?;
        }
        Ok(())
    }

    /// Applies resource-dynamics decay to the account-subsidy pools and
    /// recharges the producing witness's pool.
    pub(crate) fn process_subsidized_accounts(&mut self) -> Result<()> {
        let wso = self.state.wso();
        let budget = wso.account_subsidy_budget;
        let decay = wso.account_subsidy_decay;
        let witness_budget = wso.account_subsidy_witness_budget;
        let witness_decay = wso.account_subsidy_witness_decay;

        self.state.modify_gpo(|gpo| {
            gpo.available_account_subsidies =
                rd_apply(gpo.available_account_subsidies, budget, decay);
        });

        let current = self.state.gpo().current_witness.clone();
        let witness = self.state.get_witness(&current)?;
        if witness.schedule == WitnessSchedulePlacement::Elected {
            let id = self
                .state
                .witnesses
                .id_by_key(&crate::state::WitnessKey::ByName(current))
                .expect("current witness exists");
            self.state.witnesses.modify(id, |w| {
                w.available_witness_account_subsidies = rd_apply(
                    w.available_witness_account_subsidies,
                    witness_budget,
                    witness_decay,
                );
            })?;
        }
        Ok(())
    }

    /// Expires stale recovery requests, trims owner-authority history past
    /// the recovery window and applies matured recovery-partner changes.
    pub(crate) fn account_recovery_processing(&mut self) -> Result<()> {
        let now = self.head_block_time();

        let expired: Vec<Id> = self.state.recovery_requests.ids_in_range(
            AccountRecoveryRequestKey::ByExpiration(TimePointSec::MIN, 0)
                ..AccountRecoveryRequestKey::ByExpiration(now, 0),
        );
        for id in expired {
            self.state.recovery_requests.remove(id)?;
        }

        let cutoff = TimePointSec(
            now.secs().saturating_sub(self.config.owner_auth_recovery_secs),
        );
        let stale: Vec<Id> = self
            .state
            .owner_authority_histories
            .iter()
            .filter(|(_, hist)| hist.last_valid_time < cutoff)
            .map(|(id, _)| id)
            .collect();
        for id in stale {
            self.state.owner_authority_histories.remove(id)?;
        }

        let effective: Vec<Id> = self.state.change_recovery_requests.ids_in_range(
            ChangeRecoveryAccountRequestKey::ByEffectiveDate(TimePointSec::MIN, 0)
                ..ChangeRecoveryAccountRequestKey::ByEffectiveDate(now.saturating_add(1), 0),
        );
        for id in effective {
            let request = self.state.change_recovery_requests.get(id)?.clone();
            let account_id = self.state.account_id(&request.account_to_recover)?;
            self.state
                .accounts
                .modify(account_id, |a| a.recovery_account = request.recovery_account.clone())?;
            self.state.change_recovery_requests.remove(id)?;
        }
        Ok(())
    }

    /// Dissolves escrows whose ratification deadline passed without both
    /// approvals, returning all funds to the sender.
    pub(crate) fn expire_escrow_ratification(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let due: Vec<Id> = self.state.escrows.ids_in_range(
            EscrowKey::ByRatification(TimePointSec::MIN, 0)
                ..EscrowKey::ByRatification(now.saturating_add(1), 0),
        );
        for id in due {
            let escrow = self.state.escrows.get(id)?.clone();
            if escrow.is_approved() {
                continue;
            }
            self.adjust_balance(&escrow.from, escrow.freezone_balance)?;
            self.adjust_balance(&escrow.from, escrow.fzd_balance)?;
            if escrow.pending_fee.amount > 0 {
                self.adjust_balance(&escrow.from, escrow.pending_fee)?;
            }
            self.state.escrows.remove(id)?;
        }
        Ok(())
    }

    /// Finalizes matured decline-voting-rights requests: clears the proxy,
    /// witness votes and the right to vote at all.
    pub(crate) fn process_decline_voting_rights(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let due: Vec<Id> = self.state.decline_voting_requests.ids_in_range(
            DeclineVotingRightsRequestKey::ByEffectiveDate(TimePointSec::MIN, 0)
                ..DeclineVotingRightsRequestKey::ByEffectiveDate(now.saturating_add(1), 0),
        );
        for id in due {
            let request = self.state.decline_voting_requests.get(id)?.clone();
            let account = self.state.get_account(&request.account)?.clone();

            // Remove this account's stake from its proxy chain or witnesses.
            self.adjust_proxied_witness_votes(&request.account, -account.vesting_shares.amount)?;
            self.clear_witness_votes(&request.account)?;

            let account_id = self.state.account_id(&request.account)?;
            self.state.accounts.modify(account_id, |a| {
                a.can_vote = false;
                a.proxy = AccountName::default();
            })?;
            self.state.decline_voting_requests.remove(id)?;
        }
        Ok(())
    }

    /// Records the superseded owner authority for the recovery window, then
    /// installs the new one.
    pub(crate) fn update_owner_authority(
        &mut self,
        name: &AccountName,
        new_owner: freezone_types::Authority,
    ) -> Result<()> {
        let now = self.head_block_time();
        if self.head_block_num() >= self.owner_auth_history_start_block {
            let previous = self.state.get_account_authority(name)?.owner.clone();
            let account = name.clone();
            self.state.owner_authority_histories.create(|hist| {
                hist.account = account;
                hist.previous_owner_authority = previous;
                hist.last_valid_time = now;
            });
        }
        let auth_id = self
            .state
            .account_authorities
            .id_by_key(&crate::state::AccountAuthorityKey::ByAccount(name.clone()))
            .ok_or_else(|| crate::errors::Error::precondition("unknown account authority"))?;
        self.state.account_authorities.modify(auth_id, |auth| {
            auth.owner = new_owner;
            auth.last_owner_update = now;
        })?;
        Ok(())
    }
}

/// One step of resource dynamics: add the per-block budget, then decay the
/// pool by `pool × decay >> 36`.
fn rd_apply(pool: i64, budget: i64, decay: u64) -> i64 {
    let decayed = (pool as i128 * decay as i128) >> RD_DECAY_DENOM_SHIFT;
    (pool + budget - decayed as i64).max(0)
}

#[cfg(test)]
mod tests {
    use super::rd_apply;

    #[test]
    fn rd_pool_converges_to_equilibrium() {
        // Equilibrium is budget << shift / decay; the pool should approach
        // it from below without overshooting.
        let budget = 797i64;
        let decay = 347_321u64;
        let equilibrium = ((budget as i128) << 36) / decay as i128;
        let mut pool = 0i64;
        for _ in 0..1_000_000 {
            pool = rd_apply(pool, budget, decay);
        }
        assert!(pool > 0);
        assert!((pool as i128) <= equilibrium);
        assert!((pool as i128) > equilibrium / 2);
    }

    #[test]
    fn rd_decay_shrinks_a_full_pool() {
        let pool = i64::MAX / 2;
        let next = rd_apply(pool, 0, 347_321);
        assert!(next < pool);
    }
}
