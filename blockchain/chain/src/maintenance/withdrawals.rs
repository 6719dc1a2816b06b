// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use crate::state::{
    AccountKey, AccountRegularBalanceKey, ConvertRequestKey, SavingsWithdrawKey, SstTokenKey,
    WithdrawVestingRouteKey,
};
use freezone_db::Id;
use freezone_message::VirtualOperation;
use freezone_types::config::PERCENT_100;
use freezone_types::{AccountName, Asset, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};

impl Database {
    /// Fills every due continuous vesting withdrawal: user-token rows
    /// first, then native accounts with their withdraw routes.
    pub(crate) fn process_vesting_withdrawals(&mut self) -> Result<()> {
        let now = self.head_block_time();

        // User-token withdrawals have no routes; shares convert straight to
        // liquid at the token's vesting price.
        let due_rows: Vec<Id> = self.state.account_regular_balances.ids_in_range(
            AccountRegularBalanceKey::ByNextVestingWithdrawal(TimePointSec::MIN, 0)
                ..=AccountRegularBalanceKey::ByNextVestingWithdrawal(now, Id::MAX),
        );
        let sst_interval = self.config.sst_vesting_withdraw_interval_secs;
        for row_id in due_rows {
            let row = self.state.account_regular_balances.get(row_id)?;
            let token = self.state.get_sst_token(row.liquid_symbol())?;
            let to_withdraw = withdraw_quantum(
                row.to_withdraw,
                row.withdrawn,
                row.vesting_withdraw_rate.amount,
                row.vesting_shares.amount,
            );
            let withdraw_shares = Asset::new(to_withdraw, token.vesting_symbol());
            let converted = withdraw_shares * token.vesting_share_price();
            let name = row.name.clone();
            let token_id = self
                .state
                .sst_tokens
                .id_by_key(&SstTokenKey::BySymbol(token.liquid_symbol))
                .expect("token exists");

            self.state.account_regular_balances.modify(row_id, |row| {
                row.vesting_shares -= withdraw_shares;
                row.liquid += converted;
                row.withdrawn += to_withdraw;
                if row.withdrawn >= row.to_withdraw || row.vesting_shares.amount == 0 {
                    row.vesting_withdraw_rate.amount = 0;
                    row.next_vesting_withdrawal = TimePointSec::MAX;
                } else {
                    row.next_vesting_withdrawal += sst_interval;
                }
            })?;
            self.state.sst_tokens.modify(token_id, |token| {
                token.total_vesting_fund_sst -= converted.amount;
                token.total_vesting_shares -= to_withdraw;
            })?;
            self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                from_account: name.clone(),
                to_account: name,
                withdrawn: withdraw_shares,
                deposited: converted,
            })?;
        }

        // Native withdrawals distribute across the account's routes before
        // the remainder converts to liquid for the account itself.
        let due_accounts: Vec<Id> = self.state.accounts.ids_in_range(
            AccountKey::ByNextVestingWithdrawal(TimePointSec::MIN, 0)
                ..=AccountKey::ByNextVestingWithdrawal(now, Id::MAX),
        );
        for account_id in due_accounts {
            self.process_native_withdrawal(account_id)?;
        }
        Ok(())
    }

    fn process_native_withdrawal(&mut self, account_id: Id) -> Result<()> {
        let account = self.state.accounts.get(account_id)?;
        let from_name = account.name.clone();
        let to_withdraw = withdraw_quantum(
            account.to_withdraw,
            account.withdrawn,
            account.vesting_withdraw_rate.amount,
            account.vesting_shares.amount,
        );

        let routes: Vec<(AccountName, u16, bool)> = self
            .state
            .withdraw_routes
            .range(
                WithdrawVestingRouteKey::ByWithdrawRoute(from_name.clone(), AccountName::default())
                    ..=WithdrawVestingRouteKey::ByWithdrawRoute(
                        from_name.clone(),
                        AccountName::unchecked("\u{7f}"),
                    ),
            )
            .map(|(_, route)| (route.to_account.clone(), route.percent, route.auto_vest))
            .collect();

        let mut deposited_as_vests: i64 = 0;
        let mut deposited_as_liquid: i64 = 0;

        // Vesting routes first so share accounting stays exact; liquid
        // routes convert at the global price afterwards.
        for (to_name, percent, _) in routes.iter().filter(|(_, _, av)| *av) {
            let to_deposit =
                (to_withdraw as i128 * *percent as i128 / PERCENT_100 as i128) as i64;
            deposited_as_vests += to_deposit;
            if to_deposit > 0 {
                let to_id = self.state.account_id(to_name)?;
                self.state.accounts.modify(to_id, |a| {
                    a.vesting_shares.amount += to_deposit;
                })?;
                self.adjust_proxied_witness_votes(to_name, to_deposit)?;
                self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                    from_account: from_name.clone(),
                    to_account: to_name.clone(),
                    withdrawn: Asset::new(to_deposit, VESTS_SYMBOL),
                    deposited: Asset::new(to_deposit, VESTS_SYMBOL),
                })?;
            }
        }

        let price = self.state.gpo().vesting_share_price();
        for (to_name, percent, _) in routes.iter().filter(|(_, _, av)| !*av) {
            let to_deposit =
                (to_withdraw as i128 * *percent as i128 / PERCENT_100 as i128) as i64;
            deposited_as_liquid += to_deposit;
            if to_deposit > 0 {
                let converted = Asset::new(to_deposit, VESTS_SYMBOL) * price;
                let to_id = self.state.account_id(to_name)?;
                self.state.accounts.modify(to_id, |a| a.balance += converted)?;
                self.state.modify_gpo(|gpo| {
                    gpo.total_vesting_fund_freezone -= converted;
                    gpo.total_vesting_shares.amount -= to_deposit;
                });
                self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                    from_account: from_name.clone(),
                    to_account: to_name.clone(),
                    withdrawn: Asset::new(to_deposit, VESTS_SYMBOL),
                    deposited: converted,
                })?;
            }
        }

        let to_convert = to_withdraw - deposited_as_liquid - deposited_as_vests;
        let converted = Asset::new(to_convert, VESTS_SYMBOL) * price;
        let interval = self.config.vesting_withdraw_interval_secs;

        self.state.accounts.modify(account_id, |a| {
            a.vesting_shares.amount -= to_withdraw;
            a.balance += converted;
            a.withdrawn += to_withdraw;
            if a.withdrawn >= a.to_withdraw || a.vesting_shares.amount == 0 {
                a.vesting_withdraw_rate.amount = 0;
                a.next_vesting_withdrawal = TimePointSec::MAX;
            } else {
                a.next_vesting_withdrawal += interval;
            }
        })?;
        self.state.modify_gpo(|gpo| {
            gpo.total_vesting_fund_freezone -= converted;
            gpo.total_vesting_shares.amount -= to_convert;
        });
        if to_withdraw > 0 {
            self.adjust_proxied_witness_votes(&from_name, -to_withdraw)?;
        }
        self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
            from_account: from_name.clone(),
            to_account: from_name,
            withdrawn: Asset::new(to_convert, VESTS_SYMBOL),
            deposited: converted,
        })?;
        Ok(())
    }

    /// Completes matured savings withdrawals.
    pub(crate) fn process_savings_withdraws(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let due: Vec<Id> = self.state.savings_withdraws.ids_in_range(
            SavingsWithdrawKey::ByComplete(TimePointSec::MIN, 0)
                ..=SavingsWithdrawKey::ByComplete(now, Id::MAX),
        );
        for id in due {
            let withdraw = self.state.savings_withdraws.get(id)?.clone();
            self.adjust_balance(&withdraw.to, withdraw.amount)?;
            let from_id = self.state.account_id(&withdraw.from)?;
            self.state
                .accounts
                .modify(from_id, |a| a.savings_withdraw_requests -= 1)?;
            self.push_virtual_operation(VirtualOperation::FillTransferFromSavings {
                from: withdraw.from,
                to: withdraw.to,
                amount: withdraw.amount,
                request_id: withdraw.request_id,
                memo: withdraw.memo,
            })?;
            self.state.savings_withdraws.remove(id)?;
        }
        Ok(())
    }

    /// Settles every conversion request due at the current median price.
    pub(crate) fn process_conversions(&mut self) -> Result<()> {
        let now = self.head_block_time();
        let median = self.state.feed().current_median_history;
        if median.is_null() {
            return Ok(());
        }
        let due: Vec<Id> = self.state.convert_requests.ids_in_range(
            ConvertRequestKey::ByConversionDate(TimePointSec::MIN, 0)
                ..=ConvertRequestKey::ByConversionDate(now, Id::MAX),
        );
        let mut net_fzd = Asset::new(0, FZD_SYMBOL);
        let mut net_freezone = Asset::new(0, FREEZONE_SYMBOL);
        for id in due {
            let request = self.state.convert_requests.get(id)?.clone();
            let amount_to_issue = request.amount * median;
            self.adjust_balance(&request.owner, amount_to_issue)?;
            net_fzd += request.amount;
            net_freezone += amount_to_issue;
            self.push_virtual_operation(VirtualOperation::FillConvertRequest {
                owner: request.owner,
                request_id: request.request_id,
                amount_in: request.amount,
                amount_out: amount_to_issue,
            })?;
            self.state.convert_requests.remove(id)?;
        }
        if net_fzd.amount > 0 {
            self.state.modify_gpo(|gpo| {
                gpo.current_supply += net_freezone;
                gpo.current_fzd_supply -= net_fzd;
                gpo.virtual_supply += net_freezone;
                gpo.virtual_supply -= net_fzd * median;
            });
        }
        Ok(())
    }
}

/// Per-interval quantum: the configured rate, bounded by what remains and
/// by the shares still held.
fn withdraw_quantum(to_withdraw: i64, withdrawn: i64, rate: i64, shares: i64) -> i64 {
    if rate <= 0 {
        return 0;
    }
    let quantum = if to_withdraw - withdrawn < rate {
        (to_withdraw % rate).min(shares)
    } else {
        rate.min(shares)
    };
    quantum.max(0)
}

#[cfg(test)]
mod tests {
    use super::withdraw_quantum;

    #[test]
    fn quantum_is_rate_limited() {
        assert_eq!(withdraw_quantum(1300, 0, 100, 10_000), 100);
    }

    #[test]
    fn final_interval_takes_the_remainder() {
        assert_eq!(withdraw_quantum(1250, 1200, 100, 10_000), 50);
    }

    #[test]
    fn quantum_never_exceeds_held_shares() {
        assert_eq!(withdraw_quantum(1300, 0, 100, 40), 40);
    }

    #[test]
    fn zero_rate_withdraws_nothing() {
        assert_eq!(withdraw_quantum(1300, 0, 0, 10_000), 0);
    }
}
