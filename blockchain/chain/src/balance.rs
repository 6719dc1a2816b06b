// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Balance and supply accounting. Every balance change in the engine flows
//! through `adjust_balance` / `adjust_reward_balance`, and supply moves only
//! through `adjust_supply`, so the invariant validator has a single set of
//! choke points to trust.

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::{
    AccountRegularBalanceKey, AccountRegularBalanceObject, AccountRewardsBalanceKey,
    AccountRewardsBalanceObject, SstTokenKey,
};
use freezone_message::VirtualOperation;
use freezone_types::config::{PERCENT_100, SECONDS_PER_YEAR};
use freezone_types::{AccountName, Asset, AssetSymbol, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};

impl Database {
    pub fn get_balance(&self, name: &AccountName, symbol: AssetSymbol) -> Result<Asset> {
        if symbol == FREEZONE_SYMBOL || symbol == FZD_SYMBOL || symbol == VESTS_SYMBOL {
            let account = self.state.get_account(name)?;
            Ok(match symbol {
                s if s == FREEZONE_SYMBOL => account.balance,
                s if s == VESTS_SYMBOL => account.vesting_shares,
                _ => account.fzd_balance,
            })
        } else {
            let key = AccountRegularBalanceKey::ByNameLiquidSymbol(
                name.clone(),
                symbol.liquid_symbol(),
            );
            Ok(match self.state.account_regular_balances.find_by_key(&key) {
                Some(row) if symbol.is_vesting() => row.vesting_shares,
                Some(row) => row.liquid,
                None => Asset::new(0, symbol),
            })
        }
    }

    pub fn get_savings_balance(&self, name: &AccountName, symbol: AssetSymbol) -> Result<Asset> {
        let account = self.state.get_account(name)?;
        if symbol == FREEZONE_SYMBOL {
            Ok(account.savings_balance)
        } else if symbol == FZD_SYMBOL {
            Ok(account.savings_fzd_balance)
        } else {
            Err(Error::precondition("savings hold only native or dollar tokens"))
        }
    }

    /// Applies a delta to a regular balance. Negative deltas must be covered
    /// by the current balance. Dollar balances accrue interest before the
    /// delta lands.
    pub fn adjust_balance(&mut self, name: &AccountName, delta: Asset) -> Result<()> {
        if delta.symbol.is_sst() {
            return self.adjust_sst_balance(name, delta);
        }
        let id = self.state.account_id(name)?;
        if delta.symbol == FZD_SYMBOL {
            self.pay_fzd_interest(name)?;
        }
        let mut failure: Option<Error> = None;
        self.state
            .accounts
            .modify(id, |account| {
                let target = if delta.symbol == FREEZONE_SYMBOL {
                    &mut account.balance
                } else if delta.symbol == FZD_SYMBOL {
                    &mut account.fzd_balance
                } else if delta.symbol == VESTS_SYMBOL {
                    &mut account.vesting_shares
                } else {
                    failure = Some(Error::precondition("unhandled asset symbol"));
                    return;
                };
                if delta.amount < 0 && target.amount < -delta.amount {
                    failure = Some(Error::InsufficientFunds {
                        account: name.to_string(),
                        required: (-delta).to_string(),
                    });
                    return;
                }
                *target += delta;
            })
            .map_err(Error::from)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Applies a delta to a savings balance, with the same interest rule.
    pub fn adjust_savings_balance(&mut self, name: &AccountName, delta: Asset) -> Result<()> {
        let id = self.state.account_id(name)?;
        if delta.symbol == FZD_SYMBOL {
            self.pay_savings_fzd_interest(name)?;
        }
        let mut failure: Option<Error> = None;
        self.state
            .accounts
            .modify(id, |account| {
                let target = if delta.symbol == FREEZONE_SYMBOL {
                    &mut account.savings_balance
                } else if delta.symbol == FZD_SYMBOL {
                    &mut account.savings_fzd_balance
                } else {
                    failure = Some(Error::precondition("savings hold only native or dollar tokens"));
                    return;
                };
                if delta.amount < 0 && target.amount < -delta.amount {
                    failure = Some(Error::InsufficientFunds {
                        account: name.to_string(),
                        required: (-delta).to_string(),
                    });
                    return;
                }
                *target += delta;
            })
            .map_err(Error::from)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Applies a delta to the pending (unclaimed) reward balance.
    pub fn adjust_reward_balance(&mut self, name: &AccountName, delta: Asset) -> Result<()> {
        if delta.symbol.is_sst() {
            return self.adjust_sst_reward_balance(name, delta);
        }
        let id = self.state.account_id(name)?;
        let mut failure: Option<Error> = None;
        self.state
            .accounts
            .modify(id, |account| {
                let target = if delta.symbol == FREEZONE_SYMBOL {
                    &mut account.reward_freezone_balance
                } else if delta.symbol == FZD_SYMBOL {
                    &mut account.reward_fzd_balance
                } else {
                    failure = Some(Error::precondition("unhandled reward asset symbol"));
                    return;
                };
                if delta.amount < 0 && target.amount < -delta.amount {
                    failure = Some(Error::InsufficientFunds {
                        account: name.to_string(),
                        required: (-delta).to_string(),
                    });
                    return;
                }
                *target += delta;
            })
            .map_err(Error::from)?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Interest accrued on a dollar balance since its last update:
    /// `balance × rate × elapsed / seconds-per-year`.
    fn pay_fzd_interest(&mut self, name: &AccountName) -> Result<()> {
        let now = self.head_block_time();
        let rate = self.state.gpo().fzd_interest_rate;
        let id = self.state.account_id(name)?;
        let account = self.state.accounts.get(id)?;
        let elapsed = now.saturating_elapsed(account.fzd_seconds_last_update);
        if elapsed == 0 {
            return Ok(());
        }
        let mut interest_paid = Asset::new(0, FZD_SYMBOL);
        if rate > 0 && account.fzd_balance.amount > 0 {
            let interest = account.fzd_balance.amount as i128 * rate as i128 * elapsed as i128
                / (SECONDS_PER_YEAR as i128 * PERCENT_100 as i128);
            interest_paid = Asset::new(interest as i64, FZD_SYMBOL);
        }
        self.state.accounts.modify(id, |account| {
            account.fzd_balance += interest_paid;
            account.fzd_seconds_last_update = now;
            if interest_paid.amount > 0 {
                account.fzd_last_interest_payment = now;
            }
        })?;
        if interest_paid.amount > 0 {
            self.state.modify_gpo(|gpo| {
                gpo.current_fzd_supply += interest_paid;
            });
            self.push_virtual_operation(VirtualOperation::Interest {
                owner: name.clone(),
                interest: interest_paid,
            })?;
        }
        Ok(())
    }

    fn pay_savings_fzd_interest(&mut self, name: &AccountName) -> Result<()> {
        let now = self.head_block_time();
        let rate = self.state.gpo().fzd_interest_rate;
        let id = self.state.account_id(name)?;
        let account = self.state.accounts.get(id)?;
        let elapsed = now.saturating_elapsed(account.savings_fzd_seconds_last_update);
        if elapsed == 0 {
            return Ok(());
        }
        let mut interest_paid = Asset::new(0, FZD_SYMBOL);
        if rate > 0 && account.savings_fzd_balance.amount > 0 {
            let interest = account.savings_fzd_balance.amount as i128
                * rate as i128
                * elapsed as i128
                / (SECONDS_PER_YEAR as i128 * PERCENT_100 as i128);
            interest_paid = Asset::new(interest as i64, FZD_SYMBOL);
        }
        self.state.accounts.modify(id, |account| {
            account.savings_fzd_balance += interest_paid;
            account.savings_fzd_seconds_last_update = now;
            if interest_paid.amount > 0 {
                account.savings_fzd_last_interest_payment = now;
            }
        })?;
        if interest_paid.amount > 0 {
            self.state.modify_gpo(|gpo| {
                gpo.current_fzd_supply += interest_paid;
            });
            self.push_virtual_operation(VirtualOperation::Interest {
                owner: name.clone(),
                interest: interest_paid,
            })?;
        }
        Ok(())
    }

    // --- user-token balances --------------------------------------------

    /// Finds or creates the per-(account, token) balance row.
    pub(crate) fn regular_balance_row(
        &mut self,
        name: &AccountName,
        liquid_symbol: AssetSymbol,
    ) -> freezone_db::Id {
        let key = AccountRegularBalanceKey::ByNameLiquidSymbol(name.clone(), liquid_symbol);
        if let Some(id) = self.state.account_regular_balances.id_by_key(&key) {
            return id;
        }
        let owner = name.clone();
        self.state.account_regular_balances.create(|row: &mut AccountRegularBalanceObject| {
            row.name = owner;
            row.liquid = Asset::new(0, liquid_symbol);
            row.vesting_shares = Asset::new(0, liquid_symbol.paired_symbol());
            row.delegated_vesting_shares = Asset::new(0, liquid_symbol.paired_symbol());
            row.received_vesting_shares = Asset::new(0, liquid_symbol.paired_symbol());
            row.vesting_withdraw_rate = Asset::new(0, liquid_symbol.paired_symbol());
        });
        self.state
            .account_regular_balances
            .id_by_key(&key)
            .expect("row just created")
    }

    fn adjust_sst_balance(&mut self, name: &AccountName, delta: Asset) -> Result<()> {
        let liquid_symbol = delta.symbol.liquid_symbol();
        // A missing row only matters when the delta debits.
        let key = AccountRegularBalanceKey::ByNameLiquidSymbol(name.clone(), liquid_symbol);
        if self.state.account_regular_balances.id_by_key(&key).is_none() && delta.amount < 0 {
            return Err(Error::InsufficientFunds {
                account: name.to_string(),
                required: (-delta).to_string(),
            });
        }
        let id = self.regular_balance_row(name, liquid_symbol);
        let mut failure: Option<Error> = None;
        self.state.account_regular_balances.modify(id, |row| {
            let target = if delta.symbol.is_vesting() {
                &mut row.vesting_shares
            } else {
                &mut row.liquid
            };
            if delta.amount < 0 && target.amount < -delta.amount {
                failure = Some(Error::InsufficientFunds {
                    account: name.to_string(),
                    required: (-delta).to_string(),
                });
                return;
            }
            *target += delta;
        })?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn adjust_sst_reward_balance(&mut self, name: &AccountName, delta: Asset) -> Result<()> {
        let liquid_symbol = delta.symbol.liquid_symbol();
        let key = AccountRewardsBalanceKey::ByNameLiquidSymbol(name.clone(), liquid_symbol);
        let id = match self.state.account_rewards_balances.id_by_key(&key) {
            Some(id) => id,
            None => {
                if delta.amount < 0 {
                    return Err(Error::InsufficientFunds {
                        account: name.to_string(),
                        required: (-delta).to_string(),
                    });
                }
                let name = name.clone();
                self.state.account_rewards_balances.create(
                    |row: &mut AccountRewardsBalanceObject| {
                        row.name = name;
                        row.pending_liquid = Asset::new(0, liquid_symbol);
                        row.pending_vesting_shares =
                            Asset::new(0, liquid_symbol.paired_symbol());
                        row.pending_vesting_value = Asset::new(0, liquid_symbol);
                    },
                );
                self.state
                    .account_rewards_balances
                    .id_by_key(&key)
                    .expect("row just created")
            }
        };
        let mut failure: Option<Error> = None;
        self.state.account_rewards_balances.modify(id, |row| {
            let target = if delta.symbol.is_vesting() {
                &mut row.pending_vesting_shares
            } else {
                &mut row.pending_liquid
            };
            if delta.amount < 0 && target.amount < -delta.amount {
                failure = Some(Error::InsufficientFunds {
                    account: name.to_string(),
                    required: (-delta).to_string(),
                });
                return;
            }
            *target += delta;
        })?;
        match failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    // --- supply ----------------------------------------------------------

    /// Adjusts a token's outstanding supply. With `adjust_vesting`, nine
    /// further units per minted unit flow into the vesting fund (the
    /// historical ninety-percent vesting injection).
    pub fn adjust_supply(&mut self, delta: Asset, adjust_vesting: bool) -> Result<()> {
        if delta.symbol.is_sst() {
            let token_id = self
                .state
                .sst_tokens
                .id_by_key(&SstTokenKey::BySymbol(delta.symbol.liquid_symbol()))
                .ok_or_else(|| Error::precondition("unknown token symbol in supply adjust"))?;
            self.state.sst_tokens.modify(token_id, |token| {
                if delta.symbol.is_vesting() {
                    token.total_vesting_shares += delta.amount;
                } else {
                    token.current_supply += delta.amount;
                }
            })?;
            return Ok(());
        }

        let vesting_injection =
            if adjust_vesting && delta.symbol == FREEZONE_SYMBOL && delta.amount > 0 {
                delta.amount * 9
            } else {
                0
            };
        self.state.modify_gpo(|gpo| {
            if delta.symbol == FREEZONE_SYMBOL {
                gpo.current_supply += Asset::new(delta.amount + vesting_injection, FREEZONE_SYMBOL);
                gpo.virtual_supply += Asset::new(delta.amount + vesting_injection, FREEZONE_SYMBOL);
                gpo.total_vesting_fund_freezone += Asset::new(vesting_injection, FREEZONE_SYMBOL);
            } else if delta.symbol == FZD_SYMBOL {
                gpo.current_fzd_supply += delta;
            }
        });
        let gpo = self.state.gpo();
        if gpo.current_supply.amount < 0 || gpo.current_fzd_supply.amount < 0 {
            return Err(Error::fatal("token supply went negative"));
        }
        Ok(())
    }

    /// Converts liquid tokens to vesting shares for an account, crediting
    /// either the regular or the pending-reward position.
    pub fn create_vesting(
        &mut self,
        name: &AccountName,
        liquid: Asset,
        to_reward_balance: bool,
    ) -> Result<Asset> {
        if liquid.symbol.is_sst() {
            return self.create_sst_vesting(name, liquid, to_reward_balance);
        }
        if liquid.symbol != FREEZONE_SYMBOL {
            return Err(Error::precondition("only the native token can vest globally"));
        }
        let gpo = self.state.gpo();
        let price = if to_reward_balance {
            gpo.reward_vesting_share_price()
        } else {
            gpo.vesting_share_price()
        };
        let new_vesting = liquid * price;

        let id = self.state.account_id(name)?;
        self.state.accounts.modify(id, |account| {
            if to_reward_balance {
                account.reward_vesting_balance += new_vesting;
                account.reward_vesting_freezone += liquid;
            } else {
                account.vesting_shares += new_vesting;
            }
        })?;
        self.state.modify_gpo(|gpo| {
            if to_reward_balance {
                gpo.pending_rewarded_vesting_shares += new_vesting;
                gpo.pending_rewarded_vesting_freezone += liquid;
            } else {
                gpo.total_vesting_shares += new_vesting;
                gpo.total_vesting_fund_freezone += liquid;
            }
        });
        if !to_reward_balance {
            self.adjust_proxied_witness_votes(name, new_vesting.amount)?;
        }
        Ok(new_vesting)
    }

    fn create_sst_vesting(
        &mut self,
        name: &AccountName,
        liquid: Asset,
        to_reward_balance: bool,
    ) -> Result<Asset> {
        let token_id = self
            .state
            .sst_tokens
            .id_by_key(&SstTokenKey::BySymbol(liquid.symbol.liquid_symbol()))
            .ok_or_else(|| Error::precondition("unknown token symbol in vesting"))?;
        let token = self.state.sst_tokens.get(token_id)?;
        let price = if to_reward_balance {
            token.reward_vesting_share_price()
        } else {
            token.vesting_share_price()
        };
        let new_vesting = liquid * price;

        if to_reward_balance {
            self.adjust_sst_reward_balance(name, new_vesting)?;
            let key = AccountRewardsBalanceKey::ByNameLiquidSymbol(
                name.clone(),
                liquid.symbol.liquid_symbol(),
            );
            let row_id = self
                .state
                .account_rewards_balances
                .id_by_key(&key)
                .expect("row created by reward adjust");
            self.state
                .account_rewards_balances
                .modify(row_id, |row| row.pending_vesting_value += liquid)?;
            self.state.sst_tokens.modify(token_id, |token| {
                token.pending_rewarded_vesting_shares += new_vesting.amount;
                token.pending_rewarded_vesting_sst += liquid.amount;
            })?;
        } else {
            self.adjust_balance(name, new_vesting)?;
            self.state.sst_tokens.modify(token_id, |token| {
                token.total_vesting_shares += new_vesting.amount;
                token.total_vesting_fund_sst += liquid.amount;
            })?;
        }
        Ok(new_vesting)
    }

    /// Splits a native payout into dollars and liquid native per the dollar
    /// print rate, crediting the account and adjusting both supplies.
    pub fn create_fzd(
        &mut self,
        name: &AccountName,
        freezone: Asset,
        to_reward_balance: bool,
    ) -> Result<(Asset, Asset)> {
        let mut fzd_out = Asset::new(0, FZD_SYMBOL);
        let mut freezone_out = Asset::new(0, FREEZONE_SYMBOL);
        if freezone.amount == 0 {
            return Ok((fzd_out, freezone_out));
        }
        let median = self.state.feed().current_median_history;
        if median.is_null() {
            if to_reward_balance {
                self.adjust_reward_balance(name, freezone)?;
            } else {
                self.adjust_balance(name, freezone)?;
            }
            freezone_out = freezone;
            return Ok((fzd_out, freezone_out));
        }

        let print_rate = self.state.gpo().fzd_print_rate;
        let to_fzd_amount =
            (print_rate as i128 * freezone.amount as i128 / PERCENT_100 as i128) as i64;
        let to_freezone = freezone.amount - to_fzd_amount;
        let fzd = Asset::new(to_fzd_amount, FREEZONE_SYMBOL) * median;

        if to_reward_balance {
            self.adjust_reward_balance(name, fzd)?;
            self.adjust_reward_balance(name, Asset::new(to_freezone, FREEZONE_SYMBOL))?;
        } else {
            self.adjust_balance(name, fzd)?;
            self.adjust_balance(name, Asset::new(to_freezone, FREEZONE_SYMBOL))?;
        }
        self.adjust_supply(Asset::new(-to_fzd_amount, FREEZONE_SYMBOL), false)?;
        self.adjust_supply(fzd, false)?;
        fzd_out = fzd;
        freezone_out = Asset::new(to_freezone, FREEZONE_SYMBOL);
        Ok((fzd_out, freezone_out))
    }

    pub fn to_fzd(&self, freezone: Asset) -> Asset {
        let median = self.state.feed().current_median_history;
        if median.is_null() {
            Asset::new(0, FZD_SYMBOL)
        } else {
            freezone * median
        }
    }

    pub fn to_freezone(&self, fzd: Asset) -> Asset {
        let median = self.state.feed().current_median_history;
        if median.is_null() {
            Asset::new(0, FREEZONE_SYMBOL)
        } else {
            fzd * median
        }
    }
}
