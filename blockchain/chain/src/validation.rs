// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! The invariant validator: walks every holder location and cross-checks
//! the supply, vesting and vote-weight bookkeeping. A violation is fatal;
//! state can no longer be trusted and a reindex is recommended.

use crate::database::Database;
use crate::errors::{Error, Result};
use freezone_types::{Asset, FREEZONE_SYMBOL, FZD_SYMBOL, VESTS_SYMBOL};
use std::collections::BTreeMap;

impl Database {
    /// Validates every cross-object invariant that must hold between
    /// blocks.
    pub fn validate_invariants(&self) -> Result<()> {
        let gpo = self.state().gpo();
        let mut total_supply = Asset::new(0, FREEZONE_SYMBOL);
        let mut total_fzd = Asset::new(0, FZD_SYMBOL);
        let mut total_vests = Asset::new(0, VESTS_SYMBOL);

        for (_, account) in self.state().accounts.iter() {
            total_supply += account.balance
                + account.savings_balance
                + account.reward_freezone_balance
                + account.reward_vesting_freezone;
            total_fzd +=
                account.fzd_balance + account.savings_fzd_balance + account.reward_fzd_balance;
            total_vests += account.vesting_shares + account.reward_vesting_balance;

            if account.delegated_vesting_shares.amount < 0
                || account.received_vesting_shares.amount < 0
            {
                return Err(Error::fatal(format!(
                    "account {} has negative delegation totals",
                    account.name
                )));
            }
        }

        for (_, order) in self.state().limit_orders.iter() {
            let for_sale = order.amount_for_sale();
            if for_sale.symbol == FREEZONE_SYMBOL {
                total_supply += for_sale;
            } else if for_sale.symbol == FZD_SYMBOL {
                total_fzd += for_sale;
            }
        }
        for (_, request) in self.state().convert_requests.iter() {
            total_fzd += request.amount;
        }
        for (_, escrow) in self.state().escrows.iter() {
            total_supply += escrow.freezone_balance;
            total_fzd += escrow.fzd_balance;
            if escrow.pending_fee.symbol == FREEZONE_SYMBOL {
                total_supply += escrow.pending_fee;
            } else {
                total_fzd += escrow.pending_fee;
            }
        }
        for (_, withdraw) in self.state().savings_withdraws.iter() {
            if withdraw.amount.symbol == FREEZONE_SYMBOL {
                total_supply += withdraw.amount;
            } else {
                total_fzd += withdraw.amount;
            }
        }
        for (_, fund) in self.state().reward_funds.iter() {
            total_supply += fund.reward_balance;
        }
        // An open ICO holds native tokens outside any account: everything
        // not yet refunded while it can still fail, and the full take while
        // the payout chain runs.
        for (_, ico) in self.state().sst_icos.iter() {
            let phase = self
                .state()
                .find_sst_token(ico.symbol)
                .map(|t| t.phase)
                .unwrap_or(crate::state::SstPhase::Setup);
            if phase <= crate::state::SstPhase::LaunchFailed {
                total_supply +=
                    Asset::new(ico.contributed.amount - ico.processed_contributions, FREEZONE_SYMBOL);
            } else {
                total_supply += ico.contributed;
            }
        }
        for (_, token) in self.state().sst_tokens.iter() {
            total_supply += token.market_maker.freezone_balance;
        }

        total_supply += gpo.total_vesting_fund_freezone + gpo.pending_rewarded_vesting_freezone;

        if total_supply != gpo.current_supply {
            return Err(Error::fatal(format!(
                "native supply mismatch: summed {total_supply}, recorded {}",
                gpo.current_supply
            )));
        }
        if total_fzd != gpo.current_fzd_supply {
            return Err(Error::fatal(format!(
                "dollar supply mismatch: summed {total_fzd}, recorded {}",
                gpo.current_fzd_supply
            )));
        }
        if total_vests != gpo.total_vesting_shares + gpo.pending_rewarded_vesting_shares {
            return Err(Error::fatal(format!(
                "vesting share mismatch: summed {total_vests}, recorded {}",
                gpo.total_vesting_shares + gpo.pending_rewarded_vesting_shares
            )));
        }

        for (_, witness) in self.state().witnesses.iter() {
            if witness.votes > gpo.total_vesting_shares.amount {
                return Err(Error::fatal(format!(
                    "witness {} has more votes than vesting shares exist",
                    witness.owner
                )));
            }
        }

        let median = self.state().feed().current_median_history;
        let expected_virtual = if median.is_null() {
            gpo.current_supply
        } else {
            gpo.current_supply + gpo.current_fzd_supply * median
        };
        if expected_virtual != gpo.virtual_supply {
            return Err(Error::fatal(format!(
                "virtual supply mismatch: expected {expected_virtual}, recorded {}",
                gpo.virtual_supply
            )));
        }

        // Withdraw routes per account stay within the whole.
        let mut route_totals: BTreeMap<String, u32> = BTreeMap::new();
        for (_, route) in self.state().withdraw_routes.iter() {
            *route_totals.entry(route.from_account.to_string()).or_default() +=
                route.percent as u32;
        }
        for (account, total) in route_totals {
            if total > freezone_types::config::PERCENT_100 as u32 {
                return Err(Error::fatal(format!(
                    "withdraw routes for {account} exceed 100%"
                )));
            }
        }

        self.validate_sst_invariants()
    }

    /// Per-token supply conservation across balance rows, reward rows,
    /// reserves and vesting positions.
    pub fn validate_sst_invariants(&self) -> Result<()> {
        struct TokenTotals {
            liquid: i64,
            vesting_shares: i64,
            pending_liquid: i64,
            pending_vesting_shares: i64,
        }
        let mut totals: BTreeMap<u32, TokenTotals> = BTreeMap::new();

        for (_, row) in self.state().account_regular_balances.iter() {
            let entry = totals.entry(row.liquid_symbol().to_nai()).or_insert(TokenTotals {
                liquid: 0,
                vesting_shares: 0,
                pending_liquid: 0,
                pending_vesting_shares: 0,
            });
            entry.liquid += row.liquid.amount;
            entry.vesting_shares += row.vesting_shares.amount;
        }
        for (_, row) in self.state().account_rewards_balances.iter() {
            let entry = totals.entry(row.liquid_symbol().to_nai()).or_insert(TokenTotals {
                liquid: 0,
                vesting_shares: 0,
                pending_liquid: 0,
                pending_vesting_shares: 0,
            });
            entry.pending_liquid += row.pending_liquid.amount;
            entry.pending_vesting_shares += row.pending_vesting_shares.amount;
        }

        for (_, token) in self.state().sst_tokens.iter() {
            let nai = token.liquid_symbol.to_nai();
            let zero = TokenTotals {
                liquid: 0,
                vesting_shares: 0,
                pending_liquid: 0,
                pending_vesting_shares: 0,
            };
            let held = totals.get(&nai).unwrap_or(&zero);

            let accounted = held.liquid
                + held.pending_liquid
                + token.market_maker.token_balance.amount
                + token.reward_balance.amount
                + token.total_vesting_fund_sst
                + token.pending_rewarded_vesting_sst;
            if accounted != token.current_supply {
                return Err(Error::fatal(format!(
                    "token {} supply mismatch: summed {accounted}, recorded {}",
                    token.liquid_symbol,
                    token.current_supply
                )));
            }
            if held.vesting_shares != token.total_vesting_shares {
                return Err(Error::fatal(format!(
                    "token {} vesting share mismatch: summed {}, recorded {}",
                    token.liquid_symbol, held.vesting_shares, token.total_vesting_shares
                )));
            }
            if held.pending_vesting_shares != token.pending_rewarded_vesting_shares {
                return Err(Error::fatal(format!(
                    "token {} pending vesting share mismatch",
                    token.liquid_symbol
                )));
            }
            if token.phase == crate::state::SstPhase::LaunchFailed
                && token.current_supply != 0
            {
                return Err(Error::fatal(format!(
                    "failed token {} has outstanding supply",
                    token.liquid_symbol
                )));
            }
        }
        Ok(())
    }
}
