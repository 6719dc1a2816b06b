// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::state::WitnessSchedulePlacement;
use freezone_message::VirtualOperation;
use freezone_types::config::{
    INFLATION_NARROWING_PERIOD, INFLATION_RATE_START_PERCENT, INFLATION_RATE_STOP_PERCENT,
    MAX_WITNESSES, PERCENT_100, TREASURY_ACCOUNT,
};
use freezone_types::{AccountName, Asset, FREEZONE_SYMBOL, FZD_SYMBOL};

impl Database {
    /// Per-block inflation. The instantaneous rate narrows from its start
    /// value by one hundredth of a percent every narrowing period until the
    /// floor, and the minted tokens split between the content funds, the
    /// vesting fund, the treasury and the producing witness.
    pub(crate) fn process_funds(&mut self) -> Result<()> {
        let gpo = self.state.gpo();
        let head = self.head_block_num();

        let start_rate = INFLATION_RATE_START_PERCENT;
        let rate_adjustment = (head as u64 / INFLATION_NARROWING_PERIOD) as i64;
        let current_rate = (start_rate - rate_adjustment).max(INFLATION_RATE_STOP_PERCENT);

        let new_freezone = (gpo.virtual_supply.amount as i128 * current_rate as i128
            / (PERCENT_100 as i128 * self.config.blocks_per_year() as i128))
            as i64;
        let mut content_reward =
            (new_freezone as i128 * gpo.content_reward_percent as i128 / PERCENT_100 as i128) as i64;
        let vesting_reward =
            (new_freezone as i128 * gpo.vesting_reward_percent as i128 / PERCENT_100 as i128) as i64;
        let mut sps_fund =
            (new_freezone as i128 * gpo.sps_fund_percent as i128 / PERCENT_100 as i128) as i64;

        let median = self.state.feed().current_median_history;
        if median.is_null() || !crate::hardfork::has_hardfork(self, crate::hardfork::TREASURY_HARDFORK)
        {
            // Without a feed (or a treasury) the fund cannot take dollars;
            // its share stays with the witnesses this block.
            sps_fund = 0;
        }

        content_reward = self.pay_reward_funds(content_reward)?;
        let mut witness_reward = new_freezone - content_reward - vesting_reward - sps_fund;

        let current_witness = self.state.gpo().current_witness.clone();
        let cwit = self.state.get_witness(&current_witness)?;
        let wso = self.state.wso();
        witness_reward *= MAX_WITNESSES as i64;
        witness_reward *= match cwit.schedule {
            WitnessSchedulePlacement::Timeshare => wso.timeshare_weight as i64,
            WitnessSchedulePlacement::Miner => wso.miner_weight as i64,
            WitnessSchedulePlacement::Elected => wso.elected_weight as i64,
            WitnessSchedulePlacement::None => {
                log::warn!("unscheduled witness {current_witness} producing");
                wso.elected_weight as i64
            }
        };
        witness_reward /= wso.witness_pay_normalization_factor as i64;

        let mut new_fzd = Asset::new(0, FZD_SYMBOL);
        if sps_fund > 0 {
            new_fzd = Asset::new(sps_fund, FREEZONE_SYMBOL) * median;
            self.adjust_balance(&AccountName::unchecked(TREASURY_ACCOUNT), new_fzd)?;
        }

        let minted = content_reward + vesting_reward + witness_reward;
        self.state.modify_gpo(|gpo| {
            gpo.total_vesting_fund_freezone += Asset::new(vesting_reward, FREEZONE_SYMBOL);
            gpo.current_supply += Asset::new(minted, FREEZONE_SYMBOL);
            gpo.current_fzd_supply += new_fzd;
            gpo.virtual_supply += Asset::new(minted + sps_fund, FREEZONE_SYMBOL);
        });

        let vesting_pay =
            self.create_vesting(&current_witness, Asset::new(witness_reward, FREEZONE_SYMBOL), false)?;
        self.push_virtual_operation(VirtualOperation::ProducerReward {
            producer: current_witness,
            vesting_shares: vesting_pay,
        })?;
        Ok(())
    }

    /// Distributes the per-block content reward across the named funds by
    /// their configured percents; returns the amount actually placed.
    fn pay_reward_funds(&mut self, reward: i64) -> Result<i64> {
        let fund_ids: Vec<freezone_db::Id> =
            self.state.reward_funds.iter().map(|(id, _)| id).collect();
        let mut used = 0i64;
        for id in fund_ids {
            let percent = self.state.reward_funds.get(id)?.percent_content_rewards;
            let share = (reward as i128 * percent as i128 / PERCENT_100 as i128) as i64;
            self.state
                .reward_funds
                .modify(id, |fund| fund.reward_balance += Asset::new(share, FREEZONE_SYMBOL))?;
            used += share;
            if used > reward {
                return Err(Error::fatal("reward funds allocated more than inflation minted"));
            }
        }
        Ok(used)
    }
}
