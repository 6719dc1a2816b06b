// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::Result;
use freezone_types::config::PERCENT_100;
use freezone_types::{Asset, Price, FREEZONE_SYMBOL, FZD_SYMBOL};

impl Database {
    /// Folds scheduled witnesses' published prices into the median feed.
    /// Runs once per feed interval. The median is capped so the dollar
    /// supply cannot exceed ten percent of the combined market cap.
    pub(crate) fn update_median_feed(&mut self) -> Result<()> {
        if self.head_block_num() % self.config.feed_interval_blocks != 0 {
            return Ok(());
        }
        let now = self.head_block_time();
        let max_age = self.config.max_feed_age_secs;
        let wso = self.state.wso();
        let mut feeds: Vec<Price> = Vec::with_capacity(wso.num_scheduled_witnesses as usize);
        for name in &wso.current_shuffled_witnesses {
            if let Some(witness) = self.state.find_witness(name) {
                if now.saturating_elapsed(witness.last_fzd_exchange_update) < max_age
                    && !witness.fzd_exchange_rate.is_null()
                {
                    feeds.push(witness.fzd_exchange_rate);
                }
            }
        }
        if feeds.len() < self.config.min_feeds {
            return Ok(());
        }
        feeds.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median_feed = feeds[feeds.len() / 2];

        let window = self.config.feed_history_window;
        let fzd_supply = self.state.gpo().current_fzd_supply;
        let current_supply = self.state.gpo().current_supply;
        self.state.modify_feed(|fho| {
            fho.price_history.push(median_feed);
            if fho.price_history.len() > window {
                fho.price_history.remove(0);
            }
            let mut copy = fho.price_history.clone();
            copy.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
            fho.current_median_history = copy[copy.len() / 2];

            if fzd_supply.amount > 0 {
                // Cap the dollar value at a tenth of total market cap: the
                // median may not fall below nine dollars of debt per unit
                // of everything else.
                let min_price = Price::new(
                    Asset::new(9 * fzd_supply.amount, FZD_SYMBOL),
                    current_supply,
                );
                if min_price
                    .partial_cmp(&fho.current_median_history)
                    .map(|o| o.is_gt())
                    .unwrap_or(false)
                {
                    fho.current_median_history = min_price;
                }
            }
        });
        Ok(())
    }

    /// Recomputes the virtual supply and the continuous dollar print rate.
    pub(crate) fn update_virtual_supply(&mut self) -> Result<()> {
        let median = self.state.feed().current_median_history;
        self.state.modify_gpo(|gpo| {
            gpo.virtual_supply = if median.is_null() {
                gpo.current_supply
            } else {
                gpo.current_supply + gpo.current_fzd_supply * median
            };

            if median.is_null() || gpo.virtual_supply.amount == 0 {
                return;
            }
            let fzd_value = (gpo.current_fzd_supply * median).amount as u128;
            let percent_fzd = ((fzd_value * PERCENT_100 as u128
                + gpo.virtual_supply.amount as u128 / 2)
                / gpo.virtual_supply.amount as u128) as u16;

            gpo.fzd_print_rate = if percent_fzd <= gpo.fzd_start_percent {
                PERCENT_100
            } else if percent_fzd >= gpo.fzd_stop_percent {
                0
            } else {
                ((gpo.fzd_stop_percent - percent_fzd) as u32 * PERCENT_100 as u32
                    / (gpo.fzd_stop_percent - gpo.fzd_start_percent) as u32) as u16
            };
        });
        Ok(())
    }
}
