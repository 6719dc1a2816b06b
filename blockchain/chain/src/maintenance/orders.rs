// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::database::Database;
use crate::errors::{Error, Result};
use crate::hardfork;
use crate::state::{
    LimitOrderKey, LiquidityRewardBalanceObject, LiquidityRewardKey, PriceKey,
};
use freezone_db::Id;
use freezone_message::VirtualOperation;
use freezone_types::config::{
    LIQUIDITY_APR_PERCENT, LIQUIDITY_TIMEOUT_SEC, MIN_LIQUIDITY_REWARD_PERIOD_SEC,
    MIN_LIQUIDITY_REWARD_SATOSHI, PERCENT_100,
};
use freezone_types::{AccountName, Asset, Price, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};

const HOURS_PER_YEAR: i128 = 8766;

impl Database {
    /// Matches a resting order against the opposing book from the best
    /// price down, until no overlap remains or the order is exhausted.
    /// Returns true when the order was completely filled and removed.
    pub(crate) fn apply_order(&mut self, order_id: Id) -> Result<bool> {
        let sell_price = self.state.limit_orders.get(order_id)?.sell_price;
        // The opposing book sells our receive asset; overlap means its
        // price is at least the inverse of ours.
        let max_price = sell_price.invert();
        let market_top = Price::new(
            Asset::new(i64::MAX, max_price.base.symbol),
            Asset::new(1, max_price.quote.symbol),
        );

        let mut finished = false;
        while !finished {
            let candidates = self.state.limit_orders.ids_in_range(
                LimitOrderKey::ByPrice(PriceKey(max_price), 0)
                    ..=LimitOrderKey::ByPrice(PriceKey(market_top), Id::MAX),
            );
            // Best opposing price is the highest key in range.
            let best = match candidates.last() {
                Some(id) => *id,
                None => break,
            };
            // Matching stops unless the maker was completely consumed.
            finished = (self.match_orders(order_id, best)? & 0x1) == 1;
        }
        Ok(self.state.limit_orders.find(order_id).is_none())
    }

    /// Fills the overlap between a taker and a maker at the maker's price.
    /// Bit 0 of the result marks the taker filled, bit 1 the maker.
    fn match_orders(&mut self, new_id: Id, old_id: Id) -> Result<i32> {
        let new_order = self.state.limit_orders.get(new_id)?.clone();
        let old_order = self.state.limit_orders.get(old_id)?.clone();
        let match_price = old_order.sell_price;

        if new_order.sell_price.quote.symbol != old_order.sell_price.base.symbol
            || new_order.sell_price.base.symbol != old_order.sell_price.quote.symbol
            || new_order.for_sale <= 0
            || old_order.for_sale <= 0
        {
            return Err(Error::precondition("error matching orders"));
        }

        let new_for_sale = new_order.amount_for_sale();
        let old_for_sale = old_order.amount_for_sale();

        let (new_pays, new_receives, old_pays, old_receives);
        if new_for_sale <= old_for_sale * match_price {
            // The taker is the smaller side.
            old_receives = new_for_sale;
            new_receives = new_for_sale * match_price;
        } else {
            new_receives = old_for_sale;
            old_receives = old_for_sale * match_price;
        }
        old_pays = new_receives;
        new_pays = old_receives;

        if new_pays != new_order.amount_for_sale() && old_pays != old_order.amount_for_sale() {
            return Err(Error::precondition("match must consume at least one order"));
        }

        // Resting orders old enough accrue liquidity-reward volume until
        // the fork that retired the reward.
        let age = self.head_block_time().saturating_elapsed(old_order.created);
        if !hardfork::has_hardfork(self, hardfork::LIQUIDITY_REWARD_DISABLE_HARDFORK)
            && age >= MIN_LIQUIDITY_REWARD_PERIOD_SEC
        {
            if old_receives.symbol == FREEZONE_SYMBOL {
                self.adjust_liquidity_reward(&old_order.seller, old_receives, false)?;
                self.adjust_liquidity_reward(&new_order.seller, -old_receives, false)?;
            } else if old_receives.symbol == FZD_SYMBOL {
                self.adjust_liquidity_reward(&old_order.seller, new_receives, true)?;
                self.adjust_liquidity_reward(&new_order.seller, -new_receives, true)?;
            }
        }

        self.push_virtual_operation(VirtualOperation::FillOrder {
            current_owner: new_order.seller.clone(),
            current_order_id: new_order.order_id,
            current_pays: new_pays,
            open_owner: old_order.seller.clone(),
            open_order_id: old_order.order_id,
            open_pays: old_pays,
        })?;

        let mut result = 0;
        result |= i32::from(self.fill_order(new_id, new_pays, new_receives)?);
        result |= i32::from(self.fill_order(old_id, old_pays, old_receives)?) << 1;
        if result == 0 {
            return Err(Error::precondition("order match filled neither side"));
        }
        Ok(result)
    }

    /// Settles one side of a match. Returns true when the order is gone.
    fn fill_order(&mut self, order_id: Id, pays: Asset, receives: Asset) -> Result<bool> {
        let order = self.state.limit_orders.get(order_id)?.clone();
        if order.amount_for_sale().symbol != pays.symbol || pays.symbol == receives.symbol {
            return Err(Error::precondition("error filling order"));
        }

        self.adjust_balance(&order.seller, receives)?;

        if pays == order.amount_for_sale() {
            self.state.limit_orders.remove(order_id)?;
            return Ok(true);
        }
        if pays.amount >= order.for_sale {
            return Err(Error::precondition("order overfilled"));
        }
        self.state.limit_orders.modify(order_id, |o| o.for_sale -= pays.amount)?;
        // A dust remainder that can no longer buy anything is refunded.
        if self.state.limit_orders.get(order_id)?.amount_to_receive().amount == 0 {
            self.cancel_order(order_id)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Cancels an order, refunding the unsold balance.
    pub(crate) fn cancel_order(&mut self, order_id: Id) -> Result<()> {
        let order = self.state.limit_orders.get(order_id)?.clone();
        self.adjust_balance(&order.seller, order.amount_for_sale())?;
        self.state.limit_orders.remove(order_id)?;
        Ok(())
    }

    /// Cancels every order past its expiration.
    pub(crate) fn clear_expired_orders(&mut self) -> Result<()> {
        let now = self.head_block_time();
        loop {
            let expired = self
                .state
                .limit_orders
                .first_in_range(
                    LimitOrderKey::ByExpiration(TimePointSec::MIN, 0)
                        ..LimitOrderKey::ByExpiration(now, 0),
                )
                .map(|(id, _)| id);
            match expired {
                Some(id) => self.cancel_order(id)?,
                None => return Ok(()),
            }
        }
    }

    fn adjust_liquidity_reward(
        &mut self,
        owner: &AccountName,
        volume: Asset,
        is_fzd: bool,
    ) -> Result<()> {
        let now = self.head_block_time();
        let key = LiquidityRewardKey::ByOwner(owner.clone());
        let id = match self.state.liquidity_rewards.id_by_key(&key) {
            Some(id) => id,
            None => {
                let owner = owner.clone();
                self.state.liquidity_rewards.create(|r: &mut LiquidityRewardBalanceObject| {
                    r.owner = owner;
                    r.last_update = now;
                });
                self.state.liquidity_rewards.id_by_key(&key).expect("row just created")
            }
        };
        self.state.liquidity_rewards.modify(id, |r| {
            if now.saturating_elapsed(r.last_update) >= LIQUIDITY_TIMEOUT_SEC {
                r.fzd_volume = 0;
                r.freezone_volume = 0;
                r.weight = 0;
            }
            if is_fzd {
                r.fzd_volume += volume.amount;
            } else {
                r.freezone_volume += volume.amount;
            }
            r.update_weight();
            r.last_update = now;
        })?;
        Ok(())
    }

    /// Periodic reward to the top liquidity provider; retired by hardfork.
    pub(crate) fn pay_liquidity_reward(&mut self) -> Result<()> {
        if hardfork::has_hardfork(self, hardfork::LIQUIDITY_REWARD_DISABLE_HARDFORK) {
            return Ok(());
        }
        if self.head_block_num() % self.config.liquidity_reward_blocks != 0 {
            return Ok(());
        }
        let reward = self.get_liquidity_reward();
        if reward.amount == 0 {
            return Ok(());
        }
        let top = self
            .state
            .liquidity_rewards
            .first_in_range(LiquidityRewardKey::ByVolumeWeight(0, 0)..)
            .map(|(id, r)| (id, r.owner.clone(), r.volume_weight()));
        if let Some((id, owner, weight)) = top {
            if weight == 0 {
                return Ok(());
            }
            let now = self.head_block_time();
            self.adjust_supply(reward, true)?;
            self.adjust_balance(&owner, reward)?;
            self.state.liquidity_rewards.modify(id, |r| {
                r.freezone_volume = 0;
                r.fzd_volume = 0;
                r.weight = 0;
                r.last_update = now;
            })?;
            self.push_virtual_operation(VirtualOperation::LiquidityReward {
                owner,
                payout: reward,
            })?;
        }
        Ok(())
    }

    fn get_liquidity_reward(&self) -> Asset {
        let supply = self.state.gpo().virtual_supply.amount as i128;
        let percent = supply * LIQUIDITY_APR_PERCENT as i128
            / (PERCENT_100 as i128 * HOURS_PER_YEAR);
        Asset::new((percent as i64).max(MIN_LIQUIDITY_REWARD_SATOSHI), FREEZONE_SYMBOL)
    }
}
