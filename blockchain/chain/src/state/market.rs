// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use freezone_db::{Id, StateObject};
use freezone_types::{AccountName, Asset, Price, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};
use std::cmp::Ordering;

/// Total order over prices for the order-book index: markets group by
/// symbol pair, then prices compare by cross multiplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceKey(pub Price);

impl Ord for PriceKey {
    fn cmp(&self, other: &Self) -> Ordering {
        let market = (self.0.base.symbol, self.0.quote.symbol);
        let other_market = (other.0.base.symbol, other.0.quote.symbol);
        market.cmp(&other_market).then_with(|| {
            let l = self.0.base.amount as i128 * other.0.quote.amount as i128;
            let r = other.0.base.amount as i128 * self.0.quote.amount as i128;
            l.cmp(&r)
        })
    }
}

impl PartialOrd for PriceKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// An open limit order. `for_sale` is denominated in the base of
/// `sell_price` and shrinks as the order fills.
#[derive(Debug, Clone, PartialEq)]
pub struct LimitOrderObject {
    pub created: TimePointSec,
    pub expiration: TimePointSec,
    pub seller: AccountName,
    pub order_id: u32,
    pub for_sale: i64,
    pub sell_price: Price,
}

impl Default for LimitOrderObject {
    fn default() -> Self {
        LimitOrderObject {
            created: TimePointSec::MIN,
            expiration: TimePointSec::MAX,
            seller: AccountName::default(),
            order_id: 0,
            for_sale: 0,
            sell_price: Price::default(),
        }
    }
}

impl LimitOrderObject {
    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.symbol)
    }

    pub fn amount_to_receive(&self) -> Asset {
        self.amount_for_sale() * self.sell_price
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LimitOrderKey {
    ByAccount(AccountName, u32),
    ByPrice(PriceKey, Id),
    ByExpiration(TimePointSec, Id),
}

impl StateObject for LimitOrderObject {
    type Key = LimitOrderKey;
    const NAME: &'static str = "limit_order";

    fn keys(&self, id: Id) -> Vec<LimitOrderKey> {
        vec![
            LimitOrderKey::ByAccount(self.seller.clone(), self.order_id),
            LimitOrderKey::ByPrice(PriceKey(self.sell_price), id),
            LimitOrderKey::ByExpiration(self.expiration, id),
        ]
    }
}

/// A pending dollar→native conversion, settled at the median price when due.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertRequestObject {
    pub owner: AccountName,
    pub request_id: u32,
    pub amount: Asset,
    pub conversion_date: TimePointSec,
}

impl Default for ConvertRequestObject {
    fn default() -> Self {
        ConvertRequestObject {
            owner: AccountName::default(),
            request_id: 0,
            amount: Asset::new(0, FZD_SYMBOL),
            conversion_date: TimePointSec::MAX,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum ConvertRequestKey {
    ByOwner(AccountName, u32),
    ByConversionDate(TimePointSec, Id),
}

impl StateObject for ConvertRequestObject {
    type Key = ConvertRequestKey;
    const NAME: &'static str = "convert_request";

    fn keys(&self, id: Id) -> Vec<ConvertRequestKey> {
        vec![
            ConvertRequestKey::ByOwner(self.owner.clone(), self.request_id),
            ConvertRequestKey::ByConversionDate(self.conversion_date, id),
        ]
    }
}

/// Rolling market-making volume competing for the periodic liquidity
/// reward.
#[derive(Debug, Clone, PartialEq)]
pub struct LiquidityRewardBalanceObject {
    pub owner: AccountName,
    pub freezone_volume: i64,
    pub fzd_volume: i64,
    pub weight: u128,
    pub last_update: TimePointSec,
}

impl Default for LiquidityRewardBalanceObject {
    fn default() -> Self {
        LiquidityRewardBalanceObject {
            owner: AccountName::default(),
            freezone_volume: 0,
            fzd_volume: 0,
            weight: 0,
            last_update: TimePointSec::MIN,
        }
    }
}

impl LiquidityRewardBalanceObject {
    /// Both sides must trade for the weight to grow: volume score is
    /// `min(native, dollar)²`.
    pub fn update_weight(&mut self) {
        let min = self.freezone_volume.min(self.fzd_volume).max(0) as u128;
        self.weight = min * min;
    }

    pub fn volume_weight(&self) -> u128 {
        self.weight
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum LiquidityRewardKey {
    ByOwner(AccountName),
    /// Weight-descending: stores the complement.
    ByVolumeWeight(u128, Id),
}

impl StateObject for LiquidityRewardBalanceObject {
    type Key = LiquidityRewardKey;
    const NAME: &'static str = "liquidity_reward_balance";

    fn keys(&self, id: Id) -> Vec<LiquidityRewardKey> {
        vec![
            LiquidityRewardKey::ByOwner(self.owner.clone()),
            LiquidityRewardKey::ByVolumeWeight(u128::MAX - self.weight, id),
        ]
    }
}

/// Bound keys for scanning one market's price-ordered orders.
pub fn market_price_bounds(sell: Price) -> (PriceKey, PriceKey) {
    let base = sell.base.symbol;
    let quote = sell.quote.symbol;
    (
        PriceKey(Price::new(Asset::new(1, base), Asset::new(i64::MAX, quote))),
        PriceKey(Price::new(Asset::new(i64::MAX, base), Asset::new(1, quote))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn price(base: i64, quote: i64) -> Price {
        Price::new(Asset::new(base, FREEZONE_SYMBOL), Asset::new(quote, FZD_SYMBOL))
    }

    #[test]
    fn price_key_orders_within_market() {
        let cheap = PriceKey(price(1000, 250));
        let rich = PriceKey(price(1000, 500));
        assert!(cheap < rich);
        assert_eq!(cheap.cmp(&cheap), Ordering::Equal);
    }

    #[test]
    fn price_key_groups_by_market() {
        let native_fzd = PriceKey(price(1, 1_000_000));
        let inverse = PriceKey(Price::new(
            Asset::new(1_000_000, FZD_SYMBOL),
            Asset::new(1, FREEZONE_SYMBOL),
        ));
        // Different markets never interleave regardless of magnitude.
        assert_ne!(native_fzd.cmp(&inverse), Ordering::Equal);
    }

    #[test]
    fn liquidity_weight_needs_both_sides() {
        let mut balance = LiquidityRewardBalanceObject::default();
        balance.freezone_volume = 100;
        balance.update_weight();
        assert_eq!(balance.weight, 0);
        balance.fzd_volume = 7;
        balance.update_weight();
        assert_eq!(balance.weight, 49);
    }
}
