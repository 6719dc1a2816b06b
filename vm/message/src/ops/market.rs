// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use super::{check_account, OperationBehavior, RequiredAuthorities};
use crate::Error;
use freezone_types::{AccountName, Asset, Price, TimePointSec, FREEZONE_SYMBOL, FZD_SYMBOL};
use serde::{Deserialize, Serialize};

/// Places a limit order at an explicit exchange rate. Orders trade only on
/// the native↔dollar and native↔user-token markets, and markets quoted in
/// the dollar or a user token must be tick priced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCreateOperation {
    pub owner: AccountName,
    pub order_id: u32,
    pub amount_to_sell: Asset,
    pub exchange_rate: Price,
    pub fill_or_kill: bool,
    pub expiration: TimePointSec,
}

impl OperationBehavior for LimitOrderCreateOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.owner)?;
        self.exchange_rate.validate().map_err(|_| Error::validation("invalid exchange rate"))?;
        if self.amount_to_sell.symbol != self.exchange_rate.base.symbol {
            return Err(Error::validation("sell asset must be the base of the price"));
        }
        if self.amount_to_sell.amount <= 0 {
            return Err(Error::validation("amount to sell must be positive"));
        }
        let base = self.exchange_rate.base.symbol;
        let quote = self.exchange_rate.quote.symbol;
        let native_market = base == FREEZONE_SYMBOL || quote == FREEZONE_SYMBOL;
        if !native_market || base == quote || base.is_vesting() || quote.is_vesting() {
            return Err(Error::validation("orders must trade against the native token"));
        }
        if !self.exchange_rate.is_tick_priced() {
            return Err(Error::validation("price must tick at a power-of-ten quote"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.owner.clone());
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCancelOperation {
    pub owner: AccountName,
    pub order_id: u32,
}

impl OperationBehavior for LimitOrderCancelOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.owner)
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.owner.clone());
    }
}

/// A witness's published native/dollar exchange rate, folded into the median
/// feed every feed interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedPublishOperation {
    pub publisher: AccountName,
    pub exchange_rate: Price,
}

impl OperationBehavior for FeedPublishOperation {
    fn validate(&self) -> Result<(), Error> {
        check_account(&self.publisher)?;
        self.exchange_rate.validate().map_err(|_| Error::validation("invalid exchange rate"))?;
        let base = self.exchange_rate.base.symbol;
        let quote = self.exchange_rate.quote.symbol;
        let is_feed = (base == FREEZONE_SYMBOL && quote == FZD_SYMBOL)
            || (base == FZD_SYMBOL && quote == FREEZONE_SYMBOL);
        if !is_feed {
            return Err(Error::validation("feed must price the native token in dollars"));
        }
        Ok(())
    }

    fn required_authorities(&self, auths: &mut RequiredAuthorities) {
        auths.active.push(self.publisher.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(base: Asset, quote: Asset) -> LimitOrderCreateOperation {
        LimitOrderCreateOperation {
            owner: AccountName::new("alice").unwrap(),
            order_id: 1,
            amount_to_sell: base,
            exchange_rate: Price::new(base, quote),
            fill_or_kill: false,
            expiration: TimePointSec::MAX,
        }
    }

    #[test]
    fn tick_rule_on_dollar_quote() {
        let ok = order(Asset::new(1500, FREEZONE_SYMBOL), Asset::new(1000, FZD_SYMBOL));
        ok.validate().unwrap();
        let bad = order(Asset::new(1500, FREEZONE_SYMBOL), Asset::new(999, FZD_SYMBOL));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn tick_rule_on_dollar_base() {
        // Selling dollars: the native side must tick instead.
        let ok = order(Asset::new(999, FZD_SYMBOL), Asset::new(1000, FREEZONE_SYMBOL));
        ok.validate().unwrap();
        let bad = order(Asset::new(999, FZD_SYMBOL), Asset::new(1001, FREEZONE_SYMBOL));
        assert!(bad.validate().is_err());
    }

    #[test]
    fn non_native_market_rejected() {
        let sst = freezone_types::AssetSymbol::from_nai(12_345_678, 3).unwrap();
        let bad = order(Asset::new(100, FZD_SYMBOL), Asset::new(10, sst));
        assert!(bad.validate().is_err());
    }
}
