// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::{Asset, AssetSymbol, Error};
use serde_tuple::{Deserialize_tuple, Serialize_tuple};
use std::cmp::Ordering;
use std::fmt;
use std::ops::Mul;

/// Exchange rate between two assets, expressed as `base / quote`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize_tuple, Deserialize_tuple, Default)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Price { base, quote }
    }

    /// A feed that has never been published.
    pub fn is_null(&self) -> bool {
        self.base.amount == 0 || self.quote.amount == 0
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.base.amount <= 0 || self.quote.amount <= 0 {
            return Err(Error::InvalidPrice);
        }
        if self.base.symbol == self.quote.symbol {
            return Err(Error::InvalidPrice);
        }
        Ok(())
    }

    /// Swaps base and quote.
    pub fn invert(self) -> Price {
        Price { base: self.quote, quote: self.base }
    }

    /// The highest representable price on this market, used as an order-book
    /// iteration bound.
    pub fn upper_bound(base: AssetSymbol, quote: AssetSymbol) -> Price {
        Price::new(Asset::new(i64::MAX, base), Asset::new(1, quote))
    }

    /// The lowest representable price on this market.
    pub fn lower_bound(base: AssetSymbol, quote: AssetSymbol) -> Price {
        Price::new(Asset::new(1, base), Asset::new(i64::MAX, quote))
    }

    /// Orders denominated against the dollar or a user token must quote in a
    /// power-of-ten amount so the book ticks at decimal boundaries.
    pub fn is_tick_priced(&self) -> bool {
        let mut q = self.quote.amount;
        if q <= 0 {
            return false;
        }
        while q % 10 == 0 {
            q /= 10;
        }
        q == 1
    }

    fn cross(&self, other: &Price) -> (i128, i128) {
        (
            self.base.amount as i128 * other.quote.amount as i128,
            other.base.amount as i128 * self.quote.amount as i128,
        )
    }
}

/// Prices on the same market order by cross multiplication so that no
/// precision is lost.
impl PartialOrd for Price {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self.base.symbol != other.base.symbol || self.quote.symbol != other.quote.symbol {
            return None;
        }
        let (l, r) = self.cross(other);
        l.partial_cmp(&r)
    }
}

impl Mul<Price> for Asset {
    type Output = Asset;

    /// Converts an asset through a price, rounding toward zero. The asset
    /// must match one side of the price.
    fn mul(self, p: Price) -> Asset {
        if self.symbol == p.base.symbol {
            assert!(p.base.amount > 0, "multiplying by null price");
            let result = self.amount as i128 * p.quote.amount as i128 / p.base.amount as i128;
            Asset::new(i64::try_from(result).expect("price conversion overflow"), p.quote.symbol)
        } else if self.symbol == p.quote.symbol {
            assert!(p.quote.amount > 0, "multiplying by null price");
            let result = self.amount as i128 * p.base.amount as i128 / p.quote.amount as i128;
            Asset::new(i64::try_from(result).expect("price conversion overflow"), p.base.symbol)
        } else {
            panic!("asset {} does not match either side of price", self.symbol)
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FREEZONE_SYMBOL, FZD_SYMBOL};

    fn freezone(amount: i64) -> Asset {
        Asset::new(amount, FREEZONE_SYMBOL)
    }

    fn fzd(amount: i64) -> Asset {
        Asset::new(amount, FZD_SYMBOL)
    }

    #[test]
    fn conversion_rounds_down() {
        // 0.500 FZD per 1.000 FREEZONE
        let p = Price::new(freezone(1000), fzd(500));
        assert_eq!(freezone(1500) * p, fzd(750));
        assert_eq!(fzd(750) * p, freezone(1500));
        assert_eq!(freezone(3) * p, fzd(1));
        assert_eq!(freezone(1) * p, fzd(0));
    }

    #[test]
    fn ordering_by_cross_multiplication() {
        let cheap = Price::new(freezone(1000), fzd(250));
        let rich = Price::new(freezone(1000), fzd(500));
        assert!(cheap < rich);
        assert!(rich > cheap);
        // Different markets do not compare.
        let other = Price::new(fzd(1000), freezone(500));
        assert_eq!(cheap.partial_cmp(&other), None);
    }

    #[test]
    fn tick_pricing_accepts_powers_of_ten() {
        assert!(Price::new(freezone(12345), fzd(1)).is_tick_priced());
        assert!(Price::new(freezone(12345), fzd(100)).is_tick_priced());
        assert!(Price::new(freezone(12345), fzd(1000)).is_tick_priced());
        assert!(!Price::new(freezone(12345), fzd(3)).is_tick_priced());
        assert!(!Price::new(freezone(12345), fzd(110)).is_tick_priced());
        assert!(!Price::new(freezone(12345), fzd(0)).is_tick_priced());
    }

    #[test]
    fn null_detection() {
        assert!(Price::default().is_null());
        assert!(!Price::new(freezone(1), fzd(1)).is_null());
    }

    #[test]
    fn inversion() {
        let p = Price::new(freezone(1000), fzd(500));
        let inv = p.invert();
        assert_eq!(inv.base, fzd(500));
        assert_eq!(inv.quote, freezone(1000));
    }
}
