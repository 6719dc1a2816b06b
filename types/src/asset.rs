// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

use crate::Error;
use serde::{Deserialize, Serialize};
use serde_tuple::{Deserialize_tuple, Serialize_tuple};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

/// Numerical asset identifiers reserved for the built-in assets. User tokens
/// are allocated 8-digit identifiers from the NAI pool, so the reserved
/// values can never collide with them.
const NAI_FREEZONE: u32 = 1;
const NAI_FZD: u32 = 2;
const NAI_VESTS: u32 = 3;

/// Smallest and largest identifiers the NAI pool may hand out.
pub const NAI_DATA_MIN: u32 = 10_000_000;
pub const NAI_DATA_MAX: u32 = 99_999_999;

const VESTING_BIT: u32 = 0x10;
const PRECISION_MASK: u32 = 0x0f;
const NAI_SHIFT: u32 = 5;

/// Symbol identifying one asset. The encoding packs the numerical asset
/// identifier, a liquid/vesting flag and the decimal precision into a `u32`:
/// `nai << 5 | vesting << 4 | precision`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct AssetSymbol {
    asset_num: u32,
}

/// The native token.
pub const FREEZONE_SYMBOL: AssetSymbol = AssetSymbol::from_parts(NAI_FREEZONE, false, 3);
/// The dollar-pegged token.
pub const FZD_SYMBOL: AssetSymbol = AssetSymbol::from_parts(NAI_FZD, false, 3);
/// The global vesting token paired with the native token.
pub const VESTS_SYMBOL: AssetSymbol = AssetSymbol::from_parts(NAI_VESTS, true, 6);

impl AssetSymbol {
    const fn from_parts(nai: u32, vesting: bool, precision: u8) -> Self {
        AssetSymbol {
            asset_num: nai << NAI_SHIFT | (vesting as u32) << 4 | precision as u32,
        }
    }

    /// Constructs a liquid user-token symbol from a pool identifier.
    pub fn from_nai(nai: u32, precision: u8) -> Result<Self, Error> {
        if !(NAI_DATA_MIN..=NAI_DATA_MAX).contains(&nai) {
            return Err(Error::InvalidSymbol(format!("nai {nai} out of range")));
        }
        if precision > 12 {
            return Err(Error::InvalidSymbol(format!(
                "precision {precision} exceeds maximum of 12"
            )));
        }
        Ok(Self::from_parts(nai, false, precision))
    }

    /// Parses the `@@xxxxxxxxx` string form: 8 data digits and a check digit.
    pub fn from_nai_string(s: &str, precision: u8) -> Result<Self, Error> {
        let digits = s
            .strip_prefix("@@")
            .ok_or_else(|| Error::InvalidSymbol(s.to_string()))?;
        if digits.len() != 9 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(Error::InvalidSymbol(s.to_string()));
        }
        let data: u32 = digits[..8]
            .parse()
            .map_err(|_| Error::InvalidSymbol(s.to_string()))?;
        let check = digits.as_bytes()[8] - b'0';
        if check != nai_check_digit(data) {
            return Err(Error::InvalidSymbol(format!("{s}: bad check digit")));
        }
        Self::from_nai(data, precision)
    }

    pub fn to_nai(self) -> u32 {
        self.asset_num >> NAI_SHIFT
    }

    /// `@@xxxxxxxxx` form used on the wire and in diagnostics.
    pub fn to_nai_string(self) -> String {
        let data = self.to_nai();
        format!("@@{data:08}{}", nai_check_digit(data))
    }

    pub fn as_u32(self) -> u32 {
        self.asset_num
    }

    pub fn decimals(self) -> u8 {
        (self.asset_num & PRECISION_MASK) as u8
    }

    pub fn is_vesting(self) -> bool {
        self.asset_num & VESTING_BIT != 0
    }

    /// True for the three built-in assets.
    pub fn is_builtin(self) -> bool {
        self.to_nai() < NAI_DATA_MIN
    }

    /// True for liquid or vesting user-token symbols.
    pub fn is_sst(self) -> bool {
        !self.is_builtin()
    }

    /// The vesting symbol for a liquid symbol and vice versa. The native
    /// token pairs with `VESTS`; user tokens flip the vesting flag in place.
    pub fn paired_symbol(self) -> Self {
        if self == FREEZONE_SYMBOL {
            VESTS_SYMBOL
        } else if self == VESTS_SYMBOL {
            FREEZONE_SYMBOL
        } else {
            AssetSymbol {
                asset_num: self.asset_num ^ VESTING_BIT,
            }
        }
    }

    /// The liquid side of the pair, regardless of which side `self` is.
    pub fn liquid_symbol(self) -> Self {
        if self.is_vesting() {
            self.paired_symbol()
        } else {
            self
        }
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == FREEZONE_SYMBOL {
            write!(f, "FREEZONE")
        } else if *self == FZD_SYMBOL {
            write!(f, "FZD")
        } else if *self == VESTS_SYMBOL {
            write!(f, "VESTS")
        } else if self.is_vesting() {
            write!(f, "{}:VESTS", self.to_nai_string())
        } else {
            write!(f, "{}", self.to_nai_string())
        }
    }
}

/// Weighted modular check digit appended to the printed NAI.
pub fn nai_check_digit(data: u32) -> u8 {
    let mut sum: u32 = 0;
    let mut n = data;
    let mut weight = 2;
    while n > 0 {
        sum += (n % 10) * weight;
        n /= 10;
        weight += 1;
    }
    ((10 - sum % 10) % 10) as u8
}

/// A token quantity: satoshi amount plus symbol.
///
/// Arithmetic between mismatched symbols, or past `i64`, indicates a broken
/// consensus invariant and aborts; evaluator-facing paths use the checked
/// variants and surface an error instead.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_tuple, Deserialize_tuple, Default,
)]
pub struct Asset {
    pub amount: i64,
    pub symbol: AssetSymbol,
}

impl Asset {
    pub const fn new(amount: i64, symbol: AssetSymbol) -> Self {
        Asset { amount, symbol }
    }

    pub fn checked_add(self, other: Asset) -> Result<Asset, Error> {
        if self.symbol != other.symbol {
            return Err(Error::SymbolMismatch);
        }
        let amount = self.amount.checked_add(other.amount).ok_or(Error::Overflow)?;
        Ok(Asset::new(amount, self.symbol))
    }

    pub fn checked_sub(self, other: Asset) -> Result<Asset, Error> {
        self.checked_add(-other)
    }

    pub fn is_negative(self) -> bool {
        self.amount < 0
    }
}

impl Add for Asset {
    type Output = Asset;
    fn add(self, other: Asset) -> Asset {
        assert_eq!(self.symbol, other.symbol, "asset symbol mismatch");
        Asset::new(
            self.amount.checked_add(other.amount).expect("asset overflow"),
            self.symbol,
        )
    }
}

impl Sub for Asset {
    type Output = Asset;
    fn sub(self, other: Asset) -> Asset {
        self + (-other)
    }
}

impl AddAssign for Asset {
    fn add_assign(&mut self, other: Asset) {
        *self = *self + other;
    }
}

impl SubAssign for Asset {
    fn sub_assign(&mut self, other: Asset) {
        *self = *self - other;
    }
}

impl Neg for Asset {
    type Output = Asset;
    fn neg(self) -> Asset {
        Asset::new(-self.amount, self.symbol)
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        if self.symbol == other.symbol {
            self.amount.partial_cmp(&other.amount)
        } else {
            None
        }
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prec = self.symbol.decimals() as u32;
        let scale = 10i64.pow(prec);
        let whole = self.amount / scale;
        let frac = (self.amount % scale).unsigned_abs();
        write!(f, "{whole}.{frac:0width$} {}", self.symbol, width = prec as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_symbols_are_distinct() {
        assert_ne!(FREEZONE_SYMBOL, FZD_SYMBOL);
        assert_ne!(FREEZONE_SYMBOL, VESTS_SYMBOL);
        assert_eq!(FREEZONE_SYMBOL.decimals(), 3);
        assert_eq!(VESTS_SYMBOL.decimals(), 6);
        assert!(VESTS_SYMBOL.is_vesting());
        assert!(!FREEZONE_SYMBOL.is_vesting());
    }

    #[test]
    fn native_pairs_with_vests() {
        assert_eq!(FREEZONE_SYMBOL.paired_symbol(), VESTS_SYMBOL);
        assert_eq!(VESTS_SYMBOL.paired_symbol(), FREEZONE_SYMBOL);
        assert_eq!(VESTS_SYMBOL.liquid_symbol(), FREEZONE_SYMBOL);
    }

    #[test]
    fn sst_pairing_flips_in_place() {
        let liquid = AssetSymbol::from_nai(12_345_678, 3).unwrap();
        let vesting = liquid.paired_symbol();
        assert!(vesting.is_vesting());
        assert_eq!(vesting.decimals(), 3);
        assert_eq!(vesting.paired_symbol(), liquid);
        assert_eq!(vesting.liquid_symbol(), liquid);
        assert_eq!(liquid.to_nai(), vesting.to_nai());
    }

    #[test]
    fn nai_string_round_trip() {
        let sym = AssetSymbol::from_nai(20_000_001, 4).unwrap();
        let s = sym.to_nai_string();
        assert!(s.starts_with("@@"));
        assert_eq!(AssetSymbol::from_nai_string(&s, 4).unwrap(), sym);
    }

    #[test]
    fn nai_string_rejects_bad_check_digit() {
        let sym = AssetSymbol::from_nai(20_000_001, 4).unwrap();
        let mut s = sym.to_nai_string();
        let last = s.pop().unwrap();
        s.push(if last == '0' { '1' } else { '0' });
        assert!(AssetSymbol::from_nai_string(&s, 4).is_err());
    }

    #[test]
    fn nai_range_enforced() {
        assert!(AssetSymbol::from_nai(1, 3).is_err());
        assert!(AssetSymbol::from_nai(100_000_000, 3).is_err());
        assert!(AssetSymbol::from_nai(10_000_000, 13).is_err());
    }

    #[test]
    fn checked_arithmetic() {
        let a = Asset::new(500, FREEZONE_SYMBOL);
        let b = Asset::new(250, FREEZONE_SYMBOL);
        assert_eq!(a.checked_add(b).unwrap().amount, 750);
        assert_eq!(a.checked_sub(b).unwrap().amount, 250);
        assert_eq!(
            a.checked_add(Asset::new(1, FZD_SYMBOL)),
            Err(Error::SymbolMismatch)
        );
        assert_eq!(
            Asset::new(i64::MAX, FREEZONE_SYMBOL).checked_add(a),
            Err(Error::Overflow)
        );
    }

    #[test]
    fn display_uses_precision() {
        assert_eq!(Asset::new(1_500, FREEZONE_SYMBOL).to_string(), "1.500 FREEZONE");
        assert_eq!(Asset::new(25, FZD_SYMBOL).to_string(), "0.025 FZD");
    }
}
