// Copyright 2019-2022 ChainSafe Systems
// SPDX-License-Identifier: Apache-2.0, MIT

//! Reward-curve evaluation and the per-comment reward computation. All
//! arithmetic is fixed-width 128-bit with explicit saturation.

use crate::state::Curve;

/// Integer square root by Newton iteration.
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut x = 1u128 << (128 - n.leading_zeros()).div_ceil(2);
    loop {
        let next = (x + n / x) / 2;
        if next >= x {
            return x;
        }
        x = next;
    }
}

/// Maps rshares onto claim units under a reward curve.
///
/// The quadratic curve adds the content constant twice before squaring so
/// small posts earn disproportionately less; linear and square-root pass
/// the stake through (sub-linearly for the latter).
pub fn evaluate_reward_curve(rshares: u128, curve: Curve, content_constant: u128) -> u128 {
    match curve {
        Curve::Quadratic => {
            let two_alpha = content_constant.saturating_mul(2);
            let tmp = rshares
                .saturating_add(two_alpha)
                .saturating_mul(rshares)
                / content_constant.max(1);
            tmp.saturating_mul(tmp) / content_constant.max(1)
        }
        Curve::Linear => rshares,
        Curve::SquareRoot => isqrt(rshares),
    }
}

/// Inputs for one comment's payout claim against a reward fund snapshot.
#[derive(Debug, Clone)]
pub struct CommentRewardContext {
    pub rshares: i64,
    /// Per-comment weight in basis points.
    pub reward_weight: u16,
    pub total_claims: u128,
    /// Fund balance in satoshis.
    pub reward_fund: i64,
    pub reward_curve: Curve,
    pub content_constant: u128,
}

/// The comment's share of the fund: `claim × fund / total_claims`, scaled
/// by the comment's reward weight.
pub fn claim_rshare_reward(ctx: &CommentRewardContext) -> u64 {
    if ctx.rshares <= 0 || ctx.total_claims == 0 {
        return 0;
    }
    let claim = evaluate_reward_curve(ctx.rshares as u128, ctx.reward_curve, ctx.content_constant);
    let mut payout = claim.saturating_mul(ctx.reward_fund as u128) / ctx.total_claims;
    payout = payout * ctx.reward_weight as u128 / freezone_types::config::PERCENT_100 as u128;
    payout.min(u64::MAX as u128) as u64
}

/// Curation weight earned by a vote: the marginal square-root claim it adds
/// on top of the rshares already present.
pub fn curation_weight(old_vote_rshares: u128, new_vote_rshares: u128) -> u64 {
    isqrt(new_vote_rshares)
        .saturating_sub(isqrt(old_vote_rshares))
        .min(u64::MAX as u128) as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn isqrt_matches_perfect_squares() {
        for n in [0u128, 1, 4, 9, 100, 65536, 1 << 40] {
            let root = isqrt(n);
            assert_eq!(root * root, n, "sqrt({n})");
        }
        assert_eq!(isqrt(2), 1);
        assert_eq!(isqrt(99), 9);
    }

    #[test]
    fn linear_curve_is_identity() {
        assert_eq!(evaluate_reward_curve(12_345, Curve::Linear, 1), 12_345);
    }

    #[test]
    fn quadratic_curve_grows_superlinearly() {
        let c = freezone_types::config::CONTENT_CONSTANT;
        let small = evaluate_reward_curve(1_000_000, Curve::Quadratic, c);
        let large = evaluate_reward_curve(2_000_000, Curve::Quadratic, c);
        assert!(large > small * 2);
    }

    #[test]
    fn reward_is_proportional_to_claims() {
        let ctx = CommentRewardContext {
            rshares: 1_000,
            reward_weight: freezone_types::config::PERCENT_100,
            total_claims: 10_000,
            reward_fund: 50_000,
            reward_curve: Curve::Linear,
            content_constant: 0,
        };
        assert_eq!(claim_rshare_reward(&ctx), 5_000);
    }

    #[test]
    fn negative_rshares_claim_nothing() {
        let ctx = CommentRewardContext {
            rshares: -5,
            reward_weight: freezone_types::config::PERCENT_100,
            total_claims: 10,
            reward_fund: 100,
            reward_curve: Curve::Linear,
            content_constant: 0,
        };
        assert_eq!(claim_rshare_reward(&ctx), 0);
    }

    #[test]
    fn curation_weight_is_marginal() {
        let first = curation_weight(0, 10_000);
        let second = curation_weight(10_000, 20_000);
        assert!(first > second);
        assert_eq!(first + second, isqrt(20_000) as u64);
    }
}
