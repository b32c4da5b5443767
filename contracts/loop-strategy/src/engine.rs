//! Pure leverage arithmetic.
//!
//! The loop holds collateral `C = P * L` against debt `D = P * (L - 1)` for
//! equity `P` at target leverage `L`. These helpers compute the flash sizes
//! for building and unwinding that shape; all of them use checked `i128`
//! arithmetic and report overflow as `None`.

use protocol_interfaces::BPS;

/// Flash principal needed to lever `principal` up to `leverage`:
/// `P * (L - 1)`.
pub fn flash_amount_for_invest(principal: i128, leverage: u32) -> Option<i128> {
    principal.checked_mul(leverage as i128 - 1)
}

/// Splits a partial unwind of `target` equity into the debt to repay and the
/// collateral to release, preserving the position's collateral-to-debt
/// ratio.
///
/// Rounding is chosen so the released surplus always covers the request:
/// repay rounds down, release rounds up, hence
/// `withdraw - repay >= target`. Returns `None` on overflow or when the
/// position has no equity to divest from.
pub fn divest_split(collateral: i128, debt: i128, target: i128) -> Option<(i128, i128)> {
    let equity = collateral - debt;
    if equity <= 0 || target <= 0 {
        return None;
    }
    let target = target.min(equity);
    let repay = debt.checked_mul(target)?.checked_div(equity)?;
    let withdraw = collateral
        .checked_mul(target)?
        .checked_add(equity - 1)?
        .checked_div(equity)?
        .min(collateral);
    Some((repay, withdraw))
}

/// Highest whole-number leverage the market's loan-to-value limit supports:
/// `floor(1 / (1 - ltv))`.
pub fn max_leverage_for_ltv(ltv_bps: u32) -> u32 {
    if ltv_bps as i128 >= BPS {
        return u32::MAX;
    }
    (BPS / (BPS - ltv_bps as i128)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flash_amount_matches_leverage() {
        assert_eq!(flash_amount_for_invest(10_000_000, 10), Some(90_000_000));
        assert_eq!(flash_amount_for_invest(10_000_000, 2), Some(10_000_000));
        assert_eq!(flash_amount_for_invest(10_000_000, 1), Some(0));
        assert_eq!(flash_amount_for_invest(i128::MAX, 3), None);
    }

    #[test]
    fn divest_split_preserves_ratio_and_covers_target() {
        // 100 collateral, 90 debt, 10 equity; divest half the equity.
        let (repay, withdraw) = divest_split(100, 90, 5).unwrap();
        assert_eq!(repay, 45);
        assert_eq!(withdraw, 50);
        assert!(withdraw - repay >= 5);
    }

    #[test]
    fn divest_split_rounds_in_the_requesters_favor() {
        // Awkward ratio: the release rounds up, the repayment down.
        let (repay, withdraw) = divest_split(1_000, 700, 7).unwrap();
        assert_eq!(repay, 700 * 7 / 300);
        assert_eq!(withdraw, (1_000 * 7 + 299) / 300);
        assert!(withdraw - repay >= 7);
    }

    #[test]
    fn divest_split_clamps_to_equity() {
        let (repay, withdraw) = divest_split(100, 90, 1_000).unwrap();
        assert_eq!(repay, 90);
        assert_eq!(withdraw, 100);
    }

    #[test]
    fn divest_split_rejects_empty_positions() {
        assert_eq!(divest_split(90, 90, 5), None);
        assert_eq!(divest_split(100, 90, 0), None);
    }

    #[test]
    fn max_leverage_tracks_ltv() {
        assert_eq!(max_leverage_for_ltv(8_000), 5);
        assert_eq!(max_leverage_for_ltv(9_200), 12);
        assert_eq!(max_leverage_for_ltv(5_000), 2);
        assert_eq!(max_leverage_for_ltv(10_000), u32::MAX);
    }
}
