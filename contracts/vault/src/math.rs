//! Share/asset conversion math.
//!
//! Conversions round in the vault's favor: floor when minting shares for a
//! deposit, ceiling when computing the shares a withdrawal must burn.
//! Intermediate products use checked `i128` arithmetic; `None` means the
//! caller should fail with a math-overflow error rather than truncate.

/// `a * b / denom`, rounded down.
pub fn muldiv_floor(a: i128, b: i128, denom: i128) -> Option<i128> {
    if denom <= 0 {
        return None;
    }
    a.checked_mul(b)?.checked_div(denom)
}

/// `a * b / denom`, rounded up.
pub fn muldiv_ceil(a: i128, b: i128, denom: i128) -> Option<i128> {
    if denom <= 0 {
        return None;
    }
    let product = a.checked_mul(b)?;
    product.checked_add(denom - 1)?.checked_div(denom)
}

/// Shares minted for `assets` at the current exchange rate, floor-rounded.
/// Falls back to 1:1 on an empty ledger.
pub fn shares_for_assets_floor(assets: i128, total_supply: i128, total_assets: i128) -> Option<i128> {
    if total_supply == 0 || total_assets <= 0 {
        return Some(assets);
    }
    muldiv_floor(assets, total_supply, total_assets)
}

/// Shares a withdrawal of `assets` must burn, ceiling-rounded.
pub fn shares_for_assets_ceil(assets: i128, total_supply: i128, total_assets: i128) -> Option<i128> {
    if total_supply == 0 || total_assets <= 0 {
        return Some(assets);
    }
    muldiv_ceil(assets, total_supply, total_assets)
}

/// Assets backing `shares`, floor-rounded.
pub fn assets_for_shares_floor(shares: i128, total_supply: i128, total_assets: i128) -> Option<i128> {
    if total_supply == 0 {
        return Some(shares);
    }
    muldiv_floor(shares, total_assets, total_supply)
}

/// Assets a mint of `shares` must pay in, ceiling-rounded.
pub fn assets_for_shares_ceil(shares: i128, total_supply: i128, total_assets: i128) -> Option<i128> {
    if total_supply == 0 {
        return Some(shares);
    }
    muldiv_ceil(shares, total_assets, total_supply)
}
