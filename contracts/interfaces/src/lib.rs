//! Shared interfaces for the leveraged-yield vault protocol.
//!
//! The vault core consumes two external collaborators — a lending market and
//! a flash-loan liquidity venue — and wires its own contracts (vault,
//! strategy, flash borrower) together through capability interfaces rather
//! than inheritance. All of those seams are declared here as
//! `#[contractclient]` traits so every crate talks to the same surface, and
//! so tests can substitute the mock collaborators from [`testutils`].

#![no_std]

use soroban_sdk::{contractclient, contracttype, Address, Env};

#[cfg(any(test, feature = "testutils"))]
pub mod testutils;

// ============================================================================
// FIXED-POINT CONVENTIONS
// ============================================================================

/// Fixed-point scale for risk numbers: 1.0 = 10_000_000 (7 decimals, the
/// Stellar asset convention).
pub const SCALE: i128 = 10_000_000;

/// Basis-point denominator for rates and ratios.
pub const BPS: i128 = 10_000;

/// Health factor reported for an account with zero debt.
pub const HF_UNLEVERED: i128 = i128::MAX;

// ============================================================================
// SHARED TYPES
// ============================================================================

/// Risk snapshot of one account on the lending market.
#[contracttype]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountRiskData {
    /// Interest-bearing collateral balance, in underlying units.
    pub collateral: i128,
    /// Variable-rate debt balance, in underlying units.
    pub debt: i128,
    /// Risk-adjusted collateral-to-debt ratio, `SCALE`-fixed-point.
    /// `HF_UNLEVERED` when debt is zero.
    pub health_factor: i128,
    /// Loan-to-value limit applied to this account's mode, in bps.
    pub ltv_bps: u32,
}

/// Parameters of one lending-market collateral mode.
#[contracttype]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ModeParameters {
    pub ltv_bps: u32,
    pub liquidation_threshold_bps: u32,
}

/// What the flash borrower should do with the unlocked funds.
#[contracttype]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlashAction {
    /// Build a position: supply principal + loan, borrow the loan back.
    Invest = 0,
    /// Partially unwind: repay a debt fraction, release matching collateral.
    Divest = 1,
    /// Fully unwind: repay all debt, release all collateral.
    Unwind = 2,
}

/// One flash-loan round trip. Exists only for the duration of a single
/// `unlock` call; the borrower rejects anything it did not expect.
#[contracttype]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FlashLoanRequest {
    pub asset: Address,
    /// Amount unlocked by the hub, always positive. Zero-debt position
    /// changes bypass the hub through the direct paths instead.
    pub amount: i128,
    pub action: FlashAction,
    /// `Invest`: equity already sitting at the borrower.
    pub principal: i128,
    /// `Divest`/`Unwind`: market debt to repay.
    pub repay_amount: i128,
    /// `Divest`/`Unwind`: collateral to release.
    pub withdraw_amount: i128,
}

// ============================================================================
// EXTERNAL COLLABORATORS
// ============================================================================

/// Lending-market surface the core consumes. `withdraw`, `borrow` and
/// `repay` return the amounts the market actually executed; callers must use
/// the returned value rather than the requested one.
#[contractclient(name = "LendingPoolClient")]
pub trait LendingPool {
    fn supply(env: Env, from: Address, amount: i128);
    fn withdraw(env: Env, from: Address, amount: i128) -> i128;
    fn borrow(env: Env, from: Address, amount: i128) -> i128;
    fn repay(env: Env, from: Address, amount: i128) -> i128;
    fn get_account_risk_data(env: Env, user: Address) -> AccountRiskData;
    fn set_correlated_asset_mode(env: Env, user: Address, enabled: bool);
    fn get_mode_parameters(env: Env, correlated: bool) -> ModeParameters;
}

/// Zero-fee flash liquidity venue. `unlock` admits one outstanding request,
/// transfers the amount to the target up front, invokes `unlock_callback`,
/// and fails the whole transaction unless its balance is exactly restored by
/// the time the callback returns. The funds move strictly downstream: the
/// host forbids re-entering an on-stack contract, so the target repays with
/// a plain token transfer rather than by calling back into the venue.
#[contractclient(name = "LiquidityHubClient")]
pub trait LiquidityHub {
    fn unlock(env: Env, target: Address, asset: Address, amount: i128, request: FlashLoanRequest);
}

// ============================================================================
// PROTOCOL SEAMS
// ============================================================================

/// Callback surface the liquidity hub drives.
#[contractclient(name = "FlashBorrowerClient")]
pub trait FlashBorrower {
    fn unlock_callback(env: Env, request: FlashLoanRequest);
}

/// Capability interface every strategy variant implements. The vault routes
/// through this surface only; deposit/withdraw are restricted to the attached
/// vault by the implementations.
#[contractclient(name = "StrategyClient")]
pub trait Strategy {
    fn deposit(env: Env, assets: i128) -> i128;
    fn withdraw(env: Env, assets: i128) -> i128;
    fn preview_deposit(env: Env, assets: i128) -> i128;
    fn preview_withdraw(env: Env, assets: i128) -> i128;
    fn total_assets(env: Env) -> i128;
    fn check_health(env: Env) -> bool;
    fn harvest(env: Env);
    fn set_emergency_mode(env: Env, enabled: bool);
    fn emergency_mode(env: Env) -> bool;
    fn vault(env: Env) -> Address;
}

/// The slice of the vault surface the strategy calls back into.
#[contractclient(name = "VaultClient")]
pub trait Vault {
    /// Escalation only: flips the vault breaker to Emergency. Callable only
    /// by the attached strategy.
    fn activate_emergency_mode(env: Env);
    fn admin(env: Env) -> Address;
    fn emergency_mode(env: Env) -> bool;
}

/// Command surface of the position-holding flash borrower, restricted to the
/// controlling strategy. Direct paths touch the market without flash
/// liquidity (the market clamps releases to what the account's health
/// allows); leveraged builds and unwinds go through the hub callback.
#[contractclient(name = "PositionManagerClient")]
pub trait PositionManager {
    fn supply_direct(env: Env, amount: i128);
    fn withdraw_direct(env: Env, amount: i128) -> i128;
    fn total_value(env: Env) -> i128;
    fn position(env: Env) -> AccountRiskData;
}
