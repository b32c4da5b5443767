//! # Pooled Vault Contract
//!
//! Tokenized pooled-custody vault that delegates deposited funds to a
//! pluggable yield strategy.
//!
//! ## Architecture Overview
//!
//! The vault owns four concerns and nothing else:
//!
//! - **Share ledger**: ERC-4626-style share accounting over a single
//!   underlying asset. Shares minted on deposit round down, shares burned on
//!   withdrawal round up, always in the vault's favor.
//! - **Fee accounting**: a high-water-mark performance fee. Profit above the
//!   mark is taxed by minting dilutive shares to the fee recipient; the mark
//!   then advances so the same profit is never taxed twice.
//! - **Strategy routing**: the full deposited amount is forwarded into the
//!   attached strategy; withdrawals draw the vault's idle buffer first and
//!   pull only the shortfall back out. Both directions are checked against
//!   the strategy's own preview so an adversarial or broken strategy cannot
//!   quietly eat value inside the call.
//! - **Circuit breaker**: a two-state emergency flag kept observably equal
//!   with the attached strategy's flag. Emergency rejects deposits and mints
//!   at both layers but always lets holders exit.
//!
//! ## Asset Flow
//!
//! ```text
//! Deposit Flow:
//! User → [Asset Token] → [Vault] → [Strategy] → [Lending Market]
//!                        ↓
//!                shares minted to receiver (whitelist-gated)
//!
//! Withdraw Flow:
//! User → [Vault.withdraw()] → idle buffer, then Strategy shortfall pull
//!                           → [Asset Token] → receiver
//! ```
//!
//! ## Storage Layout
//!
//! Instance storage holds contract-wide configuration (roles, asset,
//! strategy, fee parameters, high-water mark, breaker flag, share supply);
//! persistent storage holds per-holder balances, allowances and the
//! whitelist.
//!
//! ## First-depositor defense
//!
//! Construction pulls a fixed initial deposit and mints the matching shares
//! to the vault's own address. The vault never authorizes transfers out of
//! itself and is never whitelisted, so those dead shares are permanently
//! stuck, pinning the share price against inflation attacks.

#![no_std]

use soroban_sdk::{
    contract, contractimpl, contracttype, panic_with_error, token, Address, Env, Vec,
};

use protocol_interfaces::StrategyClient;

mod errors;
mod events;
mod guard;
mod math;

#[cfg(test)]
mod test;

pub use errors::VaultError;
use guard::EntryGuard;

// ============================================================================
// CONSTANTS
// ============================================================================

/// Required initial deposit, burned into the vault's own address forever.
pub const INITIAL_DEPOSIT: i128 = 1_000;

/// Performance fee ceiling, in basis points.
pub const MAX_FEE_BPS: u32 = 2_500;

const BPS: i128 = 10_000;

/// Ledgers the strategy's asset allowance stays live before it must be
/// re-granted (roughly 30 days).
const ALLOWANCE_TTL_LEDGERS: u32 = 518_400;

// ============================================================================
// STORAGE KEYS
// ============================================================================

#[contracttype]
#[derive(Clone)]
pub struct AllowanceKey {
    pub from: Address,
    pub spender: Address,
}

#[contracttype]
pub enum DataKey {
    /// Admin address: strategy/fee/breaker management.
    Admin,
    /// Owner address: whitelist management.
    Owner,
    /// Underlying asset token contract.
    Asset,
    /// Attached strategy contract, absent until `set_strategy`.
    Strategy,
    /// Circuit-breaker flag, mirrored into the strategy.
    EmergencyMode,
    /// Performance fee in basis points (≤ `MAX_FEE_BPS`).
    FeeBps,
    /// Performance-fee recipient, absent until configured.
    FeeRecipient,
    /// Principal plus already-taxed profit.
    HighWaterMark,
    /// Total share supply, dead shares included.
    TotalSupply,
    /// Per-holder share balance.
    Balance(Address),
    /// Share spending allowance.
    Allowance(AllowanceKey),
    /// Deposit/transfer-recipient access list.
    Whitelisted(Address),
}

// ============================================================================
// CONTRACT
// ============================================================================

#[contract]
pub struct PooledVault;

#[contractimpl]
impl PooledVault {
    // ==========================================================================
    // INITIALIZATION
    // ==========================================================================

    /// Initializes the vault and burns the required initial deposit.
    ///
    /// Pulls exactly [`INITIAL_DEPOSIT`] units of `asset` from
    /// `initial_depositor` into the idle buffer and mints the matching dead
    /// shares to the vault's own address. Sets `high_water_mark` to the
    /// initial deposit. The strategy is attached separately via
    /// [`PooledVault::set_strategy`].
    ///
    /// # Panics
    /// - If the vault has already been initialized
    /// - If the initial depositor cannot fund the initial deposit
    pub fn initialize(env: Env, admin: Address, owner: Address, asset: Address, initial_depositor: Address) {
        if env.storage().instance().has(&DataKey::Admin) {
            panic_with_error!(&env, VaultError::AlreadyInitialized);
        }
        initial_depositor.require_auth();

        token::Client::new(&env, &asset).transfer(
            &initial_depositor,
            &env.current_contract_address(),
            &INITIAL_DEPOSIT,
        );

        let storage = env.storage().instance();
        storage.set(&DataKey::Admin, &admin);
        storage.set(&DataKey::Owner, &owner);
        storage.set(&DataKey::Asset, &asset);
        storage.set(&DataKey::EmergencyMode, &false);
        storage.set(&DataKey::FeeBps, &0u32);
        storage.set(&DataKey::HighWaterMark, &INITIAL_DEPOSIT);
        storage.set(&DataKey::TotalSupply, &INITIAL_DEPOSIT);
        env.storage()
            .persistent()
            .set(&DataKey::Balance(env.current_contract_address()), &INITIAL_DEPOSIT);
    }

    // ==========================================================================
    // SHARE LEDGER - DEPOSIT SIDE
    // ==========================================================================

    /// Deposits `assets` and mints shares to `receiver`.
    ///
    /// The receiver must be whitelisted and the breaker must be off. Profit
    /// accrued since the last assessment is taxed before the new principal
    /// dilutes it. The full deposited amount is forwarded into the strategy;
    /// if the strategy credits fewer of its shares than its own preview
    /// promised, the whole operation reverts.
    ///
    /// Returns the vault shares minted.
    pub fn deposit(env: Env, from: Address, receiver: Address, assets: i128) -> i128 {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        from.require_auth();
        if assets <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::require_deposits_open(&env, &receiver);
        Self::do_assess_fee(&env);

        let shares = Self::to_shares_floor(&env, assets);
        if shares <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::pull_and_credit(&env, &from, &receiver, assets, shares);
        events::deposit(&env, from, receiver, assets, shares);
        shares
    }

    /// Mints exactly `shares` to `receiver`, charging the asset amount the
    /// current exchange rate requires (rounded up, in the vault's favor).
    ///
    /// Returns the assets pulled from `from`.
    pub fn mint(env: Env, from: Address, receiver: Address, shares: i128) -> i128 {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        from.require_auth();
        if shares <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::require_deposits_open(&env, &receiver);
        Self::do_assess_fee(&env);

        let assets = Self::to_assets_ceil(&env, shares);
        if assets <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::pull_and_credit(&env, &from, &receiver, assets, shares);
        events::deposit(&env, from, receiver, assets, shares);
        assets
    }

    // ==========================================================================
    // SHARE LEDGER - WITHDRAW SIDE
    // ==========================================================================

    /// Withdraws `assets` to `receiver`, burning shares from `owner`.
    ///
    /// Always permitted, emergency or not, whitelisted or not: removal from
    /// the whitelist never traps funds. A caller other than the owner spends
    /// share allowance. The idle buffer is drawn first; only the shortfall
    /// is pulled from the strategy, and the strategy shares burned must not
    /// exceed the pre-call preview.
    ///
    /// Returns the vault shares burned.
    pub fn withdraw(env: Env, caller: Address, receiver: Address, owner: Address, assets: i128) -> i128 {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        caller.require_auth();
        if assets <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::do_assess_fee(&env);

        let shares = Self::to_shares_ceil(&env, assets);
        Self::debit_and_pay_out(&env, &caller, &receiver, &owner, assets, shares);
        events::withdraw(&env, owner, receiver, assets, shares);
        shares
    }

    /// Redeems exactly `shares` from `owner`, paying out the backing assets
    /// (rounded down, in the vault's favor) to `receiver`.
    ///
    /// Returns the assets paid out.
    pub fn redeem(env: Env, caller: Address, receiver: Address, owner: Address, shares: i128) -> i128 {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        caller.require_auth();
        if shares <= 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        Self::do_assess_fee(&env);

        let assets = Self::to_assets_floor(&env, shares);
        Self::debit_and_pay_out(&env, &caller, &receiver, &owner, assets, shares);
        events::withdraw(&env, owner, receiver, assets, shares);
        assets
    }

    // ==========================================================================
    // SHARE TRANSFERS
    // ==========================================================================

    /// Transfers shares. The recipient must be whitelisted.
    pub fn transfer(env: Env, from: Address, to: Address, shares: i128) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        from.require_auth();
        Self::move_shares(&env, &from, &to, shares);
        events::transfer(&env, from, to, shares);
    }

    /// Transfers shares out of `from` on the strength of an allowance
    /// granted to `spender`. The recipient must be whitelisted.
    pub fn transfer_from(env: Env, spender: Address, from: Address, to: Address, shares: i128) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        spender.require_auth();
        Self::spend_allowance(&env, &from, &spender, shares);
        Self::move_shares(&env, &from, &to, shares);
        events::transfer(&env, from, to, shares);
    }

    /// Sets `spender`'s share allowance over `from`'s balance.
    pub fn approve(env: Env, from: Address, spender: Address, shares: i128) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        from.require_auth();
        if shares < 0 {
            panic_with_error!(&env, VaultError::InvalidAmount);
        }
        env.storage()
            .persistent()
            .set(&DataKey::Allowance(AllowanceKey { from, spender }), &shares);
    }

    // ==========================================================================
    // FEE ACCOUNTING
    // ==========================================================================

    /// Assesses the high-water-mark performance fee.
    ///
    /// Open to any caller (keeper pattern) and idempotent: a second call
    /// without an intervening asset-balance change mints nothing. A no-op
    /// while the fee rate is zero or no recipient is configured.
    pub fn assess_performance_fee(env: Env) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        Self::do_assess_fee(&env);
    }

    // ==========================================================================
    // EMERGENCY CONTROLLER
    // ==========================================================================

    /// Admin-only breaker control, mirrored synchronously into the strategy.
    ///
    /// Entering emergency makes the strategy fully unwind its position; so
    /// later withdrawals need no market interaction. Leaving emergency makes
    /// the strategy reinvest its idle balance.
    pub fn set_emergency_mode(env: Env, enabled: bool) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        Self::require_admin(&env);
        if Self::read_emergency(&env) == enabled {
            return;
        }
        env.storage().instance().set(&DataKey::EmergencyMode, &enabled);
        if let Some(strategy) = Self::read_strategy(&env) {
            StrategyClient::new(&env, &strategy).set_emergency_mode(&enabled);
        }
        events::emergency_mode(&env, enabled);
    }

    /// Escalation entry for the attached strategy's health check. One-way:
    /// only flips the breaker on, never off.
    pub fn activate_emergency_mode(env: Env) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        let strategy = match Self::read_strategy(&env) {
            Some(s) => s,
            None => panic_with_error!(&env, VaultError::AccessDenied),
        };
        strategy.require_auth();
        if !Self::read_emergency(&env) {
            env.storage().instance().set(&DataKey::EmergencyMode, &true);
            events::emergency_mode(&env, true);
        }
    }

    // ==========================================================================
    // ADMINISTRATIVE - STRATEGY AND FEES
    // ==========================================================================

    /// Attaches a strategy and grants it an unlimited asset allowance.
    ///
    /// The strategy must be bound to this vault and agree on the breaker
    /// state. Replacing a strategy does NOT migrate funds: the admin must
    /// drain the old strategy first, and its allowance is revoked here.
    pub fn set_strategy(env: Env, strategy: Address) {
        let _guard = EntryGuard::lock(&env);
        Self::require_initialized(&env);
        Self::require_admin(&env);

        let client = StrategyClient::new(&env, &strategy);
        if client.vault() != env.current_contract_address() {
            panic_with_error!(&env, VaultError::InvalidConfiguration);
        }
        if client.emergency_mode() != Self::read_emergency(&env) {
            panic_with_error!(&env, VaultError::InvalidConfiguration);
        }

        let asset = Self::read_asset(&env);
        let token_client = token::Client::new(&env, &asset);
        let expiration = env.ledger().sequence() + ALLOWANCE_TTL_LEDGERS;
        if let Some(previous) = Self::read_strategy(&env) {
            token_client.approve(&env.current_contract_address(), &previous, &0, &expiration);
        }
        token_client.approve(&env.current_contract_address(), &strategy, &i128::MAX, &expiration);
        env.storage().instance().set(&DataKey::Strategy, &strategy);
        events::strategy_set(&env, strategy);
    }

    /// Sets the performance fee rate, capped at [`MAX_FEE_BPS`].
    pub fn set_protocol_fee(env: Env, fee_bps: u32) {
        Self::require_initialized(&env);
        Self::require_admin(&env);
        if fee_bps > MAX_FEE_BPS {
            panic_with_error!(&env, VaultError::InvalidConfiguration);
        }
        env.storage().instance().set(&DataKey::FeeBps, &fee_bps);
    }

    pub fn set_fee_recipient(env: Env, recipient: Address) {
        Self::require_initialized(&env);
        Self::require_admin(&env);
        env.storage().instance().set(&DataKey::FeeRecipient, &recipient);
    }

    pub fn set_admin(env: Env, new_admin: Address) {
        Self::require_initialized(&env);
        Self::require_admin(&env);
        env.storage().instance().set(&DataKey::Admin, &new_admin);
    }

    // ==========================================================================
    // ADMINISTRATIVE - WHITELIST
    // ==========================================================================

    pub fn add_to_whitelist(env: Env, account: Address) {
        Self::require_initialized(&env);
        Self::require_owner(&env);
        env.storage().persistent().set(&DataKey::Whitelisted(account.clone()), &true);
        events::whitelist(&env, account, true);
    }

    pub fn remove_from_whitelist(env: Env, account: Address) {
        Self::require_initialized(&env);
        Self::require_owner(&env);
        env.storage().persistent().remove(&DataKey::Whitelisted(account.clone()));
        events::whitelist(&env, account, false);
    }

    pub fn add_batch_to_whitelist(env: Env, accounts: Vec<Address>) {
        Self::require_initialized(&env);
        Self::require_owner(&env);
        for account in accounts.iter() {
            env.storage().persistent().set(&DataKey::Whitelisted(account.clone()), &true);
            events::whitelist(&env, account, true);
        }
    }

    pub fn remove_batch_from_whitelist(env: Env, accounts: Vec<Address>) {
        Self::require_initialized(&env);
        Self::require_owner(&env);
        for account in accounts.iter() {
            env.storage().persistent().remove(&DataKey::Whitelisted(account.clone()));
            events::whitelist(&env, account, false);
        }
    }

    // ==========================================================================
    // READ FUNCTIONS
    // ==========================================================================

    /// Idle buffer plus everything the strategy reports.
    pub fn total_assets(env: Env) -> i128 {
        Self::require_initialized(&env);
        Self::read_total_assets(&env)
    }

    pub fn total_supply(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0)
    }

    pub fn balance_of(env: Env, holder: Address) -> i128 {
        Self::read_balance(&env, &holder)
    }

    pub fn allowance(env: Env, from: Address, spender: Address) -> i128 {
        env.storage()
            .persistent()
            .get(&DataKey::Allowance(AllowanceKey { from, spender }))
            .unwrap_or(0)
    }

    pub fn convert_to_shares(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_shares_floor(&env, assets)
    }

    pub fn convert_to_assets(env: Env, shares: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_assets_floor(&env, shares)
    }

    pub fn preview_deposit(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_shares_floor(&env, assets)
    }

    pub fn preview_mint(env: Env, shares: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_assets_ceil(&env, shares)
    }

    pub fn preview_withdraw(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_shares_ceil(&env, assets)
    }

    pub fn preview_redeem(env: Env, shares: i128) -> i128 {
        Self::require_initialized(&env);
        Self::to_assets_floor(&env, shares)
    }

    pub fn max_deposit(env: Env, receiver: Address) -> i128 {
        if Self::read_emergency(&env) || !Self::is_whitelisted(env.clone(), receiver) {
            0
        } else {
            i128::MAX
        }
    }

    pub fn max_mint(env: Env, receiver: Address) -> i128 {
        Self::max_deposit(env, receiver)
    }

    pub fn max_withdraw(env: Env, owner: Address) -> i128 {
        Self::require_initialized(&env);
        Self::to_assets_floor(&env, Self::read_balance(&env, &owner))
    }

    pub fn max_redeem(env: Env, owner: Address) -> i128 {
        Self::read_balance(&env, &owner)
    }

    pub fn admin(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Admin).unwrap()
    }

    pub fn owner(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Owner).unwrap()
    }

    pub fn asset(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Asset).unwrap()
    }

    pub fn strategy(env: Env) -> Option<Address> {
        Self::read_strategy(&env)
    }

    pub fn emergency_mode(env: Env) -> bool {
        Self::read_emergency(&env)
    }

    pub fn protocol_fee_bps(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::FeeBps).unwrap_or(0)
    }

    pub fn fee_recipient(env: Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::FeeRecipient)
    }

    pub fn high_water_mark(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::HighWaterMark).unwrap_or(0)
    }

    pub fn is_whitelisted(env: Env, account: Address) -> bool {
        env.storage()
            .persistent()
            .get(&DataKey::Whitelisted(account))
            .unwrap_or(false)
    }

    // ==========================================================================
    // INTERNAL - FLOW HELPERS
    // ==========================================================================

    /// Shared tail of deposit/mint: pull assets, mint shares, advance the
    /// high-water mark by the paid-in principal, forward into the strategy.
    fn pull_and_credit(env: &Env, from: &Address, receiver: &Address, assets: i128, shares: i128) {
        let asset = Self::read_asset(env);
        token::Client::new(env, &asset).transfer(from, &env.current_contract_address(), &assets);
        Self::mint_shares(env, receiver, shares);

        let hwm = Self::read_hwm(env);
        env.storage().instance().set(&DataKey::HighWaterMark, &(hwm + assets));

        if let Some(strategy) = Self::read_strategy(env) {
            let client = StrategyClient::new(env, &strategy);
            let expected = client.preview_deposit(&assets);
            let received = client.deposit(&assets);
            if received < expected {
                panic_with_error!(env, VaultError::StrategyShareMismatch);
            }
        }
    }

    /// Shared tail of withdraw/redeem: source liquidity, burn shares, pay
    /// out, and decrement the high-water mark by the literal withdrawn
    /// amount (floored at zero — documented behavior, not a proportional
    /// rescale).
    fn debit_and_pay_out(
        env: &Env,
        caller: &Address,
        receiver: &Address,
        owner: &Address,
        assets: i128,
        shares: i128,
    ) {
        if assets <= 0 || shares <= 0 {
            panic_with_error!(env, VaultError::InvalidAmount);
        }
        if caller != owner {
            Self::spend_allowance(env, owner, caller, shares);
        }
        if Self::read_balance(env, owner) < shares {
            panic_with_error!(env, VaultError::InsufficientBalance);
        }

        let asset = Self::read_asset(env);
        let token_client = token::Client::new(env, &asset);
        let idle = token_client.balance(&env.current_contract_address());
        if assets > idle {
            Self::pull_from_strategy(env, assets - idle);
        }

        Self::burn_shares(env, owner, shares);
        token_client.transfer(&env.current_contract_address(), receiver, &assets);

        let hwm = Self::read_hwm(env);
        env.storage()
            .instance()
            .set(&DataKey::HighWaterMark, &(hwm - assets).max(0));
    }

    fn pull_from_strategy(env: &Env, shortfall: i128) {
        let strategy = match Self::read_strategy(env) {
            Some(s) => s,
            None => panic_with_error!(env, VaultError::InsufficientBalance),
        };
        let client = StrategyClient::new(env, &strategy);
        let expected = client.preview_withdraw(&shortfall);
        let burned = client.withdraw(&shortfall);
        if burned > expected {
            panic_with_error!(env, VaultError::StrategyShareMismatch);
        }
    }

    fn do_assess_fee(env: &Env) {
        let fee_bps: u32 = env.storage().instance().get(&DataKey::FeeBps).unwrap_or(0);
        let recipient: Option<Address> = env.storage().instance().get(&DataKey::FeeRecipient);
        let recipient = match recipient {
            Some(r) if fee_bps > 0 => r,
            _ => return,
        };

        let total = Self::read_total_assets(env);
        let hwm = Self::read_hwm(env);
        let profit = total - hwm;
        if profit <= 0 {
            return;
        }

        let fee_assets = Self::checked(env, math::muldiv_floor(profit, fee_bps as i128, BPS));
        let supply = Self::read_supply(env);
        // Converted at the pre-mint rate; the recipient shares in their own
        // dilution like any other minted stake.
        let fee_shares = Self::checked(env, math::shares_for_assets_floor(fee_assets, supply, total));
        if fee_shares > 0 {
            Self::mint_shares(env, &recipient, fee_shares);
        }
        env.storage().instance().set(&DataKey::HighWaterMark, &total);
        events::fee_assessed(env, profit, fee_assets, fee_shares, total);
    }

    // ==========================================================================
    // INTERNAL - LEDGER PRIMITIVES
    // ==========================================================================

    fn mint_shares(env: &Env, to: &Address, shares: i128) {
        let balance = Self::read_balance(env, to);
        env.storage().persistent().set(&DataKey::Balance(to.clone()), &(balance + shares));
        let supply = Self::read_supply(env);
        env.storage().instance().set(&DataKey::TotalSupply, &(supply + shares));
    }

    fn burn_shares(env: &Env, from: &Address, shares: i128) {
        let balance = Self::read_balance(env, from);
        if balance < shares {
            panic_with_error!(env, VaultError::InsufficientBalance);
        }
        env.storage().persistent().set(&DataKey::Balance(from.clone()), &(balance - shares));
        let supply = Self::read_supply(env);
        env.storage().instance().set(&DataKey::TotalSupply, &(supply - shares));
    }

    fn move_shares(env: &Env, from: &Address, to: &Address, shares: i128) {
        if shares <= 0 {
            panic_with_error!(env, VaultError::InvalidAmount);
        }
        if !Self::is_whitelisted(env.clone(), to.clone()) {
            panic_with_error!(env, VaultError::NotWhitelisted);
        }
        let from_balance = Self::read_balance(env, from);
        if from_balance < shares {
            panic_with_error!(env, VaultError::InsufficientBalance);
        }
        env.storage().persistent().set(&DataKey::Balance(from.clone()), &(from_balance - shares));
        let to_balance = Self::read_balance(env, to);
        env.storage().persistent().set(&DataKey::Balance(to.clone()), &(to_balance + shares));
    }

    fn spend_allowance(env: &Env, from: &Address, spender: &Address, shares: i128) {
        let key = DataKey::Allowance(AllowanceKey { from: from.clone(), spender: spender.clone() });
        let allowance: i128 = env.storage().persistent().get(&key).unwrap_or(0);
        if allowance < shares {
            panic_with_error!(env, VaultError::InsufficientAllowance);
        }
        env.storage().persistent().set(&key, &(allowance - shares));
    }

    // ==========================================================================
    // INTERNAL - READS AND VALIDATION
    // ==========================================================================

    fn read_total_assets(env: &Env) -> i128 {
        let asset = Self::read_asset(env);
        let idle = token::Client::new(env, &asset).balance(&env.current_contract_address());
        match Self::read_strategy(env) {
            Some(strategy) => idle + StrategyClient::new(env, &strategy).total_assets(),
            None => idle,
        }
    }

    fn to_shares_floor(env: &Env, assets: i128) -> i128 {
        let supply = Self::read_supply(env);
        let total = Self::read_total_assets(env);
        Self::checked(env, math::shares_for_assets_floor(assets, supply, total))
    }

    fn to_shares_ceil(env: &Env, assets: i128) -> i128 {
        let supply = Self::read_supply(env);
        let total = Self::read_total_assets(env);
        Self::checked(env, math::shares_for_assets_ceil(assets, supply, total))
    }

    fn to_assets_floor(env: &Env, shares: i128) -> i128 {
        let supply = Self::read_supply(env);
        let total = Self::read_total_assets(env);
        Self::checked(env, math::assets_for_shares_floor(shares, supply, total))
    }

    fn to_assets_ceil(env: &Env, shares: i128) -> i128 {
        let supply = Self::read_supply(env);
        let total = Self::read_total_assets(env);
        Self::checked(env, math::assets_for_shares_ceil(shares, supply, total))
    }

    fn checked(env: &Env, value: Option<i128>) -> i128 {
        match value {
            Some(v) => v,
            None => panic_with_error!(env, VaultError::MathOverflow),
        }
    }

    fn read_supply(env: &Env) -> i128 {
        env.storage().instance().get(&DataKey::TotalSupply).unwrap_or(0)
    }

    fn read_balance(env: &Env, holder: &Address) -> i128 {
        env.storage().persistent().get(&DataKey::Balance(holder.clone())).unwrap_or(0)
    }

    fn read_hwm(env: &Env) -> i128 {
        env.storage().instance().get(&DataKey::HighWaterMark).unwrap_or(0)
    }

    fn read_asset(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Asset).unwrap()
    }

    fn read_strategy(env: &Env) -> Option<Address> {
        env.storage().instance().get(&DataKey::Strategy)
    }

    fn read_emergency(env: &Env) -> bool {
        env.storage().instance().get(&DataKey::EmergencyMode).unwrap_or(false)
    }

    fn require_initialized(env: &Env) {
        if !env.storage().instance().has(&DataKey::Admin) {
            panic_with_error!(env, VaultError::NotInitialized);
        }
    }

    fn require_admin(env: &Env) {
        let admin: Address = env.storage().instance().get(&DataKey::Admin).unwrap();
        admin.require_auth();
    }

    fn require_owner(env: &Env) {
        let owner: Address = env.storage().instance().get(&DataKey::Owner).unwrap();
        owner.require_auth();
    }

    fn require_deposits_open(env: &Env, receiver: &Address) {
        if Self::read_emergency(env) {
            panic_with_error!(env, VaultError::InEmergency);
        }
        if !Self::is_whitelisted(env.clone(), receiver.clone()) {
            panic_with_error!(env, VaultError::NotWhitelisted);
        }
    }
}
