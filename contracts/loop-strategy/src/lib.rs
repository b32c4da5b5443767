//! # Loop Strategy Contract
//!
//! Leveraged looping strategy over a single lending market: deposited funds
//! are supplied as collateral, the same asset is borrowed back against them
//! and re-supplied, all in one flash-funded step instead of an iterative
//! loop. The borrowed and supplied asset are the same, so the position
//! carries rate risk but no price risk between the legs.
//!
//! The strategy initiates flash round trips but never receives them: the
//! position itself lives in a companion flash-borrower contract, which the
//! liquidity hub calls back (the host forbids calling back into a contract
//! that is still executing). This contract keeps the strategy-share ledger
//! for its vault, sizes every position change, and owns the health check
//! that can escalate into a full emergency unwind.
//!
//! ```text
//! invest:  strategy → hub.unlock(flash = P*(L-1)) → borrower callback
//!          borrower: supply P*L, borrow P*(L-1), repay hub
//! divest:  strategy → hub.unlock(repay) → borrower callback
//!          borrower: repay, release collateral, repay hub, forward surplus
//! ```
//!
//! Only the attached vault may move funds in or out. Leverage parameters
//! take effect on the next invest; an existing position is never rebalanced
//! automatically.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, panic_with_error, token, Address, Env};

use protocol_interfaces::{
    FlashAction, FlashLoanRequest, LendingPoolClient, LiquidityHubClient, PositionManagerClient,
    VaultClient,
};

mod engine;
mod errors;
mod events;


pub use errors::StrategyError;

/// Lower bound on configured leverage; 1x positions defeat the point of the
/// strategy and are rejected.
pub const MIN_LEVERAGE: u32 = 2;

#[contracttype]
pub enum DataKey {
    /// Attached vault, the only depositor/withdrawer.
    Vault,
    /// Underlying asset token.
    Asset,
    /// Position-holding flash borrower companion.
    Borrower,
    /// Flash liquidity hub.
    Hub,
    /// Lending market.
    Pool,
    /// Whole-number target leverage, `MIN_LEVERAGE..=` market max.
    TargetLeverage,
    /// Health factor below which `check_health` escalates, `SCALE`-fixed.
    MinHealthFactor,
    /// Health factor new positions are sized towards, `SCALE`-fixed.
    TargetHealthFactor,
    /// Breaker flag, kept equal with the vault's.
    EmergencyMode,
    /// Strategy shares outstanding; all of them belong to the vault.
    TotalShares,
}

#[contract]
pub struct LoopStrategy;

#[contractimpl]
impl LoopStrategy {
    /// Binds the strategy to its vault and collaborators and fixes the
    /// initial leverage parameters.
    ///
    /// The leverage bound comes from the market's correlated-asset mode,
    /// which the borrower opts into: at a loan-to-value limit `ltv`, flash
    /// settlement needs `(L-1)/L <= ltv`, so `L` may not exceed
    /// `floor(1 / (1 - ltv))`.
    pub fn initialize(
        env: Env,
        vault: Address,
        asset: Address,
        borrower: Address,
        hub: Address,
        pool: Address,
        target_leverage: u32,
        min_health_factor: i128,
        target_health_factor: i128,
    ) {
        if env.storage().instance().has(&DataKey::Vault) {
            panic_with_error!(&env, StrategyError::AlreadyInitialized);
        }
        Self::validate_params(&env, &pool, target_leverage, min_health_factor, target_health_factor);

        let storage = env.storage().instance();
        storage.set(&DataKey::Vault, &vault);
        storage.set(&DataKey::Asset, &asset);
        storage.set(&DataKey::Borrower, &borrower);
        storage.set(&DataKey::Hub, &hub);
        storage.set(&DataKey::Pool, &pool);
        storage.set(&DataKey::TargetLeverage, &target_leverage);
        storage.set(&DataKey::MinHealthFactor, &min_health_factor);
        storage.set(&DataKey::TargetHealthFactor, &target_health_factor);
        storage.set(&DataKey::EmergencyMode, &false);
        storage.set(&DataKey::TotalShares, &0i128);
    }

    // ==========================================================================
    // VAULT SURFACE
    // ==========================================================================

    /// Pulls `assets` from the vault (against the allowance it granted) and
    /// levers them into the position. Returns the strategy shares minted,
    /// priced at the pre-deposit exchange rate so the result always matches
    /// [`LoopStrategy::preview_deposit`] on the same state.
    pub fn deposit(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        let vault = Self::read_vault(&env);
        vault.require_auth();
        if Self::read_emergency(&env) {
            panic_with_error!(&env, StrategyError::InEmergency);
        }
        if assets <= 0 {
            panic_with_error!(&env, StrategyError::InvalidAmount);
        }

        let shares = Self::shares_floor(&env, assets);
        let asset = Self::read_asset(&env);
        token::Client::new(&env, &asset).transfer_from(
            &env.current_contract_address(),
            &vault,
            &env.current_contract_address(),
            &assets,
        );
        Self::invest(&env, assets);

        let supply = Self::read_shares(&env);
        env.storage().instance().set(&DataKey::TotalShares, &(supply + shares));
        shares
    }

    /// Sends exactly `assets` back to the vault, divesting from the position
    /// when the idle balance does not cover it. Returns the strategy shares
    /// burned, which never exceeds [`LoopStrategy::preview_withdraw`] on the
    /// same state.
    ///
    /// Works in emergency too: by then the position is fully unwound and the
    /// funds sit idle here.
    pub fn withdraw(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        let vault = Self::read_vault(&env);
        vault.require_auth();
        if assets <= 0 {
            panic_with_error!(&env, StrategyError::InvalidAmount);
        }

        let shares = Self::shares_ceil(&env, assets);
        let asset = Self::read_asset(&env);
        let token_client = token::Client::new(&env, &asset);
        let idle = token_client.balance(&env.current_contract_address());
        if idle < assets {
            if Self::read_emergency(&env) {
                panic_with_error!(&env, StrategyError::InsufficientBalance);
            }
            Self::divest(&env, assets - idle);
            if token_client.balance(&env.current_contract_address()) < assets {
                panic_with_error!(&env, StrategyError::InsufficientBalance);
            }
        }
        token_client.transfer(&env.current_contract_address(), &vault, &assets);

        let supply = Self::read_shares(&env);
        let burned = shares.min(supply);
        env.storage().instance().set(&DataKey::TotalShares, &(supply - burned));
        burned
    }

    pub fn preview_deposit(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        Self::shares_floor(&env, assets)
    }

    pub fn preview_withdraw(env: Env, assets: i128) -> i128 {
        Self::require_initialized(&env);
        Self::shares_ceil(&env, assets)
    }

    /// Net value under management: the position's equity plus any idle
    /// balance waiting to be invested or withdrawn.
    pub fn total_assets(env: Env) -> i128 {
        Self::require_initialized(&env);
        Self::read_total_assets(&env)
    }

    // ==========================================================================
    // HEALTH AND EMERGENCY
    // ==========================================================================

    /// Keeper entrypoint. Returns `true` while the position's health factor
    /// is at or above the configured minimum. Below it, escalates: flips
    /// this contract and the vault into emergency and fully unwinds the
    /// position, then returns `false`.
    pub fn check_health(env: Env) -> bool {
        Self::require_initialized(&env);
        let borrower = Self::read_borrower(&env);
        let risk = PositionManagerClient::new(&env, &borrower).position();
        let min_hf: i128 = env.storage().instance().get(&DataKey::MinHealthFactor).unwrap();
        if risk.health_factor >= min_hf {
            return true;
        }

        env.storage().instance().set(&DataKey::EmergencyMode, &true);
        events::emergency_mode(&env, true);
        let vault = Self::read_vault(&env);
        VaultClient::new(&env, &vault).activate_emergency_mode();
        Self::unwind(&env);
        false
    }

    /// Reinvests any idle balance. Yield accrues inside the market's
    /// interest-bearing collateral, so there is usually nothing to do; idle
    /// funds appear only as divest surplus dust. A no-op in emergency.
    pub fn harvest(env: Env) {
        Self::require_initialized(&env);
        if Self::read_emergency(&env) {
            return;
        }
        let asset = Self::read_asset(&env);
        let idle = token::Client::new(&env, &asset).balance(&env.current_contract_address());
        if idle > 0 {
            Self::invest(&env, idle);
        }
    }

    /// Vault-driven breaker control. Entering emergency fully unwinds the
    /// position so holders can exit without touching the market; leaving it
    /// reinvests the idled funds.
    pub fn set_emergency_mode(env: Env, enabled: bool) {
        Self::require_initialized(&env);
        Self::read_vault(&env).require_auth();
        if Self::read_emergency(&env) == enabled {
            return;
        }
        env.storage().instance().set(&DataKey::EmergencyMode, &enabled);
        events::emergency_mode(&env, enabled);
        if enabled {
            Self::unwind(&env);
        } else {
            let asset = Self::read_asset(&env);
            let idle = token::Client::new(&env, &asset).balance(&env.current_contract_address());
            if idle > 0 {
                Self::invest(&env, idle);
            }
        }
    }

    // ==========================================================================
    // ADMINISTRATIVE
    // ==========================================================================

    /// Updates the leverage parameters, authorized by the vault's admin.
    /// Applies to the next invest only; the existing position is not
    /// rebalanced.
    pub fn set_leverage_params(
        env: Env,
        target_leverage: u32,
        min_health_factor: i128,
        target_health_factor: i128,
    ) {
        Self::require_initialized(&env);
        let vault = Self::read_vault(&env);
        let admin = VaultClient::new(&env, &vault).admin();
        admin.require_auth();
        let pool = Self::read_pool(&env);
        Self::validate_params(&env, &pool, target_leverage, min_health_factor, target_health_factor);

        let storage = env.storage().instance();
        storage.set(&DataKey::TargetLeverage, &target_leverage);
        storage.set(&DataKey::MinHealthFactor, &min_health_factor);
        storage.set(&DataKey::TargetHealthFactor, &target_health_factor);
        events::params_set(&env, target_leverage, min_health_factor, target_health_factor);
    }

    // ==========================================================================
    // READ FUNCTIONS
    // ==========================================================================

    pub fn vault(env: Env) -> Address {
        Self::read_vault(&env)
    }

    pub fn asset(env: Env) -> Address {
        Self::read_asset(&env)
    }

    pub fn borrower(env: Env) -> Address {
        Self::read_borrower(&env)
    }

    pub fn emergency_mode(env: Env) -> bool {
        Self::read_emergency(&env)
    }

    pub fn total_shares(env: Env) -> i128 {
        Self::read_shares(&env)
    }

    pub fn target_leverage(env: Env) -> u32 {
        env.storage().instance().get(&DataKey::TargetLeverage).unwrap()
    }

    pub fn min_health_factor(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::MinHealthFactor).unwrap()
    }

    pub fn target_health_factor(env: Env) -> i128 {
        env.storage().instance().get(&DataKey::TargetHealthFactor).unwrap()
    }

    // ==========================================================================
    // INTERNAL - POSITION CHANGES
    // ==========================================================================

    /// Moves `amount` to the borrower and levers it to the target. At the
    /// configured minimum leverage the flash amount is always positive; the
    /// direct-supply branch covers a zero flash defensively.
    fn invest(env: &Env, amount: i128) {
        let asset = Self::read_asset(env);
        let borrower = Self::read_borrower(env);
        token::Client::new(env, &asset).transfer(&env.current_contract_address(), &borrower, &amount);

        let leverage: u32 = env.storage().instance().get(&DataKey::TargetLeverage).unwrap();
        let flash = match engine::flash_amount_for_invest(amount, leverage) {
            Some(f) => f,
            None => panic_with_error!(env, StrategyError::MathOverflow),
        };
        if flash == 0 {
            PositionManagerClient::new(env, &borrower).supply_direct(&amount);
        } else {
            let hub = Self::read_hub(env);
            LiquidityHubClient::new(env, &hub).unlock(
                &borrower,
                &asset,
                &flash,
                &FlashLoanRequest {
                    asset: asset.clone(),
                    amount: flash,
                    action: FlashAction::Invest,
                    principal: amount,
                    repay_amount: 0,
                    withdraw_amount: 0,
                },
            );
        }
        events::invested(env, amount, flash);
    }

    /// Frees at least `needed` equity from the position (clamped to what the
    /// position holds), preserving its leverage ratio. The borrower forwards
    /// everything it releases net of repayment, so the idle balance grows by
    /// at least the divested amount.
    fn divest(env: &Env, needed: i128) {
        let borrower = Self::read_borrower(env);
        let manager = PositionManagerClient::new(env, &borrower);
        let risk = manager.position();
        if risk.collateral - risk.debt <= 0 {
            panic_with_error!(env, StrategyError::InsufficientBalance);
        }

        if risk.debt == 0 {
            let target = needed.min(risk.collateral);
            let released = manager.withdraw_direct(&target);
            events::divested(env, needed, 0, released);
            return;
        }

        let (repay, withdraw) = match engine::divest_split(risk.collateral, risk.debt, needed) {
            Some(split) => split,
            None => panic_with_error!(env, StrategyError::MathOverflow),
        };
        if repay == 0 {
            let released = manager.withdraw_direct(&withdraw);
            events::divested(env, needed, 0, released);
        } else {
            let asset = Self::read_asset(env);
            let hub = Self::read_hub(env);
            LiquidityHubClient::new(env, &hub).unlock(
                &borrower,
                &asset,
                &repay,
                &FlashLoanRequest {
                    asset: asset.clone(),
                    amount: repay,
                    action: FlashAction::Divest,
                    principal: 0,
                    repay_amount: repay,
                    withdraw_amount: withdraw,
                },
            );
            events::divested(env, needed, repay, withdraw - repay);
        }
    }

    /// Closes the whole position: repay all debt, release all collateral.
    fn unwind(env: &Env) {
        let borrower = Self::read_borrower(env);
        let manager = PositionManagerClient::new(env, &borrower);
        let risk = manager.position();
        if risk.collateral == 0 {
            return;
        }
        if risk.debt == 0 {
            manager.withdraw_direct(&risk.collateral);
        } else {
            let asset = Self::read_asset(env);
            let hub = Self::read_hub(env);
            LiquidityHubClient::new(env, &hub).unlock(
                &borrower,
                &asset,
                &risk.debt,
                &FlashLoanRequest {
                    asset: asset.clone(),
                    amount: risk.debt,
                    action: FlashAction::Unwind,
                    principal: 0,
                    repay_amount: risk.debt,
                    withdraw_amount: risk.collateral,
                },
            );
        }
        events::divested(env, risk.collateral - risk.debt, risk.debt, risk.collateral - risk.debt);
    }

    // ==========================================================================
    // INTERNAL - SHARE MATH AND READS
    // ==========================================================================

    fn shares_floor(env: &Env, assets: i128) -> i128 {
        let supply = Self::read_shares(env);
        let total = Self::read_total_assets(env);
        if supply == 0 || total <= 0 {
            return assets;
        }
        match assets.checked_mul(supply).and_then(|p| p.checked_div(total)) {
            Some(shares) => shares,
            None => panic_with_error!(env, StrategyError::MathOverflow),
        }
    }

    fn shares_ceil(env: &Env, assets: i128) -> i128 {
        let supply = Self::read_shares(env);
        let total = Self::read_total_assets(env);
        if supply == 0 || total <= 0 {
            return assets;
        }
        let shares = assets
            .checked_mul(supply)
            .and_then(|p| p.checked_add(total - 1))
            .and_then(|p| p.checked_div(total));
        match shares {
            Some(shares) => shares,
            None => panic_with_error!(env, StrategyError::MathOverflow),
        }
    }

    fn read_total_assets(env: &Env) -> i128 {
        let asset = Self::read_asset(env);
        let idle = token::Client::new(env, &asset).balance(&env.current_contract_address());
        let borrower = Self::read_borrower(env);
        idle + PositionManagerClient::new(env, &borrower).total_value()
    }

    fn validate_params(
        env: &Env,
        pool: &Address,
        target_leverage: u32,
        min_health_factor: i128,
        target_health_factor: i128,
    ) {
        let params = LendingPoolClient::new(env, pool).get_mode_parameters(&true);
        let max_leverage = engine::max_leverage_for_ltv(params.ltv_bps);
        if target_leverage < MIN_LEVERAGE || target_leverage > max_leverage {
            panic_with_error!(env, StrategyError::InvalidConfiguration);
        }
        if min_health_factor <= 0 || min_health_factor >= target_health_factor {
            panic_with_error!(env, StrategyError::InvalidConfiguration);
        }
    }

    fn require_initialized(env: &Env) {
        if !env.storage().instance().has(&DataKey::Vault) {
            panic_with_error!(env, StrategyError::NotInitialized);
        }
    }

    fn read_vault(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Vault).unwrap()
    }

    fn read_asset(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Asset).unwrap()
    }

    fn read_borrower(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Borrower).unwrap()
    }

    fn read_hub(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Hub).unwrap()
    }

    fn read_pool(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Pool).unwrap()
    }

    fn read_emergency(env: &Env) -> bool {
        env.storage().instance().get(&DataKey::EmergencyMode).unwrap_or(false)
    }

    fn read_shares(env: &Env) -> i128 {
        env.storage().instance().get(&DataKey::TotalShares).unwrap_or(0)
    }
}
