//! Mock collaborators for tests.
//!
//! The protocol consumes the lending market and the flash liquidity venue as
//! external interfaces; these mocks implement just enough of each to exercise
//! the core: LTV/liquidation-threshold enforcement and actual-amount returns
//! on the pool side, and the strict one-outstanding-request,
//! exact-repayment discipline on the hub side. Both also expose knobs the
//! scenarios need (`credit_yield`, `accrue_debt`).

use soroban_sdk::{
    contract, contracterror, contractimpl, contracttype, panic_with_error, token, Address, Env,
};

use crate::{AccountRiskData, FlashBorrowerClient, FlashLoanRequest, ModeParameters, BPS, HF_UNLEVERED, SCALE};

// ============================================================================
// MOCK LENDING POOL
// ============================================================================

const DEFAULT_LTV_BPS: u32 = 8_000;
const DEFAULT_LIQ_THRESHOLD_BPS: u32 = 8_500;
const CORRELATED_LTV_BPS: u32 = 9_200;
const CORRELATED_LIQ_THRESHOLD_BPS: u32 = 9_500;

#[contracttype]
pub enum PoolKey {
    Asset,
    Collateral(Address),
    Debt(Address),
    Correlated(Address),
    BorrowCap,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MockPoolError {
    InvalidAmount = 1,
    InsufficientLiquidity = 2,
    LtvExceeded = 3,
}

#[contract]
pub struct MockLendingPool;

#[contractimpl]
impl MockLendingPool {
    pub fn initialize(env: Env, asset: Address) {
        env.storage().instance().set(&PoolKey::Asset, &asset);
    }

    pub fn supply(env: Env, from: Address, amount: i128) {
        from.require_auth();
        if amount <= 0 {
            panic_with_error!(&env, MockPoolError::InvalidAmount);
        }
        let asset = Self::asset(&env);
        token::Client::new(&env, &asset).transfer(&from, &env.current_contract_address(), &amount);
        let collateral = Self::collateral(&env, &from);
        env.storage()
            .persistent()
            .set(&PoolKey::Collateral(from), &(collateral + amount));
    }

    /// Releases collateral, clamped to what the account's health and the
    /// pool's liquidity allow. Returns the amount actually released.
    pub fn withdraw(env: Env, from: Address, amount: i128) -> i128 {
        from.require_auth();
        if amount <= 0 {
            panic_with_error!(&env, MockPoolError::InvalidAmount);
        }
        let asset = Self::asset(&env);
        let collateral = Self::collateral(&env, &from);
        let debt = Self::debt(&env, &from);

        let mut actual = amount.min(collateral);
        let liquidity = token::Client::new(&env, &asset).balance(&env.current_contract_address());
        actual = actual.min(liquidity);
        if debt > 0 {
            let liq_bps = Self::mode_params(&env, Self::correlated(&env, &from))
                .liquidation_threshold_bps as i128;
            // Collateral that must stay behind to keep the account solvent.
            let required = (debt * BPS + liq_bps - 1) / liq_bps;
            actual = actual.min((collateral - required).max(0));
        }
        if actual > 0 {
            env.storage()
                .persistent()
                .set(&PoolKey::Collateral(from.clone()), &(collateral - actual));
            token::Client::new(&env, &asset).transfer(&env.current_contract_address(), &from, &actual);
        }
        actual
    }

    /// Variable-rate borrow. Fills up to the configured borrow cap and
    /// returns the amount actually lent; callers must check it.
    pub fn borrow(env: Env, from: Address, amount: i128) -> i128 {
        from.require_auth();
        if amount <= 0 {
            panic_with_error!(&env, MockPoolError::InvalidAmount);
        }
        let actual = match env.storage().instance().get::<_, i128>(&PoolKey::BorrowCap) {
            Some(cap) => amount.min(cap),
            None => amount,
        };
        let asset = Self::asset(&env);
        let collateral = Self::collateral(&env, &from);
        let debt = Self::debt(&env, &from);
        let ltv_bps = Self::mode_params(&env, Self::correlated(&env, &from)).ltv_bps as i128;
        if debt + actual > collateral * ltv_bps / BPS {
            panic_with_error!(&env, MockPoolError::LtvExceeded);
        }
        let liquidity = token::Client::new(&env, &asset).balance(&env.current_contract_address());
        if actual > liquidity {
            panic_with_error!(&env, MockPoolError::InsufficientLiquidity);
        }
        env.storage()
            .persistent()
            .set(&PoolKey::Debt(from.clone()), &(debt + actual));
        token::Client::new(&env, &asset).transfer(&env.current_contract_address(), &from, &actual);
        actual
    }

    /// Returns the amount actually applied to the debt.
    pub fn repay(env: Env, from: Address, amount: i128) -> i128 {
        from.require_auth();
        if amount <= 0 {
            panic_with_error!(&env, MockPoolError::InvalidAmount);
        }
        let debt = Self::debt(&env, &from);
        let applied = amount.min(debt);
        if applied > 0 {
            let asset = Self::asset(&env);
            token::Client::new(&env, &asset).transfer(
                &from,
                &env.current_contract_address(),
                &applied,
            );
            env.storage()
                .persistent()
                .set(&PoolKey::Debt(from), &(debt - applied));
        }
        applied
    }

    pub fn get_account_risk_data(env: Env, user: Address) -> AccountRiskData {
        let collateral = Self::collateral(&env, &user);
        let debt = Self::debt(&env, &user);
        let params = Self::mode_params(&env, Self::correlated(&env, &user));
        let health_factor = if debt == 0 {
            HF_UNLEVERED
        } else {
            collateral * params.liquidation_threshold_bps as i128 * SCALE / (BPS * debt)
        };
        AccountRiskData {
            collateral,
            debt,
            health_factor,
            ltv_bps: params.ltv_bps,
        }
    }

    pub fn set_correlated_asset_mode(env: Env, user: Address, enabled: bool) {
        user.require_auth();
        env.storage().persistent().set(&PoolKey::Correlated(user), &enabled);
    }

    pub fn get_mode_parameters(env: Env, correlated: bool) -> ModeParameters {
        Self::mode_params(&env, correlated)
    }

    /// Test knob: simulates yield accruing to an account's interest-bearing
    /// collateral. The matching tokens must be funded to the pool separately.
    pub fn credit_yield(env: Env, user: Address, amount: i128) {
        let collateral = Self::collateral(&env, &user);
        env.storage()
            .persistent()
            .set(&PoolKey::Collateral(user), &(collateral + amount));
    }

    /// Test knob: simulates interest accruing on an account's debt.
    pub fn accrue_debt(env: Env, user: Address, amount: i128) {
        let debt = Self::debt(&env, &user);
        env.storage().persistent().set(&PoolKey::Debt(user), &(debt + amount));
    }

    /// Test knob: caps every subsequent borrow at `cap`, simulating a market
    /// that partially fills.
    pub fn set_borrow_cap(env: Env, cap: i128) {
        env.storage().instance().set(&PoolKey::BorrowCap, &cap);
    }

    fn asset(env: &Env) -> Address {
        env.storage().instance().get(&PoolKey::Asset).unwrap()
    }

    fn collateral(env: &Env, user: &Address) -> i128 {
        env.storage()
            .persistent()
            .get(&PoolKey::Collateral(user.clone()))
            .unwrap_or(0)
    }

    fn debt(env: &Env, user: &Address) -> i128 {
        env.storage()
            .persistent()
            .get(&PoolKey::Debt(user.clone()))
            .unwrap_or(0)
    }

    fn correlated(env: &Env, user: &Address) -> bool {
        env.storage()
            .persistent()
            .get(&PoolKey::Correlated(user.clone()))
            .unwrap_or(false)
    }

    fn mode_params(_env: &Env, correlated: bool) -> ModeParameters {
        if correlated {
            ModeParameters {
                ltv_bps: CORRELATED_LTV_BPS,
                liquidation_threshold_bps: CORRELATED_LIQ_THRESHOLD_BPS,
            }
        } else {
            ModeParameters {
                ltv_bps: DEFAULT_LTV_BPS,
                liquidation_threshold_bps: DEFAULT_LIQ_THRESHOLD_BPS,
            }
        }
    }
}

// ============================================================================
// MOCK LIQUIDITY HUB
// ============================================================================

#[contracttype]
#[derive(Clone)]
pub struct Outstanding {
    pub target: Address,
    pub asset: Address,
    pub amount: i128,
    pub balance_before: i128,
}

#[contracttype]
pub enum HubKey {
    Outstanding,
}

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum MockHubError {
    RequestPending = 1,
    SettlementMismatch = 2,
    InvalidAmount = 3,
}

#[contract]
pub struct MockLiquidityHub;

#[contractimpl]
impl MockLiquidityHub {
    /// Admits exactly one outstanding request, pushes the funds to the
    /// target, drives the callback, and requires its balance to be exactly
    /// restored when the callback returns. Repayment is a plain transfer
    /// from the target; the target cannot call back in while this frame is
    /// on the stack. A fee-charging venue would add a fee term to the
    /// balance check.
    pub fn unlock(env: Env, target: Address, asset: Address, amount: i128, request: FlashLoanRequest) {
        if amount <= 0 {
            panic_with_error!(&env, MockHubError::InvalidAmount);
        }
        if env.storage().instance().has(&HubKey::Outstanding) {
            panic_with_error!(&env, MockHubError::RequestPending);
        }
        let token_client = token::Client::new(&env, &asset);
        let balance_before = token_client.balance(&env.current_contract_address());
        env.storage().instance().set(
            &HubKey::Outstanding,
            &Outstanding { target: target.clone(), asset: asset.clone(), amount, balance_before },
        );
        token_client.transfer(&env.current_contract_address(), &target, &amount);

        FlashBorrowerClient::new(&env, &target).unlock_callback(&request);

        if token_client.balance(&env.current_contract_address()) != balance_before {
            panic_with_error!(&env, MockHubError::SettlementMismatch);
        }
        env.storage().instance().remove(&HubKey::Outstanding);
    }
}
