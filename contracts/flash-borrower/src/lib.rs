//! # Flash Borrower Contract
//!
//! Holds the protocol's lending-market position and executes flash-funded
//! position changes on behalf of the loop strategy.
//!
//! The strategy never receives the flash callback itself: the host rejects
//! re-entering a contract that is still on the call stack, so the contract
//! that asks the liquidity hub for funds must be different from the contract
//! the hub calls back. The same rule shapes the callback itself: the hub is
//! on the stack while it runs, so the borrower never calls the hub — the
//! funds arrive before the callback and go back as a plain token transfer.
//! This contract is that callback target. It owns the market account
//! (collateral and debt are booked against its address) and exposes two
//! surfaces:
//!
//! - `unlock_callback`, callable only by the hub, which runs one of the
//!   three flash actions against the market with the pre-delivered funds,
//!   repays the hub to the unit, and forwards any surplus to the strategy;
//! - direct supply/withdraw paths and position reads, callable only by the
//!   strategy, for the moves that need no flash liquidity.
//!
//! The flash venue is zero-fee; settlement is exact. Every failure aborts
//! the whole transaction, so a half-executed position change cannot survive.

#![no_std]

use soroban_sdk::{contract, contractimpl, contracttype, panic_with_error, token, Address, Env};

use protocol_interfaces::{AccountRiskData, FlashAction, FlashLoanRequest};

mod errors;
mod events;
mod lending;


pub use errors::BorrowerError;
use lending::LendingAdapter;

#[contracttype]
pub enum DataKey {
    /// Controlling strategy, the only caller of the direct paths.
    Strategy,
    /// Flash liquidity hub, the only caller of `unlock_callback`.
    Hub,
    /// Lending market holding this contract's position.
    Pool,
    /// Underlying asset token.
    Asset,
    /// In-flight flash amount; present only inside a callback.
    ActiveLoan,
}

#[contract]
pub struct FlashBorrowerContract;

#[contractimpl]
impl FlashBorrowerContract {
    /// Binds the borrower to its strategy, hub and market, and opts the
    /// market account into correlated-asset mode (the looped asset and the
    /// borrowed asset are the same, which the market prices at a higher
    /// loan-to-value limit).
    pub fn initialize(env: Env, strategy: Address, hub: Address, pool: Address, asset: Address) {
        if env.storage().instance().has(&DataKey::Strategy) {
            panic_with_error!(&env, BorrowerError::AlreadyInitialized);
        }
        env.storage().instance().set(&DataKey::Strategy, &strategy);
        env.storage().instance().set(&DataKey::Hub, &hub);
        env.storage().instance().set(&DataKey::Pool, &pool);
        env.storage().instance().set(&DataKey::Asset, &asset);

        LendingAdapter::new(&env, &pool, &asset).set_correlated_mode(true);
    }

    // ==========================================================================
    // FLASH CALLBACK
    // ==========================================================================

    /// Executes one flash round trip. Only the hub may call this, and the
    /// hub has already transferred the unlocked amount here before calling.
    ///
    /// State machine per call: verify the funds arrived, execute the
    /// requested action against the market, transfer exactly the unlocked
    /// amount back to the hub (the hub verifies its balance once this
    /// returns). Whatever remains afterwards (the divested equity, or dust)
    /// is forwarded to the strategy; nothing is retained here between calls.
    pub fn unlock_callback(env: Env, request: FlashLoanRequest) {
        Self::require_initialized(&env);
        let hub: Address = env.storage().instance().get(&DataKey::Hub).unwrap();
        hub.require_auth();

        let asset = Self::read_asset(&env);
        if request.asset != asset || request.amount <= 0 {
            panic_with_error!(&env, BorrowerError::UnexpectedRequest);
        }
        if env.storage().temporary().has(&DataKey::ActiveLoan) {
            panic_with_error!(&env, BorrowerError::RequestPending);
        }
        env.storage().temporary().set(&DataKey::ActiveLoan, &request.amount);

        let token_client = token::Client::new(&env, &asset);
        let funded = token_client.balance(&env.current_contract_address());
        let required = match request.action {
            FlashAction::Invest => request.principal + request.amount,
            FlashAction::Divest | FlashAction::Unwind => request.amount,
        };
        if funded < required {
            panic_with_error!(&env, BorrowerError::UnexpectedRequest);
        }

        let pool = Self::read_pool(&env);
        let adapter = LendingAdapter::new(&env, &pool, &asset);
        match request.action {
            FlashAction::Invest => {
                // Lever up: the whole target position is supplied at once,
                // then the flash principal is borrowed back to repay the hub.
                adapter.supply(request.principal + request.amount);
                let borrowed = adapter.borrow(request.amount);
                if borrowed != request.amount {
                    panic_with_error!(&env, BorrowerError::BorrowedAmountMismatch);
                }
            }
            FlashAction::Divest | FlashAction::Unwind => {
                if request.repay_amount > 0 {
                    adapter.repay(request.repay_amount);
                }
                // The market may clamp the release; the balance check below
                // is against what actually arrived.
                adapter.withdraw(request.withdraw_amount);
            }
        }

        let balance = token_client.balance(&env.current_contract_address());
        if balance < request.amount {
            panic_with_error!(&env, BorrowerError::FlashLoanSettlementMismatch);
        }
        token_client.transfer(&env.current_contract_address(), &hub, &request.amount);
        env.storage().temporary().remove(&DataKey::ActiveLoan);

        let remaining = token_client.balance(&env.current_contract_address());
        if remaining > 0 {
            let strategy = Self::read_strategy(&env);
            token_client.transfer(&env.current_contract_address(), &strategy, &remaining);
        }
        events::flash_handled(&env, request.action, request.amount, remaining);
    }

    // ==========================================================================
    // DIRECT PATHS (STRATEGY ONLY)
    // ==========================================================================

    /// Supplies this contract's asset balance of `amount` as collateral,
    /// without flash liquidity. The strategy transfers the funds here first.
    pub fn supply_direct(env: Env, amount: i128) {
        Self::require_initialized(&env);
        Self::read_strategy(&env).require_auth();
        if amount <= 0 {
            panic_with_error!(&env, BorrowerError::InvalidAmount);
        }
        let pool = Self::read_pool(&env);
        let asset = Self::read_asset(&env);
        LendingAdapter::new(&env, &pool, &asset).supply(amount);
    }

    /// Releases up to `amount` of collateral and forwards whatever the
    /// market actually released to the strategy. Returns that actual amount.
    pub fn withdraw_direct(env: Env, amount: i128) -> i128 {
        Self::require_initialized(&env);
        let strategy = Self::read_strategy(&env);
        strategy.require_auth();
        if amount <= 0 {
            panic_with_error!(&env, BorrowerError::InvalidAmount);
        }
        let pool = Self::read_pool(&env);
        let asset = Self::read_asset(&env);
        let released = LendingAdapter::new(&env, &pool, &asset).withdraw(amount);
        if released > 0 {
            token::Client::new(&env, &asset).transfer(
                &env.current_contract_address(),
                &strategy,
                &released,
            );
        }
        released
    }

    // ==========================================================================
    // READ FUNCTIONS
    // ==========================================================================

    /// Net position value: collateral minus debt, plus any idle balance.
    pub fn total_value(env: Env) -> i128 {
        Self::require_initialized(&env);
        let pool = Self::read_pool(&env);
        let asset = Self::read_asset(&env);
        let risk = LendingAdapter::new(&env, &pool, &asset).risk_data();
        let idle = token::Client::new(&env, &asset).balance(&env.current_contract_address());
        risk.collateral - risk.debt + idle
    }

    pub fn position(env: Env) -> AccountRiskData {
        Self::require_initialized(&env);
        let pool = Self::read_pool(&env);
        let asset = Self::read_asset(&env);
        LendingAdapter::new(&env, &pool, &asset).risk_data()
    }

    pub fn strategy(env: Env) -> Address {
        Self::read_strategy(&env)
    }

    pub fn hub(env: Env) -> Address {
        env.storage().instance().get(&DataKey::Hub).unwrap()
    }

    pub fn pool(env: Env) -> Address {
        Self::read_pool(&env)
    }

    pub fn asset(env: Env) -> Address {
        Self::read_asset(&env)
    }

    // ==========================================================================
    // INTERNAL
    // ==========================================================================

    fn require_initialized(env: &Env) {
        if !env.storage().instance().has(&DataKey::Strategy) {
            panic_with_error!(env, BorrowerError::NotInitialized);
        }
    }

    fn read_strategy(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Strategy).unwrap()
    }

    fn read_pool(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Pool).unwrap()
    }

    fn read_asset(env: &Env) -> Address {
        env.storage().instance().get(&DataKey::Asset).unwrap()
    }
}
