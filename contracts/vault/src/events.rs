//! Typed events for every state-changing vault operation. Indexers and
//! keepers track deposits, fee assessments and breaker transitions from
//! these.

use soroban_sdk::{contracttype, symbol_short, Address, Env};

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct DepositEvent {
    pub from: Address,
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct WithdrawEvent {
    pub owner: Address,
    pub receiver: Address,
    pub assets: i128,
    pub shares: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct TransferEvent {
    pub from: Address,
    pub to: Address,
    pub shares: i128,
}

/// Published whenever a fee assessment finds taxable profit. `fee_shares`
/// can be zero when the profit rounds below one share; the high-water mark
/// still advances.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct FeeAssessedEvent {
    pub profit: i128,
    pub fee_assets: i128,
    pub fee_shares: i128,
    pub high_water_mark: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct EmergencyModeEvent {
    pub enabled: bool,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct StrategySetEvent {
    pub strategy: Address,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct WhitelistEvent {
    pub account: Address,
    pub added: bool,
}

pub fn deposit(env: &Env, from: Address, receiver: Address, assets: i128, shares: i128) {
    env.events().publish(
        (symbol_short!("deposit"),),
        DepositEvent { from, receiver, assets, shares },
    );
}

pub fn withdraw(env: &Env, owner: Address, receiver: Address, assets: i128, shares: i128) {
    env.events().publish(
        (symbol_short!("withdraw"),),
        WithdrawEvent { owner, receiver, assets, shares },
    );
}

pub fn transfer(env: &Env, from: Address, to: Address, shares: i128) {
    env.events().publish((symbol_short!("transfer"),), TransferEvent { from, to, shares });
}

pub fn fee_assessed(env: &Env, profit: i128, fee_assets: i128, fee_shares: i128, high_water_mark: i128) {
    env.events().publish(
        (symbol_short!("fee"),),
        FeeAssessedEvent { profit, fee_assets, fee_shares, high_water_mark },
    );
}

pub fn emergency_mode(env: &Env, enabled: bool) {
    env.events().publish((symbol_short!("breaker"),), EmergencyModeEvent { enabled });
}

pub fn strategy_set(env: &Env, strategy: Address) {
    env.events().publish((symbol_short!("strategy"),), StrategySetEvent { strategy });
}

pub fn whitelist(env: &Env, account: Address, added: bool) {
    env.events().publish((symbol_short!("allowlist"),), WhitelistEvent { account, added });
}
