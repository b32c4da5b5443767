use soroban_sdk::{contracttype, symbol_short, Env};

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct InvestedEvent {
    pub principal: i128,
    pub flash_amount: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct DivestedEvent {
    pub target: i128,
    pub repaid: i128,
    pub released: i128,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct EmergencyModeEvent {
    pub enabled: bool,
}

#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct ParamsSetEvent {
    pub target_leverage: u32,
    pub min_health_factor: i128,
    pub target_health_factor: i128,
}

pub fn invested(env: &Env, principal: i128, flash_amount: i128) {
    env.events().publish((symbol_short!("invest"),), InvestedEvent { principal, flash_amount });
}

pub fn divested(env: &Env, target: i128, repaid: i128, released: i128) {
    env.events().publish((symbol_short!("divest"),), DivestedEvent { target, repaid, released });
}

pub fn emergency_mode(env: &Env, enabled: bool) {
    env.events().publish((symbol_short!("breaker"),), EmergencyModeEvent { enabled });
}

pub fn params_set(env: &Env, target_leverage: u32, min_health_factor: i128, target_health_factor: i128) {
    env.events().publish(
        (symbol_short!("params"),),
        ParamsSetEvent { target_leverage, min_health_factor, target_health_factor },
    );
}
