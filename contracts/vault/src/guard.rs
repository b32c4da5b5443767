//! Scoped mutual-exclusion guard for the vault's mutating entrypoints.
//!
//! External calls made while an entrypoint runs (into the strategy, the
//! token, the liquidity hub) could in principle re-enter the vault; the
//! guard rejects any nested entry into a guarded entrypoint. The flag is
//! released when the guard is dropped on any successful exit path, and a
//! panic rolls the flag back together with the rest of the invocation's
//! state.

use soroban_sdk::{contracttype, panic_with_error, Env};

use crate::errors::VaultError;

#[contracttype]
pub enum GuardKey {
    Locked,
}

pub struct EntryGuard {
    env: Env,
}

impl EntryGuard {
    pub fn lock(env: &Env) -> EntryGuard {
        let locked: bool = env.storage().instance().get(&GuardKey::Locked).unwrap_or(false);
        if locked {
            panic_with_error!(env, VaultError::Reentrancy);
        }
        env.storage().instance().set(&GuardKey::Locked, &true);
        EntryGuard { env: env.clone() }
    }
}

impl Drop for EntryGuard {
    fn drop(&mut self) {
        self.env.storage().instance().set(&GuardKey::Locked, &false);
    }
}
