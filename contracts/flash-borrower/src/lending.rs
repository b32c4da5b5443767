//! Thin adapter over the lending market client.
//!
//! Two of the market's operations (`supply`, `repay`) pull tokens from this
//! contract from one call frame deeper than the direct invocation, where the
//! invoker's implicit authorization no longer reaches. The adapter
//! pre-authorizes exactly that nested transfer before each such call; the
//! remaining operations pass through, surfacing the amount the market
//! actually executed.

use soroban_sdk::auth::{ContractContext, InvokerContractAuthEntry, SubContractInvocation};
use soroban_sdk::{vec, Address, Env, IntoVal, Symbol};

use protocol_interfaces::{AccountRiskData, LendingPoolClient};

pub struct LendingAdapter {
    env: Env,
    pool: Address,
    asset: Address,
}

impl LendingAdapter {
    pub fn new(env: &Env, pool: &Address, asset: &Address) -> LendingAdapter {
        LendingAdapter {
            env: env.clone(),
            pool: pool.clone(),
            asset: asset.clone(),
        }
    }

    /// Supplies `amount` as collateral. The market pulls the tokens from this
    /// contract.
    pub fn supply(&self, amount: i128) {
        self.authorize_pull(amount);
        LendingPoolClient::new(&self.env, &self.pool)
            .supply(&self.env.current_contract_address(), &amount);
    }

    /// Releases collateral. The market clamps to what the account's health
    /// allows; the return value is the amount actually received.
    pub fn withdraw(&self, amount: i128) -> i128 {
        LendingPoolClient::new(&self.env, &self.pool)
            .withdraw(&self.env.current_contract_address(), &amount)
    }

    /// Borrows against the account's collateral. Returns the amount actually
    /// borrowed.
    pub fn borrow(&self, amount: i128) -> i128 {
        LendingPoolClient::new(&self.env, &self.pool)
            .borrow(&self.env.current_contract_address(), &amount)
    }

    /// Repays debt, clamped by the market to the outstanding balance.
    /// Returns the amount actually applied.
    pub fn repay(&self, amount: i128) -> i128 {
        self.authorize_pull(amount);
        LendingPoolClient::new(&self.env, &self.pool)
            .repay(&self.env.current_contract_address(), &amount)
    }

    pub fn risk_data(&self) -> AccountRiskData {
        LendingPoolClient::new(&self.env, &self.pool)
            .get_account_risk_data(&self.env.current_contract_address())
    }

    pub fn set_correlated_mode(&self, enabled: bool) {
        LendingPoolClient::new(&self.env, &self.pool)
            .set_correlated_asset_mode(&self.env.current_contract_address(), &enabled);
    }

    /// Authorizes the nested `asset.transfer(self -> pool, amount)` the
    /// market performs inside `supply` and `repay`.
    fn authorize_pull(&self, amount: i128) {
        self.env.authorize_as_current_contract(vec![
            &self.env,
            InvokerContractAuthEntry::Contract(SubContractInvocation {
                context: ContractContext {
                    contract: self.asset.clone(),
                    fn_name: Symbol::new(&self.env, "transfer"),
                    args: (
                        self.env.current_contract_address(),
                        self.pool.clone(),
                        amount,
                    )
                        .into_val(&self.env),
                },
                sub_invocations: vec![&self.env],
            }),
        ]);
    }
}
