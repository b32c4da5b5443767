#![cfg(test)]

use soroban_sdk::testutils::Address as _;
use soroban_sdk::{token, vec, Address, Env};

use flash_borrower::{FlashBorrowerContract, FlashBorrowerContractClient};
use loop_strategy::{LoopStrategy, LoopStrategyClient};
use protocol_interfaces::testutils::{MockLendingPool, MockLendingPoolClient, MockLiquidityHub};

use crate::{PooledVault, PooledVaultClient, INITIAL_DEPOSIT};

const UNIT: i128 = 10_000_000;
const MIN_HF: i128 = 10_300_000; // 1.03
const TARGET_HF: i128 = 11_000_000; // 1.10

struct Setup<'a> {
    token: token::Client<'a>,
    token_admin: token::StellarAssetClient<'a>,
    pool: MockLendingPoolClient<'a>,
    admin: Address,
    owner: Address,
    user: Address,
    vault: PooledVaultClient<'a>,
    strategy: LoopStrategyClient<'a>,
    borrower: FlashBorrowerContractClient<'a>,
}

/// Full stack: vault -> strategy -> hub/borrower -> pool, all live in one
/// env. The user arrives whitelisted and funded.
fn setup(env: &Env, leverage: u32) -> Setup<'_> {
    env.mock_all_auths();
    env.budget().reset_unlimited();

    let token_issuer = Address::generate(env);
    let token_id = env.register_stellar_asset_contract(token_issuer);
    let token = token::Client::new(env, &token_id);
    let token_admin = token::StellarAssetClient::new(env, &token_id);

    let pool_id = env.register_contract(None, MockLendingPool);
    let pool = MockLendingPoolClient::new(env, &pool_id);
    pool.initialize(&token_id);

    let hub_id = env.register_contract(None, MockLiquidityHub);
    token_admin.mint(&hub_id, &(100_000 * UNIT));

    let admin = Address::generate(env);
    let owner = Address::generate(env);
    let vault_id = env.register_contract(None, PooledVault);
    let vault = PooledVaultClient::new(env, &vault_id);
    token_admin.mint(&admin, &INITIAL_DEPOSIT);
    vault.initialize(&admin, &owner, &token_id, &admin);

    let strategy_id = env.register_contract(None, LoopStrategy);
    let strategy = LoopStrategyClient::new(env, &strategy_id);
    let borrower_id = env.register_contract(None, FlashBorrowerContract);
    let borrower = FlashBorrowerContractClient::new(env, &borrower_id);
    borrower.initialize(&strategy_id, &hub_id, &pool_id, &token_id);
    strategy.initialize(
        &vault_id, &token_id, &borrower_id, &hub_id, &pool_id, &leverage, &MIN_HF, &TARGET_HF,
    );
    vault.set_strategy(&strategy_id);

    let user = Address::generate(env);
    token_admin.mint(&user, &(1_000 * UNIT));
    vault.add_to_whitelist(&user);

    Setup { token, token_admin, pool, admin, owner, user, vault, strategy, borrower }
}

fn simulate_yield(s: &Setup, amount: i128) {
    s.pool.credit_yield(&s.borrower.address, &amount);
    s.token_admin.mint(&s.pool.address, &amount);
}

mod short_changing {
    //! A strategy that promises one exchange rate in its preview and
    //! delivers a worse one; the router must refuse to leave value with it.

    use soroban_sdk::{contract, contractimpl, contracttype, Address, Env};

    #[contracttype]
    pub enum Key {
        Vault,
    }

    #[contract]
    pub struct ShortChangingStrategy;

    #[contractimpl]
    impl ShortChangingStrategy {
        pub fn initialize(env: Env, vault: Address) {
            env.storage().instance().set(&Key::Vault, &vault);
        }

        pub fn deposit(_env: Env, assets: i128) -> i128 {
            assets - 1
        }

        pub fn withdraw(_env: Env, _assets: i128) -> i128 {
            0
        }

        pub fn preview_deposit(_env: Env, assets: i128) -> i128 {
            assets
        }

        pub fn preview_withdraw(_env: Env, assets: i128) -> i128 {
            assets
        }

        pub fn total_assets(_env: Env) -> i128 {
            0
        }

        pub fn check_health(_env: Env) -> bool {
            true
        }

        pub fn harvest(_env: Env) {}

        pub fn set_emergency_mode(_env: Env, _enabled: bool) {}

        pub fn emergency_mode(_env: Env) -> bool {
            false
        }

        pub fn vault(env: Env) -> Address {
            env.storage().instance().get(&Key::Vault).unwrap()
        }
    }
}

// ============================================================================
// INITIALIZATION AND CONFIGURATION
// ============================================================================

#[test]
fn initialization_mints_dead_shares() {
    let env = Env::default();
    let s = setup(&env, 10);
    assert_eq!(s.vault.total_supply(), INITIAL_DEPOSIT);
    assert_eq!(s.vault.balance_of(&s.vault.address), INITIAL_DEPOSIT);
    assert_eq!(s.vault.high_water_mark(), INITIAL_DEPOSIT);
    assert_eq!(s.vault.total_assets(), INITIAL_DEPOSIT);
    assert!(!s.vault.emergency_mode());
    assert_eq!(s.vault.strategy(), Some(s.strategy.address.clone()));
}

#[test]
fn initialize_twice_fails() {
    let env = Env::default();
    let s = setup(&env, 10);
    assert!(s
        .vault
        .try_initialize(&s.admin, &s.owner, &s.token.address, &s.admin)
        .is_err());
}

#[test]
fn fee_configuration_is_bounded() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.set_protocol_fee(&2_500);
    assert_eq!(s.vault.protocol_fee_bps(), 2_500);
    assert!(s.vault.try_set_protocol_fee(&2_501).is_err());
}

#[test]
fn set_strategy_rejects_a_foreign_strategy() {
    let env = Env::default();
    let s = setup(&env, 10);

    // A strategy bound to some other vault must be rejected.
    let other_vault = Address::generate(&env);
    let stray_id = env.register_contract(None, LoopStrategy);
    let stray = LoopStrategyClient::new(&env, &stray_id);
    let stray_borrower_id = env.register_contract(None, FlashBorrowerContract);
    FlashBorrowerContractClient::new(&env, &stray_borrower_id).initialize(
        &stray_id,
        &s.borrower.hub(),
        &s.pool.address,
        &s.token.address,
    );
    stray.initialize(
        &other_vault,
        &s.token.address,
        &stray_borrower_id,
        &s.borrower.hub(),
        &s.pool.address,
        &10,
        &MIN_HF,
        &TARGET_HF,
    );
    assert!(s.vault.try_set_strategy(&stray_id).is_err());
}

#[test]
fn deposit_rejects_a_strategy_that_shorts_its_preview() {
    let env = Env::default();
    let s = setup(&env, 10);

    let cheat_id = env.register_contract(None, short_changing::ShortChangingStrategy);
    short_changing::ShortChangingStrategyClient::new(&env, &cheat_id).initialize(&s.vault.address);
    s.vault.set_strategy(&cheat_id);

    // The strategy credits one share less than its own preview promised;
    // the deposit must revert instead of leaving value behind.
    assert!(s.vault.try_deposit(&s.user, &s.user, &(10 * UNIT)).is_err());
    assert_eq!(s.vault.balance_of(&s.user), 0);
    assert_eq!(s.token.balance(&s.user), 1_000 * UNIT);
}

// ============================================================================
// DEPOSITS AND THE WHITELIST
// ============================================================================

#[test]
fn first_deposit_is_one_to_one_and_fully_forwarded() {
    let env = Env::default();
    let s = setup(&env, 10);

    assert_eq!(s.vault.preview_deposit(&(100 * UNIT)), 100 * UNIT);
    let shares = s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    assert_eq!(shares, 100 * UNIT);
    assert_eq!(s.vault.balance_of(&s.user), 100 * UNIT);
    assert_eq!(s.vault.total_supply(), 100 * UNIT + INITIAL_DEPOSIT);
    assert_eq!(s.vault.high_water_mark(), 100 * UNIT + INITIAL_DEPOSIT);
    assert_eq!(s.vault.total_assets(), 100 * UNIT + INITIAL_DEPOSIT);

    // The deposit went through to the market; only the dead-share backing
    // idles at the vault.
    assert_eq!(s.token.balance(&s.vault.address), INITIAL_DEPOSIT);
    let risk = s.borrower.position();
    assert_eq!(risk.collateral, 1_000 * UNIT);
    assert_eq!(risk.debt, 900 * UNIT);
}

#[test]
fn deposit_requires_whitelisting() {
    let env = Env::default();
    let s = setup(&env, 10);
    let outsider = Address::generate(&env);
    s.token_admin.mint(&outsider, &(10 * UNIT));
    assert!(s.vault.try_deposit(&outsider, &outsider, &(10 * UNIT)).is_err());
    // Depositing on behalf of a whitelisted receiver is fine.
    let shares = s.vault.deposit(&outsider, &s.user, &(10 * UNIT));
    assert_eq!(shares, 10 * UNIT);
    assert_eq!(s.vault.balance_of(&s.user), 10 * UNIT);

    assert_eq!(s.vault.max_deposit(&outsider), 0);
    assert!(s.vault.max_deposit(&s.user) > 0);
}

#[test]
fn batch_whitelisting_round_trip() {
    let env = Env::default();
    let s = setup(&env, 10);
    let a = Address::generate(&env);
    let b = Address::generate(&env);
    s.vault.add_batch_to_whitelist(&vec![&env, a.clone(), b.clone()]);
    assert!(s.vault.is_whitelisted(&a));
    assert!(s.vault.is_whitelisted(&b));
    s.vault.remove_batch_from_whitelist(&vec![&env, a.clone(), b.clone()]);
    assert!(!s.vault.is_whitelisted(&a));
    assert!(!s.vault.is_whitelisted(&b));
}

#[test]
fn mint_charges_the_previewed_assets() {
    let env = Env::default();
    let s = setup(&env, 10);
    let assets = s.vault.preview_mint(&(25 * UNIT));
    let charged = s.vault.mint(&s.user, &s.user, &(25 * UNIT));
    assert_eq!(charged, assets);
    assert_eq!(s.vault.balance_of(&s.user), 25 * UNIT);
}

#[test]
fn invalid_amounts_are_rejected() {
    let env = Env::default();
    let s = setup(&env, 10);
    assert!(s.vault.try_deposit(&s.user, &s.user, &0).is_err());
    assert!(s.vault.try_deposit(&s.user, &s.user, &(-1)).is_err());
    assert!(s.vault.try_withdraw(&s.user, &s.user, &s.user, &0).is_err());
    assert!(s.vault.try_redeem(&s.user, &s.user, &s.user, &(-3)).is_err());
}

// ============================================================================
// WITHDRAWALS
// ============================================================================

#[test]
fn withdraw_draws_idle_first_then_the_strategy() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    let shares = s.vault.withdraw(&s.user, &s.user, &s.user, &(40 * UNIT));
    assert_eq!(shares, 40 * UNIT);
    assert_eq!(s.token.balance(&s.user), 940 * UNIT);
    assert_eq!(s.vault.balance_of(&s.user), 60 * UNIT);
    // Idle is spent down to zero before the strategy is touched; the
    // shortfall arrives exactly.
    assert_eq!(s.token.balance(&s.vault.address), 0);
}

#[test]
fn full_redeem_after_yield_returns_principal_plus_profit() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    simulate_yield(&s, 10 * UNIT);
    assert_eq!(s.vault.total_assets(), 110 * UNIT + INITIAL_DEPOSIT);

    let assets = s.vault.redeem(&s.user, &s.user, &s.user, &(100 * UNIT));
    // All but the dead shares' pro-rata slice of the profit comes back.
    assert!(assets > 109 * UNIT && assets <= 110 * UNIT);
    assert_eq!(s.token.balance(&s.user), 900 * UNIT + assets);
    assert_eq!(s.vault.balance_of(&s.user), 0);
    assert_eq!(s.vault.total_supply(), INITIAL_DEPOSIT);
}

#[test]
fn withdraw_spends_share_allowance() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    let operator = Address::generate(&env);
    assert!(s.vault.try_withdraw(&operator, &operator, &s.user, &(10 * UNIT)).is_err());

    s.vault.approve(&s.user, &operator, &(30 * UNIT));
    s.vault.withdraw(&operator, &operator, &s.user, &(10 * UNIT));
    assert_eq!(s.token.balance(&operator), 10 * UNIT);
    assert_eq!(s.vault.allowance(&s.user, &operator), 20 * UNIT);
    // Exhausting the allowance stops the operator.
    assert!(s.vault.try_withdraw(&operator, &operator, &s.user, &(25 * UNIT)).is_err());
}

#[test]
fn round_trip_loses_at_most_a_unit() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    simulate_yield(&s, 7 * UNIT + 1_234_567);

    let before = s.token.balance(&s.user);
    let shares = s.vault.deposit(&s.user, &s.user, &(10 * UNIT));
    let back = s.vault.redeem(&s.user, &s.user, &s.user, &shares);
    assert!(back <= 10 * UNIT);
    assert!(10 * UNIT - back <= 2);
    assert!(before - s.token.balance(&s.user) <= 2);
}

#[test]
fn dead_shares_never_leave() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    s.vault.redeem(&s.user, &s.user, &s.user, &(100 * UNIT));
    assert_eq!(s.vault.total_supply(), INITIAL_DEPOSIT);
    assert_eq!(s.vault.balance_of(&s.vault.address), INITIAL_DEPOSIT);
    assert!(s.vault.total_assets() >= INITIAL_DEPOSIT);
}

// ============================================================================
// SHARE TRANSFERS
// ============================================================================

#[test]
fn transfers_are_whitelist_gated_but_exits_are_not() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    let friend = Address::generate(&env);
    assert!(s.vault.try_transfer(&s.user, &friend, &(10 * UNIT)).is_err());

    s.vault.add_to_whitelist(&friend);
    s.vault.transfer(&s.user, &friend, &(10 * UNIT));
    assert_eq!(s.vault.balance_of(&friend), 10 * UNIT);

    // Losing whitelist status blocks receiving, never leaving.
    s.vault.remove_from_whitelist(&friend);
    assert!(s.vault.try_transfer(&s.user, &friend, &(10 * UNIT)).is_err());
    let assets = s.vault.redeem(&friend, &friend, &friend, &(10 * UNIT));
    assert!(assets > 0);
    assert_eq!(s.vault.balance_of(&friend), 0);
}

#[test]
fn transfer_from_spends_allowance() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    let operator = Address::generate(&env);
    let receiver = Address::generate(&env);
    s.vault.add_to_whitelist(&receiver);

    s.vault.approve(&s.user, &operator, &(15 * UNIT));
    s.vault.transfer_from(&operator, &s.user, &receiver, &(15 * UNIT));
    assert_eq!(s.vault.balance_of(&receiver), 15 * UNIT);
    assert_eq!(s.vault.allowance(&s.user, &operator), 0);
    assert!(s.vault.try_transfer_from(&operator, &s.user, &receiver, &1).is_err());
}

// ============================================================================
// PERFORMANCE FEES
// ============================================================================

#[test]
fn fee_assessment_mints_dilutive_shares_once() {
    let env = Env::default();
    let s = setup(&env, 10);
    let recipient = Address::generate(&env);
    s.vault.set_protocol_fee(&1_000); // 10%
    s.vault.set_fee_recipient(&recipient);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    simulate_yield(&s, 10 * UNIT);
    // 10% of the 10-unit profit, converted at the pre-mint exchange rate.
    let expected_shares = s.vault.convert_to_shares(&UNIT);
    s.vault.assess_performance_fee();

    let fee_shares = s.vault.balance_of(&recipient);
    assert_eq!(fee_shares, expected_shares);
    assert!(fee_shares > 0);
    assert_eq!(s.vault.high_water_mark(), 110 * UNIT + INITIAL_DEPOSIT);

    // Idempotent until new profit shows up.
    s.vault.assess_performance_fee();
    assert_eq!(s.vault.balance_of(&recipient), fee_shares);
}

#[test]
fn no_fee_below_the_high_water_mark() {
    let env = Env::default();
    let s = setup(&env, 10);
    let recipient = Address::generate(&env);
    s.vault.set_protocol_fee(&1_000);
    s.vault.set_fee_recipient(&recipient);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    s.vault.assess_performance_fee();
    assert_eq!(s.vault.balance_of(&recipient), 0);
    assert_eq!(s.vault.high_water_mark(), 100 * UNIT + INITIAL_DEPOSIT);
}

#[test]
fn deposits_tax_pending_profit_before_diluting_it() {
    let env = Env::default();
    let s = setup(&env, 10);
    let recipient = Address::generate(&env);
    s.vault.set_protocol_fee(&1_000);
    s.vault.set_fee_recipient(&recipient);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    simulate_yield(&s, 10 * UNIT);
    let expected_shares = s.vault.convert_to_shares(&UNIT);

    // The second deposit triggers the assessment at the pre-deposit rate.
    s.vault.deposit(&s.user, &s.user, &(50 * UNIT));
    assert_eq!(s.vault.balance_of(&recipient), expected_shares);
    assert_eq!(s.vault.high_water_mark(), 160 * UNIT + INITIAL_DEPOSIT);
}

#[test]
fn high_water_mark_drops_by_the_withdrawn_amount() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    assert_eq!(s.vault.high_water_mark(), 100 * UNIT + INITIAL_DEPOSIT);

    // The mark drops by the literal amount withdrawn, not pro rata.
    s.vault.withdraw(&s.user, &s.user, &s.user, &(40 * UNIT));
    assert_eq!(s.vault.high_water_mark(), 60 * UNIT + INITIAL_DEPOSIT);
}

// ============================================================================
// EMERGENCY MODE
// ============================================================================

#[test]
fn emergency_blocks_entries_and_preserves_exits() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));

    s.vault.set_emergency_mode(&true);
    assert!(s.vault.emergency_mode());
    assert!(s.strategy.emergency_mode());
    // The position is gone; everything idles at the strategy.
    let risk = s.borrower.position();
    assert_eq!(risk.collateral, 0);
    assert_eq!(risk.debt, 0);

    assert!(s.vault.try_deposit(&s.user, &s.user, &(10 * UNIT)).is_err());
    assert!(s.vault.try_mint(&s.user, &s.user, &(10 * UNIT)).is_err());
    assert_eq!(s.vault.max_deposit(&s.user), 0);

    let shares = s.vault.withdraw(&s.user, &s.user, &s.user, &(50 * UNIT));
    assert_eq!(shares, 50 * UNIT);
    assert_eq!(s.token.balance(&s.user), 950 * UNIT);
}

#[test]
fn leaving_emergency_reinvests_and_reopens() {
    let env = Env::default();
    let s = setup(&env, 10);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    s.vault.set_emergency_mode(&true);

    s.vault.set_emergency_mode(&false);
    assert!(!s.vault.emergency_mode());
    assert!(!s.strategy.emergency_mode());
    let risk = s.borrower.position();
    assert_eq!(risk.collateral, 1_000 * UNIT);
    assert_eq!(risk.debt, 900 * UNIT);

    let shares = s.vault.deposit(&s.user, &s.user, &(10 * UNIT));
    assert_eq!(shares, 10 * UNIT);
}

#[test]
fn health_breach_escalates_to_a_vault_wide_emergency() {
    let env = Env::default();
    let s = setup(&env, 3);
    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    let risk = s.borrower.position();
    assert_eq!(risk.collateral, 300 * UNIT);
    assert_eq!(risk.debt, 200 * UNIT);

    // Accrued interest drags the health factor under the minimum:
    // 300 * 0.95 / 280 ≈ 1.018 < 1.03.
    s.pool.accrue_debt(&s.borrower.address, &(80 * UNIT));
    assert!(!s.strategy.check_health());

    assert!(s.vault.emergency_mode());
    assert!(s.strategy.emergency_mode());
    let risk = s.borrower.position();
    assert_eq!(risk.collateral, 0);
    assert_eq!(risk.debt, 0);

    // Holders exit at the post-unwind rate: ~20 units of equity remain.
    assert_eq!(s.vault.total_assets(), 20 * UNIT + INITIAL_DEPOSIT);
    let assets = s.vault.redeem(&s.user, &s.user, &s.user, &(100 * UNIT));
    assert!((assets - 20 * UNIT).abs() <= 1_000);
}

#[test]
fn activate_emergency_mode_requires_an_attached_strategy() {
    let env = Env::default();
    env.mock_all_auths();
    env.budget().reset_unlimited();

    let issuer = Address::generate(&env);
    let token_id = env.register_stellar_asset_contract(issuer);
    let token_admin = token::StellarAssetClient::new(&env, &token_id);
    let admin = Address::generate(&env);
    let owner = Address::generate(&env);
    let vault = PooledVaultClient::new(&env, &env.register_contract(None, PooledVault));
    token_admin.mint(&admin, &INITIAL_DEPOSIT);
    vault.initialize(&admin, &owner, &token_id, &admin);

    assert!(vault.try_activate_emergency_mode().is_err());
}

// ============================================================================
// CONSERVATION
// ============================================================================

#[test]
fn value_is_conserved_across_a_busy_sequence() {
    let env = Env::default();
    let s = setup(&env, 10);
    let second = Address::generate(&env);
    s.token_admin.mint(&second, &(500 * UNIT));
    s.vault.add_to_whitelist(&second);

    s.vault.deposit(&s.user, &s.user, &(100 * UNIT));
    s.vault.deposit(&second, &second, &(200 * UNIT));
    simulate_yield(&s, 30 * UNIT);
    s.vault.withdraw(&s.user, &s.user, &s.user, &(50 * UNIT));
    s.vault.deposit(&s.user, &s.user, &(25 * UNIT));

    // Every share is backed; redeeming the full supply cannot exceed the
    // assets under management.
    let user_value = s.vault.convert_to_assets(&s.vault.balance_of(&s.user));
    let second_value = s.vault.convert_to_assets(&s.vault.balance_of(&second));
    let dead_value = s.vault.convert_to_assets(&INITIAL_DEPOSIT);
    let total = s.vault.total_assets();
    assert!(user_value + second_value + dead_value <= total);
    assert!(total - (user_value + second_value + dead_value) <= 3);
}
