use soroban_sdk::contracterror;

/// Failure kinds surfaced by the vault. Every failure aborts and rolls back
/// the whole triggering operation; callers can distinguish bad parameters
/// (`InvalidConfiguration`, `InvalidAmount`) from the protective state
/// (`InEmergency`) from authorization problems (`AccessDenied`,
/// `NotWhitelisted`).
#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum VaultError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    AccessDenied = 3,
    NotWhitelisted = 4,
    InvalidConfiguration = 5,
    InEmergency = 6,
    /// The strategy minted fewer (deposit) or burned more (withdraw) of its
    /// shares than the pre-call preview allowed.
    StrategyShareMismatch = 7,
    Reentrancy = 8,
    InsufficientBalance = 9,
    InsufficientAllowance = 10,
    InvalidAmount = 11,
    MathOverflow = 12,
}
