use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum StrategyError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    /// Leverage or health-factor parameters outside the allowed range.
    InvalidConfiguration = 3,
    InEmergency = 4,
    InvalidAmount = 5,
    InsufficientBalance = 6,
    MathOverflow = 7,
}
