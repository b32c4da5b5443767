use soroban_sdk::{contracttype, symbol_short, Env};

use protocol_interfaces::FlashAction;

/// One completed flash round trip: funds received from the venue, the
/// action executed against the market, and the venue exactly repaid.
#[contracttype]
#[derive(Clone, Debug, PartialEq)]
pub struct FlashHandledEvent {
    pub action: FlashAction,
    pub amount: i128,
    pub forwarded: i128,
}

pub fn flash_handled(env: &Env, action: FlashAction, amount: i128, forwarded: i128) {
    env.events().publish(
        (symbol_short!("flash"),),
        FlashHandledEvent { action, amount, forwarded },
    );
}
