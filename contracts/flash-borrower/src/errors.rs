use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum BorrowerError {
    AlreadyInitialized = 1,
    NotInitialized = 2,
    /// A callback arrived while another flash round trip was in flight.
    RequestPending = 3,
    /// The callback's request does not match this borrower's configuration,
    /// or the promised funds never arrived.
    UnexpectedRequest = 4,
    /// The balance after executing the action cannot cover exact repayment.
    FlashLoanSettlementMismatch = 5,
    /// The market executed a different borrow than the flash principal.
    BorrowedAmountMismatch = 6,
    InvalidAmount = 7,
}
