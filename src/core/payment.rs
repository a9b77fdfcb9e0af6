use crate::domain::model::PaymentStatus;
use rust_decimal::Decimal;

/// Classifies how much of the total has been collected through the deposit.
pub fn derive_payment_status(total: Decimal, deposit: Decimal) -> PaymentStatus {
    if deposit <= Decimal::ZERO {
        PaymentStatus::NotPaid
    } else if deposit >= total && total > Decimal::ZERO {
        PaymentStatus::FullyPaid
    } else {
        PaymentStatus::PartiallyPaid
    }
}

/// Outstanding amount, never below zero.
pub fn balance_due(total: Decimal, deposit: Decimal) -> Decimal {
    (total - deposit).max(Decimal::ZERO)
}
