use alloy_primitives::U256;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    #[error("amount {0} must be positive")]
    NotPositive(Decimal),
    #[error("amount {amount} has more than {decimals} decimal places")]
    TooPrecise { amount: Decimal, decimals: u32 },
    #[error("amount {0} is out of range")]
    Overflow(Decimal),
}

/// Scale a decimal token amount to base units: `9.99` at 6 decimals is
/// `9_990_000`.
///
/// Amounts that would need rounding are rejected.
pub fn to_token_units(amount: Decimal, decimals: u32) -> Result<U256, AmountError> {
    if amount.is_sign_negative() || amount.is_zero() {
        return Err(AmountError::NotPositive(amount));
    }
    let normalized = amount.normalize();
    let scale = normalized.scale();
    if scale > decimals {
        return Err(AmountError::TooPrecise { amount, decimals });
    }
    let mantissa =
        u128::try_from(normalized.mantissa()).map_err(|_| AmountError::Overflow(amount))?;
    let factor = U256::from(10u64)
        .checked_pow(U256::from(decimals - scale))
        .ok_or(AmountError::Overflow(amount))?;
    U256::from(mantissa)
        .checked_mul(factor)
        .ok_or(AmountError::Overflow(amount))
}
