//! Non-negative rupee amounts using decimal arithmetic.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The amount is below zero.
    #[error("price must be positive")]
    Negative,
    /// The amount does not fit `NUMERIC(12,2)`.
    #[error("price must not exceed 9999999999.99")]
    TooLarge,
    /// The amount has fractions of a paisa.
    #[error("price can have at most two decimal places")]
    TooPrecise,
}

/// A price in Indian rupees.
///
/// Serialized as a decimal string (`"1500.00"`); deserialization accepts
/// either a JSON number or a string. Every price fits the `NUMERIC(12,2)`
/// columns it is stored in: non-negative, at most [`Price::MAX`], and no
/// more than two decimal places.
///
/// ## Examples
///
/// ```
/// use rust_decimal::Decimal;
/// use zaffira_core::Price;
///
/// let price = Price::new(Decimal::new(12_500_000, 2)).unwrap();
/// assert_eq!(price.to_string(), "₹1,25,000.00");
/// assert!(Price::new(Decimal::NEGATIVE_ONE).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price(Decimal);

impl Price {
    /// Zero rupees.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// The largest storable amount, `9999999999.99`.
    pub const MAX: Self = Self(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Currency symbol used for display.
    pub const SYMBOL: &'static str = "₹";

    /// Create a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] if `amount` is below zero,
    /// [`PriceError::TooLarge`] above [`Price::MAX`] and
    /// [`PriceError::TooPrecise`] with more than two significant decimals.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        if amount > Self::MAX.0 {
            return Err(PriceError::TooLarge);
        }
        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }
        Ok(Self(amount))
    }

    /// Create a price from a whole number of rupees.
    #[must_use]
    pub fn from_rupees(rupees: u32) -> Self {
        Self(Decimal::from(rupees))
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }

    /// `self × quantity`, or `None` past [`Price::MAX`].
    #[must_use]
    pub fn checked_times(self, quantity: u32) -> Option<Self> {
        self.0
            .checked_mul(Decimal::from(quantity))
            .and_then(|amount| Self::new(amount).ok())
    }

    /// `self + other`, or `None` past [`Price::MAX`].
    #[must_use]
    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0
            .checked_add(other.0)
            .and_then(|amount| Self::new(amount).ok())
    }

    /// Sum of `prices`, or `None` if the total passes [`Price::MAX`].
    #[must_use]
    pub fn checked_sum(prices: impl IntoIterator<Item = Self>) -> Option<Self> {
        prices
            .into_iter()
            .try_fold(Self::ZERO, Self::checked_add)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// Formats with the rupee symbol, two decimals and Indian digit grouping
/// (last three digits, then pairs).
impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rounded = self.0.round_dp(2);
        let text = format!("{rounded:.2}");
        let (whole, frac) = text.split_once('.').unwrap_or((text.as_str(), "00"));

        let digits: Vec<char> = whole.chars().collect();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 2);
        let len = digits.len();
        for (i, ch) in digits.iter().enumerate() {
            let remaining = len - i;
            if i > 0 && remaining >= 3 && remaining % 2 == 1 {
                grouped.push(',');
            }
            grouped.push(*ch);
        }

        write!(f, "{}{grouped}.{frac}", Self::SYMBOL)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Type<sqlx::Postgres> for Price {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <Decimal as sqlx::Type<sqlx::Postgres>>::type_info()
    }

    fn compatible(ty: &sqlx::postgres::PgTypeInfo) -> bool {
        <Decimal as sqlx::Type<sqlx::Postgres>>::compatible(ty)
    }
}

#[cfg(feature = "postgres")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for Price {
    fn decode(value: sqlx::postgres::PgValueRef<'r>) -> Result<Self, sqlx::error::BoxDynError> {
        let amount = <Decimal as sqlx::Decode<sqlx::Postgres>>::decode(value)?;
        Ok(Self::new(amount)?)
    }
}

#[cfg(feature = "postgres")]
impl sqlx::Encode<'_, sqlx::Postgres> for Price {
    fn encode_by_ref(
        &self,
        buf: &mut sqlx::postgres::PgArgumentBuffer,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <Decimal as sqlx::Encode<sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}
