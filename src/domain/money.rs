use {
    super::error::GatewayError,
    serde::{Deserialize, Serialize},
    std::fmt,
    std::ops::{Add, Sub},
};

/// Non-negative amount in piastres (1/100 EGP).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct MoneyAmount(i64);

impl MoneyAmount {
    pub fn new(piastres: i64) -> Result<Self, GatewayError> {
        if piastres < 0 {
            return Err(GatewayError::MalformedRequest(format!(
                "MoneyAmount cannot be negative, got: {piastres}"
            )));
        }
        Ok(Self(piastres))
    }

    pub fn piastres(&self) -> i64 {
        self.0
    }

    /// Wire amounts are fractional pounds (`100.00`); the domain keeps
    /// integer piastres. Used only at the adapter edge.
    pub fn from_major_units(amount: f64) -> Result<Self, GatewayError> {
        if !amount.is_finite() || amount < 0.0 {
            return Err(GatewayError::MalformedRequest(format!(
                "amount not representable: {amount}"
            )));
        }
        Self::new((amount * 100.0).round() as i64)
    }

    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn checked_add(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0.checked_add(other.0).map(MoneyAmount)
    }

    pub fn checked_sub(self, other: MoneyAmount) -> Option<MoneyAmount> {
        self.0
            .checked_sub(other.0)
            .filter(|&v| v >= 0)
            .map(MoneyAmount)
    }
}

impl Add for MoneyAmount {
    type Output = MoneyAmount;

    fn add(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_add(rhs).expect("MoneyAmount overflow")
    }
}

impl Sub for MoneyAmount {
    type Output = MoneyAmount;

    fn sub(self, rhs: MoneyAmount) -> MoneyAmount {
        self.checked_sub(rhs).expect("MoneyAmount underflow")
    }
}

impl fmt::Display for MoneyAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The processor settles in EGP only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Egp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Egp => "EGP",
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for Currency {
    type Error = GatewayError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s {
            "EGP" => Ok(Self::Egp),
            other => Err(GatewayError::MalformedRequest(format!(
                "unsupported currency: {other}"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    amount: MoneyAmount,
    currency: Currency,
}

impl Money {
    pub fn new(amount: MoneyAmount, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn egp(amount: MoneyAmount) -> Self {
        Self::new(amount, Currency::Egp)
    }

    pub fn amount(&self) -> MoneyAmount {
        self.amount
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }
}
