//! Lesson pricing, platform commission and cancellation refunds.
//!
//! Amounts are integers in the currency's minor unit (cents for USD), so a
//! $60.00/hour rate for 45 minutes is exactly 4500.

use std::fmt;

use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::booking::Role;

/// An amount in the configured currency's minor unit.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_minor(minor: i64) -> Self {
        Money(minor)
    }

    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Render with a decimal point and currency code, e.g. `45.00 USD`.
    pub fn format(&self, currency: &CurrencyConfig) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        if currency.minor_digits == 0 {
            return format!("{}{} {}", sign, abs, currency.code);
        }
        let divisor = 10u64.pow(currency.minor_digits);
        format!(
            "{}{}.{:0width$} {}",
            sign,
            abs / divisor,
            abs % divisor,
            currency.code,
            width = currency.minor_digits as usize
        )
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyConfig {
    pub code: String,
    /// Digits after the decimal point (2 for USD, 0 for JPY).
    pub minor_digits: u32,
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            code: "USD".to_string(),
            minor_digits: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingPolicy {
    /// Platform commission in basis points (1500 = 15%).
    pub commission_bps: u32,
    /// When true the commission is added on top of the student's price; otherwise it
    /// is deducted from the teacher's earnings.
    pub commission_charged_to_student: bool,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            commission_bps: 1500,
            commission_charged_to_student: false,
        }
    }
}

/// Price breakdown for one lesson.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    pub lesson_amount: Money,
    pub platform_fee: Money,
    pub student_pays: Money,
    pub teacher_earns: Money,
}

/// `hourly_rate / 60 * minutes`, rounded half-up to the minor unit.
pub fn lesson_amount(hourly_rate: Money, minutes: i64) -> Money {
    Money(div_round(i128::from(hourly_rate.0) * i128::from(minutes), 60))
}

pub fn quote(hourly_rate: Money, minutes: i64, policy: &PricingPolicy) -> Quote {
    let lesson = lesson_amount(hourly_rate, minutes);
    let fee = Money(div_round(
        i128::from(lesson.0) * i128::from(policy.commission_bps),
        10_000,
    ));
    if policy.commission_charged_to_student {
        Quote {
            lesson_amount: lesson,
            platform_fee: fee,
            student_pays: Money(lesson.0.saturating_add(fee.0)),
            teacher_earns: lesson,
        }
    } else {
        Quote {
            lesson_amount: lesson,
            platform_fee: fee,
            student_pays: lesson,
            teacher_earns: Money(lesson.0.saturating_sub(fee.0)),
        }
    }
}

/// One step of the cancellation schedule: cancelling strictly more than
/// `more_than_hours` before the lesson refunds `percent` of the amount paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefundTier {
    pub more_than_hours: u32,
    pub percent: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefundPolicy {
    /// Evaluated in order; the first tier whose threshold is exceeded wins.
    pub tiers: Vec<RefundTier>,
}

impl Default for RefundPolicy {
    fn default() -> Self {
        Self {
            tiers: vec![
                RefundTier {
                    more_than_hours: 24,
                    percent: 100,
                },
                RefundTier {
                    more_than_hours: 12,
                    percent: 50,
                },
            ],
        }
    }
}

impl RefundPolicy {
    /// Percentage refunded when a student cancels `lead` ahead of the lesson start.
    pub fn percent_for(&self, lead: Duration) -> u32 {
        self.tiers
            .iter()
            .find(|tier| lead > Duration::hours(i64::from(tier.more_than_hours)))
            .map(|tier| tier.percent)
            .unwrap_or(0)
    }
}

/// Refund owed when a paid booking is cancelled `lead` ahead of its start.
///
/// Cancellations by the teacher or an admin always refund in full.
pub fn refund_for_cancellation(
    amount: Money,
    lead: Duration,
    initiator: Role,
    policy: &RefundPolicy,
) -> Money {
    let percent = match initiator {
        Role::Teacher | Role::Admin => 100,
        Role::Student => policy.percent_for(lead),
    };
    Money(div_round(i128::from(amount.0) * i128::from(percent), 100))
}

/// Half-up division, widened so products of two `i64`s cannot overflow. Results past
/// the `i64` range saturate.
fn div_round(numerator: i128, denominator: i128) -> i64 {
    let half = denominator / 2;
    let rounded = if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    };
    i64::try_from(rounded).unwrap_or(if rounded < 0 { i64::MIN } else { i64::MAX })
}
