//! Engine configuration.
//!
//! Every field has a product default, so a JSON config only needs the keys it changes:
//!
//! ```rust
//! use lesson_engine::EngineConfig;
//!
//! let config = EngineConfig::from_json_str(r#"{"min_advance_hours": 4}"#).unwrap();
//! assert_eq!(config.min_advance_hours, 4);
//! assert_eq!(config.max_advance_days, 90);
//! ```

use serde::{Deserialize, Serialize};

use crate::availability::ContainmentPolicy;
use crate::booking::PaymentMode;
use crate::error::ValidationError;
use crate::notification::ReminderKind;
use crate::pricing::{CurrencyConfig, Money, PricingPolicy, RefundPolicy};

/// Which lesson lengths may be booked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DurationRule {
    /// Exactly these lengths, in minutes.
    Set(Vec<u32>),
    /// Any length within `min..=max` minutes.
    Range { min: u32, max: u32 },
}

impl DurationRule {
    pub fn allows(&self, minutes: i64) -> bool {
        match self {
            DurationRule::Set(allowed) => allowed.iter().any(|&m| i64::from(m) == minutes),
            DurationRule::Range { min, max } => {
                minutes >= i64::from(*min) && minutes <= i64::from(*max)
            }
        }
    }
}

impl Default for DurationRule {
    fn default() -> Self {
        DurationRule::Set(vec![20, 45, 60, 90])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub durations: DurationRule,
    /// A lesson must start at least this many hours after "now".
    pub min_advance_hours: u32,
    /// A lesson must start at most this many days after "now".
    pub max_advance_days: u32,
    pub payment_mode: PaymentMode,
    pub availability_check: ContainmentPolicy,
    /// Reminder kinds scheduled on confirmation, in addition to the confirmation itself.
    pub reminders: Vec<ReminderKind>,
    pub currency: CurrencyConfig,
    pub pricing: PricingPolicy,
    pub refunds: RefundPolicy,
    /// Per teacher, counted on the teacher's local calendar date.
    pub max_lessons_per_day: u32,
    pub max_active_bookings_per_student: u32,
    pub max_buffer_minutes: u32,
    pub min_hourly_rate: Money,
    pub max_hourly_rate: Money,
    pub min_reason_chars: usize,
    pub max_notes_chars: usize,
    /// Granularity of bookable-slot listings.
    pub slot_step_minutes: u32,
    /// Host for generated fallback meeting rooms.
    pub meeting_domain: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            durations: DurationRule::default(),
            min_advance_hours: 2,
            max_advance_days: 90,
            payment_mode: PaymentMode::default(),
            availability_check: ContainmentPolicy::default(),
            reminders: vec![ReminderKind::Reminder24h, ReminderKind::Reminder1h],
            currency: CurrencyConfig::default(),
            pricing: PricingPolicy::default(),
            refunds: RefundPolicy::default(),
            max_lessons_per_day: 8,
            max_active_bookings_per_student: 10,
            max_buffer_minutes: 60,
            min_hourly_rate: Money::from_minor(500),
            max_hourly_rate: Money::from_minor(50_000),
            min_reason_chars: 10,
            max_notes_chars: 500,
            slot_step_minutes: 15,
            meeting_domain: "meet.flexibook.com".to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a JSON config and validate it.
    pub fn from_json_str(json: &str) -> Result<Self, ValidationError> {
        let config: EngineConfig = serde_json::from_str(json)
            .map_err(|e| ValidationError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        let invalid = |msg: &str| Err(ValidationError::InvalidConfig(msg.to_string()));

        match &self.durations {
            DurationRule::Set(allowed) if allowed.is_empty() || allowed.contains(&0) => {
                return invalid("durations must be non-empty and positive");
            }
            DurationRule::Range { min, max } if *min == 0 || min > max => {
                return invalid("duration range must satisfy 0 < min <= max");
            }
            _ => {}
        }
        if u64::from(self.max_advance_days) * 24 <= u64::from(self.min_advance_hours) {
            return invalid("max_advance_days must exceed min_advance_hours");
        }
        if self.currency.minor_digits > 4 {
            return invalid("currency.minor_digits must be at most 4");
        }
        if self.pricing.commission_bps > 10_000 {
            return invalid("pricing.commission_bps must be at most 10000");
        }
        if self.refunds.tiers.iter().any(|t| t.percent > 100) {
            return invalid("refund percentages must be at most 100");
        }
        if self.slot_step_minutes == 0 {
            return invalid("slot_step_minutes must be positive");
        }
        if self.min_hourly_rate > self.max_hourly_rate {
            return invalid("min_hourly_rate must not exceed max_hourly_rate");
        }
        if self.reminders.contains(&ReminderKind::Confirmed) {
            return invalid("reminders may only list REMINDER_24H and REMINDER_1H");
        }
        Ok(())
    }
}
