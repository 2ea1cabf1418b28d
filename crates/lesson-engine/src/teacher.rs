//! The slice of a teacher's profile the scheduling core reads.

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::ValidationError;
use crate::pricing::Money;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherProfile {
    pub teacher_id: String,
    /// Zone the teacher's availability rules are written in.
    pub timezone: Tz,
    /// Minimum gap kept free before and after every lesson.
    #[serde(default)]
    pub buffer_minutes: u32,
    pub hourly_rate: Money,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl TeacherProfile {
    pub fn validate(&self, config: &EngineConfig) -> Result<(), ValidationError> {
        if self.buffer_minutes > config.max_buffer_minutes {
            return Err(ValidationError::BufferOutOfRange(self.buffer_minutes));
        }
        if self.hourly_rate < config.min_hourly_rate || self.hourly_rate > config.max_hourly_rate {
            return Err(ValidationError::HourlyRateOutOfRange(self.hourly_rate.minor()));
        }
        Ok(())
    }
}
