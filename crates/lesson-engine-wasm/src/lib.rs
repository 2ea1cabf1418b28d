//! WASM bindings for lesson-engine.
//!
//! Exposes bookability checks, slot listings, quotes and reminder previews to
//! JavaScript via `wasm-bindgen`. Requests and responses cross the boundary as JSON
//! strings shaped like the records in `lesson_engine::api`, so a booking form can run
//! the same checks the server runs before submitting.
//!
//! Every export takes an optional engine config as JSON; `null`/`undefined` selects the
//! product defaults.
//!
//! ## Build process
//!
//! ```sh
//! cargo build -p lesson-engine-wasm --target wasm32-unknown-unknown --release
//! wasm-bindgen --target web --out-dir packages/lesson-engine-js/wasm/ \
//!   target/wasm32-unknown-unknown/release/lesson_engine_wasm.wasm
//! ```

use chrono::{DateTime, NaiveDateTime, Utc};
use lesson_engine::api::{self, CheckRequest, QuoteRequest, ReminderPreviewRequest, SlotsRequest};
use lesson_engine::{AvailabilityIndex, EngineConfig, Money, TeacherProfile, WeeklyAvailabilityRule};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use wasm_bindgen::prelude::*;

// ---------------------------------------------------------------------------
// JSON plumbing
// ---------------------------------------------------------------------------

/// Input for `isAvailable`: a teacher and their rules, without bookings.
#[derive(Deserialize)]
struct AvailabilityInput {
    teacher: TeacherProfile,
    #[serde(default)]
    rules: Vec<WeeklyAvailabilityRule>,
}

fn config_from(json: Option<&str>) -> Result<EngineConfig, String> {
    match json {
        Some(json) if !json.trim().is_empty() => {
            EngineConfig::from_json_str(json).map_err(|e| e.to_string())
        }
        _ => Ok(EngineConfig::default()),
    }
}

fn parse_json<T: DeserializeOwned>(json: &str, what: &str) -> Result<T, String> {
    serde_json::from_str(json).map_err(|e| format!("Invalid {} JSON: {}", what, e))
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| format!("Serialization error: {}", e))
}

/// Parse an ISO 8601 datetime string into `DateTime<Utc>`.
///
/// Accepts RFC 3339 (with offset) and naive datetimes, which are read as UTC.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
        .map(|ndt| ndt.and_utc())
        .map_err(|e| format!("Invalid datetime '{}': {}", s, e))
}

fn check_booking_json(request: &str, config: Option<&str>) -> Result<String, String> {
    let config = config_from(config)?;
    let request: CheckRequest = parse_json(request, "check request")?;
    let response = api::check(&config, &request).map_err(|e| e.to_string())?;
    to_json(&response)
}

fn list_slots_json(request: &str, config: Option<&str>) -> Result<String, String> {
    let config = config_from(config)?;
    let request: SlotsRequest = parse_json(request, "slots request")?;
    let response = api::slots(&config, &request).map_err(|e| e.to_string())?;
    to_json(&response)
}

fn preview_reminders_json(request: &str, config: Option<&str>) -> Result<String, String> {
    let config = config_from(config)?;
    let request: ReminderPreviewRequest = parse_json(request, "reminder preview request")?;
    let preview = api::preview_reminders(&config, &request).map_err(|e| e.to_string())?;
    to_json(&preview)
}

fn quote_lesson_json(
    hourly_rate_minor: i64,
    duration_minutes: i64,
    config: Option<&str>,
) -> Result<String, String> {
    let config = config_from(config)?;
    let request = QuoteRequest {
        hourly_rate: Money::from_minor(hourly_rate_minor),
        duration_minutes,
    };
    let quote = api::quote_lesson(&config, &request).map_err(|e| e.to_string())?;
    to_json(&quote)
}

fn is_available_inner(schedule: &str, instant: &str) -> Result<bool, String> {
    let input: AvailabilityInput = parse_json(schedule, "schedule")?;
    let instant = parse_datetime(instant)?;
    let teacher_id = input.teacher.teacher_id.clone();
    let index = AvailabilityIndex::with_schedule(&teacher_id, input.teacher.timezone, input.rules)
        .map_err(|e| e.to_string())?;
    Ok(index.is_available(&teacher_id, instant))
}

// ---------------------------------------------------------------------------
// WASM exports
// ---------------------------------------------------------------------------

/// Check whether a candidate lesson can be booked.
///
/// `request_json` is a `CheckRequest`: `{schedule, start, duration_minutes,
/// exclude_booking_id?}`. Returns a `CheckResponse` JSON string with `ok`, and either
/// `approval` or `reason`/`message`/`conflicts`.
#[wasm_bindgen(js_name = "checkBooking")]
pub fn check_booking(request_json: &str, config_json: Option<String>) -> Result<String, JsValue> {
    check_booking_json(request_json, config_json.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// List bookable starts on one teacher-local date.
///
/// `request_json` is a `SlotsRequest`: `{schedule, date: "YYYY-MM-DD",
/// duration_minutes}`.
#[wasm_bindgen(js_name = "listSlots")]
pub fn list_slots(request_json: &str, config_json: Option<String>) -> Result<String, JsValue> {
    list_slots_json(request_json, config_json.as_deref()).map_err(|e| JsValue::from_str(&e))
}

/// Preview the notifications a confirmation would schedule.
#[wasm_bindgen(js_name = "previewReminders")]
pub fn preview_reminders(
    request_json: &str,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    preview_reminders_json(request_json, config_json.as_deref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Price a lesson. `hourly_rate_minor` is in the currency's minor unit (cents).
#[wasm_bindgen(js_name = "quoteLesson")]
pub fn quote_lesson(
    hourly_rate_minor: i64,
    duration_minutes: i64,
    config_json: Option<String>,
) -> Result<String, JsValue> {
    quote_lesson_json(hourly_rate_minor, duration_minutes, config_json.as_deref())
        .map_err(|e| JsValue::from_str(&e))
}

/// Whether the teacher's rules open them at `instant` (ISO 8601).
///
/// `schedule_json` is `{teacher, rules}`; bookings are not considered.
#[wasm_bindgen(js_name = "isAvailable")]
pub fn is_available(schedule_json: &str, instant: &str) -> Result<bool, JsValue> {
    is_available_inner(schedule_json, instant).map_err(|e| JsValue::from_str(&e))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCHEDULE: &str = r#"{
        "teacher": {"teacher_id": "t1", "timezone": "UTC", "buffer_minutes": 10, "hourly_rate": 6000},
        "rules": [{"id": "mon", "teacher_id": "t1", "day_of_week": 1,
                   "start_time": "09:00", "end_time": "17:00"}],
        "bookings": [{"id": "b1", "student_id": "s1", "teacher_id": "t1",
                      "interval": {"start": "2026-03-16T10:00:00Z", "end": "2026-03-16T11:00:00Z"},
                      "duration_minutes": 60, "status": "CONFIRMED"}],
        "now": "2026-03-10T00:00:00Z"
    }"#;

    fn check_request(start: &str) -> String {
        format!(
            r#"{{"schedule": {}, "start": "{}", "duration_minutes": 45}}"#,
            SCHEDULE, start
        )
    }

    #[test]
    fn check_booking_reports_buffer_conflict() {
        let out = check_booking_json(&check_request("2026-03-16T11:05:00Z"), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["ok"], false);
        assert_eq!(value["reason"], "SLOT_UNAVAILABLE");
        assert_eq!(value["conflicts"][0]["booking_id"], "b1");
    }

    #[test]
    fn check_booking_approves_clear_slot() {
        let out = check_booking_json(&check_request("2026-03-16T11:10:00Z"), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["ok"], true);
        assert_eq!(value["approval"]["amount"], 4500);
    }

    #[test]
    fn config_overrides_are_applied() {
        let config = r#"{"durations": {"range": {"min": 15, "max": 120}}}"#;
        let request = format!(
            r#"{{"schedule": {}, "start": "2026-03-16T13:00:00Z", "duration_minutes": 30}}"#,
            SCHEDULE
        );
        let default_out = check_booking_json(&request, None).unwrap();
        assert!(default_out.contains("DURATION_NOT_ALLOWED"));
        let ranged_out = check_booking_json(&request, Some(config)).unwrap();
        assert!(ranged_out.contains(r#""ok":true"#));
    }

    #[test]
    fn invalid_inputs_produce_readable_errors() {
        let err = check_booking_json("not json", None).unwrap_err();
        assert!(err.starts_with("Invalid check request JSON"));

        let bad_config = r#"{"min_advance_hours": "x"}"#;
        let err = check_booking_json(&check_request("2026-03-16T11:10:00Z"), Some(bad_config))
            .unwrap_err();
        assert!(err.starts_with("Invalid configuration"));
    }

    #[test]
    fn list_slots_returns_local_starts() {
        let request = format!(
            r#"{{"schedule": {}, "date": "2026-03-16", "duration_minutes": 60}}"#,
            SCHEDULE
        );
        let out = list_slots_json(&request, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["slots"][0]["local_start"], "11:15");
        assert_eq!(value["timezone"], "UTC");
    }

    #[test]
    fn preview_reminders_lists_kinds() {
        let request = r#"{
            "booking": {"id": "b1", "student_id": "s1", "teacher_id": "t1",
                        "interval": {"start": "2026-03-16T10:00:00Z", "end": "2026-03-16T11:00:00Z"},
                        "duration_minutes": 60, "status": "CONFIRMED"},
            "confirmed_at": "2026-03-16T09:30:00Z"
        }"#;
        let out = preview_reminders_json(request, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["kind"], "CONFIRMED");
    }

    #[test]
    fn quote_lesson_breaks_down_commission() {
        let out = quote_lesson_json(6000, 45, None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["student_pays"], 4500);
        assert_eq!(value["platform_fee"], 675);
        assert_eq!(value["teacher_earns"], 3825);
        assert!(quote_lesson_json(6000, 0, None).is_err());
    }

    #[test]
    fn is_available_accepts_naive_and_offset_datetimes() {
        assert!(is_available_inner(SCHEDULE, "2026-03-16T09:30:00").unwrap());
        assert!(is_available_inner(SCHEDULE, "2026-03-16T11:30:00+02:00").unwrap());
        assert!(!is_available_inner(SCHEDULE, "2026-03-16T17:00:00Z").unwrap());
        assert!(is_available_inner(SCHEDULE, "yesterday").is_err());
    }
}
