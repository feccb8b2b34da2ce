//! Date and time tool.

use async_trait::async_trait;
use chrono::{DateTime, Duration, FixedOffset, Local, NaiveDateTime, Utc};

use super::{str_arg, Arguments, ParamType, Tool, ToolParameter};

const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current time, fixed-offset conversion and date arithmetic.
pub struct DateTimeTool;

#[async_trait]
impl Tool for DateTimeTool {
    fn name(&self) -> &str {
        "datetime"
    }

    fn description(&self) -> &str {
        "Get current date and time, timezone information, and perform date calculations."
    }

    fn parameters(&self) -> Vec<ToolParameter> {
        vec![
            ToolParameter::required(
                "action",
                ParamType::String,
                "The action to perform: 'current' (current time), 'timezone' (list timezones), 'convert' (convert timezone), 'add' (add time), 'diff' (time difference)",
            )
            .with_enum(["current", "timezone", "convert", "add", "diff"]),
            ToolParameter::optional(
                "timezone",
                ParamType::String,
                "Timezone: 'UTC', 'local', or a UTC offset such as '+05:30' or 'UTC-08:00'",
            ),
            ToolParameter::optional(
                "amount",
                ParamType::String,
                "Amount to add/subtract (e.g., '1 day', '2 hours', '-30 minutes')",
            ),
            ToolParameter::optional(
                "date1",
                ParamType::String,
                "First date for comparison (format: YYYY-MM-DD HH:MM:SS)",
            ),
            ToolParameter::optional(
                "date2",
                ParamType::String,
                "Second date for comparison (format: YYYY-MM-DD HH:MM:SS)",
            ),
        ]
    }

    async fn execute(&self, args: &Arguments) -> anyhow::Result<String> {
        let action = str_arg(args, "action").unwrap_or_default();
        let timezone = str_arg(args, "timezone");

        let output = match action.as_str() {
            "current" => match timezone {
                Some(tz) => time_in(&tz, Utc::now()),
                None => {
                    let utc = Utc::now();
                    format!(
                        "Current time:\nUTC: {} UTC\nLocal: {}",
                        utc.format(DATE_FORMAT),
                        utc.with_timezone(&Local).format(DATE_FORMAT)
                    )
                }
            },
            "timezone" => "Supported timezones: UTC, local, or a fixed UTC offset. \
                 Common offsets: UTC-08:00 (Los Angeles, standard), UTC-05:00 (New York, standard), \
                 UTC+00:00 (London, standard), UTC+01:00 (Paris, standard), UTC+04:00 (Dubai), \
                 UTC+08:00 (Shanghai), UTC+09:00 (Tokyo), UTC+10:00 (Sydney, standard)"
                .to_string(),
            "convert" => match timezone {
                Some(tz) => time_in(&tz, Utc::now()),
                None => "Error: timezone parameter required for convert action".to_string(),
            },
            "add" => match str_arg(args, "amount") {
                Some(amount) => {
                    let now = Local::now().naive_local();
                    match add_amount(now, &amount) {
                        Ok(later) => format!(
                            "Current time: {}\nAfter adding {}: {}",
                            now.format(DATE_FORMAT),
                            amount,
                            later.format(DATE_FORMAT)
                        ),
                        Err(e) => format!("Error: {}", e),
                    }
                }
                None => "Error: amount parameter required for add action".to_string(),
            },
            "diff" => match (str_arg(args, "date1"), str_arg(args, "date2")) {
                (Some(a), Some(b)) => {
                    difference(&a, &b).unwrap_or_else(|e| format!("Error: {}", e))
                }
                _ => "Error: date1 and date2 parameters required for diff action".to_string(),
            },
            other => format!("Error: unknown action '{}'", other),
        };

        Ok(output)
    }
}

fn time_in(tz: &str, now: DateTime<Utc>) -> String {
    if tz.trim().eq_ignore_ascii_case("local") {
        return format!(
            "Current time in local timezone: {}",
            now.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S %:z")
        );
    }
    match parse_offset(tz) {
        Some(offset) => format!(
            "Current time in {}: {}",
            tz.trim(),
            now.with_timezone(&offset).format("%Y-%m-%d %H:%M:%S %:z")
        ),
        None => format!(
            "Error: unknown timezone '{}'. Use 'UTC', 'local', or an offset such as '+05:30'",
            tz
        ),
    }
}

/// Parse `UTC`, `Z`, `+05:30`, `-0800`, `UTC+2`, `GMT-03:00`.
fn parse_offset(tz: &str) -> Option<FixedOffset> {
    let upper = tz.trim().to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);
    if rest.is_empty() || rest == "Z" {
        return FixedOffset::east_opt(0);
    }

    let (sign, digits) = match rest.as_bytes()[0] {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };
    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (offset_component(h)?, offset_component(m)?),
        None if digits.len() == 4 && digits.is_ascii() => {
            (offset_component(&digits[..2])?, offset_component(&digits[2..])?)
        }
        None => (offset_component(digits)?, 0),
    };
    if hours > 14 || minutes > 59 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// Unsigned decimal component of an offset; signs are rejected.
fn offset_component(text: &str) -> Option<i32> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

fn add_amount(base: NaiveDateTime, amount: &str) -> Result<NaiveDateTime, String> {
    let parts: Vec<&str> = amount.split_whitespace().collect();
    let [number, unit] = parts.as_slice() else {
        return Err("amount should be in format 'number unit' (e.g., '1 day')".to_string());
    };
    let number: i64 = number
        .parse()
        .map_err(|_| format!("invalid number '{}'", number))?;

    let delta = match unit.to_lowercase().as_str() {
        "week" | "weeks" => Duration::try_weeks(number),
        "day" | "days" => Duration::try_days(number),
        "hour" | "hours" => Duration::try_hours(number),
        "minute" | "minutes" => Duration::try_minutes(number),
        "second" | "seconds" => Duration::try_seconds(number),
        other => return Err(format!("unsupported time unit '{}'", other)),
    }
    .ok_or_else(|| "amount is out of range".to_string())?;

    base.checked_add_signed(delta)
        .ok_or_else(|| "resulting date is out of range".to_string())
}

fn difference(date1: &str, date2: &str) -> Result<String, String> {
    let parse = |s: &str| {
        NaiveDateTime::parse_from_str(s.trim(), DATE_FORMAT)
            .map_err(|_| "dates should be in format YYYY-MM-DD HH:MM:SS".to_string())
    };
    let first = parse(date1)?;
    let second = parse(date2)?;

    let total = (second - first).num_seconds().abs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    Ok(format!(
        "Time difference between {} and {}:\n{} days, {} hours, {} minutes, {} seconds",
        date1, date2, days, hours, minutes, seconds
    ))
}
