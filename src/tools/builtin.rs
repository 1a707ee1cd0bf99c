//! Built-in tools available without any MCP server.
//!
//! `calculator` and `get_current_time` are registered at startup with
//! [`ToolSource::Builtin`], so MCP teardown never retracts them.

use chrono::{DateTime, FixedOffset, Local, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use serde_json::json;

use crate::error::AgentError;
use crate::tools::arguments::ToolArguments;
use crate::tools::tool::{HostTool, ToolSource};
use crate::tools::types::{ToolDefinition, ToolParameters};

const OPERATIONS: [&str; 4] = ["add", "subtract", "multiply", "divide"];

/// Create the `calculator` tool.
pub fn calculator_tool() -> HostTool {
    HostTool::new(
        ToolDefinition::function(
            "calculator",
            "Performs basic arithmetic calculations (add, subtract, multiply, divide)",
            ToolParameters::object()
                .string_enum("operation", "The operation to perform", &OPERATIONS, true)
                .number("a", "First number", true)
                .number("b", "Second number", true)
                .build(),
        ),
        ToolSource::Builtin,
        |args: ToolArguments| async move { calculate(&args) },
    )
}

fn calculate(args: &ToolArguments) -> Result<serde_json::Value, AgentError> {
    let fail = |message: String| AgentError::tool("calculator", message);

    let operation = args
        .get_str_opt("operation")
        .filter(|op| !op.is_empty())
        .ok_or_else(|| fail("Operation parameter is required and must be a string".into()))?;
    let (Some(a), Some(b)) = (args.get_f64_opt("a"), args.get_f64_opt("b")) else {
        return Err(fail("Both a and b must be numbers".into()));
    };

    let result = match operation {
        "add" => a + b,
        "subtract" => a - b,
        "multiply" => a * b,
        "divide" if b == 0.0 => return Err(fail("Cannot divide by zero".into())),
        "divide" => a / b,
        other => {
            return Err(fail(format!(
                "Invalid operation: {other}. Must be one of: {}",
                OPERATIONS.join(", ")
            )))
        }
    };
    Ok(number_value(result))
}

/// Whole results serialize as integers, so `2 + 3` reads `5` rather than `5.0`.
fn number_value(value: f64) -> serde_json::Value {
    const MAX_EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() <= MAX_EXACT {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Create the `get_current_time` tool.
pub fn current_time_tool() -> HostTool {
    HostTool::new(
        ToolDefinition::function(
            "get_current_time",
            "Gets the current date and time",
            ToolParameters::object()
                .string("timezone", "Timezone (optional, defaults to UTC)", false)
                .build(),
        ),
        ToolSource::Builtin,
        |args: ToolArguments| async move {
            let timezone = args
                .get_str_opt("timezone")
                .filter(|tz| !tz.trim().is_empty())
                .unwrap_or("UTC")
                .to_string();
            current_time(Utc::now(), &timezone)
        },
    )
}

fn current_time(now: DateTime<Utc>, timezone: &str) -> Result<serde_json::Value, AgentError> {
    let formatted = match timezone.trim() {
        tz if tz.eq_ignore_ascii_case("utc") || tz.eq_ignore_ascii_case("z") => format_en_us(&now),
        tz if tz.eq_ignore_ascii_case("local") => format_en_us(&now.with_timezone(&Local)),
        tz => match tz.parse::<Tz>() {
            Ok(zone) => format_en_us(&now.with_timezone(&zone)),
            Err(_) => {
                let offset = parse_offset(tz).ok_or_else(|| {
                    AgentError::tool(
                        "get_current_time",
                        format!("Invalid time zone specified: {tz}"),
                    )
                })?;
                format_en_us(&now.with_timezone(&offset))
            }
        },
    };

    Ok(json!({
        "timestamp": now.to_rfc3339_opts(SecondsFormat::Millis, true),
        "formatted": formatted,
        "timezone": timezone,
    }))
}

pub(crate) fn format_en_us<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%-m/%-d/%Y, %-I:%M:%S %p").to_string()
}

/// Parse `+05:30`, `-0800`, `UTC+2` or `GMT-03:00` into a fixed offset.
fn parse_offset(raw: &str) -> Option<FixedOffset> {
    let upper = raw.to_ascii_uppercase();
    let rest = upper
        .strip_prefix("UTC")
        .or_else(|| upper.strip_prefix("GMT"))
        .unwrap_or(&upper);

    let (sign, digits) = match rest.as_bytes().first()? {
        b'+' => (1, &rest[1..]),
        b'-' => (-1, &rest[1..]),
        _ => return None,
    };

    if !digits.is_ascii() {
        return None;
    }

    let (hours, minutes) = match digits.split_once(':') {
        Some((h, m)) => (h, m),
        None if digits.len() == 4 => digits.split_at(2),
        None => (digits, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if hours > 14 || minutes >= 60 {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

/// All built-in tools.
pub fn default_tools() -> Vec<HostTool> {
    vec![calculator_tool(), current_time_tool()]
}

pub fn default_tool_names() -> Vec<String> {
    default_tools()
        .iter()
        .map(|tool| tool.name().to_string())
        .collect()
}
