//! System prompt templating.
//!
//! Placeholders look like `{{ key }}`. Known keys are replaced with the
//! current time, timezone or location; unknown keys are left as written.

use std::collections::HashMap;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, SecondsFormat, Utc};
use regex::{Captures, Regex};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::tools::builtin::format_en_us;
use crate::util::timeout::with_fallback;

/// Text used when no location could be obtained in time.
pub const LOCATION_UNAVAILABLE: &str = "Location unavailable";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([^{}\s]+)\s*\}\}").expect("placeholder regex must compile")
});

/// A geographic fix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    /// Accuracy radius in meters.
    pub accuracy: f64,
}

impl Location {
    pub fn describe(&self) -> String {
        format!(
            "lat {:.6}, lng {:.6} (±{}m)",
            self.latitude,
            self.longitude,
            self.accuracy.round() as i64
        )
    }
}

/// Source of the user's current location.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_location(&self) -> Result<Location>;
}

/// Provider for hosts without location access.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_location(&self) -> Result<Location> {
        Err(AgentError::InvalidState(LOCATION_UNAVAILABLE.into()))
    }
}

/// Always reports the same location.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Location);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_location(&self) -> Result<Location> {
        Ok(self.0)
    }
}

/// Fill in the placeholders of a system prompt template.
///
/// A blank template yields an empty string. The location lookup waits at most
/// `location_timeout`.
pub async fn resolve_system_prompt_template(
    template: &str,
    location: &dyn LocationProvider,
    location_timeout: Duration,
) -> String {
    resolve_at(template, Utc::now(), location, location_timeout).await
}

/// [`resolve_system_prompt_template`] bounded by `config.enrichment_timeout`.
pub async fn resolve_system_prompt(
    template: &str,
    location: &dyn LocationProvider,
    config: &AgentConfig,
) -> String {
    resolve_system_prompt_template(template, location, config.enrichment_timeout).await
}

async fn resolve_at(
    template: &str,
    now: DateTime<Utc>,
    location: &dyn LocationProvider,
    location_timeout: Duration,
) -> String {
    if template.trim().is_empty() {
        return String::new();
    }

    let local = now.with_timezone(&Local);
    let current_time = format_en_us(&local);
    let current_location = with_fallback(
        location_timeout,
        async { location.current_location().await.map(|l| l.describe()) },
        LOCATION_UNAVAILABLE.to_string(),
    )
    .await;

    let replacements = HashMap::from([
        ("current_time", current_time.clone()),
        ("当前时间", current_time),
        (
            "current_time_iso",
            now.to_rfc3339_opts(SecondsFormat::Millis, true),
        ),
        ("current_timezone", timezone_name(&local)),
        ("current_location", current_location.clone()),
        ("当前地理位置", current_location),
    ]);

    substitute(template, &replacements)
}

fn substitute(template: &str, replacements: &HashMap<&str, String>) -> String {
    PLACEHOLDER_RE
        .replace_all(template, |caps: &Captures<'_>| match replacements.get(&caps[1]) {
            Some(value) => value.clone(),
            None => caps[0].to_string(),
        })
        .into_owned()
}

fn timezone_name(local: &DateTime<Local>) -> String {
    match std::env::var("TZ") {
        Ok(tz) if !tz.trim().is_empty() => tz,
        _ => format!("UTC{}", local.offset()),
    }
}
