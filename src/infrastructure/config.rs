use crate::infrastructure::error::InfraError;
use chrono_tz::Tz;
use std::fs;
use std::path::Path;
use std::time::Duration;

const APP_JSON: &str = "app.json";
const DEFAULT_TIMEZONE: &str = "UTC";
const DEFAULT_STATUS_CHECK_SECONDS: u64 = 5;
const DEFAULT_SHIFT_MINUTE_VALUE: u32 = 15;

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerConfig {
    pub app_name: String,
    pub time_zone: Tz,
    pub status_check_interval: Duration,
    pub shift_minute_value: u32,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            app_name: "TimePlanner".to_string(),
            time_zone: Tz::UTC,
            status_check_interval: Duration::from_secs(DEFAULT_STATUS_CHECK_SECONDS),
            shift_minute_value: DEFAULT_SHIFT_MINUTE_VALUE,
        }
    }
}

fn default_app_config() -> serde_json::Value {
    serde_json::json!({
        "schema": 1,
        "appName": "TimePlanner",
        "timezone": DEFAULT_TIMEZONE,
        "statusCheckSeconds": DEFAULT_STATUS_CHECK_SECONDS,
        "shiftMinuteValue": DEFAULT_SHIFT_MINUTE_VALUE
    })
}

pub fn ensure_default_configs(config_dir: &Path) -> Result<(), InfraError> {
    let path = config_dir.join(APP_JSON);
    if !path.exists() {
        let formatted = serde_json::to_string_pretty(&default_app_config())?;
        fs::write(path, format!("{formatted}\n"))?;
    }
    Ok(())
}

fn read_config(path: &Path) -> Result<serde_json::Value, InfraError> {
    let raw = fs::read_to_string(path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    let schema = parsed
        .get("schema")
        .and_then(serde_json::Value::as_u64)
        .ok_or_else(|| InfraError::InvalidConfig(format!("missing schema in {}", path.display())))?;
    if schema != 1 {
        return Err(InfraError::InvalidConfig(format!(
            "unsupported schema {} in {}",
            schema,
            path.display()
        )));
    }
    Ok(parsed)
}

/// Reads `app.json`. Missing or out-of-range numbers fall back to defaults;
/// an unknown time zone is an error.
pub fn load_planner_config(config_dir: &Path) -> Result<PlannerConfig, InfraError> {
    let app = read_config(&config_dir.join(APP_JSON))?;
    let mut config = PlannerConfig::default();

    if let Some(name) = read_trimmed_str(&app, "appName") {
        config.app_name = name.to_string();
    }
    if let Some(raw_zone) = read_trimmed_str(&app, "timezone") {
        config.time_zone = parse_time_zone(raw_zone)?;
    }
    if let Some(seconds) = app
        .get("statusCheckSeconds")
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0)
    {
        config.status_check_interval = Duration::from_secs(seconds);
    }
    if let Some(minutes) = app
        .get("shiftMinuteValue")
        .and_then(serde_json::Value::as_u64)
        .filter(|value| *value > 0 && *value < 24 * 60)
    {
        config.shift_minute_value = minutes as u32;
    }

    Ok(config)
}

pub fn parse_time_zone(value: &str) -> Result<Tz, InfraError> {
    value
        .trim()
        .parse::<Tz>()
        .map_err(|error| InfraError::InvalidConfig(format!("unknown timezone '{value}': {error}")))
}

fn read_trimmed_str<'a>(value: &'a serde_json::Value, key: &str) -> Option<&'a str> {
    value
        .get(key)
        .and_then(serde_json::Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
}
