use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::ServiceStatus;

pub fn to_u32(value: i64, field: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{field} contains out-of-range value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

pub fn parse_status(value: &str) -> Result<ServiceStatus> {
    match value {
        "Scheduled" => Ok(ServiceStatus::Scheduled),
        "InProgress" => Ok(ServiceStatus::InProgress),
        "Paused" => Ok(ServiceStatus::Paused),
        "Completed" => Ok(ServiceStatus::Completed),
        "Cancelled" => Ok(ServiceStatus::Cancelled),
        other => Err(anyhow!("unknown service status {other}")),
    }
}
