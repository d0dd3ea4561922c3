// ZoneMinder API response types
//
// ZoneMinder's CakePHP API returns almost every scalar as a string, wraps
// each record in a `{ "Monitor": {...} }` / `{ "Event": {...} }` object, and
// is inconsistent about field presence across versions. Fields use
// `#[serde(default)]` liberally and unmodelled fields land in `extra`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Date format used by ZoneMinder for both query bounds and event times.
pub const ZM_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

// ── Server clock ─────────────────────────────────────────────────────

/// Zone ZoneMinder's wall-clock timestamps are written in.
///
/// ZoneMinder stores `StartTime`/`EndTime` without an offset, in the
/// server's local time. Query bounds must be rendered in the same zone and
/// event times read back through it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServerTimeZone {
    /// The zone of the host forculus runs on.
    #[default]
    Local,
    /// A fixed offset from UTC.
    Fixed(FixedOffset),
}

impl ServerTimeZone {
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Render `ts` as server wall-clock time.
    pub fn format(self, ts: DateTime<Utc>) -> String {
        match self {
            Self::Local => ts.with_timezone(&Local).format(ZM_DATE_FORMAT).to_string(),
            Self::Fixed(offset) => ts.with_timezone(&offset).format(ZM_DATE_FORMAT).to_string(),
        }
    }

    /// Read a server wall-clock time. Ambiguous times (DST fold) resolve to
    /// the earlier instant; times skipped by a DST gap are an error.
    pub fn parse(self, value: &str) -> Result<DateTime<Utc>, Error> {
        let naive =
            NaiveDateTime::parse_from_str(value, ZM_DATE_FORMAT).map_err(|source| {
                Error::Timestamp {
                    value: value.to_owned(),
                    source,
                }
            })?;

        let resolved = match self {
            Self::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
            Self::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .earliest()
                .map(|dt| dt.with_timezone(&Utc)),
        };
        resolved.ok_or_else(|| Error::NonexistentTime {
            value: value.to_owned(),
        })
    }
}

/// Accepts `local`, `utc` / `Z`, or an offset such as `+02:00`, `-0530`
/// or `+2`.
impl FromStr for ServerTimeZone {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if s.eq_ignore_ascii_case("utc") || s == "Z" {
            return Ok(Self::utc());
        }
        parse_offset(s)
            .map(Self::Fixed)
            .ok_or_else(|| Error::InvalidTimeZone(s.to_owned()))
    }
}

impl fmt::Display for ServerTimeZone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => f.write_str("local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

fn parse_offset(s: &str) -> Option<FixedOffset> {
    let (sign, rest) = if let Some(rest) = s.strip_prefix('+') {
        (1, rest)
    } else if let Some(rest) = s.strip_prefix('-') {
        (-1, rest)
    } else {
        return None;
    };

    let (hours, minutes) = match rest.split_once(':') {
        Some((h, m)) => (h, m),
        None if rest.len() == 4 => rest.split_at(2),
        None => (rest, "0"),
    };
    let hours: i32 = hours.parse().ok()?;
    let minutes: i32 = minutes.parse().ok()?;
    if !(0..24).contains(&hours) || !(0..60).contains(&minutes) {
        return None;
    }
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

fn parse_count(value: &str) -> Result<u32, Error> {
    value.trim().parse().map_err(|source| Error::Count {
        value: value.to_owned(),
        source,
    })
}

// ── Identifiers ──────────────────────────────────────────────────────

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

string_id!(
    /// Identifier of a monitor (camera) in ZoneMinder.
    MonitorId
);
string_id!(
    /// Identifier of a recorded event in ZoneMinder.
    EventId
);

// ── Authentication ───────────────────────────────────────────────────

/// Response body of `api/host/login.json`.
///
/// A refresh (login with `?token=<refresh>`) only returns the access token
/// half, so the refresh fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginDetails {
    pub access_token: String,
    /// Access token lifetime in seconds.
    #[serde(default)]
    pub access_token_expires: f64,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Refresh token lifetime in seconds.
    #[serde(default)]
    pub refresh_token_expires: Option<f64>,
    #[serde(default, rename = "apiversion")]
    pub api_version: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
}

/// Response body of `api/host/getVersion.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    #[serde(rename = "apiversion")]
    pub api_version: String,
    #[serde(rename = "version")]
    pub service_version: String,
}

// ── Monitors ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ListMonitorsResponse {
    #[serde(default)]
    pub monitors: Vec<Monitor>,
}

/// A monitor record from `api/monitors.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(rename = "Monitor")]
    pub details: MonitorDetails,
    #[serde(rename = "Monitor_Status", default)]
    pub status: Option<MonitorStatus>,
}

impl Monitor {
    pub fn id(&self) -> &MonitorId {
        &self.details.id
    }

    /// Human-readable label: `Name(id:N)`.
    pub fn label(&self) -> String {
        format!("{}(id:{})", self.details.name, self.details.id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorDetails {
    #[serde(rename = "Id")]
    pub id: MonitorId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Function", default)]
    pub function: Option<String>,
    #[serde(rename = "Enabled", default)]
    pub enabled: Option<String>,
    #[serde(rename = "AlarmFrameCount", default)]
    pub alarm_frame_count: Option<String>,
    /// Catch-all for the ~100 other monitor settings.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MonitorDetails {
    pub fn parse_alarm_frame_count(&self) -> Result<u32, Error> {
        parse_count(self.alarm_frame_count.as_deref().unwrap_or_default())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorStatus {
    #[serde(rename = "MonitorId", default)]
    pub monitor_id: Option<MonitorId>,
    #[serde(rename = "Status", default)]
    pub state: Option<String>,
    #[serde(rename = "CaptureFPS", default)]
    pub capture_fps: Option<String>,
    #[serde(rename = "AnalysisFPS", default)]
    pub analysis_fps: Option<String>,
}

// ── Alarm status ─────────────────────────────────────────────────────

/// Alarm state reported by `api/monitors/alarm/id:N/command:status.json`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AlarmStatus {
    Idle,
    PreAlarm,
    Alert,
    Alarm,
    Tape,
    /// Anything the server reported that we don't recognise.
    Invalid,
}

impl AlarmStatus {
    /// Map the raw status code. Unknown codes become [`AlarmStatus::Invalid`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "0" => Self::Idle,
            "1" => Self::PreAlarm,
            "2" => Self::Alert,
            "3" => Self::Alarm,
            "4" => Self::Tape,
            _ => Self::Invalid,
        }
    }

    /// Whether a monitor in this state counts as alerted.
    pub fn is_alerted(self) -> bool {
        matches!(self, Self::PreAlarm | Self::Alert | Self::Alarm)
    }
}

impl fmt::Display for AlarmStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "Idle",
            Self::PreAlarm => "Pre-Alarm",
            Self::Alert => "Alerted",
            Self::Alarm => "Alarmed",
            Self::Tape => "Alarm Taping",
            Self::Invalid => "Invalid",
        })
    }
}

/// The status endpoint has returned the code both as a string and as a number.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum RawAlarmStatus {
    Text(String),
    Number(i64),
}

#[derive(Debug, Deserialize)]
pub(crate) struct AlarmStatusResponse {
    pub status: RawAlarmStatus,
}

impl From<RawAlarmStatus> for AlarmStatus {
    fn from(raw: RawAlarmStatus) -> Self {
        match raw {
            RawAlarmStatus::Text(s) => Self::parse(&s),
            RawAlarmStatus::Number(n) => Self::parse(&n.to_string()),
        }
    }
}

/// A monitor together with the alarm status it was observed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertedMonitor {
    pub monitor: Monitor,
    pub alarm_status: AlarmStatus,
}

impl AlertedMonitor {
    pub fn id(&self) -> &MonitorId {
        self.monitor.id()
    }
}

// ── Events ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub(crate) struct ListEventsResponse {
    #[serde(default)]
    pub events: Vec<EventWrapper>,
    #[serde(default)]
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub(crate) struct EventWrapper {
    #[serde(rename = "Event")]
    pub event: MonitorEvent,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Pagination {
    #[serde(default)]
    pub next_page: bool,
    #[serde(default)]
    pub page: Option<u64>,
    #[serde(default)]
    pub page_count: Option<u64>,
}

/// A recorded event from `api/events/index/...json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorEvent {
    #[serde(rename = "Id")]
    pub id: EventId,
    #[serde(rename = "MonitorId")]
    pub monitor_id: MonitorId,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Cause", default)]
    pub cause: Option<String>,
    #[serde(rename = "StartTime", default)]
    pub start_time: Option<String>,
    /// Null while the event is still being recorded.
    #[serde(rename = "EndTime", default)]
    pub end_time: Option<String>,
    #[serde(rename = "Length", default)]
    pub length: Option<String>,
    #[serde(rename = "Frames", default)]
    pub frames: Option<String>,
    #[serde(rename = "AlarmFrames", default)]
    pub alarm_frames: Option<String>,
    #[serde(rename = "MaxScore", default)]
    pub max_score: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl MonitorEvent {
    pub fn parse_start_time(&self, zone: ServerTimeZone) -> Result<DateTime<Utc>, Error> {
        zone.parse(self.start_time.as_deref().unwrap_or_default())
    }

    pub fn parse_end_time(&self, zone: ServerTimeZone) -> Result<DateTime<Utc>, Error> {
        zone.parse(self.end_time.as_deref().unwrap_or_default())
    }

    pub fn parse_alarm_frames(&self) -> Result<u32, Error> {
        parse_count(self.alarm_frames.as_deref().unwrap_or_default())
    }
}

impl fmt::Display for MonitorEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.id)
    }
}
