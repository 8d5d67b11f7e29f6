// ── Hotspot domain types ──
//
// Typed projections of the router's attribute records. Only the fields
// the guest-credential manager cares about survive; missing optional
// fields become `None` / zero rather than errors.

use std::fmt::Write as _;
use std::time::Duration;

use guestwire_api::AttributeRecord;
use serde::{Deserialize, Serialize};

/// A guest credential configured on the router.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotspotUser {
    /// Router-internal identifier (e.g. `*1A`).
    pub id: String,
    pub name: String,
    pub password: Option<String>,
    pub profile: Option<String>,
    /// Total uptime allowed, in router notation (e.g. `1d2h`).
    pub limit_uptime: Option<String>,
    pub comment: Option<String>,
    pub disabled: bool,
}

impl From<&AttributeRecord> for HotspotUser {
    fn from(r: &AttributeRecord) -> Self {
        Self {
            id: r.get_or_default(".id").to_owned(),
            name: r.get_or_default("name").to_owned(),
            password: non_empty(r, "password"),
            profile: non_empty(r, "profile"),
            limit_uptime: non_empty(r, "limit-uptime"),
            comment: non_empty(r, "comment"),
            disabled: r.get_bool("disabled"),
        }
    }
}

/// A client currently logged in through the hotspot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSession {
    pub id: String,
    pub user: String,
    pub address: Option<String>,
    pub mac_address: Option<String>,
    /// Session uptime in router notation.
    pub uptime: Option<String>,
    pub bytes_in: u64,
    pub bytes_out: u64,
    pub server: Option<String>,
}

impl ActiveSession {
    /// Uptime as a `Duration`, when the router's notation could be read.
    pub fn uptime_duration(&self) -> Option<Duration> {
        self.uptime.as_deref().and_then(parse_router_duration)
    }
}

impl From<&AttributeRecord> for ActiveSession {
    fn from(r: &AttributeRecord) -> Self {
        Self {
            id: r.get_or_default(".id").to_owned(),
            user: r.get_or_default("user").to_owned(),
            address: non_empty(r, "address"),
            mac_address: non_empty(r, "mac-address"),
            uptime: non_empty(r, "uptime"),
            bytes_in: r.get_u64("bytes-in"),
            bytes_out: r.get_u64("bytes-out"),
            server: non_empty(r, "server"),
        }
    }
}

fn non_empty(record: &AttributeRecord, key: &str) -> Option<String> {
    record
        .get(key)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

/// Request to add a hotspot user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHotspotUser {
    pub name: String,
    pub password: String,
    pub profile: Option<String>,
    /// Maximum total uptime; `None` leaves the router's profile default.
    pub time_limit: Option<Duration>,
    pub comment: Option<String>,
}

impl NewHotspotUser {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            profile: None,
            time_limit: None,
            comment: None,
        }
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = Some(limit);
        self
    }

    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

const UNITS: [(char, u64); 5] = [
    ('w', 7 * 24 * 3600),
    ('d', 24 * 3600),
    ('h', 3600),
    ('m', 60),
    ('s', 1),
];

/// Render a duration the way the router writes time values, e.g. `1d2h30m`.
/// Sub-second precision is dropped; zero renders as `0s`.
pub fn format_router_duration(duration: Duration) -> String {
    let mut remaining = duration.as_secs();
    if remaining == 0 {
        return "0s".into();
    }
    let mut out = String::new();
    for (unit, secs) in UNITS {
        let count = remaining / secs;
        if count > 0 {
            let _ = write!(out, "{count}{unit}");
            remaining %= secs;
        }
    }
    out
}

/// Parse router time notation: `1w2d3h4m5s` or `hh:mm:ss`, optionally
/// prefixed by a unit section (`3d 04:05:06`).
pub fn parse_router_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let mut total = 0u64;
    let mut digits = String::new();
    let mut rest = text;

    // Unit-suffixed part.
    while let Some(c) = rest.chars().next() {
        if c.is_ascii_digit() {
            digits.push(c);
        } else if let Some((_, secs)) = UNITS.iter().find(|(u, _)| *u == c) {
            let part = digits.parse::<u64>().ok()?.checked_mul(*secs)?;
            total = total.checked_add(part)?;
            digits.clear();
        } else {
            break;
        }
        rest = &rest[c.len_utf8()..];
    }

    // Clock part.
    let clock = rest.trim();
    if clock.is_empty() {
        return digits.is_empty().then_some(Duration::from_secs(total));
    }
    let clock = format!("{digits}{clock}");
    let mut parts = clock.split(':');
    let (h, m, s) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }
    let clock_secs = h
        .parse::<u64>()
        .ok()?
        .checked_mul(3600)?
        .checked_add(m.parse::<u64>().ok()?.checked_mul(60)?)?
        .checked_add(s.parse::<u64>().ok()?)?;
    Some(Duration::from_secs(total.checked_add(clock_secs)?))
}
