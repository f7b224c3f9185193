//! Item identifier grammars and sequence counters.
//!
//! Two grammars are accepted:
//! - systematic: `<SERVICE_UID>_<YYYYMMDD>`
//! - ad-hoc: `<SERVICE_UID>_<YYYYMMDDTHHMMSS>d<mmm>`, optionally followed by a
//!   legacy `_<NNNNNN>` counter.
//!
//! The ad-hoc timestamp always contains a `T`, so no id matches both grammars.
use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::fmt;
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;
use walkdir::WalkDir;

use crate::core::registry::CollectionRegistry;
use crate::error::{Error, Result};

/// Literal between the seconds and the milliseconds of an ad-hoc timestamp
pub const TIMESTAMP_SEPARATOR: char = 'd';

fn adhoc_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<svc>[A-Z0-9\-]+)_(?P<ts>\d{8}T\d{6})d(?P<ms>\d{3})(?:_(?P<ctr>\d{6}))?$")
            .expect("ad-hoc id regex must compile")
    })
}

fn systematic_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<svc>[A-Z0-9\-]+)_(?P<date>\d{8})$")
            .expect("systematic id regex must compile")
    })
}

fn counter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?P<svc>[A-Z0-9\-]+)_(?P<ts>\d{8}T\d{6}d?\d{3})_(?P<ctr>\d{6})$")
            .expect("counter regex must compile")
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystematicId {
    pub service_uid: String,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdHocId {
    pub service_uid: String,
    /// `YYYYMMDDTHHMMSSdmmm`
    pub token: String,
    pub timestamp: DateTime<Utc>,
    /// Trailing six-digit counter carried by older ids
    pub legacy_counter: Option<u32>,
}

/// A parsed, grammar-conformant item id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemId {
    Systematic(SystematicId),
    AdHoc(AdHocId),
}

impl ItemId {
    /// Match `id` against both grammars; `None` when neither accepts it
    pub fn parse(id: &str) -> Option<ItemId> {
        if let Some(caps) = adhoc_re().captures(id) {
            let token = format!("{}{}{}", &caps["ts"], TIMESTAMP_SEPARATOR, &caps["ms"]);
            let timestamp = parse_hub_timestamp(&token)?;
            let legacy_counter = caps.name("ctr").and_then(|c| c.as_str().parse().ok());
            return Some(ItemId::AdHoc(AdHocId {
                service_uid: caps["svc"].to_string(),
                token,
                timestamp,
                legacy_counter,
            }));
        }
        let caps = systematic_re().captures(id)?;
        let date = NaiveDate::parse_from_str(&caps["date"], "%Y%m%d").ok()?;
        Some(ItemId::Systematic(SystematicId {
            service_uid: caps["svc"].to_string(),
            date,
        }))
    }

    pub fn service_uid(&self) -> &str {
        match self {
            ItemId::Systematic(s) => &s.service_uid,
            ItemId::AdHoc(a) => &a.service_uid,
        }
    }

    /// Timestamp token used in product ids (`YYYYMMDD` or `YYYYMMDDTHHMMSSdmmm`)
    pub fn token(&self) -> String {
        match self {
            ItemId::Systematic(s) => s.date.format("%Y%m%d").to_string(),
            ItemId::AdHoc(a) => a.token.clone(),
        }
    }

    /// Item datetime; systematic ids resolve to midnight UTC of their date
    pub fn datetime(&self) -> DateTime<Utc> {
        match self {
            ItemId::Systematic(s) => {
                Utc.from_utc_datetime(&s.date.and_time(chrono::NaiveTime::MIN))
            }
            ItemId::AdHoc(a) => a.timestamp,
        }
    }

    pub fn legacy_counter(&self) -> Option<u32> {
        match self {
            ItemId::Systematic(_) => None,
            ItemId::AdHoc(a) => a.legacy_counter,
        }
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemId::Systematic(s) => write!(f, "{}_{}", s.service_uid, s.date.format("%Y%m%d")),
            ItemId::AdHoc(a) => match a.legacy_counter {
                Some(c) => write!(f, "{}_{}_{}", a.service_uid, a.token, format_counter(c)),
                None => write!(f, "{}_{}", a.service_uid, a.token),
            },
        }
    }
}

/// Validate an item id for a collection, returning its parsed form.
///
/// Fails with `UnknownCollection`, `InvalidItemId` (neither grammar) or
/// `DisallowedNamespace` (service UID outside the collection's allow-list).
pub fn validate(id: &str, collection_id: &str, registry: &CollectionRegistry) -> Result<ItemId> {
    registry.get(collection_id)?;
    let parsed = ItemId::parse(id).ok_or_else(|| Error::InvalidItemId {
        id: id.to_string(),
        collection: collection_id.to_string(),
    })?;
    if !registry.allows(collection_id, parsed.service_uid())? {
        return Err(Error::DisallowedNamespace {
            service_uid: parsed.service_uid().to_string(),
            collection: collection_id.to_string(),
        });
    }
    Ok(parsed)
}

/// Boolean form of [`validate`]
pub fn is_valid(id: &str, collection_id: &str, registry: &CollectionRegistry) -> bool {
    validate(id, collection_id, registry).is_ok()
}

fn counter_of(name: &str, service_uid: &str) -> Option<u32> {
    let caps = counter_re().captures(name)?;
    if &caps["svc"] != service_uid {
        return None;
    }
    caps["ctr"].parse().ok()
}

/// Scan item JSON files and item-named directories under `root` and return the
/// next free counter for `service_uid` (1 when none exists)
pub fn next_counter(root: &Path, service_uid: &str) -> u32 {
    let mut max_ctr = 0u32;
    for entry in WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .filter_map(std::result::Result::ok)
    {
        let path = entry.path();
        let candidate = if entry.file_type().is_dir() {
            path.file_name().and_then(|n| n.to_str())
        } else {
            let is_json = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| {
                    e.eq_ignore_ascii_case("json") || e.eq_ignore_ascii_case("geojson")
                });
            if !is_json {
                continue;
            }
            path.file_stem().and_then(|n| n.to_str())
        };
        if let Some(ctr) = candidate.and_then(|name| counter_of(name, service_uid)) {
            max_ctr = max_ctr.max(ctr);
        }
    }
    debug!("Highest counter for {} under {:?}: {}", service_uid, root, max_ctr);
    max_ctr + 1
}

/// Six-digit zero-padded counter
pub fn format_counter(n: u32) -> String {
    format!("{:06}", n)
}

/// `YYYYMMDDTHHMMSSdmmm` for a UTC instant
pub fn utc_timestamp(dt: DateTime<Utc>) -> String {
    format!(
        "{}{}{:03}",
        dt.format("%Y%m%dT%H%M%S"),
        TIMESTAMP_SEPARATOR,
        dt.timestamp_subsec_millis().min(999)
    )
}

/// Parse `YYYYMMDDTHHMMSSdmmm` into a UTC instant
pub fn parse_hub_timestamp(token: &str) -> Option<DateTime<Utc>> {
    let token = token.trim();
    if token.len() != 19 || !token.is_ascii() || token.as_bytes()[15] != TIMESTAMP_SEPARATOR as u8 {
        return None;
    }
    let base = NaiveDateTime::parse_from_str(&token[..15], "%Y%m%dT%H%M%S").ok()?;
    let millis: i64 = token[16..].parse().ok()?;
    let naive = base + chrono::Duration::milliseconds(millis);
    Some(Utc.from_utc_datetime(&naive))
}
