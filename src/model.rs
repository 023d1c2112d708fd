// EPG object graph: the durable representation owned by the caller.
//
// The binary codec borrows these types for encoding and produces new
// instances on decoding. Field names and semantics follow ETSI TS 102 818
// (the XML schema the binary encoding transports).

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use thiserror::Error;

/// Largest encodable short id (24-bit wire field).
pub const MAX_SHORT_ID: u32 = 0xFF_FFFF;

/// Largest encodable X-PAD application type (5-bit wire field).
pub const MAX_XPAD: u8 = 0x1F;

// ---------------------------------------------------------------------------
// Model errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("text length exceeds the maximum: {len} > {max}")]
    TextTooLong { len: usize, max: usize },
    #[error("short id exceeds 24 bits: {0:#x}")]
    ShortIdOutOfRange(u32),
    #[error("X-PAD application type exceeds 5 bits: {0:#x}")]
    XpadOutOfRange(u8),
    #[error("malformed content id: {0:?}")]
    BadContentId(String),
}

// ---------------------------------------------------------------------------
// Content identifiers
// ---------------------------------------------------------------------------

/// A DAB content identifier: ensemble ECC/EId with optional service
/// identification (SId, SCIdS) and optional X-PAD application type.
///
/// String form is dotted lowercase hex: `e1.ce00` or `e1.ce00.c000.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentId {
    /// Extended country code.
    pub ecc: u8,
    /// Ensemble id.
    pub eid: u16,
    /// Service id (audio services are 16-bit).
    pub sid: Option<u16>,
    /// Service component id within the service.
    pub scids: Option<u8>,
    /// X-PAD application type, when the component is carried in X-PAD.
    pub xpad: Option<u8>,
}

impl ContentId {
    /// Ensemble-only identifier.
    pub fn ensemble(ecc: u8, eid: u16) -> Self {
        Self {
            ecc,
            eid,
            sid: None,
            scids: None,
            xpad: None,
        }
    }

    /// Full service component identifier.
    pub fn service(ecc: u8, eid: u16, sid: u16, scids: u8) -> Self {
        Self {
            ecc,
            eid,
            sid: Some(sid),
            scids: Some(scids),
            xpad: None,
        }
    }

    /// True when the id carries a service/component pair.
    /// Ids without one encode in the short ensemble-only wire form.
    pub fn has_service(&self) -> bool {
        self.sid.is_some() && self.scids.is_some()
    }
}

impl fmt::Display for ContentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}.{:x}", self.ecc, self.eid)?;
        if let (Some(sid), Some(scids)) = (self.sid, self.scids) {
            write!(f, ".{sid:x}.{scids:x}")?;
        }
        Ok(())
    }
}

impl FromStr for ContentId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || ModelError::BadContentId(s.to_string());
        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() != 2 && parts.len() != 4 {
            return Err(bad());
        }
        let ecc = u8::from_str_radix(parts[0], 16).map_err(|_| bad())?;
        let eid = u16::from_str_radix(parts[1], 16).map_err(|_| bad())?;
        let (sid, scids) = if parts.len() == 4 {
            let sid = u16::from_str_radix(parts[2], 16).map_err(|_| bad())?;
            let scids = u8::from_str_radix(parts[3], 16).map_err(|_| bad())?;
            (Some(sid), Some(scids))
        } else {
            (None, None)
        };
        Ok(Self {
            ecc,
            eid,
            sid,
            scids,
            xpad: None,
        })
    }
}

// ---------------------------------------------------------------------------
// Timepoints
// ---------------------------------------------------------------------------

/// A calendar instant as carried by the wire timestamp format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timepoint {
    /// The all-zero wire sentinel: "now / unspecified".
    Unspecified,
    /// An instant with no local-time offset.
    Utc(NaiveDateTime),
    /// An instant qualified with a fixed offset from UTC.
    Local(DateTime<FixedOffset>),
}

impl Timepoint {
    pub fn is_unspecified(&self) -> bool {
        matches!(self, Timepoint::Unspecified)
    }

    /// The naive wall-clock part, if specified.
    pub fn naive(&self) -> Option<NaiveDateTime> {
        match self {
            Timepoint::Unspecified => None,
            Timepoint::Utc(dt) => Some(*dt),
            Timepoint::Local(dt) => Some(dt.naive_local()),
        }
    }
}

impl fmt::Display for Timepoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timepoint::Unspecified => write!(f, "unspecified"),
            Timepoint::Utc(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S")),
            Timepoint::Local(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%:z")),
        }
    }
}

// ---------------------------------------------------------------------------
// Names and descriptions
// ---------------------------------------------------------------------------

/// Name variants, distinguished by maximum length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    /// Up to 8 characters.
    Short,
    /// Up to 16 characters.
    Medium,
    /// Up to 128 characters.
    Long,
}

impl NameKind {
    pub fn max_len(self) -> usize {
        match self {
            NameKind::Short => 8,
            NameKind::Medium => 16,
            NameKind::Long => 128,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub kind: NameKind,
    pub text: String,
}

impl Name {
    pub fn new(kind: NameKind, text: impl Into<String>) -> Result<Self, ModelError> {
        let text = text.into();
        if text.chars().count() > kind.max_len() {
            return Err(ModelError::TextTooLong {
                len: text.chars().count(),
                max: kind.max_len(),
            });
        }
        Ok(Self { kind, text })
    }

    pub fn short(text: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(NameKind::Short, text)
    }

    pub fn medium(text: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(NameKind::Medium, text)
    }

    pub fn long(text: impl Into<String>) -> Result<Self, ModelError> {
        Self::new(NameKind::Long, text)
    }
}

/// Derive the usual short/medium/long name set from free-form names,
/// truncating where a variant's limit is exceeded.
pub fn suggest_names<I, S>(names: I) -> Vec<Name>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut result = Vec::new();
    for name in names {
        let name = name.as_ref();
        let truncated = |max: usize| name.chars().take(max).collect::<String>();
        for kind in [NameKind::Short, NameKind::Medium, NameKind::Long] {
            if name.chars().count() <= kind.max_len() {
                result.push(Name {
                    kind,
                    text: name.to_string(),
                });
            } else if kind != NameKind::Short || name.chars().count() <= NameKind::Medium.max_len()
            {
                result.push(Name {
                    kind,
                    text: truncated(kind.max_len()),
                });
            }
        }
    }
    result
}

/// Maximum short description length.
pub const MAX_SHORT_DESCRIPTION: usize = 180;
/// Maximum long description length.
pub const MAX_LONG_DESCRIPTION: usize = 1800;

/// One entry of a media description group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Media {
    /// Up to 180 characters.
    ShortDescription(String),
    /// Up to 1800 characters.
    LongDescription(String),
    Multimedia(Multimedia),
}

impl Media {
    pub fn short_description(text: impl Into<String>) -> Result<Self, ModelError> {
        let text = text.into();
        if text.chars().count() > MAX_SHORT_DESCRIPTION {
            return Err(ModelError::TextTooLong {
                len: text.chars().count(),
                max: MAX_SHORT_DESCRIPTION,
            });
        }
        Ok(Media::ShortDescription(text))
    }

    pub fn long_description(text: impl Into<String>) -> Result<Self, ModelError> {
        let text = text.into();
        if text.chars().count() > MAX_LONG_DESCRIPTION {
            return Err(ModelError::TextTooLong {
                len: text.chars().count(),
                max: MAX_LONG_DESCRIPTION,
            });
        }
        Ok(Media::LongDescription(text))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MultimediaKind {
    LogoUnrestricted,
    LogoMonoSquare,
    LogoColourSquare,
    LogoMonoRectangle,
    LogoColourRectangle,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Multimedia {
    pub url: String,
    pub kind: MultimediaKind,
    pub mimetype: Option<String>,
    pub width: Option<u16>,
    pub height: Option<u16>,
}

impl Multimedia {
    pub fn new(url: impl Into<String>, kind: MultimediaKind) -> Self {
        Self {
            url: url.into(),
            kind,
            mimetype: None,
            width: None,
            height: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Times and locations
// ---------------------------------------------------------------------------

/// Billed/actual time of a programme location. Durations are whole seconds
/// on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgrammeTime {
    Absolute {
        time: Timepoint,
        duration: Duration,
        actual_time: Option<Timepoint>,
        actual_duration: Option<Duration>,
    },
    /// Offset from the schedule scope start.
    Relative {
        offset: Duration,
        duration: Duration,
        actual_offset: Option<Duration>,
        actual_duration: Option<Duration>,
    },
}

impl ProgrammeTime {
    pub fn absolute(time: Timepoint, duration: Duration) -> Self {
        ProgrammeTime::Absolute {
            time,
            duration,
            actual_time: None,
            actual_duration: None,
        }
    }

    pub fn relative(offset: Duration, duration: Duration) -> Self {
        ProgrammeTime::Relative {
            offset,
            duration,
            actual_offset: None,
            actual_duration: None,
        }
    }

    pub fn billed_duration(&self) -> Duration {
        match self {
            ProgrammeTime::Absolute { duration, .. } => *duration,
            ProgrammeTime::Relative { duration, .. } => *duration,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Location {
    pub times: Vec<ProgrammeTime>,
    pub bearers: Vec<ContentId>,
}

// ---------------------------------------------------------------------------
// Genres, memberships, links
// ---------------------------------------------------------------------------

/// A TV-Anytime classification-scheme reference, e.g.
/// `urn:tva:metadata:cs:ContentCS:2002:3.6.9`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Genre {
    pub href: String,
    pub name: Option<String>,
}

impl Genre {
    pub fn new(href: impl Into<String>) -> Self {
        Self {
            href: href.into(),
            name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub short_id: u32,
    pub crid: Option<String>,
    pub index: Option<u16>,
}

impl Membership {
    pub fn new(short_id: u32) -> Result<Self, ModelError> {
        if short_id > MAX_SHORT_ID {
            return Err(ModelError::ShortIdOutOfRange(short_id));
        }
        Ok(Self {
            short_id,
            crid: None,
            index: None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub url: String,
    pub mimetype: Option<String>,
    pub description: Option<String>,
    pub expiry: Option<Timepoint>,
}

impl Link {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            mimetype: None,
            description: None,
            expiry: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Programmes and schedules
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Programme {
    /// 24-bit short crid.
    pub short_id: u32,
    pub crid: Option<String>,
    pub version: Option<u16>,
    /// kbps.
    pub bitrate: Option<u16>,
    pub onair: bool,
    pub recommendation: bool,
    pub names: Vec<Name>,
    pub locations: Vec<Location>,
    pub media: Vec<Media>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<String>,
    pub memberships: Vec<Membership>,
    pub links: Vec<Link>,
    pub events: Vec<ProgrammeEvent>,
}

impl Programme {
    pub fn new(short_id: u32) -> Result<Self, ModelError> {
        if short_id > MAX_SHORT_ID {
            return Err(ModelError::ShortIdOutOfRange(short_id));
        }
        Ok(Self {
            short_id,
            crid: None,
            version: None,
            bitrate: None,
            onair: true,
            recommendation: false,
            names: Vec::new(),
            locations: Vec::new(),
            media: Vec::new(),
            genres: Vec::new(),
            keywords: Vec::new(),
            memberships: Vec::new(),
            links: Vec::new(),
            events: Vec::new(),
        })
    }

    /// First name no longer than `max_len`, preferring shorter kinds.
    pub fn name(&self, max_len: usize) -> Option<&Name> {
        for kind in [NameKind::Short, NameKind::Medium, NameKind::Long] {
            if let Some(name) = self
                .names
                .iter()
                .find(|n| n.kind == kind && n.text.chars().count() <= max_len)
            {
                return Some(name);
            }
        }
        None
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgrammeEvent {
    pub short_id: u32,
    pub crid: Option<String>,
    pub version: Option<u16>,
    pub onair: bool,
    pub recommendation: bool,
    pub names: Vec<Name>,
    pub locations: Vec<Location>,
    pub media: Vec<Media>,
    pub genres: Vec<Genre>,
    pub memberships: Vec<Membership>,
    pub links: Vec<Link>,
}

impl ProgrammeEvent {
    pub fn new(short_id: u32) -> Result<Self, ModelError> {
        if short_id > MAX_SHORT_ID {
            return Err(ModelError::ShortIdOutOfRange(short_id));
        }
        Ok(Self {
            short_id,
            crid: None,
            version: None,
            onair: true,
            recommendation: false,
            names: Vec::new(),
            locations: Vec::new(),
            media: Vec::new(),
            genres: Vec::new(),
            memberships: Vec::new(),
            links: Vec::new(),
        })
    }
}

/// Time window and service set covered by a schedule, derived from the
/// programmes' absolute billed times and bearers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    pub start: Timepoint,
    pub end: Timepoint,
    pub services: Vec<ContentId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schedule {
    pub created: Timepoint,
    pub version: u16,
    pub originator: Option<String>,
    pub programmes: Vec<Programme>,
}

impl Default for Schedule {
    fn default() -> Self {
        Self {
            created: Timepoint::Unspecified,
            version: 1,
            originator: None,
            programmes: Vec::new(),
        }
    }
}

impl Schedule {
    /// Collate the scope from absolute billed times and bearer ids.
    /// Returns `None` when no programme carries an absolute time.
    pub fn scope(&self) -> Option<Scope> {
        let mut start: Option<NaiveDateTime> = None;
        let mut end: Option<NaiveDateTime> = None;
        let mut services: Vec<ContentId> = Vec::new();

        for programme in &self.programmes {
            for location in &programme.locations {
                for time in &location.times {
                    let ProgrammeTime::Absolute { time, duration, .. } = time else {
                        continue;
                    };
                    let Some(billed) = time.naive() else { continue };
                    if start.is_none_or(|s| s > billed) {
                        start = Some(billed);
                    }
                    let stop = billed + chrono::Duration::seconds(duration.as_secs() as i64);
                    if end.is_none_or(|e| e < stop) {
                        end = Some(stop);
                    }
                }
                for bearer in &location.bearers {
                    if !services.contains(bearer) {
                        services.push(bearer.clone());
                    }
                }
            }
        }

        Some(Scope {
            start: Timepoint::Utc(start?),
            end: Timepoint::Utc(end?),
            services,
        })
    }
}

/// Document profile. Only the DAB profile is encodable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DocumentKind {
    #[default]
    Dab,
    Drm,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epg {
    pub kind: DocumentKind,
    pub schedule: Schedule,
}

impl Epg {
    pub fn new(schedule: Schedule) -> Self {
        Self {
            kind: DocumentKind::Dab,
            schedule,
        }
    }
}

// ---------------------------------------------------------------------------
// Service information
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Service {
    pub id: ContentId,
    pub version: u16,
    /// kbps.
    pub bitrate: Option<u16>,
    pub names: Vec<Name>,
    pub media: Vec<Media>,
    pub genres: Vec<Genre>,
    pub keywords: Vec<String>,
}

impl Service {
    pub fn new(id: ContentId) -> Self {
        Self {
            id,
            version: 1,
            bitrate: None,
            names: Vec::new(),
            media: Vec::new(),
            genres: Vec::new(),
            keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ensemble {
    pub id: ContentId,
    pub version: u16,
    pub names: Vec<Name>,
    /// kHz.
    pub frequencies: Vec<u32>,
    pub media: Vec<Media>,
    pub services: Vec<Service>,
}

impl Ensemble {
    pub fn new(id: ContentId) -> Self {
        Self {
            id,
            version: 1,
            names: Vec::new(),
            frequencies: Vec::new(),
            media: Vec::new(),
            services: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceInfo {
    pub created: Option<Timepoint>,
    pub version: u16,
    pub originator: Option<String>,
    pub provider: Option<String>,
    pub kind: DocumentKind,
    pub ensembles: Vec<Ensemble>,
}

impl Default for ServiceInfo {
    fn default() -> Self {
        Self {
            created: None,
            version: 1,
            originator: None,
            provider: None,
            kind: DocumentKind::Dab,
            ensembles: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level document
// ---------------------------------------------------------------------------

/// The two document types carried by the wire format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Document {
    Epg(Epg),
    ServiceInfo(ServiceInfo),
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn content_id_string_roundtrip() {
        for s in ["e1.ce00", "e1.ce00.c000.0", "e1.c181.c2a1.0"] {
            let id: ContentId = s.parse().unwrap();
            assert_eq!(id.to_string(), s);
        }
    }

    #[test]
    fn content_id_rejects_garbage() {
        assert!("".parse::<ContentId>().is_err());
        assert!("e1".parse::<ContentId>().is_err());
        assert!("e1.ce00.c000".parse::<ContentId>().is_err());
        assert!("zz.ce00".parse::<ContentId>().is_err());
    }

    #[test]
    fn name_length_limits() {
        assert!(Name::short("12345678").is_ok());
        assert!(Name::short("123456789").is_err());
        assert!(Name::medium("1234567890123456").is_ok());
        assert!(Name::long("x".repeat(129)).is_err());
    }

    #[test]
    fn suggest_names_expands_variants() {
        let names = suggest_names(["Gold"]);
        assert_eq!(names.len(), 3);
        assert!(names.iter().all(|n| n.text == "Gold"));

        let names = suggest_names(["A name too long for the short form"]);
        // No short variant for names beyond the medium limit.
        assert!(names.iter().all(|n| n.kind != NameKind::Short));
    }

    #[test]
    fn schedule_scope_collates_times_and_bearers() {
        let mut schedule = Schedule::default();
        let mut programme = Programme::new(1).unwrap();
        let start = NaiveDate::from_ymd_opt(2014, 11, 14)
            .unwrap()
            .and_hms_opt(6, 0, 0)
            .unwrap();
        programme.locations.push(Location {
            times: vec![ProgrammeTime::absolute(
                Timepoint::Utc(start),
                Duration::from_secs(3600),
            )],
            bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
        });
        schedule.programmes.push(programme);

        let scope = schedule.scope().unwrap();
        assert_eq!(scope.start, Timepoint::Utc(start));
        assert_eq!(
            scope.end,
            Timepoint::Utc(start + chrono::Duration::hours(1))
        );
        assert_eq!(scope.services.len(), 1);
    }

    #[test]
    fn schedule_scope_ignores_relative_times() {
        let mut schedule = Schedule::default();
        let mut programme = Programme::new(1).unwrap();
        programme.locations.push(Location {
            times: vec![ProgrammeTime::relative(
                Duration::from_secs(2700),
                Duration::from_secs(900),
            )],
            bearers: vec![],
        });
        schedule.programmes.push(programme);
        assert!(schedule.scope().is_none());
    }

    #[test]
    fn programme_name_prefers_shortest_kind() {
        let mut programme = Programme::new(1).unwrap();
        programme.names.push(Name::long("A Long Name").unwrap());
        programme.names.push(Name::short("Short").unwrap());
        assert_eq!(programme.name(128).unwrap().text, "Short");
        assert_eq!(programme.name(3), None);
    }
}
