// Decoder: framed bytes -> raw element tree -> object graph.
//
// Two passes. The first scans frames recursively, typing every attribute
// through the resolver table and attaching token-table / default-id
// declarations to their declaring element. The second walks the raw tree
// with an explicit ancestor scope stack (no parent back-pointers),
// substituting tokens in text, inheriting default content ids, and
// assembling the typed object graph.
//
// All failures are typed; the only non-fatal case is partial token
// substitution, which is surfaced as a warning and logged.

use std::time::Duration;

use log::{debug, warn};
use thiserror::Error;

use super::bitbuf::BitError;
use super::contentid::{ContentIdError, decode_contentid};
use super::frame::{self, FrameError, read_frame};
use super::genre::{GenreError, decode_genre};
use super::timepoint::{TimepointError, decode_timepoint};
use super::types::{AttributeKind, EnumLookup, EnumValue, attribute_kind, enum_value};
use crate::model::{
    ContentId, Document, DocumentKind, Ensemble, Epg, Genre, Link, Location, Media, Membership,
    Multimedia, MultimediaKind, Name, NameKind, ModelError, Programme, ProgrammeEvent,
    ProgrammeTime, Schedule, Service, ServiceInfo, Timepoint,
};

/// Defensive bound; the schema nests at most ~6 levels.
const MAX_DEPTH: usize = 16;

/// Token bytes are non-printing controls.
const MAX_TOKEN: u8 = 0x1F;

// ---------------------------------------------------------------------------
// Errors and warnings
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("unknown root tag {0:#04x}")]
    BadRootTag(u8),
    #[error("{0} trailing bytes after the root frame")]
    TrailingBytes(usize),
    #[error("malformed frame: {0}")]
    Frame(#[from] FrameError),
    #[error("tag {child:#04x} is not a valid structural tag (under {parent:#04x})")]
    BadTag { parent: u8, child: u8 },
    #[error("unexpected child {child:#04x} under element {parent:#04x}")]
    UnexpectedChild { parent: u8, child: u8 },
    #[error("don't know how to decode attribute {attr:#04x} of element {parent:#04x}")]
    UnknownAttribute { parent: u8, attr: u8 },
    #[error(
        "enumerated value {raw:#04x} of attribute {attr:#04x} under {parent:#04x} \
         is not implemented"
    )]
    NotImplemented { parent: u8, attr: u8, raw: u64 },
    #[error("element nesting exceeds depth {MAX_DEPTH}")]
    TooDeep,
    #[error("element {parent:#04x} is missing required attribute {attr:#04x}")]
    MissingAttribute { parent: u8, attr: u8 },
    #[error("element {parent:#04x} is missing required child {child:#04x}")]
    MissingChild { parent: u8, child: u8 },
    #[error("location has no bearer and no ancestor declares a default content id")]
    MissingBearer,
    #[error("integer attribute {attr:#04x} of {parent:#04x} is {len} bytes wide")]
    BadIntegerWidth { parent: u8, attr: u8, len: usize },
    #[error("malformed token table entry at byte {0}")]
    BadTokenTable(usize),
    #[error("timepoint: {0}")]
    Timepoint(#[from] TimepointError),
    #[error("content id: {0}")]
    ContentId(#[from] ContentIdError),
    #[error("genre: {0}")]
    Genre(#[from] GenreError),
    #[error("bit unpacking: {0}")]
    Bits(#[from] BitError),
    #[error("model validation: {0}")]
    Model(#[from] ModelError),
}

/// Non-fatal decode diagnostics, collected per call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeWarning {
    /// Control bytes left in a text value after the nearest token table
    /// was applied.
    UnresolvedTokens { element: u8, tokens: Vec<u8> },
}

/// A decoded document plus the warnings raised while decoding it.
#[derive(Debug)]
pub struct Decoded {
    pub document: Document,
    pub warnings: Vec<DecodeWarning>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Decode a binary EPG or service information document.
pub fn unmarshall(data: &[u8]) -> Result<Decoded, DecodeError> {
    let root = read_frame(data, 0)?;
    if root.tag != frame::TAG_EPG && root.tag != frame::TAG_SERVICE_INFORMATION {
        return Err(DecodeError::BadRootTag(root.tag));
    }
    if root.end != data.len() {
        return Err(DecodeError::TrailingBytes(data.len() - root.end));
    }

    let raw = parse_element(root.tag, root.payload, 0)?;
    let mut walker = Walker::default();
    let document = match raw.tag {
        frame::TAG_EPG => Document::Epg(walker.epg(&raw)?),
        _ => Document::ServiceInfo(walker.service_info(&raw)?),
    };
    Ok(Decoded {
        document,
        warnings: walker.warnings,
    })
}

// ---------------------------------------------------------------------------
// Pass 1: raw tree
// ---------------------------------------------------------------------------

/// A typed attribute value as it sits on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RawValue {
    Uint(u64),
    Duration(Duration),
    /// Text and id references, unresolved (token bytes intact).
    Text(Vec<u8>),
    Genre(String),
    Timepoint(Timepoint),
    ContentId(ContentId),
    Enum(EnumValue),
}

#[derive(Debug, Clone)]
struct RawAttribute {
    tag: u8,
    value: RawValue,
}

#[derive(Debug, Clone, Default)]
struct RawElement {
    tag: u8,
    attributes: Vec<RawAttribute>,
    children: Vec<RawElement>,
    cdata: Option<Vec<u8>>,
    token_table: Option<Vec<(u8, Vec<u8>)>>,
    default_id: Option<ContentId>,
    /// Reserved declaration, parsed but unused.
    #[allow(dead_code)]
    default_language: Option<Vec<u8>>,
}

impl RawElement {
    fn attr(&self, tag: u8) -> Option<&RawValue> {
        self.attributes.iter().find(|a| a.tag == tag).map(|a| &a.value)
    }

    fn children_of(&self, tag: u8) -> impl Iterator<Item = &RawElement> {
        self.children.iter().filter(move |c| c.tag == tag)
    }

    fn child(&self, tag: u8) -> Option<&RawElement> {
        self.children_of(tag).next()
    }
}

/// Scan `payload` as the sibling frames of element `tag`.
fn parse_element(tag: u8, payload: &[u8], depth: usize) -> Result<RawElement, DecodeError> {
    if depth > MAX_DEPTH {
        return Err(DecodeError::TooDeep);
    }
    debug!("parsing element {tag:#04x} ({} payload bytes)", payload.len());

    let mut element = RawElement {
        tag,
        ..RawElement::default()
    };

    let mut pos = 0;
    while pos < payload.len() {
        let frame = read_frame(payload, pos)?;
        match frame.tag {
            frame::MIN_ATTRIBUTE_TAG..=frame::MAX_ATTRIBUTE_TAG => {
                element.attributes.push(parse_attribute(tag, frame.tag, frame.payload)?);
            }
            frame::TAG_CDATA => {
                element.cdata = Some(frame.payload.to_vec());
            }
            frame::TAG_TOKEN_TABLE => {
                element.token_table = Some(parse_token_table(frame.payload)?);
            }
            frame::TAG_DEFAULT_CONTENT_ID => {
                element.default_id = Some(decode_contentid(frame.payload)?);
            }
            frame::TAG_DEFAULT_LANGUAGE => {
                element.default_language = Some(frame.payload.to_vec());
            }
            frame::MIN_ELEMENT_TAG..=frame::MAX_ELEMENT_TAG => {
                element
                    .children
                    .push(parse_element(frame.tag, frame.payload, depth + 1)?);
            }
            child => {
                return Err(DecodeError::BadTag { parent: tag, child });
            }
        }
        pos = frame.end;
    }
    Ok(element)
}

fn parse_attribute(parent: u8, attr: u8, payload: &[u8]) -> Result<RawAttribute, DecodeError> {
    let kind = attribute_kind(parent, attr)
        .ok_or(DecodeError::UnknownAttribute { parent, attr })?;

    let uint = |payload: &[u8]| -> Result<u64, DecodeError> {
        if payload.is_empty() || payload.len() > 8 {
            return Err(DecodeError::BadIntegerWidth {
                parent,
                attr,
                len: payload.len(),
            });
        }
        Ok(payload.iter().fold(0u64, |acc, &b| acc << 8 | u64::from(b)))
    };

    let value = match kind {
        AttributeKind::Uint(_) => RawValue::Uint(uint(payload)?),
        AttributeKind::Duration => {
            if payload.len() != 2 {
                return Err(DecodeError::BadIntegerWidth {
                    parent,
                    attr,
                    len: payload.len(),
                });
            }
            RawValue::Duration(Duration::from_secs(uint(payload)?))
        }
        AttributeKind::IdRef | AttributeKind::Text => RawValue::Text(payload.to_vec()),
        AttributeKind::Genre => RawValue::Genre(decode_genre(payload)?),
        AttributeKind::Timepoint => RawValue::Timepoint(decode_timepoint(payload)?),
        AttributeKind::ContentId => RawValue::ContentId(decode_contentid(payload)?),
        AttributeKind::Enum => {
            let raw = uint(payload)?;
            match enum_value(parent, attr, raw) {
                EnumLookup::Value(value) => RawValue::Enum(value),
                EnumLookup::NotImplemented => {
                    return Err(DecodeError::NotImplemented { parent, attr, raw });
                }
            }
        }
    };
    Ok(RawAttribute { tag: attr, value })
}

/// Token table payload: repeated `{token, length, bytes}` entries.
fn parse_token_table(payload: &[u8]) -> Result<Vec<(u8, Vec<u8>)>, DecodeError> {
    let mut table = Vec::new();
    let mut pos = 0;
    while pos < payload.len() {
        if pos + 2 > payload.len() {
            return Err(DecodeError::BadTokenTable(pos));
        }
        let token = payload[pos];
        let len = payload[pos + 1] as usize;
        pos += 2;
        if pos + len > payload.len() {
            return Err(DecodeError::BadTokenTable(pos));
        }
        table.push((token, payload[pos..pos + len].to_vec()));
        pos += len;
    }
    Ok(table)
}

// ---------------------------------------------------------------------------
// Pass 2: object graph
// ---------------------------------------------------------------------------

/// Leaf elements carry no structural children.
fn reject_children(raw: &RawElement) -> Result<(), DecodeError> {
    match raw.children.first() {
        Some(child) => Err(DecodeError::UnexpectedChild {
            parent: raw.tag,
            child: child.tag,
        }),
        None => Ok(()),
    }
}

/// Elements whose schema has no character data reject a cdata frame.
fn reject_cdata(raw: &RawElement) -> Result<(), DecodeError> {
    if raw.cdata.is_some() {
        return Err(DecodeError::UnexpectedChild {
            parent: raw.tag,
            child: frame::TAG_CDATA,
        });
    }
    Ok(())
}

/// Inheritable declarations of one ancestor.
#[derive(Debug, Default)]
struct ScopeFrame {
    tokens: Option<Vec<(u8, Vec<u8>)>>,
    default_id: Option<ContentId>,
}

#[derive(Debug, Default)]
struct Walker {
    scopes: Vec<ScopeFrame>,
    warnings: Vec<DecodeWarning>,
}

impl Walker {
    /// Push `element`'s declarations, run `f`, pop.
    fn scoped<T>(
        &mut self,
        element: &RawElement,
        f: impl FnOnce(&mut Self) -> Result<T, DecodeError>,
    ) -> Result<T, DecodeError> {
        self.scopes.push(ScopeFrame {
            tokens: element.token_table.clone(),
            default_id: element.default_id.clone(),
        });
        let result = f(self);
        self.scopes.pop();
        result
    }

    /// Substitute token bytes using the nearest ancestor's table.
    fn resolve_text(&mut self, element: u8, raw: &[u8]) -> String {
        let table = self
            .scopes
            .iter()
            .rev()
            .find_map(|scope| scope.tokens.as_ref());

        let mut bytes = Vec::with_capacity(raw.len());
        let mut unresolved = Vec::new();
        for &b in raw {
            if b > MAX_TOKEN {
                bytes.push(b);
                continue;
            }
            match table.and_then(|t| t.iter().find(|(token, _)| *token == b)) {
                Some((_, replacement)) => bytes.extend_from_slice(replacement),
                None => {
                    unresolved.push(b);
                    bytes.push(b);
                }
            }
        }
        if !unresolved.is_empty() {
            warn!(
                "unresolved token bytes {unresolved:?} in text under element {element:#04x}"
            );
            self.warnings.push(DecodeWarning::UnresolvedTokens {
                element,
                tokens: unresolved,
            });
        }
        String::from_utf8_lossy(&bytes).into_owned()
    }

    fn default_id(&self) -> Option<&ContentId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.default_id.as_ref())
    }

    // -- attribute accessors ------------------------------------------------

    fn text_attr(&mut self, element: &RawElement, attr: u8) -> Option<String> {
        match element.attr(attr) {
            Some(RawValue::Text(raw)) => Some(self.resolve_text(element.tag, &raw.clone())),
            _ => None,
        }
    }

    fn uint_attr(&self, element: &RawElement, attr: u8) -> Option<u64> {
        match element.attr(attr) {
            Some(RawValue::Uint(value)) => Some(*value),
            _ => None,
        }
    }

    fn u16_attr(&self, element: &RawElement, attr: u8) -> Result<Option<u16>, DecodeError> {
        self.uint_attr(element, attr)
            .map(|v| {
                u16::try_from(v).map_err(|_| DecodeError::BadIntegerWidth {
                    parent: element.tag,
                    attr,
                    len: 8,
                })
            })
            .transpose()
    }

    fn timepoint_attr(&self, element: &RawElement, attr: u8) -> Option<Timepoint> {
        match element.attr(attr) {
            Some(RawValue::Timepoint(tp)) => Some(*tp),
            _ => None,
        }
    }

    fn duration_attr(&self, element: &RawElement, attr: u8) -> Option<Duration> {
        match element.attr(attr) {
            Some(RawValue::Duration(d)) => Some(*d),
            _ => None,
        }
    }

    fn enum_attr(&self, element: &RawElement, attr: u8) -> Option<EnumValue> {
        match element.attr(attr) {
            Some(RawValue::Enum(value)) => Some(*value),
            _ => None,
        }
    }

    fn contentid_attr(&self, element: &RawElement, attr: u8) -> Option<ContentId> {
        match element.attr(attr) {
            Some(RawValue::ContentId(id)) => Some(id.clone()),
            _ => None,
        }
    }

    fn require<T>(value: Option<T>, parent: u8, attr: u8) -> Result<T, DecodeError> {
        value.ok_or(DecodeError::MissingAttribute { parent, attr })
    }

    /// Required short id attribute, range-checked into 32 bits.
    fn short_id_attr(&self, element: &RawElement, attr: u8) -> Result<u32, DecodeError> {
        let value = Self::require(self.uint_attr(element, attr), element.tag, attr)?;
        u32::try_from(value).map_err(|_| DecodeError::BadIntegerWidth {
            parent: element.tag,
            attr,
            len: 8,
        })
    }

    fn cdata(&mut self, element: &RawElement) -> String {
        match &element.cdata {
            Some(raw) => self.resolve_text(element.tag, &raw.clone()),
            None => String::new(),
        }
    }

    // -- documents ----------------------------------------------------------

    fn epg(&mut self, raw: &RawElement) -> Result<Epg, DecodeError> {
        self.scoped(raw, |w| {
            let kind = match w.enum_attr(raw, 0x80) {
                Some(EnumValue::ProfileDrm) => DocumentKind::Drm,
                _ => DocumentKind::Dab,
            };
            let schedule_raw = raw.child(frame::TAG_SCHEDULE).ok_or(
                DecodeError::MissingChild {
                    parent: raw.tag,
                    child: frame::TAG_SCHEDULE,
                },
            )?;
            for child in &raw.children {
                if child.tag != frame::TAG_SCHEDULE {
                    return Err(DecodeError::UnexpectedChild {
                        parent: raw.tag,
                        child: child.tag,
                    });
                }
            }
            if raw.children_of(frame::TAG_SCHEDULE).count() > 1 {
                return Err(DecodeError::UnexpectedChild {
                    parent: raw.tag,
                    child: frame::TAG_SCHEDULE,
                });
            }
            let schedule = w.schedule(schedule_raw)?;
            Ok(Epg { kind, schedule })
        })
    }

    fn schedule(&mut self, raw: &RawElement) -> Result<Schedule, DecodeError> {
        self.scoped(raw, |w| {
            let mut schedule = Schedule {
                created: w.timepoint_attr(raw, 0x81).unwrap_or(Timepoint::Unspecified),
                version: w.u16_attr(raw, 0x80)?.unwrap_or(1),
                originator: w.text_attr(raw, 0x82),
                programmes: Vec::new(),
            };
            for child in &raw.children {
                match child.tag {
                    // Scope is derived from the programme times on encode;
                    // the decoded element carries no extra information.
                    frame::TAG_SCOPE => {}
                    frame::TAG_PROGRAMME => schedule.programmes.push(w.programme(child)?),
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(schedule)
        })
    }

    fn programme(&mut self, raw: &RawElement) -> Result<Programme, DecodeError> {
        self.scoped(raw, |w| {
            let mut programme = Programme::new(w.short_id_attr(raw, 0x81)?)?;
            programme.crid = w.text_attr(raw, 0x80);
            programme.version = w.u16_attr(raw, 0x82)?;
            programme.bitrate = w.u16_attr(raw, 0x87)?;
            programme.recommendation =
                matches!(w.enum_attr(raw, 0x83), Some(EnumValue::RecommendationYes));
            programme.onair = !matches!(w.enum_attr(raw, 0x84), Some(EnumValue::OffAir));

            for child in &raw.children {
                match child.tag {
                    frame::TAG_SHORT_NAME | frame::TAG_MEDIUM_NAME | frame::TAG_LONG_NAME => {
                        programme.names.push(w.name(child)?);
                    }
                    frame::TAG_LOCATION => programme.locations.push(w.location(child)?),
                    frame::TAG_MEDIA_DESCRIPTION => {
                        programme.media.extend(w.media_group(child)?);
                    }
                    frame::TAG_GENRE => programme.genres.push(w.genre(child)?),
                    frame::TAG_KEYWORDS => programme.keywords = w.keywords(child)?,
                    frame::TAG_MEMBER_OF => programme.memberships.push(w.membership(child)?),
                    frame::TAG_LINK => programme.links.push(w.link(child)?),
                    frame::TAG_PROGRAMME_EVENT => {
                        programme.events.push(w.programme_event(child)?);
                    }
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(programme)
        })
    }

    fn programme_event(&mut self, raw: &RawElement) -> Result<ProgrammeEvent, DecodeError> {
        self.scoped(raw, |w| {
            let mut event = ProgrammeEvent::new(w.short_id_attr(raw, 0x81)?)?;
            event.crid = w.text_attr(raw, 0x80);
            event.version = w.u16_attr(raw, 0x82)?;
            event.recommendation =
                matches!(w.enum_attr(raw, 0x83), Some(EnumValue::RecommendationYes));
            event.onair = !matches!(w.enum_attr(raw, 0x84), Some(EnumValue::OffAir));

            for child in &raw.children {
                match child.tag {
                    frame::TAG_SHORT_NAME | frame::TAG_MEDIUM_NAME | frame::TAG_LONG_NAME => {
                        event.names.push(w.name(child)?);
                    }
                    frame::TAG_LOCATION => event.locations.push(w.location(child)?),
                    frame::TAG_MEDIA_DESCRIPTION => event.media.extend(w.media_group(child)?),
                    frame::TAG_GENRE => event.genres.push(w.genre(child)?),
                    frame::TAG_MEMBER_OF => event.memberships.push(w.membership(child)?),
                    frame::TAG_LINK => event.links.push(w.link(child)?),
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(event)
        })
    }

    fn name(&mut self, raw: &RawElement) -> Result<Name, DecodeError> {
        reject_children(raw)?;
        let kind = match raw.tag {
            frame::TAG_SHORT_NAME => NameKind::Short,
            frame::TAG_MEDIUM_NAME => NameKind::Medium,
            _ => NameKind::Long,
        };
        let text = self.cdata(raw);
        Ok(Name::new(kind, text)?)
    }

    fn location(&mut self, raw: &RawElement) -> Result<Location, DecodeError> {
        self.scoped(raw, |w| {
            let mut location = Location::default();
            for child in &raw.children {
                match child.tag {
                    frame::TAG_TIME => location.times.push(w.absolute_time(child)?),
                    frame::TAG_RELATIVE_TIME => location.times.push(w.relative_time(child)?),
                    frame::TAG_BEARER => {
                        reject_children(child)?;
                        reject_cdata(child)?;
                        let id = match w.contentid_attr(child, 0x80) {
                            Some(id) => id,
                            None => w.default_id().cloned().ok_or(DecodeError::MissingBearer)?,
                        };
                        location.bearers.push(id);
                    }
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            if location.bearers.is_empty() {
                let id = w.default_id().cloned().ok_or(DecodeError::MissingBearer)?;
                location.bearers.push(id);
            }
            Ok(location)
        })
    }

    fn absolute_time(&mut self, raw: &RawElement) -> Result<ProgrammeTime, DecodeError> {
        reject_children(raw)?;
        reject_cdata(raw)?;
        Ok(ProgrammeTime::Absolute {
            time: Self::require(self.timepoint_attr(raw, 0x80), raw.tag, 0x80)?,
            duration: Self::require(self.duration_attr(raw, 0x81), raw.tag, 0x81)?,
            actual_time: self.timepoint_attr(raw, 0x82),
            actual_duration: self.duration_attr(raw, 0x83),
        })
    }

    fn relative_time(&mut self, raw: &RawElement) -> Result<ProgrammeTime, DecodeError> {
        reject_children(raw)?;
        reject_cdata(raw)?;
        Ok(ProgrammeTime::Relative {
            offset: Self::require(self.duration_attr(raw, 0x80), raw.tag, 0x80)?,
            duration: Self::require(self.duration_attr(raw, 0x81), raw.tag, 0x81)?,
            actual_offset: self.duration_attr(raw, 0x82),
            actual_duration: self.duration_attr(raw, 0x83),
        })
    }

    fn media_group(&mut self, raw: &RawElement) -> Result<Vec<Media>, DecodeError> {
        let mut media = Vec::new();
        for child in &raw.children {
            match child.tag {
                frame::TAG_SHORT_DESCRIPTION => {
                    reject_children(child)?;
                    let text = self.cdata(child);
                    media.push(Media::short_description(text)?);
                }
                frame::TAG_LONG_DESCRIPTION => {
                    reject_children(child)?;
                    let text = self.cdata(child);
                    media.push(Media::long_description(text)?);
                }
                frame::TAG_MULTIMEDIA => media.push(Media::Multimedia(self.multimedia(child)?)),
                tag => {
                    return Err(DecodeError::UnexpectedChild {
                        parent: raw.tag,
                        child: tag,
                    });
                }
            }
        }
        Ok(media)
    }

    fn multimedia(&mut self, raw: &RawElement) -> Result<Multimedia, DecodeError> {
        reject_children(raw)?;
        reject_cdata(raw)?;
        let url = Self::require(self.text_attr(raw, 0x82), raw.tag, 0x82)?;
        let kind = match self.enum_attr(raw, 0x83) {
            Some(EnumValue::LogoMonoSquare) => MultimediaKind::LogoMonoSquare,
            Some(EnumValue::LogoColourSquare) => MultimediaKind::LogoColourSquare,
            Some(EnumValue::LogoMonoRectangle) => MultimediaKind::LogoMonoRectangle,
            Some(EnumValue::LogoColourRectangle) => MultimediaKind::LogoColourRectangle,
            _ => MultimediaKind::LogoUnrestricted,
        };
        Ok(Multimedia {
            url,
            kind,
            mimetype: self.text_attr(raw, 0x80),
            width: self.u16_attr(raw, 0x84)?,
            height: self.u16_attr(raw, 0x85)?,
        })
    }

    fn genre(&mut self, raw: &RawElement) -> Result<Genre, DecodeError> {
        reject_children(raw)?;
        match raw.attr(0x80) {
            Some(RawValue::Genre(href)) => Ok(Genre::new(href.clone())),
            _ => Err(DecodeError::MissingAttribute {
                parent: raw.tag,
                attr: 0x80,
            }),
        }
    }

    fn keywords(&mut self, raw: &RawElement) -> Result<Vec<String>, DecodeError> {
        reject_children(raw)?;
        let joined = self.cdata(raw);
        Ok(joined
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect())
    }

    fn membership(&mut self, raw: &RawElement) -> Result<Membership, DecodeError> {
        let mut membership = Membership::new(self.short_id_attr(raw, 0x81)?)?;
        membership.crid = self.text_attr(raw, 0x80);
        membership.index = self.u16_attr(raw, 0x82)?;
        Ok(membership)
    }

    fn link(&mut self, raw: &RawElement) -> Result<Link, DecodeError> {
        let url = Self::require(self.text_attr(raw, 0x80), raw.tag, 0x80)?;
        let mut link = Link::new(url);
        link.mimetype = self.text_attr(raw, 0x81);
        link.description = self.text_attr(raw, 0x83);
        link.expiry = self.timepoint_attr(raw, 0x84);
        Ok(link)
    }

    // -- service information --------------------------------------------------

    fn service_info(&mut self, raw: &RawElement) -> Result<ServiceInfo, DecodeError> {
        self.scoped(raw, |w| {
            let mut info = ServiceInfo {
                created: w.timepoint_attr(raw, 0x81),
                version: w.u16_attr(raw, 0x80)?.unwrap_or(1),
                originator: w.text_attr(raw, 0x82),
                provider: w.text_attr(raw, 0x83),
                kind: DocumentKind::Dab,
                ensembles: Vec::new(),
            };
            for child in &raw.children {
                match child.tag {
                    frame::TAG_ENSEMBLE => info.ensembles.push(w.ensemble(child)?),
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(info)
        })
    }

    fn ensemble(&mut self, raw: &RawElement) -> Result<Ensemble, DecodeError> {
        self.scoped(raw, |w| {
            let id = Self::require(w.contentid_attr(raw, 0x80), raw.tag, 0x80)?;
            let mut ensemble = Ensemble::new(id);
            ensemble.version = w.u16_attr(raw, 0x81)?.unwrap_or(1);

            for child in &raw.children {
                match child.tag {
                    frame::TAG_SHORT_NAME | frame::TAG_MEDIUM_NAME | frame::TAG_LONG_NAME => {
                        ensemble.names.push(w.name(child)?);
                    }
                    frame::TAG_FREQUENCY => {
                        reject_children(child)?;
                        reject_cdata(child)?;
                        let khz = Self::require(w.uint_attr(child, 0x81), child.tag, 0x81)?;
                        let khz = u32::try_from(khz).map_err(|_| {
                            DecodeError::BadIntegerWidth {
                                parent: child.tag,
                                attr: 0x81,
                                len: 8,
                            }
                        })?;
                        ensemble.frequencies.push(khz);
                    }
                    frame::TAG_MEDIA_DESCRIPTION => {
                        ensemble.media.extend(w.media_group(child)?);
                    }
                    frame::TAG_SERVICE => ensemble.services.push(w.service(child)?),
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(ensemble)
        })
    }

    fn service(&mut self, raw: &RawElement) -> Result<Service, DecodeError> {
        self.scoped(raw, |w| {
            let id_element = raw.child(frame::TAG_SERVICE_ID).ok_or(
                DecodeError::MissingChild {
                    parent: raw.tag,
                    child: frame::TAG_SERVICE_ID,
                },
            )?;
            reject_children(id_element)?;
            reject_cdata(id_element)?;
            let id = Self::require(w.contentid_attr(id_element, 0x80), id_element.tag, 0x80)?;

            let mut service = Service::new(id);
            service.version = w.u16_attr(raw, 0x80)?.unwrap_or(1);
            service.bitrate = w.u16_attr(raw, 0x83)?.map(|v| v / 10);

            for child in &raw.children {
                match child.tag {
                    frame::TAG_SERVICE_ID => {}
                    frame::TAG_SHORT_NAME | frame::TAG_MEDIUM_NAME | frame::TAG_LONG_NAME => {
                        service.names.push(w.name(child)?);
                    }
                    frame::TAG_MEDIA_DESCRIPTION => service.media.extend(w.media_group(child)?),
                    frame::TAG_GENRE => service.genres.push(w.genre(child)?),
                    frame::TAG_KEYWORDS => service.keywords = w.keywords(child)?,
                    tag => {
                        return Err(DecodeError::UnexpectedChild {
                            parent: raw.tag,
                            child: tag,
                        });
                    }
                }
            }
            Ok(service)
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
