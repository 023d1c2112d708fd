// Encoder: object graph -> element tree -> framed bytes.
//
// Builders mirror the transported XML schema element by element. Attribute
// order within an element is fixed; child collections keep their insertion
// order, which is wire order.

use thiserror::Error;

use super::bitbuf::BitError;
use super::contentid::ContentIdError;
use super::element::{Element, Value};
use super::frame::{self, FrameError};
use super::genre::GenreError;
use super::timepoint::TimepointError;
use crate::model::{
    Document, Ensemble, Epg, Link, Location, Media, Membership, Multimedia, MultimediaKind, Name,
    NameKind, Programme, ProgrammeEvent, ProgrammeTime, Schedule, Scope, Service, ServiceInfo,
    DocumentKind,
};

// ---------------------------------------------------------------------------
// Encoder error
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("structural validation failed: {0}")]
    Structural(String),
    #[error("the DRM document profile is not supported")]
    DrmUnsupported,
    #[error("duration {0:?} does not fit the 16-bit whole-seconds wire field")]
    DurationOutOfRange(std::time::Duration),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("timepoint: {0}")]
    Timepoint(#[from] TimepointError),
    #[error("content id: {0}")]
    ContentId(#[from] ContentIdError),
    #[error("genre: {0}")]
    Genre(#[from] GenreError),
    #[error("bit packing: {0}")]
    Bits(#[from] BitError),
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Encode a document to its binary wire form.
pub fn marshall(document: &Document) -> Result<Vec<u8>, EncodeError> {
    let root = match document {
        Document::Epg(epg) => build_epg(epg)?,
        Document::ServiceInfo(info) => build_service_info(info)?,
    };
    Ok(root.to_bits()?.into_bytes())
}

// ---------------------------------------------------------------------------
// Programme schedule documents
// ---------------------------------------------------------------------------

fn build_epg(epg: &Epg) -> Result<Element, EncodeError> {
    if epg.kind == DocumentKind::Drm {
        return Err(EncodeError::DrmUnsupported);
    }

    // Default profile is DAB, so no type attribute is emitted.
    let mut root = Element::new(frame::TAG_EPG);
    root.child(build_schedule(&epg.schedule)?);
    Ok(root)
}

fn build_schedule(schedule: &Schedule) -> Result<Element, EncodeError> {
    let mut element = Element::new(frame::TAG_SCHEDULE);
    if schedule.version > 1 {
        element.uint(0x80, u64::from(schedule.version), 16);
    }
    element.attr(0x81, Value::Timepoint(schedule.created));
    if let Some(originator) = &schedule.originator {
        element.text(0x82, originator);
    }

    if let Some(scope) = schedule.scope() {
        element.child(build_scope(&scope));
    }
    for programme in &schedule.programmes {
        element.child(build_programme(programme));
    }
    Ok(element)
}

fn build_scope(scope: &Scope) -> Element {
    let mut element = Element::new(frame::TAG_SCOPE);
    element.attr(0x80, Value::Timepoint(scope.start));
    element.attr(0x81, Value::Timepoint(scope.end));
    for service in &scope.services {
        let mut child = Element::new(frame::TAG_SERVICE_SCOPE);
        child.attr(0x80, Value::ContentId(service.clone()));
        element.child(child);
    }
    element
}

fn build_programme(programme: &Programme) -> Element {
    let mut element = Element::new(frame::TAG_PROGRAMME);
    element.uint(0x81, u64::from(programme.short_id), 24);
    if let Some(crid) = &programme.crid {
        element.text(0x80, crid);
    }
    if let Some(version) = programme.version {
        element.uint(0x82, u64::from(version), 16);
    }
    if programme.recommendation {
        element.uint(0x83, 0x02, 8); // yes
    }
    if !programme.onair {
        element.uint(0x84, 0x02, 8); // off-air
    }
    if let Some(bitrate) = programme.bitrate {
        element.uint(0x87, u64::from(bitrate), 16);
    }

    for name in &programme.names {
        element.child(build_name(name));
    }
    for location in &programme.locations {
        element.child(build_location(location));
    }
    if !programme.media.is_empty() {
        element.child(build_media_group(&programme.media));
    }
    for genre in &programme.genres {
        element.child(build_genre(&genre.href));
    }
    for membership in &programme.memberships {
        element.child(build_membership(membership));
    }
    for link in &programme.links {
        element.child(build_link(link));
    }
    for event in &programme.events {
        element.child(build_programme_event(event));
    }
    element
}

fn build_programme_event(event: &ProgrammeEvent) -> Element {
    let mut element = Element::new(frame::TAG_PROGRAMME_EVENT);
    if let Some(crid) = &event.crid {
        element.text(0x80, crid);
    }
    element.uint(0x81, u64::from(event.short_id), 24);
    if let Some(version) = event.version {
        element.uint(0x82, u64::from(version), 16);
    }
    if event.recommendation {
        element.uint(0x83, 0x02, 8);
    }
    if !event.onair {
        element.uint(0x84, 0x02, 8);
    }

    for name in &event.names {
        element.child(build_name(name));
    }
    for location in &event.locations {
        element.child(build_location(location));
    }
    if !event.media.is_empty() {
        element.child(build_media_group(&event.media));
    }
    for genre in &event.genres {
        element.child(build_genre(&genre.href));
    }
    for membership in &event.memberships {
        element.child(build_membership(membership));
    }
    for link in &event.links {
        element.child(build_link(link));
    }
    element
}

fn build_name(name: &Name) -> Element {
    let tag = match name.kind {
        NameKind::Short => frame::TAG_SHORT_NAME,
        NameKind::Medium => frame::TAG_MEDIUM_NAME,
        NameKind::Long => frame::TAG_LONG_NAME,
    };
    let mut element = Element::new(tag);
    element.cdata = Some(name.text.clone());
    element
}

fn build_location(location: &Location) -> Element {
    let mut element = Element::new(frame::TAG_LOCATION);
    for time in &location.times {
        element.child(build_time(time));
    }
    for bearer in &location.bearers {
        let mut child = Element::new(frame::TAG_BEARER);
        child.attr(0x80, Value::ContentId(bearer.clone()));
        element.child(child);
    }
    element
}

fn build_time(time: &ProgrammeTime) -> Element {
    match time {
        ProgrammeTime::Absolute {
            time,
            duration,
            actual_time,
            actual_duration,
        } => {
            let mut element = Element::new(frame::TAG_TIME);
            element.attr(0x80, Value::Timepoint(*time));
            if let Some(actual) = actual_time {
                element.attr(0x82, Value::Timepoint(*actual));
            }
            if let Some(actual) = actual_duration {
                element.attr(0x83, Value::Duration(*actual));
            }
            element.attr(0x81, Value::Duration(*duration));
            element
        }
        ProgrammeTime::Relative {
            offset,
            duration,
            actual_offset,
            actual_duration,
        } => {
            let mut element = Element::new(frame::TAG_RELATIVE_TIME);
            element.attr(0x80, Value::Duration(*offset));
            element.attr(0x81, Value::Duration(*duration));
            if let Some(actual) = actual_offset {
                element.attr(0x82, Value::Duration(*actual));
            }
            if let Some(actual) = actual_duration {
                element.attr(0x83, Value::Duration(*actual));
            }
            element
        }
    }
}

fn build_media_group(media: &[Media]) -> Element {
    let mut group = Element::new(frame::TAG_MEDIA_DESCRIPTION);
    for item in media {
        match item {
            Media::ShortDescription(text) => {
                let mut element = Element::new(frame::TAG_SHORT_DESCRIPTION);
                element.cdata = Some(text.clone());
                group.child(element);
            }
            Media::LongDescription(text) => {
                let mut element = Element::new(frame::TAG_LONG_DESCRIPTION);
                element.cdata = Some(text.clone());
                group.child(element);
            }
            Media::Multimedia(mm) => group.child(build_multimedia(mm)),
        }
    }
    group
}

fn build_multimedia(mm: &Multimedia) -> Element {
    let mut element = Element::new(frame::TAG_MULTIMEDIA);
    if let Some(mimetype) = &mm.mimetype {
        element.text(0x80, mimetype);
    }
    element.text(0x82, &mm.url);
    let kind = match mm.kind {
        MultimediaKind::LogoUnrestricted => 0x02,
        MultimediaKind::LogoMonoSquare => 0x03,
        MultimediaKind::LogoColourSquare => 0x04,
        MultimediaKind::LogoMonoRectangle => 0x05,
        MultimediaKind::LogoColourRectangle => 0x06,
    };
    element.uint(0x83, kind, 8);
    if mm.kind == MultimediaKind::LogoUnrestricted {
        if let Some(width) = mm.width {
            element.uint(0x84, u64::from(width), 16);
        }
        if let Some(height) = mm.height {
            element.uint(0x85, u64::from(height), 16);
        }
    }
    element
}

fn build_genre(href: &str) -> Element {
    let mut element = Element::new(frame::TAG_GENRE);
    element.attr(0x80, Value::Genre(href.to_string()));
    element
}

fn build_membership(membership: &Membership) -> Element {
    let mut element = Element::new(frame::TAG_MEMBER_OF);
    if let Some(crid) = &membership.crid {
        element.text(0x80, crid);
    }
    element.uint(0x81, u64::from(membership.short_id), 24);
    if let Some(index) = membership.index {
        element.uint(0x82, u64::from(index), 16);
    }
    element
}

fn build_link(link: &Link) -> Element {
    let mut element = Element::new(frame::TAG_LINK);
    element.text(0x80, &link.url);
    if let Some(description) = &link.description {
        element.text(0x83, description);
    }
    if let Some(mimetype) = &link.mimetype {
        element.text(0x81, mimetype);
    }
    if let Some(expiry) = link.expiry {
        element.attr(0x84, Value::Timepoint(expiry));
    }
    element
}

// ---------------------------------------------------------------------------
// Service information documents
// ---------------------------------------------------------------------------

fn build_service_info(info: &ServiceInfo) -> Result<Element, EncodeError> {
    if info.kind == DocumentKind::Drm {
        return Err(EncodeError::DrmUnsupported);
    }

    let mut root = Element::new(frame::TAG_SERVICE_INFORMATION);
    if info.version > 1 {
        root.uint(0x80, u64::from(info.version), 16);
    }
    if let Some(created) = info.created {
        root.attr(0x81, Value::Timepoint(created));
    }
    if let Some(originator) = &info.originator {
        root.text(0x82, originator);
    }
    if let Some(provider) = &info.provider {
        root.text(0x83, provider);
    }

    // One ensemble per binary service information document.
    match info.ensembles.len() {
        0 => {
            return Err(EncodeError::Structural(
                "a service information document requires an ensemble".into(),
            ));
        }
        1 => {}
        n => {
            return Err(EncodeError::Structural(format!(
                "at most one ensemble per service information document, got {n}"
            )));
        }
    }
    root.child(build_ensemble(&info.ensembles[0])?);
    Ok(root)
}

fn build_ensemble(ensemble: &Ensemble) -> Result<Element, EncodeError> {
    let mut element = Element::new(frame::TAG_ENSEMBLE);
    element.attr(0x80, Value::ContentId(ensemble.id.clone()));
    if ensemble.version > 1 {
        element.uint(0x81, u64::from(ensemble.version), 16);
    }

    for name in &ensemble.names {
        element.child(build_name(name));
    }

    if ensemble.frequencies.is_empty() {
        return Err(EncodeError::Structural(format!(
            "ensemble {} declares no frequency",
            ensemble.id
        )));
    }
    for &frequency in &ensemble.frequencies {
        let mut child = Element::new(frame::TAG_FREQUENCY);
        child.uint(0x81, u64::from(frequency), 24);
        element.child(child);
    }

    if !ensemble.media.is_empty() {
        element.child(build_media_group(&ensemble.media));
    }
    for service in &ensemble.services {
        element.child(build_service(service));
    }
    Ok(element)
}

fn build_service(service: &Service) -> Element {
    let mut element = Element::new(frame::TAG_SERVICE);
    if service.version > 1 {
        element.uint(0x80, u64::from(service.version), 16);
    }
    if let Some(bitrate) = service.bitrate {
        // Wire unit is 100 bit/s.
        element.uint(0x83, u64::from(bitrate) * 10, 16);
    }

    let mut id = Element::new(frame::TAG_SERVICE_ID);
    id.attr(0x80, Value::ContentId(service.id.clone()));
    element.child(id);

    for name in &service.names {
        element.child(build_name(name));
    }
    if !service.media.is_empty() {
        element.child(build_media_group(&service.media));
    }
    for genre in &service.genres {
        element.child(build_genre(&genre.href));
    }
    if !service.keywords.is_empty() {
        let mut keywords = Element::new(frame::TAG_KEYWORDS);
        keywords.cdata = Some(service.keywords.join(","));
        element.child(keywords);
    }
    element
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
