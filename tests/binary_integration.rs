// End-to-end encode/decode tests over whole documents.

use std::time::Duration;

use chrono::{FixedOffset, NaiveDate, TimeZone};

use dabepg::binary::{self, DecodeError, EncodeError, frame};
use dabepg::binary::frame::read_frame;
use dabepg::model::{
    ContentId, Document, Epg, Genre, Link, Location, Media, Membership, Multimedia,
    MultimediaKind, Name, Programme, ProgrammeEvent, ProgrammeTime, Schedule, Service,
    ServiceInfo, Timepoint,
};

fn utc(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> Timepoint {
    Timepoint::Utc(
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap(),
    )
}

/// A morning schedule in the shape a broadcaster would publish.
fn morning_schedule() -> Schedule {
    let mut programme = Programme::new(0x12345).unwrap();
    programme.crid = Some("crid://www.global.com/gold/1".into());
    programme.names.push(Name::short("Gold").unwrap());
    programme.names.push(Name::medium("Gold Breakfast").unwrap());
    programme.locations.push(Location {
        times: vec![ProgrammeTime::absolute(
            utc(2014, 11, 14, 6, 0, 0),
            Duration::from_secs(3 * 3600),
        )],
        bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
    });
    programme
        .media
        .push(Media::short_description("Wake up with the classics.").unwrap());
    programme
        .genres
        .push(Genre::new("urn:tva:metadata:cs:ContentCS:2002:3.6.9"));
    programme.links.push({
        let mut link = Link::new("http://www.global.com/gold");
        link.mimetype = Some("text/html".into());
        link
    });
    programme.memberships.push({
        let mut membership = Membership::new(0x999).unwrap();
        membership.crid = Some("crid://www.global.com/gold".into());
        membership
    });
    programme.events.push({
        let mut event = ProgrammeEvent::new(0x12346).unwrap();
        event.names.push(Name::short("News").unwrap());
        event.locations.push(Location {
            times: vec![ProgrammeTime::relative(
                Duration::from_secs(3600),
                Duration::from_secs(300),
            )],
            bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
        });
        event
    });

    Schedule {
        created: utc(2014, 11, 13, 12, 0, 0),
        version: 1,
        originator: Some("Global".into()),
        programmes: vec![programme],
    }
}

#[test]
fn schedule_roundtrips_through_the_wire() {
    let schedule = morning_schedule();
    let bytes = binary::marshall(&Document::Epg(Epg::new(schedule.clone()))).unwrap();

    let decoded = binary::unmarshall(&bytes).unwrap();
    assert!(decoded.warnings.is_empty());
    let Document::Epg(epg) = decoded.document else {
        panic!("expected an EPG document");
    };
    assert_eq!(epg.schedule, schedule);
}

#[test]
fn schedule_wire_layout() {
    let bytes = binary::marshall(&Document::Epg(Epg::new(morning_schedule()))).unwrap();

    let root = read_frame(&bytes, 0).unwrap();
    assert_eq!(root.tag, frame::TAG_EPG);
    assert_eq!(root.end, bytes.len());

    let schedule = read_frame(root.payload, 0).unwrap();
    assert_eq!(schedule.tag, frame::TAG_SCHEDULE);

    // created, originator, then the derived scope element.
    let created = read_frame(schedule.payload, 0).unwrap();
    assert_eq!(created.tag, 0x81);
    assert_eq!(created.payload.len(), 4); // short form timepoint

    let originator = read_frame(schedule.payload, created.end).unwrap();
    assert_eq!(originator.tag, 0x82);
    assert_eq!(originator.payload, b"Global");

    let scope = read_frame(schedule.payload, originator.end).unwrap();
    assert_eq!(scope.tag, frame::TAG_SCOPE);
    let start = read_frame(scope.payload, 0).unwrap();
    let stop = read_frame(scope.payload, start.end).unwrap();
    assert_eq!((start.tag, stop.tag), (0x80, 0x81));
    let service = read_frame(scope.payload, stop.end).unwrap();
    assert_eq!(service.tag, frame::TAG_SERVICE_SCOPE);
}

#[test]
fn event_version_one_roundtrips() {
    let mut schedule = morning_schedule();
    schedule.programmes[0].events[0].version = Some(1);

    let bytes = binary::marshall(&Document::Epg(Epg::new(schedule))).unwrap();
    let decoded = binary::unmarshall(&bytes).unwrap();
    let Document::Epg(epg) = decoded.document else {
        panic!("expected an EPG document");
    };
    assert_eq!(epg.schedule.programmes[0].events[0].version, Some(1));
}

#[test]
fn local_time_offsets_roundtrip() {
    let offset = FixedOffset::east_opt(3600).unwrap();
    let time = Timepoint::Local(
        offset
            .with_ymd_and_hms(2016, 2, 29, 6, 30, 0)
            .single()
            .unwrap(),
    );

    let mut schedule = Schedule::default();
    let mut programme = Programme::new(1).unwrap();
    programme.locations.push(Location {
        times: vec![ProgrammeTime::absolute(time, Duration::from_secs(1800))],
        bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
    });
    schedule.programmes.push(programme);

    let bytes = binary::marshall(&Document::Epg(Epg::new(schedule.clone()))).unwrap();
    let decoded = binary::unmarshall(&bytes).unwrap();
    let Document::Epg(epg) = decoded.document else {
        panic!("expected an EPG document");
    };
    assert_eq!(epg.schedule, schedule);
}

#[test]
fn seven_day_duration_is_rejected() {
    let mut schedule = Schedule::default();
    let mut programme = Programme::new(1).unwrap();
    programme.locations.push(Location {
        times: vec![ProgrammeTime::absolute(
            utc(2014, 11, 14, 0, 0, 0),
            Duration::from_secs(7 * 24 * 3600),
        )],
        bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
    });
    schedule.programmes.push(programme);

    assert!(matches!(
        binary::marshall(&Document::Epg(Epg::new(schedule))),
        Err(EncodeError::DurationOutOfRange(_))
    ));
}

#[test]
fn long_descriptions_use_extended_length_prefixes() {
    let mut schedule = Schedule::default();
    let mut programme = Programme::new(1).unwrap();
    programme.locations.push(Location {
        times: vec![ProgrammeTime::absolute(
            utc(2014, 11, 14, 6, 0, 0),
            Duration::from_secs(3600),
        )],
        bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
    });
    let text = "x".repeat(1800);
    programme
        .media
        .push(Media::long_description(text.clone()).unwrap());
    schedule.programmes.push(programme);

    let bytes = binary::marshall(&Document::Epg(Epg::new(schedule.clone()))).unwrap();
    // The 1800-byte cdata frame needs the 0xFE u16 length escape.
    assert!(bytes.windows(3).any(|w| w == [0xFE, 0x07, 0x08]));

    let decoded = binary::unmarshall(&bytes).unwrap();
    let Document::Epg(epg) = decoded.document else {
        panic!("expected an EPG document");
    };
    assert_eq!(epg.schedule, schedule);
}

#[test]
fn unknown_root_tag_is_rejected_without_parsing() {
    // Well-formed frame, unknown top-level tag.
    let bytes = [0x99, 0x00];
    assert!(matches!(
        binary::unmarshall(&bytes),
        Err(DecodeError::BadRootTag(0x99))
    ));
}

// ---------------------------------------------------------------------------
// Service information
// ---------------------------------------------------------------------------

fn national_ensemble() -> ServiceInfo {
    let mut ensemble = dabepg::model::Ensemble::new(ContentId::ensemble(0xE1, 0xCFFF));
    ensemble.names.push(Name::medium("Digital One").unwrap());
    ensemble.frequencies.push(225_648);

    let mut service = Service::new(ContentId::service(0xE1, 0xCFFF, 0xC221, 0));
    service.names.push(Name::short("Planet").unwrap());
    service.names.push(Name::medium("Planet Rock").unwrap());
    service.bitrate = Some(128);
    service
        .genres
        .push(Genre::new("urn:tva:metadata:cs:ContentCS:2002:3.6.8"));
    service.keywords = vec!["rock".into(), "classic rock".into()];
    service.media.push(Media::Multimedia(Multimedia {
        url: "http://www.planetrock.com/logo.png".into(),
        kind: MultimediaKind::LogoColourSquare,
        mimetype: Some("image/png".into()),
        width: None,
        height: None,
    }));
    ensemble.services.push(service);

    let mut info = ServiceInfo::default();
    info.originator = Some("Global".into());
    info.provider = Some("Global".into());
    info.ensembles.push(ensemble);
    info
}

#[test]
fn service_info_roundtrips_through_the_wire() {
    let info = national_ensemble();
    let bytes = binary::marshall(&Document::ServiceInfo(info.clone())).unwrap();

    let decoded = binary::unmarshall(&bytes).unwrap();
    assert!(decoded.warnings.is_empty());
    let Document::ServiceInfo(out) = decoded.document else {
        panic!("expected a service information document");
    };
    assert_eq!(out, info);
}

#[test]
fn service_bitrate_wire_unit_is_100_bits() {
    let bytes = binary::marshall(&Document::ServiceInfo(national_ensemble())).unwrap();
    // 128 kbps on the wire is 1280.
    assert!(bytes.windows(4).any(|w| w == [0x83, 0x02, 0x05, 0x00]));
}

#[test]
fn keywords_roundtrip_as_comma_joined_cdata() {
    let info = national_ensemble();
    let bytes = binary::marshall(&Document::ServiceInfo(info)).unwrap();
    assert!(
        bytes
            .windows(17)
            .any(|w| w == b"rock,classic rock".as_slice())
    );

    let decoded = binary::unmarshall(&bytes).unwrap();
    let Document::ServiceInfo(out) = decoded.document else {
        panic!("expected a service information document");
    };
    assert_eq!(
        out.ensembles[0].services[0].keywords,
        vec!["rock".to_string(), "classic rock".to_string()]
    );
}

#[test]
fn truncated_document_is_rejected() {
    let bytes = binary::marshall(&Document::ServiceInfo(national_ensemble())).unwrap();
    for cut in [1, bytes.len() / 2, bytes.len() - 1] {
        assert!(binary::unmarshall(&bytes[..cut]).is_err(), "cut at {cut}");
    }
}
