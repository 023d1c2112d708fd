// Criterion benchmarks: encode and decode a day-sized schedule and a
// typical service information document.

use std::time::Duration;

use chrono::NaiveDate;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

use dabepg::binary;
use dabepg::model::{
    ContentId, Document, Ensemble, Epg, Genre, Location, Media, Name, Programme, ProgrammeTime,
    Schedule, Service, ServiceInfo, Timepoint,
};

fn day_schedule() -> Document {
    let day = NaiveDate::from_ymd_opt(2014, 11, 14).unwrap();
    let mut schedule = Schedule {
        originator: Some("Global".into()),
        ..Schedule::default()
    };
    for slot in 0..48u32 {
        let mut programme = Programme::new(0x1000 + slot).unwrap();
        programme.crid = Some(format!("crid://www.global.com/gold/{slot}"));
        programme.names.push(Name::short("Gold").unwrap());
        programme
            .names
            .push(Name::medium(format!("Slot {slot}")).unwrap());
        programme.locations.push(Location {
            times: vec![ProgrammeTime::absolute(
                Timepoint::Utc(day.and_hms_opt(slot / 2, (slot % 2) * 30, 0).unwrap()),
                Duration::from_secs(1800),
            )],
            bearers: vec!["e1.ce00.c000.0".parse().unwrap()],
        });
        programme
            .media
            .push(Media::short_description("Half an hour of classics.").unwrap());
        programme
            .genres
            .push(Genre::new("urn:tva:metadata:cs:ContentCS:2002:3.6.9"));
        schedule.programmes.push(programme);
    }
    Document::Epg(Epg::new(schedule))
}

fn multiplex() -> Document {
    let mut ensemble = Ensemble::new(ContentId::ensemble(0xE1, 0xCFFF));
    ensemble.names.push(Name::medium("Digital One").unwrap());
    ensemble.frequencies.push(225_648);
    for n in 0..16u16 {
        let mut service = Service::new(ContentId::service(0xE1, 0xCFFF, 0xC200 + n, 0));
        service
            .names
            .push(Name::medium(format!("Service {n}")).unwrap());
        service.bitrate = Some(128);
        ensemble.services.push(service);
    }
    let mut info = ServiceInfo::default();
    info.ensembles.push(ensemble);
    Document::ServiceInfo(info)
}

fn bench_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode");
    for (name, document) in [("day_schedule", day_schedule()), ("multiplex", multiplex())] {
        let size = binary::marshall(&document).unwrap().len() as u64;
        group.throughput(Throughput::Bytes(size));
        group.bench_function(name, |b| {
            b.iter(|| binary::marshall(black_box(&document)).unwrap())
        });
    }
    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode");
    for (name, document) in [("day_schedule", day_schedule()), ("multiplex", multiplex())] {
        let bytes = binary::marshall(&document).unwrap();
        group.throughput(Throughput::Bytes(bytes.len() as u64));
        group.bench_function(name, |b| {
            b.iter(|| binary::unmarshall(black_box(&bytes)).unwrap())
        });
    }
    group.finish();
}

criterion_group!(benches, bench_encode, bench_decode);
criterion_main!(benches);
