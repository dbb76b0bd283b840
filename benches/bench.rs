// Criterion benchmarks for Event Radar

use chrono::NaiveDate;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use event_radar::core::{distance::haversine_distance, merge_streams, GeoFilterEngine, Recommender};
use event_radar::models::{Coordinate, Event, FilterCriteria, RankMode};

const TAGS: [&str; 6] = ["music", "food", "sports", "art", "comedy", "markets"];

fn create_event(id: usize, lat: f64, lon: f64) -> Event {
    let date = NaiveDate::from_ymd_opt(2026, 6, 1 + (id % 28) as u32).unwrap();
    let mut event = Event::new(id.to_string(), format!("Event {}", id), date);
    event.position = Some(Coordinate::new(lat, lon));
    event.tags = vec![TAGS[id % TAGS.len()].to_string(), TAGS[(id / 3) % TAGS.len()].to_string()];
    event
}

fn create_events(count: usize) -> Vec<Event> {
    (0..count)
        .map(|i| {
            let lat_offset = (i as f64 * 0.003) % 1.0;
            let lon_offset = (i as f64 * 0.007) % 1.0;
            create_event(i, 53.3 + lat_offset, -2.0 + lon_offset)
        })
        .collect()
}

fn create_criteria() -> FilterCriteria {
    FilterCriteria::default()
        .with_search_text("event 1")
        .with_tags(["music", "art"])
        .with_date_range(NaiveDate::from_ymd_opt(2026, 6, 5), NaiveDate::from_ymd_opt(2026, 6, 20))
        .with_origin(Coordinate::new(53.8008, -1.5491), 25.0)
}

fn bench_haversine_distance(c: &mut Criterion) {
    c.bench_function("haversine_distance", |b| {
        b.iter(|| {
            haversine_distance(
                black_box(53.8008),
                black_box(-1.5491),
                black_box(51.5074),
                black_box(-0.1278),
            )
        });
    });
}

fn bench_filtering(c: &mut Criterion) {
    let engine = GeoFilterEngine::new();
    let criteria = create_criteria();

    let mut group = c.benchmark_group("filtering");

    for event_count in [10, 100, 1000, 10_000].iter() {
        let events = create_events(*event_count);

        group.bench_with_input(
            BenchmarkId::new("filter_by_distance", event_count),
            event_count,
            |b, _| {
                b.iter(|| {
                    engine.filter(
                        black_box(&events),
                        black_box(&criteria),
                        black_box(RankMode::Distance),
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_recommend(c: &mut Criterion) {
    let recommender = Recommender::with_defaults();
    let profile_tags: Vec<String> = vec!["music".into(), "street food".into(), "football".into()];
    let events = create_events(1000);

    c.bench_function("recommend_1000_events", |b| {
        b.iter(|| recommender.recommend(black_box(&profile_tags), black_box(events.clone())));
    });
}

fn bench_merge_streams(c: &mut Criterion) {
    let local = create_events(1000);
    let suggested: Vec<Event> = local
        .iter()
        .step_by(7)
        .cloned()
        .map(|mut e| {
            e.score = Some(0.5);
            e
        })
        .collect();

    c.bench_function("merge_streams_1000", |b| {
        b.iter(|| merge_streams(black_box(local.clone()), black_box(suggested.clone())));
    });
}

criterion_group!(
    benches,
    bench_haversine_distance,
    bench_filtering,
    bench_recommend,
    bench_merge_streams
);

criterion_main!(benches);
