use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eventgate_core::core_event::{NewEvent, NewUser};
use eventgate_core::storage::{EventStore, ParticipationStore};
use eventgate_core::test_utils::{all_privacy_settings, TestEventBuilder};
use eventgate_core::core_access::{can_join, can_view};
use eventgate_core::{
    BlockFilter, PrivacyRedactor, PrivacySettings, SqlStore, Timestamp, UserId, ViewerContext,
};
use std::sync::Arc;
use std::time::Duration;

fn bench_permission_checks(c: &mut Criterion) {
    let mut group = c.benchmark_group("permission");
    let settings: Vec<PrivacySettings> = all_privacy_settings().collect();
    let viewers = [
        ViewerContext::anonymous(),
        ViewerContext::registered(UserId(1)),
        ViewerContext::registered(UserId(1)).verified(),
        ViewerContext::registered(UserId(1)).admin(),
    ];
    group.throughput(Throughput::Elements((settings.len() * viewers.len()) as u64));

    group.bench_function("view_and_join_matrix", |b| {
        b.iter(|| {
            let mut allowed = 0usize;
            for privacy in &settings {
                for viewer in &viewers {
                    allowed += can_view(black_box(privacy), viewer).is_allowed() as usize;
                    allowed += can_join(black_box(privacy), viewer).is_allowed() as usize;
                }
            }
            black_box(allowed)
        });
    });

    group.finish();
}

fn bench_block_filter(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_filter");
    group.measurement_time(Duration::from_secs(5));

    for blocked in [0usize, 10, 100] {
        let store = Arc::new(SqlStore::in_memory().unwrap());
        let viewer = store
            .insert_user(&NewUser::new("viewer", "viewer@example.com"))
            .unwrap();
        let owners: Vec<UserId> = (0..200)
            .map(|i| {
                store
                    .insert_user(&NewUser::new(format!("o{}", i), format!("o{}@example.com", i)))
                    .unwrap()
            })
            .collect();
        let filter = BlockFilter::new(store.clone());
        for owner in owners.iter().take(blocked) {
            filter.block(viewer, *owner, None).unwrap();
        }

        let listing: Vec<_> = owners
            .iter()
            .enumerate()
            .map(|(i, owner)| TestEventBuilder::new(i as i64 + 1, owner.as_i64()).build())
            .collect();
        let ctx = ViewerContext::registered(viewer);

        group.throughput(Throughput::Elements(listing.len() as u64));
        group.bench_with_input(BenchmarkId::new("filter_events", blocked), &listing, |b, listing| {
            b.iter(|| black_box(filter.filter_events(listing.clone(), &ctx).unwrap()));
        });
    }

    group.finish();
}

fn bench_redaction(c: &mut Criterion) {
    let mut group = c.benchmark_group("redaction");

    let store = Arc::new(SqlStore::in_memory().unwrap());
    let owner = store
        .insert_user(&NewUser::new("owner", "owner@example.com").verified())
        .unwrap();
    let hidden = PrivacySettings {
        allow_unregistered_viewers: true,
        hide_organizer_until_joined: true,
        hide_participants_until_joined: true,
        ..Default::default()
    };
    let id = store
        .insert_event(&NewEvent::new(owner, "bench", "Bench").with_privacy(hidden))
        .unwrap();
    for i in 0..50u64 {
        let user = store
            .insert_user(&NewUser::new(format!("p{}", i), format!("p{}@example.com", i)))
            .unwrap();
        store.admit(id, user, Timestamp::from_millis(i)).unwrap();
    }

    let event = store.event_by_id(id, None).unwrap().unwrap();
    let redactor = PrivacyRedactor::new(store.clone(), "Join to see organizer");
    let outsider = ViewerContext::registered(UserId(10_000)).verified();

    group.bench_function("apply_outsider", |b| {
        b.iter(|| black_box(redactor.apply(&event, &outsider)));
    });

    group.finish();
}

fn bench_admission(c: &mut Criterion) {
    let mut group = c.benchmark_group("admission");
    group.measurement_time(Duration::from_secs(10));

    let store = Arc::new(SqlStore::in_memory().unwrap());
    let owner = store
        .insert_user(&NewUser::new("owner", "owner@example.com"))
        .unwrap();
    let user = store
        .insert_user(&NewUser::new("joiner", "joiner@example.com"))
        .unwrap();
    let event = store
        .insert_event(&NewEvent::new(owner, "cycle", "Cycle").with_capacity(1))
        .unwrap();

    group.bench_function("admit_then_remove", |b| {
        b.iter(|| {
            let outcome = store.admit(event, user, Timestamp::now()).unwrap();
            store.remove_participant(event, user).unwrap();
            black_box(outcome)
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_permission_checks,
    bench_block_filter,
    bench_redaction,
    bench_admission
);
criterion_main!(benches);
