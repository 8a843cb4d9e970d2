use commhub_classifier::ProfileTable;
use commhub_core::UpsertOutcome;
use commhub_seed::seeders::{BookingSeeder, FoundationSeeder};
use commhub_seed::{
    run_seed, MemoryStore, SeedConfig, SeedCounts, SeedError, SeedOrchestrator, SeedStore,
    StepStatus,
};

fn counts() -> SeedCounts {
    SeedCounts {
        members_per_tenant: 3,
        venues: 5,
        performers: 8,
        businesses: 4,
        events: 10,
        bookings: 12,
        follows: 15,
        reviews: 6,
        ratings: 6,
    }
}

fn profiles() -> Vec<commhub_core::PlatformProfile> {
    ProfileTable::builtin().unwrap().profiles().cloned().collect()
}

#[tokio::test]
async fn second_run_adds_aggregates_but_no_foundation_rows() {
    let store = MemoryStore::new();
    let orchestrator = SeedOrchestrator::standard(profiles());

    let seed = SeedConfig::default().seed;

    let first = orchestrator.run(&store, seed, counts()).await.unwrap();
    let second = orchestrator.run(&store, seed, counts()).await.unwrap();

    assert_eq!(first.counts.tenants, second.counts.tenants);
    assert_eq!(first.counts.users, second.counts.users);
    assert_eq!(first.counts.workspaces, second.counts.workspaces);
    assert_eq!(first.counts.platform_profiles, second.counts.platform_profiles);
    assert_eq!(second.counts.venues, 2 * first.counts.venues);
    assert_eq!(second.counts.bookings, 24);

    let profiles_step = second.step("platform_profiles").unwrap();
    assert_eq!(profiles_step.inserted, 0);
    assert_eq!(profiles_step.updated, first.counts.platform_profiles);
    assert_eq!(second.step("foundation").unwrap().inserted, 0);
    assert!(second.steps.iter().all(|s| s.status == StepStatus::Completed));
}

#[tokio::test]
async fn default_seed_reruns_on_one_store_with_default_counts() {
    let store = MemoryStore::new();
    let orchestrator = SeedOrchestrator::standard(profiles());
    let config = SeedConfig::default();

    let first = orchestrator
        .run(&store, config.seed, config.counts)
        .await
        .unwrap();
    let first_ids = store
        .performers()
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect::<std::collections::HashSet<_>>();

    let second = orchestrator
        .run(&store, config.seed, config.counts)
        .await
        .unwrap();
    assert_eq!(second.counts.performers, 2 * first.counts.performers);
    assert_eq!(second.counts.bookings, 2 * config.counts.bookings);
    let new_ids = store
        .performers()
        .await
        .unwrap()
        .into_iter()
        .filter(|p| !first_ids.contains(&p.id))
        .count();
    assert_eq!(new_ids, config.counts.performers);
}

#[tokio::test]
async fn same_seed_produces_the_same_rows() {
    let a = MemoryStore::new();
    let b = MemoryStore::new();
    let orchestrator = SeedOrchestrator::standard(Vec::new());
    orchestrator.run(&a, 7, counts()).await.unwrap();
    orchestrator.run(&b, 7, counts()).await.unwrap();

    let names = |rows: Vec<commhub_core::Performer>| {
        rows.into_iter()
            .map(|p| (p.id, p.name, p.genres))
            .collect::<Vec<_>>()
    };
    assert_eq!(
        names(a.performers().await.unwrap()),
        names(b.performers().await.unwrap())
    );
    assert_eq!(a.counts().await.unwrap(), b.counts().await.unwrap());
}

#[tokio::test]
async fn profile_upsert_keeps_one_row_with_latest_values() {
    let store = MemoryStore::new();
    let mut profile = ProfileTable::builtin()
        .unwrap()
        .get("wordpress")
        .cloned()
        .unwrap();

    assert_eq!(
        store.upsert_platform_profile(&profile).await.unwrap(),
        UpsertOutcome::Inserted
    );
    profile.confidence_score = 0.5;
    profile.sample_size = 3;
    assert_eq!(
        store.upsert_platform_profile(&profile).await.unwrap(),
        UpsertOutcome::Updated
    );

    let rows = store.platform_profiles().await.unwrap();
    let wordpress = rows.iter().filter(|p| p.slug == "wordpress").collect::<Vec<_>>();
    assert_eq!(wordpress.len(), 1);
    assert_eq!(wordpress[0].confidence_score, 0.5);
    assert_eq!(wordpress[0].sample_size, 3);
}

#[tokio::test]
async fn missing_events_abort_the_run() {
    let store = MemoryStore::new();
    let orchestrator = SeedOrchestrator::new(vec![
        Box::<FoundationSeeder>::default(),
        Box::new(BookingSeeder),
    ]);
    let err = orchestrator.run(&store, 1, counts()).await.unwrap_err();
    assert!(matches!(
        err,
        SeedError::MissingPrerequisite {
            missing: "events",
            ..
        }
    ));
    assert_eq!(store.counts().await.unwrap().bookings, 0);
}

#[tokio::test]
async fn run_seed_writes_reports() {
    let dir = tempfile::tempdir().unwrap();
    let config = SeedConfig {
        counts: counts(),
        reports_dir: dir.path().to_path_buf(),
        ..SeedConfig::default()
    };
    let store = MemoryStore::new();
    let summary = run_seed(&store, &config).await.unwrap();

    let run_dir = dir.path().join(summary.run_id.to_string());
    assert!(run_dir.join("seed_summary.json").exists());
    assert!(run_dir.join("seed_brief.md").exists());
    assert_eq!(summary.counts.platform_profiles, profiles().len());
}
