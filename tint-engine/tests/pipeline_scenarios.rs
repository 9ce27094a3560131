//! End-to-end pipeline scenarios
//!
//! Covers:
//! - Identical consecutive tracks produce an empty second batch
//! - Extraction timeout resolves to the default palette
//! - A tier drop mid-cycle reaches later strategy invocations
//! - Superseded generations never publish
//! - The sink never shows a mix of two results

mod helpers;

use helpers::{
    drain, harmonized_sequences, lavender_samples, six_samples, FixedFeatures, GatedExtractor,
    Harness, SlowExtractor, TierShiftExtractor,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tint_common::events::{EventBus, TintEvent};
use tint_common::{PresetTable, QualityTier, Rgb, UserConfig};
use tint_engine::authority::{variable_map, MemorySink, StateAuthority, DEFAULT_PREFIX};
use tint_engine::processing::{
    CycleOutcome, NeutralFeatures, OrchestratorConfig, PartialFeatures, StaticExtractor,
};
use tint_engine::strategy::{fallback, DefaultPaletteStrategy};
use tint_engine::{EngineConfig, ThemeEngine};
use tokio::sync::broadcast;

async fn next_applied(rx: &mut broadcast::Receiver<TintEvent>) -> (Vec<String>, bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let TintEvent::ColorsApplied {
                applied_keys,
                skipped,
                ..
            } = rx.recv().await.expect("bus closed")
            {
                return (applied_keys, skipped);
            }
        }
    })
    .await
    .expect("no colors:applied event")
}

fn start_engine(sink: MemorySink) -> ThemeEngine {
    ThemeEngine::start(
        &EngineConfig::default(),
        PresetTable::builtin(),
        Arc::new(StaticExtractor::new(lavender_samples())),
        Arc::new(NeutralFeatures),
        sink,
        None,
    )
    .expect("default config is valid")
}

#[test]
fn test_start_outside_runtime_is_config_error() {
    let result = ThemeEngine::start(
        &EngineConfig::default(),
        PresetTable::builtin(),
        Arc::new(StaticExtractor::new(lavender_samples())),
        Arc::new(NeutralFeatures),
        MemorySink::new(),
        None,
    );
    assert!(matches!(result, Err(tint_engine::Error::Config(_))));
}

#[tokio::test]
async fn test_engine_publishes_full_variable_set() {
    helpers::init_test_logging();
    let sink = MemorySink::new();
    let engine = start_engine(sink.clone());
    let mut events = engine.subscribe();

    let outcome = engine.track_changed("spotify:track:1").await.unwrap();
    let result = outcome.published().expect("cycle should publish").clone();
    assert_eq!(result.metadata.strategy_name, "weighted-blend");

    let (keys, skipped) = next_applied(&mut events).await;
    assert!(!skipped);
    assert_eq!(keys.len(), 16);
    assert_eq!(sink.snapshot(), variable_map(DEFAULT_PREFIX, &result));
    assert_eq!(
        sink.get("--tint-primary-rgb"),
        Some(result.primary.to_triplet())
    );
    assert_eq!(engine.authority_stats().commits, 1);

    engine.shutdown().await;
}

#[tokio::test]
async fn test_identical_tracks_produce_empty_second_batch() {
    let sink = MemorySink::new();
    let engine = start_engine(sink.clone());
    let mut events = engine.subscribe();

    engine.track_changed("album:1:track:1").await.unwrap();
    let (first_keys, first_skipped) = next_applied(&mut events).await;
    assert!(!first_skipped);
    assert!(!first_keys.is_empty());
    let after_first = sink.snapshot();

    engine.track_changed("album:1:track:2").await.unwrap();
    let (second_keys, second_skipped) = next_applied(&mut events).await;
    assert!(second_skipped);
    assert!(second_keys.is_empty());

    assert_eq!(sink.snapshot(), after_first);
    let stats = engine.authority_stats();
    assert_eq!(stats.commits, 1);
    assert_eq!(stats.skips, 1);

    engine.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_extraction_timeout_uses_default_palette() {
    let harness = Harness::new(Arc::new(SlowExtractor {
        delay: Duration::from_secs(30),
        samples: lavender_samples(),
    }));

    let outcome = harness.orchestrator.handle_track_change("slow-artwork").await;

    let result = outcome.published().expect("timeout must still publish");
    assert_eq!(result.metadata.strategy_name, fallback::NAME);
    assert_eq!(result.accent, fallback::DEFAULT_ACCENT);
    let stats = harness.orchestrator.stats();
    assert_eq!(stats.extraction_timeouts, 1);
    assert_eq!(stats.fallbacks, 1);
}

#[tokio::test]
async fn test_tier_drop_mid_cycle_applies_to_later_strategies() {
    let (bus, tiers) = Harness::bus_and_tiers();
    let extractor = Arc::new(TierShiftExtractor {
        controller: Arc::clone(&tiers),
        shift_to: QualityTier::Low,
        samples: six_samples(),
    });
    let harness = Harness::assemble(
        bus,
        tiers,
        extractor,
        Arc::new(NeutralFeatures),
        OrchestratorConfig::default(),
    );
    let mut events = harness.bus.subscribe();

    let outcome = harness.orchestrator.handle_track_change("track").await;

    // The cycle was not aborted, and the blend chosen at high tier ran on the low-tier path
    let result = outcome.published().expect("cycle should publish");
    assert_eq!(result.metadata.strategy_name, "weighted-blend");
    assert_eq!(result.metadata.tier, QualityTier::Low);

    let events = drain(&mut events);
    assert!(events.iter().any(|e| matches!(
        e,
        TintEvent::TierChanged { tier: QualityTier::Low, .. }
    )));
    assert_eq!(harmonized_sequences(&events), vec![1]);
}

#[tokio::test]
async fn test_low_tier_changes_blend_output() {
    let high = Harness::new(Arc::new(StaticExtractor::default()));
    let high_result = high
        .orchestrator
        .handle_extracted("t", six_samples(), PartialFeatures::default())
        .await;

    let (bus, tiers) = Harness::bus_and_tiers();
    let shifted = Harness::assemble(
        bus,
        Arc::clone(&tiers),
        Arc::new(TierShiftExtractor {
            controller: tiers,
            shift_to: QualityTier::Low,
            samples: six_samples(),
        }),
        Arc::new(NeutralFeatures),
        OrchestratorConfig::default(),
    );
    let low_result = shifted.orchestrator.handle_track_change("t").await;

    let high_result = high_result.published().unwrap();
    let low_result = low_result.published().unwrap();
    assert_eq!(high_result.metadata.tier, QualityTier::High);
    // Two blended samples instead of six
    assert!(!high_result.same_colors(low_result));
}

#[tokio::test]
async fn test_superseded_generation_never_publishes() {
    helpers::init_test_logging();
    let extractor = Arc::new(GatedExtractor::new(lavender_samples()));
    extractor.gate("first");
    let harness = Harness::new(extractor.clone());
    let mut events = harness.bus.subscribe();

    let orchestrator = Arc::clone(&harness.orchestrator);
    let first = tokio::spawn(async move { orchestrator.handle_track_change("first").await });
    while harness.orchestrator.current_sequence() < 1 {
        tokio::task::yield_now().await;
    }

    let second = harness.orchestrator.handle_track_change("second").await;
    assert!(matches!(second, CycleOutcome::Published(_)));

    extractor.release("first");
    assert_eq!(first.await.unwrap(), CycleOutcome::Stale { sequence: 1 });

    assert_eq!(harmonized_sequences(&drain(&mut events)), vec![2]);
    let stats = harness.orchestrator.stats();
    assert_eq!(stats.cycles_started, 2);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.stale_discarded, 1);
}

#[tokio::test]
async fn test_rapid_churn_publishes_only_latest() {
    let extractor = Arc::new(GatedExtractor::new(six_samples()));
    let tracks = ["t1", "t2", "t3", "t4"];
    for track in tracks {
        extractor.gate(track);
    }
    let harness = Harness::new(extractor.clone());
    let mut events = harness.bus.subscribe();

    let mut pending = Vec::new();
    for track in tracks {
        let orchestrator = Arc::clone(&harness.orchestrator);
        pending.push(tokio::spawn(async move { orchestrator.handle_track_change(track).await }));
    }
    while harness.orchestrator.current_sequence() < tracks.len() as u64 {
        tokio::task::yield_now().await;
    }

    let latest = harness.orchestrator.handle_track_change("t5").await;
    assert!(latest.published().is_some());

    for track in tracks.iter().rev() {
        extractor.release(track);
    }
    for handle in pending {
        assert!(matches!(handle.await.unwrap(), CycleOutcome::Stale { .. }));
    }

    assert_eq!(harmonized_sequences(&drain(&mut events)), vec![5]);
}

#[tokio::test(start_paused = true)]
async fn test_debounce_drops_superseded_track_before_extraction() {
    let harness = Harness::with(
        Arc::new(StaticExtractor::new(lavender_samples())),
        Arc::new(NeutralFeatures),
        OrchestratorConfig {
            debounce: Duration::from_millis(200),
            ..Default::default()
        },
    );
    let mut events = harness.bus.subscribe();

    let orchestrator = Arc::clone(&harness.orchestrator);
    let first = tokio::spawn(async move { orchestrator.handle_track_change("skipped").await });
    while harness.orchestrator.current_sequence() < 1 {
        tokio::task::yield_now().await;
    }
    let second = harness.orchestrator.handle_track_change("kept").await;

    assert!(second.published().is_some());
    assert_eq!(first.await.unwrap(), CycleOutcome::Stale { sequence: 1 });

    let events = drain(&mut events);
    let extracted: Vec<u64> = events
        .iter()
        .filter(|e| matches!(e, TintEvent::ColorsExtracted { .. }))
        .filter_map(|e| e.sequence())
        .collect();
    assert_eq!(extracted, vec![2]);
}

#[tokio::test]
async fn test_music_features_select_music_strategy() {
    let features = PartialFeatures {
        energy: Some(0.9),
        valence: Some(0.8),
        tempo: Some(128.0),
        genre: Some("EDM".to_string()),
    };
    let harness = Harness::with(
        Arc::new(StaticExtractor::new(lavender_samples())),
        Arc::new(FixedFeatures(features)),
        OrchestratorConfig::default(),
    );

    let outcome = harness.orchestrator.handle_track_change("club").await;
    assert_eq!(outcome.published().unwrap().metadata.strategy_name, "music-reactive");

    let muted = Harness::with(
        Arc::new(StaticExtractor::new(lavender_samples())),
        Arc::new(FixedFeatures(PartialFeatures {
            energy: Some(0.9),
            ..Default::default()
        })),
        OrchestratorConfig {
            user: UserConfig {
                music_reactive: false,
                ..Default::default()
            },
            ..Default::default()
        },
    );
    let outcome = muted.orchestrator.handle_track_change("club").await;
    assert_eq!(outcome.published().unwrap().metadata.strategy_name, "weighted-blend");
}

#[test]
fn test_sink_never_shows_mixed_results() {
    let sink = MemorySink::new();
    let mut authority = StateAuthority::new(sink.clone(), Arc::new(EventBus::new(4)), DEFAULT_PREFIX);

    let a = DefaultPaletteStrategy::new().palette(uuid::Uuid::nil(), QualityTier::High);
    let mut b = a.clone();
    for color in b.processed_colors.values_mut() {
        *color = Rgb::new(255 - color.r, 255 - color.g, 255 - color.b);
    }
    let map_a = variable_map(DEFAULT_PREFIX, &a);
    let map_b = variable_map(DEFAULT_PREFIX, &b);
    let done = AtomicBool::new(false);

    std::thread::scope(|scope| {
        let reader = scope.spawn(|| {
            let mut observed = 0;
            loop {
                let finished = done.load(Ordering::Acquire);
                let snapshot = sink.snapshot();
                assert!(
                    snapshot.is_empty() || snapshot == map_a || snapshot == map_b,
                    "sink showed a partial commit"
                );
                observed += 1;
                if finished {
                    break observed;
                }
            }
        });

        for i in 0..500 {
            let result = if i % 2 == 0 { &a } else { &b };
            authority.apply_color_result(result);
        }
        done.store(true, Ordering::Release);
        assert!(reader.join().unwrap() > 0);
    });

    assert_eq!(authority.stats().commits, 500);
}
