// Engine end-to-end: record -> tiers, roll-ups, events; ordering and value hygiene

mod common;

use common::{T0, feed, test_config, values};
use tierstat::engine::Engine;
use tierstat::models::{Sample, Severity, Tier};

#[test]
fn alternating_load_end_to_end() {
    let mut config = test_config("unused.json");
    config.tiers.finest.capacity = 20;
    let engine = Engine::new("pressure", config);
    feed(&engine, T0, 10.0, 25, |i| if i % 2 == 0 { 10.0 } else { 95.0 });

    assert_eq!(engine.tier_len(Tier::Finest), 20);
    let h = engine.history_at("finest", T0 + 250.0);
    let epochs = h.samples.epochs();
    assert_eq!(epochs.first(), Some(&(T0 + 50.0)));
    assert_eq!(epochs.last(), Some(&(T0 + 240.0)));
    assert_eq!(h.stats.max("cpu"), Some(95.0));
    assert_eq!(h.stats.min("cpu"), Some(10.0));

    let events = engine.events();
    assert_eq!(events.len(), 12);
    assert!(events.iter().all(|e| e.metric == "cpu" && e.severity == Severity::Critical));
    assert!(events.iter().any(|e| e.value == 95.0));

    // Minute roll-ups at T0+60, +120, +180, +240.
    assert_eq!(engine.tier_len(Tier::Hourly), 4);
    let hourly = engine.history_at("hourly", T0 + 250.0);
    assert_eq!(hourly.stats.max("cpu"), Some(95.0));
    assert_eq!(hourly.stats.min("cpu"), Some(10.0));
}

#[test]
fn record_values_attaches_composite_score() {
    let engine = Engine::new("pressure", test_config("unused.json"));
    let outcome = engine.record_values(T0, values(&[("cpu", 95.0), ("memory", 40.0)]));
    assert!(outcome.accepted);
    // cpu 50 × 1.0 + memory 50 × 0.25
    assert_eq!(engine.latest_sample().unwrap().score, 62.5);
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].severity, Severity::Critical);
}

#[test]
fn record_reports_promotions_on_boundary_crossings() {
    let engine = Engine::new("pressure", test_config("unused.json"));
    let mut promoted = Vec::new();
    for k in 0..=30 {
        let outcome = engine.record_values(T0 + 10.0 * k as f64, values(&[("cpu", 20.0)]));
        promoted.push(outcome.promoted);
    }
    assert!(promoted[0].is_empty());
    assert!(promoted[5].is_empty());
    assert_eq!(promoted[6], vec![Tier::Hourly]);
    // T0 + 300: minute and five-minute boundaries close together.
    assert_eq!(promoted[30], vec![Tier::Hourly, Tier::Daily]);
}

#[test]
fn out_of_order_sample_is_rejected() {
    let engine = Engine::new("pressure", test_config("unused.json"));
    feed(&engine, T0, 10.0, 5, |_| 95.0);
    let before = engine.event_count();

    let outcome = engine.record_values(T0 + 15.0, values(&[("cpu", 99.0)]));
    assert!(!outcome.accepted);
    assert!(outcome.events.is_empty());
    assert_eq!(engine.tier_len(Tier::Finest), 5);
    assert_eq!(engine.event_count(), before);
    assert_eq!(engine.latest_sample().unwrap().epoch, T0 + 40.0);

    // Equal epoch is not older than the latest sample.
    assert!(engine.record_values(T0 + 40.0, values(&[("cpu", 1.0)])).accepted);
}

#[test]
fn non_finite_values_are_dropped_and_bad_epochs_rejected() {
    let engine = Engine::new("pressure", test_config("unused.json"));
    let outcome = engine.record_values(T0, values(&[("cpu", f64::NAN), ("memory", 85.0)]));
    assert!(outcome.accepted);
    let latest = engine.latest_sample().unwrap();
    assert_eq!(latest.value("cpu"), None);
    assert_eq!(latest.value("memory"), Some(85.0));
    assert_eq!(outcome.events.len(), 1);
    assert_eq!(outcome.events[0].metric, "memory");

    let bad = engine.record(Sample::new(f64::INFINITY, values(&[("cpu", 1.0)]), 0.0));
    assert!(!bad.accepted);
    let bad = engine.record(Sample::new(T0 + 10.0, values(&[("cpu", 1.0)]), f64::NAN));
    assert!(!bad.accepted);
    assert_eq!(engine.tier_len(Tier::Finest), 1);
}

#[test]
fn tiers_respect_capacity_over_a_long_run() {
    let mut config = test_config("unused.json");
    config.tiers.hourly.capacity = 5;
    config.tiers.daily.capacity = 2;
    let engine = Engine::new("pressure", config);
    // Two hours of samples.
    feed(&engine, T0, 10.0, 720, |i| (i % 100) as f64);
    assert_eq!(engine.tier_len(Tier::Finest), 60);
    assert_eq!(engine.tier_len(Tier::Hourly), 5);
    assert_eq!(engine.tier_len(Tier::Daily), 2);
    assert_eq!(engine.tier_len(Tier::Weekly), 7);

    let hourly = engine.history_at("hourly", T0 + 7200.0).samples.epochs();
    assert!(hourly.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn event_log_outlives_finest_samples() {
    let engine = Engine::new("pressure", test_config("unused.json"));
    feed(&engine, T0, 10.0, 200, |i| if i == 0 { 99.0 } else { 5.0 });
    assert_eq!(engine.tier_len(Tier::Finest), 60);
    let events = engine.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].epoch, T0);
    assert_eq!(events[0].context.get("memory"), Some(&40.0));
}
