// Prometheus metrics definitions for the pokehunt backend.

use lazy_static::lazy_static;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};

lazy_static! {
    pub static ref REGISTRY: Registry = Registry::new();

    // ── Gauges ───────────────────────────────────────────────────────

    /// Whether the game switch is open (1) or closed (0).
    pub static ref GAME_OPEN: IntGauge =
        IntGauge::new("pokehunt_game_open", "Game switch open (1) or closed (0)").unwrap();

    // ── Counters ─────────────────────────────────────────────────────

    /// Total teams registered.
    pub static ref REGISTRATIONS_TOTAL: IntCounter =
        IntCounter::new("pokehunt_registrations_total", "Teams registered").unwrap();

    /// Total logins, by outcome (success, failure, game_over).
    pub static ref LOGINS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokehunt_logins_total", "Login attempts"),
        &["outcome"],
    )
    .unwrap();

    /// Total questions served (entry fee charged).
    pub static ref QUESTIONS_SERVED_TOTAL: IntCounter =
        IntCounter::new("pokehunt_questions_served_total", "Questions served").unwrap();

    /// Total answers scored, by outcome (correct, incorrect).
    pub static ref ANSWERS_TOTAL: IntCounterVec = IntCounterVec::new(
        Opts::new("pokehunt_answers_total", "Answers scored"),
        &["outcome"],
    )
    .unwrap();

    /// Total creature evolutions.
    pub static ref EVOLUTIONS_TOTAL: IntCounter =
        IntCounter::new("pokehunt_evolutions_total", "Creature evolutions").unwrap();

    /// Total pokecenter revives.
    pub static ref REVIVES_TOTAL: IntCounter =
        IntCounter::new("pokehunt_revives_total", "Pokecenter revives").unwrap();
}

/// Register all metrics with the custom registry. Call once at startup.
pub fn register_metrics() {
    let collectors: Vec<Box<dyn prometheus::core::Collector>> = vec![
        Box::new(GAME_OPEN.clone()),
        Box::new(REGISTRATIONS_TOTAL.clone()),
        Box::new(LOGINS_TOTAL.clone()),
        Box::new(QUESTIONS_SERVED_TOTAL.clone()),
        Box::new(ANSWERS_TOTAL.clone()),
        Box::new(EVOLUTIONS_TOTAL.clone()),
        Box::new(REVIVES_TOTAL.clone()),
    ];

    for c in collectors {
        REGISTRY.register(c).expect("failed to register metric");
    }
}

/// Serialize all registered metrics to the Prometheus text exposition format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer).unwrap();
    String::from_utf8(buffer).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gather_metrics_returns_string() {
        register_metrics();
        let output = gather_metrics();
        assert!(output.is_empty() || output.contains("pokehunt_"));
    }

    #[test]
    fn test_metric_increments() {
        GAME_OPEN.set(1);
        assert_eq!(GAME_OPEN.get(), 1);
        GAME_OPEN.set(0);

        REGISTRATIONS_TOTAL.inc();
        QUESTIONS_SERVED_TOTAL.inc();
        EVOLUTIONS_TOTAL.inc();
        REVIVES_TOTAL.inc();

        LOGINS_TOTAL.with_label_values(&["success"]).inc();
        ANSWERS_TOTAL.with_label_values(&["correct"]).inc();
        ANSWERS_TOTAL.with_label_values(&["incorrect"]).inc();
    }
}
