//! End-to-end pipeline test over a scratch registry: train the network on a
//! synthetic daily series, wrap it into the Champion composite, and forecast
//! from a recent window.

use btc_forecast::application::pipeline::{
    COMPOSITE_MODEL_NAME, RAW_MODEL_NAME, predict, train, wrap,
};
use btc_forecast::domain::market::OhlcRecord;
use btc_forecast::domain::ml::lstm::{Activation, LstmConfig};
use btc_forecast::infrastructure::registry::{
    ALIAS_CHALLENGER, ALIAS_CHAMPION, ModelRegistry,
};
use chrono::NaiveDate;

fn synthetic_series(n: usize) -> Vec<OhlcRecord> {
    (0..n)
        .map(|i| {
            let t = i as f64;
            let base = 55_000.0 + 80.0 * t + 900.0 * (t / 7.0).sin();
            OhlcRecord {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(i as u64),
                open: base,
                high: base + 500.0,
                low: base - 350.0,
                price: base + 150.0,
            }
        })
        .collect()
}

fn quick_training_config() -> LstmConfig {
    LstmConfig {
        input_size: 3,
        hidden_size: 8,
        output_size: 5,
        layer_activations: vec![Activation::Sigmoid, Activation::Tanh, Activation::Tanh],
        epochs: 10,
        batch_size: 16,
        learning_rate: 0.01,
        validation_split: 0.15,
        validation_freq: 5,
    }
}

fn scratch_registry(tag: &str) -> ModelRegistry {
    let root = std::env::temp_dir().join(format!(
        "btc_forecast_pipeline_test_{}_{tag}",
        std::process::id()
    ));
    std::fs::remove_dir_all(&root).ok();
    ModelRegistry::open(root).unwrap()
}

#[test]
fn train_wrap_predict_round_trip() {
    let registry = scratch_registry("round_trip");
    let records = synthetic_series(100);

    let train_report =
        train::train_from_records(&records, &registry, &quick_training_config()).unwrap();
    assert_eq!(train_report.version, 1);
    assert!(train_report.status.is_ready());
    assert!(train_report.train_loss.is_finite());
    assert!(train_report.validation_loss.is_some());

    let wrap_report = wrap::run(&registry).unwrap();
    assert_eq!(wrap_report.version, 1);
    assert_eq!(wrap_report.source_version, 1);
    assert!(wrap_report.status.is_ready());

    // Forecast from the 60 most recent rows: 46 derivable windows, 5
    // forecast periods each.
    let recent = &records[records.len() - 60..];
    let forecasts = predict::forecast_records(recent, &registry).unwrap();
    assert_eq!(forecasts.shape(), &[46, 5]);
    assert!(forecasts.iter().all(|v| v.is_finite()));

    // Forecasts are inverse-scaled back into price space, not normalized
    // units.
    assert!(forecasts.iter().any(|&v| v.abs() > 1.0));
}

#[test]
fn retraining_moves_challenger_and_champion_forward() {
    let registry = scratch_registry("retrain");
    let records = synthetic_series(80);
    let config = quick_training_config();

    train::train_from_records(&records, &registry, &config).unwrap();
    wrap::run(&registry).unwrap();

    let second = train::train_from_records(&records, &registry, &config).unwrap();
    assert_eq!(second.version, 2);
    let wrap_report = wrap::run(&registry).unwrap();
    assert_eq!(wrap_report.version, 2);
    assert_eq!(wrap_report.source_version, 2);

    let challenger = registry
        .version_by_alias(RAW_MODEL_NAME, ALIAS_CHALLENGER)
        .unwrap();
    assert_eq!(challenger.version, 2);
    let champion = registry
        .version_by_alias(COMPOSITE_MODEL_NAME, ALIAS_CHAMPION)
        .unwrap();
    assert_eq!(champion.version, 2);
}

#[test]
fn training_fails_loudly_on_short_series() {
    let registry = scratch_registry("short");
    let records = synthetic_series(10);
    let err = train::train_from_records(&records, &registry, &quick_training_config())
        .expect_err("10 rows cannot produce windows");
    assert!(err.to_string().contains("Not enough rows"));
}

#[test]
fn wrap_fails_without_a_challenger() {
    let registry = scratch_registry("no_challenger");
    assert!(wrap::run(&registry).is_err());
}
