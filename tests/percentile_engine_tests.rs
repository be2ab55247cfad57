//! Integration tests for sample aggregation and percentile lookup

use chrono::{TimeZone, Utc};
use perfgate::report::{ReportSettings, RunReport};
use perfgate::sample::{Sample, SummarizerRecord};
use perfgate::stats::{PercentileList, ReportMode};
use std::sync::Arc;

fn at(ms: i64) -> chrono::DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).unwrap()
}

fn ok(ms: i64, duration: u64) -> Sample {
    Sample::new(at(ms), duration, true, "200", 1.0)
}

fn failed(ms: i64, duration: u64) -> Sample {
    Sample::new(at(ms), duration, false, "500", 0.25)
}

#[test]
fn test_rank_percentiles_on_ten_samples() {
    let report = RunReport::with_defaults("results.jtl");
    for (i, d) in [50u64, 10, 40, 30, 20, 100, 90, 60, 80, 70].iter().enumerate() {
        report.add_sample("api", ok(i as i64 * 10, *d));
    }

    assert_eq!(report.duration_at_percentile(0.0).unwrap(), 10);
    assert_eq!(report.duration_at_percentile(50.0).unwrap(), 50);
    assert_eq!(report.duration_at_percentile(90.0).unwrap(), 90);
    assert_eq!(report.duration_at_percentile(95.0).unwrap(), 90);
    assert_eq!(report.duration_at_percentile(100.0).unwrap(), 100);

    assert_eq!(report.min(), 10);
    assert_eq!(report.median(), 50);
    assert_eq!(report.p90(), 90);
    assert_eq!(report.max(), 100);
    assert_eq!(report.average(), 55.0);
}

#[test]
fn test_percentile_out_of_range_is_configuration_error() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("api", ok(0, 10));

    let err = report.duration_at_percentile(100.5).unwrap_err();
    assert!(err.is_configuration());
    assert!(report.duration_at_percentile(-0.1).is_err());
    assert!(report
        .endpoint_duration_at_percentile("api", 200.0)
        .unwrap()
        .is_err());
    assert!(report.endpoint_duration_at_percentile("nope", 50.0).is_none());
}

#[test]
fn test_empty_report() {
    let report = RunReport::with_defaults("results.jtl");
    assert_eq!(report.duration_at_percentile(50.0).unwrap(), 0);
    assert_eq!(report.error_percent(), 0.0);
    assert_eq!(report.throughput(), 0.0);
    assert!(report.average().is_nan());
}

#[test]
fn test_error_percent_rounding() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("api", failed(0, 10));
    report.add_sample("api", ok(10, 10));
    report.add_sample("api", ok(20, 10));
    assert_eq!(report.error_percent(), 33.333);
}

#[test]
fn test_throughput_over_span() {
    let report = RunReport::with_defaults("results.jtl");
    // 0ms..2000ms (last sample ends at 1000 + 1000)
    report.add_sample("api", ok(0, 100));
    report.add_sample("api", ok(500, 100));
    report.add_sample("api", ok(1000, 1000));
    report.add_sample("api", ok(1500, 100));
    assert_eq!(report.throughput(), 2.0);
}

#[test]
fn test_throughput_zero_span_returns_count() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("api", ok(0, 0));
    report.add_sample("api", ok(0, 0));
    report.add_sample("api", ok(0, 0));
    assert_eq!(report.throughput(), 3.0);
}

#[test]
fn test_exclude_failed_response_time() {
    let settings = ReportSettings {
        exclude_failed_response_time: true,
        ..Default::default()
    };
    let report = RunReport::new("results.jtl", settings).unwrap();
    report.add_sample("api", ok(0, 100));
    report.add_sample("api", failed(10, 30_000));

    assert_eq!(report.sample_count(), 2);
    // total timed duration over every request
    assert_eq!(report.average(), 50.0);
    assert_eq!(report.max(), 100);
    assert_eq!(report.error_percent(), 50.0);
}

#[test]
fn test_exclude_failed_response_time_all_failed() {
    let settings = ReportSettings {
        exclude_failed_response_time: true,
        ..Default::default()
    };
    let report = RunReport::new("results.jtl", settings).unwrap();
    report.add_sample("api", failed(0, 30_000));

    assert_eq!(report.average(), 0.0);
    assert_eq!(report.max(), 0);
    assert_eq!(report.error_percent(), 100.0);
}

#[test]
fn test_endpoint_keys_are_normalized() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("https://shop/cart/add", ok(0, 10));
    report.add_sample("shop/cart/add", ok(10, 30));

    assert_eq!(report.endpoint_keys(), vec!["shop_cart_add".to_string()]);
    assert_eq!(
        report.endpoint_labels(),
        vec!["https://shop/cart/add".to_string()]
    );
    assert!(report.has_endpoint("shop_cart_add"));
    assert_eq!(report.endpoint_samples("shop/cart/add").unwrap().len(), 2);
}

#[test]
fn test_inclusion_pattern_drops_samples() {
    let settings = ReportSettings {
        endpoint_pattern: Some("^api/".to_string()),
        ..Default::default()
    };
    let report = RunReport::new("results.jtl", settings).unwrap();
    assert!(report.add_sample("api/users", ok(0, 10)));
    assert!(!report.add_sample("static/logo.png", ok(0, 10)));
    assert!(!report.add_sample("  ", ok(0, 10)));
    assert_eq!(report.sample_count(), 1);
}

#[test]
fn test_invalid_pattern_rejected() {
    let settings = ReportSettings {
        endpoint_pattern: Some("([".to_string()),
        ..Default::default()
    };
    assert!(RunReport::new("results.jtl", settings).is_err());
}

#[test]
fn test_configured_percentiles_materialised() {
    let settings = ReportSettings {
        percentiles: PercentileList::parse("25, 75,99").unwrap(),
        ..Default::default()
    };
    let report = RunReport::new("results.jtl", settings).unwrap();
    for d in 1..=100u64 {
        report.add_sample("api", ok(d as i64, d));
    }

    let summary = report.summary();
    assert_eq!(summary.overall.percentiles.len(), 3);
    // 1..=100: rank index floor(100 * p / 100) - 1 holds the value p
    assert_eq!(summary.overall.percentile(25.0), Some(25));
    assert_eq!(summary.overall.percentile(75.0), Some(75));
    assert_eq!(summary.overall.percentile(99.0), Some(99));
    assert_eq!(summary.overall.percentile(50.0), None);
}

#[test]
fn test_summary_cache_invalidated_by_new_sample() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("api", ok(0, 10));

    let first = report.summary();
    let again = report.summary();
    assert!(Arc::ptr_eq(&first, &again));

    report.add_sample("api", ok(10, 30));
    let refreshed = report.summary();
    assert!(!Arc::ptr_eq(&first, &refreshed));
    assert_eq!(refreshed.overall.average, 20.0);
    assert_eq!(first.overall.average, 10.0);
}

#[test]
fn test_summarizer_error_percent_weighting() {
    let settings = ReportSettings {
        mode: ReportMode::Summarizer,
        ..Default::default()
    };
    let report = RunReport::new("summary.csv", settings).unwrap();
    let record = |err: f64| SummarizerRecord {
        samples: 100,
        error_percent: err,
        min_ms: 5,
        max_ms: 500,
    };
    report.add_sample("a", ok(0, 50).with_summarizer(record(10.0)));
    report.add_sample("a", ok(10, 60).with_summarizer(record(20.0)));
    report.add_sample("b", ok(20, 70).with_summarizer(record(30.0)));

    let summary = report.summary();
    // endpoint: mean of its records
    assert_eq!(summary.endpoint("a").unwrap().error_percent, 15.0);
    // run: sum over records divided by endpoint count
    assert_eq!(summary.overall.error_percent, 30.0);
}

#[test]
fn test_traffic_statistics() {
    let report = RunReport::with_defaults("results.jtl");
    report.add_sample("api", ok(0, 10));
    report.add_sample("api", failed(10, 10));

    let summary = report.summary();
    assert_eq!(summary.overall.total_traffic_kb, 1.25);
    assert_eq!(summary.overall.average_size_kb, 0.625);
}

#[test]
fn test_concurrent_producers() {
    let report = RunReport::with_defaults("results.jtl");
    std::thread::scope(|scope| {
        for worker in 0..4u64 {
            let report = &report;
            scope.spawn(move || {
                for i in 0..250u64 {
                    let endpoint = if i % 2 == 0 { "shared" } else { "own" };
                    report.add_sample(endpoint, ok(i as i64, worker * 1000 + i));
                    if i % 50 == 0 {
                        let _ = report.summary();
                    }
                }
            });
        }
    });

    assert_eq!(report.sample_count(), 1000);
    let summary = report.summary();
    assert_eq!(summary.endpoint("shared").unwrap().count, 500);
    assert_eq!(summary.endpoint("own").unwrap().count, 500);
    assert_eq!(summary.overall.min, 0);
    assert_eq!(summary.overall.max, 3249);
}
