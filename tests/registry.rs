use refrain::prelude::*;
use refrain::test::{capturing_registry, capturing_registry_with, drain};
use refrain::{ClientConfig, ConfigProfile, ErrorKind, MetricsConfig, MetricsFactory, MetricsRegistry};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

fn unicorn() -> ClientConfig {
    ClientConfig::default()
        .with_namespace("unicorn")
        .with_server_label("prod-fe1")
}

#[test]
fn test_equal_configs_same_client() {
    let (_rx, registry) = capturing_registry();
    let a = registry.get_or_create(&unicorn()).unwrap();
    let b = registry.get_or_create(&unicorn()).unwrap();

    assert!(Arc::ptr_eq(&a, &b));
    assert!(Arc::ptr_eq(a.gauge_cache(), b.gauge_cache()));
    registry.reset_all();
}

#[test]
fn test_gauges_from_all_clients_share_cache() {
    let (rx, registry) = capturing_registry();
    let a = registry
        .get_or_create(&unicorn().with_cluster_name("west"))
        .unwrap();
    let b = registry.get_or_create(&unicorn()).unwrap();

    a.gauge("workers", 4u64).unwrap();
    b.gauge("memory", 128000u64).unwrap();
    drain(&rx);

    assert_eq!(2, registry.gauge_cache(&unicorn()).unwrap().report());
    assert_eq!(
        vec!["unicorn.memory.gauge.prod-fe1:128000|g\nunicorn.workers.gauge.prod-fe1:4|g"],
        drain(&rx)
    );
    registry.reset_all();
}

#[test]
fn test_one_reporter_per_key() {
    let (rx, registry) = capturing_registry_with(|b| b.report_interval(Duration::from_millis(50)));
    let client = registry.get_or_create(&unicorn()).unwrap();
    for _ in 0..5 {
        registry.get_or_create(&unicorn()).unwrap();
    }

    client.gauge("memory", 128000u64).unwrap();
    drain(&rx);

    let stats = client.gauge_cache().reporter_stats().unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    while stats.cycles() < 2 && Instant::now() < deadline {
        thread::sleep(Duration::from_millis(10));
    }
    registry.shutdown();

    let cycles = stats.cycles() as usize;
    let sent = drain(&rx);
    assert!(cycles >= 2);
    assert_eq!(1, registry.gauge_caches().reporters_started());
    // At most one datagram per cycle, not one per registration
    assert!(!sent.is_empty());
    assert!(sent.len() <= cycles);
}

#[test]
fn test_background_reports_keep_latest_value() {
    let (rx, registry) = capturing_registry_with(|b| b.report_interval(Duration::from_millis(20)));
    let client = registry.get_or_create(&unicorn()).unwrap();
    client.gauge("queue", 1u64).unwrap();
    client.gauge("queue", 2u64).unwrap();
    drain(&rx);

    let received = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    registry.reset_all();

    assert_eq!(b"unicorn.queue.gauge.prod-fe1:2|g".to_vec(), received);
}

#[test]
fn test_reset_all_forgets_clients() {
    let (_rx, registry) = capturing_registry();
    let before = registry.get_or_create(&unicorn()).unwrap();
    registry.reset_all();
    let after = registry.get_or_create(&unicorn()).unwrap();

    assert!(!Arc::ptr_eq(&before, &after));
    assert!(before.increment("still.works").is_ok());
    // Only the new cache is re-published in the background
    assert!(!before.gauge_cache().is_reporting());
    assert!(after.gauge_cache().is_reporting());
    registry.reset_all();
}

#[test]
fn test_factory_with_profiles() {
    let (rx, registry) = capturing_registry();
    let config = MetricsConfig::builder()
        .service_name("billing")
        .cluster_name("west")
        .server_name("prod-fe1")
        .profile(
            "batch",
            ConfigProfile {
                sub_server_name: Some("worker3".to_string()),
                ..ConfigProfile::default()
            },
        )
        .build()
        .unwrap();
    let factory = MetricsFactory::new(Arc::new(registry), Arc::new(config));

    factory.metrics().unwrap().increment("invoices").unwrap();
    factory
        .metrics_for(Some("batch"), Some("billing.jobs"))
        .unwrap()
        .increment("runs")
        .unwrap();

    assert_eq!(
        vec![
            "west.billing.invoices.counter.prod-fe1:1|c",
            "billing.jobs.runs.counter.prod-fe1.worker3:1|c",
        ],
        drain(&rx)
    );
    factory.registry().reset_all();
}

#[test]
fn test_unconfigured_service_name() {
    let registry = MetricsRegistry::new();
    let err = registry.client_for(&MetricsConfig::default(), None, None).unwrap_err();

    assert_eq!(ErrorKind::Configuration, err.kind());
    assert!(registry.is_empty());
}
