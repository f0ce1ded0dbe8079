// SPDX-License-Identifier: Apache-2.0 OR MIT
//! End-to-end behavior of the logging pipeline through a capture transport:
//! record format, filtering, overrides, rate limiting, config application.

use std::sync::Arc;

use taglog::{
    log_debug, log_error, log_info, BackendKind, Level, LogBackend, Logger, LoggerConfig,
    MemTransport, NonBlockingBackend,
};

fn capture_logger() -> (Logger, Arc<MemTransport>) {
    let transport = MemTransport::unbounded();
    let backend = Arc::new(NonBlockingBackend::new(Arc::clone(&transport)));
    (Logger::with_backend(backend), transport)
}

#[test]
fn test_record_wire_format() {
    let (logger, transport) = capture_logger();
    log_error!(logger, "wifi", "link down after {} retries", 3);

    let text = transport.text();
    // [millis][thread][E] tag: message\r\n
    assert!(text.ends_with("[E] wifi: link down after 3 retries\r\n"), "{text:?}");

    let millis_field = &text[1..text.find(']').unwrap()];
    assert!(millis_field.chars().all(|c| c.is_ascii_digit()));

    // Test threads are named after the test, so the second field is non-empty
    let rest = &text[text.find(']').unwrap() + 1..];
    assert!(rest.starts_with('['));
    let thread_field = &rest[1..rest.find(']').unwrap()];
    assert!(!thread_field.is_empty());
}

#[test]
fn test_messages_above_threshold_suppressed() {
    let (logger, transport) = capture_logger();
    logger.set_level(Level::Warn);

    log_info!(logger, "app", "not this one");
    log_debug!(logger, "app", "nor this one");
    assert!(transport.is_empty());

    log_error!(logger, "app", "this one");
    assert!(transport.text().contains("this one"));
}

#[test]
fn test_tag_override_raises_and_lowers() {
    let (logger, transport) = capture_logger();
    logger.set_level(Level::Info);
    logger.set_tag_level("modbus", Level::Verbose);
    logger.set_tag_level("heartbeat", Level::Error);

    logger.log(Level::Verbose, "modbus", format_args!("raised visible"));
    logger.log(Level::Info, "heartbeat", format_args!("lowered hidden"));
    logger.log(Level::Verbose, "other", format_args!("global hidden"));

    let text = transport.text();
    assert!(text.contains("raised visible"));
    assert!(!text.contains("hidden"));
}

#[test]
fn test_clearing_overrides_restores_global() {
    let (logger, transport) = capture_logger();
    logger.set_level(Level::Info);
    logger.set_tag_level("app", Level::Error);

    log_info!(logger, "app", "suppressed");
    logger.clear_tag_levels();
    log_info!(logger, "app", "restored");

    let text = transport.text();
    assert!(!text.contains("suppressed"));
    assert!(text.contains("restored"));
}

#[test]
fn test_rate_limit_drops_and_counts() {
    let transport = MemTransport::unbounded();
    let logger = Logger::with_backend(Arc::new(NonBlockingBackend::new(Arc::clone(&transport))));
    logger.configure(&LoggerConfig {
        default_level: Level::Info,
        enable_logging: true,
        max_logs_per_second: 10,
        backend: BackendKind::Custom,
        tag_levels: Vec::new(),
    });

    for i in 0..50 {
        log_info!(logger, "burst", "message {}", i);
    }

    assert_eq!(transport.text().matches("message").count(), 10);
    assert_eq!(logger.stats().rate_dropped, 40);
}

#[test]
fn test_direct_log_survives_exhausted_window() {
    let (logger, transport) = capture_logger();
    logger.configure(&LoggerConfig {
        max_logs_per_second: 1,
        backend: BackendKind::Custom,
        ..LoggerConfig::default()
    });

    log_info!(logger, "app", "consumes the window");
    log_info!(logger, "app", "rate dropped");
    logger.log_direct(Level::Error, "app", format_args!("shutdown in progress"));

    let text = transport.text();
    assert!(text.contains("consumes the window"));
    assert!(!text.contains("rate dropped"));
    assert!(text.contains("shutdown in progress"));
}

#[test]
fn test_inline_and_no_newline_output() {
    let (logger, transport) = capture_logger();
    logger.log_no_newline(Level::Info, "boot", format_args!("loading"));
    logger.log_inline(".");
    logger.log_inline(".");
    logger.log_inline(" ok\r\n");

    let text = transport.text();
    assert!(text.ends_with("boot: loading.. ok\r\n"), "{text:?}");
}

#[test]
fn test_configure_from_json5() {
    let (logger, transport) = capture_logger();
    let config = LoggerConfig::parse(
        r#"{
            default_level: "debug",
            max_logs_per_second: 0,
            backend: "custom", // keep the capture backend installed
            tag_levels: [
                { tag: "noisy", level: "error" },
            ],
        }"#,
    )
    .unwrap();
    logger.configure(&config);

    assert!(logger.is_configured());
    log_debug!(logger, "app", "debug visible");
    log_info!(logger, "noisy", "override hidden");

    let text = transport.text();
    assert!(text.contains("debug visible"));
    assert!(!text.contains("override hidden"));
}

#[test]
fn test_reconfigure_replaces_tag_overrides() {
    let (logger, transport) = capture_logger();
    let mut first = LoggerConfig {
        backend: BackendKind::Custom,
        ..LoggerConfig::default()
    };
    first.add_tag_level("old", Level::Error);
    logger.configure(&first);
    assert_eq!(logger.tag_level("old"), Level::Error);

    let mut second = LoggerConfig {
        backend: BackendKind::Custom,
        ..LoggerConfig::default()
    };
    second.add_tag_level("new", Level::Verbose);
    logger.configure(&second);

    // First config's override is gone, not merged
    assert_eq!(logger.tag_level("old"), Level::Info);
    assert_eq!(logger.tag_level("new"), Level::Verbose);

    log_info!(logger, "old", "back to global");
    assert!(transport.text().contains("back to global"));
}

#[test]
fn test_multiple_loggers_are_independent() {
    let (a, ta) = capture_logger();
    let (b, tb) = capture_logger();
    a.set_level(Level::Error);
    b.set_level(Level::Verbose);

    log_info!(a, "app", "hidden on a");
    log_info!(b, "app", "visible on b");

    assert!(ta.is_empty());
    assert!(tb.text().contains("visible on b"));
}

#[test]
fn test_fanout_to_multiple_backends() {
    let (logger, primary) = capture_logger();
    let secondary = MemTransport::unbounded();
    let secondary_backend: Arc<dyn LogBackend> =
        Arc::new(NonBlockingBackend::new(Arc::clone(&secondary)));
    logger.add_backend(Arc::clone(&secondary_backend));

    log_info!(logger, "app", "both places");
    assert!(primary.text().contains("both places"));
    assert!(secondary.text().contains("both places"));

    logger.remove_backend(&secondary_backend);
    log_info!(logger, "app", "one place");
    assert!(!secondary.text().contains("one place"));
    assert!(primary.text().contains("one place"));
}
