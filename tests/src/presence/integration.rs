#![cfg(test)]
use std::net::Ipv4Addr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use arpcast_common::config::{Config, ConfigError, Mode};
use arpcast_common::device::Observation;
use arpcast_core::driver::ScanLoop;
use arpcast_core::scanner::ScanError;

use crate::support::{config, count_warnings, RecordingPublisher, ScriptedScanner};

const MQTT: &str = r#"{ "ip": "127.0.0.1", "port": 1883, "username": "", "password": "",
    "topic": "presence", "client_id": "arpcast" }"#;

fn targets_config(targets: &str) -> String {
    format!(
        r#"{{ "mode": "targets", "interval": 60, "interface": "eth0",
             "mqtt": {MQTT}, "targets": {targets} }}"#
    )
}

fn all_config() -> String {
    format!(r#"{{ "mode": "all", "interval": 60, "interface": "eth0", "mqtt": {MQTT} }}"#)
}

fn router() -> Observation {
    Observation::new(Ipv4Addr::new(192, 168, 1, 1), "AA:BB:CC:DD:EE:FF", "Acme")
}

/// Scenario 1: a configured target answers and is reported under its name.
#[tokio::test]
async fn present_target_is_published_with_its_name() {
    let scanner = Arc::new(ScriptedScanner::new(vec![Ok(vec![router()])]));
    let publisher = Arc::new(RecordingPublisher::default());
    let cfg = config(&targets_config(
        r#"[{"mac": "AA:BB:CC:DD:EE:FF", "identifier": "router"}]"#,
    ));
    let mut scan_loop = ScanLoop::new(cfg, scanner, publisher.clone());

    let report = scan_loop.run_tick().await.unwrap();

    assert_eq!(report.mode, Mode::Targets);
    assert_eq!(report.published, 1);
    let messages = publisher.json();
    assert_eq!(messages.len(), 1);
    let message = &messages[0];
    assert_eq!(message["name"], "router");
    assert_eq!(message["ip"], "192.168.1.1");
    assert_eq!(message["mac"], "AA:BB:CC:DD:EE:FF");
    assert_eq!(message["vendor"], "Acme");
    assert_eq!(message["last_seen"].as_str().unwrap().len(), 19);
    assert!(publisher.payloads()[0].starts_with(r#"{"name":"router","ip":"#));
}

/// Scenario 2: nothing answers, nothing is published, one warning.
#[tokio::test]
async fn empty_scan_publishes_nothing_and_warns_once() {
    let (warnings, _guard) = count_warnings();
    let scanner = Arc::new(ScriptedScanner::new(vec![Ok(Vec::new())]));
    let publisher = Arc::new(RecordingPublisher::default());
    let cfg = config(&targets_config(
        r#"[{"mac": "AA:BB:CC:DD:EE:FF", "identifier": "router"}]"#,
    ));
    let mut scan_loop = ScanLoop::new(cfg, scanner, publisher.clone());

    let report = scan_loop.run_tick().await.unwrap();

    assert_eq!(report.published, 0);
    assert!(publisher.payloads().is_empty());
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

/// Scenario 3: inventory mode reports every device, none with a name.
#[tokio::test]
async fn inventory_mode_publishes_every_device_without_name() {
    let scanner = Arc::new(ScriptedScanner::new(vec![Ok(vec![
        router(),
        Observation::new(Ipv4Addr::new(192, 168, 1, 20), "11:22:33:44:55:66", "Unknown"),
    ])]));
    let publisher = Arc::new(RecordingPublisher::default());
    let mut scan_loop = ScanLoop::new(config(&all_config()), scanner, publisher.clone());

    let report = scan_loop.run_tick().await.unwrap();

    assert_eq!(report.published, 2);
    let messages = publisher.json();
    assert_eq!(messages.len(), 2);
    assert!(messages.iter().all(|m| m.get("name").is_none()));
    assert_eq!(messages[1]["ip"], "192.168.1.20");
}

#[tokio::test]
async fn target_macs_match_regardless_of_format() {
    let scanner = Arc::new(ScriptedScanner::new(vec![Ok(vec![
        Observation::new(Ipv4Addr::new(10, 0, 0, 4), "aa:bb:cc:dd:ee:ff", "Acme"),
        Observation::new(Ipv4Addr::new(10, 0, 0, 5), "00:11:22:33:44:55", "Acme"),
    ])]));
    let publisher = Arc::new(RecordingPublisher::default());
    let cfg = config(&targets_config(
        r#"[{"mac": "AA-BB-CC-DD-EE-FF", "identifier": "router"},
            {"mac": "0011.2233.4455", "identifier": "phone"}]"#,
    ));
    let mut scan_loop = ScanLoop::new(cfg, scanner, publisher.clone());

    scan_loop.run_tick().await.unwrap();

    let names: Vec<String> = publisher
        .json()
        .iter()
        .map(|m| m["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["router", "phone"]);
}

#[test]
fn targets_mode_without_targets_never_starts() {
    let err = Config::from_json(&targets_config("[]")).unwrap_err();
    assert!(matches!(err, ConfigError::NoTargets));
}

#[tokio::test(start_paused = true)]
async fn loop_keeps_going_after_a_failed_scan() {
    let scanner = Arc::new(ScriptedScanner::new(vec![
        Err(ScanError::Task("interface vanished".into())),
        Ok(vec![router()]),
    ]));
    let publisher = Arc::new(RecordingPublisher::default());
    let cfg = config(&targets_config(
        r#"[{"mac": "AA:BB:CC:DD:EE:FF", "identifier": "router"}]"#,
    ));
    let scan_loop = ScanLoop::new(cfg, scanner.clone(), publisher.clone());

    let handle = tokio::spawn(scan_loop.run());
    tokio::time::sleep(Duration::from_secs(90)).await;
    handle.abort();

    assert_eq!(scanner.calls(), 2);
    assert_eq!(publisher.payloads().len(), 1);
}

#[tokio::test]
async fn every_cycle_reports_again() {
    let scanner = Arc::new(ScriptedScanner::new(vec![
        Ok(vec![router()]),
        Ok(vec![router()]),
    ]));
    let publisher = Arc::new(RecordingPublisher::default());
    let cfg = config(&targets_config(
        r#"[{"mac": "AA:BB:CC:DD:EE:FF", "identifier": "router"}]"#,
    ));
    let mut scan_loop = ScanLoop::new(cfg, scanner, publisher.clone());

    let first = scan_loop.run_tick().await.unwrap();
    let second = scan_loop.run_tick().await.unwrap();

    assert_eq!((first.tick, second.tick), (1, 2));
    assert_eq!(publisher.payloads().len(), 2);
}

#[test]
fn shipped_example_config_loads() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../config.example.json");
    let cfg = Config::load(&path).unwrap();

    assert_eq!(cfg.mode, Mode::Targets);
    assert_eq!(cfg.targets[0].identifier, "router");
    assert_eq!(cfg.reconnect.max_attempts, 10);
}
