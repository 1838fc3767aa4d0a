use razor::config::{Deliverable, Engagement};
use razor::ConfigError;

const FULL: &str = r#"
name: q3-external
client: Acme
scope:
  targets: ["app.acme.test", "https://portal.acme.test"]
  include_ports: [80, 443, 8443]
  max_hosts: 2
  allow_intrusive: false
  time_window:
    start: "2025-09-01T19:00:00Z"
    end: "2025-09-02T06:00:00Z"
limits:
  rps_per_host: 5
  total_requests_per_host: 200
  concurrency: 8
  connect_timeout_s: 3
  request_timeout_s: 6
  retries: 2
report:
  deliverables: [json_findings]
  redactions: true
  cvss: "v3.1"
  out_dir: ""
notes:
  stack_hints: ["nginx"]
  contacts: ["soc@acme.test"]
  tags: ["prod"]
"#;

#[test]
fn loads_full_engagement_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("acme.yaml");
    std::fs::write(&path, FULL).unwrap();

    let e = Engagement::load(&path).unwrap();
    assert_eq!(e.scope.targets.len(), 2);
    assert_eq!(e.scope.include_ports, vec![80, 443, 8443]);
    assert_eq!(e.scope.max_hosts, 2);
    assert!(e.scope.time_window.is_set());
    assert_eq!(e.limits.rps_per_host, 5);
    assert_eq!(e.limits.retries, 2);
    assert_eq!(e.report.deliverables, vec![Deliverable::JsonFindings]);
    assert_eq!(e.notes.tags, vec!["prod"]);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = Engagement::load(dir.path().join("nope.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn negative_limits_do_not_parse() {
    let raw = FULL.replace("retries: 2", "retries: -1");
    assert!(matches!(Engagement::from_yaml(&raw), Err(ConfigError::Parse(_))));
}
