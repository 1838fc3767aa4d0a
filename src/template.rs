use std::path::{Path, PathBuf};

use crate::error::TemplateError;

const TEMPLATE: &str = r#"# razor engagement definition. Fill in every required field before running.
name: ""                            # required. short job name, used in report titles and artifact paths
client: ""                          # required. client name as it should appear in deliverables

scope:
  targets: []                       # required. hosts, IPs or base URLs you are authorized to test
  include_ports: []                 # ports to scan. empty = built-in list of common ports
  max_hosts: 0                      # enumerate only the N hosts with the most open ports. 0 = all
  allow_intrusive: false            # true runs XSS/SQLi tooling against discovered endpoints
  time_window:                      # optional UTC window; the run refuses to start outside it
    start: ""                       # RFC 3339, e.g. "2025-09-01T19:00:00Z"
    end: ""                         # RFC 3339, e.g. "2025-09-02T06:00:00Z"

limits:
  rps_per_host: 2                   # requests per second per host
  total_requests_per_host: 1000     # hard ceiling per host for one run, retries included
  concurrency: 10                   # requests in flight across all hosts
  connect_timeout_s: 5              # TCP/TLS connect deadline
  request_timeout_s: 10             # full response deadline
  retries: 2                        # extra attempts after network errors, timeouts and 5xx
  retry_backoff_ms: 0               # base delay between retries (jittered). 0 = retry immediately

report:
  deliverables: []                  # any of: pdf_exec, html_tech, json_findings. empty = html_tech + json_findings
  redactions: true                  # strip credentials and query strings from reported URLs
  cvss: "v3.1"                      # only v3.1 is supported
  include_screenshots: true
  out_dir: ""                       # empty = ./artifacts/<client>/<name>

notes:
  stack_hints: []                   # e.g. "WordPress", "nginx", "AWS"
  contacts: []                      # who to call if something breaks
  tags: []                          # free-form labels
"#;

/// Write `<name>.yaml` into `dir` with an annotated engagement skeleton.
pub fn generate_template(dir: &Path, name: &str) -> Result<PathBuf, TemplateError> {
    if name.is_empty() || name.contains('.') {
        return Err(TemplateError::InvalidName(name.to_string()));
    }
    let path = dir.join(format!("{}.yaml", name));
    if path.exists() {
        return Err(TemplateError::AlreadyExists(path));
    }
    std::fs::write(&path, TEMPLATE)?;
    Ok(path)
}
