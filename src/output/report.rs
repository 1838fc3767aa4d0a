use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::config::{Deliverable, Engagement};
use crate::output::findings::Findings;
use crate::probe::outcome::ProbeOutcome;
use crate::utils::redact_url;

#[derive(Debug, Serialize)]
struct FindingsDocument<'a> {
    engagement: &'a str,
    client: &'a str,
    generated_at: DateTime<Utc>,
    targets: &'a [String],
    tags: &'a [String],
    findings: &'a Findings,
}

/// Write every requested deliverable into `out_dir` and return the files produced.
pub fn write_deliverables(
    engagement: &Engagement,
    findings: &Findings,
    out_dir: &Path,
) -> anyhow::Result<Vec<PathBuf>> {
    let findings = if engagement.report.redactions { redacted(findings) } else { findings.clone() };
    let mut written = Vec::new();

    for deliverable in &engagement.report.deliverables {
        match deliverable {
            Deliverable::JsonFindings => {
                let path = out_dir.join("findings.json");
                let doc = FindingsDocument {
                    engagement: &engagement.name,
                    client: &engagement.client,
                    generated_at: Utc::now(),
                    targets: &engagement.scope.targets,
                    tags: &engagement.notes.tags,
                    findings: &findings,
                };
                std::fs::write(&path, serde_json::to_vec_pretty(&doc)?)?;
                written.push(path);
            }
            Deliverable::HtmlTech => {
                let path = out_dir.join("report.html");
                std::fs::write(&path, render_html(engagement, &findings))?;
                written.push(path);
            }
            Deliverable::PdfExec => {
                tracing::warn!("pdf_exec deliverable is not supported, skipping");
            }
        }
    }
    Ok(written)
}

fn redacted(findings: &Findings) -> Findings {
    let scrub = |items: &[ProbeOutcome]| -> Vec<ProbeOutcome> {
        items
            .iter()
            .map(|o| ProbeOutcome { endpoint: redact_url(&o.endpoint), ..o.clone() })
            .collect()
    };
    Findings {
        interesting: scrub(&findings.interesting),
        audit: scrub(&findings.audit),
        summary: findings.summary.clone(),
    }
}

fn render_html(engagement: &Engagement, findings: &Findings) -> String {
    let esc = |s: &str| html_escape::encode_text(s).to_string();
    let mut html = String::new();
    let _ = write!(
        html,
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{name}</title></head><body>\n\
         <h1>{name}</h1>\n<p>Client: {client}</p>\n",
        name = esc(&engagement.name),
        client = esc(&engagement.client),
    );

    let s = &findings.summary;
    let _ = writeln!(
        html,
        "<p>{} probes: {} responses, {} network failures, {} timeouts, {} skipped, {} cancelled</p>",
        s.total, s.responses, s.network_failures, s.timeouts, s.skipped, s.cancelled
    );

    html.push_str("<h2>Endpoints</h2>\n<table>\n<tr><th>Status</th><th>Endpoint</th><th>ms</th></tr>\n");
    for o in &findings.interesting {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            o.status().unwrap_or_default(),
            esc(&o.endpoint),
            o.elapsed_ms
        );
    }
    html.push_str("</table>\n");

    if !findings.audit.is_empty() {
        html.push_str("<h2>Not attempted</h2>\n<ul>\n");
        for o in &findings.audit {
            let _ = writeln!(html, "<li>{} ({:?})</li>", esc(&o.endpoint), o.kind);
        }
        html.push_str("</ul>\n");
    }
    html.push_str("</body></html>\n");
    html
}
