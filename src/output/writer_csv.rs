use crate::probe::outcome::ProbeOutcome;
use crate::utils::redact_url;
use csv::Writer;
use std::fs::File;
use std::path::Path;

pub fn write_csv(path: &Path, items: &[ProbeOutcome], redact: bool) -> anyhow::Result<()> {
    let f = File::create(path)?;
    let mut w = Writer::from_writer(f);
    w.write_record(["status", "endpoint", "host", "elapsed_ms", "attempts"])?;
    for it in items {
        let endpoint = if redact { redact_url(&it.endpoint) } else { it.endpoint.clone() };
        w.write_record(&[
            it.status().map(|s| s.to_string()).unwrap_or_default(),
            endpoint,
            it.host.clone(),
            it.elapsed_ms.to_string(),
            it.attempts.to_string(),
        ])?;
    }
    w.flush()?;
    Ok(())
}
