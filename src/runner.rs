use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{SecondsFormat, Utc};
use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Commands};
use razor::config::{format_ports, Engagement};
use razor::defaults::COMMON_ENDPOINTS;
use razor::output::{aggregate, write_csv, write_deliverables};
use razor::portscan::{web_targets, PortScanner, TcpConnectScanner};
use razor::probe::{deadline_token, Enumerator};

fn print_ascii_logo() {
    println!(r#"
     ____    _    _____ ___  ____
    |  _ \  / \  |__  // _ \|  _ \
    | |_) |/ _ \   / /| | | | |_) |
    |  _ </ ___ \ / /_| |_| |  _ <
    |_| \_\_/  \_\____|\___/|_| \_\

        scoped recon for authorized engagements
    "#);
}

fn init_logging(debug: bool, verbose: bool) {
    // Keep reqwest/hyper at INFO so probe debugging does not drown in connection logs.
    use tracing_subscriber::EnvFilter;
    let crate_level = if debug { "debug" } else if verbose { "info" } else { "warn" };
    let filter_str = format!("razor={crate},reqwest=info,hyper=info", crate = crate_level);
    let env_filter = EnvFilter::try_new(&filter_str).unwrap_or_else(|_| EnvFilter::new(crate_level));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(true)
        .with_target(false)
        .init();
}

fn spinner(msg: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")?);
    pb.set_message(msg);
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

pub async fn run_from_cli(cli: Cli) -> anyhow::Result<()> {
    init_logging(cli.debug, cli.verbose);

    match cli.command {
        Commands::Gen { name, dir } => {
            print_ascii_logo();
            let path = razor::template::generate_template(&dir, &name)?;
            println!("[+] Generated: {}", path.display());
        }
        Commands::Run { config, skip_portscan } => {
            run_engagement(config, skip_portscan).await?;
        }
    }
    Ok(())
}

async fn run_engagement(path: PathBuf, skip_portscan: bool) -> anyhow::Result<()> {
    let engagement = Engagement::load(&path)
        .with_context(|| format!("config error in {}", path.display()))?;
    let out_dir = engagement.out_dir();

    print_ascii_logo();
    print_plan(&engagement, &out_dir);

    let window = &engagement.scope.time_window;
    let now = Utc::now();
    if !window.contains(now) {
        bail!("{} is outside the authorized time window", now.to_rfc3339_opts(SecondsFormat::Secs, true));
    }

    // Ctrl-C stops dispatch; the window end does the same.
    let root = CancellationToken::new();
    {
        let root = root.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("interrupted, finishing with partial results");
                root.cancel();
            }
        });
    }
    let cancel = match window.end {
        Some(end) => {
            let remaining = (end - now).to_std().unwrap_or_default();
            deadline_token(&root, tokio::time::Instant::now() + remaining)
        }
        None => root.child_token(),
    };

    razor::utils::ensure_dir(&out_dir)?;
    let limits = engagement.limits.clone();

    // Phase 1: port scan and web gating
    let targets = if skip_portscan {
        engagement.scope.targets.clone()
    } else {
        println!("[*] Port scan ({} ports)...", engagement.scope.include_ports.len());
        let pb = spinner(format!("scanning {} target(s)", engagement.scope.targets.len()))?;
        let scanner = TcpConnectScanner::new(
            engagement.scope.include_ports.clone(),
            limits.connect_timeout(),
            limits.concurrency as usize,
        );
        let reports = tokio::select! {
            r = scanner.scan(&engagement.scope.targets) => r?,
            _ = cancel.cancelled() => Vec::new(),
        };
        pb.finish_and_clear();

        for host in &reports {
            println!("   {} ({}) open: {}", host.target, host.address, format_ports(&host.open_ports));
        }
        std::fs::write(out_dir.join("portscan.json"), serde_json::to_vec_pretty(&reports)?)?;
        web_targets(&reports, engagement.scope.max_hosts)
    };

    if targets.is_empty() {
        println!("[!] No web services found in scope, nothing to enumerate");
        return Ok(());
    }

    // Phase 2: endpoint enumeration
    println!("[*] Endpoint enumeration on {} web target(s)...", targets.len());
    let enumerator = Enumerator::new(limits)?;
    let pb = spinner(format!("probing {} endpoints", targets.len() * COMMON_ENDPOINTS.len()))?;
    let outcomes = enumerator.enumerate(&targets, COMMON_ENDPOINTS, &cancel).await?;
    pb.finish_and_clear();

    let findings = aggregate(&outcomes);
    for o in &findings.interesting {
        println!("   [{}] {} ({}ms)", o.status().unwrap_or_default(), o.endpoint, o.elapsed_ms);
    }
    let s = &findings.summary;
    println!(
        "[+] {} interesting endpoint(s) from {} probes ({} failed, {} timed out, {} skipped, {} cancelled)",
        findings.interesting.len(),
        s.total,
        s.network_failures,
        s.timeouts,
        s.skipped,
        s.cancelled
    );

    // Phase 3: reports
    write_csv(&out_dir.join("endpoints.csv"), &findings.interesting, engagement.report.redactions)?;
    for file in write_deliverables(&engagement, &findings, &out_dir)? {
        println!("[+] Wrote {}", file.display());
    }

    // Phase 4: intrusive checks, only when the scope allows them
    if engagement.scope.allow_intrusive {
        if cancel.is_cancelled() {
            tracing::warn!("skipping intrusive scans: run was cancelled");
        } else if !findings.interesting.is_empty() {
            println!("[*] Intrusive scans on {} endpoint(s)...", findings.interesting.len());
            let logs = razor::external::run_intrusive(&findings.interesting, &out_dir, &cancel)
                .await
                .context("tooling error")?;
            println!("[+] Intrusive scan logs: {}", logs.len());
            if cancel.is_cancelled() {
                println!("[!] Intrusive scans stopped early (interrupted or time window closed)");
            }
        }
    }
    Ok(())
}

fn print_plan(engagement: &Engagement, out_dir: &Path) {
    println!("Loaded config for {} ({})", engagement.name, engagement.client);
    println!("- Targets: {:?}", engagement.scope.targets);
    println!("- Include ports: {}", format_ports(&engagement.scope.include_ports));
    if let (Some(start), Some(end)) = (engagement.scope.time_window.start, engagement.scope.time_window.end) {
        println!(
            "- Time window (UTC): {} .. {}",
            start.to_rfc3339_opts(SecondsFormat::Secs, true),
            end.to_rfc3339_opts(SecondsFormat::Secs, true)
        );
    }
    println!("- Limits: {:?}", engagement.limits);
    println!("- Intrusive: {}", engagement.scope.allow_intrusive);
    println!("- Deliverables: {:?}", engagement.report.deliverables);
    println!("- Output dir: {}", out_dir.display());
    println!("\n{}\n", "-".repeat(60));
}
