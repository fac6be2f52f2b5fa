use anyhow::{Context, Result};
use clap::Parser;
use ctxaudit::audit::{run_audit, AuditReport};
use ctxaudit::cli::{AuditArgs, Cli, Command, DiffArgs, HealthArgs, OutputFormat, SummaryArgs};
use ctxaudit::config::AnalysisConfig;
use ctxaudit::diff::{diff_traces, DiffResult};
use ctxaudit::health::{score_session, score_trace, HealthScore};
use ctxaudit::loader::{load_file, load_path, TraceSet};
use ctxaudit::session_index::{latest_pair, select_session, IndexStatus};
use ctxaudit::summary::TraceSummary;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; `--debug` forces TRACE, otherwise RUST_LOG or warn
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::from_toml(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => AnalysisConfig::embedded_default().context("Embedded default config is invalid"),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_audit_text(report: &AuditReport) {
    println!("Status: {:?}", report.status);
    println!("Events Analyzed: {}", report.total_events_analyzed);
    println!(
        "Issues: {} (critical: {}, warning: {}, info: {})",
        report.summary.total_issues,
        report.summary.critical,
        report.summary.warning,
        report.summary.info
    );
    for issue in &report.issues {
        println!(
            "[{}] {}: {}",
            issue.severity.as_str().to_uppercase(),
            issue.type_name(),
            issue.message
        );
        println!("    -> {}", issue.remediation);
    }
}

fn print_health_text(label: &str, health: &HealthScore) {
    println!(
        "{}: {} ({:?}) calls={} errors={} pre={} post={}",
        label,
        health.score,
        health.status,
        health.inputs.total_calls,
        health.inputs.total_errors,
        health.inputs.pre_tool_use,
        health.inputs.post_tool_use
    );
}

fn print_diff_text(diff: &DiffResult, baseline: &str, current: &str) {
    println!("Comparing: {baseline} -> {current}");
    println!("  Added tools: {}", diff.summary.added_count);
    println!("  Removed tools: {}", diff.summary.removed_count);
    println!("  Changed tools: {}", diff.summary.changed_count);
    println!("  New errors: {}", diff.summary.new_errors_count);
    println!("  Resolved errors: {}", diff.summary.resolved_errors_count);
    if diff.has_regressions {
        println!("REGRESSIONS DETECTED");
    }
    for tool in &diff.added_tools {
        println!("+ {tool}");
    }
    for tool in &diff.removed_tools {
        println!("- {tool}");
    }
    for change in &diff.changed_tools {
        if let Some(count) = change.count {
            println!("~ {}: count {} -> {}", change.tool, count.from, count.to);
        }
        if let Some(errors) = change.errors {
            println!("~ {}: errors {} -> {}", change.tool, errors.from, errors.to);
        }
    }
    if !diff.new_errors.is_empty() {
        println!("NEW ERRORS: {}", diff.new_errors.join(", "));
    }
    if !diff.resolved_errors.is_empty() {
        println!("RESOLVED: {}", diff.resolved_errors.join(", "));
    }
    if !diff.sequence.identical {
        println!(
            "Tool call sequence differs ({} vs {} events)",
            diff.sequence.baseline_length, diff.sequence.current_length
        );
    }
    if let Some(index) = diff.event_sequence.first_difference {
        println!(
            "Event type sequence differs at event {} ({} vs {} events)",
            index, diff.event_sequence.baseline_length, diff.event_sequence.current_length
        );
    }
    for shift in &diff.duration_shifts {
        println!(
            "Duration shift {}: median {:.1}ms -> {:.1}ms (p={:.4})",
            shift.tool, shift.baseline_median_ms, shift.current_median_ms, shift.pvalue
        );
    }
}

fn run_audit_command(args: &AuditArgs, config: &mut AnalysisConfig, format: OutputFormat) -> Result<ExitCode> {
    args.apply(config);
    config.validate().map_err(anyhow::Error::msg)?;

    let trace = load_path(&args.path)
        .with_context(|| format!("Failed to open {}", args.path.display()))?;
    let index = args.path.is_dir().then(|| IndexStatus::read(&args.path));
    let report = run_audit(&trace, index.as_ref(), &config.audit);

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Text => print_audit_text(&report),
    }

    Ok(if report.has_critical() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn load_health_trace(args: &HealthArgs) -> Result<TraceSet> {
    if !args.path.is_dir() || args.per_session {
        return load_path(&args.path)
            .with_context(|| format!("Failed to open {}", args.path.display()));
    }

    let selected = select_session(&args.path, args.session.as_deref())?.with_context(|| {
        format!("No session traces found in {}", args.path.display())
    })?;
    tracing::info!(session = %selected.session_id, "scoring selected session");
    load_file(&selected.path)
        .with_context(|| format!("Failed to open {}", selected.path.display()))
}

fn run_health_command(args: &HealthArgs, config: &AnalysisConfig, format: OutputFormat) -> Result<ExitCode> {
    let trace = load_health_trace(args)?;
    let sessions = trace.sessions();

    if args.per_session {
        let scores: BTreeMap<&str, HealthScore> = sessions
            .iter()
            .map(|(&id, session)| (id, score_session(session, &config.health)))
            .collect();
        match format {
            OutputFormat::Json => print_json(&scores)?,
            OutputFormat::Text => {
                for (id, health) in &scores {
                    print_health_text(id, health);
                }
            }
        }
        return Ok(ExitCode::SUCCESS);
    }

    let health = match args.session.as_deref() {
        Some(id) if !args.path.is_dir() => {
            let session = sessions
                .get(id)
                .with_context(|| format!("Session {id} not found in {}", args.path.display()))?;
            score_session(session, &config.health)
        }
        _ => score_trace(&trace, &config.health),
    };

    match format {
        OutputFormat::Json => print_json(&health)?,
        OutputFormat::Text => print_health_text("Health", &health),
    }
    Ok(ExitCode::SUCCESS)
}

fn run_diff_command(args: &DiffArgs, config: &mut AnalysisConfig, format: OutputFormat) -> Result<ExitCode> {
    args.apply(config);

    let (baseline_path, current_path) = match (&args.baseline, &args.current, &args.traces_dir) {
        (Some(baseline), Some(current), _) => (baseline.clone(), current.clone()),
        (_, _, Some(dir)) => {
            if let Some(n) = args.last.filter(|&n| n != 2) {
                anyhow::bail!("--last {n} is not supported; only the last 2 traces can be compared");
            }
            latest_pair(dir)?
        }
        _ => anyhow::bail!("Specify two trace files or --traces-dir DIR"),
    };

    let baseline = load_file(&baseline_path)
        .with_context(|| format!("Failed to open {}", baseline_path.display()))?;
    let current = load_file(&current_path)
        .with_context(|| format!("Failed to open {}", current_path.display()))?;
    let diff = diff_traces(&baseline, &current, &config.diff);

    match format {
        OutputFormat::Json => print_json(&diff)?,
        OutputFormat::Text => print_diff_text(
            &diff,
            &baseline_path.display().to_string(),
            &current_path.display().to_string(),
        ),
    }

    Ok(if diff.has_regressions && args.fail_on_regression {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn run_summary_command(args: &SummaryArgs, format: OutputFormat) -> Result<ExitCode> {
    let trace = load_path(&args.path)
        .with_context(|| format!("Failed to open {}", args.path.display()))?;
    let summary = TraceSummary::from_trace(&trace);

    match format {
        OutputFormat::Json => print_json(&summary)?,
        OutputFormat::Text => {
            println!(
                "Session ID: {}",
                summary.session_id.as_deref().unwrap_or("Unknown")
            );
            println!("Total Events: {}", summary.total_events);
            if let Some(seconds) = summary.duration_seconds {
                println!("Duration: {seconds:.2} seconds");
            }
            println!("Errors: {}", summary.error_count);
            for (event_type, count) in &summary.event_types {
                println!("  {event_type}: {count}");
            }
            for (tool, totals) in &summary.tool_calls {
                println!(
                    "  {tool}: {} calls, {} errors, {:.0}ms",
                    totals.count, totals.errors, totals.total_duration_ms
                );
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

fn main() -> Result<ExitCode> {
    let args = Cli::parse();

    init_tracing(args.debug);

    let mut config = load_config(args.config.as_deref())?;

    match &args.command {
        Command::Audit(audit) => run_audit_command(audit, &mut config, args.format),
        Command::Health(health) => run_health_command(health, &config, args.format),
        Command::Diff(diff) => run_diff_command(diff, &mut config, args.format),
        Command::Summary(summary) => run_summary_command(summary, args.format),
    }
}
