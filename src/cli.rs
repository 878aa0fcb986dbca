use crate::fetch::RunFetcher;
use crate::model::{CycleEvent, MonitorConfig};
use crate::orchestrator::{run_controller, UiCommand};
use crate::render::{self, DashboardView, RenderTarget, TimeFormat, ViewOptions};
use anyhow::{Context, Result};
use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// A line of headless output: rendered views go to stdout, controller notices to stderr.
#[derive(Debug)]
enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Spawn a blocking writer that drains `OutputLine`s so printing never stalls the runtime.
fn spawn_output_writer() -> (
    mpsc::UnboundedSender<OutputLine>,
    tokio::task::JoinHandle<()>,
) {
    let (tx, mut rx) = mpsc::unbounded_channel::<OutputLine>();
    let handle = tokio::task::spawn_blocking(move || {
        let stdout = std::io::stdout();
        let stderr = std::io::stderr();
        let mut out = std::io::LineWriter::new(stdout.lock());
        let mut err = std::io::LineWriter::new(stderr.lock());

        while let Some(line) = rx.blocking_recv() {
            match line {
                OutputLine::Stdout(msg) => {
                    let _ = writeln!(out, "{}", msg);
                }
                OutputLine::Stderr(msg) => {
                    let _ = writeln!(err, "{}", msg);
                }
            }
        }

        let _ = out.flush();
        let _ = err.flush();
    });
    (tx, handle)
}

fn parse_nonzero_duration(s: &str) -> Result<humantime::Duration, String> {
    let d: humantime::Duration = s.parse().map_err(|e| format!("{e}"))?;
    if Duration::from(d).is_zero() {
        return Err("duration must be greater than zero".into());
    }
    Ok(d)
}

#[derive(Debug, Parser, Clone)]
#[command(
    name = "testrun-monitor",
    version,
    about = "Watch automated test runs: status summary plus newest-first run listing"
)]
pub struct Cli {
    /// Runs endpoint returning a JSON array of test runs
    #[arg(long, default_value = "http://localhost:8080/api/runs")]
    pub endpoint_url: String,

    /// Refresh automatically at this interval (e.g. 10s); no polling when omitted
    #[arg(long, value_parser = parse_nonzero_duration)]
    pub poll_interval: Option<humantime::Duration>,

    /// Give up on a request after this long
    #[arg(long, default_value = "10s", value_parser = parse_nonzero_duration)]
    pub timeout: humantime::Duration,

    /// Fetch as soon as the dashboard starts
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub fetch_on_launch: bool,

    /// Print the dashboard view as JSON (no TUI)
    #[arg(long, conflicts_with = "text")]
    pub json: bool,

    /// Print the dashboard as a text table (no TUI)
    #[arg(long)]
    pub text: bool,

    /// Append logs to this file
    #[arg(long)]
    pub log_file: Option<std::path::PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Cli {
    /// Whether the interactive dashboard owns the terminal.
    pub fn is_interactive(&self) -> bool {
        cfg!(feature = "tui") && !self.json && !self.text
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Text,
    Json,
}

pub async fn run(args: Cli, time: TimeFormat) -> Result<()> {
    if !args.json && !args.text {
        #[cfg(feature = "tui")]
        {
            return crate::tui::run(args, time).await;
        }
        #[cfg(not(feature = "tui"))]
        {
            // Fallback when built without TUI support.
            return run_headless(args, time, OutputFormat::Text).await;
        }
    }

    let format = if args.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };
    run_headless(args, time, format).await
}

/// Build a `MonitorConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> MonitorConfig {
    MonitorConfig {
        endpoint_url: args.endpoint_url.clone(),
        poll_interval: args.poll_interval.map(Duration::from),
        timeout: Duration::from(args.timeout),
        fetch_on_launch: args.fetch_on_launch,
        user_agent: format!("testrun-monitor/{}", env!("CARGO_PKG_VERSION")),
    }
}

/// Render target that prints each view to stdout.
struct ConsoleTarget {
    out: mpsc::UnboundedSender<OutputLine>,
    format: OutputFormat,
}

impl RenderTarget for ConsoleTarget {
    fn present(&mut self, view: DashboardView) {
        match self.format {
            OutputFormat::Text => {
                for line in crate::text_summary::build_text_summary(&view).lines {
                    let _ = self.out.send(OutputLine::Stdout(line));
                }
            }
            OutputFormat::Json => match serde_json::to_string_pretty(&view) {
                Ok(json) => {
                    let _ = self.out.send(OutputLine::Stdout(json));
                }
                Err(e) => tracing::error!(error = %e, "failed to serialize dashboard view"),
            },
        }
    }
}

/// Run cycles without a TUI and print every rendered view.
///
/// Without a poll interval this is one cycle and exit; a failed cycle becomes the
/// process error. With polling it runs until Ctrl-C.
async fn run_headless(args: Cli, time: TimeFormat, format: OutputFormat) -> Result<()> {
    let mut cfg = build_config(&args);
    // Printing needs at least one cycle regardless of --fetch-on-launch.
    cfg.fetch_on_launch = true;
    let opts = ViewOptions::new(&cfg, time);

    let (out_tx, out_handle) = spawn_output_writer();
    let shutdown = async {
        let _ = tokio::signal::ctrl_c().await;
    };
    let res = print_cycles(&cfg, &opts, format, out_tx, shutdown).await;
    let _ = out_handle.await;
    res
}

/// Drive the controller and send each rendered view to `out` until the single cycle
/// is done (no polling) or `shutdown` resolves.
async fn print_cycles(
    cfg: &MonitorConfig,
    opts: &ViewOptions,
    format: OutputFormat,
    out: mpsc::UnboundedSender<OutputLine>,
    shutdown: impl std::future::Future<Output = ()>,
) -> Result<()> {
    let one_shot = cfg.poll_interval.is_none();
    let fetcher = Arc::new(RunFetcher::new(cfg)?);
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<CycleEvent>();
    let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<UiCommand>();

    let controller = {
        let cfg = cfg.clone();
        tokio::spawn(async move { run_controller(&cfg, fetcher, event_tx, cmd_rx).await })
    };

    let mut target = ConsoleTarget {
        out: out.clone(),
        format,
    };
    let mut last_failure: Option<String> = None;
    let mut stopping = false;
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            ev = event_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    CycleEvent::CycleCompleted { outcome, .. } => {
                        render::render(&outcome, opts, &mut target);
                        last_failure = outcome.as_ref().err().map(|e| e.to_string());
                    }
                    CycleEvent::CycleAborted { reason, .. } => {
                        render::render_aborted(&reason, &mut target);
                        last_failure = Some(reason);
                    }
                    CycleEvent::Info(info) => {
                        let _ = out.send(OutputLine::Stderr(info.to_message().to_string()));
                        continue;
                    }
                    CycleEvent::CycleStarted { .. } | CycleEvent::TriggerIgnored { .. } => continue,
                }
                if one_shot && !stopping {
                    stopping = true;
                    let _ = cmd_tx.send(UiCommand::Quit);
                }
            }
            _ = &mut shutdown, if !stopping => {
                stopping = true;
                let _ = cmd_tx.send(UiCommand::Quit);
            }
        }
    }

    controller
        .await
        .context("cycle controller task failed")?
        .context("cycle controller failed")?;

    match last_failure {
        Some(e) if one_shot => Err(anyhow::anyhow!("refresh failed: {e}")),
        _ => Ok(()),
    }
}
