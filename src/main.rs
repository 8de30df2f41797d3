//! CLI entry point for runwatch.

mod cli;

use clap::Parser;
use cli::{Args, Command};
use runwatch::api::{ApiClient, RunApi};
use runwatch::build_info;
use runwatch::config::{
    initialize_default_global_config, load_config, Config, GlobalConfigInitResult,
};
use runwatch::error::WatchError;
use runwatch::live::{segment, spawn_session, SessionEvents, SessionHandle};
use runwatch::render::Renderer;
use runwatch::types::{RunDetail, RunReport};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .with(
            tracing_subscriber::EnvFilter::try_from_env("RUNWATCH_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    let renderer = Renderer::new(!args.no_color);
    if let Err(e) = run(args).await {
        renderer.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<(), WatchError> {
    if let Command::Init { force } = args.command {
        return init_config(force);
    }

    let mut config = load_config(args.config.as_deref())?;
    if let Some(url) = &args.base_url {
        config.api.base_url = url.trim().to_string();
    }
    if args.no_color {
        config.display.color = false;
    }
    let renderer = Renderer::new(config.display.color);
    let api: Arc<dyn RunApi> = Arc::new(ApiClient::new(&config.api));

    match args.command {
        Command::Watch { run_id, cycle } => watch(api, &config, &renderer, run_id, cycle).await,
        Command::Events { run_id, cycles } => {
            print_events(api.as_ref(), &config, &renderer, &run_id, cycles).await
        }
        Command::Init { .. } => Ok(()),
    }
}

fn init_config(force: bool) -> Result<(), WatchError> {
    match initialize_default_global_config(force)? {
        GlobalConfigInitResult::Created { path } => {
            println!("created {}", path.display());
        }
        GlobalConfigInitResult::AlreadyInitialized { path } => {
            println!(
                "{} already exists (use --force to overwrite)",
                path.display()
            );
        }
        GlobalConfigInitResult::Overwritten { path, backup_path } => {
            println!(
                "overwrote {} (backup: {})",
                path.display(),
                backup_path.display()
            );
        }
    }
    Ok(())
}

/// One-shot pull of the event list, split into cycles.
async fn print_events(
    api: &dyn RunApi,
    config: &Config,
    renderer: &Renderer,
    run_id: &str,
    cycles: Option<u32>,
) -> Result<(), WatchError> {
    let expected = match cycles {
        Some(n) => Some(n),
        None => match api.get_run(run_id).await {
            Ok(detail) => detail.cycles_total,
            Err(err) => {
                renderer.warn(&format!("run metadata unavailable: {err}"));
                None
            }
        },
    };
    let events = api.list_events(run_id).await?;
    let buckets = segment(&events, expected.map_or(1, |n| n as usize));
    print!(
        "{}",
        renderer.cycles_listing(run_id, &buckets, config.display.max_events)
    );
    Ok(())
}

/// Latest derived data shown alongside the live log.
#[derive(Default)]
struct Derived {
    detail: Option<RunDetail>,
    report: Option<RunReport>,
}

impl Derived {
    async fn reload(&mut self, api: &dyn RunApi, run_id: &str, renderer: &Renderer) {
        let (detail, report) = tokio::join!(api.get_run(run_id), api.get_report(run_id));
        match detail {
            Ok(detail) => self.detail = Some(detail),
            Err(err) => tracing::warn!(run_id = %run_id, error = %err, "run metadata reload failed"),
        }
        match report {
            Ok(report) => self.report = Some(report),
            // Reports only exist once the backend has extracted something.
            Err(err) if err.status_code() == Some(404) => {}
            Err(err) => renderer.warn(&format!("report reload failed: {err}")),
        }
    }
}

/// The `--cycle` selection, held until the run's cycle count is known.
///
/// Selecting earlier would clamp against the default single cycle.
#[derive(Debug, Default)]
struct PendingCycle(Option<usize>);

impl PendingCycle {
    fn new(cycle: usize) -> Self {
        Self(Some(cycle))
    }

    /// Cycle to select now that `detail` has been applied, if any.
    fn take_if_known(&mut self, detail: &RunDetail) -> Option<usize> {
        detail.cycles_total.and_then(|_| self.0.take())
    }

    /// The user picked a cycle by hand; theirs wins.
    fn clear(&mut self) {
        self.0 = None;
    }
}

/// Feed fresh metadata to the session, then apply a waiting `--cycle`.
async fn apply_detail(
    handle: &SessionHandle,
    derived: &Derived,
    pending: &mut PendingCycle,
) -> Result<(), WatchError> {
    let Some(detail) = derived.detail.clone() else {
        return Ok(());
    };
    let cycle = pending.take_if_known(&detail);
    handle.set_run_detail(detail).await?;
    if let Some(cycle) = cycle {
        handle.select_cycle(cycle).await?;
    }
    Ok(())
}

async fn watch(
    api: Arc<dyn RunApi>,
    config: &Config,
    renderer: &Renderer,
    run_id: String,
    cycle: usize,
) -> Result<(), WatchError> {
    tracing::info!(run_id = %run_id, version = %build_info::startup_metadata_line(), "watching run");

    let mut derived = Derived::default();
    derived.reload(api.as_ref(), &run_id, renderer).await;

    let (handle, mut events) = spawn_session(Arc::clone(&api), run_id.clone(), config.live.clone());
    let mut pending = PendingCycle::new(cycle);
    apply_detail(&handle, &derived, &mut pending).await?;

    let result = drive(
        &handle,
        &mut events,
        api.as_ref(),
        config,
        renderer,
        &mut derived,
        &mut pending,
    )
    .await;
    // The session may already be gone; teardown is idempotent from here.
    let _ = handle.shutdown().await;
    result
}

async fn drive(
    handle: &SessionHandle,
    events: &mut SessionEvents,
    api: &dyn RunApi,
    config: &Config,
    renderer: &Renderer,
    derived: &mut Derived,
    pending: &mut PendingCycle,
) -> Result<(), WatchError> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    let draw = |derived: &Derived| {
        let snap = handle.snapshot();
        let mut frame = renderer.snapshot_frame(
            &snap,
            derived.detail.as_ref(),
            derived.report.as_ref(),
            config.display.max_events,
        );
        frame.push_str("\n[n]ext / [p]revious / <number> + Enter selects a cycle, q quits\n");
        if let Err(err) = renderer.draw(&frame) {
            tracing::debug!(error = %err, "frame draw failed");
        }
        snap.mode
    };
    draw(derived);

    loop {
        tokio::select! {
            changed = events.snapshots.changed() => {
                if changed.is_err() {
                    return Err(WatchError::SessionClosed);
                }
                if !draw(derived).is_live() {
                    renderer.warn("polling ceiling reached; no further updates");
                    return Ok(());
                }
            }
            Some(signal) = events.refresh.recv() => {
                tracing::debug!(run_id = %signal.run_id, step = %signal.trigger.step, "refreshing derived data");
                derived.reload(api, &signal.run_id, renderer).await;
                apply_detail(handle, derived, pending).await?;
                draw(derived);
            }
            line = input.next_line(), if input_open => match line {
                Ok(Some(line)) => match line.trim() {
                    "q" | "quit" => return Ok(()),
                    "n" | "next" => {
                        pending.clear();
                        handle.next_cycle().await?
                    }
                    "p" | "prev" | "previous" => {
                        pending.clear();
                        handle.previous_cycle().await?
                    }
                    other => match other.parse::<usize>() {
                        Ok(n) => {
                            pending.clear();
                            handle.select_cycle(n).await?
                        }
                        Err(_) => {
                            draw(derived);
                        }
                    },
                },
                Ok(None) | Err(_) => input_open = false,
            },
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}
