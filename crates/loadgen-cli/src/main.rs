mod caller;
mod cli;
mod report;
mod server;
mod shutdown;

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use loadgen_engine::{start_generator, GeneratorConfig};
use tracing_subscriber::EnvFilter;

use crate::caller::TcpCaller;
use crate::cli::Cli;
use crate::report::Tally;
use crate::shutdown::{spawn_ctrl_c_handler, ShutdownController, ShutdownEvent};

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();
}

/// Resolves the address to dial, starting the bundled demo server first if
/// `--serve` was given instead of `--target`.
async fn resolve_target(cli: &Cli) -> anyhow::Result<SocketAddr> {
    if let Some(serve_addr) = &cli.serve {
        let addr: SocketAddr = serve_addr
            .parse()
            .map_err(|err| anyhow::anyhow!("invalid --serve address {serve_addr:?}: {err}"))?;
        let listener = server::bind(addr).await?;
        let bound = listener.local_addr()?;
        tokio::spawn(async move {
            if let Err(err) = server::run(listener).await {
                tracing::error!(%err, "demo server stopped");
            }
        });
        return Ok(bound);
    }

    let target = cli
        .target
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("one of --target or --serve is required"))?;
    target
        .parse()
        .map_err(|err| anyhow::anyhow!("invalid --target address {target:?}: {err}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let addr = resolve_target(&cli).await?;
    tracing::info!(%addr, lps = cli.lps, timeout = ?cli.timeout, duration = ?cli.duration, "starting load generator");

    let config = GeneratorConfig {
        caller: Arc::new(TcpCaller::new(addr)),
        timeout: cli.timeout,
        lps: cli.lps,
        duration: cli.duration,
        result_buffer: cli.result_buffer,
        concurrency_cap: cli.concurrency_cap,
    };

    let (handle, mut results) = start_generator(config)?;
    handle.start();

    let shutdown = Arc::new(ShutdownController::new());
    let (shutdown_tx, mut shutdown_rx) = tokio::sync::mpsc::unbounded_channel::<ShutdownEvent>();
    spawn_ctrl_c_handler(shutdown.clone(), shutdown_tx);

    let mut tally = Tally::new();
    let mut stopping = false;

    loop {
        tokio::select! {
            result = results.recv() => {
                match result {
                    Some(result) => tally.record(&result),
                    None => break,
                }
            }
            event = shutdown_rx.recv() => {
                match event {
                    Some(ShutdownEvent::Graceful) if !stopping => {
                        stopping = true;
                        eprintln!("stop requested — draining in-flight calls (press CTRL+C again to exit immediately)");
                        let stopper = handle.clone();
                        tokio::spawn(async move {
                            stopper.stop().await;
                        });
                    }
                    Some(ShutdownEvent::Immediate) => {
                        eprintln!("stop requested again — exiting immediately");
                        std::process::exit(130);
                    }
                    Some(ShutdownEvent::Graceful) | None => {}
                }
            }
        }
    }

    println!("{}", tally.summary_line(handle.call_count()));
    Ok(())
}
