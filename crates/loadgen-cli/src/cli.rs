use std::time::Duration;

use clap::Parser;

fn parse_duration_ms(input: &str) -> Result<Duration, String> {
    let ms: u64 = input
        .trim()
        .parse()
        .map_err(|_| format!("invalid duration (milliseconds): {input:?}"))?;
    Ok(Duration::from_millis(ms))
}

#[derive(Debug, Clone, Parser)]
#[command(name = "loadgen", version, about = "Rate-paced load generator demo")]
pub struct Cli {
    /// Socket address (`host:port`) of an already-running demo arithmetic
    /// server to target. Mutually exclusive with `--serve`.
    #[arg(long, env = "LOADGEN_TARGET")]
    pub target: Option<String>,

    /// Spin up the bundled demo arithmetic server on this socket address
    /// (`host:port`) and target it, instead of dialing an external
    /// `--target`.
    #[arg(long, env = "LOADGEN_SERVE", conflicts_with = "target")]
    pub serve: Option<String>,

    /// Target average calls per second.
    #[arg(long, env = "LOADGEN_LPS", default_value_t = 100)]
    pub lps: u32,

    /// Per-call timeout, in milliseconds.
    #[arg(
        long,
        env = "LOADGEN_TIMEOUT_MS",
        default_value = "50",
        value_parser = parse_duration_ms
    )]
    pub timeout: Duration,

    /// Total run length, in milliseconds.
    #[arg(
        long,
        env = "LOADGEN_DURATION_MS",
        default_value = "5000",
        value_parser = parse_duration_ms
    )]
    pub duration: Duration,

    /// Override the ticket pool's derived concurrency cap.
    #[arg(long = "concurrency-cap", env = "LOADGEN_CONCURRENCY_CAP")]
    pub concurrency_cap: Option<usize>,

    /// Capacity of the result channel.
    #[arg(long = "result-buffer", env = "LOADGEN_RESULT_BUFFER", default_value_t = 256)]
    pub result_buffer: usize,

    /// Increase log verbosity; repeatable (`-v`, `-vv`, `-vvv`).
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
