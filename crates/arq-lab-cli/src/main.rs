use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use std::fs;
use std::io;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::info;

use arq_lab_abstract::config::{
    DEFAULT_ACK_TIMEOUT_MS, DEFAULT_DROP_PROBABILITY, DEFAULT_FRAME_INTERVAL_MS,
    DEFAULT_MAX_TRIES, DEFAULT_TOTAL_FRAMES,
};
use arq_lab_abstract::{LinkConfig, ProtocolConfig};
use arq_lab_core::{
    RandomDrop, ReceiverControl, TracingLogger, run_receiver, run_sender,
};
use arq_lab_simulator::{RunReport, link, load_scenario, run_scenario};
use arq_lab_udp::{DEFAULT_PORT, UdpReceiverChannel, UdpSenderChannel};

#[derive(Parser, Debug)]
#[command(author, version, about = "Stop-and-wait ARQ lab over unreliable datagrams")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send numbered frames to a live receiver over UDP.
    Sender {
        /// Receiver address.
        #[arg(long, default_value_t = default_target())]
        target: SocketAddr,
        /// Frames to transfer.
        #[arg(long, default_value_t = DEFAULT_TOTAL_FRAMES)]
        frames: u32,
        /// Attempts per frame before giving up.
        #[arg(long, default_value_t = DEFAULT_MAX_TRIES)]
        max_tries: u32,
        /// Acknowledgement window per attempt.
        #[arg(long, default_value_t = DEFAULT_ACK_TIMEOUT_MS)]
        timeout_ms: u64,
        /// Pause between consecutive frames.
        #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL_MS)]
        interval_ms: u64,
    },
    /// Acknowledge frames over UDP, randomly dropping some acks. Runs
    /// until the process is terminated.
    Receiver {
        /// Listen address.
        #[arg(long, default_value_t = default_bind())]
        bind: SocketAddr,
        /// Chance of discarding each acknowledgement.
        #[arg(long, default_value_t = DEFAULT_DROP_PROBABILITY)]
        drop_probability: f64,
        /// Drop-policy seed; picked at random when omitted.
        #[arg(long)]
        seed: Option<u64>,
        /// Poll granularity of the receive loop.
        #[arg(long, default_value_t = 500)]
        poll_ms: u64,
    },
    /// Execute a scenario file over the in-memory link and check its
    /// assertions.
    Run {
        /// Scenario TOML file.
        scenario: PathBuf,
        /// Write a JSON report of the finished run.
        #[arg(long)]
        trace_out: Option<PathBuf>,
    },
    /// One-process loopback run over the in-memory link, events on the
    /// console.
    Demo {
        #[arg(long, default_value_t = DEFAULT_TOTAL_FRAMES)]
        frames: u32,
        #[arg(long, default_value_t = DEFAULT_MAX_TRIES)]
        max_tries: u32,
        #[arg(long, default_value_t = DEFAULT_ACK_TIMEOUT_MS)]
        timeout_ms: u64,
        #[arg(long, default_value_t = DEFAULT_FRAME_INTERVAL_MS)]
        interval_ms: u64,
        /// Chance of the receiver discarding each acknowledgement.
        #[arg(long, default_value_t = DEFAULT_DROP_PROBABILITY)]
        drop_probability: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Serve the line-oriented TCP echo demo.
    EchoServer {
        #[arg(long, default_value_t = default_bind())]
        bind: SocketAddr,
    },
    /// Interactive client for the TCP echo demo. Type "exit" to quit.
    EchoClient {
        #[arg(long, default_value_t = default_target())]
        server: SocketAddr,
    },
}

fn default_target() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT))
}

fn default_bind() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    match args.command {
        Command::Sender {
            target,
            frames,
            max_tries,
            timeout_ms,
            interval_ms,
        } => cmd_sender(
            target,
            ProtocolConfig {
                total_frames: frames,
                max_tries,
                ack_timeout_ms: timeout_ms,
                frame_interval_ms: interval_ms,
            },
        ),
        Command::Receiver {
            bind,
            drop_probability,
            seed,
            poll_ms,
        } => cmd_receiver(bind, drop_probability, seed, poll_ms),
        Command::Run {
            scenario,
            trace_out,
        } => cmd_run(&scenario, trace_out.as_deref()),
        Command::Demo {
            frames,
            max_tries,
            timeout_ms,
            interval_ms,
            drop_probability,
            seed,
        } => cmd_demo(
            ProtocolConfig {
                total_frames: frames,
                max_tries,
                ack_timeout_ms: timeout_ms,
                frame_interval_ms: interval_ms,
            },
            drop_probability,
            seed,
        ),
        Command::EchoServer { bind } => {
            arq_lab_echo::run_server(bind)
                .with_context(|| format!("Echo server failed on {}", bind))
        }
        Command::EchoClient { server } => {
            let mut stdout = io::stdout();
            arq_lab_echo::run_client(server, io::stdin().lock(), &mut stdout)
                .with_context(|| format!("Echo client failed against {}", server))
        }
    }
}

fn cmd_sender(target: SocketAddr, config: ProtocolConfig) -> Result<()> {
    info!("sending {} frames to {}…", config.total_frames, target);
    let mut channel = UdpSenderChannel::connect(target)
        .with_context(|| format!("Failed to open sender socket for {}", target))?;
    let report = run_sender(&mut channel, &config, &TracingLogger)?;
    info!(
        "run complete: {}/{} frames delivered, {} transmissions",
        report.delivered_count(),
        report.outcomes.len(),
        report.total_transmissions()
    );
    Ok(())
}

fn cmd_receiver(
    bind: SocketAddr,
    drop_probability: f64,
    seed: Option<u64>,
    poll_ms: u64,
) -> Result<()> {
    // Log the seed even when it was picked at random, so a run can be
    // replayed.
    let seed = seed.unwrap_or_else(rand::random);
    let mut channel = UdpReceiverChannel::bind(bind)
        .with_context(|| format!("Failed to bind receiver socket on {}", bind))?;
    info!(
        "receiver listening on {} (drop probability {}, seed {})…",
        channel.local_addr()?,
        drop_probability,
        seed
    );
    let mut policy = RandomDrop::new(drop_probability, seed);
    let control = ReceiverControl::new();
    let stats = run_receiver(
        &mut channel,
        &mut policy,
        &control,
        Duration::from_millis(poll_ms),
        &TracingLogger,
    )?;
    info!(
        "receiver done: {} frames, {} acks sent, {} dropped",
        stats.frames_received, stats.acks_sent, stats.acks_dropped
    );
    Ok(())
}

fn cmd_run(path: &Path, trace_out: Option<&Path>) -> Result<()> {
    let scenario = load_scenario(path)?;
    let report = run_scenario(&scenario)?;
    if let Some(out) = trace_out {
        write_trace(out, &report)?;
    }
    Ok(())
}

fn cmd_demo(config: ProtocolConfig, drop_probability: f64, seed: u64) -> Result<()> {
    info!(
        "demo: {} frames over the in-memory link (drop probability {}, seed {})…",
        config.total_frames, drop_probability, seed
    );
    let (mut sender_end, receiver_end) = link::pair(&LinkConfig::default());
    let control = ReceiverControl::new();

    let thread_control = control.clone();
    let receiver_thread = thread::spawn(move || {
        let mut receiver_end = receiver_end;
        let mut policy = RandomDrop::new(drop_probability, seed);
        run_receiver(
            &mut receiver_end,
            &mut policy,
            &thread_control,
            Duration::from_millis(50),
            &TracingLogger,
        )
    });

    let report = run_sender(&mut sender_end, &config, &TracingLogger)?;
    control.request_stop();
    let stats = receiver_thread
        .join()
        .map_err(|_| anyhow!("receiver thread panicked"))??;

    info!(
        "demo complete: {}/{} frames delivered, receiver saw {} frames and dropped {} acks",
        report.delivered_count(),
        report.outcomes.len(),
        stats.frames_received,
        stats.acks_dropped
    );
    Ok(())
}

fn write_trace(path: &Path, report: &RunReport) -> Result<()> {
    let data = serde_json::to_vec_pretty(report).context("Failed to serialize run report")?;
    fs::write(path, &data)
        .with_context(|| format!("Failed to write trace file {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Args::command().debug_assert();
    }
}
