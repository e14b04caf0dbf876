use crate::link;
use crate::report::RunReport;
use anyhow::{Context, anyhow};
use arq_lab_abstract::{LinkConfig, ProtocolConfig, TestAssertion, TestScenario};
use arq_lab_core::{
    ProtocolEvent, ReceiverControl, ReceiverStats, RecordingLogger, SendOutcome, SenderReport,
    policy, run_receiver, run_sender,
};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::info;

/// Poll granularity of the simulated receiver; bounds how long a stop
/// request can go unnoticed.
const RECEIVER_POLL_MS: u64 = 20;

pub fn load_scenario(path: &Path) -> anyhow::Result<TestScenario> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read scenario file {}", path.display()))?;
    toml::from_str(&content).context("Failed to parse scenario")
}

/// Execute a scenario over the in-memory link: receiver on its own thread,
/// sender on this one, then check every assertion against what happened.
pub fn run_scenario(scenario: &TestScenario) -> anyhow::Result<RunReport> {
    info!("Running scenario: {}", scenario.name);
    info!("Description: {}", scenario.description);

    let mut protocol = ProtocolConfig::default();
    scenario.protocol.apply_to(&mut protocol);
    let mut link_config = LinkConfig::default();
    scenario.link.apply_to(&mut link_config);

    let (mut sender_end, receiver_end) = link::pair(&link_config);
    let logger = Arc::new(RecordingLogger::new());
    let control = ReceiverControl::new();

    let drop_spec = scenario.policy.clone();
    let receiver_logger = Arc::clone(&logger);
    let receiver_control = control.clone();
    let receiver_thread = thread::spawn(move || {
        let mut receiver_end = receiver_end;
        let mut policy = policy::from_spec(&drop_spec);
        run_receiver(
            &mut receiver_end,
            policy.as_mut(),
            &receiver_control,
            Duration::from_millis(RECEIVER_POLL_MS),
            receiver_logger.as_ref(),
        )
    });

    let started = Instant::now();
    let send_result = run_sender(&mut sender_end, &protocol, logger.as_ref());
    let duration = started.elapsed();

    control.request_stop();
    let stats = receiver_thread
        .join()
        .map_err(|_| anyhow!("receiver thread panicked"))??;
    let sender_report = send_result?;

    let events = logger.snapshot();
    check_assertions(scenario, &sender_report, &stats, &events, duration)?;
    info!("Scenario passed: {}", scenario.name);

    Ok(RunReport::new(
        scenario.name.clone(),
        protocol,
        link_config,
        &sender_report,
        stats,
        duration.as_millis() as u64,
        &logger.timeline(),
    ))
}

fn check_assertions(
    scenario: &TestScenario,
    report: &SenderReport,
    stats: &ReceiverStats,
    events: &[ProtocolEvent],
    duration: Duration,
) -> anyhow::Result<()> {
    for assertion in &scenario.assertions {
        match assertion {
            TestAssertion::FrameDelivered { id, attempts } => match report.outcome_for(*id) {
                Some(SendOutcome::Delivered { attempts: actual }) => {
                    if let Some(expected) = attempts {
                        if actual != *expected {
                            return Err(anyhow!(
                                "Assertion Failed: frame {} delivered after {} attempts, expected {}",
                                id,
                                actual,
                                expected
                            ));
                        }
                    }
                }
                other => {
                    return Err(anyhow!(
                        "Assertion Failed: frame {} was not delivered (outcome {:?})",
                        id,
                        other
                    ));
                }
            },
            TestAssertion::FrameAbandoned { id } => {
                if !matches!(
                    report.outcome_for(*id),
                    Some(SendOutcome::Abandoned { .. })
                ) {
                    return Err(anyhow!("Assertion Failed: frame {} was not abandoned", id));
                }
            }
            TestAssertion::TransmissionCount { min, max } => {
                let count = report.total_transmissions();
                if count < *min {
                    return Err(anyhow!(
                        "Assertion Failed: {} transmissions, expected min {}",
                        count,
                        min
                    ));
                }
                if let Some(max) = max {
                    if count > *max {
                        return Err(anyhow!(
                            "Assertion Failed: {} transmissions, expected max {}",
                            count,
                            max
                        ));
                    }
                }
            }
            TestAssertion::AcksSent { count } => {
                if stats.acks_sent != *count {
                    return Err(anyhow!(
                        "Assertion Failed: receiver sent {} acks, expected {}",
                        stats.acks_sent,
                        count
                    ));
                }
            }
            TestAssertion::DeliveredInOrder => {
                let mut seen: Vec<u32> = Vec::new();
                for event in events {
                    if let ProtocolEvent::FrameReceived { id } = event {
                        if !seen.contains(id) {
                            seen.push(*id);
                        }
                    }
                }
                if !seen.windows(2).all(|pair| pair[0] < pair[1]) {
                    return Err(anyhow!(
                        "Assertion Failed: frames arrived out of order: {:?}",
                        seen
                    ));
                }
            }
            TestAssertion::MaxDuration { ms } => {
                if duration.as_millis() > u128::from(*ms) {
                    return Err(anyhow!(
                        "Assertion Failed: run took {} ms, budget {}",
                        duration.as_millis(),
                        ms
                    ));
                }
            }
        }
    }
    Ok(())
}
