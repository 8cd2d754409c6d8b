use super::common::GlobalArgs;
use clap::Parser;
use core::time::Duration;
use healthdeck::Result;
use healthdeck::collectors::dashboard::Dashboard;
use healthdeck::collectors::performance::TailOutcome;
use tokio::time::{MissedTickBehavior, interval};

const LOG_TARGET: &str = "     watch";

#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Seconds between two ticks [default: performance.tail_interval_secs]
    #[arg(long, value_name = "SECS")]
    pub interval: Option<u64>,

    /// Stop after this many ticks [default: run until interrupted]
    #[arg(long, value_name = "N")]
    pub ticks: Option<u64>,
}

/// Tick the request-log tailer on a fixed interval
pub async fn watch(global: &GlobalArgs, args: &WatchArgs) -> Result<()> {
    let config = global.load_config()?;
    let period = args.interval.map_or_else(|| config.performance.tail_interval(), Duration::from_secs);
    let dashboard = Dashboard::new(&config, &global.project_root)?;

    let mut ticker = interval(period.max(Duration::from_secs(1)));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut done = 0;
    while args.ticks.is_none_or(|ticks| done < ticks) {
        let _ = ticker.tick().await;
        done += 1;

        match dashboard.tail_requests().await {
            Ok(outcome) => println!("{}", describe(outcome)),
            Err(e) => log::warn!(target: LOG_TARGET, "Tailer tick failed: {e}"),
        }
    }

    Ok(())
}

fn describe(outcome: TailOutcome) -> String {
    match outcome {
        TailOutcome::Extended { from, to, samples } => format!("Read bytes {from}..{to}, stored {samples} requests"),
        TailOutcome::Unchanged => "No new log lines".to_string(),
        TailOutcome::SourceMissing => "Request log not found".to_string(),
    }
}
