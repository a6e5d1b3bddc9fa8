//! Live monitor. Opens the default input and logs tracked heights.
//!
//! Usage: `tessitura-monitor [config.json] [seconds]`

use std::env;
use std::time::{Duration, Instant};
use tessitura::{MappingConfig, Result, Tracker};

const TICK_INTERVAL: Duration = Duration::from_millis(10);

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = env::args().skip(1);
    let config = match args.next() {
        Some(path) => MappingConfig::from_path(path)?,
        None => MappingConfig::default(),
    };
    let run_for = args
        .next()
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(Duration::from_secs_f64);

    let mut tracker = Tracker::builder().config(config).build()?;
    let updates = tracker.subscribe(64);
    let config = tracker.config().clone();
    tracing::info!(
        "Tracking {:.0}-{:.0} Hz into heights {:.2}..{:.2}",
        config.min_hz,
        config.max_hz,
        config.min_height,
        config.max_height
    );

    let background = tracker.spawn(TICK_INTERVAL)?;
    let started = Instant::now();

    loop {
        if run_for.is_some_and(|limit| started.elapsed() >= limit) {
            break;
        }
        match updates.recv_timeout(Duration::from_millis(250)) {
            Ok(snapshot) => tracing::info!(
                "{:>4} {:7.2} Hz  conf {:.2}  height {:.3}",
                snapshot.note_label().unwrap_or_default(),
                snapshot.frequency,
                snapshot.confidence,
                snapshot.height
            ),
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
        }
    }

    let mut tracker = background.stop()?;
    tracker.stop();
    Ok(())
}
