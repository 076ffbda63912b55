//! Stacked Bars Example - two progress bars under a stream of log lines
//!
//! Shows the save/restore cursor helpers, then drives a 20-cell bar over 15
//! steps and a 10-cell bar over 100 steps for each of them, logging every
//! 10 steps of the first.
//!
//! Run: `cargo run -p sblog --example stacked_bars`
//! Set `SBLOG_LEVEL=warning` to hide the info lines.

use std::error::Error;
use std::thread;
use std::time::Duration;

use sblog::prelude::*;
use tracing_subscriber::EnvFilter;

const TAG: &str = "stacked_bars";
const TOTAL_STEPS_FIRST: u32 = 15;
const TOTAL_STEPS_SECOND: u32 = 100;

fn main() -> Result<(), Box<dyn Error>> {
    // Diagnostics go to stderr; bars and log lines go to stdout.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let log = sblog::global();
    let mut out = SinkHandle::default();
    log.create_stdout_sink(&mut out)?;

    log.sinks().write(&out, b"Start to be kept <- ")?;
    log.sinks().save_cursor(&out)?;
    log.sinks().write(&out, b"Temporary message that might be long")?;
    thread::sleep(Duration::from_secs(2));
    log.sinks().restore_cursor(&out)?;
    log.sinks().clear_to_end_of_line(&out)?;
    log.sinks().write(&out, b"Clean message\n")?;
    thread::sleep(Duration::from_millis(500));

    sblog::log_info!(log, TAG, out, "Starting test...")?;
    // Reserve the two rows the bars are drawn on.
    log.sinks().write(&out, b"\n\n")?;

    let mut bars = StatusbarHandle::default();
    if let Err(err) = log.create_statusbar_parallel(
        &mut bars,
        out,
        &[2, 1],
        &[20, 10],
        &["first:  ", "second: "],
        &[" -- 15 total steps", "           -- 100 total steps"],
    ) {
        sblog::log_error!(log, TAG, out, "Failed to create statusbar: {err}")?;
        return Err(err.into());
    }

    for i in 0..=TOTAL_STEPS_FIRST {
        log.update_statusbar(&bars, 0, percent(i, TOTAL_STEPS_FIRST))?;
        if i % 10 == 0 && i != 0 {
            sblog::log_info!(log, TAG, out, "10 Ticks reached")?;
        }
        for j in 0..=TOTAL_STEPS_SECOND {
            log.update_statusbar(&bars, 1, percent(j, TOTAL_STEPS_SECOND))?;
            thread::sleep(Duration::from_millis(30));
        }
    }

    if let Err(err) = log.destroy_statusbar(&mut bars) {
        sblog::log_error!(log, TAG, out, "Failed to destroy statusbar: {err}")?;
        return Err(err.into());
    }
    log.destroy_sink(&mut out)?;
    Ok(())
}

fn percent(step: u32, total: u32) -> f64 {
    f64::from(step) / f64::from(total) * 100.0
}
