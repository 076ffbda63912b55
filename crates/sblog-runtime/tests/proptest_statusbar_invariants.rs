//! Property-based invariant tests for sinks, statusbars and logging.
//!
//! 1. After any accepted updates a bar holds the last percentage and its
//!    spinner has advanced once per update.
//! 2. Rejected percentages never change bar state.
//! 3. Handles from a destroyed slot never validate again, and the live
//!    count matches a model of creates and destroys.
//! 4. Log lines carry no escape sequences and end in a newline.
//! 5. However logs and updates interleave, the bars end up directly above
//!    the cursor with the last state drawn.

use proptest::prelude::*;
use sblog_core::{Config, LogLevel, SinkHandle, StatusbarHandle};
use sblog_harness::SharedBuffer;
use sblog_render::{BarLine, SPINNER};
use sblog_runtime::{BarSpec, StatusbarLog, WrappedStream};

fn setup() -> (StatusbarLog, SinkHandle, SharedBuffer) {
    let log = StatusbarLog::new(Config::default());
    let out = SharedBuffer::new();
    let mut sink = SinkHandle::default();
    log.create_stream_sink(&mut sink, WrappedStream::new(out.clone()))
        .unwrap();
    (log, sink, out)
}

#[derive(Debug, Clone)]
enum Op {
    Update { bar: usize, percent: f64 },
    Log(String),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..2usize, 0.0f64..=100.0).prop_map(|(bar, percent)| Op::Update { bar, percent }),
        1 => "[a-z][a-z ]{0,19}".prop_map(Op::Log),
    ]
}

// ═════════════════════════════════════════════════════════════════════════
// 1. Accepted updates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bar_tracks_last_update(
        width in 1usize..60,
        updates in prop::collection::vec(0.0f64..=100.0, 1..30),
    ) {
        let (log, sink, _out) = setup();
        let mut bar = StatusbarHandle::default();
        log.create_statusbar(&mut bar, sink, &[BarSpec::new(1, width)]).unwrap();

        for &percent in &updates {
            log.update_statusbar(&bar, 0, percent).unwrap();
        }
        let state = log.statusbars().bar(&bar, 0).unwrap();
        let last = *updates.last().unwrap();
        prop_assert_eq!(state.percent, last);
        prop_assert_eq!(state.phase, updates.len() % SPINNER.len());
        prop_assert!(state.fill() <= width);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 2. Rejected updates
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn out_of_range_percent_is_rejected(
        percent in prop_oneof![
            -1.0e9f64..-f64::EPSILON,
            100.0f64 + 1.0e-9..1.0e9,
            Just(f64::NAN),
        ],
    ) {
        let (log, sink, _out) = setup();
        let mut bar = StatusbarHandle::default();
        log.create_statusbar(&mut bar, sink, &[BarSpec::new(1, 10)]).unwrap();
        log.update_statusbar(&bar, 0, 30.0).unwrap();
        let before = log.statusbars().bar(&bar, 0).unwrap();

        prop_assert!(log.update_statusbar(&bar, 0, percent).is_err());
        prop_assert_eq!(log.statusbars().bar(&bar, 0).unwrap(), before);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 3. Handle lifecycle
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn destroyed_handles_stay_dead(ops in prop::collection::vec(any::<Option<u8>>(), 1..60)) {
        let log = StatusbarLog::new(Config::default().with_max_sinks(4));
        let mut live: Vec<SinkHandle> = Vec::new();
        let mut dead: Vec<SinkHandle> = Vec::new();

        for op in ops {
            match op {
                // Create
                None => {
                    let mut handle = SinkHandle::default();
                    let created = log
                        .create_stream_sink(&mut handle, WrappedStream::new(SharedBuffer::new()));
                    prop_assert_eq!(created.is_ok(), live.len() < 4);
                    if created.is_ok() {
                        live.push(handle);
                    }
                }
                Some(pick) if !live.is_empty() => {
                    let mut handle = live.swap_remove(usize::from(pick) % live.len());
                    let copy = handle;
                    log.destroy_sink(&mut handle).unwrap();
                    prop_assert!(!handle.is_valid());
                    dead.push(copy);
                }
                Some(_) => {}
            }
            prop_assert_eq!(log.sinks().live(), live.len());
            for handle in &live {
                prop_assert!(log.sinks().validate(handle).is_ok());
            }
            for handle in &dead {
                prop_assert!(log.sinks().validate(handle).is_err());
            }
        }
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 4. Log line shape
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn log_line_is_inert(tag in any::<String>(), message in any::<String>()) {
        let (log, sink, out) = setup();
        log.log(LogLevel::Warning, &tag, sink, format_args!("{message}")).unwrap();
        let text = out.text();
        prop_assert!(text.starts_with("WARNING ["));
        prop_assert!(text.ends_with('\n'));
        prop_assert!(!text.contains('\x1b'));
        prop_assert!(!text.contains('\r'));
    }
}

// ═════════════════════════════════════════════════════════════════════════
// 5. Bars stay at the bottom
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn bars_end_directly_above_cursor(ops in prop::collection::vec(op(), 0..40)) {
        let (log, sink, out) = setup();
        log.sinks().write(&sink, b"\n\n").unwrap();
        let mut bar = StatusbarHandle::default();
        log.create_statusbar_parallel(&mut bar, sink, &[2, 1], &[12, 8], &["", ""], &["", ""])
            .unwrap();

        let mut logged = 0;
        for op in &ops {
            match op {
                Op::Update { bar: index, percent } => {
                    log.update_statusbar(&bar, *index, *percent).unwrap();
                }
                Op::Log(message) => {
                    log.log(LogLevel::Info, "p", sink, format_args!("{message}")).unwrap();
                    logged += 1;
                }
            }
        }

        let expected: Vec<String> = (0..2)
            .map(|index| {
                let state = log.statusbars().bar(&bar, index).unwrap();
                BarLine::new("", state.width)
                    .percent(state.percent)
                    .phase(state.phase)
                    .format()
            })
            .collect();

        let screen = out.render(60, 12);
        let full = screen.full_text();
        let lines: Vec<&str> = full.lines().collect();
        prop_assert_eq!(lines.len(), logged + 2, "{}", screen.dump());
        prop_assert_eq!(lines[logged], expected[0].as_str());
        prop_assert_eq!(lines[logged + 1], expected[1].as_str());
        prop_assert!(lines[..logged].iter().all(|l| l.starts_with("INFO [p]: ")));
    }
}
