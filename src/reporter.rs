use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crate::{
    constants::{DEFAULT_REPORT_PERIOD_MS, REPORTER_TICK_MS},
    search::SearchInfo,
};

/// A thread that watches a running search: it keeps `info.time` current,
/// raises the stop flag when the wall-clock budget runs out, and emits a
/// throttled UCI info line. It exits once the stop flag is set, which the
/// search does itself on completion.
pub struct Reporter {
    handle: Option<JoinHandle<()>>,
}

impl Reporter {
    pub fn spawn(info: Arc<SearchInfo>, stop: Arc<AtomicBool>, timeout_ms: Option<u64>) -> Self {
        Self::spawn_with_period(info, stop, timeout_ms, DEFAULT_REPORT_PERIOD_MS)
    }

    pub fn spawn_with_period(
        info: Arc<SearchInfo>,
        stop: Arc<AtomicBool>,
        timeout_ms: Option<u64>,
        report_period_ms: u64,
    ) -> Self {
        let handle = thread::spawn(move || {
            let start = Instant::now();
            let mut last_report = Instant::now();

            while !stop.load(Ordering::Relaxed) {
                thread::sleep(Duration::from_millis(REPORTER_TICK_MS));

                let elapsed_ms = start.elapsed().as_millis() as u64;
                info.set_time_ms(elapsed_ms);

                if let Some(timeout) = timeout_ms {
                    if elapsed_ms >= timeout {
                        stop.store(true, Ordering::Relaxed);
                        break;
                    }
                }

                if last_report.elapsed().as_millis() as u64 >= report_period_ms {
                    last_report = Instant::now();
                    print_info_line(&info, elapsed_ms);
                }
            }

            info.set_time_ms(start.elapsed().as_millis() as u64);
        });

        Self {
            handle: Some(handle),
        }
    }

    pub fn join(mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn print_info_line(info: &SearchInfo, elapsed_ms: u64) {
    let nodes = info.nodes();
    let nps = if elapsed_ms > 0 {
        nodes * 1000 / elapsed_ms
    } else {
        0
    };

    let pv_string = info
        .pv()
        .iter()
        .map(|m| m.to_uci_string())
        .collect::<Vec<String>>()
        .join(" ");

    println!(
        "info depth {} score cp {} nodes {} nps {} time {} pv {}",
        info.depth(),
        (info.score() * 100.0).round() as i64,
        nodes,
        nps,
        elapsed_ms,
        pv_string
    );
}
