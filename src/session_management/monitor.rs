use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::close_coordinator::CloseCoordinator;
use crate::logger::LogSink;
use crate::relay::SessionStats;

/// Default period between two stats reports.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);

/// Spawns the periodic stats reporter of a session.
///
/// The task reports at debug level every `period` until the coordinator's
/// monitor stop signal is raised. A report runs while the coordinator is
/// held open, so no line is ever logged after the session closed.
pub fn spawn_monitor(
    stats: Arc<SessionStats>,
    coordinator: Arc<CloseCoordinator>,
    log: Arc<dyn LogSink>,
    period: Duration,
) -> JoinHandle<()> {
    let mut stop = coordinator.monitor_stop();

    tokio::spawn(async move {
        // First report after one full period, not immediately.
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.wait_for(|stopped| *stopped) => break,
                _ = ticker.tick() => {
                    let reported = coordinator
                        .while_open(|| log.debug(format_args!("Stats: {}", stats.snapshot())));
                    if reported.is_none() {
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::testing::RecordingSink;
    use crate::relay::{Direction, LoopEnd};
    use log::Level;
    use std::fmt;
    use tokio::sync::Notify;

    /// Takes its time over every line and announces when it starts one.
    #[derive(Default)]
    struct SlowSink {
        entered: Notify,
        lines: RecordingSink,
    }

    impl LogSink for SlowSink {
        fn enabled(&self, _level: Level) -> bool {
            true
        }

        fn log(&self, level: Level, args: fmt::Arguments<'_>) {
            self.entered.notify_one();
            std::thread::sleep(Duration::from_millis(50));
            self.lines.log(level, args);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn reports_on_each_period_until_stopped() {
        let stats = Arc::new(SessionStats::new());
        let coordinator = Arc::new(CloseCoordinator::new());
        let sink = Arc::new(RecordingSink::default());

        let handle = spawn_monitor(
            Arc::clone(&stats),
            Arc::clone(&coordinator),
            sink.clone(),
            Duration::from_secs(30),
        );

        stats.add(Direction::Outbound, 1024);
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert_eq!(sink.messages(Level::Debug).len(), 3);
        assert!(sink.messages(Level::Debug)[0].contains("1.00KB sent"));

        coordinator.fire(LoopEnd::Eof(Direction::Outbound));
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.messages(Level::Debug).len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_without_reporting_when_closed_early() {
        let coordinator = Arc::new(CloseCoordinator::new());
        let sink = Arc::new(RecordingSink::default());
        coordinator.fire(LoopEnd::Eof(Direction::Inbound));

        spawn_monitor(
            Arc::new(SessionStats::new()),
            coordinator,
            sink.clone(),
            Duration::from_millis(10),
        )
        .await
        .unwrap();

        assert!(sink.records().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn close_waits_for_report_in_progress() {
        let coordinator = Arc::new(CloseCoordinator::new());
        let sink = Arc::new(SlowSink::default());

        let handle = spawn_monitor(
            Arc::new(SessionStats::new()),
            Arc::clone(&coordinator),
            sink.clone(),
            Duration::from_millis(10),
        );

        sink.entered.notified().await;
        coordinator.fire(LoopEnd::Eof(Direction::Outbound));
        let closed_at = std::time::Instant::now();
        handle.await.unwrap();

        let records = sink.lines.records();
        assert!(!records.is_empty());
        for r in records {
            assert!(r.at <= closed_at);
        }
    }
}
