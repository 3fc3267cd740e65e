use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;

use super::close_coordinator::CloseCoordinator;
use super::monitor::spawn_monitor;
use crate::configuration::types::SessionConfig;
use crate::error_handling::types::SessionError;
use crate::logger::LogSink;
use crate::network::tuning::apply_no_delay;
use crate::network::types::{display_addr, BoxedConnection};
use crate::relay::{pipe, Direction, LoopEnd, PipeOptions, SessionStats, StatsSnapshot};

/// Outcome of a session that got as far as relaying.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub started_at: DateTime<Utc>,
    pub stats: StatsSnapshot,
    /// Direction whose loop ended the session first.
    pub closed_by: Option<Direction>,
    pub close_reason: String,
}

/// One accepted local connection paired with its remote peer.
///
/// The session owns both connections and is the only place that closes them.
pub struct ProxySession {
    local: BoxedConnection,
    config: Arc<SessionConfig>,
    log: Arc<dyn LogSink>,
}

impl ProxySession {
    pub fn new(local: BoxedConnection, config: Arc<SessionConfig>, log: Arc<dyn LogSink>) -> Self {
        Self { local, config, log }
    }

    /// Dials the remote peer, relays both directions until one of them ends,
    /// then closes both legs and reports the totals.
    ///
    /// A failed dial ends only this session: it is logged, the local
    /// connection is shut down and the error returned.
    pub async fn start(self) -> Result<SessionReport, SessionError> {
        let ProxySession {
            local,
            config,
            log,
        } = self;

        let remote = match config.remote.dial().await {
            Ok(remote) => remote,
            Err(e) => {
                log.warn(format_args!("{}", e));
                shutdown(local, &*log).await;
                return Err(e.into());
            }
        };

        if config.no_delay {
            apply_no_delay(&*local, &*log);
            apply_no_delay(&*remote, &*log);
        }

        let local_peer = local.peer_addr();
        let remote_peer = remote.peer_addr();
        let remote_label = remote_peer
            .map(|a| a.to_string())
            .unwrap_or_else(|| config.remote.to_string());
        log.info(format_args!(
            "Opened {} >>> {}",
            display_addr(local_peer),
            remote_label
        ));

        let stats = Arc::new(SessionStats::new());
        let coordinator = Arc::new(CloseCoordinator::new());

        let (local_read, local_write) = tokio::io::split(local);
        let (remote_read, remote_write) = tokio::io::split(remote);

        let outbound = spawn_pipe(
            local_read,
            remote_write,
            PipeOptions {
                direction: Direction::Outbound,
                pipeline: config.pipeline.clone(),
                output_hex: config.output_hex,
                src_addr: local_peer,
                dst_addr: remote_peer,
            },
            Arc::clone(&stats),
            Arc::clone(&coordinator),
            Arc::clone(&log),
        );
        let inbound = spawn_pipe(
            remote_read,
            local_write,
            PipeOptions {
                direction: Direction::Inbound,
                pipeline: config.pipeline.clone(),
                output_hex: config.output_hex,
                src_addr: remote_peer,
                dst_addr: local_peer,
            },
            Arc::clone(&stats),
            Arc::clone(&coordinator),
            Arc::clone(&log),
        );
        let monitor = spawn_monitor(
            Arc::clone(&stats),
            Arc::clone(&coordinator),
            Arc::clone(&log),
            config.stats_interval,
        );

        coordinator.closed().await;

        // The fire that woke us also stopped the monitor; wait for it so no
        // stats line can follow the final report.
        if let Err(e) = monitor.await {
            log.warn(format_args!("Stats monitor failed: {}", e));
        }

        // Both loops hand their halves back once they see the close.
        match (outbound.await, inbound.await) {
            (Ok((local_read, remote_write)), Ok((remote_read, local_write))) => {
                let local = local_read.unsplit(local_write);
                let remote = remote_read.unsplit(remote_write);
                shutdown(local, &*log).await;
                shutdown(remote, &*log).await;
            }
            (outbound, inbound) => {
                for (direction, result) in [
                    (Direction::Outbound, outbound.err()),
                    (Direction::Inbound, inbound.err()),
                ] {
                    if let Some(e) = result {
                        log.warn(format_args!("{} copy loop failed: {}", direction, e));
                    }
                }
            }
        }

        let snapshot = stats.snapshot();
        let (closed_by, close_reason) = match coordinator.reason() {
            Some(reason) => (Some(reason.direction()), reason.to_string()),
            None => (None, "unknown".to_string()),
        };
        log.info(format_args!(
            "Closed ({} bytes sent, {} bytes received, {}): {}",
            snapshot.sent, snapshot.received, close_reason, snapshot
        ));

        Ok(SessionReport {
            started_at: stats.started_at(),
            stats: snapshot,
            closed_by,
            close_reason,
        })
    }
}

/// Upper bound on a closing handshake, such as a TLS close_notify, towards a
/// peer that no longer reads.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Shuts a connection down and drops it. Errors are expected here, the peer
/// is often gone already.
async fn shutdown(mut conn: BoxedConnection, log: &dyn LogSink) {
    match tokio::time::timeout(SHUTDOWN_GRACE, conn.shutdown()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => log.trace(format_args!("Shutdown error ignored: {}", e)),
        Err(_) => log.trace(format_args!("Shutdown timed out")),
    }
}

/// Fires the coordinator if the copy loop task goes away without having
/// reported, so the session never waits on a loop that is gone.
struct AbortGuard {
    coordinator: Arc<CloseCoordinator>,
    direction: Direction,
}

impl Drop for AbortGuard {
    fn drop(&mut self) {
        self.coordinator.fire(LoopEnd::Aborted(self.direction));
    }
}

fn spawn_pipe<R, W>(
    src: R,
    dst: W,
    options: PipeOptions,
    stats: Arc<SessionStats>,
    coordinator: Arc<CloseCoordinator>,
    log: Arc<dyn LogSink>,
) -> JoinHandle<(R, W)>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let _guard = AbortGuard {
            coordinator: Arc::clone(&coordinator),
            direction: options.direction,
        };
        pipe(src, dst, &options, &stats, &coordinator, &*log).await
    })
}
