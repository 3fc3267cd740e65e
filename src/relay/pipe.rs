use std::io;
use std::net::SocketAddr;

use log::Level;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use super::stats::SessionStats;
use super::types::{Direction, LoopEnd};
use crate::inspection::Pipeline;
use crate::logger::LogSink;
use crate::network::types::display_addr;
use crate::session_management::close_coordinator::CloseCoordinator;

/// Largest chunk read in one call.
pub const CHUNK_SIZE: usize = 0xffff;

/// Per-direction settings of a copy loop.
#[derive(Debug, Clone)]
pub struct PipeOptions {
    pub direction: Direction,
    pub pipeline: Pipeline,
    pub output_hex: bool,
    pub src_addr: Option<SocketAddr>,
    pub dst_addr: Option<SocketAddr>,
}

/// Copies `src` into `dst` one chunk at a time until a read or write fails,
/// then reports to `coordinator`.
///
/// Every chunk goes through the inspection pipeline before it is written, and
/// only bytes that were actually written are added to this direction's
/// counter. The read of the next chunk does not start before the previous
/// write completed, so a slow `dst` throttles `src`.
///
/// When the coordinator fires because of the other direction, the pending
/// read or write is abandoned. The halves are handed back to the caller, who
/// owns closing them.
pub async fn pipe<R, W>(
    mut src: R,
    mut dst: W,
    options: &PipeOptions,
    stats: &SessionStats,
    coordinator: &CloseCoordinator,
    log: &dyn LogSink,
) -> (R, W)
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let direction = options.direction;
    let closed = coordinator.closed();
    tokio::pin!(closed);

    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = tokio::select! {
            biased;
            _ = &mut closed => break,
            res = src.read(&mut buf) => match res {
                Ok(0) => {
                    coordinator.fire(LoopEnd::Eof(direction));
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    log.warn(format_args!("Read failed '{}'", e));
                    coordinator.fire(LoopEnd::ReadFailed(direction, e));
                    break;
                }
            },
        };

        let chunk = options.pipeline.apply(&buf[..n]);

        log.debug(format_args!(
            "{} {} {}: {} bytes {}",
            display_addr(options.src_addr),
            direction.arrow(),
            display_addr(options.dst_addr),
            n,
            direction.verb()
        ));
        if log.enabled(Level::Trace) {
            if options.output_hex {
                log.trace(format_args!("{}", hex::encode(&chunk)));
            } else {
                log.trace(format_args!("{}", String::from_utf8_lossy(&chunk)));
            }
        }

        tokio::select! {
            biased;
            _ = &mut closed => break,
            res = write_chunk(&mut dst, &chunk, direction, stats) => {
                if let Err(e) = res {
                    log.warn(format_args!("Write failed '{}'", e));
                    coordinator.fire(LoopEnd::WriteFailed(direction, e));
                    break;
                }
            },
        }
    }

    (src, dst)
}

/// Writes all of `chunk`, counting every partial write as soon as it lands,
/// so a write abandoned halfway still accounts for what `dst` accepted.
async fn write_chunk<W>(
    dst: &mut W,
    chunk: &[u8],
    direction: Direction,
    stats: &SessionStats,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    let mut offset = 0;
    while offset < chunk.len() {
        let n = dst.write(&chunk[offset..]).await?;
        if n == 0 {
            return Err(io::ErrorKind::WriteZero.into());
        }
        stats.add(direction, n as u64);
        offset += n;
    }
    dst.flush().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inspection::{Matcher, Replacer};
    use crate::logger::testing::RecordingSink;
    use std::sync::Arc;
    use std::time::Duration;
    use tokio_test::io::Builder;

    fn options(direction: Direction, pipeline: Pipeline) -> PipeOptions {
        PipeOptions {
            direction,
            pipeline,
            output_hex: false,
            src_addr: None,
            dst_addr: None,
        }
    }

    #[tokio::test]
    async fn forwards_until_eof_and_counts_written_bytes() {
        let src = Builder::new().read(b"hello ").read(b"world").build();
        let dst = Builder::new().write(b"hello ").write(b"world").build();
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();

        pipe(
            src,
            dst,
            &options(Direction::Outbound, Pipeline::default()),
            &stats,
            &coordinator,
            &sink,
        )
        .await;

        assert_eq!(stats.sent(), 11);
        assert_eq!(stats.received(), 0);
        assert!(matches!(coordinator.reason(), Some(LoopEnd::Eof(Direction::Outbound))));
        // End of stream is not a failure.
        assert!(sink.messages(Level::Warn).is_empty());
    }

    #[tokio::test]
    async fn transform_output_is_what_gets_written() {
        let src = Builder::new().read(b"hello").build();
        let dst = Builder::new().write(b"HELLO!").build();
        let replacer: Replacer = Arc::new(|b: &[u8]| {
            let mut out = b.to_ascii_uppercase();
            out.push(b'!');
            out
        });
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();

        pipe(
            src,
            dst,
            &options(Direction::Inbound, Pipeline::new(None, Some(replacer))),
            &stats,
            &coordinator,
            &sink,
        )
        .await;

        // Accounting follows the written bytes, not the read ones.
        assert_eq!(stats.received(), 6);
    }

    #[tokio::test]
    async fn read_error_is_logged_and_reported() {
        let src = Builder::new()
            .read(b"abc")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let dst = Builder::new().write(b"abc").build();
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();

        pipe(
            src,
            dst,
            &options(Direction::Outbound, Pipeline::default()),
            &stats,
            &coordinator,
            &sink,
        )
        .await;

        assert_eq!(stats.sent(), 3);
        assert!(matches!(
            coordinator.reason(),
            Some(LoopEnd::ReadFailed(Direction::Outbound, _))
        ));
        assert_eq!(sink.messages(Level::Warn), vec!["Read failed 'reset'"]);
    }

    #[tokio::test]
    async fn write_error_stops_without_counting() {
        let src = Builder::new().read(b"abc").build();
        let dst = Builder::new()
            .write_error(io::Error::new(io::ErrorKind::BrokenPipe, "broken"))
            .build();
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();

        pipe(
            src,
            dst,
            &options(Direction::Inbound, Pipeline::default()),
            &stats,
            &coordinator,
            &sink,
        )
        .await;

        assert_eq!(stats.received(), 0);
        assert!(matches!(
            coordinator.reason(),
            Some(LoopEnd::WriteFailed(Direction::Inbound, _))
        ));
        assert_eq!(sink.messages(Level::Warn), vec!["Write failed 'broken'"]);
    }

    #[tokio::test]
    async fn stops_when_other_direction_closed_the_session() {
        let (src, _keep_open) = tokio::io::duplex(64);
        let (dst, _peer) = tokio::io::duplex(64);
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();

        coordinator.fire(LoopEnd::Eof(Direction::Inbound));
        pipe(
            src,
            dst,
            &options(Direction::Outbound, Pipeline::default()),
            &stats,
            &coordinator,
            &sink,
        )
        .await;

        assert!(matches!(coordinator.reason(), Some(LoopEnd::Eof(Direction::Inbound))));
    }

    #[tokio::test]
    async fn partial_write_is_counted_when_session_closes() {
        let src = Builder::new().read(&[7u8; 1000]).build();
        // Only 100 bytes fit until the peer reads, which it does not.
        let (dst, mut peer) = tokio::io::duplex(100);
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();
        let opts = options(Direction::Outbound, Pipeline::default());

        let relay = pipe(src, dst, &opts, &stats, &coordinator, &sink);
        let close = async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            coordinator.fire(LoopEnd::Eof(Direction::Inbound));
        };
        let ((_src, dst), ()) = tokio::join!(relay, close);
        drop(dst);

        let mut delivered = Vec::new();
        peer.read_to_end(&mut delivered).await.unwrap();
        assert_eq!(delivered.len(), 100);
        assert_eq!(stats.sent(), delivered.len() as u64);
        assert!(sink.messages(Level::Warn).is_empty());
    }

    #[tokio::test]
    async fn trace_dump_uses_hex_when_requested() {
        let src = Builder::new().read(&[0xde, 0xad, 0xbe, 0xef]).build();
        let dst = Builder::new().write(&[0xde, 0xad, 0xbe, 0xef]).build();
        let stats = SessionStats::new();
        let coordinator = CloseCoordinator::new();
        let sink = RecordingSink::default();
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let matcher: Matcher = Arc::new(move |b: &[u8]| seen2.lock().unwrap().push(b.to_vec()));

        let mut opts = options(Direction::Outbound, Pipeline::new(Some(matcher), None));
        opts.output_hex = true;
        pipe(src, dst, &opts, &stats, &coordinator, &sink).await;

        assert_eq!(sink.messages(Level::Trace), vec!["deadbeef"]);
        assert_eq!(sink.messages(Level::Debug), vec!["- >>> -: 4 bytes sent"]);
        assert_eq!(seen.lock().unwrap().as_slice(), &[vec![0xde, 0xad, 0xbe, 0xef]]);
    }
}
