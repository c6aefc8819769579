//! One standby connection's lifecycle: heartbeat while waiting, handshake, dial the target,
//! hand off to the bridge.

use std::net::SocketAddr;
use std::sync::Arc;

use slog::{debug, info, o, warn};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::bridge::SocketBridge;
use crate::codec::{Codec, PkgType};
use crate::config::Config;
use crate::error::SessionError;
use crate::framed;
use crate::state::PoolState;

/// Drives one dialed master connection from standby through activation and hand-off.
///
/// `local_addr` is the pool key under which `stream` was already registered in
/// `spareSlaverPool` by the caller (the pool controller) before this function was spawned.
pub async fn run(
    local_addr: SocketAddr,
    mut master_sock: TcpStream,
    config: Arc<Config>,
    codec: Arc<Codec>,
    state: Arc<PoolState>,
    bridge: Arc<SocketBridge>,
    logger: slog::Logger,
) {
    let logger = logger.new(o!("master" => local_addr.to_string()));

    if let Err(e) = wait_for_handshake(&mut master_sock, &config, &codec, &logger).await {
        warn!(logger, "standby connection abandoned"; "reason" => %e);
        state.remove_spare(local_addr);
        let _ = master_sock.shutdown().await;
        return;
    }

    // S2 — promote: from this moment the connection no longer counts against the standby cap.
    state.promote(local_addr);
    info!(logger, "activated by master");

    // S3 — dial target.
    let target_sock = match TcpStream::connect(config.target_addr).await {
        Ok(sock) => sock,
        Err(e) => {
            let e = SessionError::TargetUnreachable(e);
            warn!(logger, "dropping activation"; "target" => %config.target_addr, "reason" => %e);
            state.remove_working(local_addr);
            let _ = master_sock.shutdown().await;
            return;
        }
    };

    // S4 — hand off to the bridge.
    debug!(logger, "handing off to bridge"; "target" => %config.target_addr);
    let done_logger = logger.clone();
    bridge.add_conn_pair(master_sock, target_sock, move || {
        state.remove_working(local_addr);
        info!(done_logger, "bridge session complete");
    });
}

/// Phase S1: reply to heartbeats until the activation handshake arrives, then reply with
/// the slaver-to-master handshake. Any timeout, transport error, bad frame or unexpected
/// packet type on this channel is fatal for the session.
async fn wait_for_handshake(
    master_sock: &mut TcpStream,
    config: &Config,
    codec: &Codec,
    logger: &slog::Logger,
) -> Result<(), SessionError> {
    loop {
        let frame = framed::read_exact(master_sock, config.spare_slaver_ttl)
            .await
            .map_err(|e| match e {
                framed::FramedReadError::Timeout => SessionError::Timeout,
                framed::FramedReadError::Closed => {
                    SessionError::Transport(std::io::ErrorKind::UnexpectedEof.into())
                }
                framed::FramedReadError::Io(io) => SessionError::Transport(io),
            })?;

        let pkg = codec.decode(&frame).ok_or(SessionError::Protocol)?;

        match pkg.pkg_type {
            PkgType::HeartBeat => {
                debug!(logger, "heartbeat");
                master_sock.write_all(&codec.heartbeat()).await?;
            }
            PkgType::HsM2S => break,
            PkgType::HsS2M => return Err(SessionError::Protocol),
        }
    }

    master_sock
        .write_all(&codec.handshake_slaver_to_master())
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    async fn loopback_pair() -> (TcpStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let connect = TcpStream::connect(addr);
        let accept = listener.accept();
        let (client, server) = tokio::join!(connect, accept);
        (client.unwrap(), server.unwrap().0)
    }

    fn test_config(target: SocketAddr) -> Config {
        Config::new("127.0.0.1:1".parse().unwrap(), target, "shootback")
            .with_spare_slaver_ttl(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn heartbeats_are_echoed_then_handshake_completes() {
        let (mut master_near, master_sock) = loopback_pair().await;
        let codec = Codec::new("shootback");

        let config = test_config("127.0.0.1:1".parse().unwrap());
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        let handshake = tokio::spawn({
            let mut sock = master_sock;
            let codec = codec.clone();
            let config = config.clone();
            let logger = logger.clone();
            async move { wait_for_handshake(&mut sock, &config, &codec, &logger).await }
        });

        master_near.write_all(&codec.heartbeat()).await.unwrap();
        let mut reply = [0u8; crate::codec::PACKAGE_SIZE];
        master_near.read_exact(&mut reply).await.unwrap();
        assert_eq!(codec.decode(&reply).unwrap().pkg_type, PkgType::HeartBeat);

        master_near
            .write_all(&codec.handshake_master_to_slaver())
            .await
            .unwrap();

        let result = handshake.await.unwrap();
        assert!(result.is_ok());

        let mut reply = [0u8; crate::codec::PACKAGE_SIZE];
        master_near.read_exact(&mut reply).await.unwrap();
        assert_eq!(codec.decode(&reply).unwrap().pkg_type, PkgType::HsS2M);
    }

    #[tokio::test]
    async fn bad_secret_fails_the_session() {
        let (mut master_near, mut master_sock) = loopback_pair().await;
        let sender_codec = Codec::new("wrong-secret");
        let receiver_codec = Codec::new("shootback");
        let config = test_config("127.0.0.1:1".parse().unwrap());
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        master_near
            .write_all(&sender_codec.heartbeat())
            .await
            .unwrap();

        let result = wait_for_handshake(&mut master_sock, &config, &receiver_codec, &logger).await;
        assert!(matches!(result, Err(SessionError::Protocol)));
    }

    #[tokio::test]
    async fn unexpected_type_fails_the_session() {
        let (mut master_near, mut master_sock) = loopback_pair().await;
        let codec = Codec::new("shootback");
        let config = test_config("127.0.0.1:1".parse().unwrap());
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        master_near
            .write_all(&codec.handshake_slaver_to_master())
            .await
            .unwrap();

        let result = wait_for_handshake(&mut master_sock, &config, &codec, &logger).await;
        assert!(matches!(result, Err(SessionError::Protocol)));
    }

    #[tokio::test]
    async fn handshake_times_out_with_no_traffic() {
        let (_master_near, mut master_sock) = loopback_pair().await;
        let codec = Codec::new("shootback");
        let config = test_config("127.0.0.1:1".parse().unwrap());
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        let result = wait_for_handshake(&mut master_sock, &config, &codec, &logger).await;
        assert!(matches!(result, Err(SessionError::Timeout)));
    }

    #[tokio::test]
    async fn target_unreachable_after_handshake_retires_the_working_record() {
        use crate::state::PoolState;

        // bind then drop a listener so the address is guaranteed to refuse connections.
        let dead_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let target_addr = dead_listener.local_addr().unwrap();
        drop(dead_listener);

        let (mut master_near, master_sock) = loopback_pair().await;
        let local_addr = master_sock.local_addr().unwrap();
        let codec = Codec::new("shootback");
        let config = test_config(target_addr);
        let logger = slog::Logger::root(slog::Discard, slog::o!());

        let state = Arc::new(PoolState::new());
        state.insert_spare(local_addr);

        let session = tokio::spawn(run(
            local_addr,
            master_sock,
            Arc::new(config),
            Arc::new(codec.clone()),
            state.clone(),
            Arc::new(SocketBridge::new()),
            logger,
        ));

        master_near
            .write_all(&codec.handshake_master_to_slaver())
            .await
            .unwrap();
        let mut reply = [0u8; crate::codec::PACKAGE_SIZE];
        master_near.read_exact(&mut reply).await.unwrap();
        assert_eq!(codec.decode(&reply).unwrap().pkg_type, PkgType::HsS2M);

        session.await.unwrap();
        assert_eq!(
            state.spare_len(),
            0,
            "a failed activation must not linger in standby"
        );
        assert_eq!(
            state.working_len(),
            0,
            "a target-unreachable activation must not linger as working"
        );
    }
}
