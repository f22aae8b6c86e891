use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use bookmarks::commands::Commands;
use bookmarks::config::{BookmarksConfig, CorruptPolicy};
use bookmarks::dispatch::{Dispatched, Dispatcher, UserLevel};
use bookmarks::host::{Outbox, PlayerContext, PlayerLocation};
use bookmarks::location::LocationKey;
use bookmarks::store::BookmarkStore;
use bytes::Bytes;
use starproto::packet::{PacketReader, PacketWriter};
use starproto::player::PlayerId;
use starproto::shard::{ShardReq, ShardResp, parse_req};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tracing::{Level, error, info, warn};

fn usage_and_exit() -> ! {
    eprintln!(
        "bookmark_shard\n\n\
USAGE:\n  bookmark_shard [--bind HOST:PORT] [--dir PATH] [--on-corrupt empty|fail] [--min-level LEVEL]\n\n\
ENV:\n  BOOKMARK_SHARD_BIND     default 127.0.0.1:5010\n  BOOKMARKS_DIR           default config/bookmarks\n  BOOKMARKS_ON_CORRUPT    empty|fail, default empty (unreadable file = no bookmarks)\n  BOOKMARKS_MIN_LEVEL     guest|registered|moderator|admin|owner, default guest\n"
    );
    std::process::exit(2);
}

#[derive(Clone, Debug)]
struct Config {
    bind: SocketAddr,
    bookmarks: BookmarksConfig,
    min_level: UserLevel,
}

fn parse_args() -> Config {
    let mut bind: SocketAddr = std::env::var("BOOKMARK_SHARD_BIND")
        .unwrap_or_else(|_| "127.0.0.1:5010".to_string())
        .parse()
        .unwrap_or_else(|_| usage_and_exit());

    let mut bookmarks = BookmarksConfig::default();
    if let Ok(v) = std::env::var("BOOKMARKS_DIR") {
        bookmarks.dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("BOOKMARKS_ON_CORRUPT") {
        bookmarks.on_corrupt = CorruptPolicy::parse(&v).unwrap_or_else(|| usage_and_exit());
    }
    let mut min_level = match std::env::var("BOOKMARKS_MIN_LEVEL") {
        Ok(v) => UserLevel::parse(&v).unwrap_or_else(|| usage_and_exit()),
        Err(_) => UserLevel::Guest,
    };

    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--bind" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bind = v.parse().unwrap_or_else(|_| usage_and_exit());
            }
            "--dir" => {
                bookmarks.dir = it.next().unwrap_or_else(|| usage_and_exit()).into();
            }
            "--on-corrupt" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                bookmarks.on_corrupt = CorruptPolicy::parse(&v).unwrap_or_else(|| usage_and_exit());
            }
            "--min-level" => {
                let v = it.next().unwrap_or_else(|| usage_and_exit());
                min_level = UserLevel::parse(&v).unwrap_or_else(|| usage_and_exit());
            }
            "-h" | "--help" => usage_and_exit(),
            _ => usage_and_exit(),
        }
    }

    Config {
        bind,
        bookmarks,
        min_level,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,bookmark_shard=info".into()),
        )
        .with_target(false)
        .with_max_level(Level::INFO)
        .init();

    let cfg = parse_args();

    let store = BookmarkStore::new(&cfg.bookmarks);
    store.ensure_dir()?;
    info!(
        dir = %store.dir().display(),
        on_corrupt = cfg.bookmarks.on_corrupt.as_str(),
        min_level = cfg.min_level.as_str(),
        "bookmark store ready"
    );
    let dispatcher = Arc::new(Dispatcher::new(Commands::new(store)).floor(cfg.min_level));

    let listener = TcpListener::bind(cfg.bind)
        .await
        .with_context(|| format!("failed to bind {}", cfg.bind))?;
    info!(bind = %cfg.bind, "bookmark_shard listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(peer = %peer, "broker connected");

        let dispatcher = dispatcher.clone();
        tokio::spawn(async move {
            let (rd, wr) = stream.into_split();
            match handle_broker(rd, wr, &dispatcher).await {
                Ok(()) => info!(peer = %peer, "broker disconnected"),
                Err(e) => warn!(peer = %peer, err = %format!("{e:#}"), "broker connection ended with error"),
            }
        });
    }
}

/// Serve one broker connection. Requests are answered strictly in arrival order.
async fn handle_broker<R, W>(rd: R, wr: W, dispatcher: &Dispatcher) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut pr = PacketReader::new(rd);
    let mut pw = PacketWriter::new(wr);

    while let Some(pkt) = pr.read_packet().await? {
        let req = parse_req(pkt).context("bad broker request")?;
        for resp in handle_req(dispatcher, req) {
            let (id, pid, body) = resp.parts();
            pw.write_packet_parts(id, &[&pid, body]).await?;
        }
        pw.flush().await?;
    }
    Ok(())
}

fn handle_req(dispatcher: &Dispatcher, req: ShardReq) -> Vec<ShardResp> {
    let ShardReq::Command {
        player,
        level,
        on_ship,
        planet,
        line,
    } = req;

    let mut ob = Outbox::new();
    match request_context(player, level, on_ship, &planet, &line) {
        Err(msg) => {
            warn!(player = %player, err = msg, "rejecting broker request");
            ob.out.push(err_resp(player, msg));
        }
        Ok((ctx, level, line)) => match dispatcher.dispatch(&ctx, level, line, &mut ob) {
            Ok(Dispatched::Ran(_)) => {}
            Ok(Dispatched::Denied { need }) => {
                info!(player = %player, level = level.as_str(), need = need.as_str(), "command denied");
            }
            Ok(Dispatched::Unknown) => ob.out.push(err_resp(player, "unknown command")),
            Err(e) => {
                error!(player = %player, line = %line, err = %format!("{e:#}"), "command failed");
                ob.out.push(err_resp(player, "internal error"));
            }
        },
    }
    ob.out.push(ShardResp::Done { player });
    ob.out
}

fn request_context<'a>(
    player: PlayerId,
    level: u8,
    on_ship: bool,
    planet: &[u8],
    line: &'a [u8],
) -> Result<(PlayerContext, UserLevel, &'a str), &'static str> {
    let level = UserLevel::from_wire(level).ok_or("unknown user level")?;
    let line = std::str::from_utf8(line).map_err(|_| "command line is not utf-8")?;
    let location = if on_ship {
        PlayerLocation::Ship
    } else {
        let key = std::str::from_utf8(planet)
            .ok()
            .and_then(|s| s.parse::<LocationKey>().ok())
            .ok_or("bad planet location key")?;
        PlayerLocation::Planet(key)
    };
    Ok((PlayerContext { player, location }, level, line))
}

fn err_resp(player: PlayerId, msg: &str) -> ShardResp {
    ShardResp::Err {
        player,
        msg: Bytes::copy_from_slice(msg.as_bytes()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use starproto::fly_ship::PKT_FLY_SHIP;
    use starproto::shard::parse_resp;

    const P: PlayerId = PlayerId(0xabc);

    fn dispatcher_in(dir: &std::path::Path) -> Dispatcher {
        Dispatcher::new(Commands::new(BookmarkStore::new(&BookmarksConfig {
            dir: dir.to_path_buf(),
            on_corrupt: CorruptPolicy::Empty,
        })))
    }

    fn cmd(level: UserLevel, planet: Option<&'static str>, line: &'static str) -> ShardReq {
        ShardReq::Command {
            player: P,
            level: level.to_wire(),
            on_ship: planet.is_none(),
            planet: Bytes::from_static(planet.unwrap_or("").as_bytes()),
            line: Bytes::from_static(line.as_bytes()),
        }
    }

    #[test]
    fn every_response_ends_with_done() {
        let td = tempfile::tempdir().unwrap();
        let d = dispatcher_in(td.path());

        let out = handle_req(&d, cmd(UserLevel::Guest, Some("10:20:30:1:2"), "bookmark_add Home"));
        assert!(matches!(out.as_slice(), [ShardResp::Chat { .. }, ShardResp::Done { .. }]));

        let out = handle_req(&d, cmd(UserLevel::Guest, None, "goto Home"));
        assert!(matches!(
            out.as_slice(),
            [ShardResp::Packet { .. }, ShardResp::Chat { .. }, ShardResp::Done { .. }]
        ));
        let ShardResp::Packet { packet, .. } = &out[0] else {
            unreachable!()
        };
        assert_eq!(packet[0], PKT_FLY_SHIP);
    }

    #[test]
    fn bad_requests_get_an_error_not_a_handler_run() {
        let td = tempfile::tempdir().unwrap();
        let d = dispatcher_in(td.path());

        let out = handle_req(&d, cmd(UserLevel::Guest, Some("10:20"), "bookmark_add Home"));
        assert!(matches!(
            out.as_slice(),
            [ShardResp::Err { .. }, ShardResp::Done { .. }]
        ));
        assert!(!d.commands().store().path_for(P).exists());

        let req = ShardReq::Command {
            player: P,
            level: 200,
            on_ship: true,
            planet: Bytes::new(),
            line: Bytes::from_static(b"goto"),
        };
        assert!(matches!(
            handle_req(&d, req).as_slice(),
            [ShardResp::Err { .. }, ShardResp::Done { .. }]
        ));

        let out = handle_req(&d, cmd(UserLevel::Guest, None, "fly_away"));
        let ShardResp::Err { msg, .. } = &out[0] else {
            panic!("want err, got {out:?}");
        };
        assert_eq!(&msg[..], b"unknown command");
    }

    #[test]
    fn fatal_command_errors_become_internal_error() {
        let td = tempfile::tempdir().unwrap();
        // Directory never created, so saving fails.
        let d = dispatcher_in(&td.path().join("absent"));

        let out = handle_req(&d, cmd(UserLevel::Guest, Some("1:1:1:1:1"), "bookmark_add A"));
        let ShardResp::Err { msg, .. } = &out[0] else {
            panic!("want err, got {out:?}");
        };
        assert_eq!(&msg[..], b"internal error");
        assert!(matches!(out.last(), Some(ShardResp::Done { .. })));
    }

    #[tokio::test]
    async fn serves_requests_over_the_packet_link() {
        let td = tempfile::tempdir().unwrap();
        let d = dispatcher_in(td.path());

        let (client, server) = tokio::io::duplex(4096);
        let (srd, swr) = tokio::io::split(server);
        let serve = tokio::spawn(async move { handle_broker(srd, swr, &d).await });

        let (crd, cwr) = tokio::io::split(client);
        let mut pw = PacketWriter::new(cwr);
        let mut pr = PacketReader::new(crd);

        for req in [
            cmd(UserLevel::Guest, Some("10:20:30:1:2"), "/bookmark_add Home"),
            cmd(UserLevel::Guest, None, "/goto Home"),
        ] {
            let (id, payload) = req.encode().unwrap();
            pw.write_packet(id, &payload).await.unwrap();
        }
        pw.flush().await.unwrap();

        let mut got = Vec::new();
        let mut dones = 0;
        while dones < 2 {
            let pkt = pr.read_packet().await.unwrap().unwrap();
            let resp = parse_resp(pkt).unwrap();
            assert_eq!(resp.player(), P);
            if matches!(resp, ShardResp::Done { .. }) {
                dones += 1;
            }
            got.push(resp);
        }
        assert_eq!(
            got.iter()
                .filter(|r| matches!(r, ShardResp::Packet { .. }))
                .count(),
            1
        );

        drop(pw);
        drop(pr);
        serve.await.unwrap().unwrap();
    }
}
