//! TunnelSupervisor against stub cloudflared scripts

#![cfg(unix)]

mod common;

use common::helpers::{StubBin, process_alive};
use gallery_tunnel::{
    Error, TunnelSupervisor,
    tunnel::TunnelState,
};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

const LOCAL_URL: &str = "http://localhost:8080";

/// Gives a killed process a moment to disappear from the process table
async fn wait_until_gone(pid: u32) -> bool {
    for _ in 0..100 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn test_finds_url_and_close_kills_process() {
    let bin = StubBin::new();
    bin.script(
        "cloudflared",
        "echo 'INF Requesting new quick Tunnel on trycloudflare.com...' >&2\n\
         echo 'INF |  https://abc.trycloudflare.com  |' >&2\n\
         exec sleep 30",
    );

    let supervisor =
        TunnelSupervisor::new(bin.resolver()).with_startup_timeout(Duration::from_secs(5));
    let mut tunnel = supervisor
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(tunnel.public_url(), "https://abc.trycloudflare.com");
    assert_eq!(tunnel.state(), TunnelState::Running);
    assert!(tunnel.is_running());
    let pid = tunnel.id().expect("running tunnel has a pid");
    assert!(process_alive(pid));

    tunnel.close().await;
    assert_eq!(tunnel.state(), TunnelState::Closed);
    assert!(!tunnel.is_running());
    assert!(tunnel.id().is_none());
    assert!(wait_until_gone(pid).await);

    // closing twice is harmless
    tunnel.close().await;
    assert_eq!(tunnel.state(), TunnelState::Closed);
}

#[tokio::test]
async fn test_passes_expected_arguments() {
    let bin = StubBin::new();
    bin.script(
        "cloudflared",
        r#"[ "$*" = "tunnel --url http://localhost:8080 --no-autoupdate" ] || { echo "bad args: $*" >&2; exit 2; }
echo 'https://args-ok.trycloudflare.com' >&2
exec sleep 30"#,
    );

    let supervisor = TunnelSupervisor::new(bin.resolver());
    let mut tunnel = supervisor
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tunnel.public_url(), "https://args-ok.trycloudflare.com");
    tunnel.close().await;
}

#[tokio::test]
async fn test_bundle_directory_is_working_directory() {
    let bundle = StubBin::new();
    bundle.script(
        "cloudflared",
        r#"[ "$(pwd -P)" = "$(cd "$(dirname "$0")" && pwd -P)" ] || { echo "wrong cwd $(pwd)" >&2; exit 2; }
echo 'https://bundled.trycloudflare.com' >&2
exec sleep 30"#,
    );

    let resolver = gallery_tunnel::BinaryResolver::new()
        .with_bundle_dir(bundle.path())
        .with_search_path("");
    let mut tunnel = TunnelSupervisor::new(resolver)
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tunnel.public_url(), "https://bundled.trycloudflare.com");
    tunnel.close().await;
}

#[tokio::test]
async fn test_times_out_and_kills_silent_tunnel() {
    let bin = StubBin::new();
    let pid_file = bin.path().join("pid");
    bin.script(
        "cloudflared",
        &format!(
            "echo $$ > '{}'\necho 'INF Starting tunnel' >&2\nexec sleep 30",
            pid_file.display()
        ),
    );

    let deadline = Duration::from_millis(700);
    let supervisor = TunnelSupervisor::new(bin.resolver()).with_startup_timeout(deadline);

    let started = Instant::now();
    let err = supervisor
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    match &err {
        Error::TunnelUrlTimeout { name, timeout } => {
            assert_eq!(name, "cloudflared");
            assert_eq!(*timeout, deadline);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(elapsed >= deadline, "returned early: {elapsed:?}");
    assert!(elapsed < deadline + Duration::from_secs(3), "too slow: {elapsed:?}");

    let pid: u32 = std::fs::read_to_string(&pid_file)
        .unwrap()
        .trim()
        .parse()
        .unwrap();
    assert!(wait_until_gone(pid).await, "tunnel process {pid} still alive");
}

#[tokio::test]
async fn test_timeout_honoured_without_any_output() {
    let bin = StubBin::new();
    bin.script("cloudflared", "exec sleep 30");

    let supervisor =
        TunnelSupervisor::new(bin.resolver()).with_startup_timeout(Duration::from_millis(300));
    let started = Instant::now();
    let err = supervisor
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TunnelUrlTimeout { .. }));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_cancellation_beats_timeout() {
    let bin = StubBin::new();
    bin.script("cloudflared", "echo 'INF Starting tunnel' >&2\nexec sleep 30");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            cancel.cancel();
        }
    });

    let supervisor =
        TunnelSupervisor::new(bin.resolver()).with_startup_timeout(Duration::from_secs(10));
    let started = Instant::now();
    let err = supervisor.start(LOCAL_URL, &cancel).await.unwrap_err();

    assert!(err.is_cancelled(), "unexpected error: {err}");
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_already_cancelled_token_fails_fast() {
    let bin = StubBin::new();
    bin.script("cloudflared", "echo 'https://late.trycloudflare.com' >&2\nexec sleep 30");

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = TunnelSupervisor::new(bin.resolver())
        .start(LOCAL_URL, &cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessCancelled { .. }));
}

#[tokio::test]
async fn test_exit_without_url() {
    let bin = StubBin::new();
    bin.script("cloudflared", "echo 'ERR failed to connect' >&2\nexit 1");

    let err = TunnelSupervisor::new(bin.resolver())
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::TunnelExited { .. }), "got: {err}");
}

#[tokio::test]
async fn test_unexecutable_binary_fails_to_start() {
    let bin = StubBin::new();
    // exec bit set but no valid interpreter
    let path = bin.script("cloudflared", "");
    std::fs::write(&path, "#!/nonexistent/interpreter\n").unwrap();

    let err = TunnelSupervisor::new(bin.resolver())
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessStartFailed { .. }), "got: {err}");
}

#[tokio::test]
async fn test_invalid_utf8_before_url_is_skipped() {
    let bin = StubBin::new();
    bin.script(
        "cloudflared",
        "printf 'INF \\377\\376 banner\\n' >&2\n\
         echo 'INF |  https://bytes.trycloudflare.com  |' >&2\n\
         exec sleep 30",
    );

    let mut tunnel = TunnelSupervisor::new(bin.resolver())
        .with_startup_timeout(Duration::from_secs(5))
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tunnel.public_url(), "https://bytes.trycloudflare.com");
    tunnel.close().await;
}

#[tokio::test]
async fn test_output_after_url_keeps_flowing() {
    let bin = StubBin::new();
    let flushed = bin.path().join("flushed");
    bin.script(
        "cloudflared",
        &format!(
            "echo 'https://chatty.trycloudflare.com' >&2\n\
             printf 'INF \\377 garbled\\n' >&2\n\
             i=0\n\
             while [ $i -lt 3000 ]; do echo \"INF registered connection $i to edge\" >&2; i=$((i+1)); done\n\
             touch '{}'\n\
             while :; do echo 'INF heartbeat' >&2; sleep 0.1; done",
            flushed.display()
        ),
    );

    let mut tunnel = TunnelSupervisor::new(bin.resolver())
        .with_startup_timeout(Duration::from_secs(5))
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(tunnel.public_url(), "https://chatty.trycloudflare.com");

    // more than a pipe buffer of output has to be consumed for the marker to appear
    let mut flushed_in_time = false;
    for _ in 0..100 {
        if flushed.exists() {
            flushed_in_time = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert!(flushed_in_time, "tunnel blocked writing its output");

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert!(tunnel.is_running(), "tunnel died while writing output");
    assert_eq!(tunnel.state(), TunnelState::Running);

    tunnel.close().await;
}

#[tokio::test]
async fn test_dropping_handle_kills_process() {
    let bin = StubBin::new();
    bin.script(
        "cloudflared",
        "echo 'https://dropped.trycloudflare.com' >&2\nexec sleep 30",
    );

    let tunnel = TunnelSupervisor::new(bin.resolver())
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();
    let pid = tunnel.id().expect("running tunnel has a pid");
    assert!(process_alive(pid));

    drop(tunnel);
    assert!(wait_until_gone(pid).await, "tunnel process {pid} outlived its handle");
}

#[tokio::test]
async fn test_exited_reports_tunnel_death() {
    let bin = StubBin::new();
    bin.script(
        "cloudflared",
        "echo 'https://shortlived.trycloudflare.com' >&2\nsleep 0.3\nexit 3",
    );

    let mut tunnel = TunnelSupervisor::new(bin.resolver())
        .start(LOCAL_URL, &CancellationToken::new())
        .await
        .unwrap();

    let status = tokio::time::timeout(Duration::from_secs(5), tunnel.exited())
        .await
        .expect("tunnel should exit on its own")
        .unwrap();
    assert_eq!(status.code(), Some(3));
    assert_eq!(tunnel.state(), TunnelState::Failed);
    assert!(!tunnel.is_running());

    tunnel.close().await;
    assert_eq!(tunnel.state(), TunnelState::Closed);
}
