#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use operator_shell::config::AppConfig;
use operator_shell::launch::{LaunchArgs, LaunchPlan};
use operator_shell::shutdown::ShutdownCoordinator;
use operator_shell::{run_interactive, AppState, Outcome};

const LIMIT: Duration = Duration::from_secs(20);

/// Write a shell script that knows its working directory as `$DIR`
fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    let text = format!("#!/bin/sh\nDIR='{}'\n{}", dir.display(), body);
    std::fs::write(&path, text).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn plan(dir: &Path, main_body: &str, renderer: Option<PathBuf>) -> LaunchPlan {
    let main = script(dir, "main.sh", main_body);
    let command = format!("/bin/sh {}", main.display());
    let config = AppConfig {
        linux_cmd: Some(command.clone()),
        mac_cmd: Some(command.clone()),
        win_cmd: Some(command),
        render_cmd: renderer.map(|path| path.display().to_string()),
        ..AppConfig::default()
    };
    LaunchPlan::new(config, LaunchArgs::default(), dir.to_path_buf(), false).unwrap()
}

fn read_lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn test_replies_arrive_in_request_order_and_exit_is_graceful() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan(
        dir.path(),
        r#"exec 3<&0
cat <&3 > "$DIR/main-in.log" &
i=1
while [ $i -le 50 ]; do
  echo "show 0 seq=$i"
  i=$((i + 1))
done
n=0
while [ "$n" -lt 50 ]; do
  sleep 0.05
  n=$(grep -c resolve "$DIR/main-in.log" 2>/dev/null)
  n=${n:-0}
done
trap 'sleep 0.3; echo cleaned > "$DIR/cleanup.txt"; exit 0' TERM
echo "exit value=5"
while true; do sleep 0.05; done
"#,
        None,
    );
    let coordinator = ShutdownCoordinator::new();

    let state = AppState::start(&plan, &coordinator).unwrap();
    let outcome = tokio::time::timeout(LIMIT, state.run(&coordinator))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Exit(5));
    let expected: Vec<String> = (1..=50)
        .map(|i| format!("resolve 0 seq={} state=0&value=null", i))
        .collect();
    assert_eq!(read_lines(&dir.path().join("main-in.log")), expected);
    assert!(dir.path().join("cleanup.txt").exists());
}

#[tokio::test]
async fn test_restart_rebuilds_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan(
        dir.path(),
        r#"echo started >> "$DIR/runs.log"
if [ -f "$DIR/restarted" ]; then
  echo "exit value=3"
else
  touch "$DIR/restarted"
  echo restart
fi
exec sleep 30
"#,
        None,
    );
    let coordinator = ShutdownCoordinator::new();

    let code = tokio::time::timeout(LIMIT, run_interactive(&plan, &coordinator))
        .await
        .unwrap()
        .unwrap();

    assert_eq!(code, 3);
    assert_eq!(read_lines(&dir.path().join("runs.log")).len(), 2);
}

#[tokio::test]
async fn test_shutdown_request_ends_session() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan(dir.path(), "exec sleep 30\n", None);
    let coordinator = ShutdownCoordinator::new();

    let state = AppState::start(&plan, &coordinator).unwrap();
    let main = state.main_process.clone();
    let request = async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        coordinator.request(1);
    };

    let (outcome, ()) = tokio::time::timeout(LIMIT, async {
        tokio::join!(state.run(&coordinator), request)
    })
    .await
    .unwrap();

    assert_eq!(outcome, Outcome::Exit(1));
    assert!(coordinator.is_shutting_down());
    assert_eq!(main.try_exit().map(|r| r.signal), Some(Some(libc::SIGTERM)));
}

#[tokio::test]
async fn test_failed_renderer_falls_back_to_headless() {
    let dir = tempfile::tempdir().unwrap();
    let plan = plan(
        dir.path(),
        r#"printf '%s\n' "$@" > "$DIR/args.log"
echo "exit value=0"
exec sleep 30
"#,
        Some(dir.path().join("missing-renderer")),
    );
    let coordinator = ShutdownCoordinator::new();

    let state = AppState::start(&plan, &coordinator).unwrap();
    let outcome = tokio::time::timeout(LIMIT, state.run(&coordinator))
        .await
        .unwrap();

    assert_eq!(outcome, Outcome::Exit(0));
    let args = read_lines(&dir.path().join("args.log"));
    assert_eq!(args.last().map(String::as_str), Some("--webviewFailed"));
}

#[tokio::test]
async fn test_renderer_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let renderer = script(
        dir.path(),
        "renderer.sh",
        r#"index=
for arg in "$@"; do
  case "$arg" in
    --index=*) index="${arg#--index=}" ;;
  esac
done
echo "ready value=$index"
if [ "$index" = 1 ]; then
  echo "title value=Renamed"
fi
exec cat > "$DIR/renderer-$index.log"
"#,
    );
    let plan = plan(
        dir.path(),
        r#"exec 3<&0
cat <&3 > "$DIR/main-in.log" &
wait_for() {
  until grep -q "$1" "$2" 2>/dev/null; do sleep 0.05; done
}
echo "navigate 1 seq=7 value=https%3A%2F%2Fexample.com"
wait_for 'seq=7' "$DIR/main-in.log"
wait_for 'ready value=0' "$DIR/main-in.log"
wait_for 'ready value=1' "$DIR/main-in.log"
wait_for 'Renamed' "$DIR/renderer-1.log"
echo "exit value=0"
exec sleep 30
"#,
        Some(renderer),
    );
    let coordinator = ShutdownCoordinator::new();

    let state = AppState::start(&plan, &coordinator).unwrap();
    let outcome = tokio::time::timeout(LIMIT, state.run(&coordinator))
        .await
        .unwrap();
    assert_eq!(outcome, Outcome::Exit(0));

    let main_in = read_lines(&dir.path().join("main-in.log"));
    assert!(main_in.contains(&"resolve 1 seq=7 state=0&value=null".to_string()));
    assert!(main_in.contains(&"ready value=0".to_string()));
    assert!(main_in.contains(&"ready value=1".to_string()));

    let first = read_lines(&dir.path().join("renderer-1.log"));
    assert!(first.contains(&"navigate 1 value=https%3A%2F%2Fexample.com".to_string()));
    assert!(first.contains(&"title 1 value=Renamed".to_string()));

    let primary = read_lines(&dir.path().join("renderer-0.log"));
    assert!(primary.iter().all(|line| !line.contains("Renamed")));
}
