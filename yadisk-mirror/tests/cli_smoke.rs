use std::process::Command;

fn run_mirror(args: &[&str]) -> std::process::Output {
    let exe = env!("CARGO_BIN_EXE_yadisk-mirror");
    Command::new(exe)
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("yadisk-mirror should execute")
}

#[test]
fn help_lists_mirror_options() {
    let output = run_mirror(&["--help"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("--verify_only"));
    assert!(stdout.contains("--verify_checksums"));
    assert!(stdout.contains("--delay"));
    assert!(stdout.contains("-o <PATH>"));
}

#[test]
fn missing_url_is_a_usage_error() {
    let output = run_mirror(&[]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("<URL>"));
}

#[test]
fn unreachable_api_exits_with_failure() {
    let dir = tempfile::tempdir().unwrap();
    let output = run_mirror(&[
        "share-key",
        "-o",
        dir.path().to_str().unwrap(),
        "--delay",
        "0",
        "--connect-timeout",
        "2",
        "--api-base-url",
        "http://127.0.0.1:9",
    ]);
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("failed to mirror share-key"));
}
