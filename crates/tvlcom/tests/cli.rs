#![cfg(all(unix, feature = "cli"))]

use std::path::PathBuf;
use std::process::Command;

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = PathBuf::from(format!(
        "/tmp/tvlcom-cli-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

fn tvlcom(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_tvlcom"))
        .args(["--log-level", "error"])
        .args(args)
        .output()
        .expect("tvlcom should run")
}

fn built_hex(args: &[&str]) -> String {
    let mut full = vec!["--format", "json", "build"];
    full.extend_from_slice(args);
    let output = tvlcom(&full);
    assert!(output.status.success());

    let line = String::from_utf8(output.stdout).expect("stdout should be utf-8");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("json output");
    value["frame_hex"]
        .as_str()
        .expect("frame_hex field")
        .to_string()
}

#[test]
fn build_then_decode_roundtrip() {
    let hex = built_hex(&["--id", "7", "--control", "0x01", "--string", "hi"]);
    assert!(hex.starts_with("f00f07"));
    assert!(hex.ends_with("e00d"));

    let output = tvlcom(&["--format", "json", "decode", &hex]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let value: serde_json::Value = serde_json::from_str(stdout.trim()).expect("json output");
    assert_eq!(value["event"], "frame");
    assert_eq!(value["frame_id"], 7);
    assert_eq!(value["records"][0]["type_name"], "CONTROL");
    assert_eq!(value["records"][1]["text"], "hi");
}

#[test]
fn decode_reports_dropped_frames() {
    let mut hex = built_hex(&["--id", "1", "--int", "5"]);
    // corrupt the low CRC byte
    let crc_lo = hex.len() - 6;
    let flipped = if &hex[crc_lo..crc_lo + 2] == "00" { "01" } else { "00" };
    hex.replace_range(crc_lo..crc_lo + 2, flipped);

    let output = tvlcom(&["--format", "json", "decode", &hex]);
    assert_eq!(output.status.code(), Some(60));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("\"event\":\"dropped\""));
    assert!(stdout.contains("crc mismatch"));
}

#[test]
fn listen_prints_frames_from_capture_file() {
    let dir = unique_temp_dir("listen");
    let capture = dir.join("capture.bin");

    let mut bytes = Vec::new();
    for id in ["1", "2", "3"] {
        let hex = built_hex(&["--id", id, "--raw", "0x40:AA"]);
        bytes.extend(hex::decode(hex).expect("valid hex"));
    }
    bytes.extend_from_slice(&[0x00, 0xF0]);
    std::fs::write(&capture, &bytes).expect("capture should be writable");

    let output = tvlcom(&[
        "--format",
        "json",
        "listen",
        capture.to_str().expect("utf-8 path"),
        "--count",
        "2",
    ]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    let ids: Vec<u64> = stdout
        .lines()
        .map(|line| {
            let value: serde_json::Value = serde_json::from_str(line).expect("json line");
            value["frame_id"].as_u64().expect("frame id")
        })
        .collect();
    assert_eq!(ids, vec![1, 2]);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_writes_frame_to_file() {
    let dir = unique_temp_dir("send");
    let target = dir.join("device.bin");
    std::fs::write(&target, b"").expect("target should be writable");

    let output = tvlcom(&[
        "send",
        target.to_str().expect("utf-8 path"),
        "--id",
        "9",
        "--control",
        "3",
    ]);
    assert!(output.status.success());

    let written = std::fs::read(&target).expect("target should be readable");
    let expected = built_hex(&["--id", "9", "--control", "3"]);
    assert_eq!(hex::encode(written), expected);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn send_wait_times_out_on_idle_fifo() {
    let dir = unique_temp_dir("fifo");
    let fifo = dir.join("line");
    let status = Command::new("mkfifo")
        .arg(&fifo)
        .status()
        .expect("mkfifo should run");
    assert!(status.success());

    let path = fifo.to_str().expect("utf-8 path").to_string();
    let (done, finished) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let output = tvlcom(&[
            "send",
            &path,
            "--id",
            "4",
            "--control",
            "1",
            "--wait",
            "--wait-timeout",
            "200ms",
        ]);
        let _ = done.send(output);
    });

    let output = finished
        .recv_timeout(std::time::Duration::from_secs(10))
        .expect("send --wait should give up on an idle line");
    assert_eq!(output.status.code(), Some(124));
    assert!(String::from_utf8_lossy(&output.stderr).contains("no reply for frame 4"));

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn oversized_payload_exits_with_data_invalid() {
    let long = "x".repeat(250);
    let output = tvlcom(&["build", "--string", &long]);
    assert_eq!(output.status.code(), Some(60));
}

#[test]
fn version_prints_name() {
    let output = tvlcom(&["version"]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).starts_with("tvlcom "));
}
