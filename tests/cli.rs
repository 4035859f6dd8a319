use std::fs;
use std::path::PathBuf;
use std::process::Command;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("dtvcc_extract_{name}_{}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// One packet for service 1 carrying "HI" followed by ETX
fn hello_stream() -> Vec<u8> {
    vec![
        1, 3, 0x03, 0x23, // START: header (seq 0, 6 bytes), block header (service 1, 3 bytes)
        1, 2, b'H', b'I', // CONTINUE
        1, 2, 0x03, 0x00, // CONTINUE: ETX + padding
    ]
}

#[test]
fn writes_service_file() {
    let dir = scratch_dir("writes");
    let input = dir.join("x.bin");
    fs::write(&input, hello_stream()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_cli"))
        .arg(&input)
        .args(["--services", "1", "-o"])
        .arg(dir.join("x.ts"))
        .status()
        .unwrap();
    assert!(status.success());

    let srt = fs::read_to_string(dir.join("x_1.srt")).unwrap();
    assert!(srt.contains("HI"));
    assert!(srt.starts_with("1"));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn report_is_printed_as_json() {
    let dir = scratch_dir("report");
    let input = dir.join("x.bin");
    fs::write(&input, hello_stream()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_cli"))
        .arg(&input)
        .args(["--services", "1", "--report", "--format", "transcript", "-o"])
        .arg(dir.join("x.ts"))
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(json["active_services_count"], 1);
    assert_eq!(json["counters"]["packets"], 1);
    assert_eq!(json["services"][0]["cues_written"], 1);
    assert!(dir.join("x_1.txt").exists());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn unused_service_creates_no_file() {
    let dir = scratch_dir("unused");
    let input = dir.join("x.bin");
    fs::write(&input, hello_stream()).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_cli"))
        .arg(&input)
        .args(["--services", "1,2", "-o"])
        .arg(dir.join("x.ts"))
        .status()
        .unwrap();
    assert!(status.success());
    assert!(dir.join("x_1.srt").exists());
    assert!(!dir.join("x_2.srt").exists());
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn illegal_cc_type_exits_with_failure() {
    let dir = scratch_dir("illegal");
    let input = dir.join("bad.bin");
    fs::write(&input, [1, 0, 0x00, 0x00]).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_cli"))
        .arg(&input)
        .args(["--services", "1", "-o"])
        .arg(dir.join("bad.ts"))
        .output()
        .unwrap();
    assert_eq!(output.status.code(), Some(7));
    assert!(String::from_utf8_lossy(&output.stderr).contains("cc_type"));
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn bad_frame_pacing_is_rejected() {
    let dir = scratch_dir("pacing");
    let input = dir.join("x.bin");
    fs::write(&input, hello_stream()).unwrap();

    for (flag, value, needle) in [
        ("--cc-count", "4611686018427387904", "cc_count"),
        ("--cc-count", "1000000000", "cc_count"),
        ("--cc-count", "0", "cc_count"),
        ("--fps", "0", "fps"),
        ("--fps", "nan", "fps"),
    ] {
        let output = Command::new(env!("CARGO_BIN_EXE_cli"))
            .arg(&input)
            .args(["--services", "1", flag, value, "-o"])
            .arg(dir.join("x.ts"))
            .output()
            .unwrap();
        assert_eq!(output.status.code(), Some(1), "{flag} {value}");
        assert!(String::from_utf8_lossy(&output.stderr).contains(needle), "{flag} {value}");
        assert!(!dir.join("x_1.srt").exists(), "{flag} {value}");
    }
    fs::remove_dir_all(&dir).ok();
}

#[test]
fn report_goes_to_stderr_with_stdout_captions() {
    let dir = scratch_dir("stdout_report");
    let input = dir.join("x.bin");
    fs::write(&input, hello_stream()).unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_cli"))
        .arg(&input)
        .args(["--services", "1", "--stdout", "--report", "--format", "transcript"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim_end(), "HI");
    assert!(String::from_utf8_lossy(&output.stderr).contains("\"reset_count\""));
    fs::remove_dir_all(&dir).ok();
}
