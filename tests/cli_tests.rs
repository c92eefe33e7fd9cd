use panel_recognition::Config;
use std::process::Command;
use tempfile::tempdir;

fn panel() -> Command {
    Command::new(env!("CARGO_BIN_EXE_panel"))
}

#[test]
fn test_check_config_writes_effective_config() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("panel.toml");
    std::fs::write(&source, "[power]\nbrightness_ratio = 1.4\n").unwrap();
    let written = dir.path().join("effective.json");

    let output = panel()
        .arg("--config")
        .arg(&source)
        .args(["--device", "/dev/video2", "--bench", "check-config", "--write"])
        .arg(&written)
        .output()
        .unwrap();
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let saved = std::fs::read_to_string(&written).unwrap();
    assert!(saved.trim_start().starts_with('{'));
    let config = Config::load_from_file(&written).unwrap();
    assert_eq!(config.power.brightness_ratio, 1.4);
    assert_eq!(config.camera.device, "/dev/video2");
    assert_eq!(config.logging.alignment_level, "trace");
    assert!(config.logging.include_file_location);
}

#[test]
fn test_unreadable_config_fails_the_command() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");

    let output = panel()
        .arg("--config")
        .arg(&missing)
        .arg("check-config")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("missing.toml"));
}

#[test]
fn test_invalid_config_fails_the_command() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("panel.toml");
    std::fs::write(&source, "[camera]\nread_timeout_ms = 0\n").unwrap();

    let output = panel()
        .arg("--config")
        .arg(&source)
        .arg("check-config")
        .output()
        .unwrap();
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("read_timeout_ms"));
}
