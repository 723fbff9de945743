use std::process::Command;
use tempfile::TempDir;

#[test]
fn test_unreachable_source_with_empty_store_exits_non_zero() -> std::io::Result<()> {
    let dir = TempDir::new()?;

    let output = Command::new(env!("CARGO_BIN_EXE_air-quality-processor"))
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .arg("--quiet")
        .arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("--local-url")
        .arg("http://does-not-resolve.invalid")
        .arg("ingest")
        .arg("--source")
        .arg("local")
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("error:"), "stderr was: {}", stderr);
    assert!(stderr.contains("Switzerland"), "stderr was: {}", stderr);
    Ok(())
}

#[test]
fn test_info_on_empty_store_succeeds() -> std::io::Result<()> {
    let dir = TempDir::new()?;

    let output = Command::new(env!("CARGO_BIN_EXE_air-quality-processor"))
        .current_dir(dir.path())
        .env("RUST_LOG", "off")
        .arg("--data-dir")
        .arg(dir.path().join("data"))
        .arg("info")
        .output()?;

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Rows: 0"));
    assert!(stdout.contains("not stored yet"));
    Ok(())
}
