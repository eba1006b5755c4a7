use assert_cmd::cargo_bin;
use assert_cmd::prelude::*;
use predicates::prelude::*;
use std::process::Command;

#[test]
fn test_malformed_csv_handling() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("robustness_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["user_id", "wallet_id", "amount", "currency", "idempotency_key", "metadata"])
        .unwrap();

    // Valid purchase
    wtr.write_record(["usr_123", "wlt_usd_abc123", "100.50", "USD", "", ""])
        .unwrap();
    // Malformed metadata, skipped before reaching the engine
    wtr.write_record(["usr_123", "wlt_usd_abc123", "1.00", "USD", "", "no-equals-sign"])
        .unwrap();
    // Missing amount
    wtr.write_record(["usr_123", "wlt_usd_abc123", "", "USD", "", ""])
        .unwrap();
    // Valid purchase again
    wtr.write_record(["usr_123", "wlt_usd_abc123", "400.00", "USD", "", ""])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let mut cmd = Command::new(cargo_bin!("credit-purchase"));
    cmd.env_remove("RUST_LOG").arg(&output_path);

    cmd.assert()
        .success()
        .stderr(predicate::str::contains("Error reading request"))
        .stdout(predicate::str::contains(r#""code":"INVALID_REQUEST""#))
        // 1500.50 - 100.50 - 400.00
        .stdout(predicate::str::contains(r#""balance":"1000.00""#));
}

#[test]
fn test_invalid_amounts() {
    let dir = tempfile::tempdir().unwrap();
    let output_path = dir.path().join("amount_test.csv");
    let mut wtr = csv::Writer::from_path(&output_path).unwrap();
    wtr.write_record(["user_id", "wallet_id", "amount", "currency"])
        .unwrap();

    wtr.write_record(["usr_123", "wlt_usd_abc123", "not_a_number", "USD"])
        .unwrap();
    wtr.write_record(["usr_123", "wlt_usd_abc123", "-5", "USD"])
        .unwrap();
    wtr.write_record(["usr_123", "wlt_usd_abc123", "0", "USD"])
        .unwrap();
    wtr.write_record(["usr_123", "wlt_usd_abc123", "0.50", "USD"])
        .unwrap();
    wtr.flush().unwrap();
    drop(wtr);

    let output = Command::new(cargo_bin!("credit-purchase"))
        .env_remove("RUST_LOG")
        .arg(&output_path)
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.matches(r#""code":"INVALID_AMOUNT""#).count(), 3);
    assert!(stdout.contains(r#""balance":"1500.00""#));
}
