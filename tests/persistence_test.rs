#![cfg(feature = "storage-rocksdb")]

mod common;

use common::{bridge, created_with_id, payment_payload, spawn_fake_ledger, transaction};
use predicates::prelude::*;
use settlement_bridge::domain::instrument::Template;
use tempfile::tempdir;

fn payment(offset: &str) -> serde_json::Value {
    transaction(
        offset,
        vec![created_with_id(
            Template::PaymentInstructions,
            &format!("payment-{offset}"),
            payment_payload("payerBic", "payeeBic", "2026-10-16T08:00:00Z"),
        )],
    )
}

fn written_files(dir: &std::path::Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn test_rocksdb_checkpoint_recovery() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test_db");
    let output_dir = dir.path().join("out");

    // 1. First run: one payment instruction
    let port = spawn_fake_ledger(vec![payment("1")]);
    bridge(port, &output_dir)
        .arg("--checkpoint-db")
        .arg(&db_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("transaction stream ended"));
    assert_eq!(written_files(&output_dir), 1);

    // 2. Second run: the ledger holds the old payment and a new one; only the new one is settled
    let port = spawn_fake_ledger(vec![payment("1"), payment("2")]);
    bridge(port, &output_dir)
        .arg("--checkpoint-db")
        .arg(&db_path)
        .assert()
        .failure()
        .stderr(predicate::str::contains("transaction stream ended"));
    assert_eq!(written_files(&output_dir), 2);
}
