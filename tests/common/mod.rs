#![allow(dead_code)]

use assert_cmd::Command;
use assert_cmd::cargo_bin;
use serde_json::{Value, json};
use settlement_bridge::application::dispatcher::EventDispatcher;
use settlement_bridge::domain::event::{ContractEvent, CreatedEvent, Payload, Transaction};
use settlement_bridge::domain::instrument::Template;
use settlement_bridge::infrastructure::in_memory::{InMemoryOutputSink, RecordingNotifier};
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::path::Path;
use std::thread;
use std::time::Duration;

pub const PACKAGE: &str = "d4c1b0e5";
pub const INTERMEDIARY: &str = "Intermediary";

fn object(value: Value) -> Payload {
    value.as_object().cloned().expect("payload must be a JSON object")
}

fn price(value: &str) -> Value {
    json!({"price": value, "currency": "USD"})
}

fn closing(underlying: &str) -> Value {
    json!({"underlying": underlying, "price": price("100")})
}

pub fn coupon_payload(trade_id: &str, issuer: &str, owner: &str) -> Payload {
    object(json!({
        "tradeId": trade_id,
        "productId": "productId",
        "couponRate": "0.02",
        "dayCountFraction": {"numerator": 1, "denominator": 2},
        "eventTime": "2026-10-16T09:00:00Z",
        "strikeIndex1": price("100"),
        "closingPriceIndex1": closing("asset-1"),
        "strikeIndex2": price("100"),
        "closingPriceIndex2": closing("asset-2"),
        "issuer": issuer,
        "owner": owner,
        "regulator": "regulator"
    }))
}

pub fn knock_out_payload(trade_id: &str, reason: Option<&str>) -> Payload {
    let mut payload = object(json!({
        "tradeId": trade_id,
        "productId": "productId",
        "eventTime": "2026-10-16T09:00:00Z",
        "knockOutLevelIndex1": price("100"),
        "closingPriceIndex1": closing("asset-1"),
        "knockOutLevelIndex2": price("100"),
        "closingPriceIndex2": closing("asset-2"),
        "issuer": "issuer",
        "owner": "owner",
        "regulator": "regulator"
    }));
    if let Some(reason) = reason {
        payload.insert("knockOutReason".into(), json!(reason));
    }
    payload
}

pub fn payment_payload(payer_bic: &str, payee_bic: &str, payment_date: &str) -> Payload {
    object(json!({
        "payerDetails": {"name": "payer", "bic": payer_bic, "iban": "payerIban"},
        "payeeDetails": {"name": "payee", "bic": payee_bic, "iban": "payeeIban"},
        "transactionReference": "txRefCode",
        "amount": "10",
        "currency": "USD",
        "paymentDate": payment_date,
        "regulator": "regulator"
    }))
}

pub fn created(template: Template, arguments: Payload) -> ContractEvent {
    created_with_id(template, "event-1", arguments)
}

pub fn created_with_id(template: Template, event_id: &str, arguments: Payload) -> ContractEvent {
    ContractEvent::Created(CreatedEvent {
        event_id: event_id.into(),
        contract_id: format!("cid-{event_id}"),
        template_id: template.id(PACKAGE),
        witness_parties: vec![INTERMEDIARY.into()],
        arguments,
    })
}

pub fn dispatcher() -> (EventDispatcher, RecordingNotifier, InMemoryOutputSink) {
    let notifier = RecordingNotifier::new();
    let output = InMemoryOutputSink::new();
    let dispatcher = EventDispatcher::new(Box::new(notifier.clone()), Box::new(output.clone()));
    (dispatcher, notifier, output)
}

pub fn transaction(offset: &str, events: Vec<ContractEvent>) -> Value {
    serde_json::to_value(Transaction {
        transaction_id: format!("tx-{offset}"),
        offset: offset.into(),
        effective_at: "2026-10-16T08:00:00Z".parse().unwrap(),
        events,
    })
    .unwrap()
}

/// Serves the newline-delimited JSON ledger protocol on a local port.
///
/// Pings are answered with `ok`. The first subscription receives every transaction after its
/// `begin` offset and is then closed, which the bridge reports as a lost stream and exits with
/// a failure status.
pub fn spawn_fake_ledger(transactions: Vec<Value>) -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();

    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(mut stream) = stream else { break };
            let mut line = String::new();
            if BufReader::new(stream.try_clone().unwrap())
                .read_line(&mut line)
                .is_err()
            {
                continue;
            }
            let request: Value = serde_json::from_str(&line).unwrap_or(Value::Null);

            if request["op"] != "subscribe" {
                writeln!(stream, r#"{{"status":"ok"}}"#).ok();
                continue;
            }
            let skip = match request["begin"]["absolute"].as_str() {
                Some(offset) => transactions
                    .iter()
                    .position(|tx| tx["offset"] == offset)
                    .map_or(0, |i| i + 1),
                None => 0,
            };
            for tx in &transactions[skip..] {
                writeln!(stream, "{tx}").ok();
            }
            break;
        }
    });

    port
}

/// The bridge binary pointed at a local ledger, with ambient configuration cleared.
pub fn bridge(port: u16, output_dir: &Path) -> Command {
    let mut cmd = Command::new(cargo_bin!("settlement-bridge"));
    cmd.arg("--ledger-host")
        .arg("127.0.0.1")
        .arg("--ledger-port")
        .arg(port.to_string())
        .arg("--output-dir")
        .arg(output_dir)
        .env_remove("TELEGRAM_BOT_TOKEN")
        .env_remove("TELEGRAM_CHAT_ID")
        .env_remove("CHECKPOINT_DB")
        .env_remove("LEDGER_PARTY")
        .env_remove("RUST_LOG")
        .timeout(Duration::from_secs(60));
    cmd
}
