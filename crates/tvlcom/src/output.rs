use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;
use tvlcom_dispatch::DispatchOutcome;
use tvlcom_frame::{FrameError, ReceivedFrame, TlvRecord, TlvTypes};

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
    Raw,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct RecordOutput {
    tlv_type: u8,
    type_name: &'static str,
    len: usize,
    value_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    integer: Option<u32>,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    event: &'a str,
    frame_id: u8,
    records: Vec<RecordOutput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply: Option<&'a str>,
    timestamp: String,
}

#[derive(Serialize)]
struct ErrorOutput {
    event: &'static str,
    error: String,
}

#[derive(Serialize)]
struct BuiltOutput {
    event: &'static str,
    frame_id: u8,
    payload_len: usize,
    frame_len: usize,
    frame_hex: String,
}

pub fn print_frame(
    frame: &ReceivedFrame,
    types: &TlvTypes,
    outcome: Option<&DispatchOutcome>,
    format: OutputFormat,
) {
    let reply = outcome.map(reply_label);
    match format {
        OutputFormat::Json => {
            let out = FrameOutput {
                event: "frame",
                frame_id: frame.id,
                records: frame
                    .records
                    .iter()
                    .map(|record| record_output(record, types))
                    .collect(),
                reply,
                timestamp: now_unix_seconds(),
            };
            print_json(&out);
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "TYPE", "NAME", "LEN", "VALUE", "REPLY"]);
            if frame.records.is_empty() {
                table.add_row(vec![
                    frame.id.to_string(),
                    "-".to_string(),
                    "-".to_string(),
                    "0".to_string(),
                    String::new(),
                    reply.unwrap_or("-").to_string(),
                ]);
            }
            for record in &frame.records {
                table.add_row(vec![
                    frame.id.to_string(),
                    format!("0x{:02X}", record.tlv_type),
                    types.type_name(record.tlv_type).to_string(),
                    record.value.len().to_string(),
                    value_preview(record, types),
                    reply.unwrap_or("-").to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            print!("frame id={} records={}", frame.id, frame.records.len());
            match reply {
                Some(reply) => println!(" reply={reply}"),
                None => println!(),
            }
            for record in &frame.records {
                println!(
                    "  0x{:02X} {:<7} len={:<3} {}",
                    record.tlv_type,
                    types.type_name(record.tlv_type),
                    record.value.len(),
                    value_preview(record, types)
                );
            }
        }
        OutputFormat::Raw => {
            let mut payload = Vec::new();
            for record in &frame.records {
                payload.push(record.tlv_type);
                payload.push(record.value.len() as u8);
                payload.extend_from_slice(&record.value);
            }
            print_raw(&payload);
        }
    }
}

pub fn print_stream_error(err: &FrameError, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&ErrorOutput {
            event: "dropped",
            error: err.to_string(),
        }),
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => println!("dropped: {err}"),
    }
}

pub fn print_built(frame_id: u8, payload_len: usize, wire: &[u8], format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(&BuiltOutput {
            event: "built",
            frame_id,
            payload_len,
            frame_len: wire.len(),
            frame_hex: hex::encode(wire),
        }),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["FRAME", "PAYLOAD", "SIZE", "HEX"])
                .add_row(vec![
                    frame_id.to_string(),
                    payload_len.to_string(),
                    wire.len().to_string(),
                    spaced_hex(wire),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}", spaced_hex(wire)),
        OutputFormat::Raw => print_raw(wire),
    }
}

pub fn print_raw(data: &[u8]) {
    let mut out = std::io::stdout();
    let _ = out.write_all(data);
    let _ = out.flush();
}

pub fn spaced_hex(data: &[u8]) -> String {
    data.iter()
        .map(|byte| format!("{byte:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn reply_label(outcome: &DispatchOutcome) -> &'static str {
    match outcome {
        DispatchOutcome::Ack => "ACK",
        DispatchOutcome::Nack { .. } => "NACK",
        DispatchOutcome::Silent => "none",
    }
}

fn record_output(record: &TlvRecord, types: &TlvTypes) -> RecordOutput {
    RecordOutput {
        tlv_type: record.tlv_type,
        type_name: types.type_name(record.tlv_type),
        len: record.value.len(),
        value_hex: hex::encode(&record.value),
        text: (record.tlv_type == types.string)
            .then(|| record.as_str().map(str::to_string))
            .flatten(),
        integer: (record.tlv_type == types.integer)
            .then(|| record.as_u32())
            .flatten(),
    }
}

fn value_preview(record: &TlvRecord, types: &TlvTypes) -> String {
    if record.tlv_type == types.string {
        if let Some(text) = record.as_str() {
            return format!("{text:?}");
        }
    }
    if record.tlv_type == types.integer {
        if let Some(value) = record.as_u32() {
            return value.to_string();
        }
    }
    if types.is_routing_reserved(record.tlv_type) {
        if let Some(byte) = record.as_command() {
            return format!("0x{byte:02X}");
        }
    }
    spaced_hex(&record.value)
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
