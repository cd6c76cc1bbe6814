use std::io::{IsTerminal, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use milconn_value::{Address, Interpretation, Value, VarKind, WireValue};
use serde::Serialize;

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

/// One value read from the controller, as presented to the operator.
#[derive(Debug, Clone, Serialize)]
pub struct Reading {
    pub kind: VarKind,
    pub address: Address,
    pub raw: u64,
    /// Little-endian wire image, hex.
    pub wire: String,
    pub value: serde_json::Value,
    #[serde(skip)]
    pub display: String,
    pub timestamp: String,
}

impl Reading {
    pub fn new(address: Address, wire: WireValue, value: Value) -> Self {
        Self {
            kind: wire.kind(),
            address,
            raw: wire.as_u64(),
            wire: wire
                .to_le_bytes()
                .iter()
                .map(|b| format!("{b:02x}"))
                .collect(),
            value: value_to_json(value),
            display: value.to_string(),
            timestamp: now_unix_millis(),
        }
    }

    fn raw_hex(&self) -> String {
        format!("0x{:0width$X}", self.raw, width = self.kind.width() * 2)
    }
}

pub fn print_readings(readings: &[Reading], how: Interpretation, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for reading in readings {
                print_json(reading);
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["KIND", "ADDRESS", "VALUE", "RAW"]);
            for reading in readings {
                table.add_row(vec![
                    reading.kind.to_string(),
                    reading.address.to_string(),
                    reading.display.clone(),
                    reading.raw_hex(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for reading in readings {
                println!(
                    "{}[{}] = {} ({}, raw {})",
                    reading.kind,
                    reading.address,
                    reading.display,
                    interpretation_name(how),
                    reading.raw_hex()
                );
            }
        }
        OutputFormat::Raw => {
            for reading in readings {
                print_raw_line(&reading.display);
            }
        }
    }
}

#[derive(Serialize)]
struct WriteOutput {
    kind: VarKind,
    address: Address,
    raw: u64,
    written: bool,
}

pub fn print_write(address: Address, wire: WireValue, format: OutputFormat) {
    let out = WriteOutput {
        kind: wire.kind(),
        address,
        raw: wire.as_u64(),
        written: true,
    };
    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["KIND", "ADDRESS", "WRITTEN"])
                .add_row(vec![
                    out.kind.to_string(),
                    out.address.to_string(),
                    wire.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!("{}[{}] <- {}", out.kind, address, wire),
        OutputFormat::Raw => print_raw_line(&wire.to_string()),
    }
}

/// Connection report for `probe`.
#[derive(Serialize)]
pub struct ProbeOutput {
    pub transport: &'static str,
    pub host: String,
    pub port: u16,
    pub connected: bool,
    pub connect_ms: f64,
}

pub fn print_probe(out: &ProbeOutput, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_header(vec!["FIELD", "VALUE"])
                .add_row(vec!["transport", out.transport])
                .add_row(vec!["endpoint".to_string(), format!("{}:{}", out.host, out.port)])
                .add_row(vec!["connected".to_string(), out.connected.to_string()])
                .add_row(vec!["connect_ms".to_string(), format!("{:.2}", out.connect_ms)]);
            println!("{table}");
        }
        OutputFormat::Pretty => println!(
            "{}:{} via {}: connected={} in {:.2} ms",
            out.host, out.port, out.transport, out.connected, out.connect_ms
        ),
        OutputFormat::Raw => print_raw_line(if out.connected { "up" } else { "down" }),
    }
}

fn print_json<T: Serialize>(value: &T) {
    println!(
        "{}",
        serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string())
    );
}

fn print_raw_line(text: &str) {
    let mut out = std::io::stdout();
    let _ = writeln!(out, "{text}");
    let _ = out.flush();
}

fn interpretation_name(how: Interpretation) -> &'static str {
    match how {
        Interpretation::Raw => "raw",
        Interpretation::Signed => "signed",
        Interpretation::Float => "float",
    }
}

fn value_to_json(value: Value) -> serde_json::Value {
    match value {
        Value::Bool(v) => serde_json::Value::Bool(v),
        Value::Int(v) => {
            if let Ok(u) = u64::try_from(v) {
                u.into()
            } else if let Ok(i) = i64::try_from(v) {
                i.into()
            } else {
                v.to_string().into()
            }
        }
        Value::F32(v) => serde_json::Number::from_f64(f64::from(v))
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
        Value::F64(v) => serde_json::Number::from_f64(v)
            .map_or(serde_json::Value::Null, serde_json::Value::Number),
    }
}

fn now_unix_millis() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis().to_string())
        .unwrap_or_else(|_| "0".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_serializes_kind_and_interpreted_value() {
        let wire = WireValue::Word(0x8000);
        let reading = Reading::new(120, wire, wire.interpret(Interpretation::Signed).unwrap());
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["kind"], "word");
        assert_eq!(json["address"], 120);
        assert_eq!(json["raw"], 32768);
        assert_eq!(json["value"], -32768);
        assert!(json.get("display").is_none());
    }

    #[test]
    fn raw_hex_pads_to_kind_width() {
        let wire = WireValue::DWord(0x42F6_E979);
        let reading = Reading::new(150, wire, Value::Int(0x42F6_E979));
        assert_eq!(reading.raw_hex(), "0x42F6E979");
        assert_eq!(reading.wire, "79e9f642");
        let wire = WireValue::Byte(7);
        assert_eq!(Reading::new(1, wire, Value::Int(7)).raw_hex(), "0x07");
    }

    #[test]
    fn nan_floats_serialize_as_null() {
        assert_eq!(value_to_json(Value::F32(f32::NAN)), serde_json::Value::Null);
        assert_eq!(value_to_json(Value::Bool(true)), serde_json::Value::Bool(true));
    }
}
