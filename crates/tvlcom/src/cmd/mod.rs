use clap::{Args, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};

use tvlcom_frame::{TlvBuilder, TlvTypes};
use tvlcom_transport::{DeviceTransport, SerialConfig};

use crate::exit::{frame_error, transport_error, CliResult};
use crate::output::OutputFormat;

pub mod build;
pub mod decode;
pub mod listen;
pub mod send;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build a frame and print it.
    Build(BuildArgs),
    /// Parse frames from hex or a capture file.
    Decode(DecodeArgs),
    /// Write a single frame to a device or file.
    Send(SendArgs),
    /// Print frames received on a device, optionally acknowledging them.
    Listen(ListenArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat, types: TlvTypes) -> CliResult<i32> {
    match command {
        Command::Build(args) => build::run(args, format, types),
        Command::Decode(args) => decode::run(args, format, types),
        Command::Send(args) => send::run(args, format, types),
        Command::Listen(args) => listen::run(args, format, types),
        Command::Version(args) => version::run(args),
    }
}

/// Reserved type set on the wire.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum Profile {
    /// Host library values (control 0x01 ... NACK 0x09).
    #[default]
    Host,
    /// Embedded firmware values (control 0x10 ... NACK 0x15).
    Firmware,
}

impl Profile {
    pub fn types(self) -> TlvTypes {
        match self {
            Profile::Host => TlvTypes::HOST,
            Profile::Firmware => TlvTypes::FIRMWARE,
        }
    }
}

/// Records to put in a frame. Records are appended in the order the groups
/// are listed here.
#[derive(Args, Debug, Default)]
pub struct PayloadArgs {
    /// Control command byte (repeatable).
    #[arg(long = "control", value_name = "CMD", value_parser = parse_byte)]
    pub controls: Vec<u8>,
    /// 32-bit integer record (repeatable).
    #[arg(long = "int", value_name = "VALUE")]
    pub ints: Vec<u32>,
    /// UTF-8 string record (repeatable).
    #[arg(long = "string", value_name = "TEXT")]
    pub strings: Vec<String>,
    /// Fixed-point record, value scaled by 10000 (repeatable).
    #[arg(long = "scaled", value_name = "TYPE:VALUE", value_parser = parse_scaled)]
    pub scaled: Vec<ScaledRecord>,
    /// Record of any type with a hex value (repeatable).
    #[arg(long = "raw", value_name = "TYPE:HEX", value_parser = parse_raw)]
    pub raw: Vec<RawRecord>,
}

impl PayloadArgs {
    /// Encode all records into one frame payload.
    pub fn build(&self, types: TlvTypes) -> CliResult<Vec<u8>> {
        let mut builder = TlvBuilder::with_types(types);
        let context = "payload rejected";
        for &command in &self.controls {
            builder
                .control(command)
                .map_err(|err| frame_error(context, err))?;
        }
        for &value in &self.ints {
            builder
                .integer(value)
                .map_err(|err| frame_error(context, err))?;
        }
        for text in &self.strings {
            builder
                .string(text)
                .map_err(|err| frame_error(context, err))?;
        }
        for record in &self.scaled {
            builder
                .scaled(record.tlv_type, record.value)
                .map_err(|err| frame_error(context, err))?;
        }
        for record in &self.raw {
            builder
                .raw(record.tlv_type, &record.value)
                .map_err(|err| frame_error(context, err))?;
        }
        Ok(builder.as_bytes().to_vec())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ScaledRecord {
    pub tlv_type: u8,
    pub value: f32,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RawRecord {
    pub tlv_type: u8,
    pub value: Vec<u8>,
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// Frame id.
    #[arg(long, default_value = "1", value_parser = parse_byte)]
    pub id: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
}

#[derive(Args, Debug)]
pub struct DecodeArgs {
    /// Frame bytes as hex; spaces, colons, and `0x` prefixes are ignored.
    #[arg(required_unless_present = "file", conflicts_with = "file")]
    pub hex: Option<String>,
    /// Read raw bytes from a capture file instead.
    #[arg(long, value_name = "PATH")]
    pub file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Device node or file to write to.
    pub path: PathBuf,
    /// Line speed when PATH is a serial device.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Frame id.
    #[arg(long, default_value = "1", value_parser = parse_byte)]
    pub id: u8,
    #[command(flatten)]
    pub payload: PayloadArgs,
    /// Wait for the ACK/NACK and print it.
    #[arg(long)]
    pub wait: bool,
    /// Maximum time to wait when --wait is set (e.g. 2s, 500ms).
    #[arg(long, default_value = "2s")]
    pub wait_timeout: String,
}

#[derive(Args, Debug)]
pub struct ListenArgs {
    /// Device node or file to read from.
    pub path: PathBuf,
    /// Line speed when PATH is a serial device.
    #[arg(long, default_value_t = 115_200)]
    pub baud: u32,
    /// Exit after receiving N frames.
    #[arg(long)]
    pub count: Option<u64>,
    /// Acknowledge every frame that is not itself an acknowledgement.
    #[arg(long)]
    pub reply: bool,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

/// Open a device path; terminals get raw mode at `baud`.
pub fn open_device(path: &Path, baud: u32) -> CliResult<DeviceTransport> {
    let config = SerialConfig {
        baud_rate: baud,
        ..SerialConfig::default()
    };
    DeviceTransport::open_with(path, &config).map_err(|err| transport_error("open failed", err))
}

/// Parse a byte written in decimal or with a `0x` prefix.
pub fn parse_byte(input: &str) -> Result<u8, String> {
    let input = input.trim();
    let parsed = match input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => input.parse(),
    };
    parsed.map_err(|_| format!("invalid byte value: {input}"))
}

/// Decode hex, ignoring whitespace, `:` separators, and `0x` prefixes.
pub fn parse_hex(input: &str) -> Result<Vec<u8>, String> {
    let cleaned: String = input
        .split(|c: char| c.is_whitespace() || c == ':' || c == ',')
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();
    hex::decode(&cleaned).map_err(|err| format!("invalid hex: {err}"))
}

fn parse_raw(input: &str) -> Result<RawRecord, String> {
    let (tlv_type, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:HEX, got {input}"))?;
    Ok(RawRecord {
        tlv_type: parse_byte(tlv_type)?,
        value: parse_hex(value)?,
    })
}

fn parse_scaled(input: &str) -> Result<ScaledRecord, String> {
    let (tlv_type, value) = input
        .split_once(':')
        .ok_or_else(|| format!("expected TYPE:VALUE, got {input}"))?;
    let value: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("invalid number: {value}"))?;
    Ok(ScaledRecord {
        tlv_type: parse_byte(tlv_type)?,
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit::DATA_INVALID;

    #[test]
    fn bytes_in_decimal_and_hex() {
        assert_eq!(parse_byte("17"), Ok(17));
        assert_eq!(parse_byte("0x2a"), Ok(0x2A));
        assert_eq!(parse_byte("0XFF"), Ok(0xFF));
        assert!(parse_byte("256").is_err());
        assert!(parse_byte("0xZZ").is_err());
    }

    #[test]
    fn hex_tolerates_separators() {
        assert_eq!(parse_hex("F0 0F"), Ok(vec![0xF0, 0x0F]));
        assert_eq!(parse_hex("f0:0f:01"), Ok(vec![0xF0, 0x0F, 0x01]));
        assert_eq!(parse_hex("0xF0, 0x0F"), Ok(vec![0xF0, 0x0F]));
        assert_eq!(parse_hex(""), Ok(Vec::new()));
        assert!(parse_hex("F").is_err());
    }

    #[test]
    fn raw_and_scaled_records() {
        assert_eq!(
            parse_raw("0x40:0102"),
            Ok(RawRecord {
                tlv_type: 0x40,
                value: vec![1, 2]
            })
        );
        assert!(parse_raw("0x40").is_err());
        assert_eq!(
            parse_scaled("65:1.5"),
            Ok(ScaledRecord {
                tlv_type: 65,
                value: 1.5
            })
        );
    }

    #[test]
    fn payload_order_and_profile() {
        let args = PayloadArgs {
            controls: vec![0x01],
            ints: vec![5],
            strings: vec!["ok".to_string()],
            scaled: Vec::new(),
            raw: vec![RawRecord {
                tlv_type: 0x40,
                value: vec![0xAA],
            }],
        };
        let payload = args.build(Profile::Firmware.types()).unwrap();
        assert_eq!(
            payload,
            vec![
                0x10, 0x01, 0x01, //
                0x20, 0x04, 0x05, 0x00, 0x00, 0x00, //
                0x30, 0x02, b'o', b'k', //
                0x40, 0x01, 0xAA,
            ]
        );
    }

    #[test]
    fn oversized_payload_is_data_error() {
        let args = PayloadArgs {
            strings: vec!["x".repeat(200), "y".repeat(100)],
            ..PayloadArgs::default()
        };
        let err = args.build(TlvTypes::HOST).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
    }
}
