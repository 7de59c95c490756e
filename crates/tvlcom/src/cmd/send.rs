use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::debug;
use tvlcom_frame::{AckKind, FrameReader, FrameWriter, ReceivedFrame, TlvTypes};
use tvlcom_transport::Transport;

use crate::cmd::{open_device, SendArgs};
use crate::exit::{frame_error, CliError, CliResult, FAILURE, SUCCESS, TIMEOUT, USAGE};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat, types: TlvTypes) -> CliResult<i32> {
    let wait_timeout = parse_duration(&args.wait_timeout)?;
    let payload = args.payload.build(types)?;

    let transport = Arc::new(open_device(&args.path, args.baud)?);
    let mut writer = FrameWriter::with_types(Arc::clone(&transport), types);
    let written = writer
        .send(args.id, &payload)
        .map_err(|err| frame_error("send failed", err))?;
    debug!(frame_id = args.id, written, "frame written");

    if !args.wait {
        return Ok(SUCCESS);
    }

    let mut reader = FrameReader::new(transport);
    let (reply, kind) = wait_for_reply(&mut reader, &types, args.id, wait_timeout)?;
    print_frame(&reply, &types, None, format);
    Ok(match kind {
        AckKind::Ack => SUCCESS,
        AckKind::Nack => FAILURE,
    })
}

/// Read until an ACK or NACK for `frame_id` arrives. Other frames are skipped.
fn wait_for_reply<T: Transport>(
    reader: &mut FrameReader<T>,
    types: &TlvTypes,
    frame_id: u8,
    timeout: Duration,
) -> CliResult<(ReceivedFrame, AckKind)> {
    let deadline = Instant::now() + timeout;
    loop {
        let read = reader
            .poll()
            .map_err(|err| frame_error("receive failed", err))?;
        while let Some(frame) = reader.next_frame() {
            if let Some(kind) = reply_kind(&frame, types, frame_id) {
                return Ok((frame, kind));
            }
            debug!(frame_id = frame.id, "skipping unrelated frame");
        }
        if Instant::now() >= deadline {
            return Err(CliError::new(
                TIMEOUT,
                format!("no reply for frame {frame_id} within {timeout:?}"),
            ));
        }
        if read == 0 {
            std::thread::sleep(reader.config().idle_backoff);
        }
    }
}

fn reply_kind(frame: &ReceivedFrame, types: &TlvTypes, frame_id: u8) -> Option<AckKind> {
    frame.records.iter().find_map(|record| {
        let kind = types.ack_kind(record.tlv_type)?;
        (record.as_command() == Some(frame_id)).then_some(kind)
    })
}

fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "s")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use tvlcom_frame::{build_ack, build_frame, build_nack};
    use tvlcom_transport::MemoryTransport;

    use super::*;

    #[test]
    fn waits_past_unrelated_frames() {
        let types = TlvTypes::HOST;
        let transport = MemoryTransport::new();
        transport.push_inbound(&build_frame(3, &[0x40, 0x01, 0x00]).unwrap());
        transport.push_inbound(&build_ack(&types, 0x99));
        transport.push_inbound(&build_nack(&types, 0x07));

        let mut reader = FrameReader::new(transport);
        let (frame, kind) =
            wait_for_reply(&mut reader, &types, 0x07, Duration::from_millis(50)).unwrap();
        assert_eq!(kind, AckKind::Nack);
        assert_eq!(frame.id, 0);
    }

    #[test]
    fn times_out_without_reply() {
        let mut reader = FrameReader::new(MemoryTransport::new());
        let err = wait_for_reply(
            &mut reader,
            &TlvTypes::HOST,
            1,
            Duration::from_millis(5),
        )
        .unwrap_err();
        assert_eq!(err.code, TIMEOUT);
    }

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
