use std::fs;

use tracing::warn;
use tvlcom_frame::{FrameReceiver, ReceiverState, TlvTypes};

use crate::cmd::{parse_hex, DecodeArgs};
use crate::exit::{io_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};
use crate::output::{print_frame, print_stream_error, OutputFormat};

pub fn run(args: DecodeArgs, format: OutputFormat, types: TlvTypes) -> CliResult<i32> {
    let bytes = read_input(&args)?;

    let mut receiver = FrameReceiver::new();
    receiver.feed(&bytes, |event| match event {
        Ok(frame) => print_frame(&frame, &types, None, format),
        Err(err) => print_stream_error(&err, format),
    });

    if receiver.state() != ReceiverState::Sync {
        warn!(state = ?receiver.state(), "input ends inside a frame");
    }

    let stats = receiver.stats();
    if stats.frames == 0 && stats.errors() > 0 {
        return Ok(DATA_INVALID);
    }
    Ok(SUCCESS)
}

fn read_input(args: &DecodeArgs) -> CliResult<Vec<u8>> {
    if let Some(path) = &args.file {
        return fs::read(path)
            .map_err(|err| io_error(&format!("failed reading {}", path.display()), err));
    }
    match &args.hex {
        Some(hex) => parse_hex(hex).map_err(|err| CliError::new(USAGE, err)),
        None => Err(CliError::new(USAGE, "either HEX or --file is required")),
    }
}
