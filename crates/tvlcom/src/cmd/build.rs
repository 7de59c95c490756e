use tvlcom_frame::{build_frame, TlvTypes};

use crate::cmd::BuildArgs;
use crate::exit::{frame_error, CliResult, SUCCESS};
use crate::output::{print_built, OutputFormat};

pub fn run(args: BuildArgs, format: OutputFormat, types: TlvTypes) -> CliResult<i32> {
    let payload = args.payload.build(types)?;
    let wire = build_frame(args.id, &payload).map_err(|err| frame_error("build failed", err))?;
    print_built(args.id, payload.len(), &wire, format);
    Ok(SUCCESS)
}
