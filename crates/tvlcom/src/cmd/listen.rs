use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{info, warn};
use tvlcom_dispatch::{Dispatcher, DispatcherConfig, Link};
use tvlcom_frame::{FrameError, FrameReader, TlvTypes};
use tvlcom_transport::Transport;

use crate::cmd::{open_device, ListenArgs};
use crate::exit::{dispatch_error, frame_error, CliError, CliResult, SUCCESS};
use crate::output::{print_frame, OutputFormat};

pub fn run(args: ListenArgs, format: OutputFormat, types: TlvTypes) -> CliResult<i32> {
    let transport = Arc::new(open_device(&args.path, args.baud)?);

    let running = Arc::new(AtomicBool::new(true));
    install_ctrlc_handler(running.clone())?;

    let received = if args.reply {
        let dispatcher = acknowledge_everything(Arc::clone(&transport), types)?;
        let mut link = Link::new(dispatcher);
        let mut printed = 0u64;
        link.run(&running, |item| {
            if args.count.is_some_and(|count| printed >= count) {
                return;
            }
            print_frame(&item.frame, &types, Some(&item.outcome), format);
            printed += 1;
            if args.count.is_some_and(|count| printed >= count) {
                running.store(false, Ordering::SeqCst);
            }
        })
        .map_err(|err| dispatch_error("listen failed", err))?;
        printed
    } else {
        let reader = FrameReader::new(Arc::clone(&transport));
        listen_only(reader, &running, &args, format, types)?
    };

    info!(frames = received, "listener stopped");
    close_link(&transport);
    Ok(SUCCESS)
}

/// Close the link, logging instead of failing: every frame was already printed.
fn close_link<T: Transport>(transport: &T) -> bool {
    match transport.close() {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to close transport");
            false
        }
    }
}

/// A dispatcher whose handlers accept every command and every value type.
fn acknowledge_everything<T: Transport>(
    transport: T,
    types: TlvTypes,
) -> CliResult<Dispatcher<T>> {
    let mut dispatcher = Dispatcher::with_config(transport, DispatcherConfig::with_types(types));
    for key in 0..=u8::MAX {
        dispatcher.register_command(key, || true);
        if !types.is_routing_reserved(key) {
            dispatcher
                .register_value(key, |_: &[u8]| true)
                .map_err(|err| dispatch_error("handler setup failed", err))?;
        }
    }
    Ok(dispatcher)
}

fn listen_only<T: Transport>(
    mut reader: FrameReader<T>,
    running: &AtomicBool,
    args: &ListenArgs,
    format: OutputFormat,
    types: TlvTypes,
) -> CliResult<u64> {
    let mut received = 0u64;
    while running.load(Ordering::SeqCst) {
        let read = match reader.poll() {
            Ok(read) => read,
            Err(FrameError::ConnectionClosed) => break,
            Err(err) => return Err(frame_error("receive failed", err)),
        };
        while let Some(frame) = reader.next_frame() {
            print_frame(&frame, &types, None, format);
            received += 1;
            if args.count.is_some_and(|count| received >= count) {
                return Ok(received);
            }
        }
        if read == 0 {
            std::thread::sleep(reader.config().idle_backoff);
        }
    }
    Ok(received)
}

fn install_ctrlc_handler(running: Arc<AtomicBool>) -> CliResult<()> {
    ctrlc::set_handler(move || {
        running.store(false, Ordering::SeqCst);
    })
    .map_err(|err| {
        CliError::new(
            crate::exit::INTERNAL,
            format!("signal handler setup failed: {err}"),
        )
    })
}
