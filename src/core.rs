use bytes::BytesMut;
use log::{debug, info, warn};
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::constants::{CC_TUPLE_SIZE, LOG_TARGET};
use crate::context::{Collaborators, DtvccContext};
use crate::report::Reporter;

/// Reads raw caption tuples, one frame of `cc_count` tuples per `process_data` call
#[tokio::main(flavor = "current_thread")]
pub async fn run(opts: crate::extractor::Options) -> anyhow::Result<crate::extractor::RunSummary> {
    opts.validate()?;
    let mut ctx = DtvccContext::new(&opts.settings, Collaborators::default())?;
    ctx.set_active(opts.settings.active_services_count > 0);

    let mut input: Box<dyn AsyncRead + Unpin> = match &opts.input {
        Some(path) => Box::new(File::open(path).await?),
        None => Box::new(tokio::io::stdin()),
    };

    let frame_len = opts.cc_count * CC_TUPLE_SIZE;
    let frame_ms = 1000.0 / opts.fps;
    let mut buf = BytesMut::with_capacity(frame_len * 64);
    let mut frames: u64 = 0;

    loop {
        let n = input.read_buf(&mut buf).await?;

        // iterate whole frames
        while buf.len() >= frame_len {
            let frame = buf.split_to(frame_len);
            ctx.timing().set_ms((frames as f64 * frame_ms).round() as i64);
            ctx.process_data(&frame)?;
            frames += 1;
        }
        if n == 0 {
            break;
        }
    }

    let whole = buf.len() - buf.len() % CC_TUPLE_SIZE;
    if whole > 0 {
        let frame = buf.split_to(whole);
        ctx.timing().set_ms((frames as f64 * frame_ms).round() as i64);
        ctx.process_data(&frame)?;
        frames += 1;
    }
    if !buf.is_empty() {
        warn!(target: LOG_TARGET, "ignoring {} trailing bytes (not a whole cc tuple)", buf.len());
    }

    ctx.flush_packet()?;
    debug!(target: LOG_TARGET, "input exhausted after {frames} frames");

    let report = ctx.report_enabled().then(|| Reporter::create_report(&ctx));
    let packets = ctx.report().borrow().packets;
    ctx.free();
    info!(target: LOG_TARGET, "{frames} frames, {packets} packets decoded");

    Ok(crate::extractor::RunSummary { frames, packets, report })
}
