//! Open a capture stream for the first window matching a title pattern and
//! poll it for a couple of seconds, reporting each new texture.
//!
//! Usage: cargo run --example poll_capture -- [--backend auto|wgc|dwm] <title-pattern>

use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use window_mirror::{
    MirrorConfig, Source, SourceEnumerator, backend_for_device, create_render_device,
    system_source_provider,
};

const POLL_DURATION: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(16);

fn main() -> Result<()> {
    env_logger::init();

    let config = MirrorConfig::from_env_and_args(std::env::args().skip(1))?;
    if config.title_patterns.is_empty() {
        bail!("pass a title pattern to choose the window to capture");
    }

    let provider = system_source_provider();
    let mut enumerator = SourceEnumerator::new(config.refresh_interval, config.title_filter()?);
    enumerator.refresh(true, provider.as_ref(), |_| false);
    let source: Source = enumerator
        .candidates()
        .iter()
        .find(|candidate| candidate.mirrored)
        .map(|candidate| candidate.source.clone())
        .context("no source matches the given patterns")?;

    let device = create_render_device()?;
    let backend = backend_for_device(device, config.backend, &config.auto_policy)?;
    let mut stream = backend.open(&source.target)?;
    println!(
        "capturing {:?} with the {} backend",
        source.title,
        stream.kind().as_str()
    );

    let started = Instant::now();
    let mut frames = 0usize;
    let mut last = None;
    while started.elapsed() < POLL_DURATION {
        if let Some(texture) = stream.poll_frame()? {
            if last.as_ref() != Some(&texture) {
                frames += 1;
                let desc = texture.desc();
                println!(
                    "{:>6.0?} new texture {}x{} format {}",
                    started.elapsed(),
                    desc.width,
                    desc.height,
                    desc.format
                );
                last = Some(texture);
            }
        }
        thread::sleep(POLL_INTERVAL);
    }

    let size = stream.size();
    stream.close();
    println!("{frames} distinct textures, final size {}x{}", size.width, size.height);
    Ok(())
}
