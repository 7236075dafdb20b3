//! Print every mirrorable window and monitor, marking the ones the given
//! title patterns would pre-select.
//!
//! Usage: cargo run --example list_sources -- [title-pattern ...]

use anyhow::Result;
use window_mirror::{MirrorConfig, SourceEnumerator, system_source_provider};

fn main() -> Result<()> {
    env_logger::init();

    let config = MirrorConfig::from_env_and_args(std::env::args().skip(1))?;
    let provider = system_source_provider();
    let mut enumerator = SourceEnumerator::new(config.refresh_interval, config.title_filter()?);
    enumerator.refresh(true, provider.as_ref(), |_| false);

    if enumerator.candidates().is_empty() {
        println!("no capture sources found");
        return Ok(());
    }
    for candidate in enumerator.candidates() {
        let mark = if candidate.mirrored { "x" } else { " " };
        println!(
            "[{mark}] {:<24} {}",
            candidate.source.target.stable_id(),
            candidate.source.title
        );
    }
    Ok(())
}
