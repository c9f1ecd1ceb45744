//! Live microphone processing: captures from one device, applies an effect
//! (or the dry-mic gain), and plays back on another until Enter is pressed.
//!
//! Run with: `cargo run --example live -- [input-name] [output-name] [effect-name]`
//!
//! Unresolvable names fall back to the first valid devices, so running it
//! with no arguments processes the default-ish pair dry.

use std::io::BufRead;

use vocalfx::{EffectSelection, EffectStore, SessionParams, VocalFx};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let input = args.next().unwrap_or_default();
    let output = args.next().unwrap_or_default();
    let selection = match args.next() {
        Some(name) => EffectSelection::Stored(name),
        None => EffectSelection::DryMic,
    };

    let mut fx = VocalFx::new("effects")
        .with_event_callback(|event| tracing::warn!(?event, "engine event"));

    // Seed the store on first run so `live <in> <out> clamp-gain` works.
    if fx.list_effects()?.is_empty() {
        fx.save_effect("clamp-gain", EffectStore::template())?;
    }

    fx.start(&input, &output, selection, SessionParams::with_gain(1.0))?;
    println!("streaming ({:?}), press Enter to stop", fx.state());

    let mut line = String::new();
    std::io::stdin().lock().read_line(&mut line)?;

    if let Some(stats) = fx.stats() {
        println!(
            "processed {} buffers / {} samples ({} dropped)",
            stats.chunks_processed, stats.samples_processed, stats.dropped_input_samples
        );
    }
    fx.stop();
    println!("stopped ({:?})", fx.state());
    Ok(())
}
