//! Prints the device catalog: every capture and playback endpoint the host
//! exposes, in enumeration order.
//!
//! Run with: `cargo run --example devices`

use vocalfx::DeviceCatalog;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let catalog = DeviceCatalog::enumerate()?;

    println!("Inputs:");
    for device in catalog.inputs() {
        println!(
            "  [{}] {} ({} ch)",
            device.index, device.name, device.max_input_channels
        );
    }

    println!("Outputs:");
    for device in catalog.outputs() {
        println!(
            "  [{}] {} ({} ch)",
            device.index, device.name, device.max_output_channels
        );
    }

    Ok(())
}
