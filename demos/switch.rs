//! Usage: `cargo run --example switch -- 1920 1080 [60]`
//!
//! Switches the primary monitor to the closest matching mode.

use monitors::{apply_mode, primary_monitor};

fn main() -> monitors::Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let parse = |index: usize| args.get(index).and_then(|value| value.parse::<f64>().ok());
    let (Some(width), Some(height)) = (parse(0), parse(1)) else {
        eprintln!("usage: switch <width> <height> [refresh]");
        return Ok(());
    };
    let refresh = parse(2).unwrap_or(60.0);

    let Some(mut monitor) = primary_monitor()? else {
        eprintln!("No awake primary monitor");
        return Ok(());
    };
    println!("Primary monitor: {monitor}");

    let Some(mode) = monitor
        .find_mode(width as u32, height as u32, refresh)
        .cloned()
    else {
        eprintln!("{width}x{height} is not available on this monitor");
        return Ok(());
    };

    apply_mode(&mut monitor, &mode)?;
    println!("Switched to {mode}");
    Ok(())
}
