use monitors::detect;

fn main() -> monitors::Result<()> {
    monitors::init()?;

    let all = detect()?;
    println!("Monitors ({})", all.len());
    for monitor in &all {
        println!("  {monitor}");
        if let Some(diagonal) = monitor.diagonal_inches() {
            println!(
                "    {:.0}x{:.0} mm ({diagonal:.1}\")",
                monitor.width_mm, monitor.height_mm
            );
        }
        for mode in monitor.modes() {
            let marker = if monitor.current_mode() == Some(mode) {
                "*"
            } else {
                " "
            };
            println!("    {marker} {mode}");
        }
    }

    monitors::deinit();
    Ok(())
}
