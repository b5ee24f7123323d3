/// Cone Terminal Demo - Touch-rotatable cone
///
/// Usage: cone-terminal [slices]
///
/// Controls:
///   - Mouse drag: Point the cone at the cursor (enlarged while held)
///   - 0-6: Device orientation (unknown, portrait, upside-down,
///          landscape left/right, face up/down)
///   - Q/ESC: Quit
///
/// Logs go to stderr and default to warnings only while the screen is in use;
/// set `RUST_LOG=debug` and redirect stderr (`2> cone.log`) to see more.

use cone_core::EngineConfig;
use cone_terminal::TerminalApp;
use std::env;
use std::io;

fn main() -> io::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let mut config = EngineConfig::default();
    if let Some(arg) = env::args().nth(1) {
        config.cone.slices = arg.parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid slice count '{}': {}", arg, e),
            )
        })?;
    }

    println!("Cone Terminal Renderer - {} slices", config.cone.slices);

    // Run the terminal app
    let mut app = TerminalApp::new(config)?;
    app.run()?;

    println!("Thank you for using the Cone Terminal Renderer!");
    Ok(())
}
