// Entry point for the random-walk Minesweeper TUI
// Sets up logging, loads configuration, and launches the main UI

use anyhow::Result;
use tracing::info;

// Module declarations
mod rws_board;   // Board model: mines, counts, reveal cascade, flags, win rule
mod rws_color;   // Terminal palette and tile glyphs
mod rws_config;  // Settings and best-time records
mod rws_dice;    // Injectable random source for the cascade
mod rws_log;     // File-backed tracing subscriber
mod rws_session; // Game state machine driven once per frame
mod rws_ui;      // Terminal rendering and input mapping

use rws_config::load_or_create_config;
use rws_ui::run as run_ui;

fn main() -> Result<()> {
    // Logging is best effort; the game runs without it
    match rws_log::init() {
        Ok(Some(path)) => info!(path = %path.display(), "logging to file"),
        Ok(None) => eprintln!("logging disabled: no config directory"),
        Err(e) => eprintln!("logging disabled: {:#}", e),
    }

    // Load or create user configuration (board shape, cascade odds, records)
    let mut cfg = load_or_create_config();

    // Launch the main UI loop
    run_ui(&mut cfg)
}
