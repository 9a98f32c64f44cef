//! # photo-triage CLI
//!
//! Command-line interface for the photo triage engine.
//!
//! ## Usage
//! ```bash
//! photo-triage scan ~/Pictures
//! photo-triage review ~/Pictures --category duplicate
//! photo-triage history --limit 5
//! ```

mod cli;

use photo_triage::Result;

fn main() -> Result<()> {
    photo_triage::init_tracing();
    cli::run()
}
