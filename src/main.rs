//! # photo-archive CLI
//!
//! Command-line interface for the photo archiver.
//!
//! ## Usage
//! ```bash
//! photo-archive archive /media/card/DCIM --media-dir ~/Media --delete-source
//! photo-archive scan-missing --media-dir ~/Media --output json
//! ```

mod cli;

use photo_archiver::Result;

fn main() -> Result<()> {
    cli::run()
}
