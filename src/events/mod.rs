//! # Events Module
//!
//! Event-driven progress reporting for any UI layer.
//!
//! ## Design
//! The core library emits events through channels, allowing a UI
//! (CLI, GUI, web) to subscribe and display progress. The core never
//! waits on a listener.
//!
//! ## Example
//! ```rust,ignore
//! let (sender, receiver) = EventChannel::new();
//!
//! std::thread::spawn(move || {
//!     for event in receiver.iter() {
//!         if let Event::Archive(ArchiveEvent::FileArchived { destination, .. }) = event {
//!             println!("Archived {}", destination.display());
//!         }
//!     }
//! });
//!
//! orchestrator.with_events(sender).run(&source)?;
//! ```

mod channel;
mod types;

pub use channel::{EventChannel, EventReceiver, EventSender, null_sender};
pub use types::*;
