pub mod entry;
pub mod history;
pub mod log_store;
pub mod selection;
pub mod wire;

pub use entry::{Call, Entry, EntryKind, Message};
pub use history::HistorySource;
pub use log_store::{LogError, LogStore};
pub use selection::{Selection, HALF_PAGE};
pub use wire::{Command, FrameError, DEFAULT_MAX_FRAME_BYTES};
