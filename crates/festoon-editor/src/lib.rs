//! Festoon editing engine.
//!
//! [`Editor`] wraps a [`festoon_core::Scene`] with selection, edit scopes,
//! clipboard and paste sessions, batched snapshot undo/redo and debounced
//! autosave. Time, storage and rendering are ports ([`Clock`],
//! [`KeyValueStore`], [`Renderer`]) so hosts and tests plug in their own.

pub mod clipboard;
pub mod config;
pub mod editor;
pub mod groups;
pub mod history;
pub mod instances;
pub mod nodes;
pub mod paste;
pub mod persistence;
pub mod render;
pub mod schedule;
pub mod selection;
pub mod stack;

pub use clipboard::{Clipboard, PasteMode, PasteSession};
pub use config::EditorConfig;
pub use editor::Editor;
pub use history::{History, HistoryMode, Snapshot};
pub use nodes::BalloonStyle;
pub use persistence::{Autosave, FileStore, KeyValueStore, MemoryStore, StorageError};
pub use render::{ExportOptions, RenderError, Renderer};
pub use schedule::{Clock, Debouncer, ManualClock, SystemClock};
pub use selection::{EditScope, Selection};
