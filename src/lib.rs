pub mod audio;
pub mod bookmark;
pub mod collapse;
pub mod config;
pub mod entry;
pub mod error;
pub mod host;
pub mod links;
pub mod placement;
pub mod popup;
pub mod render;
pub mod senses;
pub mod tree;

pub use audio::{AudioLocation, audio_directory};
pub use bookmark::{
    BookmarkAction, BookmarkIcon, BookmarkRequest, BookmarkState, BookmarkSync, BookmarkTarget,
    MemoryBookmarkStore, PersistenceOwner,
};
pub use collapse::{
    CollapsedEntry, ExampleRun, ExampleToggle, RunCounter, RunId, ToggleSet, collapse_examples,
    collapse_examples_with,
};
pub use config::PopupConfig;
pub use entry::{EntrySource, LookupOutcome, LookupQuery, XmlFixtures, lookup, parse_entry_list};
pub use error::{ConfigError, LookupError, SyncError};
pub use host::{NavigationRequest, PopupHost, PopupId, ResourceLocator, SnapshotHost};
pub use placement::{AnchorRect, PopupGeometry, PopupSize, Viewport, place_popup};
pub use popup::{PopupController, PopupPhase, Selection, prepare_entry};
pub use render::Renderer;
pub use senses::group_senses;
pub use tree::{DisplayNode, GenericNode, NodeClass, build_display_tree};
