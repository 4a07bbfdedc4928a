//! # Feedsync Core
//!
//! Pure synchronization logic for a live, paginated feed: the entry types,
//! the ordered [`FeedModel`], the [`MergeEngine`] that reconciles history
//! pages with pushed events, and the [`ViewOp`] list it emits for a view to
//! apply. Nothing in this crate performs I/O.
//!
//! ## Invariants
//!
//! - entries are sorted ascending by `(sort_key, id)`
//! - no two entries share an id
//! - only history responses move the pagination cursor
//! - at most one history request is outstanding per model

#![forbid(unsafe_code)]

pub mod entry;
pub mod error;
pub mod event;
pub mod merge;
pub mod model;
pub mod ops;
pub mod page;
pub mod route;

pub use entry::{Entry, EntryFields, EntryId, EntryPatch, IncomingEntry, Payload, SortKey};
pub use error::{FeedError, FeedResult};
pub use event::{decode_frame, EventKind, FeedEvent};
pub use merge::{MergeEngine, StickPolicy, Viewport};
pub use model::{ChannelState, FeedModel, LoadPhase};
pub use ops::{FeedViewState, MergeOutcome, ScrollDirective, ViewOp};
pub use page::{Page, PageCursor};
pub use route::{notification_entry_id, FeedKind, IndicatorKey, NotificationSection};
