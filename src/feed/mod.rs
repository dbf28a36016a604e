//! Cursor-based feed pagination.
//!
//! A feed is driven through `FeedState` by explicit triggers (reload, load
//! more) while the paginator owns the authoritative state, the accumulated
//! items and the stored cursor.

mod paginator;
mod state;

pub use paginator::{FeedEvent, FeedPaginator};
pub use state::{is_legal, FeedState};
