//! Feed lifecycle states and their transition table.

/// The current phase of a paginated feed
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "state")]
pub enum FeedState<C> {
    /// Nothing requested yet
    Initial,
    /// Full reload requested; passes straight through to `Loading`
    Reloading,
    /// Fetch in flight for `cursor` (`None` = first page)
    Loading { cursor: Option<C> },
    /// Last load succeeded and more pages may exist
    Idle,
    /// Feed exhausted, or the server refused further requests
    NoMore,
    /// Last load failed; retried automatically after a delay
    Fail,
}

impl<C> FeedState<C> {
    pub fn name(&self) -> &'static str {
        match self {
            FeedState::Initial => "Initial",
            FeedState::Reloading => "Reloading",
            FeedState::Loading { .. } => "Loading",
            FeedState::Idle => "Idle",
            FeedState::NoMore => "NoMore",
            FeedState::Fail => "Fail",
        }
    }
}

/// Whether `from -> to` is an allowed transition
pub fn is_legal<C>(from: &FeedState<C>, to: &FeedState<C>) -> bool {
    use FeedState::*;

    matches!(
        (from, to),
        (Initial, Reloading)
            | (Reloading, Loading { .. })
            | (Idle, Reloading)
            | (Idle, Loading { .. })
            | (Loading { .. }, Fail)
            | (Loading { .. }, Idle)
            | (Loading { .. }, NoMore)
            | (Fail, Loading { .. })
            | (NoMore, Reloading)
    )
}
