//! Error types for move selection.

/// Errors produced by the search.
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    /// The position has no legal move to choose from.
    #[error("no legal moves in the searched position")]
    NoLegalMoves,

    /// A tree query needed children that were never materialized.
    #[error("search tree has no children to choose from")]
    EmptyTree,

    /// A second search was requested while one is still running.
    #[error("a search is already in progress")]
    Busy,

    /// The background search thread ended without producing a result.
    #[error("search thread terminated without a result")]
    TaskFailed,
}
