use thiserror::Error;

/// The error taxonomy for the whole `ivl` family of crates.
///
/// Every fallible entry point (interval construction, `span`, `maximum_depth`'s
/// "choose") returns one of these rather than panicking or leaving undefined
/// behavior, even where the distilled contract would have allowed either.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IndexError {
    #[error("invalid interval: low={low}, high={high}, low_included={low_included}, high_included={high_included}")]
    InvalidInterval {
        low: String,
        high: String,
        low_included: bool,
        high_included: bool,
    },

    #[error("operation requires a non-empty collection")]
    EmptyCollection,
}
