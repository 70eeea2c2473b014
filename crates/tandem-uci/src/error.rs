//! UCI protocol errors.

use tandem_core::CoreError;

/// Errors that can occur during UCI protocol handling.
#[derive(Debug, thiserror::Error)]
pub enum UciError {
    /// The `position` command is missing `startpos` or `fen` keyword.
    #[error("malformed position command: missing startpos or fen keyword")]
    MalformedPosition,

    /// Failed to parse a FEN string.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The FEN string that failed to parse.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A move string in the `position` command is not legal.
    #[error("invalid move: {uci_move}")]
    InvalidMove {
        /// The UCI move string that failed to resolve.
        uci_move: String,
    },

    /// A `go` parameter was given without its value.
    #[error("missing value for go parameter: {param}")]
    MissingGoValue {
        /// The parameter name.
        param: String,
    },

    /// A `go` parameter value could not be parsed.
    #[error("invalid value for go parameter {param}: {value}")]
    InvalidGoValue {
        /// The parameter name.
        param: String,
        /// The value that failed to parse.
        value: String,
    },

    /// `setoption` without a `name`.
    #[error("malformed setoption command")]
    MalformedOption,

    /// `setoption` named an option the engine does not have.
    #[error("unknown option: {name}")]
    UnknownOption {
        /// The option name as given.
        name: String,
    },

    /// An option value could not be parsed or is out of range.
    #[error("invalid value for option {name}: {value}")]
    InvalidOption {
        /// The option name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// An I/O error occurred while reading from stdin.
    #[error("I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },
}

impl From<CoreError> for UciError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::InvalidFen { fen, reason } => UciError::InvalidFen { fen, reason },
            CoreError::IllegalMove { uci } => UciError::InvalidMove { uci_move: uci },
        }
    }
}
