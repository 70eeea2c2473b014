//! Errors raised while building positions from text.

/// Errors from FEN parsing and move-text resolution.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    /// The FEN string could not be parsed or describes an illegal setup.
    #[error("invalid FEN \"{fen}\": {reason}")]
    InvalidFen {
        /// The offending FEN string.
        fen: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A UCI move string does not name a legal move in the position.
    #[error("illegal move: {uci}")]
    IllegalMove {
        /// The move text that failed to resolve.
        uci: String,
    },
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn illegal_move_display() {
        let err = CoreError::IllegalMove {
            uci: "e2e5".to_string(),
        };
        assert_eq!(format!("{err}"), "illegal move: e2e5");
    }

    #[test]
    fn invalid_fen_display_names_the_fen() {
        let err = CoreError::InvalidFen {
            fen: "xyz".to_string(),
            reason: "bad board".to_string(),
        };
        assert_eq!(format!("{err}"), "invalid FEN \"xyz\": bad board");
    }
}
