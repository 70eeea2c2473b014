//! UCI command parsing.

use std::time::Duration;

use tandem_core::{Chess, from_fen, play_uci_line, starting_position};

use crate::error::UciError;

/// Parameters for the `go` command.
///
/// All fields are optional; a bare `go` uses the configured budget.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoParams {
    /// MCTS iterations for this request (`iterations` or `nodes`).
    pub iterations: Option<u32>,
    /// Run the standalone iterative-deepening search to this depth.
    pub depth: Option<u8>,
    /// Stop the search once this much time has passed.
    pub movetime: Option<Duration>,
    /// Search until `stop`.
    pub infinite: bool,
}

/// A `setoption` the engine understands.
#[derive(Debug, Clone, PartialEq)]
pub enum UciOption {
    /// MCTS iterations per move.
    Iterations(u32),
    /// Iterative-deepening depth.
    MaxDepth(u8),
    /// Root fan-out workers.
    Threads(usize),
    /// UCT exploration constant.
    Exploration(f64),
    /// Score MCTS leaves with a shallow minimax probe.
    MinimaxProbe(bool),
    /// Reconcile the MCTS choice with minimax.
    HybridSelect(bool),
    /// Transposition table size in megabytes.
    Hash(usize),
    /// Per-depth time ceiling.
    MoveTime(Duration),
}

/// A parsed UCI command.
#[derive(Debug)]
pub enum Command {
    /// `uci` -- identify the engine.
    Uci,
    /// `isready` -- synchronization ping.
    IsReady,
    /// `ucinewgame` -- reset engine state.
    UciNewGame,
    /// `position` -- set up a position with optional moves applied.
    Position(Chess),
    /// `go` -- start searching with given parameters.
    Go(GoParams),
    /// `setoption name <id> value <x>`.
    SetOption(UciOption),
    /// `stop` -- halt the current search.
    Stop,
    /// `quit` -- exit the engine.
    Quit,
    /// Unrecognized command (silently ignored per UCI convention).
    Unknown(String),
}

/// Parse a single line of UCI input into a [`Command`].
pub fn parse_command(line: &str) -> Result<Command, UciError> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let Some((&head, args)) = tokens.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    match head {
        "uci" => Ok(Command::Uci),
        "isready" => Ok(Command::IsReady),
        "ucinewgame" => Ok(Command::UciNewGame),
        "stop" => Ok(Command::Stop),
        "quit" => Ok(Command::Quit),
        "position" => parse_position(args),
        "go" => parse_go(args),
        "setoption" => parse_setoption(args),
        _ => Ok(Command::Unknown(head.to_string())),
    }
}

/// Parse the `position` command arguments.
///
/// Supports:
/// - `position startpos [moves e2e4 d7d5 ...]`
/// - `position fen <fen-string> [moves e2e4 d7d5 ...]`
fn parse_position(tokens: &[&str]) -> Result<Command, UciError> {
    let moves_at = tokens.iter().position(|&t| t == "moves");
    let (setup, moves) = match moves_at {
        Some(i) => (&tokens[..i], &tokens[i + 1..]),
        None => (tokens, &[][..]),
    };

    let base = match setup.split_first() {
        Some((&"startpos", [])) => starting_position(),
        Some((&"fen", fields)) if !fields.is_empty() => from_fen(&fields.join(" "))?,
        Some((&"fen", _)) => {
            return Err(UciError::InvalidFen {
                fen: String::new(),
                reason: "empty FEN".to_string(),
            });
        }
        _ => return Err(UciError::MalformedPosition),
    };

    let position = play_uci_line(&base, moves.iter().copied())?;
    Ok(Command::Position(position))
}

/// Parse the `go` command arguments.
///
/// Supports: iterations, nodes (alias of iterations), depth, movetime,
/// infinite. Unknown tokens are silently skipped.
fn parse_go(tokens: &[&str]) -> Result<Command, UciError> {
    let mut params = GoParams::default();

    let mut i = 0;
    while i < tokens.len() {
        match tokens[i] {
            "iterations" | "nodes" => {
                params.iterations = Some(parse_int(tokens.get(i + 1), tokens[i])?);
                i += 2;
            }
            "depth" => {
                params.depth = Some(parse_int(tokens.get(i + 1), "depth")?);
                i += 2;
            }
            "movetime" => {
                params.movetime = Some(parse_millis(tokens.get(i + 1), "movetime")?);
                i += 2;
            }
            "infinite" => {
                params.infinite = true;
                i += 1;
            }
            _ => {
                i += 1;
            }
        }
    }

    Ok(Command::Go(params))
}

/// Parse `setoption name <id...> value <x...>`. Option names are matched
/// case-insensitively.
fn parse_setoption(tokens: &[&str]) -> Result<Command, UciError> {
    let Some((&"name", rest)) = tokens.split_first() else {
        return Err(UciError::MalformedOption);
    };
    let value_at = rest.iter().position(|&t| t == "value");
    let (name, value) = match value_at {
        Some(i) => (rest[..i].join(" "), rest[i + 1..].join(" ")),
        None => (rest.join(" "), String::new()),
    };
    if name.is_empty() {
        return Err(UciError::MalformedOption);
    }

    let invalid = || UciError::InvalidOption {
        name: name.clone(),
        value: value.clone(),
    };

    let option = match name.to_ascii_lowercase().as_str() {
        "iterations" => UciOption::Iterations(value.parse().map_err(|_| invalid())?),
        "maxdepth" => {
            let depth: u8 = value.parse().map_err(|_| invalid())?;
            if depth == 0 {
                return Err(invalid());
            }
            UciOption::MaxDepth(depth)
        }
        "threads" => {
            let threads: usize = value.parse().map_err(|_| invalid())?;
            if threads == 0 {
                return Err(invalid());
            }
            UciOption::Threads(threads)
        }
        "exploration" => {
            let c: f64 = value.parse().map_err(|_| invalid())?;
            if !c.is_finite() || c < 0.0 {
                return Err(invalid());
            }
            UciOption::Exploration(c)
        }
        "minimaxprobe" => UciOption::MinimaxProbe(parse_check(&value).ok_or_else(invalid)?),
        "hybridselect" => UciOption::HybridSelect(parse_check(&value).ok_or_else(invalid)?),
        "hash" => {
            let mb: usize = value.parse().map_err(|_| invalid())?;
            if mb == 0 {
                return Err(invalid());
            }
            UciOption::Hash(mb)
        }
        "movetime" => {
            let ms: u64 = value.parse().map_err(|_| invalid())?;
            UciOption::MoveTime(Duration::from_millis(ms))
        }
        _ => return Err(UciError::UnknownOption { name: name.clone() }),
    };
    Ok(Command::SetOption(option))
}

fn parse_check(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Parse a millisecond value from a token.
fn parse_millis(token: Option<&&str>, param: &str) -> Result<Duration, UciError> {
    parse_int(token, param).map(Duration::from_millis)
}

/// Parse an integer value from a token.
fn parse_int<T: std::str::FromStr>(token: Option<&&str>, param: &str) -> Result<T, UciError> {
    let value = token.ok_or_else(|| UciError::MissingGoValue {
        param: param.to_string(),
    })?;
    value.parse().map_err(|_| UciError::InvalidGoValue {
        param: param.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tandem_core::{GameState, Side};

    use super::*;

    fn go(line: &str) -> GoParams {
        match parse_command(line).unwrap() {
            Command::Go(params) => params,
            other => panic!("expected Go, got {other:?}"),
        }
    }

    fn option(line: &str) -> UciOption {
        match parse_command(line).unwrap() {
            Command::SetOption(option) => option,
            other => panic!("expected SetOption, got {other:?}"),
        }
    }

    fn position(line: &str) -> Chess {
        match parse_command(line).unwrap() {
            Command::Position(pos) => pos,
            other => panic!("expected Position, got {other:?}"),
        }
    }

    #[test]
    fn parse_simple_commands() {
        assert!(matches!(parse_command("uci").unwrap(), Command::Uci));
        assert!(matches!(parse_command("isready").unwrap(), Command::IsReady));
        assert!(matches!(parse_command("ucinewgame").unwrap(), Command::UciNewGame));
        assert!(matches!(parse_command("stop").unwrap(), Command::Stop));
        assert!(matches!(parse_command("quit").unwrap(), Command::Quit));
    }

    #[test]
    fn parse_position_startpos() {
        let pos = position("position startpos");
        assert_eq!(pos.key(), starting_position().key());
    }

    #[test]
    fn parse_position_startpos_with_moves() {
        let pos = position("position startpos moves e2e4 e7e5");
        assert_eq!(pos.side_to_move(), Side::White);
        assert_ne!(pos.key(), starting_position().key());
    }

    #[test]
    fn parse_position_fen_with_moves() {
        let from_moves = position("position startpos moves e2e4");
        let from_fen = position(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1",
        );
        assert_eq!(from_moves.key(), from_fen.key());

        let pos = position(
            "position fen rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1 moves e7e5",
        );
        assert_eq!(pos.side_to_move(), Side::White);
    }

    #[test]
    fn parse_position_illegal_move() {
        let err = parse_command("position startpos moves e2e5").unwrap_err();
        assert!(matches!(err, UciError::InvalidMove { .. }));
    }

    #[test]
    fn parse_position_missing_keyword() {
        assert!(matches!(
            parse_command("position").unwrap_err(),
            UciError::MalformedPosition
        ));
        assert!(matches!(
            parse_command("position moves e2e4").unwrap_err(),
            UciError::MalformedPosition
        ));
    }

    #[test]
    fn parse_position_invalid_fen() {
        assert!(matches!(
            parse_command("position fen invalid").unwrap_err(),
            UciError::InvalidFen { .. }
        ));
        assert!(matches!(
            parse_command("position fen").unwrap_err(),
            UciError::InvalidFen { .. }
        ));
    }

    #[test]
    fn parse_go_bare_defaults() {
        assert_eq!(go("go"), GoParams::default());
    }

    #[test]
    fn parse_go_depth() {
        assert_eq!(go("go depth 5").depth, Some(5));
    }

    #[test]
    fn parse_go_iterations_and_nodes() {
        assert_eq!(go("go iterations 250").iterations, Some(250));
        assert_eq!(go("go nodes 4000").iterations, Some(4000));
    }

    #[test]
    fn parse_go_movetime_and_infinite() {
        let params = go("go movetime 1500");
        assert_eq!(params.movetime, Some(Duration::from_millis(1500)));
        assert!(!params.infinite);
        assert!(go("go infinite").infinite);
    }

    #[test]
    fn parse_go_skips_unknown_tokens() {
        let params = go("go ponder depth 3");
        assert_eq!(params.depth, Some(3));
    }

    #[test]
    fn parse_go_missing_value() {
        assert!(matches!(
            parse_command("go depth").unwrap_err(),
            UciError::MissingGoValue { .. }
        ));
    }

    #[test]
    fn parse_go_invalid_value() {
        assert!(matches!(
            parse_command("go depth abc").unwrap_err(),
            UciError::InvalidGoValue { .. }
        ));
        assert!(matches!(
            parse_command("go depth 300").unwrap_err(),
            UciError::InvalidGoValue { .. }
        ));
    }

    #[test]
    fn parse_setoption_values() {
        assert_eq!(
            option("setoption name Iterations value 5000"),
            UciOption::Iterations(5000)
        );
        assert_eq!(option("setoption name MaxDepth value 5"), UciOption::MaxDepth(5));
        assert_eq!(option("setoption name threads value 8"), UciOption::Threads(8));
        assert_eq!(
            option("setoption name Exploration value 1.4"),
            UciOption::Exploration(1.4)
        );
        assert_eq!(
            option("setoption name MinimaxProbe value false"),
            UciOption::MinimaxProbe(false)
        );
        assert_eq!(
            option("setoption name HybridSelect value true"),
            UciOption::HybridSelect(true)
        );
        assert_eq!(option("setoption name Hash value 64"), UciOption::Hash(64));
        assert_eq!(
            option("setoption name MoveTime value 2500"),
            UciOption::MoveTime(Duration::from_millis(2500))
        );
    }

    #[test]
    fn parse_setoption_rejects_bad_values() {
        for line in [
            "setoption name Threads value 0",
            "setoption name MaxDepth value 0",
            "setoption name Exploration value -1",
            "setoption name MinimaxProbe value maybe",
            "setoption name Hash value lots",
        ] {
            assert!(
                matches!(parse_command(line).unwrap_err(), UciError::InvalidOption { .. }),
                "{line} should be rejected"
            );
        }
    }

    #[test]
    fn parse_setoption_unknown_and_malformed() {
        assert!(matches!(
            parse_command("setoption name Ponder value true").unwrap_err(),
            UciError::UnknownOption { .. }
        ));
        assert!(matches!(
            parse_command("setoption Hash 16").unwrap_err(),
            UciError::MalformedOption
        ));
    }

    #[test]
    fn parse_unknown_command() {
        assert!(matches!(parse_command("foobar").unwrap(), Command::Unknown(_)));
        assert!(matches!(parse_command("").unwrap(), Command::Unknown(_)));
    }
}
