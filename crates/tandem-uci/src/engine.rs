//! Event-driven UCI engine: commands are read on one thread, and at most
//! one search runs on another.

use std::io::{self, BufRead};
use std::mem::size_of;
use std::sync::mpsc;

use tracing::{debug, info, warn};

use tandem_core::{Chess, Move, move_to_uci, starting_position};
use tandem_engine::{
    ChessEngine, DepthReport, HybridEngine, MATE_SCORE, MATE_THRESHOLD, MoveReport,
    PieceSquareEval, SearchBudget, SearchControl, SearchError, SearchSlot, TtEntry,
};

use crate::command::{Command, GoParams, UciOption, parse_command};
use crate::error::UciError;

const BYTES_PER_MB: usize = 1024 * 1024;

/// Memory budgeted per table entry, key included.
const ENTRY_BYTES: usize = size_of::<(u64, TtEntry)>();

/// Events processed by the main engine loop.
enum EngineEvent {
    UciCommand(Result<Command, UciError>),
    SearchDone,
    InputClosed,
}

/// What the search thread hands back: the engine it borrowed, and its answer.
struct Finished {
    engine: ChessEngine,
    best: Result<Move, SearchError>,
}

/// The UCI engine, holding the current position and the move selector.
///
/// The selector is moved into the search thread for the duration of a
/// search and handed back when it finishes. Option changes and table
/// clears that arrive meanwhile are applied before the next search.
pub struct UciEngine {
    position: Chess,
    engine: Option<ChessEngine>,
    slot: SearchSlot<Finished>,
    budget: SearchBudget,
    budget_changed: bool,
    pending_clear: bool,
}

impl UciEngine {
    /// Create a new engine with the starting position and default budget.
    pub fn new() -> Self {
        Self::with_budget(SearchBudget::default())
    }

    /// Create a new engine with the given budget.
    pub fn with_budget(budget: SearchBudget) -> Self {
        Self {
            position: starting_position(),
            engine: Some(HybridEngine::new(PieceSquareEval, budget.clone())),
            slot: SearchSlot::new(),
            budget,
            budget_changed: false,
            pending_clear: false,
        }
    }

    /// Run the UCI event loop, reading from stdin until `quit` or input closes.
    pub fn run(mut self) -> Result<(), UciError> {
        let (tx, rx) = mpsc::channel::<EngineEvent>();

        let stdin_tx = tx.clone();
        std::thread::spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else {
                    break;
                };
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                debug!(cmd = %trimmed, "received UCI command");
                if stdin_tx
                    .send(EngineEvent::UciCommand(parse_command(trimmed)))
                    .is_err()
                {
                    return;
                }
            }
            let _ = stdin_tx.send(EngineEvent::InputClosed);
        });

        for event in &rx {
            match event {
                EngineEvent::UciCommand(Ok(cmd)) => match cmd {
                    Command::Uci => self.handle_uci(),
                    Command::IsReady => println!("readyok"),
                    Command::UciNewGame => self.handle_ucinewgame(),
                    Command::Position(position) => self.position = position,
                    Command::Go(params) => self.handle_go(params, &tx),
                    Command::SetOption(option) => self.handle_setoption(option),
                    Command::Stop => self.slot.cancel(),
                    Command::Quit => break,
                    Command::Unknown(_) => {}
                },
                EngineEvent::UciCommand(Err(e)) => {
                    warn!(error = %e, "UCI parse error");
                }
                EngineEvent::SearchDone => self.finish_search(),
                EngineEvent::InputClosed => break,
            }
        }

        if self.slot.is_busy() {
            self.slot.cancel();
            self.finish_search();
        }
        info!("tandem shutting down");
        Ok(())
    }

    fn handle_uci(&self) {
        let defaults = SearchBudget::default();
        println!("id name tandem");
        println!("id author the tandem developers");
        println!(
            "option name Iterations type spin default {} min 0 max {}",
            defaults.iterations,
            u32::MAX
        );
        println!(
            "option name MaxDepth type spin default {} min 1 max {}",
            defaults.max_depth,
            u8::MAX
        );
        println!(
            "option name Threads type spin default {} min 1 max 256",
            defaults.workers
        );
        println!(
            "option name Exploration type string default {}",
            defaults.exploration
        );
        println!(
            "option name MinimaxProbe type check default {}",
            defaults.use_minimax_probe
        );
        println!(
            "option name HybridSelect type check default {}",
            defaults.hybrid_select
        );
        println!(
            "option name Hash type spin default {} min 1 max 65536",
            hash_mb(defaults.tt_capacity)
        );
        println!(
            "option name MoveTime type spin default {} min 0 max 3600000",
            defaults.time_ceiling.as_millis()
        );
        println!("uciok");
    }

    fn handle_ucinewgame(&mut self) {
        self.position = starting_position();
        match &self.engine {
            Some(engine) => engine.clear(),
            None => self.pending_clear = true,
        }
    }

    fn handle_setoption(&mut self, option: UciOption) {
        debug!(?option, "setoption");
        apply_option(&mut self.budget, option);
        self.budget_changed = true;
    }

    fn handle_go(&mut self, params: GoParams, tx: &mpsc::Sender<EngineEvent>) {
        if self.slot.is_busy() {
            warn!("go received while searching, stopping the running search first");
            self.slot.cancel();
            self.finish_search();
        }

        let mut engine = self.take_engine();
        let position = self.position.clone();
        let iterations = if params.infinite {
            u32::MAX
        } else {
            params.iterations.unwrap_or(self.budget.iterations)
        };
        let use_probe = self.budget.use_minimax_probe;
        let depth = params.depth;
        let movetime = params.movetime;
        let notify_tx = tx.clone();

        let started = self.slot.start(
            move |control: &SearchControl| {
                let control = match movetime {
                    Some(limit) => control.clone().with_deadline(limit),
                    None => control.clone(),
                };
                let best = match depth {
                    Some(depth) => engine
                        .search_best_move_iddfs_with(&position, depth, &control, print_depth)
                        .map(|result| result.best_move),
                    None => engine
                        .select_move_with(&position, iterations, use_probe, &control)
                        .map(|report| {
                            print_report(&report);
                            report.best_move
                        }),
                };
                Finished { engine, best }
            },
            move || {
                let _ = notify_tx.send(EngineEvent::SearchDone);
            },
        );
        if let Err(e) = started {
            warn!(error = %e, "search not started");
        }
    }

    /// The idle engine with pending option changes applied.
    fn take_engine(&mut self) -> ChessEngine {
        let mut engine = self
            .engine
            .take()
            .unwrap_or_else(|| HybridEngine::new(PieceSquareEval, self.budget.clone()));
        if self.budget_changed {
            engine.set_budget(self.budget.clone());
            self.budget_changed = false;
        }
        if self.pending_clear {
            engine.clear();
            self.pending_clear = false;
        }
        engine
    }

    /// Collect the finished search, restore the engine and print `bestmove`.
    fn finish_search(&mut self) {
        let Some(outcome) = self.slot.finish() else {
            return;
        };
        let best = match outcome {
            Ok(Finished { engine, best }) => {
                self.engine = Some(engine);
                best
            }
            Err(e) => {
                warn!(error = %e, "search thread failed");
                Err(e)
            }
        };
        println!("{}", bestmove_line(&best));
    }
}

impl Default for UciEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Fold a `setoption` into the budget.
fn apply_option(budget: &mut SearchBudget, option: UciOption) {
    match option {
        UciOption::Iterations(n) => budget.iterations = n,
        UciOption::MaxDepth(depth) => budget.max_depth = depth,
        UciOption::Threads(threads) => budget.workers = threads.max(1),
        UciOption::Exploration(c) => budget.exploration = c,
        UciOption::MinimaxProbe(on) => budget.use_minimax_probe = on,
        UciOption::HybridSelect(on) => budget.hybrid_select = on,
        UciOption::Hash(mb) => budget.tt_capacity = tt_capacity(mb),
        UciOption::MoveTime(ceiling) => budget.time_ceiling = ceiling,
    }
}

/// Table capacity in entries for a size in megabytes.
fn tt_capacity(mb: usize) -> usize {
    (mb.saturating_mul(BYTES_PER_MB) / ENTRY_BYTES).max(1)
}

fn hash_mb(capacity: usize) -> usize {
    (capacity.saturating_mul(ENTRY_BYTES) / BYTES_PER_MB).max(1)
}

/// UCI score text: `cp N`, or `mate N` (negative when being mated).
fn format_score(score: i32) -> String {
    if score.abs() >= MATE_THRESHOLD {
        let moves = (MATE_SCORE - score.abs() + 1) / 2;
        if score > 0 {
            format!("mate {moves}")
        } else {
            format!("mate -{moves}")
        }
    } else {
        format!("cp {score}")
    }
}

fn bestmove_line(best: &Result<Move, SearchError>) -> String {
    match best {
        Ok(mv) => format!("bestmove {}", move_to_uci(mv)),
        Err(e) => {
            debug!(error = %e, "no move to report");
            "bestmove 0000".to_string()
        }
    }
}

fn print_depth(report: &DepthReport<Move>) {
    let elapsed_ms = report.elapsed.as_millis().max(1);
    let nps = u128::from(report.nodes) * 1000 / elapsed_ms;
    println!(
        "info depth {} score {} nodes {} nps {} time {} pv {}",
        report.depth,
        format_score(report.score),
        report.nodes,
        nps,
        elapsed_ms,
        move_to_uci(&report.best_move)
    );
}

fn print_report(report: &MoveReport<Move>) {
    let elapsed_ms = report.elapsed.as_millis();
    let depth = report
        .minimax_depth
        .map(|d| format!("depth {d} "))
        .unwrap_or_default();
    let score = report
        .minimax_score
        .map(|s| format!(" score {}", format_score(s)))
        .unwrap_or_default();
    println!(
        "info {}nodes {} time {}{} pv {}",
        depth,
        report.iterations,
        elapsed_ms,
        score,
        move_to_uci(&report.best_move)
    );
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tandem_core::parse_uci_move;

    use super::*;

    #[test]
    fn options_update_the_budget() {
        let mut budget = SearchBudget::default();
        apply_option(&mut budget, UciOption::Iterations(42));
        apply_option(&mut budget, UciOption::MaxDepth(5));
        apply_option(&mut budget, UciOption::Threads(2));
        apply_option(&mut budget, UciOption::Exploration(1.0));
        apply_option(&mut budget, UciOption::MinimaxProbe(false));
        apply_option(&mut budget, UciOption::HybridSelect(false));
        apply_option(&mut budget, UciOption::MoveTime(Duration::from_millis(750)));
        assert_eq!(budget.iterations, 42);
        assert_eq!(budget.max_depth, 5);
        assert_eq!(budget.workers, 2);
        assert_eq!(budget.exploration, 1.0);
        assert!(!budget.use_minimax_probe);
        assert!(!budget.hybrid_select);
        assert_eq!(budget.time_ceiling, Duration::from_millis(750));
    }

    #[test]
    fn hash_megabytes_scale_capacity() {
        let small = tt_capacity(1);
        let large = tt_capacity(16);
        assert!(small > 0);
        assert!(large >= small * 16 && large < (small + 1) * 16);
        assert!((63..=64).contains(&hash_mb(tt_capacity(64))));
    }

    #[test]
    fn scores_format_as_centipawns_or_mate() {
        assert_eq!(format_score(35), "cp 35");
        assert_eq!(format_score(-120), "cp -120");
        assert_eq!(format_score(MATE_SCORE - 1), "mate 1");
        assert_eq!(format_score(MATE_SCORE - 3), "mate 2");
        assert_eq!(format_score(-(MATE_SCORE - 2)), "mate -1");
    }

    #[test]
    fn bestmove_line_for_move_and_no_move() {
        let pos = starting_position();
        let mv = parse_uci_move(&pos, "e2e4").unwrap();
        assert_eq!(bestmove_line(&Ok(mv)), "bestmove e2e4");
        assert_eq!(bestmove_line(&Err(SearchError::NoLegalMoves)), "bestmove 0000");
    }

    #[test]
    fn search_hands_the_engine_back() {
        let budget = SearchBudget {
            iterations: 20,
            time_ceiling: Duration::from_secs(600),
            ..SearchBudget::default()
        }
        .with_seed(3)
        .with_workers(2);
        let mut uci = UciEngine::with_budget(budget);
        let (tx, rx) = mpsc::channel();

        uci.handle_go(GoParams::default(), &tx);
        assert!(uci.engine.is_none(), "engine is lent to the search");
        assert!(matches!(rx.recv().unwrap(), EngineEvent::SearchDone));

        uci.finish_search();
        assert!(uci.engine.is_some());
        assert!(!uci.slot.is_busy());
    }

    #[test]
    fn options_set_during_search_apply_to_the_next_one() {
        let budget = SearchBudget {
            time_ceiling: Duration::from_secs(600),
            ..SearchBudget::default()
        }
        .with_seed(3)
        .with_workers(2);
        let mut uci = UciEngine::with_budget(budget);
        let (tx, rx) = mpsc::channel();

        uci.handle_go(
            GoParams {
                infinite: true,
                ..GoParams::default()
            },
            &tx,
        );
        uci.handle_setoption(UciOption::Iterations(7));
        uci.handle_ucinewgame();
        assert!(uci.pending_clear);

        uci.slot.cancel();
        assert!(matches!(rx.recv().unwrap(), EngineEvent::SearchDone));
        uci.finish_search();

        let engine = uci.take_engine();
        assert_eq!(engine.budget().iterations, 7);
        assert!(engine.table().is_empty());
        assert!(!uci.pending_clear);
        assert!(!uci.budget_changed);
    }

    #[test]
    fn max_depth_option_reaches_the_engine() {
        let mut uci = UciEngine::with_budget(SearchBudget::default().with_workers(1));
        uci.handle_setoption(UciOption::MaxDepth(1));
        let engine = uci.take_engine();
        assert_eq!(engine.budget().max_depth, 1);
        let result = engine
            .best_move_iddfs(&starting_position(), &SearchControl::default())
            .unwrap();
        assert_eq!(result.depth, 1);
    }

    #[test]
    fn go_depth_runs_iterative_deepening() {
        let budget = SearchBudget {
            time_ceiling: Duration::from_secs(600),
            ..SearchBudget::default()
        }
        .with_workers(2);
        let mut uci = UciEngine::with_budget(budget);
        let (tx, rx) = mpsc::channel();

        uci.handle_go(
            GoParams {
                depth: Some(1),
                ..GoParams::default()
            },
            &tx,
        );
        assert!(matches!(rx.recv().unwrap(), EngineEvent::SearchDone));
        uci.finish_search();
        let engine = uci.engine.as_ref().unwrap();
        assert_eq!(engine.table().generation(), 1);
    }
}
