use crate::core::{
    AnalysisSample, AnalysisTracker, GameOutcome, PlayMode, Position, SlotId, SlotPhase,
    SlotSnapshot,
};
use crate::engine::{parse_line, EngineCommand, EngineOutput};
use tracing::{debug, warn};

/// Result of feeding one input into a [`SlotMachine`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Ignored,
    AnalysisUpdated(AnalysisSample),
    /// A move was applied. `reschedule` means an engine search should follow
    /// after the move delay.
    Moved {
        uci: String,
        outcome: Option<GameOutcome>,
        reschedule: bool,
    },
    /// The rules library refused the move. State is unchanged.
    Rejected { uci: String },
}

/// Per-slot move orchestration, without any I/O.
///
/// ```text
/// Idle -> Searching -> Applying -> Searching ...
///                           \-> GameOver
/// ```
///
/// In [`PlayMode::VersusEngine`] the engine's move lands back in `Idle`, and a
/// human move moves `Idle -> Applying`.
pub struct SlotMachine {
    id: SlotId,
    mode: PlayMode,
    depth: u32,
    position: Position,
    analysis: AnalysisTracker,
    phase: SlotPhase,
}

impl SlotMachine {
    pub fn new(id: SlotId, mode: PlayMode, depth: u32, position: Position) -> Self {
        let phase = if position.is_game_over() {
            SlotPhase::GameOver
        } else {
            SlotPhase::Idle
        };
        SlotMachine {
            id,
            mode,
            depth,
            position,
            analysis: AnalysisTracker::new(),
            phase,
        }
    }

    pub fn id(&self) -> SlotId {
        self.id
    }

    pub fn mode(&self) -> PlayMode {
        self.mode
    }

    pub fn phase(&self) -> SlotPhase {
        self.phase
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn analysis(&self) -> &AnalysisSample {
        self.analysis.latest()
    }

    pub fn snapshot(&self) -> SlotSnapshot {
        SlotSnapshot::new(self.id, &self.position, self.analysis.latest(), self.phase)
    }

    /// `Idle | Applying -> Searching`. Returns the two commands to send, or
    /// `None` when the slot must stay quiet (already searching, game over,
    /// stalled).
    pub fn begin_search(&mut self) -> Option<[EngineCommand; 2]> {
        match self.phase {
            SlotPhase::Idle | SlotPhase::Applying => {}
            _ => return None,
        }
        self.phase = SlotPhase::Searching;
        Some([
            EngineCommand::Position {
                fen: self.position.fen(),
            },
            EngineCommand::Go { depth: self.depth },
        ])
    }

    pub fn on_engine_line(&mut self, line: &str) -> Transition {
        match parse_line(line) {
            EngineOutput::Info {
                score,
                pv,
                bestmove,
            } => {
                if matches!(self.phase, SlotPhase::GameOver | SlotPhase::Stalled) {
                    return Transition::Ignored;
                }
                let sample = self.analysis.record(score, &pv).clone();
                // 同じ行に bestmove もあれば両方反映する
                match bestmove.map(|mv| self.on_best_move(mv)) {
                    None | Some(Transition::Ignored) => Transition::AnalysisUpdated(sample),
                    Some(moved) => moved,
                }
            }
            EngineOutput::BestMove { mv } => self.on_best_move(mv),
            EngineOutput::Other => Transition::Ignored,
        }
    }

    fn on_best_move(&mut self, uci: String) -> Transition {
        if self.phase != SlotPhase::Searching {
            debug!("[SLOT {}] stray bestmove {} in {:?}", self.id, uci, self.phase);
            return Transition::Ignored;
        }
        let Some(next) = self.position.play_uci(&uci) else {
            warn!("[SLOT {}] engine move {} rejected", self.id, uci);
            return Transition::Rejected { uci };
        };
        self.position = next;

        let outcome = self.position.outcome();
        let reschedule = match (outcome, self.mode) {
            (Some(_), _) => {
                self.phase = SlotPhase::GameOver;
                false
            }
            (None, PlayMode::Autoplay) => {
                self.phase = SlotPhase::Applying;
                true
            }
            (None, PlayMode::VersusEngine) => {
                self.phase = SlotPhase::Idle;
                false
            }
        };
        Transition::Moved {
            uci,
            outcome,
            reschedule,
        }
    }

    /// Human move from the interactive mode. Only accepted while the slot is
    /// waiting for the human.
    pub fn on_human_move(&mut self, uci: &str) -> Transition {
        if self.mode != PlayMode::VersusEngine || self.phase != SlotPhase::Idle {
            return Transition::Rejected {
                uci: uci.to_string(),
            };
        }
        let Some(next) = self.position.play_human(uci) else {
            return Transition::Rejected {
                uci: uci.to_string(),
            };
        };
        self.position = next;

        let outcome = self.position.outcome();
        let reschedule = if outcome.is_some() {
            self.phase = SlotPhase::GameOver;
            false
        } else {
            self.phase = SlotPhase::Applying;
            true
        };
        Transition::Moved {
            uci: self.position.last_move().unwrap_or(uci).to_string(),
            outcome,
            reschedule,
        }
    }

    pub fn mark_stalled(&mut self) {
        if self.phase != SlotPhase::GameOver {
            self.phase = SlotPhase::Stalled;
        }
    }
}
