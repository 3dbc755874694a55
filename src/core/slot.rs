use super::analysis::AnalysisSample;
use super::position::{GameOutcome, Position, Side};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable identity of one board in the grid (0-indexed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SlotId(pub usize);

impl SlotId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:02}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayMode {
    /// エンジン同士の自動対局
    Autoplay,
    /// 人間 vs エンジン
    VersusEngine,
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PlayMode::Autoplay => write!(f, "Autoplay"),
            PlayMode::VersusEngine => write!(f, "VersusEngine"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotPhase {
    Idle,
    Searching,
    Applying,
    GameOver,
    /// The engine session died; nothing more will happen on this slot.
    Stalled,
}

impl fmt::Display for SlotPhase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let label = match self {
            SlotPhase::Idle => "idle",
            SlotPhase::Searching => "thinking",
            SlotPhase::Applying => "waiting",
            SlotPhase::GameOver => "game over",
            SlotPhase::Stalled => "stalled",
        };
        write!(f, "{}", label)
    }
}

/// Read-only view of one slot, handed to the render surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub id: SlotId,
    pub fen: String,
    pub side_to_move: Side,
    pub plies: usize,
    pub last_move: Option<String>,
    pub analysis: AnalysisSample,
    pub phase: SlotPhase,
    pub outcome: Option<GameOutcome>,
}

impl SlotSnapshot {
    pub fn new(id: SlotId, position: &Position, analysis: &AnalysisSample, phase: SlotPhase) -> Self {
        SlotSnapshot {
            id,
            fen: position.fen(),
            side_to_move: position.side_to_move(),
            plies: position.plies(),
            last_move: position.last_move().map(str::to_string),
            analysis: analysis.clone(),
            phase,
            outcome: position.outcome(),
        }
    }

    /// Fresh slot at the standard starting position with no analysis.
    pub fn initial(id: SlotId) -> Self {
        Self::new(id, &Position::initial(), &AnalysisSample::default(), SlotPhase::Idle)
    }
}
