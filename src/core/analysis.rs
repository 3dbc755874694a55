use serde::{Deserialize, Serialize};
use std::fmt;

/// Engine score in centipawns (1/100 of a pawn).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Centipawns(pub i32);

impl Centipawns {
    pub fn to_pawns(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl fmt::Display for Centipawns {
    /// Pawns with two decimals, e.g. `0.35`, `-1.20`.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:.2}", self.to_pawns())
    }
}

/// Latest evaluation and principal move reported by the engine.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisSample {
    pub evaluation: Option<Centipawns>,
    pub best_move: Option<String>,
}

impl AnalysisSample {
    pub fn new(evaluation: Centipawns, best_move: &str) -> Self {
        AnalysisSample {
            evaluation: Some(evaluation),
            best_move: Some(best_move.to_string()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.evaluation.is_none() && self.best_move.is_none()
    }

    pub fn evaluation_text(&self) -> String {
        match self.evaluation {
            Some(cp) => cp.to_string(),
            None => "N/A".to_string(),
        }
    }

    pub fn best_move_text(&self) -> &str {
        self.best_move.as_deref().unwrap_or("N/A")
    }
}

/// スロットごとの最新解析値。履歴は持たない。
#[derive(Debug, Clone, Default)]
pub struct AnalysisTracker {
    latest: AnalysisSample,
}

impl AnalysisTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the sample wholesale.
    pub fn record(&mut self, evaluation: Centipawns, best_move: &str) -> &AnalysisSample {
        self.latest = AnalysisSample::new(evaluation, best_move);
        &self.latest
    }

    pub fn latest(&self) -> &AnalysisSample {
        &self.latest
    }
}
