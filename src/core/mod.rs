pub mod analysis;
pub mod position;
pub mod slot;

pub use analysis::{AnalysisSample, AnalysisTracker, Centipawns};
pub use position::{GameOutcome, Position, Side, START_FEN};
pub use slot::{PlayMode, SlotId, SlotPhase, SlotSnapshot};
