use crate::core::{GameOutcome, PlayMode, Position, SlotId};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Finished game, saved as JSON when `save_games` is on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub slot: SlotId,
    pub mode: PlayMode,
    pub start_fen: String,
    pub moves: Vec<String>,
    pub outcome: GameOutcome,
    pub result: String,
    pub final_fen: String,
    pub finished_at: String,
}

impl GameRecord {
    pub fn new(slot: SlotId, mode: PlayMode, position: &Position, outcome: GameOutcome) -> Self {
        GameRecord {
            slot,
            mode,
            start_fen: position.start_fen().to_string(),
            moves: position.moves().to_vec(),
            outcome,
            result: outcome.result().to_string(),
            final_fen: position.fen(),
            finished_at: chrono::Local::now().to_rfc3339(),
        }
    }
}

pub fn save_game<P: AsRef<Path>>(dir: P, record: &GameRecord) -> anyhow::Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let filename = dir.join(format!(
        "slot_{}_{}.json",
        record.slot,
        chrono::Local::now().format("%Y%m%d_%H%M%S%3f")
    ));

    let file = std::fs::File::create(&filename)?;
    serde_json::to_writer_pretty(file, record)?;
    Ok(filename)
}
