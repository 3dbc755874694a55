use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const CONFIG_PATH: &str = "grid_config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub board_count: usize,
    /// 1行に並べる盤の数
    pub columns: usize,
    pub engine: EngineConfig,
    pub search: SearchConfig,
    pub save_games: bool,
    pub record_dir: String,
    pub log_file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub path: String,
    pub args: Vec<String>,
    /// Send `uci` / `setoption` / `isready` / `ucinewgame` right after spawning.
    pub handshake: bool,
    pub threads: Option<u32>,
    pub hash_mb: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// `go depth` for engine vs engine games
    pub autoplay_depth: u32,
    /// `go depth` when replying to a human move
    pub reply_depth: u32,
    pub move_delay_ms: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        GridConfig {
            board_count: 25,
            columns: 5,
            engine: EngineConfig::default(),
            search: SearchConfig::default(),
            save_games: false,
            record_dir: "grid_games".to_string(),
            log_file: "uci-grid.log".to_string(),
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            path: "stockfish".to_string(),
            args: Vec::new(),
            handshake: true,
            // 25プロセス同時に走るので1スレッド・小さめのハッシュ
            threads: Some(1),
            hash_mb: Some(16),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        SearchConfig {
            autoplay_depth: 15,
            reply_depth: 10,
            move_delay_ms: 250,
        }
    }
}

impl SearchConfig {
    pub fn move_delay(&self) -> Duration {
        Duration::from_millis(self.move_delay_ms)
    }
}

impl GridConfig {
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(CONFIG_PATH)
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let config_str = std::fs::read_to_string(path)?;
        let config: GridConfig = serde_json::from_str(&config_str)?;
        Ok(config.normalized())
    }

    pub fn load_or_default() -> Self {
        Self::load().unwrap_or_else(|_| Self::default())
    }

    /// Clamps values that would make the grid unusable.
    pub fn normalized(mut self) -> Self {
        self.board_count = self.board_count.max(1);
        self.columns = self.columns.clamp(1, self.board_count);
        self.search.autoplay_depth = self.search.autoplay_depth.max(1);
        self.search.reply_depth = self.search.reply_depth.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GridConfig::default();
        assert_eq!(config.board_count, 25);
        assert_eq!(config.search.autoplay_depth, 15);
        assert_eq!(config.search.reply_depth, 10);
        assert_eq!(config.search.move_delay(), Duration::from_millis(250));
        assert_eq!(config.engine.path, "stockfish");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "board_count": 4, "engine": { "path": "/usr/games/stockfish" } }"#;
        let config: GridConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.board_count, 4);
        assert_eq!(config.columns, 5);
        assert_eq!(config.engine.path, "/usr/games/stockfish");
        assert!(config.engine.handshake);
        assert_eq!(config.search, SearchConfig::default());

        let config = config.normalized();
        assert_eq!(config.columns, 4);
    }

    #[test]
    fn test_normalized_clamps_zero() {
        let config = GridConfig {
            board_count: 0,
            columns: 0,
            ..GridConfig::default()
        }
        .normalized();
        assert_eq!(config.board_count, 1);
        assert_eq!(config.columns, 1);
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("uci-grid-config-{}.json", std::process::id()));
        std::fs::write(&path, r#"{ "save_games": true, "search": { "move_delay_ms": 10 } }"#).unwrap();

        let config = GridConfig::load_from(&path).unwrap();
        assert!(config.save_games);
        assert_eq!(config.search.move_delay(), Duration::from_millis(10));
        assert_eq!(config.search.autoplay_depth, 15);

        std::fs::remove_file(&path).unwrap();
        assert!(GridConfig::load_from(&path).is_err());
    }
}
