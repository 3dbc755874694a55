//! UCI text protocol: the commands we send and a parser for what comes back.
//!
//! Only the subset the grid needs is modelled. Everything else the engine
//! prints (`uciok`, `readyok`, `info string ...`, option listings) parses as
//! [`EngineOutput::Other`] and is ignored by the orchestrator.

use crate::core::Centipawns;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    SetOption { name: String, value: String },
    IsReady,
    NewGame,
    Position { fen: String },
    Go { depth: u32 },
    Stop,
    Quit,
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EngineCommand::Uci => write!(f, "uci"),
            EngineCommand::SetOption { name, value } => {
                write!(f, "setoption name {} value {}", name, value)
            }
            EngineCommand::IsReady => write!(f, "isready"),
            EngineCommand::NewGame => write!(f, "ucinewgame"),
            EngineCommand::Position { fen } => write!(f, "position fen {}", fen),
            EngineCommand::Go { depth } => write!(f, "go depth {}", depth),
            EngineCommand::Stop => write!(f, "stop"),
            EngineCommand::Quit => write!(f, "quit"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineOutput {
    /// `info ... score cp <int> ... pv <move> ...`. `bestmove` is set when the
    /// same line also carries `bestmove <move>`.
    Info {
        score: Centipawns,
        pv: String,
        bestmove: Option<String>,
    },
    /// A line with `bestmove <move>` and no usable info part.
    BestMove { mv: String },
    Other,
}

/// Parses one line of engine output.
///
/// The info pattern and `bestmove <move>` are matched independently, so a
/// line carrying both yields an [`EngineOutput::Info`] with its `bestmove`
/// filled in.
pub fn parse_line(line: &str) -> EngineOutput {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let bestmove = find_value(&tokens, "bestmove");

    match (parse_info(&tokens), bestmove) {
        (Some((score, pv)), bestmove) => EngineOutput::Info {
            score,
            pv,
            bestmove,
        },
        (None, Some(mv)) => EngineOutput::BestMove { mv },
        (None, None) => EngineOutput::Other,
    }
}

fn parse_info(tokens: &[&str]) -> Option<(Centipawns, String)> {
    let rest = match tokens.split_first() {
        Some((&"info", rest)) => rest,
        _ => return None,
    };
    // info string は自由文なので無視
    if rest.first() == Some(&"string") {
        return None;
    }

    let score = rest
        .windows(3)
        .find(|w| w[0] == "score" && w[1] == "cp")
        .and_then(|w| w[2].parse::<i32>().ok())?;
    let pv = find_value(rest, "pv")?;
    Some((Centipawns(score), pv))
}

/// The token right after the first `key`.
fn find_value(tokens: &[&str], key: &str) -> Option<String> {
    tokens
        .windows(2)
        .find(|w| w[0] == key)
        .map(|w| w[1].to_string())
}
