use crate::error::PositionError;
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Position as _};
use std::collections::HashMap;
use std::fmt;

/// Standard starting position.
pub const START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// 50手ルール (半手数)
const FIFTY_MOVE_HALFMOVES: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Side::White => write!(f, "White"),
            Side::Black => write!(f, "Black"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    ThreefoldRepetition,
}

impl GameOutcome {
    /// PGN style result tag.
    pub fn result(&self) -> &'static str {
        match self {
            GameOutcome::Checkmate {
                winner: Side::White,
            } => "1-0",
            GameOutcome::Checkmate {
                winner: Side::Black,
            } => "0-1",
            _ => "1/2-1/2",
        }
    }
}

impl fmt::Display for GameOutcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GameOutcome::Checkmate { winner } => write!(f, "Checkmate, {} wins", winner),
            GameOutcome::Stalemate => write!(f, "Stalemate"),
            GameOutcome::InsufficientMaterial => write!(f, "Insufficient material"),
            GameOutcome::FiftyMoveRule => write!(f, "Fifty-move rule"),
            GameOutcome::ThreefoldRepetition => write!(f, "Threefold repetition"),
        }
    }
}

/// Immutable board snapshot. Every accepted move yields a new `Position`.
///
/// Legality is owned by `shakmaty`; this type only adds the move history and a
/// repetition table so the game-over predicate covers the draw rules too.
#[derive(Debug, Clone)]
pub struct Position {
    chess: Chess,
    start_fen: String,
    moves: Vec<String>,
    /// 局面履歴 (FEN の先頭4フィールド -> 出現回数)
    seen: HashMap<String, u8>,
}

impl Default for Position {
    fn default() -> Self {
        Self::from_chess(Chess::default())
    }
}

impl Position {
    pub fn initial() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        let parsed: Fen = fen.parse().map_err(|e| PositionError::InvalidFen {
            fen: fen.to_string(),
            reason: format!("{}", e),
        })?;
        let chess: Chess =
            parsed
                .into_position(CastlingMode::Standard)
                .map_err(|e| PositionError::InvalidFen {
                    fen: fen.to_string(),
                    reason: format!("{}", e),
                })?;
        Ok(Self::from_chess(chess))
    }

    fn from_chess(chess: Chess) -> Self {
        let start_fen = fen_of(&chess);
        let mut seen = HashMap::new();
        seen.insert(repetition_key(&start_fen), 1);
        Position {
            chess,
            start_fen,
            moves: Vec::new(),
            seen,
        }
    }

    pub fn fen(&self) -> String {
        fen_of(&self.chess)
    }

    pub fn start_fen(&self) -> &str {
        &self.start_fen
    }

    pub fn moves(&self) -> &[String] {
        &self.moves
    }

    pub fn last_move(&self) -> Option<&str> {
        self.moves.last().map(String::as_str)
    }

    pub fn plies(&self) -> usize {
        self.moves.len()
    }

    pub fn side_to_move(&self) -> Side {
        self.chess.turn().into()
    }

    /// Applies a move in UCI coordinate notation (`e2e4`, `e7e8q`).
    /// Returns `None` if the token does not parse or is not legal here.
    pub fn play_uci(&self, token: &str) -> Option<Position> {
        let uci: UciMove = token.parse().ok()?;
        let mv = uci.to_move(&self.chess).ok()?;
        let chess = self.chess.clone().play(&mv).ok()?;
        Some(self.advance(chess, token))
    }

    /// Like [`Position::play_uci`], but a pawn reaching the last rank without a
    /// promotion suffix is promoted to a queen.
    pub fn play_human(&self, token: &str) -> Option<Position> {
        let token = token.trim().to_ascii_lowercase();
        self.play_uci(&token).or_else(|| {
            if token.len() == 4 {
                self.play_uci(&format!("{}q", token))
            } else {
                None
            }
        })
    }

    fn advance(&self, chess: Chess, token: &str) -> Position {
        let fen = fen_of(&chess);
        let mut seen = self.seen.clone();
        *seen.entry(repetition_key(&fen)).or_insert(0) += 1;
        let mut moves = self.moves.clone();
        moves.push(token.to_string());
        Position {
            chess,
            start_fen: self.start_fen.clone(),
            moves,
            seen,
        }
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        if self.chess.is_checkmate() {
            return Some(GameOutcome::Checkmate {
                winner: self.chess.turn().other().into(),
            });
        }
        if self.chess.is_stalemate() {
            return Some(GameOutcome::Stalemate);
        }
        if self.chess.is_insufficient_material() {
            return Some(GameOutcome::InsufficientMaterial);
        }
        if self.chess.halfmoves() >= FIFTY_MOVE_HALFMOVES {
            return Some(GameOutcome::FiftyMoveRule);
        }
        let current = repetition_key(&self.fen());
        if self.seen.get(&current).copied().unwrap_or(0) >= 3 {
            return Some(GameOutcome::ThreefoldRepetition);
        }
        None
    }

    pub fn is_game_over(&self) -> bool {
        self.outcome().is_some()
    }
}

fn fen_of(chess: &Chess) -> String {
    Fen(chess.clone().into_setup(EnPassantMode::Legal)).to_string()
}

/// Placement, side to move, castling rights and en passant square.
fn repetition_key(fen: &str) -> String {
    fen.split_whitespace().take(4).collect::<Vec<_>>().join(" ")
}
