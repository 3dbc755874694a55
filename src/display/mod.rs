pub mod theme;

use crate::core::{PlayMode, SlotId, SlotPhase, SlotSnapshot};
use crossterm::style::{
    Attribute, Color, Print, ResetColor, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::{cursor, queue, terminal};
use shakmaty::fen::Fen;
use shakmaty::Square;
use std::io::Write;
pub use theme::{board_theme, BoardTheme, Rgb};

/// 1盤あたりの表示幅 (ランク表示 2 + 8マス x 2)
pub const PANEL_WIDTH: usize = 18;
const PANEL_GAP: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Span {
    pub text: String,
    pub fg: Option<Rgb>,
    pub bg: Option<Rgb>,
    pub bold: bool,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Span {
            text: text.into(),
            ..Span::default()
        }
    }

    fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    fn fg(mut self, color: Rgb) -> Self {
        self.fg = Some(color);
        self
    }

    fn width(&self) -> usize {
        self.text.chars().count()
    }
}

pub type Line = Vec<Span>;

/// A fully laid out screen. Building one has no side effects; [`draw`] puts
/// it on the terminal.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame {
    pub lines: Vec<Line>,
}

impl Frame {
    /// Text without colours, one `\n` per line.
    pub fn plain_text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|s| s.text.as_str()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

pub struct DisplayState {
    pub mode: PlayMode,
    pub columns: usize,
    pub selected: Option<SlotId>,
    pub input: String,
    pub status_msg: Option<String>,
}

impl DisplayState {
    pub fn new(mode: PlayMode, columns: usize) -> Self {
        DisplayState {
            mode,
            columns: columns.max(1),
            selected: match mode {
                PlayMode::Autoplay => None,
                PlayMode::VersusEngine => Some(SlotId(0)),
            },
            input: String::new(),
            status_msg: None,
        }
    }
}

const HIGHLIGHT: Rgb = Rgb::new(255, 215, 0);
const MUTED: Rgb = Rgb::new(150, 150, 150);
const ALERT: Rgb = Rgb::new(255, 90, 90);

pub fn render_grid(slots: &[SlotSnapshot], state: &DisplayState) -> Frame {
    let mut lines: Vec<Line> = Vec::new();

    let title = match state.mode {
        PlayMode::Autoplay => format!("=== {} Chess Games: Engine vs Engine ===", slots.len()),
        PlayMode::VersusEngine => format!("=== {} Chess Games vs Engine ===", slots.len()),
    };
    lines.push(vec![Span::plain(title).bold()]);
    match &state.status_msg {
        Some(msg) => lines.push(vec![Span::plain(msg.clone()).bold().fg(HIGHLIGHT)]),
        None => lines.push(Vec::new()),
    }
    lines.push(Vec::new());

    for row in slots.chunks(state.columns) {
        let panels: Vec<Vec<Line>> = row
            .iter()
            .map(|slot| render_panel(slot, state.selected == Some(slot.id)))
            .collect();
        let height = panels.iter().map(Vec::len).max().unwrap_or(0);
        for i in 0..height {
            let mut line = Line::new();
            for (n, panel) in panels.iter().enumerate() {
                if n > 0 {
                    line.push(Span::plain(PANEL_GAP));
                }
                let mut used = 0;
                if let Some(panel_line) = panel.get(i) {
                    for span in panel_line {
                        used += span.width();
                        line.push(span.clone());
                    }
                }
                if used < PANEL_WIDTH {
                    line.push(Span::plain(" ".repeat(PANEL_WIDTH - used)));
                }
            }
            lines.push(line);
        }
        lines.push(Vec::new());
    }

    lines.push(footer(state));
    Frame { lines }
}

fn footer(state: &DisplayState) -> Line {
    match state.mode {
        PlayMode::Autoplay => vec![Span::plain("[q]: Quit").fg(MUTED)],
        PlayMode::VersusEngine => vec![
            Span::plain("[Arrows]: Select board | type a move (e2e4) | [Enter]: Play | [Esc]: Clear | [q]: Quit   ")
                .fg(MUTED),
            Span::plain(format!("> {}", state.input)).bold(),
        ],
    }
}

fn render_panel(slot: &SlotSnapshot, selected: bool) -> Vec<Line> {
    let theme = board_theme(slot.id.index());
    let mut lines = Vec::with_capacity(13);

    let marker = if selected { ">" } else { " " };
    let side = match slot.side_to_move {
        crate::core::Side::White => "W",
        crate::core::Side::Black => "B",
    };
    let header = Span::plain(fit(&format!(
        "{}#{} {} ply {}",
        marker, slot.id, side, slot.plies
    )))
    .bold();
    lines.push(vec![if selected { header.fg(HIGHLIGHT) } else { header }]);

    let squares = board_squares(&slot.fen);
    for (row, pieces) in squares.unwrap_or_default().iter().enumerate() {
        let rank = 8 - row;
        let mut line = vec![Span::plain(format!("{} ", rank))];
        for (file, piece) in pieces.iter().enumerate() {
            // a1 は暗いマス
            let dark = (file + rank) % 2 == 1;
            let bg = if dark { theme.dark } else { theme.light };
            let (text, fg) = match piece {
                Some(c) if c.is_ascii_uppercase() => (format!(" {}", c), Some(Rgb::WHITE)),
                Some(c) => (format!(" {}", c), Some(Rgb::BLACK)),
                None => ("  ".to_string(), None),
            };
            line.push(Span {
                text,
                fg,
                bg: Some(bg),
                bold: piece.is_some(),
            });
        }
        lines.push(line);
    }
    lines.push(vec![Span::plain("   a b c d e f g h").fg(MUTED)]);

    lines.push(vec![Span::plain(fit(&format!(
        "Eval: {}",
        slot.analysis.evaluation_text()
    )))]);
    lines.push(vec![Span::plain(fit(&format!(
        "Best: {}",
        slot.analysis.best_move_text()
    )))]);
    lines.push(vec![match squares {
        Some(_) => status_span(slot),
        None => Span::plain("invalid FEN").fg(ALERT),
    }]);
    lines
}

fn status_span(slot: &SlotSnapshot) -> Span {
    if let Some(outcome) = slot.outcome {
        return Span::plain(fit(&format!("{} {}", outcome.result(), outcome)))
            .bold()
            .fg(HIGHLIGHT);
    }
    let last = slot.last_move.as_deref().unwrap_or("-");
    let text = fit(&format!("{} | {}", last, slot.phase));
    match slot.phase {
        SlotPhase::Stalled => Span::plain(text).fg(ALERT),
        _ => Span::plain(text).fg(MUTED),
    }
}

/// パネル幅に切り詰める
fn fit(text: &str) -> String {
    text.chars().take(PANEL_WIDTH).collect()
}

/// Piece letters (`K`..`p`, white upper case) by rank (8 first) and file
/// (a first). `None` if `fen` does not parse.
pub fn board_squares(fen: &str) -> Option<[[Option<char>; 8]; 8]> {
    let setup = fen.parse::<Fen>().ok()?.into_setup();
    let mut squares = [[None; 8]; 8];
    for square in Square::ALL {
        if let Some(piece) = setup.board.piece_at(square) {
            let row = 7 - usize::from(square.rank());
            squares[row][usize::from(square.file())] = Some(piece.char());
        }
    }
    Some(squares)
}

/// Writes a frame to the terminal (raw mode, so lines end in `\r\n`).
pub fn draw<W: Write>(out: &mut W, frame: &Frame) -> std::io::Result<()> {
    queue!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;
    for line in &frame.lines {
        for span in line {
            if let Some(bg) = span.bg {
                queue!(out, SetBackgroundColor(to_color(bg)))?;
            }
            if let Some(fg) = span.fg {
                queue!(out, SetForegroundColor(to_color(fg)))?;
            }
            if span.bold {
                queue!(out, SetAttribute(Attribute::Bold))?;
            }
            queue!(out, Print(&span.text), SetAttribute(Attribute::Reset), ResetColor)?;
        }
        queue!(out, Print("\r\n"))?;
    }
    out.flush()
}

fn to_color(rgb: Rgb) -> Color {
    Color::Rgb {
        r: rgb.r,
        g: rgb.g,
        b: rgb.b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnalysisSample, Centipawns, Position, START_FEN};

    fn grid(count: usize) -> Vec<SlotSnapshot> {
        (0..count).map(|i| SlotSnapshot::initial(SlotId(i))).collect()
    }

    #[test]
    fn test_board_squares_initial() {
        let squares = board_squares(START_FEN).unwrap();
        assert_eq!(squares[0][0], Some('r'));
        assert_eq!(squares[0][4], Some('k'));
        assert_eq!(squares[1][7], Some('p'));
        assert_eq!(squares[7][3], Some('Q'));
        assert_eq!(squares[6][0], Some('P'));
        assert_eq!(squares[4][4], None);

        let after_e4 = Position::initial().play_uci("e2e4").unwrap();
        let squares = board_squares(&after_e4.fen()).unwrap();
        assert_eq!(squares[4][4], Some('P'));
        assert_eq!(squares[6][4], None);
    }

    #[test]
    fn test_malformed_fen_is_flagged() {
        assert_eq!(board_squares("garbage"), None);
        assert_eq!(board_squares("rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP w KQkq - 0 1"), None);

        let mut slot = SlotSnapshot::initial(SlotId(0));
        slot.fen = "garbage".to_string();
        let state = DisplayState::new(PlayMode::Autoplay, 1);
        let text = render_grid(&[slot], &state).plain_text();
        assert!(text.contains("invalid FEN"));
    }

    #[test]
    fn test_initial_grid_shows_na() {
        let state = DisplayState::new(PlayMode::Autoplay, 5);
        let text = render_grid(&grid(25), &state).plain_text();
        assert!(text.contains("25 Chess Games: Engine vs Engine"));
        assert_eq!(text.matches("Eval: N/A").count(), 25);
        assert_eq!(text.matches("Best: N/A").count(), 25);
        assert!(text.contains("8  r n b q k b n r"));
        assert!(text.contains("#24"));
    }

    #[test]
    fn test_analysis_is_shown() {
        let mut slots = grid(2);
        slots[1].analysis = AnalysisSample::new(Centipawns(35), "e2e4");
        let state = DisplayState::new(PlayMode::Autoplay, 2);
        let text = render_grid(&slots, &state).plain_text();
        assert!(text.contains("Eval: 0.35"));
        assert!(text.contains("Best: e2e4"));
        assert_eq!(text.matches("Eval: N/A").count(), 1);
    }

    #[test]
    fn test_render_is_pure() {
        let mut slots = grid(4);
        let pos = Position::initial().play_uci("e2e4").unwrap();
        slots[2] = SlotSnapshot::new(
            SlotId(2),
            &pos,
            &AnalysisSample::new(Centipawns(-12), "e7e5"),
            SlotPhase::Searching,
        );
        let state = DisplayState::new(PlayMode::Autoplay, 2);
        assert_eq!(render_grid(&slots, &state), render_grid(&slots, &state));
    }

    #[test]
    fn test_squares_use_slot_theme() {
        let slots = grid(3);
        let state = DisplayState::new(PlayMode::Autoplay, 3);
        let frame = render_grid(&slots, &state);
        let theme = board_theme(2);

        // ヘッダー3行 + パネル見出し1行 + ランク8..1 → ランク1は 3 + 1 + 7 行目
        let rank1 = &frame.lines[3 + 1 + 7];
        let backgrounds: Vec<Rgb> = rank1.iter().filter_map(|s| s.bg).collect();
        assert_eq!(backgrounds.len(), 24);
        // 3枚目の盤の a1 (暗), b1 (明)
        assert_eq!(backgrounds[16], theme.dark);
        assert_eq!(backgrounds[17], theme.light);
    }

    #[test]
    fn test_lines_are_aligned() {
        let slots = grid(5);
        let state = DisplayState::new(PlayMode::Autoplay, 5);
        let frame = render_grid(&slots, &state);
        let expected = PANEL_WIDTH * 5 + PANEL_GAP.len() * 4;
        for line in &frame.lines[3..3 + 13] {
            let width: usize = line.iter().map(Span::width).sum();
            assert_eq!(width, expected);
        }
    }

    #[test]
    fn test_selection_and_input_in_versus_mode() {
        let mut state = DisplayState::new(PlayMode::VersusEngine, 5);
        state.selected = Some(SlotId(3));
        state.input = "e2e4".to_string();
        let text = render_grid(&grid(5), &state).plain_text();
        assert!(text.contains(">#03"));
        assert!(text.contains("> e2e4"));
        assert!(text.contains("vs Engine"));
    }

    #[test]
    fn test_draw_writes_frame() {
        let state = DisplayState::new(PlayMode::Autoplay, 1);
        let frame = render_grid(&grid(1), &state);
        let mut out = Vec::new();
        draw(&mut out, &frame).unwrap();
        let written = String::from_utf8_lossy(&out);
        assert!(written.contains("Eval: N/A"));
        assert!(written.contains("\r\n"));
    }
}
