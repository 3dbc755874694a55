use crate::config::GridConfig;
use crate::core::{PlayMode, SlotId, SlotSnapshot};
use crate::display::{self, DisplayState, Frame};
use crate::engine::EngineSession;
use crate::orchestrator::{SlotEvent, SlotPool};
use crate::record::{self, GameRecord};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{info, warn};

const TICK: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    None,
    Quit,
    Submit { slot: SlotId, uci: String },
}

/// Owns the displayed slot array. Slot tasks never touch it; their events
/// replace entries wholesale.
pub struct App {
    slots: Vec<SlotSnapshot>,
    state: DisplayState,
    dirty: bool,
}

impl App {
    pub fn new(board_count: usize, columns: usize, mode: PlayMode) -> Self {
        App {
            slots: (0..board_count).map(|i| SlotSnapshot::initial(SlotId(i))).collect(),
            state: DisplayState::new(mode, columns),
            dirty: true,
        }
    }

    pub fn slots(&self) -> &[SlotSnapshot] {
        &self.slots
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.state.status_msg = Some(msg.into());
        self.dirty = true;
    }

    /// Folds one slot event in. Returns the record of a finished game.
    pub fn apply(&mut self, event: SlotEvent) -> Option<GameRecord> {
        match event {
            SlotEvent::Snapshot(snapshot) => {
                if let Some(entry) = self.slots.get_mut(snapshot.id.index()) {
                    *entry = snapshot;
                    self.dirty = true;
                }
                None
            }
            SlotEvent::GameOver(record) => Some(record),
        }
    }

    pub fn frame(&self) -> Frame {
        display::render_grid(&self.slots, &self.state)
    }

    /// Returns the frame only if something changed since the last call.
    pub fn take_frame(&mut self) -> Option<Frame> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.frame())
    }

    pub fn handle_key(&mut self, code: KeyCode) -> KeyAction {
        if self.state.mode == PlayMode::Autoplay {
            return match code {
                KeyCode::Char('q') | KeyCode::Esc => KeyAction::Quit,
                _ => KeyAction::None,
            };
        }

        self.dirty = true;
        let count = self.slots.len();
        let columns = self.state.columns;
        let current = self.state.selected.map(SlotId::index).unwrap_or(0);
        match code {
            KeyCode::Char('q') if self.state.input.is_empty() => return KeyAction::Quit,
            KeyCode::Left => self.select(current.saturating_sub(1)),
            KeyCode::Right => self.select((current + 1).min(count.saturating_sub(1))),
            KeyCode::Up => {
                if current >= columns {
                    self.select(current - columns);
                }
            }
            KeyCode::Down => {
                if current + columns < count {
                    self.select(current + columns);
                }
            }
            KeyCode::Char(c) if c.is_ascii_alphanumeric() && self.state.input.len() < 5 => {
                self.state.input.push(c.to_ascii_lowercase());
            }
            KeyCode::Backspace => {
                self.state.input.pop();
            }
            KeyCode::Esc => self.state.input.clear(),
            KeyCode::Enter if !self.state.input.is_empty() => {
                let uci = std::mem::take(&mut self.state.input);
                return KeyAction::Submit {
                    slot: SlotId(current),
                    uci,
                };
            }
            _ => {}
        }
        KeyAction::None
    }

    fn select(&mut self, index: usize) {
        self.state.selected = Some(SlotId(index));
    }
}

/// Starts the pool, runs the event loop until quit, then tears the pool down.
pub async fn run(config: GridConfig, mode: PlayMode) -> anyhow::Result<()> {
    let engine = config.engine.clone();
    let (pool, events) = SlotPool::start(config.board_count, mode, &config.search, |id| {
        EngineSession::spawn(id, &engine)
    })
    .await?;

    let mut app = App::new(config.board_count, config.columns, mode);
    let result = event_loop(&mut app, &pool, events, &config).await;

    app.set_status("Shutting down engines...");
    if let Some(frame) = app.take_frame() {
        let _ = display::draw(&mut io::stdout(), &frame);
    }
    pool.shutdown().await;
    result
}

async fn event_loop(
    app: &mut App,
    pool: &SlotPool,
    mut events: mpsc::UnboundedReceiver<SlotEvent>,
    config: &GridConfig,
) -> anyhow::Result<()> {
    let mut stdout = io::stdout();
    let mut tick = tokio::time::interval(TICK);
    let mut finished = 0usize;

    loop {
        tokio::select! {
            Some(event) = events.recv() => {
                if let Some(record) = app.apply(event) {
                    finished += 1;
                    app.set_status(format!(
                        "Slot {}: {} ({} finished)",
                        record.slot, record.outcome, finished
                    ));
                    if config.save_games {
                        match record::save_game(&config.record_dir, &record) {
                            Ok(path) => info!("[RECORD] saved {}", path.display()),
                            Err(e) => warn!("[RECORD] save failed: {}", e),
                        }
                    }
                }
            }
            _ = tick.tick() => {
                // キー入力はノンブロッキングで読み切る
                while event::poll(Duration::ZERO)? {
                    let Event::Key(key) = event::read()? else {
                        continue;
                    };
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match app.handle_key(key.code) {
                        KeyAction::None => {}
                        KeyAction::Quit => return Ok(()),
                        KeyAction::Submit { slot, uci } => {
                            let accepted = pool.submit_move(slot, &uci).await;
                            app.set_status(if accepted {
                                format!("Slot {}: played {}", slot, uci)
                            } else {
                                format!("Slot {}: {} rejected", slot, uci)
                            });
                        }
                    }
                }
                if let Some(frame) = app.take_frame() {
                    display::draw(&mut stdout, &frame)?;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{AnalysisSample, Centipawns, GameOutcome, Position, SlotPhase};

    #[test]
    fn test_new_app_has_initial_slots() {
        let app = App::new(25, 5, PlayMode::Autoplay);
        assert_eq!(app.slots().len(), 25);
        assert!(app
            .slots()
            .iter()
            .all(|s| s.fen == crate::core::START_FEN && s.analysis.is_empty()));
    }

    #[test]
    fn test_apply_replaces_entry() {
        let mut app = App::new(3, 3, PlayMode::Autoplay);
        app.take_frame();
        assert!(app.take_frame().is_none());

        let pos = Position::initial().play_uci("e2e4").unwrap();
        let snapshot = SlotSnapshot::new(
            SlotId(1),
            &pos,
            &AnalysisSample::new(Centipawns(30), "e7e5"),
            SlotPhase::Applying,
        );
        assert!(app.apply(SlotEvent::Snapshot(snapshot.clone())).is_none());
        assert_eq!(app.slots()[1], snapshot);
        assert_eq!(app.slots()[0], SlotSnapshot::initial(SlotId(0)));
        assert!(app.take_frame().is_some());

        // 範囲外は無視
        let stray = SlotSnapshot::initial(SlotId(9));
        app.apply(SlotEvent::Snapshot(stray));
        assert!(app.take_frame().is_none());
    }

    #[test]
    fn test_game_over_returns_record() {
        let mut app = App::new(1, 1, PlayMode::Autoplay);
        let pos = Position::from_fen("7k/5Q2/6K1/8/8/8/8/8 b - - 0 1").unwrap();
        let record = GameRecord::new(SlotId(0), PlayMode::Autoplay, &pos, GameOutcome::Stalemate);
        assert_eq!(app.apply(SlotEvent::GameOver(record.clone())), Some(record));
    }

    #[test]
    fn test_autoplay_keys() {
        let mut app = App::new(4, 2, PlayMode::Autoplay);
        assert_eq!(app.handle_key(KeyCode::Char('e')), KeyAction::None);
        assert_eq!(app.handle_key(KeyCode::Enter), KeyAction::None);
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::Quit);
    }

    #[test]
    fn test_versus_selection_moves_within_grid() {
        let mut app = App::new(6, 3, PlayMode::VersusEngine);
        assert_eq!(app.state().selected, Some(SlotId(0)));

        app.handle_key(KeyCode::Left);
        assert_eq!(app.state().selected, Some(SlotId(0)));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.state().selected, Some(SlotId(3)));
        app.handle_key(KeyCode::Down);
        assert_eq!(app.state().selected, Some(SlotId(3)));
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Right);
        app.handle_key(KeyCode::Right);
        assert_eq!(app.state().selected, Some(SlotId(5)));
        app.handle_key(KeyCode::Up);
        assert_eq!(app.state().selected, Some(SlotId(2)));
    }

    #[test]
    fn test_versus_move_entry() {
        let mut app = App::new(4, 2, PlayMode::VersusEngine);
        app.handle_key(KeyCode::Right);
        for c in "E2E4".chars() {
            app.handle_key(KeyCode::Char(c));
        }
        assert_eq!(app.state().input, "e2e4");

        // 入力中の q は文字として扱う
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::None);
        app.handle_key(KeyCode::Backspace);

        assert_eq!(
            app.handle_key(KeyCode::Enter),
            KeyAction::Submit {
                slot: SlotId(1),
                uci: "e2e4".to_string()
            }
        );
        assert!(app.state().input.is_empty());
        assert_eq!(app.handle_key(KeyCode::Enter), KeyAction::None);
        assert_eq!(app.handle_key(KeyCode::Char('q')), KeyAction::Quit);
    }
}
