//! Per-slot move orchestration.
//!
//! Each slot runs [`run_slot`] as its own task. The task owns the slot's
//! [`EngineSession`] and [`SlotMachine`]; the rest of the app only sees
//! [`SlotEvent`]s and talks back through [`SlotControl`].

pub mod machine;
pub mod pool;

pub use machine::{SlotMachine, Transition};
pub use pool::SlotPool;

use crate::core::{PlayMode, SlotSnapshot};
use crate::engine::EngineSession;
use crate::record::GameRecord;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub enum SlotEvent {
    /// Replaces the slot's entry in the displayed array.
    Snapshot(SlotSnapshot),
    GameOver(GameRecord),
}

#[derive(Debug)]
pub enum SlotControl {
    /// Interactive mode: play `uci` for the human. Replies accept/reject.
    HumanMove {
        uci: String,
        reply: oneshot::Sender<bool>,
    },
}

/// Drives one slot until `shutdown` flips to `true` (or its sender is
/// dropped). Terminates the session on the way out.
pub async fn run_slot(
    mut machine: SlotMachine,
    mut session: EngineSession,
    move_delay: Duration,
    events: mpsc::UnboundedSender<SlotEvent>,
    mut controls: mpsc::UnboundedReceiver<SlotControl>,
    mut shutdown: watch::Receiver<bool>,
) {
    let id = machine.id();
    let mut output = match session.subscribe() {
        Ok(rx) => Some(rx),
        Err(e) => {
            error!("[SLOT {}] {}", id, e);
            machine.mark_stalled();
            None
        }
    };

    // 次の探索予定時刻。シャットダウン時はこのまま破棄される
    let mut next_search: Option<Instant> = None;

    if machine.mode() == PlayMode::Autoplay {
        issue_search(&mut machine, &session);
    }
    publish(&events, &machine);

    loop {
        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            line = recv_line(&mut output) => match line {
                Some(line) => {
                    let transition = machine.on_engine_line(&line);
                    if handle_transition(&machine, transition, &events) {
                        next_search = Some(Instant::now() + move_delay);
                    }
                }
                None => {
                    warn!("[SLOT {}] engine output closed, slot stalled", id);
                    output = None;
                    next_search = None;
                    machine.mark_stalled();
                    publish(&events, &machine);
                }
            },
            Some(control) = controls.recv() => match control {
                SlotControl::HumanMove { uci, reply } => {
                    let transition = machine.on_human_move(&uci);
                    let accepted = matches!(transition, Transition::Moved { .. });
                    if handle_transition(&machine, transition, &events) {
                        next_search = Some(Instant::now() + move_delay);
                    }
                    let _ = reply.send(accepted);
                }
            },
            _ = sleep_until(next_search.unwrap_or_else(Instant::now)), if next_search.is_some() => {
                next_search = None;
                issue_search(&mut machine, &session);
                publish(&events, &machine);
            }
        }
    }

    if next_search.take().is_some() {
        debug!("[SLOT {}] pending search cancelled", id);
    }
    session.shutdown().await;
    info!("[SLOT {}] stopped", id);
}

/// Publishes the effects of a transition. Returns `true` when the next
/// engine search should be scheduled.
fn handle_transition(
    machine: &SlotMachine,
    transition: Transition,
    events: &mpsc::UnboundedSender<SlotEvent>,
) -> bool {
    match transition {
        Transition::Ignored => false,
        // 拒否された行が解析値を運んでいることがある
        Transition::AnalysisUpdated(_) | Transition::Rejected { .. } => {
            publish(events, machine);
            false
        }
        Transition::Moved {
            uci,
            outcome,
            reschedule,
        } => {
            debug!("[SLOT {}] played {}", machine.id(), uci);
            publish(events, machine);
            if let Some(outcome) = outcome {
                info!("[SLOT {}] game over: {}", machine.id(), outcome);
                let record = GameRecord::new(machine.id(), machine.mode(), machine.position(), outcome);
                let _ = events.send(SlotEvent::GameOver(record));
            }
            reschedule
        }
    }
}

fn issue_search(machine: &mut SlotMachine, session: &EngineSession) {
    let Some(commands) = machine.begin_search() else {
        return;
    };
    for command in &commands {
        if let Err(e) = session.send(command) {
            warn!("[SLOT {}] {}", machine.id(), e);
            machine.mark_stalled();
            return;
        }
    }
}

fn publish(events: &mpsc::UnboundedSender<SlotEvent>, machine: &SlotMachine) {
    // 受信側が閉じていれば表示は終了している
    let _ = events.send(SlotEvent::Snapshot(machine.snapshot()));
}

async fn recv_line(output: &mut Option<mpsc::UnboundedReceiver<String>>) -> Option<String> {
    match output {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
