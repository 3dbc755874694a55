use super::{run_slot, SlotControl, SlotEvent, SlotMachine};
use crate::config::SearchConfig;
use crate::core::{PlayMode, Position, SlotId};
use crate::engine::EngineSession;
use crate::error::EngineError;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{info, warn};

struct SlotHandle {
    id: SlotId,
    controls: mpsc::UnboundedSender<SlotControl>,
    task: JoinHandle<()>,
}

/// Fixed set of slot tasks, one per board, indexed by [`SlotId`].
///
/// Built once by [`SlotPool::start`] and torn down once by
/// [`SlotPool::shutdown`], which consumes the pool.
pub struct SlotPool {
    slots: Vec<SlotHandle>,
    shutdown: watch::Sender<bool>,
}

impl SlotPool {
    /// Opens one session per slot with `open_session` and starts its task.
    /// If any session fails to open, the slots already started are shut down
    /// and the error is returned.
    pub async fn start<F>(
        board_count: usize,
        mode: PlayMode,
        search: &SearchConfig,
        mut open_session: F,
    ) -> Result<(Self, mpsc::UnboundedReceiver<SlotEvent>), EngineError>
    where
        F: FnMut(SlotId) -> Result<EngineSession, EngineError>,
    {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, _) = watch::channel(false);
        let depth = match mode {
            PlayMode::Autoplay => search.autoplay_depth,
            PlayMode::VersusEngine => search.reply_depth,
        };

        let mut pool = SlotPool {
            slots: Vec::with_capacity(board_count),
            shutdown: shutdown_tx,
        };

        for index in 0..board_count {
            let id = SlotId(index);
            let session = match open_session(id) {
                Ok(session) => session,
                Err(e) => {
                    warn!("[POOL] slot {} failed to open: {}", id, e);
                    pool.shutdown().await;
                    return Err(e);
                }
            };

            let (control_tx, control_rx) = mpsc::unbounded_channel();
            let machine = SlotMachine::new(id, mode, depth, Position::initial());
            let task = tokio::spawn(run_slot(
                machine,
                session,
                search.move_delay(),
                event_tx.clone(),
                control_rx,
                pool.shutdown.subscribe(),
            ));
            pool.slots.push(SlotHandle {
                id,
                controls: control_tx,
                task,
            });
        }

        info!("[POOL] started {} slots ({})", board_count, mode);
        Ok((pool, event_rx))
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Plays a human move on one slot. `false` if the slot refused it or is
    /// gone.
    pub async fn submit_move(&self, id: SlotId, uci: &str) -> bool {
        let Some(slot) = self.slots.get(id.index()) else {
            return false;
        };
        let (reply_tx, reply_rx) = oneshot::channel();
        let control = SlotControl::HumanMove {
            uci: uci.to_string(),
            reply: reply_tx,
        };
        if slot.controls.send(control).is_err() {
            return false;
        }
        reply_rx.await.unwrap_or(false)
    }

    /// Stops every slot task and waits for their sessions to terminate.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        for slot in self.slots {
            if let Err(e) = slot.task.await {
                warn!("[POOL] slot {} task failed: {}", slot.id, e);
            }
        }
        info!("[POOL] shut down");
    }
}
