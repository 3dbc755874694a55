use super::protocol::EngineCommand;
use crate::config::EngineConfig;
use crate::core::SlotId;
use crate::error::EngineError;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// `quit` を送ってからプロセス終了を待つ時間
const QUIT_GRACE: Duration = Duration::from_millis(300);

/// One engine process owned by one slot.
///
/// Commands go out through an unbounded channel drained by a writer task, so
/// [`EngineSession::send`] never waits on the engine. Output lines arrive on a
/// single channel; exactly one consumer may [`subscribe`](EngineSession::subscribe).
pub struct EngineSession {
    slot: SlotId,
    commands: mpsc::UnboundedSender<String>,
    output: Option<mpsc::UnboundedReceiver<String>>,
    child: Option<Child>,
    writer: Option<JoinHandle<()>>,
    reader: Option<JoinHandle<()>>,
}

impl EngineSession {
    /// Launches the engine binary and wires its stdin/stdout to channels.
    /// Must be called inside a tokio runtime.
    pub fn spawn(slot: SlotId, config: &EngineConfig) -> Result<Self, EngineError> {
        let mut child = Command::new(&config.path)
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| EngineError::Spawn {
                path: config.path.clone(),
                source,
            })?;

        let stdin = child.stdin.take().ok_or(EngineError::MissingPipe {
            slot,
            pipe: "stdin",
        })?;
        let stdout = child.stdout.take().ok_or(EngineError::MissingPipe {
            slot,
            pipe: "stdout",
        })?;

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel::<String>();
        let (out_tx, out_rx) = mpsc::unbounded_channel::<String>();

        let writer = tokio::spawn(write_commands(slot, stdin, cmd_rx));
        let reader = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        if out_tx.send(line).is_err() {
                            break;
                        }
                    }
                    Ok(None) => {
                        debug!("[ENGINE {}] output closed", slot);
                        break;
                    }
                    Err(e) => {
                        warn!("[ENGINE {}] read error: {}", slot, e);
                        break;
                    }
                }
            }
        });

        info!("[ENGINE {}] spawned `{}` (pid {:?})", slot, config.path, child.id());

        let session = EngineSession {
            slot,
            commands: cmd_tx,
            output: Some(out_rx),
            child: Some(child),
            writer: Some(writer),
            reader: Some(reader),
        };
        session.handshake(config)?;
        Ok(session)
    }

    /// Session backed by plain channels instead of a process. Whatever is sent
    /// shows up on `commands`; whatever is pushed into `output`'s sender is
    /// delivered as engine output.
    pub fn from_channels(
        slot: SlotId,
        commands: mpsc::UnboundedSender<String>,
        output: mpsc::UnboundedReceiver<String>,
    ) -> Self {
        EngineSession {
            slot,
            commands,
            output: Some(output),
            child: None,
            writer: None,
            reader: None,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    /// Queues one line for the engine. Fire-and-forget: fails only when the
    /// writer side is already gone.
    pub fn send(&self, command: &EngineCommand) -> Result<(), EngineError> {
        let line = command.to_string();
        debug!("[ENGINE {}] >> {}", self.slot, line);
        self.commands
            .send(line)
            .map_err(|_| EngineError::Closed(self.slot))
    }

    /// Hands out the output stream. There is only ever one subscriber.
    pub fn subscribe(&mut self) -> Result<mpsc::UnboundedReceiver<String>, EngineError> {
        self.output
            .take()
            .ok_or(EngineError::AlreadySubscribed(self.slot))
    }

    fn handshake(&self, config: &EngineConfig) -> Result<(), EngineError> {
        if !config.handshake {
            return Ok(());
        }
        self.send(&EngineCommand::Uci)?;
        if let Some(threads) = config.threads {
            self.send(&EngineCommand::SetOption {
                name: "Threads".to_string(),
                value: threads.to_string(),
            })?;
        }
        if let Some(hash_mb) = config.hash_mb {
            self.send(&EngineCommand::SetOption {
                name: "Hash".to_string(),
                value: hash_mb.to_string(),
            })?;
        }
        self.send(&EngineCommand::IsReady)?;
        self.send(&EngineCommand::NewGame)
    }

    /// Stops any running search and asks the engine to quit, then kills it
    /// if it lingers.
    pub async fn shutdown(self) {
        let EngineSession {
            slot,
            commands,
            child,
            writer,
            reader,
            ..
        } = self;

        // 探索中なら先に止める
        let _ = commands.send(EngineCommand::Stop.to_string());
        let _ = commands.send(EngineCommand::Quit.to_string());
        drop(commands);

        // writer は残りのコマンドを書き切ってから終わる
        if let Some(writer) = writer {
            let _ = tokio::time::timeout(QUIT_GRACE, writer).await;
        }

        if let Some(mut child) = child {
            match tokio::time::timeout(QUIT_GRACE, child.wait()).await {
                Ok(Ok(status)) => debug!("[ENGINE {}] exited with {}", slot, status),
                _ => {
                    if let Err(e) = child.kill().await {
                        warn!("[ENGINE {}] kill failed: {}", slot, e);
                    } else {
                        debug!("[ENGINE {}] killed", slot);
                    }
                }
            }
        }

        if let Some(reader) = reader {
            reader.abort();
        }
    }
}

async fn write_commands(
    slot: SlotId,
    mut stdin: ChildStdin,
    mut commands: mpsc::UnboundedReceiver<String>,
) {
    while let Some(line) = commands.recv().await {
        let res = async {
            stdin.write_all(line.as_bytes()).await?;
            stdin.write_all(b"\n").await?;
            stdin.flush().await
        }
        .await;
        if let Err(e) = res {
            warn!("[ENGINE {}] write failed: {}", slot, e);
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_send_goes_to_channel() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let session = EngineSession::from_channels(SlotId(3), cmd_tx, out_rx);

        session.send(&EngineCommand::Go { depth: 15 }).unwrap();
        assert_eq!(cmd_rx.recv().await.as_deref(), Some("go depth 15"));
        assert_eq!(session.slot(), SlotId(3));
    }

    #[tokio::test]
    async fn test_single_subscriber() {
        let (cmd_tx, _cmd_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let mut session = EngineSession::from_channels(SlotId(0), cmd_tx, out_rx);

        let mut output = session.subscribe().unwrap();
        assert!(matches!(
            session.subscribe(),
            Err(EngineError::AlreadySubscribed(SlotId(0)))
        ));

        out_tx.send("readyok".to_string()).unwrap();
        assert_eq!(output.recv().await.as_deref(), Some("readyok"));
    }

    #[tokio::test]
    async fn test_send_after_close_fails() {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let session = EngineSession::from_channels(SlotId(1), cmd_tx, out_rx);
        drop(cmd_rx);

        assert!(matches!(
            session.send(&EngineCommand::IsReady),
            Err(EngineError::Closed(SlotId(1)))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_sends_stop_then_quit() {
        let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
        let (_out_tx, out_rx) = mpsc::unbounded_channel();
        let session = EngineSession::from_channels(SlotId(2), cmd_tx, out_rx);

        session.shutdown().await;
        assert_eq!(cmd_rx.recv().await.as_deref(), Some("stop"));
        assert_eq!(cmd_rx.recv().await.as_deref(), Some("quit"));
        assert_eq!(cmd_rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_spawn_missing_binary() {
        let config = EngineConfig {
            path: "/nonexistent/engine-binary".to_string(),
            ..EngineConfig::default()
        };
        assert!(matches!(
            EngineSession::spawn(SlotId(0), &config),
            Err(EngineError::Spawn { .. })
        ));
    }
}
