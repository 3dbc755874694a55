use crossterm::{execute, terminal};
use std::io;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;
use uci_grid::config::GridConfig;
use uci_grid::core::PlayMode;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let config = GridConfig::load_or_default();
    init_logging(&config)?;

    // ターミナル初期化
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, terminal::EnterAlternateScreen)?;

    let res = run(config).await;

    // ターミナル復帰
    execute!(io::stdout(), terminal::LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;

    if let Err(e) = &res {
        tracing::error!("{:#}", e);
    }
    res
}

/// stdout は盤面表示に使うのでログはファイルへ
fn init_logging(config: &GridConfig) -> anyhow::Result<()> {
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_file)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run(config: GridConfig) -> anyhow::Result<()> {
    use crossterm::event::{self, Event, KeyCode};
    use std::time::Duration;

    print!("=== UCI Grid: {} boards ===\r\n", config.board_count);
    print!("Engine: {}\r\n", config.engine.path);

    print!("\r\nSelect mode:\r\n");
    print!("1. Engine vs Engine (autoplay)\r\n");
    print!("2. Play against the engines\r\n");
    print!("q. Quit\r\n");

    let mode = loop {
        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('1') => break PlayMode::Autoplay,
                    KeyCode::Char('2') => break PlayMode::VersusEngine,
                    KeyCode::Char('q') => return Ok(()),
                    _ => {}
                }
            }
        }
    };

    tracing::info!("starting {} boards in {} mode", config.board_count, mode);
    uci_grid::app::run(config, mode).await
}
