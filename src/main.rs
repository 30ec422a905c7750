use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{DisableBracketedPaste, EnableBracketedPaste},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use shadowtype::{
    app::App,
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore},
    logging,
    runtime::{CrosstermEventSource, EventSource, FixedTicker, Runner, Ticker},
    ui,
};
use std::{
    error::Error,
    fs,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};
use tracing::info;

const TICK_RATE_MS: u64 = 100;

/// retype any text over its own ghost: correct characters light up, mistakes stay red
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// file whose contents to practice on (never written back)
    file: Option<PathBuf>,

    /// practice on this text instead of a file
    #[clap(short = 'p', long, conflicts_with = "file")]
    prompt: Option<String>,

    /// milliseconds of quiet after a keystroke before the text is re-checked
    #[clap(long)]
    debounce_ms: Option<u64>,

    /// read settings from this file instead of the default config location
    #[clap(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn initial_text(&self) -> io::Result<String> {
        match (&self.prompt, &self.file) {
            (Some(prompt), _) => Ok(prompt.clone()),
            (None, Some(path)) => fs::read_to_string(path),
            (None, None) => Ok(String::new()),
        }
    }

    fn resolve_config(&self) -> Config {
        let store = match &self.config {
            Some(path) => FileConfigStore::with_path(path),
            None => FileConfigStore::new(),
        };
        let mut cfg = store.load();
        if let Some(ms) = self.debounce_ms {
            cfg.debounce_ms = ms;
        }
        cfg
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    if let Some(path) = AppDirs::log_path() {
        // logging is best effort; the editor works without it
        let _ = logging::init(&path);
    }

    let text = match cli.initial_text() {
        Ok(text) => text,
        Err(e) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::Io, format!("could not read file: {e}"))
                .exit();
        }
    };
    let config = cli.resolve_config();
    info!(chars = text.chars().count(), debounce_ms = config.debounce_ms, "shadowtype starting");

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableBracketedPaste)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(&text, config);
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let result = run(&mut terminal, &mut app, runner);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        DisableBracketedPaste,
        LeaveAlternateScreen
    )?;
    terminal.show_cursor()?;

    result
}

fn run<B: Backend, E: EventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    mut runner: Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    runner.elapsed();

    while !app.should_quit {
        terminal.draw(|f| ui::draw(app, f))?;

        let event = runner.step_within(app.next_due_in());
        app.advance(runner.elapsed());
        app.handle_event(event);
    }

    Ok(())
}
