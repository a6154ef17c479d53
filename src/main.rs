use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::Event,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Style},
    widgets::Paragraph,
    Terminal,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

use hostwatch::alert::CommandNotifier;
use hostwatch::app::{App, View};
use hostwatch::config::{DashboardConfig, Transport};
use hostwatch::data::units::parse_duration;
use hostwatch::events;
use hostwatch::settings::{JsonFileStore, Preferences};
use hostwatch::source::{Connector, LiveSource, TcpConnector, WebSocketConnector};
use hostwatch::ui;

#[derive(Parser, Debug)]
#[command(name = "hostwatch")]
#[command(about = "Live terminal dashboard for host and GPU telemetry")]
struct Args {
    /// Config file (defaults to ./hostwatch.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Metrics producer address (host:port)
    #[arg(long)]
    host: Option<String>,

    /// Connect with wss:// instead of ws://
    #[arg(long)]
    secure: bool,

    /// WebSocket request path
    #[arg(long)]
    path: Option<String>,

    /// Session transport
    #[arg(long, value_enum)]
    transport: Option<Transport>,

    /// Delay between reconnect attempts (e.g., "3s", "500ms")
    #[arg(long)]
    reconnect_delay: Option<String>,

    /// Samples kept per chart series
    #[arg(long)]
    history: Option<usize>,

    /// Settings file holding monitor configs and preferences
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Do not ring the terminal bell on alerts
    #[arg(long)]
    no_bell: bool,
}

impl Args {
    /// Layer command-line flags over the loaded configuration.
    fn apply(&self, config: &mut DashboardConfig) -> Result<()> {
        if let Some(ref host) = self.host {
            config.host = host.clone();
        }
        if self.secure {
            config.secure = true;
        }
        if let Some(ref path) = self.path {
            config.path = path.clone();
        }
        if let Some(transport) = self.transport {
            config.transport = transport;
        }
        if let Some(ref delay) = self.reconnect_delay {
            config.reconnect_delay = parse_duration(delay)
                .with_context(|| format!("Invalid reconnect delay: {}", delay))?;
        }
        if let Some(history) = self.history {
            config.history = history;
        }
        if let Some(ref settings) = self.settings {
            config.settings_path = Some(settings.clone());
        }
        if let Some(ref log_file) = self.log_file {
            config.log_file = Some(log_file.clone());
        }
        if self.no_bell {
            config.bell = false;
        }
        config.validate()
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = DashboardConfig::load(args.config.as_deref())?;
    args.apply(&mut config)?;

    if let Some(ref path) = config.log_file {
        init_logging(path)?;
    }

    // The live source runs on this runtime while the TUI owns the main thread
    let rt = tokio::runtime::Runtime::new()?;
    let guard = rt.enter();

    let connector: Arc<dyn Connector> = match config.transport {
        Transport::Websocket => Arc::new(
            WebSocketConnector::new(&config.endpoint())
                .with_connect_timeout(config.connect_timeout),
        ),
        Transport::Tcp => Arc::new(
            TcpConnector::new(config.host.clone()).with_connect_timeout(config.connect_timeout),
        ),
    };
    info!(endpoint = %connector.describe(), "starting dashboard");
    let source = LiveSource::spawn(connector, config.reconnect_delay);

    let prefs = Preferences::open(Box::new(JsonFileStore::new(config.settings_path())));
    let notifier = CommandNotifier::new(config.notify_command.clone());
    let app = App::new(Box::new(source), prefs, Box::new(notifier), config.history)
        .with_bell(config.bell);

    let result = run_tui(app);

    drop(guard);
    rt.shutdown_timeout(Duration::from_secs(1));

    result
}

/// Log to a file; the terminal belongs to the TUI.
fn init_logging(path: &Path) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open log file: {}", path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Run the TUI until the user quits
fn run_tui(mut app: App) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Setup panic hook to restore terminal
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
        original_hook(panic);
    }));

    let result = run_app(&mut terminal, &mut app);

    // Make sure the session stops even if the loop bailed out early
    if app.running {
        app.quit();
    }

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    // Minimum terminal size for usable display
    const MIN_WIDTH: u16 = 60;
    const MIN_HEIGHT: u16 = 12;

    while app.running {
        app.poll_source();

        terminal.draw(|frame| {
            let area = frame.area();

            if area.width < MIN_WIDTH || area.height < MIN_HEIGHT {
                let msg = format!(
                    "Terminal too small: {}x{}\nMinimum: {}x{}\n\nResize to continue",
                    area.width, area.height, MIN_WIDTH, MIN_HEIGHT
                );
                let paragraph = Paragraph::new(msg)
                    .alignment(Alignment::Center)
                    .style(Style::default().fg(Color::Yellow));
                let top = (area.height / 2).saturating_sub(2);
                let centered = Rect::new(0, top, area.width, 5u16.min(area.height - top));
                frame.render_widget(paragraph, centered);
                return;
            }

            let [header, tabs, content, status] = Layout::vertical([
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Min(8),
                Constraint::Length(1),
            ])
            .areas(area);

            ui::common::render_header(frame, app, header);
            ui::common::render_tabs(frame, app, tabs);

            match app.current_view {
                View::Dashboard => ui::dashboard::render(frame, app, content),
                View::Devices => ui::devices::render(frame, app, content),
                View::System => ui::system::render(frame, app, content),
            }

            ui::common::render_status_bar(frame, app, status);

            if let Some(ref form) = app.monitor_form {
                ui::monitor::render_form(frame, app, form, area);
            }
            if app.permission_prompt {
                ui::monitor::render_permission_prompt(frame, app, area);
            }
            if app.show_help {
                ui::common::render_help(frame, app, area);
            }
        })?;

        if let Some(event) = events::poll_event(Duration::from_millis(100))? {
            match event {
                Event::Key(key) => events::handle_key_event(app, key),
                // Terminal will redraw on next iteration
                Event::Resize(_, _) => {}
                _ => {}
            }
        }
    }

    Ok(())
}
