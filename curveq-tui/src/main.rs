use std::io;
use std::time::{Duration, Instant};

use anyhow::Context;
use crossbeam_channel::TryRecvError;
use ratatui::{
    backend::CrosstermBackend,
    crossterm::{
        event::{
            self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind,
        },
        execute,
        terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
    },
};

use curveq_core::{
    CurveConfig,
    commands::AudioCommand,
    engine::{AudioEngine, AudioEngineHandle},
};

mod canvas;
mod router;
mod routes;
mod state;
mod ui;

use router::{RouteAction, Router, next_tab, route_for_name, tab_names};
use state::{AppState, DEFAULT_SAMPLE_RATE};

/// Scheduler period: one editor tick and one redraw
const TICK: Duration = Duration::from_millis(33);

fn main() -> anyhow::Result<()> {
    // Initialize tui_logger for TUI log display
    tui_logger::init_logger(log::LevelFilter::Debug)
        .map_err(|e| anyhow::anyhow!("Failed to init tui_logger: {:?}", e))?;
    tui_logger::set_default_level(log::LevelFilter::Debug);

    log::info!("Starting curveq");

    // Optional audio file to play through the curve
    let path = std::env::args().nth(1);

    let (engine, handle) = AudioEngine::new();
    let _engine_thread = engine.spawn()?;

    run_tui(handle, path)
}

fn run_tui(handle: AudioEngineHandle, path: Option<String>) -> anyhow::Result<()> {
    let mut state = AppState::new(CurveConfig::default());

    // Params flow to the engine before any file exists, so a later load
    // starts out already shaped by the curve
    state
        .audio
        .attach(Box::new(handle.chain(DEFAULT_SAMPLE_RATE)));

    if let Some(path) = path {
        log::info!("Loading {}", path);
        handle.cmd_tx.send(AudioCommand::Load(path))?;
        state.status_message = "Loading...".to_string();
    }

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = ratatui::Terminal::new(backend)?;

    let mut router = Router::new(route_for_name(tab_names()[0]));
    let result = event_loop(&mut terminal, &mut state, &mut router, &handle);

    // Restore terminal even when the loop failed
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    let _ = handle.cmd_tx.send(AudioCommand::Quit);
    result
}

fn event_loop(
    terminal: &mut ratatui::Terminal<CrosstermBackend<io::Stdout>>,
    state: &mut AppState,
    router: &mut Router,
    handle: &AudioEngineHandle,
) -> anyhow::Result<()> {
    loop {
        // Handle audio engine responses
        loop {
            match handle.resp_rx.try_recv() {
                Ok(response) => state.handle_response(response, handle),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    state.error_message = Some("Audio engine stopped".to_string());
                    break;
                }
            }
        }

        state.tick(Instant::now());

        terminal
            .draw(|f| ui::draw(f, state, router))
            .context("Failed to draw frame")?;

        if !event::poll(TICK)? {
            continue;
        }
        let action = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_global_keys(key.code, state, handle, router)? {
                    return Ok(());
                }
                continue;
            }
            Event::Mouse(mouse) => router
                .current_mut()
                .handle_mouse(mouse, state, Instant::now())?,
            _ => continue,
        };
        if router.execute_action(action, state)? {
            return Ok(());
        }
    }
}

/// Handle global keys and delegate route-specific input to router.
/// Returns true when the app should quit.
fn handle_global_keys(
    key: KeyCode,
    state: &mut AppState,
    handle: &AudioEngineHandle,
    router: &mut Router,
) -> anyhow::Result<bool> {
    let action = match key {
        KeyCode::Char('q') => RouteAction::Quit,
        KeyCode::Tab => RouteAction::Replace(next_tab(router.current().name())),
        KeyCode::Char(' ') => {
            if state.is_playing() {
                handle.cmd_tx.send(AudioCommand::Pause)?;
            } else {
                handle.cmd_tx.send(AudioCommand::Play)?;
            }
            RouteAction::None
        }
        KeyCode::Char('s') => {
            handle.cmd_tx.send(AudioCommand::Stop)?;
            RouteAction::None
        }
        // Delegate to the current route's input handler
        _ => router.current_mut().handle_input(key, state, handle)?,
    };
    router.execute_action(action, state)
}
