/// Entry point and frame loop.

mod config;
mod domain;
mod net;
mod sim;
mod ui;

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use clap::Parser;

use config::AppConfig;
use net::api::ApiClient;
use net::worker::{NetMessage, NetWorker};
use sim::controller::{GameController, Intent};
use sim::event::GameEvent;
use sim::install::{launch_difficulty, InstallEvent, InstallHelper, TerminalHost};
use sim::settings::{load_settings, save_settings, LocalStore};
use ui::gamepad::GamepadState;
use ui::input::{Command, InputState};
use ui::renderer::Renderer;
use ui::sound::SoundEngine;

const FRAME_SLEEP: Duration = Duration::from_millis(16);
const LOG_FILE: &str = "sudoku-pro.log";
const LOG_ENV: &str = "SUDOKU_LOG";

#[derive(Parser, Debug)]
#[command(name = "sudoku-pro", version, about = "Terminal client for the Sudoku Pro game service")]
struct Args {
    /// Game server base URL, overriding config.toml
    #[arg(long)]
    server: Option<String>,

    /// Start a game at this difficulty right away (easy, medium, hard, expert)
    #[arg(long)]
    difficulty: Option<String>,

    /// Launch URL whose `difficulty` query parameter starts a game
    #[arg(long)]
    launch_url: Option<String>,

    /// Read this config file instead of searching for config.toml
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    let mut config = AppConfig::load(args.config.as_deref());
    if let Some(server) = &args.server {
        config.server.base_url = server.clone();
    }
    if let Err(e) = std::fs::create_dir_all(&config.data_dir) {
        eprintln!("Cannot create data directory {}: {e}", config.data_dir.display());
    }
    if let Err(e) = init_logging(&config.data_dir) {
        eprintln!("Logging disabled: {e}");
    }
    for warning in &config.warnings {
        tracing::warn!("{warning}");
    }
    tracing::info!(server = %config.server.base_url, data_dir = %config.data_dir.display(), "starting");

    let client = match ApiClient::new(config.server.clone()) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Invalid server address: {e}");
            return;
        }
    };
    let worker = match NetWorker::spawn(client) {
        Ok(worker) => worker,
        Err(e) => {
            eprintln!("Network worker failed to start: {e}");
            return;
        }
    };

    let mut store = LocalStore::open(&config.data_dir);
    let mut game = GameController::new(load_settings(&store), config.game.difficulty, config.game.max_hints);

    let mut install = InstallHelper::new(TerminalHost::default(), config.install.clone());
    let launch = launch_difficulty(args.difficulty.as_deref(), args.launch_url.as_deref());
    if args.difficulty.is_some() && launch.is_none() {
        tracing::warn!(difficulty = ?args.difficulty, "unknown launch difficulty ignored");
    }
    install.start(launch, Instant::now());

    let mut renderer = Renderer::new();
    if let Err(e) = renderer.init() {
        eprintln!("Terminal init failed: {e}");
        worker.shutdown();
        return;
    }

    let sound = SoundEngine::new();

    let result = game_loop(
        &mut game,
        &mut install,
        &worker,
        &mut store,
        &mut renderer,
        sound.as_ref(),
        &config,
    );

    if let Err(e) = renderer.cleanup() {
        eprintln!("Terminal cleanup failed: {e}");
    }
    worker.shutdown();

    if let Err(e) = result {
        tracing::error!(error = %e, "frame loop failed");
        eprintln!("Game error: {e}");
    }

    println!();
    println!("Thanks for playing Sudoku Pro!");
}

/// Log to a file in the data directory; the terminal belongs to the game.
fn init_logging(data_dir: &Path) -> std::io::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(data_dir.join(LOG_FILE))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env(LOG_ENV)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn game_loop(
    game: &mut GameController,
    install: &mut InstallHelper<TerminalHost>,
    worker: &NetWorker,
    store: &mut LocalStore,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &AppConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut kb = InputState::new();
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    loop {
        kb.drain_events();
        gp.update();
        let now = Instant::now();

        // ── Input ──
        for cmd in kb.commands() {
            match *cmd {
                Command::ForceQuit => return Ok(()),
                Command::Game(intent) => game.apply(intent, now),
                Command::Click { column, row } => {
                    if let Some(pos) = renderer.cell_at(column, row) {
                        game.apply(Intent::Select(pos), now);
                    }
                }
                Command::InstallConfirm if install.wants_answer() => install.confirm(),
                Command::InstallDismiss if install.wants_answer() => install.dismiss(),
                Command::InstallConfirm | Command::InstallDismiss => {}
            }
        }
        for intent in gp.intents() {
            game.apply(intent, now);
        }
        if game.quit_requested() {
            return Ok(());
        }

        // ── Network ──
        for msg in worker.poll() {
            match msg {
                NetMessage::Reply(incoming) => game.on_reply(incoming, now),
                NetMessage::Connectivity(online) => install.on_connectivity(online, now),
            }
        }

        // ── Install helper ──
        for event in install.tick(now) {
            match event {
                InstallEvent::StartGame(difficulty) => game.launch(difficulty),
            }
        }
        if install.host_mut().take_reload() {
            game.show_welcome();
        }

        game.tick(now);
        for job in game.drain_outbox() {
            worker.send(job);
        }

        let events = game.drain_events();
        persist_settings(game, store, &events);
        if let Some(sfx) = sound {
            sfx.react(&events, game.settings().sound);
        }

        renderer.render(game, &install.notices(), now)?;
        std::thread::sleep(FRAME_SLEEP);
    }
}

fn persist_settings(game: &mut GameController, store: &mut LocalStore, events: &[GameEvent]) {
    for event in events {
        if let GameEvent::SettingsSaved(settings) = event {
            if let Err(e) = save_settings(store, settings) {
                tracing::warn!(error = %e, "settings not persisted");
                game.show_error("Failed to save settings.");
            }
        }
    }
}
