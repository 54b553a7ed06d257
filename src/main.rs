use std::fs::OpenOptions;
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

use crossterm::cursor::{Hide, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::ExecutableCommand;

mod adaptive;
mod agent;
mod components;
mod game;
mod geometry;
mod ghost;
mod level;
mod render;

use game::Game;
use geometry::Dir;
use render::Renderer;

const DEFAULT_TICK_MS: u64 = 16;
const DEFAULT_RENDER_FPS: u64 = 60;
/// Time-delta ceiling in seconds; a backgrounded terminal must not let an
/// actor skip through a wall in one jump.
const MAX_DT: f32 = 0.05;

struct Config {
    tick_ms: u64,
    render_fps: u64,
    rl_path: PathBuf,
    log_path: PathBuf,
    start_auto: bool,
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn read_config() -> Config {
    Config {
        tick_ms: env_parse("PACMAN_TICK_MS")
            .filter(|v: &u64| *v > 0)
            .unwrap_or(DEFAULT_TICK_MS),
        render_fps: env_parse("PACMAN_FPS")
            .filter(|v: &u64| *v > 0)
            .unwrap_or(DEFAULT_RENDER_FPS),
        rl_path: std::env::var("PACMAN_RL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pacman_rl_state.json")),
        log_path: std::env::var("PACMAN_LOG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("pacman.log")),
        start_auto: std::env::var("PACMAN_AUTO").map(|v| v == "1").unwrap_or(false),
    }
}

/// Log to a file: the terminal belongs to the renderer. A failure to open
/// the log file just means no logs.
fn init_tracing(config: &Config) {
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.log_path)
    else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();
}

fn main() -> io::Result<()> {
    let config = read_config();
    init_tracing(&config);

    let mut stdout = io::stdout();
    terminal::enable_raw_mode()?;
    stdout.execute(EnterAlternateScreen)?;
    stdout.execute(Hide)?;

    let result = run(&mut stdout, &config);

    stdout.execute(Show)?;
    stdout.execute(LeaveAlternateScreen)?;
    terminal::disable_raw_mode()?;
    result
}

fn run(stdout: &mut Stdout, config: &Config) -> io::Result<()> {
    let start = Instant::now();
    let now_ms = |start: Instant| start.elapsed().as_secs_f64() * 1000.0;

    let mut rng = rand::thread_rng();
    let mut game = Game::new(now_ms(start));
    if config.start_auto {
        game.toggle_autonomous(Some(&config.rl_path));
    }
    let mut renderer = Renderer::new(game.level.cols() as usize, game.level.rows() as usize);
    let mut paused = false;
    let mut last_sim = Instant::now();
    let frame_time = Duration::from_micros(1_000_000 / config.render_fps.max(1));

    loop {
        let frame_start = Instant::now();

        while event::poll(Duration::from_millis(0))? {
            if let Event::Key(key) = event::read()? {
                if !matches!(key.kind, KeyEventKind::Press | KeyEventKind::Repeat) {
                    continue;
                }
                match key.code {
                    KeyCode::Char('q') => return Ok(()),
                    KeyCode::Char('r') => {
                        game.restart(now_ms(start));
                        paused = false;
                        last_sim = Instant::now();
                    }
                    KeyCode::Char('p') => paused = !paused,
                    KeyCode::Char('a') => game.toggle_autonomous(Some(&config.rl_path)),
                    KeyCode::Left | KeyCode::Char('h') => game.set_next_dir(Dir::Left),
                    KeyCode::Right | KeyCode::Char('l') => game.set_next_dir(Dir::Right),
                    KeyCode::Up | KeyCode::Char('k') => game.set_next_dir(Dir::Up),
                    KeyCode::Down | KeyCode::Char('j') => game.set_next_dir(Dir::Down),
                    _ => {}
                }
            }
        }

        let elapsed = last_sim.elapsed();
        if elapsed >= Duration::from_millis(config.tick_ms) {
            last_sim = Instant::now();
            if !paused {
                let dt = (elapsed.as_secs_f32()).min(MAX_DT);
                let now = now_ms(start);
                game.tick(dt, now, &mut rng);
                // Persistence sits at the loop boundary, outside the pure
                // update path.
                if let Some(agent) = game.agent.as_mut() {
                    if let Err(err) = agent.persist_if_dirty(&config.rl_path) {
                        tracing::warn!(error = %err, "failed to persist learning state");
                    }
                }
            }
        }

        render::render(stdout, &game, &mut renderer, now_ms(start), paused)?;

        let frame_elapsed = frame_start.elapsed();
        if frame_elapsed < frame_time {
            thread::sleep(frame_time - frame_elapsed);
        }
    }
}
