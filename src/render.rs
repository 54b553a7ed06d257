use std::io::{self, Stdout, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{Color, Print, ResetColor, SetForegroundColor};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::QueueableCommand;
use unicode_width::UnicodeWidthStr;

use crate::components::Personality;
use crate::game::Game;
use crate::geometry::{neighbor, Cell, Dir};

const CELL_W: usize = 2;

#[derive(Clone, Copy, PartialEq)]
enum Glyph {
    PlayerOpen,
    PlayerClosed,
    Ghost,
    Frightened,
    Eyes,
    Wall,
    Empty,
    Pellet,
    Power,
}

#[derive(Clone, Copy, PartialEq)]
struct CellView {
    glyph: Glyph,
    color: Color,
}

pub struct Renderer {
    last: Vec<CellView>,
    last_hud: String,
    needs_full: bool,
    origin_x: u16,
    origin_y: u16,
}

impl Renderer {
    pub fn new(width: usize, height: usize) -> Renderer {
        Renderer {
            last: vec![
                CellView {
                    glyph: Glyph::Empty,
                    color: Color::Reset,
                };
                width * height
            ],
            last_hud: String::new(),
            needs_full: true,
            origin_x: 0,
            origin_y: 1,
        }
    }
}

fn ghost_color(p: Personality) -> Color {
    match p {
        Personality::Blinky => Color::Red,
        Personality::Pinky => Color::Magenta,
        Personality::Inky => Color::Cyan,
        Personality::Clyde => Color::DarkYellow,
    }
}

/// Terminal cells are coarse, so actors display on the cell nearest their
/// interpolated position: past the halfway point they show on the next cell.
fn display_cell(cell: Cell, dir: Dir, progress: f32, cols: i32) -> Cell {
    if progress >= 0.5 {
        neighbor(cell, dir, cols)
    } else {
        cell
    }
}

fn view_for(game: &Game, pos: Cell, now_ms: f64) -> CellView {
    let cols = game.level.cols();
    let pac = &game.pacman;
    if display_cell(pac.cell, pac.dir, pac.progress, cols) == pos {
        let glyph = if pac.mouth_phase.cos() > 0.0 {
            Glyph::PlayerOpen
        } else {
            Glyph::PlayerClosed
        };
        return CellView {
            glyph,
            color: Color::Yellow,
        };
    }
    let frightened = game.frightened_active(now_ms);
    for g in &game.ghosts {
        if display_cell(g.cell, g.dir, g.progress, cols) != pos {
            continue;
        }
        if g.eyes_home {
            return CellView {
                glyph: Glyph::Eyes,
                color: Color::White,
            };
        }
        if frightened && !g.eaten {
            return CellView {
                glyph: Glyph::Frightened,
                color: Color::Blue,
            };
        }
        return CellView {
            glyph: Glyph::Ghost,
            color: ghost_color(g.personality),
        };
    }
    if game.level.is_wall(pos.r, pos.c) {
        return CellView {
            glyph: Glyph::Wall,
            color: Color::Blue,
        };
    }
    if game.level.is_pellet(pos.r, pos.c) {
        return CellView {
            glyph: Glyph::Pellet,
            color: Color::White,
        };
    }
    if game.level.is_power(pos.r, pos.c) {
        return CellView {
            glyph: Glyph::Power,
            color: Color::Magenta,
        };
    }
    CellView {
        glyph: Glyph::Empty,
        color: Color::Reset,
    }
}

pub fn render(
    stdout: &mut Stdout,
    game: &Game,
    renderer: &mut Renderer,
    now_ms: f64,
    paused: bool,
) -> io::Result<()> {
    let rows = game.level.rows() as usize;
    let cols = game.level.cols() as usize;
    let needed_h = (rows + 3) as u16;
    let needed_w = (cols * CELL_W) as u16;

    stdout.queue(MoveTo(0, 0))?;

    let (term_w, term_h) = terminal::size()?;
    if term_w < needed_w || term_h < needed_h {
        stdout.queue(Clear(ClearType::All))?;
        let msg = format!(
            "Terminal too small. Need at least {}x{} (cols x rows). Current: {}x{}.",
            needed_w, needed_h, term_w, term_h
        );
        stdout.queue(Print(msg))?;
        stdout.flush()?;
        renderer.needs_full = true;
        return Ok(());
    }

    let origin_x = (term_w - needed_w) / 2;
    let origin_y = (term_h - needed_h) / 2 + 1;
    if origin_x != renderer.origin_x || origin_y != renderer.origin_y {
        renderer.origin_x = origin_x;
        renderer.origin_y = origin_y;
        renderer.needs_full = true;
    }

    let mode = if game.autonomous {
        let (epsilon, episode) = game
            .agent
            .as_ref()
            .map(|a| (a.persisted.params.epsilon, a.persisted.metrics.episode))
            .unwrap_or((0.0, 0));
        format!("AUTO eps={:.3} ep={}", epsilon, episode)
    } else {
        "MANUAL".to_string()
    };
    let hud = format!(
        "Score: {}  Lives: {}  Level: {}  Pellets: {}  [{}]{}  (q quit, p pause, a auto, r restart)",
        game.score,
        game.lives,
        game.level_num,
        game.pellets_left,
        mode,
        if paused { "  PAUSED" } else { "" }
    );
    if renderer.needs_full || hud != renderer.last_hud {
        stdout.queue(MoveTo(renderer.origin_x, renderer.origin_y - 1))?;
        stdout.queue(SetForegroundColor(Color::White))?;
        stdout.queue(Clear(ClearType::CurrentLine))?;
        stdout.queue(Print(&hud))?;
        stdout.queue(ResetColor)?;
        renderer.last_hud = hud;
    }

    for r in 0..rows {
        for c in 0..cols {
            let view = view_for(game, Cell::new(r as i32, c as i32), now_ms);
            let idx = r * cols + c;
            if renderer.needs_full || view != renderer.last[idx] {
                renderer.last[idx] = view;
                draw_cell(stdout, renderer, c, r, view)?;
            }
        }
    }
    renderer.needs_full = false;

    let status_y = renderer.origin_y + rows as u16;
    stdout.queue(MoveTo(renderer.origin_x, status_y))?;
    stdout.queue(Clear(ClearType::CurrentLine))?;
    if game.game_over {
        stdout.queue(SetForegroundColor(Color::Red))?;
        stdout.queue(Print(format!(
            "GAME OVER - Final Score: {} (r to restart, q to quit)",
            game.score
        )))?;
        stdout.queue(ResetColor)?;
    } else if game.won {
        stdout.queue(SetForegroundColor(Color::Green))?;
        stdout.queue(Print("Level complete! Loading next..."))?;
        stdout.queue(ResetColor)?;
    }

    stdout.flush()?;
    Ok(())
}

fn draw_cell(
    stdout: &mut Stdout,
    renderer: &Renderer,
    x: usize,
    y: usize,
    view: CellView,
) -> io::Result<()> {
    let text = match view.glyph {
        Glyph::PlayerOpen => "😃",
        Glyph::PlayerClosed => "😶",
        Glyph::Ghost => "👻",
        Glyph::Frightened => "😱",
        Glyph::Eyes => "👀",
        Glyph::Wall => "██",
        Glyph::Empty => "  ",
        Glyph::Pellet => "· ",
        Glyph::Power => "● ",
    };
    let x_pos = renderer.origin_x + (x * CELL_W) as u16;
    let y_pos = renderer.origin_y + y as u16;
    stdout.queue(MoveTo(x_pos, y_pos))?;
    stdout.queue(SetForegroundColor(view.color))?;
    stdout.queue(Print(text))?;
    let w = UnicodeWidthStr::width(text);
    if w < CELL_W {
        for _ in 0..(CELL_W - w) {
            stdout.queue(Print(' '))?;
        }
    }
    stdout.queue(ResetColor)?;
    Ok(())
}
