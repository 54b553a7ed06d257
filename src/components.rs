use crate::geometry::{Cell, Dir};
use crate::level::{GHOST_HOME, PAC_SPAWN};

pub const PAC_SPEED: f32 = 4.4; // tiles/second
pub const GHOST_SPEED: f32 = 4.0;
pub const FRIGHTENED_SPEED: f32 = 3.2;
pub const FRIGHTENED_MS: f64 = 6000.0;

/// Player actor. `progress` is the fractional advance toward the next cell
/// and always stays in [0,1); the simulation loop resolves overflow into
/// whole-cell steps.
#[derive(Clone, Debug)]
pub struct Pacman {
    pub cell: Cell,
    pub dir: Dir,
    pub next_dir: Dir,
    pub progress: f32,
    pub speed_tiles: f32,
    pub alive: bool,
    pub mouth_phase: f32,
}

impl Pacman {
    pub fn spawn() -> Pacman {
        Pacman {
            cell: PAC_SPAWN,
            dir: Dir::Left,
            next_dir: Dir::Left,
            progress: 0.0,
            speed_tiles: PAC_SPEED,
            alive: true,
            mouth_phase: 0.0,
        }
    }
}

/// The four fixed ghost identities. Each personality owns its spawn slot,
/// scatter corner, and chase-target computation (see `ghost::chase_target`).
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Personality {
    Blinky,
    Pinky,
    Inky,
    Clyde,
}

impl Personality {
    pub const ALL: [Personality; 4] = [
        Personality::Blinky,
        Personality::Pinky,
        Personality::Inky,
        Personality::Clyde,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Personality::Blinky => "blinky",
            Personality::Pinky => "pinky",
            Personality::Inky => "inky",
            Personality::Clyde => "clyde",
        }
    }

    pub fn spawn_cell(self) -> Cell {
        match self {
            Personality::Blinky => GHOST_HOME,
            Personality::Pinky => Cell::new(GHOST_HOME.r, GHOST_HOME.c - 1),
            Personality::Inky => Cell::new(GHOST_HOME.r, GHOST_HOME.c + 1),
            Personality::Clyde => Cell::new(GHOST_HOME.r - 1, GHOST_HOME.c),
        }
    }

    pub fn scatter_corner(self, rows: i32, cols: i32) -> Cell {
        match self {
            Personality::Blinky => Cell::new(0, cols - 1),
            Personality::Pinky => Cell::new(0, 0),
            Personality::Inky => Cell::new(rows - 1, cols - 1),
            Personality::Clyde => Cell::new(rows - 1, 0),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Ghost {
    pub personality: Personality,
    pub cell: Cell,
    pub dir: Dir,
    pub progress: f32,
    pub base_speed: f32,
    /// Captured while frightened; cleared on the next power pellet or when
    /// the eyes reach home.
    pub eaten: bool,
    /// Reduced to eyes, heading home, immune to recapture.
    pub eyes_home: bool,
}

impl Ghost {
    pub fn spawn(personality: Personality) -> Ghost {
        Ghost {
            personality,
            cell: personality.spawn_cell(),
            dir: Dir::Left,
            progress: 0.0,
            base_speed: GHOST_SPEED,
            eaten: false,
            eyes_home: false,
        }
    }
}
