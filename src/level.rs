use std::collections::VecDeque;

use crate::geometry::Cell;

/// Pac-Man spawn; also the seed for pellet reachability pruning.
pub const PAC_SPAWN: Cell = Cell { r: 11, c: 9 };
/// Cell eyes-mode ghosts return to.
pub const GHOST_HOME: Cell = Cell { r: 8, c: 9 };

/// Row span of the ghost house that must stay pellet-free.
const HOUSE_ROW: i32 = 8;
const HOUSE_COLS: std::ops::RangeInclusive<i32> = 7..=11;

const WALL: char = '#';
const PELLET: char = '.';
const POWER: char = 'o';
const FLOOR: char = ' ';

const MAP_VARIANT_1: [&str; 16] = [
    "###################",
    "#........#........#",
    "#.####.#.#.#.####.#",
    "#o#  #.#.#.#.#  #o#",
    "#.####.#.#.#.####.#",
    "#.................#",
    "#####.#.#####.#.###",
    "#####.#.#####.#.###",
    "#.....#...GG..#...#",
    "###.#.#######.#.###",
    "#...#...###...#...#",
    "#.#####.#.#.#####.#",
    "#o....#.#.#.#....o#",
    "#####.#.#.#.#.#####",
    "#.....#.....#.....#",
    "###################",
];

const MAP_VARIANT_2: [&str; 16] = [
    "###################",
    "#o.......#.......o#",
    "#.#####.#.#.#####.#",
    "#.....#.......#...#",
    "###.#.###.###.#.###",
    "#.................#",
    "#####.#.#####.#.###",
    "#####.#.#####.#.###",
    "#.....#...GG..#...#",
    "###.#.#######.#.###",
    "#.......###.......#",
    "#.###.#.......###.#",
    "#o..#.#.###.#.#..o#",
    "#.#.#.#.#.#.#.#.#.#",
    "#.................#",
    "###################",
];

const MAP_VARIANT_3: [&str; 16] = [
    "###################",
    "#o...............o#",
    "#.###.##.#.##.###.#",
    "#.................#",
    "#.##.###.#.###.##.#",
    "#.................#",
    "#####.#.#####.#.###",
    "#####.#.#####.#.###",
    "#.....#...GG..#...#",
    "###.#.#######.#.###",
    "#...#....#....#...#",
    "#.#.#.###.###.#.#.#",
    "#o...............o#",
    "#.#####.###.#####.#",
    "#.................#",
    "###################",
];

const MAP_VARIANTS: [&[&str; 16]; 3] = [&MAP_VARIANT_1, &MAP_VARIANT_2, &MAP_VARIANT_3];

/// Mutable character-grid level store. Walls are `#`, pellets `.`, power
/// pellets `o`, ghost-house markers `G`, bare floor ` `. Everything except
/// `#` is walkable.
pub struct Level {
    grid: Vec<Vec<char>>,
}

impl Level {
    /// Install the map variant for a 1-based level number and prune
    /// unreachable pellets.
    pub fn for_level(level: u32) -> Level {
        let idx = ((level.max(1) - 1) as usize) % MAP_VARIANTS.len();
        let grid = MAP_VARIANTS[idx]
            .iter()
            .map(|row| row.chars().collect())
            .collect();
        let mut lv = Level { grid };
        lv.sanitize_pellets();
        lv
    }

    pub fn rows(&self) -> i32 {
        self.grid.len() as i32
    }

    pub fn cols(&self) -> i32 {
        self.grid[0].len() as i32
    }

    fn in_bounds(&self, r: i32, c: i32) -> bool {
        r >= 0 && r < self.rows() && c >= 0 && c < self.cols()
    }

    pub fn char_at(&self, r: i32, c: i32) -> Option<char> {
        if self.in_bounds(r, c) {
            Some(self.grid[r as usize][c as usize])
        } else {
            None
        }
    }

    /// Out of bounds counts as wall.
    pub fn is_wall(&self, r: i32, c: i32) -> bool {
        match self.char_at(r, c) {
            Some(ch) => ch == WALL,
            None => true,
        }
    }

    pub fn is_pellet(&self, r: i32, c: i32) -> bool {
        self.char_at(r, c) == Some(PELLET)
    }

    pub fn is_power(&self, r: i32, c: i32) -> bool {
        self.char_at(r, c) == Some(POWER)
    }

    pub fn replace_cell(&mut self, r: i32, c: i32, ch: char) {
        if self.in_bounds(r, c) {
            self.grid[r as usize][c as usize] = ch;
        }
    }

    pub fn clear_cell(&mut self, r: i32, c: i32) {
        self.replace_cell(r, c, FLOOR);
    }

    pub fn pellets_left(&self) -> usize {
        self.grid
            .iter()
            .flatten()
            .filter(|&&ch| ch == PELLET || ch == POWER)
            .count()
    }

    /// Turn every bare floor cell into a pellet, except the ghost-house
    /// span, then prune whatever ended up unreachable.
    pub fn auto_fill_pellets(&mut self) {
        for r in 0..self.rows() {
            for c in 0..self.cols() {
                if self.char_at(r, c) == Some(FLOOR) {
                    if r == HOUSE_ROW && HOUSE_COLS.contains(&c) {
                        continue;
                    }
                    self.replace_cell(r, c, PELLET);
                }
            }
        }
        self.sanitize_pellets();
    }

    /// Remove pellets with no path from the Pac-Man spawn. BFS honors the
    /// horizontal tunnel wrap so edge corridors stay connected.
    fn sanitize_pellets(&mut self) {
        let rows = self.rows();
        let cols = self.cols();
        let mut visited = vec![vec![false; cols as usize]; rows as usize];
        let mut queue = VecDeque::new();
        if !self.is_wall(PAC_SPAWN.r, PAC_SPAWN.c) {
            visited[PAC_SPAWN.r as usize][PAC_SPAWN.c as usize] = true;
            queue.push_back((PAC_SPAWN.r, PAC_SPAWN.c));
        }
        while let Some((r, c)) = queue.pop_front() {
            for (dr, dc) in [(1, 0), (-1, 0), (0, 1), (0, -1)] {
                let nr = r + dr;
                let mut nc = c + dc;
                if nc < 0 {
                    nc = cols - 1;
                }
                if nc >= cols {
                    nc = 0;
                }
                if nr < 0 || nr >= rows {
                    continue;
                }
                if visited[nr as usize][nc as usize] || self.is_wall(nr, nc) {
                    continue;
                }
                visited[nr as usize][nc as usize] = true;
                queue.push_back((nr, nc));
            }
        }
        for r in 0..rows {
            for c in 0..cols {
                let ch = self.grid[r as usize][c as usize];
                if (ch == PELLET || ch == POWER) && !visited[r as usize][c as usize] {
                    self.grid[r as usize][c as usize] = FLOOR;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_are_rectangular() {
        for variant in MAP_VARIANTS {
            for row in variant.iter() {
                assert_eq!(row.chars().count(), 19, "ragged row: {row:?}");
            }
        }
    }

    #[test]
    fn spawn_cells_are_walkable() {
        for level in 1..=3 {
            let lv = Level::for_level(level);
            assert!(!lv.is_wall(PAC_SPAWN.r, PAC_SPAWN.c));
            assert!(!lv.is_wall(GHOST_HOME.r, GHOST_HOME.c));
        }
    }

    #[test]
    fn out_of_bounds_is_wall() {
        let lv = Level::for_level(1);
        assert!(lv.is_wall(-1, 0));
        assert!(lv.is_wall(0, lv.cols()));
        assert!(lv.is_wall(lv.rows(), 0));
    }

    #[test]
    fn variant_selection_cycles() {
        let a = Level::for_level(1);
        let b = Level::for_level(4);
        assert_eq!(a.grid, b.grid);
        let c = Level::for_level(2);
        assert_ne!(a.grid, c.grid);
    }

    #[test]
    fn pellet_consumption_shrinks_count() {
        let mut lv = Level::for_level(1);
        let before = lv.pellets_left();
        assert!(lv.is_pellet(1, 1));
        lv.clear_cell(1, 1);
        assert_eq!(lv.pellets_left(), before - 1);
    }

    #[test]
    fn sanitize_prunes_unreachable_pellets() {
        let mut lv = Level::for_level(1);
        // Strand a pellet in the variant-1 wall pocket on row 3 by sealing
        // the only horizontal access.
        lv.replace_cell(3, 2, WALL);
        lv.replace_cell(3, 4, WALL);
        lv.replace_cell(3, 3, PELLET);
        lv.sanitize_pellets();
        assert!(!lv.is_pellet(3, 3));
    }

    #[test]
    fn house_span_stays_pellet_free_after_refill() {
        let mut lv = Level::for_level(1);
        lv.auto_fill_pellets();
        for c in HOUSE_COLS {
            assert!(!lv.is_pellet(HOUSE_ROW, c));
        }
    }
}
