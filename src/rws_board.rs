// Board model and its rules
// Handles mine placement, adjacency counts, the random-walk reveal, flags and the win check

use rand::Rng;
use rand::seq::index;
use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use tracing::{debug, trace};

use crate::rws_dice::Dice;

/// Adjacency value reserved for a cell that holds a mine
pub const MINE: i8 = -1;

// Moore neighborhood, used for adjacency counts
const AROUND: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, -1),
    (0, 1),
];

/// Widest board the terminal layout can address: two columns per cell plus borders in a u16
pub const MAX_WIDTH: usize = (u16::MAX as usize - 3) / 2;
/// Tallest board the terminal layout can address: borders and the status row in a u16
pub const MAX_HEIGHT: usize = u16::MAX as usize - 5;

// Cascade steps: west, east, north, south
const STEPS: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];

/// Rejected board configurations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoardError {
    EmptyBoard { width: usize, height: usize },
    TooLarge { width: usize, height: usize },
    TooManyMines { mines: usize, cells: usize },
    InvalidCascade { sides: usize },
}

impl fmt::Display for BoardError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BoardError::EmptyBoard { width, height } => {
                write!(f, "board of {}x{} has no cells", width, height)
            }
            BoardError::TooLarge { width, height } => write!(
                f,
                "board of {}x{} exceeds the {}x{} limit",
                width, height, MAX_WIDTH, MAX_HEIGHT
            ),
            BoardError::TooManyMines { mines, cells } => write!(
                f,
                "{} mines do not fit on a board of {} cells (at least one must stay safe)",
                mines, cells
            ),
            BoardError::InvalidCascade { sides } => {
                write!(f, "cascade die needs at least one side, got {}", sides)
            }
        }
    }
}

impl Error for BoardError {}

/// Chance that the reveal cascade admits a candidate: a roll of `0..sides` below `accept_below`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CascadeOdds {
    pub sides: usize,
    pub accept_below: usize,
}

impl Default for CascadeOdds {
    fn default() -> Self {
        CascadeOdds {
            sides: 10,
            accept_below: 3,
        }
    }
}

impl CascadeOdds {
    fn admits(&self, dice: &mut impl Dice) -> bool {
        dice.roll(self.sides) < self.accept_below
    }
}

/// Validated board shape, mine quota and cascade odds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoardParams {
    width: usize,
    height: usize,
    mines: usize,
    cascade: CascadeOdds,
}

impl BoardParams {
    /// Check a configuration before any board is generated from it
    pub fn new(
        width: usize,
        height: usize,
        mines: usize,
        cascade: CascadeOdds,
    ) -> Result<Self, BoardError> {
        if width == 0 || height == 0 {
            return Err(BoardError::EmptyBoard { width, height });
        }
        if width > MAX_WIDTH || height > MAX_HEIGHT {
            return Err(BoardError::TooLarge { width, height });
        }
        let cells = width
            .checked_mul(height)
            .ok_or(BoardError::TooLarge { width, height })?;
        if mines >= cells {
            return Err(BoardError::TooManyMines { mines, cells });
        }
        if cascade.sides == 0 {
            return Err(BoardError::InvalidCascade {
                sides: cascade.sides,
            });
        }
        Ok(BoardParams {
            width,
            height,
            mines,
            cascade,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    /// Key used to file best times, e.g. "30x16:96"
    pub fn shape_key(&self) -> String {
        format!("{}x{}:{}", self.width, self.height, self.mines)
    }
}

/// A single grid position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell {
    pub revealed: bool, // Shown to the player, never undone
    pub flagged: bool,  // Player marker
    pub adjacent: i8,   // Mine neighbors (0-8), or MINE
}

impl Cell {
    pub fn is_mine(&self) -> bool {
        self.adjacent == MINE
    }
}

/// What the presentation layer should paint for a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisualKind {
    Tile,
    Flag,
    Number(u8),
    Mine,
}

/// Per-cell render descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileView {
    pub x: usize,
    pub y: usize,
    pub kind: VisualKind,
}

/// Effect of a reveal request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealResult {
    Ignored,               // Out of bounds, flagged or already open
    Mine,                  // The clicked cell was a mine
    Safe { opened: usize }, // Cells opened, the clicked one included
}

/// Minesweeper board: mines never move once generated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    width: usize,
    height: usize,
    mines: usize,
    cascade: CascadeOdds,
    cells: Vec<Cell>,          // Row-major, index = y * width + x
    flags_remaining: isize,    // Mines minus flags placed, may go negative
}

impl Board {
    /// Place the mine quota uniformly at random and compute adjacency counts
    pub fn generate<R: Rng + ?Sized>(params: &BoardParams, rng: &mut R) -> Self {
        let picks = index::sample(rng, params.width * params.height, params.mines);
        let board = Self::with_mine_indices(params, picks.into_vec());
        debug!(
            width = board.width,
            height = board.height,
            mines = board.mines,
            "generated board"
        );
        board
    }

    fn with_mine_indices(params: &BoardParams, mines: impl IntoIterator<Item = usize>) -> Self {
        let mut board = Board {
            width: params.width,
            height: params.height,
            mines: params.mines,
            cascade: params.cascade,
            cells: vec![Cell::default(); params.width * params.height],
            flags_remaining: params.mines as isize,
        };
        for i in mines {
            board.cells[i].adjacent = MINE;
        }
        debug_assert_eq!(
            board.cells.iter().filter(|c| c.is_mine()).count(),
            board.mines
        );
        // compute adjacency
        for y in 0..board.height {
            for x in 0..board.width {
                let idx = y * board.width + x;
                if board.cells[idx].is_mine() {
                    continue;
                }
                let count = AROUND
                    .iter()
                    .filter_map(|&(dx, dy)| board.index(x as isize + dx, y as isize + dy))
                    .filter(|&n| board.cells[n].is_mine())
                    .count();
                board.cells[idx].adjacent = count as i8;
            }
        }
        board
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn mines(&self) -> usize {
        self.mines
    }

    pub fn flags_remaining(&self) -> isize {
        self.flags_remaining
    }

    /// Flat index for (x, y), or None when off the board
    fn index(&self, x: isize, y: isize) -> Option<usize> {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return None;
        }
        Some(y as usize * self.width + x as usize)
    }

    pub fn cell(&self, x: isize, y: isize) -> Option<Cell> {
        self.index(x, y).map(|i| self.cells[i])
    }

    pub fn revealed_count(&self) -> usize {
        self.cells.iter().filter(|c| c.revealed).count()
    }

    pub fn flagged_count(&self) -> usize {
        self.cells.iter().filter(|c| c.flagged).count()
    }

    /// Reveal a cell; a safe cell starts a random walk over its orthogonal neighbors
    /// where each candidate opens only if the dice admit it
    pub fn reveal(&mut self, x: isize, y: isize, dice: &mut impl Dice) -> RevealResult {
        let Some(idx) = self.index(x, y) else {
            trace!(x, y, "reveal outside the board");
            return RevealResult::Ignored;
        };
        let cell = &mut self.cells[idx];
        if cell.flagged || cell.revealed {
            return RevealResult::Ignored;
        }
        cell.revealed = true;
        if cell.is_mine() {
            return RevealResult::Mine;
        }

        let mut opened = 1;
        let mut queue = VecDeque::from([idx]);
        while let Some(at) = queue.pop_front() {
            let (cx, cy) = ((at % self.width) as isize, (at / self.width) as isize);
            for (dx, dy) in STEPS {
                let Some(n) = self.index(cx + dx, cy + dy) else {
                    continue;
                };
                let next = self.cells[n];
                if next.revealed || next.is_mine() {
                    continue;
                }
                if self.cascade.admits(dice) {
                    self.cells[n].revealed = true;
                    opened += 1;
                    queue.push_back(n);
                }
            }
        }
        RevealResult::Safe { opened }
    }

    /// Flip the flag on an unrevealed cell; returns whether anything changed
    pub fn toggle_flag(&mut self, x: isize, y: isize) -> bool {
        let Some(idx) = self.index(x, y) else {
            trace!(x, y, "flag outside the board");
            return false;
        };
        let cell = &mut self.cells[idx];
        if cell.revealed {
            return false;
        }
        cell.flagged = !cell.flagged;
        if cell.flagged {
            self.flags_remaining -= 1;
        } else {
            self.flags_remaining += 1;
        }
        true
    }

    /// With the flag budget spent exactly, every flag must sit on a mine;
    /// otherwise every safe cell must be revealed
    pub fn check_win(&self) -> bool {
        if self.flags_remaining == 0 {
            self.cells.iter().all(|c| !c.flagged || c.is_mine())
        } else {
            self.cells.iter().all(|c| c.revealed || c.is_mine())
        }
    }

    pub fn tile(&self, x: usize, y: usize) -> Option<TileView> {
        let cell = self.cell(x as isize, y as isize)?;
        let kind = if cell.revealed {
            if cell.is_mine() {
                VisualKind::Mine
            } else {
                VisualKind::Number(cell.adjacent as u8)
            }
        } else if cell.flagged {
            VisualKind::Flag
        } else {
            VisualKind::Tile
        };
        Some(TileView { x, y, kind })
    }

    /// All render descriptors, row by row
    pub fn tiles(&self) -> impl Iterator<Item = TileView> + '_ {
        (0..self.height).flat_map(move |y| (0..self.width).filter_map(move |x| self.tile(x, y)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rws_dice::ScriptedDice;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn board_with(width: usize, height: usize, mines: &[(usize, usize)]) -> Board {
        let params = BoardParams::new(width, height, mines.len(), CascadeOdds::default()).unwrap();
        Board::with_mine_indices(&params, mines.iter().map(|&(x, y)| y * width + x))
    }

    fn recount(board: &Board, x: usize, y: usize) -> i8 {
        let mut n = 0;
        for (dx, dy) in AROUND {
            if let Some(c) = board.cell(x as isize + dx, y as isize + dy) {
                if c.is_mine() {
                    n += 1;
                }
            }
        }
        n
    }

    #[test]
    fn generated_boards_hold_the_quota_and_true_counts() {
        let params = BoardParams::new(30, 16, 30 * 16 / 5, CascadeOdds::default()).unwrap();
        for seed in 0..20 {
            let board = Board::generate(&params, &mut StdRng::seed_from_u64(seed));
            assert_eq!(board.cells.iter().filter(|c| c.is_mine()).count(), 96);
            assert_eq!(board.flags_remaining(), 96);
            assert_eq!(board.revealed_count(), 0);
            assert_eq!(board.flagged_count(), 0);
            for y in 0..16 {
                for x in 0..30 {
                    let c = board.cell(x as isize, y as isize).unwrap();
                    if !c.is_mine() {
                        assert_eq!(c.adjacent, recount(&board, x, y), "cell {},{}", x, y);
                    }
                }
            }
        }
    }

    #[test]
    fn same_seed_same_layout() {
        let params = BoardParams::new(9, 9, 10, CascadeOdds::default()).unwrap();
        let a = Board::generate(&params, &mut StdRng::seed_from_u64(42));
        let b = Board::generate(&params, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn params_reject_degenerate_boards() {
        let odds = CascadeOdds::default();
        assert_eq!(
            BoardParams::new(3, 3, 9, odds),
            Err(BoardError::TooManyMines { mines: 9, cells: 9 })
        );
        assert_eq!(
            BoardParams::new(0, 5, 0, odds),
            Err(BoardError::EmptyBoard { width: 0, height: 5 })
        );
        assert_eq!(
            BoardParams::new(3, 3, 1, CascadeOdds { sides: 0, accept_below: 0 }),
            Err(BoardError::InvalidCascade { sides: 0 })
        );
        assert!(BoardParams::new(3, 3, 8, odds).is_ok());
    }

    #[test]
    fn params_reject_boards_beyond_the_layout() {
        let odds = CascadeOdds::default();
        assert_eq!(
            BoardParams::new(MAX_WIDTH + 1, 1, 0, odds),
            Err(BoardError::TooLarge { width: MAX_WIDTH + 1, height: 1 })
        );
        assert_eq!(
            BoardParams::new(1, MAX_HEIGHT + 1, 0, odds),
            Err(BoardError::TooLarge { width: 1, height: MAX_HEIGHT + 1 })
        );
        assert!(matches!(
            BoardParams::new(usize::MAX, usize::MAX, 0, odds),
            Err(BoardError::TooLarge { .. })
        ));
        assert!(BoardParams::new(MAX_WIDTH, 1, 0, odds).is_ok());
        assert_eq!(MAX_WIDTH * 2 + 3, u16::MAX as usize);
    }

    #[test]
    fn reveal_is_idempotent() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        board.reveal(0, 0, &mut StdRng::seed_from_u64(1));
        let once = board.clone();
        assert_eq!(board.reveal(0, 0, &mut ScriptedDice::always()), RevealResult::Ignored);
        assert_eq!(board, once);
    }

    #[test]
    fn flagged_cell_cannot_be_revealed() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        board.toggle_flag(2, 2);
        let before = board.clone();
        assert_eq!(board.reveal(2, 2, &mut ScriptedDice::always()), RevealResult::Ignored);
        assert_eq!(board, before);
    }

    #[test]
    fn flag_then_unflag_restores_budget() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        assert!(board.toggle_flag(0, 2));
        assert_eq!(board.flags_remaining(), 0);
        assert!(board.toggle_flag(0, 2));
        assert_eq!(board.flags_remaining(), 1);
        assert!(!board.cell(0, 2).unwrap().flagged);
    }

    #[test]
    fn over_flagging_goes_negative() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        board.toggle_flag(0, 0);
        board.toggle_flag(1, 0);
        board.toggle_flag(2, 0);
        assert_eq!(board.flags_remaining(), -2);
    }

    #[test]
    fn revealed_cell_cannot_be_flagged() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        board.reveal(0, 0, &mut ScriptedDice::never());
        assert!(!board.toggle_flag(0, 0));
        assert_eq!(board.flags_remaining(), 1);
    }

    #[test]
    fn exact_flags_win() {
        let mut board = board_with(3, 3, &[(0, 0), (2, 2)]);
        board.toggle_flag(0, 0);
        assert!(!board.check_win());
        board.toggle_flag(2, 2);
        assert!(board.check_win());
        // one flag too many flips back to the reveal-everything rule
        board.toggle_flag(1, 1);
        assert!(!board.check_win());
    }

    #[test]
    fn spent_flags_on_a_safe_cell_do_not_win() {
        let mut board = board_with(3, 3, &[(0, 0), (2, 2)]);
        board.toggle_flag(0, 0);
        board.toggle_flag(1, 1);
        assert_eq!(board.flags_remaining(), 0);
        assert!(!board.check_win());
    }

    #[test]
    fn revealing_every_safe_cell_wins() {
        let mut board = board_with(3, 3, &[(0, 0), (2, 2)]);
        let mut dice = ScriptedDice::never();
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (0, 0) && (x, y) != (2, 2) {
                    board.reveal(x, y, &mut dice);
                }
            }
        }
        assert_eq!(board.flags_remaining(), 2);
        assert!(board.check_win());
    }

    #[test]
    fn corner_reveal_next_to_a_single_mine() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        board.reveal(0, 0, &mut StdRng::seed_from_u64(3));
        let corner = board.cell(0, 0).unwrap();
        assert!(corner.revealed);
        assert_eq!(corner.adjacent, 1);
        assert!(!board.cell(1, 1).unwrap().revealed);
    }

    #[test]
    fn revealing_the_mine_touches_nothing_else() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        let before = board.clone();
        let mut dice = ScriptedDice::always();
        assert_eq!(board.reveal(1, 1, &mut dice), RevealResult::Mine);
        assert_eq!(dice.used, 0);
        let mine = board.cell(1, 1).unwrap();
        assert!(mine.revealed);
        assert_eq!(mine.adjacent, MINE);
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (1, 1) {
                    assert_eq!(board.cell(x, y), before.cell(x, y));
                }
            }
        }
    }

    #[test]
    fn out_of_bounds_is_ignored() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        let before = board.clone();
        let mut dice = ScriptedDice::always();
        for (x, y) in [(-1, 0), (3, 0), (0, -1), (0, 3)] {
            assert_eq!(board.reveal(x, y, &mut dice), RevealResult::Ignored);
            assert!(!board.toggle_flag(x, y));
        }
        assert_eq!(dice.used, 0);
        assert_eq!(board, before);
        assert!(board.cell(-1, 0).is_none());
    }

    #[test]
    fn cascade_follows_the_dice() {
        let mut board = board_with(4, 4, &[(3, 3)]);
        // (1,0) in, (0,1) out, (2,0) in, (1,1) out, then everything out
        let mut dice = ScriptedDice::new(&[0, 9, 0, 9], 9);
        assert_eq!(board.reveal(0, 0, &mut dice), RevealResult::Safe { opened: 3 });
        assert_eq!(dice.used, 6);
        for y in 0..4 {
            for x in 0..4 {
                let open = board.cell(x, y).unwrap().revealed;
                assert_eq!(open, y == 0 && x < 3, "cell {},{}", x, y);
            }
        }
    }

    #[test]
    fn cascade_spreads_beside_mines_but_never_into_them() {
        let mut board = board_with(3, 3, &[(1, 1)]);
        assert_eq!(
            board.reveal(0, 0, &mut ScriptedDice::always()),
            RevealResult::Safe { opened: 8 }
        );
        assert!(!board.cell(1, 1).unwrap().revealed);
        assert!(board.check_win());
    }

    #[test]
    fn cascade_opens_flagged_cells() {
        let mut board = board_with(3, 1, &[]);
        board.toggle_flag(2, 0);
        board.reveal(0, 0, &mut ScriptedDice::always());
        assert_eq!(board.revealed_count(), 3);
        assert_eq!(board.tile(2, 0).unwrap().kind, VisualKind::Number(0));
    }

    #[test]
    fn tiles_describe_each_state() {
        let mut board = board_with(3, 1, &[(2, 0)]);
        board.toggle_flag(1, 0);
        board.reveal(0, 0, &mut ScriptedDice::never());
        board.reveal(2, 0, &mut ScriptedDice::never());
        let kinds: Vec<VisualKind> = board.tiles().map(|t| t.kind).collect();
        assert_eq!(kinds, vec![VisualKind::Number(0), VisualKind::Flag, VisualKind::Mine]);
        assert_eq!(board.tiles().count(), 3);
        assert!(board.tile(3, 0).is_none());
    }
}
