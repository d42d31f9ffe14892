use serde::{Deserialize, Serialize};

use super::{grid::Grid, kick_table};

/// Integer cell coordinate or offset (`x` rightward, `y` upward).
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Add,
    derive_more::Sub,
    derive_more::AddAssign,
)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Type of piece (tetromino).
///
/// The declaration order is the base order of a fresh bag before shuffling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PieceKind {
    /// I-piece.
    I = 0,
    /// O-piece.
    O = 1,
    /// T-piece.
    T = 2,
    /// S-piece.
    S = 3,
    /// Z-piece.
    Z = 4,
    /// J-piece.
    J = 5,
    /// L-piece.
    L = 6,
}

impl PieceKind {
    /// Number of piece types (7).
    pub const LEN: usize = 7;

    /// All kinds in base bag order.
    pub const ALL: [Self; Self::LEN] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::T,
        PieceKind::S,
        PieceKind::Z,
        PieceKind::J,
        PieceKind::L,
    ];

    /// Relative cell offsets of the piece in its spawn orientation.
    ///
    /// The first offset is always the anchor cell `(0, 0)`.
    #[must_use]
    pub const fn spawn_cells(self) -> [Position; 4] {
        const fn p(x: i32, y: i32) -> Position {
            Position::new(x, y)
        }
        match self {
            PieceKind::I => [p(0, 0), p(-1, 0), p(1, 0), p(2, 0)],
            PieceKind::O => [p(0, 0), p(1, 0), p(0, 1), p(1, 1)],
            PieceKind::T => [p(0, 0), p(-1, 0), p(1, 0), p(0, 1)],
            PieceKind::S => [p(0, 0), p(-1, 0), p(0, 1), p(1, 1)],
            PieceKind::Z => [p(0, 0), p(1, 0), p(0, 1), p(-1, 1)],
            PieceKind::J => [p(0, 0), p(-1, 0), p(1, 0), p(-1, 1)],
            PieceKind::L => [p(0, 0), p(-1, 0), p(1, 0), p(1, 1)],
        }
    }

    /// Returns the single character representation of this piece kind.
    ///
    /// # Examples
    ///
    /// ```
    /// use tetrevo_engine::PieceKind;
    ///
    /// assert_eq!(PieceKind::I.as_char(), 'I');
    /// assert_eq!(PieceKind::T.as_char(), 'T');
    /// ```
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            PieceKind::I => 'I',
            PieceKind::O => 'O',
            PieceKind::T => 'T',
            PieceKind::S => 'S',
            PieceKind::Z => 'Z',
            PieceKind::J => 'J',
            PieceKind::L => 'L',
        }
    }

    /// Parses a piece kind from a single character.
    #[must_use]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(PieceKind::I),
            'O' => Some(PieceKind::O),
            'T' => Some(PieceKind::T),
            'S' => Some(PieceKind::S),
            'Z' => Some(PieceKind::Z),
            'J' => Some(PieceKind::J),
            'L' => Some(PieceKind::L),
            _ => None,
        }
    }
}

/// Orientation of a piece, counted in clockwise quarter turns from spawn.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Up,
    Right,
    Down,
    Left,
}

impl Orientation {
    /// Number of clockwise quarter turns from [`Orientation::Up`].
    #[must_use]
    pub const fn index(self) -> usize {
        match self {
            Orientation::Up => 0,
            Orientation::Right => 1,
            Orientation::Down => 2,
            Orientation::Left => 3,
        }
    }

    const fn from_index(index: usize) -> Self {
        match index % 4 {
            0 => Orientation::Up,
            1 => Orientation::Right,
            2 => Orientation::Down,
            _ => Orientation::Left,
        }
    }

    #[must_use]
    pub const fn rotated(self, direction: RotationDirection) -> Self {
        match direction {
            RotationDirection::Clockwise => Self::from_index(self.index() + 1),
            RotationDirection::CounterClockwise => Self::from_index(self.index() + 3),
        }
    }
}

/// Single-cell translation direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    /// Unused by gameplay; kept for symmetry.
    Up,
    Down,
}

impl Direction {
    #[must_use]
    pub const fn offset(self) -> Position {
        match self {
            Direction::Left => Position::new(-1, 0),
            Direction::Right => Position::new(1, 0),
            Direction::Up => Position::new(0, 1),
            Direction::Down => Position::new(0, -1),
        }
    }
}

/// Direction of a single quarter turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationDirection {
    Clockwise,
    CounterClockwise,
}

impl RotationDirection {
    /// Applies the rotation matrix to a relative cell offset.
    #[must_use]
    pub const fn apply(self, cell: Position) -> Position {
        match self {
            RotationDirection::Clockwise => Position::new(cell.y, -cell.x),
            RotationDirection::CounterClockwise => Position::new(-cell.y, cell.x),
        }
    }
}

/// Rotation request, numbered the way move sequences encode it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationKind {
    /// No rotation; always succeeds.
    None = 0,
    CounterClockwise = 1,
    Clockwise = 2,
    /// Half turn made of two quarter turns.
    Half = 3,
}

impl RotationKind {
    /// Decodes a rotation amount (`0..=3`).
    #[must_use]
    pub const fn from_value(value: i8) -> Option<Self> {
        match value {
            0 => Some(RotationKind::None),
            1 => Some(RotationKind::CounterClockwise),
            2 => Some(RotationKind::Clockwise),
            3 => Some(RotationKind::Half),
            _ => None,
        }
    }
}

/// How the piece reached its current state; decides T-spin scoring on lock.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, derive_more::IsVariant)]
pub enum LastAction {
    #[default]
    Move,
    TSpin,
    MiniTSpin,
}

/// A falling piece.
///
/// Pieces are plain values: movement and rotation return a new `Piece` when the
/// target cells are valid on the given grid, and `None` otherwise, so a
/// rejected operation never changes anything.
///
/// # Example
///
/// ```
/// use tetrevo_engine::{Direction, Grid, Piece, PieceKind, Position, RotationDirection};
///
/// let grid = Grid::new(10, 20);
/// let piece = Piece::spawn(PieceKind::T, Position::new(4, 16));
/// let moved = piece.moved(Direction::Left, &grid).unwrap();
/// let rotated = moved.rotated(RotationDirection::Clockwise, &grid).unwrap();
/// assert_eq!(rotated.anchor(), Position::new(3, 16));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    kind: PieceKind,
    orientation: Orientation,
    anchor: Position,
    cells: [Position; 4],
    last_action: LastAction,
}

impl Piece {
    /// Creates a piece in spawn orientation with its anchor at `anchor`.
    #[must_use]
    pub const fn spawn(kind: PieceKind, anchor: Position) -> Self {
        Self {
            kind,
            orientation: Orientation::Up,
            anchor,
            cells: kind.spawn_cells(),
            last_action: LastAction::Move,
        }
    }

    #[must_use]
    pub fn kind(&self) -> PieceKind {
        self.kind
    }

    #[must_use]
    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    #[must_use]
    pub fn anchor(&self) -> Position {
        self.anchor
    }

    /// Cell offsets relative to the anchor.
    #[must_use]
    pub fn cells(&self) -> [Position; 4] {
        self.cells
    }

    #[must_use]
    pub fn last_action(&self) -> LastAction {
        self.last_action
    }

    /// Cell positions on the grid.
    #[must_use]
    pub fn absolute_cells(&self) -> [Position; 4] {
        self.cells.map(|c| self.anchor + c)
    }

    /// Returns `true` if every cell of the piece is in bounds and empty.
    #[must_use]
    pub fn fits(&self, grid: &Grid) -> bool {
        self.absolute_cells()
            .iter()
            .all(|&pos| grid.is_valid_position(pos))
    }

    /// Translates the piece by one cell.
    #[must_use]
    pub fn moved(&self, direction: Direction, grid: &Grid) -> Option<Self> {
        let piece = Self {
            anchor: self.anchor + direction.offset(),
            last_action: LastAction::Move,
            ..*self
        };
        piece.fits(grid).then_some(piece)
    }

    /// Moves the piece down until it rests on the floor or a block.
    #[must_use]
    pub fn dropped(&self, grid: &Grid) -> Self {
        let mut dropped = *self;
        while let Some(piece) = dropped.moved(Direction::Down, grid) {
            dropped = piece;
        }
        dropped
    }

    /// Applies a rotation request. [`RotationKind::None`] returns the piece unchanged.
    #[must_use]
    pub fn rotated_by(&self, kind: RotationKind, grid: &Grid) -> Option<Self> {
        match kind {
            RotationKind::None => Some(*self),
            RotationKind::CounterClockwise => {
                self.rotated(RotationDirection::CounterClockwise, grid)
            }
            RotationKind::Clockwise => self.rotated(RotationDirection::Clockwise, grid),
            RotationKind::Half => self.half_turned(grid),
        }
    }

    /// Quarter turn with wall kicks.
    ///
    /// Each candidate offset from the kind's offset table is tried in order; the
    /// first one placing every rotated cell on a valid position wins and moves
    /// the anchor. T pieces are then classified for T-spins.
    #[must_use]
    pub fn rotated(&self, direction: RotationDirection, grid: &Grid) -> Option<Self> {
        let target = self.orientation.rotated(direction);
        let cells = self.cells.map(|c| direction.apply(c));
        let offset = kick_table::kick_offsets(self.kind, self.orientation, target)
            .into_iter()
            .find(|&offset| {
                cells
                    .iter()
                    .all(|&c| grid.is_valid_position(self.anchor + offset + c))
            })?;
        let mut piece = Self {
            orientation: target,
            anchor: self.anchor + offset,
            cells,
            last_action: LastAction::Move,
            ..*self
        };
        piece.last_action = piece.spin_kind(grid);
        Some(piece)
    }

    /// Half turn: two counter-clockwise quarter turns, or failing that, two
    /// clockwise ones.
    #[must_use]
    pub fn half_turned(&self, grid: &Grid) -> Option<Self> {
        [
            RotationDirection::CounterClockwise,
            RotationDirection::Clockwise,
        ]
        .into_iter()
        .find_map(|direction| self.rotated(direction, grid)?.rotated(direction, grid))
    }

    /// Classifies a just-rotated piece by its diagonal neighbours.
    ///
    /// Corners are A (up-left), B (up-right), C (down-left), D (down-right),
    /// each set when occupied or out of bounds, relabelled once per quarter
    /// turn of the current orientation.
    fn spin_kind(&self, grid: &Grid) -> LastAction {
        if self.kind != PieceKind::T {
            return LastAction::Move;
        }
        let blocked = |dx, dy| !grid.is_valid_position(self.anchor + Position::new(dx, dy));
        let (mut a, mut b, mut c, mut d) =
            (blocked(-1, 1), blocked(1, 1), blocked(-1, -1), blocked(1, -1));
        for _ in 0..self.orientation.index() {
            (a, b, c, d) = (c, a, d, b);
        }
        if a && b && (c || d) {
            LastAction::TSpin
        } else if c && d && (a || b) {
            LastAction::MiniTSpin
        } else {
            LastAction::Move
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Cell;

    const SPAWN: Position = Position::new(4, 16);

    fn empty_grid() -> Grid {
        Grid::new(10, 20)
    }

    #[test]
    fn test_orientation_rotation_wraps() {
        use RotationDirection::{Clockwise as Cw, CounterClockwise as Ccw};
        assert_eq!(Orientation::Up.rotated(Cw), Orientation::Right);
        assert_eq!(Orientation::Left.rotated(Cw), Orientation::Up);
        assert_eq!(Orientation::Up.rotated(Ccw), Orientation::Left);
        assert_eq!(Orientation::Right.rotated(Ccw), Orientation::Up);
    }

    #[test]
    fn test_rotation_matrix() {
        let cell = Position::new(0, 1);
        assert_eq!(
            RotationDirection::Clockwise.apply(cell),
            Position::new(1, 0)
        );
        assert_eq!(
            RotationDirection::CounterClockwise.apply(cell),
            Position::new(-1, 0)
        );
    }

    #[test]
    fn test_rotation_kind_from_value() {
        assert_eq!(RotationKind::from_value(0), Some(RotationKind::None));
        assert_eq!(RotationKind::from_value(3), Some(RotationKind::Half));
        assert_eq!(RotationKind::from_value(4), None);
        assert_eq!(RotationKind::from_value(-1), None);
    }

    #[test]
    fn test_move_rejected_at_wall() {
        let grid = empty_grid();
        // I spans x-1..=x+2, so anchor x = 1 touches the left wall
        let piece = Piece::spawn(PieceKind::I, Position::new(1, 16));
        assert!(piece.moved(Direction::Left, &grid).is_none());
        let moved = piece.moved(Direction::Right, &grid).unwrap();
        assert_eq!(moved.anchor(), Position::new(2, 16));
    }

    #[test]
    fn test_dropped_rests_on_floor_and_blocks() {
        let mut grid = empty_grid();
        let piece = Piece::spawn(PieceKind::O, SPAWN);
        assert_eq!(piece.dropped(&grid).anchor(), Position::new(4, 0));

        grid.set(Position::new(5, 3), Cell::Block(PieceKind::L));
        assert_eq!(piece.dropped(&grid).anchor(), Position::new(4, 4));
    }

    #[test]
    fn test_o_rotation_keeps_cells_everywhere_inside() {
        let grid = empty_grid();
        for x in 0..9 {
            for y in 0..19 {
                let piece = Piece::spawn(PieceKind::O, Position::new(x, y));
                let mut before = piece.absolute_cells();
                before.sort_by_key(|p| (p.x, p.y));
                for direction in [
                    RotationDirection::Clockwise,
                    RotationDirection::CounterClockwise,
                ] {
                    let rotated = piece.rotated(direction, &grid).unwrap();
                    let mut after = rotated.absolute_cells();
                    after.sort_by_key(|p| (p.x, p.y));
                    assert_eq!(before, after, "O at ({x}, {y})");
                }
            }
        }
    }

    #[test]
    fn test_rotation_uses_first_kick_when_free() {
        let grid = empty_grid();
        let piece = Piece::spawn(PieceKind::T, SPAWN);
        let rotated = piece
            .rotated(RotationDirection::Clockwise, &grid)
            .unwrap();
        assert_eq!(rotated.orientation(), Orientation::Right);
        assert_eq!(rotated.anchor(), SPAWN);
        assert_eq!(
            rotated.cells(),
            [
                Position::new(0, 0),
                Position::new(0, 1),
                Position::new(0, -1),
                Position::new(1, 0),
            ]
        );
    }

    #[test]
    fn test_rotation_kicks_off_the_wall() {
        let grid = empty_grid();
        // J rotated right sits in columns 0..=1 with its anchor on column 0
        let piece = Piece::spawn(PieceKind::J, Position::new(1, 10))
            .rotated(RotationDirection::Clockwise, &grid)
            .unwrap()
            .moved(Direction::Left, &grid)
            .unwrap();
        assert_eq!(piece.anchor().x, 0);
        // back to Up needs column -1, so the second candidate (+1, 0) applies
        let rotated = piece
            .rotated(RotationDirection::CounterClockwise, &grid)
            .unwrap();
        assert_eq!(rotated.orientation(), Orientation::Up);
        assert_eq!(rotated.anchor(), Position::new(1, 10));
    }

    #[test]
    fn test_blocked_rotation_fails_without_change() {
        let mut grid = empty_grid();
        for y in 0..20 {
            for x in 0..10 {
                grid.set(Position::new(x, y), Cell::Block(PieceKind::Z));
            }
        }
        let anchor = Position::new(4, 10);
        for kind in [
            PieceKind::I,
            PieceKind::T,
            PieceKind::S,
            PieceKind::Z,
            PieceKind::J,
            PieceKind::L,
        ] {
            let piece = Piece::spawn(kind, anchor);
            // carve the spawn footprint out of a full board
            for pos in piece.absolute_cells() {
                grid.set(pos, Cell::Empty);
            }
            for direction in [
                RotationDirection::Clockwise,
                RotationDirection::CounterClockwise,
            ] {
                assert!(piece.rotated(direction, &grid).is_none(), "{kind:?}");
            }
            assert!(piece.half_turned(&grid).is_none(), "{kind:?}");
            for pos in piece.absolute_cells() {
                grid.set(pos, Cell::Block(PieceKind::Z));
            }
        }
    }

    #[test]
    fn test_half_turn_reaches_down_orientation() {
        let grid = empty_grid();
        let piece = Piece::spawn(PieceKind::L, Position::new(4, 10));
        let turned = piece.half_turned(&grid).unwrap();
        assert_eq!(turned.orientation(), Orientation::Down);
        assert_eq!(
            turned.rotated_by(RotationKind::None, &grid),
            Some(turned)
        );
    }

    #[test]
    fn test_half_turn_falls_back_to_clockwise() {
        let mut grid = empty_grid();
        // every counter-clockwise kick of the first quarter turn lands on a
        // block, while the clockwise path kicks one column left
        for (x, y) in [(4, 9), (5, 9), (5, 11), (2, 9), (2, 11)] {
            grid.set(Position::new(x, y), Cell::Block(PieceKind::Z));
        }
        let piece = Piece::spawn(PieceKind::T, Position::new(4, 10));
        assert!(
            piece
                .rotated(RotationDirection::CounterClockwise, &grid)
                .is_none()
        );

        let turned = piece.half_turned(&grid).unwrap();
        assert_eq!(turned.orientation(), Orientation::Down);
        assert_eq!(turned.anchor(), Position::new(3, 10));
        let mut cells = turned.absolute_cells();
        cells.sort_by_key(|p| (p.x, p.y));
        assert_eq!(
            cells,
            [
                Position::new(2, 10),
                Position::new(3, 9),
                Position::new(3, 10),
                Position::new(4, 10),
            ]
        );
        // three of the four corners around (3, 10) are blocked
        assert_eq!(turned.last_action(), LastAction::TSpin);
    }

    mod t_spin {
        use super::*;

        fn grid_from(text: &str) -> Grid {
            Grid::from_ascii(text).unwrap()
        }

        #[test]
        fn test_rotation_in_open_space_is_move() {
            let grid = empty_grid();
            let piece = Piece::spawn(PieceKind::T, SPAWN)
                .rotated(RotationDirection::Clockwise, &grid)
                .unwrap();
            assert_eq!(piece.last_action(), LastAction::Move);
        }

        fn right_facing_t(anchor: Position) -> Piece {
            Piece {
                kind: PieceKind::T,
                orientation: Orientation::Right,
                anchor,
                cells: [
                    Position::new(0, 0),
                    Position::new(0, 1),
                    Position::new(0, -1),
                    Position::new(1, 0),
                ],
                last_action: LastAction::Move,
            }
        }

        #[test]
        fn test_rotation_into_slot_is_t_spin() {
            let grid = grid_from(
                "
                ...
                Z..
                ...
                Z.Z
                ",
            );
            let rotated = right_facing_t(Position::new(1, 1))
                .rotated(RotationDirection::Clockwise, &grid)
                .unwrap();
            assert_eq!(rotated.orientation(), Orientation::Down);
            assert_eq!(rotated.anchor(), Position::new(1, 1));
            assert_eq!(rotated.last_action(), LastAction::TSpin);
        }

        #[test]
        fn test_rotation_into_slot_is_mini_t_spin() {
            let grid = grid_from(
                "
                ...
                Z.Z
                ...
                Z..
                ",
            );
            let rotated = right_facing_t(Position::new(1, 1))
                .rotated(RotationDirection::Clockwise, &grid)
                .unwrap();
            assert_eq!(rotated.anchor(), Position::new(1, 1));
            assert_eq!(rotated.last_action(), LastAction::MiniTSpin);
        }

        #[test]
        fn test_all_corners_blocked_is_t_spin() {
            let mut grid = empty_grid();
            for (x, y) in [(3, 1), (5, 1), (3, -1), (5, -1)] {
                grid.set(Position::new(x, y), Cell::Block(PieceKind::O));
            }
            // anchor (4, 0): lower corners are out of bounds, upper ones blocked
            let piece = right_facing_t(Position::new(4, 0));
            assert_eq!(piece.spin_kind(&grid), LastAction::TSpin);
        }

        #[test]
        fn test_relabel_follows_orientation() {
            // only the upper corners are blocked
            let grid = grid_from(
                "
                ...
                J.J
                ...
                ...
                ",
            );
            let mut piece = Piece::spawn(PieceKind::T, Position::new(1, 1));
            // Up: A and B blocked but neither C nor D
            assert_eq!(piece.spin_kind(&grid), LastAction::Move);
            // Down: relabelled twice, the blocked upper corners land in C and D
            piece.orientation = Orientation::Down;
            assert_eq!(piece.spin_kind(&grid), LastAction::Move);

            let grid = grid_from(
                "
                ...
                J.J
                ...
                J..
                ",
            );
            // Down with (0, 0) also blocked: B takes the old C
            assert_eq!(piece.spin_kind(&grid), LastAction::MiniTSpin);
            // Up with the same corners: A, B, and C set
            piece.orientation = Orientation::Up;
            assert_eq!(piece.spin_kind(&grid), LastAction::TSpin);
        }
    }
}
