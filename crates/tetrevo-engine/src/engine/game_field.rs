use crate::{
    Direction, Grid, LastAction, Piece, PieceBag, PieceKind, RenderFrame, RotationKind,
    RuleSettings,
};

/// Result of locking a piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LockOutcome {
    /// Rows removed by this lock (at most 4).
    pub cleared_lines: usize,
    /// Points added to the field score.
    pub points: u32,
    /// The bottom row was empty once the piece locked and rows cleared.
    pub all_clear: bool,
    /// Action tag of the piece when it locked.
    pub last_action: LastAction,
    /// The newly spawned piece overlaps existing blocks.
    pub topped_out: bool,
}

/// Simulator state: grid, falling piece, swap slot, bag, and score.
///
/// A `GameField` exclusively owns everything it mutates. Callers observe it
/// through accessors and owned [`RenderFrame`] snapshots.
///
/// # Game Flow
///
/// 1. [`GameField::reset`] with a bag snapshot and an optional starting grid
/// 2. Manipulate the falling piece with [`move_piece`](GameField::move_piece),
///    [`rotate_piece`](GameField::rotate_piece), and
///    [`swap_piece`](GameField::swap_piece); rejected operations return
///    `false` and change nothing
/// 3. [`GameField::lock_piece`] drops, commits, clears rows, scores, and spawns
///    the next piece
///
/// Top-out is reported but never stops play: a spawned piece overlapping
/// blocks simply cannot move until it is locked in place.
#[derive(Debug, Clone)]
pub struct GameField {
    settings: RuleSettings,
    grid: Grid,
    bag: PieceBag,
    piece: Piece,
    swap_slot: Option<PieceKind>,
    score: u32,
    topped_out: bool,
}

impl GameField {
    /// Creates a field with an empty grid and spawns the first piece from `bag`.
    #[must_use]
    pub fn new(settings: RuleSettings, mut bag: PieceBag) -> Self {
        let grid = Grid::new(settings.width, settings.height);
        let piece = Piece::spawn(bag.pop_next(), settings.spawn_anchor());
        let mut field = Self {
            settings,
            grid,
            bag,
            piece,
            swap_slot: None,
            score: 0,
            topped_out: false,
        };
        field.topped_out = !field.piece.fits(&field.grid);
        field
    }

    /// Restarts play from a bag snapshot and an optional starting grid.
    ///
    /// The swap slot and score are cleared. A starting grid whose size differs
    /// from the settings is used as given.
    pub fn reset(&mut self, bag: PieceBag, start_grid: Option<&Grid>) {
        self.bag = bag;
        match start_grid {
            Some(grid) => self.grid.clone_from(grid),
            None => self.grid = Grid::new(self.settings.width, self.settings.height),
        }
        self.swap_slot = None;
        self.score = 0;
        self.topped_out = false;
        let kind = self.bag.pop_next();
        self.spawn(kind);
    }

    /// Replaces the falling piece; returns `false` if it overlaps blocks.
    fn spawn(&mut self, kind: PieceKind) -> bool {
        self.piece = Piece::spawn(kind, self.settings.spawn_anchor());
        let fits = self.piece.fits(&self.grid);
        self.topped_out |= !fits;
        fits
    }

    #[must_use]
    pub fn settings(&self) -> &RuleSettings {
        &self.settings
    }

    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    #[must_use]
    pub fn falling_piece(&self) -> &Piece {
        &self.piece
    }

    #[must_use]
    pub fn swap_slot(&self) -> Option<PieceKind> {
        self.swap_slot
    }

    #[must_use]
    pub fn score(&self) -> u32 {
        self.score
    }

    /// Whether any spawn since the last reset overlapped existing blocks.
    #[must_use]
    pub fn is_topped_out(&self) -> bool {
        self.topped_out
    }

    pub fn next_pieces(&self) -> impl Iterator<Item = PieceKind> + '_ {
        self.bag.next_pieces()
    }

    /// Translates the falling piece by one cell.
    pub fn move_piece(&mut self, direction: Direction) -> bool {
        self.update_piece(|piece, grid| piece.moved(direction, grid))
    }

    /// Rotates the falling piece, trying wall kicks.
    pub fn rotate_piece(&mut self, kind: RotationKind) -> bool {
        self.update_piece(|piece, grid| piece.rotated_by(kind, grid))
    }

    /// Moves the falling piece down as far as it goes.
    pub fn hard_drop(&mut self) {
        self.piece = self.piece.dropped(&self.grid);
    }

    fn update_piece<F>(&mut self, f: F) -> bool
    where
        F: FnOnce(&Piece, &Grid) -> Option<Piece>,
    {
        match f(&self.piece, &self.grid) {
            Some(piece) => {
                self.piece = piece;
                true
            }
            None => false,
        }
    }

    /// Exchanges the falling piece with the swap slot.
    ///
    /// An empty slot takes the current kind and the falling piece becomes the
    /// next piece from the bag. Either way the falling piece respawns.
    pub fn swap_piece(&mut self) {
        let current = self.piece.kind();
        let incoming = self
            .swap_slot
            .replace(current)
            .unwrap_or_else(|| self.bag.pop_next());
        self.spawn(incoming);
    }

    /// Drops and commits the falling piece, clears rows, scores, and spawns the next piece.
    pub fn lock_piece(&mut self) -> LockOutcome {
        self.hard_drop();
        let last_action = self.piece.last_action();
        self.grid.fill_piece(&self.piece);
        let cleared_lines = self.grid.clear_lines();
        let all_clear = self.grid.is_row_empty(0);
        let points = self
            .settings
            .scoring
            .points(cleared_lines, last_action, all_clear);
        self.score += points;

        let next = self.bag.pop_next();
        let topped_out = !self.spawn(next);

        LockOutcome {
            cleared_lines,
            points,
            all_clear,
            last_action,
            topped_out,
        }
    }

    /// Owned snapshot for a render sink.
    #[must_use]
    pub fn render_frame(&self) -> RenderFrame {
        RenderFrame {
            grid: self.grid.clone(),
            piece_cells: self.piece.absolute_cells(),
            piece_kind: self.piece.kind(),
            swap_slot: self.swap_slot,
            score: self.score,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BagSeed, Cell, Orientation, Position};

    fn field_with_bag(settings: RuleSettings) -> (GameField, PieceBag) {
        let bag = PieceBag::with_sets(BagSeed::new(42), 3);
        (GameField::new(settings, bag.clone()), bag)
    }

    fn first_kinds(bag: &PieceBag, n: usize) -> Vec<PieceKind> {
        bag.next_pieces().take(n).collect()
    }

    #[test]
    fn test_spawn_uses_bag_order() {
        let (field, bag) = field_with_bag(RuleSettings::default());
        let kinds = first_kinds(&bag, 2);
        assert_eq!(field.falling_piece().kind(), kinds[0]);
        assert_eq!(field.next_pieces().next(), Some(kinds[1]));
        assert_eq!(field.falling_piece().anchor(), Position::new(4, 16));
        assert!(!field.is_topped_out());
    }

    #[test]
    fn test_rejected_move_changes_nothing() {
        let (mut field, _) = field_with_bag(RuleSettings::default());
        while field.move_piece(Direction::Left) {}
        let before = *field.falling_piece();
        assert!(!field.move_piece(Direction::Left));
        assert_eq!(*field.falling_piece(), before);
    }

    #[test]
    fn test_lock_commits_cells_and_spawns_next() {
        let (mut field, bag) = field_with_bag(RuleSettings::default());
        let kinds = first_kinds(&bag, 2);
        let expected_cells = field.falling_piece().dropped(field.grid()).absolute_cells();

        let outcome = field.lock_piece();
        assert_eq!(outcome.cleared_lines, 0);
        assert_eq!(outcome.points, 0);
        assert!(!outcome.topped_out);
        for pos in expected_cells {
            assert_eq!(field.grid().get(pos), Some(Cell::Block(kinds[0])));
        }
        assert_eq!(field.grid().occupied_count(), 4);
        assert_eq!(field.falling_piece().kind(), kinds[1]);
        assert_eq!(field.falling_piece().orientation(), Orientation::Up);
    }

    #[test]
    fn test_swap_with_empty_slot_draws_from_bag() {
        let (mut field, bag) = field_with_bag(RuleSettings::default());
        let kinds = first_kinds(&bag, 3);
        field.move_piece(Direction::Right);

        field.swap_piece();
        assert_eq!(field.swap_slot(), Some(kinds[0]));
        assert_eq!(field.falling_piece().kind(), kinds[1]);
        assert_eq!(field.falling_piece().anchor(), Position::new(4, 16));

        field.swap_piece();
        assert_eq!(field.swap_slot(), Some(kinds[1]));
        assert_eq!(field.falling_piece().kind(), kinds[0]);
        // the bag was consumed only once
        assert_eq!(field.next_pieces().next(), Some(kinds[2]));
    }

    #[test]
    fn test_reset_restores_snapshot() {
        let (mut field, bag) = field_with_bag(RuleSettings::default());
        field.swap_piece();
        field.lock_piece();
        field.lock_piece();

        field.reset(bag.clone(), None);
        assert_eq!(field.grid().occupied_count(), 0);
        assert_eq!(field.swap_slot(), None);
        assert_eq!(field.score(), 0);
        assert_eq!(field.falling_piece().kind(), first_kinds(&bag, 1)[0]);

        let mut text = "..........\n".repeat(19);
        text.push_str("ZZZZ.ZZZZZ");
        let start = Grid::from_ascii(&text).unwrap();
        field.reset(bag, Some(&start));
        assert_eq!(field.grid(), &start);
    }

    #[test]
    fn test_line_clear_scores_and_all_clear_bonus() {
        // 4x4 board: an I placed flat on row 0 clears it and empties the board
        let settings = RuleSettings {
            width: 4,
            height: 4,
            ..RuleSettings::default()
        };
        let mut i_bag = PieceBag::with_sets(BagSeed::new(0), 3);
        let mut field = GameField::new(settings, i_bag.clone());
        // skip ahead in the bag until the first piece is an I
        while field.falling_piece().kind() != PieceKind::I {
            i_bag.pop_next();
            field.reset(i_bag.clone(), None);
        }
        // spawn anchor on width 4 is x = 1, so the flat I spans columns 0..=3
        let outcome = field.lock_piece();
        assert_eq!(outcome.cleared_lines, 1);
        assert!(outcome.all_clear);
        assert_eq!(outcome.points, 1 + 20);
        assert_eq!(field.score(), 21);
        assert_eq!(field.grid().occupied_count(), 0);
    }

    #[test]
    fn test_partial_clear_is_not_all_clear() {
        let settings = RuleSettings {
            width: 4,
            height: 6,
            ..RuleSettings::default()
        };
        let start = Grid::from_ascii(
            "
            ....
            ....
            ....
            ....
            ....
            L...
            ",
        )
        .unwrap();
        let mut bag = PieceBag::with_sets(BagSeed::new(1), 3);
        let mut field = GameField::new(settings, bag.clone());
        field.reset(bag.clone(), Some(&start));
        while field.falling_piece().kind() != PieceKind::I {
            bag.pop_next();
            field.reset(bag.clone(), Some(&start));
        }
        // the I rests on the L in row 1, which is full after locking
        let outcome = field.lock_piece();
        assert_eq!(outcome.cleared_lines, 1);
        assert!(!outcome.all_clear);
        assert_eq!(outcome.points, 1);
        assert_eq!(field.grid().occupied_count(), 1);
    }

    #[test]
    fn test_empty_bottom_row_earns_all_clear_without_a_clear() {
        // the only blocks are a nine-wide ledge on row 2; nothing can reach row 0
        let mut start = Grid::new(10, 20);
        for x in 0..9 {
            start.set(Position::new(x, 2), Cell::Block(PieceKind::Z));
        }
        let bag = PieceBag::with_sets(BagSeed::new(42), 3);
        let mut field = GameField::new(RuleSettings::default(), bag.clone());
        field.reset(bag, Some(&start));

        let outcome = field.lock_piece();
        assert_eq!(outcome.cleared_lines, 0);
        assert!(field.grid().is_row_empty(0));
        assert!(outcome.all_clear);
        assert_eq!(outcome.points, 20);
        assert_eq!(field.score(), 20);
    }

    #[test]
    fn test_top_out_is_reported() {
        let settings = RuleSettings::default();
        let mut start = Grid::new(10, 20);
        for x in 0..10 {
            for y in 12..20 {
                if x != 0 {
                    start.set(Position::new(x, y), Cell::Block(PieceKind::J));
                }
            }
        }
        let bag = PieceBag::with_sets(BagSeed::new(2), 3);
        let mut field = GameField::new(settings, bag.clone());
        field.reset(bag, Some(&start));
        assert!(field.is_topped_out());
        assert!(!field.move_piece(Direction::Down));
        let outcome = field.lock_piece();
        assert!(outcome.topped_out);
    }

    #[test]
    fn test_render_frame_snapshot() {
        let (mut field, _) = field_with_bag(RuleSettings::default());
        field.swap_piece();
        let frame = field.render_frame();
        assert_eq!(frame.piece_kind, field.falling_piece().kind());
        assert_eq!(frame.piece_cells, field.falling_piece().absolute_cells());
        assert_eq!(frame.swap_slot, field.swap_slot());
        assert_eq!(&frame.grid, field.grid());

        field.lock_piece();
        // the frame is a copy, unaffected by later play
        assert_eq!(frame.grid.occupied_count(), 0);
    }
}
