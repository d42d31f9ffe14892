//! Rotation offset tables.
//!
//! Each row holds one offset per orientation (Up, Right, Down, Left). The
//! candidate translation for a quarter turn is `row[current] - row[target]`,
//! tried row by row until one fits.

use arrayvec::ArrayVec;

use super::piece::{Orientation, PieceKind, Position};

/// Maximum number of candidate offsets tried per rotation.
pub const MAX_KICKS: usize = 5;

type OffsetRow = [Position; 4];

const fn p(x: i32, y: i32) -> Position {
    Position::new(x, y)
}

const JLSTZ_OFFSETS: [OffsetRow; MAX_KICKS] = [
    [p(0, 0), p(0, 0), p(0, 0), p(0, 0)],
    [p(0, 0), p(1, 0), p(0, 0), p(-1, 0)],
    [p(0, 0), p(1, -1), p(0, 0), p(-1, -1)],
    [p(0, 0), p(0, 2), p(0, 0), p(0, 2)],
    [p(0, 0), p(1, 2), p(0, 0), p(-1, 2)],
];

const I_OFFSETS: [OffsetRow; MAX_KICKS] = [
    [p(0, 0), p(-1, 0), p(-1, 1), p(0, 1)],
    [p(-1, 0), p(0, 0), p(1, 1), p(0, 1)],
    [p(2, 0), p(0, 0), p(-2, 1), p(0, 1)],
    [p(-1, 0), p(0, 1), p(1, 0), p(0, -1)],
    [p(2, 0), p(0, -2), p(-2, 0), p(0, 2)],
];

// Rotating the O cells about the anchor moves them by one; this row cancels it.
const O_OFFSETS: [OffsetRow; 1] = [[p(0, 0), p(0, -1), p(-1, -1), p(-1, 0)]];

fn offset_rows(kind: PieceKind) -> &'static [OffsetRow] {
    match kind {
        PieceKind::I => &I_OFFSETS,
        PieceKind::O => &O_OFFSETS,
        PieceKind::T | PieceKind::S | PieceKind::Z | PieceKind::J | PieceKind::L => {
            &JLSTZ_OFFSETS
        }
    }
}

/// Candidate anchor translations for rotating `kind` from `from` to `to`, in trial order.
#[must_use]
pub fn kick_offsets(
    kind: PieceKind,
    from: Orientation,
    to: Orientation,
) -> ArrayVec<Position, MAX_KICKS> {
    offset_rows(kind)
        .iter()
        .map(|row| row[from.index()] - row[to.index()])
        .collect()
}
