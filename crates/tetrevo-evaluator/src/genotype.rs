//! Move-sequence genotypes and their genetic operators.
//!
//! A [`Genotype`] is an `n × k` matrix of small integers: one row per piece to
//! lock, one column per symbolic action. The [`EncodingVariant`] fixes `k` and
//! the [`ColumnRole`] of every column:
//!
//! | Variant      | Columns |
//! |--------------|---------|
//! | `Simple`     | Rotate, Move |
//! | `Double`     | Rotate, Move, SecondaryMove, SecondaryRotate |
//! | `SwapSimple` | Swap, Rotate, Move |
//! | `SwapDouble` | Swap, Rotate, Move, SecondaryMove, SecondaryRotate |
//!
//! The shape never changes after construction; crossover and mutation only
//! rewrite cell values.
//!
//! # Neighbors
//!
//! Simulated annealing walks the single-cell changes of a genotype. They are
//! enumerated row-major: for a row with columns `c0, c1, ...`, indices first run
//! through every value of `c0`'s domain other than its current one, then
//! through `c1`'s, and so on. [`Genotype::neighbor`] decodes such an index;
//! every `(row, column, value)` triple with a changed value has exactly one
//! index in `0..neighbor_count()`.

use std::ops::RangeInclusive;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Number of distinct rotation values (`0..=3` quarter turns).
pub const ROTATION_STATES: i8 = 4;

/// Action encoded by one genotype column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, derive_more::Display)]
pub enum ColumnRole {
    /// `1` exchanges the falling piece with the swap slot.
    Swap,
    /// Quarter turns applied right after spawn.
    Rotate,
    /// Horizontal steps applied after the rotation; negative is left.
    Move,
    /// Horizontal steps applied after the hard drop.
    SecondaryMove,
    /// Quarter turns applied after the secondary move.
    SecondaryRotate,
}

impl ColumnRole {
    /// Legal values for this column.
    #[must_use]
    pub const fn domain(self) -> RangeInclusive<i8> {
        match self {
            Self::Swap => 0..=1,
            Self::Rotate | Self::SecondaryRotate => 0..=ROTATION_STATES - 1,
            Self::Move => -5..=5,
            Self::SecondaryMove => -9..=9,
        }
    }

    #[must_use]
    pub fn domain_size(self) -> usize {
        let domain = self.domain();
        usize::from(domain.end().abs_diff(*domain.start())) + 1
    }
}

/// Column layout of a genotype.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum EncodingVariant {
    Simple,
    Double,
    SwapSimple,
    #[default]
    SwapDouble,
}

impl EncodingVariant {
    pub const ALL: [Self; 4] = [Self::Simple, Self::Double, Self::SwapSimple, Self::SwapDouble];

    /// Column roles in column order.
    #[must_use]
    pub const fn columns(self) -> &'static [ColumnRole] {
        use ColumnRole::{Move, Rotate, SecondaryMove, SecondaryRotate, Swap};
        match self {
            Self::Simple => &[Rotate, Move],
            Self::Double => &[Rotate, Move, SecondaryMove, SecondaryRotate],
            Self::SwapSimple => &[Swap, Rotate, Move],
            Self::SwapDouble => &[Swap, Rotate, Move, SecondaryMove, SecondaryRotate],
        }
    }

    #[must_use]
    pub const fn column_count(self) -> usize {
        self.columns().len()
    }

    /// Whether the piece is hard-dropped after the primary move, before the
    /// secondary actions run.
    #[must_use]
    pub const fn is_double(self) -> bool {
        matches!(self, Self::Double | Self::SwapDouble)
    }

    /// Full domain of every column, in column order.
    #[must_use]
    pub fn all_movements(self) -> Vec<Vec<i8>> {
        self.columns()
            .iter()
            .map(|role| role.domain().collect())
            .collect()
    }

    /// Number of single-cell changes of one row.
    #[must_use]
    pub fn neighbors_per_row(self) -> usize {
        self.columns().iter().map(|role| role.domain_size() - 1).sum()
    }
}

/// How [`Genotype::reproduce`] picks the rows inherited from the other parent.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum CrossoverMode {
    /// Rows `0, 2, 4, ...`.
    #[default]
    AlternateRows,
    /// The last `n / 5` rows (rounded down).
    TailFifth,
}

/// How [`Genotype::mutate`] selects the cells to mutate.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::FromStr,
)]
pub enum MutationMode {
    /// Every cell mutates independently with the given chance.
    #[default]
    PerCell,
    /// With the given chance, one uniformly chosen column of a row mutates.
    PerRow,
}

/// Error returned when a movement matrix does not fit its encoding variant.
#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum GenotypeError {
    #[display("movement matrix must have at least one row")]
    Empty,
    #[display("row {row} has {actual} columns, {variant} expects {expected}")]
    ColumnCount {
        row: usize,
        variant: EncodingVariant,
        expected: usize,
        actual: usize,
    },
    #[display("{role} value {value} at row {row}, column {column} is out of range")]
    OutOfDomain {
        row: usize,
        column: usize,
        role: ColumnRole,
        value: i8,
    },
}

/// Fixed-shape movement matrix.
///
/// Equality and hashing are structural over variant, piece count, and every
/// cell, so genotypes can be stored in hash sets (the SA tabu list).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "GenotypeRepr", try_from = "GenotypeRepr")]
pub struct Genotype {
    variant: EncodingVariant,
    piece_count: usize,
    cells: Vec<i8>,
}

#[derive(Serialize, Deserialize)]
struct GenotypeRepr {
    variant: EncodingVariant,
    movements: Vec<Vec<i8>>,
}

impl From<Genotype> for GenotypeRepr {
    fn from(genotype: Genotype) -> Self {
        Self {
            variant: genotype.variant,
            movements: genotype.rows().map(<[i8]>::to_vec).collect(),
        }
    }
}

impl TryFrom<GenotypeRepr> for Genotype {
    type Error = GenotypeError;

    fn try_from(repr: GenotypeRepr) -> Result<Self, Self::Error> {
        Self::from_rows(repr.variant, &repr.movements)
    }
}

impl Genotype {
    /// Samples every cell uniformly from its column's domain.
    pub fn random<R>(variant: EncodingVariant, piece_count: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let columns = variant.columns();
        let mut cells = Vec::with_capacity(piece_count * columns.len());
        for _ in 0..piece_count {
            cells.extend(columns.iter().map(|role| rng.random_range(role.domain())));
        }
        Self {
            variant,
            piece_count,
            cells,
        }
    }

    /// Builds a genotype from an explicit movement matrix, one inner vector per
    /// piece.
    pub fn from_rows<T>(variant: EncodingVariant, rows: &[T]) -> Result<Self, GenotypeError>
    where
        T: AsRef<[i8]>,
    {
        if rows.is_empty() {
            return Err(GenotypeError::Empty);
        }
        let columns = variant.columns();
        let mut cells = Vec::with_capacity(rows.len() * columns.len());
        for (row, values) in rows.iter().enumerate() {
            let values = values.as_ref();
            if values.len() != columns.len() {
                return Err(GenotypeError::ColumnCount {
                    row,
                    variant,
                    expected: columns.len(),
                    actual: values.len(),
                });
            }
            for (column, (&value, role)) in values.iter().zip(columns).enumerate() {
                if !role.domain().contains(&value) {
                    return Err(GenotypeError::OutOfDomain {
                        row,
                        column,
                        role: *role,
                        value,
                    });
                }
            }
            cells.extend_from_slice(values);
        }
        Ok(Self {
            variant,
            piece_count: rows.len(),
            cells,
        })
    }

    #[must_use]
    pub fn variant(&self) -> EncodingVariant {
        self.variant
    }

    #[must_use]
    pub fn piece_count(&self) -> usize {
        self.piece_count
    }

    #[must_use]
    pub fn column_count(&self) -> usize {
        self.variant.column_count()
    }

    #[must_use]
    pub fn row(&self, row: usize) -> &[i8] {
        let k = self.column_count();
        &self.cells[row * k..(row + 1) * k]
    }

    pub fn rows(&self) -> impl ExactSizeIterator<Item = &[i8]> + '_ {
        self.cells.chunks_exact(self.column_count())
    }

    #[must_use]
    pub fn all_movements(&self) -> Vec<Vec<i8>> {
        self.variant.all_movements()
    }

    /// Creates a child: a copy of `self` with rows from `other` selected by
    /// `crossover`, then mutated.
    ///
    /// # Panics
    ///
    /// Panics if the parents differ in shape, or if `mutation_chance` is not
    /// in `[0, 1]`.
    #[must_use]
    pub fn reproduce<R>(
        &self,
        other: &Self,
        mutation_chance: f64,
        crossover: CrossoverMode,
        mutation: MutationMode,
        rng: &mut R,
    ) -> Self
    where
        R: Rng + ?Sized,
    {
        assert_eq!(
            (self.variant, self.piece_count),
            (other.variant, other.piece_count),
            "parents must have the same shape"
        );
        let mut child = self.clone();
        let k = self.column_count();
        let n = self.piece_count;
        let inherited = match crossover {
            CrossoverMode::AlternateRows => (0..n).step_by(2),
            CrossoverMode::TailFifth => (n - n / 5..n).step_by(1),
        };
        for row in inherited {
            let range = row * k..(row + 1) * k;
            child.cells[range.clone()].copy_from_slice(&other.cells[range]);
        }
        child.mutate(mutation_chance, mutation, rng);
        child
    }

    /// Mutates cells in place.
    ///
    /// Swap cells toggle, rotation cells step one quarter turn either way
    /// (modulo 4), and move cells are resampled over their whole domain.
    ///
    /// # Panics
    ///
    /// Panics if `chance` is not in `[0, 1]`.
    pub fn mutate<R>(&mut self, chance: f64, mode: MutationMode, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let columns = self.variant.columns();
        match mode {
            MutationMode::PerCell => {
                for index in 0..self.cells.len() {
                    if rng.random_bool(chance) {
                        self.mutate_cell(index, columns[index % columns.len()], rng);
                    }
                }
            }
            MutationMode::PerRow => {
                for row in 0..self.piece_count {
                    if rng.random_bool(chance) {
                        let column = rng.random_range(0..columns.len());
                        self.mutate_cell(row * columns.len() + column, columns[column], rng);
                    }
                }
            }
        }
    }

    fn mutate_cell<R>(&mut self, index: usize, role: ColumnRole, rng: &mut R)
    where
        R: Rng + ?Sized,
    {
        let cell = &mut self.cells[index];
        match role {
            ColumnRole::Swap => *cell ^= 1,
            ColumnRole::Rotate | ColumnRole::SecondaryRotate => {
                let step = if rng.random_bool(0.5) { 1 } else { -1 };
                *cell = (*cell + step).rem_euclid(ROTATION_STATES);
            }
            ColumnRole::Move | ColumnRole::SecondaryMove => {
                *cell = rng.random_range(role.domain());
            }
        }
    }

    /// Returns a copy with exactly one cell set to `value`.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `column` is out of range.
    #[must_use]
    pub fn mutate_at_copy(&self, row: usize, column: usize, value: i8) -> Self {
        assert!(row < self.piece_count, "row {row} out of range");
        assert!(column < self.column_count(), "column {column} out of range");
        debug_assert!(self.variant.columns()[column].domain().contains(&value));
        let mut copy = self.clone();
        copy.cells[row * self.column_count() + column] = value;
        copy
    }

    /// Number of single-cell changes: `n · Σ (|domain(column)| - 1)`.
    #[must_use]
    pub fn neighbor_count(&self) -> usize {
        self.piece_count * self.variant.neighbors_per_row()
    }

    /// Decodes a neighbor index into the corresponding single-cell change.
    ///
    /// The current value of each cell is skipped, so the result always differs
    /// from `self` in exactly one cell.
    ///
    /// # Panics
    ///
    /// Panics if `index >= self.neighbor_count()`.
    #[must_use]
    pub fn neighbor(&self, index: usize) -> Self {
        assert!(
            index < self.neighbor_count(),
            "neighbor index {index} out of range"
        );
        let per_row = self.variant.neighbors_per_row();
        let row = index / per_row;
        let mut offset = index % per_row;
        for (column, role) in self.variant.columns().iter().enumerate() {
            let current = self.row(row)[column];
            if let Some(value) = role.domain().filter(|&v| v != current).nth(offset) {
                return self.mutate_at_copy(row, column, value);
            }
            offset -= role.domain_size() - 1;
        }
        unreachable!("offset {offset} is below the per-row neighbor count")
    }
}

#[cfg(test)]
mod tests {
    use std::{
        collections::HashSet,
        hash::{BuildHasher, RandomState},
    };

    use rand::SeedableRng as _;
    use rand_pcg::Pcg32;

    use super::*;

    fn rng() -> Pcg32 {
        Pcg32::seed_from_u64(17)
    }

    fn in_domain(genotype: &Genotype) -> bool {
        genotype.rows().all(|row| {
            row.iter()
                .zip(genotype.variant().columns())
                .all(|(value, role)| role.domain().contains(value))
        })
    }

    fn changed_cells(a: &Genotype, b: &Genotype) -> Vec<(usize, usize)> {
        let k = a.column_count();
        a.cells
            .iter()
            .zip(&b.cells)
            .enumerate()
            .filter(|(_, (x, y))| x != y)
            .map(|(i, _)| (i / k, i % k))
            .collect()
    }

    #[test]
    fn test_column_mapping_is_exhaustive_and_non_overlapping() {
        let expected = [
            (EncodingVariant::Simple, 2),
            (EncodingVariant::Double, 4),
            (EncodingVariant::SwapSimple, 3),
            (EncodingVariant::SwapDouble, 5),
        ];
        for (variant, k) in expected {
            let columns = variant.columns();
            assert_eq!(columns.len(), k, "{variant}");
            let unique: HashSet<_> = columns.iter().collect();
            assert_eq!(unique.len(), k, "{variant}");
            assert_eq!(
                columns.contains(&ColumnRole::SecondaryMove),
                variant.is_double()
            );
            assert_eq!(
                columns.first() == Some(&ColumnRole::Swap),
                columns.contains(&ColumnRole::Swap)
            );
        }
    }

    #[test]
    fn test_domains() {
        assert_eq!(ColumnRole::Swap.domain_size(), 2);
        assert_eq!(ColumnRole::Rotate.domain_size(), 4);
        assert_eq!(ColumnRole::Move.domain_size(), 11);
        assert_eq!(ColumnRole::SecondaryMove.domain_size(), 19);
        assert_eq!(
            EncodingVariant::SwapSimple.all_movements(),
            vec![vec![0, 1], vec![0, 1, 2, 3], (-5..=5).collect()]
        );
    }

    #[test]
    fn test_random_stays_in_domain() {
        let mut rng = rng();
        for variant in EncodingVariant::ALL {
            let genotype = Genotype::random(variant, 40, &mut rng);
            assert_eq!(genotype.rows().len(), 40);
            assert!(in_domain(&genotype), "{genotype:?}");
        }
    }

    #[test]
    fn test_from_rows_validates_shape_and_domain() {
        let rows: [[i8; 2]; 0] = [];
        assert_eq!(
            Genotype::from_rows(EncodingVariant::Simple, &rows),
            Err(GenotypeError::Empty)
        );
        assert_eq!(
            Genotype::from_rows(EncodingVariant::Simple, &[vec![0_i8, 1], vec![0]]),
            Err(GenotypeError::ColumnCount {
                row: 1,
                variant: EncodingVariant::Simple,
                expected: 2,
                actual: 1,
            })
        );
        assert_eq!(
            Genotype::from_rows(EncodingVariant::SwapSimple, &[[2_i8, 0, 0]]),
            Err(GenotypeError::OutOfDomain {
                row: 0,
                column: 0,
                role: ColumnRole::Swap,
                value: 2,
            })
        );
        let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[3_i8, -5], [0, 5]]).unwrap();
        assert_eq!(genotype.piece_count(), 2);
        assert_eq!(genotype.row(1), &[0, 5]);
    }

    #[test]
    fn test_full_mutation_changes_every_swap_and_rotation() {
        let mut rng = rng();
        let original = Genotype::random(EncodingVariant::SwapDouble, 30, &mut rng);
        let mut mutated = original.clone();
        mutated.mutate(1.0, MutationMode::PerCell, &mut rng);
        assert!(in_domain(&mutated));
        for (before, after) in original.rows().zip(mutated.rows()) {
            assert_eq!(before[0] ^ 1, after[0]);
            for column in [1, 4] {
                let diff = (after[column] - before[column]).rem_euclid(ROTATION_STATES);
                assert!(diff == 1 || diff == 3, "{before:?} -> {after:?}");
            }
        }
    }

    #[test]
    fn test_zero_chance_mutation_is_identity() {
        let mut rng = rng();
        let original = Genotype::random(EncodingVariant::Double, 20, &mut rng);
        let mut mutated = original.clone();
        mutated.mutate(0.0, MutationMode::PerCell, &mut rng);
        mutated.mutate(0.0, MutationMode::PerRow, &mut rng);
        assert_eq!(original, mutated);
    }

    #[test]
    fn test_per_row_mutation_touches_at_most_one_cell_per_row() {
        let mut rng = rng();
        let original = Genotype::random(EncodingVariant::SwapDouble, 50, &mut rng);
        let mut mutated = original.clone();
        mutated.mutate(1.0, MutationMode::PerRow, &mut rng);
        let changed = changed_cells(&original, &mutated);
        let rows: HashSet<_> = changed.iter().map(|&(row, _)| row).collect();
        assert_eq!(rows.len(), changed.len());
        assert!(in_domain(&mutated));
    }

    mod reproduce {
        use super::*;

        fn parents(piece_count: usize) -> (Genotype, Genotype) {
            let a = Genotype::from_rows(EncodingVariant::Simple, &vec![[0_i8, 0]; piece_count]);
            let b = Genotype::from_rows(EncodingVariant::Simple, &vec![[3_i8, 5]; piece_count]);
            (a.unwrap(), b.unwrap())
        }

        #[test]
        fn test_alternate_rows_inherits_even_rows() {
            let (a, b) = parents(5);
            let child = a.reproduce(
                &b,
                0.0,
                CrossoverMode::AlternateRows,
                MutationMode::PerCell,
                &mut rng(),
            );
            let expected = Genotype::from_rows(
                EncodingVariant::Simple,
                &[[3_i8, 5], [0, 0], [3, 5], [0, 0], [3, 5]],
            );
            assert_eq!(child, expected.unwrap());
        }

        #[test]
        fn test_tail_fifth_inherits_last_rows() {
            let (a, b) = parents(12);
            let child = a.reproduce(
                &b,
                0.0,
                CrossoverMode::TailFifth,
                MutationMode::PerCell,
                &mut rng(),
            );
            let inherited: Vec<_> = child.rows().map(|row| row == [3, 5]).collect();
            let mut expected = vec![false; 10];
            expected.extend([true, true]);
            assert_eq!(inherited, expected);

            // fewer than five rows inherit nothing
            let (a, b) = parents(4);
            let child = a.reproduce(
                &b,
                0.0,
                CrossoverMode::TailFifth,
                MutationMode::PerCell,
                &mut rng(),
            );
            assert_eq!(child, a);
        }

        #[test]
        #[should_panic(expected = "same shape")]
        fn test_shape_mismatch_panics() {
            let (a, _) = parents(3);
            let (b, _) = parents(4);
            let _ = a.reproduce(
                &b,
                0.0,
                CrossoverMode::AlternateRows,
                MutationMode::PerCell,
                &mut rng(),
            );
        }
    }

    mod neighbors {
        use super::*;

        #[test]
        fn test_mutate_at_copy_leaves_original() {
            let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[0_i8, 0], [1, 1]]).unwrap();
            let copy = genotype.mutate_at_copy(1, 1, -4);
            assert_eq!(genotype.row(1), &[1, 1]);
            assert_eq!(copy.row(1), &[1, -4]);
            assert_eq!(changed_cells(&genotype, &copy), [(1, 1)]);
        }

        #[test]
        fn test_decoding_is_row_major() {
            let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[0_i8, 0], [0, 0]]).unwrap();
            assert_eq!(genotype.neighbor_count(), 2 * (3 + 10));
            assert_eq!(genotype.neighbor(0).row(0), &[1, 0]);
            assert_eq!(genotype.neighbor(2).row(0), &[3, 0]);
            assert_eq!(genotype.neighbor(3).row(0), &[0, -5]);
            assert_eq!(genotype.neighbor(12).row(0), &[0, 5]);
            assert_eq!(genotype.neighbor(13).row(1), &[1, 0]);
            assert_eq!(genotype.neighbor(25).row(1), &[0, 5]);
        }

        #[test]
        fn test_decoding_skips_current_value() {
            let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[2_i8, 0]]).unwrap();
            let rotations: Vec<_> = (0..3).map(|i| genotype.neighbor(i).row(0)[0]).collect();
            assert_eq!(rotations, [0, 1, 3]);
            // the move column steps from -1 straight to 1
            assert_eq!(genotype.neighbor(7).row(0), &[2, -1]);
            assert_eq!(genotype.neighbor(8).row(0), &[2, 1]);
            assert!((0..genotype.neighbor_count()).all(|i| genotype.neighbor(i) != genotype));
        }

        #[test]
        #[should_panic(expected = "out of range")]
        fn test_decoding_rejects_index_past_count() {
            let genotype = Genotype::from_rows(EncodingVariant::Simple, &[[0_i8, 0]]).unwrap();
            let _ = genotype.neighbor(genotype.neighbor_count());
        }

        #[test]
        fn test_every_single_cell_mutation_appears_once() {
            let mut rng = rng();
            let genotype = Genotype::random(EncodingVariant::SwapDouble, 3, &mut rng);
            let count = genotype.neighbor_count();
            let distinct: HashSet<_> = (0..count).map(|i| genotype.neighbor(i)).collect();
            assert_eq!(distinct.len(), count);
            assert!(
                distinct
                    .iter()
                    .all(|n| changed_cells(&genotype, n).len() == 1)
            );
        }
    }

    #[test]
    fn test_structural_equality_and_hash() {
        let mut rng = rng();
        let a = Genotype::random(EncodingVariant::SwapSimple, 8, &mut rng);
        let b = Genotype::from_rows(a.variant(), &a.rows().collect::<Vec<_>>()).unwrap();
        assert_eq!(a, b);
        let state = RandomState::new();
        assert_eq!(state.hash_one(&a), state.hash_one(&b));

        let c = a.mutate_at_copy(0, 0, a.row(0)[0] ^ 1);
        assert_ne!(a, c);
        let set: HashSet<_> = [a, b, c].into_iter().collect();
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_serde_validates_movements() {
        let json = r#"{"variant":"Simple","movements":[[1,-2],[0,3]]}"#;
        let genotype: Genotype = serde_json::from_str(json).unwrap();
        assert_eq!(genotype.row(0), &[1, -2]);
        assert_eq!(serde_json::to_string(&genotype).unwrap(), json);

        let json = r#"{"variant":"Simple","movements":[[4,0]]}"#;
        let err = serde_json::from_str::<Genotype>(json).unwrap_err();
        assert!(err.to_string().contains("out of range"), "{err}");
    }
}
