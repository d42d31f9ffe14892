pub use self::{grid::*, kick_table::*, piece::*, settings::*};

pub(crate) mod grid;
pub(crate) mod kick_table;
pub(crate) mod piece;
pub(crate) mod settings;
