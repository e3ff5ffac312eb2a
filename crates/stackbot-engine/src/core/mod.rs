pub use self::{bit_grid::*, shape::*};

pub(crate) mod bit_grid;
pub(crate) mod shape;
