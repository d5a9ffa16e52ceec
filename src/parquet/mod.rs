//! Handles reading grids from and saving results to disk in the _parquet_
//! file format, plus CSV export of reduced tables.

pub mod grid;
pub mod output;
pub mod reduced;

pub use grid::read_grid;
pub use output::{read_totals, save_output};
pub use reduced::save_reduced_csv;
