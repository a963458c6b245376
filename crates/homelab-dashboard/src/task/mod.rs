mod grid_printer;

pub use grid_printer::*;
