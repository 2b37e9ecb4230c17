pub mod box_painter;

pub use box_painter::{paint_background, paint_background_and_borders, paint_borders};
