pub mod color;
pub mod geometry;
pub mod ids;
pub mod parameter;
pub mod style;

pub use color::Color;
pub use geometry::{Rect, Size};
pub use ids::{ContainerId, ElementId};
pub use parameter::{Parameter, ParameterType};
pub use style::{
    BandDisplay, BorderStyle, FragmentKind, HorizontalAlignment, Padding, TableBorder, TextStyle,
    VerticalAlignment,
};
