pub mod canvas;
pub mod context;
pub mod resource;

pub use canvas::{Canvas, CanvasError, FontSpec, RectMode};
pub use context::{
    is_parameter_name, is_truthy, strip_parameter_name, value_to_string, EvalError, EvaluationContext,
    ScopedContext,
};
pub use resource::{InMemoryResourceProvider, ResourceError, ResourceProvider, SharedResourceData};
