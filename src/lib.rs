#![forbid(unsafe_code)]

pub mod blend;
pub mod blur;
pub mod canvas;
pub mod color;
pub mod compose;
pub mod error;
pub mod fx;
pub mod model;
pub mod rng;
pub mod shape;

pub use canvas::{Canvas, FrameRgb};
pub use color::{Axis, GradientSpec, Rgba, radial_value};
pub use compose::{Compositor, compose};
pub use error::{LimnerError, LimnerResult};
pub use fx::Effect;
pub use model::{EffectInstance, Layer, Recipe, Seed, Step};
pub use rng::{Rng64, mix64};
pub use shape::Shape;
