pub mod attributes;
pub mod canvas;
pub mod colors;
pub mod compositor;
pub mod error;
pub mod generator;
pub mod layout;
pub mod mask;
pub mod overlay;
pub mod shading;

mod font;

pub use canvas::Canvas;
pub use colors::{ColorEntry, ColorMap};
pub use compositor::{Compositor, RenderStats};
pub use error::RenderError;
pub use generator::{report_unknown, RenderOptions, RenderedMap, TileGenerator};
pub use layout::{BlockExtent, MapLayout, Scales};
