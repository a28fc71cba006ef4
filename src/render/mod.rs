pub mod color;
pub mod overlay;

pub use color::{default_palette, Color, ColorResolver, DEFAULT_PALETTE};
pub use overlay::{
    FrameRenderer, MalformedBoxPolicy, RenderStats, UnknownCategoryPolicy, DEFAULT_STROKE_WIDTH,
};
