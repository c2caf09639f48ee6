//! Terminal presentation: input validation and stateless rendering.

pub mod input;
pub mod render;

pub use input::validate_input;
pub use render::{status_glyph, Renderer};
