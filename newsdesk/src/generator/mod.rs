//! Post and image generation on top of the external text and image providers.

pub mod content;
pub mod image;

pub use content::ContentGenerator;
pub use image::{ImageGenerator, ImageProvider, OpenAiImageProvider, StubImageProvider};
