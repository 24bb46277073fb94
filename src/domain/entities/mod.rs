//! Domain entity definitions.

mod image;
mod photo;

pub use image::{ImageSource, ImageStatus, LoadedImage};
pub use photo::{PageResult, Photo};
