pub mod screen;

pub use screen::{draw_markers, encode_jpeg_base64, guess_extension, EncodedImage};
