use image::error::{LimitError, LimitErrorKind};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageDecoder, ImageError, ImageReader};
use ndarray::Array4;
use std::io::Cursor;

pub const INPUT_SIZE: u32 = 224;
pub const CHANNELS: usize = 3;
/// Largest canvas accepted before decoding, in pixels.
pub const MAX_IMAGE_PIXELS: u64 = 178_956_970;

/// Normalized NHWC batch of one image, shape (1, 224, 224, 3), values in [0, 1].
pub type ImageTensor = Array4<f32>;

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("Failed to decode image: {0}")]
    Decode(#[from] ImageError),
    #[error("Failed to build input tensor: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

pub fn input_shape() -> (usize, usize, usize, usize) {
    (1, INPUT_SIZE as usize, INPUT_SIZE as usize, CHANNELS)
}

/// Decodes `bytes`, forces RGB, stretches to 224x224 (aspect ratio is not kept)
/// and scales every channel to [0, 1].
pub fn preprocess(bytes: &[u8]) -> Result<ImageTensor, PreprocessError> {
    let decoder = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(ImageError::IoError)?
        .into_decoder()?;
    let (width, height) = decoder.dimensions();
    check_dimensions(width, height)?;
    let decoded = DynamicImage::from_decoder(decoder)?;

    // to_rgb8 drops alpha and narrows 16-bit channels.
    let rgb = decoded.to_rgb8();
    let resized = imageops::resize(&rgb, INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);

    let pixels: Vec<f32> = resized
        .into_raw()
        .into_iter()
        .map(|channel| channel as f32 / 255.0)
        .collect();

    Ok(Array4::from_shape_vec(input_shape(), pixels)?)
}

/// Rejects canvases that would need an oversized buffer, whatever the upload size.
fn check_dimensions(width: u32, height: u32) -> Result<(), PreprocessError> {
    if u64::from(width) * u64::from(height) > MAX_IMAGE_PIXELS {
        return Err(PreprocessError::Decode(ImageError::Limits(
            LimitError::from_kind(LimitErrorKind::DimensionError),
        )));
    }
    Ok(())
}
