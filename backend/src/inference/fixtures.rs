use image::{DynamicImage, ImageBuffer, ImageFormat, Luma};
use std::io::Cursor;
use std::sync::Arc;

use super::model::{Classifier, InferenceError};
use super::preprocess::ImageTensor;

pub fn encode(image: &DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buffer = Cursor::new(Vec::new());
    image.write_to(&mut buffer, format).unwrap();
    buffer.into_inner()
}

pub fn grayscale_png(width: u32, height: u32) -> Vec<u8> {
    let image = ImageBuffer::from_fn(width, height, |x, y| Luma([((x * 7 + y * 3) % 256) as u8]));
    encode(&DynamicImage::ImageLuma8(image), ImageFormat::Png)
}

const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

fn crc32(bytes: &[u8]) -> u32 {
    let mut crc = 0xFFFF_FFFFu32;
    for &byte in bytes {
        crc ^= byte as u32;
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

fn adler32(bytes: &[u8]) -> u32 {
    let (mut a, mut b) = (1u32, 0u32);
    for &byte in bytes {
        a = (a + byte as u32) % 65_521;
        b = (b + a) % 65_521;
    }
    (b << 16) | a
}

fn push_chunk(png: &mut Vec<u8>, kind: &[u8; 4], data: &[u8]) {
    png.extend_from_slice(&(data.len() as u32).to_be_bytes());
    let start = png.len();
    png.extend_from_slice(kind);
    png.extend_from_slice(data);
    let crc = crc32(&png[start..]);
    png.extend_from_slice(&crc.to_be_bytes());
}

/// zlib stream with a single stored (uncompressed) deflate block.
fn zlib_stored(data: &[u8]) -> Vec<u8> {
    let len = data.len() as u16;
    let mut out = vec![0x78, 0x01, 0x01];
    out.extend_from_slice(&len.to_le_bytes());
    out.extend_from_slice(&(!len).to_le_bytes());
    out.extend_from_slice(data);
    out.extend_from_slice(&adler32(data).to_be_bytes());
    out
}

fn ihdr(width: u32, height: u32, color_type: u8) -> Vec<u8> {
    let mut data = Vec::with_capacity(13);
    data.extend_from_slice(&width.to_be_bytes());
    data.extend_from_slice(&height.to_be_bytes());
    data.extend_from_slice(&[8, color_type, 0, 0, 0]);
    data
}

/// 8-bit palette PNG; `indices` is row-major, one entry per pixel.
pub fn indexed_png(width: u32, height: u32, palette: &[[u8; 3]], indices: &[u8]) -> Vec<u8> {
    let mut scanlines = Vec::new();
    for row in indices.chunks(width as usize) {
        scanlines.push(0);
        scanlines.extend_from_slice(row);
    }
    assert_eq!(scanlines.len(), (width as usize + 1) * height as usize);

    let mut png = PNG_SIGNATURE.to_vec();
    push_chunk(&mut png, b"IHDR", &ihdr(width, height, 3));
    push_chunk(&mut png, b"PLTE", &palette.concat());
    push_chunk(&mut png, b"IDAT", &zlib_stored(&scanlines));
    push_chunk(&mut png, b"IEND", &[]);
    png
}

/// Grayscale PNG whose header declares `width` x `height` but carries no pixel data.
pub fn oversized_png(width: u32, height: u32) -> Vec<u8> {
    let mut png = PNG_SIGNATURE.to_vec();
    push_chunk(&mut png, b"IHDR", &ihdr(width, height, 0));
    push_chunk(&mut png, b"IDAT", &zlib_stored(&[]));
    push_chunk(&mut png, b"IEND", &[]);
    png
}

/// Returns the same distribution for every input.
pub struct StubClassifier {
    pub outputs: Vec<f32>,
}

impl StubClassifier {
    pub fn shared(outputs: Vec<f32>) -> Arc<dyn Classifier> {
        Arc::new(Self { outputs })
    }
}

impl Classifier for StubClassifier {
    fn predict(&self, input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        assert_eq!(input.dim(), (1, 224, 224, 3));
        Ok(self.outputs.clone())
    }
}

pub struct FailingClassifier;

impl Classifier for FailingClassifier {
    fn predict(&self, _input: &ImageTensor) -> Result<Vec<f32>, InferenceError> {
        Err(InferenceError::Model("forward pass failed".to_string()))
    }
}

pub fn melanoma_distribution() -> Vec<f32> {
    vec![0.02, 0.05, 0.08, 0.01, 0.71, 0.10, 0.03]
}
