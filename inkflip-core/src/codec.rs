//! # Layer blobs
//!
//! Layer rasters are persisted as lossless PNG, RGBA8, at the fixed canvas size.

use crate::{color::Rgba, raster::Raster};

#[derive(thiserror::Error, Debug)]
pub enum CodecError {
    #[error(transparent)]
    Encode(#[from] png::EncodingError),
    #[error(transparent)]
    Decode(#[from] png::DecodingError),
    #[error("unsupported pixel format {color:?} at {depth:?}")]
    UnsupportedFormat {
        color: png::ColorType,
        depth: png::BitDepth,
    },
    #[error("expected a {expected:?} raster, found {found:?}")]
    DimensionMismatch { expected: [u32; 2], found: [u32; 2] },
}

/// Encode a raster into a blob.
/// # Errors
/// Errs are forwarded from the PNG encoder.
pub fn encode(raster: &Raster) -> Result<Vec<u8>, CodecError> {
    let mut blob = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut blob, raster.width(), raster.height());
        encoder.set_color(png::ColorType::Rgba);
        encoder.set_depth(png::BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(raster.as_bytes())?;
        writer.finish()?;
    }
    Ok(blob)
}

/// Decode a blob, requiring it to be exactly `expected` in size.
/// # Errors
/// Blobs not written by [`encode`] at this canvas size are rejected.
pub fn decode(blob: &[u8], expected: [u32; 2]) -> Result<Raster, CodecError> {
    let mut reader = png::Decoder::new(blob).read_info()?;
    let mut buf = vec![0; reader.output_buffer_size()];
    let info = reader.next_frame(&mut buf)?;

    if info.color_type != png::ColorType::Rgba || info.bit_depth != png::BitDepth::Eight {
        return Err(CodecError::UnsupportedFormat {
            color: info.color_type,
            depth: info.bit_depth,
        });
    }
    let found = [info.width, info.height];
    if found != expected {
        return Err(CodecError::DimensionMismatch { expected, found });
    }
    buf.truncate(info.buffer_size());

    let pixels = buf
        .chunks_exact(4)
        .map(|px| Rgba::new(px[0], px[1], px[2], px[3]))
        .collect();
    Raster::from_pixels(info.width, info.height, pixels).ok_or(CodecError::DimensionMismatch {
        expected,
        found,
    })
}
