use std::path::{Path, PathBuf};

use image::{ImageFormat, Rgba, RgbaImage};
use thiserror::Error;
use tracing::info;
use winit::dpi::PhysicalSize;

use crate::kernel::PixelProgram;
use crate::uniforms::FrameUniforms;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("export size must be non-zero, got {width}x{height}")]
    EmptySize { width: u32, height: u32 },
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Renders one frame through the CPU reference kernel.
pub fn render_still(size: PhysicalSize<u32>, time: f32) -> Result<RgbaImage, ExportError> {
    if size.width == 0 || size.height == 0 {
        return Err(ExportError::EmptySize {
            width: size.width,
            height: size.height,
        });
    }

    let program = PixelProgram::new(FrameUniforms::new(
        size.width as f32,
        size.height as f32,
        time,
    ));
    Ok(RgbaImage::from_fn(size.width, size.height, |x, y| {
        let [r, g, b, a] = program.shade_pixel(x, y);
        Rgba([to_u8(r), to_u8(g), to_u8(b), to_u8(a)])
    }))
}

/// Renders a still frame and writes it as PNG, returning the written path.
pub fn export_still(
    path: &Path,
    size: PhysicalSize<u32>,
    time: f32,
) -> Result<PathBuf, ExportError> {
    let image = render_still(size, time)?;

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| ExportError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    image
        .save_with_format(path, ImageFormat::Png)
        .map_err(|source| ExportError::Encode {
            path: path.to_path_buf(),
            source,
        })?;

    info!(
        path = %path.display(),
        width = size.width,
        height = size.height,
        time,
        "still frame exported"
    );
    Ok(path.to_path_buf())
}

fn to_u8(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}
