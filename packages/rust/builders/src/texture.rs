//! Texture builder: decodes an image and writes raw pixels behind a small header.
//!
//! Artifact layout (little-endian `u32`s, then pixel data):
//! `width, height, format, mip_count, data_size`.

use std::path::Path;

use image::{DynamicImage, GenericImageView};
use joybuild_shared::{AssetKind, BuildRequest};
use tracing::debug;

use crate::registry::{AssetBuilder, BuildFailure, BuildOutcome};
use crate::{push_u32, section_len};

/// Pixel format tag stored in the texture header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum TextureFormat {
    Rgba8 = 0,
    Rgba32F = 1,
}

/// Decoded texture ready to be written.
#[derive(Debug, Clone)]
pub(crate) struct TextureData {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub data: Vec<u8>,
}

impl TextureData {
    /// Convert a decoded image into artifact pixels.
    ///
    /// High dynamic range images become RGBA32F with rows flipped bottom to
    /// top; everything else becomes RGBA8 as stored.
    pub fn from_image(img: DynamicImage, hdr: bool) -> Self {
        let (width, height) = img.dimensions();
        if hdr {
            let pixels = img.flipv().to_rgba32f();
            let data = pixels
                .as_raw()
                .iter()
                .flat_map(|c| c.to_le_bytes())
                .collect();
            Self {
                width,
                height,
                format: TextureFormat::Rgba32F,
                data,
            }
        } else {
            Self {
                width,
                height,
                format: TextureFormat::Rgba8,
                data: img.to_rgba8().into_raw(),
            }
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, BuildFailure> {
        let mut out = Vec::with_capacity(20 + self.data.len());
        push_u32(&mut out, self.width);
        push_u32(&mut out, self.height);
        push_u32(&mut out, self.format as u32);
        push_u32(&mut out, 1);
        push_u32(&mut out, section_len(self.data.len(), "texture data")?);
        out.extend_from_slice(&self.data);
        Ok(out)
    }
}

fn is_hdr_source(path: &Path, img: &DynamicImage) -> bool {
    let by_extension = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("hdr"));
    by_extension
        || matches!(
            img,
            DynamicImage::ImageRgb32F(_) | DynamicImage::ImageRgba32F(_)
        )
}

/// Native texture builder for `.png`, `.jpg`, `.jpeg`, `.hdr` and `.tga`.
#[derive(Debug, Default)]
pub struct TextureBuilder {
    built: usize,
}

impl TextureBuilder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl AssetBuilder for TextureBuilder {
    fn name(&self) -> &str {
        "texture"
    }

    fn kind(&self) -> AssetKind {
        AssetKind::Texture
    }

    fn initialize(&mut self) -> joybuild_shared::Result<()> {
        self.built = 0;
        Ok(())
    }

    fn terminate(&mut self) {
        debug!(built = self.built, "texture builder terminated");
    }

    fn build(&mut self, request: &BuildRequest<'_>) -> BuildOutcome {
        let img = image::open(request.source).map_err(|e| match e {
            image::ImageError::IoError(io) => BuildFailure::io(request.source, io),
            image::ImageError::Unsupported(u) => BuildFailure::Unsupported(u.to_string()),
            other => BuildFailure::Decode(other.to_string()),
        })?;

        let hdr = is_hdr_source(request.source, &img);
        let texture = TextureData::from_image(img, hdr);
        let bytes = texture.encode()?;

        let output = request.artifact_path();
        std::fs::write(&output, bytes).map_err(|e| BuildFailure::io(&output, e))?;

        debug!(
            path = %request.source.display(),
            width = texture.width,
            height = texture.height,
            format = ?texture.format,
            "texture written"
        );
        self.built += 1;
        Ok(())
    }
}
