
use std::path::Path;

use crate::cache::{Resource, TypeTag};


#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TextureFormat {
    Rgba8,
    Rgba16,
    Rgba32Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        match self {
            TextureFormat::Rgba8 => 4,
            TextureFormat::Rgba16 => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }
}


/// Decoded pixels, tightly packed rows, little-endian channels.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub pixels: Vec<u8>,
}

impl Resource for Texture {
    const TAG: TypeTag = TypeTag::new("Texture");
}

impl Texture {
    pub fn bytes_per_row(&self) -> u32 {
        self.format.bytes_per_pixel() * self.width
    }
}


enum Raw {
    VecU8(Vec<u8>),
    VecU16(Vec<u16>),
    VecF32(Vec<f32>),
}

impl Raw {
    fn into_bytes(self) -> Vec<u8> {
        match self {
            Raw::VecU8(v) => v,
            Raw::VecU16(v) => v.iter().flat_map(|c| c.to_le_bytes()).collect(),
            Raw::VecF32(v) => v.iter().flat_map(|c| c.to_le_bytes()).collect(),
        }
    }
}


pub fn load_texture_file(path: &Path) -> anyhow::Result<Texture> {
    use image::{ColorType, GenericImageView as _};

    let img = image::open(path)?;
    let (width, height) = (img.width(), img.height());

    // WTF: anything wider than 8 bits keeps its precision, everything else
    // is expanded to rgba8 so consumers only deal with three layouts.
    let (raw, format) = match img.color() {
        ColorType::L16 | ColorType::La16 | ColorType::Rgb16 | ColorType::Rgba16 =>
            ( Raw::VecU16(img.into_rgba16().into_raw())
            , TextureFormat::Rgba16),

        ColorType::Rgb32F | ColorType::Rgba32F =>
            ( Raw::VecF32(img.into_rgba32f().into_raw())
            , TextureFormat::Rgba32Float),

        _ =>
            ( Raw::VecU8(img.into_rgba8().into_raw())
            , TextureFormat::Rgba8),
    };

    log::debug!("decoded texture {}: {}x{} {:?}", path.display(), width, height, format);

    Ok(Texture {
        width,
        height,
        format,
        pixels: raw.into_bytes(),
    })
}
