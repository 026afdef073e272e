use std::fs;
use std::path::{Path, PathBuf};

use image::imageops::{self, FilterType};
use image::RgbaImage;
use serde::Deserialize;

use crate::canvas::Rgb;
use crate::config::ConfigError;
use crate::registry::TemplateRegistry;

/// On-disk description of a zone: one JSON record per zone, next to the
/// artwork it references.
#[derive(Debug, Clone, Deserialize)]
pub struct ZoneDefinition {
    pub name: String,
    /// Path to an RGBA image; alpha 0 marks "don't care" cells.
    pub image: PathBuf,
    /// Canvas coordinates of the image's top-left corner.
    pub coords: [u32; 2],
    /// Stored artwork is this many times larger than its on-canvas size.
    pub scale: u32,
}

/// An area of pixels on the canvas, to be created and defended. Immutable
/// once constructed.
#[derive(Debug)]
pub struct Zone {
    pub name: String,
    pub coords: (u32, u32),
    pub scale: u32,
    pub width: u32,
    pub height: u32,
    pub area: u64,
    /// Cells the reconciler will actually maintain.
    pub area_opaque: u64,
    pixels: Vec<Option<Rgb>>,
}

impl Zone {
    pub fn from_definition(
        definition: &ZoneDefinition,
        registry: &mut TemplateRegistry,
    ) -> Result<Self, ConfigError> {
        let image = registry.load(&definition.image)?;
        Self::from_image(
            &definition.name,
            &image,
            (definition.coords[0], definition.coords[1]),
            definition.scale,
        )
    }

    /// Build a zone from already-decoded artwork.
    pub fn from_image(
        name: &str,
        image: &RgbaImage,
        coords: (u32, u32),
        scale: u32,
    ) -> Result<Self, ConfigError> {
        if scale == 0 {
            return Err(ConfigError::Zone {
                name: name.to_string(),
                reason: "scale must be at least 1".to_string(),
            });
        }

        let scaled;
        let image = if scale == 1 {
            image
        } else {
            let width = image.width() / scale;
            let height = image.height() / scale;
            if width == 0 || height == 0 {
                return Err(ConfigError::Zone {
                    name: name.to_string(),
                    reason: format!("template scales down to nothing at {scale}x"),
                });
            }
            scaled = imageops::resize(image, width, height, FilterType::Nearest);
            &scaled
        };

        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(ConfigError::Zone {
                name: name.to_string(),
                reason: "template image is empty".to_string(),
            });
        }

        let mut pixels = Vec::with_capacity(width as usize * height as usize);
        let mut area_opaque = 0u64;
        for pixel in image.pixels() {
            let [r, g, b, a] = pixel.0;
            if a == 0 {
                pixels.push(None);
            } else {
                area_opaque += 1;
                pixels.push(Some(Rgb::new(r, g, b)));
            }
        }

        let area = width as u64 * height as u64;
        log::info!(
            "loaded zone {name}\n    width:  {width}\n    height: {height}\n    area:   {area}"
        );

        Ok(Self {
            name: name.to_string(),
            coords,
            scale,
            width,
            height,
            area,
            area_opaque,
            pixels,
        })
    }

    /// Template rows, top to bottom; `None` cells are transparent.
    pub fn rows(&self) -> impl Iterator<Item = &[Option<Rgb>]> {
        self.pixels.chunks(self.width as usize)
    }
}

/// Load every `*.json` zone definition in `directory`. Files are taken in
/// filename order, which is the priority order for each pass.
pub fn load_zones(
    directory: &Path,
    registry: &mut TemplateRegistry,
) -> Result<Vec<Zone>, ConfigError> {
    let entries = fs::read_dir(directory).map_err(|source| ConfigError::Io {
        path: directory.to_path_buf(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|source| ConfigError::Io {
            path: directory.to_path_buf(),
            source,
        })?;
        let path = entry.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut zones = Vec::with_capacity(paths.len());
    for path in paths {
        let contents = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let definition: ZoneDefinition =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.clone(),
                source,
            })?;
        zones.push(Zone::from_definition(&definition, registry)?);
    }
    Ok(zones)
}
