use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::RgbaImage;

use crate::config::ConfigError;

/// Decoded template artwork keyed by canonical path, so zones sharing a file
/// decode it once. Built explicitly at startup and passed into zone loading;
/// `reset` empties the cache for tests.
#[derive(Default)]
pub struct TemplateRegistry {
    cache: HashMap<PathBuf, Arc<RgbaImage>>,
}

impl TemplateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, path: &Path) -> Result<Arc<RgbaImage>, ConfigError> {
        let key = path.canonicalize().map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if let Some(image) = self.cache.get(&key) {
            return Ok(Arc::clone(image));
        }
        let image = image::open(&key)
            .map_err(|source| ConfigError::Template {
                path: path.to_path_buf(),
                source,
            })?
            .to_rgba8();
        let image = Arc::new(image);
        self.cache.insert(key, Arc::clone(&image));
        Ok(image)
    }

    pub fn reset(&mut self) {
        self.cache.clear();
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}
