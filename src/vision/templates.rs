//! On-disk template bundle with decode and resize caches.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tracing::debug;

use super::matcher::{self, Prepared};
use super::{VisionError, VisionResult};
use crate::geometry::Geometry;

pub struct TemplateLibrary {
    root: PathBuf,
    cache: Mutex<HashMap<String, Arc<RgbaImage>>>,
    /// Resized for a monitor; keyed by geometry so a resolution change misses.
    prepared: Mutex<HashMap<(String, Geometry), Arc<Prepared>>>,
}

impl TemplateLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: Mutex::new(HashMap::new()),
            prepared: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn contains(&self, template: &str) -> bool {
        self.root.join(template).is_file()
    }

    /// Decode `template` once and keep it for the rest of the process.
    pub fn load(&self, template: &str) -> VisionResult<Arc<RgbaImage>> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(image) = cache.get(template) {
            return Ok(Arc::clone(image));
        }

        let path = self.root.join(template);
        if !path.is_file() {
            return Err(VisionError::MissingTemplate(template.to_string()));
        }
        let image = image::open(&path)
            .map_err(|e| VisionError::DecodeError {
                path: template.to_string(),
                reason: e.to_string(),
            })?
            .to_rgba8();
        debug!(template, width = image.width(), height = image.height(), "template loaded");

        let image = Arc::new(image);
        cache.insert(template.to_string(), Arc::clone(&image));
        Ok(image)
    }

    /// `template` resized for `geometry`, computed once per pair.
    pub fn prepared(&self, template: &str, geometry: Geometry) -> VisionResult<Arc<Prepared>> {
        let key = (template.to_string(), geometry);
        if let Some(hit) = self.prepared.lock().unwrap_or_else(|e| e.into_inner()).get(&key) {
            return Ok(Arc::clone(hit));
        }

        let source = self.load(template)?;
        let prepared = Arc::new(matcher::prepare(&source, template, geometry));
        debug!(
            template,
            width = prepared.image.width(),
            height = prepared.image.height(),
            scale = prepared.scale,
            "template prepared"
        );
        self.prepared
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, Arc::clone(&prepared));
        Ok(prepared)
    }

    /// Templates from `wanted` that are not present in the bundle.
    pub fn verify<'a, I>(&self, wanted: I) -> Vec<String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut missing: Vec<String> = wanted
            .into_iter()
            .filter(|t| !self.contains(t))
            .map(str::to_string)
            .collect();
        missing.sort();
        missing.dedup();
        missing
    }
}
