//! Image decoding and caching.

use common::{Color, KitError, KitResult};
use image::{ImageFormat, RgbaImage};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

/// Decoded image data.
#[derive(Clone, Debug)]
pub struct ImageData {
    /// RGBA pixels.
    pub pixels: RgbaImage,
    /// Original format.
    pub format: ImageFormat,
}

impl ImageData {
    /// Wrap an RGBA buffer.
    pub fn from_rgba(pixels: RgbaImage) -> Self {
        Self {
            pixels,
            format: ImageFormat::Png,
        }
    }

    /// Create from raw RGBA bytes.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> KitResult<Self> {
        let pixels = RgbaImage::from_raw(width, height, data).ok_or_else(|| {
            KitError::decode(format!("buffer does not hold {width}x{height} RGBA pixels"))
        })?;
        Ok(Self::from_rgba(pixels))
    }

    /// Image filled with one color.
    pub fn filled(width: u32, height: u32, color: Color) -> Self {
        let pixels = RgbaImage::from_pixel(width, height, image::Rgba([color.r, color.g, color.b, color.a]));
        Self::from_rgba(pixels)
    }

    /// Decode from bytes.
    pub fn decode(bytes: &[u8]) -> KitResult<Self> {
        let format = image::guess_format(bytes).map_err(|e| KitError::decode(e.to_string()))?;
        let img = image::load_from_memory_with_format(bytes, format)
            .map_err(|e| KitError::decode(e.to_string()))?;

        Ok(Self {
            pixels: img.to_rgba8(),
            format,
        })
    }

    /// Natural width.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Natural height.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Get pixel at position.
    pub fn get_pixel(&self, x: u32, y: u32) -> Color {
        match self.pixels.get_pixel_checked(x, y) {
            Some(p) => Color::rgba(p[0], p[1], p[2], p[3]),
            None => Color::TRANSPARENT,
        }
    }

    /// Get memory size in bytes.
    pub fn memory_size(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

/// Image cache entry.
struct CacheEntry {
    data: Arc<ImageData>,
    last_access: Instant,
    access_count: u32,
}

/// Entries and their total size, guarded together.
#[derive(Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    size: usize,
}

impl CacheState {
    fn remove(&mut self, key: &str) -> Option<Arc<ImageData>> {
        let entry = self.entries.remove(key)?;
        self.size -= entry.data.memory_size();
        Some(entry.data)
    }

    /// Drop the oldest, least used entries until `incoming` bytes fit.
    fn evict_for(&mut self, incoming: usize, max_size: usize) {
        if self.size + incoming <= max_size {
            return;
        }

        let mut victims: Vec<(String, Instant, u32)> = self
            .entries
            .iter()
            .map(|(k, v)| (k.clone(), v.last_access, v.access_count))
            .collect();

        // Oldest first, then least used
        victims.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.2.cmp(&b.2)));

        for (key, _, _) in victims {
            if self.size + incoming <= max_size {
                break;
            }
            self.remove(&key);
        }
    }
}

/// Decoded images keyed by locator.
///
/// Locators carry the structure's cache token, so a structure reload makes
/// every previous entry unreachable; those age out through eviction.
pub struct ImageCache {
    state: Mutex<CacheState>,
    /// Maximum cache size in bytes.
    max_size: usize,
}

impl ImageCache {
    /// Create a new image cache with the given maximum size.
    pub fn new(max_size: usize) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            max_size,
        }
    }

    /// Create with default 256MB cache.
    pub fn with_default_size() -> Self {
        Self::new(256 * 1024 * 1024)
    }

    /// Get an image from the cache.
    pub fn get(&self, key: &str) -> Option<Arc<ImageData>> {
        let mut state = self.state.lock();
        let entry = state.entries.get_mut(key)?;
        entry.last_access = Instant::now();
        entry.access_count += 1;
        Some(entry.data.clone())
    }

    /// Insert an image into the cache.
    pub fn insert(&self, key: impl Into<String>, data: Arc<ImageData>) -> Arc<ImageData> {
        let key = key.into();
        let size = data.memory_size();
        if size > self.max_size {
            return data;
        }

        let mut state = self.state.lock();
        if let Some(old) = state.remove(&key) {
            tracing::trace!(key = %key, bytes = old.memory_size(), "replacing cached image");
        }
        state.evict_for(size, self.max_size);
        state.entries.insert(
            key,
            CacheEntry {
                data: data.clone(),
                last_access: Instant::now(),
                access_count: 1,
            },
        );
        state.size += size;

        data
    }

    /// Remove an image from the cache.
    pub fn remove(&self, key: &str) -> Option<Arc<ImageData>> {
        self.state.lock().remove(key)
    }

    /// Clear the cache.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.entries.clear();
        state.size = 0;
    }

    /// Get current cache size in bytes.
    pub fn size(&self) -> usize {
        self.state.lock().size
    }

    /// Get number of cached images.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::with_default_size()
    }
}
