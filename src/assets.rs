//! Background asset stores
//!
//! Backgrounds are looked up by a short identifier. The host decides where
//! they come from: an in-memory table or a directory of image files.

use crate::{
    error::{BgEraseError, Result},
    types::{Channels, RasterImage},
};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Catalogue identifiers shipped with the photo app this library grew out of
pub const DEFAULT_BACKGROUND_IDS: [&str; 7] = [
    "transparent_white",
    "building",
    "firy",
    "snow",
    "grass",
    "starfield",
    "transparent_black",
];

/// File extensions the directory store picks up
const IMAGE_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "bmp", "tiff", "tif"];

/// Lookup of background images by identifier
pub trait AssetStore: Send + Sync {
    /// Load the background named `id`
    ///
    /// # Errors
    /// - `AssetNotFound` if no background has this identifier
    /// - decoding errors for file-backed stores
    fn load(&self, id: &str) -> Result<RasterImage>;

    /// All identifiers this store can resolve, sorted
    fn ids(&self) -> Vec<String>;

    fn contains(&self, id: &str) -> bool {
        self.ids().iter().any(|known| known == id)
    }
}

/// Backgrounds held in memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryAssetStore {
    assets: HashMap<String, RasterImage>,
}

impl InMemoryAssetStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with the two plain catalogue entries, white and black
    pub fn with_plain_backgrounds(width: u32, height: u32) -> Result<Self> {
        let mut store = Self::new();
        store.insert_solid("transparent_white", width, height, [1.0, 1.0, 1.0])?;
        store.insert_solid("transparent_black", width, height, [0.0, 0.0, 0.0])?;
        Ok(store)
    }

    /// Add or replace a background
    pub fn insert<S: Into<String>>(&mut self, id: S, image: RasterImage) {
        self.assets.insert(id.into(), image);
    }

    /// Add a single-colour RGB background
    pub fn insert_solid<S: Into<String>>(
        &mut self,
        id: S,
        width: u32,
        height: u32,
        rgb: [f32; 3],
    ) -> Result<()> {
        let image = RasterImage::solid(width, height, Channels::Rgb, &rgb)?;
        self.insert(id, image);
        Ok(())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

impl AssetStore for InMemoryAssetStore {
    fn load(&self, id: &str) -> Result<RasterImage> {
        self.assets
            .get(id)
            .cloned()
            .ok_or_else(|| BgEraseError::asset_not_found(id))
    }

    fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.assets.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn contains(&self, id: &str) -> bool {
        self.assets.contains_key(id)
    }
}

/// Backgrounds stored as image files under a directory
///
/// The directory is indexed once when the store is opened; the identifier of
/// a file is its stem (`snow.jpg` is `snow`). Files are decoded on every
/// `load`, so nothing is held in memory between requests.
#[derive(Debug, Clone)]
pub struct DirectoryAssetStore {
    root: PathBuf,
    index: BTreeMap<String, PathBuf>,
}

impl DirectoryAssetStore {
    /// Index every image file under `root`, recursively
    ///
    /// When two files share a stem the first one in file-name order wins.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(BgEraseError::file_io_error(
                "open asset directory",
                &root,
                &std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
            ));
        }

        let mut index: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in walkdir::WalkDir::new(&root).sort_by_file_name() {
            let entry = entry.map_err(|e| {
                let io = std::io::Error::from(e);
                BgEraseError::file_io_error("scan asset directory", &root, &io)
            })?;
            if !entry.file_type().is_file() || !is_image_file(entry.path()) {
                continue;
            }

            let Some(id) = entry.path().file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if let Some(existing) = index.get(id) {
                log::warn!(
                    "Ignoring {} (background '{}' already provided by {})",
                    entry.path().display(),
                    id,
                    existing.display()
                );
                continue;
            }
            index.insert(id.to_string(), entry.path().to_path_buf());
        }

        log::debug!("Indexed {} backgrounds under {}", index.len(), root.display());
        Ok(Self { root, index })
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file backing `id`, if any
    #[must_use]
    pub fn path_of(&self, id: &str) -> Option<&Path> {
        self.index.get(id).map(PathBuf::as_path)
    }
}

impl AssetStore for DirectoryAssetStore {
    fn load(&self, id: &str) -> Result<RasterImage> {
        let path = self
            .index
            .get(id)
            .ok_or_else(|| BgEraseError::asset_not_found(id))?;
        let decoded = image::open(path).map_err(|e| BgEraseError::image_load_error(path, e))?;
        Ok(RasterImage::from_dynamic(&decoded))
    }

    fn ids(&self) -> Vec<String> {
        self.index.keys().cloned().collect()
    }

    fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_png(path: &Path, rgb: [u8; 3]) {
        image::RgbImage::from_pixel(4, 3, image::Rgb(rgb)).save(path).unwrap();
    }

    #[test]
    fn test_in_memory_store() {
        let mut store = InMemoryAssetStore::new();
        assert!(store.is_empty());
        store.insert_solid("snow", 2, 2, [1.0, 1.0, 1.0]).unwrap();
        store.insert("grass", RasterImage::solid(1, 1, Channels::Rgb, &[0.0, 1.0, 0.0]).unwrap());

        assert_eq!(store.ids(), vec!["grass", "snow"]);
        assert!(store.contains("snow"));
        assert_eq!(store.load("snow").unwrap().dimensions(), (2, 2));
        assert!(matches!(
            store.load("firy"),
            Err(BgEraseError::AssetNotFound(id)) if id == "firy"
        ));
    }

    #[test]
    fn test_plain_backgrounds() {
        let store = InMemoryAssetStore::with_plain_backgrounds(8, 8).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.load("transparent_black").unwrap().mean(), 0.0);
        assert_eq!(store.load("transparent_white").unwrap().mean(), 1.0);
        assert!(store.ids().iter().all(|id| DEFAULT_BACKGROUND_IDS.contains(&id.as_str())));
    }

    #[test]
    fn test_directory_store() {
        let dir = tempfile::tempdir().unwrap();
        write_png(&dir.path().join("snow.png"), [255, 255, 255]);
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        write_png(&dir.path().join("nested").join("grass.PNG"), [0, 255, 0]);
        std::fs::write(dir.path().join("notes.txt"), "not an image").unwrap();

        let store = DirectoryAssetStore::open(dir.path()).unwrap();
        assert_eq!(store.ids(), vec!["grass", "snow"]);
        assert!(store.path_of("snow").is_some());

        let grass = store.load("grass").unwrap();
        assert_eq!(grass.dimensions(), (4, 3));
        assert_eq!(grass.pixel(0, 0), Some(&[0.0, 1.0, 0.0][..]));

        assert!(matches!(
            store.load("notes"),
            Err(BgEraseError::AssetNotFound(_))
        ));
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            DirectoryAssetStore::open("/nonexistent/backgrounds"),
            Err(BgEraseError::Io(_))
        ));
    }
}
