//! Cached per-image semantic feature maps.
//!
//! Extraction is expensive: the cache runs the external model once per
//! image at a reduced resolution, stacks the results into one tensor, and
//! persists it so later runs load instead of recompute.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use burn::prelude::*;

use crate::config::FeatureCacheConfig;
use crate::error::{Result, SemanticFieldError};

use super::extractor::FeatureExtractor;

/// Persisted cache format version.
const CACHE_VERSION: u32 = 1;

/// A point query in original image coordinates.
///
/// `x` is the row coordinate and `y` the column coordinate, both in the
/// resolution of the source images (not the downsampled cache).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImagePoint {
    /// Index into the cached image list.
    pub image_index: usize,
    /// Row coordinate in original image space.
    pub x: f32,
    /// Column coordinate in original image space.
    pub y: f32,
}

impl ImagePoint {
    /// Create a new image point.
    pub fn new(image_index: usize, x: f32, y: f32) -> Self {
        Self { image_index, x, y }
    }
}

/// Precomputed per-image feature maps with point-query access.
///
/// The cache tensor is indexed [image, row, col, channel] at
/// `config.cache_resolution()`; it is built once and read-only afterward.
pub struct FeatureCache<B: Backend> {
    /// Cache configuration.
    config: FeatureCacheConfig,
    /// Device query results are produced on.
    device: B::Device,
    /// Cached features: [num_images, rows, cols, feature_dim].
    data: Tensor<B, 4>,
}

impl<B: Backend> FeatureCache<B> {
    /// Build or load the feature cache for a list of images.
    ///
    /// If `cache_dir` holds a persisted cache whose fingerprint matches
    /// `config` and the image count, it is loaded and `make_extractor` is
    /// never called — the expensive model is not even instantiated.
    /// Otherwise the extractor is acquired, run over every image in list
    /// order, and dropped before the cache is returned; the fresh tensor
    /// is persisted to `cache_dir` when one was given.
    ///
    /// A failed extraction aborts the whole build: a clear error beats a
    /// silently partial cache.
    pub fn new<E, F>(
        config: FeatureCacheConfig,
        device: &B::Device,
        image_paths: &[PathBuf],
        cache_dir: Option<&Path>,
        make_extractor: F,
    ) -> Result<Self>
    where
        E: FeatureExtractor<B>,
        F: FnOnce() -> Result<E>,
    {
        config.validate()?;
        if image_paths.is_empty() {
            return Err(SemanticFieldError::InvalidConfig {
                message: "feature cache needs at least one image".to_string(),
            });
        }

        if let Some(dir) = cache_dir {
            if let Some(data) = load_cache::<B>(dir, &config, image_paths.len(), device)? {
                log::info!(
                    "loaded feature cache for {} images from {:?}",
                    image_paths.len(),
                    dir
                );
                return Ok(Self {
                    config,
                    device: device.clone(),
                    data,
                });
            }
        }

        let extractor = make_extractor()?;
        let data = Self::create(&config, device, image_paths, extractor)?;

        if let Some(dir) = cache_dir {
            save_cache::<B>(dir, &config, &data)?;
            log::info!(
                "saved feature cache for {} images to {:?}",
                image_paths.len(),
                dir
            );
        }

        Ok(Self {
            config,
            device: device.clone(),
            data,
        })
    }

    /// Run the extractor over every image and stack the feature maps.
    ///
    /// The extractor is consumed: it goes out of scope before the stacked
    /// tensor is returned, releasing the model whether the build succeeds
    /// or fails partway.
    fn create<E: FeatureExtractor<B>>(
        config: &FeatureCacheConfig,
        device: &B::Device,
        image_paths: &[PathBuf],
        extractor: E,
    ) -> Result<Tensor<B, 4>> {
        let (rows, cols) = config.cache_resolution();
        let mut maps = Vec::with_capacity(image_paths.len());

        for (image_id, path) in image_paths.iter().enumerate() {
            let features = extractor.extract(path, (rows, cols))?;

            let dims = features.dims();
            if dims != [config.feature_dim, rows, cols] {
                return Err(SemanticFieldError::ShapeMismatch {
                    expected: vec![config.feature_dim, rows, cols],
                    got: dims.to_vec(),
                });
            }

            // [channels, rows, cols] -> [rows, cols, channels]
            maps.push(features.permute([1, 2, 0]));
            log::debug!(
                "extracted features {}/{} ({:?})",
                image_id + 1,
                image_paths.len(),
                path
            );
        }

        drop(extractor);

        Ok(Tensor::stack(maps, 0).to_device(device))
    }

    /// Look up feature vectors for a batch of image points.
    ///
    /// Coordinates are rescaled from original image space to the cache
    /// resolution and truncated to integer indices. Out-of-range indices
    /// and coordinates are rejected rather than clamped.
    ///
    /// Returns a tensor of shape [points, feature_dim] on the cache device.
    pub fn query(&self, points: &[ImagePoint]) -> Result<Tensor<B, 2>> {
        let [num_images, rows, cols, feature_dim] = self.data.dims();
        let (height, width) = self.config.image_shape;
        let row_scale = rows as f32 / height as f32;
        let col_scale = cols as f32 / width as f32;

        let mut indices = Vec::with_capacity(points.len());
        for point in points {
            if point.image_index >= num_images {
                return Err(SemanticFieldError::ImageIndexOutOfBounds {
                    index: point.image_index,
                    num_images,
                });
            }
            if !(0.0..height as f32).contains(&point.x)
                || !(0.0..width as f32).contains(&point.y)
            {
                return Err(SemanticFieldError::PointOutOfBounds {
                    x: point.x,
                    y: point.y,
                    height,
                    width,
                });
            }

            let row = (point.x * row_scale) as usize;
            let col = (point.y * col_scale) as usize;
            indices.push((point.image_index * rows * cols + row * cols + col) as i64);
        }

        let flat = self
            .data
            .clone()
            .reshape([num_images * rows * cols, feature_dim]);
        let index_tensor = Tensor::<B, 1, Int>::from_data(indices.as_slice(), &self.device);

        Ok(flat.select(0, index_tensor))
    }

    /// The full cache tensor: [num_images, rows, cols, feature_dim].
    pub fn data(&self) -> &Tensor<B, 4> {
        &self.data
    }

    /// Number of cached images.
    pub fn num_images(&self) -> usize {
        self.data.dims()[0]
    }

    /// Resolution of the cached feature maps as (rows, cols).
    pub fn cache_resolution(&self) -> (usize, usize) {
        let [_, rows, cols, _] = self.data.dims();
        (rows, cols)
    }

    /// Feature vector width.
    pub fn feature_dim(&self) -> usize {
        self.data.dims()[3]
    }

    /// The cache configuration.
    pub fn config(&self) -> &FeatureCacheConfig {
        &self.config
    }
}

/// Fingerprint of a persisted cache, stored as JSON next to the data.
#[derive(Debug, Clone, Default)]
struct CacheMetadata {
    version: u32,
    num_images: usize,
    rows: usize,
    cols: usize,
    feature_dim: usize,
    image_height: usize,
    image_width: usize,
    downsample: usize,
}

impl CacheMetadata {
    fn describe<B: Backend>(config: &FeatureCacheConfig, data: &Tensor<B, 4>) -> Self {
        let [num_images, rows, cols, feature_dim] = data.dims();
        Self {
            version: CACHE_VERSION,
            num_images,
            rows,
            cols,
            feature_dim,
            image_height: config.image_shape.0,
            image_width: config.image_shape.1,
            downsample: config.downsample,
        }
    }

    /// Whether a persisted cache was produced by an equivalent configuration.
    fn matches(&self, config: &FeatureCacheConfig, num_images: usize) -> bool {
        self.version == CACHE_VERSION
            && self.num_images == num_images
            && (self.image_height, self.image_width) == config.image_shape
            && self.downsample == config.downsample
            && self.feature_dim == config.feature_dim
            && (self.rows, self.cols) == config.cache_resolution()
    }

    /// Parse metadata from JSON string.
    fn from_json(json: &str) -> Self {
        // Simple JSON parsing without serde
        let mut metadata = Self::default();

        for line in json.lines() {
            let line = line.trim();
            if let Some((key, value)) = line.split_once(':') {
                let key = key.trim().trim_matches('"');
                let value = value.trim().trim_end_matches(',').trim_matches('"');

                match key {
                    "version" => metadata.version = value.parse().unwrap_or(0),
                    "num_images" => metadata.num_images = value.parse().unwrap_or(0),
                    "rows" => metadata.rows = value.parse().unwrap_or(0),
                    "cols" => metadata.cols = value.parse().unwrap_or(0),
                    "feature_dim" => metadata.feature_dim = value.parse().unwrap_or(0),
                    "image_height" => metadata.image_height = value.parse().unwrap_or(0),
                    "image_width" => metadata.image_width = value.parse().unwrap_or(0),
                    "downsample" => metadata.downsample = value.parse().unwrap_or(0),
                    _ => {}
                }
            }
        }

        metadata
    }

    /// Convert metadata to JSON string.
    fn to_json(&self) -> String {
        format!(
            r#"{{
  "version": {},
  "num_images": {},
  "rows": {},
  "cols": {},
  "feature_dim": {},
  "image_height": {},
  "image_width": {},
  "downsample": {}
}}"#,
            self.version,
            self.num_images,
            self.rows,
            self.cols,
            self.feature_dim,
            self.image_height,
            self.image_width,
            self.downsample
        )
    }
}

/// Check if a persisted cache exists at the given directory.
pub fn cache_exists(dir: &Path) -> bool {
    dir.join("metadata.json").exists() && dir.join("features.bin").exists()
}

/// Persist the cache tensor: `metadata.json` plus raw f32 `features.bin`.
fn save_cache<B: Backend>(dir: &Path, config: &FeatureCacheConfig, data: &Tensor<B, 4>) -> Result<()> {
    fs::create_dir_all(dir)?;

    let metadata = CacheMetadata::describe(config, data);
    let mut metadata_file = BufWriter::new(File::create(dir.join("metadata.json"))?);
    metadata_file.write_all(metadata.to_json().as_bytes())?;

    let values: Vec<f32> = data.to_data().to_vec().unwrap();
    let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
    let mut data_file = BufWriter::new(File::create(dir.join("features.bin"))?);
    data_file.write_all(&bytes)?;

    Ok(())
}

/// Load a persisted cache if present and matching the configuration.
///
/// Returns `Ok(None)` when no usable cache exists (missing files or a
/// fingerprint mismatch — the latter is logged and recomputed, never
/// partially reused).
fn load_cache<B: Backend>(
    dir: &Path,
    config: &FeatureCacheConfig,
    num_images: usize,
    device: &B::Device,
) -> Result<Option<Tensor<B, 4>>> {
    if !cache_exists(dir) {
        return Ok(None);
    }

    let mut metadata_file = BufReader::new(File::open(dir.join("metadata.json"))?);
    let mut metadata_str = String::new();
    metadata_file.read_to_string(&mut metadata_str)?;
    let metadata = CacheMetadata::from_json(&metadata_str);

    if !metadata.matches(config, num_images) {
        log::warn!(
            "feature cache at {:?} does not match the current configuration, recomputing",
            dir
        );
        return Ok(None);
    }

    let mut data_file = BufReader::new(File::open(dir.join("features.bin"))?);
    let mut bytes = Vec::new();
    data_file.read_to_end(&mut bytes)?;

    let values: Vec<f32> = bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    let expected = metadata.num_images * metadata.rows * metadata.cols * metadata.feature_dim;
    if values.len() != expected {
        return Err(SemanticFieldError::InvalidCache(format!(
            "expected {} feature values, found {}",
            expected,
            values.len()
        )));
    }

    let data = Tensor::from_data(
        TensorData::new(
            values,
            [
                metadata.num_images,
                metadata.rows,
                metadata.cols,
                metadata.feature_dim,
            ],
        ),
        device,
    );

    Ok(Some(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    /// Extractor producing position-identifiable features: channel 0 holds
    /// the image id parsed from the path, channel 1 the row, channel 2 the
    /// column.
    struct MarkerExtractor;

    impl FeatureExtractor<TestBackend> for MarkerExtractor {
        fn extract(
            &self,
            image_path: &Path,
            target_size: (usize, usize),
        ) -> Result<Tensor<TestBackend, 3>> {
            let (rows, cols) = target_size;
            let marker: f32 = image_path
                .file_name()
                .and_then(|name| name.to_str())
                .and_then(|name| {
                    name.chars()
                        .filter(|c| c.is_ascii_digit())
                        .collect::<String>()
                        .parse()
                        .ok()
                })
                .unwrap_or(0.0);

            let mut values = Vec::with_capacity(3 * rows * cols);
            for channel in 0..3 {
                for row in 0..rows {
                    for col in 0..cols {
                        values.push(match channel {
                            0 => marker,
                            1 => row as f32,
                            _ => col as f32,
                        });
                    }
                }
            }

            Ok(Tensor::from_data(
                TensorData::new(values, [3, rows, cols]),
                &Default::default(),
            ))
        }

        fn feature_dim(&self) -> usize {
            3
        }
    }

    fn image_paths(count: usize) -> Vec<PathBuf> {
        (0..count)
            .map(|i| PathBuf::from(format!("img{}.png", i)))
            .collect()
    }

    fn make_cache(config: FeatureCacheConfig, count: usize) -> FeatureCache<TestBackend> {
        let device = Default::default();
        FeatureCache::new(config, &device, &image_paths(count), None, || {
            Ok(MarkerExtractor)
        })
        .unwrap()
    }

    #[test]
    fn test_create_quarter_resolution() {
        let cache = make_cache(FeatureCacheConfig::new((480, 640)).with_feature_dim(3), 2);

        assert_eq!(cache.data().dims(), [2, 120, 160, 3]);
        assert_eq!(cache.num_images(), 2);
        assert_eq!(cache.cache_resolution(), (120, 160));
        assert_eq!(cache.feature_dim(), 3);
    }

    #[test]
    fn test_query_scaling() {
        let cache = make_cache(FeatureCacheConfig::new((480, 640)).with_feature_dim(3), 2);

        // (x=320, y=240) at scale 0.25 lands on cache cell (80, 60).
        let result = cache
            .query(&[ImagePoint::new(1, 320.0, 240.0)])
            .unwrap();
        let values: Vec<f32> = result.to_data().to_vec().unwrap();

        assert_eq!(values, vec![1.0, 80.0, 60.0]);
    }

    #[test]
    fn test_query_last_valid_pixel() {
        let cache = make_cache(FeatureCacheConfig::new((480, 640)).with_feature_dim(3), 2);

        let result = cache
            .query(&[ImagePoint::new(1, 479.0, 639.0)])
            .unwrap();
        let values: Vec<f32> = result.to_data().to_vec().unwrap();

        // Truncation keeps the query on the last valid cache cell.
        assert_eq!(values, vec![1.0, 119.0, 159.0]);
    }

    #[test]
    fn test_query_origin() {
        let cache = make_cache(FeatureCacheConfig::new((64, 64)).with_feature_dim(3), 2);

        let values: Vec<f32> = cache
            .query(&[ImagePoint::new(0, 0.0, 0.0)])
            .unwrap()
            .to_data()
            .to_vec()
            .unwrap();

        assert_eq!(values, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_query_idempotent() {
        let cache = make_cache(FeatureCacheConfig::new((64, 64)).with_feature_dim(3), 2);
        let points = [
            ImagePoint::new(0, 10.0, 20.0),
            ImagePoint::new(1, 63.0, 1.0),
        ];

        let a: Vec<f32> = cache.query(&points).unwrap().to_data().to_vec().unwrap();
        let b: Vec<f32> = cache.query(&points).unwrap().to_data().to_vec().unwrap();

        assert_eq!(a, b);
    }

    #[test]
    fn test_query_rejects_bad_image_index() {
        let cache = make_cache(FeatureCacheConfig::new((64, 64)).with_feature_dim(3), 2);

        assert!(matches!(
            cache.query(&[ImagePoint::new(2, 0.0, 0.0)]),
            Err(SemanticFieldError::ImageIndexOutOfBounds { index: 2, num_images: 2 })
        ));
    }

    #[test]
    fn test_query_rejects_out_of_range_coordinates() {
        let cache = make_cache(FeatureCacheConfig::new((64, 64)).with_feature_dim(3), 2);

        assert!(matches!(
            cache.query(&[ImagePoint::new(0, 64.0, 0.0)]),
            Err(SemanticFieldError::PointOutOfBounds { .. })
        ));
        assert!(matches!(
            cache.query(&[ImagePoint::new(0, 0.0, -1.0)]),
            Err(SemanticFieldError::PointOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_empty_image_list_rejected() {
        let device = Default::default();
        let result = FeatureCache::<TestBackend>::new(
            FeatureCacheConfig::new((64, 64)).with_feature_dim(3),
            &device,
            &[],
            None,
            || Ok(MarkerExtractor),
        );

        assert!(result.is_err());
    }

    #[test]
    fn test_extractor_shape_mismatch_aborts() {
        struct WrongShapeExtractor;
        impl FeatureExtractor<TestBackend> for WrongShapeExtractor {
            fn extract(
                &self,
                _image_path: &Path,
                _target_size: (usize, usize),
            ) -> Result<Tensor<TestBackend, 3>> {
                Ok(Tensor::zeros([3, 4, 4], &Default::default()))
            }
            fn feature_dim(&self) -> usize {
                3
            }
        }

        let device = Default::default();
        let result = FeatureCache::<TestBackend>::new(
            FeatureCacheConfig::new((64, 64)).with_feature_dim(3),
            &device,
            &image_paths(1),
            None,
            || Ok(WrongShapeExtractor),
        );

        assert!(matches!(
            result,
            Err(SemanticFieldError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_metadata_json_roundtrip() {
        let metadata = CacheMetadata {
            version: CACHE_VERSION,
            num_images: 7,
            rows: 120,
            cols: 160,
            feature_dim: 768,
            image_height: 480,
            image_width: 640,
            downsample: 4,
        };

        let parsed = CacheMetadata::from_json(&metadata.to_json());

        assert_eq!(parsed.version, CACHE_VERSION);
        assert_eq!(parsed.num_images, 7);
        assert_eq!(parsed.rows, 120);
        assert_eq!(parsed.cols, 160);
        assert_eq!(parsed.feature_dim, 768);
        assert_eq!(parsed.image_height, 480);
        assert_eq!(parsed.image_width, 640);
        assert_eq!(parsed.downsample, 4);
    }

    #[test]
    fn test_metadata_matches_fingerprint() {
        let config = FeatureCacheConfig::new((480, 640)).with_feature_dim(3);
        let metadata = CacheMetadata {
            version: CACHE_VERSION,
            num_images: 2,
            rows: 120,
            cols: 160,
            feature_dim: 3,
            image_height: 480,
            image_width: 640,
            downsample: 4,
        };

        assert!(metadata.matches(&config, 2));
        assert!(!metadata.matches(&config, 3));
        assert!(!metadata.matches(&config.clone().with_downsample(2), 2));
        assert!(!metadata.matches(&config.with_feature_dim(768), 2));
    }
}
