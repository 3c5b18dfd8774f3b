use std::path::{Path, PathBuf};

use image::imageops::FilterType;
use thiserror::Error;

use crate::frame_source::domain::frame_source::{FrameObserver, PixelBufferSource};
use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::pixel_buffer::PixelBuffer;

#[derive(Error, Debug)]
pub enum ImageSequenceError {
    #[error("no images to encode")]
    Empty,
    #[error("failed to list {}: {source}", path.display())]
    ReadDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Feeds still images from disk, one per frame, in the given order.
///
/// Each image is decoded with the `image` crate and stretched to the frame
/// size. Unreadable files are skipped with a warning rather than ending the
/// stream.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    next: usize,
    delivered: usize,
    skipped: usize,
}

impl ImageSequenceSource {
    pub fn from_paths(paths: Vec<PathBuf>) -> Result<Self, ImageSequenceError> {
        if paths.is_empty() {
            return Err(ImageSequenceError::Empty);
        }
        Ok(Self {
            paths,
            next: 0,
            delivered: 0,
            skipped: 0,
        })
    }

    /// Every image in `dir` (by extension), sorted by file name.
    pub fn from_directory(dir: &Path) -> Result<Self, ImageSequenceError> {
        let read_dir_error = |source| ImageSequenceError::ReadDir {
            path: dir.to_path_buf(),
            source,
        };

        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir).map_err(read_dir_error)? {
            let path = entry.map_err(read_dir_error)?.path();
            if path.is_file() && is_image(&path) {
                paths.push(path);
            }
        }
        paths.sort();
        Self::from_paths(paths)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// Images written into frames so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Images that could not be decoded.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    fn load_into(path: &Path, buffer: &mut PixelBuffer) -> Result<(), Box<dyn std::error::Error>> {
        let rgba = image::open(path)?.to_rgba8();
        let (width, height) = (buffer.width(), buffer.height());
        if rgba.dimensions() == (width, height) {
            buffer.fill_from_rgba(&rgba)
        } else {
            log::debug!(
                "Resizing {} from {}x{} to {}",
                path.display(),
                rgba.width(),
                rgba.height(),
                buffer.size()
            );
            let resized = image::imageops::resize(&rgba, width, height, FilterType::Triangle);
            buffer.fill_from_rgba(&resized)
        }
    }
}

impl PixelBufferSource for ImageSequenceSource {
    fn fill_pixel_buffer(&mut self, buffer: &mut PixelBuffer) -> bool {
        while let Some(path) = self.paths.get(self.next) {
            self.next += 1;
            match Self::load_into(path, buffer) {
                Ok(()) => {
                    self.delivered += 1;
                    return true;
                }
                Err(e) => {
                    log::warn!("Skipping {}: {e}", path.display());
                    self.skipped += 1;
                }
            }
        }
        false
    }
}

impl FrameObserver for ImageSequenceSource {
    fn on_failure(&mut self, reason: &str) {
        log::error!("Encoding failed after {} images: {reason}", self.delivered);
    }

    fn on_frames_exhausted(&mut self) {
        log::info!(
            "All {} images added ({} skipped), finishing compression",
            self.delivered,
            self.skipped
        );
    }

    fn on_encoding_finished(&mut self) {
        log::info!("Image sequence encoded");
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}
