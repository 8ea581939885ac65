//! Rasterizing chart regions into embeddable PNG snapshots.

use crate::charts::ChartRegion;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use resvg::tiny_skia::{self, Pixmap, Transform};
use resvg::usvg::{self, fontdb};
use std::sync::Arc;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

const PNG_DATA_URI_PREFIX: &str = "data:image/png;base64,";

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("chart markup could not be parsed: {0}")]
    Parse(String),
    #[error("cannot allocate a {width}x{height} canvas")]
    Canvas { width: u32, height: u32 },
    #[error("PNG encoding failed: {0}")]
    Encode(String),
    #[error("rasterizer task failed: {0}")]
    Task(String),
    #[error("not a PNG data URI")]
    NotDataUri,
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

/// A captured chart image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub data_uri: String,
    pub width: u32,
    pub height: u32,
}

impl Snapshot {
    pub fn from_png(png: &[u8], width: u32, height: u32) -> Self {
        Self {
            data_uri: format!("{PNG_DATA_URI_PREFIX}{}", STANDARD.encode(png)),
            width,
            height,
        }
    }

    /// Decoded PNG bytes behind the data URI.
    pub fn png_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        let payload = self
            .data_uri
            .strip_prefix(PNG_DATA_URI_PREFIX)
            .ok_or(SnapshotError::NotDataUri)?;
        Ok(STANDARD.decode(payload)?)
    }
}

/// Turns a rendered chart region into an image.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait SnapshotCapturer: Send + Sync {
    async fn capture(&self, region: &ChartRegion) -> Result<Snapshot, SnapshotError>;
}

/// Rasterizes chart SVG with resvg on the blocking pool.
#[derive(Debug, Clone)]
pub struct ResvgCapturer {
    scale: f32,
    fonts: Arc<fontdb::Database>,
}

impl ResvgCapturer {
    /// Capturer using the system fonts for chart labels.
    pub fn new(scale: f32) -> Self {
        let mut fonts = fontdb::Database::new();
        fonts.load_system_fonts();
        Self::with_fonts(scale, fonts)
    }

    pub fn with_fonts(scale: f32, fonts: fontdb::Database) -> Self {
        Self {
            scale: if scale > 0.0 { scale } else { 1.0 },
            fonts: Arc::new(fonts),
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }
}

fn rasterize(svg: &str, scale: f32, fonts: Arc<fontdb::Database>) -> Result<Snapshot, SnapshotError> {
    let mut options = usvg::Options::default();
    options.fontdb = fonts;

    let tree = usvg::Tree::from_str(svg, &options).map_err(|e| SnapshotError::Parse(e.to_string()))?;
    let size = tree.size();
    let width = (size.width() * scale).ceil() as u32;
    let height = (size.height() * scale).ceil() as u32;

    let mut pixmap = Pixmap::new(width, height).ok_or(SnapshotError::Canvas { width, height })?;
    pixmap.fill(tiny_skia::Color::WHITE);
    resvg::render(&tree, Transform::from_scale(scale, scale), &mut pixmap.as_mut());

    let png = pixmap.encode_png().map_err(|e| SnapshotError::Encode(e.to_string()))?;
    Ok(Snapshot::from_png(&png, width, height))
}

#[async_trait]
impl SnapshotCapturer for ResvgCapturer {
    async fn capture(&self, region: &ChartRegion) -> Result<Snapshot, SnapshotError> {
        let svg = region.svg.clone();
        let scale = self.scale;
        let fonts = Arc::clone(&self.fonts);

        tokio::task::spawn_blocking(move || rasterize(&svg, scale, fonts))
            .await
            .map_err(|e| SnapshotError::Task(e.to_string()))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    fn region(svg: &str) -> ChartRegion {
        ChartRegion {
            id: "chart-1".into(),
            title: "test".into(),
            svg: svg.into(),
            width: 40,
            height: 20,
        }
    }

    #[tokio::test]
    async fn captures_scaled_png() {
        let capturer = ResvgCapturer::with_fonts(2.0, fontdb::Database::new());
        let snapshot = capturer
            .capture(&region(
                r##"<svg xmlns="http://www.w3.org/2000/svg" width="40" height="20"><rect width="40" height="20" fill="#0088FE"/></svg>"##,
            ))
            .await
            .unwrap();

        assert_eq!((snapshot.width, snapshot.height), (80, 40));
        assert!(snapshot.data_uri.starts_with("data:image/png;base64,"));
        assert_eq!(&snapshot.png_bytes().unwrap()[..8], &PNG_SIGNATURE);
    }

    #[tokio::test]
    async fn malformed_markup_is_an_error() {
        let capturer = ResvgCapturer::with_fonts(1.0, fontdb::Database::new());
        let err = capturer.capture(&region("<svg")).await.unwrap_err();
        assert!(matches!(err, SnapshotError::Parse(_)));
    }

    #[test]
    fn data_uri_round_trips() {
        let snapshot = Snapshot::from_png(&PNG_SIGNATURE, 1, 1);
        assert_eq!(snapshot.png_bytes().unwrap(), PNG_SIGNATURE.to_vec());

        let bogus = Snapshot {
            data_uri: "data:text/plain,hi".into(),
            width: 1,
            height: 1,
        };
        assert!(matches!(bogus.png_bytes(), Err(SnapshotError::NotDataUri)));
    }
}
