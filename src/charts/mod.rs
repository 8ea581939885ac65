//! Chart rendering and the registry of rendered chart regions.

pub mod page;
pub mod post;
pub mod svg;

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChartError {
    #[error("nothing to plot for {chart}")]
    Empty { chart: String },
    #[error("canvas {width}x{height} is too small")]
    TooSmall { width: u32, height: u32 },
}

/// A rendered chart, addressable by its region id.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartRegion {
    pub id: String,
    pub title: String,
    pub svg: String,
    pub width: u32,
    pub height: u32,
}

/// Region id of the insight chart belonging to a feed item.
pub fn region_id(item_id: &str) -> String {
    format!("chart-{item_id}")
}

/// Every chart rendered for the current selection, keyed by region id.
#[derive(Debug, Clone, Default)]
pub struct ChartBoard {
    regions: HashMap<String, ChartRegion>,
}

impl ChartBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, region: ChartRegion) {
        self.regions.insert(region.id.clone(), region);
    }

    pub fn get(&self, id: &str) -> Option<&ChartRegion> {
        self.regions.get(id)
    }

    /// The insight chart of a feed item, if one was rendered.
    pub fn region_for_item(&self, item_id: &str) -> Option<&ChartRegion> {
        self.regions.get(&region_id(item_id))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Regions sorted by id, for stable output.
    pub fn regions(&self) -> Vec<&ChartRegion> {
        let mut regions: Vec<_> = self.regions.values().collect();
        regions.sort_by(|a, b| a.id.cmp(&b.id));
        regions
    }

    /// Drop everything, used when the selection changes.
    pub fn clear(&mut self) {
        self.regions.clear();
    }
}
