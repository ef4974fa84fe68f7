//! Geometric clustering of OCR blocks into sign panels
//!
//! Blocks closer than an adaptive threshold are merged until a full pass over
//! all cluster pairs performs no merge. Distances are measured between block
//! centres with the vertical offset down-weighted, since sign text is stacked.

use crate::domain::types::{BoundingBox, Cluster, OcrBlock};
use smallvec::{smallvec, SmallVec};
use tracing::debug;

/// Tunables for the adaptive merge threshold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClusterParams {
    /// Multiplier on the mean block dimension
    pub scale: f64,
    /// Density factor when blocks are packed tightly
    pub dense_factor: f64,
    /// Density factor otherwise
    pub sparse_factor: f64,
    /// Blocks per square pixel above which the layout counts as dense
    pub density_cutoff: f64,
    pub min_threshold: f64,
    pub max_threshold: f64,
    /// Weight applied to the vertical centre offset
    pub vertical_weight: f64,
}

impl Default for ClusterParams {
    fn default() -> Self {
        Self {
            scale: 1.2,
            dense_factor: 0.6,
            sparse_factor: 0.8,
            density_cutoff: 0.0001,
            min_threshold: 20.0,
            max_threshold: 200.0,
            vertical_weight: 0.7,
        }
    }
}

type Members = SmallVec<[usize; 4]>;

/// Groups OCR blocks into panels
#[derive(Debug, Clone, Default)]
pub struct Clusterer {
    params: ClusterParams,
}

impl Clusterer {
    pub fn new(params: ClusterParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &ClusterParams {
        &self.params
    }

    /// Merge blocks into clusters. Member lines keep their OCR order.
    pub fn cluster(&self, blocks: &[OcrBlock]) -> Vec<Cluster> {
        if blocks.is_empty() {
            return Vec::new();
        }

        let boxes: Vec<BoundingBox> = blocks.iter().map(|b| b.bounding_box).collect();
        let threshold = self.adaptive_threshold(&boxes);

        let mut clusters: Vec<Members> = (0..blocks.len()).map(|i| smallvec![i]).collect();

        // Restart the pair scan after every merge until a pass merges nothing
        while let Some((i, j)) = self.find_mergeable_pair(&clusters, &boxes, threshold) {
            let absorbed = std::mem::take(&mut clusters[j]);
            clusters[i].extend(absorbed);
        }

        let merged: Vec<Cluster> = clusters
            .into_iter()
            .filter(|members| !members.is_empty())
            .filter_map(|mut members| {
                // Reading order: top edge first, OCR order on ties
                members.sort_unstable_by_key(|&i| (blocks[i].bounding_box.top, i));
                combine(&members, blocks)
            })
            .collect();

        debug!(
            blocks = blocks.len(),
            clusters = merged.len(),
            threshold = %format!("{:.1}", threshold),
            "blocks_clustered"
        );

        merged
    }

    fn find_mergeable_pair(
        &self,
        clusters: &[Members],
        boxes: &[BoundingBox],
        threshold: f64,
    ) -> Option<(usize, usize)> {
        for i in 0..clusters.len() {
            if clusters[i].is_empty() {
                continue;
            }
            for j in (i + 1)..clusters.len() {
                if clusters[j].is_empty() {
                    continue;
                }
                if self.cluster_distance(&clusters[i], &clusters[j], boxes) <= threshold {
                    return Some((i, j));
                }
            }
        }
        None
    }

    /// Merge threshold derived from mean block size and layout density,
    /// clamped to the configured bounds
    pub fn adaptive_threshold(&self, boxes: &[BoundingBox]) -> f64 {
        if boxes.is_empty() {
            return self.params.min_threshold;
        }

        let n = boxes.len() as f64;
        let avg_width = boxes.iter().map(|b| f64::from(b.width())).sum::<f64>() / n;
        let avg_height = boxes.iter().map(|b| f64::from(b.height())).sum::<f64>() / n;
        let base = (avg_width + avg_height) / 2.0 * self.params.scale;

        // A zero-area layout divides to infinity and counts as dense
        let bounds_area = BoundingBox::enclosing(boxes).map_or(0, |b| b.area()) as f64;
        let density = n / bounds_area;

        let factor = if density > self.params.density_cutoff {
            self.params.dense_factor
        } else {
            self.params.sparse_factor
        };

        (base * factor).max(self.params.min_threshold).min(self.params.max_threshold)
    }

    /// Weighted centre distance; vertical offset counts for less
    pub fn box_distance(&self, a: &BoundingBox, b: &BoundingBox) -> f64 {
        let (ax, ay) = a.center();
        let (bx, by) = b.center();
        let dx = (ax - bx).abs();
        let dy = (ay - by).abs() * self.params.vertical_weight;
        (dx * dx + dy * dy).sqrt()
    }

    fn cluster_distance(&self, a: &[usize], b: &[usize], boxes: &[BoundingBox]) -> f64 {
        a.iter()
            .flat_map(|&i| b.iter().map(move |&j| (i, j)))
            .map(|(i, j)| self.box_distance(&boxes[i], &boxes[j]))
            .fold(f64::MAX, f64::min)
    }
}

fn combine(members: &[usize], blocks: &[OcrBlock]) -> Option<Cluster> {
    let bounding_box = BoundingBox::enclosing(members.iter().map(|&i| &blocks[i].bounding_box))?;
    let lines: Vec<_> = members.iter().flat_map(|&i| blocks[i].lines.iter().cloned()).collect();
    let combined_text = lines.iter().map(|l| l.text.as_str()).collect::<Vec<_>>().join("\n");
    Some(Cluster { lines, bounding_box, combined_text })
}
