//! Detection records and per-image detection lists.

use crate::config::{DETECTION_LEN, NUM_COORDS, NUM_KEYPOINTS};
use crate::geometry::BoxCorners;
use crate::util::{BlazePostError, BlazePostResult};

/// One face candidate: box, six keypoints, and confidence.
///
/// Coordinates are `[ymin, xmin, ymax, xmax, kp1_x, kp1_y, ..., kp6_x, kp6_y]`
/// in the normalized space of the anchors.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub coords: [f32; NUM_COORDS],
    pub score: f32,
}

impl Detection {
    pub fn new(coords: [f32; NUM_COORDS], score: f32) -> Self {
        Self { coords, score }
    }

    /// Builds a detection from a 17-value row (coordinates then score).
    pub fn from_row(row: &[f32; DETECTION_LEN]) -> Self {
        let mut coords = [0.0; NUM_COORDS];
        coords.copy_from_slice(&row[..NUM_COORDS]);
        Self {
            coords,
            score: row[NUM_COORDS],
        }
    }

    /// Returns the 17-value row (coordinates then score).
    pub fn to_row(&self) -> [f32; DETECTION_LEN] {
        let mut row = [0.0; DETECTION_LEN];
        row[..NUM_COORDS].copy_from_slice(&self.coords);
        row[NUM_COORDS] = self.score;
        row
    }

    /// Bounding box as `[ymin, xmin, ymax, xmax]`.
    pub fn bbox(&self) -> BoxCorners {
        [self.coords[0], self.coords[1], self.coords[2], self.coords[3]]
    }

    pub fn ymin(&self) -> f32 {
        self.coords[0]
    }

    pub fn xmin(&self) -> f32 {
        self.coords[1]
    }

    pub fn ymax(&self) -> f32 {
        self.coords[2]
    }

    pub fn xmax(&self) -> f32 {
        self.coords[3]
    }

    /// Keypoint `index` (0..6) as `(x, y)`.
    pub fn keypoint(&self, index: usize) -> Option<(f32, f32)> {
        if index >= NUM_KEYPOINTS {
            return None;
        }
        let offset = 4 + index * 2;
        Some((self.coords[offset], self.coords[offset + 1]))
    }

    /// All keypoints as `(x, y)` pairs.
    pub fn keypoints(&self) -> [(f32, f32); NUM_KEYPOINTS] {
        let mut out = [(0.0, 0.0); NUM_KEYPOINTS];
        for (k, slot) in out.iter_mut().enumerate() {
            let offset = 4 + k * 2;
            *slot = (self.coords[offset], self.coords[offset + 1]);
        }
        out
    }
}

/// Ordered detections for a single image. Empty is a valid result.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detections {
    items: Vec<Detection>,
}

impl Detections {
    /// Creates an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wraps detections in their current order.
    pub fn from_vec(items: Vec<Detection>) -> Self {
        Self { items }
    }

    /// Builds a list from dense row-major `[n, 17]` data.
    ///
    /// A trailing partial row is an error; `expected` then reports the length
    /// of the whole rows present.
    pub fn from_rows(rows: &[f32]) -> BlazePostResult<Self> {
        if rows.len() % DETECTION_LEN != 0 {
            return Err(BlazePostError::BufferLengthMismatch {
                expected: rows.len() - rows.len() % DETECTION_LEN,
                got: rows.len(),
            });
        }
        let items = rows
            .chunks_exact(DETECTION_LEN)
            .map(|chunk| {
                let mut row = [0.0; DETECTION_LEN];
                row.copy_from_slice(chunk);
                Detection::from_row(&row)
            })
            .collect();
        Ok(Self { items })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Detection> {
        self.items.get(index)
    }

    pub fn as_slice(&self) -> &[Detection] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
        self.items.iter()
    }

    pub fn push(&mut self, detection: Detection) {
        self.items.push(detection);
    }

    pub fn into_vec(self) -> Vec<Detection> {
        self.items
    }

    /// Dense row-major `[len, 17]` array; zero rows when empty.
    pub fn to_rows(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.items.len() * DETECTION_LEN);
        for detection in &self.items {
            out.extend_from_slice(&detection.to_row());
        }
        out
    }

    /// Shape of [`Detections::to_rows`] as `[rows, 17]`.
    pub fn shape(&self) -> [usize; 2] {
        [self.items.len(), DETECTION_LEN]
    }
}

impl IntoIterator for Detections {
    type Item = Detection;
    type IntoIter = std::vec::IntoIter<Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Detections {
    type Item = &'a Detection;
    type IntoIter = std::slice::Iter<'a, Detection>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl FromIterator<Detection> for Detections {
    fn from_iter<I: IntoIterator<Item = Detection>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}
