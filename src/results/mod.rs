//! Accumulated Result Store
//!
//! Ordered detections for the loaded image, all in original-image space.
//! The store only grows through `append`; `reorder` permutes it for the
//! read-order tool and never drops entries.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::recognition::TextDetection;

/// Detections recognised so far for one loaded image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultStore {
    detections: Vec<TextDetection>,
}

impl ResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append normalized detections, returning the label of the first one
    pub fn append(&mut self, detections: impl IntoIterator<Item = TextDetection>) -> usize {
        let start = self.detections.len();
        self.detections.extend(detections);
        start
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }

    pub fn get(&self, label: usize) -> Option<&TextDetection> {
        self.detections.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TextDetection> {
        self.detections.iter()
    }

    pub fn as_slice(&self) -> &[TextDetection] {
        &self.detections
    }

    /// Put the labels in `order` first, in the given order, followed by every
    /// other detection in its current order. Unknown and repeated labels are
    /// ignored.
    pub fn reorder(&mut self, order: &[usize]) {
        let mut taken = vec![false; self.detections.len()];
        let mut permutation = Vec::with_capacity(self.detections.len());

        for &label in order {
            if label < taken.len() && !taken[label] {
                taken[label] = true;
                permutation.push(label);
            }
        }
        permutation.extend((0..taken.len()).filter(|&i| !taken[i]));

        debug!("Reordering {} detections, {} moved to front", permutation.len(), order.len());

        let mut slots: Vec<Option<TextDetection>> = std::mem::take(&mut self.detections).into_iter().map(Some).collect();
        self.detections = permutation.into_iter().filter_map(|i| slots[i].take()).collect();
    }

    /// Drop everything (new image loaded)
    pub fn clear(&mut self) {
        self.detections.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detection(text: &str) -> TextDetection {
        TextDetection {
            text: text.to_string(),
            min_x: 0.0,
            min_y: 0.0,
            max_x: 1.0,
            max_y: 1.0,
            language: None,
            text_color: None,
        }
    }

    fn texts(store: &ResultStore) -> Vec<&str> {
        store.iter().map(|d| d.text.as_str()).collect()
    }

    #[test]
    fn test_append_returns_first_label() {
        let mut store = ResultStore::new();
        assert_eq!(store.append(vec![detection("一"), detection("二")]), 0);
        assert_eq!(store.append(vec![detection("三")]), 2);
        assert_eq!(store.len(), 3);
        assert_eq!(texts(&store), vec!["一", "二", "三"]);
    }

    #[test]
    fn test_reorder_touched_first() {
        let mut store = ResultStore::new();
        store.append(["a", "b", "c", "d"].map(detection));

        store.reorder(&[2, 0]);
        assert_eq!(texts(&store), vec!["c", "a", "b", "d"]);
    }

    #[test]
    fn test_reorder_ignores_unknown_and_repeated() {
        let mut store = ResultStore::new();
        store.append(["a", "b", "c"].map(detection));

        store.reorder(&[1, 9, 1]);
        assert_eq!(texts(&store), vec!["b", "a", "c"]);
        assert_eq!(store.len(), 3);
    }

    #[test]
    fn test_serde_roundtrip() {
        let mut store = ResultStore::new();
        store.append([detection("你好")]);

        let json = serde_json::to_string(&store).unwrap();
        let parsed: ResultStore = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, store);
    }
}
