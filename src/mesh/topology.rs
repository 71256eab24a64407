//! Wireframe topology table
//!
//! A fixed, ordered list of keypoint index triples defining which landmark
//! triples form drawable triangles. Loaded once at startup and shared
//! read-only by every render pass; always injected, never a global, so tests
//! can swap in small synthetic tables.

use std::path::Path;
use std::sync::Arc;

use crate::error::{Result, TopologyError};

/// Immutable table of triangle vertex indices.
///
/// Cloning is cheap; all clones share the same backing storage.
#[derive(Debug, Clone)]
pub struct Topology {
    triples: Arc<[[usize; 3]]>,
}

impl Topology {
    /// Build from explicit triples (synthetic tables, tests).
    pub fn from_triples(triples: Vec<[usize; 3]>) -> Result<Self> {
        if triples.is_empty() {
            return Err(TopologyError::Empty.into());
        }
        Ok(Self {
            triples: triples.into(),
        })
    }

    /// Load a JSON asset: an array of `[a, b, c]` keypoint index triples.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            TopologyError::ReadFile(format!("{}: {}", path.as_ref().display(), e))
        })?;
        Self::from_json_str(&contents)
    }

    /// Parse a topology from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        let triples: Vec<[usize; 3]> =
            serde_json::from_str(s).map_err(|e| TopologyError::Parse(e.to_string()))?;
        Self::from_triples(triples)
    }

    /// Triangle fan over `keypoints` vertices: `[0, i, i + 1]` for every ring
    /// neighbor pair. Pairs with the synthetic detector's hub-and-ring
    /// keypoint layout.
    pub fn fan(keypoints: usize) -> Result<Self> {
        if keypoints < 3 {
            return Err(TopologyError::TooFewKeypoints(keypoints).into());
        }
        let triples = (1..keypoints - 1).map(|i| [0, i, i + 1]).collect();
        Self::from_triples(triples)
    }

    pub fn triples(&self) -> &[[usize; 3]] {
        &self.triples
    }

    /// Number of triangles in the table.
    pub fn len(&self) -> usize {
        self.triples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.triples.is_empty()
    }

    /// Highest keypoint index referenced by any triple, i.e. one less than
    /// the minimum keypoint count a face must carry for a full wireframe.
    pub fn max_index(&self) -> usize {
        self.triples
            .iter()
            .flatten()
            .copied()
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fan_shape() {
        let topology = Topology::fan(5).unwrap();
        assert_eq!(
            topology.triples(),
            &[[0, 1, 2], [0, 2, 3], [0, 3, 4]]
        );
        assert_eq!(topology.len(), 3);
        assert_eq!(topology.max_index(), 4);
    }

    #[test]
    fn test_fan_too_small() {
        assert!(Topology::fan(2).is_err());
        assert!(Topology::fan(3).is_ok());
    }

    #[test]
    fn test_parse_json() {
        let topology = Topology::from_json_str("[[0, 1, 2], [2, 1, 3]]").unwrap();
        assert_eq!(topology.triples(), &[[0, 1, 2], [2, 1, 3]]);
        assert_eq!(topology.max_index(), 3);
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(Topology::from_json_str("[[0, 1]]").is_err());
        assert!(Topology::from_json_str("not json").is_err());
        assert!(Topology::from_json_str("[]").is_err());
    }

    #[test]
    fn test_clones_share_storage() {
        let topology = Topology::from_triples(vec![[0, 1, 2]]).unwrap();
        let clone = topology.clone();
        assert_eq!(topology.triples().as_ptr(), clone.triples().as_ptr());
    }
}
