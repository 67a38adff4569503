//! Exact L2 vector index
//!
//! One index per contract type, built once from keyword text and read-only
//! after load. Search is exhaustive: every stored vector is compared against
//! the query, so results are exact. Distances are squared Euclidean distances,
//! the same quantity a flat L2 index reports.
//!
//! # On-disk format
//!
//! Little-endian: magic `CIDX`, `u32` format version, `u32` dimension,
//! `u64` vector count, then `count * dimension` `f32` values. The identifier
//! list lives next to it in a plain-text sidecar, one line per vector in
//! insertion order.

use std::fs;
use std::path::Path;
use thiserror::Error;

const MAGIC: &[u8; 4] = b"CIDX";
const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: usize = 4 + 4 + 4 + 8;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("Cannot build an index from zero vectors")]
    Empty,

    #[error("Index dimension must be positive")]
    ZeroDimension,

    #[error("Dimension mismatch: index has {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Vector contains non-finite values")]
    NonFinite,

    #[error("Corrupt index data: {0}")]
    Corrupt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A search hit: position in insertion order plus squared L2 distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f32,
}

/// Flat, exhaustively searched vector index
#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl EmbeddingIndex {
    /// Create an empty index of a fixed dimension
    pub fn new(dimension: usize) -> Result<Self, IndexError> {
        if dimension == 0 {
            return Err(IndexError::ZeroDimension);
        }
        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    /// Build an index over vectors of uniform dimension
    pub fn build(vectors: &[Vec<f32>]) -> Result<Self, IndexError> {
        let first = vectors.first().ok_or(IndexError::Empty)?;
        let mut index = Self::new(first.len())?;
        for vector in vectors {
            index.add(vector)?;
        }
        Ok(index)
    }

    pub fn add(&mut self, vector: &[f32]) -> Result<(), IndexError> {
        self.check_dimension(vector)?;
        if vector.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFinite);
        }
        self.data.extend_from_slice(vector);
        Ok(())
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of stored vectors
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The `k` nearest vectors, ascending by distance (ties by position)
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>, IndexError> {
        self.check_dimension(query)?;

        let mut neighbors: Vec<Neighbor> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(index, stored)| Neighbor {
                index,
                distance: squared_l2(query, stored),
            })
            .collect();

        neighbors.sort_by(|a, b| {
            a.distance
                .total_cmp(&b.distance)
                .then_with(|| a.index.cmp(&b.index))
        });
        neighbors.truncate(k);
        Ok(neighbors)
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<(), IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER_LEN + self.data.len() * 4);
        bytes.extend_from_slice(MAGIC);
        bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
        bytes.extend_from_slice(&(self.dimension as u32).to_le_bytes());
        bytes.extend_from_slice(&(self.len() as u64).to_le_bytes());
        for value in &self.data {
            bytes.extend_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, IndexError> {
        if bytes.len() < HEADER_LEN || &bytes[..4] != MAGIC {
            return Err(IndexError::Corrupt("missing index header".to_string()));
        }

        let version = u32::from_le_bytes(le_array(&bytes[4..8]));
        if version != FORMAT_VERSION {
            return Err(IndexError::Corrupt(format!(
                "unsupported format version {}",
                version
            )));
        }

        let dimension = u32::from_le_bytes(le_array(&bytes[8..12])) as usize;
        let count = u64::from_le_bytes(le_array(&bytes[12..20])) as usize;
        let expected = count
            .checked_mul(dimension)
            .and_then(|n| n.checked_mul(4))
            .and_then(|n| n.checked_add(HEADER_LEN))
            .ok_or_else(|| IndexError::Corrupt("index size overflow".to_string()))?;
        if bytes.len() != expected {
            return Err(IndexError::Corrupt(format!(
                "expected {} bytes, found {}",
                expected,
                bytes.len()
            )));
        }

        let mut index = Self::new(dimension)?;
        index.data = bytes[HEADER_LEN..]
            .chunks_exact(4)
            .map(|chunk| f32::from_le_bytes(le_array(chunk)))
            .collect();
        if index.data.iter().any(|v| !v.is_finite()) {
            return Err(IndexError::NonFinite);
        }
        Ok(index)
    }

    pub fn write_to(&self, path: &Path) -> Result<(), IndexError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.to_bytes())?;
        Ok(())
    }

    pub fn read_from(path: &Path) -> Result<Self, IndexError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn le_array<const N: usize>(slice: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slice[..N]);
    out
}

/// Squared Euclidean distance between two equal-length vectors
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

/// Read an identifier sidecar: one entry per line, blank lines skipped
pub fn read_filenames(path: &Path) -> std::io::Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

pub fn write_filenames(path: &Path, filenames: &[String]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut content = String::new();
    for name in filenames {
        content.push_str(name);
        content.push('\n');
    }
    fs::write(path, content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample_index() -> EmbeddingIndex {
        EmbeddingIndex::build(&[
            vec![0.0, 0.0],
            vec![1.0, 0.0],
            vec![0.0, 2.0],
            vec![3.0, 3.0],
        ])
        .unwrap()
    }

    #[test]
    fn test_search_is_exact_and_ascending() {
        let index = sample_index();
        let hits = index.search(&[0.9, 0.0], 3).unwrap();
        let order: Vec<usize> = hits.iter().map(|h| h.index).collect();
        assert_eq!(order, vec![1, 0, 2]);
        assert!((hits[0].distance - 0.01).abs() < 1e-6);
        assert!((hits[1].distance - 0.81).abs() < 1e-6);
        assert!(hits.windows(2).all(|w| w[0].distance <= w[1].distance));
    }

    #[test]
    fn test_search_k_larger_than_corpus() {
        let index = sample_index();
        assert_eq!(index.search(&[0.0, 0.0], 10).unwrap().len(), 4);
        assert!(index.search(&[0.0, 0.0], 0).unwrap().is_empty());
    }

    #[test]
    fn test_dimension_mismatch() {
        let index = sample_index();
        assert!(matches!(
            index.search(&[1.0], 1),
            Err(IndexError::DimensionMismatch {
                expected: 2,
                actual: 1
            })
        ));
        assert!(matches!(
            EmbeddingIndex::build(&[vec![1.0, 2.0], vec![1.0]]),
            Err(IndexError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_build_rejects_empty_and_non_finite() {
        assert!(matches!(EmbeddingIndex::build(&[]), Err(IndexError::Empty)));
        assert!(matches!(
            EmbeddingIndex::build(&[vec![f32::NAN]]),
            Err(IndexError::NonFinite)
        ));
    }

    #[test]
    fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("买卖").join("knowledge_base.index");
        let index = sample_index();
        index.write_to(&path).unwrap();

        let loaded = EmbeddingIndex::read_from(&path).unwrap();
        assert_eq!(loaded, index);
        assert_eq!(loaded.len(), 4);
        let nearest = loaded.search(&[0.0, 2.0], 1).unwrap();
        assert_eq!(nearest[0].index, 2);
        assert_eq!(nearest[0].distance, 0.0);
    }

    #[test]
    fn test_rejects_truncated_bytes() {
        let mut bytes = sample_index().to_bytes();
        bytes.pop();
        assert!(matches!(
            EmbeddingIndex::from_bytes(&bytes),
            Err(IndexError::Corrupt(_))
        ));
        assert!(matches!(
            EmbeddingIndex::from_bytes(b"nope"),
            Err(IndexError::Corrupt(_))
        ));
    }

    #[test]
    fn test_filenames_sidecar_roundtrip_skips_blanks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("filenames.txt");
        std::fs::write(&path, "房屋租赁合同.txt\n\n  汽车买卖合同.txt  \n").unwrap();
        assert_eq!(
            read_filenames(&path).unwrap(),
            vec!["房屋租赁合同.txt", "汽车买卖合同.txt"]
        );

        write_filenames(&path, &["a.txt".to_string()]).unwrap();
        assert_eq!(read_filenames(&path).unwrap(), vec!["a.txt"]);
    }
}
