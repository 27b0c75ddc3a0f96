//! Subdivision tags: creases, corners, holes and boundary rules.

use std::collections::HashMap;
use std::hash::{Hash, Hasher};

/// How boundary vertices are interpolated during subdivision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BoundaryInterpolation {
    /// Boundary edges are sharp, boundary vertices are smooth.
    #[default]
    EdgeOnly,
    /// Boundary edges are sharp, and vertices with a single incident face
    /// are kept as corners.
    EdgeAndCorner,
}

/// Sharpness annotations consumed by refinement.
///
/// Creases are given as vertex chains: a chain of `L` vertices in
/// `crease_indices` describes `L - 1` edges, with `crease_lengths` holding
/// each chain's `L`. `crease_weights` holds either one sharpness per chain or
/// one per edge.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SubdivTags {
    pub crease_indices: Vec<i32>,
    pub crease_lengths: Vec<i32>,
    pub crease_weights: Vec<f32>,
    pub corner_indices: Vec<i32>,
    pub corner_weights: Vec<f32>,
    /// Faces that are refined but never drawn.
    pub hole_indices: Vec<i32>,
    pub boundary: BoundaryInterpolation,
}

impl SubdivTags {
    /// Tags with the given hole faces and nothing else.
    pub fn with_holes(holes: impl Into<Vec<i32>>) -> Self {
        Self {
            hole_indices: holes.into(),
            ..Self::default()
        }
    }

    /// Add a crease chain with a single sharpness.
    pub fn with_crease(mut self, chain: &[i32], sharpness: f32) -> Self {
        self.crease_indices.extend_from_slice(chain);
        self.crease_lengths.push(chain.len() as i32);
        self.crease_weights.push(sharpness);
        self
    }

    /// Add a sharp corner vertex.
    pub fn with_corner(mut self, vertex: i32, sharpness: f32) -> Self {
        self.corner_indices.push(vertex);
        self.corner_weights.push(sharpness);
        self
    }

    /// Set the boundary interpolation rule.
    pub fn with_boundary(mut self, boundary: BoundaryInterpolation) -> Self {
        self.boundary = boundary;
        self
    }

    /// Check if no tag is set.
    pub fn is_empty(&self) -> bool {
        self.crease_indices.is_empty()
            && self.corner_indices.is_empty()
            && self.hole_indices.is_empty()
            && self.boundary == BoundaryInterpolation::default()
    }

    /// Sort and dedup hole indices so equal hole sets compare equal.
    pub(crate) fn canonicalize(&mut self) {
        self.hole_indices.sort_unstable();
        self.hole_indices.dedup();
    }

    /// Per-edge sharpness keyed by the edge's sorted vertex pair.
    ///
    /// Malformed chains (lengths running past the index list) are cut short.
    pub fn edge_sharpness(&self) -> HashMap<(u32, u32), f32> {
        let per_chain = self.crease_weights.len() == self.crease_lengths.len();
        let mut result = HashMap::new();
        let mut cursor = 0usize;
        let mut edge = 0usize;

        for (chain, &length) in self.crease_lengths.iter().enumerate() {
            let length = length.max(0) as usize;
            let Some(vertices) = self.crease_indices.get(cursor..cursor + length) else {
                log::warn!("SubdivTags: crease chain {} runs past the index list", chain);
                break;
            };
            for pair in vertices.windows(2) {
                let weight = if per_chain {
                    self.crease_weights[chain]
                } else {
                    self.crease_weights.get(edge).copied().unwrap_or(0.0)
                };
                edge += 1;
                if pair[0] < 0 || pair[1] < 0 || weight <= 0.0 {
                    continue;
                }
                result.insert(edge_key(pair[0] as u32, pair[1] as u32), weight);
            }
            cursor += length;
        }
        result
    }

    /// Per-vertex corner sharpness.
    pub fn vertex_sharpness(&self, num_points: usize) -> Vec<f32> {
        let mut result = vec![0.0; num_points];
        for (i, &vertex) in self.corner_indices.iter().enumerate() {
            let weight = self.corner_weights.get(i).copied().unwrap_or(0.0);
            if let Some(slot) = usize::try_from(vertex).ok().and_then(|v| result.get_mut(v)) {
                *slot = weight;
            }
        }
        result
    }
}

impl Hash for SubdivTags {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.crease_indices.hash(state);
        self.crease_lengths.hash(state);
        for weight in &self.crease_weights {
            weight.to_bits().hash(state);
        }
        self.corner_indices.hash(state);
        for weight in &self.corner_weights {
            weight.to_bits().hash(state);
        }
        self.hole_indices.hash(state);
        self.boundary.hash(state);
    }
}

/// Sorted vertex pair identifying an undirected edge.
pub fn edge_key(a: u32, b: u32) -> (u32, u32) {
    if a < b { (a, b) } else { (b, a) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_per_chain_weights() {
        let tags = SubdivTags::default().with_crease(&[0, 1, 2], 2.0);
        let sharpness = tags.edge_sharpness();
        assert_eq!(sharpness.len(), 2);
        assert_eq!(sharpness[&(0, 1)], 2.0);
        assert_eq!(sharpness[&(1, 2)], 2.0);
    }

    #[test]
    fn test_per_edge_weights() {
        let tags = SubdivTags {
            crease_indices: vec![3, 2, 1],
            crease_lengths: vec![3],
            crease_weights: vec![1.0, 4.0],
            ..SubdivTags::default()
        };
        let sharpness = tags.edge_sharpness();
        assert_eq!(sharpness[&(2, 3)], 1.0);
        assert_eq!(sharpness[&(1, 2)], 4.0);
    }

    #[test]
    fn test_malformed_chain_is_cut() {
        let tags = SubdivTags {
            crease_indices: vec![0, 1],
            crease_lengths: vec![2, 5],
            crease_weights: vec![1.0, 1.0],
            ..SubdivTags::default()
        };
        assert_eq!(tags.edge_sharpness().len(), 1);
    }

    #[test]
    fn test_corner_out_of_range_ignored() {
        let tags = SubdivTags::default().with_corner(1, 3.0).with_corner(9, 1.0);
        assert_eq!(tags.vertex_sharpness(3), vec![0.0, 3.0, 0.0]);
    }
}
