//! Uniform subdivision refinement.
//!
//! [`SubdivisionTables`] refines a [`MeshTopology`] level by level and records,
//! for every level, stencils expressing each new vertex as a weighted sum of
//! the previous level's vertices. Refining a primvar then only needs the
//! stencils:
//!
//! - vertex primvars use the scheme's smoothing rules (Catmull-Clark, Loop),
//!   including creases, corners and boundary rules;
//! - varying primvars use linear rules (face and edge midpoints).
//!
//! Refined buffers hold the coarse values first, followed by the values of
//! the last level, so coarse (hull) indices keep addressing the same range.
//! Refined indices are offset accordingly.
//!
//! Catmull-Clark and bilinear refinement split an `n`-gon into `n` quads.
//! Loop refinement splits each triangle into four; non-triangle faces are fan
//! triangulated first.

use std::collections::HashMap;

use super::PrimitiveIndices;
use super::tags::{BoundaryInterpolation, edge_key};
use super::topology::{MeshTopology, SubdivScheme, is_drawable_face};

/// Which rule set refines a primvar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interpolation {
    /// Smooth scheme rules.
    Vertex,
    /// Linear rules.
    Varying,
}

// ============================================================================
// Stencils
// ============================================================================

/// A weighted sum of parent vertices.
#[derive(Debug, Clone, Default)]
struct Stencil {
    entries: Vec<(u32, f64)>,
}

impl Stencil {
    fn vertex(index: u32) -> Self {
        Self {
            entries: vec![(index, 1.0)],
        }
    }

    fn average(indices: impl IntoIterator<Item = u32>) -> Self {
        let indices: Vec<u32> = indices.into_iter().collect();
        let weight = 1.0 / indices.len().max(1) as f64;
        let mut stencil = Self::default();
        for index in indices {
            stencil.add(index, weight);
        }
        stencil
    }

    fn add(&mut self, index: u32, weight: f64) {
        match self.entries.iter_mut().find(|(i, _)| *i == index) {
            Some(entry) => entry.1 += weight,
            None => self.entries.push((index, weight)),
        }
    }

    fn add_scaled(&mut self, other: &Stencil, scale: f64) {
        for &(index, weight) in &other.entries {
            self.add(index, weight * scale);
        }
    }

    /// `a * (1 - t) + b * t`.
    fn lerp(a: &Stencil, b: &Stencil, t: f64) -> Stencil {
        let mut result = Stencil::default();
        result.add_scaled(a, 1.0 - t);
        result.add_scaled(b, t);
        result
    }
}

/// Compressed stencils of one refinement level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StencilTable {
    offsets: Vec<u32>,
    indices: Vec<u32>,
    weights: Vec<f32>,
}

impl StencilTable {
    fn from_stencils(stencils: &[Stencil]) -> Self {
        let mut table = Self {
            offsets: Vec::with_capacity(stencils.len() + 1),
            ..Self::default()
        };
        table.offsets.push(0);
        for stencil in stencils {
            for &(index, weight) in &stencil.entries {
                table.indices.push(index);
                table.weights.push(weight as f32);
            }
            table.offsets.push(table.indices.len() as u32);
        }
        table
    }

    /// Number of output vertices.
    pub fn len(&self) -> usize {
        self.offsets.len().saturating_sub(1)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evaluate the stencils against `source`. Missing source values read as zero.
    pub fn apply(&self, source: &[f64], components: usize) -> Vec<f64> {
        let mut result = vec![0.0; self.len() * components];
        for (out, window) in self.offsets.windows(2).enumerate() {
            for entry in window[0] as usize..window[1] as usize {
                let base = self.indices[entry] as usize * components;
                let weight = self.weights[entry] as f64;
                for c in 0..components {
                    if let Some(&value) = source.get(base + c) {
                        result[out * components + c] += value * weight;
                    }
                }
            }
        }
        result
    }
}

// ============================================================================
// Level topology
// ============================================================================

#[derive(Debug, Clone, Default)]
struct Level {
    num_vertices: usize,
    face_counts: Vec<u32>,
    face_indices: Vec<u32>,
    /// Coarse face each face descends from.
    face_parent: Vec<u32>,
    face_hole: Vec<bool>,
    edge_sharpness: HashMap<(u32, u32), f32>,
    vertex_sharpness: Vec<f32>,
}

impl Level {
    fn coarse(topology: &MeshTopology) -> Self {
        let num_vertices = topology.num_points();
        let triangulate = topology.scheme() == SubdivScheme::Loop;
        let mut level = Level {
            num_vertices,
            edge_sharpness: topology.tags().edge_sharpness(),
            vertex_sharpness: topology.tags().vertex_sharpness(num_vertices),
            ..Level::default()
        };

        for (face, _, vertices) in topology.faces() {
            if !is_drawable_face(vertices) {
                continue;
            }
            let hole = topology.is_hole(face);
            if triangulate && vertices.len() > 3 {
                for i in 1..vertices.len() - 1 {
                    level.push_face(&[vertices[0] as u32, vertices[i] as u32, vertices[i + 1] as u32], face as u32, hole);
                }
            } else {
                let face_vertices: Vec<u32> = vertices.iter().map(|&v| v as u32).collect();
                level.push_face(&face_vertices, face as u32, hole);
            }
        }
        level
    }

    fn push_face(&mut self, vertices: &[u32], parent: u32, hole: bool) {
        self.face_counts.push(vertices.len() as u32);
        self.face_indices.extend_from_slice(vertices);
        self.face_parent.push(parent);
        self.face_hole.push(hole);
    }

    fn faces(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.face_counts
            .iter()
            .scan(0usize, move |offset, &count| {
                let start = *offset;
                *offset += count as usize;
                Some(&self.face_indices[start..*offset])
            })
    }

    fn num_faces(&self) -> usize {
        self.face_counts.len()
    }
}

/// Edge connectivity of one level.
struct EdgeTopology {
    edges: Vec<[u32; 2]>,
    edge_faces: Vec<Vec<u32>>,
    edge_index: HashMap<(u32, u32), u32>,
    vertex_edges: Vec<Vec<u32>>,
    vertex_faces: Vec<Vec<u32>>,
}

impl EdgeTopology {
    fn build(level: &Level) -> Self {
        let mut topology = Self {
            edges: Vec::new(),
            edge_faces: Vec::new(),
            edge_index: HashMap::new(),
            vertex_edges: vec![Vec::new(); level.num_vertices],
            vertex_faces: vec![Vec::new(); level.num_vertices],
        };

        for (face, vertices) in level.faces().enumerate() {
            let n = vertices.len();
            for i in 0..n {
                let a = vertices[i];
                let b = vertices[(i + 1) % n];
                topology.vertex_faces[a as usize].push(face as u32);

                let key = edge_key(a, b);
                let edge = match topology.edge_index.get(&key) {
                    Some(&edge) => edge,
                    None => {
                        let edge = topology.edges.len() as u32;
                        topology.edges.push([key.0, key.1]);
                        topology.edge_faces.push(Vec::new());
                        topology.edge_index.insert(key, edge);
                        topology.vertex_edges[key.0 as usize].push(edge);
                        topology.vertex_edges[key.1 as usize].push(edge);
                        edge
                    }
                };
                topology.edge_faces[edge as usize].push(face as u32);
            }
        }
        topology
    }

    fn edge(&self, a: u32, b: u32) -> u32 {
        self.edge_index[&edge_key(a, b)]
    }

    fn find_edge(&self, a: u32, b: u32) -> Option<u32> {
        self.edge_index.get(&edge_key(a, b)).copied()
    }

    /// Sharpness of `edge`; boundary and non-manifold edges are infinitely sharp.
    fn sharpness(&self, level: &Level, edge: u32) -> f64 {
        if self.edge_faces[edge as usize].len() != 2 {
            return f64::INFINITY;
        }
        let [a, b] = self.edges[edge as usize];
        level
            .edge_sharpness
            .get(&(a, b))
            .copied()
            .unwrap_or(0.0) as f64
    }

    fn other_end(&self, edge: u32, vertex: u32) -> u32 {
        let [a, b] = self.edges[edge as usize];
        if a == vertex { b } else { a }
    }
}

/// Vertex classification shared by the smooth schemes.
enum VertexRule {
    Smooth,
    /// Crease through the two given neighbors, with the crease sharpness.
    Crease(u32, u32, f64),
    Corner,
}

fn classify_vertex(level: &Level, edges: &EdgeTopology, vertex: u32, boundary: BoundaryInterpolation) -> VertexRule {
    let incident = &edges.vertex_edges[vertex as usize];
    let faces = &edges.vertex_faces[vertex as usize];
    if incident.is_empty() {
        return VertexRule::Corner;
    }
    if level.vertex_sharpness.get(vertex as usize).copied().unwrap_or(0.0) >= 1.0 {
        return VertexRule::Corner;
    }
    if boundary == BoundaryInterpolation::EdgeAndCorner && faces.len() == 1 {
        return VertexRule::Corner;
    }

    let sharp: Vec<(u32, f64)> = incident
        .iter()
        .map(|&edge| (edge, edges.sharpness(level, edge)))
        .filter(|&(_, sharpness)| sharpness > 0.0)
        .collect();

    match sharp.len() {
        0 | 1 if faces.len() == incident.len() => VertexRule::Smooth,
        2 => {
            let a = edges.other_end(sharp[0].0, vertex);
            let b = edges.other_end(sharp[1].0, vertex);
            let sharpness = (sharp[0].1.min(1.0) + sharp[1].1.min(1.0)) * 0.5;
            VertexRule::Crease(a, b, sharpness)
        }
        _ => VertexRule::Corner,
    }
}

/// `(a + 6v + b) / 8`.
fn crease_stencil(vertex: u32, a: u32, b: u32) -> Stencil {
    let mut stencil = Stencil::default();
    stencil.add(vertex, 0.75);
    stencil.add(a, 0.125);
    stencil.add(b, 0.125);
    stencil
}

/// Apply the vertex rule, blending semi-sharp creases and corners.
fn vertex_stencil(
    level: &Level,
    edges: &EdgeTopology,
    vertex: u32,
    boundary: BoundaryInterpolation,
    smooth: impl FnOnce() -> Stencil,
) -> Stencil {
    let corner = Stencil::vertex(vertex);
    let result = match classify_vertex(level, edges, vertex, boundary) {
        VertexRule::Corner => return corner,
        VertexRule::Smooth => smooth(),
        VertexRule::Crease(a, b, sharpness) if sharpness >= 1.0 => crease_stencil(vertex, a, b),
        VertexRule::Crease(a, b, sharpness) => Stencil::lerp(&smooth(), &crease_stencil(vertex, a, b), sharpness),
    };

    let corner_sharpness = level.vertex_sharpness.get(vertex as usize).copied().unwrap_or(0.0) as f64;
    if corner_sharpness > 0.0 {
        Stencil::lerp(&result, &corner, corner_sharpness)
    } else {
        result
    }
}

/// Sharpness of children: creases and corners lose one unit per level.
///
/// Creases on edges that do not exist in the mesh are dropped.
fn decay_sharpness(level: &Level, child: &mut Level, split: impl Fn(u32, u32) -> Option<u32>) {
    for (&(a, b), &sharpness) in &level.edge_sharpness {
        let next = sharpness - 1.0;
        if next <= 0.0 {
            continue;
        }
        let Some(mid) = split(a, b) else {
            continue;
        };
        child.edge_sharpness.insert(edge_key(a, mid), next);
        child.edge_sharpness.insert(edge_key(mid, b), next);
    }
    child.vertex_sharpness = vec![0.0; child.num_vertices];
    for (vertex, &sharpness) in level.vertex_sharpness.iter().enumerate() {
        child.vertex_sharpness[vertex] = (sharpness - 1.0).max(0.0);
    }
}

/// One refinement step's output.
struct Step {
    level: Level,
    vertex: StencilTable,
    varying: StencilTable,
}

/// Catmull-Clark (`smooth`) or bilinear refinement of one level.
///
/// Child vertices are ordered: vertex points, edge points, face points.
fn refine_quads(level: &Level, smooth: bool, boundary: BoundaryInterpolation) -> Step {
    let edges = EdgeTopology::build(level);
    let nv = level.num_vertices as u32;
    let ne = edges.edges.len() as u32;

    let face_points: Vec<Stencil> = level.faces().map(|face| Stencil::average(face.iter().copied())).collect();

    let mut vertex_stencils = Vec::with_capacity((nv + ne) as usize + level.num_faces());
    let mut varying_stencils = Vec::with_capacity(vertex_stencils.capacity());

    for vertex in 0..nv {
        varying_stencils.push(Stencil::vertex(vertex));
        if !smooth {
            vertex_stencils.push(Stencil::vertex(vertex));
            continue;
        }
        vertex_stencils.push(vertex_stencil(level, &edges, vertex, boundary, || {
            // (Q + 2R + (n - 3) v) / n
            let incident = &edges.vertex_edges[vertex as usize];
            let faces = &edges.vertex_faces[vertex as usize];
            let n = incident.len() as f64;
            let mut stencil = Stencil::default();
            for &face in faces {
                stencil.add_scaled(&face_points[face as usize], 1.0 / (faces.len() as f64 * n));
            }
            for &edge in incident {
                let [a, b] = edges.edges[edge as usize];
                stencil.add(a, 1.0 / (n * n));
                stencil.add(b, 1.0 / (n * n));
            }
            stencil.add(vertex, (n - 3.0) / n);
            stencil
        }));
    }

    for (edge, &[a, b]) in edges.edges.iter().enumerate() {
        let midpoint = Stencil::average([a, b]);
        let sharpness = edges.sharpness(level, edge as u32);
        let stencil = if !smooth || sharpness >= 1.0 {
            midpoint.clone()
        } else {
            let mut smooth_point = Stencil::default();
            smooth_point.add(a, 0.25);
            smooth_point.add(b, 0.25);
            for &face in &edges.edge_faces[edge] {
                smooth_point.add_scaled(&face_points[face as usize], 0.25);
            }
            if sharpness > 0.0 {
                Stencil::lerp(&smooth_point, &midpoint, sharpness)
            } else {
                smooth_point
            }
        };
        vertex_stencils.push(stencil);
        varying_stencils.push(midpoint);
    }

    for face_point in &face_points {
        vertex_stencils.push(face_point.clone());
        varying_stencils.push(face_point.clone());
    }

    let mut child = Level {
        num_vertices: (nv + ne) as usize + level.num_faces(),
        ..Level::default()
    };
    for (face, vertices) in level.faces().enumerate() {
        let n = vertices.len();
        let center = nv + ne + face as u32;
        for i in 0..n {
            let next_edge = nv + edges.edge(vertices[i], vertices[(i + 1) % n]);
            let prev_edge = nv + edges.edge(vertices[(i + n - 1) % n], vertices[i]);
            child.push_face(
                &[vertices[i], next_edge, center, prev_edge],
                level.face_parent[face],
                level.face_hole[face],
            );
        }
    }
    decay_sharpness(level, &mut child, |a, b| edges.find_edge(a, b).map(|e| nv + e));

    Step {
        level: child,
        vertex: StencilTable::from_stencils(&vertex_stencils),
        varying: StencilTable::from_stencils(&varying_stencils),
    }
}

/// Loop refinement of one triangle level.
///
/// Child vertices are ordered: vertex points, edge points.
fn refine_loop(level: &Level, boundary: BoundaryInterpolation) -> Step {
    let edges = EdgeTopology::build(level);
    let nv = level.num_vertices as u32;
    let ne = edges.edges.len() as u32;
    let faces: Vec<&[u32]> = level.faces().collect();

    let mut vertex_stencils = Vec::with_capacity((nv + ne) as usize);
    let mut varying_stencils = Vec::with_capacity((nv + ne) as usize);

    for vertex in 0..nv {
        varying_stencils.push(Stencil::vertex(vertex));
        vertex_stencils.push(vertex_stencil(level, &edges, vertex, boundary, || {
            let incident = &edges.vertex_edges[vertex as usize];
            let n = incident.len() as f64;
            let beta = if incident.len() == 3 { 3.0 / 16.0 } else { 3.0 / (8.0 * n) };
            let mut stencil = Stencil::default();
            stencil.add(vertex, 1.0 - n * beta);
            for &edge in incident {
                stencil.add(edges.other_end(edge, vertex), beta);
            }
            stencil
        }));
    }

    for (edge, &[a, b]) in edges.edges.iter().enumerate() {
        let midpoint = Stencil::average([a, b]);
        let sharpness = edges.sharpness(level, edge as u32);
        let stencil = if sharpness >= 1.0 {
            midpoint.clone()
        } else {
            let mut smooth_point = Stencil::default();
            smooth_point.add(a, 0.375);
            smooth_point.add(b, 0.375);
            for &face in &edges.edge_faces[edge] {
                if let Some(&opposite) = faces[face as usize].iter().find(|&&v| v != a && v != b) {
                    smooth_point.add(opposite, 0.125);
                }
            }
            if sharpness > 0.0 {
                Stencil::lerp(&smooth_point, &midpoint, sharpness)
            } else {
                smooth_point
            }
        };
        vertex_stencils.push(stencil);
        varying_stencils.push(midpoint);
    }

    let mut child = Level {
        num_vertices: (nv + ne) as usize,
        ..Level::default()
    };
    for (face, vertices) in faces.iter().enumerate() {
        let [v0, v1, v2] = [vertices[0], vertices[1], vertices[2]];
        let e01 = nv + edges.edge(v0, v1);
        let e12 = nv + edges.edge(v1, v2);
        let e20 = nv + edges.edge(v2, v0);
        let parent = level.face_parent[face];
        let hole = level.face_hole[face];
        child.push_face(&[v0, e01, e20], parent, hole);
        child.push_face(&[v1, e12, e01], parent, hole);
        child.push_face(&[v2, e20, e12], parent, hole);
        child.push_face(&[e01, e12, e20], parent, hole);
    }
    decay_sharpness(level, &mut child, |a, b| edges.find_edge(a, b).map(|e| nv + e));

    Step {
        level: child,
        vertex: StencilTable::from_stencils(&vertex_stencils),
        varying: StencilTable::from_stencils(&varying_stencils),
    }
}

// ============================================================================
// Tables
// ============================================================================

/// Per-topology refinement tables.
#[derive(Debug, Clone)]
pub struct SubdivisionTables {
    scheme: SubdivScheme,
    num_coarse_points: usize,
    vertex_stencils: Vec<StencilTable>,
    varying_stencils: Vec<StencilTable>,
    refined: Level,
}

impl SubdivisionTables {
    /// Refine `topology` to its refine level.
    pub fn build(topology: &MeshTopology) -> Self {
        crate::profile_function!();

        let scheme = topology.scheme();
        let boundary = topology.tags().boundary;
        let mut level = Level::coarse(topology);
        let mut vertex_stencils = Vec::new();
        let mut varying_stencils = Vec::new();

        let levels = if scheme == SubdivScheme::None { 0 } else { topology.refine_level() };
        for _ in 0..levels {
            let step = match scheme {
                SubdivScheme::Loop => refine_loop(&level, boundary),
                SubdivScheme::Bilinear => refine_quads(&level, false, boundary),
                SubdivScheme::CatmullClark | SubdivScheme::None => refine_quads(&level, true, boundary),
            };
            vertex_stencils.push(step.vertex);
            varying_stencils.push(step.varying);
            level = step.level;
        }

        log::trace!(
            "SubdivisionTables: {:?} level {} -> {} vertices, {} faces",
            scheme,
            levels,
            level.num_vertices,
            level.num_faces()
        );

        Self {
            scheme,
            num_coarse_points: topology.num_points(),
            vertex_stencils,
            varying_stencils,
            refined: level,
        }
    }

    /// Number of refinement levels applied.
    pub fn num_levels(&self) -> usize {
        self.vertex_stencils.len()
    }

    /// Number of values in a refined buffer (coarse plus last level).
    pub fn num_refined_points(&self) -> usize {
        if self.num_levels() == 0 {
            self.num_coarse_points
        } else {
            self.num_coarse_points + self.refined.num_vertices
        }
    }

    /// Refine a primvar given as `components` values per coarse point.
    pub fn refine(&self, data: &[f64], components: usize, interpolation: Interpolation) -> Vec<f64> {
        let coarse_len = self.num_coarse_points * components;
        let mut coarse = data[..coarse_len.min(data.len())].to_vec();
        coarse.resize(coarse_len, 0.0);

        let tables = match interpolation {
            Interpolation::Vertex => &self.vertex_stencils,
            Interpolation::Varying => &self.varying_stencils,
        };
        if tables.is_empty() {
            return coarse;
        }

        let mut current = coarse.clone();
        for table in tables {
            current = table.apply(&current, components);
        }
        coarse.extend(current);
        coarse
    }

    /// Indices of the refined faces, offset past the coarse points.
    ///
    /// Faces descending from holes are skipped.
    pub fn refined_indices(&self) -> PrimitiveIndices {
        let offset = if self.num_levels() == 0 { 0 } else { self.num_coarse_points as i32 };
        let verts_per_primitive = if self.scheme.refines_to_triangles() { 3 } else { 4 };
        let mut indices = Vec::new();
        let mut primitive_param = Vec::new();

        for (face, vertices) in self.refined.faces().enumerate() {
            if self.refined.face_hole[face] || vertices.len() != verts_per_primitive {
                continue;
            }
            indices.extend(vertices.iter().map(|&v| v as i32 + offset));
            primitive_param.push(self.refined.face_parent[face] as i32);
        }

        PrimitiveIndices {
            indices,
            verts_per_primitive,
            primitive_param,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{RawTopology, RefineMode, SubdivTags};

    fn grid_quad(level: u32, scheme: SubdivScheme, tags: SubdivTags) -> MeshTopology {
        let raw = RawTopology::new(scheme, [4], [0, 1, 2, 3]);
        MeshTopology::new(raw, level, RefineMode::Uniform, tags)
    }

    fn quad_points() -> Vec<f64> {
        vec![
            0.0, 0.0, 0.0, //
            2.0, 0.0, 0.0, //
            2.0, 2.0, 0.0, //
            0.0, 2.0, 0.0,
        ]
    }

    #[test]
    fn test_catmull_clark_counts() {
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::CatmullClark, SubdivTags::default()));
        // 4 vertex points, 4 edge points, 1 face point.
        assert_eq!(tables.num_refined_points(), 4 + 9);
        let indices = tables.refined_indices();
        assert_eq!(indices.num_primitives(), 4);
        assert_eq!(indices.verts_per_primitive, 4);
        assert!(indices.indices.iter().all(|&i| (4..13).contains(&i)));
        assert_eq!(indices.primitive_param, vec![0; 4]);
    }

    #[test]
    fn test_two_levels_grow_quadratically() {
        let tables = SubdivisionTables::build(&grid_quad(2, SubdivScheme::CatmullClark, SubdivTags::default()));
        assert_eq!(tables.refined_indices().num_primitives(), 16);
        assert_eq!(tables.num_refined_points(), 4 + 25);
    }

    #[test]
    fn test_varying_refinement_is_linear() {
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::CatmullClark, SubdivTags::default()));
        let refined = tables.refine(&quad_points(), 3, Interpolation::Varying);
        assert_eq!(refined.len(), 13 * 3);
        // Coarse values come first, unchanged.
        assert_eq!(&refined[..12], quad_points().as_slice());
        // Face point is the center.
        let center = &refined[12 * 3..];
        assert!((center[0] - 1.0).abs() < 1e-6 && (center[1] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_boundary_corners_stay_fixed() {
        let tags = SubdivTags::default().with_boundary(BoundaryInterpolation::EdgeAndCorner);
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::CatmullClark, tags));
        let refined = tables.refine(&quad_points(), 3, Interpolation::Vertex);
        // The first refined vertex is the child of corner 0.
        assert_eq!(&refined[12..15], &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_edge_only_boundary_smooths_corners() {
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::CatmullClark, SubdivTags::default()));
        let refined = tables.refine(&quad_points(), 3, Interpolation::Vertex);
        // (a + 6v + b) / 8 with neighbors (2, 0) and (0, 2).
        assert!((refined[12] - 0.25).abs() < 1e-6);
        assert!((refined[13] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_bilinear_keeps_vertices() {
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::Bilinear, SubdivTags::default()));
        let refined = tables.refine(&quad_points(), 3, Interpolation::Vertex);
        assert_eq!(&refined[12..24], quad_points().as_slice());
    }

    #[test]
    fn test_loop_splits_triangles_in_four() {
        let raw = RawTopology::new(SubdivScheme::Loop, [3, 3], [0, 1, 2, 0, 2, 3]);
        let topology = MeshTopology::new(raw, 1, RefineMode::Uniform, SubdivTags::default());
        let tables = SubdivisionTables::build(&topology);
        let indices = tables.refined_indices();
        assert_eq!(indices.verts_per_primitive, 3);
        assert_eq!(indices.num_primitives(), 8);
        // 4 vertices + 5 edges.
        assert_eq!(tables.num_refined_points(), 4 + 9);
    }

    #[test]
    fn test_loop_triangulates_quads() {
        let tables = SubdivisionTables::build(&grid_quad(1, SubdivScheme::Loop, SubdivTags::default()));
        assert_eq!(tables.refined_indices().num_primitives(), 8);
    }

    #[test]
    fn test_holes_are_dropped_from_refined_indices() {
        let raw = RawTopology::new(SubdivScheme::CatmullClark, [4, 4], [0, 1, 4, 3, 1, 2, 5, 4]);
        let topology = MeshTopology::new(raw, 1, RefineMode::Uniform, SubdivTags::with_holes([1]));
        let indices = SubdivisionTables::build(&topology).refined_indices();
        assert_eq!(indices.num_primitives(), 4);
        assert!(indices.primitive_param.iter().all(|&face| face == 0));
    }

    #[test]
    fn test_infinitely_sharp_crease_keeps_edge_straight() {
        // Two quads sharing the edge (1, 4), lifted in the middle.
        let raw = RawTopology::new(SubdivScheme::CatmullClark, [4, 4], [0, 1, 4, 3, 1, 2, 5, 4]);
        let creased = SubdivTags::default().with_crease(&[1, 4], 10.0);
        let topology = MeshTopology::new(raw, 1, RefineMode::Uniform, creased);
        let points = vec![
            0.0, 0.0, 0.0, //
            1.0, 0.0, 1.0, //
            2.0, 0.0, 0.0, //
            0.0, 1.0, 0.0, //
            1.0, 1.0, 1.0, //
            2.0, 1.0, 0.0,
        ];
        let tables = SubdivisionTables::build(&topology);
        let refined = tables.refine(&points, 3, Interpolation::Vertex);

        // The crease edge point is the plain midpoint at height 1.
        let crease_edge_point = refined
            .chunks(3)
            .skip(6)
            .find(|p| (p[0] - 1.0).abs() < 1e-6 && (p[1] - 0.5).abs() < 1e-6)
            .map(|p| p[2]);
        assert_eq!(crease_edge_point, Some(1.0));
    }

    #[test]
    fn test_level_zero_is_identity() {
        let tables = SubdivisionTables::build(&grid_quad(0, SubdivScheme::CatmullClark, SubdivTags::default()));
        assert_eq!(tables.num_levels(), 0);
        assert_eq!(tables.refine(&quad_points(), 3, Interpolation::Vertex), quad_points());
    }
}
