//! Primvar gathering.
//!
//! Fetches the dirty primvars of one interpolation class from the scene
//! delegate, validates their element counts and routes them through the
//! refinement, quadrangulation or triangulation the drawable's topology needs.

use std::sync::Arc;

use strata_core::buffer::{BufferData, BufferRole, BufferSource, ElementFormat, InterpolationClass, names};
use strata_core::diagnostics::{Diagnostics, ValidationWarning};
use strata_core::dirty::DirtyBits;
use strata_core::mesh::{Interpolation, MeshTopology};

use super::delegate::SceneDelegate;
use crate::compute::{ComputationScheduler, CpuComputation, GpuComputation};
use crate::config::SyncConfig;

/// Result of validating one primvar's element count.
#[derive(Debug, Clone)]
pub enum Validation {
    /// Count matches, or the source was truncated to match.
    Accept(BufferSource),
    /// Too short; the primvar is skipped this frame.
    Skip,
    /// The points primvar is too short; the drawable gets no vertex data.
    Reject,
}

/// Result of fetching one interpolation class.
#[derive(Debug, Clone)]
pub enum Fetch {
    Primvars(Vec<BufferSource>),
    PointsRejected,
}

/// Tracks whether `pointsVisibility` was ever authored on a drawable.
///
/// The buffer is only allocated once some point is invisible. After that it
/// stays, so a later all-visible frame overwrites it instead of leaving stale
/// invisibility behind. Its first appearance adds a buffer to the vertex
/// range, which the shared range resolver treats as a structural change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PointsVisibility {
    authored: bool,
}

impl PointsVisibility {
    pub fn is_authored(&self) -> bool {
        self.authored
    }

    /// Expand the invisible point indices into a per-point buffer: 1.0 for
    /// visible points, 0.0 for invisible ones.
    ///
    /// Returns `None` while nothing was ever invisible.
    pub fn expand(&mut self, invisible: &[i32], num_points: usize) -> Option<BufferSource> {
        if !self.authored && invisible.is_empty() {
            return None;
        }
        self.authored = true;

        let mut values = vec![1.0f32; num_points];
        for &index in invisible {
            match usize::try_from(index).ok().and_then(|i| values.get_mut(i)) {
                Some(value) => *value = 0.0,
                None => log::trace!("Ignoring out of range invisible point {}", index),
            }
        }
        Some(BufferSource::from_f32(
            names::POINTS_VISIBILITY,
            BufferRole::Primvar,
            values,
        ))
    }
}

/// Gathers and routes the primvars of one drawable.
pub struct PrimvarPipeline<'a> {
    drawable: &'a str,
    topology: &'a Arc<MeshTopology>,
    config: SyncConfig,
    use_quad_indices: bool,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> PrimvarPipeline<'a> {
    pub fn new(
        drawable: &'a str,
        topology: &'a Arc<MeshTopology>,
        config: SyncConfig,
        use_quad_indices: bool,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            drawable,
            topology,
            config,
            use_quad_indices,
            diagnostics,
        }
    }

    /// Element count the topology requires for `class`, `None` if unchecked.
    pub fn expected_count(&self, class: InterpolationClass) -> Option<usize> {
        match class {
            InterpolationClass::Constant => None,
            InterpolationClass::Vertex | InterpolationClass::Varying => {
                Some(self.topology.num_points())
            }
            InterpolationClass::Uniform => Some(self.topology.num_faces()),
            InterpolationClass::FaceVarying => Some(self.topology.num_face_varyings()),
        }
    }

    /// Check the element count of `source` against its class.
    pub fn validate(&self, source: BufferSource, class: InterpolationClass) -> Validation {
        let Some(expected) = self.expected_count(class) else {
            return Validation::Accept(source);
        };
        let actual = source.num_elements();

        if actual < expected {
            if source.name() == names::POINTS && class == InterpolationClass::Vertex {
                self.diagnostics.report(ValidationWarning::PointsRejected {
                    drawable: self.drawable.to_string(),
                    actual,
                    expected,
                });
                return Validation::Reject;
            }
            self.diagnostics.report(ValidationWarning::PrimvarTooShort {
                drawable: self.drawable.to_string(),
                primvar: source.name().to_string(),
                class,
                actual,
                expected,
            });
            return Validation::Skip;
        }

        if actual > expected {
            self.diagnostics.report(ValidationWarning::PrimvarTruncated {
                drawable: self.drawable.to_string(),
                primvar: source.name().to_string(),
                class,
                actual,
                expected,
            });
            return Validation::Accept(source.truncated(expected));
        }

        Validation::Accept(source)
    }

    /// Fetch and validate the dirty primvars of `class`.
    ///
    /// `pointsVisibility` is only meaningful for vertex primvars; the delegate
    /// supplies invisible point indices and `visibility` turns them into a
    /// per-point buffer.
    pub fn fetch(
        &self,
        delegate: &dyn SceneDelegate,
        class: InterpolationClass,
        bits: DirtyBits,
        visibility: &mut PointsVisibility,
    ) -> Fetch {
        crate::profiling::profile_scope!("fetch_primvars");

        let mut sources = Vec::new();
        for descriptor in delegate.primvar_descriptors(self.drawable, class) {
            if !bits.is_primvar_dirty(&descriptor.name) {
                continue;
            }

            let value = delegate.primvar(self.drawable, &descriptor.name);
            let source = if descriptor.name == names::POINTS_VISIBILITY
                && class == InterpolationClass::Vertex
            {
                let invisible = match value.as_ref().map(|v| v.data()) {
                    Some(BufferData::Int(indices)) => indices.as_slice(),
                    _ => &[],
                };
                match visibility.expand(invisible, self.topology.num_points()) {
                    Some(source) => source,
                    None => continue,
                }
            } else {
                match value {
                    Some(value) if !value.is_empty() => {
                        let (format, data) = value.into_parts();
                        BufferSource::new(descriptor.name, descriptor.role, format, data)
                    }
                    _ => {
                        self.diagnostics.report(ValidationWarning::EmptyPrimvar {
                            drawable: self.drawable.to_string(),
                            primvar: descriptor.name,
                        });
                        continue;
                    }
                }
            };

            match self.validate(source, class) {
                Validation::Accept(source) => sources.push(source),
                Validation::Skip => {}
                Validation::Reject => return Fetch::PointsRejected,
            }
        }
        Fetch::Primvars(sources)
    }

    pub fn topology(&self) -> &Arc<MeshTopology> {
        self.topology
    }

    fn refines(&self) -> bool {
        self.topology.refine_level() > 0
    }

    /// The GPU step that refines or quadrangulates the vertex buffer `name`
    /// in place, if the topology needs one.
    pub fn gpu_vertex_step(
        &self,
        name: &str,
        format: ElementFormat,
        interpolation: Interpolation,
    ) -> Option<GpuComputation> {
        if self.refines() {
            Some(GpuComputation::Refine {
                topology: Arc::clone(self.topology),
                name: name.to_string(),
                format,
                interpolation,
            })
        } else if self.use_quad_indices && !self.topology.quad_info().is_all_quads() {
            Some(GpuComputation::Quadrangulate {
                topology: Arc::clone(self.topology),
                name: name.to_string(),
                format,
            })
        } else {
            None
        }
    }

    /// Route a validated vertex or varying primvar.
    ///
    /// With GPU computations the coarse source is uploaded as is and the
    /// refinement or quadrangulation runs at commit; otherwise the CPU chain
    /// is queued.
    pub fn route_vertex(
        &self,
        source: BufferSource,
        class: InterpolationClass,
        scheduler: &mut ComputationScheduler,
    ) {
        let interpolation = match class {
            InterpolationClass::Varying => Interpolation::Varying,
            _ => Interpolation::Vertex,
        };

        if self.config.gpu_compute && source.format() != ElementFormat::PackedNormal {
            if let Some(step) = self.gpu_vertex_step(source.name(), source.format(), interpolation) {
                scheduler.push_gpu(step);
            }
            scheduler.push_cpu(CpuComputation::Source(source));
            return;
        }

        scheduler.push_cpu(self.vertex_chain(CpuComputation::Source(source), interpolation));
    }

    /// Wrap a CPU vertex chain in the refinement or quadrangulation the
    /// topology needs.
    pub fn vertex_chain(
        &self,
        computation: CpuComputation,
        interpolation: Interpolation,
    ) -> CpuComputation {
        if self.refines() {
            computation.refined(self.topology, interpolation)
        } else if self.use_quad_indices {
            computation.quadrangulated(self.topology)
        } else {
            computation
        }
    }

    /// Route a validated face-varying primvar for a draw item at
    /// `refine_level`. Face-varying data is always expanded on the CPU.
    pub fn route_face_varying(
        &self,
        source: BufferSource,
        refine_level: u32,
        scheduler: &mut ComputationScheduler,
    ) {
        let input = Box::new(CpuComputation::Source(source));
        let topology = Arc::clone(self.topology);
        let quadrangulate =
            self.use_quad_indices || (refine_level > 0 && !self.topology.refines_to_triangles());

        scheduler.push_cpu(if quadrangulate {
            CpuComputation::QuadrangulateFaceVarying { input, topology }
        } else {
            CpuComputation::TriangulateFaceVarying { input, topology }
        });
    }
}
