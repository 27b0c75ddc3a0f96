//! Dirty bits and their propagation rules.
//!
//! A drawable receives a [`DirtyBits`] set describing which scene attributes
//! changed since its last sync. Before any work is done the set is expanded by
//! [`DirtyPropagator::propagate`], which encodes the dependencies between
//! attributes: a topology change invalidates subdivision tags and index
//! buffers, a material change may switch quadrangulation on or off, moving
//! points invalidates smooth normals, and so on.

use bitflags::bitflags;

use crate::buffer::names;

bitflags! {
    /// Change flags for a mesh drawable.
    ///
    /// The upper bits are private to the sync pipeline and never come from
    /// the scene.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct DirtyBits: u32 {
        /// Face counts, face indices, scheme or orientation changed.
        const TOPOLOGY = 1 << 0;
        /// Refine level or shading flags changed.
        const DISPLAY_STYLE = 1 << 1;
        /// Creases, corners or holes changed.
        const SUBDIV_TAGS = 1 << 2;
        /// Point positions changed.
        const POINTS = 1 << 3;
        /// Authored normals changed.
        const NORMALS = 1 << 4;
        /// Any other primvar changed.
        const PRIMVAR = 1 << 5;
        /// The bound material changed.
        const MATERIAL_ID = 1 << 6;
        const DOUBLE_SIDED = 1 << 7;
        const CULL_STYLE = 1 << 8;
        /// Not consumed by mesh sync; passed through to the caller.
        const VISIBILITY = 1 << 9;
        /// Not consumed by mesh sync; passed through to the caller.
        const TRANSFORM = 1 << 10;
        /// A representation was added and still has to be populated.
        const NEW_REPR = 1 << 11;

        /// Smooth normals have to be regenerated.
        const SMOOTH_NORMALS = 1 << 16;
        /// Surface (triangle, quad or refined) indices have to be rebuilt.
        const INDICES = 1 << 17;
        /// Hull indices have to be rebuilt.
        const HULL_INDICES = 1 << 18;
        /// Points indices have to be rebuilt.
        const POINTS_INDICES = 1 << 19;

        /// Every private bit.
        const PRIVATE = Self::SMOOTH_NORMALS.bits()
            | Self::INDICES.bits()
            | Self::HULL_INDICES.bits()
            | Self::POINTS_INDICES.bits();
        /// Every index-kind bit.
        const ANY_INDICES = Self::INDICES.bits()
            | Self::HULL_INDICES.bits()
            | Self::POINTS_INDICES.bits();
        /// Scene bits consumed by mesh sync.
        const SCENE = Self::TOPOLOGY.bits()
            | Self::DISPLAY_STYLE.bits()
            | Self::SUBDIV_TAGS.bits()
            | Self::POINTS.bits()
            | Self::NORMALS.bits()
            | Self::PRIMVAR.bits()
            | Self::MATERIAL_ID.bits()
            | Self::DOUBLE_SIDED.bits()
            | Self::CULL_STYLE.bits();
        /// Bits owned by mesh sync; all of them are clear after a successful sync.
        const OWNED = Self::SCENE.bits() | Self::PRIVATE.bits() | Self::NEW_REPR.bits();
        /// Bits that mark any primvar as changed.
        const ANY_PRIMVAR = Self::POINTS.bits() | Self::NORMALS.bits() | Self::PRIMVAR.bits();
    }
}

impl Default for DirtyBits {
    fn default() -> Self {
        Self::empty()
    }
}

impl DirtyBits {
    /// Check if the primvar called `name` has to be refetched.
    ///
    /// `points` and `normals` have dedicated bits, everything else is covered
    /// by [`PRIMVAR`](Self::PRIMVAR).
    pub fn is_primvar_dirty(self, name: &str) -> bool {
        match name {
            names::POINTS => self.contains(Self::POINTS),
            names::NORMALS => self.contains(Self::NORMALS),
            _ => self.contains(Self::PRIMVAR),
        }
    }

    /// Check if any primvar has to be refetched.
    pub fn is_any_primvar_dirty(self) -> bool {
        self.intersects(Self::ANY_PRIMVAR)
    }
}

/// Expands a dirty set according to the attribute dependency rules.
///
/// The rules, applied in order and repeated until nothing changes:
///
/// 1. `SUBDIV_TAGS` adds `POINTS | NORMALS | PRIMVAR | TOPOLOGY | DISPLAY_STYLE`.
/// 2. Otherwise `TOPOLOGY` adds `SUBDIV_TAGS | DISPLAY_STYLE`.
/// 3. `MATERIAL_ID` adds `POINTS | NORMALS | PRIMVAR | TOPOLOGY`.
/// 4. `POINTS` or `TOPOLOGY` adds `SMOOTH_NORMALS` if it is tracked.
/// 5. `TOPOLOGY` adds the tracked index bits.
/// 6. With CPU smooth normals, `SMOOTH_NORMALS` adds `POINTS`.
///
/// Iterating to a fixed point makes the function idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtyPropagator {
    tracked: DirtyBits,
    cpu_smooth_normals: bool,
}

impl DirtyPropagator {
    /// Create a propagator for a drawable that tracks `tracked` private bits.
    pub fn new(tracked: DirtyBits, cpu_smooth_normals: bool) -> Self {
        Self {
            tracked,
            cpu_smooth_normals,
        }
    }

    /// Private bits the drawable's representations use.
    pub fn tracked(&self) -> DirtyBits {
        self.tracked
    }

    /// Expand `bits` with everything they imply.
    pub fn propagate(&self, bits: DirtyBits) -> DirtyBits {
        let mut current = bits;
        loop {
            let next = self.apply_rules(current);
            if next == current {
                return current;
            }
            current = next;
        }
    }

    fn apply_rules(&self, mut bits: DirtyBits) -> DirtyBits {
        if bits.contains(DirtyBits::SUBDIV_TAGS) {
            bits |= DirtyBits::POINTS
                | DirtyBits::NORMALS
                | DirtyBits::PRIMVAR
                | DirtyBits::TOPOLOGY
                | DirtyBits::DISPLAY_STYLE;
        } else if bits.contains(DirtyBits::TOPOLOGY) {
            bits |= DirtyBits::SUBDIV_TAGS | DirtyBits::DISPLAY_STYLE;
        }

        if bits.contains(DirtyBits::MATERIAL_ID) {
            bits |= DirtyBits::POINTS | DirtyBits::NORMALS | DirtyBits::PRIMVAR | DirtyBits::TOPOLOGY;
        }

        if bits.intersects(DirtyBits::POINTS | DirtyBits::TOPOLOGY)
            && self.tracked.contains(DirtyBits::SMOOTH_NORMALS)
        {
            bits |= DirtyBits::SMOOTH_NORMALS;
        }

        if bits.contains(DirtyBits::TOPOLOGY) {
            bits |= self.tracked & DirtyBits::ANY_INDICES;
        }

        if self.cpu_smooth_normals && bits.contains(DirtyBits::SMOOTH_NORMALS) {
            bits |= DirtyBits::POINTS;
        }

        bits
    }
}
