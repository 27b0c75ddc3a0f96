//! Per-drawable computation queues.

use std::collections::VecDeque;

use strata_core::buffer::{BufferSource, BufferSpec};

use super::{CpuComputation, GpuComputation};

/// The CPU and GPU work discovered while gathering one interpolation class.
///
/// Both queues are FIFO. CPU work is resolved synchronously by
/// [`run_cpu`](Self::run_cpu); GPU work is handed to the resource registry in
/// the same order it was pushed.
#[derive(Debug, Default)]
pub struct ComputationScheduler {
    cpu: VecDeque<CpuComputation>,
    gpu: Vec<GpuComputation>,
}

impl ComputationScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cpu(&mut self, computation: CpuComputation) {
        self.cpu.push_back(computation);
    }

    pub fn push_gpu(&mut self, computation: GpuComputation) {
        self.gpu.push(computation);
    }

    pub fn cpu_len(&self) -> usize {
        self.cpu.len()
    }

    pub fn gpu_len(&self) -> usize {
        self.gpu.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpu.is_empty() && self.gpu.is_empty()
    }

    /// Resolve every queued CPU computation, in order.
    ///
    /// Chains that cannot be resolved produce no source.
    pub fn run_cpu(&mut self) -> Vec<BufferSource> {
        crate::profiling::profile_scope!("run_cpu_computations");

        let mut sources = Vec::with_capacity(self.cpu.len());
        while let Some(computation) = self.cpu.pop_front() {
            log::trace!("Running CPU computation {:?}", computation);
            if let Some(source) = computation.resolve() {
                sources.push(source);
            }
        }
        sources
    }

    /// Queued GPU computations.
    pub fn gpu(&self) -> &[GpuComputation] {
        &self.gpu
    }

    /// Output specs of the queued GPU computations.
    pub fn gpu_specs(&self) -> Vec<BufferSpec> {
        self.gpu.iter().map(GpuComputation::output_spec).collect()
    }

    /// Remove and return the GPU queue.
    pub fn take_gpu(&mut self) -> Vec<GpuComputation> {
        std::mem::take(&mut self.gpu)
    }

    /// Drop all queued work.
    pub fn clear(&mut self) {
        self.cpu.clear();
        self.gpu.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::buffer::BufferRole;

    #[test]
    fn test_cpu_queue_is_fifo() {
        let mut scheduler = ComputationScheduler::new();
        for name in ["a", "b", "c"] {
            scheduler.push_cpu(CpuComputation::Source(BufferSource::from_f32(
                name,
                BufferRole::Primvar,
                vec![0.0],
            )));
        }
        assert_eq!(scheduler.cpu_len(), 3);

        let names: Vec<String> = scheduler
            .run_cpu()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert!(scheduler.is_empty());
    }
}
