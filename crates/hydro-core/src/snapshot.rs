//! Per-iteration diagnostic hooks. Observers see the water field after every
//! iteration and cannot change it.
use crate::field::WaterField;

/// Receives the water field after each completed iteration.
pub trait SnapshotSink {
    fn record(&mut self, iteration: u32, water: &WaterField);
}

/// Discards every snapshot.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSnapshots;

impl SnapshotSink for NoSnapshots {
    fn record(&mut self, _iteration: u32, _water: &WaterField) {}
}

/// Keeps every `every`-th snapshot in memory.
#[derive(Debug, Clone)]
pub struct MemorySnapshots {
    every: u32,
    pub frames: Vec<(u32, WaterField)>,
}

impl MemorySnapshots {
    pub fn new(every: u32) -> Self {
        Self {
            every: every.max(1),
            frames: Vec::new(),
        }
    }

    /// Snapshot cadence; never zero.
    pub fn every(&self) -> u32 {
        self.every
    }
}

impl SnapshotSink for MemorySnapshots {
    fn record(&mut self, iteration: u32, water: &WaterField) {
        if iteration % self.every == 0 {
            self.frames.push((iteration, water.clone()));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::Field;

    #[test]
    fn zero_cadence_keeps_every_frame() {
        let mut snaps = MemorySnapshots::new(0);
        assert_eq!(snaps.every(), 1);
        let w = Field::square(2);
        for i in 0..3 {
            snaps.record(i, &w);
        }
        assert_eq!(snaps.frames.len(), 3);
    }

    #[test]
    fn cadence_skips_between_frames() {
        let mut snaps = MemorySnapshots::new(3);
        let w = Field::square(2);
        for i in 0..7 {
            snaps.record(i, &w);
        }
        let kept: Vec<u32> = snaps.frames.iter().map(|(i, _)| *i).collect();
        assert_eq!(kept, vec![0, 3, 6]);
    }
}
