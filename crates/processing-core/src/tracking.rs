//! Frame-to-frame identity of action instances.
//!
//! A region keeps the id of the same-label instance from the previous frame
//! whose filled mask it overlaps most. Unmatched regions start new
//! instances, and instances missing from a frame are retired.

use crate::contours::{BoundingBox, Region, RegionMask};

/// Geometry of an instance in one frame.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FrameObservation {
    pub frame: usize,
    pub bbox: BoundingBox,
    pub rotated_box: [(i32, i32); 4],
}

/// A tracked action instance.
#[derive(Debug, Clone)]
pub struct Instance {
    /// Unique id, starting at 1.
    pub id: u64,
    /// Action label.
    pub label: String,
    /// Observations in frame order, one per frame at most.
    pub frames: Vec<FrameObservation>,
    /// Masks of the two most recent observations, newest last.
    recent_masks: Vec<(usize, RegionMask)>,
}

impl Instance {
    fn new(id: u64, label: &str, frame: usize, region: Region) -> Self {
        let mut instance = Self {
            id,
            label: label.to_string(),
            frames: vec![],
            recent_masks: vec![],
        };
        instance.push(frame, region);
        instance
    }

    fn push(&mut self, frame: usize, region: Region) {
        self.frames.push(FrameObservation {
            frame,
            bbox: region.bbox,
            rotated_box: region.rotated_box,
        });
        self.recent_masks.push((frame, region.mask));
        if self.recent_masks.len() > 2 {
            self.recent_masks.remove(0);
        }
    }

    /// Whether the instance was observed in `frame`.
    pub fn observed_in(&self, frame: usize) -> bool {
        self.frames
            .iter()
            .rev()
            .take_while(|o| o.frame >= frame)
            .any(|o| o.frame == frame)
    }

    /// Observation for `frame`, if any.
    pub fn observation(&self, frame: usize) -> Option<&FrameObservation> {
        self.frames.iter().rev().find(|o| o.frame == frame)
    }

    fn mask_at(&self, frame: usize) -> Option<&RegionMask> {
        self.recent_masks
            .iter()
            .find(|(f, _)| *f == frame)
            .map(|(_, m)| m)
    }

    pub fn first_frame(&self) -> usize {
        self.frames.first().map(|o| o.frame).unwrap_or(0)
    }

    pub fn last_frame(&self) -> usize {
        self.frames.last().map(|o| o.frame).unwrap_or(0)
    }
}

/// Live instances plus the id counter.
#[derive(Debug, Default)]
pub struct InstanceDb {
    instances: Vec<Instance>,
    last_id: u64,
}

impl InstanceDb {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `region` of class `label` in `frame` to an instance and return its id.
    ///
    /// Callers feed one label's regions of a frame in descending area order.
    pub fn observe(&mut self, label: &str, frame: usize, region: Region) -> u64 {
        let best = frame.checked_sub(1).and_then(|prev| {
            let mut best: Option<(u64, u64)> = None;
            for instance in self
                .instances
                .iter()
                .filter(|i| i.label == label && i.observed_in(prev))
            {
                let score = instance
                    .mask_at(prev)
                    .map(|m| m.overlap(&region.mask))
                    .unwrap_or(0);
                // Strictly greater: ties go to the earliest instance.
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((instance.id, score));
                }
            }
            best
        });

        let reuse = best.filter(|&(id, score)| {
            score > 0 && !self.ids_in_frame(frame).contains(&id)
        });

        match reuse {
            Some((id, score)) => {
                tracing::trace!(label, frame, id, score, "Continuing instance");
                if let Some(instance) = self.instances.iter_mut().find(|i| i.id == id) {
                    instance.push(frame, region);
                }
                id
            }
            None => {
                let id = self.next_id();
                tracing::trace!(label, frame, id, "New instance");
                self.instances.push(Instance::new(id, label, frame, region));
                id
            }
        }
    }

    /// Ids of the instances observed in `frame`.
    pub fn ids_in_frame(&self, frame: usize) -> Vec<u64> {
        self.instances
            .iter()
            .filter(|i| i.observed_in(frame))
            .map(|i| i.id)
            .collect()
    }

    /// Instances observed in `frame`, in creation order.
    pub fn instances_in_frame(&self, frame: usize) -> impl Iterator<Item = &Instance> {
        self.instances.iter().filter(move |i| i.observed_in(frame))
    }

    /// Remove and return every instance that was not observed in `frame`.
    pub fn retire_absent(&mut self, frame: usize) -> Vec<Instance> {
        let (keep, retired): (Vec<_>, Vec<_>) = std::mem::take(&mut self.instances)
            .into_iter()
            .partition(|i| i.observed_in(frame));
        self.instances = keep;
        if !retired.is_empty() {
            tracing::debug!(frame, retired = retired.len(), "Retired instances");
        }
        retired
    }

    /// Remove and return all live instances.
    pub fn retire_all(&mut self) -> Vec<Instance> {
        std::mem::take(&mut self.instances)
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    fn next_id(&mut self) -> u64 {
        self.last_id += 1;
        self.last_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contours::external_regions;
    use crate::mask::FOREGROUND;
    use image::{GrayImage, Luma};

    fn square(x: u32, y: u32, size: u32) -> Region {
        let mut mask = GrayImage::new(64, 64);
        for py in y..y + size {
            for px in x..x + size {
                mask.put_pixel(px, py, Luma([FOREGROUND]));
            }
        }
        external_regions(&mask, 0.0).remove(0)
    }

    #[test]
    fn moving_blob_keeps_its_id() {
        let mut db = InstanceDb::new();
        let first = db.observe("walking", 0, square(0, 0, 10));
        let second = db.observe("walking", 1, square(3, 0, 10));
        let third = db.observe("walking", 2, square(6, 2, 10));
        assert_eq!(first, 1);
        assert_eq!(second, 1);
        assert_eq!(third, 1);
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn disjoint_blob_gets_new_id() {
        let mut db = InstanceDb::new();
        assert_eq!(db.observe("walking", 0, square(0, 0, 10)), 1);
        assert_eq!(db.observe("walking", 1, square(40, 40, 10)), 2);
    }

    #[test]
    fn labels_do_not_share_instances() {
        let mut db = InstanceDb::new();
        assert_eq!(db.observe("walking", 0, square(0, 0, 10)), 1);
        assert_eq!(db.observe("kicking", 1, square(0, 0, 10)), 2);
    }

    #[test]
    fn one_id_per_frame_even_when_two_regions_overlap_it() {
        let mut db = InstanceDb::new();
        assert_eq!(db.observe("waving", 0, square(0, 0, 20)), 1);
        // Both halves overlap instance 1; the first keeps it, the second is new.
        assert_eq!(db.observe("waving", 1, square(0, 0, 12)), 1);
        assert_eq!(db.observe("waving", 1, square(10, 10, 8)), 2);
        assert_eq!(db.ids_in_frame(1), vec![1, 2]);
    }

    #[test]
    fn gap_of_one_frame_retires_instance() {
        let mut db = InstanceDb::new();
        db.observe("walking", 0, square(0, 0, 10));
        assert!(db.retire_absent(0).is_empty());
        // Frame 1 has no observation.
        let retired = db.retire_absent(1);
        assert_eq!(retired.len(), 1);
        assert_eq!(retired[0].id, 1);
        assert!(db.is_empty());

        // A blob reappearing later gets a fresh id.
        assert_eq!(db.observe("walking", 2, square(0, 0, 10)), 2);
    }

    #[test]
    fn ties_prefer_the_earliest_instance() {
        let mut db = InstanceDb::new();
        assert_eq!(db.observe("walking", 0, square(0, 0, 10)), 1);
        assert_eq!(db.observe("walking", 0, square(10, 0, 10)), 2);
        // Overlaps both previous instances by exactly 5x10 pixels.
        assert_eq!(db.observe("walking", 1, square(5, 0, 10)), 1);
    }

    #[test]
    fn instances_in_frame_and_observation_lookup() {
        let mut db = InstanceDb::new();
        db.observe("walking", 0, square(0, 0, 10));
        db.observe("walking", 1, square(2, 0, 10));
        db.observe("kicking", 1, square(40, 40, 10));

        let in_frame: Vec<_> = db.instances_in_frame(1).map(|i| i.id).collect();
        assert_eq!(in_frame, vec![1, 2]);

        let walking = db.instances_in_frame(1).next().unwrap();
        assert_eq!(walking.observation(1).unwrap().bbox.x, 2);
        assert_eq!(walking.first_frame(), 0);
        assert_eq!(walking.last_frame(), 1);
    }
}
