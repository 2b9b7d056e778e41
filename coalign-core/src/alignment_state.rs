//! Per-asset-slot record of the currently applied alignment

use crate::transform::Transform;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The asset kinds a scene can hold, one alignment per kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetSlot {
    Splat,
    Model,
    #[serde(rename = "pointcloud")]
    PointCloud,
}

impl AssetSlot {
    pub const ALL: [AssetSlot; 3] = [AssetSlot::Splat, AssetSlot::Model, AssetSlot::PointCloud];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetSlot::Splat => "splat",
            AssetSlot::Model => "model",
            AssetSlot::PointCloud => "pointcloud",
        }
    }
}

impl fmt::Display for AssetSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Currently applied transform per slot plus a staleness counter.
///
/// `None` means the slot is untouched. Every mutation bumps `version`,
/// including clearing a slot that was already empty. Entries are overwritten,
/// never merged. Values are not range-checked here; that belongs to the UI.
///
/// The manifest writer serializes this as
/// `{"splat": {...} | null, "model": ..., "pointcloud": ..., "version": n}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlignmentState {
    #[serde(default)]
    splat: Option<Transform>,
    #[serde(default)]
    model: Option<Transform>,
    #[serde(default)]
    pointcloud: Option<Transform>,
    #[serde(default)]
    version: u64,
}

impl AlignmentState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the transform of `slot`
    pub fn set_transform(&mut self, slot: AssetSlot, transform: Transform) {
        *self.entry_mut(slot) = Some(transform);
        self.bump(slot);
    }

    pub fn get_transform(&self, slot: AssetSlot) -> Option<&Transform> {
        match slot {
            AssetSlot::Splat => self.splat.as_ref(),
            AssetSlot::Model => self.model.as_ref(),
            AssetSlot::PointCloud => self.pointcloud.as_ref(),
        }
    }

    /// Reset `slot` to untouched, returning the transform it held
    pub fn clear_transform(&mut self, slot: AssetSlot) -> Option<Transform> {
        let previous = self.entry_mut(slot).take();
        self.bump(slot);
        previous
    }

    /// Monotonic mutation counter used by consumers to detect staleness
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Slots that currently hold a transform, in `AssetSlot::ALL` order
    pub fn iter(&self) -> impl Iterator<Item = (AssetSlot, &Transform)> + '_ {
        AssetSlot::ALL
            .into_iter()
            .filter_map(move |slot| self.get_transform(slot).map(|t| (slot, t)))
    }

    /// True when no slot holds a transform
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    fn entry_mut(&mut self, slot: AssetSlot) -> &mut Option<Transform> {
        match slot {
            AssetSlot::Splat => &mut self.splat,
            AssetSlot::Model => &mut self.model,
            AssetSlot::PointCloud => &mut self.pointcloud,
        }
    }

    fn bump(&mut self, slot: AssetSlot) {
        self.version = self.version.wrapping_add(1);
        tracing::trace!(%slot, version = self.version, "alignment state updated");
    }
}
