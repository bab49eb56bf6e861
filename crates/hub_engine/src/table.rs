//! Sensor state table.
//!
//! One slot per known sensor, indexed by `SensorId::index`, so an unknown
//! wire id can never reach the table. Also holds the pending mask.

use std::fmt;

use contracts::{SensorEvent, SensorId, SENSOR_COUNT};

/// Bitset over slot indices
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingMask(u32);

impl PendingMask {
    #[inline]
    pub fn set(&mut self, id: SensorId) {
        self.0 |= 1 << id.index();
    }

    #[inline]
    pub fn clear(&mut self, id: SensorId) {
        self.0 &= !(1 << id.index());
    }

    #[inline]
    pub fn contains(&self, id: SensorId) -> bool {
        self.0 & (1 << id.index()) != 0
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn bits(&self) -> u32 {
        self.0
    }

    /// Pending sensors in slot order
    pub fn iter(&self) -> impl Iterator<Item = SensorId> + '_ {
        SensorId::ALL.into_iter().filter(|id| self.contains(*id))
    }
}

impl fmt::Debug for PendingMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Per-sensor state cell
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSlot {
    /// Latest synthesized event
    pub event: SensorEvent,
    /// Host time of the latest update of this slot's own reading
    pub last_timestamp: i64,
    /// Records applied to this slot
    pub updates: u64,
}

impl SensorSlot {
    fn new(sensor: SensorId) -> Self {
        Self {
            event: SensorEvent::empty(sensor),
            last_timestamp: 0,
            updates: 0,
        }
    }
}

/// Slot table
#[derive(Debug, Clone)]
pub struct SensorTable {
    slots: [SensorSlot; SENSOR_COUNT],
    pending: PendingMask,
}

impl Default for SensorTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorTable {
    pub fn new() -> Self {
        Self {
            slots: std::array::from_fn(|i| SensorSlot::new(SensorId::ALL[i])),
            pending: PendingMask::default(),
        }
    }

    #[inline]
    pub fn slot(&self, id: SensorId) -> &SensorSlot {
        &self.slots[id.index()]
    }

    #[inline]
    pub fn slot_mut(&mut self, id: SensorId) -> &mut SensorSlot {
        &mut self.slots[id.index()]
    }

    pub fn pending(&self) -> PendingMask {
        self.pending
    }

    pub(crate) fn mark_pending(&mut self, id: SensorId) {
        self.pending.set(id);
    }

    pub(crate) fn clear_pending(&mut self, id: SensorId) {
        self.pending.clear(id);
    }

    pub fn iter(&self) -> impl Iterator<Item = (SensorId, &SensorSlot)> {
        SensorId::ALL.into_iter().zip(self.slots.iter())
    }
}
