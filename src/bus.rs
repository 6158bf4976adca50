use alloc::rc::Rc;
use core::cell::RefCell;

use hashbrown::HashMap;

use crate::hardware::DeviceId;

/// Last applied percent output of every controller on the bus, keyed by id.
///
/// Cloning yields another handle to the same table.
#[derive(Debug, Clone, Default)]
pub struct MotorBus(Rc<RefCell<HashMap<DeviceId, f64>>>);

impl MotorBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(&self, device: DeviceId, output: f64) {
        self.0.borrow_mut().insert(device, output);
    }

    /// The leader's last output, or `None` if it never published.
    pub fn output(&self, device: DeviceId) -> Option<f64> {
        self.0.borrow().get(&device).copied()
    }

    pub fn clear(&self, device: DeviceId) {
        self.0.borrow_mut().remove(&device);
    }
}
