//! The pin-buffer interface used by the processing side of the simulation.
//!
//! Processing code decides *when* resource appears in or leaves a pin
//! buffer; the network engine only redistributes what is already there.
//! Values cross this boundary as `f64` and are stored as [`Fixed64`].

use gridflow_core::fixed::{Fixed64, f64_to_fixed64, fixed64_to_f64};

use crate::error::NetError;
use crate::node::{NodeRef, Pin};

pub trait PinBuffers {
    /// Current contents of the pin at `slot`.
    fn read_buffer(&self, slot: NodeRef) -> Result<f64, NetError>;

    /// Add `delta` (negative to draw) to the pin at `slot`, clamped to
    /// `[0, max_buffer]`. Returns the amount actually applied.
    fn adjust_buffer(&mut self, slot: NodeRef, delta: f64) -> Result<f64, NetError>;
}

/// Apply a clamped adjustment to `pin`, returning the applied delta.
pub(crate) fn adjust_pin(pin: &mut Pin, delta: f64) -> f64 {
    let before = pin.buffer;
    let target = before.saturating_add(f64_to_fixed64(delta));
    pin.buffer = gridflow_core::fixed::clamp(target, Fixed64::ZERO, pin.max_buffer);
    fixed64_to_f64(pin.buffer - before)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adjust_clamps_both_ways() {
        let mut pin = Pin::consumer(Fixed64::from_num(10));
        assert_eq!(adjust_pin(&mut pin, 12.5), 12.5);
        assert_eq!(adjust_pin(&mut pin, 100.0), 17.5);
        assert_eq!(pin.buffer, Fixed64::from_num(30));
        assert_eq!(adjust_pin(&mut pin, -50.0), -30.0);
        assert_eq!(pin.buffer, Fixed64::ZERO);
    }

    #[test]
    fn nan_delta_is_ignored() {
        let mut pin = Pin::producer(Fixed64::from_num(4)).with_buffer(Fixed64::from_num(2));
        assert_eq!(adjust_pin(&mut pin, f64::NAN), 0.0);
        assert_eq!(pin.buffer, Fixed64::from_num(2));
    }
}
