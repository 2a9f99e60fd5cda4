//! Shared on/off latch used to gate registrations.
//!
//! A [`Toggle`] is owned by whoever constructs it. Registrations only hold a
//! handle to it (see [`RegisterOptions::toggles_on`](crate::registration::RegisterOptions::toggles_on)
//! and [`RegisterOptions::toggles_off`](crate::registration::RegisterOptions::toggles_off)),
//! which lets two handlers on different hooks implement
//! "run once until released" exclusion.
//!
//! # Example
//!
//! ```
//! use herald_hooks::toggle::Toggle;
//!
//! let toggle = Toggle::new();
//! let handle = toggle.clone();
//!
//! assert!(toggle.is_off());
//! handle.toggle();
//! assert!(toggle.is_on());
//! ```

use core::fmt;
use core::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A boolean latch. Clones share the same underlying state.
#[derive(Clone, Default)]
pub struct Toggle {
    state: Arc<AtomicBool>,
}

impl Toggle {
    /// Creates a new toggle in the off state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the toggle is on.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.state.load(Ordering::SeqCst)
    }

    /// Returns `true` if the toggle is off.
    #[must_use]
    pub fn is_off(&self) -> bool {
        !self.is_on()
    }

    /// Switches the toggle on.
    pub fn on(&self) {
        self.state.store(true, Ordering::SeqCst);
    }

    /// Switches the toggle off.
    pub fn off(&self) {
        self.state.store(false, Ordering::SeqCst);
    }

    /// Flips the toggle and returns the new state.
    pub fn toggle(&self) -> bool {
        !self.state.fetch_xor(true, Ordering::SeqCst)
    }

    /// Switches the toggle to `target` if it is not already there.
    ///
    /// Returns `false` when the toggle was already in the target state.
    pub(crate) fn switch_to(&self, target: bool) -> bool {
        self.state
            .compare_exchange(!target, target, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }

    /// Returns `true` if both handles refer to the same latch.
    #[must_use]
    pub fn ptr_eq(&self, other: &Toggle) -> bool {
        Arc::ptr_eq(&self.state, &other.state)
    }
}

impl fmt::Debug for Toggle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Toggle").field("on", &self.is_on()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_off() {
        let toggle = Toggle::new();
        assert!(toggle.is_off());
        assert!(!toggle.is_on());
    }

    #[test]
    fn toggle_flips_and_reports_new_state() {
        let toggle = Toggle::new();
        assert!(toggle.toggle());
        assert!(toggle.is_on());
        assert!(!toggle.toggle());
        assert!(toggle.is_off());
    }

    #[test]
    fn clones_share_state() {
        let toggle = Toggle::new();
        let handle = toggle.clone();
        handle.on();
        assert!(toggle.is_on());
        assert!(toggle.ptr_eq(&handle));
        assert!(!toggle.ptr_eq(&Toggle::new()));
    }

    #[test]
    fn switch_to_only_succeeds_on_change() {
        let toggle = Toggle::new();
        assert!(toggle.switch_to(true));
        assert!(!toggle.switch_to(true));
        assert!(toggle.switch_to(false));
        assert!(!toggle.switch_to(false));
    }
}
