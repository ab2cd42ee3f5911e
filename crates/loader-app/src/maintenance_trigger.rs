//! Production `MaintenanceTrigger` backed by a GPIO sysfs value file.
//!
//! The maintenance button is an out-of-scope collaborator: the core only
//! assumes a boolean edge event from the OS. This is the narrow production
//! adapter that satisfies [`loader_core::MaintenanceTrigger`] by sampling a
//! `/sys/class/gpio/...` value file — a thin, fallible-but-never-panicking
//! wrapper the rest of the core never has to know exists.
//!
//! # Capabilities
//!
//! - Non-blocking: `poll_edge` is a single synchronous file read, never a
//!   blocking wait for a GPIO interrupt.
//! - Edge-triggered: a rising level (file reads `"1"`) since the last
//!   sample while armed is reported exactly once.
//!
//! # Limitations
//!
//! Bring-up of the GPIO line itself (exporting it, setting its direction,
//! debouncing the physical switch) is out of scope; this
//! adapter assumes the line is already exported and its `value` file is
//! readable. A read failure is logged and treated as "no edge" rather than
//! propagated, since a flaky maintenance button must never crash the
//! target's main loop.

use std::path::PathBuf;

use loader_core::MaintenanceTrigger;
use tracing::warn;

/// Default sysfs path for the maintenance button's GPIO value file.
pub const DEFAULT_GPIO_VALUE_PATH: &str = "/sys/class/gpio/gpio17/value";

/// Polls a GPIO sysfs `value` file for a rising edge while armed.
pub struct GpioMaintenanceTrigger {
    value_path: PathBuf,
    armed: bool,
    last_level: bool,
}

impl GpioMaintenanceTrigger {
    /// Build a trigger sampling `value_path`. Disarmed until [`Self::arm`]
    /// is called.
    #[must_use]
    pub fn new(value_path: impl Into<PathBuf>) -> Self {
        Self { value_path: value_path.into(), armed: false, last_level: false }
    }

    fn read_level(&self) -> bool {
        match std::fs::read_to_string(&self.value_path) {
            Ok(contents) => contents.trim() == "1",
            Err(err) => {
                warn!(path = %self.value_path.display(), %err, "failed to read maintenance trigger GPIO value");
                false
            },
        }
    }
}

impl MaintenanceTrigger for GpioMaintenanceTrigger {
    fn arm(&mut self) {
        self.armed = true;
        // Sample the current level so a switch already held down when we
        // arm does not look like a fresh edge.
        self.last_level = self.read_level();
    }

    fn disarm(&mut self) {
        self.armed = false;
    }

    fn poll_edge(&mut self) -> bool {
        if !self.armed {
            return false;
        }
        let level = self.read_level();
        let edge = level && !self.last_level;
        self.last_level = level;
        edge
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn rising_edge_is_reported_once() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("value");
        fs::write(&path, "0\n").expect("write");

        let mut trigger = GpioMaintenanceTrigger::new(&path);
        trigger.arm();
        assert!(!trigger.poll_edge());

        fs::write(&path, "1\n").expect("write");
        assert!(trigger.poll_edge());
        assert!(!trigger.poll_edge(), "edge should only fire once per rise");
    }

    #[test]
    fn disarmed_trigger_never_reports_edges() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("value");
        fs::write(&path, "1\n").expect("write");

        let mut trigger = GpioMaintenanceTrigger::new(&path);
        assert!(!trigger.poll_edge());
    }

    #[test]
    fn arming_while_already_high_does_not_report_a_spurious_edge() {
        let dir = tempdir().expect("tempdir");
        let path = dir.path().join("value");
        fs::write(&path, "1\n").expect("write");

        let mut trigger = GpioMaintenanceTrigger::new(&path);
        trigger.arm();
        assert!(!trigger.poll_edge());
    }

    #[test]
    fn missing_gpio_file_is_treated_as_no_edge() {
        let trigger = GpioMaintenanceTrigger::new("/definitely/not/a/real/gpio/value");
        assert!(!trigger.read_level());
    }
}
