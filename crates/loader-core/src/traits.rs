//! External collaborator contracts.
//!
//! Decouples the session FSM from the hardware it runs on top of: a
//! maintenance-trigger input and the firmware partition's free-space
//! accounting. Production binds these to real GPIO/filesystem queries;
//! tests bind them to scripted fakes.

/// Non-blocking edge-triggered input that tells the FSM when to leave
/// `OPERATIONAL` for `MAINT_WAIT`.
pub trait MaintenanceTrigger: Send + Sync {
    /// Arm the trigger so a subsequent edge is observable. Called on
    /// entering `OPERATIONAL`.
    fn arm(&mut self);

    /// Disarm the trigger. Called on leaving `OPERATIONAL`.
    fn disarm(&mut self);

    /// Non-blocking query: has the trigger fired since it was armed?
    fn poll_edge(&mut self) -> bool;
}

/// Free/used/total space accounting for the firmware partition, queried by
/// `make_rrq` before accepting each DATA payload.
pub trait PartitionInfo: Send + Sync {
    /// Total bytes the partition can hold.
    fn total_bytes(&self) -> u64;

    /// Bytes currently in use.
    fn used_bytes(&self) -> u64;

    /// Bytes free for new firmware data.
    fn free_bytes(&self) -> u64 {
        self.total_bytes().saturating_sub(self.used_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPartition {
        total: u64,
        used: u64,
    }

    impl PartitionInfo for FixedPartition {
        fn total_bytes(&self) -> u64 {
            self.total
        }

        fn used_bytes(&self) -> u64 {
            self.used
        }
    }

    #[test]
    fn free_bytes_is_total_minus_used() {
        let partition = FixedPartition { total: 1_000_000, used: 400_000 };
        assert_eq!(partition.free_bytes(), 600_000);
    }

    #[test]
    fn free_bytes_saturates_when_used_exceeds_total() {
        let partition = FixedPartition { total: 1_000, used: 2_000 };
        assert_eq!(partition.free_bytes(), 0);
    }

    struct ManualTrigger {
        armed: bool,
        pending_edge: bool,
    }

    impl MaintenanceTrigger for ManualTrigger {
        fn arm(&mut self) {
            self.armed = true;
        }

        fn disarm(&mut self) {
            self.armed = false;
        }

        fn poll_edge(&mut self) -> bool {
            if self.armed && self.pending_edge {
                self.pending_edge = false;
                true
            } else {
                false
            }
        }
    }

    #[test]
    fn trigger_only_fires_once_per_edge() {
        let mut trigger = ManualTrigger { armed: true, pending_edge: true };
        assert!(trigger.poll_edge());
        assert!(!trigger.poll_edge());
    }

    #[test]
    fn disarmed_trigger_never_fires() {
        let mut trigger = ManualTrigger { armed: false, pending_edge: true };
        assert!(!trigger.poll_edge());
    }
}
