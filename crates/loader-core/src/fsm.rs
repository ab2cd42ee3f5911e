//! Session state machine.
//!
//! Nine states carry a firmware upload session from boot to the next
//! maintenance window. This module is a pure state machine: no socket, no
//! file handle, no I/O. The driver (the `loader-app` binary) executes each
//! state's entry/run/exit work by calling into `loader-tftp`,
//! `loader-crypto`, and `loader-sink`, then reports a [`StepOutcome`] back
//! here to decide the next state.
//!
//! ```text
//! INIT -> OPERATIONAL -> MAINT_WAIT -> UPLOAD_PREP -> UPLOADING -> VERIFY -> SAVE -> TEARDOWN -+
//!                            ^                                                                 |
//!                            +-------------------------------------------------------------------+
//! ```
//! Any state may fall to ERROR, which is terminal.

use std::net::SocketAddr;

use loader_crypto::AuthKeys;

/// Maximum upload failures tolerated in a session before the FSM forces an
/// escalation to `ERROR`, independent of the current state's own verdict.
pub const MAX_UPLOAD_FAILURES: u32 = 2;

/// Firmware partition free-space floor below which an upload is refused.
pub const MIN_AVAILABLE_SPACE: u64 = 500_000;

/// One of the nine session states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Mount storage, write static keys if absent.
    Init,
    /// Idle, watching the maintenance trigger.
    Operational,
    /// AP up, socket bound, waiting out the handshake and the LUI request.
    MaintWait,
    /// Pushing `INIT_LOAD.LUS`, receiving and parsing the LUR.
    UploadPrep,
    /// Pulling the firmware image named in the LUR.
    Uploading,
    /// Comparing the received hash against the computed digest.
    Verify,
    /// Committing the staged file.
    Save,
    /// Pushing `FINAL_LOAD.LUS`, resetting session state.
    Teardown,
    /// Terminal failure state: discard staging, log, halt.
    Error,
}

impl SessionState {
    /// Whether this state is terminal (the FSM never leaves it).
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Error)
    }
}

/// What a state's run-loop action decided, reported back to [`SessionFsm::step`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The state's work completed; advance to the next state in the table.
    Advance,
    /// A soft fault occurred; stay in the current state and retry (only
    /// meaningful in `MAINT_WAIT`, which tolerates soft errors indefinitely).
    Retry,
    /// A fatal fault occurred; escalate straight to `ERROR`.
    Fail,
}

/// Mutable working set shared by every state while a session is alive.
///
/// Single-writer: only the currently active state handler mutates this.
/// `reset` is called on entering `TEARDOWN`'s exit action, per the global
/// reset requirement that `TEARDOWN` must complete before `MAINT_WAIT`
/// accepts the next handshake.
pub struct SessionContext {
    /// Loader's address before any ephemeral-TID transfer moved it aside.
    /// Restored onto the main socket before each LUS push.
    pub original_loader_addr: Option<SocketAddr>,
    /// Keys loaded for the current handshake, cleared on teardown.
    pub auth_keys: Option<AuthKeys>,
    /// Digest received from the loader in `UPLOADING`, compared in `VERIFY`.
    pub received_hash: Option<[u8; 32]>,
    /// Digest computed by `loader-tftp` while streaming the firmware image.
    pub computed_hash: Option<[u8; 32]>,
    /// Running count of soft faults this session. Reset in `TEARDOWN`.
    pub upload_failure_count: u32,
    /// Whether the PSK handshake has completed. Process-wide across
    /// re-entries to `MAINT_WAIT` (a stray timeout waiting for the LUI
    /// request does not force the handshake to run again); cleared by
    /// `TEARDOWN`.
    pub authenticated: bool,
}

impl Default for SessionContext {
    fn default() -> Self {
        Self {
            original_loader_addr: None,
            auth_keys: None,
            received_hash: None,
            computed_hash: None,
            upload_failure_count: 0,
            authenticated: false,
        }
    }
}

impl SessionContext {
    /// Fresh, empty working set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear the session working set: zeroize keys, drop hashes, reset the
    /// failure counter. Called on leaving `TEARDOWN`.
    pub fn reset(&mut self) {
        if let Some(mut keys) = self.auth_keys.take() {
            keys.clear();
        }
        self.received_hash = None;
        self.computed_hash = None;
        self.upload_failure_count = 0;
        self.original_loader_addr = None;
        self.authenticated = false;
    }

    /// Record a soft fault (malformed/unknown-opcode frame, hardware-PN
    /// mismatch in the first firmware packet).
    pub fn record_soft_fault(&mut self) {
        self.upload_failure_count += 1;
    }

    /// Whether the failure counter has strictly exceeded the allowed
    /// maximum, forcing escalation regardless of the active state's verdict.
    #[must_use]
    pub fn failures_exceeded(&self) -> bool {
        self.upload_failure_count > MAX_UPLOAD_FAILURES
    }
}

/// Drives [`SessionState`] transitions according to the state table and the
/// global failure-count escalation policy.
#[derive(Debug, Clone, Copy)]
pub struct SessionFsm {
    state: SessionState,
}

impl Default for SessionFsm {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionFsm {
    /// A fresh FSM, starting in `INIT`.
    #[must_use]
    pub fn new() -> Self {
        Self { state: SessionState::Init }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Apply one run-loop outcome, returning the resulting state.
    ///
    /// `context` supplies the global failure count so the escalation
    /// policy can override the state table's own verdict: after applying
    /// `outcome`, if the failure counter strictly exceeds
    /// [`MAX_UPLOAD_FAILURES`], the FSM is forced to `ERROR` regardless of
    /// what the state table says.
    pub fn step(&mut self, outcome: StepOutcome, context: &SessionContext) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }

        self.state = match (self.state, outcome) {
            (_, StepOutcome::Fail) => SessionState::Error,
            (SessionState::MaintWait, StepOutcome::Retry) => SessionState::MaintWait,
            (state, StepOutcome::Retry) => state,
            (SessionState::Init, StepOutcome::Advance) => SessionState::Operational,
            (SessionState::Operational, StepOutcome::Advance) => SessionState::MaintWait,
            (SessionState::MaintWait, StepOutcome::Advance) => SessionState::UploadPrep,
            (SessionState::UploadPrep, StepOutcome::Advance) => SessionState::Uploading,
            (SessionState::Uploading, StepOutcome::Advance) => SessionState::Verify,
            (SessionState::Verify, StepOutcome::Advance) => SessionState::Save,
            (SessionState::Save, StepOutcome::Advance) => SessionState::Teardown,
            (SessionState::Teardown, StepOutcome::Advance) => SessionState::MaintWait,
            (SessionState::Error, _) => SessionState::Error,
        };

        if !self.state.is_terminal() && context.failures_exceeded() {
            self.state = SessionState::Error;
        }

        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_cycles_back_to_maint_wait() {
        let mut fsm = SessionFsm::new();
        let ctx = SessionContext::new();

        let states = [
            SessionState::Operational,
            SessionState::MaintWait,
            SessionState::UploadPrep,
            SessionState::Uploading,
            SessionState::Verify,
            SessionState::Save,
            SessionState::Teardown,
            SessionState::MaintWait,
        ];

        for expected in states {
            assert_eq!(fsm.step(StepOutcome::Advance, &ctx), expected);
        }
    }

    #[test]
    fn maint_wait_retries_on_soft_error_without_advancing() {
        let mut fsm = SessionFsm::new();
        let ctx = SessionContext::new();
        fsm.step(StepOutcome::Advance, &ctx); // -> Operational
        fsm.step(StepOutcome::Advance, &ctx); // -> MaintWait

        assert_eq!(fsm.step(StepOutcome::Retry, &ctx), SessionState::MaintWait);
        assert_eq!(fsm.step(StepOutcome::Retry, &ctx), SessionState::MaintWait);
    }

    #[test]
    fn any_state_fails_straight_to_error() {
        let mut fsm = SessionFsm::new();
        let ctx = SessionContext::new();
        fsm.step(StepOutcome::Advance, &ctx); // -> Operational
        assert_eq!(fsm.step(StepOutcome::Fail, &ctx), SessionState::Error);
    }

    #[test]
    fn error_is_terminal() {
        let mut fsm = SessionFsm::new();
        let ctx = SessionContext::new();
        fsm.step(StepOutcome::Fail, &ctx);
        assert_eq!(fsm.state(), SessionState::Error);
        assert_eq!(fsm.step(StepOutcome::Advance, &ctx), SessionState::Error);
    }

    #[test]
    fn exceeding_failure_count_forces_error_regardless_of_verdict() {
        let mut fsm = SessionFsm::new();
        let mut ctx = SessionContext::new();
        fsm.step(StepOutcome::Advance, &ctx); // -> Operational
        fsm.step(StepOutcome::Advance, &ctx); // -> MaintWait

        ctx.record_soft_fault();
        ctx.record_soft_fault();
        ctx.record_soft_fault();
        assert!(ctx.failures_exceeded());

        // Even an Advance verdict is overridden once the counter is blown.
        assert_eq!(fsm.step(StepOutcome::Advance, &ctx), SessionState::Error);
    }

    #[test]
    fn exactly_at_threshold_does_not_force_error() {
        let mut fsm = SessionFsm::new();
        let mut ctx = SessionContext::new();
        fsm.step(StepOutcome::Advance, &ctx); // -> Operational

        ctx.record_soft_fault();
        ctx.record_soft_fault();
        assert!(!ctx.failures_exceeded());

        assert_eq!(fsm.step(StepOutcome::Advance, &ctx), SessionState::MaintWait);
    }

    #[test]
    fn reset_clears_working_set_and_zeroizes_keys() {
        let mut ctx = SessionContext::new();
        ctx.auth_keys = Some(AuthKeys { local_key: [7u8; 32], peer_expected_key: [8u8; 32] });
        ctx.received_hash = Some([1u8; 32]);
        ctx.computed_hash = Some([1u8; 32]);
        ctx.upload_failure_count = 2;
        ctx.authenticated = true;

        ctx.reset();

        assert!(ctx.auth_keys.is_none());
        assert!(ctx.received_hash.is_none());
        assert!(ctx.computed_hash.is_none());
        assert_eq!(ctx.upload_failure_count, 0);
        assert!(!ctx.authenticated);
    }
}
