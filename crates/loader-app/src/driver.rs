//! Session state machine driver.
//!
//! [`LoaderDriver`] is the single dedicated task that owns the session: it
//! owns the bound main UDP socket, the key store, the firmware sink, the
//! partition free-space query, and the maintenance-trigger input, and steps
//! [`loader_core::SessionFsm`] forward by executing each state's entry/run/
//! exit action through `loader-crypto`, `loader-tftp`, and `loader-sink`.
//! This module performs the real I/O the pure FSM in `loader_core` cannot,
//! dispatching over a state table rather than over per-connection frame
//! events.

use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    time::Duration,
};

use loader_core::{MaintenanceTrigger, PartitionInfo, SessionContext, SessionFsm, SessionState, StepOutcome};
use loader_crypto::{digests_match, perform_handshake, KeyStore};
use loader_proto::{encode_lus, StatusCode, TftpFrame};
use loader_sink::{FilesystemPartition, FirmwareSink};
use loader_tftp::{
    errors::EngineError,
    handle_rrq, handle_wrq, make_rrq, make_wrq,
    socket::{recv_frame, send_frame},
    UdpHandshakeTransport,
};
use tokio::net::UdpSocket;
use tracing::{error, info, warn};

use crate::{config::LoaderConfig, error::AppError};

/// Sleep between FSM run-loop iterations.
const INTER_ITERATION_SLEEP: Duration = Duration::from_millis(50);

/// Drives one [`loader_core::SessionFsm`] to completion, re-entering
/// `MAINT_WAIT` after every successful session.
///
/// Generic over the maintenance-trigger implementation so tests can swap
/// in a scripted fake for [`crate::maintenance_trigger::GpioMaintenanceTrigger`].
pub struct LoaderDriver<T: MaintenanceTrigger> {
    config: LoaderConfig,
    trigger: T,
    fsm: SessionFsm,
    ctx: SessionContext,
    main_socket: Option<UdpSocket>,
    key_store: KeyStore,
    firmware_sink: FirmwareSink,
    partition: FilesystemPartition,
    lur: Option<loader_proto::LurRecord>,
}

impl<T: MaintenanceTrigger> LoaderDriver<T> {
    /// Build a driver from `config`. Probes the firmware partition's total
    /// capacity immediately; does not touch the key partition or bind any
    /// socket until the FSM reaches `INIT`/`MAINT_WAIT`.
    ///
    /// # Errors
    ///
    /// [`AppError::MountFirmwarePartition`] if the firmware mount point
    /// cannot be statted.
    pub fn new(config: LoaderConfig, trigger: T) -> Result<Self, AppError> {
        let partition = FilesystemPartition::new(&config.firmware_mount).map_err(|source| {
            AppError::MountFirmwarePartition { path: config.firmware_mount.display().to_string(), source }
        })?;
        let key_store = KeyStore::new(&config.keys_mount);
        let firmware_sink = FirmwareSink::new(&config.staging_path, &config.final_path);
        Ok(Self {
            config,
            trigger,
            fsm: SessionFsm::new(),
            ctx: SessionContext::new(),
            main_socket: None,
            key_store,
            firmware_sink,
            partition,
            lur: None,
        })
    }

    /// Run the FSM forever. Only returns once the FSM reaches the terminal
    /// `ERROR` state, at which point the staged image has already been
    /// discarded and the caller should let the process exit so a power
    /// cycle restarts cleanly from `INIT`.
    ///
    /// # Errors
    ///
    /// [`AppError::BindMainSocket`] if the main socket cannot be bound on
    /// entering `MAINT_WAIT`; [`AppError::SessionFailed`] once the FSM
    /// reaches `ERROR`.
    pub async fn run(mut self) -> Result<(), AppError> {
        let mut state = self.fsm.state();
        self.enter_state(state).await?;

        loop {
            let outcome = self.run_state(state).await;
            let next = self.fsm.step(outcome, &self.ctx);

            if next != state {
                self.exit_state(state).await;
                state = next;
                self.enter_state(state).await?;
            }

            if state == SessionState::Error {
                self.run_error().await;
                return Err(AppError::SessionFailed);
            }

            tokio::time::sleep(INTER_ITERATION_SLEEP).await;
        }
    }

    async fn enter_state(&mut self, state: SessionState) -> Result<(), AppError> {
        match state {
            SessionState::Operational => self.trigger.arm(),
            SessionState::MaintWait => {
                if self.main_socket.is_none() {
                    let socket = UdpSocket::bind(self.config.bind_addr).await.map_err(|source| {
                        AppError::BindMainSocket { addr: self.config.bind_addr.to_string(), source }
                    })?;
                    info!(addr = %self.config.bind_addr, "bound main TFTP socket");
                    self.main_socket = Some(socket);
                }
            },
            _ => {},
        }
        Ok(())
    }

    async fn exit_state(&mut self, state: SessionState) {
        match state {
            SessionState::Operational => self.trigger.disarm(),
            SessionState::Teardown => {
                self.ctx.reset();
                self.lur = None;
                info!("session torn down, returning to MAINT_WAIT");
            },
            _ => {},
        }
    }

    async fn run_state(&mut self, state: SessionState) -> StepOutcome {
        match state {
            SessionState::Init => self.run_init(),
            SessionState::Operational => {
                if self.trigger.poll_edge() {
                    StepOutcome::Advance
                } else {
                    StepOutcome::Retry
                }
            },
            SessionState::MaintWait => self.run_maint_wait().await,
            SessionState::UploadPrep => self.run_upload_prep().await,
            SessionState::Uploading => self.run_uploading().await,
            SessionState::Verify => self.run_verify(),
            SessionState::Save => self.run_save(),
            SessionState::Teardown => self.run_teardown().await,
            // The run loop always returns as soon as `state` becomes
            // `Error` (see `run`), so this arm never actually executes;
            // it exists only so the match stays exhaustive.
            SessionState::Error => StepOutcome::Fail,
        }
    }

    fn run_init(&mut self) -> StepOutcome {
        match self.key_store.write_static_keys() {
            Ok(()) => StepOutcome::Advance,
            Err(err) => {
                error!(%err, "failed to provision static keys");
                StepOutcome::Fail
            },
        }
    }

    async fn run_maint_wait(&mut self) -> StepOutcome {
        if !self.ctx.authenticated {
            let mut keys = match self.key_store.load_keys() {
                Ok(keys) => keys,
                Err(err) => {
                    error!(%err, "failed to load PSK keys");
                    return StepOutcome::Fail;
                },
            };

            let handshake_result = {
                let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
                // Real address unknown until the loader's first frame
                // arrives; `perform_handshake` only ever sends after it
                // has received at least one frame, so this is never used.
                let placeholder = SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 0);
                let mut transport = UdpHandshakeTransport::new(socket, placeholder);
                perform_handshake(&mut transport, &keys).await.map(|()| transport.peer())
            };

            match handshake_result {
                Ok(peer) => {
                    keys.clear();
                    self.ctx.authenticated = true;
                    self.ctx.original_loader_addr = Some(peer);
                },
                Err(err) if err.is_transient() => return StepOutcome::Retry,
                Err(err) => {
                    error!(%err, "PSK handshake failed");
                    return StepOutcome::Fail;
                },
            }
        }

        let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
        match recv_frame(socket).await {
            Ok(None) => StepOutcome::Retry,
            Ok(Some((TftpFrame::Rrq { filename, .. }, from))) => match handle_rrq(&filename, from).await {
                Ok(()) => {
                    self.ctx.original_loader_addr = Some(from);
                    StepOutcome::Advance
                },
                Err(EngineError::UnsupportedFile(_)) => StepOutcome::Retry,
                Err(err) => {
                    error!(%err, "failed to serve LUI");
                    StepOutcome::Fail
                },
            },
            Ok(Some(_)) => StepOutcome::Retry,
            Err(err) => {
                error!(%err, "error waiting for LUI request");
                StepOutcome::Fail
            },
        }
    }

    async fn run_upload_prep(&mut self) -> StepOutcome {
        let Some(peer) = self.ctx.original_loader_addr else { return StepOutcome::Fail };

        let lus = match encode_lus(StatusCode::AcceptedNotStarted, "Load initiated", 0, *b"000") {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%err, "failed to encode INIT_LOAD.LUS");
                return StepOutcome::Fail;
            },
        };
        {
            let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
            if let Err(err) = make_wrq(socket, "INIT_LOAD.LUS", lus, peer).await {
                error!(%err, "failed to push INIT_LOAD.LUS");
                return StepOutcome::Fail;
            }
        }

        let (filename, from) = {
            let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
            match recv_frame(socket).await {
                Ok(Some((TftpFrame::Wrq { filename, .. }, from))) => (filename, from),
                Ok(_) => {
                    error!("expected a WRQ for the LUR, got something else or timed out");
                    return StepOutcome::Fail;
                },
                Err(err) => {
                    error!(%err, "error waiting for the LUR's WRQ");
                    return StepOutcome::Fail;
                },
            }
        };

        let outcome = match handle_wrq(&filename, from).await {
            Ok(outcome) => outcome,
            Err(err) => {
                error!(%err, "failed to receive the LUR");
                return StepOutcome::Fail;
            },
        };
        for _ in 0..outcome.soft_faults {
            self.ctx.record_soft_fault();
        }

        if !self.config.supported_sw_pns.contains(&outcome.record.part_number) {
            error!(pn = %outcome.record.part_number, "software part number not in allow-list");
            return StepOutcome::Fail;
        }

        self.lur = Some(outcome.record);
        StepOutcome::Advance
    }

    async fn run_uploading(&mut self) -> StepOutcome {
        let Some(peer) = self.ctx.original_loader_addr else { return StepOutcome::Fail };
        let Some(lur) = self.lur.clone() else { return StepOutcome::Fail };

        if let Err(err) = self.firmware_sink.open_staging() {
            error!(%err, "failed to open staging file");
            return StepOutcome::Fail;
        }

        let result = {
            let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
            make_rrq(
                socket,
                &lur.name,
                peer,
                &self.config.hardware_pn,
                &self.partition,
                loader_core::MIN_AVAILABLE_SPACE,
                &mut self.firmware_sink,
            )
            .await
        };

        let computed = match result {
            Ok(outcome) => {
                for _ in 0..outcome.soft_faults {
                    self.ctx.record_soft_fault();
                }
                match outcome.digest {
                    Some(digest) => digest,
                    None => {
                        warn!("firmware transfer carried zero bytes");
                        self.ctx.record_soft_fault();
                        return StepOutcome::Retry;
                    },
                }
            },
            Err(EngineError::HardwarePartNumberMismatch { expected, actual }) => {
                warn!(expected, actual, "hardware part number mismatch on first firmware packet");
                self.ctx.record_soft_fault();
                return StepOutcome::Retry;
            },
            Err(err) => {
                error!(%err, "firmware RRQ failed");
                return StepOutcome::Fail;
            },
        };
        self.ctx.computed_hash = Some(computed);

        let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
        match recv_frame(socket).await {
            Ok(Some((TftpFrame::Data { block, payload }, from))) if payload.len() == 32 => {
                let mut hash = [0u8; 32];
                hash.copy_from_slice(&payload);
                self.ctx.received_hash = Some(hash);
                if let Err(err) = send_frame(socket, &TftpFrame::Ack { block }, from).await {
                    error!(%err, "failed to ACK the expected-hash packet");
                    return StepOutcome::Fail;
                }
                // `from` is the loader's one stable address throughout a
                // session (only the target's own local port changes per
                // ephemeral transfer), so no explicit restore is needed
                // here beyond leaving `original_loader_addr` untouched.
                StepOutcome::Advance
            },
            Ok(_) => {
                error!("expected a single 32-byte DATA packet carrying the expected hash");
                StepOutcome::Fail
            },
            Err(err) => {
                error!(%err, "error waiting for the expected-hash packet");
                StepOutcome::Fail
            },
        }
    }

    fn run_verify(&mut self) -> StepOutcome {
        match (self.ctx.computed_hash, self.ctx.received_hash) {
            (Some(computed), Some(received)) if digests_match(&computed, &received) => StepOutcome::Advance,
            _ => {
                error!("computed firmware digest does not match the loader-supplied hash");
                StepOutcome::Fail
            },
        }
    }

    fn run_save(&mut self) -> StepOutcome {
        match self.firmware_sink.commit() {
            Ok(()) => StepOutcome::Advance,
            Err(err) => {
                error!(%err, "failed to commit staged firmware image");
                StepOutcome::Fail
            },
        }
    }

    async fn run_teardown(&mut self) -> StepOutcome {
        let Some(peer) = self.ctx.original_loader_addr else { return StepOutcome::Fail };
        let lus = match encode_lus(StatusCode::CompletedOk, "Load complete", 2, *b"100") {
            Ok(bytes) => bytes,
            Err(err) => {
                error!(%err, "failed to encode FINAL_LOAD.LUS");
                return StepOutcome::Fail;
            },
        };
        let Some(socket) = self.main_socket.as_ref() else { return StepOutcome::Fail };
        match make_wrq(socket, "FINAL_LOAD.LUS", lus, peer).await {
            Ok(_) => StepOutcome::Advance,
            Err(err) => {
                error!(%err, "failed to push FINAL_LOAD.LUS");
                StepOutcome::Fail
            },
        }
    }

    async fn run_error(&mut self) {
        if let Err(err) = self.firmware_sink.discard() {
            error!(%err, "failed to discard staged firmware during error teardown");
        }
        error!("session state machine reached ERROR; halting");
    }
}
