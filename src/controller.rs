//! The transfer controller.
//!
//! This is the main loop half of the drive.  [`TransferController::tick`] is
//! called once per loop iteration.  It polls the handshake inputs, keeps
//! motor-on and ready consistent with them, services the double buffer's
//! refill requests against the storage collaborator, and arms and disarms
//! the bit clock engine as sessions start and stop.
//!
//! A session starts when the RAM Adapter asserts scan-media without
//! stop-motor, and ends when it asserts stop-motor, when the media is
//! ejected, or when the session has covered the whole side.

// Copyright (c) 2025 Piers Finlayson <piers@piers.rocks>
//
// GPLv3 licensed - see https://www.gnu.org/licenses/gpl-3.0.html

use crate::constants::TICKS_PER_BIT_CELL;
use crate::engine::{BitClockEngine, EngineConfig, EngineStatus};
use crate::signal::{HandshakeLines, HandshakeState, OutputSignal, SignalPort};
use crate::storage::{BlockStore, StorageError};
use crate::types::{BitOrder, BufferId, Direction, DiskSide, GapPolicy};

/// How the controller runs its sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferConfig {
    pub direction: Direction,

    /// Gap length in bit-cells.
    pub gap_bit_cells: u32,

    pub gap_policy: GapPolicy,
    pub bit_order: BitOrder,

    /// CRC seed, or `None` to leave the engine's accumulator off.
    pub crc_seed: Option<u16>,

    /// End the session after this many bytes.  `None` runs until the RAM
    /// Adapter stops the motor.
    pub session_limit: Option<u32>,
}

impl TransferConfig {
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            direction: self.direction,
            gap_ticks: self.gap_bit_cells.saturating_mul(TICKS_PER_BIT_CELL),
            gap_policy: self.gap_policy,
            bit_order: self.bit_order,
            crc_seed: self.crc_seed,
        }
    }
}

impl Default for TransferConfig {
    fn default() -> Self {
        config::emit()
    }
}

/// Session presets.
pub mod config {
    use super::TransferConfig;
    use crate::constants::{CRC_SEED_REFERENCE, DEFAULT_GAP_BIT_CELLS, FDS_SIDE_LEN};
    use crate::types::{BitOrder, Direction, GapPolicy};

    /// Serve a disk side to the RAM Adapter, one side per session.
    pub fn emit() -> TransferConfig {
        TransferConfig {
            direction: Direction::Emit,
            gap_bit_cells: DEFAULT_GAP_BIT_CELLS,
            gap_policy: GapPolicy::Countdown,
            bit_order: BitOrder::LsbFirst,
            crc_seed: Some(CRC_SEED_REFERENCE),
            session_limit: Some(FDS_SIDE_LEN),
        }
    }

    /// Record what the RAM Adapter writes, starting at the first block
    /// mark after the gap.
    pub fn capture() -> TransferConfig {
        TransferConfig {
            direction: Direction::Capture,
            gap_bit_cells: DEFAULT_GAP_BIT_CELLS,
            gap_policy: GapPolicy::CountdownThenMark,
            bit_order: BitOrder::LsbFirst,
            crc_seed: Some(CRC_SEED_REFERENCE),
            session_limit: None,
        }
    }
}

/// Returned from every tick.  `Busy` tells the caller a session is running
/// and it should keep other work in the loop short.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TickStatus {
    Idle,
    Busy,
}

/// The session currently armed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferSession {
    pub side: DiskSide,
    pub direction: Direction,
    pub limit: Option<u32>,
}

/// A snapshot for the status display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TransferStatus {
    pub engine: EngineStatus,
    pub handshake: HandshakeState,
    pub session: Option<TransferSession>,
    pub side: DiskSide,
    pub sessions_started: u32,
    pub sessions_completed: u32,
    pub storage_errors: u32,
    pub last_error: Option<StorageError>,
}

pub struct TransferController<'a, P: SignalPort, S: BlockStore, const N: usize> {
    lines: HandshakeLines<P>,
    engine: &'a BitClockEngine<N>,
    store: S,
    config: TransferConfig,

    session: Option<TransferSession>,
    side: DiskSide,
    scratch: [u8; N],

    sessions_started: u32,
    sessions_completed: u32,
    storage_errors: u32,
    last_error: Option<StorageError>,
    logged_underruns: u32,
}

impl<'a, P: SignalPort, S: BlockStore, const N: usize> TransferController<'a, P, S, N> {
    /// Takes ownership of the handshake port and the store.  Starts with
    /// writable media inserted and the motor off.
    pub fn new(port: P, engine: &'a BitClockEngine<N>, store: S, config: TransferConfig) -> Self {
        engine.disarm();
        let mut controller = Self {
            lines: HandshakeLines::new(port),
            engine,
            store,
            config,
            session: None,
            side: DiskSide::A,
            scratch: [0; N],
            sessions_started: 0,
            sessions_completed: 0,
            storage_errors: 0,
            last_error: None,
            logged_underruns: 0,
        };
        controller.insert_media(true);
        controller
    }

    /// One main loop iteration.
    pub fn tick(&mut self) -> TickStatus {
        self.lines.poll_inputs();
        self.update_ready();

        self.service_requests();
        self.log_underruns();

        let state = self.lines.state();
        if let Some(session) = self.session {
            if state.stop_motor() {
                info!("Stop motor, ending session at {}", self.engine.position());
                self.end_session(false);
                return TickStatus::Idle;
            }

            if session
                .limit
                .is_some_and(|limit| self.engine.position() >= limit)
            {
                info!("Side {} complete", session.side.0);
                self.end_session(true);
                return TickStatus::Idle;
            }

            return TickStatus::Busy;
        }

        if !state.stop_motor() && state.scan_media() && state.media_set() {
            self.start_session();
            return TickStatus::Busy;
        }

        TickStatus::Idle
    }

    /// Present a disk to the RAM Adapter.  A writable disk raises
    /// read/write-media alongside media-set, as a real drive does.
    pub fn insert_media(&mut self, writable: bool) {
        debug!("Insert media, writable {}", writable);
        self.lines.set_signal(OutputSignal::MediaSet, true);
        self.lines.set_signal(OutputSignal::RwMedia, writable);
    }

    /// Remove the disk, ending any session.
    pub fn eject_media(&mut self) {
        debug!("Eject media");
        if self.session.is_some() {
            self.end_session(false);
        }
        self.lines.set_signal(OutputSignal::MediaSet, false);
        self.lines.set_signal(OutputSignal::RwMedia, false);
    }

    /// Choose the side the next session serves or records.  A running
    /// session is unaffected.
    pub fn select_side(&mut self, side: DiskSide) {
        debug!("Select side {}", side.0);
        self.side = side;
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn status(&self) -> TransferStatus {
        TransferStatus {
            engine: self.engine.status(),
            handshake: self.lines.state(),
            session: self.session,
            side: self.side,
            sessions_started: self.sessions_started,
            sessions_completed: self.sessions_completed,
            storage_errors: self.storage_errors,
            last_error: self.last_error,
        }
    }

    pub fn lines(&self) -> &HandshakeLines<P> {
        &self.lines
    }

    // Tests only, so the mock port's inputs can be driven.  Outputs must
    // only ever change through the controller.
    #[cfg(test)]
    pub(crate) fn lines_mut(&mut self) -> &mut HandshakeLines<P> {
        &mut self.lines
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    // Ready follows scan-media, but only once the motor is up.
    fn update_ready(&mut self) {
        let state = self.lines.state();
        self.lines
            .set_signal(OutputSignal::Ready, state.scan_media() && state.motor_on());
    }

    fn start_session(&mut self) {
        let direction = self.config.direction;
        info!("Starting {} session, side {}", direction, self.side.0);

        if let Err(e) = self.store.begin(self.side, direction) {
            self.record_error(e);
        }

        // Engine is disarmed, so the buffer can be reset, and an emit
        // session's first two blocks loaded before it can see them.
        self.engine.buffer().reset();
        self.logged_underruns = 0;
        if direction == Direction::Emit {
            for id in BufferId::ALL {
                self.fill_buffer(id);
            }
        }

        self.lines.set_signal(OutputSignal::MotorOn, true);
        self.engine.arm(&self.config.engine_config());
        self.session = Some(TransferSession {
            side: self.side,
            direction,
            limit: self.config.session_limit,
        });
        self.sessions_started = self.sessions_started.wrapping_add(1);
    }

    fn end_session(&mut self, completed: bool) {
        self.engine.disarm();

        if self.config.direction == Direction::Capture {
            // Anything posted since the top of this tick, then whatever made
            // it into the active buffer.  The partial byte is gone.
            self.service_requests();
            let buffer = self.engine.buffer();
            let (active, cursor) = (buffer.active(), buffer.cursor());
            if cursor > 0 {
                self.drain_buffer(active, cursor);
            }
        }

        self.lines.set_signal(OutputSignal::MotorOn, false);
        self.update_ready();
        self.session = None;
        if completed {
            self.sessions_completed = self.sessions_completed.wrapping_add(1);
        }
    }

    fn service_requests(&mut self) {
        while let Some(id) = self.engine.buffer().consume_refill_request() {
            match self.config.direction {
                Direction::Emit => self.fill_buffer(id),
                Direction::Capture => self.drain_buffer(id, N),
            }
        }
    }

    // On failure the buffer keeps its old contents.  Running out of side is
    // not a failure - the store has zero filled the block.
    fn fill_buffer(&mut self, id: BufferId) {
        match self.store.fill(id, &mut self.scratch) {
            Ok(()) => (),
            Err(StorageError::EndOfMedia) => trace!("End of media, buffer {}", id),
            Err(e) => {
                self.record_error(e);
                return;
            }
        }
        self.engine.buffer().fill(id, &self.scratch);
    }

    fn drain_buffer(&mut self, id: BufferId, len: usize) {
        let len = self.engine.buffer().copy_out(id, &mut self.scratch[..len]);
        if let Err(e) = self.store.drain(id, &self.scratch[..len]) {
            self.record_error(e);
        }
    }

    fn record_error(&mut self, error: StorageError) {
        warn!("Storage error {}", error);
        self.storage_errors = self.storage_errors.wrapping_add(1);
        self.last_error = Some(error);
    }

    fn log_underruns(&mut self) {
        let underruns = self.engine.buffer().underruns();
        if underruns != self.logged_underruns {
            warn!("Buffer underruns: {}", underruns);
            self.logged_underruns = underruns;
        }
    }
}
