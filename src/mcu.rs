//! Request/acknowledgment engine for the concentrator MCU.
//!
//! One request is outstanding at a time: every operation writes a request,
//! then reads and checks the single acknowledgment the firmware owes it.

use std::io::{Read, Write};
use std::thread;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, trace, warn};

use crate::error::{HalError, Result};
use crate::frame::{self, Frame, READ_SIZE_MAX};
use crate::proto::codec::{self, PingInfo, ReceivedMessage, RxMsgInfo, Status};
use crate::proto::command::{Request, ResetType, STATUS_OK, TxMsgStatus};
use crate::types::{RxChannelConfig, TxPacket};

/// Delays the engine waits on the firmware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// After each reset acknowledgment.
    pub reset_settle: Duration,
    /// Between TX status polls in blocking send.
    pub tx_poll: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            reset_settle: Duration::from_millis(500),
            tx_poll: Duration::from_millis(10),
        }
    }
}

impl Timing {
    /// No waiting at all, for emulated links.
    pub fn immediate() -> Self {
        Self {
            reset_settle: Duration::ZERO,
            tx_poll: Duration::ZERO,
        }
    }
}

fn pause(d: Duration) {
    if !d.is_zero() {
        thread::sleep(d);
    }
}

pub struct Mcu<T> {
    port: T,
    rng: StdRng,
    buf: [u8; READ_SIZE_MAX],
    nb_radio_rx: u8,
    nb_radio_tx: u8,
    timing: Timing,
}

impl<T: Read + Write> Mcu<T> {
    pub fn new(port: T) -> Self {
        Self::with_timing(port, Timing::default())
    }

    pub fn with_timing(port: T, timing: Timing) -> Self {
        Self {
            port,
            // request ids are informational, a fixed sequence is fine
            rng: StdRng::seed_from_u64(0),
            buf: [0; READ_SIZE_MAX],
            nb_radio_rx: 0,
            nb_radio_tx: 0,
            timing,
        }
    }

    pub fn into_inner(self) -> T {
        self.port
    }

    /// As reported by the last ping; 0 before any.
    pub fn nb_radio_rx(&self) -> u8 {
        self.nb_radio_rx
    }

    pub fn nb_radio_tx(&self) -> u8 {
        self.nb_radio_tx
    }

    fn transact(&mut self, request: Request, payload: &[u8]) -> Result<Frame<'_>> {
        let id = self.rng.gen_range(0..255);
        frame::write_request(&mut self.port, id, request, payload)?;
        let reply = frame::read_reply(&mut self.port, &mut self.buf)?;
        trace!(?request, ack = ?reply.ack_type(), "transaction done");
        Ok(reply)
    }

    /// Send a request whose acknowledgment is a single status byte.
    fn command(&mut self, request: Request, payload: &[u8]) -> Result<()> {
        let reply = self.transact(request, payload)?;
        let code = codec::decode_ack_status(&reply, request)?;
        if code != STATUS_OK {
            return Err(HalError::Rejected { request, code });
        }
        Ok(())
    }

    pub fn ping(&mut self) -> Result<PingInfo> {
        let reply = self.transact(Request::Ping, &[])?;
        let info = codec::decode_ack_ping(&reply)?;
        self.nb_radio_rx = info.nb_radio_rx;
        self.nb_radio_tx = info.nb_radio_tx;
        debug!(
            version = %info.version,
            nb_radio_rx = info.nb_radio_rx,
            nb_radio_tx = info.nb_radio_tx,
            "ping"
        );
        Ok(info)
    }

    pub fn get_status(&mut self) -> Result<Status> {
        let nb_radio_rx = self.nb_radio_rx;
        let reply = self.transact(Request::GetStatus, &[])?;
        Ok(codec::decode_ack_get_status(&reply, nb_radio_rx)?)
    }

    pub fn get_tx_status(&mut self) -> Result<TxMsgStatus> {
        let reply = self.transact(Request::GetTxStatus, &[])?;
        Ok(codec::decode_ack_tx_status(&reply)?)
    }

    pub fn config_rx(&mut self, radio: u8, conf: &RxChannelConfig) -> Result<()> {
        if radio >= self.nb_radio_rx {
            return Err(HalError::invalid(format!(
                "radio index {} not supported by the MCU ({} RX radios)",
                radio, self.nb_radio_rx
            )));
        }
        self.command(Request::ConfigRx, &codec::encode_config_rx(radio, conf))
    }

    /// Queue a packet for transmission and return as soon as the MCU accepted it.
    pub fn prepare_tx(&mut self, pkt: &TxPacket) -> Result<()> {
        pkt.validate()?;
        if self.nb_radio_rx < 1 {
            return Err(HalError::invalid("no radio available for TX"));
        }
        self.command(Request::PrepareTx, &codec::encode_prepare_tx(pkt))
    }

    /// Like [`Mcu::prepare_tx`], then poll until the TX radio reaches a
    /// terminal state.
    pub fn prepare_tx_blocking(&mut self, pkt: &TxPacket) -> Result<TxMsgStatus> {
        self.prepare_tx(pkt)?;
        loop {
            let status = self.get_tx_status()?;
            if status.is_terminal() {
                debug!(?status, "TX finished");
                return Ok(status);
            }
            pause(self.timing.tx_poll);
        }
    }

    pub fn get_rx_msg(&mut self) -> Result<RxMsgInfo> {
        let reply = self.transact(Request::GetRxMsg, &[])?;
        Ok(codec::decode_ack_get_rx_msg(&reply)?)
    }

    fn read_event(&mut self) -> Result<Frame<'_>> {
        Ok(frame::read_reply(&mut self.port, &mut self.buf)?)
    }

    /// Fetch every message the MCU has buffered. All announced events are read
    /// off the link; only the first `max_count` are decoded and returned.
    pub fn receive(&mut self, max_count: usize) -> Result<Vec<ReceivedMessage>> {
        let info = self.get_rx_msg()?;
        if info.lost > 0 {
            warn!(lost = info.lost, "MCU lost messages before they were fetched");
        }
        let mut msgs = Vec::with_capacity(max_count.min(info.nb_msg as usize));
        for i in 0..info.nb_msg as usize {
            let event = self.read_event()?;
            if i >= max_count {
                warn!(index = i, max_count, "dropping received packet, output full");
                continue;
            }
            msgs.push(codec::decode_evt_msg_received(&event)?);
        }
        if info.pending > 0 {
            info!(pending = info.pending, "more messages pending on the MCU");
        }
        Ok(msgs)
    }

    pub fn reset(&mut self, kind: ResetType) -> Result<()> {
        self.command(Request::Reset, &codec::encode_reset(kind))?;
        debug!(?kind, "reset done");
        pause(self.timing.reset_settle);
        Ok(())
    }

    /// The MCU stops answering on this link afterwards.
    pub fn enter_bootloader(&mut self) -> Result<()> {
        let reply = self.transact(Request::BootloaderMode, &[])?;
        codec::expect_ack(&reply, Request::BootloaderMode)?;
        Ok(())
    }

    pub fn read_register(&mut self, radio: u8, addr: u16) -> Result<u8> {
        let reply = self.transact(Request::ReadRegs, &codec::encode_read_register(radio, addr))?;
        Ok(codec::decode_ack_read_register(&reply)?)
    }

    pub fn write_register(&mut self, radio: u8, addr: u16, value: u8) -> Result<()> {
        self.command(
            Request::WriteRegs,
            &codec::encode_write_register(radio, addr, value),
        )
    }
}
