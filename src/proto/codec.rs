//! Host-side payload translators: typed values in, request payloads out, and
//! acknowledgment/event payloads back into typed values.
//!
//! All multi-byte fields are big-endian. Offsets are relative to the first
//! payload byte (i.e. after the 4-byte frame header).

use crate::error::ProtocolError;
use crate::frame::Frame;
use crate::proto::Fields;
use crate::proto::command::{
    AckType, PpsStatus, RADIO_RAMP_20_US, Request, ResetType, TxMsgStatus,
};
use crate::types::{RxChannelConfig, STD_LORA_PREAMBLE, TxPacket};

// ack-ping
pub(crate) const PING_UID_HIGH: usize = 0;
pub(crate) const PING_UID_MID: usize = 4;
pub(crate) const PING_UID_LOW: usize = 8;
pub(crate) const PING_VERSION: usize = 12;
pub(crate) const PING_VERSION_LEN: usize = 10;
pub(crate) const PING_NB_TX: usize = 22;
pub(crate) const PING_NB_RX: usize = 23;
pub(crate) const PING_SIZE: usize = 24;

// ack-get-status
pub(crate) const STATUS_SYS_TIME: usize = 0;
pub(crate) const STATUS_PRECISE_TIME: usize = 4;
pub(crate) const STATUS_PPS: usize = 8;
pub(crate) const STATUS_PPS_TIME: usize = 9;
pub(crate) const STATUS_TEMPERATURE: usize = 13;
pub(crate) const STATUS_CRC: usize = 15;
pub(crate) const STATUS_CRC_STRIDE: usize = 4;

// ack-get-rx-msg
pub(crate) const RX_MSG_NB: usize = 0;
pub(crate) const RX_MSG_NB_BYTES: usize = 1;
pub(crate) const RX_MSG_PENDING: usize = 3;
pub(crate) const RX_MSG_LOST: usize = 4;
pub(crate) const RX_MSG_SIZE: usize = 5;

// evt-msg-received
pub(crate) const EVT_RADIO: usize = 0;
pub(crate) const EVT_TIMESTAMP: usize = 1;
pub(crate) const EVT_FOFF: usize = 5;
pub(crate) const EVT_SNR: usize = 9;
pub(crate) const EVT_RSSI: usize = 10;
pub(crate) const EVT_LEN: usize = 11;
pub(crate) const EVT_PAYLOAD: usize = 12;

// req config-rx
pub(crate) const CONFIG_RX_SIZE: usize = 11;

// req prepare-tx
pub(crate) const TX_MODE: usize = 0;
pub(crate) const TX_TIMESTAMP: usize = 1;
pub(crate) const TX_POWER: usize = 5;
pub(crate) const TX_FREQ: usize = 6;
pub(crate) const TX_BW: usize = 10;
pub(crate) const TX_SF: usize = 11;
pub(crate) const TX_POL: usize = 12;
pub(crate) const TX_CR: usize = 13;
pub(crate) const TX_IMPLICIT: usize = 14;
pub(crate) const TX_CRC: usize = 15;
pub(crate) const TX_RAMP: usize = 16;
pub(crate) const TX_PREAMBLE: usize = 17;
pub(crate) const TX_LEN: usize = 19;
pub(crate) const TX_PAYLOAD: usize = 20;

/// 96-bit chip identifier reported by ping, as three 32-bit words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UniqueId {
    pub high: u32,
    pub mid: u32,
    pub low: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PingInfo {
    pub unique_id: UniqueId,
    pub version: String,
    pub nb_radio_tx: u8,
    pub nb_radio_rx: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CrcCounters {
    pub ok: u16,
    pub err: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Status {
    pub system_time_ms: u32,
    pub precise_time_us: u32,
    pub pps_status: PpsStatus,
    pub pps_time_us: u32,
    /// Degrees Celsius.
    pub temperature: f32,
    /// One entry per RX radio.
    pub rx_crc: Vec<CrcCounters>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RxMsgInfo {
    pub nb_msg: u8,
    pub nb_bytes: u16,
    /// Messages still buffered on the MCU after this batch.
    pub pending: u8,
    pub lost: u8,
}

/// Raw content of a msg-received event, before channel enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    pub radio: u8,
    pub count_us: u32,
    pub foff_hz: i32,
    /// dB
    pub snr: i8,
    /// dBm, before the channel RSSI offset is applied
    pub rssi: i8,
    pub payload: Vec<u8>,
}

/// Check that `frame` is the acknowledgment `request` expects.
pub fn expect_ack(frame: &Frame<'_>, request: Request) -> Result<(), ProtocolError> {
    let expected = request.expected_ack();
    let got = frame.ack_type();
    if got != expected {
        return Err(ProtocolError::UnexpectedAck {
            request,
            expected,
            got,
        });
    }
    Ok(())
}

// ---- Requests

pub fn encode_config_rx(radio: u8, conf: &RxChannelConfig) -> [u8; CONFIG_RX_SIZE] {
    let [f0, f1, f2, f3] = conf.freq_hz.to_be_bytes();
    let [p0, p1] = STD_LORA_PREAMBLE.to_be_bytes();
    [
        radio,
        f0,
        f1,
        f2,
        f3,
        p0,
        p1,
        conf.datarate.value(),
        conf.bandwidth.code(),
        0, // IQ never inverted on RX
        conf.sync_word,
    ]
}

/// The caller is expected to have validated the packet; the length byte is
/// clamped to what the payload actually carries.
pub fn encode_prepare_tx(pkt: &TxPacket) -> Vec<u8> {
    let len = pkt.payload.len().min(u8::MAX as usize);
    let mut out = Vec::with_capacity(TX_PAYLOAD + len);
    out.push(pkt.tx_mode.code());
    out.extend_from_slice(&pkt.count_us.to_be_bytes());
    out.push(pkt.rf_power as u8);
    out.extend_from_slice(&pkt.freq_hz.to_be_bytes());
    out.push(pkt.bandwidth.code());
    out.push(pkt.datarate.value());
    out.push(pkt.invert_pol as u8);
    out.push(pkt.coderate.wire());
    out.push(pkt.no_header as u8);
    out.push(!pkt.no_crc as u8);
    out.push(RADIO_RAMP_20_US);
    out.extend_from_slice(&pkt.preamble.to_be_bytes());
    out.push(len as u8);
    out.extend_from_slice(&pkt.payload[..len]);
    out
}

pub fn encode_reset(kind: ResetType) -> [u8; 1] {
    [kind.code()]
}

pub fn encode_read_register(radio: u8, addr: u16) -> [u8; 3] {
    let [hi, lo] = addr.to_be_bytes();
    [radio, hi, lo]
}

pub fn encode_write_register(radio: u8, addr: u16, value: u8) -> [u8; 4] {
    let [hi, lo] = addr.to_be_bytes();
    [radio, hi, lo, value]
}

// ---- Acknowledgments and events

pub fn decode_ack_ping(frame: &Frame<'_>) -> Result<PingInfo, ProtocolError> {
    expect_ack(frame, Request::Ping)?;
    let f = Fields::new(frame.payload);
    let unique_id = UniqueId {
        high: f.u32("uid_high", PING_UID_HIGH)?,
        mid: f.u32("uid_mid", PING_UID_MID)?,
        low: f.u32("uid_low", PING_UID_LOW)?,
    };
    let raw = f.bytes("version", PING_VERSION, PING_VERSION_LEN)?;
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    let version = String::from_utf8_lossy(&raw[..end]).into_owned();
    Ok(PingInfo {
        unique_id,
        version,
        nb_radio_tx: f.u8("nb_radio_tx", PING_NB_TX)?,
        nb_radio_rx: f.u8("nb_radio_rx", PING_NB_RX)?,
    })
}

/// `nb_radio_rx` comes from the ping reply and sizes the CRC counter table.
pub fn decode_ack_get_status(frame: &Frame<'_>, nb_radio_rx: u8) -> Result<Status, ProtocolError> {
    expect_ack(frame, Request::GetStatus)?;
    let f = Fields::new(frame.payload);
    let rx_crc = (0..nb_radio_rx as usize)
        .map(|i| {
            let base = STATUS_CRC + i * STATUS_CRC_STRIDE;
            Ok(CrcCounters {
                ok: f.u16("rx_crc_ok", base)?,
                err: f.u16("rx_crc_err", base + 2)?,
            })
        })
        .collect::<Result<Vec<_>, ProtocolError>>()?;
    Ok(Status {
        system_time_ms: f.u32("system_time", STATUS_SYS_TIME)?,
        precise_time_us: f.u32("precise_time", STATUS_PRECISE_TIME)?,
        pps_status: PpsStatus::from_code(f.u8("pps_status", STATUS_PPS)?),
        pps_time_us: f.u32("pps_time", STATUS_PPS_TIME)?,
        temperature: f.i16("temperature", STATUS_TEMPERATURE)? as f32 / 100.0,
        rx_crc,
    })
}

pub fn decode_ack_get_rx_msg(frame: &Frame<'_>) -> Result<RxMsgInfo, ProtocolError> {
    expect_ack(frame, Request::GetRxMsg)?;
    let f = Fields::new(frame.payload);
    Ok(RxMsgInfo {
        nb_msg: f.u8("nb_msg", RX_MSG_NB)?,
        nb_bytes: f.u16("nb_bytes", RX_MSG_NB_BYTES)?,
        pending: f.u8("pending", RX_MSG_PENDING)?,
        lost: f.u8("lost", RX_MSG_LOST)?,
    })
}

pub fn decode_evt_msg_received(frame: &Frame<'_>) -> Result<ReceivedMessage, ProtocolError> {
    let got = frame.ack_type();
    if got != AckType::MsgReceived {
        return Err(ProtocolError::Malformed(format!(
            "expected a msg-received event, got {got:?}"
        )));
    }
    let f = Fields::new(frame.payload);
    let len = f.u8("length", EVT_LEN)? as usize;
    Ok(ReceivedMessage {
        radio: f.u8("radio", EVT_RADIO)?,
        count_us: f.u32("timestamp", EVT_TIMESTAMP)?,
        foff_hz: f.i32("freq_offset", EVT_FOFF)?,
        snr: f.i8("snr", EVT_SNR)?,
        rssi: f.i8("rssi", EVT_RSSI)?,
        payload: f.bytes("payload", EVT_PAYLOAD, len)?.to_vec(),
    })
}

/// Status byte of config-rx, prepare-tx and reset acknowledgments.
pub fn decode_ack_status(frame: &Frame<'_>, request: Request) -> Result<u8, ProtocolError> {
    expect_ack(frame, request)?;
    Fields::new(frame.payload).u8("status", 0)
}

pub fn decode_ack_tx_status(frame: &Frame<'_>) -> Result<TxMsgStatus, ProtocolError> {
    expect_ack(frame, Request::GetTxStatus)?;
    Ok(TxMsgStatus::from_code(
        Fields::new(frame.payload).u8("tx_status", 0)?,
    ))
}

pub fn decode_ack_read_register(frame: &Frame<'_>) -> Result<u8, ProtocolError> {
    expect_ack(frame, Request::ReadRegs)?;
    Fields::new(frame.payload).u8("register_value", 0)
}
