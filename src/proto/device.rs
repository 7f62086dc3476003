//! The firmware's side of the payload contract: decode what the host sends,
//! encode what the MCU answers. Used to script an emulated MCU.

use crate::error::ProtocolError;
use crate::proto::Fields;
use crate::proto::codec::*;
use crate::proto::command::{ResetType, TxMsgStatus};
use crate::types::{Bandwidth, CodingRate, SpreadingFactor, TxMode, TxPacket};

/// A config-rx request as the MCU sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigRxRequest {
    pub radio: u8,
    pub freq_hz: u32,
    pub preamble: u16,
    pub datarate: SpreadingFactor,
    pub bandwidth: Bandwidth,
    pub iq_inverted: bool,
    pub sync_word: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterAccess {
    pub radio: u8,
    pub addr: u16,
    /// `None` for a read.
    pub value: Option<u8>,
}

fn malformed(what: &str, raw: u8) -> ProtocolError {
    ProtocolError::Malformed(format!("{what} 0x{raw:02X}"))
}

pub fn decode_config_rx(payload: &[u8]) -> Result<ConfigRxRequest, ProtocolError> {
    let f = Fields::new(payload);
    let sf = f.u8("datarate", 7)?;
    let bw = f.u8("bandwidth", 8)?;
    Ok(ConfigRxRequest {
        radio: f.u8("radio", 0)?,
        freq_hz: f.u32("freq", 1)?,
        preamble: f.u16("preamble", 5)?,
        datarate: SpreadingFactor::from_value(sf).ok_or_else(|| malformed("datarate", sf))?,
        bandwidth: Bandwidth::from_code(bw).ok_or_else(|| malformed("bandwidth", bw))?,
        iq_inverted: f.flag("iq", 9)?,
        sync_word: f.u8("sync_word", 10)?,
    })
}

/// Returns the packet and the ramp-up code it was sent with.
pub fn decode_prepare_tx(payload: &[u8]) -> Result<(TxPacket, u8), ProtocolError> {
    let f = Fields::new(payload);
    let mode = f.u8("tx_mode", TX_MODE)?;
    let bw = f.u8("bandwidth", TX_BW)?;
    let sf = f.u8("datarate", TX_SF)?;
    let cr = f.u8("coderate", TX_CR)?;
    let len = f.u8("length", TX_LEN)? as usize;
    let pkt = TxPacket {
        freq_hz: f.u32("freq", TX_FREQ)?,
        tx_mode: TxMode::from_code(mode).ok_or_else(|| malformed("tx mode", mode))?,
        count_us: f.u32("timestamp", TX_TIMESTAMP)?,
        rf_power: f.i8("power", TX_POWER)?,
        bandwidth: Bandwidth::from_code(bw).ok_or_else(|| malformed("bandwidth", bw))?,
        datarate: SpreadingFactor::from_value(sf).ok_or_else(|| malformed("datarate", sf))?,
        coderate: CodingRate::from_wire(cr).ok_or_else(|| malformed("coderate", cr))?,
        invert_pol: f.flag("polarity", TX_POL)?,
        preamble: f.u16("preamble", TX_PREAMBLE)?,
        no_crc: !f.flag("crc", TX_CRC)?,
        no_header: f.flag("implicit_header", TX_IMPLICIT)?,
        payload: f.bytes("payload", TX_PAYLOAD, len)?.to_vec(),
    };
    Ok((pkt, f.u8("ramp", TX_RAMP)?))
}

pub fn decode_reset(payload: &[u8]) -> Result<ResetType, ProtocolError> {
    let raw = Fields::new(payload).u8("reset_type", 0)?;
    ResetType::from_code(raw).ok_or_else(|| malformed("reset type", raw))
}

/// Three bytes for a read, four for a write.
pub fn decode_register_access(payload: &[u8]) -> Result<RegisterAccess, ProtocolError> {
    let f = Fields::new(payload);
    Ok(RegisterAccess {
        radio: f.u8("radio", 0)?,
        addr: f.u16("addr", 1)?,
        value: payload.get(3).copied(),
    })
}

pub fn encode_ack_ping(info: &PingInfo) -> [u8; PING_SIZE] {
    let mut out = [0u8; PING_SIZE];
    out[PING_UID_HIGH..PING_UID_HIGH + 4].copy_from_slice(&info.unique_id.high.to_be_bytes());
    out[PING_UID_MID..PING_UID_MID + 4].copy_from_slice(&info.unique_id.mid.to_be_bytes());
    out[PING_UID_LOW..PING_UID_LOW + 4].copy_from_slice(&info.unique_id.low.to_be_bytes());
    // keep at least one NUL terminator
    let version = info.version.as_bytes();
    let n = version.len().min(PING_VERSION_LEN - 1);
    out[PING_VERSION..PING_VERSION + n].copy_from_slice(&version[..n]);
    out[PING_NB_TX] = info.nb_radio_tx;
    out[PING_NB_RX] = info.nb_radio_rx;
    out
}

pub fn encode_ack_get_status(status: &Status) -> Vec<u8> {
    let mut out = Vec::with_capacity(STATUS_CRC + status.rx_crc.len() * STATUS_CRC_STRIDE);
    out.extend_from_slice(&status.system_time_ms.to_be_bytes());
    out.extend_from_slice(&status.precise_time_us.to_be_bytes());
    out.push(status.pps_status.code());
    out.extend_from_slice(&status.pps_time_us.to_be_bytes());
    let centi = (status.temperature * 100.0).round() as i16;
    out.extend_from_slice(&centi.to_be_bytes());
    for c in &status.rx_crc {
        out.extend_from_slice(&c.ok.to_be_bytes());
        out.extend_from_slice(&c.err.to_be_bytes());
    }
    out
}

pub fn encode_ack_get_rx_msg(info: &RxMsgInfo) -> [u8; RX_MSG_SIZE] {
    let [b0, b1] = info.nb_bytes.to_be_bytes();
    [info.nb_msg, b0, b1, info.pending, info.lost]
}

pub fn encode_evt_msg_received(msg: &ReceivedMessage) -> Vec<u8> {
    let len = msg.payload.len().min(u8::MAX as usize);
    let mut out = Vec::with_capacity(EVT_PAYLOAD + len);
    out.push(msg.radio);
    out.extend_from_slice(&msg.count_us.to_be_bytes());
    out.extend_from_slice(&msg.foff_hz.to_be_bytes());
    out.push(msg.snr as u8);
    out.push(msg.rssi as u8);
    out.push(len as u8);
    out.extend_from_slice(&msg.payload[..len]);
    out
}

pub fn encode_ack_status(code: u8) -> [u8; 1] {
    [code]
}

pub fn encode_ack_tx_status(status: TxMsgStatus) -> [u8; 1] {
    [status.code()]
}

pub fn encode_ack_read_register(value: u8) -> [u8; 1] {
    [value]
}
