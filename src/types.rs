//! Radio parameters, channel configuration and the packet structures exchanged
//! with callers of the HAL.

use crate::error::{HalError, Result};

/* radio parameters */
pub const LGW_RX_CHANNEL_NB_MAX: usize = 3;
pub const LGW_TX_CHANNEL_NB_MAX: usize = 1;

/* modulation parameters */
pub const STD_LORA_PREAMBLE: u16 = 8;
pub const MIN_LORA_PREAMBLE: u16 = 8;

pub const TX_POWER_MIN: i8 = -18;
pub const TX_POWER_MAX: i8 = 13;
pub const TX_POWER_DEFAULT: i8 = 10;

pub const LORA_SYNC_WORD_PUBLIC: u8 = 0x21;
pub const LORA_SYNC_WORD_PRIVATE: u8 = 0x12;

pub const MAX_PAYLOAD_SIZE: usize = 255;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bandwidth {
    Bw200kHz,
    Bw400kHz,
    Bw800kHz,
    Bw1600kHz,
}

impl Bandwidth {
    pub fn code(self) -> u8 {
        match self {
            Bandwidth::Bw200kHz => 8,
            Bandwidth::Bw400kHz => 10,
            Bandwidth::Bw800kHz => 12,
            Bandwidth::Bw1600kHz => 13,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            8 => Some(Bandwidth::Bw200kHz),
            10 => Some(Bandwidth::Bw400kHz),
            12 => Some(Bandwidth::Bw800kHz),
            13 => Some(Bandwidth::Bw1600kHz),
            _ => None,
        }
    }

    /// Nominal bandwidth.
    pub fn khz(self) -> u16 {
        match self {
            Bandwidth::Bw200kHz => 200,
            Bandwidth::Bw400kHz => 400,
            Bandwidth::Bw800kHz => 800,
            Bandwidth::Bw1600kHz => 1600,
        }
    }

    /// Occupied bandwidth, as used by the airtime model.
    pub fn occupied_khz(self) -> u16 {
        match self {
            Bandwidth::Bw200kHz => 203,
            Bandwidth::Bw400kHz => 406,
            Bandwidth::Bw800kHz => 812,
            Bandwidth::Bw1600kHz => 1625,
        }
    }

    /// Accepts either the nominal or the occupied value.
    pub fn from_khz(khz: u32) -> Option<Self> {
        match khz {
            200 | 203 => Some(Bandwidth::Bw200kHz),
            400 | 406 => Some(Bandwidth::Bw400kHz),
            800 | 812 => Some(Bandwidth::Bw800kHz),
            1600 | 1625 => Some(Bandwidth::Bw1600kHz),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpreadingFactor {
    Sf5,
    Sf6,
    Sf7,
    Sf8,
    Sf9,
    Sf10,
    Sf11,
    Sf12,
}

impl SpreadingFactor {
    pub const ALL: [SpreadingFactor; 8] = [
        SpreadingFactor::Sf5,
        SpreadingFactor::Sf6,
        SpreadingFactor::Sf7,
        SpreadingFactor::Sf8,
        SpreadingFactor::Sf9,
        SpreadingFactor::Sf10,
        SpreadingFactor::Sf11,
        SpreadingFactor::Sf12,
    ];

    pub fn value(self) -> u8 {
        match self {
            SpreadingFactor::Sf5 => 5,
            SpreadingFactor::Sf6 => 6,
            SpreadingFactor::Sf7 => 7,
            SpreadingFactor::Sf8 => 8,
            SpreadingFactor::Sf9 => 9,
            SpreadingFactor::Sf10 => 10,
            SpreadingFactor::Sf11 => 11,
            SpreadingFactor::Sf12 => 12,
        }
    }

    pub fn from_value(sf: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.value() == sf)
    }
}

/// LoRa forward error correction rate. The `Li*` variants use long interleaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodingRate {
    Cr4_5,
    Cr4_6,
    Cr4_7,
    Cr4_8,
    Li4_5,
    Li4_6,
    Li4_8,
}

impl CodingRate {
    pub const ALL: [CodingRate; 7] = [
        CodingRate::Cr4_5,
        CodingRate::Cr4_6,
        CodingRate::Cr4_7,
        CodingRate::Cr4_8,
        CodingRate::Li4_5,
        CodingRate::Li4_6,
        CodingRate::Li4_8,
    ];

    pub fn code(self) -> u8 {
        match self {
            CodingRate::Cr4_5 => 1,
            CodingRate::Cr4_6 => 2,
            CodingRate::Cr4_7 => 3,
            CodingRate::Cr4_8 => 4,
            CodingRate::Li4_5 => 5,
            CodingRate::Li4_6 => 6,
            CodingRate::Li4_8 => 7,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.code() == code)
    }

    /// Value carried by prepare-tx (0..=6).
    pub fn wire(self) -> u8 {
        self.code() - 1
    }

    pub fn from_wire(wire: u8) -> Option<Self> {
        Self::from_code(wire.checked_add(1)?)
    }

    pub fn is_long_interleaved(self) -> bool {
        self.code() > 4
    }
}

/// On what event a TX is triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMode {
    Timestamped,
    Immediate,
    OnGps,
    CwOn,
    CwOff,
}

impl TxMode {
    pub fn code(self) -> u8 {
        match self {
            TxMode::Timestamped => 0,
            TxMode::Immediate => 1,
            TxMode::OnGps => 2,
            TxMode::CwOn => 3,
            TxMode::CwOff => 4,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(TxMode::Timestamped),
            1 => Some(TxMode::Immediate),
            2 => Some(TxMode::OnGps),
            3 => Some(TxMode::CwOn),
            4 => Some(TxMode::CwOff),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Modulation {
    #[default]
    LoRa,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CrcStatus {
    #[default]
    Undefined,
    NoCrc,
    CrcBad,
    CrcOk,
}

/// Board specificities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardConfig {
    /// TTY device the concentrator board is attached to.
    pub tty_path: String,
}

impl Default for BoardConfig {
    fn default() -> Self {
        Self {
            tty_path: "/dev/ttyACM0".into(),
        }
    }
}

/// Configuration of one receive radio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RxChannelConfig {
    pub enable: bool,
    pub freq_hz: u32,
    pub bandwidth: Bandwidth,
    pub datarate: SpreadingFactor,
    /// Added to the raw RSSI of every packet received on this channel.
    pub rssi_offset: f32,
    pub sync_word: u8,
}

impl Default for RxChannelConfig {
    fn default() -> Self {
        Self {
            enable: false,
            freq_hz: 0,
            bandwidth: Bandwidth::Bw800kHz,
            datarate: SpreadingFactor::Sf12,
            rssi_offset: 0.0,
            sync_word: LORA_SYNC_WORD_PUBLIC,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxChannelConfig {
    pub enable: bool,
}

/// A packet to send, with its modulation and trigger parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct TxPacket {
    pub freq_hz: u32,
    pub tx_mode: TxMode,
    /// Timestamp or delay in microseconds for the TX trigger.
    pub count_us: u32,
    /// TX power, in dBm.
    pub rf_power: i8,
    pub bandwidth: Bandwidth,
    pub datarate: SpreadingFactor,
    pub coderate: CodingRate,
    /// Invert signal polarity, for orthogonal downlinks.
    pub invert_pol: bool,
    pub preamble: u16,
    pub no_crc: bool,
    /// Implicit header mode.
    pub no_header: bool,
    pub payload: Vec<u8>,
}

impl Default for TxPacket {
    fn default() -> Self {
        Self {
            freq_hz: 0,
            tx_mode: TxMode::Immediate,
            count_us: 0,
            rf_power: TX_POWER_DEFAULT,
            bandwidth: Bandwidth::Bw800kHz,
            datarate: SpreadingFactor::Sf12,
            coderate: CodingRate::Li4_8,
            invert_pol: false,
            preamble: STD_LORA_PREAMBLE,
            no_crc: false,
            no_header: false,
            payload: Vec::new(),
        }
    }
}

impl TxPacket {
    pub fn size(&self) -> usize {
        self.payload.len()
    }

    /// Checks what the firmware cannot represent, before any I/O.
    pub fn validate(&self) -> Result<()> {
        if self.payload.len() > MAX_PAYLOAD_SIZE {
            return Err(HalError::invalid(format!(
                "payload of {} bytes exceeds {} bytes",
                self.payload.len(),
                MAX_PAYLOAD_SIZE
            )));
        }
        if !(TX_POWER_MIN..=TX_POWER_MAX).contains(&self.rf_power) {
            return Err(HalError::invalid(format!(
                "RF power {} dBm outside [{}..{}]",
                self.rf_power, TX_POWER_MIN, TX_POWER_MAX
            )));
        }
        Ok(())
    }
}

/// A received packet with its metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct RxPacket {
    /// Center frequency of the channel the packet was received on.
    pub freq_hz: u32,
    /// Radio index the packet was received on.
    pub channel: u8,
    pub status: CrcStatus,
    /// Internal concentrator counter, 1 microsecond resolution, wraps.
    pub count_us: u32,
    /// Frequency error in Hz.
    pub foff_hz: i32,
    pub modulation: Modulation,
    pub bandwidth: Bandwidth,
    pub datarate: SpreadingFactor,
    pub coderate: CodingRate,
    /// Average packet RSSI in dB, channel offset applied.
    pub rssi: f32,
    pub snr: f32,
    pub payload: Vec<u8>,
}

impl Default for RxPacket {
    fn default() -> Self {
        Self {
            freq_hz: 0,
            channel: 0,
            status: CrcStatus::Undefined,
            count_us: 0,
            foff_hz: 0,
            modulation: Modulation::LoRa,
            bandwidth: Bandwidth::Bw800kHz,
            datarate: SpreadingFactor::Sf12,
            coderate: CodingRate::Li4_8,
            rssi: 0.0,
            snr: 0.0,
            payload: Vec::new(),
        }
    }
}

impl RxPacket {
    pub fn size(&self) -> usize {
        self.payload.len()
    }
}
