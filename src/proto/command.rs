/// Requests the host sends to the concentrator MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    // ---- Discovery ----
    Ping,

    // ---- Radio configuration ----
    ConfigRx,
    Reset,
    SetCoefTempRssi,

    // ---- Data plane ----
    PrepareTx,
    GetTxStatus,
    GetRxMsg,
    GetStatus,

    // ---- Maintenance ----
    BootloaderMode,
    ReadRegs,
    WriteRegs,
}

impl Request {
    pub const ALL: [Request; 11] = [
        Request::Ping,
        Request::ConfigRx,
        Request::PrepareTx,
        Request::GetStatus,
        Request::BootloaderMode,
        Request::GetRxMsg,
        Request::GetTxStatus,
        Request::Reset,
        Request::SetCoefTempRssi,
        Request::ReadRegs,
        Request::WriteRegs,
    ];

    pub fn code(self) -> u8 {
        match self {
            Request::Ping => 0x00,
            Request::ConfigRx => 0x01,
            Request::PrepareTx => 0x02,
            Request::GetStatus => 0x03,
            Request::BootloaderMode => 0x04,
            Request::GetRxMsg => 0x05,
            Request::GetTxStatus => 0x06,
            Request::Reset => 0x07,
            Request::SetCoefTempRssi => 0x08,
            Request::ReadRegs => 0x09,
            Request::WriteRegs => 0x0A,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.code() == code)
    }

    /// The single acknowledgment type the firmware answers this request with.
    pub fn expected_ack(self) -> AckType {
        match self {
            Request::Ping => AckType::Ping,
            Request::ConfigRx => AckType::ConfigRx,
            Request::PrepareTx => AckType::PrepareTx,
            Request::GetStatus => AckType::GetStatus,
            Request::BootloaderMode => AckType::BootloaderMode,
            Request::GetRxMsg => AckType::GetRxMsg,
            Request::GetTxStatus => AckType::GetTxStatus,
            Request::Reset => AckType::Reset,
            Request::SetCoefTempRssi => AckType::SetCoefTempRssi,
            Request::ReadRegs => AckType::ReadRegs,
            Request::WriteRegs => AckType::WriteRegs,
        }
    }
}

/// Acknowledgments and unsolicited events coming back from the MCU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckType {
    Ping,
    ConfigRx,
    PrepareTx,
    GetStatus,
    BootloaderMode,
    GetRxMsg,
    GetTxStatus,
    Reset,
    SetCoefTempRssi,
    ReadRegs,
    WriteRegs,
    /// Event pushed after a get-rx-msg ack, one per buffered packet.
    MsgReceived,
    Unrecognized(u8),
}

impl AckType {
    pub fn code(self) -> u8 {
        match self {
            AckType::Ping => 0x40,
            AckType::ConfigRx => 0x41,
            AckType::PrepareTx => 0x42,
            AckType::GetStatus => 0x43,
            AckType::BootloaderMode => 0x44,
            AckType::GetRxMsg => 0x45,
            AckType::GetTxStatus => 0x46,
            AckType::Reset => 0x47,
            AckType::SetCoefTempRssi => 0x48,
            AckType::ReadRegs => 0x49,
            AckType::WriteRegs => 0x4A,
            AckType::MsgReceived => 0x82,
            AckType::Unrecognized(raw) => raw,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0x40 => AckType::Ping,
            0x41 => AckType::ConfigRx,
            0x42 => AckType::PrepareTx,
            0x43 => AckType::GetStatus,
            0x44 => AckType::BootloaderMode,
            0x45 => AckType::GetRxMsg,
            0x46 => AckType::GetTxStatus,
            0x47 => AckType::Reset,
            0x48 => AckType::SetCoefTempRssi,
            0x49 => AckType::ReadRegs,
            0x4A => AckType::WriteRegs,
            0x82 => AckType::MsgReceived,
            raw => AckType::Unrecognized(raw),
        }
    }
}

/// What a reset request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetType {
    /// The MCU itself.
    Gateway,
    RxAll,
    Tx,
}

impl ResetType {
    pub fn code(self) -> u8 {
        match self {
            ResetType::Gateway => 0x00,
            ResetType::RxAll => 0x01,
            ResetType::Tx => 0x02,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0x00 => Some(ResetType::Gateway),
            0x01 => Some(ResetType::RxAll),
            0x02 => Some(ResetType::Tx),
            _ => None,
        }
    }
}

/// Firmware-side state of the TX radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxMsgStatus {
    Idle,
    Loaded,
    OnAir,
    Done,
    ErrorParam,
    ErrorFailToSend,
    ErrorTxTimeout,
    Unrecognized(u8),
}

impl TxMsgStatus {
    pub fn code(self) -> u8 {
        match self {
            TxMsgStatus::Idle => 0x01,
            TxMsgStatus::Loaded => 0x02,
            TxMsgStatus::OnAir => 0x03,
            TxMsgStatus::Done => 0x04,
            TxMsgStatus::ErrorParam => 0x05,
            TxMsgStatus::ErrorFailToSend => 0x06,
            TxMsgStatus::ErrorTxTimeout => 0x07,
            TxMsgStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => TxMsgStatus::Idle,
            0x02 => TxMsgStatus::Loaded,
            0x03 => TxMsgStatus::OnAir,
            0x04 => TxMsgStatus::Done,
            0x05 => TxMsgStatus::ErrorParam,
            0x06 => TxMsgStatus::ErrorFailToSend,
            0x07 => TxMsgStatus::ErrorTxTimeout,
            raw => TxMsgStatus::Unrecognized(raw),
        }
    }

    /// No further progress will happen without a new prepare-tx.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TxMsgStatus::Idle
                | TxMsgStatus::Done
                | TxMsgStatus::ErrorParam
                | TxMsgStatus::ErrorFailToSend
                | TxMsgStatus::ErrorTxTimeout
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PpsStatus {
    NotValid,
    Valid,
    Unrecognized(u8),
}

impl PpsStatus {
    pub fn code(self) -> u8 {
        match self {
            PpsStatus::NotValid => 0x00,
            PpsStatus::Valid => 0x01,
            PpsStatus::Unrecognized(raw) => raw,
        }
    }

    pub fn from_code(code: u8) -> Self {
        match code {
            0x00 => PpsStatus::NotValid,
            0x01 => PpsStatus::Valid,
            raw => PpsStatus::Unrecognized(raw),
        }
    }
}

/// Status byte shared by the config-rx, prepare-tx and reset acknowledgments.
pub const STATUS_OK: u8 = 0x00;

/// PA ramp-up time sent with every prepare-tx (20 us).
pub const RADIO_RAMP_20_US: u8 = 0xE0;
