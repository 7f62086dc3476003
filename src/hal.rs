//! Concentrator lifecycle: configuration, start/stop, receive and send.

use tracing::{debug, info, warn};

use crate::error::{HalError, ProtocolError, Result};
use crate::mcu::{Mcu, Timing};
use crate::port::{Connect, SerialConnector};
use crate::proto::codec::{ReceivedMessage, Status, UniqueId};
use crate::proto::command::{ResetType, TxMsgStatus};
use crate::types::{
    BoardConfig, CodingRate, CrcStatus, LGW_RX_CHANNEL_NB_MAX, Modulation, RxChannelConfig,
    RxPacket, TxChannelConfig, TxPacket,
};

/// Firmware version this driver speaks to. The first character of the
/// reported version is a variant letter and is not compared.
pub const MCU_VERSION: &str = "01.00.01";

pub fn version_info() -> String {
    format!("Version: {};", env!("CARGO_PKG_VERSION"))
}

/// 64-bit EUI derived from the MCU unique id.
pub fn eui_from_unique_id(id: &UniqueId) -> u64 {
    ((id.high.wrapping_add(id.low) as u64) << 32) | id.mid as u64
}

fn check_version(reported: &str) -> Result<()> {
    let mut chars = reported.chars();
    chars.next();
    if chars.as_str() != MCU_VERSION {
        return Err(HalError::VersionMismatch {
            expected: MCU_VERSION.into(),
            got: reported.into(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifecycle {
    Unconfigured,
    Configured,
    Started,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Tx,
    Rx,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioStatus {
    TxUnknown,
    TxOff,
    TxFree,
    TxScheduled,
    TxEmitting,
    RxUnknown,
    RxOff,
    RxOn,
    RxSuspended,
}

/// What the MCU reported about itself when the concentrator started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub unique_id: UniqueId,
    pub version: String,
    pub nb_radio_rx: u8,
    pub nb_radio_tx: u8,
}

struct Session<P> {
    mcu: Mcu<P>,
    device: DeviceInfo,
}

pub struct Concentrator<C: Connect = SerialConnector> {
    connector: C,
    timing: Timing,
    board: Option<BoardConfig>,
    rx_channels: [RxChannelConfig; LGW_RX_CHANNEL_NB_MAX],
    tx_channel: TxChannelConfig,
    session: Option<Session<C::Port>>,
}

impl Concentrator<SerialConnector> {
    pub fn new() -> Self {
        Self::with_connector(SerialConnector::default(), Timing::default())
    }
}

impl Default for Concentrator<SerialConnector> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Connect> Concentrator<C> {
    pub fn with_connector(connector: C, timing: Timing) -> Self {
        Self {
            connector,
            timing,
            board: None,
            rx_channels: Default::default(),
            tx_channel: TxChannelConfig::default(),
            session: None,
        }
    }

    pub fn lifecycle(&self) -> Lifecycle {
        match (&self.session, &self.board) {
            (Some(_), _) => Lifecycle::Started,
            (None, Some(_)) => Lifecycle::Configured,
            (None, None) => Lifecycle::Unconfigured,
        }
    }

    pub fn is_started(&self) -> bool {
        self.session.is_some()
    }

    fn ensure_stopped(&self) -> Result<()> {
        if self.is_started() {
            return Err(HalError::AlreadyStarted);
        }
        Ok(())
    }

    fn session_mut(&mut self) -> Result<&mut Session<C::Port>> {
        self.session.as_mut().ok_or(HalError::NotStarted)
    }

    // ---- Configuration

    pub fn set_board_config(&mut self, conf: BoardConfig) -> Result<()> {
        self.ensure_stopped()?;
        debug!(tty_path = %conf.tty_path, "board configuration");
        self.board = Some(conf);
        Ok(())
    }

    pub fn set_rx_channel_config(&mut self, idx: usize, conf: RxChannelConfig) -> Result<()> {
        self.ensure_stopped()?;
        let slot = self.rx_channels.get_mut(idx).ok_or_else(|| {
            HalError::invalid(format!(
                "RX channel {} out of range (max {})",
                idx,
                LGW_RX_CHANNEL_NB_MAX - 1
            ))
        })?;
        debug!(
            channel = idx,
            enable = conf.enable,
            freq_hz = conf.freq_hz,
            "RX channel configuration"
        );
        *slot = conf;
        Ok(())
    }

    pub fn set_tx_config(&mut self, conf: TxChannelConfig) -> Result<()> {
        self.ensure_stopped()?;
        self.tx_channel = conf;
        Ok(())
    }

    pub fn board_config(&self) -> Option<&BoardConfig> {
        self.board.as_ref()
    }

    pub fn rx_channel_config(&self, idx: usize) -> Option<&RxChannelConfig> {
        self.rx_channels.get(idx)
    }

    pub fn tx_config(&self) -> &TxChannelConfig {
        &self.tx_channel
    }

    pub fn device_info(&self) -> Option<&DeviceInfo> {
        self.session.as_ref().map(|s| &s.device)
    }

    // ---- Lifecycle

    pub fn start(&mut self) -> Result<()> {
        self.ensure_stopped()?;
        let path = self
            .board
            .as_ref()
            .map(|b| b.tty_path.clone())
            .ok_or_else(|| HalError::invalid("board is not configured"))?;

        info!(%path, "opening concentrator");
        let port = self.connector.connect(&path)?;
        let mut mcu = Mcu::with_timing(port, self.timing);

        let ping = mcu.ping()?;
        check_version(&ping.version)?;
        info!(version = %ping.version, "concentrator MCU version");

        mcu.reset(ResetType::RxAll)?;
        mcu.reset(ResetType::Tx)?;

        let status = mcu.get_status()?;
        debug!(temperature = status.temperature, "MCU status");

        // radio 0 is configured last, radio 1 must be up for the others
        let nb_rx = (ping.nb_radio_rx as usize).min(LGW_RX_CHANNEL_NB_MAX);
        for i in 0..nb_rx {
            let idx = (i + 1) % LGW_RX_CHANNEL_NB_MAX;
            let conf = &self.rx_channels[idx];
            if !conf.enable {
                continue;
            }
            if !self.rx_channels[1].enable {
                return Err(HalError::invalid(
                    "channel 1 cannot be disabled while another channel is enabled",
                ));
            }
            info!(
                channel = idx,
                freq_hz = conf.freq_hz,
                sf = conf.datarate.value(),
                "configuring RX"
            );
            mcu.config_rx(idx as u8, conf)?;
        }

        self.session = Some(Session {
            mcu,
            device: DeviceInfo {
                unique_id: ping.unique_id,
                version: ping.version,
                nb_radio_rx: ping.nb_radio_rx,
                nb_radio_tx: ping.nb_radio_tx,
            },
        });
        info!("concentrator started");
        Ok(())
    }

    /// Reset the radios and release the link. Reset failures are logged only.
    pub fn stop(&mut self) -> Result<()> {
        let Some(mut session) = self.session.take() else {
            info!("concentrator was not started");
            return Ok(());
        };
        for kind in [ResetType::RxAll, ResetType::Tx] {
            if let Err(e) = session.mcu.reset(kind) {
                warn!(?kind, error = %e, "failed to reset radio");
            }
        }
        drop(session);
        info!("concentrator stopped");
        Ok(())
    }

    // ---- Data plane

    /// Fetch up to `max_count` packets; extra packets buffered on the MCU are
    /// consumed and dropped.
    pub fn receive(&mut self, max_count: usize) -> Result<Vec<RxPacket>> {
        let session = self.session.as_mut().ok_or(HalError::NotStarted)?;
        let msgs = session.mcu.receive(max_count)?;

        // CRC counters are diagnostics; only a dead link is worth failing for
        match session.mcu.get_status() {
            Ok(status) => {
                for (radio, crc) in status.rx_crc.iter().enumerate() {
                    if crc.ok > 0 || crc.err > 0 {
                        debug!(radio, crc_ok = crc.ok, crc_err = crc.err, "CRC counters");
                    }
                }
            }
            Err(e @ HalError::Transport(_)) => return Err(e),
            Err(e) => warn!(error = %e, "CRC counters unavailable"),
        }

        msgs.into_iter()
            .map(|msg| enrich(msg, &self.rx_channels))
            .collect()
    }

    pub fn send(&mut self, pkt: &TxPacket) -> Result<()> {
        self.session_mut()?.mcu.prepare_tx(pkt)
    }

    /// Send and wait until the MCU reports the TX as finished.
    pub fn send_blocking(&mut self, pkt: &TxPacket) -> Result<TxMsgStatus> {
        self.session_mut()?.mcu.prepare_tx_blocking(pkt)
    }

    pub fn status(&mut self, kind: StatusKind) -> Result<RadioStatus> {
        match kind {
            StatusKind::Rx => Ok(if self.is_started() {
                RadioStatus::RxOn
            } else {
                RadioStatus::RxOff
            }),
            StatusKind::Tx => {
                let Some(session) = self.session.as_mut() else {
                    return Ok(RadioStatus::TxOff);
                };
                Ok(match session.mcu.get_tx_status()? {
                    TxMsgStatus::Idle | TxMsgStatus::Done => RadioStatus::TxFree,
                    TxMsgStatus::Loaded => RadioStatus::TxScheduled,
                    TxMsgStatus::OnAir => RadioStatus::TxEmitting,
                    _ => RadioStatus::TxUnknown,
                })
            }
        }
    }

    pub fn abort_tx(&mut self) -> Result<()> {
        self.session_mut()?.mcu.reset(ResetType::Tx)
    }

    // ---- Device queries

    /// Works stopped too, through a temporary connection.
    pub fn get_eui(&mut self) -> Result<u64> {
        let ping = match self.session.as_mut() {
            Some(session) => session.mcu.ping()?,
            None => {
                let path = self
                    .board
                    .as_ref()
                    .map(|b| b.tty_path.clone())
                    .ok_or_else(|| HalError::invalid("board is not configured"))?;
                let port = self.connector.connect(&path)?;
                Mcu::with_timing(port, self.timing).ping()?
            }
        };
        Ok(eui_from_unique_id(&ping.unique_id))
    }

    pub fn status_snapshot(&mut self) -> Result<Status> {
        self.session_mut()?.mcu.get_status()
    }

    pub fn get_temperature(&mut self) -> Result<f32> {
        Ok(self.status_snapshot()?.temperature)
    }

    /// Counter value latched on the last PPS edge, in microseconds.
    pub fn get_trigcnt(&mut self) -> Result<u32> {
        Ok(self.status_snapshot()?.pps_time_us)
    }

    /// Free-running concentrator counter, in microseconds.
    pub fn get_instcnt(&mut self) -> Result<u32> {
        Ok(self.status_snapshot()?.precise_time_us)
    }

    pub fn read_register(&mut self, radio: u8, addr: u16) -> Result<u8> {
        self.session_mut()?.mcu.read_register(radio, addr)
    }

    pub fn write_register(&mut self, radio: u8, addr: u16, value: u8) -> Result<()> {
        self.session_mut()?.mcu.write_register(radio, addr, value)
    }
}

fn enrich(msg: ReceivedMessage, channels: &[RxChannelConfig]) -> Result<RxPacket> {
    let conf = channels.get(msg.radio as usize).ok_or_else(|| {
        ProtocolError::Malformed(format!("RX event from unknown radio {}", msg.radio))
    })?;
    Ok(RxPacket {
        freq_hz: conf.freq_hz,
        channel: msg.radio,
        status: CrcStatus::CrcOk,
        count_us: msg.count_us,
        foff_hz: msg.foff_hz,
        modulation: Modulation::LoRa,
        bandwidth: conf.bandwidth,
        datarate: conf.datarate,
        coderate: CodingRate::Li4_8,
        rssi: msg.rssi as f32 + conf.rssi_offset,
        snr: msg.snr as f32,
        payload: msg.payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockConnector, MockPort};
    use crate::proto::codec::CrcCounters;
    use crate::proto::command::{AckType, Request};
    use crate::types::{Bandwidth, SpreadingFactor};

    const UID: UniqueId = UniqueId {
        high: 0x1111_1111,
        mid: 0x2222_2222,
        low: 0x3333_3333,
    };

    fn channel(freq_hz: u32, rssi_offset: f32) -> RxChannelConfig {
        RxChannelConfig {
            enable: true,
            freq_hz,
            bandwidth: Bandwidth::Bw800kHz,
            datarate: SpreadingFactor::Sf7,
            rssi_offset,
            sync_word: 0x12,
        }
    }

    fn counters() -> [CrcCounters; 3] {
        [CrcCounters::default(); 3]
    }

    fn configured(enabled: [bool; 3]) -> (MockPort, Concentrator<MockConnector>) {
        let port = MockPort::new();
        let mut hal =
            Concentrator::with_connector(MockConnector::new(port.clone()), Timing::immediate());
        hal.set_board_config(BoardConfig::default()).unwrap();
        for (i, on) in enabled.into_iter().enumerate() {
            let mut conf = channel(2_400_000_000 + i as u32 * 25_000_000, -1.5);
            conf.enable = on;
            hal.set_rx_channel_config(i, conf).unwrap();
        }
        (port, hal)
    }

    fn script_start(port: &MockPort, version: &str, nb_config: usize) {
        port.reply_ping(version, 3, UID);
        port.reply_ok(AckType::Reset);
        port.reply_ok(AckType::Reset);
        port.reply_status(25.0, &counters());
        for _ in 0..nb_config {
            port.reply_ok(AckType::ConfigRx);
        }
    }

    fn started() -> (MockPort, Concentrator<MockConnector>) {
        let (port, mut hal) = configured([true, true, true]);
        script_start(&port, "V01.00.01", 3);
        hal.start().unwrap();
        port.clear_sent();
        (port, hal)
    }

    fn msg(radio: u8, rssi: i8) -> ReceivedMessage {
        ReceivedMessage {
            radio,
            count_us: 5000,
            foff_hz: -300,
            snr: 7,
            rssi,
            payload: vec![1, 2, 3],
        }
    }

    #[test]
    fn version_string() {
        assert_eq!(version_info(), format!("Version: {};", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn start_configures_channels_one_two_zero() {
        let (port, mut hal) = configured([true, true, true]);
        script_start(&port, "V01.00.01", 3);
        hal.start().unwrap();
        assert_eq!(hal.lifecycle(), Lifecycle::Started);

        let sent = port.sent();
        let requests: Vec<_> = sent.iter().map(|s| s.request).collect();
        assert_eq!(
            requests,
            vec![
                Request::Ping,
                Request::Reset,
                Request::Reset,
                Request::GetStatus,
                Request::ConfigRx,
                Request::ConfigRx,
                Request::ConfigRx
            ]
        );
        assert_eq!(sent[1].payload, vec![ResetType::RxAll.code()]);
        assert_eq!(sent[2].payload, vec![ResetType::Tx.code()]);
        let radios: Vec<u8> = sent[4..].iter().map(|s| s.payload[0]).collect();
        assert_eq!(radios, vec![1, 2, 0]);
        assert_eq!(hal.device_info().unwrap().unique_id, UID);
    }

    #[test]
    fn disabled_channels_are_skipped() {
        let (port, mut hal) = configured([false, true, false]);
        script_start(&port, "V01.00.01", 1);
        hal.start().unwrap();
        let configs: Vec<_> = port
            .sent()
            .into_iter()
            .filter(|s| s.request == Request::ConfigRx)
            .collect();
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].payload[0], 1);
    }

    #[test]
    fn channel_one_is_required_by_the_others() {
        let (port, mut hal) = configured([true, false, false]);
        script_start(&port, "V01.00.01", 0);
        assert!(matches!(hal.start(), Err(HalError::InvalidArgument(_))));
        assert_eq!(hal.lifecycle(), Lifecycle::Configured);
    }

    #[test]
    fn version_mismatch_fails_start() {
        let (port, mut hal) = configured([true, true, true]);
        script_start(&port, "V01.00.02", 3);
        let err = hal.start().unwrap_err();
        assert!(matches!(err, HalError::VersionMismatch { ref got, .. } if got == "V01.00.02"));
        assert!(!hal.is_started());
        assert_eq!(port.sent_requests(), vec![Request::Ping]);
    }

    #[test]
    fn first_version_character_is_ignored() {
        assert!(check_version("X01.00.01").is_ok());
        assert!(check_version("01.00.01").is_err());
        assert!(check_version("V01.00.01-rc").is_err());
        assert!(check_version("").is_err());
    }

    #[test]
    fn start_without_board_or_device_fails() {
        let mut hal = Concentrator::with_connector(MockConnector::refusing(), Timing::immediate());
        assert_eq!(hal.lifecycle(), Lifecycle::Unconfigured);
        assert!(matches!(hal.start(), Err(HalError::InvalidArgument(_))));

        hal.set_board_config(BoardConfig::default()).unwrap();
        assert!(matches!(hal.start(), Err(HalError::Transport(_))));
        assert_eq!(hal.lifecycle(), Lifecycle::Configured);
    }

    #[test]
    fn configuration_is_locked_while_started() {
        let (_port, mut hal) = started();
        let before = *hal.rx_channel_config(0).unwrap();

        let mut changed = before;
        changed.freq_hz += 1;
        assert!(matches!(
            hal.set_rx_channel_config(0, changed),
            Err(HalError::AlreadyStarted)
        ));
        assert!(matches!(
            hal.set_board_config(BoardConfig {
                tty_path: "/dev/ttyUSB1".into()
            }),
            Err(HalError::AlreadyStarted)
        ));
        assert!(matches!(
            hal.set_tx_config(TxChannelConfig { enable: true }),
            Err(HalError::AlreadyStarted)
        ));
        assert!(matches!(hal.start(), Err(HalError::AlreadyStarted)));
        assert_eq!(*hal.rx_channel_config(0).unwrap(), before);
        assert_eq!(hal.board_config().unwrap().tty_path, "/dev/ttyACM0");
    }

    #[test]
    fn rx_channel_index_out_of_range() {
        let (_port, mut hal) = configured([true, true, true]);
        assert!(matches!(
            hal.set_rx_channel_config(3, RxChannelConfig::default()),
            Err(HalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn receive_enriches_from_channel_config() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(2, -80)], 0, 0);
        port.reply_status(25.0, &counters());

        let pkts = hal.receive(8).unwrap();
        assert_eq!(pkts.len(), 1);
        let p = &pkts[0];
        assert_eq!(p.channel, 2);
        assert_eq!(p.freq_hz, 2_450_000_000);
        assert_eq!(p.bandwidth, Bandwidth::Bw800kHz);
        assert_eq!(p.datarate, SpreadingFactor::Sf7);
        assert_eq!(p.coderate, CodingRate::Li4_8);
        assert_eq!(p.status, CrcStatus::CrcOk);
        assert_eq!(p.modulation, Modulation::LoRa);
        assert!((p.rssi + 81.5).abs() < 1e-6);
        assert!((p.snr - 7.0).abs() < 1e-6);
        assert_eq!(p.foff_hz, -300);
        assert_eq!(p.payload, vec![1, 2, 3]);
        assert_eq!(
            port.sent_requests(),
            vec![Request::GetRxMsg, Request::GetStatus]
        );
    }

    #[test]
    fn receive_zero_drains_the_mcu() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(0, -50), msg(1, -60)], 0, 0);
        port.reply_status(25.0, &counters());
        assert!(hal.receive(0).unwrap().is_empty());
        assert_eq!(port.unread(), 0);
    }

    #[test]
    fn short_crc_table_does_not_lose_packets() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(0, -50), msg(2, -70)], 0, 0);
        port.reply_status(25.0, &counters()[..2]);

        let pkts = hal.receive(8).unwrap();
        assert_eq!(pkts.len(), 2);
        assert_eq!(pkts[0].channel, 0);
        assert_eq!(pkts[1].channel, 2);
        assert_eq!(port.unread(), 0);
        assert!(hal.is_started());
    }

    #[test]
    fn wrong_ack_for_crc_counters_is_not_fatal() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(1, -60)], 0, 0);
        port.reply_ok(AckType::Reset);
        assert_eq!(hal.receive(8).unwrap().len(), 1);
    }

    #[test]
    fn link_lost_during_crc_fetch_fails_receive() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(1, -60)], 0, 0);
        assert!(matches!(hal.receive(8), Err(HalError::Transport(_))));
    }

    #[test]
    fn receive_reports_lost_messages() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(1, -60)], 0, 4);
        port.reply_status(25.0, &counters());
        assert!(hal.receive(0).unwrap().is_empty());
        assert_eq!(port.unread(), 0);
        assert_eq!(
            port.sent_requests(),
            vec![Request::GetRxMsg, Request::GetStatus]
        );
    }

    #[test]
    fn write_failure_is_a_transport_error() {
        let (port, mut hal) = started();
        port.fail_writes(true);
        assert!(matches!(
            hal.send(&TxPacket::default()),
            Err(HalError::Transport(_))
        ));
        assert!(matches!(hal.receive(1), Err(HalError::Transport(_))));
        assert_eq!(hal.lifecycle(), Lifecycle::Started);
        assert!(port.sent().is_empty());

        port.fail_writes(false);
        port.reply_tx_status(TxMsgStatus::Idle);
        assert_eq!(hal.status(StatusKind::Tx).unwrap(), RadioStatus::TxFree);
    }

    #[test]
    fn write_failure_during_start_keeps_configuration() {
        let (port, mut hal) = configured([true, true, true]);
        port.fail_writes(true);
        assert!(matches!(hal.start(), Err(HalError::Transport(_))));
        assert_eq!(hal.lifecycle(), Lifecycle::Configured);
    }

    #[test]
    fn receive_from_unknown_radio_is_malformed() {
        let (port, mut hal) = started();
        port.reply_rx_msg(&[msg(3, -50)], 0, 0);
        port.reply_status(25.0, &counters());
        assert!(matches!(
            hal.receive(4),
            Err(HalError::Protocol(ProtocolError::Malformed(_)))
        ));
    }

    #[test]
    fn operations_need_a_started_concentrator() {
        let (port, mut hal) = configured([true, true, true]);
        assert!(matches!(hal.receive(1), Err(HalError::NotStarted)));
        assert!(matches!(hal.send(&TxPacket::default()), Err(HalError::NotStarted)));
        assert!(matches!(hal.abort_tx(), Err(HalError::NotStarted)));
        assert!(matches!(hal.get_temperature(), Err(HalError::NotStarted)));
        assert!(port.sent().is_empty());
    }

    #[test]
    fn invalid_packet_is_not_sent() {
        let (port, mut hal) = started();
        let pkt = TxPacket {
            rf_power: 20,
            ..Default::default()
        };
        assert!(matches!(hal.send(&pkt), Err(HalError::InvalidArgument(_))));
        assert!(port.sent().is_empty());
    }

    #[test]
    fn rejected_tx_reports_firmware_code() {
        let (port, mut hal) = started();
        port.reply_code(AckType::PrepareTx, 0x03);
        assert!(matches!(
            hal.send(&TxPacket::default()),
            Err(HalError::Rejected {
                request: Request::PrepareTx,
                code: 0x03
            })
        ));
    }

    #[test]
    fn blocking_send_waits_for_done() {
        let (port, mut hal) = started();
        port.reply_ok(AckType::PrepareTx);
        port.reply_tx_status(TxMsgStatus::OnAir);
        port.reply_tx_status(TxMsgStatus::Done);
        assert_eq!(
            hal.send_blocking(&TxPacket::default()).unwrap(),
            TxMsgStatus::Done
        );
    }

    #[test]
    fn tx_status_mapping() {
        let (_, mut stopped) = configured([true, true, true]);
        assert_eq!(stopped.status(StatusKind::Tx).unwrap(), RadioStatus::TxOff);
        assert_eq!(stopped.status(StatusKind::Rx).unwrap(), RadioStatus::RxOff);

        let (port, mut hal) = started();
        for (fw, expected) in [
            (TxMsgStatus::Idle, RadioStatus::TxFree),
            (TxMsgStatus::Done, RadioStatus::TxFree),
            (TxMsgStatus::Loaded, RadioStatus::TxScheduled),
            (TxMsgStatus::OnAir, RadioStatus::TxEmitting),
            (TxMsgStatus::ErrorParam, RadioStatus::TxUnknown),
        ] {
            port.reply_tx_status(fw);
            assert_eq!(hal.status(StatusKind::Tx).unwrap(), expected);
        }
        assert_eq!(hal.status(StatusKind::Rx).unwrap(), RadioStatus::RxOn);
    }

    #[test]
    fn eui_combines_unique_id_words() {
        assert_eq!(eui_from_unique_id(&UID), 0x4444_4444_2222_2222);
        let wrap = UniqueId {
            high: 0xFFFF_FFFF,
            mid: 1,
            low: 2,
        };
        assert_eq!(eui_from_unique_id(&wrap), 0x0000_0001_0000_0001);
    }

    #[test]
    fn eui_when_stopped_uses_a_temporary_link() {
        let port = MockPort::new();
        let connector = MockConnector::new(port.clone());
        let mut hal = Concentrator::with_connector(connector.clone(), Timing::immediate());
        hal.set_board_config(BoardConfig::default()).unwrap();
        port.reply_ping("V01.00.01", 3, UID);

        assert_eq!(hal.get_eui().unwrap(), 0x4444_4444_2222_2222);
        assert!(!hal.is_started());
        assert_eq!(connector.opened(), vec!["/dev/ttyACM0".to_string()]);
        // test handle, connector clone and the one inside hal
        assert_eq!(port.handles(), 3);
    }

    #[test]
    fn stop_is_best_effort_and_releases_the_link() {
        let (port, mut hal) = started();
        let handles = port.handles();
        port.reply_code(AckType::Reset, 0x01);
        // second reset gets no answer at all
        hal.stop().unwrap();
        assert!(!hal.is_started());
        assert_eq!(port.handles(), handles - 1);
        assert_eq!(port.sent_requests(), vec![Request::Reset, Request::Reset]);

        // stopping again is harmless
        hal.stop().unwrap();
    }

    #[test]
    fn status_queries() {
        let (port, mut hal) = started();
        port.reply_status(-4.5, &counters());
        assert!((hal.get_temperature().unwrap() + 4.5).abs() < 1e-6);
        port.reply_status(20.0, &counters());
        assert_eq!(hal.get_instcnt().unwrap(), 1_000_000);
    }
}
