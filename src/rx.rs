use anyhow::{Context, Result};
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use lora_concentrator::{
    BoardConfig, Concentrator, LGW_RX_CHANNEL_NB_MAX, RxChannelConfig, RxPacket,
};

use crate::cli::RxOpts;
use crate::stats::Stats;

const NB_PKT_MAX: usize = 8;
/// Same-burst packets on the three radios must share their timestamp to this.
const TMST_TOLERANCE_US: u32 = 100;

pub fn run(opts: RxOpts) -> Result<()> {
    let mut hal = Concentrator::new();
    hal.set_board_config(BoardConfig {
        tty_path: opts.ser.dev.clone(),
    })?;
    for idx in 0..LGW_RX_CHANNEL_NB_MAX {
        hal.set_rx_channel_config(
            idx,
            RxChannelConfig {
                enable: true,
                freq_hz: opts.radio.freq,
                bandwidth: opts.radio.bw,
                datarate: opts.radio.sf,
                rssi_offset: 0.0,
                sync_word: opts.radio.sync_word(),
            },
        )
        .with_context(|| format!("configure channel {idx}"))?;
    }

    eprintln!(
        "Waiting for LoRa packets on {} Hz (BW {} kHz, SF {})",
        opts.radio.freq,
        opts.radio.bw.khz(),
        opts.radio.sf.value()
    );

    let delay = Duration::from_millis(opts.delay);
    let mut stats = Stats::new();

    for cnt_loop in 1..=opts.loops.max(1) {
        hal.start().context("start concentrator")?;

        let mut nb_pkt_total: u32 = 0;
        while opts.packets == 0 || nb_pkt_total < opts.packets {
            let pkts = match hal.receive(NB_PKT_MAX) {
                Ok(p) => p,
                Err(e) => {
                    eprintln!("[rx] receive failed: {e}");
                    break;
                }
            };
            if pkts.is_empty() {
                thread::sleep(delay);
                stats.maybe_print(opts.stats);
                continue;
            }

            nb_pkt_total += pkts.len() as u32;
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default();
            println!(
                "{}.{:06}: Received {} packets total:{} loop:{}",
                now.as_secs(),
                now.subsec_micros(),
                pkts.len(),
                nb_pkt_total,
                cnt_loop
            );
            for (i, pkt) in pkts.iter().enumerate() {
                println!("pkt[{}]:{}", i, describe(pkt));
                stats.add(pkt);
            }
            check_burst(&pkts);
            stats.maybe_print(opts.stats);
        }

        hal.stop().context("stop concentrator")?;
    }

    eprintln!("### Exiting ###");
    Ok(())
}

fn describe(pkt: &RxPacket) -> String {
    let data: String = pkt.payload.iter().map(|b| format!("{b:02X}")).collect();
    format!(
        "{{count:{},size:{},rssi:{:.0},snr:{:.0},foff:{},data:{}}}",
        pkt.count_us,
        pkt.size(),
        pkt.rssi,
        pkt.snr,
        pkt.foff_hz,
        data
    )
}

/// All radios listen on the same channel, so a full batch is one packet seen
/// three times.
fn check_burst(pkts: &[RxPacket]) {
    if pkts.len() != LGW_RX_CHANNEL_NB_MAX {
        eprintln!(
            "[rx] fetched only {}/{} packets at once",
            pkts.len(),
            LGW_RX_CHANNEL_NB_MAX
        );
        return;
    }
    for (i, diff) in burst_outliers(pkts) {
        eprintln!("[rx] count_us of radio 0 and packet {i} differ by {diff} us");
    }
}

/// Packets whose timestamp is too far from the first one's, with the signed
/// distance in microseconds.
fn burst_outliers(pkts: &[RxPacket]) -> Vec<(usize, i32)> {
    let Some(first) = pkts.first() else {
        return Vec::new();
    };
    pkts.iter()
        .enumerate()
        .skip(1)
        .map(|(i, pkt)| (i, pkt.count_us.wrapping_sub(first.count_us) as i32))
        .filter(|(_, diff)| diff.unsigned_abs() > TMST_TOLERANCE_US)
        .collect()
}
