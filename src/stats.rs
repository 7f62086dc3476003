use std::time::Instant;

use lora_concentrator::RxPacket;

#[derive(Debug, Clone)]
pub struct Stats {
    pub pkts: u64,
    pub bytes: u64,
    pub total: u64,
    rssi_sum: f64,
    snr_sum: f64,
    t0: Instant,
    last: Instant,
}

impl Stats {
    pub fn new() -> Self {
        Self {
            pkts: 0,
            bytes: 0,
            total: 0,
            rssi_sum: 0.0,
            snr_sum: 0.0,
            t0: Instant::now(),
            last: Instant::now(),
        }
    }

    pub fn add(&mut self, pkt: &RxPacket) {
        self.pkts += 1;
        self.total += 1;
        self.bytes += pkt.size() as u64;
        self.rssi_sum += pkt.rssi as f64;
        self.snr_sum += pkt.snr as f64;
    }

    pub fn mean_rssi(&self) -> Option<f64> {
        (self.pkts > 0).then(|| self.rssi_sum / self.pkts as f64)
    }

    pub fn mean_snr(&self) -> Option<f64> {
        (self.pkts > 0).then(|| self.snr_sum / self.pkts as f64)
    }

    /// Print and restart the interval once `stats_int` seconds have passed.
    pub fn maybe_print(&mut self, stats_int: f64) {
        if self.last.elapsed().as_secs_f64() < stats_int {
            return;
        }
        let dur = self.t0.elapsed().as_secs_f64().max(1e-3);
        eprintln!(
            "[rx] pkts={} bytes={} total={} over {:.1}s => {:.2} pkt/s rssi={:.1} snr={:.1}",
            self.pkts,
            self.bytes,
            self.total,
            dur,
            self.pkts as f64 / dur,
            self.mean_rssi().unwrap_or(f64::NAN),
            self.mean_snr().unwrap_or(f64::NAN),
        );
        self.last = Instant::now();
        self.t0 = Instant::now();
        self.pkts = 0;
        self.bytes = 0;
        self.rssi_sum = 0.0;
        self.snr_sum = 0.0;
    }
}
