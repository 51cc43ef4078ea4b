use runtime::YieldBudget;

use crate::error::IngestionError;
use crate::point::{PointKind, RawPoint, attr};
use crate::source::{BoxFuture, PointSource};

/// Longitude of the stress-test anchor.
pub const ANCHOR_LNG: f64 = -122.673447;
/// Latitude of the stress-test anchor.
pub const ANCHOR_LAT: f64 = 45.5225581;
/// Records hashed between scheduler yields while filling one batch.
const RECORDS_PER_SLICE: u32 = 256;

/// Deterministic synthetic points scattered over a wide band east of the anchor.
///
/// Longitudes fall in `[ANCHOR_LNG, ANCHOR_LNG + 200)`, latitudes in
/// `[ANCHOR_LAT - 60, ANCHOR_LAT + 20)`. Every record is derived from
/// `blake3(seed, index)` so a given `(seed, count)` always yields the same set.
#[derive(Debug, Clone)]
pub struct GeneratedSource {
    seed: u64,
    count: u64,
    next: u64,
}

impl GeneratedSource {
    pub fn new(count: u64, seed: u64) -> Self {
        Self {
            seed,
            count,
            next: 0,
        }
    }

    fn record(&self, index: u64) -> RawPoint {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.seed.to_le_bytes());
        hasher.update(&index.to_le_bytes());
        let digest = hasher.finalize();
        let bytes = digest.as_bytes();

        let lng = ANCHOR_LNG + unit_f64(&bytes[0..8]) * 200.0;
        let lat = ANCHOR_LAT - 60.0 + unit_f64(&bytes[8..16]) * 80.0;
        // Roughly three racks for every sign.
        let kind = if bytes[16] & 0b11 == 0 {
            PointKind::Sign
        } else {
            PointKind::Rack
        };

        let raw = RawPoint::new(format!("gen-{index}"), lng, lat, kind)
            .with_field(attr::ADDRESS, format!("Generated location {index}"));
        match kind {
            PointKind::Rack => raw.with_field(attr::RACK_TYPE, "Large Hoop"),
            PointKind::Sign => raw.with_field(attr::SIGN_DESCRIPTION, "BICYCLE PARKING"),
        }
    }
}

/// Maps 8 little-endian bytes onto `[0, 1)` using the top 53 bits.
fn unit_f64(bytes: &[u8]) -> f64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    let v = u64::from_le_bytes(buf) >> 11;
    v as f64 / (1u64 << 53) as f64
}

impl PointSource for GeneratedSource {
    fn declared_count(&self) -> Option<u64> {
        Some(self.count)
    }

    fn next_batch(
        &mut self,
        max_size: usize,
    ) -> BoxFuture<'_, Result<Vec<RawPoint>, IngestionError>> {
        Box::pin(async move {
            let end = self.count.min(self.next.saturating_add(max_size as u64));
            let mut batch = Vec::with_capacity((end - self.next) as usize);
            let mut budget = YieldBudget::new(RECORDS_PER_SLICE);
            while self.next < end {
                batch.push(self.record(self.next));
                self.next += 1;
                budget.tick(1).await;
            }
            Ok(batch)
        })
    }
}
