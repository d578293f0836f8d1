use tdigest::TDigest;

use crate::error::SketchError;

/// Samples buffered before being merged into the digest.
const MERGE_BATCH: usize = 256;

/// Approximate quantile accumulator attached to every route bucket.
///
/// The engine only relies on this contract: accumulate values, compress the
/// internal structure, and serialize the compressed form to bytes.
pub trait QuantileSketch: Send + Sized + 'static {
    fn new(compression: usize) -> Result<Self, SketchError>;

    fn add(&mut self, value: f64) -> Result<(), SketchError>;

    /// Fold every pending sample into the compact representation.
    fn compress(&mut self) -> Result<(), SketchError>;

    /// Serialized compressed form. Fails if samples are still pending.
    fn to_bytes(&self) -> Result<Vec<u8>, SketchError>;

    /// Estimated value at quantile `q` in `[0, 1]`, `None` when empty.
    fn quantile(&self, q: f64) -> Option<f64>;
}

// ─── tdigest implementation ──────────────────────────────────────

/// [`TDigest`] plus a small unsorted buffer; `tdigest` merges are
/// immutable and allocate, so adding one value at a time would be wasteful.
#[derive(Debug, Clone)]
pub struct TDigestSketch {
    digest: TDigest,
    pending: Vec<f64>,
}

impl TDigestSketch {
    /// Decode bytes produced by [`QuantileSketch::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SketchError> {
        let digest: TDigest = bincode::deserialize(bytes).map_err(SketchError::Decode)?;
        Ok(Self {
            digest,
            pending: Vec::new(),
        })
    }

    pub fn count(&self) -> f64 {
        self.digest.count() + self.pending.len() as f64
    }

    fn merge_pending(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let batch = std::mem::take(&mut self.pending);
        self.digest = self.digest.merge_unsorted(batch);
    }
}

impl QuantileSketch for TDigestSketch {
    fn new(compression: usize) -> Result<Self, SketchError> {
        if compression == 0 {
            return Err(SketchError::InvalidCompression(compression));
        }
        Ok(Self {
            digest: TDigest::new_with_size(compression),
            pending: Vec::with_capacity(MERGE_BATCH),
        })
    }

    fn add(&mut self, value: f64) -> Result<(), SketchError> {
        if !value.is_finite() {
            return Err(SketchError::NonFiniteValue(value));
        }
        self.pending.push(value);
        if self.pending.len() >= MERGE_BATCH {
            self.merge_pending();
        }
        Ok(())
    }

    fn compress(&mut self) -> Result<(), SketchError> {
        self.merge_pending();
        Ok(())
    }

    fn to_bytes(&self) -> Result<Vec<u8>, SketchError> {
        if !self.pending.is_empty() {
            return Err(SketchError::Uncompressed);
        }
        bincode::serialize(&self.digest).map_err(SketchError::Encode)
    }

    fn quantile(&self, q: f64) -> Option<f64> {
        if self.count() == 0.0 {
            return None;
        }
        if self.pending.is_empty() {
            return Some(self.digest.estimate_quantile(q));
        }
        // Read-only view: merge a copy so live accumulation is untouched
        let merged = self.digest.merge_unsorted(self.pending.clone());
        Some(merged.estimate_quantile(q))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_compression_is_rejected() {
        assert!(matches!(
            TDigestSketch::new(0),
            Err(SketchError::InvalidCompression(0))
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let mut sketch = TDigestSketch::new(20).unwrap();
        assert!(matches!(sketch.add(f64::NAN), Err(SketchError::NonFiniteValue(_))));
        assert!(sketch.add(f64::INFINITY).is_err());
        assert_eq!(sketch.count(), 0.0);
        assert_eq!(sketch.quantile(0.5), None);
    }

    #[test]
    fn serialize_requires_compress() {
        let mut sketch = TDigestSketch::new(20).unwrap();
        sketch.add(1.0).unwrap();
        assert!(matches!(sketch.to_bytes(), Err(SketchError::Uncompressed)));

        sketch.compress().unwrap();
        assert!(!sketch.to_bytes().unwrap().is_empty());
    }

    #[test]
    fn bytes_decode_to_equivalent_quantiles() {
        let mut sketch = TDigestSketch::new(100).unwrap();
        for i in 1..=1000 {
            sketch.add(i as f64).unwrap();
        }
        sketch.compress().unwrap();

        let decoded = TDigestSketch::from_bytes(&sketch.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded.count(), 1000.0);
        for q in [0.5, 0.9, 0.99] {
            assert_eq!(decoded.quantile(q), sketch.quantile(q));
        }

        // tdigest bound: well inside 2% of the range at the median
        let p50 = decoded.quantile(0.5).unwrap();
        assert!((p50 - 500.0).abs() < 20.0, "p50 = {p50}");
    }

    #[test]
    fn quantile_sees_pending_samples() {
        let mut sketch = TDigestSketch::new(20).unwrap();
        for v in [10.0, 20.0, 30.0] {
            sketch.add(v).unwrap();
        }
        let p50 = sketch.quantile(0.5).unwrap();
        assert!((10.0..=30.0).contains(&p50));
        // still pending; quantile must not have merged in place
        assert!(sketch.to_bytes().is_err());
    }
}
