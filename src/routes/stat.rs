use crate::error::SketchError;

use super::sketch::{QuantileSketch, TDigestSketch};

/// Running aggregates for one (method, route, status, minute) bucket.
///
/// Not internally synchronized: the store wraps every stat in its own
/// mutex and callers must hold it around [`RouteStat::add`].
#[derive(Debug)]
pub struct RouteStat<S = TDigestSketch> {
    count: u64,
    sum: f64,
    sumsq: f64,
    compression: usize,
    sketch: Option<S>,
    /// Populated by [`RouteStat::seal`] on the flush path only.
    sketch_bytes: Vec<u8>,
    /// Set once the flush path has taken this stat; no more samples belong here.
    sealed: bool,
}

impl<S: QuantileSketch> RouteStat<S> {
    pub fn new(compression: usize) -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sumsq: 0.0,
            compression,
            sketch: None,
            sketch_bytes: Vec::new(),
            sealed: false,
        }
    }

    /// Record one latency sample in milliseconds.
    ///
    /// A sketch construction failure leaves the stat untouched. A sketch
    /// rejection is returned after count/sum/sumsq were already updated.
    pub fn add(&mut self, ms: f64) -> Result<(), SketchError> {
        let sketch = match self.sketch.take() {
            Some(sketch) => sketch,
            None => S::new(self.compression)?,
        };
        let sketch = self.sketch.insert(sketch);

        self.count += 1;
        self.sum += ms;
        self.sumsq += ms * ms;
        sketch.add(ms)
    }

    /// Compress the sketch and store its serialized bytes on the stat.
    /// The stat counts as sealed even if serialization fails.
    pub fn seal(&mut self) -> Result<(), SketchError> {
        self.sealed = true;
        if let Some(sketch) = &mut self.sketch {
            sketch.compress()?;
            self.sketch_bytes = sketch.to_bytes()?;
        }
        Ok(())
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sumsq(&self) -> f64 {
        self.sumsq
    }

    pub fn sketch(&self) -> Option<&S> {
        self.sketch.as_ref()
    }

    pub fn sketch_bytes(&self) -> &[u8] {
        &self.sketch_bytes
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        self.sum / self.count as f64
    }

    /// Population standard deviation reconstructed from sum and sumsq.
    pub fn stddev(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        let n = self.count as f64;
        let variance = self.sumsq / n - (self.sum / n).powi(2);
        variance.max(0.0).sqrt()
    }
}
