//! Benchmarking of filter implementations and persistence of the results.
//!
//! Calibration runs once at startup, before any receiver exists. The fastest
//! implementation for each filter type goes into a `CalibrationSet`, which is saved as
//! JSON so later startups can skip the benchmark.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::error::CalibrationError;
use crate::filter::design::{self, Window};
use crate::filter::{FilterImplementation, FirFilter, HalfBandDecimator, RealFilter};

/// Kinds of filter that are calibrated separately.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum CalibrationType {
    /// General FIR filter.
    FirFilter,
    /// Half-band decimating filter.
    HalfBand,
}

impl CalibrationType {
    pub fn all() -> &'static [CalibrationType] {
        &[CalibrationType::FirFilter, CalibrationType::HalfBand]
    }

    /// Build the filter used to benchmark this type.
    fn build(self, imp: FilterImplementation)
        -> Result<Box<dyn RealFilter>, CalibrationError>
    {
        match self {
            CalibrationType::FirFilter => {
                let coefs = design::sinc_lowpass(0.1, 63, Window::Hamming);

                if coefs.iter().any(|c| !c.is_finite()) {
                    return Err(CalibrationError::FilterDesign("FIR benchmark"));
                }

                Ok(Box::new(FirFilter::new(&coefs, imp)))
            },
            CalibrationType::HalfBand => {
                let coefs = design::halfband(31, Window::Blackman);

                if coefs.iter().any(|c| !c.is_finite()) {
                    return Err(CalibrationError::FilterDesign("half-band benchmark"));
                }

                Ok(Box::new(HalfBandDecimator::new(&coefs, imp)))
            },
        }
    }
}

/// Chosen implementation for each filter type.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationSet {
    fir_filter: FilterImplementation,
    half_band: FilterImplementation,
}

impl CalibrationSet {
    pub fn get(&self, ty: CalibrationType) -> FilterImplementation {
        match ty {
            CalibrationType::FirFilter => self.fir_filter,
            CalibrationType::HalfBand => self.half_band,
        }
    }

    pub fn set(&mut self, ty: CalibrationType, imp: FilterImplementation) {
        match ty {
            CalibrationType::FirFilter => self.fir_filter = imp,
            CalibrationType::HalfBand => self.half_band = imp,
        }
    }

    /// Read a set previously written by `save`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<CalibrationSet, CalibrationError> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(BufReader::new(file))?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), CalibrationError> {
        let mut w = BufWriter::new(File::create(path)?);

        serde_json::to_writer_pretty(&mut w, self)?;
        w.flush()?;

        Ok(())
    }

    /// Read the set saved at the given path. If it's missing or unreadable, calibrate
    /// and try to save the result there.
    pub fn load_or_calibrate<P: AsRef<Path>>(path: P, cal: &Calibrator) -> CalibrationSet {
        let path = path.as_ref();

        match CalibrationSet::load(path) {
            Ok(set) => {
                debug!("loaded filter calibration from {}", path.display());
                return set;
            },
            Err(e) => info!("calibrating filters ({}: {})", path.display(), e),
        }

        let set = cal.calibrate_all();

        if let Err(e) = set.save(path) {
            warn!("unable to save filter calibration to {}: {}", path.display(), e);
        }

        set
    }
}

/// Benchmarks each filter implementation and picks the fastest.
#[derive(Copy, Clone, Debug)]
pub struct Calibrator {
    /// Discarded iterations run before timing.
    pub warmup: usize,
    /// Timed iterations averaged for each implementation.
    pub iterations: usize,
    /// Wall clock length of each timed iteration.
    pub window: Duration,
    /// Samples per filter call.
    pub block: usize,
}

impl Default for Calibrator {
    fn default() -> Self {
        Calibrator {
            warmup: 3,
            iterations: 5,
            window: Duration::from_millis(50),
            block: 2048,
        }
    }
}

impl Calibrator {
    /// Find the fastest implementation for the given filter type.
    pub fn calibrate(&self, ty: CalibrationType)
        -> Result<FilterImplementation, CalibrationError>
    {
        let samples: Vec<f32> = (0..self.block).map(|i| (i as f32 * 0.1).sin()).collect();
        let mut best = (FilterImplementation::Scalar, 0.0);

        for &imp in FilterImplementation::all() {
            let mut filter = ty.build(imp)?;

            for _ in 0..self.warmup {
                self.run(&mut *filter, &samples);
            }

            let total: usize = (0..self.iterations)
                .map(|_| self.run(&mut *filter, &samples))
                .sum();

            let mean = total as f64 / self.iterations.max(1) as f64;

            debug!("{:?} {:?}: {:.1} calls per window", ty, imp, mean);

            if mean > best.1 {
                best = (imp, mean);
            }
        }

        info!("selected {:?} for {:?}", best.0, ty);

        Ok(best.0)
    }

    /// Calibrate every filter type, falling back to scalar on failure.
    pub fn calibrate_all(&self) -> CalibrationSet {
        let mut set = CalibrationSet::default();

        for &ty in CalibrationType::all() {
            match self.calibrate(ty) {
                Ok(imp) => set.set(ty, imp),
                Err(e) => {
                    warn!("calibration of {:?} failed, using scalar: {}", ty, e);
                    set.set(ty, FilterImplementation::Scalar);
                },
            }
        }

        set
    }

    /// Count completed filter calls within one window.
    fn run(&self, filter: &mut dyn RealFilter, samples: &[f32]) -> usize {
        let start = Instant::now();
        let mut calls = 0;

        while start.elapsed() < self.window {
            filter.filter(samples);
            calls += 1;
        }

        calls
    }
}
