use num_complex::Complex32;
use realfft::{RealFftPlanner, RealToComplex};
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// FFT plan for forward and inverse complex FFT operations.
///
/// Plans are built once per analyzer and reused for every frame.
///
/// # Example
/// ```
/// use groovescribe::fft::FftPlan;
/// use num_complex::Complex32;
///
/// let plan = FftPlan::new(512);
/// let mut buffer = vec![Complex32::new(1.0, 0.0); 512];
/// plan.forward(&mut buffer);
/// plan.inverse(&mut buffer);
/// ```
pub struct FftPlan {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    len: usize,
}

impl FftPlan {
    /// Create a new FFT plan for a given size.
    pub fn new(len: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(len);
        let inverse = planner.plan_fft_inverse(len);
        Self {
            forward,
            inverse,
            len,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Perform forward FFT in-place.
    pub fn forward(&self, buffer: &mut [Complex32]) {
        self.forward.process(buffer);
    }

    /// Perform inverse FFT in-place, scaled by 1/len.
    pub fn inverse(&self, buffer: &mut [Complex32]) {
        self.inverse.process(buffer);
        let scale = 1.0 / self.len as f32;
        for v in buffer.iter_mut() {
            *v *= scale;
        }
    }
}

impl std::fmt::Debug for FftPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FftPlan").field("len", &self.len).finish()
    }
}

/// Real-to-complex plan returning the non-redundant half spectrum
/// (`len / 2 + 1` bins).
pub struct RealFftPlan {
    r2c: Arc<dyn RealToComplex<f32>>,
    len: usize,
}

impl RealFftPlan {
    pub fn new(len: usize) -> Self {
        let mut planner = RealFftPlanner::<f32>::new();
        let r2c = planner.plan_fft_forward(len);
        Self { r2c, len }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Number of output bins.
    pub fn n_bins(&self) -> usize {
        self.len / 2 + 1
    }

    /// Transform `input` (exactly `len` samples, overwritten as scratch).
    pub fn process(&self, input: &mut [f32]) -> Vec<Complex32> {
        let mut out = self.r2c.make_output_vec();
        // Length is guaranteed by the callers in this crate.
        let _ = self.r2c.process(input, &mut out);
        out
    }
}

impl std::fmt::Debug for RealFftPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFftPlan").field("len", &self.len).finish()
    }
}

#[cfg(feature = "parallel")]
const _: () = {
    fn _assert_send_sync<T: Send + Sync>() {}
    fn _check() {
        _assert_send_sync::<FftPlan>();
        _assert_send_sync::<RealFftPlan>();
    }
};

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_real_plan_dc() {
        let plan = RealFftPlan::new(16);
        let mut x = vec![1.0f32; 16];
        let spec = plan.process(&mut x);
        assert_eq!(spec.len(), 9);
        assert_relative_eq!(spec[0].re, 16.0, epsilon = 1e-4);
        assert_relative_eq!(spec[3].norm(), 0.0, epsilon = 1e-4);
    }

    #[test]
    fn test_roundtrip() {
        let plan = FftPlan::new(8);
        let orig: Vec<Complex32> = (0..8).map(|i| Complex32::new(i as f32, 0.0)).collect();
        let mut buf = orig.clone();
        plan.forward(&mut buf);
        plan.inverse(&mut buf);
        for (a, b) in orig.iter().zip(buf.iter()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-4);
        }
    }
}
