//! Windowed sinc coefficient design.

use std::f64::consts::PI;

/// Window applied to the ideal impulse response.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Window {
    Rectangular,
    Hamming,
    Blackman,
}

impl Window {
    /// Generate window coefficients for the given length.
    pub fn generate(self, len: usize) -> Vec<f64> {
        if len < 2 {
            return vec![1.0; len];
        }

        let m = (len - 1) as f64;

        (0..len).map(|n| {
            let x = 2.0 * PI * n as f64 / m;

            match self {
                Window::Rectangular => 1.0,
                Window::Hamming => 0.54 - 0.46 * x.cos(),
                Window::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
            }
        }).collect()
    }

    /// Approximate transition width, in units of `1 / taps`, of a filter using this
    /// window.
    fn transition_factor(self) -> f64 {
        match self {
            Window::Rectangular => 0.9,
            Window::Hamming => 3.3,
            Window::Blackman => 5.5,
        }
    }
}

/// Design a low-pass filter with the given cutoff (as a fraction of the sample rate) and
/// number of taps, rounded up to an odd number. The result has unity gain at DC.
pub fn sinc_lowpass(cutoff: f64, taps: usize, window: Window) -> Vec<f32> {
    assert!(cutoff > 0.0 && cutoff < 0.5);

    let taps = taps | 1;
    let mid = (taps / 2) as f64;
    let win = window.generate(taps);

    let coefs: Vec<f64> = win.iter().enumerate().map(|(i, w)| {
        let x = i as f64 - mid;

        let sinc = if x == 0.0 {
            2.0 * cutoff
        } else {
            (2.0 * PI * cutoff * x).sin() / (PI * x)
        };

        sinc * w
    }).collect();

    let sum: f64 = coefs.iter().sum();

    coefs.iter().map(|c| (c / sum) as f32).collect()
}

/// Design a low-pass filter passing up to `pass` Hz and stopping from `stop` Hz, with
/// enough taps for the window's transition width.
pub fn lowpass(sample_rate: f64, pass: f64, stop: f64, window: Window) -> Vec<f32> {
    assert!(pass < stop);

    let transition = (stop - pass) / sample_rate;
    let taps = (window.transition_factor() / transition).ceil() as usize;

    sinc_lowpass((pass + stop) / 2.0 / sample_rate, taps, window)
}

/// Design a half-band filter: cutoff at a quarter of the sample rate, with every tap at
/// a nonzero even offset from the center exactly zero. `taps` must be 3 more than a
/// multiple of 4 so the outermost taps are nonzero.
pub fn halfband(taps: usize, window: Window) -> Vec<f32> {
    assert!(taps % 4 == 3);

    let mid = taps / 2;
    let mut coefs = sinc_lowpass(0.25, taps, window);

    for (i, c) in coefs.iter_mut().enumerate() {
        if i != mid && (i as isize - mid as isize) % 2 == 0 {
            *c = 0.0;
        }
    }

    coefs
}

#[cfg(test)]
mod test {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    fn response(coefs: &[f32], freq: f64) -> f64 {
        let (re, im) = coefs.iter().enumerate().fold((0.0, 0.0), |(re, im), (i, &c)| {
            let w = 2.0 * PI * freq * i as f64;
            (re + c as f64 * w.cos(), im - c as f64 * w.sin())
        });

        (re * re + im * im).sqrt()
    }

    #[test]
    fn test_window() {
        let w = Window::Hamming.generate(5);
        assert_approx_eq!(w[0], 0.08);
        assert_approx_eq!(w[2], 1.0);
        assert_approx_eq!(w[4], 0.08);

        let w = Window::Blackman.generate(3);
        assert_approx_eq!(w[0], 0.0);
        assert_approx_eq!(w[1], 1.0);

        assert_eq!(Window::Rectangular.generate(4), vec![1.0; 4]);
        assert_eq!(Window::Hamming.generate(1), vec![1.0]);
    }

    #[test]
    fn test_lowpass() {
        let coefs = lowpass(8000.0, 200.0, 300.0, Window::Hamming);
        assert_eq!(coefs.len(), 265);

        // Symmetric, unity DC gain.
        for i in 0..coefs.len() / 2 {
            assert_approx_eq!(coefs[i], coefs[coefs.len() - 1 - i]);
        }

        assert_approx_eq!(coefs.iter().sum::<f32>(), 1.0, 1e-5);

        assert!(response(&coefs, 100.0 / 8000.0) > 0.98);
        assert!(response(&coefs, 134.4 / 8000.0) > 0.98);
        assert!(response(&coefs, 400.0 / 8000.0) < 0.01);
    }

    #[test]
    fn test_sinc_lowpass() {
        assert_eq!(sinc_lowpass(0.1, 10, Window::Blackman).len(), 11);
        assert_eq!(sinc_lowpass(0.1, 11, Window::Blackman).len(), 11);
    }

    #[test]
    fn test_halfband() {
        let coefs = halfband(31, Window::Blackman);

        assert_eq!(coefs.len(), 31);
        assert_approx_eq!(coefs[15], 0.5, 1e-3);

        for i in (1..15).step_by(2) {
            assert_eq!(coefs[i], 0.0);
            assert_eq!(coefs[30 - i], 0.0);
        }

        for i in (0..15).step_by(2) {
            assert!(coefs[i] != 0.0 || i == 0);
        }

        assert!(response(&coefs, 0.05) > 0.99);
        assert!(response(&coefs, 0.45) < 0.01);
    }
}
