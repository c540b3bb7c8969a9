use std::f64::consts::PI;
#[derive(Clone, Copy, Debug)]
pub enum FilterKind {
    Bandpass { low_hz: f64, high_hz: f64, q: f64 },
    Bandstop { low_hz: f64, high_hz: f64, q: f64 },
}
#[derive(Clone, Copy, Debug)]
struct BiquadCoeffs {
    b0: f64,
    b1: f64,
    b2: f64,
    a1: f64,
    a2: f64,
}
#[derive(Clone, Copy, Debug, Default)]
struct BiquadState {
    z1: f64,
    z2: f64,
}
#[derive(Clone, Copy, Debug)]
struct BiquadFilter {
    coeffs: BiquadCoeffs,
    state: BiquadState,
}
impl BiquadFilter {
    fn new(coeffs: BiquadCoeffs) -> Self {
        Self {
            coeffs,
            state: BiquadState::default(),
        }
    }
    fn process(&mut self, input: f64) -> f64 {
        // Transposed direct form II
        let y = self.coeffs.b0 * input + self.state.z1;
        self.state.z1 = self.coeffs.b1 * input - self.coeffs.a1 * y + self.state.z2;
        self.state.z2 = self.coeffs.b2 * input - self.coeffs.a2 * y;
        y
    }
}
/// Cascade of biquad sections applied sample by sample.
#[derive(Default, Debug)]
pub struct FilterChain {
    sections: Vec<BiquadFilter>,
}
impl FilterChain {
    pub fn from_kinds(sample_rate_hz: f64, kinds: &[FilterKind]) -> Self {
        let mut sections = Vec::new();
        for kind in kinds {
            sections.push(design_section(sample_rate_hz, *kind));
        }
        Self { sections }
    }
    pub fn process_sample(&mut self, mut value: f64) -> f64 {
        for section in &mut self.sections {
            value = section.process(value);
        }
        value
    }
    pub fn process_in_place(&mut self, samples: &mut [f64]) {
        for sample in samples.iter_mut() {
            *sample = self.process_sample(*sample);
        }
    }
}
/// Conditioning applied before band powers: 2-45 Hz band-pass plus 50/60 Hz mains rejection.
pub fn eeg_conditioning(sample_rate_hz: f64) -> FilterChain {
    FilterChain::from_kinds(
        sample_rate_hz,
        &[
            FilterKind::Bandpass {
                low_hz: 2.0,
                high_hz: 45.0,
                q: 0.707,
            },
            FilterKind::Bandstop {
                low_hz: 48.0,
                high_hz: 52.0,
                q: 30.0,
            },
            FilterKind::Bandstop {
                low_hz: 58.0,
                high_hz: 62.0,
                q: 30.0,
            },
        ],
    )
}
fn design_section(sample_rate_hz: f64, kind: FilterKind) -> BiquadFilter {
    let nyquist = sample_rate_hz * 0.5;
    let coeffs = match kind {
        FilterKind::Bandpass { low_hz, high_hz, q } => {
            let (low, high) = band_edges(low_hz, high_hz, nyquist);
            let center = (low * high).sqrt();
            bandpass(center, sample_rate_hz, band_q(q, center, high - low))
        }
        FilterKind::Bandstop { low_hz, high_hz, q } => {
            let (low, high) = band_edges(low_hz, high_hz, nyquist);
            let center = (low * high).sqrt();
            notch(center, sample_rate_hz, band_q(q, center, high - low))
        }
    };
    BiquadFilter::new(coeffs)
}
fn band_q(q: f64, center: f64, width: f64) -> f64 {
    q.clamp(0.1, 100.0).min(center / width.max(1e-6))
}
fn nyquist_clamp(freq_hz: f64, nyquist: f64) -> f64 {
    freq_hz.clamp(0.01, nyquist - 0.01)
}
fn band_edges(low_hz: f64, high_hz: f64, nyquist: f64) -> (f64, f64) {
    let low = nyquist_clamp(low_hz.min(high_hz), nyquist);
    let high = nyquist_clamp(low_hz.max(high_hz), nyquist);
    (low, high)
}
fn bandpass(center_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    // Constant 0 dB peak gain form.
    let w0 = 2.0 * PI * center_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    normalize(alpha, 0.0, -alpha, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
}
fn notch(center_hz: f64, sample_rate_hz: f64, q: f64) -> BiquadCoeffs {
    let w0 = 2.0 * PI * center_hz / sample_rate_hz;
    let alpha = w0.sin() / (2.0 * q);
    let cos_w0 = w0.cos();
    normalize(1.0, -2.0 * cos_w0, 1.0, 1.0 + alpha, -2.0 * cos_w0, 1.0 - alpha)
}
fn normalize(b0: f64, b1: f64, b2: f64, a0: f64, a1: f64, a2: f64) -> BiquadCoeffs {
    let a0_inv = 1.0 / a0;
    BiquadCoeffs {
        b0: b0 * a0_inv,
        b1: b1 * a0_inv,
        b2: b2 * a0_inv,
        a1: a1 * a0_inv,
        a2: a2 * a0_inv,
    }
}
#[cfg(test)]
mod tests {
    use super::*;
    fn steady_state_rms(chain: &mut FilterChain, freq_hz: f64, sample_rate_hz: f64) -> f64 {
        let samples: Vec<f64> = (0..4000)
            .map(|i| (2.0 * PI * freq_hz * i as f64 / sample_rate_hz).sin())
            .map(|x| chain.process_sample(x))
            .collect();
        let tail = &samples[2000..];
        (tail.iter().map(|v| v * v).sum::<f64>() / tail.len() as f64).sqrt()
    }
    #[test]
    fn mains_bandstop_suppresses_fifty_hertz() {
        let mains = [FilterKind::Bandstop {
            low_hz: 48.0,
            high_hz: 52.0,
            q: 30.0,
        }];
        let mut chain = FilterChain::from_kinds(250.0, &mains);
        assert!(steady_state_rms(&mut chain, 50.0, 250.0) < 0.01);
        let mut chain = FilterChain::from_kinds(250.0, &mains);
        assert!(steady_state_rms(&mut chain, 10.0, 250.0) > 0.6);
    }
    #[test]
    fn conditioning_passes_alpha_and_rejects_dc() {
        let mut chain = eeg_conditioning(250.0);
        let mut dc = vec![5.0; 4000];
        chain.process_in_place(&mut dc);
        assert!(dc[3999].abs() < 1e-3);
        let mut chain = eeg_conditioning(250.0);
        assert!(steady_state_rms(&mut chain, 10.0, 250.0) > 0.3);
    }
}
