//! Summary statistics and spectrum peak of one slice line.
//!
//! Runs on the consumer side only (the `inspect` command reads slice lines
//! back from a pipe); nothing here is real-time safe.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};
use serde::Serialize;

/// Level statistics of a block of samples.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SliceStats {
    pub count: usize,
    pub min: i32,
    pub max: i32,
    pub mean: f64,
    pub rms: f64,
}

impl SliceStats {
    /// Returns `None` for an empty block.
    pub fn from_samples(samples: &[i32]) -> Option<Self> {
        let first = *samples.first()?;
        let mut min = first;
        let mut max = first;
        let mut sum = 0f64;
        let mut sum_sq = 0f64;
        for &s in samples {
            min = min.min(s);
            max = max.max(s);
            let v = s as f64;
            sum += v;
            sum_sq += v * v;
        }
        let n = samples.len() as f64;
        Some(Self {
            count: samples.len(),
            min,
            max,
            mean: sum / n,
            rms: (sum_sq / n).sqrt(),
        })
    }

    /// Peak level relative to full scale of a 32-bit sample, in dBFS.
    pub fn peak_dbfs(&self) -> f64 {
        let peak = (self.min as f64).abs().max(self.max as f64).max(1.0);
        20.0 * (peak / i32::MAX as f64).log10()
    }
}

/// Strongest non-DC component of a spectrum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpectrumPeak {
    pub frequency_hz: f32,
    /// Single-sided amplitude (`2/N · |X[k]|`) in sample units.
    pub amplitude: f32,
}

/// Hann-windowed magnitude spectrum for a fixed block length.
///
/// The FFT plan and window are built once per length and reused.
pub struct SpectrumAnalyzer {
    len: usize,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    buf: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    pub fn new(len: usize) -> Self {
        let fft = FftPlanner::<f32>::new().plan_fft_forward(len.max(1));
        Self {
            len,
            fft,
            window: build_hann_window(len),
            buf: vec![Complex::new(0.0, 0.0); len.max(1)],
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Single-sided magnitudes for bins `0..=len/2`. Shorter input is
    /// zero-padded, longer input truncated.
    pub fn magnitudes(&mut self, samples: &[i32]) -> Vec<f32> {
        if self.len == 0 {
            return Vec::new();
        }
        for (i, slot) in self.buf.iter_mut().enumerate() {
            let s = samples.get(i).copied().unwrap_or(0) as f32;
            *slot = Complex::new(s * self.window[i], 0.0);
        }
        self.fft.process(&mut self.buf);

        // Hann coherent gain is 0.5; undo it so a full-scale sine reads ~A.
        let scale = 2.0 / (self.len as f32 * 0.5);
        self.buf[..=self.len / 2]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }

    /// Strongest bin above DC, with its centre frequency at `sample_rate`.
    pub fn peak(&mut self, samples: &[i32], sample_rate: u32) -> Option<SpectrumPeak> {
        let mags = self.magnitudes(samples);
        let (bin, amplitude) = mags
            .iter()
            .copied()
            .enumerate()
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        Some(SpectrumPeak {
            frequency_hz: bin as f32 * sample_rate as f32 / self.len as f32,
            amplitude,
        })
    }
}

fn build_hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / len as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sine(freq: f32, rate: u32, len: usize, amplitude: f32) -> Vec<i32> {
        (0..len)
            .map(|i| {
                let t = i as f32 / rate as f32;
                (amplitude * (2.0 * std::f32::consts::PI * freq * t).sin()) as i32
            })
            .collect()
    }

    #[test]
    fn stats_of_constant_block() {
        let stats = SliceStats::from_samples(&[5, 5, 5, 5]).unwrap();
        assert_eq!(stats.count, 4);
        assert_eq!(stats.min, 5);
        assert_eq!(stats.max, 5);
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.rms, 5.0);
    }

    #[test]
    fn stats_of_square_wave() {
        let samples: Vec<i32> = (0..256).map(|i| if i % 2 == 0 { 100 } else { -100 }).collect();
        let stats = SliceStats::from_samples(&samples).unwrap();
        assert_relative_eq!(stats.mean, 0.0);
        assert_relative_eq!(stats.rms, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn stats_of_empty_block() {
        assert!(SliceStats::from_samples(&[]).is_none());
    }

    #[test]
    fn full_scale_peak_is_zero_dbfs() {
        let stats = SliceStats::from_samples(&[i32::MAX, -i32::MAX]).unwrap();
        assert_relative_eq!(stats.peak_dbfs(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn finds_sine_frequency() {
        let rate = 8_000;
        let len = 1_024;
        // Bin-centred: 64 * 8000 / 1024 = 500 Hz.
        let samples = sine(500.0, rate, len, 1_000_000.0);
        let mut analyzer = SpectrumAnalyzer::new(len);
        let peak = analyzer.peak(&samples, rate).unwrap();
        assert_relative_eq!(peak.frequency_hz, 500.0, epsilon = 1e-3);
        assert_relative_eq!(peak.amplitude, 1_000_000.0, max_relative = 0.05);
    }

    #[test]
    fn short_input_is_zero_padded() {
        let mut analyzer = SpectrumAnalyzer::new(16);
        let mags = analyzer.magnitudes(&[1, 2, 3]);
        assert_eq!(mags.len(), 9);
    }

    #[test]
    fn zero_length_analyzer_yields_nothing() {
        let mut analyzer = SpectrumAnalyzer::new(0);
        assert!(analyzer.is_empty());
        assert!(analyzer.peak(&[1, 2], 48_000).is_none());
    }
}
