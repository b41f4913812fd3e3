//! Mel filterbank, decibel conversion and the orthonormal DCT.

/// Floor applied before taking logarithms of power values.
pub(crate) const AMIN: f64 = 1e-10;

/// Dynamic range kept below the peak of a log-power matrix.
pub(crate) const TOP_DB: f64 = 80.0;

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

/// Slaney mel scale: linear below 1 kHz, logarithmic above.
pub(crate) fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub(crate) fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// Area-normalized triangular mel filters from 0 Hz to Nyquist.
///
/// Returns `n_mels` rows of `n_fft / 2 + 1` weights.
pub(crate) fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let n_bins = n_fft / 2 + 1;
    let nyquist = sample_rate as f64 / 2.0;
    let fft_freqs: Vec<f64> = (0..n_bins)
        .map(|k| k as f64 * nyquist / (n_bins - 1).max(1) as f64)
        .collect();

    let max_mel = hz_to_mel(nyquist);
    let mel_points: Vec<f64> = (0..n_mels + 2)
        .map(|i| mel_to_hz(max_mel * i as f64 / (n_mels + 1) as f64))
        .collect();

    (0..n_mels)
        .map(|m| {
            let (left, centre, right) = (mel_points[m], mel_points[m + 1], mel_points[m + 2]);
            let enorm = 2.0 / (right - left);
            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - left) / (centre - left);
                    let upper = (right - f) / (right - centre);
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Projects per-frame power onto the filterbank, giving `[frame][mel]`.
pub(crate) fn mel_spectrogram<I>(power: I, filterbank: &[Vec<f64>]) -> Vec<Vec<f64>>
where
    I: IntoIterator,
    I::Item: AsRef<[f64]>,
{
    power
        .into_iter()
        .map(|frame| {
            let frame = frame.as_ref();
            filterbank
                .iter()
                .map(|filter| filter.iter().zip(frame).map(|(w, p)| w * p).sum())
                .collect()
        })
        .collect()
}

/// `10 * log10(max(power, AMIN))`.
pub(crate) fn power_to_db(power: f64) -> f64 {
    10.0 * power.max(AMIN).log10()
}

/// Converts a power matrix to dB and clips it to [`TOP_DB`] below its peak.
pub(crate) fn power_to_db_matrix(power: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut db: Vec<Vec<f64>> = power
        .iter()
        .map(|row| row.iter().map(|&p| power_to_db(p)).collect())
        .collect();
    let peak = db
        .iter()
        .flatten()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);
    let floor = peak - TOP_DB;
    for value in db.iter_mut().flatten() {
        *value = value.max(floor);
    }
    db
}

/// First `n_out` coefficients of the orthonormal DCT-II of `input`.
pub(crate) fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len();
    if n == 0 {
        return vec![0.0; n_out];
    }
    let scale_0 = (1.0 / n as f64).sqrt();
    let scale_k = (2.0 / n as f64).sqrt();
    (0..n_out.min(n))
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f64::consts::PI * k as f64 * (2 * i + 1) as f64 / (2 * n) as f64)
                        .cos()
                })
                .sum();
            sum * if k == 0 { scale_0 } else { scale_k }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mel_scale_round_trips() {
        for hz in [0.0, 100.0, 999.0, 1000.0, 4000.0, 11025.0] {
            assert!((mel_to_hz(hz_to_mel(hz)) - hz).abs() < 1e-6);
        }
        assert!((hz_to_mel(1000.0) - 15.0).abs() < 1e-12);
    }

    #[test]
    fn test_filterbank_shape_and_positivity() {
        let fb = mel_filterbank(22050, 2048, 128);
        assert_eq!(fb.len(), 128);
        assert!(fb.iter().all(|row| row.len() == 1025));
        assert!(fb.iter().flatten().all(|&w| w >= 0.0));
        // Upper filters are wide enough to always catch a bin.
        assert!(fb[127].iter().any(|&w| w > 0.0));
    }

    #[test]
    fn test_power_to_db_clips_to_top_db() {
        let db = power_to_db_matrix(&[vec![1.0, 0.0], vec![1e-3, 1e-12]]);
        assert_eq!(db[0][0], 0.0);
        assert_eq!(db[0][1], -80.0);
        assert!((db[1][0] + 30.0).abs() < 1e-9);
        assert_eq!(db[1][1], -80.0);
    }

    #[test]
    fn test_dct_of_constant_has_only_dc() {
        let coeffs = dct_ortho(&[1.0; 8], 4);
        assert!((coeffs[0] - 8f64.sqrt()).abs() < 1e-12);
        assert!(coeffs[1..].iter().all(|c| c.abs() < 1e-12));
    }
}
