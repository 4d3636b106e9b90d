//! Loudness metering over the most recent samples played by a sink.
//!
//! Sinks keep a short rolling window of what they wrote in a
//! [`MeterBuffer`]; the router reads a snapshot of it on demand and reduces it
//! to a single level with [`calculate_rms_level`].

mod ring_buffer;

pub use ring_buffer::MeterBuffer;

/// Effective silence floor for 16-bit audio in dB.
pub const SILENCE_FLOOR_DB: f32 = -96.0;

/// Computes the RMS level of a sample window, in sample units.
///
/// The window's DC offset (its mean) is removed first, so a constant signal
/// reads as silence. The result is rounded to the nearest integer; an empty
/// window yields 0.
///
/// # Example
///
/// ```
/// use dsp_router::meter::calculate_rms_level;
///
/// // Square wave of amplitude 1000
/// let square: Vec<i16> = (0..480).map(|i| if i % 2 == 0 { 1000 } else { -1000 }).collect();
/// assert_eq!(calculate_rms_level(&square), 1000);
///
/// assert_eq!(calculate_rms_level(&[]), 0);
/// ```
pub fn calculate_rms_level(samples: &[i16]) -> i32 {
    if samples.is_empty() {
        return 0;
    }
    let count = samples.len() as f64;
    let mean = samples.iter().map(|&s| f64::from(s)).sum::<f64>() / count;
    let sum_squares: f64 = samples
        .iter()
        .map(|&s| (f64::from(s) - mean).powi(2))
        .sum();
    (sum_squares / count).sqrt().round() as i32
}

/// Converts an RMS level in sample units to dB relative to `i16::MAX`.
///
/// Levels at or below zero map to [`SILENCE_FLOOR_DB`].
pub fn rms_to_dbfs(level: i32) -> f32 {
    if level <= 0 {
        return SILENCE_FLOOR_DB;
    }
    let db = 20.0 * (f64::from(level) / f64::from(i16::MAX)).log10();
    (db as f32).max(SILENCE_FLOOR_DB)
}
