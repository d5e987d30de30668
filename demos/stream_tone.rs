//! Streaming Frequency Tracking Example
//!
//! This example feeds a synthetic melody through the filterbank in small
//! blocks, as an audio callback would, and reports the dominant band of
//! each block once its coefficients are complete:
//! - Incremental analysis with `Analyzer::analyze`
//! - Reading a settled time range with `Coefs::read_with_meta`
//! - Bounding memory with `Coefs::forget_before`

use gaborstream::{convert, Analyzer, Coefs, Params};
use log::info;

fn main() -> gaborstream::Result<()> {
    env_logger::init();
    info!("Streaming Frequency Tracking Example");

    let sr = 16000;
    let block = 2048usize;
    let notes = [440.0, 523.25, 659.25, 880.0];

    let params = Params::from_hz(12, 200.0, 440.0, sr);
    let analyzer = Analyzer::new(&params)?;
    let mut coefs = Coefs::new(&analyzer);
    let latency = analyzer.analysis_support_len() as i64;
    info!(
        "{} bands, analysis latency {} samples ({:.1} ms)",
        analyzer.band_count(),
        latency,
        1000.0 * convert::samples_to_time(latency, sr)
    );

    let bandpass = analyzer.bandpass_bands_begin()..analyzer.bandpass_bands_end();
    let mut t_in = 0i64;
    let mut t_out = 0i64;

    for (i, &hz) in notes.iter().enumerate() {
        // four blocks per note
        for _ in 0..4 {
            let samples: Vec<f32> = (0..block as i64)
                .map(|n| {
                    let t = convert::samples_to_time(t_in + n, sr);
                    0.5 * (2.0 * std::f64::consts::PI * hz * t).sin() as f32
                })
                .collect();
            analyzer.analyze(&samples, t_in, &mut coefs)?;
            t_in += block as i64;

            // everything up to t_in - latency has seen all of its input
            let settled = t_in - latency;
            if settled <= t_out {
                continue;
            }
            let (values, metas) = coefs.read_with_meta(bandpass.clone(), t_out..settled);
            if let Some((c, meta)) = values
                .iter()
                .zip(&metas)
                .max_by(|a, b| a.0.norm().total_cmp(&b.0.norm()))
            {
                let ff = analyzer.band_ff(meta.band)?;
                info!(
                    "note {} ({} Hz): samples {}..{} peak band {} at {:.1} Hz, magnitude {:.3}",
                    i,
                    hz,
                    t_out,
                    settled,
                    meta.band,
                    convert::ff_to_hz(ff, sr),
                    c.norm()
                );
            }
            t_out = settled;
            coefs.forget_before(&analyzer, t_out, true)?;
            info!("  {} coefficients retained", coefs.len());
        }
    }

    Ok(())
}
