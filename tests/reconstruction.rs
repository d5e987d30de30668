//! Analysis followed by synthesis reproduces the input.
//!
//! Tests cover:
//! - Noise and tones, whole-signal and interior ranges
//! - Chunked analysis against single-call analysis
//! - Chunked synthesis against single-call synthesis
//! - Negative and large time offsets
//! - Several band densities and overlaps

use approx::assert_relative_eq;
use gaborstream::utils::{max_abs_error, mse};
use gaborstream::{Analyzer, Coefs, Params};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const N: usize = 8192;

fn analyzer() -> Analyzer {
    let _ = env_logger::builder().is_test(true).try_init();
    Analyzer::new(&Params::new(6, 0.05).with_ff_ref(0.1)).unwrap()
}

fn noise(len: usize, seed: u64) -> Vec<f32> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..len).map(|_| rng.gen_range(-1.0f32..1.0)).collect()
}

fn relative_rms_error(expected: &[f32], actual: &[f32]) -> f32 {
    let power = expected.iter().map(|v| v * v).sum::<f32>() / expected.len() as f32;
    (mse(expected, actual) / power).sqrt()
}

/// Interior of `0..N` far enough from both ends to be unaffected by edges.
fn interior(a: &Analyzer) -> std::ops::Range<usize> {
    let margin = a.analysis_support_len() + a.synthesis_support_len();
    assert!(4 * margin < N, "support {margin} too long for test signal");
    margin..N - margin
}

#[test]
fn reconstructs_noise() {
    let a = analyzer();
    let x = noise(N, 1);
    let mut coefs = Coefs::new(&a);
    a.analyze(&x, 0, &mut coefs).unwrap();

    let range = interior(&a);
    let mut y = vec![0.0f32; range.len()];
    a.synthesize(&coefs, range.start as i64, &mut y).unwrap();

    let expected = &x[range];
    assert!(relative_rms_error(expected, &y) < 1e-4);
    assert!(max_abs_error(expected, &y) < 1e-3);
}

#[test]
fn reconstructs_across_layouts() {
    let _ = env_logger::builder().is_test(true).try_init();
    const LEN: usize = 16384;
    for bpo in [12, 24] {
        for overlap in [0.5, 1.5] {
            let params = Params::new(bpo, 0.08).with_ff_ref(0.1).with_overlap(overlap);
            let a = Analyzer::new(&params).unwrap();
            let margin = a.analysis_support_len() + a.synthesis_support_len();
            assert!(4 * margin < LEN, "bpo {bpo} overlap {overlap}: support {margin}");

            let x = noise(LEN, u64::from(bpo) + (overlap * 10.0) as u64);
            let mut coefs = Coefs::new(&a);
            for (i, chunk) in x.chunks(1500).enumerate() {
                a.analyze(chunk, (i * 1500) as i64 - 7000, &mut coefs).unwrap();
            }

            let mut y = vec![0.0f32; LEN - 2 * margin];
            a.synthesize(&coefs, margin as i64 - 7000, &mut y).unwrap();
            let expected = &x[margin..LEN - margin];
            let err = relative_rms_error(expected, &y);
            assert!(err < 1e-4, "bpo {bpo} overlap {overlap}: {err}");
            assert!(max_abs_error(expected, &y) < 1e-3, "bpo {bpo} overlap {overlap}");
        }
    }
}

#[test]
fn reconstructs_whole_zero_padded_signal() {
    // the zero padding is part of the signal, so the edges reconstruct too
    let a = analyzer();
    let x = noise(2048, 2);
    let mut coefs = Coefs::new(&a);
    a.analyze(&x, 0, &mut coefs).unwrap();

    let pad = a.synthesis_support_len();
    let mut y = vec![0.0f32; x.len() + 2 * pad];
    a.synthesize(&coefs, -(pad as i64), &mut y).unwrap();

    assert!(max_abs_error(&x, &y[pad..pad + x.len()]) < 1e-3);
    assert!(y[..pad].iter().all(|v| v.abs() < 1e-3));
    assert!(y[pad + x.len()..].iter().all(|v| v.abs() < 1e-3));
}

#[test]
fn reconstructs_tones_across_the_range() {
    let a = analyzer();
    for ff in [0.003, 0.05, 0.1, 0.237, 0.45] {
        let x: Vec<f32> = (0..N)
            .map(|n| (2.0 * std::f64::consts::PI * ff * n as f64).cos() as f32)
            .collect();
        let mut coefs = Coefs::new(&a);
        a.analyze(&x, 0, &mut coefs).unwrap();

        let range = interior(&a);
        let mut y = vec![0.0f32; range.len()];
        a.synthesize(&coefs, range.start as i64, &mut y).unwrap();
        assert!(relative_rms_error(&x[range], &y) < 1e-4, "ff {ff}");
    }
}

#[test]
fn reconstructs_dc() {
    let a = analyzer();
    let x = vec![0.25f32; N];
    let mut coefs = Coefs::new(&a);
    a.analyze(&x, 0, &mut coefs).unwrap();

    let range = interior(&a);
    let mut y = vec![0.0f32; range.len()];
    a.synthesize(&coefs, range.start as i64, &mut y).unwrap();
    for v in y {
        assert_relative_eq!(v, 0.25, epsilon = 1e-4);
    }
}

#[test]
fn chunked_analysis_matches_single_call() {
    let a = analyzer();
    let x = noise(N, 3);

    let mut whole = Coefs::new(&a);
    a.analyze(&x, 0, &mut whole).unwrap();

    let mut chunked = Coefs::new(&a);
    let mut begin = 0usize;
    for len in [1usize, 7, 64, 333, 1000, 2048].iter().cycle() {
        if begin >= N {
            break;
        }
        let end = (begin + len).min(N);
        a.analyze(&x[begin..end], begin as i64, &mut chunked).unwrap();
        begin = end;
    }

    let all_bands = -1000..1000;
    let all_times = i64::MIN..i64::MAX;
    let (v1, m1) = whole.read_with_meta(all_bands.clone(), all_times.clone());
    let (v2, m2) = chunked.read_with_meta(all_bands, all_times);
    assert_eq!(m1, m2);
    assert_eq!(whole.len(), chunked.len());
    for (c1, c2) in v1.iter().zip(&v2) {
        assert!((*c1 - *c2).norm() < 1e-5, "{c1} vs {c2}");
    }
}

#[test]
fn chunked_synthesis_matches_single_call() {
    let a = analyzer();
    let x = noise(4096, 4);
    let mut coefs = Coefs::new(&a);
    a.analyze(&x, 0, &mut coefs).unwrap();

    let mut whole = vec![0.0f32; 4096];
    a.synthesize(&coefs, 0, &mut whole).unwrap();

    let mut pieces = vec![0.0f32; 4096];
    let mut begin = 0;
    for chunk in pieces.chunks_mut(300) {
        a.synthesize(&coefs, begin as i64, chunk).unwrap();
        begin += chunk.len();
    }
    assert!(max_abs_error(&whole, &pieces) < 1e-6);
}

#[test]
fn synthesis_overwrites_output() {
    let a = analyzer();
    let coefs = Coefs::new(&a);
    let mut y = vec![3.0f32; 100];
    a.synthesize(&coefs, 0, &mut y).unwrap();
    assert!(y.iter().all(|&v| v == 0.0));
}

#[test]
fn time_offsets_are_shift_invariant() {
    let a = analyzer();
    let x = noise(3000, 5);

    for offset in [-1_000_003i64, -77, 0, 4096, 1 << 40] {
        let mut coefs = Coefs::new(&a);
        a.analyze(&x, offset, &mut coefs).unwrap();

        let margin = a.synthesis_support_len();
        let mut y = vec![0.0f32; x.len() - 2 * margin];
        a.synthesize(&coefs, offset + margin as i64, &mut y).unwrap();
        assert!(
            relative_rms_error(&x[margin..x.len() - margin], &y) < 1e-4,
            "offset {offset}"
        );
    }
}
