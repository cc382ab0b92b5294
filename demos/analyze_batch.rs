//! Example: Analyze multiple ECG scans in parallel
//!
//! Usage:
//!   cargo run --release --features ml --example analyze_batch -- \
//!       [--jobs N] <model.onnx> <scan1.png> <scan2.png> ...
//!
//! Notes:
//! - Parallelism is across scans (batch-level); the ONNX session serializes
//!   forward passes internally, so jobs mainly overlap pre/post-processing.
//! - Default workers: (available CPU threads - 1), keeping one core free.

#[cfg(feature = "ml")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cardiolens::ml::OnnxEcgClassifier;
    use cardiolens::{analyze, AnalysisConfig};
    use rayon::prelude::*;
    use std::path::Path;
    use std::time::Instant;

    env_logger::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    let mut jobs: Option<usize> = None;
    if args.first().map(String::as_str) == Some("--jobs") {
        args.remove(0);
        jobs = Some(args.remove(0).parse()?);
    }

    if args.len() < 2 {
        eprintln!("Usage: analyze_batch [--jobs N] <model.onnx> <scan1.png> ...");
        std::process::exit(2);
    }

    let model_path = args.remove(0);
    let paths = args;

    let jobs = jobs.unwrap_or_else(|| {
        std::thread::available_parallelism()
            .map(|n| n.get().saturating_sub(1).max(1))
            .unwrap_or(1)
    });
    eprintln!("Batch: {} scans, jobs={}", paths.len(), jobs);

    let classifier = OnnxEcgClassifier::load(Path::new(&model_path), None)?;
    let config = AnalysisConfig::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .build()
        .expect("Failed to build rayon thread pool");

    let results: Vec<(String, Result<String, String>)> = pool.install(|| {
        paths
            .par_iter()
            .map(|path| {
                let outcome = std::fs::read(path)
                    .map_err(|e| e.to_string())
                    .and_then(|bytes| {
                        analyze(&bytes, &classifier, &config).map_err(|e| e.to_string())
                    })
                    .map(|report| {
                        format!(
                            "{} (confidence {:.2}, risk {:?}, consensus {:?})",
                            report.diagnosis,
                            report.confidence,
                            report.risk_level,
                            report.interpretability.consensus_level
                        )
                    });
                (path.clone(), outcome)
            })
            .collect()
    });

    for (path, outcome) in &results {
        match outcome {
            Ok(line) => println!("{}: {}", path, line),
            Err(err) => eprintln!("{}: FAILED: {}", path, err),
        }
    }

    let failed = results.iter().filter(|(_, o)| o.is_err()).count();
    eprintln!(
        "Done: {}/{} succeeded in {:.2}s",
        results.len() - failed,
        results.len(),
        t0.elapsed().as_secs_f32()
    );

    Ok(())
}

#[cfg(not(feature = "ml"))]
fn main() {
    eprintln!("This example needs the ONNX classifier; rebuild with --features ml");
    std::process::exit(2);
}
