//! Example: Analyze a single ECG scan with the ONNX classifier
//!
//! Usage:
//!   cargo run --release --features ml --example analyze_scan -- \
//!       <scan.png> <model.onnx> [gradient.onnx]

#[cfg(feature = "ml")]
fn main() -> Result<(), Box<dyn std::error::Error>> {
    use cardiolens::ml::OnnxEcgClassifier;
    use cardiolens::{analyze, AnalysisConfig};
    use std::path::Path;

    // Initialize logger
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: analyze_scan <scan.png> <model.onnx> [gradient.onnx]");
        std::process::exit(2);
    }

    let image_bytes = std::fs::read(&args[1])?;
    let classifier = OnnxEcgClassifier::load(
        Path::new(&args[2]),
        args.get(3).map(Path::new),
    )?;

    let report = analyze(&image_bytes, &classifier, &AnalysisConfig::default())?;

    // Print results
    println!("Analysis Results:");
    println!(
        "  Diagnosis: {} (confidence: {:.2})",
        report.diagnosis, report.confidence
    );
    println!("  Risk level: {:?}", report.risk_level);
    println!(
        "  Consensus: {:?} ({:.0}%), agreed leads: {:?}",
        report.interpretability.consensus_level,
        report.interpretability.consensus_score,
        report.interpretability.common_leads
    );
    println!("  Processing time: {:.2} s", report.processing_time);
    println!();
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

#[cfg(not(feature = "ml"))]
fn main() {
    eprintln!("This example needs the ONNX classifier; rebuild with --features ml");
    std::process::exit(2);
}
