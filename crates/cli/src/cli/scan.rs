use crate::view::CandidateView;
use metascan_core::{ClassPathScanner, DecodeErrorPolicy, ScanConfig};
use std::path::PathBuf;
use tabled::{Table, settings::Style};

pub struct ScanArgs {
    pub pattern: Option<String>,
    pub package: Option<String>,
    pub roots: Vec<PathBuf>,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub include_regex: Vec<String>,
    pub exclude_regex: Vec<String>,
    pub config: Option<PathBuf>,
    pub skip_decode_errors: bool,
    pub parallel: bool,
    pub json: bool,
}

pub fn build_config(args: &ScanArgs) -> Result<ScanConfig, Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => ScanConfig::load(path)?,
        None => ScanConfig::default(),
    };
    config.roots.extend(args.roots.iter().cloned());
    config.include_annotations.extend(args.include.iter().cloned());
    config.exclude_annotations.extend(args.exclude.iter().cloned());
    config.include_patterns.extend(args.include_regex.iter().cloned());
    config.exclude_patterns.extend(args.exclude_regex.iter().cloned());
    if args.skip_decode_errors {
        config.decode_errors = DecodeErrorPolicy::Skip;
    }
    config.parallel |= args.parallel;
    Ok(config)
}

pub fn run(args: ScanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = build_config(&args)?;
    if config.roots.is_empty() {
        return Err("no class-path roots given; use --root or a config file".into());
    }

    let scanner = ClassPathScanner::from_config(&config)?;
    let report = match (&args.pattern, &args.package) {
        (Some(pattern), _) => scanner.scan(pattern)?,
        (None, Some(package)) => scanner.scan_package(package)?,
        (None, None) => return Err("either a PATTERN or --package is required".into()),
    };

    if args.json {
        let candidates: Vec<_> = report.candidates.iter().map(|c| c.metadata()).collect();
        let output = serde_json::json!({
            "candidates": candidates,
            "stats": report.stats,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let views: Vec<CandidateView> = report
        .candidates
        .iter()
        .map(|c| CandidateView::from_reader(c))
        .collect();
    if views.is_empty() {
        println!("No candidates found.");
    } else {
        println!("{}", Table::new(&views).with(Style::psql()));
    }
    let stats = &report.stats;
    println!(
        "\n{} resources, {} candidates, {} filtered out, {} rejected, {} unreadable, {} decode failures ({:?})",
        stats.resources,
        stats.candidates,
        stats.filtered_out,
        stats.rejected,
        stats.unreadable,
        stats.decode_failures,
        stats.duration
    );
    Ok(())
}
