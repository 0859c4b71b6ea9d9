mod inspect;
mod matching;
mod resolve;
mod scan;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "metascan",
    version,
    about = "Scans compiled class trees and archives for annotated candidate types",
    long_about = "Metascan resolves Ant-style location patterns over class-path roots \
                  (directories and .jar/.zip/.war archives), reads class-file metadata \
                  without loading classes, and filters candidates by annotations, \
                  meta-annotations and name patterns."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Find candidate types matching the include/exclude filters
    #[command(long_about = "Resolves a location pattern (or a base package) against the given roots \
                            and prints every concrete, independent type that passes the filters. \
                            Exclude filters win over include filters.")]
    Scan {
        /// Location pattern, e.g. 'classpath*:com/example/**/*.class'
        #[arg(value_name = "PATTERN", conflicts_with = "package")]
        pattern: Option<String>,

        /// Base package to scan instead of an explicit pattern
        #[arg(short, long)]
        package: Option<String>,

        /// Class-path root (directory or archive); repeatable
        #[arg(short, long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,

        /// Annotation type that makes a type a candidate; repeatable
        #[arg(short, long)]
        include: Vec<String>,

        /// Annotation type that excludes a type; repeatable
        #[arg(short, long)]
        exclude: Vec<String>,

        /// Class name regex that makes a type a candidate; repeatable
        #[arg(long)]
        include_regex: Vec<String>,

        /// Class name regex that excludes a type; repeatable
        #[arg(long)]
        exclude_regex: Vec<String>,

        /// JSON scan configuration; command line options are added on top
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Skip undecodable class files instead of aborting
        #[arg(long)]
        skip_decode_errors: bool,

        /// Read class files in parallel
        #[arg(long)]
        parallel: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the resources a location pattern resolves to
    Resolve {
        /// Location pattern, e.g. 'classpath*:**/*.class' or 'jar:file:/libs/a.jar!/**/*.class'
        #[arg(value_name = "PATTERN")]
        pattern: String,

        /// Class-path root (directory or archive); repeatable
        #[arg(short, long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },
    /// Print the metadata of one class file as JSON
    Inspect {
        /// Resource location ('classpath:a/b/C.class', a file path, a jar URL) or a class name
        #[arg(value_name = "RESOURCE")]
        resource: String,

        /// Class-path root (directory or archive); repeatable
        #[arg(short, long = "root", value_name = "ROOT")]
        roots: Vec<PathBuf>,
    },
    /// Evaluate a glob pattern against a path
    Match {
        #[arg(value_name = "PATTERN")]
        pattern: String,

        #[arg(value_name = "PATH")]
        path: String,

        /// Test whether the pattern could match a path starting with PATH
        #[arg(long)]
        start: bool,
    },
}

pub fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Scan {
            pattern,
            package,
            roots,
            include,
            exclude,
            include_regex,
            exclude_regex,
            config,
            skip_decode_errors,
            parallel,
            json,
        } => scan::run(scan::ScanArgs {
            pattern,
            package,
            roots,
            include,
            exclude,
            include_regex,
            exclude_regex,
            config,
            skip_decode_errors,
            parallel,
            json,
        }),
        Commands::Resolve { pattern, roots } => resolve::run(pattern, roots),
        Commands::Inspect { resource, roots } => inspect::run(resource, roots),
        Commands::Match {
            pattern,
            path,
            start,
        } => matching::run(pattern, path, start),
    }
}
