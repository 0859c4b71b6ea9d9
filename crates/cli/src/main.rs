mod cli;
mod view;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = metascan_core::logging::init_logging("cli", false);
    cli::run()
}
