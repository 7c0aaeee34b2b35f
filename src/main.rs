use anyhow::{bail, Context};
use eventlab::config::ConfigManager;
use eventlab::data::{bars_from_frame, importance_to_frame, labels_to_frame, CsvConnector};
use eventlab::Pipeline;
use std::path::Path;

const USAGE: &str = "usage: eventlab <config.toml | --defaults> <prices.csv>...";

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some((config_arg, csv_paths)) = args.split_first() else {
        bail!(USAGE);
    };
    if csv_paths.is_empty() {
        bail!(USAGE);
    }

    let manager = ConfigManager::new();
    if config_arg != "--defaults" {
        manager
            .load_from_file(config_arg)
            .with_context(|| format!("loading configuration {}", config_arg))?;
    }
    let pipeline = Pipeline::new(manager.get()?)?;

    let mut instruments = Vec::with_capacity(csv_paths.len());
    for path in csv_paths {
        let df = CsvConnector::load_and_validate(path, None)
            .with_context(|| format!("loading prices from {}", path))?;
        let meta = CsvConnector::create_metadata(path, &df)?;
        log::info!(
            "{}: {} rows, prices {:?}, dates {:?}",
            meta.file_path,
            meta.num_rows,
            meta.price_range,
            meta.date_range
        );

        let name = Path::new(path)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        instruments.push((name, bars_from_frame(&df)?));
    }

    let report = pipeline.run_portfolio(&instruments)?;
    for (name, output) in &report.instruments {
        println!("== {} ==", name);
        println!("{}", labels_to_frame(&output.labels)?);
        println!("{}", importance_to_frame(&output.importance)?);
    }
    if report.instruments.len() > 1 {
        println!("== joined ==");
        println!("{}", importance_to_frame(&report.importance)?);
    }
    println!("selected features: {:?}", report.selected);

    Ok(())
}
