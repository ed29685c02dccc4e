//! # measure-press CLI
//!
//! Usage:
//!   measure-press measures.json -o out/ --name report
//!   cat measures.json | measure-press -o out/ --config render.json --force
//!   measure-press --example > measure.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process;

use measure_press::{write_pdf, PressError, RenderConfig};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_measure_json());
        return;
    }

    if let Err(e) = run(&args) {
        eprintln!("✗ {}", e);
        process::exit(1);
    }
}

fn run(args: &[String]) -> Result<(), PressError> {
    let input_path = args.get(1).filter(|a| !a.starts_with('-'));
    let input = match input_path {
        Some(path) => fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut config = match flag_value(args, "--config") {
        Some(path) => RenderConfig::from_path(Path::new(path))?,
        None => RenderConfig::default(),
    };
    if args.iter().any(|a| a == "--force") {
        config.overwrite = true;
    }

    let dir = PathBuf::from(flag_value(args, "-o").unwrap_or("."));
    let name = match flag_value(args, "--name") {
        Some(name) => name.to_string(),
        None => input_path
            .and_then(|p| Path::new(p).file_stem())
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "measures".to_string()),
    };

    let path = write_pdf(&input, &config, &dir, &name)?;
    eprintln!("✓ Written {}", path.display());
    Ok(())
}

fn flag_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

fn example_measure_json() -> &'static str {
    r##"{
  "id": "SWWH025",
  "name": "Heat Pump Water Heater, Residential",
  "version": "03",
  "owner": "Program Administrator",
  "created": "2024-01-15",
  "lastModified": "2025-06-30",
  "effectiveStart": "2025-01-01",
  "description": "Replacement of an electric resistance storage water heater with a heat pump water heater.",
  "characterizations": {
    "technology_summary": "<p>A heat pump water heater moves heat from the surrounding air into the tank <span data-ref=\"1\">[1]</span>. Rated efficiency is expressed as UEF<sub>HP</sub> and typically exceeds 3.0 at 67&deg;F.</p><ul><li>Integrated units</li><li>Split systems with an outdoor compressor</li></ul><div data-value-table=\"UEC\"></div>",
    "base_case_description": "<p>The base case is an <strong>electric resistance</strong> storage water heater.</p>"
  },
  "valueTables": [
    {
      "name": "Unit Energy Consumption",
      "apiName": "UEC",
      "columns": [
        { "name": "Climate Zone", "apiName": "cz" },
        { "name": "Base UEC", "apiName": "baseKwh", "unit": "kWh" },
        { "name": "Measure UEC", "apiName": "measKwh", "unit": "kWh" }
      ],
      "rows": [
        ["CZ01", "3120", "1180"],
        ["CZ02", "3050", "1105"],
        ["CZ03", "2990", "1040"]
      ]
    }
  ],
  "sharedParameters": [
    { "name": "Sector", "version": "1", "labels": ["Res"] },
    { "name": "DeliveryType", "version": "2", "labels": ["DnDeemed", "UpDeemed"] }
  ]
}
"##
}
