/*!
Extract commodity price series from saved chart SVGs into a single CSV file
*/

use anyhow::{bail, format_err, Context};
use chartcast::chart::{extract, series::write_series, ChartDocument, ExtractOptions, Series};
use chartcast::config::Config;
use chartcast::logging;
use chartcast::source::{recent_svg, ChartRequest, ChartSource, DirectorySource, FileSource};
use chrono::Weekday;
use clap::{App, Arg};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

fn extract_one(
    source: &mut dyn ChartSource,
    request: &ChartRequest,
    config: &Config,
    options: &ExtractOptions,
) -> anyhow::Result<Series> {
    let markup = source.fetch(request)?;
    let doc = ChartDocument::parse(&markup, &config.chart.layout)?;
    let series = extract(&doc, options)?;
    Ok(series)
}

pub fn main() -> anyhow::Result<()> {
    // Initialization, argument parsing
    let matches = App::new("Chart Extract")
        .version("0.1")
        .about("Recovers daily price series from rendered commodity price charts")
        .arg(
            Arg::with_name("COMMODITIES")
                .help("Commodities to extract. Defaults to the configured list")
                .multiple(true),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("dir")
                .short("d")
                .long("dir")
                .help("Directory holding saved charts, named <commodity>_<span>.svg or <commodity>.svg")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("svg")
                .long("svg")
                .help("Read a single chart file, for a single commodity")
                .takes_value(true)
                .conflicts_with("dir"),
        )
        .arg(
            Arg::with_name("latest")
                .long("latest")
                .help("Read the most recently saved chart in the chart directory, for a single commodity")
                .conflicts_with("svg"),
        )
        .arg(
            Arg::with_name("since")
                .long("since")
                .help("With --latest, only accept a chart saved within this many seconds")
                .takes_value(true)
                .requires("latest"),
        )
        .arg(
            Arg::with_name("span")
                .short("s")
                .long("span")
                .help("Chart span: 1Y, 5Y, 10Y, 25Y, MAX")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .help("Output CSV file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("align-weekday")
                .long("align-weekday")
                .help("Snap extracted dates to the nearest given weekday, e.g. Fri")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("cleanup")
                .long("cleanup")
                .help("Delete chart files once they have been read"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .multiple(true)
                .help("Sets the level of verbosity"),
        )
        .get_matches();

    logging::init(matches.occurrences_of("verbose"));

    let mut config = Config::load(matches.value_of("config").map(Path::new))?;
    if let Some(commodities) = matches.values_of_lossy("COMMODITIES") {
        config.chart.commodities = commodities;
    }
    if let Some(dir) = matches.value_of("dir") {
        config.chart.svg_dir = PathBuf::from(dir);
    }
    if let Some(span) = matches.value_of("span") {
        config.chart.span = span.parse()?;
    }
    if let Some(output) = matches.value_of("output") {
        config.chart.output = PathBuf::from(output);
    }
    if let Some(weekday) = matches.value_of("align-weekday") {
        let weekday: Weekday = weekday
            .parse()
            .map_err(|_| format_err!("Invalid value for weekday: {:?}", weekday))?;
        config.chart.align_weekday = Some(weekday);
    }
    if matches.is_present("cleanup") {
        config.chart.cleanup = true;
    }
    config.validate()?;

    let options = ExtractOptions {
        align_weekday: config.chart.align_weekday,
    };
    let single = match matches.value_of("svg") {
        Some(svg) => Some(PathBuf::from(svg)),
        None if matches.is_present("latest") => {
            let dir = &config.chart.svg_dir;
            let max_age = match matches.value_of("since") {
                Some(secs) => Some(Duration::from_secs(
                    secs.parse::<u64>()
                        .map_err(|_| format_err!("Invalid value for since: {:?}", secs))?,
                )),
                None => None,
            };
            let latest = recent_svg(dir, max_age).with_context(|| format!("listing {}", dir.display()))?;
            Some(latest.ok_or_else(|| format_err!("no fresh SVG files in {}", dir.display()))?)
        }
        None => None,
    };
    let mut source: Box<dyn ChartSource> = match single {
        Some(path) => {
            if config.chart.commodities.len() != 1 {
                bail!(
                    "{} is a single chart, but {} commodities were requested",
                    path.display(),
                    config.chart.commodities.len()
                );
            }
            info!(path = %path.display(), "reading a single chart");
            Box::new(FileSource(path))
        }
        None => Box::new(DirectorySource {
            dir: config.chart.svg_dir.clone(),
            cleanup: config.chart.cleanup,
        }),
    };

    // A failing commodity does not stop the others
    let mut extracted = Vec::with_capacity(config.chart.commodities.len());
    for commodity in &config.chart.commodities {
        let request = ChartRequest {
            commodity: commodity.clone(),
            span: config.chart.span,
        };
        match extract_one(source.as_mut(), &request, &config, &options) {
            Ok(series) => {
                info!(commodity = %commodity, points = series.len(), "extracted series");
                extracted.push((commodity.clone(), series));
            }
            Err(err) => warn!("Failed to process {}: {:#}", commodity, err),
        }
    }
    if extracted.is_empty() {
        bail!("no series could be extracted");
    }

    let output = &config.chart.output;
    let file = File::create(output).with_context(|| format!("creating {}", output.display()))?;
    let rows = write_series(file, &extracted)?;
    println!(
        "Wrote {} rows for {} of {} commodities to {}",
        rows,
        extracted.len(),
        config.chart.commodities.len(),
        output.display()
    );
    Ok(())
}
