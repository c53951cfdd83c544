/*!
Generate a fake hourly observation file for the forecaster
*/
use chartcast::data::fake::ObservationGen;
use chartcast::data::weather::{write_observations, ObservationFormat};
use chrono::NaiveDate;
use clap::{App, Arg};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;

fn main() -> anyhow::Result<()> {
    let matches = App::new("fakegen")
        .about("Writes synthetic solar plant observations as CSV")
        .arg(Arg::with_name("OUTPUT").help("Output CSV file").required(true))
        .arg(
            Arg::with_name("points")
                .short("n")
                .long("points")
                .help("Number of hourly observations. Defaults to 2000")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .help("Random seed")
                .takes_value(true),
        )
        .get_matches();

    let points: usize = matches.value_of("points").unwrap_or("2000").parse()?;
    let seed: u64 = matches.value_of("seed").unwrap_or("0").parse()?;
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::format_err!("invalid start time"))?;

    let set = ObservationGen::new(StdRng::seed_from_u64(seed), start).take_set(points);
    let output = matches.value_of("OUTPUT").unwrap_or("observations.csv");
    let rows = write_observations(File::create(output)?, &set, &ObservationFormat::default())?;
    eprintln!("Wrote {} observations to {}", rows, output);
    Ok(())
}
