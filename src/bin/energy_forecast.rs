/*!
Train the EnergyLSTM on an observation file and report its test error per forecast horizon
*/

use anyhow::{bail, format_err, Context};
use chartcast::config::Config;
use chartcast::data::weather::read_observations;
use chartcast::eval::horizon_metrics;
use chartcast::features::{window, FeatureBuilder};
use chartcast::logging;
use chartcast::lstm::EnergyLSTMDesc;
use chartcast::train::{predict, to_physical, train};
use clap::{App, Arg};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::fs::File;
use std::path::Path;
use tch::{nn, Device};
use tracing::{info, warn};

pub fn run(input: &Path, config: &Config, device: Device) -> anyhow::Result<()> {
    let f = &config.forecast;

    // Load observations
    let file = File::open(input).with_context(|| format!("opening {}", input.display()))?;
    let set = read_observations(file, &f.format)?;
    info!(records = set.len(), weather = set.weather_columns.len(), "loaded observations");
    if set.is_empty() {
        bail!("no observations could be read from {}", input.display());
    }

    // Features and samples
    let builder = FeatureBuilder::new(f.lags, f.rolling)?;
    let features = builder.build(&set.records)?;
    let dataset = window(&features, &set.records, f.sequence_length, f.horizons)?;
    let (mut train_set, mut val_set, mut test_set) = dataset.split(f.train_ratio, f.val_ratio);
    info!(
        train = train_set.len(),
        val = val_set.len(),
        test = test_set.len(),
        features = dataset.features,
        "windowed samples"
    );
    if test_set.is_empty() {
        warn!("no test samples: metrics will be empty");
    }

    // Scalers are fitted on the training set only
    let (input_scaler, target_scaler) = train_set.fit_scalers();
    train_set.scale(&input_scaler, &target_scaler);
    val_set.scale(&input_scaler, &target_scaler);
    test_set.scale(&input_scaler, &target_scaler);

    // Network setup
    let mut rng = StdRng::seed_from_u64(f.seed);
    tch::manual_seed(f.seed as i64);
    let mut vs = nn::VarStore::new(device);
    let model = EnergyLSTMDesc {
        features: dataset.features,
        horizons: f.horizons,
        hidden: f.hidden,
        layers: f.layers,
        dropout: f.dropout,
    }
    .build(&vs);

    let report = train(&model, &mut vs, &train_set, &val_set, &f.train, &mut rng)?;
    info!(
        epochs = report.epochs_run,
        best_epoch = ?report.best_epoch,
        best_val_loss = report.best_val_loss,
        "training finished"
    );

    // Evaluate in physical units
    let predictions = predict(&model, &test_set, f.train.batch_size, device)
        .map_err(|err| format_err!("Error running the model: {:#?}", err))?;
    let unscale = |value: f32| target_scaler.unscale(value);
    let predictions = to_physical(&predictions, unscale, Some(&f.clip));
    let targets: Vec<Vec<f32>> = test_set.samples.iter().map(|sample| sample.targets.clone()).collect();
    let targets = to_physical(&targets, unscale, None);

    println!(
        "Trained for {} epochs, best validation loss {:.5}",
        report.epochs_run, report.best_val_loss
    );
    for metrics in horizon_metrics(&predictions, &targets) {
        println!("{}", metrics);
    }
    Ok(())
}

pub fn main() -> anyhow::Result<()> {
    // Initialization, argument parsing
    let matches = App::new("Energy Forecast")
        .version("0.1")
        .about("An LSTM which forecasts power output from weather observations")
        .arg(
            Arg::with_name("INPUT")
                .help("Observation CSV file")
                .required(true),
        )
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .help("JSON configuration file")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("device")
                .short("d")
                .long("device")
                .help("Device to use: cuda, cpu. Defaults to cuda")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .help("Random seed")
                .takes_value(true),
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

    let input = matches
        .value_of("INPUT")
        .ok_or_else(|| format_err!("missing input file"))?;
    let mut config = Config::load(matches.value_of("config").map(Path::new))?;
    if let Some(seed) = matches.value_of("seed") {
        config.forecast.seed = seed
            .parse()
            .map_err(|_| format_err!("Invalid value for seed: {:?}", seed))?;
    }

    let device: Device = match matches.value_of("device").unwrap_or("cuda") {
        "cuda" => Device::cuda_if_available(),
        "cpu" => Device::Cpu,
        device => Err(format_err!("Invalid value for device: {:?}", device))?,
    };
    info!(?device, "selected device");

    run(Path::new(input), &config, device)
}
