use burn::config::Config;
use burn::optim::AdamConfig;
use mathrec::artifacts;
use mathrec::backend::{MainAutoBackend, MainDevice};
use mathrec::model::MathCnnConfig;
use mathrec::training::{self, TrainingConfig};
use std::path::PathBuf;

const HELP: &str = "\
mathrec-train

Trains the math character recognizer on MNIST and writes the model weights,
model config and training config into the artifacts directory. The serve
binary loads its model from the same directory.

USAGE:
    train [OPTIONS]

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -a, --artifacts-path <PATH> Directory for weights and configs
                                (created if missing, defaults to ./artifacts)
    -e, --epochs <N>            Override the number of training epochs
";

#[derive(Debug)]
struct AppArgs {
    artifacts_path: PathBuf,
    epochs: Option<usize>,
}

impl AppArgs {
    fn parse() -> Result<Self, pico_args::Error> {
        let mut pargs = pico_args::Arguments::from_env();

        // Help has a higher priority and should be handled separately.
        if pargs.contains(["-h", "--help"]) {
            println!("{HELP}");
            std::process::exit(0);
        }

        let args = AppArgs {
            artifacts_path: pargs
                .opt_value_from_os_str(["-a", "--artifacts-path"], parse_path)?
                .unwrap_or_else(|| PathBuf::from("artifacts")),
            epochs: pargs.opt_value_from_str(["-e", "--epochs"])?,
        };

        let remaining = pargs.finish();
        if !remaining.is_empty() {
            panic!("unused arguments: {remaining:?}");
        }

        Ok(args)
    }
}

fn parse_path(s: &std::ffi::OsStr) -> Result<PathBuf, &'static str> {
    Ok(s.into())
}

fn main() {
    let args = AppArgs::parse().expect("Failed to parse the arguments");

    // Reuse the training config of a previous run in the same directory,
    // otherwise start from the defaults.
    let mut config = TrainingConfig::load(args.artifacts_path.join(artifacts::TRAINING_CONFIG_NAME))
        .unwrap_or_else(|_| TrainingConfig::new(MathCnnConfig::new(), AdamConfig::new()));
    if let Some(epochs) = args.epochs {
        config = config.with_num_epochs(epochs);
    }

    let device = MainAutoBackend::main_device();
    training::train::<MainAutoBackend>(&args.artifacts_path, config, device);
}
