use mathrec::artifacts;
use mathrec::backend::{MainBackend, MainDevice};
use mathrec::infer::Recognizer;
use mathrec::server;
use std::path::PathBuf;

const HELP: &str = "\
mathrec-serve

Loads a trained model artifact and serves predictions over HTTP:
POST /recognize_math with a multipart `image` field returns the recognized
label as JSON. The process refuses to start without a readable artifact.

USAGE:
    serve [OPTIONS]

FLAGS:
    -h, --help                  Show this help message and exit

OPTIONS:
    -a, --artifacts-path <PATH> Directory holding the trained model
                                (defaults to ./artifacts)
    -p, --port <PORT>           Port to listen on (defaults to 5001)
";

#[derive(Debug)]
struct AppArgs {
    artifacts_path: PathBuf,
    port: u16,
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
            port: pargs.opt_value_from_str(["-p", "--port"])?.unwrap_or(5001),
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

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let args = AppArgs::parse().expect("Failed to parse the arguments");

    // Loading must succeed before the listener binds; serving with an
    // unloaded model is worse than not starting.
    let device = MainBackend::main_device();
    let model_config = artifacts::load_model_config(&args.artifacts_path)
        .expect("No model config in the artifacts directory; run train first");
    let model = artifacts::load_model::<MainBackend>(&args.artifacts_path, &model_config, &device)
        .expect("No model weights in the artifacts directory; run train first");

    server::serve(Recognizer::new(model, device), args.port).await;
}
