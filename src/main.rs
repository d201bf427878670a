use ampsh::command::EXIT_FAILURE;
use ampsh::{Config, ERROR_MESSAGE, Interpreter, cli};
use tracing_subscriber::EnvFilter;

fn main() {
    // Logging is off unless AMPSH_LOG asks for it, so stderr only carries
    // the uniform diagnostic.
    let filter = EnvFilter::try_from_env("AMPSH_LOG").unwrap_or_else(|_| EnvFilter::new("off"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let code = match cli::run(&args, Interpreter::with_config(Config::default())) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!("{:#}", err);
            eprint!("{}", ERROR_MESSAGE);
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}
