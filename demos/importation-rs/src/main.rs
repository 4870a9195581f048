use border_screening::runner::Environment;
use border_screening::screening::ScreeningModel;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let ctx = Environment::from_stdin();

    let scenario = match ctx.scenario() {
        Ok(scenario) => scenario,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    let outcome = match ScreeningModel::run(&scenario) {
        Ok(outcome) => outcome,
        Err(err) => {
            eprintln!("Error: {err}");
            std::process::exit(1);
        }
    };

    ctx.write_counts("screening_output.csv", &outcome);
}
