use anyhow::bail;
use fleetdesk_shared::telemetry;

pub fn init(cli: &super::cli::Cli) -> anyhow::Result<()> {
    fn init_to_file() -> anyhow::Result<()> {
        let (file, filename) = telemetry::create_trace_file("fleetdesk_cli")?;
        let subscriber = telemetry::get_subscriber("fleetdesk_cli".into(), "info", file);

        match telemetry::init_subscriber(subscriber) {
            Ok(_) => {
                eprintln!("Tracing started to file {filename:?}");
                Ok(())
            }
            Err(e) => {
                bail!("Failed to start tracing to file. Error: {e}");
            }
        }
    }

    if !cli.is_to_std_out {
        match init_to_file() {
            Ok(_) => return Ok(()),
            Err(e) => {
                // Print error and fall though to logging to stderr
                eprintln!("Failed to start logging to file: {e}");
            }
        }
    }

    match tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .try_init()
    {
        Ok(_) => Ok(()),
        Err(e) => {
            bail!("Failed to start tracing. Error: {e}");
        }
    }
}
