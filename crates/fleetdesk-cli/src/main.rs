use clap::Parser;
use fleetdesk_cli::{
    cli::Cli,
    commands::{execute, FleetClient},
};
use fleetdesk_client_core::configuration::get_configuration;

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    if let Err(e) = fleetdesk_cli::tracing::init(&args) {
        eprintln!("Failed to start tracing: {e}");
    }

    let settings = get_configuration()?;
    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    rt.block_on(async move {
        let client = FleetClient::from_settings(settings)?;
        execute(args.command, &client, &mut std::io::stdout()).await
    })
}
