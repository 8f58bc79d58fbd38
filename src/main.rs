use docker_registry_proxy::cli::Args;
use docker_registry_proxy::{logging, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse_args();
    args.validate()?;

    logging::init(args.verbose);

    let config = args.into_config();
    tracing::info!(
        listen = %config.listen,
        default_upstream = %config.default_upstream,
        gate = config.gate_enabled(),
        "starting docker registry proxy"
    );
    if !config.gate_enabled() {
        tracing::warn!("AUTH_CREDENTIALS is not set, the proxy is open to anyone");
    }

    serve(config).await?;
    Ok(())
}
