use clap::Parser;
use tracing::{error, info};
use yadisk_mirror::config::CliArgs;
use yadisk_mirror::logging::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = CliArgs::parse();
    init_logging(args.verbose)?;

    let walker = args.build_walker()?;
    let options = walker.options();
    info!(
        target_root = %options.target_root.display(),
        verify_only = options.verify_only,
        verify_checksums = options.verify_checksums,
        "mirroring {}",
        args.url
    );
    if let Err(err) = walker.run(&args.url).await {
        if let Some(class) = err.api_class() {
            error!(?class, "remote api failure stopped the walk");
        }
        return Err(anyhow::Error::new(err).context(format!("failed to mirror {}", args.url)));
    }
    Ok(())
}
