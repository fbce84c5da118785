//! Standalone launcher
//!
//! Brings up an in-process execution group from a JSON config, applies the
//! configured box and node grid from the head and logs the sub-domain every
//! member ended up with.
//!
//! Usage: `standalone [config.json]`

use orchestrator::{Error, SystemConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "standalone=info,orchestrator=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => match SystemConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::error!("{}", e);
                std::process::exit(2);
            }
        },
        None => {
            tracing::info!("No config given, using a single-member unit box");
            SystemConfig::default()
        }
    };

    let reports = match orchestrator::run_configured(&config) {
        Ok(reports) => reports,
        Err(e @ Error::BootstrapFailure(_)) => {
            tracing::error!("{}", e);
            std::process::exit(1);
        }
        Err(e) => {
            tracing::error!("{}", e);
            std::process::exit(2);
        }
    };

    for report in &reports {
        tracing::info!(
            "rank {} at {:?}: origin {:?}, length {:?}, boundaries {:?}, neighbors {:?}",
            report.rank,
            report.coordinate,
            report.local_box.origin(),
            report.local_box.local_length(),
            report.local_box.boundary_flags(),
            report.neighbor_ranks
        );
    }
    tracing::info!(
        "Total local volume {} of global {}",
        orchestrator::total_local_volume(&reports),
        config.box_length.iter().product::<f64>()
    );
}
