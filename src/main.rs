use clap::{Parser, Subcommand};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use transit_regions::location::{FixedLocationProvider, IpLocationProvider, LocationProvider, ManualLocationProvider};
use transit_regions::region::{FetchError, FileRegionStore, HttpRegionService, StaticRegionService};
use transit_regions::server::{self, AppState};
use transit_regions::{logging, HelperState, RegionFetchService, RegionHelper, RegionHelperDelegate, RegionStore, Settings};

/// Transit regions — find the transit service regions near you.
///
/// Examples:
///   regions refresh
///   regions nearby --lat 47.6062 --lon -122.3321
///   regions nearby --auto --radius 50
///   regions list
///   regions serve --port 8080
#[derive(Parser)]
#[command(name = "regions", version, about, long_about = None)]
struct Cli {
    /// Debug logging (overridden by RUST_LOG).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the regions near a location.
    Nearby {
        /// Latitude (-90 to 90).
        #[arg(long, allow_hyphen_values = true, requires = "lon")]
        lat: Option<f64>,

        /// Longitude (-180 to 180).
        #[arg(long, allow_hyphen_values = true, requires = "lat")]
        lon: Option<f64>,

        /// Auto-detect location via IP geolocation.
        #[arg(long, short = 'a', conflicts_with = "lat")]
        auto: bool,

        /// Search radius in miles (default from config, normally 100).
        #[arg(long)]
        radius: Option<f64>,

        /// Also consider experimental regions.
        #[arg(long)]
        include_experimental: bool,

        /// Offline mode: only use stored regions.
        #[arg(long)]
        offline: bool,
    },

    /// Download the region list and store it.
    Refresh {
        /// Regions document URL override.
        #[arg(long)]
        url: Option<String>,
    },

    /// Print the stored regions.
    List,

    /// Serve the JSON API.
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 3000)]
        port: u16,

        /// Never contact the regions endpoint.
        #[arg(long)]
        offline: bool,
    },
}

/// Prints the stored region list when nothing is nearby.
#[derive(Default)]
struct CliDelegate {
    shown: AtomicBool,
}

impl RegionHelperDelegate for CliDelegate {
    fn show_region_list(&self, helper: &RegionHelper) {
        self.shown.store(true, Ordering::SeqCst);

        let radius = helper.config().radius_miles;
        match helper.last_location() {
            Some(fix) => eprintln!("  No transit region within {} miles of {}.", radius, fix.coordinate),
            None => eprintln!("  Location unavailable."),
        }
        let regions = helper.store().regions();
        if regions.is_empty() {
            eprintln!("  No regions stored. Run `regions refresh` first.");
            return;
        }
        eprintln!("  Choose a region manually:");
        for r in regions.iter().filter(|r| r.active) {
            eprintln!("    {:>3}. {}", r.id, r.name);
        }
    }
}

fn fetch_service(url: &str, offline: bool) -> Arc<dyn RegionFetchService> {
    if offline {
        Arc::new(StaticRegionService::failing(FetchError::Network("offline mode".into())))
    } else {
        Arc::new(HttpRegionService::with_url(url))
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    let settings = Settings::load();

    match cli.command {
        Command::Nearby {
            lat,
            lon,
            auto,
            radius,
            include_experimental,
            offline,
        } => {
            let mut config = settings.helper.clone();
            if let Some(r) = radius {
                config.radius_miles = r;
            }
            config.include_experimental |= include_experimental;

            let provider: Arc<dyn LocationProvider> = match (lat, lon) {
                (Some(lat), Some(lon)) => Arc::new(FixedLocationProvider::new(lat, lon).unwrap_or_else(|e| {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                })),
                _ if auto => Arc::new(IpLocationProvider::with_url(settings.ip_api_url.clone())),
                _ => {
                    eprintln!("Error: No location specified. Use --lat/--lon or --auto.");
                    std::process::exit(1);
                }
            };

            let store: Arc<dyn RegionStore> = Arc::new(FileRegionStore::load());
            let helper = RegionHelper::with_config(
                provider,
                fetch_service(&settings.regions_url, offline),
                store.clone(),
                config,
            );
            let delegate = Arc::new(CliDelegate::default());
            helper.set_delegate(&delegate);

            if store.regions().is_empty() && !offline {
                if let Err(e) = helper.refresh_data() {
                    eprintln!("Warning: {}", e);
                }
            }

            helper.start();
            let deadline = Instant::now() + Duration::from_secs(10);
            while helper.state() == HelperState::AwaitingLocation && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(50));
            }
            if helper.state() == HelperState::AwaitingLocation {
                eprintln!("Error: Timed out waiting for a location fix.");
                std::process::exit(1);
            }

            if let Some(fix) = helper.last_location() {
                eprintln!("  \u{1F4CD} {} ({})", fix.coordinate, fix.source);
            }
            if let Some(current) = store.current_region() {
                eprintln!("  \u{1F68F} Current region: {}", current.name);
            }

            let nearby = helper.nearby_regions();
            match serde_json::to_string_pretty(&nearby) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
            if delegate.shown.load(Ordering::SeqCst) {
                std::process::exit(2);
            }
        }

        Command::Refresh { url } => {
            let url = url.unwrap_or_else(|| settings.regions_url.clone());
            let helper = RegionHelper::new(Arc::new(ManualLocationProvider::new()), fetch_service(&url, false));
            match helper.refresh_data() {
                Ok(outcome) => eprintln!("  Stored {} regions.", outcome.region_count),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Command::List => {
            let store = FileRegionStore::load();
            match serde_json::to_string_pretty(&store.regions()) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }

        Command::Serve { host, port, offline } => {
            let state = AppState::new(
                fetch_service(&settings.regions_url, offline),
                Arc::new(FileRegionStore::load()),
                settings.helper.clone(),
            );
            let runtime = tokio::runtime::Runtime::new().unwrap_or_else(|e| {
                eprintln!("Error: Cannot start runtime: {}", e);
                std::process::exit(1);
            });
            if let Err(e) = runtime.block_on(server::start(&host, port, state)) {
                eprintln!("Error: Cannot serve on {}:{}: {}", host, port, e);
                std::process::exit(1);
            }
        }
    }
}
