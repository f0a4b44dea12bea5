use clap::Subcommand;
use whereintheworld_core::location::DEFAULT_RADIUS_METERS;
use whereintheworld_core::{Config, KnownLocation};

#[derive(Subcommand)]
pub enum LocationsAction {
    /// List known locations
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a known location, replacing one with the same name
    Add {
        name: String,
        #[arg(allow_hyphen_values = true)]
        latitude: f64,
        #[arg(allow_hyphen_values = true)]
        longitude: f64,
        /// Match radius in meters
        #[arg(long, default_value_t = DEFAULT_RADIUS_METERS)]
        radius: f64,
    },
    /// Remove a known location by name
    Remove { name: String },
}

pub fn run(action: LocationsAction) -> Result<(), Box<dyn std::error::Error>> {
    match action {
        LocationsAction::List { json } => {
            let config = Config::load()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config.known_locations)?);
            } else if config.known_locations.is_empty() {
                println!("no known locations");
            } else {
                for location in &config.known_locations {
                    println!(
                        "{:<20} {} ({:.0} m)",
                        location.name,
                        location.coordinate(),
                        location.radius_meters
                    );
                }
            }
        }
        LocationsAction::Add {
            name,
            latitude,
            longitude,
            radius,
        } => {
            let location = KnownLocation::new(name.trim(), latitude, longitude, radius);
            if location.name.is_empty() {
                return Err("name must not be empty".into());
            }
            if !location.coordinate().is_valid() {
                return Err(format!("invalid coordinate: {latitude},{longitude}").into());
            }
            if !(radius.is_finite() && radius > 0.0) {
                return Err(format!("radius must be positive, got {radius}").into());
            }
            let mut config = Config::load()?;
            config.upsert_known_location(location);
            config.save()?;
            println!("ok");
        }
        LocationsAction::Remove { name } => {
            let mut config = Config::load()?;
            if !config.remove_known_location(&name) {
                return Err(format!("no known location named {name:?}").into());
            }
            config.save()?;
            println!("ok");
        }
    }
    Ok(())
}
