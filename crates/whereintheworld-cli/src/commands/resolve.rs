use clap::Args;
use whereintheworld_core::{
    match_known_location, Config, Coordinate, Credentials, ResolvedLocation, ReverseGeocoder,
};

#[derive(Args)]
pub struct ResolveArgs {
    #[arg(allow_hyphen_values = true)]
    latitude: f64,
    #[arg(allow_hyphen_values = true)]
    longitude: f64,
    /// Output as JSON
    #[arg(long)]
    json: bool,
}

/// Known locations first, then the configured geocoder.
pub async fn run(args: ResolveArgs) -> Result<(), Box<dyn std::error::Error>> {
    let coordinate = Coordinate::new(args.latitude, args.longitude);
    if !coordinate.is_valid() {
        return Err(format!("invalid coordinate: {},{}", args.latitude, args.longitude).into());
    }

    let config = Config::load()?;
    let resolved = match match_known_location(coordinate, &config.known_locations) {
        Some(known) => ResolvedLocation::known(known),
        None => {
            // Keys are only read when a lookup is needed.
            let settings = config.snapshot(&Credentials::load());
            let geocoder = ReverseGeocoder::new(config.tracking.request_timeout())?;
            geocoder.reverse(coordinate, &settings.geocoding()).await?
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
    } else {
        println!("{}", resolved.label);
    }
    Ok(())
}
