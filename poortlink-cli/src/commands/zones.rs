//! Zones command - list active zones near a position.

use std::path::Path;

use console::style;
use poortlink::zone::NearbyZone;
use tracing::debug;

use crate::commands::common::{load_config, load_directory, parse_point, runtime};
use crate::error::CliError;

/// Arguments for the zones command.
#[derive(Debug, Clone)]
pub struct ZonesArgs {
    pub lat: f64,
    pub lon: f64,
    pub radius: Option<f64>,
}

/// Run the zones command.
pub fn run(config_path: &Path, args: ZonesArgs) -> Result<(), CliError> {
    let config = load_config(config_path)?;
    let point = parse_point(args.lat, args.lon)?;
    let radius = args.radius.unwrap_or(config.tracker.discovery_radius_m);
    if !(radius.is_finite() && radius > 0.0) {
        return Err(CliError::InvalidArgument(format!(
            "radius must be a positive number of meters, got {}",
            radius
        )));
    }

    let runtime = runtime()?;
    let directory = runtime.block_on(load_directory(&config))?;
    let nearby = directory.nearby(&point, radius);
    debug!(point = %point, radius_m = radius, found = nearby.len(), "Zone discovery");

    if nearby.is_empty() {
        println!("No active zones within {:.0} m of {}", radius, point);
        return Ok(());
    }

    println!(
        "{} active zone(s) within {:.0} m of {}",
        nearby.len(),
        radius,
        point
    );
    println!();
    for zone in &nearby {
        println!("{}", format_zone(zone));
    }
    Ok(())
}

fn format_zone(nearby: &NearbyZone) -> String {
    let marker = if nearby.is_inside() {
        style("inside").green().to_string()
    } else {
        let to_go = nearby.distance_meters - nearby.zone.radius_meters;
        style(format!("{:.0} m to go", to_go)).yellow().to_string()
    };
    format!(
        "  {:>7.0} m  {:<24} {:<10} {}  [{}]",
        nearby.distance_meters,
        nearby.zone.name,
        nearby.zone.kind.as_str(),
        nearby.zone.id,
        marker
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use poortlink::geo::GeoPoint;
    use poortlink::zone::{LoadingZone, ZoneKind};

    #[test]
    fn test_format_zone() {
        console::set_colors_enabled(false);
        let center = GeoPoint::new(-25.7, 28.3).unwrap();
        let zone = LoadingZone::new("rank", "Bosman Rank", ZoneKind::Rank, center, 50.0).unwrap();

        let outside = NearbyZone {
            zone: zone.clone(),
            distance_meters: 120.0,
        };
        let line = format_zone(&outside);
        assert!(line.contains("Bosman Rank"));
        assert!(line.contains("70 m to go"));

        let inside = NearbyZone {
            zone,
            distance_meters: 10.0,
        };
        assert!(format_zone(&inside).contains("[inside]"));
    }
}
