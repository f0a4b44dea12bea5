use super::{Coordinate, KnownLocation};

/// Nearest known location whose radius contains `coordinate`.
///
/// Exact distance ties keep the first location in input order. Invalid
/// coordinates, on either side, never match.
pub fn match_known_location<'a>(
    coordinate: Coordinate,
    known: &'a [KnownLocation],
) -> Option<&'a KnownLocation> {
    if !coordinate.is_valid() {
        return None;
    }

    let mut best: Option<(&KnownLocation, f64)> = None;
    for location in known {
        if !location.coordinate().is_valid()
            || !location.radius_meters.is_finite()
            || location.radius_meters < 0.0
        {
            continue;
        }
        let distance = coordinate.distance_to(&location.coordinate());
        if distance > location.radius_meters {
            continue;
        }
        match best {
            Some((_, best_distance)) if best_distance <= distance => {}
            _ => best = Some((location, distance)),
        }
    }
    best.map(|(location, _)| location)
}
