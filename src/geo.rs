//! Distance and navigation helpers
//!
//! Haversine distance with forward azimuth, plus closest-point navigation
//! against route/drawing polylines. Precision is standard haversine on a
//! spherical earth; segment projection uses a local equirectangular
//! approximation, which is fine at tactical map scales.

use crate::model::{Category, Item};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Result of a navigation query against one item.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    /// Closest point on the target (the item itself for point-like items).
    pub lat: f64,
    pub lon: f64,
    /// Great-circle distance in meters.
    pub distance: f64,
    /// Initial bearing in degrees, 0..360.
    pub bearing: f64,
}

/// Haversine distance (meters) and initial bearing (degrees) from point 1
/// to point 2.
pub fn dist_bea(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> (f64, f64) {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    let distance = 2.0 * a.sqrt().atan2((1.0 - a).sqrt()) * EARTH_RADIUS_M;

    let y = d_lambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * d_lambda.cos();
    let bearing = (y.atan2(x).to_degrees() + 360.0) % 360.0;

    (distance, bearing)
}

/// Closest point to `(lat, lon)` on the segment `a -> b`, in a local
/// equirectangular projection around the query point.
pub fn closest_point_on_segment(
    lat: f64,
    lon: f64,
    a: (f64, f64),
    b: (f64, f64),
) -> (f64, f64) {
    let scale = lat.to_radians().cos();

    let ax = (a.1 - lon) * scale;
    let ay = a.0 - lat;
    let bx = (b.1 - lon) * scale;
    let by = b.0 - lat;

    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return a;
    }

    let t = (-(ax * dx + ay * dy) / len_sq).clamp(0.0, 1.0);
    (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1))
}

/// Parse `"lat,lon[,hae]"` link strings into coordinate pairs, skipping
/// malformed entries.
pub fn parse_link_points(links: &[String]) -> Vec<(f64, f64)> {
    links
        .iter()
        .filter_map(|link| {
            let mut parts = link.split(',');
            let lat: f64 = parts.next()?.trim().parse().ok()?;
            let lon: f64 = parts.next()?.trim().parse().ok()?;
            if lat.is_finite() && lon.is_finite() {
                Some((lat, lon))
            } else {
                None
            }
        })
        .collect()
}

/// Ray-casting point-in-polygon test over `(lat, lon)` vertices. The ring
/// may be open or closed; fewer than three vertices is never inside.
pub fn point_in_polygon(lat: f64, lon: f64, vertices: &[(f64, f64)]) -> bool {
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (lat_i, lon_i) = vertices[i];
        let (lat_j, lon_j) = vertices[j];
        if (lon_i > lon) != (lon_j > lon)
            && lat < (lat_j - lat_i) * (lon - lon_i) / (lon_j - lon_i) + lat_i
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Distance/bearing from the user position to the closest point of an
/// item. Routes and drawings are evaluated against their polyline
/// segments (drawings as a closed ring, with zero distance when the user
/// stands inside the polygon); everything else against the item's own
/// coordinates. Returns `None` when the item has nothing to navigate to -
/// never panics on degenerate data.
pub fn navigate_to(item: &Item, user_lat: f64, user_lon: f64) -> Option<Navigation> {
    if !user_lat.is_finite() || !user_lon.is_finite() {
        return None;
    }

    match item.category {
        Category::Route | Category::Drawing => {
            let mut points = parse_link_points(&item.links);
            if points.is_empty() {
                return None;
            }
            if item.category == Category::Drawing && points.len() > 2 {
                if point_in_polygon(user_lat, user_lon, &points) {
                    return Some(Navigation {
                        lat: user_lat,
                        lon: user_lon,
                        distance: 0.0,
                        bearing: 0.0,
                    });
                }
                let first = points[0];
                points.push(first);
            }

            if points.len() == 1 {
                let (lat, lon) = points[0];
                let (distance, bearing) = dist_bea(user_lat, user_lon, lat, lon);
                return Some(Navigation {
                    lat,
                    lon,
                    distance,
                    bearing,
                });
            }

            let mut best: Option<Navigation> = None;
            for pair in points.windows(2) {
                let (lat, lon) = closest_point_on_segment(user_lat, user_lon, pair[0], pair[1]);
                let (distance, bearing) = dist_bea(user_lat, user_lon, lat, lon);
                if best.as_ref().map_or(true, |b| distance < b.distance) {
                    best = Some(Navigation {
                        lat,
                        lon,
                        distance,
                        bearing,
                    });
                }
            }
            best
        }
        _ => {
            if !item.lat.is_finite() || !item.lon.is_finite() {
                return None;
            }
            // The backend uses 0,0 as "no position yet".
            if item.lat == 0.0 && item.lon == 0.0 {
                return None;
            }
            let (distance, bearing) = dist_bea(user_lat, user_lon, item.lat, item.lon);
            Some(Navigation {
                lat: item.lat,
                lon: item.lon,
                distance,
                bearing,
            })
        }
    }
}
