//! Geodesic distance on the WGS-84 ellipsoid.
//!
//! Spatial search filters items by great-circle distance from a center
//! point. At country scale a spherical (haversine) approximation drifts by
//! up to ~0.5%, so distances are computed with Vincenty's inverse formula
//! on the WGS-84 ellipsoid. The iteration can fail to converge for
//! near-antipodal point pairs; we fall back to the spherical formula there,
//! which is accurate enough for a "within radius" predicate at those ranges.

use serde::{Deserialize, Serialize};

/// WGS-84 semi-major axis in meters.
const WGS84_A: f64 = 6_378_137.0;

/// WGS-84 flattening.
const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// Mean earth radius in kilometers (spherical fallback).
const EARTH_RADIUS_KM: f64 = 6_371.0088;

/// Convergence threshold for the Vincenty iteration (radians).
const CONVERGENCE: f64 = 1e-12;

/// Maximum Vincenty iterations before declaring non-convergence.
const MAX_ITERATIONS: usize = 200;

/// A geographic coordinate in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees (positive = North).
    pub latitude: f64,
    /// Longitude in decimal degrees (positive = East).
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a new point from decimal degrees.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Distance from this point to another, in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        geodesic_distance_km(*self, *other)
    }
}

/// Geodesic distance between two points in kilometers (Vincenty inverse).
pub fn geodesic_distance_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
    if p1.latitude == p2.latitude && p1.longitude == p2.longitude {
        return 0.0;
    }

    let b = WGS84_A * (1.0 - WGS84_F);

    let u1 = ((1.0 - WGS84_F) * p1.latitude.to_radians().tan()).atan();
    let u2 = ((1.0 - WGS84_F) * p2.latitude.to_radians().tan()).atan();
    let l = (p2.longitude - p1.longitude).to_radians();

    let (sin_u1, cos_u1) = u1.sin_cos();
    let (sin_u2, cos_u2) = u2.sin_cos();

    let mut lambda = l;
    let mut iterations = 0;

    let (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m) = loop {
        let (sin_lambda, cos_lambda) = lambda.sin_cos();

        let sin_sigma = ((cos_u2 * sin_lambda).powi(2)
            + (cos_u1 * sin_u2 - sin_u1 * cos_u2 * cos_lambda).powi(2))
        .sqrt();
        if sin_sigma == 0.0 {
            // Coincident points
            return 0.0;
        }

        let cos_sigma = sin_u1 * sin_u2 + cos_u1 * cos_u2 * cos_lambda;
        let sigma = sin_sigma.atan2(cos_sigma);

        let sin_alpha = cos_u1 * cos_u2 * sin_lambda / sin_sigma;
        let cos_sq_alpha = 1.0 - sin_alpha * sin_alpha;

        // cos_sq_alpha == 0 means both points are on the equator
        let cos_2sigma_m = if cos_sq_alpha == 0.0 {
            0.0
        } else {
            cos_sigma - 2.0 * sin_u1 * sin_u2 / cos_sq_alpha
        };

        let c = WGS84_F / 16.0 * cos_sq_alpha * (4.0 + WGS84_F * (4.0 - 3.0 * cos_sq_alpha));
        let lambda_prev = lambda;
        lambda = l
            + (1.0 - c)
                * WGS84_F
                * sin_alpha
                * (sigma
                    + c * sin_sigma
                        * (cos_2sigma_m
                            + c * cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)));

        if (lambda - lambda_prev).abs() < CONVERGENCE {
            break (sin_sigma, cos_sigma, sigma, cos_sq_alpha, cos_2sigma_m);
        }

        iterations += 1;
        if iterations >= MAX_ITERATIONS {
            return haversine_distance_km(p1, p2);
        }
    };

    let u_sq = cos_sq_alpha * (WGS84_A * WGS84_A - b * b) / (b * b);
    let a_coeff = 1.0 + u_sq / 16384.0 * (4096.0 + u_sq * (-768.0 + u_sq * (320.0 - 175.0 * u_sq)));
    let b_coeff = u_sq / 1024.0 * (256.0 + u_sq * (-128.0 + u_sq * (74.0 - 47.0 * u_sq)));

    let delta_sigma = b_coeff
        * sin_sigma
        * (cos_2sigma_m
            + b_coeff / 4.0
                * (cos_sigma * (-1.0 + 2.0 * cos_2sigma_m * cos_2sigma_m)
                    - b_coeff / 6.0
                        * cos_2sigma_m
                        * (-3.0 + 4.0 * sin_sigma * sin_sigma)
                        * (-3.0 + 4.0 * cos_2sigma_m * cos_2sigma_m)));

    let meters = b * a_coeff * (sigma - delta_sigma);
    meters / 1000.0
}

/// Spherical fallback for point pairs where Vincenty does not converge.
fn haversine_distance_km(p1: GeoPoint, p2: GeoPoint) -> f64 {
    let lat1 = p1.latitude.to_radians();
    let lat2 = p2.latitude.to_radians();
    let dlat = (p2.latitude - p1.latitude).to_radians();
    let dlon = (p2.longitude - p1.longitude).to_radians();

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * a.sqrt().asin()
}
