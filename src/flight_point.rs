use blake2::{Blake2b, Digest, digest::consts::U16};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

use crate::schema::flight_points;

type Blake2b128 = Blake2b<U16>;

/// Altitude, tagged rather than carrying the source's `"ground"` sentinel
/// string (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Altitude {
    Ground,
    Barometric(i32),
}

impl Altitude {
    pub fn from_feet(ft: Option<i32>) -> Option<Self> {
        match ft {
            None => None,
            Some(0) => Some(Altitude::Ground),
            Some(ft) => Some(Altitude::Barometric(ft)),
        }
    }

    pub fn feet(self) -> i32 {
        match self {
            Altitude::Ground => 0,
            Altitude::Barometric(ft) => ft,
        }
    }

    fn hash_component(this: Option<Self>) -> String {
        match this {
            None => "na".to_string(),
            Some(alt) => alt.feet().to_string(),
        }
    }
}

/// Where a position sample originated. The source system uses string
/// sentinels for this; represented here as a closed set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    Adsb,
    Mlat,
    Estimated,
    Unknown,
}

impl DataSource {
    pub fn as_str(self) -> &'static str {
        match self {
            DataSource::Adsb => "adsb",
            DataSource::Mlat => "mlat",
            DataSource::Estimated => "estimated",
            DataSource::Unknown => "unknown",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "adsb" => DataSource::Adsb,
            "mlat" => DataSource::Mlat,
            "estimated" => DataSource::Estimated,
            _ => DataSource::Unknown,
        }
    }
}

/// BLAKE2b-128 digest of `(icao, ts-floor-seconds, lon-str, lat-str,
/// alt-str-or-"na")`, hex-encoded. Pure function of its inputs: submitting
/// the same point twice computes the same hash (spec.md §3, §8 laws).
pub fn flight_point_hash(
    icao: &str,
    timestamp: DateTime<Utc>,
    longitude: Option<f64>,
    latitude: Option<f64>,
    altitude: Option<Altitude>,
) -> String {
    let mut hasher = Blake2b128::new();
    hasher.update(icao.as_bytes());
    hasher.update(timestamp.timestamp().to_string().as_bytes());
    hasher.update(
        longitude
            .map(|v| v.to_string())
            .unwrap_or_else(|| "na".to_string())
            .as_bytes(),
    );
    hasher.update(
        latitude
            .map(|v| v.to_string())
            .unwrap_or_else(|| "na".to_string())
            .as_bytes(),
    );
    hasher.update(Altitude::hash_component(altitude).as_bytes());
    hex::encode(hasher.finalize())
}

/// One timestamped position/altitude sample (spec.md §3).
///
/// **Invariant:** if `projected_x`/`projected_y` is set then `crs_epsg` is
/// set. Enforced by [`FlightPoint::with_projected_position`] rather than at
/// construction time, since a point may legitimately arrive unlocated.
#[derive(Debug, Clone, PartialEq, Queryable, Selectable, Insertable)]
#[diesel(table_name = flight_points)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct FlightPoint {
    pub flight_point_hash: String,
    pub aircraft_icao: String,
    pub day_date: NaiveDate,
    pub flight_hash: Option<uuid::Uuid>,
    pub timestamp: DateTime<Utc>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub projected_x: Option<f64>,
    pub projected_y: Option<f64>,
    pub crs_epsg: Option<i32>,
    pub utm_epsg_zone: Option<i32>,
    pub altitude_ft: Option<i32>,
    pub ground_speed_knots: Option<f64>,
    pub track_deg: Option<f64>,
    pub vertical_rate_ft_per_min: Option<f64>,
    pub data_source: Option<String>,
    pub is_on_ground: bool,
    pub is_ascending: bool,
    pub is_descending: bool,
    pub suburb_hash: Option<String>,
}

impl FlightPoint {
    pub fn altitude(&self) -> Option<Altitude> {
        Altitude::from_feet(self.altitude_ft)
    }

    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.longitude, self.latitude) {
            (Some(lon), Some(lat)) => Some((lon, lat)),
            _ => None,
        }
    }

    pub fn projected_position(&self) -> Option<geo::Point<f64>> {
        match (self.projected_x, self.projected_y, self.crs_epsg) {
            (Some(x), Some(y), Some(_)) => Some(geo::Point::new(x, y)),
            _ => None,
        }
    }

    pub fn with_projected_position(mut self, point: geo::Point<f64>, epsg: i32) -> Self {
        self.projected_x = Some(point.x());
        self.projected_y = Some(point.y());
        self.crs_epsg = Some(epsg);
        self
    }

    /// True if this point is in the air: not flagged on-ground and with a
    /// positive barometric altitude, matching the assimilator's airborne
    /// filter (spec.md §4.5).
    pub fn is_airborne(&self) -> bool {
        !self.is_on_ground && matches!(self.altitude(), Some(Altitude::Barometric(ft)) if ft > 0)
    }

    /// Applies the flight-point-correction rule from the original
    /// `attempt_flight_point_correction`: clear ground speed if it exceeds
    /// the aircraft's configured top speed, rather than rejecting the
    /// point (SPEC_FULL.md §2).
    pub fn corrected_for_top_speed(mut self, top_speed_knots: Option<f64>) -> Self {
        if let (Some(top_speed), Some(gs)) = (top_speed_knots, self.ground_speed_knots)
            && gs > top_speed
        {
            self.ground_speed_knots = None;
        }
        self
    }
}

/// Wire shape for `FlightPoint` as posted by a worker (spec.md §6).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightPointWire {
    pub flight_point_hash: Option<String>,
    pub aircraft_icao: String,
    pub date: Option<NaiveDate>,
    pub timestamp: f64,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude: Option<i32>,
    pub ground_speed: Option<f64>,
    pub rotation: Option<f64>,
    pub vertical_rate: Option<f64>,
    #[serde(default)]
    pub is_on_ground: bool,
    #[serde(default)]
    pub is_ascending: bool,
    #[serde(default)]
    pub is_descending: bool,
    pub data_source: Option<String>,
}

impl FlightPointWire {
    /// Derives `day_date` from `timestamp` when `date` is absent (spec.md
    /// §6, §9 "Schema-loader objects").
    pub fn day_date(&self) -> NaiveDate {
        self.date.unwrap_or_else(|| {
            DateTime::<Utc>::from_timestamp(self.timestamp as i64, 0)
                .expect("timestamp in range")
                .date_naive()
        })
    }

    pub fn into_flight_point(self) -> FlightPoint {
        let ts = DateTime::<Utc>::from_timestamp(self.timestamp as i64, 0).expect("timestamp in range");
        let day_date = self.day_date();
        let hash = self.flight_point_hash.clone().unwrap_or_else(|| {
            flight_point_hash(
                &self.aircraft_icao,
                ts,
                self.longitude,
                self.latitude,
                Altitude::from_feet(self.altitude),
            )
        });
        FlightPoint {
            flight_point_hash: hash,
            aircraft_icao: self.aircraft_icao,
            day_date,
            flight_hash: None,
            timestamp: ts,
            longitude: self.longitude,
            latitude: self.latitude,
            projected_x: None,
            projected_y: None,
            crs_epsg: None,
            utm_epsg_zone: None,
            altitude_ft: self.altitude,
            ground_speed_knots: self.ground_speed,
            track_deg: self.rotation,
            vertical_rate_ft_per_min: self.vertical_rate,
            data_source: self.data_source,
            is_on_ground: self.is_on_ground,
            is_ascending: self.is_ascending,
            is_descending: self.is_descending,
            suburb_hash: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_is_pure_function_of_quintuple() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let a = flight_point_hash("7c68b7", ts, Some(151.2), Some(-33.8), Some(Altitude::Barometric(1000)));
        let b = flight_point_hash("7c68b7", ts, Some(151.2), Some(-33.8), Some(Altitude::Barometric(1000)));
        assert_eq!(a, b);
    }

    #[test]
    fn hash_changes_with_altitude() {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let a = flight_point_hash("7c68b7", ts, Some(151.2), Some(-33.8), Some(Altitude::Ground));
        let b = flight_point_hash("7c68b7", ts, Some(151.2), Some(-33.8), Some(Altitude::Barometric(1000)));
        assert_ne!(a, b);
    }

    #[test]
    fn ground_speed_cleared_when_over_top_speed() {
        let point = FlightPoint {
            flight_point_hash: "x".into(),
            aircraft_icao: "7c68b7".into(),
            day_date: NaiveDate::from_ymd_opt(2022, 7, 29).unwrap(),
            flight_hash: None,
            timestamp: DateTime::from_timestamp(0, 0).unwrap(),
            longitude: None,
            latitude: None,
            projected_x: None,
            projected_y: None,
            crs_epsg: None,
            utm_epsg_zone: None,
            altitude_ft: None,
            ground_speed_knots: Some(500.0),
            track_deg: None,
            vertical_rate_ft_per_min: None,
            data_source: None,
            is_on_ground: false,
            is_ascending: false,
            is_descending: false,
            suburb_hash: None,
        };
        let corrected = point.corrected_for_top_speed(Some(250.0));
        assert_eq!(corrected.ground_speed_knots, None);
    }
}
