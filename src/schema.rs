// Hand-written in the absence of a live database to run `diesel print-schema`
// against (see DESIGN.md). Follows the same column layout the generated
// file would produce.

diesel::table! {
    aircraft (icao) {
        icao -> Varchar,
        aircraft_type -> Nullable<Varchar>,
        flight_name -> Nullable<Varchar>,
        registration -> Nullable<Varchar>,
        description -> Nullable<Varchar>,
        year -> Nullable<Int4>,
        owner_operator -> Nullable<Varchar>,
        image -> Nullable<Text>,
        airport_code -> Nullable<Varchar>,
        top_speed_knots -> Nullable<Float8>,
        fuel_type -> Nullable<Varchar>,
        fuel_gal_per_hour -> Nullable<Float8>,
        fuel_capacity_gal -> Nullable<Float8>,
        range_nm -> Nullable<Float8>,
        endurance_hours -> Nullable<Float8>,
        passenger_load -> Nullable<Int4>,
        co2_per_gram -> Nullable<Float8>,
    }
}

diesel::table! {
    days (date) {
        date -> Date,
    }
}

diesel::table! {
    aircraft_present_days (icao, date) {
        icao -> Varchar,
        date -> Date,
        history_verified -> Bool,
        flights_verified -> Bool,
        geolocation_verified -> Bool,
    }
}

diesel::table! {
    states (code) {
        code -> Varchar,
    }
}

diesel::table! {
    suburbs (suburb_hash) {
        suburb_hash -> Bpchar,
        name -> Varchar,
        postcode -> Nullable<Varchar>,
        state_code -> Varchar,
        min_x -> Float8,
        min_y -> Float8,
        max_x -> Float8,
        max_y -> Float8,
        utm_epsg_zones -> Array<Int4>,
        // GeoJSON geometry; excluded from default queries (use raw queries
        // for geometry), mirroring the teacher's airspace table.
        geometry -> Jsonb,
    }
}

diesel::table! {
    suburb_neighbours (suburb_hash, neighbour_hash) {
        suburb_hash -> Bpchar,
        neighbour_hash -> Bpchar,
    }
}

diesel::table! {
    airports (airport_hash) {
        airport_hash -> Bpchar,
        name -> Varchar,
        latitude -> Float8,
        longitude -> Float8,
        buffer_meters -> Float8,
        utm_epsg_zones -> Array<Int4>,
        geometry -> Jsonb,
    }
}

diesel::table! {
    flights (flight_hash) {
        flight_hash -> Uuid,
        aircraft_icao -> Varchar,
        takeoff_airport_hash -> Nullable<Bpchar>,
        landing_airport_hash -> Nullable<Bpchar>,
        distance_meters -> Nullable<Float8>,
        fuel_gallons -> Nullable<Float8>,
        avg_speed_knots -> Nullable<Float8>,
        avg_altitude_ft -> Nullable<Float8>,
        total_minutes -> Nullable<Int4>,
        prohibited_minutes -> Nullable<Int4>,
        total_co2_kg -> Nullable<Float8>,
        has_departure_details -> Bool,
        has_arrival_details -> Bool,
        taxi_only -> Bool,
        is_on_ground -> Bool,
        first_point_ts -> Timestamptz,
        last_point_ts -> Timestamptz,
    }
}

diesel::table! {
    flight_points (flight_point_hash) {
        flight_point_hash -> Bpchar,
        aircraft_icao -> Varchar,
        day_date -> Date,
        flight_hash -> Nullable<Uuid>,
        timestamp -> Timestamptz,
        longitude -> Nullable<Float8>,
        latitude -> Nullable<Float8>,
        projected_x -> Nullable<Float8>,
        projected_y -> Nullable<Float8>,
        crs_epsg -> Nullable<Int4>,
        utm_epsg_zone -> Nullable<Int4>,
        altitude_ft -> Nullable<Int4>,
        ground_speed_knots -> Nullable<Float8>,
        track_deg -> Nullable<Float8>,
        vertical_rate_ft_per_min -> Nullable<Float8>,
        data_source -> Nullable<Varchar>,
        is_on_ground -> Bool,
        is_ascending -> Bool,
        is_descending -> Bool,
        suburb_hash -> Nullable<Bpchar>,
    }
}

diesel::table! {
    workers (name) {
        name -> Varchar,
        unique_id -> Varchar,
        worker_type -> Varchar,
        enabled -> Bool,
        phone_home_url -> Nullable<Text>,
        proxy_url -> Nullable<Text>,
        pid -> Nullable<Int4>,
        running -> Bool,
        initialising -> Bool,
        executed_at -> Nullable<Timestamptz>,
        shutdown_at -> Nullable<Timestamptz>,
        init_started_at -> Nullable<Timestamptz>,
        last_update -> Nullable<Timestamptz>,
        error_json -> Nullable<Jsonb>,
    }
}

diesel::table! {
    worker_locks (worker_name, icao, date) {
        worker_name -> Varchar,
        icao -> Varchar,
        date -> Date,
    }
}

diesel::joinable!(flight_points -> aircraft (aircraft_icao));
diesel::joinable!(flight_points -> flights (flight_hash));
diesel::joinable!(flights -> aircraft (aircraft_icao));
diesel::joinable!(suburbs -> states (state_code));
diesel::joinable!(aircraft_present_days -> aircraft (icao));
diesel::joinable!(worker_locks -> workers (worker_name));

diesel::allow_tables_to_appear_in_same_query!(
    aircraft,
    aircraft_present_days,
    airports,
    days,
    flight_points,
    flights,
    states,
    suburb_neighbours,
    suburbs,
    worker_locks,
    workers,
);
