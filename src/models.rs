use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One intercepted calendar API response, as written to the capture file.
///
/// Reading is lenient: a null or non-string `url` and a missing or
/// non-integer `status` never make the capture file unreadable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapturedResponse {
    #[serde(default, deserialize_with = "lenient_url")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: i64,
    #[serde(default)]
    pub body: Value,
}

fn lenient_url<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn lenient_status<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match &value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}

/// Flat event row. Every field is always serialized, absent values as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEvent {
    pub name: Option<Value>,
    pub url: Option<String>,
    pub geo_address_info_city: Option<Value>,
    pub geo_address_info_type: Option<Value>,
    pub geo_address_info_region: Option<Value>,
    pub geo_address_info_address: Option<Value>,
    pub geo_address_info_country: Option<Value>,
    pub geo_address_info_place_id: Option<Value>,
    pub geo_address_info_city_state: Option<Value>,
    pub geo_address_info_description: Option<Value>,
    pub geo_address_info_country_code: Option<Value>,
    pub geo_address_info_full_address: Option<Value>,
    pub geo_address_info_apple_maps_place_id: Option<Value>,
    pub geo_address_info_mode: Option<Value>,
    pub geo_address_visibility: Option<Value>,
    pub latitude: Option<Value>,
    pub longitude: Option<Value>,
    pub ticket_is_free: Option<Value>,
    pub ticket_price_usd: Option<f64>,
    pub ticket_require_approval: Option<Value>,
    pub ticket_is_sold_out: Option<Value>,
    pub ticket_count: Option<Value>,
    pub guest_count: Option<Value>,
    pub ticket_max_price: Option<Value>,
    pub ticket_spots_remaining: Option<Value>,
    pub ticket_is_near_capacity: Option<Value>,
    pub ticket_currency_info: Option<Value>,
    pub waitlist_enabled: Option<Value>,
}

impl ExtractedEvent {
    pub const CSV_HEADERS: [&'static str; 28] = [
        "name",
        "url",
        "geo_address_info_city",
        "geo_address_info_type",
        "geo_address_info_region",
        "geo_address_info_address",
        "geo_address_info_country",
        "geo_address_info_place_id",
        "geo_address_info_city_state",
        "geo_address_info_description",
        "geo_address_info_country_code",
        "geo_address_info_full_address",
        "geo_address_info_apple_maps_place_id",
        "geo_address_info_mode",
        "geo_address_visibility",
        "latitude",
        "longitude",
        "ticket_is_free",
        "ticket_price_usd",
        "ticket_require_approval",
        "ticket_is_sold_out",
        "ticket_count",
        "guest_count",
        "ticket_max_price",
        "ticket_spots_remaining",
        "ticket_is_near_capacity",
        "ticket_currency_info",
        "waitlist_enabled",
    ];

    /// Row in `CSV_HEADERS` order. Nested values are written as compact JSON.
    pub fn to_csv_record(&self) -> Vec<String> {
        vec![
            csv_cell(&self.name),
            self.url.clone().unwrap_or_default(),
            csv_cell(&self.geo_address_info_city),
            csv_cell(&self.geo_address_info_type),
            csv_cell(&self.geo_address_info_region),
            csv_cell(&self.geo_address_info_address),
            csv_cell(&self.geo_address_info_country),
            csv_cell(&self.geo_address_info_place_id),
            csv_cell(&self.geo_address_info_city_state),
            csv_cell(&self.geo_address_info_description),
            csv_cell(&self.geo_address_info_country_code),
            csv_cell(&self.geo_address_info_full_address),
            csv_cell(&self.geo_address_info_apple_maps_place_id),
            csv_cell(&self.geo_address_info_mode),
            csv_cell(&self.geo_address_visibility),
            csv_cell(&self.latitude),
            csv_cell(&self.longitude),
            csv_cell(&self.ticket_is_free),
            self.ticket_price_usd.map(|p| p.to_string()).unwrap_or_default(),
            csv_cell(&self.ticket_require_approval),
            csv_cell(&self.ticket_is_sold_out),
            csv_cell(&self.ticket_count),
            csv_cell(&self.guest_count),
            csv_cell(&self.ticket_max_price),
            csv_cell(&self.ticket_spots_remaining),
            csv_cell(&self.ticket_is_near_capacity),
            csv_cell(&self.ticket_currency_info),
            csv_cell(&self.waitlist_enabled),
        ]
    }
}

fn csv_cell(value: &Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
