use crate::debug_println;
use crate::models::{CapturedResponse, ExtractedEvent};
use crate::utils;
use anyhow::Result;
use serde_json::{Map, Value};
use std::path::Path;

pub const BASE_EVENT_URL: &str = "https://luma.com/";

/// Collect every mapping whose `event` key holds a mapping, depth first.
/// Matches are recursed into as well, so nested records are found too.
pub fn find_event_records(value: &Value) -> Vec<&Map<String, Value>> {
    let mut found = Vec::new();
    collect_event_records(value, &mut found);
    found
}

fn collect_event_records<'a>(value: &'a Value, found: &mut Vec<&'a Map<String, Value>>) {
    match value {
        Value::Object(map) => {
            if matches!(map.get("event"), Some(Value::Object(_))) {
                found.push(map);
            }
            for child in map.values() {
                collect_event_records(child, found);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_event_records(item, found);
            }
        }
        _ => {}
    }
}

/// Falsy in the loose sense: null, false, zero, and empty strings/arrays/objects.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map_or(true, |f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn empty_map() -> &'static Map<String, Value> {
    static EMPTY: std::sync::OnceLock<Map<String, Value>> = std::sync::OnceLock::new();
    EMPTY.get_or_init(Map::new)
}

fn object_field<'a>(map: &'a Map<String, Value>, key: &str) -> &'a Map<String, Value> {
    match map.get(key) {
        Some(Value::Object(inner)) => inner,
        _ => empty_map(),
    }
}

fn field(map: &Map<String, Value>, key: &str) -> Option<Value> {
    map.get(key).filter(|v| !v.is_null()).cloned()
}

pub fn canonical_event_url(path: &str) -> String {
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("{}{}", BASE_EVENT_URL, path)
}

fn ticket_price_usd(ticket: &Map<String, Value>) -> Option<f64> {
    if ticket.get("is_free").is_some_and(is_truthy) {
        return None;
    }
    object_field(ticket, "price")
        .get("cents")
        .and_then(Value::as_f64)
        .map(|cents| cents / 100.0)
}

/// Project one event record onto the flat output schema.
pub fn extract_event_fields(record: &Map<String, Value>) -> ExtractedEvent {
    let ev = object_field(record, "event");
    let geo = object_field(ev, "geo_address_info");
    let coord = object_field(ev, "coordinate");

    // Record-level ticket info wins; the copy nested in the event is a fallback.
    let ticket = match record.get("ticket_info") {
        Some(value) if is_truthy(value) => object_field(record, "ticket_info"),
        _ => object_field(ev, "ticket_info"),
    };

    let url = match ev.get("url") {
        Some(Value::String(path)) if !path.is_empty() => Some(canonical_event_url(path)),
        _ => None,
    };

    ExtractedEvent {
        name: field(ev, "name"),
        url,
        geo_address_info_city: field(geo, "city"),
        geo_address_info_type: field(geo, "type"),
        geo_address_info_region: field(geo, "region"),
        geo_address_info_address: field(geo, "address"),
        geo_address_info_country: field(geo, "country"),
        geo_address_info_place_id: field(geo, "place_id"),
        geo_address_info_city_state: field(geo, "city_state"),
        geo_address_info_description: field(geo, "description"),
        geo_address_info_country_code: field(geo, "country_code"),
        geo_address_info_full_address: field(geo, "full_address"),
        geo_address_info_apple_maps_place_id: field(geo, "apple_maps_place_id"),
        geo_address_info_mode: field(geo, "mode"),
        geo_address_visibility: field(ev, "geo_address_visibility"),
        latitude: field(coord, "latitude"),
        longitude: field(coord, "longitude"),
        ticket_is_free: field(ticket, "is_free"),
        ticket_price_usd: ticket_price_usd(ticket),
        ticket_require_approval: field(ticket, "require_approval"),
        ticket_is_sold_out: field(ticket, "is_sold_out"),
        ticket_count: field(record, "ticket_count"),
        guest_count: field(record, "guest_count"),
        ticket_max_price: field(ticket, "max_price"),
        ticket_spots_remaining: field(ticket, "spots_remaining"),
        ticket_is_near_capacity: field(ticket, "is_near_capacity"),
        ticket_currency_info: field(ticket, "currency_info"),
        waitlist_enabled: field(ev, "waitlist_enabled"),
    }
}

pub fn extract_events(captures: &[CapturedResponse]) -> Vec<ExtractedEvent> {
    let mut events = Vec::new();

    for capture in captures {
        if !is_truthy(&capture.body) {
            debug_println!("Skipping empty body from {}", capture.url);
            continue;
        }

        let records = find_event_records(&capture.body);
        debug_println!("Found {} event records in {}", records.len(), capture.url);
        events.extend(records.into_iter().map(extract_event_fields));
    }

    events
}

/// Read a capture file and return `(number of captures, extracted events)`.
pub fn parse_capture_to_events<P: AsRef<Path>>(capture_path: P) -> Result<(usize, Vec<ExtractedEvent>)> {
    let captures = utils::load_captures(capture_path)?;
    let events = extract_events(&captures);
    Ok((captures.len(), events))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn record(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn capture(body: Value) -> CapturedResponse {
        CapturedResponse {
            url: "https://api2.luma.com/calendar/get-items?calendar_api_id=cal-1".to_string(),
            status: 200,
            body,
        }
    }

    #[test]
    fn test_find_records_in_paginated_wrapper() {
        let body = json!({
            "entries": [
                {"api_id": "a", "event": {"name": "First"}},
                {"api_id": "b", "event": {"name": "Second"}}
            ],
            "has_more": true,
            "next_cursor": "abc"
        });

        let found = find_event_records(&body);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0]["api_id"], "a");
        assert_eq!(found[1]["api_id"], "b");
    }

    #[test]
    fn test_find_nested_matches_in_depth_first_order() {
        let body = json!({
            "event": {"name": "outer", "related": [{"event": {"name": "inner"}}]},
            "tail": [[{"event": {"name": "deep"}}]]
        });

        let names: Vec<&Value> = find_event_records(&body)
            .into_iter()
            .map(|r| &r["event"]["name"])
            .collect();
        assert_eq!(names, vec!["outer", "inner", "deep"]);
    }

    #[test]
    fn test_event_key_must_hold_a_mapping() {
        let body = json!([
            {"event": "evt-123"},
            {"event": null},
            {"event": ["x"]},
            42,
            "event"
        ]);
        assert!(find_event_records(&body).is_empty());
    }

    #[test]
    fn test_url_derivation() {
        let plain = extract_event_fields(&record(json!({"event": {"url": "my-event"}})));
        let slashed = extract_event_fields(&record(json!({"event": {"url": "/my-event"}})));

        assert_eq!(plain.url.as_deref(), Some("https://luma.com/my-event"));
        assert_eq!(slashed.url, plain.url);
    }

    #[test]
    fn test_only_one_leading_slash_stripped() {
        let event = extract_event_fields(&record(json!({"event": {"url": "//x"}})));
        assert_eq!(event.url.as_deref(), Some("https://luma.com//x"));
    }

    #[test]
    fn test_empty_or_missing_url_is_null() {
        assert_eq!(extract_event_fields(&record(json!({"event": {"url": ""}}))).url, None);
        assert_eq!(extract_event_fields(&record(json!({"event": {}}))).url, None);
    }

    #[test]
    fn test_price_derivation() {
        let paid = extract_event_fields(&record(json!({
            "event": {},
            "ticket_info": {"is_free": false, "price": {"cents": 2500}}
        })));
        assert_eq!(paid.ticket_price_usd, Some(25.0));
        assert_eq!(paid.ticket_is_free, Some(json!(false)));

        let free = extract_event_fields(&record(json!({
            "event": {},
            "ticket_info": {"is_free": true, "price": {"cents": 2500}}
        })));
        assert_eq!(free.ticket_price_usd, None);
    }

    #[test]
    fn test_price_without_cents_is_null() {
        let event = extract_event_fields(&record(json!({
            "event": {},
            "ticket_info": {"is_free": false, "price": null}
        })));
        assert_eq!(event.ticket_price_usd, None);
    }

    #[test]
    fn test_ticket_info_falls_back_to_event() {
        let event = extract_event_fields(&record(json!({
            "event": {"ticket_info": {"is_sold_out": true, "spots_remaining": 0}},
            "ticket_info": null
        })));
        assert_eq!(event.ticket_is_sold_out, Some(json!(true)));
        assert_eq!(event.ticket_spots_remaining, Some(json!(0)));
    }

    #[test]
    fn test_missing_nested_objects_yield_nulls() {
        let event = extract_event_fields(&record(json!({
            "event": {"name": "Bare", "geo_address_info": "hidden", "coordinate": null}
        })));

        assert_eq!(event.name, Some(json!("Bare")));
        assert_eq!(event.geo_address_info_city, None);
        assert_eq!(event.geo_address_info_full_address, None);
        assert_eq!(event.latitude, None);
        assert_eq!(event.longitude, None);
        assert_eq!(event.ticket_is_free, None);
        assert_eq!(event.ticket_price_usd, None);
        assert_eq!(event.ticket_currency_info, None);

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["latitude"], Value::Null);
        assert!(json.as_object().unwrap().contains_key("ticket_price_usd"));
    }

    #[test]
    fn test_full_record_projection() {
        let event = extract_event_fields(&record(json!({
            "event": {
                "name": "Café Meetup",
                "url": "cafe-meetup",
                "geo_address_visibility": "public",
                "waitlist_enabled": false,
                "coordinate": {"latitude": -34.6, "longitude": -58.38},
                "geo_address_info": {
                    "city": "Buenos Aires",
                    "country_code": "AR",
                    "mode": "shown"
                }
            },
            "guest_count": 120,
            "ticket_count": 80,
            "ticket_info": {"currency_info": {"currency": "usd"}, "max_price": null}
        })));

        assert_eq!(event.name, Some(json!("Café Meetup")));
        assert_eq!(event.url.as_deref(), Some("https://luma.com/cafe-meetup"));
        assert_eq!(event.geo_address_info_city, Some(json!("Buenos Aires")));
        assert_eq!(event.geo_address_info_country_code, Some(json!("AR")));
        assert_eq!(event.geo_address_info_mode, Some(json!("shown")));
        assert_eq!(event.geo_address_visibility, Some(json!("public")));
        assert_eq!(event.latitude, Some(json!(-34.6)));
        assert_eq!(event.longitude, Some(json!(-58.38)));
        assert_eq!(event.guest_count, Some(json!(120)));
        assert_eq!(event.ticket_count, Some(json!(80)));
        assert_eq!(event.ticket_currency_info, Some(json!({"currency": "usd"})));
        assert_eq!(event.ticket_max_price, None);
        assert_eq!(event.waitlist_enabled, Some(json!(false)));
    }

    #[test]
    fn test_empty_bodies_are_skipped() {
        let captures = vec![
            capture(Value::Null),
            capture(json!({})),
            capture(json!([])),
            capture(json!({"entries": [{"event": {"name": "Kept"}}]})),
        ];

        let events = extract_events(&captures);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].name, Some(json!("Kept")));
    }

    #[test]
    fn test_raw_text_bodies_produce_no_events() {
        let captures = vec![capture(json!({"raw_text": "<html>rate limited</html>"}))];
        assert!(extract_events(&captures).is_empty());
    }

    #[test]
    fn test_parse_capture_file() {
        let mut file = NamedTempFile::new().unwrap();
        let captures = json!([
            {"url": "u1", "status": 200, "body": {"entries": [{"event": {"name": "A"}}]}},
            {"url": "u2", "status": 200, "body": null},
            {"url": "u3", "status": 200, "body": {"entries": [{"event": {"name": "B"}}, {"event": {"name": "C"}}]}}
        ]);
        write!(file, "{}", captures).unwrap();

        let (count, events) = parse_capture_to_events(file.path()).unwrap();
        assert_eq!(count, 3);
        let names: Vec<_> = events.iter().map(|e| e.name.clone().unwrap()).collect();
        assert_eq!(names, vec![json!("A"), json!("B"), json!("C")]);
    }

    #[test]
    fn test_malformed_capture_file_is_an_error() {
        let mut not_json = NamedTempFile::new().unwrap();
        write!(not_json, "[{{\"url\": ").unwrap();
        assert!(parse_capture_to_events(not_json.path()).is_err());

        let mut not_array = NamedTempFile::new().unwrap();
        write!(not_array, "{{\"url\": \"u\", \"status\": 200, \"body\": {{}}}}").unwrap();
        assert!(parse_capture_to_events(not_array.path()).is_err());
    }
}
