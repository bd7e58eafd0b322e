use crate::room::Room;
use crate::week::WeekKey;
use chrono::NaiveDate;
use log::info;
use serde_json::{json, Map, Value};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MigrationError {
    #[error("Stored room is not a JSON object")]
    NotAnObject,
    #[error("Stored room does not decode: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Shapes a room blob has had over time
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SchemaVersion {
    /// `{players, availability}`: a single, undated week
    Legacy,
    /// `{players, weeks, events}`; `events` may still be missing
    Current,
}

pub fn detect(blob: &Map<String, Value>) -> SchemaVersion {
    match blob.get("weeks") {
        Some(weeks) if !weeks.is_null() => SchemaVersion::Current,
        _ => SchemaVersion::Legacy,
    }
}

/// Rewrites a legacy blob into the current shape, filing its availability
/// under the week containing `today`.
pub fn upgrade_legacy(blob: &Map<String, Value>, today: NaiveDate) -> Value {
    let players = blob.get("players").cloned().unwrap_or_else(|| json!([]));
    let availability = blob
        .get("availability")
        .cloned()
        .unwrap_or_else(|| json!({}));

    let mut weeks = Map::new();
    weeks.insert(
        WeekKey::this_week(today).to_string(),
        json!({ "availability": availability }),
    );

    json!({
        "players": players,
        "weeks": weeks,
        "events": {},
    })
}

/// Decodes a stored blob of any known shape into the current `Room`
///
/// # Examples
/// ```
/// use chrono::NaiveDate;
/// use guildplan_libs::migrate::upgrade;
/// use guildplan_libs::week::WeekKey;
/// use serde_json::json;
///
/// let today = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
/// let legacy = json!({ "players": [{ "id": "p1", "name": "Shadowheart" }], "availability": {} });
///
/// let room = upgrade(legacy, today).unwrap();
/// assert_eq!(room.players[0].name, "Shadowheart");
/// assert!(room.weeks.contains_key(&WeekKey::this_week(today)));
/// ```
pub fn upgrade(blob: Value, today: NaiveDate) -> Result<Room, MigrationError> {
    let object = match blob {
        Value::Object(object) => object,
        _ => return Err(MigrationError::NotAnObject),
    };

    let current = match detect(&object) {
        SchemaVersion::Current => Value::Object(object),
        SchemaVersion::Legacy => {
            info!("upgrading legacy room shape into week {}", WeekKey::this_week(today));
            upgrade_legacy(&object, today)
        }
    };

    Ok(serde_json::from_value(current)?)
}
