use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Storage source ---

/// Which persistence backend a document's saves target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageSource {
    #[default]
    Local,
    Drive,
}

impl StorageSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageSource::Local => "local",
            StorageSource::Drive => "drive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "local" => Some(StorageSource::Local),
            "drive" => Some(StorageSource::Drive),
            _ => None,
        }
    }
}

impl std::fmt::Display for StorageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Map pins ---

/// The fixed symbol set for map pins. Unknown strings deserialize to `Other`
/// so an unrecognized type renders as a generic marker instead of failing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum PinType {
    Capital,
    City,
    Town,
    Village,
    Harbor,
    Fort,
    Ruin,
    Dungeon,
    Landmark,
    Camp,
    Other,
}

impl PinType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PinType::Capital => "Capital",
            PinType::City => "City",
            PinType::Town => "Town",
            PinType::Village => "Village",
            PinType::Harbor => "Harbor",
            PinType::Fort => "Fort",
            PinType::Ruin => "Ruin",
            PinType::Dungeon => "Dungeon",
            PinType::Landmark => "Landmark",
            PinType::Camp => "Camp",
            PinType::Other => "Other",
        }
    }

    /// Lookup by stored name. Anything outside the fixed set maps to `Other`.
    pub fn from_name(s: &str) -> Self {
        match s {
            "Capital" => PinType::Capital,
            "City" => PinType::City,
            "Town" => PinType::Town,
            "Village" => PinType::Village,
            "Harbor" => PinType::Harbor,
            "Fort" => PinType::Fort,
            "Ruin" => PinType::Ruin,
            "Dungeon" => PinType::Dungeon,
            "Landmark" => PinType::Landmark,
            "Camp" => PinType::Camp,
            _ => PinType::Other,
        }
    }
}

impl Default for PinType {
    fn default() -> Self {
        PinType::Other
    }
}

impl<'de> Deserialize<'de> for PinType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(PinType::from_name(&name))
    }
}

impl std::fmt::Display for PinType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named, typed point annotation on the world map. Coordinates are
/// percentages (0–100) of the displayed map size, not pixels, so pins
/// stay put when the map is shown at a different resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapPin {
    pub id: String,
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: PinType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub x: f64,
    pub y: f64,
}

/// Descriptor of the uploaded map raster. The raster bytes themselves live
/// in remote storage, never inside the document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapMeta {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type")]
    pub content_type: String,
    pub uploaded: DateTime<Utc>,
}

// --- Entities ---

/// A loosely-typed entity list element (country, town, NPC, faction).
/// Only `name` is guaranteed; everything else rides along untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EntityRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            extra: serde_json::Map::new(),
        }
    }
}

// --- World document ---

/// The root JSON record for one user-authored fictional setting. This is
/// the sole unit of persistence: saves and loads always move the whole
/// document, never individual fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldDocument {
    #[serde(default, alias = "worldName")]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub in_world_date: String,
    #[serde(default)]
    pub summary: String,

    #[serde(default)]
    pub countries: Vec<EntityRecord>,
    #[serde(default)]
    pub towns: Vec<EntityRecord>,
    #[serde(default)]
    pub npcs: Vec<EntityRecord>,
    #[serde(default)]
    pub factions: Vec<EntityRecord>,
    #[serde(default)]
    pub events: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbeg: Option<Value>,
    #[serde(default)]
    pub market: serde_json::Map<String, Value>,
    #[serde(default)]
    pub journal: Vec<Value>,

    /// Named bookmarks, distinct from map pins.
    #[serde(default)]
    pub pins: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub map_meta: Option<MapMeta>,
    #[serde(default)]
    pub map_pins: Vec<MapPin>,

    // Reserved map layers, currently always empty.
    #[serde(default)]
    pub map_regions: Vec<Value>,
    #[serde(default)]
    pub map_roads: Vec<Value>,
    #[serde(default)]
    pub map_rivers: Vec<Value>,
    #[serde(default)]
    pub map_borders: Vec<Value>,
    #[serde(default)]
    pub map_mountains: Vec<Value>,
    #[serde(default)]
    pub map_geography: Vec<Value>,
    #[serde(default)]
    pub map_elevation: Vec<Value>,
    #[serde(default)]
    pub map_corruption: Vec<Value>,
    #[serde(default)]
    pub map_factions: Vec<Value>,

    /// Remote identifier assigned by the first successful Drive save.
    /// Carried forward on every later save of the same document so the
    /// remote copy is updated in place rather than duplicated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_id: Option<String>,
}

impl WorldDocument {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: Some(Utc::now()),
            campaign_start: None,
            in_world_date: String::new(),
            summary: String::new(),
            countries: Vec::new(),
            towns: Vec::new(),
            npcs: Vec::new(),
            factions: Vec::new(),
            events: Vec::new(),
            bbeg: None,
            market: serde_json::Map::new(),
            journal: Vec::new(),
            pins: Vec::new(),
            map_meta: None,
            map_pins: Vec::new(),
            map_regions: Vec::new(),
            map_roads: Vec::new(),
            map_rivers: Vec::new(),
            map_borders: Vec::new(),
            map_mountains: Vec::new(),
            map_geography: Vec::new(),
            map_elevation: Vec::new(),
            map_corruption: Vec::new(),
            map_factions: Vec::new(),
            file_id: None,
        }
    }

    /// Display name, falling back to the conventional placeholder.
    pub fn display_name(&self) -> &str {
        if self.name.trim().is_empty() {
            "Unnamed World"
        } else {
            &self.name
        }
    }

    /// `<name_with_underscores>.json`, the conventional save filename.
    pub fn derived_filename(&self) -> String {
        let trimmed = self.name.trim();
        if trimmed.is_empty() {
            return "world.json".to_string();
        }
        let base: Vec<&str> = trimmed.split_whitespace().collect();
        format!("{}.json", base.join("_"))
    }

    /// Whole days since the campaign epoch, preferring `campaign_start`
    /// over `created` when set.
    pub fn days_elapsed(&self, now: DateTime<Utc>) -> Option<i64> {
        let epoch = self.campaign_start.or(self.created)?;
        Some((now - epoch).num_days())
    }

    /// Replace the map descriptor. A new map invalidates every existing
    /// placement, so pins and regions are cleared in the same operation.
    pub fn attach_map(&mut self, meta: MapMeta) {
        self.map_meta = Some(meta);
        self.map_pins.clear();
        self.map_regions.clear();
    }

    pub fn push_map_pin(&mut self, pin: MapPin) {
        self.map_pins.push(pin);
    }

    /// Replace a pin's editable fields in place, located by id.
    /// Position and id are stable across edits.
    pub fn update_map_pin(
        &mut self,
        id: &str,
        name: String,
        kind: PinType,
        note: Option<String>,
    ) -> bool {
        match self.map_pins.iter_mut().find(|p| p.id == id) {
            Some(pin) => {
                pin.name = name;
                pin.kind = kind;
                pin.note = note;
                true
            }
            None => false,
        }
    }

    pub fn remove_map_pin(&mut self, id: &str) -> bool {
        let before = self.map_pins.len();
        self.map_pins.retain(|p| p.id != id);
        self.map_pins.len() != before
    }

    pub fn add_bookmark(&mut self, text: impl Into<String>) {
        self.pins.push(text.into());
    }

    pub fn remove_bookmark(&mut self, index: usize) -> Option<String> {
        if index < self.pins.len() {
            Some(self.pins.remove(index))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_world() -> WorldDocument {
        let mut world = WorldDocument::new("Eldoria");
        world.summary = "A realm of storms".to_string();
        world.in_world_date = "3rd of Frostfall, 1242".to_string();
        world.countries.push(EntityRecord::named("Valmere"));
        world.towns.push(EntityRecord::named("Port Talon"));
        world.add_bookmark("Session 3 cliffhanger");
        world.attach_map(MapMeta {
            name: "eldoria.png".to_string(),
            size: 48_213,
            content_type: "image/png".to_string(),
            uploaded: Utc::now(),
        });
        world.push_map_pin(MapPin {
            id: "pin-1".to_string(),
            name: "Port Talon".to_string(),
            kind: PinType::Harbor,
            note: Some("Smuggler haven".to_string()),
            x: 50.0,
            y: 50.0,
        });
        world
    }

    #[test]
    fn round_trip_is_stable() {
        let world = sample_world();
        let first = serde_json::to_string(&world).unwrap();
        let parsed: WorldDocument = serde_json::from_str(&first).unwrap();
        let second = serde_json::to_string(&parsed).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn replacing_map_clears_pins_and_regions_together() {
        let mut world = sample_world();
        world.map_regions.push(serde_json::json!({"name": "Northlands"}));
        assert!(!world.map_pins.is_empty());

        world.attach_map(MapMeta {
            name: "eldoria-v2.png".to_string(),
            size: 90_000,
            content_type: "image/png".to_string(),
            uploaded: Utc::now(),
        });

        assert!(world.map_pins.is_empty());
        assert!(world.map_regions.is_empty());
        assert_eq!(world.map_meta.as_ref().unwrap().name, "eldoria-v2.png");
    }

    #[test]
    fn update_and_remove_pin_by_id() {
        let mut world = sample_world();
        assert!(world.update_map_pin("pin-1", "Talon Rock".into(), PinType::Fort, None));
        let pin = &world.map_pins[0];
        assert_eq!(pin.name, "Talon Rock");
        assert_eq!(pin.kind, PinType::Fort);
        assert_eq!(pin.note, None);
        assert_eq!(pin.id, "pin-1");
        assert_eq!((pin.x, pin.y), (50.0, 50.0));

        assert!(!world.update_map_pin("missing", "x".into(), PinType::Camp, None));
        assert!(world.remove_map_pin("pin-1"));
        assert!(world.map_pins.is_empty());
        assert!(!world.remove_map_pin("pin-1"));
    }

    #[test]
    fn unknown_or_missing_pin_type_falls_back_to_other() {
        let pin: MapPin = serde_json::from_str(
            r#"{"id":"p","name":"Mt. Ash","type":"Volcano","x":10.0,"y":20.0}"#,
        )
        .unwrap();
        assert_eq!(pin.kind, PinType::Other);

        let pin: MapPin =
            serde_json::from_str(r#"{"id":"p","name":"Mt. Ash","x":10.0,"y":20.0}"#).unwrap();
        assert_eq!(pin.kind, PinType::Other);
    }

    #[test]
    fn legacy_world_name_key_is_accepted() {
        let world: WorldDocument =
            serde_json::from_str(r#"{"worldName":"Old Realm","countries":[],"towns":[],"npcs":[]}"#)
                .unwrap();
        assert_eq!(world.name, "Old Realm");
        assert!(world.created.is_none());
    }

    #[test]
    fn derived_filename_replaces_whitespace() {
        let world = WorldDocument::new("The  Sunken   Coast");
        assert_eq!(world.derived_filename(), "The_Sunken_Coast.json");
        assert_eq!(WorldDocument::new("").derived_filename(), "world.json");
    }

    #[test]
    fn display_name_falls_back_when_unset() {
        assert_eq!(WorldDocument::new("").display_name(), "Unnamed World");
        assert_eq!(WorldDocument::new("Eldoria").display_name(), "Eldoria");
    }
}
