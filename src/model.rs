//! Map item data model
//!
//! [`Item`] is the canonical client-side record for one map entity (unit,
//! contact, point, alarm, drawing, route or report), matching the JSON the
//! backend serves from `/unit` and pushes over the WebSocket. [`ItemUpdate`]
//! is the wire patch shape: every field optional, so a shallow field-level
//! merge can tell "absent" from "present with a default value".

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// CoT type code that cancels (removes) an existing item instead of
/// upserting it.
pub const CANCEL_TYPE: &str = "b-a-o-can";

/// Item category, drives which map layer and form the renderer uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Unit,
    Contact,
    #[default]
    Point,
    Alarm,
    Drawing,
    Route,
    Report,
}

impl Category {
    /// Lowercase wire name of the category.
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Unit => "unit",
            Category::Contact => "contact",
            Category::Point => "point",
            Category::Alarm => "alarm",
            Category::Drawing => "drawing",
            Category::Route => "route",
            Category::Report => "report",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Unknown category strings fall back to Point rather than failing the
// whole record: the store is defensively permissive about data quality.
impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(match s.as_str() {
            "unit" => Category::Unit,
            "contact" => Category::Contact,
            "point" => Category::Point,
            "alarm" => Category::Alarm,
            "drawing" => Category::Drawing,
            "route" => Category::Route,
            "report" => Category::Report,
            _ => Category::Point,
        })
    }
}

/// CASEVAC (MEDEVAC request) detail attached to report items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasevacDetail {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub title: String,
    pub casevac: bool,
    pub freq: f64,
    pub urgent: i32,
    pub priority: i32,
    pub routine: i32,
    pub hoist: bool,
    pub ventilator: bool,
    pub equipment_other: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub equipment_detail: String,
    pub litter: i32,
    pub ambulatory: i32,
    pub security: i32,
    pub hlz_marking: i32,
    pub us_military: i32,
    pub us_civilian: i32,
    pub nonus_military: i32,
    pub nonus_civilian: i32,
    pub epw: i32,
    pub child: i32,
    pub terrain_slope: bool,
    pub terrain_rough: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub obstacles: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub terrain_slope_dir: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub medline_remarks: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone_prot_selection: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone_protected_coord: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub zone_prot_marker: String,
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

/// One map entity as held by the store.
///
/// Field set matches the backend's unit JSON. Renderer-only handles
/// (markers, polygons) are deliberately not part of this schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Globally unique, stable identity key. Immutable once set.
    pub uid: String,
    #[serde(default)]
    pub category: Category,
    /// CoT classification code, e.g. `a-f-G-U-C`.
    #[serde(rename = "type", default)]
    pub cot_type: String,
    #[serde(default)]
    pub sidc: String,
    #[serde(default)]
    pub callsign: String,
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub team: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub lat: f64,
    #[serde(default)]
    pub lon: f64,
    #[serde(default)]
    pub hae: f64,
    #[serde(default)]
    pub speed: f64,
    #[serde(default)]
    pub course: f64,
    #[serde(default = "now")]
    pub time: DateTime<Utc>,
    /// Touched on every apply that reaches this item.
    #[serde(default = "now")]
    pub last_seen: DateTime<Utc>,
    #[serde(default = "now")]
    pub stale_time: DateTime<Utc>,
    #[serde(default = "now")]
    pub start_time: DateTime<Utc>,
    #[serde(default = "now")]
    pub send_time: DateTime<Utc>,
    /// Whether this item should be pushed back to the server.
    #[serde(default)]
    pub send: bool,
    /// Client-only item that has not been synced yet.
    #[serde(default)]
    pub local: bool,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub parent_uid: String,
    #[serde(default)]
    pub parent_callsign: String,
    #[serde(default)]
    pub tak_version: String,
    #[serde(default)]
    pub device: String,
    #[serde(default)]
    pub ip_address: String,
    #[serde(default)]
    pub urn: i32,
    #[serde(default)]
    pub missions: Vec<String>,
    /// Ordered `"lat,lon[,hae]"` points for drawings and routes.
    #[serde(default)]
    pub links: Vec<String>,
    #[serde(default)]
    pub web_sensor: String,
    #[serde(default)]
    pub sensor_data: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub casevac_detail: Option<CasevacDetail>,
}

impl Item {
    /// Create an empty item with the given uid. All other fields default;
    /// timestamps start at the current instant.
    pub fn new(uid: impl Into<String>) -> Self {
        let ts = Utc::now();
        Self {
            uid: uid.into(),
            category: Category::default(),
            cot_type: String::new(),
            sidc: String::new(),
            callsign: String::new(),
            scope: String::new(),
            team: String::new(),
            role: String::new(),
            lat: 0.0,
            lon: 0.0,
            hae: 0.0,
            speed: 0.0,
            course: 0.0,
            time: ts,
            last_seen: ts,
            stale_time: ts,
            start_time: ts,
            send_time: ts,
            send: false,
            local: false,
            status: String::new(),
            text: String::new(),
            color: String::new(),
            icon: String::new(),
            parent_uid: String::new(),
            parent_callsign: String::new(),
            tak_version: String::new(),
            device: String::new(),
            ip_address: String::new(),
            urn: 0,
            missions: Vec::new(),
            links: Vec::new(),
            web_sensor: String::new(),
            sensor_data: HashMap::new(),
            casevac_detail: None,
        }
    }

    /// New client-side item with a generated uid, flagged local until the
    /// server echoes it back.
    pub fn new_local(category: Category) -> Self {
        let mut item = Item::new(Uuid::new_v4().to_string());
        item.category = category;
        item.local = true;
        item
    }

    /// Materialize a new item from a wire patch. Returns `None` when the
    /// patch carries no uid.
    pub fn from_update(update: &ItemUpdate) -> Option<Self> {
        if update.uid.is_empty() {
            return None;
        }
        let mut item = Item::new(update.uid.clone());
        item.merge(update);
        Some(item)
    }

    /// Shallow field-level merge: fields absent from the patch keep their
    /// prior values. The uid is identity and never overwritten. Non-finite
    /// numeric values are dropped. `last_seen` is always touched.
    pub fn merge(&mut self, update: &ItemUpdate) {
        if let Some(v) = update.category {
            self.category = v;
        }
        if let Some(v) = &update.cot_type {
            self.cot_type.clone_from(v);
        }
        if let Some(v) = &update.sidc {
            self.sidc.clone_from(v);
        }
        if let Some(v) = &update.callsign {
            self.callsign.clone_from(v);
        }
        if let Some(v) = &update.scope {
            self.scope.clone_from(v);
        }
        if let Some(v) = &update.team {
            self.team.clone_from(v);
        }
        if let Some(v) = &update.role {
            self.role.clone_from(v);
        }
        if let Some(v) = update.lat.filter(|v| v.is_finite()) {
            self.lat = v;
        }
        if let Some(v) = update.lon.filter(|v| v.is_finite()) {
            self.lon = v;
        }
        if let Some(v) = update.hae.filter(|v| v.is_finite()) {
            self.hae = v;
        }
        if let Some(v) = update.speed.filter(|v| v.is_finite()) {
            self.speed = v;
        }
        if let Some(v) = update.course.filter(|v| v.is_finite()) {
            self.course = v;
        }
        if let Some(v) = update.time {
            self.time = v;
        }
        if let Some(v) = update.stale_time {
            self.stale_time = v;
        }
        if let Some(v) = update.start_time {
            self.start_time = v;
        }
        if let Some(v) = update.send_time {
            self.send_time = v;
        }
        if let Some(v) = update.send {
            self.send = v;
        }
        if let Some(v) = update.local {
            self.local = v;
        }
        if let Some(v) = &update.status {
            self.status.clone_from(v);
        }
        if let Some(v) = &update.text {
            self.text.clone_from(v);
        }
        if let Some(v) = &update.color {
            self.color.clone_from(v);
        }
        if let Some(v) = &update.icon {
            self.icon.clone_from(v);
        }
        if let Some(v) = &update.parent_uid {
            self.parent_uid.clone_from(v);
        }
        if let Some(v) = &update.parent_callsign {
            self.parent_callsign.clone_from(v);
        }
        if let Some(v) = &update.tak_version {
            self.tak_version.clone_from(v);
        }
        if let Some(v) = &update.device {
            self.device.clone_from(v);
        }
        if let Some(v) = &update.ip_address {
            self.ip_address.clone_from(v);
        }
        if let Some(v) = update.urn {
            self.urn = v;
        }
        if let Some(v) = &update.missions {
            self.missions.clone_from(v);
        }
        if let Some(v) = &update.links {
            self.links.clone_from(v);
        }
        if let Some(v) = &update.web_sensor {
            self.web_sensor.clone_from(v);
        }
        if let Some(v) = &update.sensor_data {
            self.sensor_data.clone_from(v);
        }
        // Nested payloads are replaced wholesale; the merge is shallow.
        if let Some(v) = &update.casevac_detail {
            self.casevac_detail = Some(v.clone());
        }
        self.last_seen = update.last_seen.unwrap_or_else(Utc::now);
    }
}

/// Wire patch for one item, as delivered by snapshots and push deltas.
///
/// Unknown JSON fields are ignored, keeping renderer-side extras out of the
/// canonical model. `timestamp` is accepted as an alias for `time`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemUpdate {
    pub uid: String,
    pub category: Option<Category>,
    #[serde(rename = "type")]
    pub cot_type: Option<String>,
    pub sidc: Option<String>,
    pub callsign: Option<String>,
    pub scope: Option<String>,
    pub team: Option<String>,
    pub role: Option<String>,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
    pub hae: Option<f64>,
    pub speed: Option<f64>,
    pub course: Option<f64>,
    #[serde(alias = "timestamp")]
    pub time: Option<DateTime<Utc>>,
    pub last_seen: Option<DateTime<Utc>>,
    pub stale_time: Option<DateTime<Utc>>,
    pub start_time: Option<DateTime<Utc>>,
    pub send_time: Option<DateTime<Utc>>,
    pub send: Option<bool>,
    pub local: Option<bool>,
    pub status: Option<String>,
    pub text: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub parent_uid: Option<String>,
    pub parent_callsign: Option<String>,
    pub tak_version: Option<String>,
    pub device: Option<String>,
    pub ip_address: Option<String>,
    pub urn: Option<i32>,
    pub missions: Option<Vec<String>>,
    pub links: Option<Vec<String>>,
    pub web_sensor: Option<String>,
    pub sensor_data: Option<HashMap<String, String>>,
    pub casevac_detail: Option<CasevacDetail>,
    /// Explicit tombstone flag, honored in addition to the sentinel type.
    #[serde(rename = "_delete")]
    pub delete: bool,
}

impl ItemUpdate {
    /// A patch carrying only a uid, used for delete deltas.
    pub fn for_uid(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            ..Self::default()
        }
    }

    /// Whether this patch signals removal of an existing item rather than
    /// an upsert: either the cancel sentinel type or the explicit flag.
    pub fn is_tombstone(&self) -> bool {
        self.delete || self.cot_type.as_deref() == Some(CANCEL_TYPE)
    }
}

impl From<&Item> for ItemUpdate {
    fn from(item: &Item) -> Self {
        Self {
            uid: item.uid.clone(),
            category: Some(item.category),
            cot_type: Some(item.cot_type.clone()),
            sidc: Some(item.sidc.clone()),
            callsign: Some(item.callsign.clone()),
            scope: Some(item.scope.clone()),
            team: Some(item.team.clone()),
            role: Some(item.role.clone()),
            lat: Some(item.lat),
            lon: Some(item.lon),
            hae: Some(item.hae),
            speed: Some(item.speed),
            course: Some(item.course),
            time: Some(item.time),
            last_seen: Some(item.last_seen),
            stale_time: Some(item.stale_time),
            start_time: Some(item.start_time),
            send_time: Some(item.send_time),
            send: Some(item.send),
            local: Some(item.local),
            status: Some(item.status.clone()),
            text: Some(item.text.clone()),
            color: Some(item.color.clone()),
            icon: Some(item.icon.clone()),
            parent_uid: Some(item.parent_uid.clone()),
            parent_callsign: Some(item.parent_callsign.clone()),
            tak_version: Some(item.tak_version.clone()),
            device: Some(item.device.clone()),
            ip_address: Some(item.ip_address.clone()),
            urn: Some(item.urn),
            missions: Some(item.missions.clone()),
            links: Some(item.links.clone()),
            web_sensor: Some(item.web_sensor.clone()),
            sensor_data: Some(item.sensor_data.clone()),
            casevac_detail: item.casevac_detail.clone(),
            delete: false,
        }
    }
}
