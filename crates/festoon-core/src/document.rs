//! The persisted design document.
//!
//! Export writes a typed, camelCase JSON document. Import is deliberately
//! lenient: it walks a `serde_json::Value`, coerces each field on its own
//! and falls back to defaults, so one bad field never loses a design. Only
//! a payload without a node list is rejected.

use crate::color;
use crate::id::{GroupId, NodeId, SymbolId};
use crate::model::{
    BalloonMeta, BalloonShape, CanvasSettings, DEFAULT_TYPE_ID, Group, GuidePriority, ImageMeta,
    Node, NodeKind, Scene, Settings, Symbol, TextAlign, TextMeta, View,
};
use crate::stack_grid::{StackGrid, StackGridConfig};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashSet;
use thiserror::Error;

pub const DOCUMENT_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("design document must be a JSON object")]
    NotAnObject,
    #[error("design document has no node list")]
    MissingNodeList,
}

// ─── Export ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDoc {
    pub id: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub symbol_id: Option<String>,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub rotation: f32,
    pub scale_x: f32,
    pub scale_y: f32,
    pub opacity: f32,
    pub color: String,
    pub locked: bool,
    pub visible: bool,
    pub z_index: usize,
    pub type_id: String,
    pub group_id: Option<String>,
    pub meta: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolDoc {
    pub id: String,
    pub name: String,
    pub nodes: Vec<NodeDoc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupDoc {
    pub id: String,
    pub name: String,
    pub child_ids: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDoc {
    pub grid: bool,
    pub snap: bool,
    pub snap_step: f32,
    pub snap_guides: bool,
    pub snap_tolerance: f32,
    pub snap_guide_priority: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasDoc {
    #[serde(rename = "widthCm")]
    pub width_cm: f32,
    #[serde(rename = "heightCm")]
    pub height_cm: f32,
    #[serde(rename = "offsetXcm")]
    pub offset_x_cm: f32,
    #[serde(rename = "offsetYcm")]
    pub offset_y_cm: f32,
    #[serde(rename = "lockRatio")]
    pub lock_ratio: bool,
    #[serde(rename = "backgroundColor")]
    pub background_color: String,
    #[serde(rename = "displayScale")]
    pub display_scale: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignDocument {
    pub version: u32,
    pub saved_at: u64,
    pub nodes: Vec<NodeDoc>,
    pub symbols: Vec<SymbolDoc>,
    pub groups: Vec<GroupDoc>,
    pub view: View,
    pub settings: SettingsDoc,
    pub canvas: CanvasDoc,
    pub stack_grid: StackGridConfig,
}

fn meta_of(node: &Node) -> Value {
    let mut meta = match &node.kind {
        NodeKind::Balloon(m) => json!({
            "radiusX": m.radius_x,
            "radiusY": m.radius_y,
            "knot": m.knot,
            "shape": m.shape.as_str(),
        }),
        NodeKind::Text(m) => json!({
            "text": m.text,
            "font": m.font,
            "size": m.size,
            "align": m.align.as_str(),
        }),
        NodeKind::Image(m) => json!({
            "src": m.src,
            "width": m.width,
            "height": m.height,
        }),
        NodeKind::SymbolInstance { .. } => json!({}),
    };
    if node.guide {
        if let Some(map) = meta.as_object_mut() {
            map.insert("guide".into(), Value::Bool(true));
        }
    }
    meta
}

fn node_doc(node: &Node) -> NodeDoc {
    NodeDoc {
        id: node.id.to_string(),
        kind: node.kind.name().to_string(),
        symbol_id: node.symbol_id().map(|s| s.to_string()),
        name: node.name.clone(),
        x: node.x,
        y: node.y,
        rotation: node.rotation,
        scale_x: node.scale_x,
        scale_y: node.scale_y,
        opacity: node.opacity,
        color: node.color.clone(),
        locked: node.locked,
        visible: node.visible,
        z_index: node.z_index,
        type_id: node.type_id.clone(),
        group_id: node.group_id.map(|g| g.to_string()),
        meta: meta_of(node),
    }
}

/// Snapshot the scene as a design document.
pub fn export_document(scene: &Scene, saved_at: u64) -> DesignDocument {
    let s = &scene.settings;
    let c = &scene.canvas;
    DesignDocument {
        version: DOCUMENT_VERSION,
        saved_at,
        nodes: scene.nodes.iter().map(node_doc).collect(),
        symbols: scene
            .symbols
            .iter()
            .map(|sym| SymbolDoc {
                id: sym.id.to_string(),
                name: sym.name.clone(),
                nodes: sym.nodes.iter().map(node_doc).collect(),
            })
            .collect(),
        groups: scene
            .groups
            .iter()
            .map(|g| GroupDoc {
                id: g.id.to_string(),
                name: g.name.clone(),
                child_ids: g.child_ids.iter().map(|id| id.to_string()).collect(),
            })
            .collect(),
        view: scene.view,
        settings: SettingsDoc {
            grid: s.grid,
            snap: s.snap,
            snap_step: s.snap_step,
            snap_guides: s.snap_guides,
            snap_tolerance: s.snap_tolerance,
            snap_guide_priority: s.snap_guide_priority.as_str().to_string(),
        },
        canvas: CanvasDoc {
            width_cm: c.width_cm,
            height_cm: c.height_cm,
            offset_x_cm: c.offset_x_cm,
            offset_y_cm: c.offset_y_cm,
            lock_ratio: c.lock_ratio,
            background_color: c.background_color.clone(),
            display_scale: c.display_scale,
        },
        stack_grid: scene.stack_grid.config.clone(),
    }
}

/// Pretty-printed JSON of [`export_document`].
pub fn export_string(scene: &Scene, saved_at: u64) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&export_document(scene, saved_at))
}

// ─── Import ──────────────────────────────────────────────────────────────

/// Finite number, accepting numeric strings.
fn num(v: Option<&Value>) -> Option<f32> {
    let n = match v? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        Value::Bool(b) => f64::from(u8::from(*b)),
        _ => return None,
    };
    let n = n as f32;
    n.is_finite().then_some(n)
}

fn num_or(v: Option<&Value>, default: f32) -> f32 {
    num(v).unwrap_or(default)
}

/// JavaScript-style truthiness.
fn truthy(v: Option<&Value>) -> bool {
    match v {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Some(Value::String(s)) => !s.is_empty(),
        Some(_) => true,
    }
}

fn bool_or(v: Option<&Value>, default: bool) -> bool {
    match v {
        None | Some(Value::Null) => default,
        other => truthy(other),
    }
}

/// Non-empty string form of a scalar.
fn text(v: Option<&Value>) -> Option<String> {
    let s = match v? {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!s.is_empty()).then_some(s)
}

fn balloon_meta(meta: &Map<String, Value>) -> BalloonMeta {
    let d = BalloonMeta::default();
    BalloonMeta {
        radius_x: num_or(meta.get("radiusX"), d.radius_x),
        radius_y: num_or(meta.get("radiusY"), d.radius_y),
        knot: bool_or(meta.get("knot"), d.knot),
        shape: text(meta.get("shape")).map_or(d.shape, |s| BalloonShape::from_name(&s)),
    }
}

fn text_meta(meta: &Map<String, Value>) -> TextMeta {
    let d = TextMeta::default();
    TextMeta {
        text: match meta.get("text") {
            Some(Value::String(s)) => s.clone(),
            _ => d.text,
        },
        font: text(meta.get("font")).unwrap_or(d.font),
        size: num(meta.get("size")).filter(|s| *s > 0.0).unwrap_or(d.size),
        align: text(meta.get("align")).map_or(d.align, |s| TextAlign::from_name(&s)),
    }
}

fn image_meta(meta: &Map<String, Value>) -> ImageMeta {
    let d = ImageMeta::default();
    ImageMeta {
        src: text(meta.get("src")).unwrap_or(d.src),
        width: num_or(meta.get("width"), d.width),
        height: num_or(meta.get("height"), d.height),
    }
}

/// Mint a node id, re-minting when the wanted one is empty or taken.
fn claim_id(wanted: Option<String>, taken: &mut HashSet<NodeId>) -> NodeId {
    if let Some(id) = wanted.map(|s| NodeId::intern(&s)) {
        if taken.insert(id) {
            return id;
        }
        log::debug!("import: node id {id} already used, re-minting");
    }
    loop {
        let id = NodeId::fresh();
        if taken.insert(id) {
            return id;
        }
    }
}

fn parse_node(raw: &Value, known_symbols: &HashSet<SymbolId>, taken: &mut HashSet<NodeId>) -> Node {
    let empty = Map::new();
    let obj = raw.as_object().unwrap_or(&empty);
    let meta = obj.get("meta").and_then(Value::as_object).unwrap_or(&empty);
    let get = |k: &str| obj.get(k);

    let id = claim_id(text(get("id")), taken);
    let symbol = text(get("symbolId"))
        .map(|s| SymbolId::intern(&s))
        .filter(|s| known_symbols.contains(s));
    let kind = match (text(get("kind")).as_deref(), symbol) {
        (Some("text"), _) => NodeKind::Text(text_meta(meta)),
        (Some("image"), _) => NodeKind::Image(image_meta(meta)),
        (Some("symbol"), Some(symbol_id)) => NodeKind::SymbolInstance { symbol_id },
        _ => NodeKind::Balloon(balloon_meta(meta)),
    };

    let mut node = Node::new(id, kind, num_or(get("x"), 0.0), num_or(get("y"), 0.0));
    node.name = text(get("name")).unwrap_or_default();
    node.type_id = text(get("typeId")).unwrap_or_else(|| match node.kind {
        NodeKind::Balloon(_) => DEFAULT_TYPE_ID.to_string(),
        ref other => other.name().to_string(),
    });
    node.rotation = num_or(get("rotation"), 0.0);
    node.scale_x = num_or(get("scaleX"), 1.0);
    node.scale_y = num_or(get("scaleY"), 1.0);
    node.opacity = num_or(get("opacity"), 1.0).clamp(0.0, 1.0);
    node.color = match get("color") {
        Some(Value::String(c)) => color::normalize_or_fallback(c),
        _ => color::FALLBACK_SWATCH.to_string(),
    };
    node.locked = truthy(get("locked"));
    node.visible = !matches!(get("visible"), Some(Value::Bool(false)));
    node.guide = truthy(meta.get("guide"));
    node.z_index = num(get("zIndex")).map_or(0, |z| z.max(0.0) as usize);
    node.group_id = text(get("groupId")).map(|g| GroupId::intern(&g));
    node
}

fn parse_nodes(
    list: Option<&Value>,
    known_symbols: &HashSet<SymbolId>,
    taken: &mut HashSet<NodeId>,
) -> Vec<Node> {
    let mut nodes: Vec<Node> = list
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .map(|raw| parse_node(raw, known_symbols, taken))
                .collect()
        })
        .unwrap_or_default();
    nodes.sort_by_key(|n| n.z_index);
    crate::zorder::reindex(&mut nodes);
    nodes
}

fn parse_view(raw: Option<&Value>) -> View {
    let Some(v) = raw else {
        return View::default();
    };
    View::clamped(
        num_or(v.get("x"), 0.0),
        num_or(v.get("y"), 0.0),
        num(v.get("scale")).filter(|s| *s != 0.0).unwrap_or(1.0),
    )
}

fn parse_settings(raw: Option<&Value>) -> Settings {
    let d = Settings::default();
    let Some(s) = raw else {
        return d;
    };
    Settings {
        grid: bool_or(s.get("grid"), d.grid),
        snap: bool_or(s.get("snap"), d.snap),
        snap_step: num(s.get("snapStep")).filter(|v| *v > 0.0).unwrap_or(d.snap_step),
        snap_guides: bool_or(s.get("snapGuides"), d.snap_guides),
        snap_tolerance: num(s.get("snapTolerance"))
            .filter(|v| *v >= 0.0)
            .unwrap_or(d.snap_tolerance),
        snap_guide_priority: text(s.get("snapGuidePriority"))
            .map_or(d.snap_guide_priority, |p| GuidePriority::from_name(&p)),
    }
}

fn parse_canvas(raw: Option<&Value>) -> CanvasSettings {
    let d = CanvasSettings::default();
    let Some(c) = raw else {
        return d;
    };
    let mut canvas = CanvasSettings {
        width_cm: num_or(c.get("widthCm"), d.width_cm),
        height_cm: num_or(c.get("heightCm"), d.height_cm),
        offset_x_cm: num_or(c.get("offsetXcm"), d.offset_x_cm),
        offset_y_cm: num_or(c.get("offsetYcm"), d.offset_y_cm),
        lock_ratio: bool_or(c.get("lockRatio"), d.lock_ratio),
        background_color: text(c.get("backgroundColor"))
            .and_then(|s| color::normalize(&s))
            .unwrap_or(d.background_color),
        display_scale: num_or(c.get("displayScale"), d.display_scale),
    };
    canvas.clamp_all();
    canvas
}

fn parse_stack_grid(raw: Option<&Value>) -> StackGrid {
    let config = raw
        .and_then(|v| serde_json::from_value::<StackGridConfig>(v.clone()).ok())
        .unwrap_or_default();
    let mut grid = StackGrid::default();
    grid.set_config(config);
    grid
}

/// Build a scene from a parsed document.
///
/// Ids are kept where possible; missing or duplicate node ids are re-minted.
/// Instances whose symbol cannot be resolved become balloons. Groups are
/// reconciled against the imported nodes.
pub fn import_document(data: &Value) -> Result<Scene, ImportError> {
    let obj = data.as_object().ok_or(ImportError::NotAnObject)?;
    if !obj.get("nodes").is_some_and(Value::is_array) {
        return Err(ImportError::MissingNodeList);
    }

    let raw_symbols: Vec<&Map<String, Value>> = obj
        .get("symbols")
        .and_then(Value::as_array)
        .map(|list| list.iter().filter_map(Value::as_object).collect())
        .unwrap_or_default();
    let mut symbol_ids = Vec::with_capacity(raw_symbols.len());
    let mut known_symbols = HashSet::new();
    let named: HashSet<SymbolId> = raw_symbols
        .iter()
        .filter_map(|raw| text(raw.get("id")))
        .map(|s| SymbolId::intern(&s))
        .collect();
    for raw in &raw_symbols {
        let wanted = text(raw.get("id")).map(|s| SymbolId::intern(&s));
        let id = match wanted {
            Some(id) if !known_symbols.contains(&id) => id,
            _ => loop {
                let id = SymbolId::fresh();
                if !known_symbols.contains(&id) && !named.contains(&id) {
                    break id;
                }
            },
        };
        known_symbols.insert(id);
        symbol_ids.push(id);
    }

    let mut taken = HashSet::new();
    let symbols: Vec<Symbol> = raw_symbols
        .iter()
        .zip(symbol_ids)
        .map(|(raw, id)| Symbol {
            id,
            name: text(raw.get("name")).unwrap_or_default(),
            nodes: parse_nodes(raw.get("nodes"), &known_symbols, &mut taken),
        })
        .collect();
    let nodes = parse_nodes(obj.get("nodes"), &known_symbols, &mut taken);

    let groups: Vec<Group> = obj
        .get("groups")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_object)
                .map(|g| {
                    let id = text(g.get("id"))
                        .map(|s| GroupId::intern(&s))
                        .unwrap_or_else(GroupId::fresh);
                    let children = g
                        .get("childIds")
                        .and_then(Value::as_array)
                        .map(|ids| {
                            ids.iter()
                                .filter_map(|v| text(Some(v)))
                                .map(|s| NodeId::intern(&s))
                                .collect::<Vec<_>>()
                        })
                        .unwrap_or_default();
                    Group::new(id, text(g.get("name")).unwrap_or_default(), children)
                })
                .collect()
        })
        .unwrap_or_default();

    let mut scene = Scene {
        nodes,
        groups,
        symbols,
        view: parse_view(obj.get("view")),
        settings: parse_settings(obj.get("settings")),
        canvas: parse_canvas(obj.get("canvas")),
        stack_grid: parse_stack_grid(obj.get("stackGrid")),
    };
    scene.reconcile_groups();
    log::debug!(
        "imported design: {} nodes, {} groups, {} symbols",
        scene.nodes.len(),
        scene.groups.len(),
        scene.symbols.len()
    );
    Ok(scene)
}

/// Parse JSON text, then [`import_document`].
pub fn import_str(json: &str) -> Result<Scene, ImportError> {
    let value: Value = serde_json::from_str(json)?;
    import_document(&value)
}
