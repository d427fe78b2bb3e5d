//! Material counts and cost estimation.
//!
//! Only balloons are materials. Guides never count, symbol instances
//! contribute their expanded balloons, and colors are bucketed by their
//! normalized lowercase form.

use crate::color;
use crate::model::{BalloonMeta, BalloonShape, DEFAULT_TYPE_ID, Node, NodeKind, Scene};
use crate::symbols::expand_instance;
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::collections::HashMap;

/// One purchasable balloon type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub size_in: Option<f32>,
    #[serde(rename = "cost", default)]
    pub unit_cost: f32,
    /// Meta applied when a node is switched to this type.
    #[serde(rename = "default", default)]
    pub defaults: BalloonMeta,
}

/// Read-only lookup from type id to name and unit cost.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: Vec<CatalogEntry>,
}

fn entry(
    id: &str,
    name: &str,
    family: &str,
    size_in: Option<f32>,
    cost: f32,
    (radius_x, radius_y, knot): (f32, f32, bool),
    shape: BalloonShape,
) -> CatalogEntry {
    CatalogEntry {
        id: id.into(),
        name: name.into(),
        family: family.into(),
        size_in,
        unit_cost: cost,
        defaults: BalloonMeta {
            radius_x,
            radius_y,
            knot,
            shape,
        },
    }
}

impl Catalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    /// The stock balloon types.
    pub fn builtin() -> Self {
        use BalloonShape::{Ellipse, Heart};
        Self::new(vec![
            entry("round-5", "R5 Round", "Round", Some(5.0), 3.0, (26.0, 32.0, true), Ellipse),
            entry("round-9", "R9 Round", "Round", Some(9.0), 5.0, (40.0, 52.0, true), Ellipse),
            entry("round-11", "R11 Round", "Round", Some(11.0), 7.0, (46.0, 60.0, true), Ellipse),
            entry("round-16", "R16 Round", "Round", Some(16.0), 12.0, (62.0, 82.0, true), Ellipse),
            entry("260", "260 (modeling)", "Modeling", None, 6.0, (18.0, 90.0, false), Ellipse),
            entry("160", "160 (modeling)", "Modeling", None, 5.0, (14.0, 70.0, false), Ellipse),
            entry("link-12", "Link 12\"", "Link", Some(12.0), 9.0, (46.0, 60.0, true), Ellipse),
            entry("heart-11", "Heart 11\"", "Figure", Some(11.0), 10.0, (52.0, 52.0, true), Heart),
        ])
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn get(&self, id: &str) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    /// Negative and non-finite costs become zero.
    pub fn set_unit_cost(&mut self, id: &str, cost: f32) -> bool {
        let Some(entry) = self.entries.iter_mut().find(|e| e.id == id) else {
            return false;
        };
        entry.unit_cost = if cost.is_finite() && cost >= 0.0 { cost } else { 0.0 };
        true
    }

    fn unit_cost(&self, id: &str) -> f32 {
        self.get(id).map_or(0.0, |e| e.unit_cost)
    }

    fn display_name(&self, id: &str) -> String {
        self.get(id)
            .map_or_else(|| format!("Type {id}"), |e| e.name.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialFilter {
    pub include_hidden: bool,
    pub include_locked: bool,
}

impl Default for MaterialFilter {
    fn default() -> Self {
        Self {
            include_hidden: false,
            include_locked: true,
        }
    }
}

impl MaterialFilter {
    fn admits(&self, node: &Node) -> bool {
        !node.guide
            && (self.include_hidden || node.visible)
            && (self.include_locked || !node.locked)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColorQty {
    pub color: String,
    pub qty: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeLine {
    pub type_id: String,
    pub type_name: String,
    pub qty: usize,
    pub unit_cost: f32,
    pub subtotal: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeColorLine {
    pub type_id: String,
    pub type_name: String,
    pub qty: usize,
    pub unit_cost: f32,
    pub subtotal: f32,
    pub colors: Vec<ColorQty>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialSummary {
    pub filters: MaterialFilter,
    pub total: usize,
    pub by_color: Vec<ColorQty>,
    pub by_type: Vec<TypeLine>,
    pub by_type_color: Vec<TypeColorLine>,
    pub has_costs: bool,
    pub estimated_cost: f32,
}

/// Counts keyed in first-seen order.
type Tally = IndexMap<String, usize>;

fn bump(tally: &mut Tally, key: &str) {
    *tally.entry(key.to_string()).or_default() += 1;
}

/// Entries by quantity, descending. Ties keep first-seen order.
fn ranked(tally: &Tally) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = tally.iter().map(|(k, n)| (k.clone(), *n)).collect();
    out.sort_by(|a, b| b.1.cmp(&a.1));
    out
}

fn material_nodes(scene: &Scene, filter: &MaterialFilter) -> Vec<Node> {
    let mut out = Vec::new();
    for node in &scene.nodes {
        for leaf in expand_instance(node, &scene.symbols) {
            if matches!(leaf.kind, NodeKind::Balloon(_)) && filter.admits(&leaf) {
                out.push(leaf);
            }
        }
    }
    out
}

fn color_key(node: &Node) -> String {
    color::normalize(&node.color).unwrap_or_else(|| node.color.to_lowercase())
}

fn type_key(node: &Node) -> &str {
    if node.type_id.is_empty() {
        DEFAULT_TYPE_ID
    } else {
        &node.type_id
    }
}

/// Aggregate balloon counts by color, by type and by (type, color).
pub fn compute_materials(
    scene: &Scene,
    catalog: &Catalog,
    filter: MaterialFilter,
) -> MaterialSummary {
    let nodes = material_nodes(scene, &filter);

    let mut by_color = Tally::default();
    let mut by_type = Tally::default();
    let mut type_colors: HashMap<String, Tally> = HashMap::new();
    for node in &nodes {
        let color = color_key(node);
        let type_id = type_key(node);
        bump(&mut by_color, &color);
        bump(&mut by_type, type_id);
        bump(type_colors.entry(type_id.to_string()).or_default(), &color);
    }

    let line_cost = |type_id: &str, qty: usize| {
        let unit = catalog.unit_cost(type_id);
        let subtotal = if unit > 0.0 { qty as f32 * unit } else { 0.0 };
        (unit, subtotal)
    };

    let by_type_lines: Vec<TypeLine> = ranked(&by_type)
        .into_iter()
        .map(|(type_id, qty)| {
            let (unit_cost, subtotal) = line_cost(&type_id, qty);
            TypeLine {
                type_name: catalog.display_name(&type_id),
                type_id,
                qty,
                unit_cost,
                subtotal,
            }
        })
        .collect();

    let by_type_color: Vec<TypeColorLine> = by_type_lines
        .iter()
        .map(|line| {
            let colors = type_colors
                .get(&line.type_id)
                .map(ranked)
                .unwrap_or_default()
                .into_iter()
                .map(|(color, qty)| ColorQty { color, qty })
                .collect();
            TypeColorLine {
                type_id: line.type_id.clone(),
                type_name: line.type_name.clone(),
                qty: line.qty,
                unit_cost: line.unit_cost,
                subtotal: line.subtotal,
                colors,
            }
        })
        .collect();

    let has_costs = by_type_lines.iter().any(|l| l.unit_cost > 0.0);
    let estimated_cost = if has_costs {
        by_type_lines.iter().map(|l| l.subtotal).sum()
    } else {
        0.0
    };

    MaterialSummary {
        filters: filter,
        total: nodes.len(),
        by_color: ranked(&by_color)
            .into_iter()
            .map(|(color, qty)| ColorQty { color, qty })
            .collect(),
        by_type: by_type_lines,
        by_type_color,
        has_costs,
        estimated_cost,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialNode {
    pub id: String,
    pub type_id: String,
    pub color: String,
    pub visible: bool,
    pub locked: bool,
}

/// Downloadable materials payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialsExport {
    pub version: u32,
    pub created_at: u64,
    pub summary: MaterialSummary,
    pub nodes: Vec<MaterialNode>,
}

pub const MATERIALS_EXPORT_VERSION: u32 = 2;

impl MaterialsExport {
    pub fn new(scene: &Scene, catalog: &Catalog, filter: MaterialFilter, created_at: u64) -> Self {
        Self {
            version: MATERIALS_EXPORT_VERSION,
            created_at,
            summary: compute_materials(scene, catalog, filter),
            nodes: scene
                .nodes
                .iter()
                .filter(|n| !n.guide)
                .map(|n| MaterialNode {
                    id: n.id.to_string(),
                    type_id: type_key(n).to_string(),
                    color: n.color.clone(),
                    visible: n.visible,
                    locked: n.locked,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::{NodeId, SymbolId};
    use crate::model::{Symbol, TextMeta};
    use pretty_assertions::assert_eq;

    fn balloon(id: &str, color: &str, type_id: &str) -> Node {
        let mut n = Node::balloon(NodeId::intern(id), 0.0, 0.0, BalloonMeta::default());
        n.color = color.into();
        n.type_id = type_id.into();
        n
    }

    #[test]
    fn guides_are_excluded_from_cost() {
        let mut scene = Scene::new();
        for i in 0..3 {
            scene.nodes.push(balloon(&format!("mat_{i}"), "#ff3b30", "round-11"));
        }
        let mut guide = balloon("mat_guide", "#ff3b30", "round-11");
        guide.guide = true;
        scene.nodes.push(guide);

        let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_type[0].qty, 3);
        assert_eq!(summary.by_type[0].subtotal, 21.0);
        assert!(summary.has_costs);
        assert_eq!(summary.estimated_cost, 21.0);
    }

    #[test]
    fn buckets_normalized_colors_and_sorts_by_qty() {
        let mut scene = Scene::new();
        scene.nodes.push(balloon("mc_a", "#FFF", "round-5"));
        scene.nodes.push(balloon("mc_b", "#000000", "round-5"));
        scene.nodes.push(balloon("mc_c", "#000", "round-9"));
        scene.nodes.push(Node::text(NodeId::intern("mc_text"), 0.0, 0.0, TextMeta::default()));

        let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
        assert_eq!(summary.total, 3);
        assert_eq!(
            summary.by_color,
            vec![
                ColorQty { color: "#000000".into(), qty: 2 },
                ColorQty { color: "#ffffff".into(), qty: 1 },
            ]
        );
        assert_eq!(summary.by_type_color[0].type_id, "round-5");
        assert_eq!(summary.by_type_color[0].colors.len(), 2);
    }

    #[test]
    fn ranking_keeps_first_seen_order_on_ties() {
        let mut tally = Tally::default();
        for key in ["#0000ff", "#ff0000", "#00ff00", "#ff0000", "#00ff00"] {
            bump(&mut tally, key);
        }
        assert_eq!(
            ranked(&tally),
            vec![
                ("#ff0000".to_string(), 2),
                ("#00ff00".to_string(), 2),
                ("#0000ff".to_string(), 1),
            ]
        );
    }

    #[test]
    fn filters_hidden_and_locked() {
        let mut scene = Scene::new();
        let mut hidden = balloon("mf_hidden", "#ff3b30", "round-11");
        hidden.visible = false;
        let mut locked = balloon("mf_locked", "#ff3b30", "round-11");
        locked.locked = true;
        scene.nodes.extend([hidden, locked]);

        let catalog = Catalog::builtin();
        assert_eq!(compute_materials(&scene, &catalog, MaterialFilter::default()).total, 1);
        let strict = MaterialFilter {
            include_hidden: false,
            include_locked: false,
        };
        assert_eq!(compute_materials(&scene, &catalog, strict).total, 0);
        let all = MaterialFilter {
            include_hidden: true,
            include_locked: true,
        };
        assert_eq!(compute_materials(&scene, &catalog, all).total, 2);
    }

    #[test]
    fn instances_count_their_balloons() {
        let sid = SymbolId::intern("sym_mat");
        let mut scene = Scene::new();
        scene.symbols.push(Symbol {
            id: sid,
            name: "arch".into(),
            nodes: vec![
                balloon("ms_a", "#ff3b30", "round-11"),
                balloon("ms_b", "#ff3b30", "round-11"),
            ],
        });
        scene.nodes.push(Node::instance(NodeId::intern("ms_i1"), 0.0, 0.0, sid));
        scene.nodes.push(Node::instance(NodeId::intern("ms_i2"), 50.0, 0.0, sid));

        let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
        assert_eq!(summary.total, 4);
        assert_eq!(summary.estimated_cost, 28.0);
    }

    #[test]
    fn unknown_types_have_no_cost() {
        let mut scene = Scene::new();
        scene.nodes.push(balloon("mu_a", "#ff3b30", "custom"));
        let summary = compute_materials(&scene, &Catalog::builtin(), MaterialFilter::default());
        assert!(!summary.has_costs);
        assert_eq!(summary.estimated_cost, 0.0);
        assert_eq!(summary.by_type[0].type_name, "Type custom");
    }

    #[test]
    fn catalog_parses_json_entries() {
        let catalog = Catalog::from_json(
            r#"[{"id":"x","name":"X","cost":2.5,"default":{"radiusX":10,"radiusY":12}}]"#,
        )
        .unwrap();
        let entry = catalog.get("x").unwrap();
        assert_eq!(entry.unit_cost, 2.5);
        assert_eq!(entry.defaults.radius_x, 10.0);
        assert!(entry.defaults.knot);
    }
}
