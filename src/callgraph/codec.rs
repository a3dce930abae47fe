//! Avro-compatible binary codec for [`Callgraph`] (§4.H).
//!
//! Schemas are embedded as immutable strings at build time and parsed once
//! into [`apache_avro::Schema`]s behind a `OnceLock` — never read from disk
//! at run time. Two schema versions coexist in this process: `""` names the
//! original schema (no `always_run`/`has_failed` on `Node`), `"1_1"` names
//! the current one. Encoding always targets the current schema; decoding
//! accepts either, since the Avro object-container format embeds the writer
//! schema in the payload itself.
//!
//! Field names differ between the in-memory [`Node`]/[`Relation`] shape and
//! the wire shape (`test_relations` → `testRelations`,
//! `vis_relations` → `visgraphRelations`), so this module keeps its own
//! `Wire*` structs rather than deriving the wire format directly onto the
//! model types.

use crate::error::CallgraphError;
use crate::model::{Callgraph, Node, NodeType, Relation};
use apache_avro::{Reader, Schema, Writer};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

const SCHEMA_V1: &str = include_str!("schemas/v1.avsc");
const SCHEMA_V1_1: &str = include_str!("schemas/v1_1.avsc");

/// Which embedded schema an encode call should target. Decoding does not
/// need this — the container carries its own writer schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaVersion {
    /// The original schema, identified by the empty string in upload metadata.
    V1,
    /// The current schema, identified by `"1_1"` in upload metadata.
    V1_1,
}

impl SchemaVersion {
    pub fn as_tag(self) -> &'static str {
        match self {
            SchemaVersion::V1 => "",
            SchemaVersion::V1_1 => "1_1",
        }
    }
}

fn schema_v1() -> &'static Schema {
    static CELL: OnceLock<Schema> = OnceLock::new();
    CELL.get_or_init(|| Schema::parse_str(SCHEMA_V1).expect("embedded v1 callgraph schema is valid Avro"))
}

fn schema_v1_1() -> &'static Schema {
    static CELL: OnceLock<Schema> = OnceLock::new();
    CELL.get_or_init(|| Schema::parse_str(SCHEMA_V1_1).expect("embedded v1_1 callgraph schema is valid Avro"))
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireNodeV1 {
    id: i32,
    #[serde(rename = "classId")]
    class_id: i32,
    package: String,
    class: String,
    method: String,
    params: String,
    file: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(rename = "callsReflection")]
    calls_reflection: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireNodeV1_1 {
    id: i32,
    #[serde(rename = "classId")]
    class_id: i32,
    package: String,
    class: String,
    method: String,
    params: String,
    file: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(rename = "callsReflection")]
    calls_reflection: bool,
    #[serde(rename = "alwaysRun", default)]
    always_run: bool,
    #[serde(rename = "hasFailed", default)]
    has_failed: bool,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireTestRelation {
    source: i32,
    tests: Vec<i32>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireVisRelation {
    source: i32,
    destinations: Vec<i32>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireCallgraphV1 {
    nodes: Vec<WireNodeV1>,
    #[serde(rename = "testRelations")]
    test_relations: Vec<WireTestRelation>,
    #[serde(rename = "visgraphRelations")]
    vis_relations: Vec<WireVisRelation>,
}

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireCallgraphV1_1 {
    nodes: Vec<WireNodeV1_1>,
    #[serde(rename = "testRelations")]
    test_relations: Vec<WireTestRelation>,
    #[serde(rename = "visgraphRelations")]
    vis_relations: Vec<WireVisRelation>,
}

fn node_type_str(t: NodeType) -> String {
    match t {
        NodeType::Source => "source".to_string(),
        NodeType::Test => "test".to_string(),
        NodeType::Resource => "resource".to_string(),
    }
}

fn node_type_from_str(s: &str) -> Result<NodeType, CallgraphError> {
    match s {
        "source" => Ok(NodeType::Source),
        "test" => Ok(NodeType::Test),
        "resource" => Ok(NodeType::Resource),
        other => Err(CallgraphError::InvalidNodeType { found: other.to_string() }),
    }
}

impl From<&Relation> for WireTestRelation {
    fn from(r: &Relation) -> Self {
        WireTestRelation { source: r.source_id, tests: r.tests.clone() }
    }
}

impl From<&Relation> for WireVisRelation {
    fn from(r: &Relation) -> Self {
        WireVisRelation { source: r.source_id, destinations: r.tests.clone() }
    }
}

impl From<WireTestRelation> for Relation {
    fn from(w: WireTestRelation) -> Self {
        Relation { source_id: w.source, tests: w.tests }
    }
}

impl From<WireVisRelation> for Relation {
    fn from(w: WireVisRelation) -> Self {
        Relation { source_id: w.source, tests: w.destinations }
    }
}

/// Encode `cg` using the schema named by `version`. Encoding at [`SchemaVersion::V1`]
/// silently drops `always_run`/`has_failed` — callers that need those fields
/// on the far end must encode at `V1_1`.
pub fn encode(cg: &Callgraph, version: SchemaVersion) -> Result<Vec<u8>, CallgraphError> {
    match version {
        SchemaVersion::V1 => encode_v1(cg),
        SchemaVersion::V1_1 => encode_v1_1(cg),
    }
}

fn encode_v1(cg: &Callgraph) -> Result<Vec<u8>, CallgraphError> {
    let wire = WireCallgraphV1 {
        nodes: cg
            .nodes
            .iter()
            .map(|n| WireNodeV1 {
                id: n.id,
                class_id: n.class_id,
                package: n.package.clone(),
                class: n.class.clone(),
                method: n.method.clone(),
                params: n.params.clone(),
                file: n.file.clone(),
                node_type: node_type_str(n.node_type),
                calls_reflection: n.calls_reflection,
            })
            .collect(),
        test_relations: cg.test_relations.iter().map(WireTestRelation::from).collect(),
        vis_relations: cg.vis_relations.iter().map(WireVisRelation::from).collect(),
    };
    let mut writer = Writer::new(schema_v1(), Vec::new());
    writer.append_ser(wire).map_err(|e| CallgraphError::Encode { source: e.to_string() })?;
    writer.into_inner().map_err(|e| CallgraphError::Encode { source: e.to_string() })
}

fn encode_v1_1(cg: &Callgraph) -> Result<Vec<u8>, CallgraphError> {
    let wire = WireCallgraphV1_1 {
        nodes: cg
            .nodes
            .iter()
            .map(|n| WireNodeV1_1 {
                id: n.id,
                class_id: n.class_id,
                package: n.package.clone(),
                class: n.class.clone(),
                method: n.method.clone(),
                params: n.params.clone(),
                file: n.file.clone(),
                node_type: node_type_str(n.node_type),
                calls_reflection: n.calls_reflection,
                always_run: n.always_run,
                has_failed: n.has_failed,
            })
            .collect(),
        test_relations: cg.test_relations.iter().map(WireTestRelation::from).collect(),
        vis_relations: cg.vis_relations.iter().map(WireVisRelation::from).collect(),
    };
    let mut writer = Writer::new(schema_v1_1(), Vec::new());
    writer.append_ser(wire).map_err(|e| CallgraphError::Encode { source: e.to_string() })?;
    writer.into_inner().map_err(|e| CallgraphError::Encode { source: e.to_string() })
}

/// Decode a container written by either embedded schema version. The Avro
/// object-container format carries its own writer schema, so no version tag
/// is needed here; `deny_unknown_fields` on the `Wire*` structs turns any
/// field this codec doesn't know about into a decode error rather than a
/// silent drop.
pub fn decode(bytes: &[u8]) -> Result<Callgraph, CallgraphError> {
    let reader = Reader::new(bytes).map_err(|e| CallgraphError::Decode { source: e.to_string() })?;
    let writer_schema_is_v1_1 = reader.writer_schema() == schema_v1_1();
    let values: Vec<_> =
        reader.collect::<Result<Vec<_>, _>>().map_err(|e| CallgraphError::Decode { source: e.to_string() })?;
    let value = values.into_iter().next().ok_or(CallgraphError::EmptyContainer)?;

    if writer_schema_is_v1_1 {
        let wire: WireCallgraphV1_1 =
            apache_avro::from_value(&value).map_err(|e| CallgraphError::Decode { source: e.to_string() })?;
        from_wire_v1_1(wire)
    } else {
        let wire: WireCallgraphV1 =
            apache_avro::from_value(&value).map_err(|e| CallgraphError::Decode { source: e.to_string() })?;
        from_wire_v1(wire)
    }
}

fn from_wire_v1(wire: WireCallgraphV1) -> Result<Callgraph, CallgraphError> {
    let mut nodes = Vec::with_capacity(wire.nodes.len());
    for n in wire.nodes {
        nodes.push(Node {
            id: n.id,
            class_id: n.class_id,
            package: n.package,
            class: n.class,
            method: n.method,
            params: n.params,
            file: n.file,
            node_type: node_type_from_str(&n.node_type)?,
            calls_reflection: n.calls_reflection,
            always_run: false,
            has_failed: false,
        });
    }
    Ok(Callgraph {
        nodes,
        test_relations: wire.test_relations.into_iter().map(Relation::from).collect(),
        vis_relations: wire.vis_relations.into_iter().map(Relation::from).collect(),
    })
}

fn from_wire_v1_1(wire: WireCallgraphV1_1) -> Result<Callgraph, CallgraphError> {
    let mut nodes = Vec::with_capacity(wire.nodes.len());
    for n in wire.nodes {
        nodes.push(Node {
            id: n.id,
            class_id: n.class_id,
            package: n.package,
            class: n.class,
            method: n.method,
            params: n.params,
            file: n.file,
            node_type: node_type_from_str(&n.node_type)?,
            calls_reflection: n.calls_reflection,
            always_run: n.always_run,
            has_failed: n.has_failed,
        });
    }
    Ok(Callgraph {
        nodes,
        test_relations: wire.test_relations.into_iter().map(Relation::from).collect(),
        vis_relations: wire.vis_relations.into_iter().map(Relation::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NodeType;

    fn sample() -> Callgraph {
        Callgraph {
            nodes: vec![
                Node {
                    id: 1,
                    class_id: 1,
                    package: "pkg".into(),
                    class: "Widget".into(),
                    method: String::new(),
                    params: String::new(),
                    file: "Widget.java".into(),
                    node_type: NodeType::Source,
                    calls_reflection: false,
                    always_run: false,
                    has_failed: false,
                },
                Node {
                    id: 2,
                    class_id: 2,
                    package: "pkg".into(),
                    class: "WidgetTest".into(),
                    method: "testIt".into(),
                    params: "()".into(),
                    file: "WidgetTest.java".into(),
                    node_type: NodeType::Test,
                    calls_reflection: true,
                    always_run: true,
                    has_failed: false,
                },
            ],
            test_relations: vec![Relation { source_id: 1, tests: vec![2] }],
            vis_relations: vec![Relation { source_id: 1, tests: vec![2] }],
        }
    }

    #[test]
    fn v1_1_round_trips_exactly() {
        let cg = sample();
        let bytes = encode(&cg, SchemaVersion::V1_1).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert_eq!(decoded, cg);
    }

    #[test]
    fn empty_callgraph_round_trips() {
        let cg = Callgraph::default();
        let bytes = encode(&cg, SchemaVersion::V1_1).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn v1_encode_drops_always_run_and_has_failed() {
        let cg = sample();
        let bytes = encode(&cg, SchemaVersion::V1).unwrap();
        let decoded = decode(&bytes).unwrap();
        assert!(!decoded.nodes[1].always_run);
        assert!(!decoded.nodes[1].has_failed);
        assert_eq!(decoded.nodes[1].class, "WidgetTest");
    }

    #[test]
    fn both_schema_versions_are_embedded_and_distinct() {
        assert_ne!(schema_v1(), schema_v1_1());
    }

    #[test]
    fn unknown_node_type_is_a_decode_error() {
        assert!(node_type_from_str("bogus").is_err());
    }
}
