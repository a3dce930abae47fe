//! Component G — Callgraph parser/merger.
//!
//! Grounded on `report/junit.rs`'s directory-of-files → parse-each →
//! merge-into-one shape, generalized from XML files to newline-delimited
//! JSON shards and from a `HashMap<TestId, _>` merge key to a `{id → Node}`
//! upsert map (§4.G).

pub mod codec;

use crate::error::CallgraphError;
use crate::model::{Callgraph, Node, NodeType, Relation};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// One line of a callgraph shard: the test that ran, the source it covers
/// (if any), and a resource fallback when there was no source.
#[derive(Debug, Deserialize)]
struct RawRecord {
    test: Node,
    #[serde(default)]
    source: Option<Node>,
    #[serde(default)]
    resource: Option<Node>,
}

/// Parses and merges every JSON-lines shard in `files` into one [`Callgraph`].
///
/// An unparseable line is a hard error naming the file and the line number
/// (§4.G) — unlike JUnit/TRX parsing (§4.I), callgraph records are not
/// skip-and-continue, since a dropped record silently loses coverage data.
pub async fn parse_and_merge(files: &[PathBuf]) -> Result<Callgraph, CallgraphError> {
    let mut nodes: HashMap<i32, Node> = HashMap::new();
    let mut test_relations: HashMap<i32, Vec<i32>> = HashMap::new();
    let mut insertion_order: Vec<i32> = Vec::new();

    for file in files {
        let contents = tokio::fs::read_to_string(file)
            .await
            .map_err(|source| CallgraphError::Io { file: file.clone(), source })?;

        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let record: RawRecord = serde_json::from_str(line).map_err(|e| CallgraphError::MalformedRecord {
                file: file.clone(),
                line: (line_no + 1) as u64,
                message: e.to_string(),
            })?;

            let mut test = record.test;
            test.node_type = NodeType::Test;
            upsert(&mut nodes, &mut insertion_order, test.clone());

            let source = match (record.source, record.resource) {
                (Some(source), _) if !source.is_zero() => {
                    let mut source = source;
                    source.node_type = NodeType::Source;
                    Some(source)
                }
                (_, Some(resource)) => {
                    let mut resource = resource;
                    resource.node_type = NodeType::Resource;
                    Some(resource)
                }
                _ => None,
            };

            if let Some(source) = source {
                let source_id = source.id;
                upsert(&mut nodes, &mut insertion_order, source);
                test_relations.entry(source_id).or_default().push(test.id);
            }
        }
    }

    let mut nodes: Vec<Node> = insertion_order.into_iter().map(|id| nodes.remove(&id).expect("id was inserted")).collect();
    nodes.sort_by_key(|n| n.id);

    let mut test_relations: Vec<Relation> = test_relations
        .into_iter()
        .map(|(source_id, mut tests)| {
            tests.sort_unstable();
            tests.dedup();
            Relation { source_id, tests }
        })
        .collect();
    test_relations.sort_by_key(|r| r.source_id);

    Ok(Callgraph { nodes, test_relations, vis_relations: Vec::new() })
}

/// Insert `node` unless its id is already present — test classification must
/// win over a later-seen source record for the same id (§4.G), never the
/// other way, so this never overwrites.
fn upsert(nodes: &mut HashMap<i32, Node>, order: &mut Vec<i32>, node: Node) {
    if !nodes.contains_key(&node.id) {
        order.push(node.id);
        nodes.insert(node.id, node);
    }
}

/// Parses a visualization-relations CSV (`<int>,<int>` per row) into
/// [`Relation`]s, deduplicated by destination within each source (§4.G).
pub async fn parse_vis_relations(file: &Path) -> Result<Vec<Relation>, CallgraphError> {
    let contents = tokio::fs::read_to_string(file)
        .await
        .map_err(|source| CallgraphError::Io { file: file.to_path_buf(), source })?;

    let mut by_source: HashMap<i32, Vec<i32>> = HashMap::new();
    let mut order: Vec<i32> = Vec::new();

    for (line_no, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let (src, dst) = line.split_once(',').ok_or_else(|| CallgraphError::MalformedRecord {
            file: file.to_path_buf(),
            line: (line_no + 1) as u64,
            message: "expected `<int>,<int>`".to_string(),
        })?;
        let src: i32 = src.trim().parse().map_err(|_| CallgraphError::MalformedRecord {
            file: file.to_path_buf(),
            line: (line_no + 1) as u64,
            message: format!("invalid source id '{src}'"),
        })?;
        let dst: i32 = dst.trim().parse().map_err(|_| CallgraphError::MalformedRecord {
            file: file.to_path_buf(),
            line: (line_no + 1) as u64,
            message: format!("invalid destination id '{dst}'"),
        })?;

        let entry = by_source.entry(src).or_insert_with(|| {
            order.push(src);
            Vec::new()
        });
        if !entry.contains(&dst) {
            entry.push(dst);
        }
    }

    Ok(order.into_iter().map(|src| Relation { source_id: src, tests: by_source.remove(&src).unwrap_or_default() }).collect())
}
