//! JSON and ZIP model parsing.
//!
//! Document shape:
//!
//! ```json
//! { "nodes": [
//!     { "name": "...",
//!       "parentNames": ["..."],
//!       "possibleValues": ["..."],
//!       "conditionalProbabilities": { ... } } ] }
//! ```
//!
//! A `conditionalProbabilities` object is a branch when it carries a
//! `deeper` key (an object keyed by the next parent's values, with an
//! optional sibling `skip` sub-tree); otherwise its numeric members form a
//! leaf distribution. Unknown keys are ignored at every level. Object member
//! order is preserved end to end, so leaf distributions sample in document
//! order.

use std::collections::HashSet;
use std::fs;
use std::io::Read;
use std::path::Path;

use serde_json::Value;
use tracing::info;

use crate::bayesian::{CptTree, Network, Node};
use crate::model::ModelError;

impl Network {
    /// Parses a network from a JSON document string.
    pub fn from_json_str(document: &str) -> Result<Self, ModelError> {
        let value: Value = serde_json::from_str(document)?;
        parse_network(&value)
    }

    /// Loads a network from a JSON file on disk.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let document = fs::read_to_string(path)?;
        let network = Self::from_json_str(&document)?;
        info!(path = %path.display(), nodes = network.nodes().len(), "loaded network model");
        Ok(network)
    }

    /// Loads a network from a ZIP archive containing exactly one JSON member.
    pub fn from_zip_file(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let mut archive = zip::ZipArchive::new(file)?;
        if archive.len() != 1 {
            return Err(ModelError::Malformed(format!(
                "model archive must contain exactly one member, found {}",
                archive.len()
            )));
        }
        let mut member = archive.by_index(0)?;
        let mut document = String::new();
        member.read_to_string(&mut document)?;
        drop(member);

        let network = Self::from_json_str(&document)?;
        info!(path = %path.display(), nodes = network.nodes().len(), "loaded packaged network model");
        Ok(network)
    }

    /// Loads a network from either format, dispatching on the `.zip`
    /// extension.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let is_zip = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip {
            Self::from_zip_file(path)
        } else {
            Self::from_json_file(path)
        }
    }
}

fn parse_network(document: &Value) -> Result<Network, ModelError> {
    let nodes_value = document
        .get("nodes")
        .ok_or_else(|| ModelError::Malformed("document has no 'nodes' member".to_string()))?;
    let entries = nodes_value
        .as_array()
        .ok_or_else(|| ModelError::Malformed("'nodes' is not an array".to_string()))?;

    let mut nodes = Vec::with_capacity(entries.len());
    for entry in entries {
        nodes.push(parse_node(entry)?);
    }
    Network::new(nodes)
}

fn parse_node(entry: &Value) -> Result<Node, ModelError> {
    let name = entry
        .get("name")
        .and_then(Value::as_str)
        .ok_or_else(|| ModelError::Malformed("node has no string 'name'".to_string()))?;

    let parent_names = string_array(entry.get("parentNames"), name, "parentNames")?;
    let possible_values: HashSet<String> =
        string_array(entry.get("possibleValues"), name, "possibleValues")?
            .into_iter()
            .collect();

    let cpt_value = entry.get("conditionalProbabilities").ok_or_else(|| {
        ModelError::Malformed(format!("node '{name}' has no 'conditionalProbabilities'"))
    })?;
    let cpt = parse_cpt(cpt_value, name)?;

    Ok(Node::new(name, parent_names, possible_values, cpt))
}

fn string_array(value: Option<&Value>, node: &str, field: &str) -> Result<Vec<String>, ModelError> {
    let Some(value) = value else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| ModelError::Malformed(format!("node '{node}': '{field}' is not an array")))?;
    items
        .iter()
        .map(|item| {
            item.as_str().map(str::to_string).ok_or_else(|| {
                ModelError::Malformed(format!("node '{node}': '{field}' holds a non-string entry"))
            })
        })
        .collect()
}

fn parse_cpt(value: &Value, node: &str) -> Result<CptTree, ModelError> {
    let object = value.as_object().ok_or_else(|| {
        ModelError::Malformed(format!("node '{node}': CPT level is not an object"))
    })?;

    if let Some(deeper_value) = object.get("deeper") {
        let deeper_object = deeper_value.as_object().ok_or_else(|| {
            ModelError::Malformed(format!("node '{node}': 'deeper' is not an object"))
        })?;
        let mut deeper = std::collections::HashMap::with_capacity(deeper_object.len());
        for (parent_value, sub) in deeper_object {
            deeper.insert(parent_value.clone(), parse_cpt(sub, node)?);
        }
        let skip = object
            .get("skip")
            .map(|sub| parse_cpt(sub, node))
            .transpose()?
            .map(Box::new);
        return Ok(CptTree::Branch { deeper, skip });
    }

    // Leaf: numeric members are the distribution, anything else is ignored.
    let mut distribution = Vec::with_capacity(object.len());
    for (value_name, probability) in object {
        if value_name == "skip" {
            return Err(ModelError::Malformed(format!(
                "node '{node}': 'skip' without a sibling 'deeper'"
            )));
        }
        if let Some(p) = probability.as_f64() {
            distribution.push((value_name.clone(), p));
        }
    }
    Ok(CptTree::Leaf { distribution })
}
