//! Excalidraw scene parsing.
//!
//! A scene is `{"elements": [...]}`. Container shapes become components;
//! text elements with a `containerId` label their container; arrows with
//! start/end bindings become connections; unbound text is standalone.
//! Deleted elements and dangling bindings are skipped.

use serde_json::Value;

use viva_domain::error::{Error, Result};

use crate::model::{Component, ComponentShape, Connection, DiagramStructure};

pub fn parse_to_structure(raw: &Value) -> Result<DiagramStructure> {
    let elements = raw
        .get("elements")
        .and_then(Value::as_array)
        .ok_or_else(|| Error::Protocol("design content has no elements array".into()))?;

    let mut structure = DiagramStructure::default();
    // containerId -> label text, resolved after the first pass.
    let mut labels: Vec<(String, String)> = Vec::new();
    // Arrows are resolved after components so dangling bindings can be
    // detected in one place.
    let mut arrows: Vec<(String, String, String)> = Vec::new();
    let mut arrow_labels: Vec<(String, String)> = Vec::new();

    for element in elements {
        if element["isDeleted"].as_bool().unwrap_or(false) {
            continue;
        }
        let id = match element["id"].as_str() {
            Some(id) => id.to_string(),
            None => continue,
        };
        let kind = element["type"].as_str().unwrap_or_default();

        match kind {
            "rectangle" | "ellipse" | "diamond" => {
                let shape = match kind {
                    "rectangle" => ComponentShape::Rectangle,
                    "ellipse" => ComponentShape::Ellipse,
                    _ => ComponentShape::Diamond,
                };
                structure.components.push(Component {
                    id,
                    shape,
                    label: None,
                });
            }
            "text" => {
                let text = element["text"].as_str().unwrap_or_default().to_string();
                if text.trim().is_empty() {
                    continue;
                }
                match element["containerId"].as_str() {
                    Some(container) => labels.push((container.to_string(), text)),
                    None => structure.standalone.push(text),
                }
            }
            "arrow" => {
                let from = element["startBinding"]["elementId"].as_str();
                let to = element["endBinding"]["elementId"].as_str();
                if let (Some(from), Some(to)) = (from, to) {
                    arrows.push((id, from.to_string(), to.to_string()));
                } else {
                    tracing::debug!(element = %id, "arrow without both bindings, skipping");
                }
            }
            // Lines, freedraw, images and frames carry no structure we use.
            _ => {}
        }
    }

    // Second pass over labels: attach to components, or to arrows.
    for (container, text) in labels {
        if let Some(component) = structure
            .components
            .iter_mut()
            .find(|c| c.id == container)
        {
            component.label = Some(text);
        } else if arrows.iter().any(|(id, _, _)| *id == container) {
            arrow_labels.push((container, text));
        } else {
            structure.standalone.push(text);
        }
    }

    for (arrow_id, from, to) in arrows {
        if structure.component(&from).is_none() || structure.component(&to).is_none() {
            tracing::debug!(arrow = %arrow_id, "arrow bound to missing component, skipping");
            continue;
        }
        let label = arrow_labels
            .iter()
            .find(|(id, _)| *id == arrow_id)
            .map(|(_, text)| text.clone());
        structure.connections.push(Connection { from, to, label });
    }

    Ok(structure)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_elements_is_protocol_error() {
        let err = parse_to_structure(&serde_json::json!({"appState": {}}));
        assert!(matches!(err, Err(Error::Protocol(_))));
    }

    #[test]
    fn deleted_elements_are_skipped() {
        let raw = serde_json::json!({
            "elements": [
                {"id": "a", "type": "rectangle", "isDeleted": true},
                {"id": "b", "type": "rectangle"}
            ]
        });
        let structure = parse_to_structure(&raw).unwrap();
        assert_eq!(structure.components.len(), 1);
        assert_eq!(structure.components[0].id, "b");
    }

    #[test]
    fn bound_text_labels_its_container() {
        let raw = serde_json::json!({
            "elements": [
                {"id": "a", "type": "diamond"},
                {"id": "t", "type": "text", "text": "Cache hit?", "containerId": "a"}
            ]
        });
        let structure = parse_to_structure(&raw).unwrap();
        assert_eq!(structure.components[0].label.as_deref(), Some("Cache hit?"));
        assert!(structure.standalone.is_empty());
    }

    #[test]
    fn arrow_label_attaches_to_connection() {
        let raw = serde_json::json!({
            "elements": [
                {"id": "a", "type": "rectangle"},
                {"id": "b", "type": "rectangle"},
                {"id": "e", "type": "arrow",
                 "startBinding": {"elementId": "a"},
                 "endBinding": {"elementId": "b"}},
                {"id": "el", "type": "text", "text": "reads", "containerId": "e"}
            ]
        });
        let structure = parse_to_structure(&raw).unwrap();
        assert_eq!(structure.connections.len(), 1);
        assert_eq!(structure.connections[0].label.as_deref(), Some("reads"));
    }

    #[test]
    fn dangling_arrow_is_dropped() {
        let raw = serde_json::json!({
            "elements": [
                {"id": "a", "type": "rectangle"},
                {"id": "e", "type": "arrow",
                 "startBinding": {"elementId": "a"},
                 "endBinding": {"elementId": "ghost"}}
            ]
        });
        let structure = parse_to_structure(&raw).unwrap();
        assert!(structure.connections.is_empty());
    }

    #[test]
    fn unbound_text_is_standalone() {
        let raw = serde_json::json!({
            "elements": [
                {"id": "t", "type": "text", "text": "TODO later"}
            ]
        });
        let structure = parse_to_structure(&raw).unwrap();
        assert_eq!(structure.standalone, vec!["TODO later"]);
    }
}
