//! Excalidraw diagram analysis.
//!
//! Turns a raw Excalidraw scene (as the design editor exports it) into a
//! structured component/connection model, a natural-language description, and
//! a Mermaid flowchart. The design pipeline compares the description and the
//! Mermaid output between submissions, so both generators are deterministic:
//! identical input JSON yields byte-identical output.

pub mod describe;
pub mod mermaid;
pub mod model;
pub mod parser;

pub use model::{Component, ComponentShape, Connection, DiagramStructure};

use viva_domain::error::Result;

/// Everything the design pipeline needs from one diagram submission.
#[derive(Debug, Clone)]
pub struct DesignSummary {
    pub structure: DiagramStructure,
    pub description: String,
    pub mermaid: String,
}

/// Parse an Excalidraw scene and derive its description and Mermaid view.
///
/// This is the only entry point the runtime uses.
pub fn parse_design(raw: &serde_json::Value) -> Result<DesignSummary> {
    let structure = parser::parse_to_structure(raw)?;
    let description = describe::generate(&structure);
    let mermaid = mermaid::generate(&structure);
    Ok(DesignSummary {
        structure,
        description,
        mermaid,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_box_scene() -> serde_json::Value {
        serde_json::json!({
            "elements": [
                {"id": "a", "type": "rectangle"},
                {"id": "a-label", "type": "text", "text": "API", "containerId": "a"},
                {"id": "b", "type": "ellipse"},
                {"id": "b-label", "type": "text", "text": "Database", "containerId": "b"},
                {"id": "e", "type": "arrow",
                 "startBinding": {"elementId": "a"},
                 "endBinding": {"elementId": "b"}},
                {"id": "note", "type": "text", "text": "draft"}
            ]
        })
    }

    #[test]
    fn end_to_end_summary() {
        let summary = parse_design(&two_box_scene()).unwrap();
        assert_eq!(summary.structure.components.len(), 2);
        assert_eq!(summary.structure.connections.len(), 1);
        assert_eq!(summary.structure.standalone.len(), 1);
        assert!(summary.description.contains("API"));
        assert!(summary.mermaid.starts_with("flowchart TD"));
    }

    #[test]
    fn deterministic_output() {
        let first = parse_design(&two_box_scene()).unwrap();
        let second = parse_design(&two_box_scene()).unwrap();
        assert_eq!(first.description, second.description);
        assert_eq!(first.mermaid, second.mermaid);
    }
}
