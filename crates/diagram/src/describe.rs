//! Natural-language description of a parsed diagram.
//!
//! The output feeds the LLM prompt and the change detector, so the wording
//! is fixed and follows element order.

use crate::model::{ComponentShape, DiagramStructure};

pub fn generate(structure: &DiagramStructure) -> String {
    if structure.is_empty() {
        return "The canvas is empty.".to_string();
    }

    let mut lines = Vec::new();

    match structure.components.len() {
        0 => {}
        1 => lines.push(format!(
            "The design contains one component: {}.",
            describe_component(structure, 0)
        )),
        n => {
            let names: Vec<String> = (0..n).map(|i| describe_component(structure, i)).collect();
            lines.push(format!(
                "The design contains {n} components: {}.",
                names.join(", ")
            ));
        }
    }

    for connection in &structure.connections {
        let from = structure
            .component(&connection.from)
            .map(|c| c.display_name())
            .unwrap_or_else(|| connection.from.clone());
        let to = structure
            .component(&connection.to)
            .map(|c| c.display_name())
            .unwrap_or_else(|| connection.to.clone());
        match &connection.label {
            Some(label) => lines.push(format!("{from} connects to {to} ({label}).")),
            None => lines.push(format!("{from} connects to {to}.")),
        }
    }

    if !structure.standalone.is_empty() {
        lines.push(format!(
            "Standalone notes: {}.",
            structure.standalone.join("; ")
        ));
    }

    lines.join("\n")
}

fn describe_component(structure: &DiagramStructure, index: usize) -> String {
    let component = &structure.components[index];
    let kind = match component.shape {
        ComponentShape::Rectangle => "box",
        ComponentShape::Ellipse => "node",
        ComponentShape::Diamond => "decision",
    };
    format!("{} ({kind})", component.display_name())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Connection};

    #[test]
    fn empty_canvas() {
        assert_eq!(generate(&DiagramStructure::default()), "The canvas is empty.");
    }

    #[test]
    fn components_and_connections_described_in_order() {
        let structure = DiagramStructure {
            components: vec![
                Component {
                    id: "a".into(),
                    shape: ComponentShape::Rectangle,
                    label: Some("API".into()),
                },
                Component {
                    id: "b".into(),
                    shape: ComponentShape::Ellipse,
                    label: Some("DB".into()),
                },
            ],
            connections: vec![Connection {
                from: "a".into(),
                to: "b".into(),
                label: Some("writes".into()),
            }],
            standalone: vec!["v2 sketch".into()],
        };
        let text = generate(&structure);
        assert!(text.contains("2 components: API (box), DB (node)"));
        assert!(text.contains("API connects to DB (writes)."));
        assert!(text.contains("Standalone notes: v2 sketch."));
    }

    #[test]
    fn unlabeled_component_uses_id_fallback() {
        let structure = DiagramStructure {
            components: vec![Component {
                id: "abcdef123".into(),
                shape: ComponentShape::Rectangle,
                label: None,
            }],
            ..Default::default()
        };
        assert!(generate(&structure).contains("component abcdef"));
    }
}
