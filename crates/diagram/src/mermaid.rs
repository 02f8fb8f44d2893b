//! Mermaid flowchart rendering of a parsed diagram.

use std::collections::HashMap;

use crate::model::{ComponentShape, DiagramStructure};

/// Render the structure as a `flowchart TD`.
///
/// Node ids are `n0`, `n1`, ... in component order so that output is stable
/// across runs regardless of the Excalidraw element ids.
pub fn generate(structure: &DiagramStructure) -> String {
    let mut lines = vec!["flowchart TD".to_string()];

    let mut node_ids: HashMap<&str, String> = HashMap::new();
    for (i, component) in structure.components.iter().enumerate() {
        let node_id = format!("n{i}");
        let label = sanitize_label(&component.display_name());
        let node = match component.shape {
            ComponentShape::Rectangle => format!("{node_id}[{label}]"),
            ComponentShape::Ellipse => format!("{node_id}(({label}))"),
            ComponentShape::Diamond => format!("{node_id}{{{label}}}"),
        };
        lines.push(format!("    {node}"));
        node_ids.insert(component.id.as_str(), node_id);
    }

    for connection in &structure.connections {
        let (Some(from), Some(to)) = (
            node_ids.get(connection.from.as_str()),
            node_ids.get(connection.to.as_str()),
        ) else {
            continue;
        };
        match &connection.label {
            Some(label) => lines.push(format!(
                "    {from} -->|{}| {to}",
                sanitize_label(label)
            )),
            None => lines.push(format!("    {from} --> {to}")),
        }
    }

    lines.join("\n")
}

/// Mermaid breaks on brackets, braces, pipes and quotes inside labels.
fn sanitize_label(label: &str) -> String {
    label
        .chars()
        .map(|c| match c {
            '[' | ']' | '{' | '}' | '(' | ')' | '|' | '"' | '`' => ' ',
            '\n' => ' ',
            other => other,
        })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Component, Connection};

    fn component(id: &str, shape: ComponentShape, label: &str) -> Component {
        Component {
            id: id.into(),
            shape,
            label: Some(label.into()),
        }
    }

    #[test]
    fn renders_shapes_and_edges() {
        let structure = DiagramStructure {
            components: vec![
                component("a", ComponentShape::Rectangle, "API"),
                component("b", ComponentShape::Ellipse, "DB"),
                component("c", ComponentShape::Diamond, "Hit?"),
            ],
            connections: vec![
                Connection {
                    from: "a".into(),
                    to: "c".into(),
                    label: None,
                },
                Connection {
                    from: "c".into(),
                    to: "b".into(),
                    label: Some("miss".into()),
                },
            ],
            standalone: vec![],
        };
        let mermaid = generate(&structure);
        assert_eq!(
            mermaid,
            "flowchart TD\n    n0[API]\n    n1((DB))\n    n2{Hit?}\n    n0 --> n2\n    n2 -->|miss| n1"
        );
    }

    #[test]
    fn labels_are_sanitized() {
        let structure = DiagramStructure {
            components: vec![component("a", ComponentShape::Rectangle, "API [v2]\n(beta)")],
            ..Default::default()
        };
        assert!(generate(&structure).contains("n0[API v2 beta]"));
    }

    #[test]
    fn empty_structure_is_bare_header() {
        assert_eq!(generate(&DiagramStructure::default()), "flowchart TD");
    }
}
