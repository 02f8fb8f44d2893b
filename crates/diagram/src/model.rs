//! Structured view of a parsed diagram.

use serde::{Deserialize, Serialize};

/// Shape of a container element, kept for Mermaid rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComponentShape {
    Rectangle,
    Ellipse,
    Diamond,
}

/// A boxed element of the diagram (a service, a store, a decision point).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Component {
    pub id: String,
    pub shape: ComponentShape,
    pub label: Option<String>,
}

impl Component {
    /// The label, or a stable fallback derived from the element id.
    pub fn display_name(&self) -> String {
        match &self.label {
            Some(label) if !label.trim().is_empty() => label.trim().to_string(),
            _ => {
                let short: String = self.id.chars().take(6).collect();
                format!("component {short}")
            }
        }
    }
}

/// A directed edge between two components.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection {
    pub from: String,
    pub to: String,
    pub label: Option<String>,
}

/// The full parsed scene, in element order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiagramStructure {
    pub components: Vec<Component>,
    pub connections: Vec<Connection>,
    /// Free-floating text that is not bound to any shape.
    pub standalone: Vec<String>,
}

impl DiagramStructure {
    pub fn component(&self, id: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.id == id)
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.connections.is_empty() && self.standalone.is_empty()
    }
}
