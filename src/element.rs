//! Declarative element tree handed to the layout engine.
//!
//! The renderer itself never looks inside the tree; only layout engines do.
//! Trees deserialize from JSON such as
//! `{"type":"text","text":"Hello","style":{"fontSize":64}}`.

use serde::{Deserialize, Serialize};

/// Visual style of a node. Unset fields inherit from the parent where that
/// makes sense (font family, size and colour).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Style {
    pub font_family: Option<String>,
    pub font_size: Option<f32>,
    pub color: Option<String>,
    pub background_color: Option<String>,
    pub padding: f32,
    /// Vertical space between children
    pub gap: f32,
}

impl Style {
    pub fn font_size(mut self, size: f32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn font_family(mut self, family: impl Into<String>) -> Self {
        self.font_family = Some(family.into());
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn background(mut self, color: impl Into<String>) -> Self {
        self.background_color = Some(color.into());
        self
    }

    pub fn padding(mut self, padding: f32) -> Self {
        self.padding = padding;
        self
    }

    pub fn gap(mut self, gap: f32) -> Self {
        self.gap = gap;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Element {
    /// Stacks children top to bottom
    Container {
        #[serde(default)]
        style: Style,
        #[serde(default)]
        children: Vec<Element>,
    },
    /// A run of text, wrapped to the available width
    Text {
        #[serde(default)]
        style: Style,
        text: String,
    },
}

impl Element {
    pub fn container(children: Vec<Element>) -> Self {
        Element::Container {
            style: Style::default(),
            children,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Element::Text {
            style: Style::default(),
            text: text.into(),
        }
    }

    pub fn with_style(self, style: Style) -> Self {
        match self {
            Element::Container { children, .. } => Element::Container { style, children },
            Element::Text { text, .. } => Element::Text { style, text },
        }
    }

    pub fn style(&self) -> &Style {
        match self {
            Element::Container { style, .. } | Element::Text { style, .. } => style,
        }
    }
}
