//! Declarative field lists for telemetry display
//!
//! Host UIs show live telemetry as a tree. Instead of inspecting types at run
//! time, each displayable type lists its own fields through [`Describe`].

use std::fmt;

use super::VideoFrame;

/// A displayable value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Nested fields, rendered as a sub-tree
    Group(Vec<Field>),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Bool(v) => write!(f, "{v}"),
            FieldValue::Int(v) => write!(f, "{v}"),
            FieldValue::Float(v) => write!(f, "{v:.3}"),
            FieldValue::Text(v) => f.write_str(v),
            FieldValue::Group(fields) => write!(f, "{{{} fields}}", fields.len()),
        }
    }
}

/// One named entry in a field list.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub value: FieldValue,
}

impl Field {
    pub fn new(name: &'static str, value: impl Into<FieldValue>) -> Self {
        Self { name, value: value.into() }
    }

    pub fn group(name: &'static str, fields: Vec<Field>) -> Self {
        Self { name, value: FieldValue::Group(fields) }
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        FieldValue::Bool(v)
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        FieldValue::Int(v)
    }
}

impl From<u32> for FieldValue {
    fn from(v: u32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<i32> for FieldValue {
    fn from(v: i32) -> Self {
        FieldValue::Int(i64::from(v))
    }
}

impl From<u64> for FieldValue {
    fn from(v: u64) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<usize> for FieldValue {
    fn from(v: usize) -> Self {
        FieldValue::Int(i64::try_from(v).unwrap_or(i64::MAX))
    }
}

impl From<f32> for FieldValue {
    fn from(v: f32) -> Self {
        FieldValue::Float(f64::from(v))
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        FieldValue::Float(v)
    }
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        FieldValue::Text(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        FieldValue::Text(v.to_string())
    }
}

/// Types that can list their fields for display.
pub trait Describe {
    fn describe(&self) -> Vec<Field>;
}

/// Render a field list as an indented `name: value` tree.
pub fn render_fields(fields: &[Field]) -> String {
    let mut out = String::new();
    render_into(&mut out, fields, 0);
    out
}

fn render_into(out: &mut String, fields: &[Field], depth: usize) {
    for field in fields {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match &field.value {
            FieldValue::Group(children) => {
                out.push_str(field.name);
                out.push('\n');
                render_into(out, children, depth + 1);
            }
            value => {
                out.push_str(&format!("{}: {}\n", field.name, value));
            }
        }
    }
}

impl Describe for VideoFrame {
    fn describe(&self) -> Vec<Field> {
        vec![
            Field::new("number", self.number()),
            Field::new("width", self.width()),
            Field::new("height", self.height()),
            Field::new("layout", format!("{:?}", self.layout())),
            Field::new("bytes", self.pixels().len()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::PixelLayout;

    #[test]
    fn nested_groups_render_indented() {
        let fields = vec![
            Field::new("active", true),
            Field::group("demo", vec![Field::new("altitude", 1.25f32), Field::new("mode", "Hovering")]),
        ];
        let text = render_fields(&fields);
        assert_eq!(text, "active: true\ndemo\n  altitude: 1.250\n  mode: Hovering\n");
    }

    #[test]
    fn video_frame_lists_metadata_only() {
        let frame = VideoFrame::new(9, 2, 2, PixelLayout::Gray8, vec![0; 4]).unwrap();
        let fields = frame.describe();
        assert_eq!(fields[0], Field::new("number", 9u64));
        assert!(fields.iter().any(|f| f.name == "layout" && f.value == FieldValue::from("Gray8")));
    }
}
