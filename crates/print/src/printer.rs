//! Class listings in text and JSON form

use std::collections::BTreeMap;
use std::fmt::Write;

use rdl2_core::{Attribute, AttributeValue, SceneClass};
use serde::Serialize;

const INDENT: &str = "    ";

/// What to include in a listing
#[derive(Debug, Clone)]
pub struct Options {
    pub attributes: Vec<String>,
    pub sort: bool,
    pub show_attrs: bool,
    pub comments: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            attributes: Vec::new(),
            sort: true,
            show_attrs: true,
            comments: true,
        }
    }
}

impl Options {
    fn wants(&self, attr: &Attribute) -> bool {
        self.attributes.is_empty() || self.attributes.iter().any(|name| name == attr.name())
    }
}

#[derive(Debug, Serialize)]
pub struct ClassInfo {
    pub name: String,
    pub interface: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Vec<AttributeInfo>>,
}

#[derive(Debug, Serialize)]
pub struct AttributeInfo {
    pub name: String,
    #[serde(rename = "type")]
    pub attribute_type: String,
    pub default: String,
    pub flags: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub enum_values: BTreeMap<i32, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, String>,

    #[serde(skip)]
    default_description: Option<String>,
}

impl AttributeInfo {
    fn new(attr: &Attribute, comments: bool) -> Self {
        let default = attr.default_attribute_value();
        let default_description = match default {
            AttributeValue::Int(value) if attr.is_enumerable() => {
                attr.enum_description(*value).ok().map(str::to_string)
            }
            _ => None,
        };

        let flags = [
            (attr.is_bindable(), "bindable"),
            (attr.is_blurrable(), "blurrable"),
            (attr.is_enumerable(), "enumerable"),
            (attr.is_filename(), "filename"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect();

        let (comment, enum_values, metadata) = if comments {
            (
                attr.comment().map(str::to_string),
                attr.enum_iter().map(|(v, d)| (v, d.to_string())).collect(),
                attr.metadata_iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            )
        } else {
            (None, BTreeMap::new(), BTreeMap::new())
        };

        Self {
            name: attr.name().to_string(),
            attribute_type: attr.attribute_type().to_string(),
            default: default.to_string(),
            flags,
            aliases: attr.aliases().to_vec(),
            comment,
            enum_values,
            metadata,
            default_description,
        }
    }

    /// `["name"] = default,  -- Type, flags...`
    fn header(&self, comments: bool) -> String {
        let mut out = format!("[\"{}\"] = {},", self.name, self.default);
        if comments {
            let _ = write!(out, "  -- {}", self.attribute_type);
            for flag in &self.flags {
                let _ = write!(out, ", {}", flag);
            }
            if let Some(description) = &self.default_description {
                let _ = write!(out, ", \"{}\"", description);
            }
        } else if let Some(description) = &self.default_description {
            let _ = write!(out, " -- \"{}\"", description);
        }
        out
    }
}

impl ClassInfo {
    pub fn new(class: &SceneClass, options: &Options) -> Self {
        let attributes = options.show_attrs.then(|| {
            let mut attributes: Vec<AttributeInfo> = class
                .attributes()
                .filter(|attr| options.wants(attr))
                .map(|attr| AttributeInfo::new(attr, options.comments))
                .collect();
            if options.sort {
                attributes.sort_by_cached_key(|attr| attr.header(true));
            }
            attributes
        });

        Self {
            name: class.name().to_string(),
            interface: class.declared_interface().type_name().to_string(),
            attributes,
        }
    }

    pub fn to_text(&self, comments: bool) -> String {
        let mut out = format!("{}(\"{}\")", self.name, self.interface);
        let Some(attributes) = &self.attributes else {
            out.push('\n');
            return out;
        };

        out.push_str(" {\n");
        for attr in attributes {
            let _ = writeln!(out, "{}{}", INDENT, attr.header(comments));
            if !comments {
                continue;
            }
            for (value, description) in &attr.enum_values {
                let _ = writeln!(out, "{0}{0}-- {1} = {2}", INDENT, value, description);
            }
            for (key, value) in &attr.metadata {
                let _ = writeln!(out, "{0}{0}-- {1}: {2}", INDENT, key, value);
            }
        }
        out.push_str("}\n\n");
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdl2_core::SceneContext;

    #[test]
    fn test_render_output_listing() {
        let context = SceneContext::new();
        let class = context.scene_class("RenderOutput").unwrap();
        let info = ClassInfo::new(&class, &Options::default());
        let text = info.to_text(true);

        assert!(text.starts_with("RenderOutput(\"RenderOutput\") {\n"));
        assert!(text.contains("[\"file_name\"] = \"scene.exr\",  -- String, filename"));
        assert!(text.contains("-- label: file name"));
        assert!(text.ends_with("}\n\n"));
    }

    #[test]
    fn test_attribute_filter_and_no_comments() {
        let context = SceneContext::new();
        let class = context.scene_class("RenderOutput").unwrap();
        let options = Options {
            attributes: vec!["active".to_string()],
            comments: false,
            ..Options::default()
        };
        let info = ClassInfo::new(&class, &options);
        let attributes = info.attributes.as_ref().unwrap();
        assert_eq!(attributes.len(), 1);
        assert!(attributes[0].metadata.is_empty());
        assert_eq!(info.to_text(false), "RenderOutput(\"RenderOutput\") {\n    [\"active\"] = true,\n}\n\n");
    }

    #[test]
    fn test_enum_default_description() {
        let context = SceneContext::new();
        let class = context.scene_class("UserData").unwrap();
        let options = Options {
            attributes: vec!["rate".to_string()],
            ..Options::default()
        };
        let text = ClassInfo::new(&class, &options).to_text(true);
        assert!(text.contains("enumerable, \"auto\""));
        assert!(text.contains("-- 0 = auto"));
    }

    #[test]
    fn test_no_attrs_and_json() {
        let context = SceneContext::new();
        let class = context.scene_class("Layer").unwrap();
        let options = Options {
            show_attrs: false,
            ..Options::default()
        };
        let info = ClassInfo::new(&class, &options);
        assert_eq!(info.to_text(true), "Layer(\"TraceSet\")\n");

        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["name"], "Layer");
        assert!(json.get("attributes").is_none());
    }

    #[test]
    fn test_declaration_order_without_sort() {
        let context = SceneContext::new();
        let class = context.scene_class("RenderOutput").unwrap();
        let options = Options {
            sort: false,
            ..Options::default()
        };
        let info = ClassInfo::new(&class, &options);
        let names: Vec<&str> = info.attributes.as_ref().unwrap().iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["active", "camera", "file_name", "display_filter"]);
    }
}
