//! SVG markup → React component module.
//!
//! The markup is parsed into an element tree and emitted as nested
//! `createElement` calls, so rendering the component produces the same
//! elements, attributes and text as embedding the markup directly.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::classify::ComponentExport;
use crate::utils::html;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SvgChild {
    Element(SvgNode),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SvgNode {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<SvgChild>,
}

impl SvgNode {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let tag = utf8(start.name().as_ref())?;
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = utf8(attr.key.as_ref())?;
            let value = html::unescape(&utf8(&attr.value)?).into_owned();
            attrs.push((key, value));
        }
        Ok(Self {
            tag,
            attrs,
            children: Vec::new(),
        })
    }

    /// Serialize back to markup.
    pub fn render(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out);
        out
    }

    fn render_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attrs {
            out.push_str(&format!(" {key}=\"{}\"", html::escape_attr(value)));
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                SvgChild::Element(node) => node.render_into(out),
                SvgChild::Text(text) => out.push_str(&html::escape(text)),
            }
        }
        out.push_str(&format!("</{}>", self.tag));
    }

    fn create_element(&self, props: Option<&str>) -> String {
        let mut attrs: Vec<String> = self
            .attrs
            .iter()
            .map(|(key, value)| {
                let name = js_string(&react_attr(key));
                let value = if key == "style" { style_object(value) } else { js_string(value) };
                format!("{name}: {value}")
            })
            .collect();
        let mut object = format!("{{ {} }}", attrs.join(", "));
        if attrs.is_empty() {
            object = "{}".to_string();
        }
        if let Some(props) = props {
            object = format!("Object.assign({object}, {props})");
        }

        let mut call = format!("createElement({}, {object}", js_string(&self.tag));
        for child in &self.children {
            call.push_str(", ");
            match child {
                SvgChild::Element(node) => call.push_str(&node.create_element(None)),
                SvgChild::Text(text) => call.push_str(&js_string(text)),
            }
        }
        call.push(')');
        call
    }
}

fn utf8(bytes: &[u8]) -> Result<String, String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| e.to_string())
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

/// Parse markup into its root `<svg>` element.
pub fn parse_svg(content: &[u8]) -> Result<SvgNode, String> {
    let text = std::str::from_utf8(content).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<SvgNode> = Vec::new();
    loop {
        let event = reader.read_event().map_err(|e| e.to_string())?;
        match event {
            Event::Start(start) => stack.push(SvgNode::open(&start)?),
            Event::Empty(start) => {
                let node = SvgNode::open(&start)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(SvgChild::Element(node)),
                    None => return Ok(node),
                }
            }
            Event::End(_) => {
                let node = stack.pop().ok_or("unbalanced closing tag")?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(SvgChild::Element(node)),
                    None => return Ok(node),
                }
            }
            Event::Text(t) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &html::unescape(&utf8(&t)?));
                }
            }
            Event::GeneralRef(r) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &html::unescape(&format!("&{};", utf8(&r)?)));
                }
            }
            Event::CData(c) => {
                if let Some(parent) = stack.last_mut() {
                    push_text(parent, &utf8(&c)?);
                }
            }
            Event::Eof => return Err("no root element".to_string()),
            _ => {}
        }
    }
}

/// Append text, merging with a preceding text node. Whitespace-only runs
/// between elements are dropped.
fn push_text(parent: &mut SvgNode, text: &str) {
    if let Some(SvgChild::Text(last)) = parent.children.last_mut() {
        last.push_str(text);
        return;
    }
    if !text.trim().is_empty() {
        parent.children.push(SvgChild::Text(text.to_string()));
    }
}

/// Attribute name as React expects it.
fn react_attr(name: &str) -> String {
    match name {
        "class" => return "className".to_string(),
        "for" => return "htmlFor".to_string(),
        _ => {}
    }
    if name.starts_with("data-") || name.starts_with("aria-") {
        return name.to_string();
    }
    camel_case(&name.replace(':', "-"))
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `fill:red;stroke-width:2` -> `{ "fill": "red", "strokeWidth": "2" }`
fn style_object(style: &str) -> String {
    let entries: Vec<String> = style
        .split(';')
        .filter_map(|decl| decl.split_once(':'))
        .map(|(k, v)| {
            let key = k.trim();
            let key = if key.starts_with("--") { key.to_string() } else { camel_case(key) };
            format!("{}: {}", js_string(&key), js_string(v.trim()))
        })
        .collect();
    format!("{{ {} }}", entries.join(", "))
}

/// Component module source for `svg`.
///
/// With [`ComponentExport::Named`] the component is `ReactComponent` and the
/// default export is `default_url`: a data URI string literal or a
/// re-export of the file's URL variant.
pub fn component_module(
    svg: &SvgNode,
    export: ComponentExport,
    default_url: &DefaultUrl,
) -> String {
    let mut code = String::from("import { createElement } from \"react\";\n");
    code.push_str(&format!(
        "const SvgComponent = (props) => {};\n",
        svg.create_element(Some("props"))
    ));
    match export {
        ComponentExport::Default => code.push_str("export default SvgComponent;\n"),
        ComponentExport::Named => {
            code.push_str("export { SvgComponent as ReactComponent };\n");
            match default_url {
                DefaultUrl::Inline(uri) => {
                    code.push_str(&format!("export default {};\n", js_string(uri)));
                }
                DefaultUrl::Request(spec) => {
                    code.push_str(&format!("export {{ default }} from {};\n", js_string(spec)));
                }
            }
        }
    }
    code
}

/// Default export of a named component module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefaultUrl {
    Inline(String),
    /// Specifier of the file's URL variant.
    Request(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    const ICON: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 24 24" class="icon"><g stroke-width="2" style="fill:none;stroke-linecap:round"><path d="M4 12h16"/><title>Menu &amp; more</title></g></svg>"#;

    #[test]
    fn test_parse_builds_tree() {
        let svg = parse_svg(ICON.as_bytes()).unwrap();
        assert_eq!(svg.tag, "svg");
        assert_eq!(svg.attrs.len(), 3);
        let SvgChild::Element(g) = &svg.children[0] else { panic!("expected <g>") };
        assert_eq!(g.children.len(), 2);
        let SvgChild::Element(title) = &g.children[1] else { panic!("expected <title>") };
        assert_eq!(title.children, vec![SvgChild::Text("Menu & more".to_string())]);
    }

    #[test]
    fn test_render_round_trips_markup() {
        let svg = parse_svg(ICON.as_bytes()).unwrap();
        assert_eq!(svg.render(), ICON);
    }

    #[test]
    fn test_component_round_trips_optimized_svg() {
        let raw = br##"<svg xmlns="http://www.w3.org/2000/svg" width="16" height="16" viewBox="0 0 16 16"><circle cx="8" cy="8" r="6" fill="#00f"/></svg>"##;
        let optimized = super::super::optimize_svg(raw, None).unwrap();
        let tree = parse_svg(&optimized).unwrap();
        assert_eq!(parse_svg(tree.render().as_bytes()).unwrap(), tree);

        let url = DefaultUrl::Inline(String::new());
        let module = component_module(&tree, ComponentExport::Default, &url);
        assert_eq!(
            module.matches("createElement(\"").count(),
            count_elements(&tree),
            "one createElement call per element"
        );
    }

    fn count_elements(node: &SvgNode) -> usize {
        1 + node
            .children
            .iter()
            .map(|c| match c {
                SvgChild::Element(n) => count_elements(n),
                SvgChild::Text(_) => 0,
            })
            .sum::<usize>()
    }

    #[test]
    fn test_react_attribute_names() {
        assert_eq!(react_attr("class"), "className");
        assert_eq!(react_attr("stroke-width"), "strokeWidth");
        assert_eq!(react_attr("xlink:href"), "xlinkHref");
        assert_eq!(react_attr("data-name"), "data-name");
        assert_eq!(
            style_object("fill:none; stroke-linecap: round;"),
            r#"{ "fill": "none", "strokeLinecap": "round" }"#
        );
    }

    #[test]
    fn test_named_export_module() {
        let svg = parse_svg(ICON.as_bytes()).unwrap();
        let url = DefaultUrl::Inline("data:image/svg+xml,x".into());
        let inline = component_module(&svg, ComponentExport::Named, &url);
        assert!(inline.contains("export { SvgComponent as ReactComponent };"));
        assert!(inline.contains("export default \"data:image/svg+xml,x\";"));
        assert!(inline.contains("Object.assign({ \"xmlns\""));
        assert!(inline.contains("\"className\": \"icon\""));

        let url = DefaultUrl::Request("./icon.svg?url".into());
        let external = component_module(&svg, ComponentExport::Named, &url);
        assert!(external.contains("export { default } from \"./icon.svg?url\";"));

        let url = DefaultUrl::Inline(String::new());
        let default = component_module(&svg, ComponentExport::Default, &url);
        assert!(default.contains("export default SvgComponent;"));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_svg(b"").is_err());
        assert!(parse_svg(&[0xff, 0xfe]).is_err());
    }
}
