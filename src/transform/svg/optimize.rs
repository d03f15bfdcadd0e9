//! SVG optimization using usvg.

/// Re-serialize through usvg: resolves styles and `use`, drops editor
/// metadata and whitespace.
///
/// `id_prefix` keeps ids unique when several SVGs end up in one document.
pub fn optimize_svg(content: &[u8], id_prefix: Option<&str>) -> Result<Vec<u8>, String> {
    let options = usvg::Options::default();
    let tree = usvg::Tree::from_data(content, &options).map_err(|e| e.to_string())?;

    let write_options = usvg::WriteOptions {
        indent: usvg::Indent::None,
        id_prefix: id_prefix.map(str::to_string),
        ..Default::default()
    };
    Ok(tree.to_string(&write_options).into_bytes())
}
