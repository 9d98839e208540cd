//! Table formatting for reference listings.

use comfy_table::{Attribute, Cell, ContentArrangement, Table, presets};
use gitsync_transport::RemoteRef;

/// Render remote references as a two-column table.
pub fn remote_refs(refs: &[RemoteRef]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_HORIZONTAL_ONLY)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("Reference").add_attribute(Attribute::Bold),
            Cell::new("Object").add_attribute(Attribute::Bold),
        ]);
    for reference in refs {
        table.add_row(vec![reference.name.clone(), reference.oid.to_string()]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::Oid;

    #[test]
    fn rows_follow_input_order() {
        let oid = Oid::from_str("4b825dc642cb6eb9a060e54bf8d69288fbee4904").unwrap();
        let refs = vec![
            RemoteRef {
                name: "HEAD".into(),
                oid,
            },
            RemoteRef {
                name: "refs/heads/main".into(),
                oid,
            },
        ];
        let rendered = remote_refs(&refs).to_string();
        assert!(rendered.contains("Reference"));
        let head = rendered.find("HEAD").unwrap();
        let main = rendered.find("refs/heads/main").unwrap();
        assert!(head < main);
        assert!(rendered.contains("4b825dc642cb6eb9a060e54bf8d69288fbee4904"));
    }
}
