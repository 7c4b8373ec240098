//! Working-file round trips through frontmatter, markers and links

use pretty_assertions::assert_eq;
use wiki_content::{Document, Frontmatter, Side, attachment_refs, has_markers, inject_markers, strip_markers};

#[test]
fn test_conflict_body_keeps_frontmatter_intact() {
    let local = "Intro\nmine\n";
    let remote = "Intro\ntheirs\n";
    let doc = Document::new(Frontmatter::page("42", "Answer"), inject_markers(local, remote));
    let text = doc.render().unwrap();

    let reparsed = Document::parse(&text).unwrap();
    assert_eq!(reparsed.id(), Some("42"));
    assert!(has_markers(&reparsed.body));
    assert_eq!(strip_markers(&reparsed.body, Side::Local).unwrap(), local);
}

#[test]
fn test_crlf_file_parses() {
    let text = "---\r\nid: '5'\r\ntitle: Win\r\n---\r\n\r\nbody\r\n";
    let doc = Document::parse(text).unwrap();
    assert_eq!(doc.id(), Some("5"));
    assert_eq!(doc.body, "body\r\n");
}

#[test]
fn test_refs_read_from_parsed_body() {
    let text = "---\nid: '1'\ntitle: Page\n---\n\n![x](page.attachments/x.png)\n";
    let doc = Document::parse(text).unwrap();
    assert_eq!(attachment_refs(&doc.body, "page.md"), vec!["x.png".to_string()]);
}
