//! YAML frontmatter binding a working file to a remote node
//!
//! The header is intentionally minimal: `id`, `title` and an optional
//! `type: folder`. Unknown keys written by the user are preserved on
//! re-render.

use crate::{Error, Result};
use serde_yaml::{Mapping, Value};

const DELIMITER: &str = "---";
const FOLDER_TYPE: &str = "folder";

/// Parsed frontmatter header.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Frontmatter {
    /// Remote node id; absent for files not yet created remotely
    pub id: Option<String>,
    /// Node title
    pub title: Option<String>,
    /// `type: folder` marker
    pub folder: bool,
    /// Keys this crate does not interpret, kept verbatim
    extra: Mapping,
}

impl Frontmatter {
    /// Header for a page node.
    pub fn page(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            title: Some(title.into()),
            folder: false,
            extra: Mapping::new(),
        }
    }

    /// Header for a folder node.
    pub fn folder(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            folder: true,
            ..Self::page(id, title)
        }
    }

    fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        let mut mapping = match serde_yaml::from_str::<Value>(yaml)? {
            Value::Null => Mapping::new(),
            Value::Mapping(m) => m,
            _ => return Err(Error::frontmatter("expected a mapping")),
        };

        let id = take_scalar(&mut mapping, "id")?;
        let title = take_scalar(&mut mapping, "title")?;
        let folder = take_scalar(&mut mapping, "type")?.as_deref() == Some(FOLDER_TYPE);

        Ok(Self {
            id,
            title,
            folder,
            extra: mapping,
        })
    }

    fn to_yaml(&self) -> Result<String> {
        let mut mapping = Mapping::new();
        if let Some(id) = &self.id {
            mapping.insert("id".into(), Value::String(id.clone()));
        }
        if let Some(title) = &self.title {
            mapping.insert("title".into(), Value::String(title.clone()));
        }
        if self.folder {
            mapping.insert("type".into(), FOLDER_TYPE.into());
        }
        for (key, value) in &self.extra {
            mapping.insert(key.clone(), value.clone());
        }
        Ok(serde_yaml::to_string(&Value::Mapping(mapping))?)
    }
}

/// Pull a scalar out of the mapping as a string. Numbers are accepted for
/// ids that were written unquoted.
fn take_scalar(mapping: &mut Mapping, key: &str) -> Result<Option<String>> {
    match mapping.remove(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(_) => Err(Error::frontmatter(format!("`{}` must be a scalar", key))),
    }
}

/// A working file split into header and body.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    pub frontmatter: Option<Frontmatter>,
    pub body: String,
}

impl Document {
    pub fn new(frontmatter: Frontmatter, body: impl Into<String>) -> Self {
        Self {
            frontmatter: Some(frontmatter),
            body: body.into(),
        }
    }

    /// Parse a file's text.
    ///
    /// Text that does not open with `---` has no frontmatter. One blank line
    /// directly after the closing delimiter is treated as separator, not body.
    pub fn parse(text: &str) -> Result<Self> {
        let Some(rest) = text
            .strip_prefix("---\n")
            .or_else(|| text.strip_prefix("---\r\n"))
        else {
            return Ok(Self {
                frontmatter: None,
                body: text.to_string(),
            });
        };

        let mut offset = 0;
        for line in rest.split_inclusive('\n') {
            if line.trim_end() == DELIMITER {
                let yaml = &rest[..offset];
                let after = &rest[offset + line.len()..];
                let body = after
                    .strip_prefix("\r\n")
                    .or_else(|| after.strip_prefix('\n'))
                    .unwrap_or(after);
                return Ok(Self {
                    frontmatter: Some(Frontmatter::from_yaml(yaml)?),
                    body: body.to_string(),
                });
            }
            offset += line.len();
        }

        Err(Error::UnterminatedFrontmatter)
    }

    /// Render back to file text.
    pub fn render(&self) -> Result<String> {
        let Some(frontmatter) = &self.frontmatter else {
            return Ok(self.body.clone());
        };
        let mut out = format!("{DELIMITER}\n{}{DELIMITER}\n", frontmatter.to_yaml()?);
        if !self.body.is_empty() {
            out.push('\n');
            out.push_str(&self.body);
        }
        Ok(out)
    }

    /// Node id from the header, if any.
    pub fn id(&self) -> Option<&str> {
        self.frontmatter.as_ref()?.id.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.frontmatter.as_ref()?.title.as_deref()
    }

    pub fn is_folder(&self) -> bool {
        self.frontmatter.as_ref().is_some_and(|f| f.folder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn parse_without_frontmatter() {
        let doc = Document::parse("# Just text\n").unwrap();
        assert!(doc.frontmatter.is_none());
        assert_eq!(doc.body, "# Just text\n");
        assert_eq!(doc.id(), None);
    }

    #[test]
    fn parse_numeric_id() {
        let doc = Document::parse("---\nid: 12345\ntitle: Intro\n---\n\nBody\n").unwrap();
        assert_eq!(doc.id(), Some("12345"));
        assert_eq!(doc.title(), Some("Intro"));
        assert_eq!(doc.body, "Body\n");
    }

    #[test]
    fn render_then_parse_keeps_body() {
        let doc = Document::new(Frontmatter::page("7", "Seven"), "\nleading blank\n");
        let parsed = Document::parse(&doc.render().unwrap()).unwrap();
        assert_eq!(parsed, doc);
    }

    #[test]
    fn folder_renders_header_only() {
        let doc = Document::new(Frontmatter::folder("9", "Team"), "");
        let text = doc.render().unwrap();
        assert!(text.contains("type: folder"));
        assert!(text.ends_with("---\n"));
        assert!(Document::parse(&text).unwrap().is_folder());
    }

    #[test]
    fn unknown_keys_survive() {
        let text = "---\nid: '1'\ntitle: T\nowner: me\n---\n\nx\n";
        let doc = Document::parse(text).unwrap();
        assert!(doc.render().unwrap().contains("owner: me"));
    }

    #[test]
    fn unterminated_is_error() {
        let result = Document::parse("---\nid: 1\nno end\n");
        assert!(matches!(result, Err(Error::UnterminatedFrontmatter)));
    }

    #[test]
    fn non_scalar_id_is_error() {
        let result = Document::parse("---\nid: [1, 2]\n---\n");
        assert!(matches!(result, Err(Error::Frontmatter { .. })));
    }

    #[test]
    fn empty_header_has_no_id() {
        let doc = Document::parse("---\n---\nbody\n").unwrap();
        assert!(doc.frontmatter.is_some());
        assert_eq!(doc.id(), None);
        assert_eq!(doc.body, "body\n");
    }
}
