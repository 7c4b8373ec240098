//! How a working file is bound to a remote node

use wiki_content::Document;

use crate::state::StateStore;

/// Binding of one working file, resolved once per file per command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tracking {
    /// Node id carried in the file's own frontmatter
    Frontmatter {
        id: String,
        title: Option<String>,
        folder: bool,
    },
    /// No id in the file, but the path index knows the path
    Legacy { id: String },
    Untracked,
}

impl Tracking {
    pub fn resolve(document: &Document, relative_path: &str, state: &StateStore) -> Self {
        if let Some(frontmatter) = &document.frontmatter {
            if let Some(id) = &frontmatter.id {
                return Self::Frontmatter {
                    id: id.clone(),
                    title: frontmatter.title.clone(),
                    folder: frontmatter.folder,
                };
            }
        }
        match state.id_for_path(relative_path) {
            Some(id) => Self::Legacy { id: id.to_string() },
            None => Self::Untracked,
        }
    }

    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Frontmatter { id, .. } | Self::Legacy { id } => Some(id),
            Self::Untracked => None,
        }
    }

    /// Title declared in the file, if any.
    pub fn title(&self) -> Option<&str> {
        match self {
            Self::Frontmatter { title, .. } => title.as_deref(),
            _ => None,
        }
    }
}
