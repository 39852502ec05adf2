//! Retained novel project.

use crate::backup::write_with_backup;
use crate::model::graph::Graph;
use crate::novel::reader::{read_graph, ROOT};
use crate::novel::writer::write_graph;
use crate::novel::xml::set_child_text;
use crate::novel::{ensure_unlocked, NovelError};
use log::info;
use std::path::{Path, PathBuf};
use xmltree::{Element, EmitterConfig, XMLNode};

const FORMAT_VERSION: &str = "7";

/// Novel project XML plus its location on disk.
#[derive(Debug, Clone)]
pub struct NovelDocument {
    path: PathBuf,
    root: Element,
}

impl NovelDocument {
    /// Reads the project at `path`.
    ///
    /// # Errors
    /// - `NovelError::Locked` when a lock file exists.
    /// - `NovelError::Io` / `NovelError::Parse` for unreadable files.
    pub fn open(path: &Path) -> Result<(Self, Graph), NovelError> {
        ensure_unlocked(path)?;
        let text = std::fs::read_to_string(path).map_err(|source| NovelError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let (document, graph) = Self::from_xml(path, &text)?;
        info!(
            "event=novel_loaded module=novel status=ok path={} chapters={} scenes={}",
            path.display(),
            graph.chapters.len(),
            graph.scenes.len()
        );
        Ok((document, graph))
    }

    /// Parses project XML held in memory.
    pub fn from_xml(path: &Path, text: &str) -> Result<(Self, Graph), NovelError> {
        let root = Element::parse(text.as_bytes())?;
        let graph = read_graph(&root)?;
        Ok((
            Self {
                path: path.to_path_buf(),
                root,
            },
            graph,
        ))
    }

    /// Starts an empty project titled `title`, to be written to `path`.
    pub fn create(path: &Path, title: &str) -> (Self, Graph) {
        let mut root = Element::new(ROOT);
        let mut project = Element::new("PROJECT");
        set_child_text(&mut project, "Ver", Some(FORMAT_VERSION));
        set_child_text(&mut project, "Title", Some(title));
        root.children.push(XMLNode::Element(project));
        (
            Self {
                path: path.to_path_buf(),
                root,
            },
            Graph::new(),
        )
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Folds `graph` into the retained XML without touching the disk.
    pub fn apply_graph(&mut self, graph: &Graph) {
        write_graph(&mut self.root, graph);
    }

    /// Serializes the retained XML.
    pub fn to_xml(&self) -> Result<String, NovelError> {
        let mut buffer = Vec::new();
        let config = EmitterConfig::new()
            .perform_indent(true)
            .indent_string("\t");
        self.root
            .write_with_config(&mut buffer, config)
            .map_err(|err| NovelError::WriteFailed {
                path: self.path.clone(),
                reason: err.to_string(),
            })?;
        String::from_utf8(buffer).map_err(|err| NovelError::WriteFailed {
            path: self.path.clone(),
            reason: err.to_string(),
        })
    }

    /// Merges `graph` and writes the project, keeping a `.bak` copy.
    ///
    /// Returns the user-facing success message.
    pub fn save(&mut self, graph: &Graph) -> Result<String, NovelError> {
        ensure_unlocked(&self.path)?;
        self.apply_graph(graph);
        let text = self.to_xml()?;
        write_with_backup(&self.path, |target| std::fs::write(target, text.as_bytes())).map_err(
            |err| NovelError::WriteFailed {
                path: self.path.clone(),
                reason: err.to_string(),
            },
        )?;
        info!(
            "event=novel_saved module=novel status=ok path={} scenes={}",
            self.path.display(),
            graph.scenes.len()
        );
        Ok(format!("\"{}\" written.", self.path.display()))
    }
}
