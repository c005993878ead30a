//! Markdown book page parsing
//!
//! Derives the metadata a page is indexed under from its location and
//! content: title, front-matter-free body, document id and section.

use regex_lite::Regex;
use std::path::Path;

pub const UNTITLED: &str = "Untitled Document";

/// Section for pages sitting directly in the docs root
pub const ROOT_SECTION: &str = "main";

/// A page ready for `index_document`
#[derive(Debug, Clone, PartialEq)]
pub struct BookPage {
    pub doc_id: String,
    pub title: String,
    pub section: String,
    pub content: String,
}

pub struct PageParser {
    front_matter: Regex,
    title_field: Regex,
    heading: Regex,
}

impl PageParser {
    pub fn new() -> Result<Self, regex_lite::Error> {
        Ok(Self {
            front_matter: Regex::new(r"(?s)\A---[ \t]*\r?\n(.*?)\r?\n---[ \t]*(?:\r?\n|\z)")?,
            title_field: Regex::new(r#"(?m)^title:[ \t]*(.+?)[ \t]*\r?$"#)?,
            heading: Regex::new(r"(?m)^#[ \t]+(.+?)[ \t]*\r?$")?,
        })
    }

    /// Front-matter `title:`, else the first `# ` heading, else `UNTITLED`
    pub fn extract_title(&self, raw: &str) -> String {
        let from_front_matter = self
            .front_matter
            .captures(raw)
            .and_then(|fm| fm.get(1))
            .and_then(|block| self.title_field.captures(block.as_str()))
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().trim_matches(|c| c == '"' || c == '\'').to_string())
            .filter(|t| !t.is_empty());

        from_front_matter
            .or_else(|| {
                self.heading
                    .captures(raw)
                    .and_then(|c| c.get(1))
                    .map(|m| m.as_str().trim_end_matches('#').trim().to_string())
                    .filter(|t| !t.is_empty())
            })
            .unwrap_or_else(|| UNTITLED.to_string())
    }

    /// Body with any leading front-matter block removed
    pub fn strip_front_matter<'a>(&self, raw: &'a str) -> &'a str {
        match self.front_matter.find(raw) {
            Some(m) => &raw[m.end()..],
            None => raw,
        }
    }

    pub fn parse(&self, root: &Path, path: &Path, raw: &str) -> BookPage {
        BookPage {
            doc_id: doc_id_for(root, path),
            title: self.extract_title(raw),
            section: section_for(root, path),
            content: self.strip_front_matter(raw).to_string(),
        }
    }
}

/// Path relative to `root`, extension dropped, components joined with `_`
pub fn doc_id_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let without_extension = relative.with_extension("");

    without_extension
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("_")
}

/// Name of the page's parent directory, `ROOT_SECTION` at the root
pub fn section_for(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .ok()
        .and_then(|relative| relative.parent())
        .and_then(|parent| parent.file_name())
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| ROOT_SECTION.to_string())
}

pub fn is_markdown(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("md") | Some("mdx")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> PageParser {
        PageParser::new().unwrap()
    }

    #[test]
    fn test_title_from_front_matter() {
        let raw = "---\nsidebar_position: 2\ntitle: \"ROS 2 Fundamentals\"\n---\n\n# Heading\nBody";
        assert_eq!(parser().extract_title(raw), "ROS 2 Fundamentals");
    }

    #[test]
    fn test_title_from_first_heading() {
        let raw = "Intro line\n\n## Not this\n# Gazebo Simulation\n\n# Later";
        assert_eq!(parser().extract_title(raw), "Gazebo Simulation");
    }

    #[test]
    fn test_front_matter_without_title_uses_heading() {
        let raw = "---\nsidebar_position: 1\n---\n# Sensors\ntext";
        assert_eq!(parser().extract_title(raw), "Sensors");
    }

    #[test]
    fn test_untitled_fallback() {
        assert_eq!(parser().extract_title("plain text only"), UNTITLED);
    }

    #[test]
    fn test_strip_front_matter() {
        let p = parser();
        assert_eq!(
            p.strip_front_matter("---\ntitle: X\n---\n# X\nBody"),
            "# X\nBody"
        );
        assert_eq!(p.strip_front_matter("# No front matter"), "# No front matter");
        assert_eq!(p.strip_front_matter("---\nunterminated"), "---\nunterminated");
    }

    #[test]
    fn test_doc_id_and_section() {
        let root = Path::new("/book/docs");
        let nested = Path::new("/book/docs/module-1/ros2/nodes.md");
        let top = Path::new("/book/docs/intro.mdx");

        assert_eq!(doc_id_for(root, nested), "module-1_ros2_nodes");
        assert_eq!(section_for(root, nested), "ros2");
        assert_eq!(doc_id_for(root, top), "intro");
        assert_eq!(section_for(root, top), ROOT_SECTION);
    }

    #[test]
    fn test_is_markdown() {
        assert!(is_markdown(Path::new("a/b.md")));
        assert!(is_markdown(Path::new("a/b.mdx")));
        assert!(!is_markdown(Path::new("a/b.json")));
        assert!(!is_markdown(Path::new("a/md")));
    }
}
