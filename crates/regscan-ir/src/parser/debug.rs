//! Debug metadata table (`!N = !DILocation(...)` and friends).

use std::sync::OnceLock;

use regex::Regex;
use rustc_hash::FxHashMap;

/// Maximum scope hops when looking for a `DIFile`.
const MAX_SCOPE_DEPTH: usize = 32;

static NODE_PATTERN: OnceLock<Regex> = OnceLock::new();
static FIELD_PATTERN: OnceLock<Regex> = OnceLock::new();

/// A specialized metadata node.
#[derive(Clone, Debug, Default)]
struct Node {
    kind: String,
    fields: FxHashMap<String, String>,
}

impl Node {
    fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Field holding a node reference (`scope: !12`).
    fn node_ref(&self, name: &str) -> Option<u32> {
        self.field(name)?.strip_prefix('!')?.parse().ok()
    }
}

/// Debug metadata nodes indexed by id.
#[derive(Clone, Debug, Default)]
pub struct DebugInfo {
    nodes: FxHashMap<u32, Node>,
}

impl DebugInfo {
    /// Record a metadata line if it is a specialized node; other lines are ignored.
    pub fn add_line(&mut self, line: &str) {
        let node_re = NODE_PATTERN.get_or_init(|| {
            Regex::new(r"^!(\d+)\s*=\s*(?:distinct\s+)?!(\w+)\((.*)\)\s*$").unwrap()
        });
        let field_re = FIELD_PATTERN.get_or_init(|| {
            Regex::new(r#"(\w+):\s*("(?:[^"\\]|\\.)*"|![0-9]+|[^,]+)"#).unwrap()
        });
        let Some(caps) = node_re.captures(line) else {
            return;
        };
        let Ok(id) = caps[1].parse::<u32>() else {
            return;
        };
        let fields = field_re
            .captures_iter(&caps[3])
            .map(|f| {
                let value = f[2].trim();
                let value = value
                    .strip_prefix('"')
                    .and_then(|v| v.strip_suffix('"'))
                    .unwrap_or(value);
                (f[1].to_string(), value.to_string())
            })
            .collect();
        self.nodes.insert(
            id,
            Node {
                kind: caps[2].to_string(),
                fields,
            },
        );
    }

    /// Number of nodes recorded.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Resolve a `DILocation` id to `(file, line)`.
    pub fn location(&self, id: u32) -> Option<(String, u32)> {
        let node = self.nodes.get(&id)?;
        if node.kind != "DILocation" {
            return None;
        }
        let line = node.field("line").and_then(|l| l.parse().ok()).unwrap_or(0);
        let file = node
            .node_ref("scope")
            .and_then(|scope| self.file_of(scope))
            .unwrap_or_default();
        Some((file, line))
    }

    /// Walk a scope chain to the file it belongs to.
    pub fn file_of(&self, mut id: u32) -> Option<String> {
        for _ in 0..MAX_SCOPE_DEPTH {
            let node = self.nodes.get(&id)?;
            if node.kind == "DIFile" {
                return node.field("filename").map(str::to_string);
            }
            id = node.node_ref("file").or_else(|| node.node_ref("scope"))?;
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DebugInfo {
        let mut info = DebugInfo::default();
        for line in [
            r#"!1 = !DIFile(filename: "board.c", directory: "/src")"#,
            r#"!7 = distinct !DISubprogram(name: "BOARD_ConfigMPU", scope: !1, file: !1, line: 40, type: !8, unit: !0)"#,
            "!9 = distinct !DILexicalBlock(scope: !7, file: !1, line: 44, column: 5)",
            "!20 = !DILocation(line: 45, column: 9, scope: !9)",
            "!21 = !{i32 7, !\"Dwarf Version\", i32 5}",
        ] {
            info.add_line(line);
        }
        info
    }

    #[test]
    fn test_location_through_lexical_block() {
        let info = sample();
        assert_eq!(info.location(20), Some(("board.c".to_string(), 45)));
    }

    #[test]
    fn test_non_location_ids() {
        let info = sample();
        assert_eq!(info.len(), 4);
        assert_eq!(info.location(7), None);
        assert_eq!(info.location(99), None);
    }
}
