use crate::arena::{NodeHandle, NodeKind};
use crate::dom::LiveDom;
use std::fmt::Write;

const INDENT_STEP: &str = "  ";
const PREVIEW_CHARS: usize = 40;

fn first_styles(style: &[(String, String)]) -> String {
    let mut out = String::new();
    for (i, (k, v)) in style.iter().take(3).enumerate() {
        if i != 0 {
            out.push(' ');
        }
        let _ = write!(&mut out, "{k}: {v};");
    }
    out
}

fn push_preview(out: &mut String, s: &str, max_chars: usize) {
    for (i, ch) in s.chars().enumerate() {
        if i == max_chars {
            out.push('…');
            break;
        }
        out.push(if ch == '\n' { ' ' } else { ch });
    }
}

impl LiveDom {
    /// One line per node, indented by depth, for at most `cap` nodes.
    ///
    /// Whitespace-only text nodes are skipped; focus is marked with `*`.
    pub fn outline(&self, cap: usize) -> Vec<String> {
        let mut out = Vec::new();
        let mut left = cap;
        self.outline_walk(self.root(), 0, &mut out, &mut left);
        out
    }

    fn outline_walk(&self, handle: NodeHandle, depth: usize, out: &mut Vec<String>, left: &mut usize) {
        if *left == 0 {
            return;
        }
        let Some(record) = self.node(handle) else {
            return;
        };
        *left -= 1;

        let mut line = INDENT_STEP.repeat(depth);
        match record.kind() {
            NodeKind::Text { text } => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return;
                }
                line.push('"');
                push_preview(&mut line, trimmed, PREVIEW_CHARS);
                line.push('"');
            }
            NodeKind::Element(data) => {
                line.push('<');
                line.push_str(data.tag());
                if let Some(id) = record.id() {
                    let _ = write!(&mut line, r#" id="{id}""#);
                }
                if !data.classes().is_empty() {
                    let _ = write!(&mut line, r#" class="{}""#, data.classes().join(" "));
                }
                line.push('>');
                let styles = first_styles(data.styles());
                if !styles.is_empty() {
                    let _ = write!(&mut line, "  /* {styles} */");
                }
            }
        }
        if self.focused() == Some(handle) {
            line.push_str(" *");
        }
        out.push(line);

        for child in record.children() {
            self.outline_walk(*child, depth + 1, out, left);
        }
    }
}
