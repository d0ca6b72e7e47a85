//! Line renderers over the assembled record IR.
use crate::error::Result;
use crate::ir::{Assembly, FieldSpec, RecordDefinition};

pub trait Renderer {
    fn render(&self, assembly: &Assembly) -> Result<Vec<String>>;
}

// ————————————————————————————————————————————————————————————————————————————
// MARKUP
// ————————————————————————————————————————————————————————————————————————————

/// `<js:object>` / `<js:value>` blocks, one record per block, root last.
///
/// Attribute values are written as-is unless `escape` is set; names with
/// markup-significant characters otherwise produce broken markup.
#[derive(Debug, Clone)]
pub struct MarkupRenderer {
    pub indent: String,
    pub escape: bool,
}

impl Default for MarkupRenderer {
    fn default() -> Self {
        Self { indent: "\t".to_string(), escape: false }
    }
}

impl MarkupRenderer {
    fn block(&self, out: &mut Vec<String>, def: &RecordDefinition) {
        out.push(format!(r#"<js:object id="{}">"#, self.attr(&def.name)));
        for field in &def.fields {
            out.push(format!("{}{}", self.indent, self.declaration(field)));
        }
        out.push("</js:object>".to_string());
    }

    fn declaration(&self, field: &FieldSpec) -> String {
        let qualifier = if field.list { r#" qualifier="list""# } else { "" };
        format!(
            r#"<js:value name="{}" type="{}"{qualifier} />"#,
            self.attr(&field.name),
            self.attr(field.kind.type_name()),
        )
    }

    fn attr(&self, raw: &str) -> String {
        if self.escape { escape_attr(raw) } else { raw.to_string() }
    }
}

impl Renderer for MarkupRenderer {
    fn render(&self, assembly: &Assembly) -> Result<Vec<String>> {
        let mut out = Vec::new();
        for def in &assembly.records {
            self.block(&mut out, def);
        }
        self.block(&mut out, &assembly.root);
        Ok(out)
    }
}

fn escape_attr(raw: &str) -> String {
    let mut s = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => s.push_str("&amp;"),
            '<' => s.push_str("&lt;"),
            '>' => s.push_str("&gt;"),
            '"' => s.push_str("&quot;"),
            '\'' => s.push_str("&apos;"),
            c => s.push(c),
        }
    }
    s
}

// ————————————————————————————————————————————————————————————————————————————
// JSON
// ————————————————————————————————————————————————————————————————————————————

/// The assembly itself, as JSON.
#[derive(Debug, Clone, Default)]
pub struct JsonRenderer {
    pub pretty: bool,
}

impl Renderer for JsonRenderer {
    fn render(&self, assembly: &Assembly) -> Result<Vec<String>> {
        let src = if self.pretty {
            serde_json::to_string_pretty(assembly)?
        } else {
            serde_json::to_string(assembly)?
        };
        Ok(src.lines().map(str::to_string).collect())
    }
}
