use crate::config::ReplacementRule;

/// Extensions whose content goes through the rewriter.
const REWRITABLE: &[&str] = &["html", "htm", "css", "js", "mjs"];

pub fn is_rewritable(path: &str) -> bool {
    extension(path)
        .map(|ext| REWRITABLE.contains(&ext.as_str()))
        .unwrap_or(false)
}

pub(crate) fn extension(path: &str) -> Option<String> {
    let file = path.rsplit('/').next()?;
    let (_, ext) = file.rsplit_once('.')?;
    Some(ext.to_ascii_lowercase())
}

/// Literal substitutions applied to served text assets.
///
/// Rules run one after another over the progressively rewritten text, so a
/// later rule sees the output of the earlier ones.
#[derive(Debug, Clone, Default)]
pub struct ContentRewriter {
    rules: Vec<ReplacementRule>,
}

impl ContentRewriter {
    pub fn new(rules: Vec<ReplacementRule>) -> Self {
        let rules = rules
            .into_iter()
            .filter(|rule| {
                if rule.from.is_empty() {
                    tracing::warn!(to = %rule.to, "ignoring replacement rule with empty pattern");
                }
                !rule.from.is_empty()
            })
            .collect();
        Self { rules }
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn apply(&self, content: &str) -> String {
        let mut out = content.to_string();
        for rule in &self.rules {
            if out.contains(&rule.from) {
                out = out.replace(&rule.from, &rule.to);
            }
        }
        out
    }
}
