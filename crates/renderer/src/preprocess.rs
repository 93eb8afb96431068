//! Minimal `#include <name>` expansion for GLSL sources.
//!
//! A directive must start its line (optionally indented with spaces or tabs)
//! and names a fragment in the caller's [`IncludeMap`]. The directive text is
//! replaced by the fragment wrapped in `// #include-start<name>` /
//! `// #include-end<name>` marker comments; everything else, including text
//! after the closing `>`, is copied through untouched.

use std::borrow::Cow;
use std::collections::HashMap;

use crate::error::PreprocessError;

/// Include name to GLSL fragment.
pub type IncludeMap = HashMap<String, String>;

/// How far expanded fragments are re-scanned for further directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeDepth {
    /// Expand directives in the top-level source only.
    #[default]
    SinglePass,
    /// Re-scan fragments, allowing at most this many levels of includes
    /// (top-level directives count as level one).
    Nested(usize),
}

struct Directive<'a> {
    name: &'a str,
    rest: &'a str,
}

/// Single-pass expansion of every line-leading `#include` in `source`.
pub fn expand_includes(source: &str, includes: &IncludeMap) -> Result<String, PreprocessError> {
    expand_includes_with(source, includes, IncludeDepth::SinglePass)
}

/// Expansion with an explicit [`IncludeDepth`].
pub fn expand_includes_with(
    source: &str,
    includes: &IncludeMap,
    depth: IncludeDepth,
) -> Result<String, PreprocessError> {
    let mut active = Vec::new();
    expand_level(source, includes, depth, &mut active)
}

fn expand_level(
    source: &str,
    includes: &IncludeMap,
    depth: IncludeDepth,
    active: &mut Vec<String>,
) -> Result<String, PreprocessError> {
    let mut output = String::with_capacity(source.len());
    for line in source.split_inclusive('\n') {
        let Some(directive) = parse_directive(line) else {
            output.push_str(line);
            continue;
        };

        let name = directive.name;
        let fragment = includes
            .get(name)
            .ok_or_else(|| PreprocessError::UnresolvedInclude {
                name: name.to_string(),
            })?;

        let body = match depth {
            IncludeDepth::SinglePass => Cow::Borrowed(fragment.as_str()),
            IncludeDepth::Nested(max) => {
                if active.iter().any(|entry| entry == name) {
                    let mut chain = active.clone();
                    chain.push(name.to_string());
                    return Err(PreprocessError::IncludeCycle { chain });
                }
                if active.len() >= max {
                    return Err(PreprocessError::IncludeDepthExceeded {
                        name: name.to_string(),
                        max,
                    });
                }
                active.push(name.to_string());
                let expanded = expand_level(fragment, includes, depth, active)?;
                active.pop();
                Cow::Owned(expanded)
            }
        };

        tracing::trace!(include = name, bytes = body.len(), "expanded #include");
        output.push('\n');
        output.push_str("// #include-start<");
        output.push_str(name);
        output.push_str(">\n");
        output.push_str(&body);
        output.push('\n');
        output.push_str("// #include-end<");
        output.push_str(name);
        output.push_str(">\n");
        output.push_str(directive.rest);
    }
    Ok(output)
}

fn parse_directive(line: &str) -> Option<Directive<'_>> {
    let rest = line.trim_start_matches([' ', '\t']);
    let rest = rest.strip_prefix("#include")?;
    let after_keyword = rest.trim_start_matches([' ', '\t']);
    if after_keyword.len() == rest.len() {
        return None;
    }
    let rest = after_keyword.strip_prefix('<')?;
    let name_len = rest
        .find(|ch: char| !is_include_name_char(ch))
        .unwrap_or(rest.len());
    if name_len == 0 {
        return None;
    }
    let (name, tail) = rest.split_at(name_len);
    let tail = tail.strip_prefix('>')?;
    Some(Directive { name, rest: tail })
}

fn is_include_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '_' | '.' | '/')
}
