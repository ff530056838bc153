use std::sync::LazyLock;

use regex::{Captures, Regex};

/// `{{ env.NAME }}` or `{{ env.NAME | default("value") }}`
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{\{\s*([A-Za-z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#)
        .expect("placeholder pattern is valid")
});

/// Substitute environment placeholders in raw config text
///
/// Runs before TOML parsing, so config structs hold plain values. Comment
/// lines are copied untouched, which lets a commented-out key reference a
/// variable that is not set.
pub fn expand_env(input: &str) -> Result<String, String> {
    let mut expanded = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            expanded.push(line.to_owned());
        } else {
            expanded.push(expand_line(line)?);
        }
    }

    Ok(expanded.join("\n"))
}

fn expand_line(line: &str) -> Result<String, String> {
    let mut out = String::with_capacity(line.len());
    let mut cursor = 0;

    for captures in PLACEHOLDER.captures_iter(line) {
        let Some(whole) = captures.get(0) else {
            continue;
        };

        out.push_str(&line[cursor..whole.start()]);
        out.push_str(&resolve(&captures)?);
        cursor = whole.end();
    }

    out.push_str(&line[cursor..]);
    Ok(out)
}

fn resolve(captures: &Captures<'_>) -> Result<String, String> {
    let key = captures.get(1).map_or("", |m| m.as_str());
    let fallback = captures.get(2).map(|m| m.as_str());

    let Some(name) = key.strip_prefix("env.").filter(|name| !name.is_empty() && !name.contains('.')) else {
        return Err(format!("unsupported placeholder `{key}`, expected `env.NAME`"));
    };

    match (std::env::var(name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(fallback)) => Ok(fallback.to_owned()),
        (Err(_), None) => Err(format!("environment variable `{name}` is not set")),
    }
}
