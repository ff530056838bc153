//! Locating the JSON object inside sanitized model output

/// Substring from the first `{` to the last `}`
///
/// Returns `None` when either brace is missing or the last `}` does not come
/// after the first `{`.
pub fn object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;

    (end > start).then(|| &text[start..=end])
}

/// Extract the outermost object and drop trailing commas inside it
pub fn extract(text: &str) -> Option<String> {
    object_span(text).map(remove_trailing_commas)
}

/// Remove commas that directly precede a closing `}` or `]`
///
/// Whitespace between the comma and the bracket is kept. Commas inside string
/// literals are never touched.
pub fn remove_trailing_commas(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in json.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            out.push(c);
            continue;
        }

        match c {
            '"' => in_string = true,
            ',' if closes_next(&json[i + 1..]) => continue,
            _ => {}
        }
        out.push(c);
    }

    out
}

fn closes_next(rest: &str) -> bool {
    matches!(rest.trim_start().chars().next(), Some('}' | ']'))
}

/// Top-level `{ ... }` spans balanced by depth, left to right
///
/// String literals are only tracked inside an object, so stray quotes in
/// surrounding prose do not hide the object that follows.
pub fn balanced_objects(text: &str) -> Vec<&str> {
    let mut objects = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut in_string = false;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' if depth > 0 => in_string = true,
            '{' => {
                if depth == 0 {
                    start = i;
                }
                depth += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    objects.push(&text[start..=i]);
                }
            }
            _ => {}
        }
    }

    objects
}
