//! Text repair for near-JSON model output
//!
//! One left-to-right scan tracks whether the cursor is inside a string and
//! whether a backslash escape is pending. Outside strings, typographic
//! punctuation is folded to its ASCII structural form and invisible or
//! control characters are dropped. Inside strings, content is kept as-is
//! except for raw control characters, which would make the literal invalid.

/// Which character opened the current string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Delimiter {
    Ascii,
    Typographic,
}

/// Repair provider text so a JSON decoder has a chance at it
///
/// Applying this twice gives the same result as applying it once. Valid JSON
/// without code fences comes back unchanged apart from surrounding
/// whitespace.
///
/// The character scan runs before fence stripping so that full-width or
/// zero-width noise around a fence does not hide it; the scan never touches
/// backticks, so the order does not change which fences are found.
pub fn sanitize(text: &str) -> String {
    let scanned = scan(text);
    strip_fences(&scanned).to_owned()
}

fn scan(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut string: Option<Delimiter> = None;
    let mut escaped = false;

    for c in text.chars() {
        let Some(delimiter) = string else {
            if is_invisible(c) || (is_control(c) && !matches!(c, '\n' | '\r' | '\t')) {
                continue;
            }

            match c {
                '"' => {
                    string = Some(Delimiter::Ascii);
                    out.push('"');
                }
                c if is_typographic_double(c) => {
                    string = Some(Delimiter::Typographic);
                    out.push('"');
                }
                '\u{2018}' | '\u{2019}' => out.push('\''),
                c => out.push(fold_full_width(c)),
            }
            continue;
        };

        if escaped {
            match c {
                '\n' => out.push('n'),
                '\r' => out.push('r'),
                '\t' => out.push('t'),
                // Keep the escape pending for whatever follows
                c if is_c0(c) => continue,
                c => out.push(c),
            }
            escaped = false;
            continue;
        }

        match c {
            '\\' => {
                escaped = true;
                out.push('\\');
            }
            '"' => {
                string = None;
                out.push('"');
            }
            c if delimiter == Delimiter::Typographic && is_typographic_double(c) => {
                string = None;
                out.push('"');
            }
            '\n' | '\r' | '\t' => out.push(' '),
            c if is_c0(c) => {}
            c => out.push(c),
        }
    }

    out
}

/// Remove markdown fence markers around the payload
fn strip_fences(text: &str) -> &str {
    let mut text = text.trim();

    loop {
        let before = text.len();

        if let Some(rest) = text.strip_prefix("```") {
            // Drop the language tag as well, e.g. ```json
            text = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric()).trim();
        }
        if let Some(rest) = text.strip_suffix("```") {
            text = rest.trim();
        }

        if text.len() == before {
            return text;
        }
    }
}

fn is_typographic_double(c: char) -> bool {
    matches!(c, '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{FF02}')
}

fn fold_full_width(c: char) -> char {
    match c {
        '\u{FF1A}' => ':',
        '\u{FF0C}' => ',',
        '\u{FF5B}' => '{',
        '\u{FF5D}' => '}',
        '\u{FF3B}' => '[',
        '\u{FF3D}' => ']',
        c => c,
    }
}

/// Zero-width characters and the byte-order mark
fn is_invisible(c: char) -> bool {
    matches!(c, '\u{200B}' | '\u{200C}' | '\u{200D}' | '\u{2060}' | '\u{FEFF}')
}

fn is_c0(c: char) -> bool {
    c < '\u{20}'
}

fn is_control(c: char) -> bool {
    is_c0(c) || c == '\u{7F}'
}
