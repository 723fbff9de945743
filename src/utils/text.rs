/// Collapse runs of whitespace (including non-breaking spaces) into one space and trim.
pub fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

/// Lookup key for a table header: unit suffix dropped, whitespace removed,
/// unicode subscripts folded to ASCII, lowercased. `"O₃ max [µg/m³]"` becomes `"o3max"`.
pub fn header_key(raw: &str) -> String {
    let base = raw.split(|c| c == '[' || c == '(').next().unwrap_or(raw);
    base.chars()
        .filter(|c| !c.is_whitespace())
        .map(fold_subscript)
        .flat_map(char::to_lowercase)
        .collect()
}

fn fold_subscript(c: char) -> char {
    match c {
        '₀'..='₉' => char::from_digit(c as u32 - '₀' as u32, 10).unwrap_or(c),
        'ₓ' => 'x',
        _ => c,
    }
}

/// Lowercase ASCII identifier for a location name, e.g. `"Zürich-Kaserne"` -> `"zuerich-kaserne"`.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut last_dash = true;
    for ch in name.chars() {
        let mapped: &str = match ch {
            'ä' | 'Ä' => "ae",
            'ö' | 'Ö' => "oe",
            'ü' | 'Ü' => "ue",
            'é' | 'è' | 'ê' | 'É' | 'È' => "e",
            'à' | 'â' | 'À' => "a",
            'ô' => "o",
            'î' | 'ï' => "i",
            'ç' => "c",
            _ => "",
        };
        if !mapped.is_empty() {
            out.push_str(mapped);
            last_dash = false;
        } else if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            out.push('-');
            last_dash = true;
        }
    }
    out.trim_end_matches('-').to_string()
}
