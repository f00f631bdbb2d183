//! Script list syntax
//!
//! Rank-1 arrays travel as script lists: whitespace-separated elements,
//! grouped with `{}` or `"` when they contain whitespace.

/// Split a script list into its elements
pub fn split_list(text: &str) -> Result<Vec<String>, String> {
    let chars: Vec<char> = text.chars().collect();
    let mut items = Vec::new();
    let mut i = 0;

    loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if i >= chars.len() {
            break;
        }

        match chars[i] {
            '{' => {
                let start = i + 1;
                let mut depth = 1;
                i += 1;
                while i < chars.len() && depth > 0 {
                    match chars[i] {
                        '\\' => i += 1,
                        '{' => depth += 1,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    i += 1;
                }
                if depth > 0 {
                    return Err("unmatched open brace in list".to_string());
                }
                items.push(chars[start..i - 1].iter().collect());
                if i < chars.len() && !chars[i].is_whitespace() {
                    return Err("list element in braces followed by garbage".to_string());
                }
            }
            '"' => {
                let mut item = String::new();
                i += 1;
                let mut closed = false;
                while i < chars.len() {
                    match chars[i] {
                        '\\' if i + 1 < chars.len() => {
                            item.push(unescape(chars[i + 1]));
                            i += 2;
                        }
                        '"' => {
                            closed = true;
                            i += 1;
                            break;
                        }
                        c => {
                            item.push(c);
                            i += 1;
                        }
                    }
                }
                if !closed {
                    return Err("unmatched open quote in list".to_string());
                }
                if i < chars.len() && !chars[i].is_whitespace() {
                    return Err("list element in quotes followed by garbage".to_string());
                }
                items.push(item);
            }
            _ => {
                let mut item = String::new();
                while i < chars.len() && !chars[i].is_whitespace() {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        item.push(unescape(chars[i + 1]));
                        i += 2;
                    } else {
                        item.push(chars[i]);
                        i += 1;
                    }
                }
                items.push(item);
            }
        }
    }

    Ok(items)
}

fn unescape(c: char) -> char {
    match c {
        'n' => '\n',
        't' => '\t',
        'r' => '\r',
        other => other,
    }
}

/// Quote a single element so [`split_list`] yields it back unchanged
pub fn quote_element(item: &str) -> String {
    if item.is_empty() {
        return "{}".to_string();
    }
    let needs_quoting = item
        .chars()
        .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\\'));
    if !needs_quoting {
        return item.to_string();
    }
    if braces_balanced(item) && !item.ends_with('\\') {
        return format!("{{{}}}", item);
    }
    let mut out = String::with_capacity(item.len() + 4);
    for c in item.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            c if c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\\') => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out
}

/// Join elements into a script list
pub fn format_list<I, S>(items: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| quote_element(s.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}

fn braces_balanced(s: &str) -> bool {
    let mut depth = 0i32;
    let mut escaped = false;
    for c in s.chars() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth < 0 {
                    return false;
                }
            }
            _ => {}
        }
    }
    depth == 0
}
