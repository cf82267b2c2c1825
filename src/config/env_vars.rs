use std::env;

/// Expand environment references in a configured path.
///
/// Handles Windows `%VAR%` as well as Unix `$VAR` and `${VAR}` references.
/// Unknown variables are left in place so the failure shows up when the
/// path is used rather than as a silently truncated path.
pub fn expand_env_vars(value: &str) -> String {
    let expanded = expand_windows_style(value);
    expand_unix_style(&expanded)
}

fn expand_windows_style(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut rest = value;

    while let Some(start) = rest.find('%') {
        result.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        match after.find('%') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match env::var(name) {
                    Ok(val) => result.push_str(&val),
                    Err(_) => {
                        result.push('%');
                        result.push_str(name);
                        result.push('%');
                    }
                }
                rest = &after[end + 1..];
            }
            _ => {
                result.push('%');
                rest = after;
            }
        }
    }
    result.push_str(rest);
    result
}

fn expand_unix_style(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut chars = value.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '$' {
            result.push(ch);
            continue;
        }

        // ${VAR}
        if let Some(&(_, '{')) = chars.peek() {
            let tail = &value[idx + 2..];
            if let Some(close) = tail.find('}') {
                let name = &tail[..close];
                match env::var(name) {
                    Ok(val) => result.push_str(&val),
                    Err(_) => result.push_str(&value[idx..idx + 3 + close]),
                }
                // skip '{', the name and '}'
                for _ in 0..name.chars().count() + 2 {
                    chars.next();
                }
                continue;
            }
            result.push(ch);
            continue;
        }

        // $VAR
        let mut name = String::new();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                name.push(c);
                chars.next();
            } else {
                break;
            }
        }

        if name.is_empty() {
            result.push('$');
        } else {
            match env::var(&name) {
                Ok(val) => result.push_str(&val),
                Err(_) => {
                    result.push('$');
                    result.push_str(&name);
                }
            }
        }
    }

    result
}
