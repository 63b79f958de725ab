// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-pass `{key}` template substitution for formattable task fields.

use crate::error::Fault;
use indexmap::IndexMap;

/// Replace `{key}` placeholders with values from `vars`.
///
/// `{{` and `}}` escape literal braces. An unresolved placeholder is a user
/// fault: callers template per-task log paths and a silently-kept `{name}`
/// would leak into the filesystem.
pub fn interpolate(template: &str, vars: &IndexMap<String, String>) -> Result<String, Fault> {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' => {
                if chars.peek() == Some(&'{') {
                    chars.next();
                    out.push('{');
                    continue;
                }
                let mut key = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(c) => key.push(c),
                        None => {
                            return Err(Fault::user(format!(
                                "unterminated placeholder in template: \"{}\"",
                                template
                            )))
                        }
                    }
                }
                match vars.get(&key) {
                    Some(value) => out.push_str(value),
                    None => {
                        return Err(Fault::user(format!(
                            "unresolved placeholder {{{}}} in template: \"{}\"",
                            key, template
                        )))
                    }
                }
            }
            '}' => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                    out.push('}');
                } else {
                    return Err(Fault::user(format!(
                        "single '}}' encountered in template: \"{}\"",
                        template
                    )));
                }
            }
            c => out.push(c),
        }
    }

    Ok(out)
}

#[cfg(test)]
#[path = "interpolate_tests.rs"]
mod tests;
