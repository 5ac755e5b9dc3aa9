//! Path template parsing.

use crate::error::CompileError;

/// Extract placeholder names from a path template such as
/// `/posts/{post_id}/comments/{comment_id}`.
///
/// Names are returned left to right in order of first appearance. A name used
/// twice is reported once; every occurrence of its token is substituted with
/// the same value.
///
/// Rejects:
/// - unmatched or unclosed braces
/// - nested braces
/// - empty names
/// - characters other than alphanumerics and `_` inside a name
pub fn extract_path_params(path: &str) -> Result<Vec<String>, CompileError> {
    let mut names: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            '{' => {
                if in_param {
                    return Err(CompileError::InvalidPathTemplate(format!(
                        "{} - nested braces not allowed",
                        path
                    )));
                }
                in_param = true;
            }
            '}' => {
                if !in_param {
                    return Err(CompileError::InvalidPathTemplate(format!(
                        "{} - unmatched closing brace",
                        path
                    )));
                }
                in_param = false;

                if current.is_empty() {
                    return Err(CompileError::InvalidPathTemplate(format!(
                        "{} - empty parameter name",
                        path
                    )));
                }
                if !names.contains(&current) {
                    names.push(current.clone());
                }
                current.clear();
            }
            _ if in_param => {
                if !ch.is_alphanumeric() && ch != '_' {
                    return Err(CompileError::InvalidPathTemplate(format!(
                        "{} - invalid character '{}' in parameter name",
                        path, ch
                    )));
                }
                current.push(ch);
            }
            _ => {}
        }
    }

    if in_param {
        return Err(CompileError::InvalidPathTemplate(format!(
            "{} - unclosed brace",
            path
        )));
    }

    Ok(names)
}

/// Normalize a path template for structural comparison.
///
/// Replaces parameter names with a placeholder: /users/{id} -> /users/{_}
pub fn normalize_path_template(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    let mut in_param = false;

    for ch in path.chars() {
        match ch {
            '{' => {
                result.push_str("{_");
                in_param = true;
            }
            '}' => {
                result.push('}');
                in_param = false;
            }
            _ if in_param => {}
            _ => result.push(ch),
        }
    }

    result
}
