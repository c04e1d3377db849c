//! Casing helpers used as the default name transforms.

/// `comment_patches` / `comment-patches` / `comment patches` → `commentPatches`.
pub fn camelize(input: &str) -> String {
    if is_numeric(input) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len());
    let mut upper_next = false;
    for ch in input.chars() {
        if ch == '-' || ch == '_' || ch.is_whitespace() {
            upper_next = true;
        } else if upper_next {
            out.extend(ch.to_uppercase());
            upper_next = false;
        } else {
            out.push(ch);
        }
    }
    lower_first(&out)
}

/// `commentPatches` → `CommentPatches`.
pub fn pascalize(input: &str) -> String {
    let camel = camelize(input);
    let mut chars = camel.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => camel,
    }
}

/// `commentPatches` → `comment_patches`.
pub fn decamelize(input: &str) -> String {
    if is_numeric(input) {
        return input.to_string();
    }
    let mut out = String::with_capacity(input.len() + 4);
    for (i, ch) in input.chars().enumerate() {
        if ch.is_uppercase() && i > 0 {
            out.push('_');
        }
        out.extend(ch.to_lowercase());
    }
    out
}

fn lower_first(input: &str) -> String {
    let mut chars = input.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn is_numeric(input: &str) -> bool {
    !input.is_empty() && input.parse::<f64>().is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_transforms() {
        assert_eq!(pascalize("commentPatches"), "CommentPatches");
        assert_eq!(decamelize("commentPatches"), "comment_patches");
        assert_eq!(pascalize("post_patches"), "PostPatches");
        assert_eq!(decamelize("PostPatches"), "post_patches");
    }

    #[test]
    fn test_camelize_separators() {
        assert_eq!(camelize("comment-patches"), "commentPatches");
        assert_eq!(camelize("Comment patches"), "commentPatches");
        assert_eq!(camelize("a__b"), "aB");
    }

    #[test]
    fn test_numbers_pass_through() {
        assert_eq!(camelize("42"), "42");
        assert_eq!(decamelize("42"), "42");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(pascalize(""), "");
        assert_eq!(decamelize(""), "");
    }
}
