//! String helpers used while reading the registry and while rendering C++ names.
use std::collections::BTreeSet;

/// `SAMPLE_COUNT_16_BIT` -> `SampleCount16Bit`. Characters right after an underscore or a digit
/// keep their case, everything else is lowered.
pub fn to_camel_case(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    let mut previous: Option<char> = None;
    for c in value.chars() {
        if c != '_' {
            match previous {
                None | Some('_') => result.push(c),
                Some(p) if p.is_ascii_digit() => result.push(c),
                Some(_) => result.push(c.to_ascii_lowercase()),
            }
        }
        previous = Some(c);
    }
    result
}

/// `VkPhysicalDevice16BitStorage` -> `VK_PHYSICAL_DEVICE_16_BIT_STORAGE`
pub fn to_upper_case(name: &str) -> String {
    let mut result = String::with_capacity(name.len() + 8);
    let mut previous: Option<char> = None;
    for c in name.chars() {
        if let Some(p) = previous {
            let lower_before = p.is_ascii_lowercase();
            if (c.is_ascii_uppercase() && (lower_before || p.is_ascii_digit()))
                || (c.is_ascii_digit() && lower_before)
            {
                result.push('_');
            }
        }
        result.push(c.to_ascii_uppercase());
        previous = Some(c);
    }
    result
}

pub fn start_lower_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_ascii_lowercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn start_upper_case(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    }
}

pub fn strip_prefix<'a>(value: &'a str, prefix: &str) -> &'a str {
    value.strip_prefix(prefix).unwrap_or(value)
}

pub fn strip_postfix<'a>(value: &'a str, postfix: &str) -> &'a str {
    value.strip_suffix(postfix).unwrap_or(value)
}

/// Splits on `separator`, dropping empty tokens.
pub fn tokenize(value: &str, separator: char) -> Vec<String> {
    value.split(separator)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// Removes whitespace in front of every `*`, so `* const *` becomes `* const*`.
pub fn trim_stars(value: &str) -> String {
    let mut result = String::with_capacity(value.len());
    for c in value.trim().chars() {
        if c == '*' {
            let trimmed = result.trim_end().len();
            result.truncate(trimmed);
        }
        result.push(c);
    }
    result
}

/// The first tag such that `name` ends with `tag + postfix`.
pub fn find_tag<'t>(tags: &'t BTreeSet<String>, name: &str, postfix: &str) -> Option<&'t str> {
    tags.iter()
        .find(|tag| name.ends_with(&format!("{}{}", tag, postfix)))
        .map(String::as_str)
}

/// `VK_KHR_surface` -> `KHR`
pub fn extract_tag(name: &str) -> Option<&str> {
    let mut parts = name.splitn(3, '_');
    parts.next()?;
    let tag = parts.next()?;
    parts.next().map(|_| tag)
}

/// Drops the leading `p` of a pointer parameter name: `pCreateInfo` -> `createInfo`,
/// `ppData` -> `pData`. Names that merely start with a `p` are left alone.
pub fn reduce_name(name: &str) -> String {
    let mut chars = name.chars();
    match (chars.next(), chars.next()) {
        (Some('p'), Some(second)) if second.is_ascii_uppercase() || second == 'p' => {
            start_lower_case(&name[1..])
        }
        _ => name.to_owned(),
    }
}

/// `createGraphicsPipelines` -> `createGraphicsPipeline`, keeping a trailing vendor tag in place.
pub fn singular(name: &str, tags: &BTreeSet<String>) -> String {
    let tag = find_tag(tags, name, "").unwrap_or("");
    let base = strip_postfix(name, tag);
    format!("{}{}", strip_postfix(base, "s"), tag)
}

/// Replaces every `${key}` in `template` with its value from `replacements`.
///
/// A placeholder without a replacement is a bug in the generator itself and panics.
pub fn replace_with_map(template: &str, replacements: &[(&str, &str)]) -> String {
    let mut result = String::with_capacity(template.len() * 2);
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}')
            .unwrap_or_else(|| panic!("unterminated placeholder in template: {:?}", &rest[start..]));
        let key = &after[..end];
        let value = replacements.iter()
            .find(|&&(k, _)| k == key)
            .map(|&(_, v)| v)
            .unwrap_or_else(|| panic!("no replacement given for template key <{}>", key));
        result.push_str(value);
        rest = &after[end + 1..];
    }
    result.push_str(rest);
    result
}
