//! Schema checks applied to every registry element before it is interpreted.
use std::collections::BTreeMap;

use super::dom::Element;
use crate::error::{self, Result};
use crate::text::tokenize;

/// Attribute name and the values it may take. An empty value list accepts anything.
pub type AttributeSpec<'s> = (&'s str, &'s [&'s str]);

/// Missing required attributes and disallowed values are fatal, unknown attributes only warn.
pub fn check_attributes(
    element: &Element,
    required: &[AttributeSpec],
    optional: &[AttributeSpec],
) -> Result<()> {
    let line = element.line;
    for &(name, allowed) in required {
        let value = element.attribute(name);
        check!(value.is_some(), line, "missing attribute <{}> in element <{}>", name, element.name);
        if let Some(value) = value {
            check_values(line, name, value, allowed)?;
        }
    }

    for (name, value) in &element.attributes {
        if required.iter().any(|&(r, _)| r == name.as_str()) {
            continue;
        }
        match optional.iter().find(|&&(o, _)| o == name.as_str()) {
            Some(&(_, allowed)) => check_values(line, name, value, allowed)?,
            None => error::warn(line, format_args!("unknown attribute <{}> in element <{}>", name, element.name)),
        }
    }
    Ok(())
}

fn check_values(line: u64, name: &str, value: &str, allowed: &[&str]) -> Result<()> {
    if !allowed.is_empty() {
        for token in tokenize(value, ',') {
            check!(allowed.contains(&token.as_str()), line,
                   "unexpected attribute value <{}> in attribute <{}>", token, name);
        }
    }
    Ok(())
}

/// `required` maps an element name to whether it has to appear exactly once.
/// Children named in neither list only produce a warning.
pub fn check_elements(element: &Element, required: &[(&str, bool)], optional: &[&str]) -> Result<()> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for child in element.elements() {
        *counts.entry(child.name.as_str()).or_insert(0) += 1;
        if !required.iter().any(|&(r, _)| r == child.name) && !optional.contains(&child.name.as_str()) {
            error::warn(child.line, format_args!("unknown element <{}> in element <{}>", child.name, element.name));
        }
    }

    for &(name, exactly_once) in required {
        let count = counts.get(name).copied().unwrap_or(0);
        check!(count > 0, element.line, "missing required element <{}> in element <{}>", name, element.name);
        check!(!exactly_once || count == 1, element.line,
               "required element <{}> is supposed to be listed exactly once, but is listed {} times", name, count);
    }
    Ok(())
}
