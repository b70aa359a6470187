//! Closed-world checks over a fully read registry. Every dangling reference is reported with the
//! line of the element that made it.
use super::{Registry, RESULT_ENUM};
use crate::error::Result;

impl Registry {
    pub fn check_correctness(&self) -> Result<()> {
        log::info!("checking registry correctness");
        check!(!self.header_version.is_empty(), 1, "missing define <VK_HEADER_VERSION>");
        check!(!self.typesafe_check.is_empty(), 1, "missing typesafe check in <VK_DEFINE_NON_DISPATCHABLE_HANDLE>");

        let result = self.enums.get(RESULT_ENUM);
        check!(result.is_some(), 1, "missing enum <{}>", RESULT_ENUM);
        let is_result_code = |code: &String| {
            result.map_or(false, |r| {
                r.values.iter().any(|v| &v.vk_value == code) || r.aliases.iter().any(|a| &a.vk_value == code)
            })
        };

        for (name, base) in &self.base_types {
            check!(base.type_name.is_empty() || self.types.contains_key(&base.type_name), base.line,
                   "base type <{}> refers to unknown type <{}>", name, base.type_name);
        }

        for (name, bitmask) in &self.bitmasks {
            if let Some(ref requirements) = bitmask.requirements {
                check!(self.enums.contains_key(self.resolve_type(requirements)), bitmask.line,
                       "bitmask <{}> requires unknown enum <{}>", name, requirements);
            }
        }

        for (name, extension) in &self.extensions {
            let links = [
                ("deprecated by", &extension.deprecated_by),
                ("obsoleted by", &extension.obsoleted_by),
                ("promoted to", &extension.promoted_to),
            ];
            for (relation, target) in links.iter() {
                if let Some(target) = target {
                    check!(self.extensions.contains_key(target) || self.features.contains_key(target), extension.line,
                           "extension <{}> is {} unknown extension or feature <{}>", name, relation, target);
                }
            }
            for requirement in &extension.requirements {
                check!(self.extensions.contains_key(requirement), extension.line,
                       "extension <{}> requires unknown extension <{}>", name, requirement);
            }
        }

        for (name, func_pointer) in &self.func_pointers {
            if let Some(ref requirements) = func_pointer.requirements {
                check!(self.types.contains_key(requirements), func_pointer.line,
                       "function pointer <{}> requires unknown type <{}>", name, requirements);
            }
        }

        for (name, structure) in &self.structures {
            for extended in &structure.struct_extends {
                check!(self.types.contains_key(extended), structure.line,
                       "structure <{}> extends unknown structure <{}>", name, extended);
            }
            for member in &structure.members {
                check!(self.types.contains_key(&member.type_info.type_name), member.line,
                       "member <{}> of <{}> has unknown type <{}>", member.name, name, member.type_info.type_name);
                for size in member.array_sizes.iter().filter(|s| !is_number(s)) {
                    check!(self.constants.contains_key(size), member.line,
                           "member <{}> of <{}> has unknown array size <{}>", member.name, name, size);
                }
            }
        }

        for (name, handle) in self.handles.iter().filter(|(name, _)| !name.is_empty()) {
            for parent in &handle.parents {
                check!(self.is_handle(parent), handle.line, "handle <{}> has unknown parent <{}>", name, parent);
            }
        }

        for (name, command) in &self.commands {
            check!(self.types.contains_key(&command.return_type), command.line,
                   "command <{}> returns unknown type <{}>", name, command.return_type);
            for param in &command.params {
                check!(self.types.contains_key(&param.type_info.type_name), param.line,
                       "parameter <{}> of <{}> has unknown type <{}>", param.name, name, param.type_info.type_name);
            }
            for code in command.success_codes.iter().chain(&command.error_codes) {
                check!(is_result_code(code), command.line, "command <{}> lists unknown result code <{}>", name, code);
            }
            check!(!command.returns_result() || !command.success_codes.is_empty(), command.line,
                   "command <{}> returns <{}> but lists no success codes", name, RESULT_ENUM);
        }
        Ok(())
    }
}

fn is_number(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}
