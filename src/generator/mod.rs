//! Renders a checked registry into the `vulkan.hpp` header.
//!
//! Each emitter module adds the `gen_*` methods for one family of constructs to `Registry`;
//! `gen_hpp` calls them in the order the header needs its declarations.
mod commands;
mod dispatch;
mod enums;
mod handles;
mod structs;

use std::fmt::Write;

use crate::error::Result;
use crate::registry::{strip_vk, Registry, TypeCategory};
use crate::text::replace_with_map;

/// Support types that do not depend on the registry, in the order they refer to each other.
const SUPPORT_SNIPPETS: [&str; 6] = [
    include_str!("snippets/array_proxy.hpp"),
    include_str!("snippets/flags.hpp"),
    include_str!("snippets/optional.hpp"),
    include_str!("snippets/structure_chain.hpp"),
    include_str!("snippets/unique_handle.hpp"),
    include_str!("snippets/deleters.hpp"),
];

impl Registry {
    /// Generates the complete header text.
    pub fn gen_hpp(&self) -> Result<String> {
        log::info!("generating header");
        let mut out = String::with_capacity(self.buffer_cap());

        out.push_str(&replace_with_map(include_str!("templates/prologue.hpp"), &[
            ("license", self.license_header.as_str()),
            ("header_version", self.header_version.as_str()),
            ("typesafe_check", self.typesafe_check.as_str()),
        ]));
        out.push_str(include_str!("snippets/defines.hpp"));
        out.push_str("\nnamespace VULKAN_HPP_NAMESPACE\n{\n");
        for snippet in SUPPORT_SNIPPETS.iter() {
            out.push_str(snippet);
            out.push('\n');
        }

        self.gen_dispatch_loader_static(&mut out)?;
        out.push_str("  class Instance;\n  class Device;\n\n");
        self.gen_dispatch_loader_dynamic(&mut out)?;
        self.gen_base_types(&mut out)?;
        self.gen_enums(&mut out)?;
        self.gen_bitmasks(&mut out)?;
        self.gen_forward_declarations(&mut out)?;
        self.gen_type_aliases(&mut out)?;
        self.gen_exceptions(&mut out)?;
        out.push_str(include_str!("snippets/result_value.hpp"));
        out.push('\n');
        self.gen_handles(&mut out)?;
        self.gen_structs(&mut out)?;
        self.gen_command_definitions(&mut out)?;
        self.gen_structure_chain_validity(&mut out)?;
        self.gen_dispatch_loader_init(&mut out)?;
        out.push_str("} // namespace VULKAN_HPP_NAMESPACE\n#endif\n");

        log::info!("generated {} bytes", out.len());
        Ok(out)
    }

    /// A rough upper bound of the header size, so the buffer rarely has to grow.
    fn buffer_cap(&self) -> usize {
        2usize.pow(16)
            + self.commands.len() * 2usize.pow(12)
            + self.structures.len() * 2usize.pow(11)
            + (self.enums.len() + self.handles.len()) * 2usize.pow(10)
    }

    fn gen_base_types(&self, out: &mut String) -> Result<()> {
        for (name, base) in &self.base_types {
            // `Flags` is the bitmask template, the flag types get their own aliases
            let is_flags = name == "VkFlags" || name == "VkFlags64";
            if name.starts_with("Vk") && !base.type_name.is_empty() && !is_flags {
                writeln!(out, "  using {} = {};", strip_vk(name), base.type_name)?;
            }
        }
        out.push('\n');
        Ok(())
    }

    fn gen_forward_declarations(&self, out: &mut String) -> Result<()> {
        for (name, structure) in &self.structures {
            let protect = self.protect(structure.platform.as_ref());
            open_protect(out, protect)?;
            let keyword = if structure.is_union { "union" } else { "struct" };
            writeln!(out, "  {} {};", keyword, strip_vk(name))?;
            close_protect(out, protect)?;
        }
        for (name, handle) in self.handles.iter().filter(|(name, _)| !name.is_empty()) {
            let protect = self.protect(handle.platform.as_ref());
            open_protect(out, protect)?;
            writeln!(out, "  class {};", strip_vk(name))?;
            close_protect(out, protect)?;
        }
        out.push('\n');
        Ok(())
    }

    /// Alias names of types as `using` declarations of their targets.
    fn gen_type_aliases(&self, out: &mut String) -> Result<()> {
        for (name, data) in &self.types {
            let aliased = match (data.category, data.alias_of.as_ref()) {
                (TypeCategory::Bitmask, Some(_))
                | (TypeCategory::Enum, Some(_))
                | (TypeCategory::Handle, Some(_))
                | (TypeCategory::Struct, Some(_))
                | (TypeCategory::Union, Some(_)) => self.resolve_type(name),
                _ => continue,
            };
            let protect = self.protect(self.type_platform(aliased));
            open_protect(out, protect)?;
            writeln!(out, "  using {} = {};", strip_vk(name), strip_vk(aliased))?;
            close_protect(out, protect)?;
        }
        out.push('\n');
        Ok(())
    }

    /// The platform of a type that has a wrapper of its own.
    fn type_platform(&self, name: &str) -> Option<&String> {
        let name = self.resolve_type(name);
        self.structures.get(name).and_then(|s| s.platform.as_ref())
            .or_else(|| self.handles.get(name).and_then(|h| h.platform.as_ref()))
            .or_else(|| self.enums.get(name).and_then(|e| e.platform.as_ref()))
            .or_else(|| self.bitmasks.get(name).and_then(|b| b.platform.as_ref()))
    }

    /// The helper a `UniqueHandle` of `handle` releases its object through, `None` for handles
    /// nothing releases.
    fn deleter_type(&self, handle: &str) -> Option<String> {
        let data = self.handles.get(self.resolve_type(handle))?;
        let command = data.delete_command.as_ref()?;
        let owner = strip_vk(data.delete_owner.as_deref().unwrap_or_default());
        let frees = command.starts_with("vkFree");
        let deleter = match (data.delete_pool.as_ref(), owner.is_empty()) {
            (Some(pool), false) => format!("PoolFree<{},{},Dispatch>", owner, strip_vk(self.resolve_type(pool))),
            (None, false) if frees => format!("ObjectFree<{},Dispatch>", owner),
            (None, false) => format!("ObjectDestroy<{},Dispatch>", owner),
            (None, true) if !frees => "ObjectDestroy<NoParent,Dispatch>".to_owned(),
            _ => {
                log::warn!("<{}> of <{}> has no owner to be called on", command, handle);
                return None;
            }
        };
        Some(deleter)
    }
}

fn open_protect(out: &mut String, protect: Option<&str>) -> Result<()> {
    if let Some(protect) = protect {
        writeln!(out, "#ifdef {}", protect)?;
    }
    Ok(())
}

fn close_protect(out: &mut String, protect: Option<&str>) -> Result<()> {
    if let Some(protect) = protect {
        writeln!(out, "#endif /*{}*/", protect)?;
    }
    Ok(())
}
