//! The dispatchers every wrapper call goes through: the static one forwarding to the exported
//! symbols, and the dynamic one holding a function pointer per entry point.
use std::fmt::Write;

use super::{close_protect, open_protect};
use crate::error::Result;
use crate::registry::{CommandData, Registry};

/// Entry points the dynamic dispatcher loads everything else through.
const PROC_ADDR_COMMANDS: [&str; 2] = ["vkGetInstanceProcAddr", "vkGetDeviceProcAddr"];

impl Registry {
    /// Every entry point with the command behind it, aliases under their own name.
    fn entry_points(&self) -> Vec<(&str, &CommandData)> {
        let mut entries: Vec<(&str, &CommandData)> = self.commands.iter()
            .flat_map(|(name, command)| {
                std::iter::once(name.as_str())
                    .chain(command.aliases.iter().map(String::as_str))
                    .map(move |entry| (entry, command))
            })
            .collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries
    }

    pub(super) fn gen_dispatch_loader_static(&self, out: &mut String) -> Result<()> {
        out.push_str("  class DispatchLoaderStatic\n  {\n  public:\n");
        for (entry, command) in self.entry_points() {
            let protect = self.protect(command.platform.as_ref());
            let params: Vec<String> = command.params.iter()
                .map(|p| {
                    let sizes: String = p.array_sizes.iter().map(|s| format!("[{}]", s)).collect();
                    format!("{} {}{}", p.type_info.compose_native(), p.name, sizes)
                })
                .collect();
            let names: Vec<&str> = command.params.iter().map(|p| p.name.as_str()).collect();

            open_protect(out, protect)?;
            writeln!(out, "    {} {}( {} ) const", command.return_type, entry, params.join(", "))?;
            out.push_str("    {\n");
            let keyword = if command.return_type == "void" { "" } else { "return " };
            writeln!(out, "      {}::{}( {} );", keyword, entry, names.join(", "))?;
            out.push_str("    }\n");
            close_protect(out, protect)?;
        }
        out.push_str("  };\n\n");
        Ok(())
    }

    pub(super) fn gen_dispatch_loader_dynamic(&self, out: &mut String) -> Result<()> {
        out.push_str("  class DispatchLoaderDynamic\n  {\n  public:\n");
        for (entry, command) in self.entry_points() {
            if PROC_ADDR_COMMANDS.contains(&entry) {
                continue;
            }
            let protect = self.protect(command.platform.as_ref());
            open_protect(out, protect)?;
            writeln!(out, "    PFN_{0} {0} = 0;", entry)?;
            close_protect(out, protect)?;
        }
        for entry in PROC_ADDR_COMMANDS.iter() {
            writeln!(out, "    PFN_{0} {0} = 0;", entry)?;
        }
        out.push_str(include_str!("snippets/dispatch_dynamic.hpp"));
        out.push_str("  };\n\n");
        Ok(())
    }

    /// Bodies of the dynamic dispatcher's `init` overloads. They name `Instance` and `Device`,
    /// so they follow the handle classes.
    pub(super) fn gen_dispatch_loader_init(&self, out: &mut String) -> Result<()> {
        let entries: Vec<(&str, &CommandData)> = self.entry_points().into_iter()
            .filter(|(entry, _)| !PROC_ADDR_COMMANDS.contains(entry))
            .collect();

        out.push_str("  VULKAN_HPP_INLINE void DispatchLoaderDynamic::init( PFN_vkGetInstanceProcAddr getInstanceProcAddr )\n");
        out.push_str("  {\n    VULKAN_HPP_ASSERT( getInstanceProcAddr );\n");
        out.push_str("    vkGetInstanceProcAddr = getInstanceProcAddr;\n");
        for (entry, command) in entries.iter().filter(|(_, c)| c.handle.is_empty()) {
            let protect = self.protect(command.platform.as_ref());
            open_protect(out, protect)?;
            writeln!(out, "    {0} = PFN_{0}( vkGetInstanceProcAddr( VK_NULL_HANDLE, \"{0}\" ) );", entry)?;
            close_protect(out, protect)?;
        }
        out.push_str("  }\n\n");

        out.push_str("  VULKAN_HPP_INLINE void DispatchLoaderDynamic::init( VkInstance instance, PFN_vkGetInstanceProcAddr getInstanceProcAddr, VkDevice device, PFN_vkGetDeviceProcAddr getDeviceProcAddr )\n");
        out.push_str("  {\n    VULKAN_HPP_ASSERT( instance && getInstanceProcAddr );\n");
        out.push_str("    init( getInstanceProcAddr );\n");
        out.push_str("    vkGetDeviceProcAddr = getDeviceProcAddr ? getDeviceProcAddr : PFN_vkGetDeviceProcAddr( vkGetInstanceProcAddr( instance, \"vkGetDeviceProcAddr\" ) );\n");
        for (entry, command) in entries.iter().filter(|(_, c)| !c.handle.is_empty()) {
            let protect = self.protect(command.platform.as_ref());
            open_protect(out, protect)?;
            if self.is_device_handle(&command.handle) {
                writeln!(out, "    {0} = PFN_{0}( device ? vkGetDeviceProcAddr( device, \"{0}\" ) : vkGetInstanceProcAddr( instance, \"{0}\" ) );", entry)?;
            } else {
                writeln!(out, "    {0} = PFN_{0}( vkGetInstanceProcAddr( instance, \"{0}\" ) );", entry)?;
            }
            close_protect(out, protect)?;
        }
        out.push_str("  }\n\n");

        out.push_str(include_str!("snippets/dispatch_init.hpp"));
        Ok(())
    }
}
