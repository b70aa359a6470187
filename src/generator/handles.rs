//! Wrapper classes of the handles, each followed by the traits of its `UniqueHandle`.
use std::fmt::Write;

use super::{close_protect, open_protect};
use crate::error::Result;
use crate::registry::{strip_vk, Registry};
use crate::text::{replace_with_map, start_lower_case};

impl Registry {
    pub(super) fn gen_handles(&self, out: &mut String) -> Result<()> {
        for (name, data) in self.handles.iter().filter(|(name, _)| !name.is_empty()) {
            let protect = self.protect(data.platform.as_ref());
            open_protect(out, protect)?;
            self.gen_handle(out, name)?;
            close_protect(out, protect)?;
            out.push('\n');
        }
        self.gen_command_declarations(out, "")?;
        Ok(())
    }

    fn gen_handle(&self, out: &mut String, name: &str) -> Result<()> {
        let class = strip_vk(name);
        let member = format!("m_{}", start_lower_case(class));
        let mut commands = String::new();
        self.gen_command_declarations(&mut commands, name)?;

        out.push_str(&replace_with_map(include_str!("templates/handle.hpp"), &[
            ("class", class),
            ("native", name),
            ("member", member.as_str()),
            ("commands", commands.as_str()),
        ]));

        if let Some(deleter) = self.deleter_type(name) {
            log::debug!("<{}> is released through {}", name, deleter);
            out.push_str("#ifndef VULKAN_HPP_NO_SMART_HANDLE\n");
            writeln!(out, "  template <typename Dispatch> class UniqueHandleTraits<{},Dispatch>", class)?;
            writeln!(out, "  {{\n  public:\n    using deleter = {};\n  }};", deleter)?;
            writeln!(out, "  using Unique{0} = UniqueHandle<{0},DispatchLoaderStatic>;", class)?;
            out.push_str("#endif /*VULKAN_HPP_NO_SMART_HANDLE*/\n");
        }
        Ok(())
    }
}
