//! Enums with their `to_string`, bitmasks with their operators, and the exception classes of
//! the result codes.
use std::fmt::Write;

use super::{close_protect, open_protect};
use crate::error::Result;
use crate::registry::{strip_vk, EnumData, Registry, RESULT_ENUM};
use crate::text::strip_prefix;

impl Registry {
    pub(super) fn gen_enums(&self, out: &mut String) -> Result<()> {
        for (name, data) in &self.enums {
            let protect = self.protect(data.platform.as_ref());
            open_protect(out, protect)?;
            self.gen_enum(out, name, data)?;
            gen_enum_to_string(out, name, data)?;
            close_protect(out, protect)?;
            out.push('\n');
        }
        Ok(())
    }

    fn gen_enum(&self, out: &mut String, name: &str, data: &EnumData) -> Result<()> {
        let wide = data.is_bitmask && self.bitmasks.values().any(|b| {
            b.type_name == "VkFlags64" && b.requirements.as_deref().map(|r| self.resolve_type(r)) == Some(name)
        });
        writeln!(out, "  enum class {}{}", strip_vk(name), if wide { " : VkFlags64" } else { "" })?;
        out.push_str("  {\n");
        let enumerators: Vec<String> = data.values.iter()
            .map(|v| format!("    {} = {}", v.name, v.vk_value))
            .chain(data.aliases.iter().map(|a| format!("    {} = {}", a.name, a.vk_value)))
            .collect();
        if !enumerators.is_empty() {
            writeln!(out, "{}", enumerators.join(",\n"))?;
        }
        out.push_str("  };\n\n");
        Ok(())
    }

    pub(super) fn gen_bitmasks(&self, out: &mut String) -> Result<()> {
        for (name, bitmask) in &self.bitmasks {
            let bits = match bitmask.requirements {
                Some(ref requirements) => self.resolve_type(requirements),
                None => continue,
            };
            let data = match self.enums.get(bits) {
                Some(data) => data,
                None => continue,
            };
            let protect = self.protect(bitmask.platform.as_ref());
            let (flags, bits) = (strip_vk(name), strip_vk(bits));

            open_protect(out, protect)?;
            writeln!(out, "  using {} = Flags<{}, {}>;", flags, bits, name)?;
            out.push('\n');
            writeln!(out, "  VULKAN_HPP_INLINE {} operator|( {} bit0, {} bit1 )", flags, bits, bits)?;
            writeln!(out, "  {{\n    return {}( bit0 ) | bit1;\n  }}\n", flags)?;
            writeln!(out, "  VULKAN_HPP_INLINE {} operator~( {} bits )", flags, bits)?;
            writeln!(out, "  {{\n    return ~( {}( bits ) );\n  }}\n", flags)?;

            let all_flags: Vec<String> = data.values.iter()
                .map(|v| format!("{}({}::{})", bitmask.type_name, bits, v.name))
                .collect();
            writeln!(out, "  template <> struct FlagTraits<{}>", bits)?;
            out.push_str("  {\n");
            if all_flags.is_empty() {
                out.push_str("    enum { allFlags = 0 };\n");
            } else {
                writeln!(out, "    enum\n    {{\n      allFlags = {}\n    }};", all_flags.join("\n        | "))?;
            }
            out.push_str("  };\n\n");

            writeln!(out, "  VULKAN_HPP_INLINE std::string to_string( {} value )", flags)?;
            out.push_str("  {\n");
            let single_bits: Vec<_> = data.values.iter().filter(|v| v.single_bit).collect();
            if single_bits.is_empty() {
                out.push_str("    return \"{}\";\n");
            } else {
                out.push_str("    if ( !value ) return \"{}\";\n");
                out.push_str("    std::string result;\n");
                for value in single_bits {
                    writeln!(out, "    if ( value & {}::{} ) result += \"{} | \";", bits, value.name,
                             strip_prefix(&value.name, "e"))?;
                }
                out.push_str("    return \"{\" + result.substr( 0, result.size() - 3 ) + \"}\";\n");
            }
            out.push_str("  }\n");
            close_protect(out, protect)?;
            out.push('\n');
        }
        Ok(())
    }

    /// One exception class per error code, and the function throwing the matching one.
    pub(super) fn gen_exceptions(&self, out: &mut String) -> Result<()> {
        let errors: Vec<&str> = self.enums.get(RESULT_ENUM)
            .map(|data| data.values.iter().map(|v| v.name.as_str()).filter(|n| n.starts_with("eError")).collect())
            .unwrap_or_default();

        out.push_str(include_str!("snippets/exceptions.hpp"));
        out.push_str("\n#ifndef VULKAN_HPP_NO_EXCEPTIONS\n");
        for error in &errors {
            let class = exception_class(error);
            writeln!(out, "  class {} : public SystemError", class)?;
            out.push_str("  {\n  public:\n");
            for arg in &["std::string const& message", "char const * message"] {
                writeln!(out, "    {}( {} )", class, arg)?;
                writeln!(out, "      : SystemError( make_error_code( Result::{} ), message ) {{}}", error)?;
            }
            out.push_str("  };\n\n");
        }

        out.push_str("  VULKAN_HPP_INLINE void throwResultException( Result result, char const * message )\n  {\n");
        out.push_str("    switch ( result )\n    {\n");
        for error in &errors {
            writeln!(out, "      case Result::{}: throw {}( message );", error, exception_class(error))?;
        }
        out.push_str("      default: throw SystemError( make_error_code( result ) );\n    }\n  }\n");
        out.push_str("#endif\n} // namespace VULKAN_HPP_NAMESPACE\n\n");

        out.push_str("#ifndef VULKAN_HPP_NO_EXCEPTIONS\nnamespace std\n{\n");
        out.push_str("  template <>\n  struct is_error_code_enum<VULKAN_HPP_NAMESPACE::Result> : public true_type\n  {};\n");
        out.push_str("}\n#endif\n\nnamespace VULKAN_HPP_NAMESPACE\n{\n");
        Ok(())
    }
}

/// `to_string` of every value; names without the leading `e`.
fn gen_enum_to_string(out: &mut String, name: &str, data: &EnumData) -> Result<()> {
    let name = strip_vk(name);
    if data.values.is_empty() {
        writeln!(out, "  VULKAN_HPP_INLINE std::string to_string( {} )", name)?;
        out.push_str("  {\n    return \"(void)\";\n  }\n");
        return Ok(());
    }
    writeln!(out, "  VULKAN_HPP_INLINE std::string to_string( {} value )", name)?;
    out.push_str("  {\n    switch ( value )\n    {\n");
    for value in &data.values {
        writeln!(out, "      case {}::{} : return \"{}\";", name, value.name, strip_prefix(&value.name, "e"))?;
    }
    out.push_str("      default: return \"invalid\";\n    }\n  }\n");
    Ok(())
}

/// `eErrorOutOfHostMemory` -> `OutOfHostMemoryError`
fn exception_class(error: &str) -> String {
    format!("{}Error", strip_prefix(error, "eError"))
}
