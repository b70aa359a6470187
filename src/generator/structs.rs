//! Structure and union wrappers, emitted so that every structure follows the ones it holds by
//! value, and the table of valid structure chains.
use std::collections::BTreeSet;
use std::fmt::Write;

use super::{close_protect, open_protect};
use crate::error::{warn, Result};
use crate::registry::{strip_vk, MemberData, Registry, StructureData, TypeCategory};
use crate::text::start_upper_case;

impl Registry {
    pub(super) fn gen_structs(&self, out: &mut String) -> Result<()> {
        for name in self.structure_order() {
            let data = &self.structures[name];
            let protect = self.protect(data.platform.as_ref());
            open_protect(out, protect)?;
            if data.is_union {
                self.gen_union(out, name, data)?;
            } else {
                self.gen_struct(out, name, data)?;
            }
            close_protect(out, protect)?;
            out.push('\n');
        }
        Ok(())
    }

    /// Structure names, each after the structures and unions its members hold by value.
    fn structure_order(&self) -> Vec<&str> {
        let mut order = Vec::with_capacity(self.structures.len());
        let mut visited = BTreeSet::new();
        for name in self.structures.keys() {
            self.visit_structure(name, &mut visited, &mut order);
        }
        order
    }

    fn visit_structure<'r>(&'r self, name: &'r str, visited: &mut BTreeSet<&'r str>, order: &mut Vec<&'r str>) {
        if !visited.insert(name) {
            return;
        }
        if let Some(data) = self.structures.get(name) {
            for member in data.members.iter().filter(|m| m.type_info.is_value()) {
                if let Some((dependency, _)) = self.structure(&member.type_info.type_name) {
                    self.visit_structure(dependency, visited, order);
                }
            }
            order.push(name);
        }
    }

    /// True if a union is part of the structure, directly or through members held by value.
    fn contains_union(&self, data: &StructureData) -> bool {
        data.members.iter()
            .filter(|m| m.type_info.is_value())
            .filter_map(|m| self.structure(&m.type_info.type_name))
            .any(|(_, member)| member.is_union || self.contains_union(member))
    }

    /// The declaration type of a member inside the wrapper.
    fn member_type(&self, member: &MemberData) -> String {
        if member.bit_count.is_some() {
            member.type_info.compose_native()
        } else {
            member.type_info.compose()
        }
    }

    /// The type a constructor or setter takes a member as.
    fn member_arg_type(&self, member: &MemberData) -> String {
        let element = self.member_type(member);
        member.array_sizes.iter().rev().fold(element, |inner, size| format!("std::array<{},{}>", inner, size))
    }

    fn member_arg(&self, member: &MemberData) -> String {
        if member.array_sizes.is_empty() {
            format!("{} {}_", self.member_arg_type(member), member.name)
        } else {
            format!("{} const& {}_", self.member_arg_type(member), member.name)
        }
    }

    fn member_default(&self, member: &MemberData) -> String {
        let ty = &member.type_info;
        if !member.array_sizes.is_empty() {
            return "{ { 0 } }".to_owned();
        }
        if ty.is_pointer() {
            return "nullptr".to_owned();
        }
        if member.bit_count.is_some() {
            return "0".to_owned();
        }
        if self.category(&ty.type_name) == Some(TypeCategory::Enum) {
            let first = self.enums.get(self.resolve_type(&ty.type_name)).and_then(|e| e.values.first());
            if let Some(first) = first {
                return format!("{}::{}", ty.pure_type(), first.name);
            }
        }
        format!("{}()", self.member_type(member))
    }

    fn gen_setters(&self, out: &mut String, class: &str, members: &[&MemberData]) -> Result<()> {
        for member in members {
            writeln!(out, "    {} & set{}( {} )", class, start_upper_case(&member.name), self.member_arg(member))?;
            writeln!(out, "    {{\n      {}\n      return *this;\n    }}\n", assignment(member, &arg_source(member)))?;
        }
        Ok(())
    }
}

/// Where a constructor or setter argument is read from; the data of an array argument.
fn arg_source(member: &MemberData) -> String {
    if member.array_sizes.is_empty() {
        format!("{}_", member.name)
    } else {
        format!("{}_.data()", member.name)
    }
}

/// Copies `source` into the member; for arrays `source` points to the first element.
fn assignment(member: &MemberData, source: &str) -> String {
    if member.array_sizes.is_empty() {
        format!("{} = {};", member.name, source)
    } else {
        format!("memcpy( &{0}, {1}, sizeof( {0} ) );", member.name, source)
    }
}

/// Conversion operators to the native type.
fn gen_native_conversions(out: &mut String, name: &str) -> Result<()> {
    writeln!(out, "    operator {} const&() const", name)?;
    writeln!(out, "    {{\n      return *reinterpret_cast<const {}*>(this);\n    }}\n", name)?;
    writeln!(out, "    operator {} &()", name)?;
    writeln!(out, "    {{\n      return *reinterpret_cast<{}*>(this);\n    }}\n", name)?;
    Ok(())
}

fn array_suffix(member: &MemberData) -> String {
    member.array_sizes.iter().map(|size| format!("[{}]", size)).collect()
}

impl Registry {
    fn gen_struct(&self, out: &mut String, name: &str, data: &StructureData) -> Result<()> {
        let class = strip_vk(name);
        let s_type = data.members.first().filter(|m| m.name == "sType" && m.values.is_some());
        let settable: Vec<&MemberData> = data.members.iter()
            .filter(|m| s_type.map_or(true, |s| s.name != m.name))
            .collect();
        let initialized: Vec<&MemberData> = settable.iter().copied()
            .filter(|m| m.name != "sType" && m.name != "pNext")
            .collect();

        writeln!(out, "  struct {}\n  {{", class)?;
        let args: Vec<String> = initialized.iter().map(|m| self.defaulted_arg(m)).collect();
        let sources: Vec<String> = initialized.iter().map(|m| arg_source(m)).collect();
        gen_constructor(out, class, "", &args, &initialized, &sources)?;

        if let Some((sub_name, sub)) = data.sub_struct.as_deref().and_then(|s| self.structure(s)) {
            let (prefix, rest) = initialized.split_at(sub.members.len().min(initialized.len()));
            let mut args = vec![format!("{} const& rhs", strip_vk(sub_name))];
            args.extend(rest.iter().map(|m| self.defaulted_arg(m)));
            let sources: Vec<String> = prefix.iter().map(|m| format!("rhs.{}", m.name))
                .chain(rest.iter().map(|m| arg_source(m)))
                .collect();
            gen_constructor(out, class, "explicit ", &args, &initialized, &sources)?;
        }

        writeln!(out, "    {}( {} const & rhs )", class, name)?;
        writeln!(out, "    {{\n      memcpy( this, &rhs, sizeof( {} ) );\n    }}\n", class)?;
        writeln!(out, "    {}& operator=( {} const & rhs )", class, name)?;
        writeln!(out, "    {{\n      memcpy( this, &rhs, sizeof( {} ) );\n      return *this;\n    }}\n", class)?;

        if !data.returned_only {
            self.gen_setters(out, class, &settable)?;
        }
        gen_native_conversions(out, name)?;

        if self.contains_union(data) {
            log::trace!("<{}> holds a union, no comparison operators", name);
        } else {
            let comparisons: Vec<String> = data.members.iter()
                .map(|m| if m.array_sizes.is_empty() {
                    format!("( {0} == rhs.{0} )", m.name)
                } else {
                    format!("( memcmp( {0}, rhs.{0}, sizeof( {0} ) ) == 0 )", m.name)
                })
                .collect();
            writeln!(out, "    bool operator==( {} const& rhs ) const", class)?;
            writeln!(out, "    {{\n      return {};\n    }}\n", comparisons.join("\n          && "))?;
            writeln!(out, "    bool operator!=( {} const& rhs ) const", class)?;
            out.push_str("    {\n      return !operator==( rhs );\n    }\n\n");
        }

        if let Some(s_type) = s_type {
            let value = s_type.values.as_deref().unwrap_or_default();
            match self.enum_value_name("VkStructureType", value) {
                Some(enumerator) => {
                    writeln!(out, "  private:\n    StructureType sType = StructureType::{};\n\n  public:", enumerator)?;
                }
                None => {
                    warn(s_type.line, format_args!("sType of <{}> has unknown value <{}>", name, value));
                    out.push_str("  private:\n    StructureType sType;\n\n  public:\n");
                }
            }
        }
        for member in &settable {
            let initializer = if member.name == "pNext" { " = nullptr" } else { "" };
            let bits = member.bit_count.as_ref().map(|b| format!(" : {}", b)).unwrap_or_default();
            writeln!(out, "    {} {}{}{}{};", self.member_type(member), member.name, array_suffix(member), bits,
                     initializer)?;
        }
        writeln!(out, "  }};\n  static_assert( sizeof( {} ) == sizeof( {} ), \"struct and wrapper have different size!\" );",
                 class, name)?;
        Ok(())
    }

    fn gen_union(&self, out: &mut String, name: &str, data: &StructureData) -> Result<()> {
        let class = strip_vk(name);
        writeln!(out, "  union {}\n  {{", class)?;

        // members of the same underlying type would make the constructors ambiguous
        let mut constructed = BTreeSet::new();
        for member in &data.members {
            let ty = &member.type_info;
            let underlying = self.base_types.get(&ty.type_name)
                .map(|b| b.type_name.as_str())
                .filter(|t| !t.is_empty())
                .unwrap_or(ty.type_name.as_str());
            if !constructed.insert((underlying, ty.postfix.as_str(), &member.array_sizes)) {
                continue;
            }
            let arg = if constructed.len() == 1 { self.defaulted_arg(member) } else { self.member_arg(member) };
            writeln!(out, "    {}( {} )", class, arg)?;
            writeln!(out, "    {{\n      {}\n    }}\n", assignment(member, &arg_source(member)))?;
        }

        if !data.returned_only {
            let members: Vec<&MemberData> = data.members.iter().collect();
            self.gen_setters(out, class, &members)?;
        }
        gen_native_conversions(out, name)?;

        for member in &data.members {
            let ty = &member.type_info;
            let wrapped = ty.is_value()
                && matches!(self.category(&ty.type_name), Some(TypeCategory::Struct) | Some(TypeCategory::Union));
            if wrapped {
                out.push_str("#ifdef VULKAN_HPP_HAS_UNRESTRICTED_UNIONS\n");
                writeln!(out, "    {} {}{};", ty.compose(), member.name, array_suffix(member))?;
                out.push_str("#else\n");
                writeln!(out, "    {} {}{};", ty.compose_native(), member.name, array_suffix(member))?;
                out.push_str("#endif  /*VULKAN_HPP_HAS_UNRESTRICTED_UNIONS*/\n");
            } else {
                writeln!(out, "    {} {}{};", self.member_type(member), member.name, array_suffix(member))?;
            }
        }
        writeln!(out, "  }};\n  static_assert( sizeof( {} ) == sizeof( {} ), \"struct and wrapper have different size!\" );",
                 class, name)?;
        Ok(())
    }

    fn defaulted_arg(&self, member: &MemberData) -> String {
        format!("{} = {}", self.member_arg(member), self.member_default(member))
    }

    /// Pairs of structures where the second one may be chained onto the first.
    pub(super) fn gen_structure_chain_validity(&self, out: &mut String) -> Result<()> {
        out.push_str("#ifndef VULKAN_HPP_NO_STRUCT_CHAIN\n");
        for (name, data) in &self.structures {
            for extended in &data.struct_extends {
                let (extended, target) = match self.structure(extended) {
                    Some(found) => found,
                    None => continue,
                };
                let mut guards: Vec<&str> = self.protect(target.platform.as_ref()).into_iter()
                    .chain(self.protect(data.platform.as_ref()))
                    .collect();
                guards.dedup();
                let condition: Vec<String> = guards.iter().map(|g| format!("defined({})", g)).collect();
                if !condition.is_empty() {
                    writeln!(out, "#if {}", condition.join(" && "))?;
                }
                writeln!(out, "  template <> struct isStructureChainValid< {}, {}>{{ enum {{ value = true }}; }};",
                         strip_vk(extended), strip_vk(name))?;
                if !condition.is_empty() {
                    writeln!(out, "#endif /*{}*/", condition.join(" && "))?;
                }
            }
        }
        out.push_str("#endif /*VULKAN_HPP_NO_STRUCT_CHAIN*/\n\n");
        Ok(())
    }
}

/// A member-wise constructor; `sources` holds where each of `members` is initialized from.
fn gen_constructor(
    out: &mut String,
    class: &str,
    specifier: &str,
    args: &[String],
    members: &[&MemberData],
    sources: &[String],
) -> Result<()> {
    if args.is_empty() {
        writeln!(out, "    {}{}()", specifier, class)?;
    } else {
        writeln!(out, "    {}{}( {} )", specifier, class, args.join(", "))?;
    }
    let fields = members.iter().zip(sources);
    for (i, (member, source)) in fields.clone().filter(|(m, _)| m.array_sizes.is_empty()).enumerate() {
        writeln!(out, "      {} {}( {} )", if i == 0 { ":" } else { "," }, member.name, source)?;
    }
    out.push_str("    {\n");
    for (member, source) in fields.filter(|(m, _)| !m.array_sizes.is_empty()) {
        writeln!(out, "      {}", assignment(member, source))?;
    }
    out.push_str("    }\n\n");
    Ok(())
}
