//! Reads the element tree of a registry document into a `Registry`.
//!
//! The children of `<registry>` are visited kind by kind instead of in document order, so every
//! reference a later kind makes (commands naming types, extensions naming commands) can be
//! resolved on the spot. Cross references that may point forward are collected and resolved in
//! `Reader::finish`.
use std::collections::BTreeSet;

use boolinator::Boolinator;

use super::command::CommandShape;
use super::dom::{Element, Node};
use super::validate::{check_attributes, check_elements};
use super::*;
use crate::error::{self, Error, Result};
use crate::text::{self, extract_tag, find_tag, to_camel_case, to_upper_case, tokenize, trim_stars};

const READ_ORDER: [&str; 8] = ["comment", "platforms", "tags", "types", "enums", "commands", "feature", "extensions"];

/// Defines whose text carries the `__LP64__` typesafety check, in order of preference.
const TYPESAFE_DEFINES: [&str; 2] = ["VK_DEFINE_NON_DISPATCHABLE_HANDLE", "VK_USE_64_BIT_PTR_DEFINES"];

pub fn read(root: &Element) -> Result<Registry> {
    check!(root.name == "registry", root.line, "unexpected root element <{}>", root.name);
    check_attributes(root, &[], &[])?;
    check_elements(
        root,
        &[("commands", true), ("enums", false), ("extensions", true), ("feature", false), ("platforms", true),
          ("tags", true), ("types", true)],
        &["comment"],
    )?;

    let mut reader = Reader::new();
    for &kind in READ_ORDER.iter() {
        log::info!("reading <{}>", kind);
        for element in root.elements_named(kind) {
            match kind {
                "comment" => reader.read_comment(element)?,
                "platforms" => reader.read_platforms(element)?,
                "tags" => reader.read_tags(element)?,
                "types" => reader.read_types(element)?,
                "enums" => reader.read_enums(element)?,
                "commands" => reader.read_commands(element)?,
                "feature" => reader.read_feature(element)?,
                "extensions" => reader.read_extensions(element)?,
                _ => unreachable!(),
            }
        }
    }
    reader.finish()?;
    Ok(reader.registry)
}

/// An enum value alias, resolved once every value is known.
#[derive(Debug)]
struct PendingAlias {
    enum_name: String,
    vk_value: String,
    target: String,
    line: u64,
}

struct Declaration {
    type_info: TypeInfo,
    name: String,
    array_sizes: Vec<String>,
    bit_count: Option<String>,
}

struct Reader {
    registry: Registry,
    pending_aliases: Vec<PendingAlias>,
}

impl Reader {
    fn new() -> Reader {
        let mut registry = Registry::default();
        // holds the free functions
        registry.handles.insert(String::new(), HandleData::default());
        Reader { registry, pending_aliases: Vec::new() }
    }

    fn read_comment(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[])?;
        check_elements(element, &[], &[])?;
        if !self.registry.license_header.is_empty() {
            return Ok(());
        }

        let text = element.text();
        if let Some(start) = text.find("Copyright") {
            let license = &text[start..];
            let license = license.find("\n\n-----").map_or(license, |end| &license[..end]);
            self.registry.license_header = license.lines()
                .map(str::trim_end)
                .map(|line| if line.is_empty() { "//".to_owned() } else { format!("// {}", line) })
                .collect::<Vec<_>>()
                .join("\n");
        }
        Ok(())
    }

    fn read_platforms(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[("comment", &[])])?;
        check_elements(element, &[], &["platform"])?;
        for platform in element.elements_named("platform") {
            check_attributes(platform, &[("name", &[]), ("protect", &[])], &[("comment", &[])])?;
            let (name, protect) = (attr(platform, "name"), attr(platform, "protect"));
            check!(!self.registry.platforms.values().any(|p| p.protect == protect), platform.line,
                   "platform protect <{}> already specified", protect);
            let previous = self.registry.platforms.insert(
                name.to_owned(),
                PlatformData { protect: protect.to_owned(), line: platform.line },
            );
            check!(previous.is_none(), platform.line, "platform <{}> already specified", name);
        }
        Ok(())
    }

    fn read_tags(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[("comment", &[])])?;
        check_elements(element, &[], &["tag"])?;
        for tag in element.elements_named("tag") {
            check_attributes(tag, &[("author", &[]), ("contact", &[]), ("name", &[])], &[])?;
            let name = attr(tag, "name");
            check!(self.registry.tags.insert(name.to_owned()), tag.line, "tag <{}> already specified", name);
        }
        Ok(())
    }

    fn add_type(&mut self, name: &str, category: TypeCategory, alias_of: Option<&str>, line: u64) -> Result<()> {
        check!(!self.registry.types.contains_key(name), line, "type <{}> already specified", name);
        if let Some(target) = alias_of {
            check!(self.registry.types.contains_key(target), line,
                   "alias <{}> refers to unknown type <{}>", name, target);
        }
        log::trace!("type <{}> ({:?})", name, category);
        self.registry.types.insert(
            name.to_owned(),
            TypeData { category, alias_of: alias_of.map(String::from), line },
        );
        Ok(())
    }

    fn read_types(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[("comment", &[])])?;
        check_elements(element, &[], &["comment", "type"])?;
        for ty in element.elements_named("type").filter(|t| is_vulkan_api(t)) {
            match ty.attribute("category") {
                None => self.read_type_requires(ty)?,
                Some("basetype") => self.read_type_basetype(ty)?,
                Some("bitmask") => self.read_type_bitmask(ty)?,
                Some("define") => self.read_type_define(ty)?,
                Some("enum") => self.read_type_enum(ty)?,
                Some("funcpointer") => self.read_type_funcpointer(ty)?,
                Some("handle") => self.read_type_handle(ty)?,
                Some("include") => self.read_type_include(ty)?,
                Some("struct") => self.read_type_struct(ty, false)?,
                Some("union") => self.read_type_struct(ty, true)?,
                Some(other) => return Err(Error::spec(ty.line, format!("unknown type category <{}>", other))),
            }
        }
        Ok(())
    }

    fn read_type_requires(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("name", &[])], &[("requires", &[])])?;
        check_elements(element, &[], &[])?;
        self.add_type(attr(element, "name"), TypeCategory::Requires, None, element.line)
    }

    fn read_type_basetype(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("category", &["basetype"])], &[])?;
        check_elements(element, &[("name", true)], &["type"])?;
        let name = child_text(element, "name");
        let type_name = child_text(element, "type");
        self.add_type(&name, TypeCategory::BaseType, None, element.line)?;
        self.registry.base_types.insert(name, BaseTypeData { type_name, line: element.line });
        Ok(())
    }

    fn read_type_bitmask(&mut self, element: &Element) -> Result<()> {
        let line = element.line;
        if let Some(alias) = element.attribute("alias") {
            check_attributes(element, &[("alias", &[]), ("category", &["bitmask"]), ("name", &[])], &[])?;
            check_elements(element, &[], &[])?;
            let name = attr(element, "name");
            let target = self.registry.bitmasks.get_mut(alias)
                .ok_or_else(|| Error::spec(line, format!("alias <{}> refers to unknown bitmask <{}>", name, alias)))?;
            target.alias.get_or_insert_with(|| name.to_owned());
            return self.add_type(name, TypeCategory::Bitmask, Some(alias), line);
        }

        check_attributes(element, &[("category", &["bitmask"])], &[("api", &[]), ("bitvalues", &[]), ("requires", &[])])?;
        check_elements(element, &[("name", true), ("type", true)], &[])?;
        let name = child_text(element, "name");
        let requirements = element.attribute("requires")
            .or_else(|| element.attribute("bitvalues"))
            .map(String::from);
        self.add_type(&name, TypeCategory::Bitmask, None, line)?;
        self.registry.bitmasks.insert(name, BitmaskData {
            requirements,
            type_name: child_text(element, "type"),
            alias: None,
            platform: None,
            line,
        });
        Ok(())
    }

    fn read_type_define(&mut self, element: &Element) -> Result<()> {
        check_attributes(
            element,
            &[("category", &["define"])],
            &[("api", &[]), ("comment", &[]), ("deprecated", &[]), ("name", &[]), ("requires", &[])],
        )?;
        check_elements(element, &[], &["name", "type"])?;
        let name = element.attribute("name").map(String::from)
            .or_else(|| element.first_element("name").map(Element::text))
            .ok_or_else(|| Error::spec(element.line, "define without a name"))?;

        if name == "VK_HEADER_VERSION" {
            self.registry.header_version = element.last_text().unwrap_or_default().trim().to_owned();
        } else if TYPESAFE_DEFINES.contains(&name.as_str()) && self.registry.typesafe_check.is_empty() {
            let text = element.text();
            if let Some(start) = text.find("#if defined(__LP64__)") {
                let end = text[start..].find(|c: char| c == '\r' || c == '\n').map_or(text.len(), |e| start + e);
                self.registry.typesafe_check = text[start..end].to_owned();
            }
        }

        self.add_type(&name, TypeCategory::Define, None, element.line)?;
        self.registry.defines.insert(name);
        Ok(())
    }

    fn read_type_enum(&mut self, element: &Element) -> Result<()> {
        let line = element.line;
        let name = attr(element, "name");
        if let Some(alias) = element.attribute("alias") {
            check_attributes(element, &[("alias", &[]), ("category", &["enum"]), ("name", &[])], &[])?;
            let target = self.registry.enums.get_mut(alias)
                .ok_or_else(|| Error::spec(line, format!("alias <{}> refers to unknown enum <{}>", name, alias)))?;
            target.alias.get_or_insert_with(|| name.to_owned());
            return self.add_type(name, TypeCategory::Enum, Some(alias), line);
        }

        check_attributes(element, &[("category", &["enum"]), ("name", &[])], &[])?;
        check_elements(element, &[], &[])?;
        self.add_type(name, TypeCategory::Enum, None, line)?;
        self.registry.enums.insert(name.to_owned(), EnumData { line, ..EnumData::default() });
        Ok(())
    }

    fn read_type_funcpointer(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("category", &["funcpointer"])], &[("requires", &[])])?;
        check_elements(element, &[("name", true)], &["type"])?;
        let name = child_text(element, "name");
        self.add_type(&name, TypeCategory::FuncPointer, None, element.line)?;
        self.registry.func_pointers.insert(name, FuncPointerData {
            requirements: element.attribute("requires").map(String::from),
            line: element.line,
        });
        Ok(())
    }

    fn read_type_handle(&mut self, element: &Element) -> Result<()> {
        let line = element.line;
        if let Some(alias) = element.attribute("alias") {
            check_attributes(element, &[("alias", &[]), ("category", &["handle"]), ("name", &[])], &[])?;
            check_elements(element, &[], &[])?;
            let name = attr(element, "name");
            let target = self.registry.handles.get_mut(alias)
                .ok_or_else(|| Error::spec(line, format!("alias <{}> refers to unknown handle <{}>", name, alias)))?;
            target.alias.get_or_insert_with(|| name.to_owned());
            return self.add_type(name, TypeCategory::Handle, Some(alias), line);
        }

        check_attributes(element, &[("category", &["handle"])], &[("objtypeenum", &[]), ("parent", &[])])?;
        check_elements(element, &[("name", true), ("type", true)], &[])?;
        let define = child_text(element, "type");
        check!(define == "VK_DEFINE_HANDLE" || define == "VK_DEFINE_NON_DISPATCHABLE_HANDLE", line,
               "handle with invalid type <{}>", define);

        let name = child_text(element, "name");
        self.add_type(&name, TypeCategory::Handle, None, line)?;
        self.registry.handles.insert(name, HandleData {
            parents: element.attribute("parent").map(|p| tokenize(p, ',')).unwrap_or_default(),
            line,
            ..HandleData::default()
        });
        Ok(())
    }

    fn read_type_include(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("category", &["include"])], &[("name", &[])])?;
        check_elements(element, &[], &["name"])?;
        let name = element.attribute("name").map(String::from)
            .or_else(|| element.first_element("name").map(Element::text))
            .ok_or_else(|| Error::spec(element.line, "include without a name"))?;
        self.add_type(&name, TypeCategory::Include, None, element.line)
    }

    fn read_type_struct(&mut self, element: &Element, is_union: bool) -> Result<()> {
        let line = element.line;
        let (category, allowed): (_, &[&str]) = if is_union {
            (TypeCategory::Union, &["union"])
        } else {
            (TypeCategory::Struct, &["struct"])
        };

        if let Some(alias) = element.attribute("alias") {
            check_attributes(element, &[("alias", &[]), ("category", allowed), ("name", &[])], &[])?;
            check_elements(element, &[], &[])?;
            let name = attr(element, "name");
            let target = self.registry.structures.get_mut(alias)
                .ok_or_else(|| Error::spec(line, format!("alias <{}> refers to unknown structure <{}>", name, alias)))?;
            check!(target.aliases.insert(name.to_owned()), line, "structure alias <{}> already listed", name);
            self.registry.structure_aliases.insert(name.to_owned(), alias.to_owned());
            return self.add_type(name, category, Some(alias), line);
        }

        check_attributes(
            element,
            &[("category", allowed), ("name", &[])],
            &[("allowduplicate", &["false", "true"]), ("comment", &[]), ("requiredlimittype", &[]),
              ("returnedonly", &["false", "true"]), ("structextends", &[])],
        )?;
        check_elements(element, &[], &["comment", "member"])?;

        let name = attr(element, "name");
        let mut members: Vec<MemberData> = Vec::new();
        for member in element.elements_named("member").filter(|m| is_vulkan_api(m)) {
            let member = read_member(member)?;
            check!(!members.iter().any(|m| m.name == member.name), member.line,
                   "structure <{}> has duplicate member <{}>", name, member.name);
            members.push(member);
        }

        self.add_type(name, category, None, line)?;
        self.registry.structures.insert(name.to_owned(), StructureData {
            members,
            returned_only: element.attribute("returnedonly") == Some("true"),
            is_union,
            struct_extends: element.attribute("structextends").map(|e| tokenize(e, ',')).unwrap_or_default(),
            line,
            ..StructureData::default()
        });
        Ok(())
    }

    fn read_enums(&mut self, element: &Element) -> Result<()> {
        let name = attr(element, "name");
        if name == "API Constants" {
            check_attributes(element, &[("name", &[])], &[("comment", &[]), ("type", &["constants"])])?;
            check_elements(element, &[], &["enum"])?;
            return element.elements_named("enum").try_for_each(|constant| self.read_constant(constant));
        }

        check_attributes(
            element,
            &[("name", &[])],
            &[("bitwidth", &["64"]), ("comment", &[]), ("type", &["bitmask", "enum"])],
        )?;
        check_elements(element, &[], &["comment", "enum", "unused"])?;
        let kind = element.attribute("type")
            .ok_or_else(|| Error::spec(element.line, format!("enums <{}> is missing the type attribute", name)))?;

        if !self.registry.enums.contains_key(name) {
            self.add_type(name, TypeCategory::Enum, None, element.line)?;
            self.registry.enums.insert(name.to_owned(), EnumData { line: element.line, ..EnumData::default() });
        }
        if let Some(data) = self.registry.enums.get_mut(name) {
            data.is_bitmask = kind == "bitmask";
        }

        for value in element.elements_named("enum").filter(|v| is_vulkan_api(v)) {
            check_attributes(
                value,
                &[("name", &[])],
                &[("alias", &[]), ("api", &[]), ("bitpos", &[]), ("comment", &[]), ("deprecated", &[]),
                  ("type", &[]), ("value", &[])],
            )?;
            let vk_value = attr(value, "name");
            match value.attribute("alias") {
                Some(target) => self.pending_aliases.push(PendingAlias {
                    enum_name: name.to_owned(),
                    vk_value: vk_value.to_owned(),
                    target: target.to_owned(),
                    line: value.line,
                }),
                None => self.add_enum_value(name, vk_value, value.attribute("bitpos").is_some(), value.line)?,
            }
        }
        Ok(())
    }

    fn read_constant(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("name", &[])], &[("alias", &[]), ("comment", &[]), ("type", &[]), ("value", &[])])?;
        let name = attr(element, "name");
        let value = match (element.attribute("value"), element.attribute("alias")) {
            (Some(value), _) => value,
            (None, Some(alias)) => {
                check!(self.registry.constants.contains_key(alias), element.line,
                       "constant <{}> aliases unknown constant <{}>", name, alias);
                alias
            }
            (None, None) => return Err(Error::spec(element.line, format!("constant <{}> has neither value nor alias", name))),
        };
        let previous = self.registry.constants.insert(name.to_owned(), value.to_owned());
        check!(previous.is_none(), element.line, "constant <{}> already specified", name);
        Ok(())
    }

    fn add_enum_value(&mut self, enum_name: &str, vk_value: &str, single_bit: bool, line: u64) -> Result<()> {
        let is_bitmask = self.registry.enums.get(enum_name).map_or(false, |e| e.is_bitmask);
        let name = enum_value_name(vk_value, enum_name, is_bitmask, &self.registry.tags);
        let data = self.registry.enums.get_mut(enum_name)
            .ok_or_else(|| Error::spec(line, format!("value <{}> extends unknown enum <{}>", vk_value, enum_name)))?;

        if let Some(existing) = data.values.iter().find(|v| v.name == name) {
            check!(existing.vk_value == vk_value, line,
                   "enum value <{}> maps to same C++-name as <{}>", vk_value, existing.vk_value);
            return Ok(());
        }
        data.values.push(EnumValueData { vk_value: vk_value.to_owned(), name, single_bit });
        Ok(())
    }

    /// Adds an alias whose target is known; an alias rendering like an existing name is dropped.
    fn add_enum_alias(&mut self, alias: PendingAlias) {
        let is_bitmask = self.registry.enums.get(&alias.enum_name).map_or(false, |e| e.is_bitmask);
        let name = enum_value_name(&alias.vk_value, &alias.enum_name, is_bitmask, &self.registry.tags);
        if let Some(data) = self.registry.enums.get_mut(&alias.enum_name) {
            let taken = data.values.iter().any(|v| v.name == name) || data.aliases.iter().any(|a| a.name == name);
            if !taken {
                data.aliases.push(EnumAliasData { vk_value: alias.vk_value, name });
            }
        }
    }

    fn read_commands(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[("comment", &[])])?;
        check_elements(element, &[], &["command"])?;
        let (aliases, commands): (Vec<&Element>, Vec<&Element>) = element.elements_named("command")
            .filter(|c| is_vulkan_api(c))
            .partition(|c| c.attribute("alias").is_some());
        for command in commands {
            self.read_command(command)?;
        }
        for alias in aliases {
            self.read_command_alias(alias)?;
        }
        Ok(())
    }

    fn read_command_alias(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[("alias", &[]), ("name", &[])], &[("api", &[])])?;
        check_elements(element, &[], &[])?;
        let (name, alias) = (attr(element, "name"), attr(element, "alias"));
        check!(!self.registry.command_to_handle.contains_key(name), element.line, "command <{}> already specified", name);

        let command = self.registry.commands.get_mut(alias)
            .ok_or_else(|| Error::spec(element.line, format!("alias <{}> refers to unknown command <{}>", name, alias)))?;
        command.aliases.insert(name.to_owned());
        let handle = command.handle.clone();
        self.registry.command_to_handle.insert(name.to_owned(), handle);
        Ok(())
    }

    fn read_command(&mut self, element: &Element) -> Result<()> {
        let line = element.line;
        check_attributes(
            element,
            &[],
            &[("api", &[]), ("cmdbufferlevel", &[]), ("comment", &[]), ("errorcodes", &[]), ("pipeline", &[]),
              ("queues", &[]), ("renderpass", &["both", "inside", "outside"]), ("successcodes", &[]), ("tasks", &[]),
              ("videocoding", &[])],
        )?;
        check_elements(element, &[("param", false), ("proto", true)], &["description", "implicitexternsyncparams"])?;

        let proto = element.first_element("proto")
            .ok_or_else(|| Error::spec(line, "command without <proto>"))?;
        check_attributes(proto, &[], &[])?;
        check_elements(proto, &[("name", true), ("type", true)], &[])?;
        let name = child_text(proto, "name");
        let return_type = child_text(proto, "type");
        check!(!self.registry.command_to_handle.contains_key(&name), line, "command <{}> already specified", name);

        let mut params: Vec<ParamData> = Vec::new();
        for param in element.elements_named("param").filter(|p| is_vulkan_api(p)) {
            let param = read_param(param)?;
            check!(!params.iter().any(|p| p.name == param.name), param.line,
                   "command <{}> has duplicate parameter <{}>", name, param.name);
            params.push(param);
        }

        let shape = CommandShape::analyze(&params, &return_type)?;
        let handle = params.first()
            .map(|p| self.registry.resolve_type(&p.type_info.type_name))
            .filter(|t| self.registry.is_handle(t))
            .unwrap_or("")
            .to_owned();
        let command = CommandData {
            params,
            return_type,
            success_codes: codes(element, "successcodes"),
            error_codes: codes(element, "errorcodes"),
            aliases: BTreeSet::new(),
            handle: handle.clone(),
            shape,
            platform: None,
            referenced_in: None,
            line,
        };

        if name.starts_with("vkDestroy") || name.starts_with("vkFree") {
            self.register_deleter(&name, &command)?;
        }
        if let Some(data) = self.registry.handles.get_mut(&handle) {
            data.commands.insert(name.clone());
        }
        self.registry.command_to_handle.insert(name.clone(), handle);
        self.registry.commands.insert(name, command);
        Ok(())
    }

    /// Records which handle a destroy or free command releases, who owns it and which pool it
    /// came from.
    fn register_deleter(&mut self, name: &str, command: &CommandData) -> Result<()> {
        let params = &command.params;
        let with_allocator = params.last().map_or(false, |p| p.type_info.type_name == "VkAllocationCallbacks");
        let (owner, target) = match (params.len(), with_allocator) {
            (4, _) => (Some(0), 3),
            (3, true) | (2, false) => (Some(0), 1),
            (2, true) => (None, 0),
            _ => return Err(Error::spec(command.line, format!("unexpected parameter list of deleter <{}>", name))),
        };

        let owner = owner.map_or("", |o| self.registry.resolve_type(&params[o].type_info.type_name)).to_owned();
        let target = self.registry.resolve_type(&params[target].type_info.type_name).to_owned();
        let pool = (params.len() == 4).as_some_from(|| params[1].type_info.type_name.clone());
        check!(self.registry.is_handle(&target), command.line, "deleter <{}> releases <{}>, which is not a handle", name, target);
        check!(self.registry.handles.contains_key(&owner), command.line, "deleter <{}> has unknown owner <{}>", name, owner);

        let data = self.registry.handles.get_mut(&target)
            .ok_or_else(|| Error::spec(command.line, format!("unknown handle <{}>", target)))?;
        if let Some(ref previous) = data.delete_command {
            return Err(Error::spec(command.line, format!(
                "handle <{}> is already released by <{}>, cannot register <{}>", target, previous, name)));
        }
        data.delete_command = Some(name.to_owned());
        data.delete_pool = pool;
        data.delete_owner = Some(owner.clone());
        log::debug!("<{}> releases <{}> owned by <{}>", name, target, owner);

        if let Some(owner) = self.registry.handles.get_mut(&owner) {
            owner.children.insert(target);
        }
        Ok(())
    }

    fn read_feature(&mut self, element: &Element) -> Result<()> {
        if !is_vulkan_api(element) {
            return Ok(());
        }
        check_attributes(element, &[("api", &[]), ("name", &[]), ("number", &[])], &[("comment", &[]), ("depends", &[])])?;
        check_elements(element, &[], &["remove", "require"])?;

        let name = attr(element, "name");
        check!(!self.registry.features.contains_key(name), element.line, "feature <{}> already specified", name);
        self.registry.features.insert(
            name.to_owned(),
            FeatureData { number: attr(element, "number").to_owned(), line: element.line },
        );
        for require in element.elements_named("require").filter(|r| is_vulkan_api(r)) {
            self.read_require(require, name, None)?;
        }
        Ok(())
    }

    fn read_extensions(&mut self, element: &Element) -> Result<()> {
        check_attributes(element, &[], &[("comment", &[])])?;
        check_elements(element, &[], &["extension"])?;
        element.elements_named("extension").try_for_each(|extension| self.read_extension(extension))
    }

    fn read_extension(&mut self, element: &Element) -> Result<()> {
        let line = element.line;
        check_attributes(
            element,
            &[("name", &[]), ("number", &[]), ("supported", &[])],
            &[("author", &[]), ("comment", &[]), ("contact", &[]), ("depends", &[]), ("deprecatedby", &[]),
              ("nofeatures", &[]), ("obsoletedby", &[]), ("platform", &[]), ("promotedto", &[]),
              ("provisional", &["true"]), ("ratified", &[]), ("requires", &[]), ("requiresCore", &[]),
              ("sortorder", &[]), ("specialuse", &[]), ("type", &["device", "instance"])],
        )?;
        check_elements(element, &[], &["remove", "require"])?;

        let name = attr(element, "name");
        if !tokenize(attr(element, "supported"), ',').iter().any(|s| s == "vulkan") {
            log::debug!("removing everything required by disabled extension <{}>", name);
            return element.elements_named("require").try_for_each(|require| self.remove_require(require));
        }

        check!(!self.registry.extensions.contains_key(name), line, "extension <{}> already specified", name);
        let platform = element.attribute("platform");
        if let Some(platform) = platform {
            check!(self.registry.platforms.contains_key(platform), line,
                   "extension <{}> has unknown platform <{}>", name, platform);
        }
        match extract_tag(name) {
            Some(tag) if self.registry.tags.contains(tag) => (),
            _ => error::warn(line, format_args!("extension <{}> does not name a known tag", name)),
        }

        self.registry.extensions.insert(name.to_owned(), ExtensionData {
            number: attr(element, "number").to_owned(),
            requirements: element.attribute("requires").map(|r| tokenize(r, ',')).unwrap_or_default().into_iter().collect(),
            deprecated_by: element.attribute("deprecatedby").filter(|d| !d.is_empty()).map(String::from),
            obsoleted_by: element.attribute("obsoletedby").filter(|o| !o.is_empty()).map(String::from),
            promoted_to: element.attribute("promotedto").filter(|p| !p.is_empty()).map(String::from),
            platform: platform.map(String::from),
            line,
        });
        for require in element.elements_named("require").filter(|r| is_vulkan_api(r)) {
            self.read_require(require, name, platform)?;
        }
        Ok(())
    }

    /// A `<require>` block of a feature or of a supported extension.
    fn read_require(&mut self, element: &Element, owner: &str, platform: Option<&str>) -> Result<()> {
        check_attributes(
            element,
            &[],
            &[("api", &[]), ("comment", &[]), ("depends", &[]), ("extension", &[]), ("feature", &[])],
        )?;
        check_elements(element, &[], &["command", "comment", "enum", "feature", "type"])?;
        for child in element.elements().filter(|c| is_vulkan_api(c)) {
            match child.name.as_str() {
                "command" => self.require_command(child, owner, platform)?,
                "enum" => self.require_enum(child)?,
                "type" => self.require_type(child, platform)?,
                _ => (),
            }
        }
        Ok(())
    }

    fn require_command(&mut self, element: &Element, owner: &str, platform: Option<&str>) -> Result<()> {
        check_attributes(element, &[("name", &[])], &[("comment", &[])])?;
        let name = attr(element, "name");
        let canonical = self.canonical_command(name)
            .ok_or_else(|| Error::spec(element.line, format!("required command <{}> is not listed", name)))?;
        let is_canonical = canonical == name;
        if let Some(command) = self.registry.commands.get_mut(&canonical) {
            command.referenced_in.get_or_insert_with(|| owner.to_owned());
            if let (true, Some(platform)) = (is_canonical, platform) {
                command.platform = Some(platform.to_owned());
            }
        }
        Ok(())
    }

    fn require_enum(&mut self, element: &Element) -> Result<()> {
        check_attributes(
            element,
            &[("name", &[])],
            &[("alias", &[]), ("api", &[]), ("bitpos", &[]), ("comment", &[]), ("deprecated", &[]), ("dir", &["-"]),
              ("extends", &[]), ("extnumber", &[]), ("offset", &[]), ("protect", &[]), ("type", &[]), ("value", &[])],
        )?;
        let extends = match element.attribute("extends") {
            Some(extends) => self.registry.resolve_type(extends).to_owned(),
            None => return Ok(()),
        };
        check!(self.registry.enums.contains_key(&extends), element.line, "extended enum <{}> is not listed", extends);

        let vk_value = attr(element, "name");
        match element.attribute("alias") {
            Some(target) => self.pending_aliases.push(PendingAlias {
                enum_name: extends,
                vk_value: vk_value.to_owned(),
                target: target.to_owned(),
                line: element.line,
            }),
            None => self.add_enum_value(&extends, vk_value, element.attribute("bitpos").is_some(), element.line)?,
        }
        Ok(())
    }

    fn require_type(&mut self, element: &Element, platform: Option<&str>) -> Result<()> {
        check_attributes(element, &[("name", &[])], &[("comment", &[])])?;
        let name = attr(element, "name");
        check!(self.registry.types.contains_key(name), element.line, "required type <{}> is not listed", name);
        if let Some(platform) = platform {
            self.set_platform(name, platform);
        }
        Ok(())
    }

    fn set_platform(&mut self, name: &str, platform: &str) {
        let name = self.registry.resolve_type(name).to_owned();
        let registry = &mut self.registry;
        let platform = Some(platform.to_owned());
        if let Some(bitmask) = registry.bitmasks.get_mut(&name) {
            bitmask.platform = platform.clone();
            if let Some(bits) = bitmask.requirements.as_ref().and_then(|r| registry.enums.get_mut(r)) {
                bits.platform = platform.clone();
            }
        }
        if let Some(data) = registry.enums.get_mut(&name) {
            data.platform = platform.clone();
        }
        if let Some(data) = registry.structures.get_mut(&name) {
            data.platform = platform.clone();
        }
        if let Some(data) = registry.handles.get_mut(&name) {
            data.platform = platform;
        }
    }

    fn canonical_command(&self, name: &str) -> Option<String> {
        if self.registry.commands.contains_key(name) {
            return Some(name.to_owned());
        }
        self.registry.commands.iter()
            .find(|(_, c)| c.aliases.contains(name))
            .map(|(canonical, _)| canonical.clone())
    }

    fn remove_require(&mut self, element: &Element) -> Result<()> {
        for child in element.elements() {
            let name = match child.attribute("name") {
                Some(name) => name,
                None => continue,
            };
            match child.name.as_str() {
                "command" => self.remove_command(name),
                "enum" => {
                    if let Some(extends) = child.attribute("extends") {
                        self.remove_enum_value(extends, name);
                    }
                }
                "type" => self.remove_type(name, child.line)?,
                _ => (),
            }
        }
        Ok(())
    }

    fn remove_command(&mut self, name: &str) {
        let registry = &mut self.registry;
        registry.command_to_handle.remove(name);
        let command = match registry.commands.remove(name) {
            Some(command) => command,
            None => {
                for command in registry.commands.values_mut() {
                    command.aliases.remove(name);
                }
                return;
            }
        };
        log::trace!("removing command <{}>", name);

        for alias in &command.aliases {
            registry.command_to_handle.remove(alias);
        }
        if let Some(handle) = registry.handles.get_mut(&command.handle) {
            handle.commands.remove(name);
        }

        let released: Vec<(String, Option<String>)> = registry.handles.iter()
            .filter(|(_, h)| h.delete_command.as_deref() == Some(name))
            .map(|(target, h)| (target.clone(), h.delete_owner.clone()))
            .collect();
        for (target, owner) in released {
            if let Some(data) = registry.handles.get_mut(&target) {
                data.delete_command = None;
                data.delete_pool = None;
                data.delete_owner = None;
            }
            if let Some(owner) = owner.and_then(|o| registry.handles.get_mut(&o)) {
                owner.children.remove(&target);
            }
        }
    }

    fn remove_enum_value(&mut self, extends: &str, vk_value: &str) {
        let enum_name = self.registry.resolve_type(extends).to_owned();
        let enum_name = enum_name.as_str();
        if let Some(data) = self.registry.enums.get_mut(enum_name) {
            data.values.retain(|v| v.vk_value != vk_value);
            data.aliases.retain(|a| a.vk_value != vk_value);
        }
        self.pending_aliases.retain(|a| a.enum_name != enum_name || a.vk_value != vk_value);
    }

    fn remove_type(&mut self, name: &str, line: u64) -> Result<()> {
        let registry = &mut self.registry;
        let mut removed = usize::from(registry.bitmasks.remove(name).is_some())
            + usize::from(registry.enums.remove(name).is_some())
            + usize::from(registry.structures.remove(name).is_some())
            + usize::from(registry.handles.remove(name).is_some());
        if let Some(target) = registry.structure_aliases.remove(name) {
            if let Some(data) = registry.structures.get_mut(&target) {
                data.aliases.remove(name);
            }
            removed += 1;
        }
        check!(removed <= 1, line, "type <{}> removed from more than one set", name);
        registry.types.remove(name);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        log::info!("resolving cross references");
        self.resolve_enum_aliases()?;
        self.complete_bitmasks();
        self.find_sub_structs();

        let aliases = &self.registry.structure_aliases;
        self.registry.extended_structs = self.registry.structures.values()
            .flat_map(|s| s.struct_extends.iter())
            .map(|name| aliases.get(name).unwrap_or(name).clone())
            .collect();
        Ok(())
    }

    /// Aliases may name values added by later extensions, so they are attached only now.
    fn resolve_enum_aliases(&mut self) -> Result<()> {
        let mut pending = std::mem::take(&mut self.pending_aliases);
        while !pending.is_empty() {
            let count = pending.len();
            let (ready, waiting): (Vec<_>, Vec<_>) = pending.into_iter().partition(|alias| {
                self.registry.enums.get(&alias.enum_name).map_or(false, |data| {
                    data.values.iter().any(|v| v.vk_value == alias.target)
                        || data.aliases.iter().any(|a| a.vk_value == alias.target)
                })
            });
            if waiting.len() == count {
                let alias = &waiting[0];
                return Err(Error::spec(alias.line, format!(
                    "enum value alias <{}> refers to unknown value <{}>", alias.vk_value, alias.target)));
            }
            for alias in ready {
                self.add_enum_alias(alias);
            }
            pending = waiting;
        }
        Ok(())
    }

    /// Gives every bitmask its FlagBits enum, synthesizing an empty one where the registry lists
    /// none, and marks those enums as bitmasks.
    fn complete_bitmasks(&mut self) {
        let registry = &mut self.registry;
        for (name, bitmask) in registry.bitmasks.iter_mut() {
            if bitmask.requirements.is_none() {
                let bits = match name.rfind("Flags") {
                    Some(pos) => format!("{}FlagBits{}", &name[..pos], &name[pos + "Flags".len()..]),
                    None => continue,
                };
                if !registry.types.contains_key(&bits) {
                    log::trace!("synthesizing <{}> for <{}>", bits, name);
                    registry.types.insert(bits.clone(), TypeData { category: TypeCategory::Enum, alias_of: None, line: bitmask.line });
                    registry.enums.insert(bits.clone(), EnumData {
                        platform: bitmask.platform.clone(),
                        line: bitmask.line,
                        ..EnumData::default()
                    });
                }
                bitmask.requirements = Some(bits);
            }
            if let Some(bits) = bitmask.requirements.as_ref().and_then(|r| registry.enums.get_mut(r)) {
                bits.is_bitmask = true;
            }
        }
    }

    fn find_sub_structs(&mut self) {
        let structures = &self.registry.structures;
        let found: Vec<(String, String)> = structures.iter()
            .filter(|(_, data)| !data.is_union)
            .filter_map(|(name, data)| {
                structures.iter()
                    .find(|&(other, candidate)| other != name && is_sub_struct(candidate, data))
                    .map(|(other, _)| (name.clone(), other.clone()))
            })
            .collect();
        for (name, sub_struct) in found {
            log::trace!("<{}> is a sub struct of <{}>", sub_struct, name);
            if let Some(data) = self.registry.structures.get_mut(&name) {
                data.sub_struct = Some(sub_struct);
            }
        }
    }
}

/// True if `candidate` is a strictly shorter, member-by-member prefix of `data`.
fn is_sub_struct(candidate: &StructureData, data: &StructureData) -> bool {
    !candidate.is_union
        && candidate.members.len() < data.members.len()
        && candidate.members.first().map_or(false, |m| m.name != "sType")
        && candidate.members.iter().zip(&data.members).all(|(c, m)| {
            c.type_info == m.type_info && c.name == m.name && c.array_sizes == m.array_sizes
        })
}

/// Prefix and postfix stripped from the raw values of an enum before they are camel-cased.
fn enum_affixes(enum_name: &str, is_bitmask: bool, tags: &BTreeSet<String>) -> (String, String) {
    if enum_name == RESULT_ENUM {
        return ("VK_".to_owned(), String::new());
    }

    let mut prefix = match enum_name.find("FlagBits") {
        Some(pos) if is_bitmask => {
            // `VkAccessFlagBits2` values read `VK_ACCESS_2_*`
            let version: String = enum_name[pos + "FlagBits".len()..].chars().take_while(char::is_ascii_digit).collect();
            let mut prefix = to_upper_case(&enum_name[..pos]) + "_";
            if !version.is_empty() {
                prefix.push_str(&version);
                prefix.push('_');
            }
            prefix
        }
        _ => to_upper_case(enum_name) + "_",
    };
    if let Some(tag) = tags.iter().find(|tag| prefix.ends_with(&format!("_{}_", tag))) {
        prefix.truncate(prefix.len() - tag.len() - 1);
        let postfix = format!("_{}", tag);
        return (prefix, postfix);
    }
    let postfix = find_tag(tags, enum_name, "").map(|tag| format!("_{}", tag)).unwrap_or_default();
    (prefix, postfix)
}

/// `VK_IMAGE_LAYOUT_PRESENT_SRC_KHR` of `VkImageLayout` -> `ePresentSrcKHR`
pub(super) fn enum_value_name(vk_value: &str, enum_name: &str, is_bitmask: bool, tags: &BTreeSet<String>) -> String {
    let (prefix, postfix) = enum_affixes(enum_name, is_bitmask, tags);
    let stripped = text::strip_postfix(text::strip_prefix(vk_value, &prefix), &postfix);

    let mut words: Vec<&str> = stripped.split('_').collect();
    if is_bitmask {
        if let Some(pos) = words.iter().rposition(|w| *w == "BIT") {
            words.remove(pos);
        }
    }
    let mut name = to_camel_case(&words.join("_"));

    let tag = find_tag(tags, vk_value, &postfix).or_else(|| find_tag(tags, vk_value, ""));
    if let Some(tag) = tag {
        let camel_tag = to_camel_case(tag);
        if name.ends_with(&camel_tag) {
            name.truncate(name.len() - camel_tag.len());
            name.push_str(tag);
        }
    }
    format!("e{}", name)
}

fn read_member(element: &Element) -> Result<MemberData> {
    check_attributes(
        element,
        &[],
        &[("altlen", &[]), ("api", &[]), ("deprecated", &[]), ("externsync", &[]), ("len", &[]), ("limittype", &[]),
          ("noautovalidity", &["true"]), ("objecttype", &[]), ("optional", &["false", "true"]), ("selection", &[]),
          ("selector", &[]), ("stride", &[]), ("values", &[])],
    )?;
    check_elements(element, &[("name", true), ("type", true)], &["comment", "enum"])?;
    let declaration = read_declaration(element)?;
    Ok(MemberData {
        type_info: declaration.type_info,
        name: declaration.name,
        array_sizes: declaration.array_sizes,
        bit_count: declaration.bit_count,
        values: element.attribute("values").map(String::from),
        line: element.line,
    })
}

fn read_param(element: &Element) -> Result<ParamData> {
    check_attributes(
        element,
        &[],
        &[("altlen", &[]), ("api", &[]), ("externsync", &[]), ("len", &[]), ("noautovalidity", &["true"]),
          ("objecttype", &[]), ("optional", &["false", "true"]), ("stride", &[]), ("validstructs", &[])],
    )?;
    check_elements(element, &[("name", true), ("type", true)], &[])?;
    let declaration = read_declaration(element)?;
    check!(declaration.bit_count.is_none(), element.line, "parameter <{}> has a bit count", declaration.name);
    Ok(ParamData {
        type_info: declaration.type_info,
        name: declaration.name,
        array_sizes: declaration.array_sizes,
        len: element.attribute("len").map(String::from),
        optional: element.attribute("optional").map_or(false, |o| o.starts_with("true")),
        line: element.line,
    })
}

/// Splits `const struct <type>T</type>* <name>n</name>[<enum>N</enum>]` into its parts.
fn read_declaration(element: &Element) -> Result<Declaration> {
    let (mut prefix, mut postfix, mut trailer) = (String::new(), String::new(), String::new());
    let (mut type_name, mut name) = (None, None);
    for node in &element.children {
        match *node {
            Node::Text(ref text) => match (&type_name, &name) {
                (None, _) => prefix.push_str(text),
                (Some(_), None) => postfix.push_str(text),
                (Some(_), Some(_)) => trailer.push_str(text),
            },
            Node::Element(ref child) => match child.name.as_str() {
                "type" => type_name = Some(child.text()),
                "name" => name = Some(child.text()),
                "enum" => trailer.push_str(&child.text()),
                _ => (),
            },
        }
    }
    let name = name.ok_or_else(|| Error::spec(element.line, format!("<{}> without a name", element.name)))?;

    let mut array_sizes = Vec::new();
    let mut bit_count = None;
    let mut rest = trailer.trim();
    if let Some(bits) = rest.strip_prefix(':') {
        bit_count = Some(bits.trim().to_owned());
        rest = "";
    }
    while let Some(open) = rest.strip_prefix('[') {
        let close = open.find(']')
            .ok_or_else(|| Error::spec(element.line, format!("unterminated array size of <{}>", name)))?;
        array_sizes.push(open[..close].trim().to_owned());
        rest = open[close + 1..].trim_start();
    }
    check!(rest.is_empty(), element.line, "unexpected text <{}> after <{}>", rest, name);

    Ok(Declaration {
        type_info: TypeInfo {
            prefix: prefix.split_whitespace().filter(|w| *w != "struct").collect::<Vec<_>>().join(" "),
            type_name: type_name.unwrap_or_default(),
            postfix: trim_stars(&postfix),
        },
        name,
        array_sizes,
        bit_count,
    })
}

fn attr<'e>(element: &'e Element, name: &str) -> &'e str {
    element.attribute(name).unwrap_or_default()
}

fn child_text(element: &Element, name: &str) -> String {
    element.first_element(name).map(|e| e.text().trim().to_owned()).unwrap_or_default()
}

fn codes(element: &Element, name: &str) -> Vec<String> {
    element.attribute(name).map(|c| tokenize(c, ',')).unwrap_or_default()
}

/// Elements tagged for other API variants only are skipped.
fn is_vulkan_api(element: &Element) -> bool {
    element.attribute("api").map_or(true, |api| api.split(',').any(|a| a.trim() == "vulkan"))
}
