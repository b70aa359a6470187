//! The in-memory model of the Vulkan registry. Every table is keyed by the raw API name (e.g.
//! `VkBufferCreateInfo` or `vkCreateBuffer`); rendered C++ names only exist in the generator.
mod check;
mod crawler;
mod dom;
mod validate;
pub mod command;

use std::collections::{BTreeMap, BTreeSet};

use crate::error::Result;
use crate::text::strip_prefix;

pub use self::command::{CommandShape, EnhancedReturn, ReturnShape};
pub use self::dom::{Element, Node};

/// Raw result-code enum every `VkResult` command reports through.
pub const RESULT_ENUM: &str = "VkResult";

#[derive(Debug, Default)]
pub struct Registry {
    pub base_types: BTreeMap<String, BaseTypeData>,
    pub bitmasks: BTreeMap<String, BitmaskData>,
    pub commands: BTreeMap<String, CommandData>,
    /// `API Constants`, name to value (or aliased constant).
    pub constants: BTreeMap<String, String>,
    pub defines: BTreeSet<String>,
    pub enums: BTreeMap<String, EnumData>,
    pub extensions: BTreeMap<String, ExtensionData>,
    pub features: BTreeMap<String, FeatureData>,
    pub func_pointers: BTreeMap<String, FuncPointerData>,
    /// Keyed by the handle type; the empty key holds the free functions.
    pub handles: BTreeMap<String, HandleData>,
    pub platforms: BTreeMap<String, PlatformData>,
    pub structures: BTreeMap<String, StructureData>,
    pub tags: BTreeSet<String>,
    /// Every known type name, aliases included.
    pub types: BTreeMap<String, TypeData>,

    /// Command (or command alias) to the handle owning it.
    pub command_to_handle: BTreeMap<String, String>,
    /// Structures some other structure may be chained onto.
    pub extended_structs: BTreeSet<String>,
    /// Structure alias to the aliased structure.
    pub structure_aliases: BTreeMap<String, String>,

    pub header_version: String,
    pub license_header: String,
    pub typesafe_check: String,
}

impl Registry {
    /// Reads a registry document, validating it element by element.
    pub fn new(vk_xml: &[u8]) -> Result<Registry> {
        let root = Element::parse(vk_xml)?;
        crawler::read(&root)
    }

    /// Follows alias links down to the canonical type name.
    pub fn resolve_type<'a>(&'a self, mut name: &'a str) -> &'a str {
        while let Some(target) = self.types.get(name).and_then(|t| t.alias_of.as_ref()) {
            name = target.as_str();
        }
        name
    }

    pub fn category(&self, name: &str) -> Option<TypeCategory> {
        self.types.get(self.resolve_type(name)).map(|t| t.category)
    }

    pub fn is_handle(&self, name: &str) -> bool {
        self.category(name) == Some(TypeCategory::Handle)
    }

    /// The preprocessor symbol guarding entities of the given platform.
    pub fn protect(&self, platform: Option<&String>) -> Option<&str> {
        platform.and_then(|p| self.platforms.get(p)).map(|p| p.protect.as_str())
    }

    /// Rendered name of a raw enum value (or value alias) of the given enum.
    pub fn enum_value_name(&self, enum_name: &str, vk_value: &str) -> Option<&str> {
        let data = self.enums.get(self.resolve_type(enum_name))?;
        data.values.iter()
            .find(|v| v.vk_value == vk_value)
            .map(|v| v.name.as_str())
            .or_else(|| data.aliases.iter().find(|a| a.vk_value == vk_value).map(|a| a.name.as_str()))
    }

    /// True for `VkDevice` and every handle that has it as an ancestor.
    pub fn is_device_handle(&self, handle: &str) -> bool {
        let mut pending = vec![self.resolve_type(handle)];
        let mut visited = BTreeSet::new();
        while let Some(current) = pending.pop() {
            if current == "VkDevice" {
                return true;
            }
            if visited.insert(current) {
                if let Some(data) = self.handles.get(current) {
                    pending.extend(data.parents.iter().map(|p| self.resolve_type(p)));
                }
            }
        }
        false
    }

    /// The structure a (possibly aliased) structure name refers to.
    pub fn structure(&self, name: &str) -> Option<(&str, &StructureData)> {
        let name = self.structure_aliases.get(name).map(String::as_str).unwrap_or(name);
        self.structures.get_key_value(name).map(|(k, v)| (k.as_str(), v))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCategory {
    BaseType,
    Bitmask,
    Define,
    Enum,
    FuncPointer,
    Handle,
    Include,
    /// Provided by an external header, like `uint32_t` or `Display`.
    Requires,
    Struct,
    Union,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeData {
    pub category: TypeCategory,
    pub alias_of: Option<String>,
    pub line: u64,
}

/// A type split into the text before it, its name and the pointer declarators after it,
/// e.g. `const` `char` `* const*`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeInfo {
    pub prefix: String,
    pub type_name: String,
    pub postfix: String,
}

impl TypeInfo {
    pub fn is_pointer(&self) -> bool {
        self.postfix.contains('*')
    }

    pub fn is_const_pointer(&self) -> bool {
        self.is_pointer() && self.prefix.contains("const")
    }

    pub fn is_non_const_pointer(&self) -> bool {
        self.is_pointer() && !self.prefix.contains("const")
    }

    pub fn is_value(&self) -> bool {
        !self.is_pointer()
    }

    /// Strips one pointer level. A `const` only survives if a pointer is left to qualify.
    pub fn pointee(&self) -> TypeInfo {
        let postfix = match self.postfix.rfind('*') {
            Some(pos) => self.postfix[..pos].trim_end().to_owned(),
            None => self.postfix.clone(),
        };
        let prefix = if postfix.is_empty() { String::new() } else { self.prefix.clone() };
        TypeInfo { prefix, type_name: self.type_name.clone(), postfix }
    }

    pub fn is_vk_type(&self) -> bool {
        self.type_name.starts_with("Vk")
    }

    /// The type name as it is spelled inside the wrapper namespace. The raw mask types stay as
    /// they are, `Flags` names the bitmask template there.
    pub fn pure_type(&self) -> &str {
        match self.type_name.as_str() {
            "VkFlags" | "VkFlags64" => &self.type_name,
            name => strip_vk(name),
        }
    }

    /// Full declaration type inside the wrapper namespace, e.g. `const BufferCreateInfo*`.
    pub fn compose(&self) -> String {
        compose(&self.prefix, self.pure_type(), &self.postfix)
    }

    /// Full declaration type as the C header spells it.
    pub fn compose_native(&self) -> String {
        compose(&self.prefix, &self.type_name, &self.postfix)
    }
}

fn compose(prefix: &str, type_name: &str, postfix: &str) -> String {
    let mut result = String::with_capacity(prefix.len() + type_name.len() + postfix.len() + 1);
    if !prefix.is_empty() {
        result.push_str(prefix);
        result.push(' ');
    }
    result.push_str(type_name);
    result.push_str(postfix);
    result
}

/// `VkBuffer` -> `Buffer`; names outside the API namespace are returned unchanged.
pub fn strip_vk(name: &str) -> &str {
    strip_prefix(name, "Vk")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseTypeData {
    /// Empty for opaque base types that only exist as a forward declaration.
    pub type_name: String,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitmaskData {
    /// The FlagBits enum holding the bit values. Filled in after all enums are read when
    /// the registry leaves it out.
    pub requirements: Option<String>,
    pub type_name: String,
    pub alias: Option<String>,
    pub platform: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValueData {
    pub vk_value: String,
    pub name: String,
    pub single_bit: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumAliasData {
    pub vk_value: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnumData {
    pub is_bitmask: bool,
    pub values: Vec<EnumValueData>,
    pub aliases: Vec<EnumAliasData>,
    pub alias: Option<String>,
    pub platform: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberData {
    pub type_info: TypeInfo,
    pub name: String,
    pub array_sizes: Vec<String>,
    pub bit_count: Option<String>,
    /// Fixed value of the member, used for `sType`.
    pub values: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureData {
    pub members: Vec<MemberData>,
    pub returned_only: bool,
    pub is_union: bool,
    pub struct_extends: Vec<String>,
    pub aliases: BTreeSet<String>,
    pub sub_struct: Option<String>,
    pub platform: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleData {
    pub parents: Vec<String>,
    pub children: BTreeSet<String>,
    pub commands: BTreeSet<String>,
    pub delete_command: Option<String>,
    pub delete_pool: Option<String>,
    /// The handle whose `childrenHandles` lists this one, empty for top-level objects.
    pub delete_owner: Option<String>,
    pub alias: Option<String>,
    pub platform: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamData {
    pub type_info: TypeInfo,
    pub name: String,
    pub array_sizes: Vec<String>,
    pub len: Option<String>,
    pub optional: bool,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandData {
    pub params: Vec<ParamData>,
    pub return_type: String,
    pub success_codes: Vec<String>,
    pub error_codes: Vec<String>,
    pub aliases: BTreeSet<String>,
    pub handle: String,
    pub shape: CommandShape,
    pub platform: Option<String>,
    pub referenced_in: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtensionData {
    pub number: String,
    pub requirements: BTreeSet<String>,
    pub deprecated_by: Option<String>,
    pub obsoleted_by: Option<String>,
    pub promoted_to: Option<String>,
    pub platform: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureData {
    pub number: String,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuncPointerData {
    pub requirements: Option<String>,
    pub line: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformData {
    pub protect: String,
    pub line: u64,
}
