//! Overload sets of the API commands.
//!
//! Every command gets its native-shaped signature. On top of that the enhanced variants its
//! return shape calls for are emitted: references instead of pointers, `ArrayProxy` instead
//! of pointer and count, the return parameter turned into the return value. Variants that
//! would collide with the native signature are split by the preprocessor switches that
//! disable them.
use std::collections::BTreeSet;
use std::fmt::Write;

use super::{close_protect, open_protect};
use crate::error::Result;
use crate::registry::{strip_vk, CommandData, EnhancedReturn, ParamData, Registry, ReturnShape, TypeCategory, TypeInfo,
                      RESULT_ENUM};
use crate::text::{reduce_name, singular, start_lower_case, start_upper_case, strip_prefix};

const DISABLE_ENHANCED: &str = "VULKAN_HPP_DISABLE_ENHANCED_MODE";
const NO_SMART_HANDLE: &str = "VULKAN_HPP_NO_SMART_HANDLE";

/// The members an overload set may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Variant {
    /// Mirrors the native signature.
    Standard,
    Enhanced,
    /// Creates one object out of a call that takes a sequence.
    EnhancedSingular,
    /// Hands the created object back wrapped in a `UniqueHandle`.
    EnhancedUnique,
    EnhancedUniqueSingular,
    /// Returns the queried structure together with the structures chained onto it.
    EnhancedStructureChain,
}

impl Variant {
    fn is_singular(self) -> bool {
        matches!(self, Variant::EnhancedSingular | Variant::EnhancedUniqueSingular)
    }

    fn is_unique(self) -> bool {
        matches!(self, Variant::EnhancedUnique | Variant::EnhancedUniqueSingular)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Arg {
    ty: String,
    name: String,
    /// Array declarators following the name.
    suffix: String,
    default: Option<String>,
}

impl Arg {
    fn new<T: Into<String>, N: Into<String>>(ty: T, name: N) -> Arg {
        Arg { ty: ty.into(), name: name.into(), suffix: String::new(), default: None }
    }

    fn with_default(mut self, default: &str) -> Arg {
        self.default = Some(default.to_owned());
        self
    }

    fn declaration(&self, with_default: bool) -> String {
        match self.default {
            Some(ref default) if with_default => format!("{} {}{} = {}", self.ty, self.name, self.suffix, default),
            _ => format!("{} {}{}", self.ty, self.name, self.suffix),
        }
    }
}

#[derive(Debug, Clone)]
struct Function {
    /// Template parameter declarations and their defaults.
    templates: Vec<(String, Option<String>)>,
    return_type: String,
    name: String,
    args: Vec<Arg>,
    body: String,
}

impl Function {
    fn new(name: String, templates: Vec<(String, Option<String>)>, mut args: Vec<Arg>, return_type: String, body: String) -> Function {
        args.push(Arg::new("Dispatch const &", "d").with_default("Dispatch()"));
        // only trailing arguments may keep their defaults
        let mut trailing = true;
        for arg in args.iter_mut().rev() {
            trailing &= arg.default.is_some();
            if !trailing {
                arg.default = None;
            }
        }
        Function { templates, return_type, name, args, body }
    }

    /// Template and argument types, the part of the signature overloads are resolved on.
    fn signature(&self) -> (Vec<&str>, Vec<String>) {
        let templates = self.templates.iter().map(|(t, _)| t.as_str()).collect();
        let args = self.args.iter().map(|a| format!("{}{}", a.ty, a.suffix)).collect();
        (templates, args)
    }

    fn template_line(&self, with_defaults: bool) -> String {
        let params: Vec<String> = self.templates.iter()
            .map(|(param, default)| match *default {
                Some(ref default) if with_defaults => format!("{} = {}", param, default),
                _ => param.clone(),
            })
            .collect();
        format!("template<{}>", params.join(", "))
    }

    fn args_line(&self, with_defaults: bool) -> String {
        let args: Vec<String> = self.args.iter().map(|a| a.declaration(with_defaults)).collect();
        args.join(", ")
    }

    fn declare(&self, out: &mut String, member: bool) -> Result<()> {
        let indent = if member { "    " } else { "  " };
        writeln!(out, "{}{}", indent, self.template_line(true))?;
        writeln!(out, "{}{} {}( {} ){};", indent, self.return_type, self.name, self.args_line(true),
                 if member { " const" } else { "" })?;
        Ok(())
    }

    fn define(&self, out: &mut String, class: &str) -> Result<()> {
        writeln!(out, "  {}", self.template_line(false))?;
        if class.is_empty() {
            writeln!(out, "  VULKAN_HPP_INLINE {} {}( {} )", self.return_type, self.name, self.args_line(false))?;
        } else {
            writeln!(out, "  VULKAN_HPP_INLINE {} {}::{}( {} ) const", self.return_type, class, self.name,
                     self.args_line(false))?;
        }
        out.push_str("  {\n");
        out.push_str(&self.body);
        out.push_str("  }\n");
        Ok(())
    }
}

enum Entry {
    Directive(String),
    Function(Function),
}

fn dispatch_template() -> (String, Option<String>) {
    ("typename Dispatch".to_owned(), Some("DispatchLoaderStatic".to_owned()))
}

/// How an enhanced signature passes a parameter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Param {
    /// The handle the method is called on.
    This,
    /// Handed back to the caller.
    Return,
    /// Count filled in by the first call of a two-step query.
    QueriedCount,
    /// Count taken from the size of the vector at the index.
    CountOf(usize),
    Vector,
    String,
    ConstRef,
    OptionalRef,
    OutRef,
    /// Passed the way the native signature takes it.
    Plain,
}

/// The deleter a unique variant hands its objects to.
#[derive(Debug, Clone)]
struct Deleter {
    ty: String,
    args: String,
}

struct CommandContext<'r> {
    registry: &'r Registry,
    command: &'r CommandData,
    /// Entry point called through the dispatcher; the command's own name or one of its aliases.
    vk_name: &'r str,
    /// Owning class, empty for free functions.
    class: &'r str,
    name: String,
    returns: ReturnShape,
    unique: Option<Deleter>,
}

impl<'r> CommandContext<'r> {
    fn new(registry: &'r Registry, command: &'r CommandData, vk_name: &'r str, name: Option<&str>) -> CommandContext<'r> {
        let class = strip_vk(&command.handle);
        let mut context = CommandContext {
            registry,
            command,
            vk_name,
            class,
            name: name.map_or_else(|| reduced_name(vk_name, class), String::from),
            returns: command.return_shape(),
            unique: None,
        };
        context.unique = context.unique_deleter();
        context
    }

    fn params(&self) -> &'r [ParamData] {
        &self.command.params
    }

    fn is_member(&self) -> bool {
        !self.class.is_empty()
    }

    fn classify(&self, index: usize) -> Param {
        let shape = &self.command.shape;
        let param = &self.params()[index];
        let ty = &param.type_info;
        if index == 0 && self.is_member() {
            return Param::This;
        }
        if self.returns.return_param == Some(index) {
            return Param::Return;
        }
        if shape.is_length_param(index) {
            let returned_len = self.returns.return_param.and_then(|r| shape.vector_params.get(&r).copied().flatten());
            if ty.is_pointer() && shape.two_step && returned_len == Some(index) {
                return Param::QueriedCount;
            }
            if ty.is_value() {
                return self.count_source(index).map_or(Param::Plain, Param::CountOf);
            }
        }
        if let Some(len) = shape.vector_params.get(&index) {
            let is_string = ty.type_name == "char" && ty.postfix == "*" && len.is_none()
                && param.len.as_deref() == Some("null-terminated");
            return if is_string { Param::String } else { Param::Vector };
        }
        if !param.array_sizes.is_empty() || ty.type_name == "void" || ty.postfix.contains("**") {
            return Param::Plain;
        }
        if ty.is_const_pointer() && ty.type_name != "char" {
            return if param.optional { Param::OptionalRef } else { Param::ConstRef };
        }
        if ty.is_non_const_pointer() {
            return Param::OutRef;
        }
        Param::Plain
    }

    /// The vector an implicit count is taken from. Required vectors are preferred, as an
    /// optional one may legally be empty.
    fn count_source(&self, index: usize) -> Option<usize> {
        let sources: Vec<usize> = self.command.shape.vector_params.iter()
            .filter(|&(&v, &len)| len == Some(index) && Some(v) != self.returns.return_param)
            .map(|(&v, _)| v)
            .collect();
        sources.iter().copied()
            .find(|&v| !self.params()[v].optional)
            .or_else(|| sources.first().copied())
    }

    /// Vectors sized by the same count as the returned vector.
    fn is_companion(&self, index: usize) -> bool {
        let vectors = &self.command.shape.vector_params;
        match self.returns.return_param.and_then(|r| vectors.get(&r)) {
            Some(&Some(len)) => vectors.get(&index) == Some(&Some(len)),
            _ => false,
        }
    }

    fn is_template_param(&self, index: usize) -> bool {
        self.command.shape.template_param == Some(index) && self.returns.return_param != Some(index)
    }

    fn singular_name(&self, name: &str) -> String {
        singular(name, &self.registry.tags)
    }

    fn variant_name(&self, variant: Variant) -> String {
        match variant {
            Variant::Standard | Variant::Enhanced | Variant::EnhancedStructureChain => self.name.clone(),
            Variant::EnhancedSingular => self.singular_name(&self.name),
            Variant::EnhancedUnique => format!("{}Unique", self.name),
            Variant::EnhancedUniqueSingular => format!("{}Unique", self.singular_name(&self.name)),
        }
    }

    /// Names the local holding the returned value.
    fn return_local(&self, variant: Variant) -> String {
        let name = self.returns.return_param
            .map(|r| reduce_name(&self.params()[r].name))
            .unwrap_or_default();
        if variant.is_singular() { self.singular_name(&name) } else { name }
    }

    fn message(&self, variant: Variant) -> String {
        if self.is_member() {
            format!("VULKAN_HPP_NAMESPACE_STRING\"::{}::{}\"", self.class, self.variant_name(variant))
        } else {
            format!("VULKAN_HPP_NAMESPACE_STRING\"::{}\"", self.variant_name(variant))
        }
    }

    /// `Result::eX` for every success code.
    fn success_codes(&self) -> String {
        let codes: Vec<String> = self.command.success_codes.iter()
            .map(|code| {
                let name = self.registry.enum_value_name(RESULT_ENUM, code).unwrap_or(code.as_str());
                format!("Result::{}", name)
            })
            .collect();
        codes.join(", ")
    }

    /// The pointed-to type of a sequence parameter, keeping its constness.
    fn element(&self, index: usize) -> TypeInfo {
        let ty = &self.params()[index].type_info;
        let pointee = ty.pointee();
        TypeInfo { prefix: ty.prefix.clone(), ..pointee }
    }

    /// Element type of the `ArrayProxy` standing in for a sequence parameter.
    fn proxy_element(&self, index: usize) -> String {
        let element = self.element(index);
        let constness = if element.prefix.contains("const") { "const " } else { "" };
        if self.is_template_param(index) {
            format!("{}T", constness)
        } else if element.type_name == "void" && element.postfix.is_empty() {
            format!("{}uint8_t", constness)
        } else {
            element.compose()
        }
    }

    fn pure_type(&self, index: usize) -> &'r str {
        self.params()[index].type_info.pure_type()
    }
}

/// `vkGetPhysicalDeviceProperties` of `PhysicalDevice` -> `getProperties`
fn reduced_name(vk_name: &str, class: &str) -> String {
    let full = start_lower_case(strip_prefix(vk_name, "vk"));
    if class.is_empty() {
        return full;
    }
    let lowered = start_lower_case(class);
    let found = full.find(class).map(|pos| (pos, class.len()))
        .or_else(|| full.find(&lowered).map(|pos| (pos, lowered.len())));
    let (reduced, at_start) = match found {
        Some((pos, len)) => {
            let mut reduced = full.clone();
            reduced.replace_range(pos..pos + len, "");
            (reduced, pos == 0)
        }
        None if class == "CommandBuffer" && full.starts_with("cmd") => (full[3..].to_owned(), true),
        None => return full,
    };
    if at_start { start_lower_case(&reduced) } else { reduced }
}

/// Hands `expr`, a pointer to `pointee`, to the native API.
fn native_pointer(pointee: &TypeInfo, expr: &str) -> String {
    if pointee.is_vk_type() {
        format!("reinterpret_cast<{}*>( {} )", pointee.compose_native(), expr)
    } else {
        expr.to_owned()
    }
}

impl<'r> CommandContext<'r> {
    fn plain_arg(&self, param: &ParamData) -> Arg {
        let mut arg = Arg::new(param.type_info.compose(), param.name.clone());
        arg.suffix = param.array_sizes.iter().map(|size| format!("[{}]", size)).collect();
        arg
    }

    /// Passes a parameter declared as in `plain_arg` to the native API.
    fn plain_call(&self, param: &ParamData) -> String {
        let ty = &param.type_info;
        let name = param.name.as_str();
        if !ty.is_vk_type() {
            return name.to_owned();
        }
        if ty.is_pointer() {
            return format!("reinterpret_cast<{}>( {} )", ty.compose_native(), name);
        }
        if !param.array_sizes.is_empty() {
            return format!("reinterpret_cast<{}*>( {} )", ty.compose_native(), name);
        }
        match self.registry.category(&ty.type_name) {
            Some(TypeCategory::Enum) | Some(TypeCategory::Bitmask) | Some(TypeCategory::Handle) => {
                format!("static_cast<{}>( {} )", ty.type_name, name)
            }
            Some(TypeCategory::Struct) | Some(TypeCategory::Union) => {
                format!("*reinterpret_cast<const {}*>( &{} )", ty.type_name, name)
            }
            _ => name.to_owned(),
        }
    }

    fn this_call(&self) -> String {
        format!("m_{}", start_lower_case(self.class))
    }

    fn standard_args(&self) -> Vec<Arg> {
        self.params().iter().enumerate()
            .filter(|&(i, _)| i != 0 || !self.is_member())
            .map(|(_, p)| self.plain_arg(p))
            .collect()
    }

    fn standard_call(&self) -> String {
        let args: Vec<String> = self.params().iter().enumerate()
            .map(|(i, p)| if i == 0 && self.is_member() { self.this_call() } else { self.plain_call(p) })
            .collect();
        format!("d.{}( {} )", self.vk_name, args.join(", "))
    }

    fn enhanced_args(&self, variant: Variant) -> Vec<Arg> {
        let mut args = Vec::with_capacity(self.params().len());
        for (i, param) in self.params().iter().enumerate() {
            let name = reduce_name(&param.name);
            let arg = match self.classify(i) {
                Param::This | Param::Return | Param::QueriedCount | Param::CountOf(_) => continue,
                Param::Vector if variant.is_singular() && self.is_companion(i) => {
                    Arg::new(format!("{} &", self.proxy_element(i)), self.singular_name(&name))
                }
                Param::Vector => {
                    let arg = Arg::new(format!("ArrayProxy<{}>", self.proxy_element(i)), name);
                    if param.optional { arg.with_default("nullptr") } else { arg }
                }
                Param::String if param.optional => Arg::new("Optional<const std::string>", name).with_default("nullptr"),
                Param::String => Arg::new("const std::string &", name),
                Param::ConstRef => Arg::new(format!("const {} &", self.pure_type(i)), name),
                Param::OptionalRef => Arg::new(format!("Optional<const {}>", self.pure_type(i)), name).with_default("nullptr"),
                Param::OutRef => Arg::new(format!("{} &", param.type_info.pointee().compose()), name),
                Param::Plain => self.plain_arg(param),
            };
            args.push(arg);
        }
        args
    }

    /// The dispatcher call of an enhanced variant. `query` leaves the returned sequence out,
    /// as the first call of a two-step command does.
    fn enhanced_call(&self, variant: Variant, query: bool) -> String {
        let singular = variant.is_singular();
        let mut args = Vec::with_capacity(self.params().len());
        for (i, param) in self.params().iter().enumerate() {
            let name = reduce_name(&param.name);
            let arg = match self.classify(i) {
                Param::This => self.this_call(),
                Param::Return if query => "nullptr".to_owned(),
                Param::Return => {
                    let local = self.return_local(variant);
                    match self.returns.kind {
                        EnhancedReturn::Vector(ref element) if !singular => {
                            native_pointer(element, &format!("{}.data()", local))
                        }
                        EnhancedReturn::Value(ref element) | EnhancedReturn::Vector(ref element) => {
                            native_pointer(element, &format!("&{}", local))
                        }
                        _ => format!("&{}", local),
                    }
                }
                Param::QueriedCount => format!("&{}", name),
                Param::CountOf(_) if singular && self.returns.return_param
                    .map_or(false, |r| self.command.shape.vector_params.get(&r) == Some(&Some(i))) => "1".to_owned(),
                Param::CountOf(source) => {
                    let source_name = reduce_name(&self.params()[source].name);
                    if self.is_template_param(source) {
                        format!("{}.size() * sizeof( T )", source_name)
                    } else {
                        format!("{}.size()", source_name)
                    }
                }
                Param::Vector if singular && self.is_companion(i) => {
                    native_pointer(&self.element(i), &format!("&{}", self.singular_name(&name)))
                }
                Param::Vector => {
                    let element = self.element(i);
                    if self.is_template_param(i) || element.type_name == "void" {
                        format!("{}.data()", name)
                    } else {
                        native_pointer(&element, &format!("{}.data()", name))
                    }
                }
                Param::String if param.optional => format!("{0} ? {0}->c_str() : nullptr", name),
                Param::String => format!("{}.c_str()", name),
                Param::ConstRef => native_pointer(&self.element(i), &format!("&{}", name)),
                Param::OptionalRef => {
                    let pure = self.pure_type(i);
                    native_pointer(&self.element(i), &format!("static_cast<const {}*>( {} )", pure, name))
                }
                Param::OutRef => native_pointer(&param.type_info.pointee(), &format!("&{}", name)),
                Param::Plain => self.plain_call(param),
            };
            args.push(arg);
        }
        format!("d.{}( {} )", self.vk_name, args.join(", "))
    }

    /// Number of elements of a returned sequence that is not queried first.
    fn return_size(&self) -> String {
        let index = match self.returns.return_param {
            Some(index) => index,
            None => return "0".to_owned(),
        };
        if let Some(&Some(len)) = self.command.shape.vector_params.get(&index) {
            return match self.classify(len) {
                Param::CountOf(source) => format!("{}.size()", reduce_name(&self.params()[source].name)),
                _ => self.params()[len].name.clone(),
            };
        }
        let len = self.params()[index].len.as_deref().unwrap_or_default();
        let len = len.split(',').next().unwrap_or_default().trim();
        let member_of = len.split_once("::").or_else(|| len.split_once("->"));
        match member_of {
            Some((owner, member)) => {
                let owner_index = self.params().iter().position(|p| p.name == owner);
                let arrow = owner_index.map_or(false, |o| self.classify(o) == Param::OptionalRef);
                format!("{}{}{}", reduce_name(owner), if arrow { "->" } else { "." }, member)
            }
            None => len.to_owned(),
        }
    }

    /// Runtime checks that sequences sharing a count agree on their size.
    fn size_checks(&self, variant: Variant) -> Result<String> {
        let mut checks = String::new();
        if variant.is_singular() {
            return Ok(checks);
        }
        for i in 0..self.params().len() {
            let source = match self.classify(i) {
                Param::CountOf(source) => source,
                _ => continue,
            };
            let source_name = reduce_name(&self.params()[source].name);
            for (&other, _) in self.command.shape.vector_params.iter()
                .filter(|&(&v, &len)| len == Some(i) && v != source && Some(v) != self.returns.return_param)
            {
                let other_name = reduce_name(&self.params()[other].name);
                let (condition, assertion) = if self.params()[other].optional {
                    (format!("!{1}.empty() && ( {0}.size() != {1}.size() )", source_name, other_name),
                     format!("{1}.empty() || ( {0}.size() == {1}.size() )", source_name, other_name))
                } else {
                    (format!("{}.size() != {}.size()", source_name, other_name),
                     format!("{}.size() == {}.size()", source_name, other_name))
                };
                writeln!(checks, "#ifdef VULKAN_HPP_NO_EXCEPTIONS")?;
                writeln!(checks, "    VULKAN_HPP_ASSERT( {} );", assertion)?;
                writeln!(checks, "#else")?;
                writeln!(checks, "    if ( {} )", condition)?;
                writeln!(checks, "    {{")?;
                let message = self.message(variant);
                writeln!(checks, "      throw LogicError( {}: {}.size() != {}.size()\" );",
                         strip_quote(&message), source_name, other_name)?;
                writeln!(checks, "    }}")?;
                writeln!(checks, "#endif  /*VULKAN_HPP_NO_EXCEPTIONS*/")?;
            }
        }
        Ok(checks)
    }
}

/// Drops the closing quote of a string literal so more text can be appended to it.
fn strip_quote(literal: &str) -> &str {
    literal.strip_suffix('"').unwrap_or(literal)
}

impl<'r> CommandContext<'r> {
    /// The deleter of the handle a create command returns, if it gets unique variants at all.
    fn unique_deleter(&self) -> Option<Deleter> {
        let element = match self.returns.kind {
            EnhancedReturn::Value(ref element) | EnhancedReturn::Vector(ref element) => element,
            _ => return None,
        };
        let creates = ["vkCreate", "vkAllocate", "vkRegister"].iter().any(|p| self.vk_name.starts_with(p));
        if !creates || !self.command.returns_result() || self.returns.result_pairing || self.command.shape.two_step
            || !element.postfix.is_empty()
        {
            return None;
        }
        let handle_name = self.registry.resolve_type(&element.type_name);
        let handle = self.registry.handles.get(handle_name)?;
        let ty = self.registry.deleter_type(handle_name)?;

        let owner = handle.delete_owner.as_deref().unwrap_or_default();
        let mut args = Vec::with_capacity(3);
        if !owner.is_empty() {
            if self.command.handle != owner {
                log::warn!("<{}> creates <{}> outside of its owner <{}>, no unique variant", self.vk_name, handle_name, owner);
                return None;
            }
            args.push("*this".to_owned());
        }
        match handle.delete_pool {
            Some(ref pool) => args.push(self.pool_expression(pool)?),
            None => {
                let allocator = self.params().iter()
                    .find(|p| p.type_info.type_name == "VkAllocationCallbacks")
                    .map_or_else(|| "nullptr".to_owned(), |p| reduce_name(&p.name));
                args.push(allocator);
            }
        }
        args.push("d".to_owned());
        Some(Deleter { ty, args: args.join(", ") })
    }

    /// Where the pool a created object is freed to can be read from.
    fn pool_expression(&self, pool: &str) -> Option<String> {
        let pool = self.registry.resolve_type(pool);
        for (i, param) in self.params().iter().enumerate() {
            let ty = &param.type_info;
            if ty.is_value() && self.registry.resolve_type(&ty.type_name) == pool {
                return Some(param.name.clone());
            }
            let access = match self.classify(i) {
                Param::ConstRef => ".",
                Param::OptionalRef => "->",
                _ => continue,
            };
            let member = self.registry.structure(&ty.type_name)
                .and_then(|(_, s)| s.members.iter().find(|m| {
                    m.type_info.is_value() && self.registry.resolve_type(&m.type_info.type_name) == pool
                }));
            if let Some(member) = member {
                return Some(format!("{}{}{}", reduce_name(&param.name), access, member.name));
            }
        }
        log::warn!("<{}> does not name the pool <{}> its objects are freed to, no unique variant", self.vk_name, pool);
        None
    }

    fn has_singular(&self) -> bool {
        let index = match (self.returns.return_param, &self.returns.kind) {
            (Some(index), EnhancedReturn::Vector(_)) if !self.command.shape.two_step => index,
            _ => return false,
        };
        let sized_by_input = match self.command.shape.vector_params.get(&index) {
            Some(&Some(len)) => matches!(self.classify(len), Param::CountOf(source) if !self.is_template_param(source)),
            _ => false,
        };
        sized_by_input && self.singular_name(&self.name) != self.name
    }

    fn has_structure_chain(&self) -> bool {
        match self.returns.kind {
            EnhancedReturn::Value(ref element) => {
                element.postfix.is_empty()
                    && self.registry.structure(&element.type_name)
                        .map_or(false, |(name, _)| self.registry.extended_structs.contains(name))
            }
            _ => false,
        }
    }

    fn standard(&self) -> Result<Function> {
        let call = self.standard_call();
        let return_type = strip_vk(&self.command.return_type).to_owned();
        let mut body = String::new();
        native_return(&mut body, &self.command.return_type, &call)?;
        Ok(Function::new(self.variant_name(Variant::Standard), vec![dispatch_template()], self.standard_args(),
                         return_type, body))
    }

    fn enhanced(&self, variant: Variant) -> Result<Function> {
        let mut templates = Vec::new();
        if self.command.shape.template_param.map_or(false, |t| self.is_template_param(t)) {
            templates.push(("typename T".to_owned(), None));
        }
        let args = self.enhanced_args(variant);
        let mut body = self.size_checks(variant)?;
        let return_type = match self.returns.kind {
            EnhancedReturn::Void => {
                writeln!(body, "    Result result = static_cast<Result>( {} );", self.enhanced_call(variant, false))?;
                writeln!(body, "    return createResultValue( result, {} );", self.message(variant))?;
                "ResultValueType<void>::type".to_owned()
            }
            EnhancedReturn::Native(ref native) if native == RESULT_ENUM => {
                writeln!(body, "    Result result = static_cast<Result>( {} );", self.enhanced_call(variant, false))?;
                writeln!(body, "    return createResultValue( result, {}, {{ {} }} );", self.message(variant),
                         self.success_codes())?;
                "Result".to_owned()
            }
            EnhancedReturn::Native(ref native) => {
                native_return(&mut body, native, &self.enhanced_call(variant, false))?;
                strip_vk(native).to_owned()
            }
            EnhancedReturn::Value(ref element) => self.value_body(&mut body, variant, element, &mut templates)?,
            EnhancedReturn::Vector(ref element) if variant.is_singular() => {
                self.value_body(&mut body, variant, element, &mut templates)?
            }
            EnhancedReturn::Vector(ref element) if self.command.shape.two_step => {
                self.two_step_body(&mut body, variant, element, &mut templates)?
            }
            EnhancedReturn::Vector(ref element) => self.vector_body(&mut body, variant, element, &mut templates)?,
        };
        if !templates.iter().any(|(t, _)| t == "typename Dispatch") {
            templates.push(dispatch_template());
        }
        Ok(Function::new(self.variant_name(variant), templates, args, return_type, body))
    }
}

/// Returns what the native call returns, converted into the wrapper's types.
fn native_return(body: &mut String, native: &str, call: &str) -> Result<()> {
    if native == "void" {
        writeln!(body, "    {};", call)?;
    } else if native.starts_with("Vk") {
        writeln!(body, "    return static_cast<{}>( {} );", strip_vk(native), call)?;
    } else {
        writeln!(body, "    return {};", call)?;
    }
    Ok(())
}

/// Sequences of untyped memory are handed out as bytes.
fn vector_element(element: &TypeInfo) -> String {
    if element.type_name == "void" && element.postfix.is_empty() {
        "uint8_t".to_owned()
    } else {
        element.compose()
    }
}

type Templates = Vec<(String, Option<String>)>;

impl<'r> CommandContext<'r> {
    /// Returns a single object, filled in through the return parameter.
    fn value_body(&self, body: &mut String, variant: Variant, element: &TypeInfo, templates: &mut Templates)
        -> Result<String>
    {
        let local = self.return_local(variant);
        let data_type = vector_element(element);
        let call = self.enhanced_call(variant, false);
        let message = self.message(variant);
        let (value_type, data) = if variant == Variant::EnhancedStructureChain {
            templates.extend(["typename X", "typename Y", "typename... Z"].iter().map(|t| (t.to_string(), None)));
            writeln!(body, "    StructureChain<X, Y, Z...> structureChain;")?;
            writeln!(body, "    {0} & {1} = structureChain.template get<{0}>();", data_type, local)?;
            ("StructureChain<X, Y, Z...>".to_owned(), "structureChain".to_owned())
        } else {
            writeln!(body, "    {} {};", data_type, local)?;
            (data_type.clone(), local.clone())
        };

        if !self.command.returns_result() {
            writeln!(body, "    {};", call)?;
            writeln!(body, "    return {};", data)?;
            return Ok(value_type);
        }
        writeln!(body, "    Result result = static_cast<Result>( {} );", call)?;
        if let (true, Some(deleter)) = (variant.is_unique(), self.unique.as_ref()) {
            writeln!(body, "    {} deleter( {} );", deleter.ty, deleter.args)?;
            writeln!(body, "    return createResultValue<{},Dispatch>( result, {}, {}, deleter );", data_type, local,
                     message)?;
            return Ok(format!("typename ResultValueType<UniqueHandle<{},Dispatch>>::type", data_type));
        }
        if self.returns.result_pairing {
            writeln!(body, "    return createResultValue( result, {}, {}, {{ {} }} );", data, message,
                     self.success_codes())?;
            return Ok(format!("ResultValue<{}>", value_type));
        }
        writeln!(body, "    return createResultValue( result, {}, {} );", data, message)?;
        Ok(format!("typename ResultValueType<{}>::type", value_type))
    }

    /// Returns a sequence whose size is known before the call.
    fn vector_body(&self, body: &mut String, variant: Variant, element: &TypeInfo, templates: &mut Templates)
        -> Result<String>
    {
        let local = self.return_local(variant);
        let element_type = vector_element(element);
        let call = self.enhanced_call(variant, false);
        let message = self.message(variant);
        let size = self.return_size();

        if let (true, Some(deleter)) = (variant.is_unique(), self.unique.as_ref()) {
            let unique_type = format!("UniqueHandle<{},Dispatch>", element_type);
            let unique_local = format!("unique{}", start_upper_case(&local));
            templates.push(dispatch_template());
            templates.push(("typename Allocator".to_owned(), Some(format!("std::allocator<{}>", unique_type))));
            writeln!(body, "    std::vector<{},Allocator> {};", unique_type, unique_local)?;
            writeln!(body, "    std::vector<{}> {}( {} );", element_type, local, size)?;
            writeln!(body, "    Result result = static_cast<Result>( {} );", call)?;
            writeln!(body, "    if ( result == Result::eSuccess )")?;
            writeln!(body, "    {{")?;
            writeln!(body, "      {}.reserve( {}.size() );", unique_local, local)?;
            writeln!(body, "      {} deleter( {} );", deleter.ty, deleter.args)?;
            writeln!(body, "      for ( size_t i = 0; i < {}.size(); i++ )", local)?;
            writeln!(body, "      {{")?;
            writeln!(body, "        {}.push_back( {}( {}[i], deleter ) );", unique_local, unique_type, local)?;
            writeln!(body, "      }}")?;
            writeln!(body, "    }}")?;
            writeln!(body, "    return createResultValue( result, {}, {} );", unique_local, message)?;
            return Ok(format!("typename ResultValueType<std::vector<{},Allocator>>::type", unique_type));
        }

        templates.push(("typename Allocator".to_owned(), Some(format!("std::allocator<{}>", element_type))));
        let vector_type = format!("std::vector<{},Allocator>", element_type);
        writeln!(body, "    {} {}( {} );", vector_type, local, size)?;
        if !self.command.returns_result() {
            writeln!(body, "    {};", call)?;
            writeln!(body, "    return {};", local)?;
            return Ok(vector_type);
        }
        writeln!(body, "    Result result = static_cast<Result>( {} );", call)?;
        if self.returns.result_pairing {
            writeln!(body, "    return createResultValue( result, {}, {}, {{ {} }} );", local, message,
                     self.success_codes())?;
            return Ok(format!("ResultValue<{}>", vector_type));
        }
        writeln!(body, "    return createResultValue( result, {}, {} );", local, message)?;
        Ok(format!("typename ResultValueType<{}>::type", vector_type))
    }

    /// Returns a sequence whose size is queried by a first call without it.
    fn two_step_body(&self, body: &mut String, variant: Variant, element: &TypeInfo, templates: &mut Templates)
        -> Result<String>
    {
        let count = self.returns.return_param
            .and_then(|r| self.command.shape.vector_params.get(&r).copied().flatten())
            .map(|c| &self.params()[c]);
        let count = match count {
            Some(count) if count.type_info.is_pointer() => count,
            _ => return self.vector_body(body, variant, element, templates),
        };
        let local = self.return_local(variant);
        let element_type = vector_element(element);
        let message = self.message(variant);
        let count_name = reduce_name(&count.name);
        let query = self.enhanced_call(variant, true);
        let fill = self.enhanced_call(variant, false);

        templates.push(("typename Allocator".to_owned(), Some(format!("std::allocator<{}>", element_type))));
        let vector_type = format!("std::vector<{},Allocator>", element_type);
        writeln!(body, "    {} {};", vector_type, local)?;
        writeln!(body, "    {} {};", count.type_info.pointee().compose(), count_name)?;

        if !self.command.returns_result() {
            writeln!(body, "    {};", query)?;
            writeln!(body, "    {}.resize( {} );", local, count_name)?;
            writeln!(body, "    {};", fill)?;
            writeln!(body, "    return {};", local)?;
            return Ok(vector_type);
        }
        if self.command.success_codes.iter().any(|c| c == "VK_INCOMPLETE") {
            writeln!(body, "    Result result;")?;
            writeln!(body, "    do")?;
            writeln!(body, "    {{")?;
            writeln!(body, "      result = static_cast<Result>( {} );", query)?;
            writeln!(body, "      if ( ( result == Result::eSuccess ) && {} )", count_name)?;
            writeln!(body, "      {{")?;
            writeln!(body, "        {}.resize( {} );", local, count_name)?;
            writeln!(body, "        result = static_cast<Result>( {} );", fill)?;
            writeln!(body, "      }}")?;
            writeln!(body, "    }} while ( result == Result::eIncomplete );")?;
            writeln!(body, "    if ( result == Result::eSuccess )")?;
            writeln!(body, "    {{")?;
            writeln!(body, "      VULKAN_HPP_ASSERT( {} <= {}.size() );", count_name, local)?;
            writeln!(body, "      {}.resize( {} );", local, count_name)?;
            writeln!(body, "    }}")?;
        } else {
            writeln!(body, "    Result result = static_cast<Result>( {} );", query)?;
            writeln!(body, "    if ( ( result == Result::eSuccess ) && {} )", count_name)?;
            writeln!(body, "    {{")?;
            writeln!(body, "      {}.resize( {} );", local, count_name)?;
            writeln!(body, "      result = static_cast<Result>( {} );", fill)?;
            writeln!(body, "    }}")?;
        }
        writeln!(body, "    return createResultValue( result, {}, {} );", local, message)?;
        Ok(format!("typename ResultValueType<{}>::type", vector_type))
    }

    /// The native variant followed by every enhanced variant that applies, with the
    /// preprocessor switches around them.
    fn overload_set(&self) -> Result<Vec<Entry>> {
        let standard = self.standard()?;
        let enhanced = self.enhanced(Variant::Enhanced)?;
        let mut entries = Vec::new();

        if standard.signature() == enhanced.signature() {
            if standard.return_type == enhanced.return_type {
                entries.push(Entry::Function(standard));
            } else {
                entries.push(Entry::Directive(format!("#ifdef {}", DISABLE_ENHANCED)));
                entries.push(Entry::Function(standard));
                entries.push(Entry::Directive("#else".to_owned()));
                entries.push(Entry::Function(enhanced));
                entries.push(Entry::Directive(format!("#endif /*{}*/", DISABLE_ENHANCED)));
            }
            return Ok(entries);
        }

        let singular = self.has_singular();
        entries.push(Entry::Function(standard));
        entries.push(Entry::Directive(format!("#ifndef {}", DISABLE_ENHANCED)));
        entries.push(Entry::Function(enhanced));
        if singular {
            entries.push(Entry::Function(self.enhanced(Variant::EnhancedSingular)?));
        }
        if self.has_structure_chain() {
            entries.push(Entry::Function(self.enhanced(Variant::EnhancedStructureChain)?));
        }
        if self.unique.is_some() {
            entries.push(Entry::Directive(format!("#ifndef {}", NO_SMART_HANDLE)));
            entries.push(Entry::Function(self.enhanced(Variant::EnhancedUnique)?));
            if singular {
                entries.push(Entry::Function(self.enhanced(Variant::EnhancedUniqueSingular)?));
            }
            entries.push(Entry::Directive(format!("#endif /*{}*/", NO_SMART_HANDLE)));
        }
        entries.push(Entry::Directive(format!("#endif /*{}*/", DISABLE_ENHANCED)));
        Ok(entries)
    }
}

/// The overload set of one entry point, together with the platform guarding it.
struct OverloadSet<'r> {
    protect: Option<&'r str>,
    entries: Vec<Entry>,
}

impl Registry {
    /// Every overload set a handle class carries: one per command, one more per alias that
    /// reduces to a different name, and the `destroy`/`free` shorthand for deleters.
    fn overload_sets(&self, handle: &str) -> Result<Vec<OverloadSet<'_>>> {
        let data = match self.handles.get(handle) {
            Some(data) => data,
            None => return Ok(Vec::new()),
        };
        let deleters: BTreeSet<&str> = self.handles.values().filter_map(|h| h.delete_command.as_deref()).collect();

        let mut sets = Vec::new();
        for vk_name in &data.commands {
            let command = match self.commands.get(vk_name) {
                Some(command) => command,
                None => continue,
            };
            let protect = self.protect(command.platform.as_ref());
            let mut names = BTreeSet::new();

            let mut contexts = vec![CommandContext::new(self, command, vk_name, None)];
            contexts.extend(command.aliases.iter().map(|alias| CommandContext::new(self, command, alias, None)));
            if deleters.contains(vk_name.as_str()) {
                let name = if vk_name.starts_with("vkFree") { "free" } else { "destroy" };
                contexts.push(CommandContext::new(self, command, vk_name, Some(name)));
            }
            for context in contexts {
                if names.insert(context.name.clone()) {
                    sets.push(OverloadSet { protect, entries: context.overload_set()? });
                }
            }
        }
        Ok(sets)
    }

    /// Declarations inside the class of `handle`, or at namespace scope for the free functions.
    pub(super) fn gen_command_declarations(&self, out: &mut String, handle: &str) -> Result<()> {
        let member = !handle.is_empty();
        for set in self.overload_sets(handle)? {
            open_protect(out, set.protect)?;
            for entry in &set.entries {
                match entry {
                    Entry::Directive(directive) => writeln!(out, "{}", directive)?,
                    Entry::Function(function) => function.declare(out, member)?,
                }
            }
            close_protect(out, set.protect)?;
            out.push('\n');
        }
        Ok(())
    }

    /// Out-of-line definitions of every command, free functions first.
    pub(super) fn gen_command_definitions(&self, out: &mut String) -> Result<()> {
        for (handle, data) in &self.handles {
            let class = strip_vk(handle);
            let handle_protect = self.protect(data.platform.as_ref());
            open_protect(out, handle_protect)?;
            for set in self.overload_sets(handle)? {
                open_protect(out, set.protect)?;
                for entry in &set.entries {
                    match entry {
                        Entry::Directive(directive) => writeln!(out, "{}", directive)?,
                        Entry::Function(function) => function.define(out, class)?,
                    }
                }
                close_protect(out, set.protect)?;
                out.push('\n');
            }
            close_protect(out, handle_protect)?;
        }
        Ok(())
    }
}
