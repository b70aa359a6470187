//! Shape analysis of a command's parameter list. This decides which parameters are sequences,
//! which one is handed back to the caller, and whether the command queries its size first.
use std::collections::BTreeMap;

use super::{CommandData, ParamData, TypeInfo};
use crate::error::Result;

const DEFERRED_CODES: [&str; 3] = ["VK_SUCCESS", "VK_OPERATION_DEFERRED_KHR", "VK_OPERATION_NOT_DEFERRED_KHR"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandShape {
    /// Vector parameter to the parameter holding its length. `None` when the length is a
    /// null terminator or a member of another parameter.
    pub vector_params: BTreeMap<usize, Option<usize>>,
    pub return_param: Option<usize>,
    pub template_param: Option<usize>,
    pub two_step: bool,
}

impl CommandShape {
    pub fn analyze(params: &[ParamData], return_type: &str) -> Result<CommandShape> {
        let vector_params = vector_params(params)?;
        let two_step = vector_params.values()
            .any(|len| len.map_or(false, |l| params[l].type_info.is_pointer()));
        let template_param = template_param(params, &vector_params);
        let return_param = return_param(params, return_type, &vector_params, two_step);
        Ok(CommandShape { vector_params, return_param, template_param, two_step })
    }

    /// True if some vector takes its length from parameter `index`.
    pub fn is_length_param(&self, index: usize) -> bool {
        self.vector_params.values().any(|&len| len == Some(index))
    }

    /// Vectors sharing the length parameter of `index`, `index` excluded.
    pub fn companions(&self, index: usize) -> Vec<usize> {
        match self.vector_params.get(&index) {
            Some(&Some(len)) => self.vector_params.iter()
                .filter(|&(&v, &l)| v != index && l == Some(len))
                .map(|(&v, _)| v)
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn vector_params(params: &[ParamData]) -> Result<BTreeMap<usize, Option<usize>>> {
    let mut vectors = BTreeMap::new();
    for (i, param) in params.iter().enumerate() {
        let len = match param.len {
            Some(ref len) => len.split(',').next().unwrap_or("").trim(),
            None => continue,
        };
        if let Some(j) = params[..i].iter().position(|p| p.name == len) {
            vectors.insert(i, Some(j));
        } else if len == "null-terminated" {
            vectors.insert(i, None);
        } else {
            let member_of = len.split_once("::").or_else(|| len.split_once("->"));
            let valid = member_of.map_or(false, |(owner, member)| {
                !member.is_empty() && params[..i].iter().any(|p| p.name == owner && p.type_info.is_pointer())
            });
            check!(valid, param.line, "parameter <{}> has unsupported len <{}>", param.name, len);
            vectors.insert(i, None);
        }
    }
    Ok(vectors)
}

/// An untyped vector becomes a template parameter, as long as it is the only untyped one.
fn template_param(params: &[ParamData], vectors: &BTreeMap<usize, Option<usize>>) -> Option<usize> {
    let mut untyped = vectors.keys().filter(|&&i| params[i].type_info.type_name == "void");
    match (untyped.next(), untyped.next()) {
        (Some(&i), None) => Some(i),
        _ => None,
    }
}

/// More than one candidate means no return parameter at all.
fn return_param(
    params: &[ParamData],
    return_type: &str,
    vectors: &BTreeMap<usize, Option<usize>>,
    two_step: bool,
) -> Option<usize> {
    if return_type != "VkResult" && return_type != "void" {
        return None;
    }

    let is_length = |i: usize| vectors.values().any(|&len| len == Some(i));
    let candidates: Vec<usize> = params.iter().enumerate()
        .filter(|&(i, p)| {
            let ty = &p.type_info;
            ty.is_non_const_pointer()
                && (ty.type_name != "void" || two_step || ty.postfix.contains("**"))
                && !is_length(i)
        })
        .filter(|&(i, _)| match vectors.get(&i) {
            None => true,
            Some(&len) => {
                two_step || vectors.len() > 1 || len.map_or(true, |l| params[l].type_info.is_pointer())
            }
        })
        .map(|(i, _)| i)
        .collect();

    match candidates.as_slice() {
        &[single] => Some(single),
        _ => None,
    }
}

/// What the enhanced overloads hand back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnhancedReturn {
    /// Nothing; failures go through the error path.
    Void,
    /// The pointee of the return parameter.
    Value(TypeInfo),
    /// A sequence of the pointee; an untyped pointee means raw bytes.
    Vector(TypeInfo),
    /// The native return type, unchanged.
    Native(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReturnShape {
    /// The return parameter, if the enhanced signature hides it.
    pub return_param: Option<usize>,
    pub kind: EnhancedReturn,
    /// Several success codes are reported together with the value.
    pub result_pairing: bool,
}

impl CommandData {
    pub fn returns_result(&self) -> bool {
        self.return_type == "VkResult"
    }

    pub fn return_shape(&self) -> ReturnShape {
        let codes = &self.success_codes;
        let deferred = codes.iter().map(String::as_str).eq(DEFERRED_CODES.iter().copied());
        let result = self.returns_result();

        if let Some(index) = self.shape.return_param {
            let returns_param = self.return_type == "void"
                || (result && (codes.len() == 1
                    || (codes.len() == 2 && codes[1] == "VK_INCOMPLETE" && self.shape.two_step)
                    || deferred));
            if returns_param {
                let pointee = self.params[index].type_info.pointee();
                let kind = if self.shape.vector_params.contains_key(&index) {
                    EnhancedReturn::Vector(pointee)
                } else {
                    EnhancedReturn::Value(pointee)
                };
                return ReturnShape { return_param: Some(index), kind, result_pairing: deferred };
            }
        }

        let kind = if result && codes.len() == 1 {
            EnhancedReturn::Void
        } else {
            EnhancedReturn::Native(self.return_type.clone())
        };
        ReturnShape { return_param: None, kind, result_pairing: false }
    }
}
