//! Type model and the per-session type registry.
//!
//! Every type lives in the registry's arena and is addressed by a `TypeId`.
//! Primitives, aliases, unions and classes are also indexed by name; function
//! types are interned by their canonical name so that `Fn<number<number>>`
//! built twice yields the same handle.

use std::{cell::OnceCell, collections::HashMap};

use lazy_static::lazy_static;
use regex::Regex;

use crate::{
    ast::{ast::Expr, forms::split_top_level},
    errors::errors::ErrorImpl,
};

use super::environment::EnvId;

lazy_static! {
    static ref FUNCTION_TYPE: Regex = Regex::new(r"^Fn<(.+)>$").unwrap();
}

/// Handle to a type stored in a `TypeRegistry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Number,
    String,
    Boolean,
    /// Accepted by any call parameter declared with it.
    Any,
}

impl Primitive {
    pub fn name(&self) -> &'static str {
        match self {
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Any => "any",
        }
    }
}

/// Structural function type.
#[derive(Debug)]
pub struct FunctionType {
    pub params: Vec<TypeId>,
    pub return_type: TypeId,
    name: OnceCell<String>,
}

/// Nominal class type. Its own fields and methods live in `scope`.
#[derive(Debug)]
pub struct ClassType {
    pub name: String,
    pub superclass: Option<TypeId>,
    pub scope: EnvId,
}

/// An uninstantiated generic function, kept as type strings plus its body.
#[derive(Debug, Clone)]
pub struct GenericTemplate {
    pub generics: Vec<String>,
    /// Parameter names paired with their (possibly generic) type strings.
    pub params: Vec<(String, String)>,
    pub return_type: String,
    pub body: Expr,
    pub scope: EnvId,
}

#[derive(Debug)]
pub enum Type {
    Primitive(Primitive),
    Alias { name: String, parent: TypeId },
    Function(FunctionType),
    Union { name: String, members: Vec<TypeId> },
    Class(ClassType),
    Generic(GenericTemplate),
}

#[derive(Debug)]
pub struct TypeRegistry {
    types: Vec<Type>,
    named: HashMap<String, TypeId>,
    functions: HashMap<String, TypeId>,
    number: TypeId,
    string: TypeId,
    boolean: TypeId,
    any: TypeId,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry {
    pub fn new() -> Self {
        let mut registry = TypeRegistry {
            types: vec![],
            named: HashMap::new(),
            functions: HashMap::new(),
            number: TypeId(0),
            string: TypeId(0),
            boolean: TypeId(0),
            any: TypeId(0),
        };

        registry.number = registry.register_primitive(Primitive::Number);
        registry.string = registry.register_primitive(Primitive::String);
        registry.boolean = registry.register_primitive(Primitive::Boolean);
        registry.any = registry.register_primitive(Primitive::Any);
        registry
    }

    fn push(&mut self, ty: Type) -> TypeId {
        self.types.push(ty);
        TypeId(self.types.len() - 1)
    }

    fn register_primitive(&mut self, primitive: Primitive) -> TypeId {
        let id = self.push(Type::Primitive(primitive));
        self.named.insert(primitive.name().to_string(), id);
        id
    }

    fn claim_name(&self, name: &str) -> Result<(), ErrorImpl> {
        if self.named.contains_key(name) {
            return Err(ErrorImpl::Redeclaration {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn number(&self) -> TypeId {
        self.number
    }

    pub fn string(&self) -> TypeId {
        self.string
    }

    pub fn boolean(&self) -> TypeId {
        self.boolean
    }

    pub fn any(&self) -> TypeId {
        self.any
    }

    pub fn get(&self, id: TypeId) -> &Type {
        &self.types[id.0]
    }

    /// Looks up a primitive, alias, union or class by name.
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.named.get(name).copied()
    }

    pub fn register_alias(&mut self, name: &str, parent: &str) -> Result<TypeId, ErrorImpl> {
        self.claim_name(name)?;
        let parent = self.from_string(parent)?;

        let id = self.push(Type::Alias {
            name: name.to_string(),
            parent,
        });
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn register_union(&mut self, name: &str, members: &[&str]) -> Result<TypeId, ErrorImpl> {
        self.claim_name(name)?;
        let members = members
            .iter()
            .map(|member| self.from_string(member))
            .collect::<Result<Vec<_>, _>>()?;

        let id = self.push(Type::Union {
            name: name.to_string(),
            members,
        });
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn register_class(
        &mut self,
        name: &str,
        superclass: Option<TypeId>,
        scope: EnvId,
    ) -> Result<TypeId, ErrorImpl> {
        self.claim_name(name)?;
        let id = self.push(Type::Class(ClassType {
            name: name.to_string(),
            superclass,
            scope,
        }));
        self.named.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn register_generic(&mut self, template: GenericTemplate) -> TypeId {
        self.push(Type::Generic(template))
    }

    /// Returns the function type with the given signature, creating it once.
    pub fn function(&mut self, params: Vec<TypeId>, return_type: TypeId) -> TypeId {
        let function = FunctionType {
            params,
            return_type,
            name: OnceCell::new(),
        };
        let name = self.function_name(&function).to_string();

        if let Some(id) = self.functions.get(&name) {
            return *id;
        }
        let id = self.push(Type::Function(function));
        self.functions.insert(name, id);
        id
    }

    fn function_name<'a>(&self, function: &'a FunctionType) -> &'a str {
        function.name.get_or_init(|| {
            let mut name = format!("Fn<{}", self.name(function.return_type));
            if !function.params.is_empty() {
                let params = function
                    .params
                    .iter()
                    .map(|param| self.name(*param))
                    .collect::<Vec<_>>();
                name.push('<');
                name.push_str(&params.join(","));
                name.push('>');
            }
            name.push('>');
            name
        })
    }

    /// Canonical name of a type; function names are derived on first use.
    pub fn name(&self, id: TypeId) -> String {
        match self.get(id) {
            Type::Primitive(primitive) => primitive.name().to_string(),
            Type::Alias { name, .. } | Type::Union { name, .. } => name.clone(),
            Type::Class(class) => class.name.clone(),
            Type::Function(function) => self.function_name(function).to_string(),
            Type::Generic(template) => {
                let params = template
                    .params
                    .iter()
                    .map(|(_, ty)| ty.as_str())
                    .collect::<Vec<_>>();
                format!(
                    "<{}>Fn<{}<{}>>",
                    template.generics.join(","),
                    template.return_type,
                    params.join(",")
                )
            }
        }
    }

    /// Resolves a type name, parsing `Fn<Ret>` and `Fn<Ret<P1,P2>>` on demand.
    pub fn from_string(&mut self, type_str: &str) -> Result<TypeId, ErrorImpl> {
        let type_str = type_str.trim();
        if let Some(id) = self.lookup(type_str) {
            return Ok(id);
        }
        if let Some(id) = self.functions.get(type_str) {
            return Ok(*id);
        }

        let unknown = || ErrorImpl::UnknownType {
            type_: type_str.to_string(),
        };
        let inner = match FUNCTION_TYPE.captures(type_str).and_then(|c| c.get(1)) {
            Some(inner) => inner.as_str(),
            None => return Err(unknown()),
        };

        let return_end = if inner.starts_with("Fn<") {
            matching_close(inner, 2).ok_or_else(unknown)? + 1
        } else {
            inner.find('<').unwrap_or(inner.len())
        };
        let (return_str, rest) = inner.split_at(return_end);

        let params = if rest.is_empty() {
            vec![]
        } else if rest.starts_with('<') && rest.ends_with('>') && rest.len() > 2 {
            split_top_level(&rest[1..rest.len() - 1])
                .into_iter()
                .map(|param| self.from_string(param))
                .collect::<Result<Vec<_>, _>>()?
        } else {
            return Err(unknown());
        };
        let return_type = self.from_string(return_str)?;

        let id = self.function(params, return_type);
        self.functions.insert(type_str.to_string(), id);
        Ok(id)
    }

    /// Type equality: identity, transitive through aliases, structural for
    /// functions, member-wise for unions. A class also equals any of its
    /// ancestors when it is on the left.
    pub fn equals(&self, a: TypeId, b: TypeId) -> bool {
        if a == b {
            return true;
        }

        match (self.get(a), self.get(b)) {
            (Type::Alias { parent, .. }, _) => self.equals(*parent, b),
            (_, Type::Alias { parent, .. }) => self.equals(a, *parent),
            (Type::Function(f), Type::Function(g)) => {
                f.params.len() == g.params.len()
                    && f.params
                        .iter()
                        .zip(g.params.iter())
                        .all(|(x, y)| self.equals(*x, *y))
                    && self.equals(f.return_type, g.return_type)
            }
            (Type::Union { members: left, .. }, Type::Union { members: right, .. }) => {
                self.includes_all(a, right) && self.includes_all(b, left)
            }
            (Type::Union { members, .. }, _) => members.iter().any(|m| self.equals(*m, b)),
            (_, Type::Union { members, .. }) => members.iter().any(|m| self.equals(a, *m)),
            // An instance of a subclass is accepted where an ancestor is expected.
            (Type::Class(class), _) => class.superclass.is_some_and(|superclass| self.equals(superclass, b)),
            _ => false,
        }
    }

    /// Whether every member of `union` is one of `candidates`, looking through
    /// aliases on both sides.
    ///
    /// Returns `false` when `union` is not a union type.
    pub fn includes_all(&self, union: TypeId, candidates: &[TypeId]) -> bool {
        match self.get(self.unalias(union)) {
            Type::Union { members, .. } => members.iter().all(|member| {
                let member = self.unalias(*member);
                candidates
                    .iter()
                    .any(|candidate| self.unalias(*candidate) == member)
            }),
            _ => false,
        }
    }

    pub fn is_union(&self, id: TypeId) -> bool {
        matches!(self.get(self.unalias(id)), Type::Union { .. })
    }

    /// Follows an alias chain down to the type it names.
    pub fn unalias(&self, id: TypeId) -> TypeId {
        match self.get(id) {
            Type::Alias { parent, .. } => self.unalias(*parent),
            _ => id,
        }
    }

    /// Drops `name` from the name index. The type itself stays in the arena.
    pub fn forget(&mut self, name: &str) {
        self.named.remove(name);
    }

    pub fn as_function(&self, id: TypeId) -> Option<&FunctionType> {
        match self.get(id) {
            Type::Function(function) => Some(function),
            Type::Alias { parent, .. } => self.as_function(*parent),
            _ => None,
        }
    }

    pub fn as_class(&self, id: TypeId) -> Option<&ClassType> {
        match self.get(id) {
            Type::Class(class) => Some(class),
            Type::Alias { parent, .. } => self.as_class(*parent),
            _ => None,
        }
    }

    pub fn as_generic(&self, id: TypeId) -> Option<&GenericTemplate> {
        match self.get(id) {
            Type::Generic(template) => Some(template),
            _ => None,
        }
    }
}

/// Index of the `>` closing the `<` at `open`.
fn matching_close(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text.char_indices().skip_while(|(i, _)| *i < open) {
        match c {
            '<' => depth += 1,
            '>' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
