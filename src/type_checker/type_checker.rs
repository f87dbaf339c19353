use std::collections::HashSet;

use lazy_static::lazy_static;
use log::{debug, trace};
use regex::{Captures, Regex};

use crate::{
    ast::{
        ast::Expr,
        forms::{AssignTarget, BinaryOperator, Binding, Form, LiteralKind, Narrowing, Signature, TypeBase},
    },
    errors::errors::{Error, ErrorImpl},
    parser::parser::parse_program,
};

use super::{
    environment::{EnvId, Environments},
    types::{GenericTemplate, TypeId, TypeRegistry},
};

lazy_static! {
    static ref TYPE_WORD: Regex = Regex::new(r"[A-Za-z0-9_]+").unwrap();
}

/// Attaches the offending expression to a bare `ErrorImpl`.
trait InExpr<T> {
    fn in_expr(self, expr: &Expr) -> Result<T, Error>;
}

impl<T> InExpr<T> for Result<T, ErrorImpl> {
    fn in_expr(self, expr: &Expr) -> Result<T, Error> {
        self.map_err(|error| Error::in_expr(error, expr))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TypeCheckerOptions {
    /// Install `sum`, `square`, `concat` and `print` into the global scope.
    pub include_builtins: bool,
}

impl Default for TypeCheckerOptions {
    fn default() -> Self {
        TypeCheckerOptions {
            include_builtins: true,
        }
    }
}

/// One checking session: a type registry plus the scope arena rooted at the
/// global environment.
#[derive(Debug)]
pub struct TypeChecker {
    pub types: TypeRegistry,
    pub environments: Environments,
    /// Generic templates whose body is being checked right now.
    instantiating: HashSet<TypeId>,
}

impl Default for TypeChecker {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeChecker {
    pub fn new() -> Self {
        Self::with_options(TypeCheckerOptions::default())
    }

    pub fn with_options(options: TypeCheckerOptions) -> Self {
        let mut type_checker = TypeChecker {
            types: TypeRegistry::new(),
            environments: Environments::new(),
            instantiating: HashSet::new(),
        };
        type_checker.install_globals(options);
        type_checker
    }

    fn install_globals(&mut self, options: TypeCheckerOptions) {
        let global = self.global();
        let (number, string, any) = (self.types.number(), self.types.string(), self.types.any());

        self.environments.define(global, "VERSION", string);

        if options.include_builtins {
            let builtins = [
                ("sum", vec![number, number], number),
                ("square", vec![number], number),
                ("concat", vec![string, string], string),
                ("print", vec![any], string),
            ];
            for (name, params, return_type) in builtins {
                let function = self.types.function(params, return_type);
                self.environments.define(global, name, function);
            }
        }
    }

    pub fn global(&self) -> EnvId {
        self.environments.global()
    }

    pub fn type_name(&self, ty: TypeId) -> String {
        self.types.name(ty)
    }

    pub fn from_string(&mut self, type_str: &str) -> Result<TypeId, ErrorImpl> {
        self.types.from_string(type_str)
    }

    /// Checks a whole program: a `(begin ...)` is checked directly in the
    /// global scope so its declarations persist, anything else as a single
    /// expression.
    pub fn type_of_program(&mut self, program: &Expr) -> Result<TypeId, Error> {
        let global = self.global();
        self.check_body(program, global)
    }

    /// Reads `source` as a sequence of top-level forms and checks it.
    pub fn check_source(&mut self, source: &str) -> Result<TypeId, Error> {
        let program = parse_program(source, None)?;
        self.type_of_program(&program)
    }

    pub fn type_of_global(&mut self, expr: &Expr) -> Result<TypeId, Error> {
        let global = self.global();
        self.type_of(expr, global)
    }

    pub fn type_of(&mut self, expr: &Expr, env: EnvId) -> Result<TypeId, Error> {
        let form = Form::classify(expr)?;
        trace!("type_of {}", expr);

        match form {
            Form::Literal(kind) => Ok(match kind {
                LiteralKind::Number => self.types.number(),
                LiteralKind::String => self.types.string(),
                LiteralKind::Boolean => self.types.boolean(),
            }),
            Form::Arithmetic { operator, left, right } => {
                let left_type = self.type_of(left, env)?;
                let right_type = self.type_of(right, env)?;

                let allowed = self.operand_types(operator);
                self.expect_operator_type(left_type, &allowed, expr)?;
                self.expect_operator_type(right_type, &allowed, expr)?;

                self.expect(right_type, left_type, expr)
            }
            Form::Comparison { left, right, .. } => {
                let left_type = self.type_of(left, env)?;
                let right_type = self.type_of(right, env)?;
                self.expect(right_type, left_type, expr)?;
                Ok(self.types.boolean())
            }
            Form::TypeDecl { name, base } => {
                let ty = match base {
                    TypeBase::Alias(parent) => self.types.register_alias(name, parent),
                    TypeBase::Union(members) => self.types.register_union(name, &members),
                }
                .in_expr(expr)?;
                debug!("registered type `{}`", name);
                Ok(ty)
            }
            Form::ClassDecl { name, superclass, body } => {
                let superclass = match superclass {
                    Some(superclass) => Some(self.class_type(superclass, expr)?),
                    None => None,
                };

                let scope = self.environments.push(env);
                let class = match self.types.register_class(name, superclass, scope) {
                    Ok(class) => class,
                    Err(error) => {
                        self.environments.release(scope);
                        return Err(Error::in_expr(error, expr));
                    }
                };
                self.environments.pin(scope);

                let previous = self.environments.get_local(env, name);
                self.environments.define(env, name, class);
                debug!("registered class `{}`", name);

                if let Err(error) = self.check_body(body, scope) {
                    self.types.forget(name);
                    self.restore_binding(env, name, previous);
                    return Err(error);
                }
                Ok(class)
            }
            Form::New { class, arguments } => {
                let class_type = self.class_type(class, expr)?;

                let mut argument_types = vec![class_type];
                for argument in arguments {
                    argument_types.push(self.type_of(argument, env)?);
                }

                let constructor = self.field(class_type, "constructor", expr)?;
                self.check_call(constructor, &argument_types, "constructor", expr)?;
                Ok(class_type)
            }
            Form::Super { class } => {
                let class_type = self.class_type(class, expr)?;
                self.types
                    .as_class(class_type)
                    .and_then(|class| class.superclass)
                    .ok_or_else(|| ErrorImpl::UnresolvedReference {
                        name: format!("{}.super", class),
                    })
                    .in_expr(expr)
            }
            Form::Prop { instance, field } => {
                let instance_type = self.type_of(instance, env)?;
                self.field(instance_type, field, expr)
            }
            Form::VarDecl { target, value } => self.check_var(target, value, env, expr),
            Form::Identifier(name) => self.environments.lookup(env, name).in_expr(expr),
            Form::Set { target, value } => {
                let declared = match target {
                    AssignTarget::Name(name) => {
                        let owner = self.environments.resolve(env, name).in_expr(expr)?;
                        self.environments.lookup(owner, name).in_expr(expr)?
                    }
                    AssignTarget::Prop { instance, field } => {
                        let instance_type = self.type_of(instance, env)?;
                        self.field(instance_type, field, expr)?
                    }
                };

                let value_type = self.type_of(value, env)?;
                self.expect(value_type, declared, expr)?;
                Ok(declared)
            }
            Form::Block(items) => {
                let scope = self.environments.push(env);
                let result = self.check_sequence(items, scope);
                self.environments.release(scope);
                result
            }
            Form::If {
                condition,
                narrowing,
                then_branch,
                else_branch,
            } => {
                let condition_type = self.type_of(condition, env)?;
                self.expect(condition_type, self.types.boolean(), condition)?;

                let then_type = match narrowing {
                    Some(narrowing) => self.check_narrowed(narrowing, then_branch, env, expr)?,
                    None => self.type_of(then_branch, env)?,
                };
                let else_type = self.type_of(else_branch, env)?;

                self.expect(else_type, then_type, expr)?;
                Ok(then_type)
            }
            Form::While { condition, body } => {
                let condition_type = self.type_of(condition, env)?;
                self.expect(condition_type, self.types.boolean(), condition)?;
                self.type_of(body, env)
            }
            Form::Def { name, signature } => {
                let previous = self.environments.get_local(env, name);

                // Pre-register so the body can call itself
                if !signature.is_generic() {
                    let function = self.signature_type(&signature, expr)?;
                    self.environments.define(env, name, function);
                }

                let declaration = Expr::list(vec![
                    Expr::symbol("var"),
                    Expr::symbol(name),
                    signature.to_lambda(),
                ]);
                let result = self.type_of(&declaration, env);
                if result.is_err() {
                    self.restore_binding(env, name, previous);
                }
                result
            }
            Form::Lambda(signature) => {
                if signature.is_generic() {
                    return Ok(self.generic_template(&signature, env));
                }

                let params = self.param_types(&signature.params, expr)?;
                let return_type = self.resolve_type(signature.return_type, expr)?;
                self.check_function(&params, return_type, signature.body, env, expr)
            }
            Form::TypeOf(inner) => {
                self.type_of(inner, env)?;
                Ok(self.types.string())
            }
            Form::Call {
                callee,
                type_arguments,
                arguments,
            } => {
                let callee_type = self.type_of(callee, env)?;

                let function = match type_arguments {
                    Some(type_arguments) => self.instantiate(callee_type, &type_arguments, callee, expr)?,
                    None => {
                        if let Some(template) = self.types.as_generic(callee_type) {
                            return Err(Error::in_expr(
                                ErrorImpl::ArityMismatch {
                                    construct: format!("type arguments of {}", callee),
                                    expected: template.generics.len(),
                                    received: 0,
                                },
                                expr,
                            ));
                        }
                        callee_type
                    }
                };

                let mut argument_types = vec![];
                for argument in arguments {
                    argument_types.push(self.type_of(argument, env)?);
                }

                self.check_call(function, &argument_types, &callee.to_string(), expr)
            }
        }
    }

    /// Checks the items of a block in `env` and returns the type of the last one.
    fn check_sequence(&mut self, items: &[Expr], env: EnvId) -> Result<TypeId, Error> {
        let mut result = None;
        for item in items {
            result = Some(self.type_of(item, env)?);
        }
        result.ok_or_else(|| Error::in_expr(ErrorImpl::UnknownExpression, &Expr::list(vec![])))
    }

    /// Function and class bodies: a top-level `begin` shares the scope it is
    /// given instead of opening a new one.
    fn check_body(&mut self, body: &Expr, env: EnvId) -> Result<TypeId, Error> {
        match body.as_list() {
            Some(items) if body.head() == Some("begin") && items.len() > 1 => {
                self.check_sequence(&items[1..], env)
            }
            _ => self.type_of(body, env),
        }
    }

    fn check_var(&mut self, target: Binding, value: &Expr, env: EnvId, expr: &Expr) -> Result<TypeId, Error> {
        let value_type = self.type_of(value, env)?;

        match target.type_annotation {
            Some(annotation) => {
                let declared = self.resolve_type(annotation, expr)?;
                self.expect(value_type, declared, expr)?;
                Ok(self.environments.define(env, target.name, declared))
            }
            None => Ok(self.environments.define(env, target.name, value_type)),
        }
    }

    fn check_narrowed(&mut self, narrowing: Narrowing, branch: &Expr, env: EnvId, expr: &Expr) -> Result<TypeId, Error> {
        let narrowed = self.resolve_type(narrowing.type_name, expr)?;

        let scope = self.environments.push(env);
        self.environments.define(scope, narrowing.name, narrowed);
        let result = self.type_of(branch, scope);
        self.environments.release(scope);
        result
    }

    /// Binds the parameters in a fresh scope over `env`, checks the body against
    /// the declared return type and yields the declared function type.
    fn check_function(
        &mut self,
        params: &[(&str, TypeId)],
        return_type: TypeId,
        body: &Expr,
        env: EnvId,
        expr: &Expr,
    ) -> Result<TypeId, Error> {
        let scope = self.environments.push(env);
        for (name, ty) in params {
            self.environments.define(scope, name, *ty);
        }
        let actual = self.check_body(body, scope);
        self.environments.release(scope);

        self.expect(actual?, return_type, expr)?;
        Ok(self
            .types
            .function(params.iter().map(|(_, ty)| *ty).collect(), return_type))
    }

    fn check_call(&self, callee: TypeId, argument_types: &[TypeId], construct: &str, expr: &Expr) -> Result<TypeId, Error> {
        let Some(function) = self.types.as_function(callee) else {
            return Err(self.mismatch("function", callee, expr));
        };

        if argument_types.len() != function.params.len() {
            return Err(Error::in_expr(
                ErrorImpl::ArityMismatch {
                    construct: construct.to_string(),
                    expected: function.params.len(),
                    received: argument_types.len(),
                },
                expr,
            ));
        }

        for (argument, param) in argument_types.iter().zip(function.params.iter()) {
            if *param == self.types.any() {
                continue;
            }
            if !self.types.equals(*argument, *param) {
                return Err(self.mismatch(&self.types.name(*param), *argument, expr));
            }
        }

        Ok(function.return_type)
    }

    fn generic_template(&mut self, signature: &Signature, env: EnvId) -> TypeId {
        self.environments.pin(env);
        self.types.register_generic(GenericTemplate {
            generics: signature.generics.iter().map(|g| g.to_string()).collect(),
            params: signature
                .params
                .iter()
                .map(|(name, ty)| (name.to_string(), ty.to_string()))
                .collect(),
            return_type: signature.return_type.to_string(),
            body: signature.body.clone(),
            scope: env,
        })
    }

    /// Specializes a generic template with explicit type arguments by
    /// substituting them into its type strings and checking the body.
    ///
    /// A template may not instantiate itself while its body is being checked.
    fn instantiate(
        &mut self,
        generic: TypeId,
        type_arguments: &[&str],
        callee: &Expr,
        expr: &Expr,
    ) -> Result<TypeId, Error> {
        let Some(template) = self.types.as_generic(generic).cloned() else {
            return Err(self.mismatch("generic function", generic, expr));
        };

        if type_arguments.len() != template.generics.len() {
            return Err(Error::in_expr(
                ErrorImpl::ArityMismatch {
                    construct: String::from("type arguments"),
                    expected: template.generics.len(),
                    received: type_arguments.len(),
                },
                expr,
            ));
        }

        let substitute = |type_str: &str| -> String {
            TYPE_WORD
                .replace_all(type_str, |captures: &Captures| {
                    let word = &captures[0];
                    match template.generics.iter().position(|generic| generic == word) {
                        Some(i) => type_arguments[i].to_string(),
                        None => word.to_string(),
                    }
                })
                .into_owned()
        };

        let mut params = vec![];
        for (name, ty) in template.params.iter() {
            params.push((name.as_str(), self.resolve_type(&substitute(ty), expr)?));
        }
        let return_type = self.resolve_type(&substitute(&template.return_type), expr)?;

        debug!(
            "instantiating <{}> with <{}>",
            template.generics.join(","),
            type_arguments.join(",")
        );
        if !self.instantiating.insert(generic) {
            return Err(Error::in_expr(
                ErrorImpl::UnresolvedReference {
                    name: callee.to_string(),
                },
                expr,
            ));
        }
        let result = self.check_function(&params, return_type, &template.body, template.scope, expr);
        self.instantiating.remove(&generic);
        result
    }

    /// Puts back whatever `name` was bound to locally before a failed declaration.
    fn restore_binding(&mut self, env: EnvId, name: &str, previous: Option<TypeId>) {
        match previous {
            Some(ty) => {
                self.environments.define(env, name, ty);
            }
            None => {
                self.environments.remove(env, name);
            }
        }
    }

    fn signature_type(&mut self, signature: &Signature, expr: &Expr) -> Result<TypeId, Error> {
        let params = self.param_types(&signature.params, expr)?;
        let return_type = self.resolve_type(signature.return_type, expr)?;
        Ok(self
            .types
            .function(params.into_iter().map(|(_, ty)| ty).collect(), return_type))
    }

    fn param_types<'a>(&mut self, params: &[(&'a str, &str)], expr: &Expr) -> Result<Vec<(&'a str, TypeId)>, Error> {
        let mut resolved = vec![];
        for (name, ty) in params {
            resolved.push((*name, self.resolve_type(ty, expr)?));
        }
        Ok(resolved)
    }

    fn class_type(&self, name: &str, expr: &Expr) -> Result<TypeId, Error> {
        self.types
            .lookup(name)
            .filter(|ty| self.types.as_class(*ty).is_some())
            .ok_or_else(|| {
                Error::in_expr(
                    ErrorImpl::UnresolvedReference {
                        name: name.to_string(),
                    },
                    expr,
                )
            })
    }

    /// Looks `name` up on the class and then on each ancestor in turn.
    fn field(&self, instance: TypeId, name: &str, expr: &Expr) -> Result<TypeId, Error> {
        let Some(class) = self.types.as_class(instance) else {
            return Err(self.mismatch("class", instance, expr));
        };

        let mut current = Some(class);
        while let Some(class) = current {
            if let Some(ty) = self.environments.get_local(class.scope, name) {
                return Ok(ty);
            }
            current = class.superclass.and_then(|superclass| self.types.as_class(superclass));
        }

        Err(Error::in_expr(
            ErrorImpl::UnresolvedReference {
                name: format!("{}.{}", class.name, name),
            },
            expr,
        ))
    }

    fn operand_types(&self, operator: BinaryOperator) -> Vec<TypeId> {
        match operator {
            BinaryOperator::Add => vec![self.types.string(), self.types.number()],
            BinaryOperator::Subtract | BinaryOperator::Multiply | BinaryOperator::Divide => {
                vec![self.types.number()]
            }
        }
    }

    fn expect_operator_type(&self, ty: TypeId, allowed: &[TypeId], expr: &Expr) -> Result<(), Error> {
        let supported = if self.types.is_union(ty) {
            self.types.includes_all(ty, allowed)
        } else {
            allowed.iter().any(|candidate| self.types.equals(*candidate, ty))
        };

        if !supported {
            let expected = allowed
                .iter()
                .map(|candidate| self.types.name(*candidate))
                .collect::<Vec<_>>()
                .join(" | ");
            return Err(self.mismatch(&expected, ty, expr));
        }
        Ok(())
    }

    fn expect(&self, actual: TypeId, expected: TypeId, expr: &Expr) -> Result<TypeId, Error> {
        if !self.types.equals(actual, expected) {
            return Err(self.mismatch(&self.types.name(expected), actual, expr));
        }
        Ok(actual)
    }

    fn mismatch(&self, expected: &str, actual: TypeId, expr: &Expr) -> Error {
        Error::in_expr(
            ErrorImpl::TypeMismatch {
                expected: expected.to_string(),
                received: self.types.name(actual),
            },
            expr,
        )
    }

    fn resolve_type(&mut self, type_str: &str, expr: &Expr) -> Result<TypeId, Error> {
        self.types.from_string(type_str).in_expr(expr)
    }
}

/// Checks `program` in a fresh session, returning the session alongside the result.
pub fn type_check(program: &Expr, options: TypeCheckerOptions) -> (TypeChecker, Result<TypeId, Error>) {
    let mut type_checker = TypeChecker::with_options(options);
    let result = type_checker.type_of_program(program);
    (type_checker, result)
}
