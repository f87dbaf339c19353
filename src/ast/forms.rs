//! Syntactic classification of expressions.
//!
//! `Form::classify` looks at the shape of an `Expr` and produces the closed set
//! of forms the checker understands. Dispatch order matters: literals first,
//! then operators, then keyword forms, identifiers, and finally calls.

use std::collections::HashSet;

use lazy_static::lazy_static;
use regex::Regex;

use crate::errors::errors::{Error, ErrorImpl};

use super::ast::Expr;

lazy_static! {
    pub static ref IDENTIFIER: Regex = Regex::new(r"^[A-Za-z0-9_+\-*<>=:]+$").unwrap();
    pub static ref KEYWORDS: HashSet<&'static str> = {
        let mut set = HashSet::new();
        set.insert("var");
        set.insert("set");
        set.insert("begin");
        set.insert("if");
        set.insert("while");
        set.insert("def");
        set.insert("lambda");
        set.insert("type");
        set.insert("class");
        set.insert("new");
        set.insert("super");
        set.insert("prop");
        set.insert("typeof");
        set.insert("->");
        set
    };
}

/// Arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl TryFrom<&str> for BinaryOperator {
    type Error = ErrorImpl;

    fn try_from(symbol: &str) -> Result<Self, Self::Error> {
        match symbol {
            "+" => Ok(BinaryOperator::Add),
            "-" => Ok(BinaryOperator::Subtract),
            "*" => Ok(BinaryOperator::Multiply),
            "/" => Ok(BinaryOperator::Divide),
            _ => Err(ErrorImpl::UnknownOperator {
                operator: symbol.to_string(),
            }),
        }
    }
}

/// Comparison operators, always typed `boolean`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOperator {
    Equals,
    NotEquals,
    GreaterEquals,
    LessEquals,
    Greater,
    Less,
}

impl TryFrom<&str> for ComparisonOperator {
    type Error = ErrorImpl;

    fn try_from(symbol: &str) -> Result<Self, Self::Error> {
        match symbol {
            "==" => Ok(ComparisonOperator::Equals),
            "!=" => Ok(ComparisonOperator::NotEquals),
            ">=" => Ok(ComparisonOperator::GreaterEquals),
            "<=" => Ok(ComparisonOperator::LessEquals),
            ">" => Ok(ComparisonOperator::Greater),
            "<" => Ok(ComparisonOperator::Less),
            _ => Err(ErrorImpl::UnknownOperator {
                operator: symbol.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralKind {
    Number,
    String,
    Boolean,
}

/// Right-hand side of a `type` declaration.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeBase<'a> {
    Alias(&'a str),
    Union(Vec<&'a str>),
}

/// A declared name with an optional type annotation: `x` or `(x number)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Binding<'a> {
    pub name: &'a str,
    pub type_annotation: Option<&'a str>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AssignTarget<'a> {
    Name(&'a str),
    Prop { instance: &'a Expr, field: &'a str },
}

/// The `(== (typeof Name) "Type")` condition that refines `Name` in the then-branch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Narrowing<'a> {
    pub name: &'a str,
    pub type_name: &'a str,
}

/// Parameters, return type and body shared by `lambda` and `def`.
#[derive(Debug, Clone, PartialEq)]
pub struct Signature<'a> {
    pub generics: Vec<&'a str>,
    /// Parameter names paired with their type strings.
    pub params: Vec<(&'a str, &'a str)>,
    pub return_type: &'a str,
    pub body: &'a Expr,
}

impl Signature<'_> {
    pub fn is_generic(&self) -> bool {
        !self.generics.is_empty()
    }

    /// Rebuilds `(lambda [<K>] ((name type)...) -> ret body)` from the signature.
    pub fn to_lambda(&self) -> Expr {
        let mut items = vec![Expr::symbol("lambda")];
        if self.is_generic() {
            items.push(Expr::Symbol(format!("<{}>", self.generics.join(","))));
        }
        items.push(Expr::List(
            self.params
                .iter()
                .map(|(name, ty)| Expr::list(vec![Expr::symbol(name), Expr::symbol(ty)]))
                .collect(),
        ));
        items.push(Expr::symbol("->"));
        items.push(Expr::symbol(self.return_type));
        items.push(self.body.clone());
        Expr::List(items)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Form<'a> {
    Literal(LiteralKind),
    Arithmetic {
        operator: BinaryOperator,
        left: &'a Expr,
        right: &'a Expr,
    },
    Comparison {
        operator: ComparisonOperator,
        left: &'a Expr,
        right: &'a Expr,
    },
    TypeDecl {
        name: &'a str,
        base: TypeBase<'a>,
    },
    ClassDecl {
        name: &'a str,
        superclass: Option<&'a str>,
        body: &'a Expr,
    },
    New {
        class: &'a str,
        arguments: &'a [Expr],
    },
    Super {
        class: &'a str,
    },
    Prop {
        instance: &'a Expr,
        field: &'a str,
    },
    VarDecl {
        target: Binding<'a>,
        value: &'a Expr,
    },
    Identifier(&'a str),
    Set {
        target: AssignTarget<'a>,
        value: &'a Expr,
    },
    Block(&'a [Expr]),
    If {
        condition: &'a Expr,
        narrowing: Option<Narrowing<'a>>,
        then_branch: &'a Expr,
        else_branch: &'a Expr,
    },
    While {
        condition: &'a Expr,
        body: &'a Expr,
    },
    Def {
        name: &'a str,
        signature: Signature<'a>,
    },
    Lambda(Signature<'a>),
    TypeOf(&'a Expr),
    Call {
        callee: &'a Expr,
        type_arguments: Option<Vec<&'a str>>,
        arguments: &'a [Expr],
    },
}

impl<'a> Form<'a> {
    pub fn classify(expr: &'a Expr) -> Result<Form<'a>, Error> {
        let items = match expr {
            Expr::Number(_) => return Ok(Form::Literal(LiteralKind::Number)),
            Expr::String(_) => return Ok(Form::Literal(LiteralKind::String)),
            Expr::Boolean(_) => return Ok(Form::Literal(LiteralKind::Boolean)),
            Expr::Symbol(name) => {
                if IDENTIFIER.is_match(name) && !KEYWORDS.contains(name.as_str()) {
                    return Ok(Form::Identifier(name));
                }
                return Err(unknown(expr));
            }
            Expr::List(items) => items,
        };

        let Some(first) = items.first() else {
            return Err(unknown(expr));
        };
        let operands = &items[1..];

        let Some(tag) = first.as_symbol() else {
            return classify_call(expr, first, operands);
        };

        if let Ok(operator) = BinaryOperator::try_from(tag) {
            expect_operands(expr, tag, operands, 2)?;
            return Ok(Form::Arithmetic {
                operator,
                left: &operands[0],
                right: &operands[1],
            });
        }

        if let Ok(operator) = ComparisonOperator::try_from(tag) {
            expect_operands(expr, tag, operands, 2)?;
            return Ok(Form::Comparison {
                operator,
                left: &operands[0],
                right: &operands[1],
            });
        }

        match tag {
            "type" => {
                expect_operands(expr, tag, operands, 2)?;
                let name = symbol_of(expr, &operands[0])?;
                let base = match &operands[1] {
                    Expr::Symbol(base) => TypeBase::Alias(base),
                    Expr::List(members) if operands[1].head() == Some("or") => TypeBase::Union(
                        members[1..]
                            .iter()
                            .map(|member| symbol_of(expr, member))
                            .collect::<Result<Vec<_>, _>>()?,
                    ),
                    _ => return Err(unknown(expr)),
                };
                Ok(Form::TypeDecl { name, base })
            }
            "class" => {
                expect_operands(expr, tag, operands, 3)?;
                let name = symbol_of(expr, &operands[0])?;
                let superclass = match symbol_of(expr, &operands[1])? {
                    "null" => None,
                    superclass => Some(superclass),
                };
                Ok(Form::ClassDecl {
                    name,
                    superclass,
                    body: &operands[2],
                })
            }
            "new" => {
                if operands.is_empty() {
                    return Err(arity(tag, 1, 0, expr));
                }
                Ok(Form::New {
                    class: symbol_of(expr, &operands[0])?,
                    arguments: &operands[1..],
                })
            }
            "super" => {
                expect_operands(expr, tag, operands, 1)?;
                Ok(Form::Super {
                    class: symbol_of(expr, &operands[0])?,
                })
            }
            "prop" => {
                expect_operands(expr, tag, operands, 2)?;
                Ok(Form::Prop {
                    instance: &operands[0],
                    field: symbol_of(expr, &operands[1])?,
                })
            }
            "var" => {
                expect_operands(expr, tag, operands, 2)?;
                Ok(Form::VarDecl {
                    target: binding_of(expr, &operands[0])?,
                    value: &operands[1],
                })
            }
            "set" => {
                expect_operands(expr, tag, operands, 2)?;
                let target = match &operands[0] {
                    Expr::Symbol(name) => AssignTarget::Name(name),
                    target => match Form::classify(target)? {
                        Form::Prop { instance, field } => AssignTarget::Prop { instance, field },
                        _ => return Err(unknown(expr)),
                    },
                };
                Ok(Form::Set {
                    target,
                    value: &operands[1],
                })
            }
            "begin" => {
                if operands.is_empty() {
                    return Err(unknown(expr));
                }
                Ok(Form::Block(operands))
            }
            "if" => {
                expect_operands(expr, tag, operands, 3)?;
                Ok(Form::If {
                    condition: &operands[0],
                    narrowing: narrowing_of(&operands[0]),
                    then_branch: &operands[1],
                    else_branch: &operands[2],
                })
            }
            "while" => {
                expect_operands(expr, tag, operands, 2)?;
                Ok(Form::While {
                    condition: &operands[0],
                    body: &operands[1],
                })
            }
            "def" => {
                if operands.is_empty() {
                    return Err(arity(tag, 4, 0, expr));
                }
                Ok(Form::Def {
                    name: symbol_of(expr, &operands[0])?,
                    signature: signature_of(expr, tag, &operands[1..])?,
                })
            }
            "lambda" => Ok(Form::Lambda(signature_of(expr, tag, operands)?)),
            "typeof" => {
                expect_operands(expr, tag, operands, 1)?;
                Ok(Form::TypeOf(&operands[0]))
            }
            _ if KEYWORDS.contains(tag) => Err(unknown(expr)),
            _ => classify_call(expr, first, operands),
        }
    }
}

/// Splits `<K,V>` into `["K", "V"]`, or returns `None` if `symbol` is not a
/// generic parameter list.
pub fn generic_list(symbol: &str) -> Option<Vec<&str>> {
    if symbol.len() > 2 && symbol.starts_with('<') && symbol.ends_with('>') {
        Some(split_top_level(&symbol[1..symbol.len() - 1]))
    } else {
        None
    }
}

/// Splits on commas that are not nested inside angle brackets.
pub fn split_top_level(list: &str) -> Vec<&str> {
    let mut parts = vec![];
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in list.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                parts.push(list[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(list[start..].trim());
    parts
}

fn classify_call<'a>(expr: &'a Expr, callee: &'a Expr, operands: &'a [Expr]) -> Result<Form<'a>, Error> {
    match operands.first().and_then(Expr::as_symbol).and_then(generic_list) {
        Some(type_arguments) => Ok(Form::Call {
            callee,
            type_arguments: Some(type_arguments),
            arguments: &operands[1..],
        }),
        None => {
            if callee.is_atom() && callee.as_symbol().is_none() {
                return Err(unknown(expr));
            }
            Ok(Form::Call {
                callee,
                type_arguments: None,
                arguments: operands,
            })
        }
    }
}

fn narrowing_of(condition: &Expr) -> Option<Narrowing<'_>> {
    let items = condition.as_list()?;
    if condition.head() != Some("==") || items.len() != 3 {
        return None;
    }
    let probe = items[1].as_list()?;
    if items[1].head() != Some("typeof") || probe.len() != 2 {
        return None;
    }
    let name = probe[1].as_symbol()?;
    match &items[2] {
        Expr::String(type_name) => Some(Narrowing { name, type_name }),
        _ => None,
    }
}

fn signature_of<'a>(expr: &'a Expr, tag: &str, operands: &'a [Expr]) -> Result<Signature<'a>, Error> {
    let (generics, rest) = match operands.first().and_then(Expr::as_symbol).and_then(generic_list) {
        Some(generics) => (generics, &operands[1..]),
        None => (vec![], operands),
    };

    if rest.len() != 4 {
        return Err(arity(tag, 4, rest.len(), expr));
    }
    if rest[1].as_symbol() != Some("->") {
        return Err(unknown(expr));
    }

    let Some(param_list) = rest[0].as_list() else {
        return Err(unknown(expr));
    };
    let mut params = vec![];
    for param in param_list {
        let binding = binding_of(expr, param)?;
        match binding.type_annotation {
            Some(type_name) => params.push((binding.name, type_name)),
            None => return Err(unknown(expr)),
        }
    }

    Ok(Signature {
        generics,
        params,
        return_type: symbol_of(expr, &rest[2])?,
        body: &rest[3],
    })
}

fn binding_of<'a>(expr: &'a Expr, target: &'a Expr) -> Result<Binding<'a>, Error> {
    match target {
        Expr::Symbol(name) => Ok(Binding {
            name,
            type_annotation: None,
        }),
        Expr::List(pair) if pair.len() == 2 => Ok(Binding {
            name: symbol_of(expr, &pair[0])?,
            type_annotation: Some(symbol_of(expr, &pair[1])?),
        }),
        _ => Err(unknown(expr)),
    }
}

fn symbol_of<'a>(expr: &Expr, operand: &'a Expr) -> Result<&'a str, Error> {
    operand.as_symbol().ok_or_else(|| unknown(expr))
}

fn expect_operands(expr: &Expr, tag: &str, operands: &[Expr], expected: usize) -> Result<(), Error> {
    if operands.len() != expected {
        return Err(arity(tag, expected, operands.len(), expr));
    }
    Ok(())
}

fn arity(construct: &str, expected: usize, received: usize, expr: &Expr) -> Error {
    Error::in_expr(
        ErrorImpl::ArityMismatch {
            construct: construct.to_string(),
            expected,
            received,
        },
        expr,
    )
}

fn unknown(expr: &Expr) -> Error {
    Error::in_expr(ErrorImpl::UnknownExpression, expr)
}
