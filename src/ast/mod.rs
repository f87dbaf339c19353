/// AST (Abstract Syntax Tree) module
/// Contains the expression representation consumed by the checker
///
/// Submodules:
/// - ast: The `Expr` tree of atoms and tagged sequences
/// - forms: Classification of expressions into the forms the checker handles
pub mod ast;
pub mod forms;
