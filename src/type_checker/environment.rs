use std::collections::HashMap;

use crate::errors::errors::ErrorImpl;

use super::types::TypeId;

/// Index of a scope in the `Environments` arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnvId(usize);

#[derive(Debug)]
pub struct Scope {
    pub record: HashMap<String, TypeId>,
    pub parent: Option<EnvId>,
    /// Pinned scopes outlive the construct that opened them (class bodies,
    /// scopes captured by generic templates).
    pub pinned: bool,
}

/// Arena of lexical scopes. Slot 0 is the global scope.
#[derive(Debug)]
pub struct Environments {
    scopes: Vec<Option<Scope>>,
    /// Released slots, reused by `push`.
    free: Vec<usize>,
}

impl Default for Environments {
    fn default() -> Self {
        Self::new()
    }
}

impl Environments {
    pub fn new() -> Self {
        Environments {
            scopes: vec![Some(Scope {
                record: HashMap::new(),
                parent: None,
                pinned: true,
            })],
            free: vec![],
        }
    }

    pub fn global(&self) -> EnvId {
        EnvId(0)
    }

    /// Opens a new child scope of `parent`.
    pub fn push(&mut self, parent: EnvId) -> EnvId {
        let scope = Some(Scope {
            record: HashMap::new(),
            parent: Some(parent),
            pinned: false,
        });

        match self.free.pop() {
            Some(index) => {
                self.scopes[index] = scope;
                EnvId(index)
            }
            None => {
                self.scopes.push(scope);
                EnvId(self.scopes.len() - 1)
            }
        }
    }

    /// Keeps `env` and every scope it resolves through alive past `release`.
    pub fn pin(&mut self, env: EnvId) {
        let mut current = Some(env);
        while let Some(id) = current {
            let Some(Some(scope)) = self.scopes.get_mut(id.0) else {
                break;
            };
            // A pinned scope's ancestors are already pinned.
            if scope.pinned {
                break;
            }
            scope.pinned = true;
            current = scope.parent;
        }
    }

    /// Drops a scope once the construct that opened it is done, unless pinned.
    pub fn release(&mut self, env: EnvId) {
        if let Some(slot) = self.scopes.get_mut(env.0) {
            if slot.as_ref().is_some_and(|scope| !scope.pinned) {
                *slot = None;
                self.free.push(env.0);
            }
        }
    }

    pub fn is_live(&self, env: EnvId) -> bool {
        matches!(self.scopes.get(env.0), Some(Some(_)))
    }

    pub fn live_scopes(&self) -> usize {
        self.scopes.iter().filter(|slot| slot.is_some()).count()
    }

    fn scope(&self, env: EnvId) -> Option<&Scope> {
        self.scopes.get(env.0).and_then(Option::as_ref)
    }

    /// Binds `name` in `env` itself, overwriting any local binding.
    pub fn define(&mut self, env: EnvId, name: &str, ty: TypeId) -> TypeId {
        if let Some(Some(scope)) = self.scopes.get_mut(env.0) {
            scope.record.insert(name.to_string(), ty);
        }
        ty
    }

    /// Removes a local binding, returning its type if there was one.
    pub fn remove(&mut self, env: EnvId, name: &str) -> Option<TypeId> {
        match self.scopes.get_mut(env.0) {
            Some(Some(scope)) => scope.record.remove(name),
            _ => None,
        }
    }

    /// Reads a binding from `env`'s own record without walking parents.
    pub fn get_local(&self, env: EnvId, name: &str) -> Option<TypeId> {
        self.scope(env).and_then(|scope| scope.record.get(name).copied())
    }

    /// Finds the scope that owns `name`, walking towards the global scope.
    pub fn resolve(&self, env: EnvId, name: &str) -> Result<EnvId, ErrorImpl> {
        let mut current = Some(env);
        while let Some(id) = current {
            let Some(scope) = self.scope(id) else {
                break;
            };
            if scope.record.contains_key(name) {
                return Ok(id);
            }
            current = scope.parent;
        }

        Err(ErrorImpl::UnresolvedReference {
            name: name.to_string(),
        })
    }

    pub fn lookup(&self, env: EnvId, name: &str) -> Result<TypeId, ErrorImpl> {
        let owner = self.resolve(env, name)?;
        self.get_local(owner, name)
            .ok_or_else(|| ErrorImpl::UnresolvedReference {
                name: name.to_string(),
            })
    }
}
