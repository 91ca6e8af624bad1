//! Helper resolution: which project functions does a target call?
//!
//! Resolution is conservative by default. A call is reported only when its
//! binding can be proven from the module's own definitions, its imports and
//! the project index. Everything else is dropped unless aggressive fallback
//! asks for same-name matches across the project.

use std::collections::BTreeSet;

use crate::analysis::{qualify, AliasMaps, BindingSet, QualifiedCall};
use crate::index::ProjectIndex;

/// Everything the engine knows about the module holding the target.
#[derive(Debug, Clone, Copy)]
pub struct Resolver<'a> {
    pub index: &'a ProjectIndex,
    pub aliases: &'a AliasMaps,
    /// Qualified name of the target's module.
    pub module: &'a str,
    /// Top-level function names defined in that module.
    pub local_functions: &'a BTreeSet<String>,
    /// Target as requested: `name` or `Class.method`.
    pub target: &'a str,
    pub aggressive: bool,
}

impl<'a> Resolver<'a> {
    /// Resolve every call in `bindings` to qualified helper paths.
    pub fn resolve(&self, bindings: &BindingSet) -> BTreeSet<String> {
        let mut helpers = BTreeSet::new();
        for name in &bindings.bare_calls {
            self.resolve_bare(name, bindings, &mut helpers);
        }
        for call in &bindings.qualified_calls {
            self.resolve_qualified(call, bindings, &mut helpers);
        }
        helpers
    }

    fn resolve_bare(&self, name: &str, bindings: &BindingSet, out: &mut BTreeSet<String>) {
        if bindings.is_bound(name) {
            tracing::trace!(call = name, "shadowed by a local binding");
            return;
        }

        // Same-file definitions beat imports.
        if self.local_functions.contains(name) {
            out.insert(qualify(self.module, name));
            return;
        }

        if let Some(path) = self.aliases.from_names.get(name) {
            if let Some(found) = self.index.follow(path) {
                out.insert(found.qualified_name());
                return;
            }
        }

        self.fallback(name, out);
    }

    fn resolve_qualified(
        &self,
        call: &QualifiedCall,
        bindings: &BindingSet,
        out: &mut BTreeSet<String>,
    ) {
        if bindings.is_bound(&call.root) {
            tracing::trace!(root = %call.root, "call on a local object");
            return;
        }
        let Some(module) = self.aliases.module_for_root(&call.root) else {
            tracing::trace!(root = %call.root, "root is not an imported name");
            return;
        };
        let Some((func, _)) = call.chain.split_last() else {
            return;
        };

        // `import a.b` binds `a` but records `a.b`, so `a.b.f()` is also
        // tried from the bound root itself.
        let mut bases = vec![module];
        if module.starts_with(&format!("{}.", call.root)) {
            bases.push(call.root.as_str());
        }

        for base in bases {
            let mut candidate = base.to_string();
            for segment in &call.chain {
                candidate.push('.');
                candidate.push_str(segment);
            }
            if let Some(found) = self.index.follow(&candidate) {
                out.insert(found.qualified_name());
                return;
            }
        }

        self.fallback(func, out);
    }

    /// Every same-named top-level function in the project, minus the target.
    fn fallback(&self, name: &str, out: &mut BTreeSet<String>) {
        if !self.aggressive {
            tracing::trace!(call = name, "unresolved call dropped");
            return;
        }
        let own = qualify(self.module, self.target);
        for entry in self.index.by_name(name) {
            let path = entry.qualified_name();
            if path != own {
                out.insert(path);
            }
        }
    }
}

/// Resolve the calls of one function. See [`Resolver`].
pub fn resolve_helpers(resolver: &Resolver<'_>, bindings: &BindingSet) -> BTreeSet<String> {
    resolver.resolve(bindings)
}
