//! The Context Stack: scoped acquisition of nested parse contexts with
//! guaranteed release on every exit path, including error paths.
//!
//! A [`Context`] names the kind of block currently being parsed
//! (`workspace`, `model`, `softwareSystem[banking]`, `group`, …) and carries
//! a small typed data bag. Sub-parsers push a context on entering a block
//! and must leave it popped again by the time their `parse*` call returns —
//! by normal return, by recovery after an error, or by a propagating fatal.
//! [`ContextGuard`] enforces this with a pop-on-`Drop` scope guard so the
//! invariant holds even across early returns via `?`.

use crate::ast::IdentifierScheme;

/// The small typed bag a [`Context`] carries. Unlike a generic
/// `HashMap<String, Box<dyn Any>>`, every field sub-parsers might need is
/// named up front: there is a fixed, known set of things a nested context
/// can usefully remember about its enclosing scope.
#[derive(Debug, Clone, Default)]
pub struct ContextData {
    /// Id of the element currently being populated, if any (the `element`
    /// a property assignment or nested relationship attaches to).
    pub current_element_id: Option<String>,
    /// Id of the nearest enclosing element, for parent/child linkage.
    pub parent_id: Option<String>,
    /// The `!identifiers` mode in effect for this subtree, if set.
    pub identifier_scheme: Option<IdentifierScheme>,
}

/// A single entry on the [`ContextStack`]: a name (`"workspace"`,
/// `"softwareSystem[banking]"`, ...) plus its data bag.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub name: String,
    pub data: ContextData,
}

impl Context {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ContextData::default(),
        }
    }

    pub fn with_current_element(name: impl Into<String>, element_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: ContextData {
                current_element_id: Some(element_id.into()),
                ..ContextData::default()
            },
        }
    }
}

/// Parser-owned stack of active parse contexts. Not thread-shared: a
/// `Parser` instance owns one stack exclusively for the duration of a
/// single `parse()` call.
#[derive(Debug, Default)]
pub struct ContextStack {
    frames: Vec<Context>,
}

impl ContextStack {
    pub fn new() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn push(&mut self, ctx: Context) {
        self.frames.push(ctx);
    }

    pub fn pop(&mut self) -> Option<Context> {
        self.frames.pop()
    }

    pub fn current(&self) -> Option<&Context> {
        self.frames.last()
    }

    pub fn current_mut(&mut self) -> Option<&mut Context> {
        self.frames.last_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn size(&self) -> usize {
        self.frames.len()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Finds the nearest enclosing frame with a `current_element_id`,
    /// searching from the top of the stack down. Used by the relationship
    /// parser to resolve an implicit source when none is written explicitly.
    pub fn nearest_element_id(&self) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|ctx| ctx.data.current_element_id.as_deref())
    }

    /// The active `!identifiers` scheme, inherited from the nearest frame
    /// that set one.
    pub fn identifier_scheme(&self) -> Option<IdentifierScheme> {
        self.frames
            .iter()
            .rev()
            .find_map(|ctx| ctx.data.identifier_scheme)
    }

    /// A slash-joined breadcrumb of the stack's context names, e.g.
    /// `workspace/model/softwareSystem[banking]/container[api]`, used by
    /// the diagnostics reporter as `contextPath`.
    pub fn path(&self) -> String {
        self.frames
            .iter()
            .map(|ctx| ctx.name.as_str())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// RAII scope guard: pops its frame on `Drop`, guaranteeing the
/// push-on-enter/pop-on-exit discipline holds across normal return, error
/// return (via `?`), and panic-mode recovery, without every call site
/// having to remember to pop explicitly.
///
/// The guard borrows the stack mutably for its lifetime, so a sub-parser
/// holding a `ContextGuard` cannot also hold another mutable borrow of the
/// same stack; it must drop the guard (or let it go out of scope) before
/// the caller can push again at the same level.
pub struct ContextGuard<'a> {
    stack: &'a mut ContextStack,
}

impl<'a> ContextGuard<'a> {
    pub fn enter(stack: &'a mut ContextStack, ctx: Context) -> Self {
        stack.push(ctx);
        Self { stack }
    }

    pub fn stack(&self) -> &ContextStack {
        self.stack
    }

    pub fn stack_mut(&mut self) -> &mut ContextStack {
        self.stack
    }
}

impl Drop for ContextGuard<'_> {
    fn drop(&mut self) {
        self.stack.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_pop_round_trip() {
        let mut stack = ContextStack::new();
        assert!(stack.is_empty());
        stack.push(Context::new("workspace"));
        stack.push(Context::new("model"));
        assert_eq!(stack.size(), 2);
        assert_eq!(stack.path(), "workspace/model");
        stack.pop();
        stack.pop();
        assert!(stack.is_empty());
    }

    #[test]
    fn guard_pops_on_drop_even_after_early_return() {
        fn enters_and_bails(stack: &mut ContextStack) -> Result<(), ()> {
            let _guard = ContextGuard::enter(stack, Context::new("softwareSystem[banking]"));
            Err(())
        }

        let mut stack = ContextStack::new();
        let _ = enters_and_bails(&mut stack);
        assert!(stack.is_empty(), "guard must pop even on early return");
    }

    #[test]
    fn nearest_element_id_searches_outward() {
        let mut stack = ContextStack::new();
        stack.push(Context::with_current_element("workspace", "w"));
        stack.push(Context::new("model"));
        stack.push(Context::with_current_element("softwareSystem", "banking"));
        assert_eq!(stack.nearest_element_id(), Some("banking"));
        stack.pop();
        assert_eq!(stack.nearest_element_id(), Some("w"));
    }

    #[test]
    fn identifier_scheme_inherits_from_enclosing_frame() {
        let mut stack = ContextStack::new();
        let mut root = Context::new("workspace");
        root.data.identifier_scheme = Some(IdentifierScheme::Hierarchical);
        stack.push(root);
        stack.push(Context::new("model"));
        assert_eq!(stack.identifier_scheme(), Some(IdentifierScheme::Hierarchical));
    }

    #[test]
    fn path_is_empty_when_stack_is_empty() {
        let stack = ContextStack::new();
        assert_eq!(stack.path(), "");
    }
}
