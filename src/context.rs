//! Generation context: one scope of generated code.
//!
//! Contexts form a tree that mirrors the nesting of the generated blocks. A
//! child borrows its parent for as long as it is alive, answers lookups by
//! walking up the chain, and reports the objects it used back to its parent
//! when it is finished.

use std::collections::BTreeSet;

use crate::naming::object_list_name;

// ═══════════════════════════════════════════════════════════════════════════════
// PICKING
// ═══════════════════════════════════════════════════════════════════════════════

/// How much is known about the list of instances of an object in a scope.
/// Ordered: a scope never goes back to a lower state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum PickState {
    /// No list exists yet; the first use fetches every instance from the scene.
    #[default]
    NotYetPicked,
    /// An empty list was declared (e.g. to receive created instances). Later
    /// conditions still have to filter it, but no instance has to be fetched.
    PickedWithoutFiltering,
    /// A list exists and holds the current selection.
    Picked,
}

/// Where the instances of a list declared in a scope come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListSource {
    /// Every instance living in the scene.
    Scene,
    Empty,
    /// Copy of the list declared by an enclosing scope at `depth`.
    Parent { depth: usize },
    /// The single instance at `index_variable` of the list declared at `depth`.
    Element { depth: usize, index_variable: String },
    /// The instances captured when the enclosing asynchronous callback was
    /// scheduled.
    AsyncSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectsListDeclaration {
    pub object_name: String,
    pub source: ListSource,
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONTEXT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct GenerationContext<'p> {
    parent: Option<&'p GenerationContext<'p>>,
    depth: usize,
    /// Declarations of this scope, in the order they must be emitted.
    declarations: Vec<ObjectsListDeclaration>,
    states: Vec<(String, PickState)>,
    /// Objects whose list was narrowed by a condition of this scope.
    filtered: BTreeSet<String>,
    used_objects: BTreeSet<String>,
    current_object: Option<String>,
    condition_depth: usize,
    /// First scope of an asynchronous callback function.
    async_root: bool,
    async_depth: usize,
}

impl GenerationContext<'static> {
    /// Context of the main function of a layout.
    pub fn root() -> Self {
        GenerationContext {
            parent: None,
            depth: 0,
            declarations: Vec::new(),
            states: Vec::new(),
            filtered: BTreeSet::new(),
            used_objects: BTreeSet::new(),
            current_object: None,
            condition_depth: 0,
            async_root: false,
            async_depth: 0,
        }
    }
}

impl<'p> GenerationContext<'p> {
    /// Scope of a nested block (sub-events, loop body, sub-conditions).
    pub fn new_child(&self) -> GenerationContext<'_> {
        GenerationContext {
            parent: Some(self),
            depth: self.depth + 1,
            declarations: Vec::new(),
            states: Vec::new(),
            filtered: BTreeSet::new(),
            used_objects: BTreeSet::new(),
            current_object: None,
            condition_depth: self.condition_depth,
            async_root: false,
            async_depth: self.async_depth,
        }
    }

    /// Scope of the body of an asynchronous callback scheduled from `self`.
    /// Lists known to the ancestors are read back from the snapshot passed to
    /// the callback.
    pub fn new_async_callback_child(&self) -> GenerationContext<'_> {
        let mut child = self.new_child();
        child.async_root = true;
        child.async_depth += 1;
        child
    }

    /// Scope of the sub-conditions of a combinator (`Or`): a nested block
    /// whose booleans must not clash with the enclosing ones.
    pub fn new_conditions_child(&self) -> GenerationContext<'_> {
        let mut child = self.new_child();
        child.condition_depth += 1;
        child
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn condition_depth(&self) -> usize {
        self.condition_depth
    }

    /// Nests the booleans of sub-conditions generated in this same scope
    /// (`And`, `Not`). Must be balanced by [`Self::leave_nested_conditions`].
    pub fn enter_nested_conditions(&mut self) {
        self.condition_depth += 1;
    }

    pub fn leave_nested_conditions(&mut self) {
        self.condition_depth = self.condition_depth.saturating_sub(1);
    }

    pub fn is_async_root(&self) -> bool {
        self.async_root
    }

    /// Whether the code of this scope runs inside an asynchronous callback.
    pub fn is_inside_async_callback(&self) -> bool {
        self.async_depth > 0
    }

    pub fn current_object(&self) -> Option<&str> {
        self.current_object.as_deref()
    }

    /// Object whose instances are being iterated by the instruction being
    /// generated. Expressions on it use the current instance.
    pub fn set_current_object(&mut self, object_name: Option<&str>) {
        self.current_object = object_name.map(str::to_string);
    }

    /// This scope, then every enclosing one.
    fn ancestors(&self) -> impl Iterator<Item = &GenerationContext<'_>> + '_ {
        let start: &GenerationContext<'_> = self;
        std::iter::successors(Some(start), |c| c.parent)
    }

    fn local_state(&self, object_name: &str) -> PickState {
        self.states
            .iter()
            .find(|(name, _)| name == object_name)
            .map(|(_, state)| *state)
            .unwrap_or_default()
    }

    fn set_local_state(&mut self, object_name: &str, state: PickState) {
        match self.states.iter_mut().find(|(name, _)| name == object_name) {
            Some(entry) => entry.1 = entry.1.max(state),
            None => self.states.push((object_name.to_string(), state)),
        }
    }

    /// State of the list of `object_name` as seen from this scope.
    pub fn pick_state(&self, object_name: &str) -> PickState {
        self.ancestors()
            .map(|c| c.local_state(object_name))
            .max()
            .unwrap_or_default()
    }

    pub fn mark_picked(&mut self, object_name: &str) {
        self.set_local_state(object_name, PickState::Picked);
    }

    pub fn mark_picked_without_filtering(&mut self, object_name: &str) {
        self.set_local_state(object_name, PickState::PickedWithoutFiltering);
    }

    /// Whether a list of `object_name` exists in this scope or above.
    pub fn is_already_picked(&self, object_name: &str) -> bool {
        self.pick_state(object_name) != PickState::NotYetPicked
    }

    /// Whether code reducing the list of `object_name` to the instances that
    /// matter is still needed, i.e. the list is not a real selection yet.
    pub fn should_generate_filtering_code(&self, object_name: &str) -> bool {
        self.pick_state(object_name) != PickState::Picked
    }

    fn local_declaration(&self, object_name: &str) -> Option<&ObjectsListDeclaration> {
        self.declarations.iter().find(|d| d.object_name == object_name)
    }

    /// Depth of the nearest scope declaring `object_name`, and whether the
    /// way up to it leaves the current asynchronous callback.
    fn nearest_declaration(&self, object_name: &str) -> Option<(usize, bool)> {
        let mut crossed_async_root = false;
        for scope in self.ancestors() {
            if scope.local_declaration(object_name).is_some() {
                return Some((scope.depth, crossed_async_root));
            }
            if scope.async_root {
                crossed_async_root = true;
            }
        }
        None
    }

    fn declare(&mut self, object_name: &str, source: ListSource) {
        self.declarations.push(ObjectsListDeclaration {
            object_name: object_name.to_string(),
            source,
        });
    }

    /// Declares in this scope a list continuing the one of the enclosing
    /// scopes: a copy of it, or its snapshot when it lives outside the
    /// current callback.
    fn declare_inherited(&mut self, object_name: &str) {
        let source = match self.nearest_declaration(object_name) {
            Some((depth, false)) => ListSource::Parent { depth },
            _ if self.is_inside_async_callback() => ListSource::AsyncSnapshot,
            _ => ListSource::Scene,
        };
        self.declare(object_name, source);
    }

    /// Makes sure a list holding the current selection of `object_name` is
    /// declared in this scope.
    pub fn objects_list_needed(&mut self, object_name: &str) {
        self.used_objects.insert(object_name.to_string());
        if self.local_declaration(object_name).is_some() {
            self.mark_picked(object_name);
            return;
        }
        if self.is_already_picked(object_name) {
            self.declare_inherited(object_name);
        } else {
            self.declare(object_name, ListSource::Scene);
        }
        self.mark_picked(object_name);
    }

    /// Makes sure a list of `object_name` is declared in this scope without
    /// fetching instances: empty unless a selection already exists.
    pub fn empty_objects_list_needed(&mut self, object_name: &str) {
        self.used_objects.insert(object_name.to_string());
        if self.local_declaration(object_name).is_some() {
            return;
        }
        if self.is_already_picked(object_name) {
            self.declare_inherited(object_name);
        } else {
            self.declare(object_name, ListSource::Empty);
            self.mark_picked_without_filtering(object_name);
        }
    }

    /// Declares `object_name` as the single instance at `index_variable` of
    /// the list seen from the parent scope (body of a for-each loop).
    pub fn declare_element(&mut self, object_name: &str, index_variable: &str) {
        self.used_objects.insert(object_name.to_string());
        let depth = self
            .parent
            .and_then(|p| p.nearest_declaration(object_name))
            .map(|(depth, _)| depth)
            .unwrap_or(self.depth);
        self.declare(
            object_name,
            ListSource::Element {
                depth,
                index_variable: index_variable.to_string(),
            },
        );
        self.mark_picked(object_name);
        self.filtered.insert(object_name.to_string());
    }

    /// Declares an empty selection of `object_name` in this scope, hiding
    /// whatever the enclosing scopes picked.
    pub fn declare_empty(&mut self, object_name: &str) {
        self.used_objects.insert(object_name.to_string());
        if self.local_declaration(object_name).is_none() {
            self.declare(object_name, ListSource::Empty);
        }
        self.mark_picked(object_name);
        self.filtered.insert(object_name.to_string());
    }

    /// Records that a condition of this scope narrowed the list of
    /// `object_name`.
    pub fn mark_filtered(&mut self, object_name: &str) {
        self.filtered.insert(object_name.to_string());
    }

    /// Whether the list of `object_name` seen from this scope is exactly the
    /// one captured when the enclosing callback was scheduled, so capturing
    /// it again is useless.
    pub fn is_captured_by_async_ancestor(&self, object_name: &str) -> bool {
        for scope in self.ancestors() {
            if scope.filtered.contains(object_name) {
                return false;
            }
            match scope.local_declaration(object_name).map(|d| &d.source) {
                Some(ListSource::AsyncSnapshot) => return true,
                Some(ListSource::Parent { .. }) | None => {}
                Some(_) => return false,
            }
            if scope.async_root {
                return scope
                    .parent
                    .map(|p| p.is_already_picked(object_name))
                    .unwrap_or(false);
            }
        }
        false
    }

    /// Depth of the list of `object_name` visible from this scope.
    pub fn last_depth_object_list_was_needed(&self, object_name: &str) -> usize {
        self.nearest_declaration(object_name)
            .map(|(depth, _)| depth)
            .unwrap_or(self.depth)
    }

    /// Name of the variable holding the list of `object_name` visible from
    /// this scope.
    pub fn object_list_name(&self, object_name: &str) -> String {
        object_list_name(object_name, self.last_depth_object_list_was_needed(object_name))
    }

    /// Whether this very scope declares a list of `object_name`.
    pub fn declares_locally(&self, object_name: &str) -> bool {
        self.local_declaration(object_name).is_some()
    }

    pub fn declarations(&self) -> &[ObjectsListDeclaration] {
        &self.declarations
    }

    pub fn used_objects(&self) -> &BTreeSet<String> {
        &self.used_objects
    }

    /// Ends the scope, handing the objects it used to the caller so they can
    /// be reported to the parent with [`Self::absorb_used_objects`].
    pub fn into_used_objects(self) -> BTreeSet<String> {
        self.used_objects
    }

    pub fn absorb_used_objects(&mut self, used: BTreeSet<String>) {
        self.used_objects.extend(used);
    }
}
