//! # Pattern Editor
//!
//! Structural editing of variant patterns ([`VariantElement`] trees).
//!
//! Insertion places a new activity leaf relative to the selected element
//! under one of six strategies. Each strategy is a recursive search for the
//! selection with case analysis on the composite kind at the insertion
//! point: splice directly into a group that already has the wrapper kind,
//! push into a target that itself has the wrapper kind, wrap otherwise.
//! Deletion removes every selected element and then consolidates: groups
//! reduced to one child collapse into their surroundings, empty groups
//! disappear, at every level touched.
//!
//! Selection lives in the tree itself (the `selected` flags); insertion
//! requires exactly one selected element, deletion accepts many.

use treelab_model::variant_element::{infix_type, InfixType};
use treelab_model::VariantElement;

use crate::errors::EditError;
use crate::history::History;

/// Capacity of the pattern editor's local undo history.
pub const PATTERN_HISTORY_CAPACITY: usize = 100;

/// How a new activity is inserted relative to the selected element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertionStrategy {
    Infront,
    Behind,
    Parallel,
    Choice,
    Fallthrough,
    Replace,
}

/// The wrapper kinds shared by the parallel/choice/fallthrough insertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Parallel,
    Choice,
    Fallthrough,
}

impl GroupKind {
    fn wrap(self, elements: Vec<VariantElement>) -> VariantElement {
        match self {
            GroupKind::Parallel => VariantElement::parallel(elements),
            GroupKind::Choice => VariantElement::choice(elements),
            GroupKind::Fallthrough => VariantElement::fallthrough(elements),
        }
    }

    fn matches(self, element: &VariantElement) -> bool {
        match self {
            GroupKind::Parallel => element.is_parallel(),
            GroupKind::Choice => element.is_choice(),
            GroupKind::Fallthrough => element.is_fallthrough(),
        }
    }
}

pub struct PatternEditor {
    current: Option<VariantElement>,
    history: History<VariantElement>,
}

impl PatternEditor {
    pub fn new() -> Self {
        Self {
            current: None,
            history: History::with_capacity(PATTERN_HISTORY_CAPACITY),
        }
    }

    pub fn from_variant(variant: VariantElement) -> Self {
        let mut editor = Self {
            current: Some(variant),
            history: History::with_capacity(PATTERN_HISTORY_CAPACITY),
        };
        editor.cache();
        editor
    }

    pub fn variant(&self) -> Option<&VariantElement> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    // Selection. Paths address elements positionally from the root; the
    // empty path is the root itself.

    /// Make the element at `path` the only selected one.
    pub fn select_only(&mut self, path: &[usize]) -> Result<(), EditError> {
        let root = self
            .current
            .as_mut()
            .ok_or_else(|| EditError::InvalidOperation("the pattern is empty".to_string()))?;
        if node_at_path(root, path).is_none() {
            return Err(EditError::InvalidOperation(format!(
                "no element at path {:?}",
                path
            )));
        }
        root.clear_selection();
        if let Some(node) = node_at_path_mut(root, path) {
            node.set_selected(true);
        }
        Ok(())
    }

    /// Toggle one element's selection, keeping any other selections (used
    /// for multi-delete).
    pub fn toggle_selected(&mut self, path: &[usize]) -> Result<(), EditError> {
        let root = self
            .current
            .as_mut()
            .ok_or_else(|| EditError::InvalidOperation("the pattern is empty".to_string()))?;
        let node = node_at_path_mut(root, path).ok_or_else(|| {
            EditError::InvalidOperation(format!("no element at path {:?}", path))
        })?;
        let selected = node.selected();
        node.set_selected(!selected);
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        if let Some(root) = self.current.as_mut() {
            root.clear_selection();
        }
    }

    pub fn selected_count(&self) -> usize {
        self.current
            .as_ref()
            .map(VariantElement::selected_count)
            .unwrap_or(0)
    }

    /// Classify the current selection as prefix/suffix/proper infix.
    pub fn infix_type(&self) -> InfixType {
        self.current
            .as_ref()
            .map(infix_type)
            .unwrap_or(InfixType::NotAnInfix)
    }

    /// Reason the given insertion would be rejected, if any. The same
    /// checks are re-run inside [`PatternEditor::insert`].
    pub fn insert_guard(&self, strategy: InsertionStrategy) -> Option<String> {
        let root = self.current.as_ref()?;
        let path = path_to_selected(root)?;
        if path.is_empty() {
            // the root is selected: any strategy rewraps the whole tree
            return None;
        }

        let mut inside_fallthrough = false;
        let mut node = root;
        for &i in &path {
            if node.is_fallthrough() {
                inside_fallthrough = true;
            }
            node = node.elements()?.get(i)?;
        }

        if inside_fallthrough && strategy != InsertionStrategy::Fallthrough {
            return Some(
                "only fallthrough insertion is allowed inside a fallthrough group".to_string(),
            );
        }
        match strategy {
            InsertionStrategy::Choice if !node.is_leaf() && !node.is_choice() => {
                Some("choice insertion requires an activity or choice target".to_string())
            }
            InsertionStrategy::Fallthrough if !node.is_leaf() && !node.is_fallthrough() => {
                Some("fallthrough insertion requires an activity or fallthrough target".to_string())
            }
            _ => None,
        }
    }

    /// Insert a new activity leaf relative to the selected element. On an
    /// empty pattern the activity starts a new sequence and the selection
    /// is irrelevant. The new leaf becomes the selected element.
    pub fn insert(&mut self, strategy: InsertionStrategy, activity: &str) -> Result<(), EditError> {
        let mut leaf = VariantElement::leaf(activity);
        leaf.set_expanded(true);
        leaf.set_selected(true);

        if self.current.is_none() {
            let mut group = VariantElement::sequence(vec![leaf]);
            group.set_expanded(true);
            self.current = Some(group);
            self.cache();
            return Ok(());
        }

        let selected = self.selected_count();
        if selected == 0 {
            return Err(EditError::InvalidOperation(
                "no element selected".to_string(),
            ));
        }
        if selected > 1 {
            return Err(EditError::InvalidOperation(
                "insertion requires a single selected element".to_string(),
            ));
        }
        if let Some(reason) = self.insert_guard(strategy) {
            return Err(EditError::InvalidOperation(reason));
        }

        let Some(root) = self.current.as_mut() else {
            return Err(EditError::InvalidOperation(
                "the pattern is empty".to_string(),
            ));
        };

        let inserted = if root.selected() {
            insert_at_root(strategy, root, leaf);
            true
        } else {
            match strategy {
                InsertionStrategy::Infront => insert_adjacent_rec(false, root, &leaf),
                InsertionStrategy::Behind => insert_adjacent_rec(true, root, &leaf),
                InsertionStrategy::Parallel => {
                    insert_group_rec(GroupKind::Parallel, root, &leaf)
                }
                InsertionStrategy::Choice => insert_group_rec(GroupKind::Choice, root, &leaf),
                InsertionStrategy::Fallthrough => {
                    insert_group_rec(GroupKind::Fallthrough, root, &leaf)
                }
                InsertionStrategy::Replace => replace_rec(root, &leaf),
            }
        };
        if !inserted {
            return Err(EditError::InvalidOperation(
                "selected element not found".to_string(),
            ));
        }

        self.restore_parallel_order(strategy);
        self.cache();
        tracing::debug!("pattern insert {:?} of '{}' applied", strategy, activity);
        Ok(())
    }

    /// Re-sort the parallel group touched by an insertion into canonical
    /// order: leaves before composites, leaves alphabetical by first
    /// activity, composites keeping their relative order.
    fn restore_parallel_order(&mut self, strategy: InsertionStrategy) {
        let Some(root) = self.current.as_mut() else {
            return;
        };
        let Some(path) = path_to_selected(root) else {
            return;
        };

        let group_path = match strategy {
            // the new leaf's enclosing group
            InsertionStrategy::Parallel => {
                let Some((_, parent)) = path.split_last() else {
                    return;
                };
                parent
            }
            // inserting in sequence may have extended a sequence nested in
            // a parallel group: re-sort the enclosing grandparent
            InsertionStrategy::Infront | InsertionStrategy::Behind => {
                if path.len() < 2 {
                    return;
                }
                &path[..path.len() - 2]
            }
            _ => return,
        };

        if let Some(group) = node_at_path_mut(root, group_path) {
            sort_parallel(group);
        }
    }

    /// Delete every selected element, consolidating groups left with zero
    /// or one child at every level. Deleting the root (or emptying it)
    /// clears the whole pattern.
    pub fn delete_selected(&mut self) -> Result<(), EditError> {
        if self.current.is_none() {
            return Err(EditError::InvalidOperation(
                "the pattern is empty".to_string(),
            ));
        }
        if self.selected_count() == 0 {
            return Err(EditError::InvalidOperation(
                "no element selected".to_string(),
            ));
        }

        let root_selected = self
            .current
            .as_ref()
            .map(VariantElement::selected)
            .unwrap_or(false);
        if root_selected {
            self.current = None;
            self.cache();
            return Ok(());
        }

        if let Some(root) = self.current.as_mut() {
            delete_rec(root);
        }
        let emptied = self
            .current
            .as_ref()
            .and_then(VariantElement::elements)
            .map(Vec::is_empty)
            .unwrap_or(false);
        if emptied {
            self.current = None;
        }
        self.cache();
        tracing::debug!("pattern delete applied");
        Ok(())
    }

    /// Drop the whole pattern.
    pub fn delete_variant(&mut self) {
        self.current = None;
        self.cache();
    }

    /// Step back in the local history. Selection does not survive undo.
    pub fn undo(&mut self) -> Option<&VariantElement> {
        let restored = self.history.undo()?;
        self.current = restored.map(|mut v| {
            v.clear_selection();
            v
        });
        self.current.as_ref()
    }

    pub fn redo(&mut self) -> Option<&VariantElement> {
        let restored = self.history.redo()?;
        self.current = restored.map(|mut v| {
            v.clear_selection();
            v
        });
        self.current.as_ref()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    fn cache(&mut self) {
        self.history.cache(self.current.as_ref());
    }
}

impl Default for PatternEditor {
    fn default() -> Self {
        Self::new()
    }
}

fn node_at_path<'a>(root: &'a VariantElement, path: &[usize]) -> Option<&'a VariantElement> {
    let mut node = root;
    for &i in path {
        node = node.elements()?.get(i)?;
    }
    Some(node)
}

fn node_at_path_mut<'a>(
    root: &'a mut VariantElement,
    path: &[usize],
) -> Option<&'a mut VariantElement> {
    let mut node = root;
    for &i in path {
        node = node.elements_mut()?.get_mut(i)?;
    }
    Some(node)
}

/// Path from the root to the first selected element; empty path when the
/// root itself is selected.
fn path_to_selected(root: &VariantElement) -> Option<Vec<usize>> {
    if root.selected() {
        return Some(Vec::new());
    }
    let elements = root.elements()?;
    for (i, child) in elements.iter().enumerate() {
        if let Some(mut path) = path_to_selected(child) {
            path.insert(0, i);
            return Some(path);
        }
    }
    None
}

/// The selection is the root: the whole tree is rewrapped.
fn insert_at_root(strategy: InsertionStrategy, root: &mut VariantElement, leaf: VariantElement) {
    root.set_selected(false);

    if root.is_leaf() {
        // degenerate single-leaf pattern: build the wrapper directly
        let old = std::mem::replace(root, VariantElement::leaf(""));
        *root = match strategy {
            InsertionStrategy::Infront => VariantElement::sequence(vec![leaf, old]),
            InsertionStrategy::Behind => VariantElement::sequence(vec![old, leaf]),
            InsertionStrategy::Parallel => VariantElement::parallel(vec![leaf, old]),
            InsertionStrategy::Choice => VariantElement::choice(vec![leaf, old]),
            InsertionStrategy::Fallthrough => VariantElement::fallthrough(vec![leaf, old]),
            InsertionStrategy::Replace => leaf,
        };
        return;
    }

    match strategy {
        InsertionStrategy::Infront => {
            if let Some(elements) = root.elements_mut() {
                elements.insert(0, leaf);
            }
        }
        InsertionStrategy::Behind => {
            if let Some(elements) = root.elements_mut() {
                elements.push(leaf);
            }
        }
        InsertionStrategy::Parallel => {
            // the old content keeps its own kind inside the new group
            let old_children = root.take_elements();
            let rebuilt = rebuild_same_kind(root, old_children);
            root.set_elements(vec![VariantElement::parallel(vec![leaf, rebuilt])]);
        }
        InsertionStrategy::Choice => {
            let old_children = root.take_elements();
            let rebuilt = VariantElement::sequence(old_children);
            root.set_elements(vec![VariantElement::choice(vec![leaf, rebuilt])]);
        }
        InsertionStrategy::Fallthrough => {
            let old_children = root.take_elements();
            let rebuilt = VariantElement::sequence(old_children);
            root.set_elements(vec![VariantElement::fallthrough(vec![leaf, rebuilt])]);
        }
        InsertionStrategy::Replace => {
            root.set_elements(vec![leaf]);
        }
    }
}

fn rebuild_same_kind(template: &VariantElement, elements: Vec<VariantElement>) -> VariantElement {
    if template.is_parallel() {
        VariantElement::parallel(elements)
    } else if template.is_choice() {
        VariantElement::choice(elements)
    } else if template.is_fallthrough() {
        VariantElement::fallthrough(elements)
    } else {
        VariantElement::sequence(elements)
    }
}

/// Insert the leaf directly infront of/behind the selected element.
/// Inside a parallel group the target slot becomes a sequence of target and
/// leaf, unless the target already is a sequence, which is extended
/// instead of nesting a second one.
fn insert_adjacent_rec(behind: bool, variant: &mut VariantElement, leaf: &VariantElement) -> bool {
    let in_parallel = variant.is_parallel();
    let Some(children) = variant.elements_mut() else {
        return false;
    };

    if let Some(index) = children.iter().position(|c| c.selected()) {
        if in_parallel {
            if children[index].is_sequence() {
                children[index].set_selected(false);
                if let Some(sequence) = children[index].elements_mut() {
                    if behind {
                        sequence.push(leaf.clone());
                    } else {
                        sequence.insert(0, leaf.clone());
                    }
                }
            } else {
                let mut target = children.remove(index);
                target.set_selected(false);
                let pair = if behind {
                    vec![target, leaf.clone()]
                } else {
                    vec![leaf.clone(), target]
                };
                children.insert(index, VariantElement::sequence(pair));
            }
        } else {
            children[index].set_selected(false);
            let at = if behind { index + 1 } else { index };
            children.insert(at, leaf.clone());
        }
        true
    } else {
        children
            .iter_mut()
            .any(|c| insert_adjacent_rec(behind, c, leaf))
    }
}

/// Shared insertion for the three wrapping strategies: splice when the
/// enclosing group already has the kind, push when the target itself has
/// it, wrap target and leaf otherwise.
fn insert_group_rec(kind: GroupKind, variant: &mut VariantElement, leaf: &VariantElement) -> bool {
    let enclosing_matches = kind.matches(variant);
    let Some(children) = variant.elements_mut() else {
        return false;
    };

    if let Some(index) = children.iter().position(|c| c.selected()) {
        if enclosing_matches {
            children[index].set_selected(false);
            children.insert(index, leaf.clone());
        } else if kind.matches(&children[index]) {
            children[index].set_selected(false);
            if let Some(target_children) = children[index].elements_mut() {
                target_children.push(leaf.clone());
            }
        } else {
            let mut target = children.remove(index);
            target.set_selected(false);
            children.insert(index, kind.wrap(vec![leaf.clone(), target]));
        }
        true
    } else {
        children.iter_mut().any(|c| insert_group_rec(kind, c, leaf))
    }
}

fn replace_rec(variant: &mut VariantElement, leaf: &VariantElement) -> bool {
    let Some(children) = variant.elements_mut() else {
        return false;
    };
    if let Some(index) = children.iter().position(|c| c.selected()) {
        children[index] = leaf.clone();
        true
    } else {
        children.iter_mut().any(|c| replace_rec(c, leaf))
    }
}

/// Canonical order inside a parallel group: leaves before composites,
/// leaves alphabetical by first activity, composites stable.
fn sort_parallel(group: &mut VariantElement) {
    if !group.is_parallel() {
        return;
    }
    let Some(children) = group.elements_mut() else {
        return;
    };
    for i in 1..children.len() {
        let mut j = i;
        while j > 0 && sorts_after(&children[j - 1], &children[j]) {
            children.swap(j - 1, j);
            j -= 1;
        }
    }
}

fn sorts_after(a: &VariantElement, b: &VariantElement) -> bool {
    match (a.first_activity(), b.first_activity()) {
        (Some(a), Some(b)) => a > b,
        // a composite never stays ahead of a leaf
        (None, Some(_)) => true,
        _ => false,
    }
}

fn delete_rec(variant: &mut VariantElement) {
    if let Some(children) = variant.elements_mut() {
        children.retain(|c| !c.selected());
        for child in children.iter_mut() {
            delete_rec(child);
        }
    }
    consolidate(variant);
}

/// Collapse groups left with zero or one child after a deletion. Runs to a
/// fixpoint on this level; deeper levels were already consolidated by the
/// bottom-up recursion in [`delete_rec`].
fn consolidate(variant: &mut VariantElement) {
    let in_sequence = variant.is_sequence();
    let in_parallel = variant.is_parallel();
    let Some(children) = variant.elements_mut() else {
        return;
    };

    loop {
        let mut changed = false;
        let mut i = 0;
        while i < children.len() {
            let child = &children[i];
            match child.elements().map(Vec::len) {
                Some(0) => {
                    children.remove(i);
                    changed = true;
                    continue;
                }
                Some(1) => {
                    let collapses = (child.is_sequence() && in_parallel)
                        || ((child.is_parallel() || child.is_choice() || child.is_fallthrough())
                            && in_sequence);
                    if collapses {
                        if let Some(mut lone) = children[i].take_elements().pop() {
                            if (in_parallel && lone.is_parallel())
                                || (in_sequence && lone.is_sequence())
                            {
                                // lone child has the grandparent's kind:
                                // splice its children in directly
                                let grandchildren = lone.take_elements();
                                children.remove(i);
                                for (k, grandchild) in grandchildren.into_iter().enumerate() {
                                    children.insert(i + k, grandchild);
                                }
                            } else {
                                children[i] = lone;
                            }
                            changed = true;
                            continue;
                        }
                    }
                    i += 1;
                }
                _ => {
                    i += 1;
                }
            }
        }
        if !changed {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_activity_starts_a_sequence() {
        let mut editor = PatternEditor::new();

        editor.insert(InsertionStrategy::Behind, "a").unwrap();

        let variant = editor.variant().unwrap();
        assert!(variant.is_sequence());
        assert_eq!(variant.elements().unwrap().len(), 1);
        assert_eq!(variant.elements().unwrap()[0].first_activity(), Some("a"));
    }

    #[test]
    fn test_insert_without_selection_rejected() {
        let mut editor = PatternEditor::new();
        editor.insert(InsertionStrategy::Behind, "a").unwrap();
        editor.clear_selection();

        let result = editor.insert(InsertionStrategy::Behind, "b");
        assert!(matches!(result, Err(EditError::InvalidOperation(_))));
    }

    #[test]
    fn test_sort_parallel_canonical_order() {
        let mut group = VariantElement::parallel(vec![
            VariantElement::sequence(vec![VariantElement::leaf("x"), VariantElement::leaf("y")]),
            VariantElement::leaf("c"),
            VariantElement::leaf("a"),
        ]);

        sort_parallel(&mut group);

        let children = group.elements().unwrap();
        assert_eq!(children[0].first_activity(), Some("a"));
        assert_eq!(children[1].first_activity(), Some("c"));
        assert!(children[2].is_sequence());
    }
}
