use serde::{Deserialize, Serialize};

use crate::error::ModelError;

// Display sizing, mirroring the renderer: labels are cut at 20 characters
// and shown with an ellipsis.
const MAX_LABEL_CHARS: usize = 20;
const CHAR_WIDTH: f64 = 7.0;
const LEAF_PADDING: f64 = 30.0;
const GROUP_PADDING: f64 = 10.0;

/// A node of a variant pattern tree.
///
/// The kind set is closed: a leaf holding one or more activity names, or one
/// of four composite groupings over an ordered child list. `selected` is
/// transient UI state and `expanded` is display state; both are preserved by
/// `Clone`, ignored by equality and omitted from the serialized form.
///
/// Serialized shape: `{ "type": "leaf", "activities": [..] }` for leaves,
/// `{ "type": "sequence" | "parallel" | "choice" | "fallthrough",
/// "elements": [..] }` for groups.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VariantElement {
    Leaf {
        activities: Vec<String>,
        #[serde(skip)]
        selected: bool,
        #[serde(skip)]
        expanded: bool,
    },
    Sequence {
        elements: Vec<VariantElement>,
        #[serde(skip)]
        selected: bool,
        #[serde(skip)]
        expanded: bool,
    },
    Parallel {
        elements: Vec<VariantElement>,
        #[serde(skip)]
        selected: bool,
        #[serde(skip)]
        expanded: bool,
    },
    Choice {
        elements: Vec<VariantElement>,
        #[serde(skip)]
        selected: bool,
        #[serde(skip)]
        expanded: bool,
    },
    Fallthrough {
        elements: Vec<VariantElement>,
        #[serde(skip)]
        selected: bool,
        #[serde(skip)]
        expanded: bool,
    },
}

impl VariantElement {
    pub fn leaf(activity: impl Into<String>) -> Self {
        Self::leaf_multi(vec![activity.into()])
    }

    /// A leaf holding several merged activities, e.g. after a fallthrough
    /// collapse.
    pub fn leaf_multi(activities: Vec<String>) -> Self {
        VariantElement::Leaf {
            activities,
            selected: false,
            expanded: false,
        }
    }

    pub fn sequence(elements: Vec<VariantElement>) -> Self {
        VariantElement::Sequence {
            elements,
            selected: false,
            expanded: false,
        }
    }

    pub fn parallel(elements: Vec<VariantElement>) -> Self {
        VariantElement::Parallel {
            elements,
            selected: false,
            expanded: false,
        }
    }

    pub fn choice(elements: Vec<VariantElement>) -> Self {
        VariantElement::Choice {
            elements,
            selected: false,
            expanded: false,
        }
    }

    pub fn fallthrough(elements: Vec<VariantElement>) -> Self {
        VariantElement::Fallthrough {
            elements,
            selected: false,
            expanded: false,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, VariantElement::Leaf { .. })
    }

    pub fn is_sequence(&self) -> bool {
        matches!(self, VariantElement::Sequence { .. })
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self, VariantElement::Parallel { .. })
    }

    pub fn is_choice(&self) -> bool {
        matches!(self, VariantElement::Choice { .. })
    }

    pub fn is_fallthrough(&self) -> bool {
        matches!(self, VariantElement::Fallthrough { .. })
    }

    /// Child elements of a composite; `None` for leaves.
    pub fn elements(&self) -> Option<&Vec<VariantElement>> {
        match self {
            VariantElement::Leaf { .. } => None,
            VariantElement::Sequence { elements, .. }
            | VariantElement::Parallel { elements, .. }
            | VariantElement::Choice { elements, .. }
            | VariantElement::Fallthrough { elements, .. } => Some(elements),
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<VariantElement>> {
        match self {
            VariantElement::Leaf { .. } => None,
            VariantElement::Sequence { elements, .. }
            | VariantElement::Parallel { elements, .. }
            | VariantElement::Choice { elements, .. }
            | VariantElement::Fallthrough { elements, .. } => Some(elements),
        }
    }

    /// Replace the child list of a composite. No-op on leaves.
    pub fn set_elements(&mut self, new_elements: Vec<VariantElement>) {
        if let Some(elements) = self.elements_mut() {
            *elements = new_elements;
        }
    }

    /// Move the child list out of a composite, leaving it empty. Leaves
    /// yield an empty list.
    pub fn take_elements(&mut self) -> Vec<VariantElement> {
        self.elements_mut().map(std::mem::take).unwrap_or_default()
    }

    /// Activity names of a leaf; `None` for composites.
    pub fn activities(&self) -> Option<&Vec<String>> {
        match self {
            VariantElement::Leaf { activities, .. } => Some(activities),
            _ => None,
        }
    }

    /// First activity name of a leaf, used for the canonical parallel order.
    pub fn first_activity(&self) -> Option<&str> {
        self.activities()
            .and_then(|a| a.first())
            .map(String::as_str)
    }

    pub fn selected(&self) -> bool {
        match self {
            VariantElement::Leaf { selected, .. }
            | VariantElement::Sequence { selected, .. }
            | VariantElement::Parallel { selected, .. }
            | VariantElement::Choice { selected, .. }
            | VariantElement::Fallthrough { selected, .. } => *selected,
        }
    }

    pub fn set_selected(&mut self, value: bool) {
        match self {
            VariantElement::Leaf { selected, .. }
            | VariantElement::Sequence { selected, .. }
            | VariantElement::Parallel { selected, .. }
            | VariantElement::Choice { selected, .. }
            | VariantElement::Fallthrough { selected, .. } => *selected = value,
        }
    }

    pub fn expanded(&self) -> bool {
        match self {
            VariantElement::Leaf { expanded, .. }
            | VariantElement::Sequence { expanded, .. }
            | VariantElement::Parallel { expanded, .. }
            | VariantElement::Choice { expanded, .. }
            | VariantElement::Fallthrough { expanded, .. } => *expanded,
        }
    }

    pub fn set_expanded(&mut self, value: bool) {
        match self {
            VariantElement::Leaf { expanded, .. }
            | VariantElement::Sequence { expanded, .. }
            | VariantElement::Parallel { expanded, .. }
            | VariantElement::Choice { expanded, .. }
            | VariantElement::Fallthrough { expanded, .. } => *expanded = value,
        }
    }

    pub fn set_expanded_recursive(&mut self, value: bool) {
        self.set_expanded(value);
        if let Some(elements) = self.elements_mut() {
            for element in elements {
                element.set_expanded_recursive(value);
            }
        }
    }

    /// Clear the selection flag on this node and every descendant.
    pub fn clear_selection(&mut self) {
        self.set_selected(false);
        if let Some(elements) = self.elements_mut() {
            for element in elements {
                element.clear_selection();
            }
        }
    }

    /// Number of selected nodes in this subtree.
    pub fn selected_count(&self) -> usize {
        let own = usize::from(self.selected());
        own + self
            .elements()
            .map(|els| els.iter().map(VariantElement::selected_count).sum())
            .unwrap_or(0)
    }

    /// Deterministic display width of this subtree: sequences lay children
    /// out horizontally, the other groups stack them.
    pub fn width(&self) -> f64 {
        match self {
            VariantElement::Leaf { activities, .. } => activities
                .iter()
                .map(|a| label_width(a))
                .fold(0.0, f64::max),
            VariantElement::Sequence { elements, .. } => {
                elements.iter().map(VariantElement::width).sum::<f64>() + GROUP_PADDING
            }
            VariantElement::Parallel { elements, .. }
            | VariantElement::Choice { elements, .. }
            | VariantElement::Fallthrough { elements, .. } => {
                elements
                    .iter()
                    .map(VariantElement::width)
                    .fold(0.0, f64::max)
                    + 2.0 * GROUP_PADDING
            }
        }
    }

    /// Serialize to the documented JSON shape.
    pub fn serialize(&self) -> Result<serde_json::Value, ModelError> {
        serde_json::to_value(self).map_err(|e| ModelError::MalformedTree(e.to_string()))
    }

    /// Decode an element from its JSON shape; unknown `type` values reject
    /// the whole tree.
    pub fn deserialize(value: serde_json::Value) -> Result<VariantElement, ModelError> {
        serde_json::from_value(value).map_err(|e| ModelError::MalformedTree(e.to_string()))
    }
}

fn label_width(label: &str) -> f64 {
    let chars = label.chars().count();
    let shown = if chars <= MAX_LABEL_CHARS {
        chars
    } else {
        MAX_LABEL_CHARS + 3 // truncated, plus "..."
    };
    shown as f64 * CHAR_WIDTH + LEAF_PADDING
}

// Structural equality; selected/expanded are transient display state.
impl PartialEq for VariantElement {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (
                VariantElement::Leaf { activities: a, .. },
                VariantElement::Leaf { activities: b, .. },
            ) => a == b,
            (
                VariantElement::Sequence { elements: a, .. },
                VariantElement::Sequence { elements: b, .. },
            )
            | (
                VariantElement::Parallel { elements: a, .. },
                VariantElement::Parallel { elements: b, .. },
            )
            | (
                VariantElement::Choice { elements: a, .. },
                VariantElement::Choice { elements: b, .. },
            )
            | (
                VariantElement::Fallthrough { elements: a, .. },
                VariantElement::Fallthrough { elements: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl Eq for VariantElement {}

/// Classification of the selected sub-pattern of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InfixType {
    NotAnInfix,
    Prefix,
    Suffix,
    ProperInfix,
}

/// Classify the current selection by its position among the root's children:
/// a selection covering everything is the whole variant (not an infix), one
/// anchored at the start is a prefix, one anchored at the end a suffix, and
/// anything else a proper infix.
pub fn infix_type(root: &VariantElement) -> InfixType {
    if root.selected() {
        return InfixType::NotAnInfix;
    }
    let Some(elements) = root.elements() else {
        return InfixType::NotAnInfix;
    };
    let selected: Vec<bool> = elements.iter().map(|e| e.selected_count() > 0).collect();
    let count = selected.iter().filter(|s| **s).count();

    if count == 0 || count == elements.len() {
        return InfixType::NotAnInfix;
    }
    let at_start = selected.first().copied().unwrap_or(false);
    let at_end = selected.last().copied().unwrap_or(false);
    match (at_start, at_end) {
        (true, false) => InfixType::Prefix,
        (false, true) => InfixType::Suffix,
        _ => InfixType::ProperInfix,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_variant() -> VariantElement {
        VariantElement::sequence(vec![
            VariantElement::leaf("a"),
            VariantElement::parallel(vec![VariantElement::leaf("b"), VariantElement::leaf("c")]),
            VariantElement::leaf("d"),
        ])
    }

    #[test]
    fn test_json_round_trip() {
        let variant = sample_variant();

        let json = variant.serialize().unwrap();
        let restored = VariantElement::deserialize(json).unwrap();

        assert_eq!(variant, restored);
    }

    #[test]
    fn test_wire_shape() {
        let variant = VariantElement::sequence(vec![VariantElement::leaf("a")]);
        let json = variant.serialize().unwrap();

        assert_eq!(json["type"], "sequence");
        assert_eq!(json["elements"][0]["type"], "leaf");
        assert_eq!(json["elements"][0]["activities"][0], "a");
        assert!(json.get("selected").is_none());
    }

    #[test]
    fn test_unknown_type_is_malformed() {
        let json = serde_json::json!({ "type": "interleaving", "elements": [] });

        assert!(matches!(
            VariantElement::deserialize(json),
            Err(ModelError::MalformedTree(_))
        ));
    }

    #[test]
    fn test_equality_ignores_transient_flags() {
        let variant = sample_variant();
        let mut other = variant.clone();
        other.set_expanded_recursive(true);
        other.elements_mut().unwrap()[0].set_selected(true);

        assert_eq!(variant, other);
    }

    #[test]
    fn test_copy_preserves_flags() {
        let mut variant = sample_variant();
        variant.set_expanded_recursive(true);
        variant.elements_mut().unwrap()[1].set_selected(true);

        let copy = variant.clone();

        assert!(copy.expanded());
        assert!(copy.elements().unwrap()[1].selected());
    }

    #[test]
    fn test_kind_mismatch_not_equal() {
        let seq = VariantElement::sequence(vec![VariantElement::leaf("a")]);
        let par = VariantElement::parallel(vec![VariantElement::leaf("a")]);

        assert_ne!(seq, par);
    }

    #[test]
    fn test_width_is_deterministic_and_monotone() {
        let small = VariantElement::sequence(vec![VariantElement::leaf("a")]);
        let large = VariantElement::sequence(vec![
            VariantElement::leaf("a"),
            VariantElement::leaf("b"),
        ]);

        assert_eq!(small.width(), small.clone().width());
        assert!(large.width() > small.width());
    }

    #[test]
    fn test_infix_classification() {
        let mut variant = sample_variant();
        assert_eq!(infix_type(&variant), InfixType::NotAnInfix);

        variant.elements_mut().unwrap()[0].set_selected(true);
        assert_eq!(infix_type(&variant), InfixType::Prefix);

        variant.clear_selection();
        variant.elements_mut().unwrap()[2].set_selected(true);
        assert_eq!(infix_type(&variant), InfixType::Suffix);

        variant.clear_selection();
        variant.elements_mut().unwrap()[1].set_selected(true);
        assert_eq!(infix_type(&variant), InfixType::ProperInfix);

        variant.clear_selection();
        for element in variant.elements_mut().unwrap() {
            element.set_selected(true);
        }
        assert_eq!(infix_type(&variant), InfixType::NotAnInfix);
    }
}
