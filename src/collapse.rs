use crate::tree::{DisplayChild, DisplayNode, NodeClass};
use serde::Serialize;
use std::fmt;

/// Number of leading examples of a run that always stay visible.
pub const VISIBLE_EXAMPLES: usize = 3;
pub const COLLAPSED_LABEL: &str = "[+] more examples";
pub const EXPANDED_LABEL: &str = "[-] hide examples";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RunId(pub u32);

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExampleRun {
    pub id: RunId,
    /// Number of examples hidden behind this run's toggle.
    pub hidden: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CollapsedEntry {
    pub root: DisplayNode,
    pub runs: Vec<ExampleRun>,
}

#[derive(Debug, Default)]
pub struct RunCounter {
    next: u32,
}

impl RunCounter {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> RunId {
        let id = RunId(self.next);
        self.next += 1;
        id
    }
}

/// Collapses every qualifying example run below `root` with a fresh counter.
pub fn collapse_examples(root: DisplayNode) -> CollapsedEntry {
    collapse_examples_with(root, &mut RunCounter::new())
}

/// Collapses example runs, drawing identifiers from `counter`.
pub fn collapse_examples_with(root: DisplayNode, counter: &mut RunCounter) -> CollapsedEntry {
    let mut runs = Vec::new();
    let root = collapse_node(root, counter, &mut runs);
    CollapsedEntry { root, runs }
}

fn collapse_node(
    node: DisplayNode,
    counter: &mut RunCounter,
    runs: &mut Vec<ExampleRun>,
) -> DisplayNode {
    node.map_children(|children| collapse_children(children, counter, runs))
}

fn collapse_children(
    children: Vec<DisplayChild>,
    counter: &mut RunCounter,
    runs: &mut Vec<ExampleRun>,
) -> Vec<DisplayChild> {
    let next_is_example = next_element_is_example(&children);
    let mut out = Vec::with_capacity(children.len() + 1);
    let mut streak = 0usize;
    let mut current: Option<usize> = None;

    for (index, child) in children.into_iter().enumerate() {
        let DisplayChild::Node(mut node) = child else {
            out.push(child);
            continue;
        };
        if node.class != NodeClass::UsageExample {
            streak = 0;
            current = None;
            out.push(DisplayChild::Node(collapse_node(node, counter, runs)));
            continue;
        }

        streak += 1;
        let hidden_run = if streak > VISIBLE_EXAMPLES {
            let slot = *current.get_or_insert_with(|| {
                runs.push(ExampleRun {
                    id: counter.allocate(),
                    hidden: 0,
                });
                runs.len() - 1
            });
            runs[slot].hidden += 1;
            Some(runs[slot].id)
        } else {
            None
        };
        node.hidden_run = hidden_run;
        out.push(DisplayChild::Node(collapse_node(node, counter, runs)));

        if let Some(run) = hidden_run {
            if !next_is_example[index] {
                out.push(DisplayChild::Node(DisplayNode::new(NodeClass::ExampleToggle {
                    run,
                })));
                current = None;
            }
        }
    }
    out
}

/// For each position, whether the next element sibling after it is a usage example.
fn next_element_is_example(children: &[DisplayChild]) -> Vec<bool> {
    let mut flags = vec![false; children.len()];
    let mut upcoming = false;
    for (index, child) in children.iter().enumerate().rev() {
        flags[index] = upcoming;
        if let DisplayChild::Node(node) = child {
            upcoming = node.class == NodeClass::UsageExample;
        }
    }
    flags
}

/// Presentation state of one toggle control. Starts collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExampleToggle {
    run: RunId,
    expanded: bool,
}

impl ExampleToggle {
    pub fn new(run: RunId) -> Self {
        Self {
            run,
            expanded: false,
        }
    }

    pub fn run(&self) -> RunId {
        self.run
    }

    /// Flips the toggle and returns whether the hidden examples are now shown.
    pub fn activate(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn label(&self) -> &'static str {
        if self.expanded {
            EXPANDED_LABEL
        } else {
            COLLAPSED_LABEL
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToggleSet {
    toggles: Vec<ExampleToggle>,
}

impl ToggleSet {
    pub fn for_runs(runs: &[ExampleRun]) -> Self {
        Self {
            toggles: runs.iter().map(|run| ExampleToggle::new(run.id)).collect(),
        }
    }

    pub fn get(&self, run: RunId) -> Option<&ExampleToggle> {
        self.toggles.iter().find(|toggle| toggle.run == run)
    }

    /// Activates the toggle of `run`; `None` if this entry has no such run.
    pub fn activate(&mut self, run: RunId) -> Option<bool> {
        self.toggles
            .iter_mut()
            .find(|toggle| toggle.run == run)
            .map(ExampleToggle::activate)
    }

    /// Whether `node` is currently shown, given its run's toggle.
    pub fn is_visible(&self, node: &DisplayNode) -> bool {
        match node.hidden_run {
            Some(run) => self.get(run).is_some_and(ExampleToggle::is_expanded),
            None => true,
        }
    }

    pub fn len(&self) -> usize {
        self.toggles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toggles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vi(text: &str) -> DisplayChild {
        DisplayChild::Node(DisplayNode::text_node(NodeClass::UsageExample, text))
    }

    fn dt(text: &str) -> DisplayChild {
        DisplayChild::Node(DisplayNode::text_node(NodeClass::DefiningText, text))
    }

    fn examples(count: usize) -> Vec<DisplayChild> {
        (0..count).map(|i| vi(&format!("example {i}"))).collect()
    }

    fn dt_with(children: Vec<DisplayChild>) -> DisplayNode {
        DisplayNode::with_children(NodeClass::DefiningText, children)
    }

    fn hidden_indices(node: &DisplayNode) -> Vec<usize> {
        node.element_children()
            .enumerate()
            .filter(|(_, child)| child.hidden_run.is_some())
            .map(|(index, _)| index)
            .collect()
    }

    fn toggles(node: &DisplayNode) -> Vec<RunId> {
        node.descendants()
            .into_iter()
            .filter_map(|node| match node.class {
                NodeClass::ExampleToggle { run } => Some(run),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn run_of_four_hides_the_fourth() {
        let collapsed = collapse_examples(dt_with(examples(4)));
        assert_eq!(hidden_indices(&collapsed.root), [3]);
        assert_eq!(toggles(&collapsed.root), [RunId(0)]);
        let last = collapsed.root.children.last().and_then(DisplayChild::as_node);
        assert_eq!(
            last.map(|node| &node.class),
            Some(&NodeClass::ExampleToggle { run: RunId(0) })
        );
        assert_eq!(collapsed.runs, [ExampleRun { id: RunId(0), hidden: 1 }]);
    }

    #[test]
    fn run_of_three_stays_visible() {
        let collapsed = collapse_examples(dt_with(examples(3)));
        assert!(hidden_indices(&collapsed.root).is_empty());
        assert!(toggles(&collapsed.root).is_empty());
        assert!(collapsed.runs.is_empty());
    }

    #[test]
    fn run_of_seven_shares_one_identifier() {
        let collapsed = collapse_examples(dt_with(examples(7)));
        let ids: Vec<_> = collapsed
            .root
            .element_children()
            .filter_map(|node| node.hidden_run)
            .collect();
        assert_eq!(ids, [RunId(0); 4]);
        assert_eq!(toggles(&collapsed.root).len(), 1);
        assert_eq!(collapsed.root.children.len(), 8);
    }

    #[test]
    fn interruption_resets_the_streak() {
        let mut children = examples(3);
        children.push(dt("break"));
        children.extend(examples(3));
        let collapsed = collapse_examples(dt_with(children));
        assert!(hidden_indices(&collapsed.root).is_empty());
    }

    #[test]
    fn text_between_examples_does_not_break_a_run() {
        let mut children = Vec::new();
        for example in examples(4) {
            children.push(example);
            children.push(DisplayChild::Text(" ".to_string()));
        }
        let collapsed = collapse_examples(dt_with(children));
        let toggle_position = collapsed
            .root
            .children
            .iter()
            .position(|child| {
                child
                    .as_node()
                    .is_some_and(|node| matches!(node.class, NodeClass::ExampleToggle { .. }))
            })
            .expect("toggle");
        assert_eq!(toggle_position, 7);
    }

    #[test]
    fn independent_runs_get_increasing_identifiers() {
        let first = DisplayChild::Node(dt_with(examples(5)));
        let second = DisplayChild::Node(dt_with(examples(4)));
        let root = DisplayNode::with_children(NodeClass::Definition, vec![first, second]);
        let collapsed = collapse_examples(root);
        assert_eq!(toggles(&collapsed.root), [RunId(0), RunId(1)]);
        assert_eq!(
            collapsed.runs,
            [
                ExampleRun { id: RunId(0), hidden: 2 },
                ExampleRun { id: RunId(1), hidden: 1 },
            ]
        );
    }

    #[test]
    fn counters_are_scoped_per_pass() {
        let first = collapse_examples(dt_with(examples(4)));
        let second = collapse_examples(dt_with(examples(4)));
        assert_eq!(first.runs[0].id, RunId(0));
        assert_eq!(second.runs[0].id, RunId(0));

        let mut shared = RunCounter::new();
        let _ = collapse_examples_with(dt_with(examples(4)), &mut shared);
        let continued = collapse_examples_with(dt_with(examples(4)), &mut shared);
        assert_eq!(continued.runs[0].id, RunId(1));
    }

    #[test]
    fn toggle_twice_restores_state() {
        let collapsed = collapse_examples(dt_with(examples(5)));
        let mut set = ToggleSet::for_runs(&collapsed.runs);
        let hidden: Vec<&DisplayNode> = collapsed
            .root
            .element_children()
            .filter(|node| node.hidden_run.is_some())
            .collect();
        let initial_label = set.get(RunId(0)).map(ExampleToggle::label);
        assert_eq!(initial_label, Some(COLLAPSED_LABEL));
        assert!(hidden.iter().all(|node| !set.is_visible(node)));

        assert_eq!(set.activate(RunId(0)), Some(true));
        assert!(hidden.iter().all(|node| set.is_visible(node)));
        assert_eq!(set.get(RunId(0)).map(ExampleToggle::label), Some(EXPANDED_LABEL));

        assert_eq!(set.activate(RunId(0)), Some(false));
        assert!(hidden.iter().all(|node| !set.is_visible(node)));
        assert_eq!(set.get(RunId(0)).map(ExampleToggle::label), initial_label);
    }

    #[test]
    fn toggles_are_independent() {
        let root = DisplayNode::with_children(
            NodeClass::Definition,
            vec![
                DisplayChild::Node(dt_with(examples(4))),
                DisplayChild::Node(dt_with(examples(4))),
            ],
        );
        let collapsed = collapse_examples(root);
        let mut set = ToggleSet::for_runs(&collapsed.runs);
        set.activate(RunId(1));
        assert!(!set.get(RunId(0)).is_some_and(ExampleToggle::is_expanded));
        assert!(set.get(RunId(1)).is_some_and(ExampleToggle::is_expanded));
        assert_eq!(set.activate(RunId(9)), None);
    }
}
