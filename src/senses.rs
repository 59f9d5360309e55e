use crate::tree::{DisplayChild, DisplayNode, NodeClass};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SenseRank {
    Top,
    Sub,
}

/// Ranks a sense label: labels starting with an integer are top-level, all others are
/// sub-senses.
pub fn sense_rank(label: &str) -> SenseRank {
    let trimmed = label.trim();
    let digits = trimmed.strip_prefix(['+', '-']).unwrap_or(trimmed);
    if digits.starts_with(|ch: char| ch.is_ascii_digit()) {
        SenseRank::Top
    } else {
        SenseRank::Sub
    }
}

pub fn group_senses(root: DisplayNode) -> DisplayNode {
    wrap_sense_groups(split_sense_numbers(root))
}

/// Replaces every sense number carrying several whitespace-separated labels with one
/// sense number per label, in order.
pub fn split_sense_numbers(root: DisplayNode) -> DisplayNode {
    root.map_children(split_children)
}

fn split_children(children: Vec<DisplayChild>) -> Vec<DisplayChild> {
    let mut out = Vec::with_capacity(children.len());
    for child in children {
        let DisplayChild::Node(node) = child else {
            out.push(child);
            continue;
        };
        if node.class != NodeClass::SenseNumber {
            out.push(DisplayChild::Node(split_sense_numbers(node)));
            continue;
        }
        let text = node.text_content();
        let labels: Vec<&str> = text.split_whitespace().collect();
        if labels.len() <= 1 {
            out.push(DisplayChild::Node(node));
            continue;
        }
        out.extend(labels.into_iter().map(|label| {
            DisplayChild::Node(DisplayNode::text_node(NodeClass::SenseNumber, label))
        }));
    }
    out
}

/// Wraps each sense number and its following non-sense-number siblings into a group.
pub fn wrap_sense_groups(root: DisplayNode) -> DisplayNode {
    root.map_children(wrap_children)
}

fn wrap_children(children: Vec<DisplayChild>) -> Vec<DisplayChild> {
    let children: Vec<DisplayChild> = children
        .into_iter()
        .map(|child| match child {
            DisplayChild::Node(node) => DisplayChild::Node(wrap_sense_groups(node)),
            text => text,
        })
        .collect();
    let children = wrap_rank(children, SenseRank::Sub);
    wrap_rank(children, SenseRank::Top)
}

fn wrap_rank(children: Vec<DisplayChild>, rank: SenseRank) -> Vec<DisplayChild> {
    let mut out = Vec::with_capacity(children.len());
    let mut iter = children.into_iter().peekable();
    while let Some(child) = iter.next() {
        match child {
            DisplayChild::Node(node) if is_sense_of_rank(&node, rank) => {
                let mut content = Vec::new();
                while let Some(next) =
                    iter.next_if(|next| !next.is_class(&NodeClass::SenseNumber))
                {
                    content.push(next);
                }
                out.push(DisplayChild::Node(sense_group(node, content)));
            }
            other => out.push(other),
        }
    }
    out
}

fn is_sense_of_rank(node: &DisplayNode, rank: SenseRank) -> bool {
    node.class == NodeClass::SenseNumber && sense_rank(&node.text_content()) == rank
}

fn sense_group(number: DisplayNode, content: Vec<DisplayChild>) -> DisplayNode {
    DisplayNode::with_children(
        NodeClass::SenseGroup,
        vec![
            DisplayChild::Node(number),
            DisplayChild::Node(DisplayNode::with_children(NodeClass::SenseContent, content)),
        ],
    )
}
