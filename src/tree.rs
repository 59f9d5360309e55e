use crate::collapse::RunId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenericNode {
    pub tag: String,
    #[serde(default)]
    pub children: Vec<GenericChild>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum GenericChild {
    Text(String),
    Element(GenericNode),
}

impl GenericNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            children: Vec::new(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(GenericChild::Text(text.into()));
        self
    }

    pub fn with_child(mut self, child: GenericNode) -> Self {
        self.children.push(GenericChild::Element(child));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefKind {
    /// `dxt`: directional cross-reference ("see also").
    Directional,
    /// `sx`: synonym cross-reference.
    Synonym,
    /// `ct`: cognate / related-form reference.
    Cognate,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeClass {
    EntryList,
    Entry,
    Headword,
    Pronunciation,
    AlternatePronunciation,
    PronunciationAudio,
    AudioFile,
    FunctionalLabel,
    Inflections,
    InflectedForm,
    GrammarLabel,
    SenseGrammarLabel,
    Definition,
    SenseNumber,
    DefiningText,
    UsageExample,
    CrossReference { reference: RefKind },
    Suggestion,
    UndefinedRunOn,
    DefinedRunOn,
    SenseNote,
    /// Created by the sense grouper around one sense number and its content.
    SenseGroup,
    /// Created by the sense grouper to hold everything following a sense number.
    SenseContent,
    /// Created by the example collapser after the last hidden example of a run.
    ExampleToggle { run: RunId },
    /// Created by the popup controller above suggestion lists.
    Heading,
    /// Any tag without a dedicated class; the tag survives for styling.
    Generic { tag: String },
}

impl NodeClass {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "entry_list" => NodeClass::EntryList,
            "entry" => NodeClass::Entry,
            "hw" => NodeClass::Headword,
            "pr" => NodeClass::Pronunciation,
            "altpr" => NodeClass::AlternatePronunciation,
            "sound" => NodeClass::PronunciationAudio,
            "wav" => NodeClass::AudioFile,
            "fl" => NodeClass::FunctionalLabel,
            "in" => NodeClass::Inflections,
            "if" => NodeClass::InflectedForm,
            "gram" => NodeClass::GrammarLabel,
            "wsgram" => NodeClass::SenseGrammarLabel,
            "def" => NodeClass::Definition,
            "sn" => NodeClass::SenseNumber,
            "dt" => NodeClass::DefiningText,
            "vi" => NodeClass::UsageExample,
            "dxt" => NodeClass::CrossReference {
                reference: RefKind::Directional,
            },
            "sx" => NodeClass::CrossReference {
                reference: RefKind::Synonym,
            },
            "ct" => NodeClass::CrossReference {
                reference: RefKind::Cognate,
            },
            "suggestion" => NodeClass::Suggestion,
            "uro" => NodeClass::UndefinedRunOn,
            "dro" => NodeClass::DefinedRunOn,
            "snote" => NodeClass::SenseNote,
            other => NodeClass::Generic {
                tag: other.to_string(),
            },
        }
    }

    pub fn css_class(&self) -> &str {
        match self {
            NodeClass::EntryList => "entry_list",
            NodeClass::Entry => "entry",
            NodeClass::Headword => "hw",
            NodeClass::Pronunciation => "pr",
            NodeClass::AlternatePronunciation => "altpr",
            NodeClass::PronunciationAudio => "sound",
            NodeClass::AudioFile => "wav",
            NodeClass::FunctionalLabel => "flabel",
            NodeClass::Inflections => "in",
            NodeClass::InflectedForm => "if",
            NodeClass::GrammarLabel => "gram",
            NodeClass::SenseGrammarLabel => "wsgram",
            NodeClass::Definition => "def",
            NodeClass::SenseNumber => "sn",
            NodeClass::DefiningText => "dt",
            NodeClass::UsageExample => "vi",
            NodeClass::CrossReference { reference } => match reference {
                RefKind::Directional => "dxt",
                RefKind::Synonym => "sx",
                RefKind::Cognate => "ct",
            },
            NodeClass::Suggestion => "suggestion",
            NodeClass::UndefinedRunOn => "uro",
            NodeClass::DefinedRunOn => "dro",
            NodeClass::SenseNote => "snote",
            NodeClass::SenseGroup => "sn-box",
            NodeClass::SenseContent => "sn-content",
            NodeClass::ExampleToggle { .. } => "exampleButton",
            NodeClass::Heading => "heading",
            NodeClass::Generic { tag } => tag,
        }
    }

    /// Nodes whose first word links to its own dictionary page.
    pub fn is_link(&self) -> bool {
        matches!(
            self,
            NodeClass::CrossReference { .. } | NodeClass::Suggestion
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayNode {
    pub class: NodeClass,
    pub children: Vec<DisplayChild>,
    /// Set on usage examples hidden behind the toggle of the given run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hidden_run: Option<RunId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DisplayChild {
    Text(String),
    Node(DisplayNode),
}

impl DisplayChild {
    pub fn as_node(&self) -> Option<&DisplayNode> {
        match self {
            DisplayChild::Node(node) => Some(node),
            DisplayChild::Text(_) => None,
        }
    }

    pub fn is_class(&self, class: &NodeClass) -> bool {
        self.as_node().is_some_and(|node| &node.class == class)
    }
}

impl DisplayNode {
    pub fn new(class: NodeClass) -> Self {
        Self {
            class,
            children: Vec::new(),
            hidden_run: None,
        }
    }

    pub fn with_children(class: NodeClass, children: Vec<DisplayChild>) -> Self {
        Self {
            class,
            children,
            hidden_run: None,
        }
    }

    pub fn text_node(class: NodeClass, text: impl Into<String>) -> Self {
        Self::with_children(class, vec![DisplayChild::Text(text.into())])
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DisplayChild::Text(text) => out.push_str(text),
                DisplayChild::Node(node) => node.push_text(out),
            }
        }
    }

    pub fn element_children(&self) -> impl Iterator<Item = &DisplayNode> {
        self.children.iter().filter_map(DisplayChild::as_node)
    }

    pub fn first_element(&self) -> Option<&DisplayNode> {
        self.element_children().next()
    }

    pub fn descendants(&self) -> Vec<&DisplayNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            for child in node.element_children().collect::<Vec<_>>().into_iter().rev() {
                stack.push(child);
            }
        }
        out
    }

    pub fn count_class(&self, class: &NodeClass) -> usize {
        self.descendants()
            .into_iter()
            .filter(|node| &node.class == class)
            .count()
    }

    pub(crate) fn map_children(
        mut self,
        f: impl FnOnce(Vec<DisplayChild>) -> Vec<DisplayChild>,
    ) -> Self {
        let children = std::mem::take(&mut self.children);
        self.children = f(children);
        self
    }
}

/// Translates a raw entry into a display tree, one display node per generic node.
///
/// Returns `None` for the "not found" sentinel. Unknown tags become
/// [`NodeClass::Generic`]; translation never fails.
pub fn build_display_tree(entry: Option<&GenericNode>) -> Option<DisplayNode> {
    entry.map(translate)
}

fn translate(node: &GenericNode) -> DisplayNode {
    let children = node
        .children
        .iter()
        .map(|child| match child {
            GenericChild::Text(text) => DisplayChild::Text(text.clone()),
            GenericChild::Element(element) => DisplayChild::Node(translate(element)),
        })
        .collect();
    DisplayNode::with_children(NodeClass::from_tag(&node.tag), children)
}
