use askama::Html as HtmlEscaper;
use askama::{MarkupDisplay, Template};
use tracing::warn;

use crate::audio::AudioLocation;
use crate::collapse::{COLLAPSED_LABEL, ToggleSet};
use crate::config::PopupConfig;
use crate::entry::LookupQuery;
use crate::host::ResourceLocator;
use crate::links::{dictionary_url, first_word, search_url};
use crate::placement::{Point, PopupGeometry};
use crate::tree::{DisplayChild, DisplayNode, NodeClass};

pub const STYLESHEET: &str = "stylesheet.css";
pub const LOGO_IMAGE: &str = "images/logo.png";
pub const PLAY_BUTTON_IMAGE: &str = "images/play_button.png";
pub const PLAY_BUTTON_TITLE: &str = "Hear the pronunciation!";
pub const NOT_FOUND_MESSAGE: &str = "No results found. ";
pub const SEARCH_LINK_LABEL: &str = "Search on Google?";
pub const SUGGESTION_HEADING: &str = "Did you mean to search for\u{2014}";

pub const OPEN_IN_TAB_CLASS: &str = "openInTab";

pub struct Renderer<'a, L: ?Sized> {
    locator: &'a L,
    config: &'a PopupConfig,
}

impl<'a, L: ResourceLocator + ?Sized> Renderer<'a, L> {
    pub fn new(locator: &'a L, config: &'a PopupConfig) -> Self {
        Self { locator, config }
    }

    pub fn loading(&self, query: &LookupQuery) -> String {
        render_fragment(&LoadingTemplate {
            stylesheet: self.locator.locate(STYLESHEET),
            word: query.headword(),
        })
    }

    /// Fallback card for a missing entry, a failed lookup or a timeout.
    pub fn not_found(&self, query: &LookupQuery) -> String {
        render_fragment(&NotFoundTemplate {
            stylesheet: self.locator.locate(STYLESHEET),
            message: NOT_FOUND_MESSAGE,
            search_link: self.search_link(query),
        })
    }

    pub fn entry(&self, root: &DisplayNode, toggles: &ToggleSet, query: &LookupQuery) -> String {
        let mut body = String::new();
        self.push_node(&mut body, root, toggles);
        render_fragment(&EntryTemplate {
            stylesheet: self.locator.locate(STYLESHEET),
            body,
            search_link: self.search_link(query),
        })
    }

    /// Dictionary logo and bookmark button, absolutely positioned next to the popup.
    ///
    /// `icon` is the bookmark image resource once a bookmark response has arrived.
    pub fn buttons(
        &self,
        geometry: &PopupGeometry,
        query: &LookupQuery,
        icon: Option<&str>,
    ) -> String {
        let layout = geometry.buttons();
        render_fragment(&ButtonsTemplate {
            open_class: OPEN_IN_TAB_CLASS,
            logo_src: self.locator.locate(LOGO_IMAGE),
            logo_url: dictionary_url(&self.config.dictionary_base_url, query.as_str()),
            logo_style: button_style(layout.logo, "width: 43px"),
            bookmark_src: icon.map(|image| self.locator.locate(image)),
            bookmark_style: button_style(layout.bookmark, "max-width: 22px"),
        })
    }

    fn search_link(&self, query: &LookupQuery) -> String {
        render_fragment(&SearchLinkTemplate {
            open_class: OPEN_IN_TAB_CLASS,
            url: search_url(&self.config.search_base_url, query.as_str()),
            label: SEARCH_LINK_LABEL,
        })
    }

    fn push_node(&self, out: &mut String, node: &DisplayNode, toggles: &ToggleSet) {
        if node.class == NodeClass::PronunciationAudio {
            if let Some(file) = audio_token(node) {
                let location = AudioLocation::resolve(&file);
                out.push_str(&render_fragment(&PlayControlsTemplate {
                    image: self.locator.locate(PLAY_BUTTON_IMAGE),
                    title: PLAY_BUTTON_TITLE,
                    url: location.url(&self.config.audio_base_url),
                    file: location.file,
                }));
            }
        }

        let mut classes = vec![node.class.css_class().to_string()];
        let mut attributes = String::new();

        if let Some(run) = node.hidden_run {
            classes.push(format!("hiddenExample{run}"));
            let display = if toggles.is_visible(node) {
                "list-item"
            } else {
                "none"
            };
            attributes.push_str(&format!(" style=\"display: {display}\""));
        }

        if node.class.is_link() {
            if let Some(word) = first_word(&node.text_content()) {
                classes.push(OPEN_IN_TAB_CLASS.to_string());
                let url = dictionary_url(&self.config.dictionary_base_url, word);
                attributes.push_str(&format!(" data-open-url=\"{}\"", escape(&url)));
            }
        }

        let element = match &node.class {
            NodeClass::ExampleToggle { run } => {
                let label = toggles
                    .get(*run)
                    .map(|toggle| toggle.label())
                    .unwrap_or(COLLAPSED_LABEL);
                out.push_str(&format!(
                    "<span class=\"{}\" data-toggle-run=\"{run}\">{}</span>",
                    escape(&classes.join(" ")),
                    escape(label)
                ));
                return;
            }
            NodeClass::Heading => "p",
            _ => "span",
        };

        out.push_str(&format!(
            "<{element} class=\"{}\"{attributes}>",
            escape(&classes.join(" "))
        ));
        for child in &node.children {
            match child {
                DisplayChild::Text(text) => out.push_str(&escape(text)),
                DisplayChild::Node(child) => self.push_node(out, child, toggles),
            }
        }
        out.push_str(&format!("</{element}>"));
    }
}

pub fn audio_token(node: &DisplayNode) -> Option<String> {
    let raw = match node.first_element() {
        Some(child) => child.text_content(),
        None => node.text_content(),
    };
    let token = raw.trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

fn button_style(at: Point, extra: &str) -> String {
    format!(
        "position: absolute; z-index: 16777270; {extra}; top: {}px; left: {}px;",
        at.top, at.left
    )
}

fn escape(text: &str) -> String {
    MarkupDisplay::new_unsafe(text, HtmlEscaper).to_string()
}

fn render_fragment(template: &impl Template) -> String {
    template.render().unwrap_or_else(|err| {
        warn!(error = %err, "popup fragment failed to render");
        String::new()
    })
}

#[derive(Template)]
#[template(
    source = r#"<link rel="stylesheet" href="{{ stylesheet }}"><p class="loading">Looking up the word "{{ word }}"...</p>"#,
    ext = "html"
)]
struct LoadingTemplate<'a> {
    stylesheet: String,
    word: &'a str,
}

#[derive(Template)]
#[template(
    source = r#"<span class="{{ open_class }}" data-open-url="{{ url }}">{{ label }}</span>"#,
    ext = "html"
)]
struct SearchLinkTemplate {
    open_class: &'static str,
    url: String,
    label: &'static str,
}

#[derive(Template)]
#[template(
    source = r#"<link rel="stylesheet" href="{{ stylesheet }}"><p class="notFound">{{ message }}{{ search_link|safe }}</p>"#,
    ext = "html"
)]
struct NotFoundTemplate {
    stylesheet: String,
    message: &'static str,
    search_link: String,
}

#[derive(Template)]
#[template(
    source = r#"<link rel="stylesheet" href="{{ stylesheet }}">{{ body|safe }}<p class="searchLink">{{ search_link|safe }}</p>"#,
    ext = "html"
)]
struct EntryTemplate {
    stylesheet: String,
    body: String,
    search_link: String,
}

#[derive(Template)]
#[template(
    source = r#"<img class="wordiePopup dictLogo {{ open_class }}" title="See this entry at the Merriam-Webster website!" src="{{ logo_src }}" data-open-url="{{ logo_url }}" style="{{ logo_style }}"><img class="wordiePopup bookmarkButton" title="Bookmark this entry!" alt="Save"{% if let Some(src) = bookmark_src %} src="{{ src }}"{% endif %} style="{{ bookmark_style }}">"#,
    ext = "html"
)]
struct ButtonsTemplate {
    open_class: &'static str,
    logo_src: String,
    logo_url: String,
    logo_style: String,
    bookmark_src: Option<String>,
    bookmark_style: String,
}

#[derive(Template)]
#[template(
    source = r#"<img class="playButton" src="{{ image }}" title="{{ title }}"><audio class="{{ file }}" src="{{ url }}" preload="none"></audio>"#,
    ext = "html"
)]
struct PlayControlsTemplate {
    image: String,
    title: &'static str,
    file: String,
    url: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collapse::{EXPANDED_LABEL, RunId, collapse_examples};
    use crate::host::SnapshotHost;

    fn query(text: &str) -> LookupQuery {
        LookupQuery::from_selection(text).expect("query")
    }

    fn vi(text: &str) -> DisplayChild {
        DisplayChild::Node(DisplayNode::text_node(NodeClass::UsageExample, text))
    }

    #[test]
    fn loading_mentions_first_token() {
        let host = SnapshotHost::new("ext:/");
        let config = PopupConfig::default();
        let html = Renderer::new(&host, &config).loading(&query("sense of humor"));
        assert!(html.contains("Looking up the word \"sense\"..."));
        assert!(html.contains("href=\"ext:/stylesheet.css\""));
    }

    #[test]
    fn not_found_has_one_message_and_one_link() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let html = Renderer::new(&host, &config).not_found(&query("cats"));
        assert_eq!(html.matches(NOT_FOUND_MESSAGE).count(), 1);
        assert_eq!(html.matches(OPEN_IN_TAB_CLASS).count(), 1);
        assert!(html.contains("https://www.google.com/search?q=cats+definition"));
    }

    #[test]
    fn hidden_examples_follow_toggle_state() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let renderer = Renderer::new(&host, &config);
        let dt = DisplayNode::with_children(
            NodeClass::DefiningText,
            (0..4).map(|i| vi(&format!("example {i}"))).collect(),
        );
        let collapsed = collapse_examples(dt);
        let mut toggles = ToggleSet::for_runs(&collapsed.runs);

        let html = renderer.entry(&collapsed.root, &toggles, &query("cat"));
        assert_eq!(html.matches("display: none").count(), 1);
        assert!(html.contains("class=\"vi hiddenExample0\""));
        assert!(html.contains("data-toggle-run=\"0\">[+] more examples</span>"));

        toggles.activate(RunId(0));
        let html = renderer.entry(&collapsed.root, &toggles, &query("cat"));
        assert!(html.contains("display: list-item"));
        assert!(html.contains(EXPANDED_LABEL));
    }

    #[test]
    fn pronunciation_gets_play_controls() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let sound = DisplayNode::with_children(
            NodeClass::PronunciationAudio,
            vec![DisplayChild::Node(DisplayNode::text_node(
                NodeClass::AudioFile,
                "cat00001.wav",
            ))],
        );
        let html = Renderer::new(&host, &config).entry(&sound, &ToggleSet::default(), &query("cat"));
        let play = html.find("playButton").expect("play button");
        let span = html.find("<span class=\"sound\"").expect("sound span");
        assert!(play < span);
        assert!(html.contains("src=\"ext:/images/play_button.png\""));
        assert!(html.contains("https://media.merriam-webster.com/soundc11/c/cat00001.wav"));
    }

    #[test]
    fn cross_references_link_their_first_word() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let dxt = DisplayNode::text_node(NodeClass::from_tag("dxt"), " kitten see also");
        let html = Renderer::new(&host, &config).entry(&dxt, &ToggleSet::default(), &query("cat"));
        assert!(html.contains("class=\"dxt openInTab\""));
        assert!(html.contains("data-open-url=\"http://learnersdictionary.com/definition/kitten\""));
    }

    #[test]
    fn text_is_escaped() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let dt = DisplayNode::text_node(NodeClass::DefiningText, "<b>cats & dogs</b>");
        let html = Renderer::new(&host, &config).entry(&dt, &ToggleSet::default(), &query("cat"));
        assert!(html.contains("&lt;b&gt;cats &amp; dogs&lt;/b&gt;"));
    }

    #[test]
    fn fragments_escape_interpolated_text() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let renderer = Renderer::new(&host, &config);

        let html = renderer.loading(&query("<i>\"hi\""));
        assert!(html.contains("Looking up the word \"&lt;i&gt;&quot;hi&quot;\"..."));
        assert!(!html.contains("<i>"));

        let html = renderer.not_found(&query("a&b"));
        assert!(html.contains("<p class=\"notFound\">No results found. <span class=\"openInTab\""));
        assert!(html.contains("data-open-url=\"https://www.google.com/search?q=a%26b+definition\""));
        assert!(html.ends_with("Search on Google?</span></p>"));
    }

    #[test]
    fn entry_wraps_body_before_search_link() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let hw = DisplayNode::text_node(NodeClass::Headword, "cat");
        let html = Renderer::new(&host, &config).entry(&hw, &ToggleSet::default(), &query("cat"));
        assert_eq!(
            html,
            "<link rel=\"stylesheet\" href=\"ext:/stylesheet.css\">\
             <span class=\"hw\">cat</span>\
             <p class=\"searchLink\"><span class=\"openInTab\" \
             data-open-url=\"https://www.google.com/search?q=cat+definition\">Search on Google?</span></p>"
        );
    }

    #[test]
    fn buttons_sit_at_popup_corners() {
        let host = SnapshotHost::new("ext:");
        let config = PopupConfig::default();
        let geometry = PopupGeometry {
            top: 100.0,
            left: 50.0,
            width: 408.0,
            height: 416.0,
        };
        let renderer = Renderer::new(&host, &config);
        let html = renderer.buttons(&geometry, &query("Cat"), None);
        assert!(html.contains("top: 108px; left: 404px;"));
        assert!(html.contains("top: 486px; left: 426px;"));
        assert!(html.contains("data-open-url=\"http://learnersdictionary.com/definition/Cat\""));
        assert!(!html.contains("star-"));

        let html = renderer.buttons(&geometry, &query("Cat"), Some(crate::bookmark::STAR_FILLED));
        assert!(html.contains("src=\"ext:/images/star-filled-19.png\""));
    }
}
