use crate::bookmark::{BookmarkState, BookmarkSync, BookmarkTarget, PersistenceOwner};
use crate::collapse::{CollapsedEntry, RunId, ToggleSet, collapse_examples};
use crate::config::PopupConfig;
use crate::entry::{EntrySource, LookupOutcome, LookupQuery, lookup};
use crate::host::{NavigationRequest, PopupHost, PopupId};
use crate::links::{dictionary_url, search_url};
use crate::placement::{AnchorRect, PopupGeometry, Viewport, place_popup_with};
use crate::render::{Renderer, SUGGESTION_HEADING};
use crate::senses::group_senses;
use crate::tree::{DisplayChild, DisplayNode, GenericNode, NodeClass, build_display_tree};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub text: String,
    pub anchor: AnchorRect,
    pub viewport: Viewport,
    /// A collapsed selection is a caret with nothing selected.
    pub collapsed: bool,
}

impl Selection {
    pub fn new(text: impl Into<String>, anchor: AnchorRect, viewport: Viewport) -> Self {
        Self {
            text: text.into(),
            anchor,
            viewport,
            collapsed: false,
        }
    }

    pub fn caret(anchor: AnchorRect, viewport: Viewport) -> Self {
        Self {
            text: String::new(),
            anchor,
            viewport,
            collapsed: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PopupPhase {
    Loading,
    Populated,
    NotFound,
    Dismissed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PopupContent {
    pub root: DisplayNode,
    pub toggles: ToggleSet,
}

/// Turns a raw entry into the tree a popup renders: translation, the suggestion
/// heading, sense grouping and example collapsing, in that order.
pub fn prepare_entry(entry: &GenericNode) -> Option<CollapsedEntry> {
    let tree = build_display_tree(Some(entry))?;
    Some(collapse_examples(group_senses(with_suggestion_heading(tree))))
}

fn with_suggestion_heading(tree: DisplayNode) -> DisplayNode {
    let leads_with_suggestion = tree
        .first_element()
        .is_some_and(|node| node.class == NodeClass::Suggestion);
    if !leads_with_suggestion {
        return tree;
    }
    tree.map_children(|mut children| {
        children.insert(
            0,
            DisplayChild::Node(DisplayNode::text_node(NodeClass::Heading, SUGGESTION_HEADING)),
        );
        children
    })
}

struct LivePopup<P> {
    query: LookupQuery,
    geometry: PopupGeometry,
    phase: PopupPhase,
    content: Option<PopupContent>,
    bookmark: Option<BookmarkSync<P>>,
}

pub struct PopupController<P, H> {
    config: PopupConfig,
    owner: Arc<P>,
    host: H,
    popups: BTreeMap<PopupId, LivePopup<P>>,
    next_id: u64,
}

impl<P: PersistenceOwner, H: PopupHost> PopupController<P, H> {
    pub fn new(config: PopupConfig, owner: Arc<P>, host: H) -> Self {
        Self {
            config,
            owner,
            host,
            popups: BTreeMap::new(),
            next_id: 0,
        }
    }

    pub fn config(&self) -> &PopupConfig {
        &self.config
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn into_host(self) -> H {
        self.host
    }

    /// Phase of a popup created by this controller; removed popups report `Dismissed`.
    pub fn phase(&self, id: PopupId) -> Option<PopupPhase> {
        match self.popups.get(&id) {
            Some(popup) => Some(popup.phase),
            None if id.0 < self.next_id => Some(PopupPhase::Dismissed),
            None => None,
        }
    }

    pub fn content(&self, id: PopupId) -> Option<&PopupContent> {
        self.popups.get(&id).and_then(|popup| popup.content.as_ref())
    }

    pub fn geometry(&self, id: PopupId) -> Option<PopupGeometry> {
        self.popups.get(&id).map(|popup| popup.geometry)
    }

    pub fn live_popups(&self) -> impl Iterator<Item = PopupId> + '_ {
        self.popups.keys().copied()
    }

    /// Creates a popup in the loading state. Collapsed and blank selections are ignored.
    pub fn on_double_click(&mut self, selection: &Selection) -> Option<PopupId> {
        if selection.collapsed {
            return None;
        }
        let query = LookupQuery::from_selection(&selection.text)?;
        let geometry = place_popup_with(
            &selection.anchor,
            &selection.viewport,
            &self.config.placement_rules(),
        );

        let id = PopupId(self.next_id);
        self.next_id += 1;

        let html = Renderer::new(&self.host, &self.config).loading(&query);
        self.host.mount(id, &geometry, &html);
        info!(
            popup = %id,
            query = %query,
            top = geometry.top,
            left = geometry.left,
            "popup created"
        );

        self.popups.insert(
            id,
            LivePopup {
                query,
                geometry,
                phase: PopupPhase::Loading,
                content: None,
                bookmark: None,
            },
        );
        Some(id)
    }

    /// Applies the entry lookup result to a loading popup.
    ///
    /// Returns the popup's bookmark driver when an entry was rendered. Results for
    /// popups that are no longer loading, including dismissed ones, are dropped.
    pub fn resolve(&mut self, id: PopupId, outcome: LookupOutcome) -> Option<BookmarkSync<P>> {
        let Self {
            config,
            owner,
            host,
            popups,
            ..
        } = self;
        let Some(popup) = popups.get_mut(&id) else {
            debug!(popup = %id, "dropping lookup result for dismissed popup");
            return None;
        };
        if popup.phase != PopupPhase::Loading {
            debug!(popup = %id, phase = ?popup.phase, "dropping duplicate lookup result");
            return None;
        }

        let prepared = match outcome {
            LookupOutcome::Found(entry) => prepare_entry(&entry),
            LookupOutcome::NotFound => None,
            LookupOutcome::Failed(err) => {
                debug!(popup = %id, error = %err, "lookup failed");
                None
            }
        };

        let renderer = Renderer::new(&*host, &*config);
        let Some(prepared) = prepared else {
            let html = renderer.not_found(&popup.query);
            host.replace(id, &html);
            popup.phase = PopupPhase::NotFound;
            info!(popup = %id, query = %popup.query, "no entry found");
            return None;
        };

        let content = PopupContent {
            toggles: ToggleSet::for_runs(&prepared.runs),
            root: prepared.root,
        };
        let mut html = renderer.entry(&content.root, &content.toggles, &popup.query);
        html.push_str(&renderer.buttons(&popup.geometry, &popup.query, None));
        host.replace(id, &html);

        let word = popup.query.headword().to_string();
        let url = dictionary_url(&config.dictionary_base_url, &word.to_lowercase());
        let sync = BookmarkSync::new(Arc::clone(owner), BookmarkTarget { word, url });

        info!(
            popup = %id,
            query = %popup.query,
            hidden_runs = content.toggles.len(),
            "entry rendered"
        );
        popup.phase = PopupPhase::Populated;
        popup.content = Some(content);
        popup.bookmark = Some(sync.clone());
        Some(sync)
    }

    /// Runs a whole double-click: create, look up, render, then fetch the bookmark state.
    pub async fn open<S: EntrySource>(
        &mut self,
        selection: &Selection,
        source: &S,
    ) -> Option<PopupId> {
        let id = self.on_double_click(selection)?;
        let query = self.popups.get(&id)?.query.clone();
        let outcome = lookup(source, &query, self.config.lookup_timeout()).await;
        if let Some(sync) = self.resolve(id, outcome) {
            if sync.refresh().await.is_some() {
                self.refresh_icon(id);
            }
        }
        Some(id)
    }

    pub fn bookmark(&self, id: PopupId) -> Option<BookmarkSync<P>> {
        self.popups.get(&id)?.bookmark.clone()
    }

    pub async fn toggle_bookmark(&mut self, id: PopupId) -> Option<BookmarkState> {
        let sync = self.bookmark(id)?;
        let state = sync.toggle().await;
        if state.is_some() {
            self.refresh_icon(id);
        }
        state
    }

    pub fn refresh_icon(&mut self, id: PopupId) {
        let Some(image) = self
            .popups
            .get(&id)
            .and_then(|popup| popup.bookmark.as_ref())
            .and_then(|sync| sync.icon().image())
        else {
            return;
        };
        let src = self.host.locate(image);
        self.host.set_bookmark_icon(id, &src);
    }

    /// Flips one example toggle and re-renders the popup. Returns the new expanded state.
    pub fn on_toggle_examples(&mut self, id: PopupId, run: RunId) -> Option<bool> {
        let popup = self.popups.get_mut(&id)?;
        let content = popup.content.as_mut()?;
        let expanded = content.toggles.activate(run)?;

        let icon = popup
            .bookmark
            .as_ref()
            .and_then(|sync| sync.icon().image());
        let renderer = Renderer::new(&self.host, &self.config);
        let mut html = renderer.entry(&content.root, &content.toggles, &popup.query);
        html.push_str(&renderer.buttons(&popup.geometry, &popup.query, icon));
        self.host.replace(id, &html);
        debug!(popup = %id, run = %run, expanded, "example toggle activated");
        Some(expanded)
    }

    pub fn open_link(&mut self, url: impl Into<String>) {
        self.host.open_tab(NavigationRequest::open_tab(url));
    }

    pub fn open_dictionary(&mut self, id: PopupId) -> bool {
        let Some(popup) = self.popups.get(&id) else {
            return false;
        };
        let url = dictionary_url(&self.config.dictionary_base_url, popup.query.as_str());
        self.open_link(url);
        true
    }

    pub fn open_search(&mut self, id: PopupId) -> bool {
        let Some(popup) = self.popups.get(&id) else {
            return false;
        };
        let url = search_url(&self.config.search_base_url, popup.query.as_str());
        self.open_link(url);
        true
    }

    /// Dismisses every live popup unless the point lies inside one of them.
    pub fn on_pointer_down(&mut self, x: f64, y: f64) -> Vec<PopupId> {
        if self
            .popups
            .values()
            .any(|popup| popup.geometry.contains(x, y))
        {
            return Vec::new();
        }
        let dismissed: Vec<PopupId> = self.popups.keys().copied().collect();
        for id in &dismissed {
            self.host.remove(*id);
            info!(popup = %id, "popup dismissed");
        }
        self.popups.clear();
        dismissed
    }
}
