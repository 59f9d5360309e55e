use crate::placement::PopupGeometry;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct PopupId(pub u64);

impl fmt::Display for PopupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavigationAction {
    #[serde(rename = "openTab")]
    OpenTab,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub url: String,
    pub action: NavigationAction,
}

impl NavigationRequest {
    pub fn open_tab(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            action: NavigationAction::OpenTab,
        }
    }
}

/// Maps packaged resource names (icons, stylesheet) to absolute URLs.
pub trait ResourceLocator {
    fn locate(&self, resource: &str) -> String;
}

pub trait PopupHost: ResourceLocator {
    /// Inserts a new popup region at `geometry` with the given markup.
    fn mount(&mut self, id: PopupId, geometry: &PopupGeometry, html: &str);

    /// Replaces the markup of a mounted popup.
    fn replace(&mut self, id: PopupId, html: &str);

    fn set_bookmark_icon(&mut self, id: PopupId, src: &str);

    fn remove(&mut self, id: PopupId);

    fn open_tab(&mut self, request: NavigationRequest);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MountedPopup {
    pub geometry: PopupGeometry,
    pub html: String,
    pub bookmark_icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct SnapshotHost {
    resource_base: String,
    mounted: BTreeMap<PopupId, MountedPopup>,
    navigations: Vec<NavigationRequest>,
}

impl SnapshotHost {
    pub fn new(resource_base: impl Into<String>) -> Self {
        Self {
            resource_base: resource_base.into(),
            ..Self::default()
        }
    }

    pub fn popup(&self, id: PopupId) -> Option<&MountedPopup> {
        self.mounted.get(&id)
    }

    pub fn mounted(&self) -> impl Iterator<Item = (&PopupId, &MountedPopup)> {
        self.mounted.iter()
    }

    pub fn navigations(&self) -> &[NavigationRequest] {
        &self.navigations
    }
}

impl ResourceLocator for SnapshotHost {
    fn locate(&self, resource: &str) -> String {
        format!(
            "{}/{}",
            self.resource_base.trim_end_matches('/'),
            resource.trim_start_matches('/')
        )
    }
}

impl PopupHost for SnapshotHost {
    fn mount(&mut self, id: PopupId, geometry: &PopupGeometry, html: &str) {
        self.mounted.insert(
            id,
            MountedPopup {
                geometry: *geometry,
                html: html.to_string(),
                bookmark_icon: None,
            },
        );
    }

    fn replace(&mut self, id: PopupId, html: &str) {
        if let Some(popup) = self.mounted.get_mut(&id) {
            popup.html = html.to_string();
        }
    }

    fn set_bookmark_icon(&mut self, id: PopupId, src: &str) {
        if let Some(popup) = self.mounted.get_mut(&id) {
            popup.bookmark_icon = Some(src.to_string());
        }
    }

    fn remove(&mut self, id: PopupId) {
        self.mounted.remove(&id);
    }

    fn open_tab(&mut self, request: NavigationRequest) {
        self.navigations.push(request);
    }
}
