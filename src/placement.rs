use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnchorRect {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl AnchorRect {
    pub const fn new(top: f64, bottom: f64, left: f64, right: f64) -> Self {
        Self {
            top,
            bottom,
            left,
            right,
        }
    }

    pub fn width(&self) -> f64 {
        self.right - self.left
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Viewport {
    pub scroll_x: f64,
    pub scroll_y: f64,
    /// Document scroll height; carried for hosts, not consulted by the clamps.
    pub scroll_height: f64,
    pub client_width: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PopupSize {
    pub width: f64,
    pub height: f64,
}

impl Default for PopupSize {
    fn default() -> Self {
        Self {
            width: 408.0,
            height: 416.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacementRules {
    pub size: PopupSize,
    /// Vertical distance between the selection and the popup.
    pub gap: f64,
    /// Minimum distance from the horizontal viewport edges.
    pub margin: f64,
}

impl Default for PlacementRules {
    fn default() -> Self {
        Self {
            size: PopupSize::default(),
            gap: 8.0,
            margin: 4.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopupGeometry {
    pub top: f64,
    pub left: f64,
    pub width: f64,
    pub height: f64,
}

impl PopupGeometry {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.top + self.height
    }

    /// Whether a page point falls within the popup region (edges inclusive).
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= self.left && x <= self.right() && y >= self.top && y <= self.bottom()
    }

    pub fn buttons(&self) -> ButtonLayout {
        ButtonLayout {
            logo: Point {
                top: self.top + 8.0,
                left: self.right() - 54.0,
            },
            bookmark: Point {
                top: self.bottom() - 30.0,
                left: self.right() - 32.0,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    pub top: f64,
    pub left: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ButtonLayout {
    pub logo: Point,
    pub bookmark: Point,
}

/// Places a popup above the selection, centered on it, using the default gap and margin.
pub fn place_popup(anchor: &AnchorRect, viewport: &Viewport, size: PopupSize) -> PopupGeometry {
    place_popup_with(
        anchor,
        viewport,
        &PlacementRules {
            size,
            ..PlacementRules::default()
        },
    )
}

pub fn place_popup_with(
    anchor: &AnchorRect,
    viewport: &Viewport,
    rules: &PlacementRules,
) -> PopupGeometry {
    let PopupSize { width, height } = rules.size;
    let mut top = anchor.top - height - rules.gap;
    let mut left = anchor.left + (anchor.width() - width) / 2.0;

    if top < viewport.scroll_y {
        top = anchor.bottom + rules.gap;
    }
    if left < viewport.scroll_x + rules.margin {
        left = viewport.scroll_x + rules.margin;
    }
    let right_limit = viewport.client_width - width - rules.margin;
    if left > right_limit {
        left = right_limit;
    }

    PopupGeometry {
        top,
        left,
        width,
        height,
    }
}
