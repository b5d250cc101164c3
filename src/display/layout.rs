//! Pane geometry for one to six feeds.
//!
//! Pure function of window size, active feed count and feed aspect ratio.
//! Every visible pane in one layout shares the same height; the top row's
//! width constraint decides it.

use crate::MAX_SLOTS;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaneRect {
    pub top: i32,
    pub left: i32,
    pub width: i32,
    pub height: i32,
}

impl PaneRect {
    pub fn right(&self) -> i32 {
        self.left + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PaneGeometry {
    pub rect: PaneRect,
    /// Size the live image is drawn at before clipping to `rect`.
    pub image_width: i32,
    pub image_height: i32,
    pub visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayoutSpec {
    pub panes: [PaneGeometry; MAX_SLOTS],
    pub pane_height: i32,
}

impl LayoutSpec {
    pub fn visible_count(&self) -> usize {
        self.panes.iter().filter(|p| p.visible).count()
    }
}

// Slots per row. For five and six feeds slot 4 sits at the end of the top
// row so slots 2 and 3 keep their bottom-row place when going from four up.
const ROWS_1: &[&[usize]] = &[&[0]];
const ROWS_2: &[&[usize]] = &[&[0, 1]];
const ROWS_3: &[&[usize]] = &[&[0, 1], &[2]];
const ROWS_4: &[&[usize]] = &[&[0, 1], &[2, 3]];
const ROWS_5: &[&[usize]] = &[&[0, 1, 4], &[2, 3]];
const ROWS_6: &[&[usize]] = &[&[0, 1, 4], &[2, 3, 5]];

fn rows_for(active: usize) -> &'static [&'static [usize]] {
    match active {
        0 | 1 => ROWS_1,
        2 => ROWS_2,
        3 => ROWS_3,
        4 => ROWS_4,
        5 => ROWS_5,
        _ => ROWS_6,
    }
}

fn scaled(height: i32, ratio: f64) -> i32 {
    (f64::from(height) * ratio) as i32
}

/// Compute pane geometry. Zero active feeds still shows slot 0.
pub fn compute(width: u32, height: u32, active: usize, ratio: f64) -> LayoutSpec {
    let ratio = if ratio.is_finite() && ratio > 0.0 {
        ratio
    } else {
        1.0
    };
    let w = i32::try_from(width).unwrap_or(i32::MAX);
    let h = i32::try_from(height).unwrap_or(i32::MAX);

    let rows = rows_for(active);
    let row_count = rows.len() as i32;
    let max_height = h / row_count;

    let mut pane_height = max_height;
    let top_width = (w / rows[0].len() as i32).min(scaled(pane_height, ratio));
    if top_width < pane_height {
        pane_height = top_width;
    }

    // Width-bound panes draw the image at the shrunken pane height;
    // height-bound panes draw it at the row height and clip the sides.
    let image_height = if top_width == pane_height {
        pane_height
    } else {
        max_height
    };
    let image_width = scaled(image_height, ratio);

    let v_margin = (h - row_count * pane_height) / 2;
    let mut panes = [PaneGeometry::default(); MAX_SLOTS];
    for (r, row) in rows.iter().enumerate() {
        let cols = row.len() as i32;
        let pane_width = if r == 0 {
            top_width
        } else {
            (w / cols).min(scaled(pane_height, ratio))
        };
        let h_margin = (w - cols * pane_width) / 2;
        let top = r as i32 * pane_height + v_margin;

        for (c, &slot) in row.iter().enumerate() {
            panes[slot] = PaneGeometry {
                rect: PaneRect {
                    top,
                    left: c as i32 * pane_width + h_margin,
                    width: pane_width,
                    height: pane_height,
                },
                image_width,
                image_height,
                visible: true,
            };
        }
    }

    LayoutSpec { panes, pane_height }
}
