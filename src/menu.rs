// Menu module
// Right-click context menu and the swatch grid used to choose a border color

use crate::app::{ColorSlot, Command, Palette};
use crate::color::{Rgb, SWATCHES};
use crate::star::Point;
use crate::surface::{Surface, GLYPH_HEIGHT};

pub const MENU_ITEM_HEIGHT: u32 = 25;
pub const MENU_WIDTH: u32 = 180;

const MENU_BG: Rgb = Rgb(60, 60, 60);
const MENU_HOVER_BG: Rgb = Rgb(80, 180, 180);
const MENU_BORDER: Rgb = Rgb(100, 100, 100);
const MENU_TEXT: Rgb = Rgb::WHITE;
const MENU_TEXT_DISABLED: Rgb = Rgb(140, 140, 140);
const OVERLAY_ALPHA: u8 = 230;

const SWATCH_SIZE: u32 = 32;
const SWATCH_GAP: u32 = 6;
const SWATCH_COLUMNS: usize = 4;
const PICKER_PADDING: u32 = 12;
const PICKER_TITLE_HEIGHT: u32 = 20;

/// Context menu entries, top to bottom
pub const MENU_ITEMS: [(&str, Command); 5] = [
    ("Color 1", Command::ChooseColor(ColorSlot::First)),
    ("Color 2", Command::ChooseColor(ColorSlot::Second)),
    ("Delete All", Command::DeleteAll),
    ("Delete Last", Command::DeleteLast),
    ("Redo", Command::Redo),
];

/// Whether each command currently has something to act on
#[derive(Debug, Clone, Copy, Default)]
pub struct Availability {
    pub has_stars: bool,
    pub can_redo: bool,
}

impl Availability {
    fn allows(self, command: Command) -> bool {
        match command {
            Command::ChooseColor(_) => true,
            Command::DeleteAll | Command::DeleteLast => self.has_stars,
            Command::Redo => self.can_redo,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenu {
    origin: Point,
    hover: Option<usize>,
}

impl ContextMenu {
    /// Open at `pos`, shifted so the whole menu stays inside the viewport
    pub fn open_at(pos: Point, viewport: (u32, u32)) -> Self {
        let menu_height = Self::height() as i32;
        let mut origin = pos;
        if origin.x + MENU_WIDTH as i32 > viewport.0 as i32 {
            origin.x = viewport.0 as i32 - MENU_WIDTH as i32;
        }
        if origin.y + menu_height > viewport.1 as i32 {
            origin.y = viewport.1 as i32 - menu_height;
        }
        origin.x = origin.x.max(0);
        origin.y = origin.y.max(0);

        Self {
            origin,
            hover: None,
        }
    }

    #[cfg(test)]
    pub fn origin(&self) -> Point {
        self.origin
    }

    #[cfg(test)]
    pub fn hovered(&self) -> Option<usize> {
        self.hover
    }

    pub fn height() -> u32 {
        MENU_ITEMS.len() as u32 * MENU_ITEM_HEIGHT
    }

    pub fn item_at(&self, pos: Point) -> Option<usize> {
        let dx = pos.x - self.origin.x;
        let dy = pos.y - self.origin.y;
        if dx < 0 || dy < 0 || dx >= MENU_WIDTH as i32 || dy >= Self::height() as i32 {
            return None;
        }
        Some(dy as usize / MENU_ITEM_HEIGHT as usize)
    }

    pub fn command_at(&self, pos: Point) -> Option<Command> {
        self.item_at(pos).map(|i| MENU_ITEMS[i].1)
    }

    /// Track the hovered item; returns true when it changed
    pub fn hover(&mut self, pos: Point) -> bool {
        let hover = self.item_at(pos);
        let changed = hover != self.hover;
        self.hover = hover;
        changed
    }

    pub fn render<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        palette: &Palette,
        availability: Availability,
    ) {
        let (x, y) = (self.origin.x, self.origin.y);

        for (i, (label, command)) in MENU_ITEMS.iter().enumerate() {
            let item_y = y + (i as u32 * MENU_ITEM_HEIGHT) as i32;
            let bg = if self.hover == Some(i) {
                MENU_HOVER_BG
            } else {
                MENU_BG
            };
            surface.fill_rect(x, item_y, MENU_WIDTH, MENU_ITEM_HEIGHT, bg, OVERLAY_ALPHA);

            let text = if availability.allows(*command) {
                MENU_TEXT
            } else {
                MENU_TEXT_DISABLED
            };
            let text_y = item_y + ((MENU_ITEM_HEIGHT - GLYPH_HEIGHT) / 2) as i32;
            surface.draw_text(x + 10, text_y, label, text);

            // preview of the border color the item will replace
            if let Command::ChooseColor(slot) = command {
                let swatch_x = x + MENU_WIDTH as i32 - 30;
                surface.fill_rect(swatch_x, item_y + 5, 20, 15, palette.get(*slot), u8::MAX);
                surface.stroke_rect(swatch_x, item_y + 5, 20, 15, MENU_BORDER);
            }
        }

        surface.stroke_rect(x, y, MENU_WIDTH, Self::height(), MENU_BORDER);
    }
}

/// Swatch grid standing in for a color dialog
#[derive(Debug, Clone, PartialEq)]
pub struct ColorPicker {
    slot: ColorSlot,
    current: Rgb,
    origin: Point,
    hover: Option<usize>,
}

impl ColorPicker {
    /// Open centered in the viewport, highlighting the slot's current color
    pub fn open(slot: ColorSlot, current: Rgb, viewport: (u32, u32)) -> Self {
        let (width, height) = Self::size();
        let origin = Point::new(
            ((viewport.0 as i32 - width as i32) / 2).max(0),
            ((viewport.1 as i32 - height as i32) / 2).max(0),
        );
        Self {
            slot,
            current,
            origin,
            hover: None,
        }
    }

    pub fn slot(&self) -> ColorSlot {
        self.slot
    }

    pub fn size() -> (u32, u32) {
        let rows = SWATCHES.len().div_ceil(SWATCH_COLUMNS) as u32;
        let columns = SWATCH_COLUMNS as u32;
        let grid_w = columns * SWATCH_SIZE + (columns - 1) * SWATCH_GAP;
        let grid_h = rows * SWATCH_SIZE + (rows - 1) * SWATCH_GAP;
        (
            grid_w + 2 * PICKER_PADDING,
            grid_h + 2 * PICKER_PADDING + PICKER_TITLE_HEIGHT,
        )
    }

    /// Top-left corner of a swatch cell
    fn swatch_origin(&self, index: usize) -> Point {
        let col = (index % SWATCH_COLUMNS) as u32;
        let row = (index / SWATCH_COLUMNS) as u32;
        Point::new(
            self.origin.x + (PICKER_PADDING + col * (SWATCH_SIZE + SWATCH_GAP)) as i32,
            self.origin.y
                + (PICKER_PADDING + PICKER_TITLE_HEIGHT + row * (SWATCH_SIZE + SWATCH_GAP)) as i32,
        )
    }

    /// Index of the swatch under `pos`; gaps between swatches hit nothing
    pub fn swatch_at(&self, pos: Point) -> Option<usize> {
        (0..SWATCHES.len()).find(|&i| {
            let cell = self.swatch_origin(i);
            pos.x >= cell.x
                && pos.y >= cell.y
                && pos.x < cell.x + SWATCH_SIZE as i32
                && pos.y < cell.y + SWATCH_SIZE as i32
        })
    }

    pub fn color_at(&self, pos: Point) -> Option<Rgb> {
        self.swatch_at(pos).map(|i| SWATCHES[i])
    }

    pub fn hover(&mut self, pos: Point) -> bool {
        let hover = self.swatch_at(pos);
        let changed = hover != self.hover;
        self.hover = hover;
        changed
    }

    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        let (width, height) = Self::size();
        let (x, y) = (self.origin.x, self.origin.y);
        surface.fill_rect(x, y, width, height, MENU_BG, OVERLAY_ALPHA);
        surface.stroke_rect(x, y, width, height, MENU_BORDER);

        let title = match self.slot {
            ColorSlot::First => "Color 1",
            ColorSlot::Second => "Color 2",
        };
        surface.draw_text(x + PICKER_PADDING as i32, y + PICKER_PADDING as i32, title, MENU_TEXT);

        for (i, color) in SWATCHES.iter().enumerate() {
            let cell = self.swatch_origin(i);
            surface.fill_rect(cell.x, cell.y, SWATCH_SIZE, SWATCH_SIZE, *color, u8::MAX);

            let frame = if self.hover == Some(i) {
                Some(MENU_HOVER_BG)
            } else if *color == self.current {
                Some(MENU_TEXT)
            } else {
                None
            };
            if let Some(frame) = frame {
                for inset in 1..=2 {
                    let size = SWATCH_SIZE + 2 * inset as u32;
                    surface.stroke_rect(cell.x - inset, cell.y - inset, size, size, frame);
                }
            }
        }
    }
}
