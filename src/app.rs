// Application state module
// The editor reducer: pointer, menu and keyboard events in, state changes and redraw requests out

use crate::color::Rgb;
use crate::history::History;
use crate::menu::{Availability, ColorPicker, ContextMenu};
use crate::star::{radius_between, Point, Star};
use crate::surface::Surface;
use log::{debug, info};

/// Pointer buttons the editor distinguishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerButton {
    Left,
    Right,
}

/// Which of the two border colors a command refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSlot {
    First,
    Second,
}

/// Menu and keyboard commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    ChooseColor(ColorSlot),
    DeleteAll,
    DeleteLast,
    Redo,
}

/// Input the editor reacts to, in surface coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Event {
    PointerDown { button: PointerButton, position: Point },
    PointerMove { position: Point },
    PointerUp { button: PointerButton },
    PointerLeave,
    Command(Command),
    /// Dismiss whatever overlay is open
    Cancel,
    Resize { width: u32, height: u32 },
}

/// Border colors given to newly created stars
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    pub border_a: Rgb,
    pub border_b: Rgb,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            border_a: Rgb::BLUE,
            border_b: Rgb::RED,
        }
    }
}

impl Palette {
    pub fn get(&self, slot: ColorSlot) -> Rgb {
        match slot {
            ColorSlot::First => self.border_a,
            ColorSlot::Second => self.border_b,
        }
    }

    pub fn set(&mut self, slot: ColorSlot, color: Rgb) {
        match slot {
            ColorSlot::First => self.border_a = color,
            ColorSlot::Second => self.border_b = color,
        }
    }
}

/// The star being sized by an active left-button drag
#[derive(Debug, Clone, Copy, PartialEq)]
struct Drag {
    anchor: Point,
    star: Star,
}

/// At most one overlay is open at a time
#[derive(Debug, Clone, PartialEq)]
enum Overlay {
    None,
    Menu(ContextMenu),
    Picker(ColorPicker),
}

/// Editor state for the drawing pad
pub struct Editor {
    history: History,
    palette: Palette,
    background: Rgb,
    drag: Option<Drag>,
    overlay: Overlay,
    viewport: (u32, u32),
}

impl Editor {
    pub fn new(palette: Palette, background: Rgb, viewport: (u32, u32)) -> Self {
        Self {
            history: History::new(),
            palette,
            background,
            drag: None,
            overlay: Overlay::None,
            viewport,
        }
    }

    #[cfg(test)]
    pub fn history(&self) -> &History {
        &self.history
    }

    #[cfg(test)]
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    #[cfg(test)]
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether a menu or picker is currently shown
    pub fn has_overlay(&self) -> bool {
        self.overlay != Overlay::None
    }

    /// Apply one event. Returns true when the frame needs repainting.
    pub fn handle(&mut self, event: Event) -> bool {
        match event {
            Event::PointerDown { button, position } => self.pointer_down(button, position),
            Event::PointerMove { position } => self.pointer_move(position),
            Event::PointerUp { button } => self.pointer_up(button),
            // Leave with a button held means the grab is gone and no release will follow
            Event::PointerLeave => {
                self.end_drag();
                false
            }
            Event::Command(command) => {
                self.end_drag();
                self.run(command)
            }
            Event::Cancel => self.close_overlay(),
            Event::Resize { width, height } => {
                if self.viewport == (width, height) {
                    return false;
                }
                self.viewport = (width, height);
                self.overlay = Overlay::None;
                true
            }
        }
    }

    fn pointer_down(&mut self, button: PointerButton, position: Point) -> bool {
        if self.drag.is_some() {
            return false;
        }

        let overlay = std::mem::replace(&mut self.overlay, Overlay::None);
        match (button, overlay) {
            (PointerButton::Left, Overlay::Menu(menu)) => {
                if let Some(command) = menu.command_at(position) {
                    self.run(command);
                }
                true
            }
            (PointerButton::Left, Overlay::Picker(picker)) => {
                match picker.color_at(position) {
                    Some(color) => {
                        self.palette.set(picker.slot(), color);
                        info!("Color {:?} set to {}", picker.slot(), color);
                    }
                    None => debug!("Color picker dismissed"),
                }
                true
            }
            (PointerButton::Left, Overlay::None) => {
                let star = Star::from_palette(position, &self.palette);
                self.history.add(star);
                self.drag = Some(Drag {
                    anchor: position,
                    star,
                });
                true
            }
            (PointerButton::Right, _) => {
                self.overlay = Overlay::Menu(ContextMenu::open_at(position, self.viewport));
                true
            }
        }
    }

    fn pointer_move(&mut self, position: Point) -> bool {
        if let Some(drag) = self.drag.as_mut() {
            let star = drag.star.with_radius(radius_between(drag.anchor, position));
            if star == drag.star {
                return false;
            }
            drag.star = star;
            return self.history.replace_last(star);
        }

        match &mut self.overlay {
            Overlay::Menu(menu) => menu.hover(position),
            Overlay::Picker(picker) => picker.hover(position),
            Overlay::None => false,
        }
    }

    fn pointer_up(&mut self, button: PointerButton) -> bool {
        if button == PointerButton::Left {
            self.end_drag();
        }
        false
    }

    fn end_drag(&mut self) {
        if let Some(drag) = self.drag.take() {
            debug!(
                "Star committed at ({}, {}) with radius {}",
                drag.star.center.x, drag.star.center.y, drag.star.radius
            );
        }
    }

    fn close_overlay(&mut self) -> bool {
        let was_open = self.has_overlay();
        self.overlay = Overlay::None;
        was_open
    }

    fn run(&mut self, command: Command) -> bool {
        info!("Command: {:?}", command);
        match command {
            Command::ChooseColor(slot) => {
                let current = self.palette.get(slot);
                self.overlay = Overlay::Picker(ColorPicker::open(slot, current, self.viewport));
                true
            }
            Command::DeleteAll => self.history.delete_all() | self.close_overlay(),
            Command::DeleteLast => self.history.delete_last() | self.close_overlay(),
            Command::Redo => self.history.redo() | self.close_overlay(),
        }
    }

    /// Paint the full frame: background, stars back to front, then any overlay
    pub fn render<S: Surface + ?Sized>(&self, surface: &mut S) {
        surface.clear(self.background);
        for star in self.history.live() {
            star.draw(surface);
        }

        match &self.overlay {
            Overlay::Menu(menu) => {
                let availability = Availability {
                    has_stars: !self.history.is_empty(),
                    can_redo: self.history.can_redo(),
                };
                menu.render(surface, &self.palette, availability);
            }
            Overlay::Picker(picker) => picker.render(surface),
            Overlay::None => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::SWATCHES;
    use crate::raster::Canvas;

    fn editor() -> Editor {
        Editor::new(Palette::default(), Rgb::WHITE, (800, 600))
    }

    fn down(editor: &mut Editor, button: PointerButton, x: i32, y: i32) -> bool {
        editor.handle(Event::PointerDown {
            button,
            position: Point::new(x, y),
        })
    }

    fn move_to(editor: &mut Editor, x: i32, y: i32) -> bool {
        editor.handle(Event::PointerMove {
            position: Point::new(x, y),
        })
    }

    fn up(editor: &mut Editor, button: PointerButton) -> bool {
        editor.handle(Event::PointerUp { button })
    }

    fn drag(editor: &mut Editor, from: (i32, i32), to: (i32, i32)) {
        down(editor, PointerButton::Left, from.0, from.1);
        move_to(editor, to.0, to.1);
        up(editor, PointerButton::Left);
    }

    #[test]
    fn left_drag_creates_one_star_following_the_pointer() {
        let mut editor = editor();
        assert!(down(&mut editor, PointerButton::Left, 100, 100));
        assert_eq!(editor.history().live().len(), 1);
        assert_eq!(editor.history().live()[0].radius, 0);
        assert!(editor.is_dragging());

        assert!(move_to(&mut editor, 130, 140));
        assert_eq!(editor.history().live()[0].radius, 50);

        assert!(move_to(&mut editor, 101, 101));
        assert_eq!(editor.history().live()[0].radius, 1);

        assert!(!up(&mut editor, PointerButton::Left));
        assert!(!editor.is_dragging());

        // moves after release leave the star alone
        assert!(!move_to(&mut editor, 400, 400));
        assert_eq!(editor.history().live().len(), 1);
        assert_eq!(editor.history().live()[0].radius, 1);
        assert_eq!(editor.history().live()[0].center, Point::new(100, 100));
    }

    #[test]
    fn move_without_radius_change_skips_redraw() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Left, 0, 0);
        assert!(move_to(&mut editor, 3, 4));
        assert!(!move_to(&mut editor, 4, 3));
    }

    #[test]
    fn right_button_never_starts_a_star() {
        let mut editor = editor();
        assert!(down(&mut editor, PointerButton::Right, 10, 10));
        assert!(!up(&mut editor, PointerButton::Right));
        assert!(editor.history().is_empty());
        assert!(editor.has_overlay());
    }

    #[test]
    fn stray_pointer_up_and_leave_are_noops() {
        let mut editor = editor();
        assert!(!up(&mut editor, PointerButton::Left));
        assert!(!editor.handle(Event::PointerLeave));

        down(&mut editor, PointerButton::Left, 50, 50);
        assert!(!up(&mut editor, PointerButton::Right));
        assert!(editor.is_dragging());
    }

    #[test]
    fn leaving_mid_drag_commits_the_star() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Left, 100, 100);
        move_to(&mut editor, 130, 140);

        assert!(!editor.handle(Event::PointerLeave));
        assert!(!editor.is_dragging());

        // hover after the lost grab leaves the radius alone
        assert!(!move_to(&mut editor, 400, 400));
        assert_eq!(editor.history().live()[0].radius, 50);

        // and the next press starts a fresh star
        assert!(down(&mut editor, PointerButton::Left, 10, 10));
        let live = editor.history().live();
        assert_eq!(live.len(), 2);
        assert_eq!(live[0].radius, 50);
        assert_eq!(live[1].center, Point::new(10, 10));
        assert_eq!(live[1].radius, 0);
    }

    #[test]
    fn menu_click_runs_command_and_closes() {
        let mut editor = editor();
        drag(&mut editor, (100, 100), (110, 100));
        drag(&mut editor, (300, 300), (320, 300));

        down(&mut editor, PointerButton::Right, 0, 0);
        // fourth item: Delete Last
        assert!(down(&mut editor, PointerButton::Left, 10, 80));
        assert!(!editor.has_overlay());
        assert_eq!(editor.history().live().len(), 1);
        assert_eq!(editor.history().deleted().len(), 1);

        down(&mut editor, PointerButton::Right, 0, 0);
        // fifth item: Redo
        down(&mut editor, PointerButton::Left, 10, 105);
        assert_eq!(editor.history().live().len(), 2);
        assert_eq!(editor.history().live()[1].center, Point::new(300, 300));
    }

    #[test]
    fn clicking_outside_the_menu_only_closes_it() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Right, 0, 0);
        assert!(down(&mut editor, PointerButton::Left, 500, 500));
        assert!(!editor.has_overlay());
        assert!(editor.history().is_empty());
        assert!(!editor.is_dragging());
    }

    #[test]
    fn menu_hover_redraws_on_change() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Right, 0, 0);
        assert!(move_to(&mut editor, 10, 10));
        assert!(!move_to(&mut editor, 12, 12));
        assert!(move_to(&mut editor, 10, 40));
    }

    #[test]
    fn picking_a_color_is_not_retroactive() {
        let mut editor = editor();
        drag(&mut editor, (100, 100), (120, 100));

        assert!(editor.handle(Event::Command(Command::ChooseColor(ColorSlot::First))));
        assert!(editor.has_overlay());

        // first swatch of the picker centered in 800x600
        let (w, h) = ColorPicker::size();
        let origin = Point::new((800 - w as i32) / 2, (600 - h as i32) / 2);
        down(&mut editor, PointerButton::Left, origin.x + 14, origin.y + 34);
        assert!(!editor.has_overlay());
        assert_eq!(editor.palette().border_a, SWATCHES[0]);
        assert_eq!(editor.palette().border_b, Rgb::RED);

        drag(&mut editor, (300, 300), (320, 300));
        let live = editor.history().live();
        assert_eq!(live[0].border_a, Rgb::BLUE);
        assert_eq!(live[1].border_a, SWATCHES[0]);
        assert_eq!(live[1].border_b, Rgb::RED);
    }

    #[test]
    fn cancelling_the_picker_keeps_the_palette() {
        let mut editor = editor();
        editor.handle(Event::Command(Command::ChooseColor(ColorSlot::Second)));
        assert!(editor.handle(Event::Cancel));
        assert_eq!(*editor.palette(), Palette::default());
        assert!(!editor.handle(Event::Cancel));

        editor.handle(Event::Command(Command::ChooseColor(ColorSlot::Second)));
        down(&mut editor, PointerButton::Left, 0, 0);
        assert_eq!(*editor.palette(), Palette::default());
        assert!(editor.history().is_empty());
    }

    #[test]
    fn command_during_drag_commits_the_star_first() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Left, 100, 100);
        move_to(&mut editor, 110, 100);

        assert!(editor.handle(Event::Command(Command::DeleteLast)));
        assert!(!editor.is_dragging());
        assert!(editor.history().is_empty());

        // later moves no longer resize anything
        assert!(!move_to(&mut editor, 200, 200));
        assert_eq!(editor.history().deleted()[0].radius, 10);
    }

    #[test]
    fn history_commands_report_noops() {
        let mut editor = editor();
        assert!(!editor.handle(Event::Command(Command::DeleteAll)));
        assert!(!editor.handle(Event::Command(Command::DeleteLast)));
        assert!(!editor.handle(Event::Command(Command::Redo)));

        drag(&mut editor, (10, 10), (20, 10));
        assert!(editor.handle(Event::Command(Command::DeleteAll)));
        assert!(editor.handle(Event::Command(Command::Redo)));
        assert_eq!(editor.history().live().len(), 1);
    }

    #[test]
    fn resize_closes_overlays() {
        let mut editor = editor();
        down(&mut editor, PointerButton::Right, 0, 0);
        assert!(editor.handle(Event::Resize { width: 640, height: 480 }));
        assert!(!editor.has_overlay());
        assert!(!editor.handle(Event::Resize { width: 640, height: 480 }));
    }

    #[test]
    fn render_draws_stars_over_background() {
        let mut editor = editor();
        drag(&mut editor, (50, 50), (90, 50));
        let mut canvas = Canvas::new(100, 100, Rgb::BLACK);
        editor.render(&mut canvas);
        assert_eq!(canvas.pixel(50, 50), Some(Rgb::YELLOW));
        assert_eq!(canvas.pixel(2, 2), Some(Rgb::WHITE));
    }
}
