#![forbid(unsafe_code)]

//! In-memory stand-in for the page the view templates render.
//!
//! Elements are addressed by the exact id and class strings the templates
//! use. Every helper tolerates missing targets: it logs a warning and does
//! nothing, so views may call them before the markup has settled.

use std::collections::{BTreeMap, BTreeSet};

use tracing::{info, warn};

pub const HIDDEN_CLASS: &str = "hidden";
pub const SAVED_DIALOG_ID: &str = "saved_dialog";
pub const SIDENAV_ID: &str = "mySidenav";
pub const FULL_PAGE_LOADER_ID: &str = "fullPageLoader";
pub const MOBILE_BUTTON_HOLDER_ID: &str = "mobileButtonHolder";
pub const WIDE_BUTTON_HOLDER_ID: &str = "wideButtonHolder";
pub const KD_TOGGLE_BOX_CLASS: &str = "kd_toggle_box";
pub const KD_TOGGLE_BULLET_CLASS: &str = "kd_toggle_bullet";
pub const KD_TOGGLE_CHECKED_CLASS: &str = "checked_kd_toggle_bullet";
pub const WIDE_LAYOUT_MIN_WIDTH_PX: u32 = 1_050;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Display {
    #[default]
    Unset,
    None,
    Block,
    Flex,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub id: String,
    pub tag: String,
    pub name: Option<String>,
    pub value: String,
    pub checked: bool,
    pub classes: BTreeSet<String>,
    pub display: Display,
    pub height: Option<String>,
    pub width: Option<String>,
    pub bold: bool,
    pub text: String,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

impl Element {
    pub fn new(tag: &str, id: &str) -> Self {
        Self {
            id: id.to_string(),
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.value = value.to_string();
        self
    }

    pub fn with_text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn with_display(mut self, display: Display) -> Self {
        self.display = display;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width_px: u32,
    pub landscape: bool,
}

impl Viewport {
    /// `(min-width: 1050px) and (orientation: landscape)`
    pub fn matches_wide_layout(&self) -> bool {
        self.width_px >= WIDE_LAYOUT_MIN_WIDTH_PX && self.landscape
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Up,
    Down,
}

#[derive(Debug, Clone, Default)]
pub struct ViewTree {
    elements: BTreeMap<String, Element>,
    modal_buttons: BTreeMap<String, String>,
    backdrop_modal: Option<String>,
    alerts: Vec<String>,
    saved_flashes: u32,
}

impl ViewTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a top-level element, replacing any element with the same id.
    pub fn insert(&mut self, element: Element) {
        self.elements.insert(element.id.clone(), element);
    }

    pub fn append_child(&mut self, parent_id: &str, mut element: Element) -> bool {
        if !self.elements.contains_key(parent_id) {
            warn!("could not find parent id {parent_id}");
            return false;
        }
        element.parent = Some(parent_id.to_string());
        let child_id = element.id.clone();
        self.elements.insert(child_id.clone(), element);
        if let Some(parent) = self.elements.get_mut(parent_id) {
            parent.children.push(child_id);
        }
        true
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    fn lookup_mut(&mut self, id: &str) -> Option<&mut Element> {
        let found = self.elements.get_mut(id);
        if found.is_none() {
            warn!("could not find element id {id}");
        }
        found
    }

    pub fn ids_with_class(&self, class: &str) -> Vec<String> {
        self.elements
            .values()
            .filter(|e| e.has_class(class))
            .map(|e| e.id.clone())
            .collect()
    }

    pub fn value_of(&self, id: &str) -> Option<&str> {
        self.elements.get(id).map(|e| e.value.as_str())
    }

    pub fn set_value(&mut self, id: &str, value: &str) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                e.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn set_checked(&mut self, id: &str, checked: bool) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                e.checked = checked;
                true
            }
            None => false,
        }
    }

    /// Links a button to a modal div: clicking the button shows the modal,
    /// clicking the modal backdrop hides it again.
    pub fn register_modal_div(&mut self, button_id: &str, modal_id: &str) -> bool {
        if !self.elements.contains_key(button_id) {
            warn!("could not find button id {button_id}");
            return false;
        }
        if !self.elements.contains_key(modal_id) {
            warn!("could not find modal id {modal_id} for button {button_id}");
            return false;
        }
        self.modal_buttons
            .insert(button_id.to_string(), modal_id.to_string());
        // One window-level click handler: the latest registration wins.
        self.backdrop_modal = Some(modal_id.to_string());
        info!("button: {button_id} and div: {modal_id} are linked");
        true
    }

    pub fn click(&mut self, id: &str) -> bool {
        let Some(modal_id) = self.modal_buttons.get(id).cloned() else {
            return false;
        };
        match self.lookup_mut(&modal_id) {
            Some(modal) => {
                modal.display = Display::Block;
                true
            }
            None => false,
        }
    }

    /// A click anywhere in the window; closes the registered modal when the
    /// click landed on its backdrop.
    pub fn window_click(&mut self, target_id: &str) -> bool {
        if self.backdrop_modal.as_deref() != Some(target_id) {
            return false;
        }
        match self.elements.get_mut(target_id) {
            Some(modal) => {
                modal.display = Display::None;
                true
            }
            None => false,
        }
    }

    pub fn close_modal(&mut self, modal_id: &str) -> bool {
        self.set_display(modal_id, Display::None)
    }

    pub fn set_display(&mut self, id: &str, display: Display) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                e.display = display;
                true
            }
            None => false,
        }
    }

    /// Toggles the `hidden` class.
    pub fn show_hide(&mut self, id: &str) -> bool {
        self.toggle_class(id, HIDDEN_CLASS)
    }

    pub fn hide(&mut self, id: &str) -> bool {
        self.set_display(id, Display::None)
    }

    /// Toggles between `display: none` and `display: block`.
    pub fn toggle_display(&mut self, id: &str) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                e.display = if e.display == Display::None {
                    Display::Block
                } else {
                    Display::None
                };
                true
            }
            None => false,
        }
    }

    pub fn toggle_class(&mut self, id: &str, class: &str) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                if !e.classes.remove(class) {
                    e.classes.insert(class.to_string());
                }
                true
            }
            None => false,
        }
    }

    pub fn set_class_on_class(&mut self, target_class: &str, class: &str, on: bool) -> usize {
        let ids = self.ids_with_class(target_class);
        for id in &ids {
            if let Some(e) = self.elements.get_mut(id) {
                if on {
                    e.classes.insert(class.to_string());
                } else {
                    e.classes.remove(class);
                }
            }
        }
        ids.len()
    }

    pub fn set_bold_on_class(&mut self, target_class: &str, bold: bool) -> usize {
        let ids = self.ids_with_class(target_class);
        for id in &ids {
            if let Some(e) = self.elements.get_mut(id) {
                e.bold = bold;
            }
        }
        ids.len()
    }

    pub fn set_text_on_class(&mut self, target_class: &str, text: &str) -> usize {
        let ids = self.ids_with_class(target_class);
        for id in &ids {
            if let Some(e) = self.elements.get_mut(id) {
                e.text = text.to_string();
            }
        }
        ids.len()
    }

    /// Collapsible control panel: `flex` collapses to `none`, `none` expands
    /// to `flex`. Any other display state is left alone and reported.
    pub fn show_hide_controls(&mut self, id: &str) -> bool {
        let Some(e) = self.lookup_mut(id) else {
            return false;
        };
        match e.display {
            Display::None => {
                e.height = Some("auto".to_string());
                e.display = Display::Flex;
                true
            }
            Display::Flex => {
                e.height = Some("0".to_string());
                e.display = Display::None;
                true
            }
            other => {
                warn!("unhandled display state {other:?} on {id}");
                false
            }
        }
    }

    pub fn show_controls(&mut self, id: &str) -> bool {
        let Some(e) = self.lookup_mut(id) else {
            return false;
        };
        e.display = Display::Flex;
        e.height = Some("auto".to_string());
        true
    }

    pub fn show_full_page_loader(&mut self) -> bool {
        self.set_display(FULL_PAGE_LOADER_ID, Display::Block)
    }

    pub fn open_nav(&mut self) -> bool {
        self.set_width(SIDENAV_ID, "75%")
    }

    pub fn close_nav(&mut self) -> bool {
        self.set_width(SIDENAV_ID, "0")
    }

    fn set_width(&mut self, id: &str, width: &str) -> bool {
        match self.lookup_mut(id) {
            Some(e) => {
                e.width = Some(width.to_string());
                true
            }
            None => false,
        }
    }

    /// Moves a dynamic button into the wide or mobile holder depending on the
    /// viewport at call time. Returns the holder id used.
    pub fn place_dynamic_button(
        &mut self,
        button_id: &str,
        viewport: Viewport,
    ) -> Option<&'static str> {
        let holder = if viewport.matches_wide_layout() {
            WIDE_BUTTON_HOLDER_ID
        } else {
            MOBILE_BUTTON_HOLDER_ID
        };
        if !self.elements.contains_key(holder) {
            warn!("could not find button holder {holder}");
            return None;
        }
        if !self.elements.contains_key(button_id) {
            warn!("could not find button id {button_id}");
            return None;
        }
        self.detach(button_id);
        if let Some(button) = self.elements.get_mut(button_id) {
            button.parent = Some(holder.to_string());
        }
        if let Some(h) = self.elements.get_mut(holder) {
            h.children.push(button_id.to_string());
        }
        Some(holder)
    }

    fn detach(&mut self, id: &str) {
        let parent = self.elements.get(id).and_then(|e| e.parent.clone());
        if let Some(parent_id) = parent {
            if let Some(p) = self.elements.get_mut(&parent_id) {
                p.children.retain(|c| c != id);
            }
        }
    }

    /// Inserts a styled bullet span before every `kd_toggle_box` input.
    /// Checked boxes get a checked bullet and a bold parent.
    pub fn kd_toggle_init(&mut self) -> usize {
        let toggles = self.ids_with_class(KD_TOGGLE_BOX_CLASS);
        info!("found {} {KD_TOGGLE_BOX_CLASS} elements", toggles.len());
        let mut initialized = 0;
        for id in toggles {
            let bullet_id = format!("{id}_bullet_span");
            if self.elements.contains_key(&bullet_id) {
                continue;
            }
            let Some(toggle) = self.elements.get(&id) else {
                continue;
            };
            let checked = toggle.checked;
            let parent = toggle.parent.clone();

            let mut bullet = Element::new("span", &bullet_id).with_class(KD_TOGGLE_BULLET_CLASS);
            if checked {
                bullet.classes.insert(KD_TOGGLE_CHECKED_CLASS.to_string());
            }
            bullet.parent = parent.clone();
            self.elements.insert(bullet_id.clone(), bullet);

            if let Some(parent_id) = parent {
                if let Some(p) = self.elements.get_mut(&parent_id) {
                    let at = p.children.iter().position(|c| *c == id).unwrap_or(0);
                    p.children.insert(at, bullet_id);
                    if checked {
                        p.bold = true;
                    }
                }
            }
            initialized += 1;
        }
        info!("initialized {initialized} toggle elements");
        initialized
    }

    pub fn kd_toggle(&mut self, toggle_id: &str) -> bool {
        self.toggle_class(&format!("{toggle_id}_bullet_span"), KD_TOGGLE_CHECKED_CLASS)
    }

    /// `stepUp()` / `stepDown()` on a numeric input, honoring min/max.
    pub fn step(&mut self, id: &str, direction: StepDirection) -> Option<i64> {
        let e = self.lookup_mut(id)?;
        let current = e.value.trim().parse::<i64>().unwrap_or(0);
        let mut next = match direction {
            StepDirection::Up => current.saturating_add(1),
            StepDirection::Down => current.saturating_sub(1),
        };
        if let Some(min) = e.min {
            next = next.max(min);
        }
        if let Some(max) = e.max {
            next = next.min(max);
        }
        e.value = next.to_string();
        Some(next)
    }

    /// Blocking alert dialog.
    pub fn alert(&mut self, message: &str) {
        warn!("alert: {message}");
        self.alerts.push(message.to_string());
    }

    pub fn alerts(&self) -> &[String] {
        &self.alerts
    }

    /// Transient "saved" toast.
    pub fn flash_saved(&mut self) {
        self.saved_flashes = self.saved_flashes.saturating_add(1);
        if let Some(dialog) = self.elements.get_mut(SAVED_DIALOG_ID) {
            // Fades in and back out; the resting state is hidden.
            dialog.display = Display::None;
        }
    }

    pub fn saved_flashes(&self) -> u32 {
        self.saved_flashes
    }
}
