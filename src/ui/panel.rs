/// Screen and label handles.
///
/// Every handle is optional. A missing panel or label turns the matching
/// display update into a no-op, so the state machine runs the same with a
/// full front end, a partial one, or none at all (tests, headless tools).

use super::state::UiState;

/// Scale a panel starts at when it pops in.
pub const POP_START_SCALE: f32 = 0.6;

#[derive(Clone, Debug, PartialEq)]
pub struct Panel {
    visible: bool,
    scale: f32,
}

impl Panel {
    pub fn new() -> Self {
        Panel { visible: false, scale: 1.0 }
    }

    pub fn show(&mut self, scale: f32) {
        self.visible = true;
        self.scale = scale;
    }

    pub fn hide(&mut self) {
        self.visible = false;
        self.scale = 1.0;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.scale = scale.clamp(0.0, 1.0);
    }
}

impl Default for Panel {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Label {
    text: String,
}

impl Label {
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

/// One optional panel per screen.
#[derive(Clone, Debug, Default)]
pub struct Panels {
    pub main_menu: Option<Panel>,
    pub game: Option<Panel>,
    pub pause: Option<Panel>,
    pub level_complete: Option<Panel>,
}

impl Panels {
    /// Every screen attached.
    pub fn full() -> Self {
        Panels {
            main_menu: Some(Panel::new()),
            game: Some(Panel::new()),
            pause: Some(Panel::new()),
            level_complete: Some(Panel::new()),
        }
    }

    /// Nothing attached.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn get(&self, state: UiState) -> Option<&Panel> {
        match state {
            UiState::MainMenu => self.main_menu.as_ref(),
            UiState::GamePlay => self.game.as_ref(),
            UiState::PauseMenu => self.pause.as_ref(),
            UiState::LevelComplete => self.level_complete.as_ref(),
        }
    }

    pub fn get_mut(&mut self, state: UiState) -> Option<&mut Panel> {
        match state {
            UiState::MainMenu => self.main_menu.as_mut(),
            UiState::GamePlay => self.game.as_mut(),
            UiState::PauseMenu => self.pause.as_mut(),
            UiState::LevelComplete => self.level_complete.as_mut(),
        }
    }

    pub fn hide_all(&mut self) {
        for state in UiState::ALL {
            if let Some(panel) = self.get_mut(state) {
                panel.hide();
            }
        }
    }

    pub fn show(&mut self, state: UiState, scale: f32) {
        if let Some(panel) = self.get_mut(state) {
            panel.show(scale);
        }
    }

    pub fn visible_count(&self) -> usize {
        UiState::ALL
            .iter()
            .filter(|&&s| self.get(s).is_some_and(Panel::is_visible))
            .count()
    }

    /// The visible screen, if any is attached and shown.
    pub fn visible(&self) -> Option<UiState> {
        UiState::ALL
            .into_iter()
            .find(|&s| self.get(s).is_some_and(Panel::is_visible))
    }
}

/// Optional text outputs.
#[derive(Clone, Debug, Default)]
pub struct Labels {
    pub collected: Option<Label>,
    pub completion: Option<Label>,
    pub next_hint: Option<Label>,
}

impl Labels {
    pub fn full() -> Self {
        Labels {
            collected: Some(Label::default()),
            completion: Some(Label::default()),
            next_hint: Some(Label::default()),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }
}

/// Set the text of an optional label.
pub fn set_text(label: &mut Option<Label>, text: impl Into<String>) {
    if let Some(label) = label {
        label.set_text(text);
    }
}

/// Read the text of an optional label.
pub fn text(label: &Option<Label>) -> Option<&str> {
    label.as_ref().map(Label::text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn show_hides_nothing_else() {
        let mut p = Panels::full();
        p.show(UiState::PauseMenu, 1.0);
        assert_eq!(p.visible(), Some(UiState::PauseMenu));
        p.hide_all();
        assert_eq!(p.visible_count(), 0);
    }

    #[test]
    fn missing_panels_are_no_ops() {
        let mut p = Panels::none();
        p.show(UiState::GamePlay, 1.0);
        p.hide_all();
        assert_eq!(p.visible_count(), 0);
        assert_eq!(p.visible(), None);
    }

    #[test]
    fn partial_panels_only_show_what_exists() {
        let mut p = Panels { game: Some(Panel::new()), ..Panels::none() };
        p.show(UiState::MainMenu, 1.0);
        assert_eq!(p.visible_count(), 0);
        p.show(UiState::GamePlay, POP_START_SCALE);
        assert_eq!(p.visible(), Some(UiState::GamePlay));
        assert_eq!(p.get(UiState::GamePlay).unwrap().scale(), POP_START_SCALE);
    }

    #[test]
    fn missing_label_ignores_text() {
        let mut none: Option<Label> = None;
        set_text(&mut none, "Collected: 1/2");
        assert_eq!(text(&none), None);

        let mut some = Some(Label::default());
        set_text(&mut some, "Collected: 1/2");
        assert_eq!(text(&some), Some("Collected: 1/2"));
    }
}
