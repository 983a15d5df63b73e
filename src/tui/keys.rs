use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// What a key press asks the browser to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    PreviousPage,
    NextPage,
    FirstPage,
    LastPage,
    LargerPageSize,
    SmallerPageSize,
    Retry,
    ScrollUp,
    ScrollDown,
    ToggleHelp,
    Quit,
}

impl Action {
    pub fn description(&self) -> &'static str {
        match self {
            Action::PreviousPage => "Previous page",
            Action::NextPage => "Next page",
            Action::FirstPage => "First page",
            Action::LastPage => "Last page",
            Action::LargerPageSize => "More products per page",
            Action::SmallerPageSize => "Fewer products per page",
            Action::Retry => "Retry the current page",
            Action::ScrollUp => "Scroll up",
            Action::ScrollDown => "Scroll down",
            Action::ToggleHelp => "Show/hide help",
            Action::Quit => "Quit",
        }
    }
}

/// Key binding configuration
#[derive(Debug, Clone)]
pub struct KeyBinding {
    pub key: KeyCode,
    pub modifiers: KeyModifiers,
    pub action: Action,
}

impl KeyBinding {
    pub fn new(key: KeyCode, modifiers: KeyModifiers, action: Action) -> Self {
        Self {
            key,
            modifiers,
            action,
        }
    }

    fn plain(key: KeyCode, action: Action) -> Self {
        Self::new(key, KeyModifiers::NONE, action)
    }

    /// Shift is ignored for characters since terminals differ in reporting it
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if self.key != event.code {
            return false;
        }
        match event.code {
            KeyCode::Char(_) => {
                self.modifiers.difference(KeyModifiers::SHIFT)
                    == event.modifiers.difference(KeyModifiers::SHIFT)
            }
            _ => self.modifiers == event.modifiers,
        }
    }

    pub fn label(&self) -> String {
        let key = match self.key {
            KeyCode::Left => "←".to_string(),
            KeyCode::Right => "→".to_string(),
            KeyCode::Up => "↑".to_string(),
            KeyCode::Down => "↓".to_string(),
            KeyCode::Home => "Home".to_string(),
            KeyCode::End => "End".to_string(),
            KeyCode::Esc => "Esc".to_string(),
            KeyCode::Char(c) => c.to_string(),
            other => format!("{:?}", other),
        };
        if self.modifiers.contains(KeyModifiers::CONTROL) {
            format!("Ctrl+{}", key.to_uppercase())
        } else {
            key
        }
    }
}

/// Application key mappings
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: Vec<KeyBinding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        use Action::*;
        Self {
            bindings: vec![
                KeyBinding::plain(KeyCode::Left, PreviousPage),
                KeyBinding::plain(KeyCode::Char('h'), PreviousPage),
                KeyBinding::plain(KeyCode::Right, NextPage),
                KeyBinding::plain(KeyCode::Char('l'), NextPage),
                KeyBinding::plain(KeyCode::Home, FirstPage),
                KeyBinding::plain(KeyCode::Char('g'), FirstPage),
                KeyBinding::plain(KeyCode::End, LastPage),
                KeyBinding::plain(KeyCode::Char('G'), LastPage),
                KeyBinding::plain(KeyCode::Char('+'), LargerPageSize),
                KeyBinding::plain(KeyCode::Char('='), LargerPageSize),
                KeyBinding::plain(KeyCode::Char('-'), SmallerPageSize),
                KeyBinding::plain(KeyCode::Char('r'), Retry),
                KeyBinding::plain(KeyCode::Up, ScrollUp),
                KeyBinding::plain(KeyCode::Char('k'), ScrollUp),
                KeyBinding::plain(KeyCode::Down, ScrollDown),
                KeyBinding::plain(KeyCode::Char('j'), ScrollDown),
                KeyBinding::plain(KeyCode::Char('?'), ToggleHelp),
                KeyBinding::plain(KeyCode::Char('q'), Quit),
                KeyBinding::new(KeyCode::Char('c'), KeyModifiers::CONTROL, Quit),
            ],
        }
    }
}

impl KeyMap {
    pub fn action_for(&self, event: &KeyEvent) -> Option<Action> {
        self.bindings
            .iter()
            .find(|binding| binding.matches(event))
            .map(|binding| binding.action)
    }

    /// One `(keys, description)` row per action, in binding order
    pub fn help_entries(&self) -> Vec<(String, &'static str)> {
        let mut entries: Vec<(Action, Vec<String>)> = Vec::new();
        for binding in &self.bindings {
            match entries.iter_mut().find(|(action, _)| *action == binding.action) {
                Some((_, labels)) => labels.push(binding.label()),
                None => entries.push((binding.action, vec![binding.label()])),
            }
        }
        entries
            .into_iter()
            .map(|(action, labels)| (labels.join("/"), action.description()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn test_default_actions() {
        let map = KeyMap::default();
        assert_eq!(
            map.action_for(&key(KeyCode::Right, KeyModifiers::NONE)),
            Some(Action::NextPage)
        );
        assert_eq!(
            map.action_for(&key(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Action::Quit)
        );
        assert_eq!(map.action_for(&key(KeyCode::Char('c'), KeyModifiers::NONE)), None);
        assert_eq!(map.action_for(&key(KeyCode::Tab, KeyModifiers::NONE)), None);
    }

    #[test]
    fn test_shifted_characters_match() {
        let map = KeyMap::default();
        assert_eq!(
            map.action_for(&key(KeyCode::Char('G'), KeyModifiers::SHIFT)),
            Some(Action::LastPage)
        );
        assert_eq!(
            map.action_for(&key(KeyCode::Char('?'), KeyModifiers::SHIFT)),
            Some(Action::ToggleHelp)
        );
    }

    #[test]
    fn test_help_entries_group_keys() {
        let entries = KeyMap::default().help_entries();
        assert_eq!(entries[0], ("←/h".to_string(), "Previous page"));
        assert!(entries.contains(&("q/Ctrl+C".to_string(), "Quit")));
    }
}
