use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyEventState, KeyModifiers};

/// What a single key event means to a typing session, before phase and
/// block rules are applied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    /// Load a different target text.
    Skip,
    /// Start the current target text over.
    Restart,
    DeleteWord,
    Backspace,
    Type(char),
    Ignore,
}

const COMMAND_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL
    .union(KeyModifiers::ALT)
    .union(KeyModifiers::META)
    .union(KeyModifiers::SUPER);

const WORD_DELETE_MODIFIERS: KeyModifiers = KeyModifiers::CONTROL
    .union(KeyModifiers::META)
    .union(KeyModifiers::SUPER);

pub fn classify(key: &KeyEvent) -> KeyAction {
    if key.kind == KeyEventKind::Release {
        return KeyAction::Ignore;
    }

    match key.code {
        KeyCode::Tab | KeyCode::BackTab => return KeyAction::Skip,
        KeyCode::Esc => return KeyAction::Restart,
        _ => {}
    }

    if key.modifiers.intersects(WORD_DELETE_MODIFIERS) {
        match key.code {
            KeyCode::Backspace => return KeyAction::DeleteWord,
            KeyCode::Char('w') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return KeyAction::DeleteWord
            }
            _ => {}
        }
    }

    if key.modifiers.intersects(COMMAND_MODIFIERS) {
        return KeyAction::Ignore;
    }

    match key.code {
        KeyCode::Backspace => KeyAction::Backspace,
        KeyCode::Enter => KeyAction::Type('\n'),
        KeyCode::Char(c) if !c.is_control() => KeyAction::Type(c),
        _ => KeyAction::Ignore,
    }
}

pub fn caps_lock_on(key: &KeyEvent) -> bool {
    key.state.contains(KeyEventState::CAPS_LOCK)
}
