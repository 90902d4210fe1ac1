//! Keyboard bindings

use crate::lights::LightCommand;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// What a key press asks for
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Quit,
    Lights(LightCommand),
}

impl Command {
    /// Look up the binding for a key. Releases/repeats and unbound keys are
    /// ignored.
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        // Raw mode swallows SIGINT, so Ctrl-C has to be handled as a key
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            return (key.code == KeyCode::Char('c')).then_some(Self::Quit);
        }

        let command = match key.code {
            KeyCode::Char('q') => Self::Quit,
            KeyCode::Char('r') => Self::Lights(LightCommand::StandardOn),
            KeyCode::Char('s') => Self::Lights(LightCommand::Standard),
            KeyCode::Char('w') => Self::Lights(LightCommand::White),
            KeyCode::Char('b') => Self::Lights(LightCommand::WindDown),
            KeyCode::Esc => Self::Lights(LightCommand::Toggle),
            KeyCode::Up => Self::Lights(LightCommand::Brighten),
            KeyCode::Down => Self::Lights(LightCommand::Dim),
            _ => return None,
        };
        Some(command)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventState;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_bindings() {
        let cases = [
            (KeyCode::Char('q'), Command::Quit),
            (KeyCode::Char('r'), Command::Lights(LightCommand::StandardOn)),
            (KeyCode::Char('s'), Command::Lights(LightCommand::Standard)),
            (KeyCode::Char('w'), Command::Lights(LightCommand::White)),
            (KeyCode::Char('b'), Command::Lights(LightCommand::WindDown)),
            (KeyCode::Esc, Command::Lights(LightCommand::Toggle)),
            (KeyCode::Up, Command::Lights(LightCommand::Brighten)),
            (KeyCode::Down, Command::Lights(LightCommand::Dim)),
        ];
        for (code, expected) in cases {
            assert_eq!(Command::from_key(key(code)), Some(expected), "{code:?}");
        }
    }

    #[test]
    fn test_unbound() {
        for code in [
            KeyCode::Char('x'),
            KeyCode::Char('Q'),
            KeyCode::Left,
            KeyCode::Enter,
            KeyCode::F(1),
        ] {
            assert_eq!(Command::from_key(key(code)), None, "{code:?}");
        }
    }

    #[test]
    fn test_ctrl_c() {
        let ctrl = |c| KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL);
        assert_eq!(Command::from_key(ctrl('c')), Some(Command::Quit));
        // Modified keys don't trigger plain bindings
        assert_eq!(Command::from_key(ctrl('r')), None);
    }

    #[test]
    fn test_release_ignored() {
        let release = KeyEvent {
            code: KeyCode::Char('q'),
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Release,
            state: KeyEventState::NONE,
        };
        assert_eq!(Command::from_key(release), None);
    }
}
