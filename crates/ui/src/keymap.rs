//! Keyboard layouts: physical key → typed text.
//!
//! The keyboard always reports US-position key codes; a layout decides what
//! each position types, unshifted and shifted. Most layouts are a handful
//! of overrides on top of US QWERTY; Dvorak and AZERTY are complete tables.

use platform::KeyCode;

/// `(key, normal, shifted)`
type Entry = (KeyCode, &'static str, &'static str);

/// Supported keyboard layouts, in picker order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LayoutId {
    /// US QWERTY
    #[default]
    UsQwerty,
    /// UK QWERTY
    UkQwerty,
    /// German QWERTZ
    DeQwertz,
    /// US Dvorak
    UsDvorak,
    /// French AZERTY
    FrAzerty,
    /// Spanish QWERTY
    EsQwerty,
    /// Swedish/Finnish QWERTY
    SeQwerty,
    /// Norwegian/Danish QWERTY
    NoDkQwerty,
    /// Italian QWERTY
    ItQwerty,
    /// Colemak
    Colemak,
}

impl LayoutId {
    /// Every layout, in picker order.
    pub const ALL: [Self; 10] = [
        Self::UsQwerty,
        Self::UkQwerty,
        Self::DeQwertz,
        Self::UsDvorak,
        Self::FrAzerty,
        Self::EsQwerty,
        Self::SeQwerty,
        Self::NoDkQwerty,
        Self::ItQwerty,
        Self::Colemak,
    ];

    /// Display name, also the persisted preference value.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UsQwerty => "US QWERTY",
            Self::UkQwerty => "UK QWERTY",
            Self::DeQwertz => "DE QWERTZ",
            Self::UsDvorak => "US DVORAK",
            Self::FrAzerty => "FR AZERTY",
            Self::EsQwerty => "ES QWERTY",
            Self::SeQwerty => "SE QWERTY",
            Self::NoDkQwerty => "NO/DK QWERTY",
            Self::ItQwerty => "IT QWERTY",
            Self::Colemak => "Colemak",
        }
    }

    /// Parse a persisted name (surrounding whitespace ignored).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|l| l.name() == name)
    }

    /// Position in [`LayoutId::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|&l| l == self).unwrap_or(0)
    }

    /// Text typed by `key`, or `None` if the key types nothing.
    #[must_use]
    pub fn lookup(self, key: KeyCode, shift: bool) -> Option<&'static str> {
        let (own, inherits_us): (&[Entry], bool) = match self {
            Self::UsQwerty => (&[], true),
            Self::UkQwerty => (UK, true),
            Self::DeQwertz => (DE, true),
            Self::UsDvorak => (DVORAK, false),
            Self::FrAzerty => (AZERTY, false),
            Self::EsQwerty => (ES, true),
            Self::SeQwerty => (SE, true),
            Self::NoDkQwerty => (NO_DK, true),
            Self::ItQwerty => (IT, true),
            Self::Colemak => (COLEMAK, true),
        };
        let entry = own
            .iter()
            .find(|(k, _, _)| *k == key)
            .or_else(|| {
                if inherits_us {
                    US.iter().find(|(k, _, _)| *k == key)
                } else {
                    None
                }
            })?;
        let text = if shift { entry.2 } else { entry.1 };
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

const US: &[Entry] = &[
    (KeyCode::A, "a", "A"),
    (KeyCode::B, "b", "B"),
    (KeyCode::C, "c", "C"),
    (KeyCode::D, "d", "D"),
    (KeyCode::E, "e", "E"),
    (KeyCode::F, "f", "F"),
    (KeyCode::G, "g", "G"),
    (KeyCode::H, "h", "H"),
    (KeyCode::I, "i", "I"),
    (KeyCode::J, "j", "J"),
    (KeyCode::K, "k", "K"),
    (KeyCode::L, "l", "L"),
    (KeyCode::M, "m", "M"),
    (KeyCode::N, "n", "N"),
    (KeyCode::O, "o", "O"),
    (KeyCode::P, "p", "P"),
    (KeyCode::Q, "q", "Q"),
    (KeyCode::R, "r", "R"),
    (KeyCode::S, "s", "S"),
    (KeyCode::T, "t", "T"),
    (KeyCode::U, "u", "U"),
    (KeyCode::V, "v", "V"),
    (KeyCode::W, "w", "W"),
    (KeyCode::X, "x", "X"),
    (KeyCode::Y, "y", "Y"),
    (KeyCode::Z, "z", "Z"),
    (KeyCode::NUM_1, "1", "!"),
    (KeyCode::NUM_2, "2", "@"),
    (KeyCode::NUM_3, "3", "#"),
    (KeyCode::NUM_4, "4", "$"),
    (KeyCode::NUM_5, "5", "%"),
    (KeyCode::NUM_6, "6", "^"),
    (KeyCode::NUM_7, "7", "&"),
    (KeyCode::NUM_8, "8", "*"),
    (KeyCode::NUM_9, "9", "("),
    (KeyCode::NUM_0, "0", ")"),
    (KeyCode::MINUS, "-", "_"),
    (KeyCode::EQUAL, "=", "+"),
    (KeyCode::LEFTBRACE, "[", "{"),
    (KeyCode::RIGHTBRACE, "]", "}"),
    (KeyCode::SEMICOLON, ";", ":"),
    (KeyCode::APOSTROPHE, "'", "\""),
    (KeyCode::GRAVE, "`", "~"),
    (KeyCode::BACKSLASH, "\\", "|"),
    (KeyCode::COMMA, ",", "<"),
    (KeyCode::DOT, ".", ">"),
    (KeyCode::SLASH, "/", "?"),
    (KeyCode::SPACE, " ", " "),
    (KeyCode::TAB, "    ", "    "),
];

const UK: &[Entry] = &[
    (KeyCode::NUM_2, "2", "\""),
    (KeyCode::NUM_3, "3", "£"),
    (KeyCode::APOSTROPHE, "'", "@"),
    (KeyCode::BACKSLASH, "#", "~"),
    (KeyCode::GRAVE, "`", "¬"),
];

const DE: &[Entry] = &[
    (KeyCode::Y, "z", "Z"),
    (KeyCode::Z, "y", "Y"),
    (KeyCode::SEMICOLON, "ö", "Ö"),
    (KeyCode::APOSTROPHE, "ä", "Ä"),
    (KeyCode::LEFTBRACE, "ü", "Ü"),
    (KeyCode::MINUS, "ß", "?"),
    (KeyCode::EQUAL, "´", "`"),
    (KeyCode::RIGHTBRACE, "+", "*"),
    (KeyCode::BACKSLASH, "#", "'"),
    (KeyCode::GRAVE, "^", "°"),
    (KeyCode::COMMA, ",", ";"),
    (KeyCode::DOT, ".", ":"),
    (KeyCode::SLASH, "-", "_"),
];

const DVORAK: &[Entry] = &[
    (KeyCode::Q, "'", "\""),
    (KeyCode::W, ",", "<"),
    (KeyCode::E, ".", ">"),
    (KeyCode::R, "p", "P"),
    (KeyCode::T, "y", "Y"),
    (KeyCode::Y, "f", "F"),
    (KeyCode::U, "g", "G"),
    (KeyCode::I, "c", "C"),
    (KeyCode::O, "r", "R"),
    (KeyCode::P, "l", "L"),
    (KeyCode::A, "a", "A"),
    (KeyCode::S, "o", "O"),
    (KeyCode::D, "e", "E"),
    (KeyCode::F, "u", "U"),
    (KeyCode::G, "i", "I"),
    (KeyCode::H, "d", "D"),
    (KeyCode::J, "h", "H"),
    (KeyCode::K, "t", "T"),
    (KeyCode::L, "n", "N"),
    (KeyCode::SEMICOLON, "s", "S"),
    (KeyCode::APOSTROPHE, "-", "_"),
    (KeyCode::Z, ";", ":"),
    (KeyCode::X, "q", "Q"),
    (KeyCode::C, "j", "J"),
    (KeyCode::V, "k", "K"),
    (KeyCode::B, "x", "X"),
    (KeyCode::N, "b", "B"),
    (KeyCode::M, "m", "M"),
    (KeyCode::COMMA, "w", "W"),
    (KeyCode::DOT, "v", "V"),
    (KeyCode::SLASH, "z", "Z"),
    (KeyCode::LEFTBRACE, "/", "?"),
    (KeyCode::RIGHTBRACE, "=", "+"),
    (KeyCode::MINUS, "[", "{"),
    (KeyCode::EQUAL, "]", "}"),
    (KeyCode::GRAVE, "`", "~"),
    (KeyCode::BACKSLASH, "\\", "|"),
    (KeyCode::NUM_1, "1", "!"),
    (KeyCode::NUM_2, "2", "@"),
    (KeyCode::NUM_3, "3", "#"),
    (KeyCode::NUM_4, "4", "$"),
    (KeyCode::NUM_5, "5", "%"),
    (KeyCode::NUM_6, "6", "^"),
    (KeyCode::NUM_7, "7", "&"),
    (KeyCode::NUM_8, "8", "*"),
    (KeyCode::NUM_9, "9", "("),
    (KeyCode::NUM_0, "0", ")"),
    (KeyCode::SPACE, " ", " "),
    (KeyCode::TAB, "    ", "    "),
];

const AZERTY: &[Entry] = &[
    (KeyCode::NUM_1, "&", "1"),
    (KeyCode::NUM_2, "é", "2"),
    (KeyCode::NUM_3, "\"", "3"),
    (KeyCode::NUM_4, "'", "4"),
    (KeyCode::NUM_5, "(", "5"),
    (KeyCode::NUM_6, "-", "6"),
    (KeyCode::NUM_7, "è", "7"),
    (KeyCode::NUM_8, "_", "8"),
    (KeyCode::NUM_9, "ç", "9"),
    (KeyCode::NUM_0, "à", "0"),
    (KeyCode::MINUS, ")", "°"),
    (KeyCode::EQUAL, "=", "+"),
    (KeyCode::Q, "a", "A"),
    (KeyCode::W, "z", "Z"),
    (KeyCode::E, "e", "E"),
    (KeyCode::R, "r", "R"),
    (KeyCode::T, "t", "T"),
    (KeyCode::Y, "y", "Y"),
    (KeyCode::U, "u", "U"),
    (KeyCode::I, "i", "I"),
    (KeyCode::O, "o", "O"),
    (KeyCode::P, "p", "P"),
    (KeyCode::LEFTBRACE, "^", "¨"),
    (KeyCode::RIGHTBRACE, "$", "£"),
    (KeyCode::A, "q", "Q"),
    (KeyCode::S, "s", "S"),
    (KeyCode::D, "d", "D"),
    (KeyCode::F, "f", "F"),
    (KeyCode::G, "g", "G"),
    (KeyCode::H, "h", "H"),
    (KeyCode::J, "j", "J"),
    (KeyCode::K, "k", "K"),
    (KeyCode::L, "l", "L"),
    (KeyCode::SEMICOLON, "m", "M"),
    (KeyCode::APOSTROPHE, "ù", "%"),
    (KeyCode::BACKSLASH, "*", "µ"),
    (KeyCode::GRAVE, "²", ""),
    (KeyCode::Z, "w", "W"),
    (KeyCode::X, "x", "X"),
    (KeyCode::C, "c", "C"),
    (KeyCode::V, "v", "V"),
    (KeyCode::B, "b", "B"),
    (KeyCode::N, "n", "N"),
    (KeyCode::M, ",", "?"),
    (KeyCode::COMMA, ";", "."),
    (KeyCode::DOT, ":", "/"),
    (KeyCode::SLASH, "!", "§"),
    (KeyCode::SPACE, " ", " "),
    (KeyCode::TAB, "    ", "    "),
];

const ES: &[Entry] = &[
    (KeyCode::NUM_2, "2", "\""),
    (KeyCode::NUM_3, "3", "·"),
    (KeyCode::NUM_6, "6", "&"),
    (KeyCode::NUM_7, "7", "/"),
    (KeyCode::NUM_8, "8", "("),
    (KeyCode::NUM_9, "9", ")"),
    (KeyCode::NUM_0, "0", "="),
    (KeyCode::MINUS, "'", "?"),
    (KeyCode::EQUAL, "¡", "¿"),
    (KeyCode::LEFTBRACE, "`", "^"),
    (KeyCode::RIGHTBRACE, "+", "*"),
    (KeyCode::SEMICOLON, "ñ", "Ñ"),
    (KeyCode::APOSTROPHE, "`", "^"),
    (KeyCode::GRAVE, "º", "ª"),
    (KeyCode::BACKSLASH, "ç", "Ç"),
    (KeyCode::COMMA, ",", ";"),
    (KeyCode::DOT, ".", ":"),
    (KeyCode::SLASH, "-", "_"),
];

const SE: &[Entry] = &[
    (KeyCode::LEFTBRACE, "å", "Å"),
    (KeyCode::SEMICOLON, "ö", "Ö"),
    (KeyCode::APOSTROPHE, "ä", "Ä"),
    (KeyCode::RIGHTBRACE, "~", "^"),
    (KeyCode::MINUS, "+", "?"),
    (KeyCode::EQUAL, "`", "`"),
    (KeyCode::GRAVE, "§", "½"),
    (KeyCode::BACKSLASH, "'", "*"),
    (KeyCode::COMMA, ",", ";"),
    (KeyCode::DOT, ".", ":"),
    (KeyCode::SLASH, "-", "_"),
];

const NO_DK: &[Entry] = &[
    (KeyCode::LEFTBRACE, "å", "Å"),
    (KeyCode::SEMICOLON, "ø", "Ø"),
    (KeyCode::APOSTROPHE, "æ", "Æ"),
    (KeyCode::RIGHTBRACE, "~", "^"),
    (KeyCode::MINUS, "+", "?"),
    (KeyCode::EQUAL, "`", "`"),
    (KeyCode::GRAVE, "|", "§"),
    (KeyCode::BACKSLASH, "'", "*"),
    (KeyCode::COMMA, ",", ";"),
    (KeyCode::DOT, ".", ":"),
    (KeyCode::SLASH, "-", "_"),
];

const IT: &[Entry] = &[
    (KeyCode::NUM_2, "2", "\""),
    (KeyCode::NUM_3, "3", "£"),
    (KeyCode::NUM_6, "6", "&"),
    (KeyCode::NUM_7, "7", "/"),
    (KeyCode::NUM_8, "8", "("),
    (KeyCode::NUM_9, "9", ")"),
    (KeyCode::NUM_0, "0", "="),
    (KeyCode::MINUS, "'", "?"),
    (KeyCode::EQUAL, "ì", "^"),
    (KeyCode::LEFTBRACE, "è", "é"),
    (KeyCode::RIGHTBRACE, "+", "*"),
    (KeyCode::SEMICOLON, "ò", "ç"),
    (KeyCode::APOSTROPHE, "à", "°"),
    (KeyCode::GRAVE, "\\", "|"),
    (KeyCode::BACKSLASH, "ù", "§"),
    (KeyCode::COMMA, ",", ";"),
    (KeyCode::DOT, ".", ":"),
    (KeyCode::SLASH, "-", "_"),
];

const COLEMAK: &[Entry] = &[
    (KeyCode::E, "f", "F"),
    (KeyCode::R, "p", "P"),
    (KeyCode::T, "g", "G"),
    (KeyCode::Y, "j", "J"),
    (KeyCode::U, "l", "L"),
    (KeyCode::I, "u", "U"),
    (KeyCode::O, "y", "Y"),
    (KeyCode::P, ";", ":"),
    (KeyCode::S, "r", "R"),
    (KeyCode::D, "s", "S"),
    (KeyCode::F, "t", "T"),
    (KeyCode::G, "d", "D"),
    (KeyCode::J, "n", "N"),
    (KeyCode::K, "e", "E"),
    (KeyCode::L, "i", "I"),
    (KeyCode::SEMICOLON, "o", "O"),
    (KeyCode::N, "k", "K"),
];
