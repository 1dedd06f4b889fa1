use crossterm::style::Color;

#[derive(Clone, Debug)]
pub struct Theme {
    pub name: &'static str,
    /// When false every render helper emits plain text.
    pub styled: bool,
    pub accent: Color,
    pub muted: Color,
    pub error: Color,
    pub warning: Color,
    pub user_color: Color,
    pub bot_color: Color,
    pub link_color: Color,
}

impl Theme {
    pub fn dark() -> Self {
        Self {
            name: "dark",
            styled: true,
            accent: Color::Rgb { r: 125, g: 211, b: 252 },
            muted: Color::Rgb { r: 100, g: 116, b: 139 },
            error: Color::Rgb { r: 248, g: 113, b: 113 },
            warning: Color::Rgb { r: 251, g: 191, b: 36 },
            user_color: Color::Cyan,
            bot_color: Color::Green,
            link_color: Color::Rgb { r: 56, g: 189, b: 248 },
        }
    }

    pub fn light() -> Self {
        Self {
            name: "light",
            styled: true,
            accent: Color::Rgb { r: 7, g: 89, b: 133 },
            muted: Color::Rgb { r: 71, g: 85, b: 105 },
            error: Color::Rgb { r: 185, g: 28, b: 28 },
            warning: Color::Rgb { r: 180, g: 83, b: 9 },
            user_color: Color::Rgb { r: 2, g: 132, b: 199 },
            bot_color: Color::Rgb { r: 30, g: 41, b: 59 },
            link_color: Color::Rgb { r: 2, g: 132, b: 199 },
        }
    }

    /// No colors or attributes; used for pipes and tests.
    pub fn plain() -> Self {
        Self {
            name: "plain",
            styled: false,
            ..Self::dark()
        }
    }

    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "dark" => Some(Self::dark()),
            "light" => Some(Self::light()),
            "plain" => Some(Self::plain()),
            _ => None,
        }
    }

    pub fn all_names() -> &'static [&'static str] {
        &["dark", "light", "plain"]
    }
}
