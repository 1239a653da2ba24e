//! Key names to high-level actions.

/// One grid step. `x` is the row axis, so up and down change `x`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Up,
    Right,
    Down,
}

impl Direction {
    /// Offset `(dx, dy)` applied to a Relative position.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Left => (0, -1),
            Self::Up => (-1, 0),
            Self::Right => (0, 1),
            Self::Down => (1, 0),
        }
    }

    /// Compass name of the chunk edge this direction runs into.
    pub fn edge(self) -> &'static str {
        match self {
            Self::Left => "western",
            Self::Up => "northern",
            Self::Right => "eastern",
            Self::Down => "southern",
        }
    }
}

/// A high-level action produced from one key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Step the selected entity.
    Move(Direction),
    /// Select the n-th entity (1-based, `1..=9`).
    Select(usize),
    Quit,
    /// Key with no binding.
    Unknown(String),
}

impl Action {
    /// Map a key name to an action.
    ///
    /// Accepts arrow names (`left`, `KEY_LEFT`), vi keys (`h`, `j`, `k`,
    /// `l`), digits `1`-`9` and `e`/`q`. Case and surrounding whitespace
    /// are ignored.
    pub fn from_key(key: &str) -> Self {
        let normalized = key.trim().to_ascii_lowercase();
        let name = normalized.strip_prefix("key_").unwrap_or(&normalized);
        let action = match name {
            "left" | "h" => Self::Move(Direction::Left),
            "up" | "k" => Self::Move(Direction::Up),
            "right" | "l" => Self::Move(Direction::Right),
            "down" | "j" => Self::Move(Direction::Down),
            "e" | "q" => Self::Quit,
            _ => match name.parse::<usize>() {
                Ok(n @ 1..=9) if name.len() == 1 => Self::Select(n),
                _ => Self::Unknown(key.trim().to_string()),
            },
        };
        if let Self::Unknown(raw) = &action {
            tracing::trace!(key = %raw, "unbound key");
        }
        action
    }
}
