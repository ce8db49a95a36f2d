/// Something the viewer can be asked to do from the keyboard.
///
/// The desktop shell maps physical keys onto actions; the camera only ever
/// sees the resulting [`InputState`](crate::InputState).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Action {
    MoveForward,
    MoveBackward,
    MoveLeft,
    MoveRight,
    MoveUp,
    MoveDown,
    /// Held to move faster.
    Boost,
    Quit,
}

impl Action {
    /// Unit contribution to (right, up, forward) movement.
    pub fn axis(self) -> [f32; 3] {
        match self {
            Self::MoveForward => [0.0, 0.0, 1.0],
            Self::MoveBackward => [0.0, 0.0, -1.0],
            Self::MoveLeft => [-1.0, 0.0, 0.0],
            Self::MoveRight => [1.0, 0.0, 0.0],
            Self::MoveUp => [0.0, 1.0, 0.0],
            Self::MoveDown => [0.0, -1.0, 0.0],
            Self::Boost | Self::Quit => [0.0; 3],
        }
    }
}
