/// Kind of a token or of a composite node.
///
/// Kinds are plain numbers handed out by a [`Language`](crate::Language); the builder only
/// reserves [`SyntaxKind::ERROR`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SyntaxKind(u16);

impl SyntaxKind {
    /// Kind of error elements: point errors and markers finished with an error message.
    pub const ERROR: Self = Self(0);

    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn into_raw(self) -> u16 {
        self.0
    }
}
