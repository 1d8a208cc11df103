/// Lifecycle capability for components started once by the hosting runtime.
///
/// `start` is called after construction and before the component receives
/// live traffic. It may block for a long time (e.g. while replaying a
/// journal) and must not be called concurrently.
pub trait Startable {
    type Error;

    fn start(&self) -> Result<(), Self::Error>;
}

/// Observable lifecycle state of a startable component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Built and configured; `start` has not completed successfully.
    Constructed,
    /// `start` has completed successfully at least once.
    Started,
}

impl std::fmt::Display for Lifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Constructed => write!(f, "constructed"),
            Self::Started => write!(f, "started"),
        }
    }
}
