use crate::entry::Entry;

/// Source of the historical log loaded once at startup.
///
/// Implementations return every stored message and call; ordering across the
/// two kinds is not required, the log store merges them.
pub trait HistorySource {
    type Error: std::error::Error + Send + Sync + 'static;

    fn load_history(&self) -> Result<Vec<Entry>, Self::Error>;
}

/// Fixed history, used when there is no database yet and in tests.
impl HistorySource for Vec<Entry> {
    type Error = std::convert::Infallible;

    fn load_history(&self) -> Result<Vec<Entry>, Self::Error> {
        Ok(self.clone())
    }
}

impl<T: HistorySource> HistorySource for Option<T> {
    type Error = T::Error;

    fn load_history(&self) -> Result<Vec<Entry>, Self::Error> {
        match self {
            Some(source) => source.load_history(),
            None => Ok(Vec::new()),
        }
    }
}
