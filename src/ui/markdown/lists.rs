#[derive(Clone, Debug)]
pub(super) enum ListKind {
    Unordered,
    Ordered(u64),
}

impl ListKind {
    /// Marker for the next item. Ordered lists count up as items are emitted.
    pub(super) fn next_marker(&mut self) -> String {
        match self {
            ListKind::Unordered => "- ".to_string(),
            ListKind::Ordered(next) => {
                let current = *next;
                *next += 1;
                format!("{current}. ")
            }
        }
    }
}
