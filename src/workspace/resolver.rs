//! Workspace selection precedence.

use crate::models::Workspace;

/// Candidate identifiers, highest priority first.
#[derive(Debug, Clone, Copy, Default)]
pub struct SelectionHints<'a> {
    /// A selection the user just made.
    pub explicit: Option<&'a str>,
    /// The identifier saved in durable storage (or the cookie on the server).
    pub persisted: Option<&'a str>,
    /// The workspace that was current in memory before this resolution.
    pub prior: Option<&'a str>,
}

impl<'a> SelectionHints<'a> {
    pub fn explicit(mut self, id: Option<&'a str>) -> Self {
        self.explicit = id;
        self
    }

    pub fn persisted(mut self, id: Option<&'a str>) -> Self {
        self.persisted = id;
        self
    }

    pub fn prior(mut self, id: Option<&'a str>) -> Self {
        self.prior = id;
        self
    }

    fn in_priority_order(&self) -> [Option<&'a str>; 3] {
        [self.explicit, self.persisted, self.prior]
    }
}

/// Pick the current workspace.
///
/// Each hint is tried in order and used only if it names a workspace in
/// `workspaces`; a stale or empty hint falls through to the next one. When no
/// hint matches, the first workspace in data-source order wins. An empty set
/// always resolves to `None`.
pub fn resolve_current<'w>(
    workspaces: &'w [Workspace],
    hints: SelectionHints<'_>,
) -> Option<&'w Workspace> {
    hints
        .in_priority_order()
        .into_iter()
        .flatten()
        .filter(|id| !id.is_empty())
        .find_map(|id| workspaces.iter().find(|w| w.id == id))
        .or_else(|| workspaces.first())
}
