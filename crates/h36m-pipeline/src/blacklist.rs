use h36m_core::ViewKey;
use std::collections::BTreeSet;

/// Views whose source media is known to be unusable.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Blacklist {
    views: BTreeSet<ViewKey>,
}

impl Blacklist {
    pub fn empty() -> Self {
        Self::default()
    }

    /// The corpus' known-corrupt videos.
    pub fn known_corrupt() -> Self {
        let mut blacklist = Self::empty();
        blacklist.insert(ViewKey::new("S11", "2", "2", "54138969"));
        blacklist
    }

    /// Returns `true` if the view was not already listed.
    pub fn insert(&mut self, view: ViewKey) -> bool {
        self.views.insert(view)
    }

    /// Returns `true` if the view was listed.
    pub fn remove(&mut self, view: &ViewKey) -> bool {
        self.views.remove(view)
    }

    pub fn contains(&self, view: &ViewKey) -> bool {
        self.views.contains(view)
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ViewKey> {
        self.views.iter()
    }
}

impl Extend<ViewKey> for Blacklist {
    fn extend<I: IntoIterator<Item = ViewKey>>(&mut self, iter: I) {
        self.views.extend(iter);
    }
}

impl FromIterator<ViewKey> for Blacklist {
    fn from_iter<I: IntoIterator<Item = ViewKey>>(iter: I) -> Self {
        Self {
            views: iter.into_iter().collect(),
        }
    }
}
