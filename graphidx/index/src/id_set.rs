use graphidx_common::id::Id;
use hashbrown::HashSet;

/// A set of element ids that iterates in insertion order.
#[derive(Debug, Clone, Default)]
pub struct IdSet {
    ordered: Vec<Id>,
    members: HashSet<Id>,
}

impl IdSet {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `id`, returning `false` if it was already present.
    pub fn insert(&mut self, id: Id) -> bool {
        if self.members.insert(id.clone()) {
            self.ordered.push(id);
            true
        } else {
            false
        }
    }

    #[inline]
    pub fn contains(&self, id: &Id) -> bool {
        self.members.contains(id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Id> {
        self.ordered.iter()
    }

    /// Keeps only the ids also present in `other`, preserving the order of `self`.
    pub fn retain_all(&mut self, other: &IdSet) {
        self.ordered.retain(|id| other.contains(id));
        self.members.retain(|id| other.contains(id));
    }

    #[inline]
    pub fn into_vec(self) -> Vec<Id> {
        self.ordered
    }
}

impl PartialEq for IdSet {
    fn eq(&self, other: &Self) -> bool {
        self.ordered == other.ordered
    }
}

impl Eq for IdSet {}

impl Extend<Id> for IdSet {
    fn extend<I: IntoIterator<Item = Id>>(&mut self, iter: I) {
        for id in iter {
            self.insert(id);
        }
    }
}

impl FromIterator<Id> for IdSet {
    fn from_iter<I: IntoIterator<Item = Id>>(iter: I) -> Self {
        let mut set = IdSet::new();
        set.extend(iter);
        set
    }
}

impl IntoIterator for IdSet {
    type IntoIter = std::vec::IntoIter<Id>;
    type Item = Id;

    fn into_iter(self) -> Self::IntoIter {
        self.ordered.into_iter()
    }
}
