use std::fmt;

use graphidx_storage::model::element::Element;
use graphidx_storage::query::{ConditionQuery, ResultsFilter};

use crate::error::{IndexError, IndexResult};
use crate::id_set::IdSet;

/// A page of element ids and the token of the page following it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageIds {
    ids: IdSet,
    page: Option<String>,
}

impl PageIds {
    #[inline]
    pub fn new(ids: IdSet, page: Option<String>) -> Self {
        Self { ids, page }
    }

    #[inline]
    pub fn empty() -> Self {
        Self::default()
    }

    #[inline]
    pub fn ids(&self) -> &IdSet {
        &self.ids
    }

    /// Token of the next page, `None` if this is the last page.
    #[inline]
    pub fn page(&self) -> Option<&str> {
        self.page.as_deref()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    #[inline]
    pub fn into_parts(self) -> (IdSet, Option<String>) {
        (self.ids, self.page)
    }
}

pub type PageFetcher = Box<dyn FnMut(&ConditionQuery) -> IndexResult<PageIds> + Send>;

/// Element ids of one index query, fetched page by page.
pub struct PagedIdHolder {
    query: ConditionQuery,
    fetcher: PageFetcher,
    exhausted: bool,
}

impl PagedIdHolder {
    pub fn new(query: ConditionQuery, fetcher: PageFetcher) -> Self {
        Self {
            query,
            fetcher,
            exhausted: false,
        }
    }

    /// The query of the next page.
    #[inline]
    pub fn query(&self) -> &ConditionQuery {
        &self.query
    }

    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// Fetches at most `batch` ids starting at the current page and moves to the next page.
    pub fn fetch_next(&mut self, batch: u64) -> IndexResult<PageIds> {
        if self.exhausted {
            return Ok(PageIds::empty());
        }
        let query = self.query.clone().with_limit(batch);
        let page_ids = (self.fetcher)(&query)?;
        match page_ids.page() {
            Some(page) => {
                self.query = self.query.clone().with_page(Some(page.to_string()));
            }
            None => self.exhausted = true,
        }
        Ok(page_ids)
    }
}

impl fmt::Debug for PagedIdHolder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PagedIdHolder")
            .field("query", &self.query)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

/// Element ids answering one index query.
#[derive(Debug)]
pub enum IdHolder {
    /// All ids, fetched eagerly.
    Batch(IdSet),
    /// Ids fetched lazily, one page at a time.
    Paged(PagedIdHolder),
}

impl IdHolder {
    #[inline]
    pub fn paging(&self) -> bool {
        matches!(self, IdHolder::Paged(_))
    }

    /// The ids of a batch holder.
    #[inline]
    pub fn ids(&self) -> Option<&IdSet> {
        match self {
            IdHolder::Batch(ids) => Some(ids),
            IdHolder::Paged(_) => None,
        }
    }

    /// Fetches the next ids. A batch holder hands out all its ids at once.
    pub fn fetch_next(&mut self, batch: u64) -> IndexResult<PageIds> {
        match self {
            IdHolder::Batch(ids) => Ok(PageIds::new(std::mem::take(ids), None)),
            IdHolder::Paged(holder) => holder.fetch_next(batch),
        }
    }

    /// Drains the holder, `batch` ids per page.
    pub fn fetch_all(&mut self, batch: u64) -> IndexResult<IdSet> {
        let mut all = IdSet::new();
        loop {
            let (ids, page) = self.fetch_next(batch)?.into_parts();
            let done = ids.is_empty() || page.is_none();
            all.extend(ids);
            if done {
                return Ok(all);
            }
        }
    }
}

/// The holders answering a query, either all paged or all batched.
///
/// Holders of search queries match more elements than asked for; the results filter tells
/// the caller which loaded elements to keep.
pub struct IdHolderList {
    paging: bool,
    holders: Vec<IdHolder>,
    results_filter: Option<ResultsFilter>,
}

impl IdHolderList {
    #[inline]
    pub fn new(paging: bool) -> Self {
        Self {
            paging,
            holders: Vec::new(),
            results_filter: None,
        }
    }

    #[inline]
    pub fn results_filter(&self) -> Option<&ResultsFilter> {
        self.results_filter.as_ref()
    }

    pub fn set_results_filter(&mut self, filter: Option<ResultsFilter>) {
        if self.results_filter.is_none() {
            self.results_filter = filter;
        }
    }

    /// Whether a loaded element passes the results filter, if any.
    pub fn filter_result(&self, element: &Element) -> bool {
        self.results_filter.as_ref().is_none_or(|filter| filter(element))
    }

    #[inline]
    pub fn paging(&self) -> bool {
        self.paging
    }

    /// Adds a holder. Without paging the ids of batch holders are merged into one holder.
    pub fn add(&mut self, holder: IdHolder) -> IndexResult<()> {
        if holder.paging() != self.paging {
            return Err(IndexError::InvariantViolation(format!(
                "can't add {} id holder to {} id holder list",
                if holder.paging() { "paged" } else { "batch" },
                if self.paging { "paged" } else { "batch" },
            )));
        }
        let merge = matches!(self.holders.last(), Some(IdHolder::Batch(_)));
        match holder {
            IdHolder::Batch(ids) if merge => {
                if let Some(IdHolder::Batch(merged)) = self.holders.last_mut() {
                    merged.extend(ids);
                }
            }
            holder => self.holders.push(holder),
        }
        Ok(())
    }

    pub fn append(&mut self, other: IdHolderList) -> IndexResult<()> {
        self.set_results_filter(other.results_filter);
        for holder in other.holders {
            self.add(holder)?;
        }
        Ok(())
    }

    /// Number of ids held by batch holders.
    pub fn ids_size(&self) -> u64 {
        self.holders
            .iter()
            .filter_map(IdHolder::ids)
            .map(|ids| ids.len() as u64)
            .sum()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.holders.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    #[inline]
    pub fn holders(&self) -> &[IdHolder] {
        &self.holders
    }

    #[inline]
    pub fn holders_mut(&mut self) -> &mut [IdHolder] {
        &mut self.holders
    }

    /// All ids of the batch holders, in order.
    pub fn batch_ids(&self) -> IdSet {
        self.holders
            .iter()
            .filter_map(IdHolder::ids)
            .flat_map(|ids| ids.iter().cloned())
            .collect()
    }
}

impl fmt::Debug for IdHolderList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdHolderList")
            .field("paging", &self.paging)
            .field("holders", &self.holders)
            .field("results_filter", &self.results_filter.is_some())
            .finish()
    }
}

impl IntoIterator for IdHolderList {
    type IntoIter = std::vec::IntoIter<IdHolder>;
    type Item = IdHolder;

    fn into_iter(self) -> Self::IntoIter {
        self.holders.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use graphidx_common::id::Id;

    use super::*;

    fn batch(values: &[i64]) -> IdHolder {
        IdHolder::Batch(values.iter().copied().map(Id::from).collect())
    }

    #[test]
    fn test_batch_holders_are_merged() {
        let mut list = IdHolderList::new(false);
        list.add(batch(&[1, 2])).unwrap();
        list.add(batch(&[2, 3])).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list.ids_size(), 3);

        let mut other = IdHolderList::new(false);
        other.add(batch(&[4])).unwrap();
        list.append(other).unwrap();
        assert_eq!(list.ids_size(), 4);
        assert_eq!(list.batch_ids().len(), 4);
    }

    #[test]
    fn test_paged_holder() {
        let pages = vec![
            PageIds::new([Id::from(1), Id::from(2)].into_iter().collect(), Some("p2".into())),
            PageIds::new([Id::from(3)].into_iter().collect(), None),
        ];
        let mut pages = pages.into_iter();
        let mut seen_pages = Vec::new();
        let query = ConditionQuery::vertices().with_page(Some(String::new()));
        let fetcher: PageFetcher = Box::new(move |q| {
            assert_eq!(q.limit(), 2);
            Ok(pages.next().unwrap_or_default())
        });
        let mut holder = IdHolder::Paged(PagedIdHolder::new(query, fetcher));
        assert!(holder.paging());

        let first = holder.fetch_next(2).unwrap();
        seen_pages.push(first.page().map(str::to_string));
        assert_eq!(first.ids().len(), 2);
        let second = holder.fetch_next(2).unwrap();
        seen_pages.push(second.page().map(str::to_string));
        assert_eq!(second.ids().len(), 1);
        assert!(holder.fetch_next(2).unwrap().is_empty());
        assert_eq!(seen_pages, vec![Some("p2".to_string()), None]);

        let mut list = IdHolderList::new(false);
        assert!(matches!(
            list.add(holder),
            Err(IndexError::InvariantViolation(_))
        ));
    }
}
