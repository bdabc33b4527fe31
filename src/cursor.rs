use std::vec;

use serde::de::DeserializeOwned;

use crate::catalog::{CatalogClient, Page};
use crate::error::GrabError;

/// Lazy iterator over a cursor-paginated listing.
///
/// Yields items in server order, fetching the next page through the client
/// only when the buffered one is exhausted, so memory stays bounded by one
/// page. The sequence is finite and non-restartable: cursor URLs are
/// single-use, so iterating again requires a fresh cursor built from a fresh
/// root request.
///
/// A failed page fetch is yielded once as `Err` and the cursor ends; retry
/// policy belongs to the client, not here. Slot payloads are passed through
/// untouched — filtering is the consumer's decision.
pub struct PageCursor<'a, C, T> {
    client: &'a C,
    items: vec::IntoIter<T>,
    next: Option<String>,
}

impl<'a, C, T> PageCursor<'a, C, T>
where
    C: CatalogClient,
    T: DeserializeOwned,
{
    pub fn new(client: &'a C, first: Page<T>) -> Self {
        Self {
            client,
            items: first.items.into_iter(),
            next: first.next,
        }
    }
}

impl<C, T> Iterator for PageCursor<'_, C, T>
where
    C: CatalogClient,
    T: DeserializeOwned,
{
    type Item = Result<T, GrabError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(item) = self.items.next() {
                return Some(Ok(item));
            }
            let url = self.next.take()?;
            match self.client.next_page::<T>(&url) {
                Ok(page) => {
                    self.items = page.items.into_iter();
                    self.next = page.next;
                }
                Err(err) => return Some(Err(err)),
            }
        }
    }
}
