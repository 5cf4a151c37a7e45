//! Next-page-following driver shared by every listing.
//!
//! Each page is one [`CredentialPool::request`], so rotation and exhaustion
//! sleeps happen per page. The driver stops when the response has no
//! `rel="next"` link, and never goes backwards.

use std::future::Future;

use crate::shutdown::Cancelled;

use super::pool::{CredentialPool, RateLimitAware};
use super::types::Page;

/// Walks a listing one page at a time.
///
/// ```ignore
/// let mut pages = Paginator::new(&pool, |client, page| async move {
///     client.list_org_repos(org, page).await
/// });
/// while let Some((page, repos)) = pages.next_page().await? {
///     // ...
/// }
/// ```
pub struct Paginator<'a, C, F> {
    pool: &'a CredentialPool<C>,
    fetch: F,
    next: Option<u32>,
    fetched: u32,
}

impl<'a, C: Clone, F> Paginator<'a, C, F> {
    pub fn new(pool: &'a CredentialPool<C>, fetch: F) -> Self {
        Self {
            pool,
            fetch,
            next: Some(1),
            fetched: 0,
        }
    }

    /// Number of pages fetched so far.
    pub fn pages_fetched(&self) -> u32 {
        self.fetched
    }

    /// Fetch the next page. Returns `Ok(None)` once the listing is done.
    ///
    /// Checks the pool's shutdown signal before each fetch.
    pub async fn next_page<T, E, Fut>(&mut self) -> Result<Option<(u32, Vec<T>)>, E>
    where
        F: FnMut(C, u32) -> Fut,
        Fut: Future<Output = Result<Page<T>, E>>,
        E: RateLimitAware + From<Cancelled>,
    {
        let Some(page) = self.next else {
            return Ok(None);
        };
        self.pool.shutdown().check().map_err(E::from)?;

        let fetch = &mut self.fetch;
        let result = self.pool.request(|client| fetch(client, page)).await?;

        self.fetched += 1;
        self.next = result.next_page.filter(|next| *next > page);
        Ok(Some((page, result.items)))
    }
}
