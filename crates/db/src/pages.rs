//! Page workflows: load, authorize, mutate the aggregate, persist.
//!
//! Every write loads the page, applies the change in memory, and saves with
//! the revision count it loaded. If the stored count moved in between the
//! write fails with [`CoreError::Conflict`] and nothing is overwritten.

use folio_core::config::WikiConfig;
use folio_core::diff::RevisionDiff;
use folio_core::error::CoreError;
use folio_core::page::{Effect, Page};
use folio_core::pagination::{Link, Paginator, Window};
use folio_core::permission::{PermissionPolicy, User};
use folio_core::query::{compile, SearchCriteria, SearchParams};
use folio_core::revision::{RevisionDraft, RevisionNumber};
use folio_core::types::PageId;
use serde::Serialize;
use url::Url;

use crate::error::StoreResult;
use crate::repositories::PageRepo;
use crate::DbPool;

/// One window of search results plus navigation.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub pages: Vec<Page>,
    pub window: Window,
    pub links: Vec<Link>,
}

/// Store-backed page operations for one deployment.
#[derive(Debug, Clone)]
pub struct PageService {
    pool: DbPool,
    policy: PermissionPolicy,
    paginator: Paginator,
}

impl PageService {
    pub fn new(pool: DbPool, config: &WikiConfig) -> Self {
        Self {
            pool,
            policy: PermissionPolicy::new(config),
            paginator: Paginator::new(config),
        }
    }

    pub fn policy(&self) -> &PermissionPolicy {
        &self.policy
    }

    // ── Reads ────────────────────────────────────────────────────────

    /// Load a page regardless of permissions or tombstone.
    pub async fn load(&self, id: PageId) -> StoreResult<Page> {
        let row = PageRepo::find_by_id(&self.pool, id)
            .await?
            .ok_or_else(|| not_found(id))?;
        Ok(Page::try_from(row)?)
    }

    /// Load a page `user` may read. Trashed pages are only visible to
    /// admins; to everyone else they do not exist.
    pub async fn load_readable(&self, id: PageId, user: Option<&User>) -> StoreResult<Page> {
        let page = self.load(id).await?;
        if page.is_trashed() && !is_admin(user) {
            return Err(not_found(id).into());
        }
        self.policy
            .authorize_read(user, page.revisions().as_slice())?;
        Ok(page)
    }

    /// Load a live page `user` may edit.
    async fn load_writable(&self, id: PageId, user: Option<&User>) -> StoreResult<Page> {
        let page = self.load(id).await?;
        if page.is_trashed() {
            return Err(not_found(id).into());
        }
        self.policy
            .authorize_write(user, page.revisions().as_slice())?;
        Ok(page)
    }

    /// Run a search and fetch the requested window.
    pub async fn search_pages(
        &self,
        user: Option<&User>,
        params: &SearchParams,
        request: &Url,
    ) -> StoreResult<SearchResults> {
        let criteria = SearchCriteria::from_params(params)?;
        let predicate = compile(user, &criteria);
        tracing::debug!(?predicate, "Compiled page search");

        let total = PageRepo::count(&self.pool, &predicate).await?;
        let window = self.paginator.paginate(total, params.offset, params.limit);
        let rows = PageRepo::search(&self.pool, &predicate, &window).await?;
        let pages = rows
            .into_iter()
            .map(Page::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(SearchResults {
            links: window.links(request),
            pages,
            window,
        })
    }

    /// Diff two revisions of a readable page. `None` when either number is
    /// not an integer.
    pub async fn diff_page(
        &self,
        id: PageId,
        user: Option<&User>,
        a: &str,
        b: &str,
    ) -> StoreResult<Option<RevisionDiff>> {
        let page = self.load_readable(id, user).await?;
        Ok(page.diff_revisions(a, b))
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Create a page from its seed revision. Requires an identity; the
    /// path must not be taken by another live page.
    pub async fn create_page(
        &self,
        user: Option<&User>,
        draft: RevisionDraft,
    ) -> StoreResult<Page> {
        let user =
            user.ok_or_else(|| CoreError::Unauthorized("Sign in to create pages".into()))?;
        self.ensure_path_free(draft.content.path(), None).await?;

        let page = Page::create(draft.with_editor(Some(user.id)), &self.policy);
        let row = PageRepo::create(&self.pool, &page).await?;
        let page = Page::try_from(row)?;

        tracing::info!(
            page_id = %page.id(),
            user_id = user.id,
            path = page.current().content().path(),
            "Page created"
        );
        Ok(page)
    }

    /// Commit a new revision.
    ///
    /// `expected_revisions` is the count the caller last saw; when omitted
    /// the count loaded here is used, which still guards the save itself.
    pub async fn edit_page(
        &self,
        id: PageId,
        user: Option<&User>,
        draft: RevisionDraft,
        expected_revisions: Option<usize>,
    ) -> StoreResult<Page> {
        let mut page = self.load_writable(id, user).await?;
        let loaded = page.revision_count();
        self.ensure_path_free(draft.content.path(), Some(id)).await?;

        let draft = draft.with_editor(user.map(|u| u.id));
        page.commit_expecting(draft, expected_revisions.unwrap_or(loaded))?;
        self.save(&page, loaded, user).await?;

        tracing::info!(
            page_id = %id,
            user_id = ?user.map(|u| u.id),
            revisions = page.revision_count(),
            "Page revision committed"
        );
        Ok(page)
    }

    /// Roll back to revision `number` (1 = oldest).
    pub async fn rollback_page(
        &self,
        id: PageId,
        user: Option<&User>,
        number: &str,
    ) -> StoreResult<(Page, Effect)> {
        let mut page = self.load_writable(id, user).await?;
        let loaded = page.revision_count();
        let number = RevisionNumber::parse(number)?;
        let target = page.revision(number)?.clone();
        self.ensure_path_free(target.content().path(), Some(id)).await?;

        let effect = page.rollback(Some(&target), user);
        if effect == Effect::Applied {
            self.save(&page, loaded, user).await?;
            tracing::info!(
                page_id = %id,
                user_id = ?user.map(|u| u.id),
                revisions = page.revision_count(),
                target = number.get(),
                "Page rolled back"
            );
        }
        Ok((page, effect))
    }

    /// Move a page to the trash. Trashing a trashed page changes nothing.
    pub async fn trash_page(&self, id: PageId, user: Option<&User>) -> StoreResult<(Page, Effect)> {
        let mut page = self.load(id).await?;
        self.policy
            .authorize_write(user, page.revisions().as_slice())?;

        let effect = page.trash();
        if let (Effect::Applied, Some(trashed_at)) = (effect, page.trashed()) {
            if !PageRepo::trash(&self.pool, id, trashed_at).await? {
                // Trashed concurrently; report the stored tombstone.
                return Ok((self.load(id).await?, Effect::Unchanged));
            }
            tracing::info!(page_id = %id, user_id = ?user.map(|u| u.id), "Page trashed");
        }
        Ok((page, effect))
    }

    /// Restore a trashed page. Admins only.
    pub async fn untrash_page(
        &self,
        id: PageId,
        user: Option<&User>,
    ) -> StoreResult<(Page, Effect)> {
        match user {
            None => {
                return Err(CoreError::Unauthorized("Sign in to restore pages".into()).into())
            }
            Some(u) if !u.is_admin => {
                return Err(CoreError::Forbidden("Only admins can restore pages".into()).into())
            }
            Some(_) => {}
        }

        let mut page = self.load(id).await?;
        let live_path = page.current().content().path().to_string();
        let effect = page.untrash();
        if effect == Effect::Applied {
            self.ensure_path_free(&live_path, Some(id)).await?;
            if !PageRepo::restore(&self.pool, id, page.updated()).await? {
                return Ok((self.load(id).await?, Effect::Unchanged));
            }
            tracing::info!(page_id = %id, user_id = ?user.map(|u| u.id), "Page restored");
        }
        Ok((page, effect))
    }

    // ── Helpers ──────────────────────────────────────────────────────

    async fn save(&self, page: &Page, loaded: usize, user: Option<&User>) -> StoreResult<()> {
        let saved = PageRepo::save_revisions(
            &self.pool,
            page.id(),
            page.revisions(),
            page.updated(),
            loaded,
        )
        .await?;
        if !saved {
            tracing::warn!(
                page_id = %page.id(),
                user_id = ?user.map(|u| u.id),
                expected = loaded,
                "Concurrent edit detected; revision not saved"
            );
            return Err(CoreError::Conflict(format!(
                "Page {} was changed by someone else; reload and retry",
                page.id()
            ))
            .into());
        }
        Ok(())
    }

    /// Paths are unique among live pages.
    async fn ensure_path_free(&self, path: &str, owner: Option<PageId>) -> StoreResult<()> {
        match PageRepo::find_by_path(&self.pool, path).await? {
            Some(row) if Some(row.id) != owner => Err(CoreError::Conflict(format!(
                "A page with path '{path}' already exists"
            ))
            .into()),
            _ => Ok(()),
        }
    }
}

fn is_admin(user: Option<&User>) -> bool {
    user.is_some_and(|u| u.is_admin)
}

fn not_found(id: PageId) -> CoreError {
    CoreError::not_found("page", id)
}
