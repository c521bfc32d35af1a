use crate::entry::{EntryRef, EntryType};
use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use malmeta_api::RequestExecutor;
use malmeta_cache::{Repository, Summary};
use tracing::instrument;
use url::Url;

/// Every field the API is asked for. Part of the canonical URL, so changing it
/// invalidates every cached summary.
const FIELDS: &str = "id,title,main_picture,alternative_titles,start_date,end_date,synopsis,mean,rank,popularity,\
num_list_users,num_scoring_users,nsfw,created_at,updated_at,media_type,status,genres,my_list_status,num_episodes,\
start_season,broadcast,source,average_episode_duration,rating,pictures,background,related_anime,related_manga,\
recommendations,studios,statistics";

/// When to ask the API again for an entry that is already cached.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FetchOptions {
    /// Re-request entries whose cached summary is a failure (anything other
    /// than real data or a 404).
    pub rerequest_failed: bool,
    /// Always re-request, whatever is cached. Takes precedence over
    /// `rerequest_failed`.
    pub force_rerequest: bool,
}
impl FetchOptions {
    pub fn rerequest_failed() -> Self {
        Self { rerequest_failed: true, ..Self::default() }
    }

    pub fn force() -> Self {
        Self { force_rerequest: true, ..Self::default() }
    }
}

/// Cache-first access to entry metadata.
///
/// Every entry maps to exactly one canonical request URL, and the cache holds
/// the last outcome of requesting it. Requests go through the executor one at
/// a time.
#[derive(Clone)]
pub struct MetadataFetcher {
    executor: RequestExecutor,
    repo: Repository,
    base: Url,
}

impl MetadataFetcher {
    /// `base` is the API root including its version, e.g.
    /// `https://api.myanimelist.net/v2`.
    pub fn new(executor: RequestExecutor, repo: Repository, base: Url) -> Self {
        Self { executor, repo, base }
    }

    /// The URL an entry is requested from and cached under.
    pub fn canonical_url(&self, entry: EntryRef) -> Result<Url> {
        let base = self.base.as_str().trim_end_matches('/');
        let url = format!("{base}/{}/{}?nsfw=true&fields={FIELDS}", entry.kind, entry.id);
        Url::parse(&url).or_raise(|| ErrorKind::InvalidUrl)
    }

    /// Get the summary for an entry, from the cache if possible.
    ///
    /// | cached summary           | default | `rerequest_failed` | `force_rerequest` |
    /// |--------------------------|---------|--------------------|-------------------|
    /// | none                     | request | request            | request           |
    /// | successful or not found  | cached  | cached             | request           |
    /// | failed                   | cached  | request            | request           |
    ///
    /// A request that gets an error status from the API still produces (and
    /// caches) a summary, with the status as error marker.
    ///
    /// # Errors
    /// - [`ErrorKind::Request`] if the request failed without an error status;
    ///   the cache is left untouched.
    /// - [`ErrorKind::Cache`] if the cache could not be read or written.
    #[instrument(skip(self), fields(entry_id = entry.id, entry_type = %entry.kind))]
    pub async fn fetch(&self, entry: EntryRef, options: FetchOptions) -> Result<Summary> {
        let url = self.canonical_url(entry)?;
        if options.force_rerequest {
            return self.refresh(&url).await;
        }
        match self.repo.get(url.as_str()).await.or_raise(|| ErrorKind::Cache)? {
            None => self.refresh(&url).await,
            Some(cached) if options.rerequest_failed && !cached.is_settled() => {
                tracing::info!(status = ?cached.error_status(), "Re-requesting previously failed entry");
                self.refresh(&url).await
            },
            Some(cached) => {
                tracing::debug!("Using cached summary");
                Ok(cached)
            },
        }
    }

    /// Same as [`fetch`](Self::fetch), for an entry type given as a string.
    /// The type is validated before anything else happens.
    pub async fn fetch_str(&self, id: u64, kind: &str, options: FetchOptions) -> Result<Summary> {
        let kind: EntryType = kind.parse()?;
        self.fetch(EntryRef::new(id, kind), options).await
    }

    /// Request `url` and overwrite whatever is cached for it.
    async fn refresh(&self, url: &Url) -> Result<Summary> {
        let summary = match self.executor.execute(url).await {
            Ok(metadata) => Summary::from_response(url.as_str(), metadata),
            Err(err) => match err.status() {
                Some(status) => {
                    tracing::warn!(status, error = ?err, "API request failed, caching error status");
                    Summary::from_status(url.as_str(), status)
                },
                None => return Err(err).or_raise(|| ErrorKind::Request),
            },
        };
        self.repo.put(&summary).await.or_raise(|| ErrorKind::Cache)?;
        Ok(summary)
    }
}
