//! Pagination and filtering for list endpoints.
//!
//! Unique responsibility: drive multi-page fetches against any collection
//! endpoint and describe them with `ListOptions`.
//!
//! Flow for one list call:
//! 1) `ListOptions` are applied to an outbound request
//!    (query params, `page`, `page_size`, `X-Filter` header)
//! 2) The resource pager resolves its endpoint and decodes one page,
//!    appending to its own accumulator
//! 3) If no page was requested, pages `2..=pages` are fetched in order
//! 4) Totals are written back into the options

use std::{collections::HashMap, fmt, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize, Serializer, de::DeserializeOwned, ser};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::linode_client::{ApiRequest, Client, EndpointId};
use crate::linode_error::{Error, Result};
use crate::linode_query::flatten_query_struct;

/// Header carrying the API filter expression.
pub const FILTER_HEADER: &str = "X-Filter";

/// Position of one page inside a paginated collection.
///
/// `page == 0` means "not specified": every page is fetched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageOptions {
    /// Requested (or last fetched) page number, 1-based.
    pub page: u32,
    /// Total number of pages reported by the API.
    pub pages: u32,
    /// Total number of results reported by the API.
    pub results: u32,
}

/// Extra query parameters attached to `ListOptions`.
///
/// Implemented for every `Serialize + Debug + Send + Sync` type; see
/// [`flatten_query_struct`] for how fields map to parameters.
pub trait QueryParams: fmt::Debug + Send + Sync {
    /// Flatten into query parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is not a struct of supported fields.
    fn flatten(&self) -> Result<HashMap<String, String>>;

    /// Canonical JSON form, used for hashing.
    ///
    /// # Errors
    ///
    /// Returns an error if the value cannot be represented as JSON.
    fn to_json(&self) -> Result<serde_json::Value>;
}

impl<T> QueryParams for T
where
    T: Serialize + fmt::Debug + Send + Sync,
{
    fn flatten(&self) -> Result<HashMap<String, String>> {
        flatten_query_struct(self)
    }

    fn to_json(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| Error::Serialization(e.to_string()))
    }
}

/// Pagination and filtering parameters for list endpoints.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListOptions {
    /// Page window; `None` behaves like page 0.
    #[serde(flatten)]
    pub page_options: Option<PageOptions>,
    /// Results per page; 0 leaves the API default.
    pub page_size: u32,
    /// Filter expression sent in the `X-Filter` header.
    pub filter: String,
    /// Custom query parameters for the list endpoint.
    #[serde(serialize_with = "serialize_query_params")]
    pub query_params: Option<Arc<dyn QueryParams>>,
}

impl ListOptions {
    /// Options with only the two writable properties, page and filter.
    #[must_use]
    pub fn new(page: u32, filter: impl Into<String>) -> Self {
        Self {
            page_options: Some(PageOptions {
                page,
                ..PageOptions::default()
            }),
            filter: filter.into(),
            ..Self::default()
        }
    }

    /// Set the page size.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Attach custom query parameters.
    #[must_use]
    pub fn with_query_params<Q>(mut self, params: Q) -> Self
    where
        Q: QueryParams + 'static,
    {
        self.query_params = Some(Arc::new(params));
        self
    }

    /// Requested page, 0 when unspecified.
    #[must_use]
    pub const fn page(&self) -> u32 {
        match self.page_options {
            Some(window) => window.page,
            None => 0,
        }
    }

    /// Total pages reported by the last list call.
    #[must_use]
    pub const fn pages(&self) -> u32 {
        match self.page_options {
            Some(window) => window.pages,
            None => 0,
        }
    }

    /// Total results reported by the last list call.
    #[must_use]
    pub const fn results(&self) -> u32 {
        match self.page_options {
            Some(window) => window.results,
            None => 0,
        }
    }

    fn window_mut(&mut self) -> &mut PageOptions {
        self.page_options.get_or_insert_with(PageOptions::default)
    }

    fn record_totals(&mut self, pages: u32, results: u32) {
        let window = self.window_mut();
        window.pages = pages;
        window.results = results;
    }

    /// SHA-256 of the options, as lowercase hex.
    ///
    /// Used as a response cache key: equal options always hash equally.
    ///
    /// # Errors
    ///
    /// Returns `Error::Serialization` if the options (including the query
    /// params) cannot be serialized.
    pub fn hash(&self) -> Result<String> {
        let data = serde_json::to_vec(self)
            .map_err(|e| Error::Serialization(format!("failed to cache ListOptions: {e}")))?;
        Ok(format!("{:x}", Sha256::digest(&data)))
    }
}

fn serialize_query_params<S>(
    params: &Option<Arc<dyn QueryParams>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match params {
        None => serializer.serialize_none(),
        Some(params) => params
            .to_json()
            .map_err(<S::Error as ser::Error>::custom)?
            .serialize(serializer),
    }
}

/// Apply list options to an outbound request.
///
/// # Errors
///
/// Returns `Error::ListOptions` wrapping the flattening error if the query
/// params cannot be flattened.
pub fn apply_list_options_to_request(opts: Option<&ListOptions>, req: &mut ApiRequest<'_>) -> Result<()> {
    let Some(opts) = opts else {
        return Ok(());
    };

    if let Some(params) = &opts.query_params {
        let params = params.flatten().map_err(|e| Error::ListOptions(Box::new(e)))?;
        req.set_query_params(params);
    }

    if let Some(page_options) = opts.page_options
        && page_options.page > 0
    {
        req.set_query_param("page", page_options.page.to_string());
    }

    if opts.page_size > 0 {
        req.set_query_param("page_size", opts.page_size.to_string());
    }

    if !opts.filter.is_empty() {
        req.set_header(FILTER_HEADER, opts.filter.as_str());
    }

    Ok(())
}

/// One page of a list endpoint as sent by the API.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    /// Page number of this page.
    #[serde(default)]
    pub page: u32,
    /// Total number of pages.
    #[serde(default)]
    pub pages: u32,
    /// Total number of results.
    #[serde(default)]
    pub results: u32,
}

/// GET one page from `endpoint` and append its items to `into`.
///
/// Returns `(pages, results)` as reported by the API.
///
/// # Errors
///
/// Returns an error if the request or decoding fails.
pub async fn decode_page<T>(request: ApiRequest<'_>, endpoint: &str, into: &mut Vec<T>) -> Result<(u32, u32)>
where
    T: DeserializeOwned + Send,
{
    let page: Page<T> = request.get(endpoint).await?;
    into.extend(page.data);
    Ok((page.pages, page.results))
}

/// Per-resource list capability.
///
/// A pager knows its endpoint and owns the accumulator that pages are
/// appended to. It is not meant to be shared between concurrent list calls.
#[async_trait]
pub trait PagedResponse: Send {
    /// Endpoint path for this resource, given parent resource ids.
    ///
    /// # Errors
    ///
    /// Returns an error if the ids do not fit the endpoint.
    fn endpoint(&self, ids: &[EndpointId<'_>]) -> Result<String>;

    /// Perform `request` against `endpoint`, append the decoded page to the
    /// accumulator, and return `(pages, results)`.
    ///
    /// # Errors
    ///
    /// Returns transport and decoding errors unchanged.
    async fn cast_result(&mut self, request: ApiRequest<'_>, endpoint: &str) -> Result<(u32, u32)>;
}

impl Client {
    /// Fetch a list endpoint through `pager`.
    ///
    /// When `opts` is `None` or its page is 0, every page is fetched, one
    /// after another, and appended to the pager. Otherwise only the
    /// requested page is fetched. Either way `opts` receives the reported
    /// `pages` and `results`.
    ///
    /// On error the pager keeps whatever pages were appended before the
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first error hit while applying options, resolving the
    /// endpoint or fetching a page.
    pub async fn paginate<P>(&self, pager: &mut P, opts: Option<&mut ListOptions>, ids: &[EndpointId<'_>]) -> Result<()>
    where
        P: PagedResponse + ?Sized,
    {
        let mut fallback = ListOptions::default();
        let opts = opts.unwrap_or(&mut fallback);

        let (pages, results) = self.fetch_page(pager, opts, ids).await?;
        let fetch_all = opts.page() == 0;
        opts.record_totals(pages, results);

        if fetch_all {
            for page in 2..=pages {
                opts.window_mut().page = page;
                let (page_count, result_count) = self.fetch_page(pager, opts, ids).await?;
                opts.record_totals(page_count, result_count);
            }
        }

        Ok(())
    }

    async fn fetch_page<P>(&self, pager: &mut P, opts: &ListOptions, ids: &[EndpointId<'_>]) -> Result<(u32, u32)>
    where
        P: PagedResponse + ?Sized,
    {
        let mut req = self.request();
        apply_list_options_to_request(Some(opts), &mut req)?;

        let endpoint = pager.endpoint(ids)?;
        let (pages, results) = pager.cast_result(req, &endpoint).await?;
        debug!(endpoint = %endpoint, page = opts.page(), pages, results, "fetched list page");

        Ok((pages, results))
    }
}
