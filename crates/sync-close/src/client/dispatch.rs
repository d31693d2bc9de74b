use futures::future::join_all;
use tracing::{info, instrument, warn};

use crm_sync_client::{RequestMethod, Transport};

use crate::dispatch::{
    classify, BatchFailure, BatchItem, BatchOutcome, ConcurrentFetch, DispatchOptions,
    FetchFailure, FetchRequest,
};
use crate::error::Result;

impl<T: Transport> super::CloseClient<T> {
    /// Send every item with `method` and partition the outcomes.
    ///
    /// Items are cut into contiguous slices of `options.slice_size`. Slices
    /// run one after another; the items of a slice run concurrently, so at
    /// most `slice_size` requests are ever in flight. A failing item never
    /// stops its siblings or later slices.
    ///
    /// Retries (rate limits included) happen in the transport; an item only
    /// fails here once the transport has given up on it.
    ///
    /// # Errors
    ///
    /// Only `InvalidArgument` for a zero slice size. Per-item errors are
    /// reported in [`BatchOutcome::failures`].
    #[instrument(skip(self, items), fields(items = items.len(), slice_size = options.slice_size))]
    pub async fn dispatch_all(
        &self,
        method: RequestMethod,
        items: Vec<BatchItem>,
        options: DispatchOptions,
    ) -> Result<BatchOutcome> {
        options.validate()?;

        let mut outcome = BatchOutcome::default();

        for (slice_index, slice) in items.chunks(options.slice_size).enumerate() {
            let first = slice_index * options.slice_size;

            let requests = slice.iter().map(|item| {
                let request = super::item_request(method, &item.endpoint, item.payload.as_ref());
                self.transport.send(request)
            });
            let results = join_all(requests).await;

            let failures_before = outcome.failures.len();
            for (offset, (item, result)) in slice.iter().zip(results).enumerate() {
                let succeeded = outcome.successes.len();
                classify(&mut outcome, first + offset, item, result);
                if options.verbose && outcome.successes.len() > succeeded {
                    info!(
                        %method,
                        index = first + offset,
                        endpoint = %item.endpoint,
                        "Request succeeded"
                    );
                }
            }

            for failure in &outcome.failures[failures_before..] {
                log_failure(method, failure);
            }

            if options.verbose {
                info!(
                    slice = slice_index + 1,
                    succeeded = slice.len() - (outcome.failures.len() - failures_before),
                    failed = outcome.failures.len() - failures_before,
                    "Dispatched slice"
                );
            }
        }

        if options.verbose {
            info!(
                succeeded = outcome.successes.len(),
                failed = outcome.failures.len(),
                "Batch complete"
            );
        }

        Ok(outcome)
    }

    /// PUT every item, five at a time.
    pub async fn put_all(&self, items: Vec<BatchItem>) -> Result<BatchOutcome> {
        self.dispatch_all(RequestMethod::Put, items, DispatchOptions::default())
            .await
    }

    /// POST every item, five at a time.
    pub async fn post_all(&self, items: Vec<BatchItem>) -> Result<BatchOutcome> {
        self.dispatch_all(RequestMethod::Post, items, DispatchOptions::default())
            .await
    }

    /// DELETE every endpoint, five at a time.
    pub async fn delete_all<I, S>(&self, endpoints: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = endpoints.into_iter().map(BatchItem::new).collect();
        self.dispatch_all(RequestMethod::Delete, items, DispatchOptions::default())
            .await
    }

    /// GET every endpoint, ten at a time.
    pub async fn get_many<I, S>(&self, endpoints: I) -> Result<BatchOutcome>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = endpoints.into_iter().map(BatchItem::new).collect();
        self.dispatch_all(RequestMethod::Get, items, DispatchOptions::for_reads())
            .await
    }

    /// Drain several offset-paginated listings, `slice_size` at a time.
    ///
    /// Each request is a full [`get_all`](Self::get_all). Records of the
    /// listings that succeed are concatenated in input order; a listing that
    /// fails part-way contributes no records and one entry in `errors`.
    #[instrument(skip(self, requests), fields(requests = requests.len(), slice_size = options.slice_size))]
    pub async fn get_all_concurrently(
        &self,
        requests: Vec<FetchRequest>,
        options: DispatchOptions,
    ) -> Result<ConcurrentFetch> {
        options.validate()?;

        let mut fetched = ConcurrentFetch::default();

        for (slice_index, slice) in requests.chunks(options.slice_size).enumerate() {
            let first = slice_index * options.slice_size;

            let listings = slice
                .iter()
                .map(|request| self.get_all(&request.endpoint, &request.params));
            let results = join_all(listings).await;

            for (offset, (request, result)) in slice.iter().zip(results).enumerate() {
                match result {
                    Ok(records) => {
                        if options.verbose {
                            info!(endpoint = %request.endpoint, records = records.len(), "Fetched listing");
                        }
                        fetched.records.extend(records);
                    }
                    Err(error) => {
                        warn!(endpoint = %request.endpoint, error = %error, "Listing failed");
                        fetched.errors.push(FetchFailure {
                            index: first + offset,
                            endpoint: request.endpoint.clone(),
                            error,
                        });
                    }
                }
            }
        }

        Ok(fetched)
    }
}

fn log_failure(method: RequestMethod, failure: &BatchFailure) {
    match failure {
        BatchFailure::Validation {
            index,
            endpoint,
            errors,
            field_errors,
            ..
        } => info!(
            %method,
            index,
            endpoint = %endpoint,
            errors = ?errors,
            field_errors = ?field_errors,
            "Validation error"
        ),
        BatchFailure::Hard {
            index,
            endpoint,
            error,
        } => warn!(%method, index, endpoint = %endpoint, error = %error, "Request failed"),
    }
}
