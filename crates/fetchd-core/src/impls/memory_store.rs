//! In-memory request store.
//!
//! All records sit behind one `tokio::sync::Mutex`; critical sections only
//! touch the maps, never I/O. Listing order is the insertion sequence number,
//! so pages are stable across calls.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Error, FetchSpec, Paginator, Request, RequestId, Response, Result, paginator::window_of,
};
use crate::ports::id_generator::MAX_ID_ATTEMPTS;
use crate::ports::{IdGenerator, RequestStore, UlidGenerator};

/// One stored record, keyed by its sequence number.
#[derive(Debug, Clone)]
struct RequestRecord {
    id: RequestId,
    fetch: FetchSpec,
    response: Option<Response>,
}

impl RequestRecord {
    fn to_request(&self) -> Request {
        Request {
            id: self.id,
            fetch: self.fetch.clone(),
            response: self.response.clone(),
        }
    }
}

#[derive(Default)]
struct InMemoryStoreState {
    /// id -> sequence number.
    index: HashMap<RequestId, u64>,

    /// sequence number -> record (single source of truth, iteration order).
    records: BTreeMap<u64, RequestRecord>,

    /// Next sequence number to assign. Never reused, even after deletes.
    next_seq: u64,
}

impl InMemoryStoreState {
    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    fn record_mut(&mut self, id: RequestId) -> Result<&mut RequestRecord> {
        let seq = self.index.get(&id).ok_or(Error::NotFound(id))?;
        self.records.get_mut(seq).ok_or(Error::NotFound(id))
    }
}

pub struct InMemoryRequestStore {
    state: Mutex<InMemoryStoreState>,
    id_gen: Box<dyn IdGenerator>,
}

impl InMemoryRequestStore {
    pub fn new() -> Self {
        Self::with_id_generator(UlidGenerator::default())
    }

    pub fn with_id_generator(id_gen: impl IdGenerator + 'static) -> Self {
        Self {
            state: Mutex::new(InMemoryStoreState::default()),
            id_gen: Box::new(id_gen),
        }
    }
}

impl Default for InMemoryRequestStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestStore for InMemoryRequestStore {
    async fn add_request(&self, spec: FetchSpec) -> Result<RequestId> {
        let mut state = self.state.lock().await;

        let id = std::iter::repeat_with(|| self.id_gen.generate_request_id())
            .take(MAX_ID_ATTEMPTS)
            .find(|id| !state.index.contains_key(id))
            .ok_or_else(|| {
                Error::internal(format!("no unused request id after {MAX_ID_ATTEMPTS} attempts"))
            })?;

        let seq = state.allocate_seq();
        state.index.insert(id, seq);
        state.records.insert(
            seq,
            RequestRecord {
                id,
                fetch: spec,
                response: None,
            },
        );
        Ok(id)
    }

    async fn add_response(&self, id: RequestId, response: Response) -> Result<()> {
        if response.id != id {
            return Err(Error::invalid_input(format!(
                "response for {} attached to {id}",
                response.id
            )));
        }

        let mut state = self.state.lock().await;
        let record = state.record_mut(id)?;
        if record.response.is_some() {
            return Err(Error::invalid_input(format!("response for {id} already attached")));
        }
        record.response = Some(response);
        Ok(())
    }

    async fn delete_request(&self, id: RequestId) -> Result<()> {
        let mut state = self.state.lock().await;
        let seq = state.index.remove(&id).ok_or(Error::NotFound(id))?;
        state.records.remove(&seq);
        Ok(())
    }

    async fn get_all_requests(&self, paginator: Option<Paginator>) -> Result<Vec<Request>> {
        let state = self.state.lock().await;
        let records = state.records.values();
        let requests = match window_of(paginator.as_ref()) {
            Some(window) => records
                .skip(window.start)
                .take(window.len())
                .map(RequestRecord::to_request)
                .collect(),
            None => records.map(RequestRecord::to_request).collect(),
        };
        Ok(requests)
    }

    async fn get_request(&self, id: RequestId) -> Result<Request> {
        let state = self.state.lock().await;
        state
            .index
            .get(&id)
            .and_then(|seq| state.records.get(seq))
            .map(RequestRecord::to_request)
            .ok_or(Error::NotFound(id))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.state.lock().await.records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ErrorKind, FetchRequest, Method};
    use std::sync::Arc;
    use ulid::Ulid;

    fn spec(path: &str) -> FetchSpec {
        FetchSpec::new(Method::Get, &format!("http://example.com/{path}")).unwrap()
    }

    async fn store_with(n: usize) -> (InMemoryRequestStore, Vec<RequestId>) {
        let store = InMemoryRequestStore::new();
        let mut ids = Vec::with_capacity(n);
        for i in 0..n {
            ids.push(store.add_request(spec(&i.to_string())).await.unwrap());
        }
        (store, ids)
    }

    #[tokio::test]
    async fn added_request_is_listed_without_response() {
        let (store, ids) = store_with(1).await;

        let all = store.get_all_requests(None).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, ids[0]);
        assert_eq!(all[0].fetch, spec("0"));
        assert!(all[0].response.is_none());
    }

    #[tokio::test]
    async fn n_adds_list_n_records() {
        let (store, _) = store_with(25).await;
        assert_eq!(store.get_all_requests(None).await.unwrap().len(), 25);
        assert_eq!(store.len().await.unwrap(), 25);
    }

    #[tokio::test]
    async fn invalid_fetch_never_reaches_the_store() {
        let store = InMemoryRequestStore::new();
        let raw = FetchRequest {
            method: "GET".into(),
            url: "no-scheme".into(),
            ..Default::default()
        };

        let err = FetchSpec::try_from(raw).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.is_empty().await.unwrap());
    }

    #[tokio::test]
    async fn add_response_attaches_once() {
        let (store, ids) = store_with(1).await;
        let id = ids[0];

        store.add_response(id, Response::new(id, 200)).await.unwrap();
        let again = store.add_response(id, Response::new(id, 201)).await.unwrap_err();
        assert_eq!(again.kind(), ErrorKind::InvalidInput);

        let stored = store.get_request(id).await.unwrap();
        assert_eq!(stored.response.unwrap().status, 200);
    }

    #[tokio::test]
    async fn add_response_to_unknown_id_is_not_found() {
        let (store, _) = store_with(3).await;
        let unknown = RequestId::from_ulid(Ulid::new());

        let err = store
            .add_response(unknown, Response::new(unknown, 200))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.len().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn add_response_with_mismatched_id_is_invalid() {
        let (store, ids) = store_with(2).await;

        let err = store
            .add_response(ids[0], Response::new(ids[1], 200))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(store.get_request(ids[0]).await.unwrap().response.is_none());
        assert!(store.get_request(ids[1]).await.unwrap().response.is_none());
    }

    #[tokio::test]
    async fn delete_is_not_repeatable() {
        let (store, ids) = store_with(3).await;

        store.delete_request(ids[1]).await.unwrap();
        assert_eq!(store.len().await.unwrap(), 2);

        let err = store.delete_request(ids[1]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert_eq!(store.len().await.unwrap(), 2);

        let err = store.get_request(ids[1]).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn listing_is_in_insertion_order() {
        let (store, ids) = store_with(10).await;
        let listed: Vec<_> = store
            .get_all_requests(None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn second_page_of_two_over_five_records() {
        let (store, ids) = store_with(5).await;

        let page = store
            .get_all_requests(Some(Paginator::new(1, 2)))
            .await
            .unwrap();
        let page_ids: Vec<_> = page.into_iter().map(|r| r.id).collect();
        assert_eq!(page_ids, vec![ids[2], ids[3]]);
    }

    #[tokio::test]
    async fn pages_cover_every_record_exactly_once() {
        let (store, ids) = store_with(11).await;

        for per_page in 1..=12 {
            let pages = ids.len().div_ceil(per_page);
            let mut seen = Vec::new();
            for page in 0..pages {
                let chunk = store
                    .get_all_requests(Some(Paginator::new(page, per_page)))
                    .await
                    .unwrap();
                assert!(chunk.len() <= per_page);
                seen.extend(chunk.into_iter().map(|r| r.id));
            }
            assert_eq!(seen, ids, "per_page={per_page}");

            let past_end = store
                .get_all_requests(Some(Paginator::new(pages, per_page)))
                .await
                .unwrap();
            assert!(past_end.is_empty());
        }
    }

    #[tokio::test]
    async fn zero_per_page_returns_everything() {
        let (store, _) = store_with(4).await;
        let all = store
            .get_all_requests(Some(Paginator::new(3, 0)))
            .await
            .unwrap();
        assert_eq!(all.len(), 4);
    }

    #[tokio::test]
    async fn order_survives_deletes() {
        let (store, ids) = store_with(5).await;
        store.delete_request(ids[0]).await.unwrap();
        store.delete_request(ids[3]).await.unwrap();
        let new_id = store.add_request(spec("new")).await.unwrap();

        let listed: Vec<_> = store
            .get_all_requests(None)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.id)
            .collect();
        assert_eq!(listed, vec![ids[1], ids[2], ids[4], new_id]);
    }

    #[tokio::test]
    async fn listings_are_copies() {
        let (store, ids) = store_with(1).await;
        let before = store.get_all_requests(None).await.unwrap();

        store.add_response(ids[0], Response::new(ids[0], 204)).await.unwrap();

        assert!(before[0].response.is_none());
        let after = store.get_all_requests(None).await.unwrap();
        assert_eq!(after[0].response.as_ref().unwrap().status, 204);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_adds_and_deletes() {
        let store = Arc::new(InMemoryRequestStore::new());

        let mut joins = Vec::new();
        for t in 0..8 {
            let store = Arc::clone(&store);
            joins.push(tokio::spawn(async move {
                let mut kept = 0usize;
                for i in 0..50 {
                    let id = store.add_request(spec(&format!("{t}/{i}"))).await.unwrap();
                    store.add_response(id, Response::new(id, 200)).await.unwrap();
                    if i % 2 == 0 {
                        store.delete_request(id).await.unwrap();
                    } else {
                        kept += 1;
                    }
                }
                kept
            }));
        }

        let mut expected = 0usize;
        for join in joins {
            expected += join.await.unwrap();
        }

        let all = store.get_all_requests(None).await.unwrap();
        assert_eq!(all.len(), expected);
        assert!(all.iter().all(|r| r.response.as_ref().is_some_and(|resp| resp.id == r.id)));
    }

    /// Hands out the same id forever.
    struct ConstantIds(RequestId);

    impl IdGenerator for ConstantIds {
        fn generate_request_id(&self) -> RequestId {
            self.0
        }
    }

    #[tokio::test]
    async fn exhausted_id_generator_fails_instead_of_spinning() {
        let id = RequestId::from_ulid(Ulid::new());
        let store = InMemoryRequestStore::with_id_generator(ConstantIds(id));

        assert_eq!(store.add_request(spec("a")).await.unwrap(), id);

        let err = store.add_request(spec("b")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        // the store stays usable
        assert_eq!(store.len().await.unwrap(), 1);
        assert_eq!(store.get_request(id).await.unwrap().fetch, spec("a"));
    }
}
