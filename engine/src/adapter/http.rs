//! HTTP remote store backed by `staybook-server`.
//!
//! The owner id travels as the bearer token. Mutations answer with a
//! [`ChangeResponse`] so "nothing matched" is distinguishable from a
//! transport failure.

use super::RemoteStore;
use crate::{error::Result, Booking, BookingStatus, Error, ListingId, NewBooking, Property};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Body returned by every mutating endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeResponse {
    /// Whether a record was actually inserted, removed, or updated
    pub changed: bool,
}

/// Request body for a booking status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub status: BookingStatus,
}

/// [`RemoteStore`] that talks to the Staybook server over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRemoteStore {
    client: Client,
    base_url: Url,
}

impl HttpRemoteStore {
    /// Create a store for the server at `base_url`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Network(format!("invalid base url '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::Network(format!(
                "base url '{base_url}' cannot carry a path"
            )));
        }
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// Build the URL for a path below the base, escaping each segment.
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn authorized(&self, request: RequestBuilder, owner: &str) -> RequestBuilder {
        request.bearer_auth(owner)
    }

    async fn fetch<T: DeserializeOwned>(&self, owner: &str, segments: &[&str]) -> Result<T> {
        let request = self.client.get(self.endpoint(segments));
        let response = self.authorized(request, owner).send().await?;
        Ok(check_status(response)?.json().await?)
    }

    async fn change(&self, request: RequestBuilder, owner: &str) -> Result<bool> {
        let response = self.authorized(request, owner).send().await?;
        let body: ChangeResponse = check_status(response)?.json().await?;
        Ok(body.changed)
    }
}

/// Map non-success responses onto engine errors.
pub fn status_error(status: StatusCode) -> Option<Error> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::NotAuthenticated,
        StatusCode::NOT_FOUND => Error::NotFound(status.to_string()),
        StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => Error::NetworkTimeout,
        other => Error::Network(format!("server answered {other}")),
    })
}

fn check_status(response: Response) -> Result<Response> {
    match status_error(response.status()) {
        Some(err) => Err(err),
        None => Ok(response),
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn list_favorite_ids(&self, owner: &str) -> Result<Vec<ListingId>> {
        self.fetch(owner, &["favorites", "ids"]).await
    }

    async fn list_favorite_listings(&self, owner: &str) -> Result<Vec<Property>> {
        self.fetch(owner, &["favorites", "listings"]).await
    }

    async fn add_favorite(&self, owner: &str, listing: &str) -> Result<bool> {
        let request = self.client.put(self.endpoint(&["favorites", listing]));
        self.change(request, owner).await
    }

    async fn remove_favorite(&self, owner: &str, listing: &str) -> Result<bool> {
        let request = self.client.delete(self.endpoint(&["favorites", listing]));
        self.change(request, owner).await
    }

    async fn list_bookings(&self, owner: &str) -> Result<Vec<Booking>> {
        self.fetch(owner, &["bookings"]).await
    }

    async fn create_booking(&self, booking: NewBooking) -> Result<Booking> {
        let request = self.client.post(self.endpoint(&["bookings"])).json(&booking);
        let response = self
            .authorized(request, &booking.owner_id)
            .send()
            .await?;
        Ok(check_status(response)?.json().await?)
    }

    async fn update_booking_status(
        &self,
        booking: &str,
        owner: &str,
        status: BookingStatus,
    ) -> Result<bool> {
        let request = self
            .client
            .patch(self.endpoint(&["bookings", booking, "status"]))
            .json(&StatusUpdateRequest { status });
        self.change(request, owner).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(base: &str) -> HttpRemoteStore {
        HttpRemoteStore::new(base, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn endpoint_joins_and_escapes_segments() {
        let store = store("http://localhost:3000/api/");
        assert_eq!(
            store.endpoint(&["favorites", "ids"]).as_str(),
            "http://localhost:3000/api/favorites/ids"
        );
        assert_eq!(
            store.endpoint(&["favorites", "a b/c"]).as_str(),
            "http://localhost:3000/api/favorites/a%20b%2Fc"
        );
    }

    #[test]
    fn rejects_unusable_base_url() {
        assert!(HttpRemoteStore::new("not a url", Duration::from_secs(1)).is_err());
        assert!(HttpRemoteStore::new("mailto:someone@example.com", Duration::from_secs(1)).is_err());
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_error(StatusCode::OK), None);
        assert_eq!(
            status_error(StatusCode::UNAUTHORIZED),
            Some(Error::NotAuthenticated)
        );
        assert!(matches!(
            status_error(StatusCode::NOT_FOUND),
            Some(Error::NotFound(_))
        ));
        assert_eq!(
            status_error(StatusCode::GATEWAY_TIMEOUT),
            Some(Error::NetworkTimeout)
        );
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR),
            Some(Error::Network(_))
        ));
    }

    #[test]
    fn change_response_wire_format() {
        let body: ChangeResponse = serde_json::from_str(r#"{"changed":false}"#).unwrap();
        assert!(!body.changed);

        let update = serde_json::to_string(&StatusUpdateRequest {
            status: BookingStatus::Cancelled,
        })
        .unwrap();
        assert_eq!(update, r#"{"status":"Cancelled"}"#);
    }
}
