// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Legacy REST catalog adapter.
//!
//! # Resource layout
//!
//! | Call | Method | Path | Success |
//! |------|--------|------|---------|
//! | `get_patron` | GET | `{patrons}{id}` | 200 |
//! | `list_patrons` | GET | `{patrons}` → `{"patrons":[..]}` | 200 |
//! | `create_patron` | POST | `{patrons}` | 201 |
//! | `delete_patron` | DELETE | `{patrons}{id}` | 204 |
//! | `get_item` / `list_items` / `create_item` / `delete_item` | as above | `{items}...` | |
//! | `update_item` | PUT | `{items}{id}` | 204 |
//! | `create_loan` | POST | `{patrons}{pid}/loans/` | 201 |
//! | `list_loans` | GET | `{patrons}{pid}/loans` → `{"loans":[..]}` | 200 |
//! | `get_loan` / `update_loan` / `delete_loan` | GET / PUT / DELETE | `{patrons}{pid}/loans/{lid}` | 200 / 204 / 204 |
//!
//! Every request carries `authorization` and `X-Okapi-Tenant` from the call's
//! [`CatalogScope`]. A 404 on a lookup is reported as `Ok(None)`.
//!
//! Identifiers always occupy exactly one percent-encoded path segment. Empty
//! identifiers and the dot segments `.` / `..` are refused before any request
//! is sent.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::domain::catalog::{CatalogClient, CatalogError, CatalogScope};
use crate::domain::config::CatalogConfig;
use crate::domain::ids::{ItemId, LoanId, PatronId};
use crate::domain::item::Item;
use crate::domain::loan::Loan;
use crate::domain::patron::Patron;

pub const TENANT_HEADER: &str = "X-Okapi-Tenant";

#[derive(Deserialize)]
struct PatronList {
    #[serde(default)]
    patrons: Vec<Patron>,
}

#[derive(Deserialize)]
struct ItemList {
    #[serde(default)]
    items: Vec<Item>,
}

#[derive(Deserialize)]
struct LoanList {
    #[serde(default)]
    loans: Vec<Loan>,
}

pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
    patrons_path: String,
    items_path: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url, "/patrons/", "/items/")
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        patrons_path: impl Into<String>,
        items_path: impl Into<String>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            patrons_path: patrons_path.into(),
            items_path: items_path.into(),
        }
    }

    pub fn from_config(config: &CatalogConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self::with_client(
            client,
            config.endpoint.as_str(),
            config.patrons_path.as_str(),
            config.items_path.as_str(),
        ))
    }

    fn collection_url(&self, path: &str) -> Result<Url, CatalogError> {
        Url::parse(&format!("{}{}", self.base_url, path))
            .map_err(|e| CatalogError::Transport(format!("invalid catalog url: {}", e)))
    }

    fn patrons_url(&self) -> Result<Url, CatalogError> {
        self.collection_url(&self.patrons_path)
    }

    fn items_url(&self) -> Result<Url, CatalogError> {
        self.collection_url(&self.items_path)
    }

    fn patron_url(&self, id: &PatronId) -> Result<Url, CatalogError> {
        with_segments(self.patrons_url()?, &[segment(id.as_str())?])
    }

    fn item_url(&self, id: &ItemId) -> Result<Url, CatalogError> {
        with_segments(self.items_url()?, &[segment(id.as_str())?])
    }

    fn loans_url(&self, patron_id: &PatronId) -> Result<Url, CatalogError> {
        with_segments(self.patrons_url()?, &[segment(patron_id.as_str())?, "loans"])
    }

    fn loan_url(&self, patron_id: &PatronId, loan_id: &LoanId) -> Result<Url, CatalogError> {
        with_segments(
            self.patrons_url()?,
            &[segment(patron_id.as_str())?, "loans", segment(loan_id.as_str())?],
        )
    }

    async fn send(&self, request: RequestBuilder, scope: &CatalogScope) -> Result<Response, CatalogError> {
        request
            .header("authorization", scope.credential.expose())
            .header(TENANT_HEADER, scope.tenant.as_str())
            .header("accept", "application/json")
            .send()
            .await
            .map_err(|e| CatalogError::Transport(e.to_string()))
    }

    /// GET a single resource; 404 is absence.
    async fn fetch<T: DeserializeOwned>(&self, url: Url, scope: &CatalogScope) -> Result<Option<T>, CatalogError> {
        debug!(%url, "Catalog lookup");
        let response = self.send(self.client.get(url), scope).await?;
        match response.status() {
            StatusCode::OK => decode(response).await.map(Some),
            StatusCode::NOT_FOUND => Ok(None),
            other => Err(unexpected(other)),
        }
    }

    /// GET a collection wrapped in a named envelope.
    async fn fetch_list<T: DeserializeOwned>(&self, url: Url, scope: &CatalogScope) -> Result<T, CatalogError> {
        debug!(%url, "Catalog listing");
        let response = self.send(self.client.get(url), scope).await?;
        expect(&response, StatusCode::OK)?;
        decode(response).await
    }

    async fn write(&self, request: RequestBuilder, scope: &CatalogScope, success: StatusCode) -> Result<Response, CatalogError> {
        let response = self.send(request, scope).await?;
        expect(&response, success)?;
        Ok(response)
    }
}

/// `url` with its trailing empty segment dropped and one percent-encoded
/// segment appended per entry of `segments`.
fn with_segments(mut url: Url, segments: &[&str]) -> Result<Url, CatalogError> {
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| CatalogError::Transport("catalog url cannot take a path".to_string()))?;
        path.pop_if_empty();
        path.extend(segments);
    }
    Ok(url)
}

fn segment(id: &str) -> Result<&str, CatalogError> {
    if id.is_empty() || id == "." || id == ".." {
        return Err(CatalogError::InvalidIdentifier(id.to_string()));
    }
    Ok(id)
}

fn unexpected(status: StatusCode) -> CatalogError {
    CatalogError::UnexpectedStatus { status: status.as_u16() }
}

fn expect(response: &Response, success: StatusCode) -> Result<(), CatalogError> {
    if response.status() == success {
        Ok(())
    } else {
        Err(unexpected(response.status()))
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, CatalogError> {
    let body = response
        .bytes()
        .await
        .map_err(|e| CatalogError::Transport(e.to_string()))?;
    if body.is_empty() {
        return Err(CatalogError::Decode("empty response body".to_string()));
    }
    serde_json::from_slice(&body).map_err(|e| CatalogError::Decode(e.to_string()))
}

#[async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn get_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<Option<Patron>, CatalogError> {
        self.fetch(self.patron_url(id)?, scope).await
    }

    async fn get_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<Option<Item>, CatalogError> {
        self.fetch(self.item_url(id)?, scope).await
    }

    async fn create_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan: &Loan) -> Result<Loan, CatalogError> {
        let url = with_segments(self.patrons_url()?, &[segment(patron_id.as_str())?, "loans", ""])?;
        let response = self
            .write(self.client.post(url).json(loan), scope, StatusCode::CREATED)
            .await?;
        decode(response).await
    }

    async fn get_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<Option<Loan>, CatalogError> {
        self.fetch(self.loan_url(patron_id, loan_id)?, scope).await
    }

    async fn delete_loan(&self, scope: &CatalogScope, patron_id: &PatronId, loan_id: &LoanId) -> Result<(), CatalogError> {
        let url = self.loan_url(patron_id, loan_id)?;
        self.write(self.client.delete(url), scope, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    async fn update_item(&self, scope: &CatalogScope, id: &ItemId, item: &Item) -> Result<(), CatalogError> {
        let url = self.item_url(id)?;
        self.write(self.client.put(url).json(item), scope, StatusCode::NO_CONTENT)
            .await?;
        Ok(())
    }

    async fn update_loan(
        &self,
        scope: &CatalogScope,
        patron_id: &PatronId,
        loan_id: &LoanId,
        loan: &Loan,
    ) -> Result<(), CatalogError> {
        let url = self.loan_url(patron_id, loan_id)?;
        self.write(self.client.put(url).json(loan), scope, StatusCode::NO_CONTENT)
            .await?;
        Ok(())
    }

    async fn list_patrons(&self, scope: &CatalogScope) -> Result<Vec<Patron>, CatalogError> {
        let list: PatronList = self.fetch_list(self.patrons_url()?, scope).await?;
        Ok(list.patrons)
    }

    async fn list_items(&self, scope: &CatalogScope) -> Result<Vec<Item>, CatalogError> {
        let list: ItemList = self.fetch_list(self.items_url()?, scope).await?;
        Ok(list.items)
    }

    async fn list_loans(&self, scope: &CatalogScope, patron_id: &PatronId) -> Result<Vec<Loan>, CatalogError> {
        let list: LoanList = self.fetch_list(self.loans_url(patron_id)?, scope).await?;
        Ok(list.loans)
    }

    async fn create_patron(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError> {
        let url = self.patrons_url()?;
        self.write(self.client.post(url).json(raw), scope, StatusCode::CREATED)
            .await?;
        Ok(())
    }

    async fn create_item(&self, scope: &CatalogScope, raw: &Value) -> Result<(), CatalogError> {
        let url = self.items_url()?;
        self.write(self.client.post(url).json(raw), scope, StatusCode::CREATED)
            .await?;
        Ok(())
    }

    async fn delete_patron(&self, scope: &CatalogScope, id: &PatronId) -> Result<(), CatalogError> {
        let url = self.patron_url(id)?;
        self.write(self.client.delete(url), scope, StatusCode::NO_CONTENT).await?;
        Ok(())
    }

    async fn delete_item(&self, scope: &CatalogScope, id: &ItemId) -> Result<(), CatalogError> {
        let url = self.item_url(id)?;
        self.write(self.client.delete(url), scope, StatusCode::NO_CONTENT).await?;
        Ok(())
    }
}
