// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Catalog adapters implementing [`crate::domain::catalog::CatalogClient`].

pub mod http;
pub mod in_memory;

pub use http::HttpCatalogClient;
pub use in_memory::InMemoryCatalogClient;
