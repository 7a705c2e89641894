// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0
//! # Service catalog
//!
//! The catalog embedded into the token and the endpoint lookup on it.

use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::config::KeystoneSection;
use crate::error::BuilderError;

/// Service catalog.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Catalog(pub Vec<CatalogService>);

/// Catalog service with its endpoints.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct CatalogService {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub service_type: String,
    #[serde(default)]
    pub endpoints: Vec<Endpoint>,
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct Endpoint {
    #[serde(default)]
    pub id: Option<String>,
    pub interface: String,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<String>,
    pub url: String,
}

/// Endpoint selection criteria.
#[derive(Builder, Clone, Debug, PartialEq)]
#[builder(build_fn(error = "BuilderError"))]
#[builder(setter(strip_option, into))]
pub struct EndpointOpts {
    /// Service type.
    pub service_type: String,

    /// Service name.
    #[builder(default)]
    pub name: Option<String>,

    /// Endpoint interface (`public`, `internal`, `admin`).
    #[builder(default = "String::from(\"public\")")]
    pub interface: String,

    /// Region (compared with the `region` and the `region_id`).
    #[builder(default)]
    pub region: Option<String>,
}

impl EndpointOpts {
    /// Selection of the gateway's own endpoint.
    pub fn from_config(config: &KeystoneSection) -> Self {
        Self {
            service_type: config.service_type.clone(),
            name: None,
            interface: config.interface.clone(),
            region: config.region.clone(),
        }
    }
}

/// Catalog lookup errors.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("token does not contain a service catalog")]
    CatalogMissing,

    #[error("no {interface} endpoint of the {service_type} service found in the catalog")]
    EndpointNotFound {
        service_type: String,
        interface: String,
    },

    #[error("invalid endpoint url {url}: {source}")]
    InvalidEndpointUrl {
        url: String,
        source: url::ParseError,
    },
}

impl Catalog {
    /// Find the first endpoint matching the `opts` and return its url
    /// normalized to end with a `/`.
    pub fn endpoint_url(&self, opts: &EndpointOpts) -> Result<Url, CatalogError> {
        let endpoint = self
            .0
            .iter()
            .filter(|srv| srv.service_type == opts.service_type)
            .filter(|srv| {
                opts.name
                    .as_ref()
                    .is_none_or(|name| srv.name.as_ref() == Some(name))
            })
            .flat_map(|srv| srv.endpoints.iter())
            .find(|ep| {
                ep.interface == opts.interface
                    && opts.region.as_ref().is_none_or(|region| {
                        ep.region.as_ref() == Some(region) || ep.region_id.as_ref() == Some(region)
                    })
            })
            .ok_or_else(|| CatalogError::EndpointNotFound {
                service_type: opts.service_type.clone(),
                interface: opts.interface.clone(),
            })?;

        let url = if endpoint.url.ends_with('/') {
            endpoint.url.clone()
        } else {
            format!("{}/", endpoint.url)
        };
        Url::parse(&url).map_err(|source| CatalogError::InvalidEndpointUrl { url, source })
    }
}
