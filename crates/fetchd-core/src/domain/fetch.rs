//! Fetch specs: what a client asks us to fetch.
//!
//! `FetchRequest` is the raw wire shape. `FetchSpec` is the validated form and
//! the only one the store, the queue and the fetch clients accept, so an
//! invalid method or URL is rejected before any side effect happens.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use url::Url;

use super::errors::Error;

/// Header name -> values. A name may repeat, so values are a list.
pub type Headers = BTreeMap<String, Vec<String>>;

/// HTTP verbs accepted for outbound fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl Method {
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Verbs are matched case-sensitively, as on the wire.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "DELETE" => Ok(Method::Delete),
            other => Err(Error::WrongMethod(other.to_string())),
        }
    }
}

/// Unvalidated fetch request as decoded from a client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchRequest {
    pub method: String,
    pub url: String,
    #[serde(default)]
    pub headers: Headers,
    #[serde(default)]
    pub body: Option<String>,
}

/// A validated fetch: method is one of GET/POST/DELETE and the URL is absolute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FetchRequest")]
pub struct FetchSpec {
    pub method: Method,
    pub url: Url,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: Headers,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl FetchSpec {
    /// Build a spec without headers or body.
    pub fn new(method: Method, url: &str) -> Result<Self, Error> {
        Ok(Self {
            method,
            url: parse_url(url)?,
            headers: Headers::new(),
            body: None,
        })
    }

    /// Append one value for `name`.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.entry(name.into()).or_default().push(value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        let body = body.into();
        self.body = (!body.is_empty()).then_some(body);
        self
    }
}

impl TryFrom<FetchRequest> for FetchSpec {
    type Error = Error;

    fn try_from(request: FetchRequest) -> Result<Self, Self::Error> {
        let method = request.method.parse()?;
        let url = parse_url(&request.url)?;
        Ok(Self {
            method,
            url,
            headers: request.headers,
            body: request.body.filter(|b| !b.is_empty()),
        })
    }
}

fn parse_url(raw: &str) -> Result<Url, Error> {
    Url::parse(raw).map_err(|e| Error::invalid_input(format!("url {raw:?}: {e}")))
}
