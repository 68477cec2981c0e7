//! Request body and path helpers.
//!
//! The router has already collected the body, so everything here works on
//! `Request<Bytes>`.

use std::collections::HashMap;

use bytes::Bytes;
use hyper::{Request, header};
use percent_encoding::percent_decode_str;
use serde::de::DeserializeOwned;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BodyError {
    #[error("Request body is empty")]
    Empty,

    #[error("Malformed request body: {0}")]
    Invalid(String),
}

/// `:name` segments captured by the router for the matched route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams(pub HashMap<String, String>);

impl PathParams {
    /// Capture `:name` segments of `route_path` from `request_path`.
    /// Values are percent-decoded.
    pub fn capture(route_path: &str, request_path: &str) -> Self {
        let clean = request_path.split('?').next().unwrap_or(request_path);
        let params = route_path
            .split('/')
            .zip(clean.split('/'))
            .filter_map(|(r, p)| {
                let name = r.strip_prefix(':')?;
                let value = percent_decode_str(p).decode_utf8_lossy().into_owned();
                Some((name.to_string(), value))
            })
            .collect();
        Self(params)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }
}

pub fn path_param<'a>(req: &'a Request<Bytes>, name: &str) -> Option<&'a str> {
    req.extensions().get::<PathParams>()?.get(name)
}

/// Numeric `:name` parameter; `None` when absent or not an integer.
pub fn path_id(req: &Request<Bytes>, name: &str) -> Option<i64> {
    path_param(req, name)?.parse().ok()
}

fn is_form(req: &Request<Bytes>) -> bool {
    req.headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/x-www-form-urlencoded"))
        .unwrap_or(false)
}

/// Deserialize a JSON body, or a urlencoded form when the content type says
/// so. Form fields are all strings.
pub fn parse_body<T: DeserializeOwned>(req: &Request<Bytes>) -> Result<T, BodyError> {
    let body = req.body();
    if body.is_empty() {
        return Err(BodyError::Empty);
    }

    if is_form(req) {
        let fields = form_urlencoded::parse(body.as_ref())
            .into_owned()
            .collect::<HashMap<String, String>>();
        let value = serde_json::to_value(fields).map_err(|e| BodyError::Invalid(e.to_string()))?;
        serde_json::from_value(value).map_err(|e| BodyError::Invalid(e.to_string()))
    } else {
        serde_json::from_slice(body).map_err(|e| BodyError::Invalid(e.to_string()))
    }
}
