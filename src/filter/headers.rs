//! Header-injecting filters.
//!
//! # Responsibilities
//! - Add a fixed set of headers to every outbound request
//! - Add a fixed set of headers to every client response
//!
//! Header names and values are validated once, when the filter is built.
//! Applying the filter afterwards cannot fail.

use std::collections::BTreeMap;

use axum::body::Body;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Request, Response};

use crate::error::{FilterError, GatewayError};
use crate::filter::{RequestFilter, ResponseFilter};

fn compile(headers: &BTreeMap<String, String>) -> Result<HeaderMap, GatewayError> {
    let mut compiled = HeaderMap::with_capacity(headers.len());
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
            GatewayError::InvalidConfiguration(format!("invalid header name {name:?}: {e}"))
        })?;
        let value = HeaderValue::from_str(value).map_err(|e| {
            GatewayError::InvalidConfiguration(format!("invalid value for header {name}: {e}"))
        })?;
        compiled.insert(name, value);
    }
    Ok(compiled)
}

fn apply(target: &mut HeaderMap, headers: &HeaderMap) {
    for (name, value) in headers {
        target.insert(name.clone(), value.clone());
    }
}

/// Sets configured headers on the outbound request, replacing existing values.
#[derive(Debug, Clone, Default)]
pub struct HeaderRequestFilter {
    headers: HeaderMap,
}

impl HeaderRequestFilter {
    pub fn new(headers: &BTreeMap<String, String>) -> Result<Self, GatewayError> {
        Ok(Self {
            headers: compile(headers)?,
        })
    }
}

impl RequestFilter for HeaderRequestFilter {
    fn filter(&self, request: &mut Request<Body>) -> Result<(), FilterError> {
        apply(request.headers_mut(), &self.headers);
        Ok(())
    }
}

/// Sets configured headers on the client response, replacing existing values.
#[derive(Debug, Clone, Default)]
pub struct HeaderResponseFilter {
    headers: HeaderMap,
}

impl HeaderResponseFilter {
    pub fn new(headers: &BTreeMap<String, String>) -> Result<Self, GatewayError> {
        Ok(Self {
            headers: compile(headers)?,
        })
    }
}

impl ResponseFilter for HeaderResponseFilter {
    fn filter(&self, response: &mut Response<Body>) -> Result<(), FilterError> {
        apply(response.headers_mut(), &self.headers);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn request_filter_sets_headers() {
        let filter = HeaderRequestFilter::new(&headers(&[("x-tenant", "blue")])).unwrap();
        let mut req = Request::builder()
            .header("x-tenant", "red")
            .body(Body::empty())
            .unwrap();

        filter.filter(&mut req).unwrap();
        assert_eq!(req.headers().get("x-tenant").unwrap(), "blue");
        assert_eq!(req.headers().get_all("x-tenant").iter().count(), 1);
    }

    #[test]
    fn response_filter_sets_headers() {
        let filter = HeaderResponseFilter::new(&headers(&[("x-served-by", "gw-1")])).unwrap();
        let mut res = Response::new(Body::empty());

        filter.filter(&mut res).unwrap();
        assert_eq!(res.headers().get("x-served-by").unwrap(), "gw-1");
    }

    #[test]
    fn invalid_headers_fail_at_construction() {
        assert!(HeaderRequestFilter::new(&headers(&[("bad header", "v")])).is_err());
        assert!(HeaderResponseFilter::new(&headers(&[("x-ok", "line\nbreak")])).is_err());
    }
}
