//! Endpoint requests: the fluent builder between a model and the client.
//!
//! An [`EndpointRequest`] is created per API call, configured, then consumed
//! by [`response`](EndpointRequest::response) (or [`one`](EndpointRequest::one)
//! / [`all`](EndpointRequest::all)).
//!
//! Required arguments are checked when the request is rendered, not when it
//! is created, so `required_args` and `args` may be called in any order.
//!
//! ```rust
//! use headless_admin::{Endpoint, EndpointRequest, Error};
//! use serde_json::json;
//!
//! struct Article;
//!
//! impl Endpoint for Article {
//!     fn endpoint_name() -> &'static str {
//!         "admin/api-news-article"
//!     }
//! }
//!
//! let request = EndpointRequest::<Article>::new()
//!     .endpoint("{endpointName}/{id}/tags")
//!     .token("{id}", 42)
//!     .required_args(["lang"]);
//!
//! assert_eq!(request.get_endpoint(), "admin/api-news-article/42/tags");
//! assert!(matches!(request.render(), Err(Error::MissingArguments { .. })));
//!
//! let rendered = EndpointRequest::<Article>::new()
//!     .required_args(["lang"])
//!     .args([("lang", json!("de"))])
//!     .page(2)
//!     .render()
//!     .unwrap();
//! assert_eq!(rendered.endpoint, "admin/api-news-article");
//! assert_eq!(rendered.args["page"], json!(2));
//! ```

use crate::cache::{generate_cache_key, get_or_set_if};
use crate::client::Client;
use crate::error::{Error, Result};
use crate::filter::FilterCondition;
use crate::query::SortSpec;
use crate::response::EndpointResponse;
use crate::tokens::{parse_tokens, ENDPOINT_NAME_TOKEN};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;
use std::time::Duration;

/// A remote resource with a default endpoint name.
///
/// The provided methods build the usual requests; resources override the
/// ones the server handles differently.
pub trait Endpoint: Sized {
    /// Default endpoint path, e.g. `admin/api-admin-user`.
    fn endpoint_name() -> &'static str;

    /// A bare GET request against [`endpoint_name`](Self::endpoint_name).
    fn request() -> EndpointRequest<Self> {
        EndpointRequest::new()
    }

    /// List records.
    fn find() -> Result<EndpointRequest<Self>> {
        Ok(Self::request().endpoint(ENDPOINT_NAME_TOKEN))
    }

    /// View a single record.
    fn view(id: impl fmt::Display) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/{{id}}"))
            .token("{id}", id))
    }

    /// Create a record from `values`.
    fn insert(values: Map<String, Value>) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .method(Method::POST)
            .endpoint(ENDPOINT_NAME_TOKEN)
            .args(values))
    }

    /// Update a record with `values`.
    fn update(id: impl fmt::Display, values: Map<String, Value>) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .method(Method::PUT)
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/{{id}}"))
            .token("{id}", id)
            .args(values))
    }

    /// Delete a record.
    fn remove(id: impl fmt::Display) -> Result<EndpointRequest<Self>> {
        Ok(Self::request()
            .method(Method::DELETE)
            .endpoint(format!("{ENDPOINT_NAME_TOKEN}/{{id}}"))
            .token("{id}", id))
    }
}

/// Endpoint path and arguments ready for the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedRequest {
    /// Endpoint path with all known tokens substituted.
    pub endpoint: String,
    /// Query or body arguments.
    pub args: Map<String, Value>,
}

/// A request against the endpoint of `E`.
pub struct EndpointRequest<E> {
    method: Method,
    endpoint: Option<String>,
    tokens: BTreeMap<String, String>,
    args: Map<String, Value>,
    required_args: Vec<String>,
    default_expand: Vec<String>,
    cache_ttl: Option<Duration>,
    _endpoint: PhantomData<fn() -> E>,
}

impl<E: Endpoint> EndpointRequest<E> {
    /// Create a GET request against `E`'s default endpoint.
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            endpoint: None,
            tokens: BTreeMap::new(),
            args: Map::new(),
            required_args: Vec::new(),
            default_expand: Vec::new(),
            cache_ttl: None,
            _endpoint: PhantomData,
        }
    }

    /// Set the HTTP method.
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Extend or override the default endpoint name.
    ///
    /// Use `{endpointName}/foobar` to extend the default. An empty name keeps
    /// the default.
    pub fn endpoint(mut self, name: impl Into<String>) -> Self {
        self.endpoint = Some(name.into());
        self
    }

    /// Replace the token map used when rendering the endpoint.
    pub fn tokens<I, K, V>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: fmt::Display,
    {
        self.tokens = tokens
            .into_iter()
            .map(|(k, v)| (k.into(), v.to_string()))
            .collect();
        self
    }

    /// Add a single token, e.g. `("{id}", 5)`.
    pub fn token(mut self, key: impl Into<String>, value: impl fmt::Display) -> Self {
        self.tokens.insert(key.into(), value.to_string());
        self
    }

    /// Keys which must be present in the arguments at render time.
    ///
    /// Replaces previously declared keys.
    pub fn required_args<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_args = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Merge `args` into the arguments; existing keys are overwritten.
    pub fn args<I, K>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        for (key, value) in args {
            self.args.insert(key.into(), value);
        }
        self
    }

    /// Request extra fields, sent as `expand=a,b`.
    pub fn expand<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = join_fields(fields);
        self.args([("expand", Value::String(joined))])
    }

    /// Fields always expanded, in front of those given to [`expand`](Self::expand).
    pub fn default_expand<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.default_expand = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Page to return, starting at 1.
    pub fn page(self, page: u32) -> Self {
        self.args([("page", Value::from(page))])
    }

    /// Records per page.
    pub fn per_page(self, rows: u32) -> Self {
        self.args([("per-page", Value::from(rows))])
    }

    /// Sort order, sent as `sort=id,-name`.
    pub fn sort(self, sort: SortSpec) -> Self {
        self.args([("sort", Value::String(sort.to_string()))])
    }

    /// Filter conditions.
    ///
    /// The filter stays nested in the arguments; it is flattened by the
    /// query encoder. Filters must be enabled on the API side.
    pub fn filter(self, condition: FilterCondition) -> Self {
        self.args([("filter", condition.to_value())])
    }

    /// Cache the response for `ttl`, if the client has a cache.
    ///
    /// Only 2xx responses are stored; failures always go to the server again.
    pub fn cache(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Current arguments, without default expand fields.
    pub fn get_args(&self) -> &Map<String, Value> {
        &self.args
    }

    /// HTTP method the request is sent with.
    pub fn get_method(&self) -> &Method {
        &self.method
    }

    /// Cache TTL, if caching was requested.
    pub fn get_cache(&self) -> Option<Duration> {
        self.cache_ttl
    }

    /// Endpoint path with tokens substituted.
    ///
    /// `{endpointName}` is the endpoint's default name unless the token map
    /// defines it. Unknown tokens are left in place.
    pub fn get_endpoint(&self) -> String {
        let mut tokens = self.tokens.clone();
        tokens
            .entry(ENDPOINT_NAME_TOKEN.to_string())
            .or_insert_with(|| E::endpoint_name().to_string());

        let template = self
            .endpoint
            .as_deref()
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| E::endpoint_name());
        parse_tokens(template, &tokens)
    }

    /// Check required arguments and produce the endpoint path and arguments.
    pub fn render(&self) -> Result<RenderedRequest> {
        let missing: Vec<&str> = self
            .required_args
            .iter()
            .filter(|key| !self.args.contains_key(key.as_str()))
            .map(String::as_str)
            .collect();
        if !missing.is_empty() {
            return Err(Error::missing_arguments(missing));
        }

        let mut args = self.args.clone();
        if !self.default_expand.is_empty() {
            let mut fields = self.default_expand.clone();
            if let Some(Value::String(expand)) = args.get("expand") {
                for field in expand.split(',').map(str::trim).filter(|f| !f.is_empty()) {
                    if !fields.iter().any(|f| f == field) {
                        fields.push(field.to_string());
                    }
                }
            }
            args.insert("expand".into(), Value::String(join_fields(&fields)));
        }

        Ok(RenderedRequest {
            endpoint: self.get_endpoint(),
            args,
        })
    }

    /// Send the request, through the client's cache when a TTL is set.
    pub async fn response(self, client: &Client) -> Result<EndpointResponse> {
        let rendered = self.render()?;
        let method = self.method;

        match self.cache_ttl {
            Some(ttl) => {
                let key = generate_cache_key(
                    &format!("{} {}", std::any::type_name::<E>(), method),
                    &rendered.endpoint,
                    &rendered.args,
                );
                get_or_set_if(
                    client.cache(),
                    &key,
                    ttl,
                    || client.execute(method, &rendered.endpoint, &rendered.args),
                    EndpointResponse::is_success,
                )
                .await
            }
            None => {
                client
                    .execute(method, &rendered.endpoint, &rendered.args)
                    .await
            }
        }
    }

    /// Send the request and decode a single record.
    ///
    /// Non-success responses become [`Error::Api`].
    pub async fn one(self, client: &Client) -> Result<E>
    where
        E: DeserializeOwned,
    {
        self.response(client).await?.error_for_status()?.model()
    }

    /// Send the request and decode a list of records.
    ///
    /// Non-success responses become [`Error::Api`].
    pub async fn all(self, client: &Client) -> Result<Vec<E>>
    where
        E: DeserializeOwned,
    {
        self.response(client).await?.error_for_status()?.models()
    }
}

impl<E: Endpoint> Default for EndpointRequest<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for EndpointRequest<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointRequest")
            .field("endpoint_type", &std::any::type_name::<E>())
            .field("method", &self.method)
            .field("endpoint", &self.endpoint)
            .field("tokens", &self.tokens)
            .field("args", &self.args)
            .field("required_args", &self.required_args)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

fn join_fields<I, S>(fields: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    fields
        .into_iter()
        .map(|f| f.as_ref().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Operator;
    use serde_json::json;

    struct User;

    impl Endpoint for User {
        fn endpoint_name() -> &'static str {
            "admin/api-admin-user"
        }
    }

    #[test]
    fn test_default_endpoint() {
        let request = EndpointRequest::<User>::new();
        assert_eq!(request.get_endpoint(), "admin/api-admin-user");
    }

    #[test]
    fn test_token_substitution() {
        let request = EndpointRequest::<User>::new()
            .endpoint("admin/api-user/{id}")
            .tokens([("{id}", "42")]);
        assert_eq!(request.get_endpoint(), "admin/api-user/42");
    }

    #[test]
    fn test_reserved_endpoint_name_token() {
        let request = EndpointRequest::<User>::new().endpoint("{endpointName}/session/{unknown}");
        assert_eq!(
            request.get_endpoint(),
            "admin/api-admin-user/session/{unknown}"
        );
    }

    #[test]
    fn test_endpoint_name_token_can_be_overridden() {
        let request = EndpointRequest::<User>::new()
            .endpoint("{endpointName}/me")
            .token("{endpointName}", "admin/api-other");
        assert_eq!(request.get_endpoint(), "admin/api-other/me");
    }

    #[test]
    fn test_tokens_replace_previous_map() {
        let request = EndpointRequest::<User>::new()
            .endpoint("{a}/{b}")
            .token("{a}", 1)
            .tokens([("{b}", 2)]);
        assert_eq!(request.get_endpoint(), "{a}/2");
    }

    #[test]
    fn test_required_args_missing() {
        let request = EndpointRequest::<User>::new().required_args(["id"]);
        match request.render() {
            Err(Error::MissingArguments { missing }) => assert_eq!(missing, vec!["id"]),
            other => panic!("expected MissingArguments, got {other:?}"),
        }
    }

    #[test]
    fn test_required_args_present_in_any_order() {
        let before = EndpointRequest::<User>::new()
            .required_args(["id"])
            .args([("id", json!(5))]);
        assert!(before.render().is_ok());

        let after = EndpointRequest::<User>::new()
            .args([("id", json!(5))])
            .required_args(["id"]);
        assert!(after.render().is_ok());
    }

    #[test]
    fn test_required_args_are_replaced() {
        let request = EndpointRequest::<User>::new()
            .required_args(["id"])
            .required_args(["lang"])
            .args([("lang", json!("en"))]);
        assert!(request.render().is_ok());
    }

    #[test]
    fn test_args_shallow_merge() {
        let request = EndpointRequest::<User>::new()
            .args([("a", json!(1))])
            .args([("a", json!(2)), ("b", json!(3))]);
        assert_eq!(Value::Object(request.get_args().clone()), json!({"a": 2, "b": 3}));
    }

    #[test]
    fn test_paging_sort_and_expand() {
        let rendered = EndpointRequest::<User>::new()
            .page(3)
            .per_page(25)
            .sort(SortSpec::new().asc("id").desc("name"))
            .expand(["groups", "lastLogin"])
            .render()
            .unwrap();

        assert_eq!(
            Value::Object(rendered.args),
            json!({
                "page": 3,
                "per-page": 25,
                "sort": "id,-name",
                "expand": "groups,lastLogin"
            })
        );
    }

    #[test]
    fn test_filter_stays_nested() {
        let filter = FilterCondition::and([
            FilterCondition::eq("lang_id", 1).unwrap(),
            FilterCondition::field("publication_date", [(Operator::Lt, 100), (Operator::Gt, 10)])
                .unwrap(),
        ])
        .unwrap();

        let request = EndpointRequest::<User>::new().filter(filter);
        assert_eq!(
            request.get_args()["filter"],
            json!({"and": [{"lang_id": 1}, {"publication_date": {"lt": 100, "gt": 10}}]})
        );
    }

    #[test]
    fn test_default_expand_is_merged() {
        let rendered = EndpointRequest::<User>::new()
            .default_expand(["source"])
            .expand(["user", "source"])
            .render()
            .unwrap();
        assert_eq!(rendered.args["expand"], json!("source,user"));

        let rendered = EndpointRequest::<User>::new()
            .default_expand(["source"])
            .render()
            .unwrap();
        assert_eq!(rendered.args["expand"], json!("source"));
    }

    #[test]
    fn test_endpoint_trait_defaults() {
        assert_eq!(User::find().unwrap().get_endpoint(), "admin/api-admin-user");
        assert_eq!(User::view(7).unwrap().get_endpoint(), "admin/api-admin-user/7");

        let update = User::update(7, Map::new()).unwrap();
        assert_eq!(update.method, Method::PUT);
        assert_eq!(update.get_endpoint(), "admin/api-admin-user/7");

        let mut values = Map::new();
        values.insert("email".into(), json!("a@b.c"));
        let insert = User::insert(values).unwrap();
        assert_eq!(insert.method, Method::POST);
        assert_eq!(insert.get_args()["email"], json!("a@b.c"));

        assert_eq!(User::remove(7).unwrap().method, Method::DELETE);
    }

    #[test]
    fn test_empty_endpoint_falls_back_to_default() {
        let request = EndpointRequest::<User>::new().endpoint("");
        assert_eq!(request.get_endpoint(), "admin/api-admin-user");
    }

    #[test]
    fn test_cache_ttl() {
        let request = EndpointRequest::<User>::new();
        assert!(request.get_cache().is_none());

        let request = request.cache(Duration::from_secs(60));
        assert_eq!(request.get_cache(), Some(Duration::from_secs(60)));
    }
}
