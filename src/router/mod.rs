//! A two-tier router: exact-match lookups for literal paths, falling back to
//! a pattern matcher for routes with `:param`, `:rest*`, and `*` segments.
//!
//! Wraps the same boxed-future dispatch shape [`Handler`] already uses so a
//! [`Router`] itself implements [`Handler`] and can be installed on
//! [`ServerBuilder`](crate::ServerBuilder) directly.

use crate::{
    http::request::Request,
    http::response::{Handled, Response},
    server::connection::ConnectionData,
    server::server_impl::Handler,
    Method, StatusCode,
};
use std::{collections::HashMap, future::Future, pin::Pin};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(Vec<u8>),
    Param(String),
    CatchAll(String),
    Wildcard,
}

fn compile_pattern(pattern: &str) -> Vec<Segment> {
    pattern
        .split('/')
        .filter(|piece| !piece.is_empty())
        .map(|piece| {
            if piece == "*" {
                Segment::Wildcard
            } else if let Some(name) = piece.strip_prefix(':').and_then(|p| p.strip_suffix('*')) {
                Segment::CatchAll(name.to_owned())
            } else if let Some(name) = piece.strip_prefix(':') {
                Segment::Param(name.to_owned())
            } else {
                Segment::Literal(piece.as_bytes().to_vec())
            }
        })
        .collect()
}

fn specificity(segments: &[Segment]) -> usize {
    segments
        .iter()
        .map(|segment| match segment {
            Segment::Literal(bytes) => bytes.len(),
            _ => 0,
        })
        .sum()
}

/// Attempts to match `segments` (a compiled pattern) against `path`, a
/// request's path segments. Returns the captured `:param`/`:rest*` values on
/// success.
fn try_match(segments: &[Segment], path: &[&[u8]]) -> Option<Vec<(String, String)>> {
    let mut captures = Vec::new();
    let mut path_idx = 0;

    for segment in segments {
        match segment {
            Segment::Literal(lit) => {
                if path.get(path_idx).map(|s| *s) != Some(lit.as_slice()) {
                    return None;
                }
                path_idx += 1;
            }
            Segment::Param(name) => {
                let value = path.get(path_idx).filter(|s| !s.is_empty())?;
                captures.push((name.clone(), String::from_utf8_lossy(value).into_owned()));
                path_idx += 1;
            }
            Segment::CatchAll(name) => {
                let remainder = path[path_idx..].join(&b'/');
                let remainder = remainder.strip_suffix(b"/").unwrap_or(&remainder);
                captures.push((name.clone(), String::from_utf8_lossy(remainder).into_owned()));
                return Some(captures);
            }
            Segment::Wildcard => return Some(captures),
        }
    }

    if path_idx == path.len() {
        Some(captures)
    } else {
        None
    }
}

/// Object-safe stand-in for [`Handler<S>`], letting `Router` hold a
/// `Vec<Box<dyn RouteTarget<S>>>` of heterogeneous route handlers.
trait RouteTarget<S>: Send + Sync
where
    S: ConnectionData,
{
    fn call<'a>(
        &'a self,
        data: &'a mut S,
        request: &'a Request,
        response: &'a mut Response,
    ) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>>;
}

impl<S, H> RouteTarget<S> for H
where
    H: Handler<S>,
    S: ConnectionData,
{
    fn call<'a>(
        &'a self,
        data: &'a mut S,
        request: &'a Request,
        response: &'a mut Response,
    ) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>> {
        Box::pin(self.handle(data, request, response))
    }
}

/// The remainder of a middleware chain: either another middleware or the
/// matched route handler (or the synthesized 404). Call [`Next::run`] to
/// continue the chain.
pub struct Next<'a, S> {
    inner: Box<dyn FnOnce(&'a mut S, &'a Request, &'a mut Response) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>> + Send + 'a>,
}

impl<'a, S> Next<'a, S> {
    fn new<F>(f: F) -> Self
    where
        F: FnOnce(&'a mut S, &'a Request, &'a mut Response) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>> + Send + 'a,
    {
        Next { inner: Box::new(f) }
    }

    /// Runs the rest of the chain.
    #[inline]
    pub async fn run(self, data: &'a mut S, request: &'a Request, response: &'a mut Response) -> Handled {
        (self.inner)(data, request, response).await
    }
}

/// A piece of request-processing logic that runs before (and optionally
/// after) the matched route handler. Registration order is outer-to-inner:
/// the first middleware registered on a [`Router`] is the first to run and
/// the last to see the response before it goes out.
///
/// Call `next.run(..)` to continue the chain; not calling it short-circuits
/// the request without reaching the route handler.
///
/// # Examples
/// ```
/// use maker_web::{Handled, Middleware, Next, Request, Response};
///
/// struct Logger;
///
/// impl Middleware for Logger {
///     async fn call(&self, data: &mut (), req: &Request, resp: &mut Response, next: Next<'_, ()>) -> Handled {
///         let handled = next.run(data, req, resp).await;
///         handled
///     }
/// }
/// ```
pub trait Middleware<S = ()>
where
    Self: Send + Sync + 'static,
    S: ConnectionData,
{
    fn call(
        &self,
        data: &mut S,
        request: &Request,
        response: &mut Response,
        next: Next<'_, S>,
    ) -> impl Future<Output = Handled> + Send;
}

trait MiddlewareTarget<S>: Send + Sync
where
    S: ConnectionData,
{
    fn call<'a>(
        &'a self,
        data: &'a mut S,
        request: &'a Request,
        response: &'a mut Response,
        next: Next<'a, S>,
    ) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>>;
}

impl<S, M> MiddlewareTarget<S> for M
where
    M: Middleware<S>,
    S: ConnectionData,
{
    fn call<'a>(
        &'a self,
        data: &'a mut S,
        request: &'a Request,
        response: &'a mut Response,
        next: Next<'a, S>,
    ) -> Pin<Box<dyn Future<Output = Handled> + Send + 'a>> {
        Box::pin(Middleware::call(self, data, request, response, next))
    }
}

struct PatternRoute<S> {
    segments: Vec<Segment>,
    specificity: usize,
    handler: Box<dyn RouteTarget<S>>,
}

/// Routes requests to handlers by method and path, with optional
/// `:param`, `:rest*`, and `*` segments, and an ordered chain of
/// [`Middleware`] wrapping every route.
///
/// Dispatch order: exact literal match, then the highest-specificity
/// pattern match (ties broken by registration order), then the configured
/// fallback, then a synthesized `404 Not Found`.
pub struct Router<S = ()>
where
    S: ConnectionData,
{
    exact: HashMap<(Method, Vec<u8>), Box<dyn RouteTarget<S>>>,
    patterns: HashMap<Method, Vec<PatternRoute<S>>>,
    fallback: Option<Box<dyn RouteTarget<S>>>,
    middlewares: Vec<Box<dyn MiddlewareTarget<S>>>,
}

impl<S> Default for Router<S>
where
    S: ConnectionData,
{
    fn default() -> Self {
        Router {
            exact: HashMap::new(),
            patterns: HashMap::new(),
            fallback: None,
            middlewares: Vec::new(),
        }
    }
}

impl<S> Router<S>
where
    S: ConnectionData,
{
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method`/`pattern`. A pattern with no
    /// `:`/`*` segments is stored for exact lookup; otherwise it joins the
    /// per-method pattern list, kept sorted by specificity (highest first,
    /// ties broken by registration order).
    pub fn map<H>(mut self, method: Method, pattern: &str, handler: H) -> Self
    where
        H: Handler<S>,
    {
        let segments = compile_pattern(pattern);
        let is_exact = segments
            .iter()
            .all(|segment| matches!(segment, Segment::Literal(_)));

        if is_exact {
            let path: Vec<u8> = segments
                .iter()
                .flat_map(|segment| match segment {
                    Segment::Literal(lit) => {
                        let mut bytes = Vec::with_capacity(lit.len() + 1);
                        bytes.push(b'/');
                        bytes.extend_from_slice(lit);
                        bytes
                    }
                    _ => unreachable!(),
                })
                .collect();
            self.exact.insert((method, path), Box::new(handler));
            return self;
        }

        let specificity = specificity(&segments);
        let entry = self.patterns.entry(method).or_default();
        entry.push(PatternRoute {
            segments,
            specificity,
            handler: Box::new(handler),
        });
        entry.sort_by(|a, b| b.specificity.cmp(&a.specificity));
        self
    }

    #[inline]
    pub fn get<H: Handler<S>>(self, pattern: &str, handler: H) -> Self {
        self.map(Method::Get, pattern, handler)
    }

    #[inline]
    pub fn post<H: Handler<S>>(self, pattern: &str, handler: H) -> Self {
        self.map(Method::Post, pattern, handler)
    }

    #[inline]
    pub fn put<H: Handler<S>>(self, pattern: &str, handler: H) -> Self {
        self.map(Method::Put, pattern, handler)
    }

    #[inline]
    pub fn delete<H: Handler<S>>(self, pattern: &str, handler: H) -> Self {
        self.map(Method::Delete, pattern, handler)
    }

    /// Sets the handler invoked when no route (exact or pattern) matches.
    /// Without one, unmatched requests get a synthesized `404 Not Found`.
    #[inline]
    pub fn fallback<H: Handler<S>>(mut self, handler: H) -> Self {
        self.fallback = Some(Box::new(handler));
        self
    }

    /// Appends `middleware` to the chain. The first middleware added is the
    /// outermost: it runs first on the way in and last on the way out.
    #[inline]
    pub fn middleware<M: Middleware<S>>(mut self, middleware: M) -> Self {
        self.middlewares.push(Box::new(middleware));
        self
    }

    fn find<'a>(&'a self, method: Method, path: &[u8], segments: &[&[u8]]) -> Option<(&'a dyn RouteTarget<S>, Vec<(String, String)>)> {
        if let Some(handler) = self.exact.get(&(method, path.to_vec())) {
            return Some((handler.as_ref(), Vec::new()));
        }

        let candidates = self.patterns.get(&method)?;
        for candidate in candidates {
            if let Some(captures) = try_match(&candidate.segments, segments) {
                return Some((candidate.handler.as_ref(), captures));
            }
        }
        None
    }
}

impl<S> Handler<S> for Router<S>
where
    S: ConnectionData,
{
    async fn handle(&self, data: &mut S, request: &Request, response: &mut Response) -> Handled {
        let segments = request.url().path_segments();
        let found = self.find(request.method(), request.url().path(), segments);

        let terminal: &dyn RouteTarget<S> = match &found {
            Some((handler, captures)) => {
                request.set_route_values(captures.clone());
                *handler
            }
            None => match &self.fallback {
                Some(handler) => handler.as_ref(),
                None => return response.status(StatusCode::NotFound).body("Not Found"),
            },
        };

        let chain = self.middlewares.iter().rev().fold(
            Next::new(move |data: &mut S, request: &Request, response: &mut Response| terminal.call(data, request, response)),
            |next, middleware| {
                Next::new(move |data: &mut S, request: &Request, response: &mut Response| middleware.call(data, request, response, next))
            },
        );

        chain.run(data, request, response).await
    }
}

impl<S> std::fmt::Debug for Router<S>
where
    S: ConnectionData,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("exact_routes", &self.exact.len())
            .field("pattern_routes", &self.patterns.values().map(Vec::len).sum::<usize>())
            .field("middlewares", &self.middlewares.len())
            .field("has_fallback", &self.fallback.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Handled, StatusCode};

    struct Echo(&'static str);

    impl Handler for Echo {
        async fn handle(&self, _: &mut (), _: &Request, resp: &mut Response) -> Handled {
            resp.status(StatusCode::Ok).body(self.0)
        }
    }

    struct CaptureId;

    impl Handler for CaptureId {
        async fn handle(&self, _: &mut (), req: &Request, resp: &mut Response) -> Handled {
            let id: String = req.route_value("id").unwrap_or_default();
            resp.status(StatusCode::Ok).body(id)
        }
    }

    fn path_segments(path: &'static str) -> Vec<&'static [u8]> {
        path.split('/').filter(|s| !s.is_empty()).map(str::as_bytes).collect()
    }

    #[test]
    fn compiles_literal_param_catchall_wildcard() {
        let segments = compile_pattern("/users/:id/files/:rest*");
        assert_eq!(
            segments,
            vec![
                Segment::Literal(b"users".to_vec()),
                Segment::Param("id".to_owned()),
                Segment::Literal(b"files".to_vec()),
                Segment::CatchAll("rest".to_owned()),
            ]
        );

        assert_eq!(compile_pattern("/assets/*")[1], Segment::Wildcard);
    }

    #[test]
    fn exact_beats_pattern_specificity() {
        let router: Router = Router::new().get("/users/me", Echo("me")).get("/users/:id", Echo("id"));

        let segments = path_segments("/users/me");
        let (handler, captures) = router.find(Method::Get, b"/users/me", &segments).unwrap();
        assert!(captures.is_empty());
        let _ = handler;
    }

    #[test]
    fn pattern_captures_param() {
        let router: Router = Router::new().get("/users/:id", CaptureId);
        let segments = path_segments("/users/42");
        let (_, captures) = router.find(Method::Get, b"/users/42", &segments).unwrap();
        assert_eq!(captures, vec![("id".to_owned(), "42".to_owned())]);
    }

    #[test]
    fn catch_all_binds_remainder_and_trims_trailing_slash() {
        let segments = compile_pattern("/files/:rest*");
        let path = path_segments("/files/a/b/c/");
        let captures = try_match(&segments, &path).unwrap();
        assert_eq!(captures, vec![("rest".to_owned(), "a/b/c".to_owned())]);
    }

    #[test]
    fn wildcard_matches_and_terminates() {
        let segments = compile_pattern("/assets/*");
        let path = path_segments("/assets/css/site.css");
        assert_eq!(try_match(&segments, &path), Some(Vec::new()));
    }

    #[test]
    fn literal_requires_exact_segment() {
        let segments = compile_pattern("/users/:id");
        assert_eq!(try_match(&segments, &path_segments("/users")), None);
        assert_eq!(try_match(&segments, &path_segments("/users/1/extra")), None);
    }

    #[test]
    fn specificity_orders_by_literal_byte_length() {
        let router: Router = Router::new().get("/a/:id", Echo("short")).get("/alpha/:id", Echo("long"));
        let candidates = &router.patterns[&Method::Get];
        assert_eq!(candidates[0].specificity, "alpha".len());
        assert_eq!(candidates[1].specificity, "a".len());
    }

    #[test]
    fn missing_route_falls_through_to_default_404() {
        let router: Router = Router::new().get("/known", Echo("known"));
        assert!(router.find(Method::Get, b"/unknown", &path_segments("/unknown")).is_none());
    }
}
