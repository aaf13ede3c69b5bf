use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::pattern::Params;
use crate::server::{Request, Response};

/// The innermost step of a chain: the route handler.
pub type FinalHandler<'a> =
    dyn Fn(&Request, Response, &Params) -> Result<Response, DispatchError> + 'a;

/// A request interceptor.
///
/// Call `next.run(..)` to continue into the rest of the chain and the
/// handler; return without calling it to short-circuit.
pub trait Middleware: Send + Sync {
    fn handle(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        next: Next<'_>,
    ) -> Result<Response, DispatchError>;
}

impl<F> Middleware for F
where
    F: Fn(&Request, Response, &Params, Next<'_>) -> Result<Response, DispatchError> + Send + Sync,
{
    fn handle(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        next: Next<'_>,
    ) -> Result<Response, DispatchError> {
        self(req, res, params, next)
    }
}

/// Wrap a closure as a shareable interceptor.
///
/// ```rust
/// use routeweave::middleware::from_fn;
///
/// let stamp = from_fn(|req, res, params, next| {
///     let res = next.run(req, res, params)?;
///     Ok(res.with_header("X-Served-By", "routeweave"))
/// });
/// # let _ = stamp;
/// ```
pub fn from_fn<F>(f: F) -> Arc<dyn Middleware>
where
    F: Fn(&Request, Response, &Params, Next<'_>) -> Result<Response, DispatchError>
        + Send
        + Sync
        + 'static,
{
    Arc::new(f)
}

/// The remainder of a chain, handed to each interceptor.
pub struct Next<'a> {
    rest: &'a [Arc<dyn Middleware>],
    last: &'a FinalHandler<'a>,
}

impl Next<'_> {
    /// Run the next interceptor, or the handler when none is left.
    ///
    /// # Errors
    ///
    /// Whatever the rest of the chain returns.
    pub fn run(self, req: &Request, res: Response, params: &Params) -> Result<Response, DispatchError> {
        match self.rest.split_first() {
            Some((mw, rest)) => mw.handle(
                req,
                res,
                params,
                Next {
                    rest,
                    last: self.last,
                },
            ),
            None => (self.last)(req, res, params),
        }
    }

    /// Interceptors still ahead, handler excluded.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rest.len()
    }
}

/// Ordered, immutable list of interceptors.
///
/// The first interceptor added is the outermost: it sees the request first
/// and the response last.
#[derive(Clone, Default)]
pub struct MiddlewareChain {
    stack: Vec<Arc<dyn Middleware>>,
}

impl fmt::Debug for MiddlewareChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareChain").field("len", &self.stack.len()).finish()
    }
}

impl MiddlewareChain {
    /// Empty chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// New chain with `mw` appended (innermost).
    #[must_use]
    pub fn with(&self, mw: Arc<dyn Middleware>) -> Self {
        let mut stack = self.stack.clone();
        stack.push(mw);
        Self { stack }
    }

    /// New chain running `self` around `other`.
    #[must_use]
    pub fn merge(&self, other: &MiddlewareChain) -> Self {
        let mut stack = Vec::with_capacity(self.stack.len() + other.stack.len());
        stack.extend(self.stack.iter().cloned());
        stack.extend(other.stack.iter().cloned());
        Self { stack }
    }

    /// Number of interceptors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stack.len()
    }

    /// `true` when the chain has no interceptor.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Run the chain around `last`.
    ///
    /// # Errors
    ///
    /// The first error raised by an interceptor or the handler.
    pub fn dispatch(
        &self,
        req: &Request,
        res: Response,
        params: &Params,
        last: &FinalHandler<'_>,
    ) -> Result<Response, DispatchError> {
        Next {
            rest: &self.stack,
            last,
        }
        .run(req, res, params)
    }
}
