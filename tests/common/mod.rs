#![allow(dead_code)]

use http::Method;
use routeweave::server::Connected;
use routeweave::{Handler, Params, Request, Response, Router, RouterConfig};

pub fn router() -> Router {
    Router::new(RouterConfig::default()).unwrap()
}

pub fn text(body: &'static str) -> Handler {
    Handler::func(move |_: &Request, _: Response, _: &Params| body)
}

pub fn get(path: &str) -> Request {
    Request::new(Method::GET, path)
}

pub fn serve_to_string(router: &Router, req: &Request) -> String {
    let mut out = Vec::new();
    router.serve(req, &mut out, &Connected).unwrap();
    String::from_utf8(out).unwrap()
}
