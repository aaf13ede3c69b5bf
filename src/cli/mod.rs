//! # CLI Module
//!
//! Command-line front end for trying a route table without a server.
//!
//! ## Route files
//!
//! Routes are described in YAML:
//!
//! ```yaml
//! routes:
//!   - route: "GET home: /"
//!     body: "Welcome"
//!   - route: "GET item: /items/@id"
//!     body: "item @id"
//!     ttl: 60
//!   - route: "GET /download"
//!     body: "large payload"
//!     kbps: 64
//!   - route: "GET /old"
//!     redirect: "@home"
//!     permanent: true
//! ```
//!
//! `body` may reference route tokens (`@id`), which are filled from the
//! matched path. `status` sets the response status (default 200).
//!
//! ## Commands
//!
//! ### `request`
//!
//! Dispatch one mock request and print the response:
//!
//! ```bash
//! routeweave request GET /items/42 --routes routes.yaml
//! routeweave request GET /feed --routes routes.yaml --ajax -H "Origin: https://app.example"
//! routeweave request GET /report --routes routes.yaml --cli
//! ```
//!
//! A CLI request prints only the body; other channels print the status
//! line and headers too.
//!
//! ### `routes`
//!
//! List the route table in match order:
//!
//! ```bash
//! routeweave routes --routes routes.yaml
//! ```

mod commands;


pub use commands::{build_router, execute, run_cli, Cli, Commands, RouteFile, RouteDef};
