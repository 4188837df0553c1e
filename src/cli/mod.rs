//! # CLI Module
//!
//! ## Commands
//!
//! ### `serve`
//!
//! ```bash
//! specmock serve --spec books.yaml --addr 127.0.0.1:8080 --seed 7
//! ```
//!
//! Options: `--mode simple|comprehensive`, `--policy preference|success`, `--seed <N>`,
//! `--strict`, `--delegate-url <URL>`, `--delegate-timeout-ms <MS>`. Each flag overrides the
//! matching `SPECMOCK_*` environment variable (see [`crate::runtime_config`]).
//!
//! ### `routes`
//!
//! ```bash
//! specmock routes --spec books.yaml
//! ```
//!
//! Prints the route table, or fails with the startup defect that prevents serving.
//!
//! ### `mock`
//!
//! ```bash
//! specmock mock --spec books.yaml --method POST --path /books --body '{"title":"Dune"}'
//! ```
//!
//! Prints the status on the first line and the pretty-printed body after it.

mod commands;


pub use commands::{
    build_dispatcher, mock_once, render_routes, run, run_cli, Cli, Commands, EngineArgs,
};
