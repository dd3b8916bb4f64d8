//! Application framework based on [beanpeek_di] component container.
//!
//! Components declared with `beanpeek_di` macros get discovered by namespace, but something has to
//! decide which namespaces to scan, where component properties come from and when pre-destroy
//! hooks run. This crate provides such entrypoint in the form of
//! [Application](application::Application), which also configures additional supporting
//! infrastructure, e.g. logging.
//!
//! ```no_run
//! use beanpeek::application;
//!
//! let mut application = application::create_default().expect("unable to create application");
//! application.run().expect("error registering components");
//!
//! // use application.container() here
//!
//! application.shutdown();
//! ```

pub mod application;
pub mod config;
