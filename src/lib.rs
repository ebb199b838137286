//! Linode API - typed REST client for the Linode cloud.
//!
//! A library for listing, creating and mutating Linode resources with:
//! - **Client**: HTTP client configured from environment variables
//! - **Pagination**: fetch one page or every page of any list endpoint
//! - **List options**: page window, page size, `X-Filter` header and custom query params
//! - **Cache keys**: stable SHA-256 fingerprint of list options
//! - **Resources**: instances and volumes
//!
//! ## Quick Start
//!
//! All configuration is loaded from environment variables. Create a `.env` file:
//!
//! ```text
//! LINODE_TOKEN=your_api_token_here
//! ```
//!
//! Then list resources:
//!
//! ```ignore
//! use linode_api::{Client, ClientConfig, ListOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::new(ClientConfig::from_env()?)?;
//!
//!     // Every page, filtered server-side.
//!     let mut opts = ListOptions::new(0, r#"{"region":"us-east"}"#);
//!     let instances = client.list_instances(Some(&mut opts)).await?;
//!     println!("{} of {} instances", instances.len(), opts.results());
//!
//!     // Only the second page.
//!     let mut opts = ListOptions::new(2, "");
//!     let page = client.list_volumes(Some(&mut opts)).await?;
//!     println!("page 2/{}: {} volumes", opts.pages(), page.len());
//!
//!     Ok(())
//! }
//! ```

// ============================================================================
// Strict linting - Dangerous or non-idiomatic practices are forbidden
// ============================================================================

#![deny(warnings)]                    // All warnings are treated as errors
#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![deny(missing_docs)]                // All public items must be documented
#![deny(dead_code)]                   // Unused code is forbidden
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention

// Additional strictness - Leave nothing unchecked
#![deny(unused_imports)]              // Unused imports are forbidden
#![deny(unused_variables)]            // Unused variables are forbidden
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden
#![forbid(unsafe_op_in_unsafe_fn)]    // Unsafe ops in unsafe fns are forbidden

// Clippy for strict discipline
#![deny(clippy::all)]                 // All standard Clippy lints
#![deny(clippy::pedantic)]            // Very strict Clippy lints
#![deny(clippy::nursery)]             // Experimental lints
#![deny(clippy::unwrap_used)]         // unwrap() is forbidden
#![deny(clippy::expect_used)]         // expect() is forbidden
#![deny(clippy::panic)]               // panic!() is forbidden
#![deny(clippy::print_stdout)]        // println!() is forbidden in production
#![deny(clippy::todo)]                // TODO is forbidden
#![deny(clippy::unimplemented)]       // unimplemented!() is forbidden
#![deny(clippy::missing_const_for_fn)] // Force const when possible
#![deny(clippy::unwrap_in_result)]    // unwrap() in Result is forbidden
#![deny(clippy::module_inception)]    // Module with same name as crate is forbidden
#![deny(clippy::redundant_clone)]     // Useless clones are forbidden
#![deny(clippy::shadow_unrelated)]    // Shadowing unrelated variables is forbidden
#![deny(clippy::too_many_arguments)]  // Limit function arguments
#![deny(clippy::cognitive_complexity)] // Limit cognitive complexity
#![cfg_attr(test, allow(clippy::unwrap_used))]

// Safety and robustness lints
#![deny(overflowing_literals)]        // Overflowing literals are forbidden
#![deny(arithmetic_overflow)]         // Arithmetic overflow is forbidden

// ============================================================================
// Modules
// ============================================================================

/// Error taxonomy shared by every module.
pub mod linode_error;

/// HTTP client, configuration, outbound requests and endpoint templates.
///
/// Use this module to build a client and issue raw requests.
pub mod linode_client;

/// Query parameter flattening for custom list filters.
pub mod linode_query;

/// List options, cache-key hashing and the page walker.
///
/// Use this module to control paging or to write a pager for a new resource.
pub mod linode_pagination;

/// Compute instances: list, get, create, and lifecycle actions.
pub mod linode_instances;

/// Block storage volumes.
pub mod linode_volumes;

// ============================================================================
// Re-exports for convenience
// ============================================================================

pub use linode_client::{ApiRequest, Client, ClientConfig, Resource};
pub use linode_error::{Error, Result};
pub use linode_instances::{
    Instance, InstanceCloneOptions, InstanceCreateOptions, InstanceUpdateOptions, RebuildInstanceOptions,
};
pub use linode_pagination::{ListOptions, PageOptions, PagedResponse, QueryParams};
pub use linode_query::flatten_query_struct;
pub use linode_volumes::Volume;
