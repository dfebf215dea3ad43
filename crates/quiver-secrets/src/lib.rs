//! Registry credential resolution for Quiver
//!
//! - **Token strategies**: instance metadata server, local CLI credential
//!   helper, static configured token, tried in that order
//! - **Registry auth environment**: npm-style environment entries carrying a
//!   resolved token to the package-manager subprocess

pub mod registry_env;
pub mod resolver;
pub mod strategies;
pub mod token;

pub use registry_env::{build_registry_auth_env, registry_scope, GENERIC_TOKEN_VAR};
pub use resolver::{CredentialResolver, ResolvedToken};
pub use strategies::{CliHelperStrategy, MetadataServerStrategy, StaticTokenStrategy, TokenStrategy};
pub use token::AccessToken;
