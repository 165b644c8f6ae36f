//! Route navigation
//!
//! ```text
//! route(RELAY) / t_on_failure("MANAGE_FAILURE") / t_on_reply(...)
//!       ↓
//! route_reference()     first argument of a route-jumping call
//!       ↓
//! RouteIndex::resolve() matching route[...] block of the same document
//! ```

use tracing::debug;

use crate::symbols::RouteDefinition;
use crate::symbols::RouteIndex;
use crate::symbols::routes::route_reference;
use crate::syntax::Node;

/// Route declaration referenced by the call argument `node` lies in.
pub fn definition_for<'a>(node: Node<'_>, routes: &'a RouteIndex) -> Option<&'a RouteDefinition> {
    let reference = route_reference(node)?;
    let found = routes.resolve(&reference);
    debug!(
        "Route reference '{}' ({:?}) resolved: {}",
        reference.name,
        reference.route_types,
        found.is_some()
    );
    found
}
