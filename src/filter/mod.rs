//! Static Security Filter (C3).
//!
//! `check(code, descriptor) -> Option<reject-reason>`, run before anything
//! is spawned. The family on the `RuntimeDescriptor` selects which of the
//! two sub-filters applies: Python gets a real AST walk, JS gets a cheap
//! textual scan (§4.3's "Known limitations" are deliberate, not an
//! oversight: the filter catches honest mistakes, C1/C2 are the actual
//! containment).

mod js;
mod python;

use crate::registry::{RuntimeDescriptor, RuntimeFamily};

/// Returns `Some(reason)` if the submission must be rejected, `None` if it
/// is clear to proceed to C2. Never spawns anything itself.
pub fn check(code: &str, descriptor: &RuntimeDescriptor) -> Option<String> {
    match descriptor.family {
        RuntimeFamily::PythonLike => python::check(code, &descriptor.allowed_modules),
        RuntimeFamily::JsLike => js::check(code, &descriptor.allowed_modules),
    }
}
