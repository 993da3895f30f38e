//! The authenticated caller session (§3, §6).
//!
//! The core treats a session as polymorphic over exactly one capability:
//! given a model, a database-naming field name, and optionally a specific
//! instance, return whether the field may be read. Contexts with no
//! session at all disable authorization entirely (§4.4.3) — that is
//! represented by the *absence* of a `Session` in the GraphQL context, not
//! by a variant of this trait.

use crate::value::EntityRow;

pub trait Session: Send + Sync {
    /// Class- or instance-level read check. `instance` is `None` for the
    /// filter/sort compiler's column-reference check (§4.5) and `Some` for
    /// a resolved row's field access (§4.4).
    fn may_read(&self, model: &str, field_name: &str, instance: Option<&EntityRow>) -> bool;
}

/// A session that permits every field on every model; useful for tests and
/// for internal/trusted callers that construct a context without going
/// through the authentication boundary at all (in which case omitting the
/// session from the context entirely has the same effect, per §4.4.3).
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAllSession;

impl Session for AllowAllSession {
    fn may_read(&self, _model: &str, _field_name: &str, _instance: Option<&EntityRow>) -> bool {
        true
    }
}
